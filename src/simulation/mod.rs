// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/watchpost-rs

//! Alert simulator for demo/testing
//!
//! Each tick picks one enabled behavior, draws a confidence and pushes it
//! through the detection gate: draws below `detection.confidence` are
//! discarded, accepted draws are remapped into `[threshold, 1)`. A higher
//! threshold therefore lowers the alert rate *and* raises the confidence of
//! the alerts that do get through.

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Uniform;
use tracing::{debug, trace};

use crate::alerts::{Alert, BehaviourType};
use crate::config::{MonitorConfig, SimulationConfig};
use crate::core::{AppState, Notification, NotificationSink, Severity};
use crate::error::WatchError;

/// Synthesizes behavior alerts from the current configuration
pub struct Simulator<R = ChaCha8Rng> {
    rng: R,
    cameras: Vec<String>,
    person_ids: Uniform<u32>,
}

impl Simulator<ChaCha8Rng> {
    /// Seeded from `config.seed`, or from OS entropy when unset
    pub fn from_config(config: &SimulationConfig) -> Result<Self, WatchError> {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(rng, config.cameras.clone(), config.person_id_max)
    }
}

impl<R: Rng> Simulator<R> {
    pub fn with_rng(rng: R, cameras: Vec<String>, person_id_max: u32) -> Result<Self, WatchError> {
        if cameras.is_empty() {
            return Err(WatchError::NoCameras);
        }
        Ok(Self {
            rng,
            cameras,
            person_ids: Uniform::new_inclusive(1, person_id_max.max(1)),
        })
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Decide whether this tick yields an alert and build it.
    ///
    /// Does not touch any store; `id` is the id the alert will carry.
    pub fn draw(&mut self, config: &MonitorConfig, id: u64, now: DateTime<Utc>) -> Option<Alert> {
        let enabled = config.enabled_behaviours();
        let behaviour_type: BehaviourType = match enabled.choose(&mut self.rng) {
            Some(b) => *b,
            None => {
                trace!("No behaviors enabled, skipping tick");
                return None;
            }
        };

        let threshold = config.detection.confidence;
        let r: f64 = self.rng.gen();
        if r < threshold {
            trace!("Draw {:.3} rejected by gate {:.2}", r, threshold);
            return None;
        }
        let confidence = r * (1.0 - threshold) + threshold;

        let person_id = self.rng.sample(&self.person_ids);
        let camera_id = self
            .cameras
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default();

        Some(Alert {
            id,
            person_id,
            behaviour_type,
            confidence,
            timestamp: now,
            camera_id,
            snapshot_path: format!("https://picsum.photos/seed/snap{}/640/480", now.timestamp_millis()),
            metadata: None,
        })
    }

    /// One full simulation step against `state`
    pub fn tick(&mut self, state: &mut AppState, sink: &dyn NotificationSink) -> Option<Alert> {
        let id = state.alerts.next_id();
        let alert = self.draw(state.config.current(), id, Utc::now())?;

        state.alerts.insert(alert.clone());
        state.stats.apply_new_alert(&alert);
        debug!(
            "Produced alert {} ({}, confidence {:.3})",
            alert.id, alert.behaviour_type, alert.confidence
        );

        sink.notify(alert_notification(&alert));
        Some(alert)
    }
}

/// Operator notification for a new alert
pub fn alert_notification(alert: &Alert) -> Notification {
    Notification::new(
        format!("🚨 ALERT: {}", alert.behaviour_type.label().to_uppercase()),
        format!(
            "Person {} detected on {}. Confidence: {:.0}%",
            alert.person_id,
            alert.camera_id,
            alert.confidence * 100.0
        ),
        Severity::Critical,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::alerts::seed::seed_alerts;
    use crate::core::test_support::RecordingSink;
    use crate::stats::Stats;

    fn simulator(seed: u64) -> Simulator {
        let config = SimulationConfig {
            seed: Some(seed),
            cameras: vec!["cam-01".to_string()],
            ..SimulationConfig::default()
        };
        Simulator::from_config(&config).unwrap()
    }

    fn state_with(config: MonitorConfig) -> AppState {
        let alerts = seed_alerts(Utc::now());
        let baseline = Stats::from_alerts(&alerts, 3, Utc::now().date_naive());
        AppState::new(config, alerts, baseline, &["cam-01".to_string()])
    }

    fn only_loitering(threshold: f64) -> MonitorConfig {
        let mut config = MonitorConfig::default();
        config.detection.confidence = threshold;
        config.behavior.fall.enabled = false;
        config.behavior.lying.enabled = false;
        config.behavior.loitering.enabled = true;
        config
    }

    #[test]
    fn test_all_disabled_changes_nothing() {
        let mut config = MonitorConfig::default();
        config.behavior.fall.enabled = false;
        config.behavior.lying.enabled = false;
        config.behavior.loitering.enabled = false;
        config.detection.confidence = 0.0;

        let mut state = state_with(config);
        let alerts_before = state.alerts.list();
        let stats_before = state.stats.snapshot();
        let sink = RecordingSink::default();
        let mut sim = simulator(1);

        for _ in 0..50 {
            assert!(sim.tick(&mut state, &sink).is_none());
        }
        assert_eq!(state.alerts.list(), alerts_before);
        assert_eq!(state.stats.snapshot(), stats_before);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_zero_threshold_always_produces() {
        let mut config = MonitorConfig::default();
        config.detection.confidence = 0.0;
        let mut sim = simulator(2);

        for id in 1..=200 {
            let alert = sim.draw(&config, id, Utc::now()).expect("gate never rejects at 0");
            assert!((0.0..1.0).contains(&alert.confidence));
            assert!((1..=10).contains(&alert.person_id));
        }
    }

    #[test]
    fn test_full_threshold_never_produces() {
        let mut config = MonitorConfig::default();
        config.detection.confidence = 1.0;
        let mut sim = simulator(3);

        for id in 1..=200 {
            assert!(sim.draw(&config, id, Utc::now()).is_none());
        }
    }

    #[test]
    fn test_loitering_only_scenario() {
        let mut state = state_with(only_loitering(0.3));
        let sink = RecordingSink::default();
        let mut sim = simulator(4);

        let produced: Vec<Alert> = (0..100).filter_map(|_| sim.tick(&mut state, &sink)).collect();

        assert!(!produced.is_empty());
        for alert in &produced {
            assert_eq!(alert.behaviour_type, BehaviourType::Loitering);
            assert!(alert.confidence >= 0.3);
            assert!(alert.confidence < 1.0);
        }
        assert_eq!(sink.take().len(), produced.len());
    }

    #[test]
    fn test_tick_updates_store_and_stats() {
        let mut state = state_with(only_loitering(0.0));
        let sink = RecordingSink::default();
        let mut sim = simulator(5);

        let alert = sim.tick(&mut state, &sink).unwrap();
        assert_eq!(alert.id, 6);
        assert_eq!(alert.camera_id, "cam-01");
        assert_eq!(state.alerts.list()[0], alert);

        let stats = state.stats.snapshot();
        assert_eq!(stats.total_alerts, 6);
        assert_eq!(stats.behaviors_detected.values().sum::<u64>(), 6);
        assert_eq!(stats.behavior_count(BehaviourType::Loitering), 3);

        let sent = sink.take();
        assert_eq!(sent[0].title, "🚨 ALERT: LOITERING");
        assert_eq!(sent[0].severity, Severity::Critical);
        assert!(sent[0].description.starts_with(&format!("Person {} detected on cam-01.", alert.person_id)));

        let next = sim.tick(&mut state, &sink).unwrap();
        assert_eq!(next.id, 7);
    }

    #[test]
    fn test_gate_suppresses_rate() {
        let trials = 2000;
        let mut sim = simulator(6);

        let produced = |sim: &mut Simulator, threshold: f64| {
            let config = only_loitering(threshold);
            (0..trials)
                .filter(|i| sim.draw(&config, *i as u64, Utc::now()).is_some())
                .count()
        };

        let low = produced(&mut sim, 0.2);
        let high = produced(&mut sim, 0.8);
        assert!(low > high);
        // expected rates 0.8 and 0.2
        assert!((low as f64 / trials as f64 - 0.8).abs() < 0.05);
        assert!((high as f64 / trials as f64 - 0.2).abs() < 0.05);
    }

    #[test]
    fn test_behaviour_and_camera_picks_are_uniform() {
        let cameras: Vec<String> = ["cam-01", "cam-02", "cam-03"].iter().map(|c| c.to_string()).collect();
        let mut sim = Simulator::with_rng(ChaCha8Rng::seed_from_u64(21), cameras.clone(), 10).unwrap();

        let mut config = MonitorConfig::default();
        config.detection.confidence = 0.0;
        config.behavior.fall.enabled = true;
        config.behavior.lying.enabled = true;
        config.behavior.loitering.enabled = false;

        let trials = 3000;
        let mut behaviours: HashMap<BehaviourType, usize> = HashMap::new();
        let mut per_camera: HashMap<String, usize> = HashMap::new();
        for id in 0..trials {
            let alert = sim.draw(&config, id as u64, Utc::now()).unwrap();
            *behaviours.entry(alert.behaviour_type).or_insert(0) += 1;
            *per_camera.entry(alert.camera_id).or_insert(0) += 1;
        }

        assert!(!behaviours.contains_key(&BehaviourType::Loitering));
        for behaviour in [BehaviourType::Fall, BehaviourType::LyingMotionless] {
            let share = behaviours[&behaviour] as f64 / trials as f64;
            assert!((share - 0.5).abs() < 0.04, "{} share {}", behaviour, share);
        }
        for camera in &cameras {
            let share = per_camera[camera] as f64 / trials as f64;
            assert!((share - 1.0 / 3.0).abs() < 0.04, "{} share {}", camera, share);
        }
    }

    #[test]
    fn test_no_cameras_is_an_error() {
        let result = Simulator::with_rng(ChaCha8Rng::seed_from_u64(0), Vec::new(), 10);
        assert!(matches!(result, Err(WatchError::NoCameras)));
    }

    #[test]
    fn test_same_seed_same_alerts() {
        let config = only_loitering(0.5);
        let now = Utc::now();
        let mut a = simulator(42);
        let mut b = simulator(42);
        for id in 0..20 {
            assert_eq!(a.draw(&config, id, now), b.draw(&config, id, now));
        }
    }
}
