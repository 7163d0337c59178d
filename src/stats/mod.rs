// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/watchpost-rs

//! Running alert statistics

use std::collections::BTreeMap;

use chrono::{NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alerts::{Alert, BehaviourType};

/// Alert count for one hour of the day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyCount {
    /// Bucket label, `HH:00`
    pub hour: String,
    pub count: u64,
}

/// Aggregate counters over every alert ever produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_alerts: u64,
    pub alerts_today: u64,
    pub active_cameras: u32,
    pub average_confidence: f64,
    pub behaviors_detected: BTreeMap<BehaviourType, u64>,
    pub alerts_per_hour: Vec<HourlyCount>,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            total_alerts: 0,
            alerts_today: 0,
            active_cameras: 0,
            average_confidence: 0.0,
            behaviors_detected: BehaviourType::ALL.iter().map(|b| (*b, 0)).collect(),
            alerts_per_hour: Vec::new(),
        }
    }
}

impl Stats {
    /// Recompute from a full alert list. Alerts dated `today` count towards
    /// `alerts_today`.
    pub fn from_alerts<'a, I>(alerts: I, active_cameras: u32, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a Alert>,
    {
        let mut stats = Stats {
            active_cameras,
            ..Stats::default()
        };
        let mut confidence_sum = 0.0;

        for alert in alerts {
            stats.total_alerts += 1;
            if alert.timestamp.date_naive() == today {
                stats.alerts_today += 1;
            }
            confidence_sum += alert.confidence;
            *stats.behaviors_detected.entry(alert.behaviour_type).or_insert(0) += 1;
            stats.bump_hour(alert);
        }

        if stats.total_alerts > 0 {
            stats.average_confidence = confidence_sum / stats.total_alerts as f64;
        }
        stats
    }

    /// Stats after one more alert. Leaves `self` untouched.
    pub fn with_alert(&self, alert: &Alert) -> Stats {
        let mut next = self.clone();

        *next.behaviors_detected.entry(alert.behaviour_type).or_insert(0) += 1;

        let new_total = self.total_alerts + 1;
        next.average_confidence =
            (self.average_confidence * self.total_alerts as f64 + alert.confidence) / new_total as f64;
        next.total_alerts = new_total;
        next.alerts_today += 1;
        next.bump_hour(alert);

        next
    }

    pub fn behavior_count(&self, behaviour: BehaviourType) -> u64 {
        self.behaviors_detected.get(&behaviour).copied().unwrap_or(0)
    }

    fn bump_hour(&mut self, alert: &Alert) {
        let label = format!("{:02}:00", alert.timestamp.hour());
        match self.alerts_per_hour.binary_search_by(|h| h.hour.cmp(&label)) {
            Ok(idx) => self.alerts_per_hour[idx].count += 1,
            Err(idx) => self.alerts_per_hour.insert(idx, HourlyCount { hour: label, count: 1 }),
        }
    }
}

/// Owns the current stats and folds new alerts into them
#[derive(Debug, Clone, Default)]
pub struct StatisticsAggregator {
    current: Stats,
}

impl StatisticsAggregator {
    pub fn new(baseline: Stats) -> Self {
        Self { current: baseline }
    }

    pub fn snapshot(&self) -> Stats {
        self.current.clone()
    }

    /// Fold a freshly produced alert in and return the updated stats
    pub fn apply_new_alert(&mut self, alert: &Alert) -> Stats {
        self.current = self.current.with_alert(alert);
        debug!(
            "Stats updated: total={} avg_confidence={:.3}",
            self.current.total_alerts, self.current.average_confidence
        );
        self.current.clone()
    }

    pub fn reset_to_baseline(&mut self, baseline: Stats) {
        self.current = baseline;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::test_alert;
    use chrono::Utc;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    fn behavior_sum(stats: &Stats) -> u64 {
        stats.behaviors_detected.values().sum()
    }

    fn random_alerts(rng: &mut ChaCha8Rng, len: usize) -> Vec<Alert> {
        (0..len)
            .map(|i| {
                let behaviour = *BehaviourType::ALL.choose(rng).unwrap();
                test_alert(i as u64 + 1, behaviour, rng.gen_range(0.0..=1.0))
            })
            .collect()
    }

    #[test]
    fn test_sum_matches_total_after_each_alert() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..50 {
            let len = rng.gen_range(1..200);
            let mut agg = StatisticsAggregator::default();

            for alert in random_alerts(&mut rng, len) {
                let stats = agg.apply_new_alert(&alert);
                assert_eq!(behavior_sum(&stats), stats.total_alerts);
            }
            assert_eq!(agg.snapshot().total_alerts, len as u64);
        }
    }

    #[test]
    fn test_running_mean_matches_arithmetic_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        for _ in 0..50 {
            let len = rng.gen_range(1..200);
            let alerts = random_alerts(&mut rng, len);
            let mut agg = StatisticsAggregator::default();
            for alert in &alerts {
                agg.apply_new_alert(alert);
            }

            let mean = alerts.iter().map(|a| a.confidence).sum::<f64>() / len as f64;
            assert!((agg.snapshot().average_confidence - mean).abs() < 1e-9);
        }
    }

    #[test]
    fn test_running_mean_from_seeded_baseline() {
        let mut rng = ChaCha8Rng::seed_from_u64(29);
        let seed = crate::alerts::seed::seed_alerts(Utc::now());
        let baseline = Stats::from_alerts(&seed, 3, Utc::now().date_naive());
        let mut agg = StatisticsAggregator::new(baseline);

        let extra = random_alerts(&mut rng, 40);
        for alert in &extra {
            agg.apply_new_alert(alert);
        }

        let all: Vec<&Alert> = seed.iter().chain(extra.iter()).collect();
        let mean = all.iter().map(|a| a.confidence).sum::<f64>() / all.len() as f64;
        let stats = agg.snapshot();
        assert_eq!(stats.total_alerts, all.len() as u64);
        assert_eq!(behavior_sum(&stats), stats.total_alerts);
        assert!((stats.average_confidence - mean).abs() < 1e-9);
    }

    #[test]
    fn test_with_alert_is_pure() {
        let before = Stats::default();
        let after = before.with_alert(&test_alert(1, BehaviourType::Fall, 0.8));
        assert_eq!(before.total_alerts, 0);
        assert_eq!(after.total_alerts, 1);
        assert_eq!(after.alerts_today, 1);
        assert!((after.average_confidence - 0.8).abs() < 1e-12);
        assert_eq!(after.alerts_per_hour.iter().map(|h| h.count).sum::<u64>(), 1);
    }

    #[test]
    fn test_from_alerts_and_reset() {
        let alerts = crate::alerts::seed::seed_alerts(Utc::now());
        let baseline = Stats::from_alerts(&alerts, 3, Utc::now().date_naive());
        assert_eq!(baseline.total_alerts, 5);
        assert_eq!(behavior_sum(&baseline), 5);
        assert_eq!(baseline.behavior_count(BehaviourType::Fall), 2);
        assert!((baseline.average_confidence - 0.89).abs() < 1e-9);

        let mut agg = StatisticsAggregator::new(baseline.clone());
        agg.apply_new_alert(&test_alert(6, BehaviourType::Fall, 0.6));
        assert_ne!(agg.snapshot(), baseline);

        agg.reset_to_baseline(baseline.clone());
        assert_eq!(agg.snapshot(), baseline);
    }
}
