//! Application state owned by the engine task

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Notification, NotificationSink, Severity};
use crate::ai::{ImageAnalysis, SecurityReport, Trigger};
use crate::alerts::{seed, Alert, AlertStore};
use crate::config::{Config, ConfigStore, MonitorConfig};
use crate::error::CameraAccessError;
use crate::stats::{StatisticsAggregator, Stats};

/// Persistent warning shown until the underlying condition is resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub title: String,
    pub message: String,
}

impl From<&CameraAccessError> for Banner {
    fn from(err: &CameraAccessError) -> Self {
        match err {
            CameraAccessError::Denied => Banner {
                title: "Camera Access Denied".to_string(),
                message: "Please enable camera permissions to use the live feed.".to_string(),
            },
            CameraAccessError::Unsupported => Banner {
                title: "Camera Not Supported".to_string(),
                message: "This environment cannot capture from the camera.".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraStatus {
    Active,
    /// Feed is off; the banner stays up until the camera is restored
    Disabled(Banner),
}

/// Result slot of an AI trigger point. Absent means idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiOutcome {
    Pending,
    Analysis(ImageAnalysis),
    Report(SecurityReport),
}

/// Everything the dashboard reads, owned by a single writer
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: ConfigStore,
    pub alerts: AlertStore,
    pub stats: StatisticsAggregator,
    baseline: Stats,
    cameras: BTreeMap<String, CameraStatus>,
    ai_views: HashMap<Trigger, AiOutcome>,
}

impl AppState {
    pub fn new(config: MonitorConfig, alerts: Vec<Alert>, baseline: Stats, cameras: &[String]) -> Self {
        Self {
            config: ConfigStore::new(config),
            alerts: AlertStore::with_alerts(alerts),
            stats: StatisticsAggregator::new(baseline.clone()),
            baseline,
            cameras: cameras
                .iter()
                .map(|c| (c.clone(), CameraStatus::Active))
                .collect(),
            ai_views: HashMap::new(),
        }
    }

    /// Startup state: seed alerts (if enabled) and stats computed from them
    pub fn from_config(config: &Config, now: DateTime<Utc>) -> Self {
        let cameras = &config.simulation.cameras;
        let alerts = if config.simulation.seed_alerts {
            seed::seed_alerts(now)
        } else {
            Vec::new()
        };
        let baseline = Stats::from_alerts(&alerts, cameras.len() as u32, now.date_naive());
        Self::new(config.monitor.clone(), alerts, baseline, cameras)
    }

    /// Stats snapshot the "refresh statistics" action returns to
    pub fn baseline(&self) -> &Stats {
        &self.baseline
    }

    /// Remove one alert. Statistics are left as they are.
    pub fn delete_alert(&mut self, id: u64, sink: &dyn NotificationSink) -> bool {
        let removed = self.alerts.delete_one(id);
        if removed {
            sink.notify(Notification::new(
                "Alert deleted",
                format!("Alert {} was removed from the log.", id),
                Severity::Info,
            ));
        }
        removed
    }

    pub fn delete_all_alerts(&mut self, sink: &dyn NotificationSink) {
        let count = self.alerts.len();
        self.alerts.delete_all();
        sink.notify(Notification::new(
            "Alerts cleared",
            format!("{} alerts were removed from the log.", count),
            Severity::Info,
        ));
    }

    /// Re-fetch the alert log: the seed set under fresh random ids
    pub fn refresh_alerts<R: Rng + ?Sized>(&mut self, rng: &mut R, sink: &dyn NotificationSink) {
        self.alerts.replace_all(seed::refreshed_alerts(Utc::now(), rng));
        sink.notify(Notification::new("Alerts refreshed", "", Severity::Info));
    }

    pub fn refresh_stats(&mut self, sink: &dyn NotificationSink) {
        self.stats.reset_to_baseline(self.baseline.clone());
        sink.notify(Notification::new("Statistics refreshed", "", Severity::Info));
    }

    pub fn cameras(&self) -> &BTreeMap<String, CameraStatus> {
        &self.cameras
    }

    pub fn camera_status(&self, camera_id: &str) -> Option<&CameraStatus> {
        self.cameras.get(camera_id)
    }

    /// Disable a feed after a permission or environment failure
    pub fn camera_failed(&mut self, camera_id: &str, err: &CameraAccessError) -> Banner {
        let banner = Banner::from(err);
        info!("Disabling feed {}: {}", camera_id, err);
        self.cameras
            .insert(camera_id.to_string(), CameraStatus::Disabled(banner.clone()));
        banner
    }

    pub fn camera_restored(&mut self, camera_id: &str) {
        self.cameras.insert(camera_id.to_string(), CameraStatus::Active);
    }

    pub fn ai_view(&self, trigger: &Trigger) -> Option<&AiOutcome> {
        self.ai_views.get(trigger)
    }

    pub fn ai_views(&self) -> &HashMap<Trigger, AiOutcome> {
        &self.ai_views
    }

    pub(crate) fn set_ai_view(&mut self, trigger: Trigger, outcome: AiOutcome) {
        self.ai_views.insert(trigger, outcome);
    }

    pub(crate) fn clear_ai_view(&mut self, trigger: &Trigger) {
        self.ai_views.remove(trigger);
    }
}
