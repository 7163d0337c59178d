//! Holder of the current monitor configuration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::MonitorConfig;
use crate::core::{Notification, NotificationSink, Severity};

/// One applied configuration update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigChange {
    pub at: DateTime<Utc>,
    /// `field: old -> new` lines
    pub changes: Vec<String>,
}

/// Single current [`MonitorConfig`], last write wins
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    current: MonitorConfig,
    history: Vec<ConfigChange>,
}

impl ConfigStore {
    pub fn new(initial: MonitorConfig) -> Self {
        Self {
            current: initial,
            history: Vec::new(),
        }
    }

    pub fn get(&self) -> MonitorConfig {
        self.current.clone()
    }

    /// Borrow without cloning, for readers inside the engine step
    pub fn current(&self) -> &MonitorConfig {
        &self.current
    }

    /// Replace the whole configuration. No validation happens here.
    pub fn update(&mut self, new_config: MonitorConfig, sink: &dyn NotificationSink) {
        let changes = describe_changes(&self.current, &new_config);
        if !changes.is_empty() {
            info!("Configuration updated: {}", changes.join(", "));
            self.history.push(ConfigChange {
                at: Utc::now(),
                changes,
            });
        }
        self.current = new_config;

        sink.notify(Notification::new(
            "Configuration Updated",
            "Your changes have been saved successfully.",
            Severity::Info,
        ));
    }

    /// Every update that changed at least one field, oldest first
    pub fn history(&self) -> &[ConfigChange] {
        &self.history
    }
}

/// Human-readable diff of two configurations
pub fn describe_changes(old: &MonitorConfig, new: &MonitorConfig) -> Vec<String> {
    let mut out = Vec::new();

    fn push<T: PartialEq + std::fmt::Display>(out: &mut Vec<String>, field: &str, a: T, b: T) {
        if a != b {
            out.push(format!("{}: {} -> {}", field, a, b));
        }
    }

    push(&mut out, "detection.confidence", old.detection.confidence, new.detection.confidence);
    push(&mut out, "behavior.fall.enabled", old.behavior.fall.enabled, new.behavior.fall.enabled);
    push(
        &mut out,
        "behavior.fall.velocity_threshold",
        old.behavior.fall.velocity_threshold,
        new.behavior.fall.velocity_threshold,
    );
    push(&mut out, "behavior.lying.enabled", old.behavior.lying.enabled, new.behavior.lying.enabled);
    push(&mut out, "behavior.lying.seconds", old.behavior.lying.seconds, new.behavior.lying.seconds);
    push(
        &mut out,
        "behavior.loitering.enabled",
        old.behavior.loitering.enabled,
        new.behavior.loitering.enabled,
    );
    push(
        &mut out,
        "behavior.loitering.seconds",
        old.behavior.loitering.seconds,
        new.behavior.loitering.seconds,
    );
    push(&mut out, "camera.source", old.camera.source.as_str(), new.camera.source.as_str());
    push(&mut out, "camera.fps", old.camera.fps, new.camera.fps);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::RecordingSink;

    #[test]
    fn test_update_replaces_and_notifies() {
        let sink = RecordingSink::default();
        let mut store = ConfigStore::default();

        let mut next = store.get();
        next.detection.confidence = 0.7;
        next.behavior.loitering.enabled = true;
        store.update(next.clone(), &sink);

        assert_eq!(store.get(), next);
        let sent = sink.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Configuration Updated");
        assert_eq!(sent[0].severity, Severity::Info);

        assert_eq!(store.history().len(), 1);
        assert_eq!(
            store.history()[0].changes,
            vec![
                "detection.confidence: 0.5 -> 0.7".to_string(),
                "behavior.loitering.enabled: false -> true".to_string(),
            ]
        );
    }

    #[test]
    fn test_unchanged_update_still_confirms() {
        let sink = RecordingSink::default();
        let mut store = ConfigStore::default();
        store.update(MonitorConfig::default(), &sink);
        assert!(store.history().is_empty());
        assert_eq!(sink.take().len(), 1);
    }

    #[test]
    fn test_store_does_not_validate() {
        let sink = RecordingSink::default();
        let mut store = ConfigStore::default();
        let mut bad = MonitorConfig::default();
        bad.camera.fps = 500;
        store.update(bad, &sink);
        assert_eq!(store.get().camera.fps, 500);
    }
}
