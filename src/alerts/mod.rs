// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/watchpost-rs

//! Alert records and the in-memory alert store

mod query;
pub mod seed;

pub use query::*;

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Closed set of behaviors the monitor reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviourType {
    Fall,
    LyingMotionless,
    Loitering,
}

impl BehaviourType {
    /// Every behavior, in display order
    pub const ALL: [BehaviourType; 3] = [
        BehaviourType::Fall,
        BehaviourType::LyingMotionless,
        BehaviourType::Loitering,
    ];

    /// Wire name, e.g. `lying_motionless`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fall => "fall",
            Self::LyingMotionless => "lying_motionless",
            Self::Loitering => "loitering",
        }
    }

    /// Human label, e.g. `lying motionless`
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for BehaviourType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BehaviourType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "fall" => Ok(Self::Fall),
            "lying_motionless" | "lying" => Ok(Self::LyingMotionless),
            "loitering" => Ok(Self::Loitering),
            other => Err(format!("unknown behaviour type '{}'", other)),
        }
    }
}

/// A detected anomalous behavior event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub person_id: u32,
    pub behaviour_type: BehaviourType,
    /// Detection certainty in [0, 1]
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub camera_id: String,
    /// Remote URL or data URI of the associated frame
    pub snapshot_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Ordered alert collection, most recent first
#[derive(Debug, Clone, Default)]
pub struct AlertStore {
    alerts: VecDeque<Alert>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding `alerts` in the given order
    pub fn with_alerts(alerts: Vec<Alert>) -> Self {
        Self {
            alerts: alerts.into(),
        }
    }

    /// Snapshot of every alert, front first
    pub fn list(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    /// Prepend an alert
    pub fn insert(&mut self, alert: Alert) {
        debug!("Stored alert {} ({})", alert.id, alert.behaviour_type);
        self.alerts.push_front(alert);
    }

    /// Remove the alert with `id`. Unknown ids are ignored.
    pub fn delete_one(&mut self, id: u64) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != id);
        before != self.alerts.len()
    }

    pub fn delete_all(&mut self) {
        self.alerts.clear();
    }

    /// Swap the whole collection, used when alerts are re-fetched
    pub fn replace_all(&mut self, alerts: Vec<Alert>) {
        self.alerts = alerts.into();
    }

    /// Next free id: one past the largest stored id
    pub fn next_id(&self) -> u64 {
        self.alerts.iter().map(|a| a.id).max().unwrap_or(0) + 1
    }
}

#[cfg(test)]
pub(crate) fn test_alert(id: u64, behaviour_type: BehaviourType, confidence: f64) -> Alert {
    Alert {
        id,
        person_id: 1,
        behaviour_type,
        confidence,
        timestamp: Utc::now(),
        camera_id: "cam-01".to_string(),
        snapshot_path: "/placeholders/snapshot-1.png".to_string(),
        metadata: None,
    }
}
