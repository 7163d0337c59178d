//! Core engine module - owns the application state and drives the simulation loop

mod engine;
mod scheduler;
mod event_bus;
mod state;

pub use engine::{Engine, EngineHandle, StateSnapshot};
pub use scheduler::Scheduler;
pub use event_bus::{EventBus, Event, EventPayload, EventType};
pub use state::{AiOutcome, AppState, Banner, CameraStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How loudly a notification should be surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Confirmation of a user action
    Info,
    /// A new behavior alert
    Critical,
    /// A failed operation
    Destructive,
}

/// Transient message for the operator (toast / log line)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            timestamp: Utc::now(),
        }
    }
}

/// Receiver of operator notifications. Fire and forget.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}
