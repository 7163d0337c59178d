// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/watchpost-rs

//! Event bus for inter-component communication

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::alerts::Alert;
use crate::config::MonitorConfig;
use super::{Banner, Notification, NotificationSink, Severity};

/// Event types in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Alert,
    Notification,
    Banner,
    ConfigChanged,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Alert(Alert),
    Notification(Notification),
    /// `banner` is `None` once the camera works again
    Banner { camera_id: String, banner: Option<Banner> },
    Config(MonitorConfig),
}

/// Central event bus for pub/sub communication
pub struct EventBus {
    alert_tx: broadcast::Sender<Alert>,
    notification_tx: broadcast::Sender<Notification>,
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (alert_tx, _) = broadcast::channel(capacity);
        let (notification_tx, _) = broadcast::channel(capacity);
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            alert_tx,
            notification_tx,
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish_alert(&self, alert: Alert) {
        let _ = self.alert_tx.send(alert.clone());
        self.publish_event(EventType::Alert, EventPayload::Alert(alert));
    }

    pub fn publish_notification(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => info!("{}: {}", notification.title, notification.description),
            Severity::Critical => warn!("{}: {}", notification.title, notification.description),
            Severity::Destructive => error!("{}: {}", notification.title, notification.description),
        }
        let _ = self.notification_tx.send(notification.clone());
        self.publish_event(EventType::Notification, EventPayload::Notification(notification));
    }

    pub fn publish_banner(&self, camera_id: &str, banner: Option<Banner>) {
        if let Some(ref b) = banner {
            warn!("Camera {} disabled: {}", camera_id, b.message);
        }
        self.publish_event(
            EventType::Banner,
            EventPayload::Banner {
                camera_id: camera_id.to_string(),
                banner,
            },
        );
    }

    pub fn publish_config(&self, config: MonitorConfig) {
        self.publish_event(EventType::ConfigChanged, EventPayload::Config(config));
    }

    fn publish_event(&self, event_type: EventType, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            timestamp: Utc::now(),
            payload,
        };
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<Alert> {
        self.alert_tx.subscribe()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notification_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl NotificationSink for EventBus {
    fn notify(&self, notification: Notification) {
        self.publish_notification(notification);
    }
}
