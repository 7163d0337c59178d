// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/watchpost-rs

//! Watchpost - Surveillance Monitoring Backend
//!
//! Headless core of a camera monitoring dashboard:
//! - Timed behavior-alert simulation (fall, lying motionless, loitering)
//! - Incremental alert statistics with a reset-to-baseline action
//! - Validated, versioned detection/behavior configuration
//! - AI scene analysis and security report generation with in-flight tracking
//! - CSV / JSON-lines alert export
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Watchpost Engine                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   Tick   ┌───────────────────────────┐    │
//! │  │ Scheduler │ ───────→ │        Engine task         │    │
//! │  └───────────┘          │  ┌────────┐ ┌───────────┐  │    │
//! │  ┌───────────┐ Command  │  │ Alerts │ │   Stats   │  │    │
//! │  │  Handles  │ ───────→ │  └────────┘ └───────────┘  │    │
//! │  └───────────┘          │  ┌────────┐ ┌───────────┐  │    │
//! │  ┌───────────┐  result  │  │ Config │ │ AI views  │  │    │
//! │  │ AI tasks  │ ───────→ │  └────────┘ └───────────┘  │    │
//! │  └───────────┘          └─────────────┬─────────────┘    │
//! │                                       ↓                  │
//! │  ┌───────────────────────────────────────────────────┐   │
//! │  │                     Event Bus                     │   │
//! │  └───────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod core;
pub mod alerts;
pub mod stats;
pub mod simulation;
pub mod ai;
pub mod config;
pub mod export;
pub mod error;

// Re-exports for convenience
pub use config::{Config, MonitorConfig};
pub use crate::core::{Engine, EngineHandle, EventBus, Notification, Severity};
pub use alerts::{Alert, AlertQuery, BehaviourType};
pub use stats::Stats;
pub use simulation::Simulator;
pub use export::{AlertExporter, ExportFormat};
pub use error::WatchError;

/// Watchpost version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Watchpost name
pub const NAME: &str = "Watchpost";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
        features: enabled_features(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
    /// Enabled features
    pub features: Vec<String>,
}

fn enabled_features() -> Vec<String> {
    let mut features = vec![];

    #[cfg(feature = "ai-client")]
    features.push("ai-client".to_string());

    features
}
