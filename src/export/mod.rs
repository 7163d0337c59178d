// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/watchpost-rs

//! Alert log export

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::alerts::Alert;

const CSV_HEADER: &str = "ID,Person ID,Behavior,Confidence,Timestamp,Camera";

/// Export format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    /// One JSON object per line
    JsonLines,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::JsonLines => "jsonl",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" | "jsonl" | "json_lines" => Ok(ExportFormat::JsonLines),
            other => Err(anyhow!("Unknown export format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// Export directory, relative to `data_dir` unless absolute
    pub path: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Csv,
            path: "exports".to_string(),
        }
    }
}

/// Writes the (already filtered) alert view out
pub struct AlertExporter {
    format: ExportFormat,
}

impl AlertExporter {
    pub fn new(format: ExportFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn export_alerts<W: Write>(&self, alerts: &[Alert], writer: &mut W) -> Result<()> {
        match self.format {
            ExportFormat::Csv => {
                writeln!(writer, "{}", CSV_HEADER)?;
                for alert in alerts {
                    writeln!(
                        writer,
                        "{},{},{},{},{},{}",
                        alert.id,
                        alert.person_id,
                        alert.behaviour_type,
                        alert.confidence,
                        alert.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                        csv_field(&alert.camera_id)
                    )?;
                }
            }
            ExportFormat::JsonLines => {
                for alert in alerts {
                    let json = serde_json::to_string(alert)?;
                    writeln!(writer, "{}", json)?;
                }
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// Write `alerts_<millis>.<ext>` into `dir`, creating it if needed
    pub fn export_to_dir(&self, alerts: &[Alert], dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "alerts_{}.{}",
            Utc::now().timestamp_millis(),
            self.format.extension()
        ));

        let file = File::create(&path)
            .map_err(|e| anyhow!("Failed to open export file {:?}: {}", path, e))?;
        let mut writer = BufWriter::new(file);
        self.export_alerts(alerts, &mut writer)?;

        info!("Exported {} alerts to {:?}", alerts.len(), path);
        Ok(path)
    }
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
