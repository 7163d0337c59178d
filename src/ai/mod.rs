// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/watchpost-rs

//! Generative-AI collaborators - scene analysis and security reports
//!
//! The model behind these traits is a black box: the engine only relies on
//! the structured records going in and coming out. Calls are dispatched off
//! the engine loop and tracked per trigger point by [`InflightRegistry`].

mod inflight;
pub mod report;

#[cfg(feature = "ai-client")]
mod client;

pub use inflight::{InflightRegistry, Ticket};
pub use report::prepare_report_input;

#[cfg(feature = "ai-client")]
pub use client::OpenAiClient;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use base64::Engine as _;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AiError;

/// Emotion reported when nobody is in frame
pub const NO_PERSON_EMOTION: &str = "N/A";

/// Image handed to the analyzer: a remote URL or a `data:` URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_data_uri(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// Inline raw image bytes as a base64 data URI
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self(format!("data:{};base64,{}", mime, encoded))
    }

    /// Read an image file and inline it. The MIME type comes from the extension.
    pub fn from_file(path: &Path) -> Result<Self, AiError> {
        let mime = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => return Err(AiError::InvalidImage(format!("unsupported image type: {:?}", path))),
        };
        let bytes = std::fs::read(path)
            .map_err(|e| AiError::InvalidImage(format!("{:?}: {}", path, e)))?;
        Ok(Self::from_bytes(mime, &bytes))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_data_uri() {
            // data URIs can be megabytes long
            let head: String = self.0.chars().take(32).collect();
            write!(f, "{}...", head)
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Structured description of a camera frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub description: String,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub action: String,
    /// Perceived emotion of the person in frame, `N/A` if there is none
    #[serde(default)]
    pub emotion: String,
}

impl ImageAnalysis {
    /// Fill in the no-person emotion when the model left it blank
    pub fn normalized(mut self) -> Self {
        if self.emotion.trim().is_empty() {
            self.emotion = NO_PERSON_EMOTION.to_string();
        }
        self
    }
}

/// Pre-aggregated input for a security report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInput {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub anomalies: String,
    pub system_performance: String,
    pub configuration_changes: String,
}

/// Generated security report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityReport {
    pub summary: String,
    pub anomalies: String,
    pub system_performance: String,
    pub configuration_changes: String,
}

/// UI location an AI request was started from. At most one request per
/// trigger is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    /// "Analyze snapshot" on an alert's detail view
    AlertSnapshot(u64),
    /// "Analyze frame" on a live camera feed
    LiveFeed(String),
    /// The report generator form
    Report,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::AlertSnapshot(id) => write!(f, "alert #{} snapshot", id),
            Trigger::LiveFeed(camera) => write!(f, "live feed {}", camera),
            Trigger::Report => f.write_str("security report"),
        }
    }
}

/// Describes what is happening in a camera image
#[async_trait]
pub trait SceneAnalyzer: Send + Sync {
    async fn analyze_image(&self, image: &ImageRef) -> Result<ImageAnalysis, AiError>;
}

/// Writes a security report for a date range
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate_report(&self, input: &ReportInput) -> Result<SecurityReport, AiError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_emotion_becomes_na() {
        let analysis = ImageAnalysis {
            description: "Parking lot at night".to_string(),
            objects: vec!["car".to_string()],
            action: "idle".to_string(),
            emotion: " ".to_string(),
        }
        .normalized();
        assert_eq!(analysis.emotion, NO_PERSON_EMOTION);
    }

    #[test]
    fn test_missing_fields_deserialize() {
        let analysis: ImageAnalysis =
            serde_json::from_str(r#"{"description":"A cat on a wall"}"#).unwrap();
        assert!(analysis.objects.is_empty());
        assert_eq!(analysis.normalized().emotion, "N/A");
    }

    #[test]
    fn test_data_uri_from_bytes() {
        let image = ImageRef::from_bytes("image/png", &[0x89, 0x50, 0x4e, 0x47]);
        assert!(image.is_data_uri());
        assert_eq!(image.as_str(), "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn test_from_file_rejects_unknown_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.bmp");
        std::fs::write(&path, b"BM").unwrap();
        assert!(matches!(ImageRef::from_file(&path), Err(AiError::InvalidImage(_))));

        let jpg = dir.path().join("frame.JPG");
        std::fs::write(&jpg, [0xff, 0xd8, 0xff]).unwrap();
        assert!(ImageRef::from_file(&jpg).unwrap().as_str().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_report_wire_names() {
        let report = SecurityReport {
            summary: "ok".to_string(),
            anomalies: String::new(),
            system_performance: String::new(),
            configuration_changes: String::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("systemPerformance").is_some());
        assert!(json.get("configurationChanges").is_some());
    }
}
