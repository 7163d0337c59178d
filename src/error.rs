// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/watchpost-rs

//! Error types shared across the crate

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level library error
#[derive(Debug, Error)]
pub enum WatchError {
    /// Input rejected at the boundary
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Camera could not be opened
    #[error("camera unavailable: {0}")]
    Camera(#[from] CameraAccessError),

    /// Generative-AI collaborator failed
    #[error(transparent)]
    Ai(#[from] AiError),

    /// A request for this trigger point is already running
    #[error("a request for {0} is already in flight")]
    Busy(String),

    /// No AI collaborator was configured
    #[error("AI collaborator is not configured")]
    AiUnavailable,

    /// The simulator has no cameras to attribute alerts to
    #[error("simulation needs at least one camera")]
    NoCameras,

    /// The engine task is gone
    #[error("engine is not running")]
    EngineStopped,
}

/// A single field-level validation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `behavior.lying.seconds`
    pub field: String,
    /// Human-readable message shown next to the field
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All validation failures collected for one submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", join_messages(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(ValidationError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Look up the message attached to a field
    pub fn field(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Permission or environment failure when opening a camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum CameraAccessError {
    #[error("camera access was denied")]
    Denied,
    #[error("camera capture is not supported in this environment")]
    Unsupported,
}

/// Failure of a generative-AI call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    /// Request never reached the provider or the connection dropped
    #[error("request failed: {0}")]
    Transport(String),

    /// Provider answered with a non-success status
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Provider answered but the body did not match the expected record
    #[error("malformed response: {0}")]
    Malformed(String),

    /// No answer within the configured cap
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The image reference could not be read or encoded
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

#[cfg(feature = "ai-client")]
impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for AiError {
    fn from(err: serde_json::Error) -> Self {
        AiError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_display() {
        let mut errors = ValidationErrors::default();
        errors.push("camera.fps", "FPS must be between 1 and 60.");
        errors.push("camera.source", "Camera source cannot be empty.");

        assert_eq!(
            errors.to_string(),
            "camera.fps: FPS must be between 1 and 60.; camera.source: Camera source cannot be empty."
        );
        let err: WatchError = errors.into();
        assert!(err.to_string().starts_with("validation failed: camera.fps:"));
    }

    #[test]
    fn test_single_validation_error_display() {
        let err = ValidationError::new("dateRange", "The start date must not be after the end date.");
        assert_eq!(err.to_string(), "dateRange: The start date must not be after the end date.");
    }
}
