// src/ai/connector.rs
use serde::Serialize;
use std::fmt;

use crate::capture::frame::Frame;

pub const ERROR_LABEL: &str = "Error";

/// Label and score shown to the user. Failures are results too, labelled "Error...".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub label: String,
    pub score: i64,
    failed: bool,
}

impl ClassificationResult {
    pub fn new(label: impl Into<String>, score: i64) -> Self {
        Self {
            label: label.into(),
            score,
            failed: false,
        }
    }

    fn failure(label: String) -> Self {
        Self {
            label,
            score: 0,
            failed: true,
        }
    }

    /// Transport or parse failure.
    pub fn error() -> Self {
        Self::failure(ERROR_LABEL.to_string())
    }

    /// Endpoint answered with something other than 200.
    pub fn http_error(status: u16) -> Self {
        Self::failure(format!("{}: {}", ERROR_LABEL, status))
    }

    /// Set only by the error constructors, never inferred from the label.
    pub fn is_error(&self) -> bool {
        self.failed
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Classification: {}\nPoints: {}", self.label, self.score)
    }
}

/// Trait defining the interface for frame classification
pub trait ImageClassifier: Send + Sync {
    /// Classify one frame. Never fails: errors come back as error results.
    fn classify(&self, frame: Frame) -> ClassificationResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_results_carry_status_and_zero_score() {
        assert_eq!(ClassificationResult::http_error(404).label, "Error: 404");
        assert!(ClassificationResult::http_error(500).is_error());
        assert!(ClassificationResult::error().is_error());
        assert!(!ClassificationResult::new("Banana", 10).is_error());
    }

    #[test]
    fn model_labels_that_look_like_errors_are_not_errors() {
        assert!(!ClassificationResult::new("Errorfish", 0).is_error());
        assert!(!ClassificationResult::new(ERROR_LABEL, 0).is_error());
        assert_ne!(ClassificationResult::new("Error: 404", 0), ClassificationResult::http_error(404));
    }

    #[test]
    fn json_output_marks_failures() {
        let json = serde_json::to_value(ClassificationResult::http_error(503)).unwrap();
        assert_eq!(json["label"], "Error: 503");
        assert_eq!(json["score"], 0);
        assert_eq!(json["failed"], true);
    }

    #[test]
    fn display_matches_console_layout() {
        let result = ClassificationResult::new("Banana", 10);
        assert_eq!(result.to_string(), "Classification: Banana\nPoints: 10");
    }
}
