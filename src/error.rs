use thiserror::Error;

use crate::types::Coord;

/// Errors raised by the construction environment.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnvError {
    #[error("Coordinate {coord} lies outside a grid of size {grid_size}")]
    OutOfBounds { coord: Coord, grid_size: usize },

    #[error("Invalid action code: {0} (expected 0..8)")]
    InvalidActionCode(usize),

    #[error("Target structure '{label}' has no occupied cells")]
    EmptyTarget { label: String },

    #[error("Reset requested without a target and no target generator is configured")]
    MissingTarget,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Episode is not running; call reset first")]
    EpisodeNotRunning,

    #[error("Grid size mismatch: expected {expected}, got {actual}")]
    GridSizeMismatch { expected: usize, actual: usize },
}

/// Errors raised while loading or saving target datasets.
#[cfg(feature = "serde")]
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] EnvError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_display() {
        let e = EnvError::OutOfBounds {
            coord: Coord::new(9, 0, 1),
            grid_size: 8,
        };
        assert_eq!(
            e.to_string(),
            "Coordinate (9, 0, 1) lies outside a grid of size 8"
        );
    }

    #[test]
    fn missing_target_display() {
        let s = EnvError::MissingTarget.to_string();
        assert!(s.contains("no target generator"));
    }

    #[test]
    fn empty_target_display() {
        let e = EnvError::EmptyTarget {
            label: "tower".into(),
        };
        assert_eq!(e.to_string(), "Target structure 'tower' has no occupied cells");
    }

    #[test]
    fn error_equality() {
        assert_eq!(EnvError::MissingTarget, EnvError::MissingTarget);
        assert_ne!(EnvError::MissingTarget, EnvError::EpisodeNotRunning);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn dataset_error_wraps_env_error() {
        let e: DatasetError = EnvError::MissingTarget.into();
        assert_eq!(e.to_string(), EnvError::MissingTarget.to_string());
    }
}
