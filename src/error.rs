//! Error types for the particle swarm engine.
//!
//! Host-facing seams (objective, result writer, observers) report failures
//! as plain strings; the driver wraps them here with the context it has.

use crate::optimization::solvers::optimizer::RunState;
use thiserror::Error;

/// Errors that can occur while configuring or running an optimization.
#[derive(Debug, Error)]
pub enum PsoError {
    /// A configuration value is outside its valid range.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        /// Name of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// A geometric primitive was built with negative extents.
    #[error("invalid geometry: width ({width}) and height ({height}) must be >= 0")]
    InvalidGeometry {
        /// Requested width
        width: f64,
        /// Requested height
        height: f64,
    },

    /// Vector lengths disagree with the swarm dimension.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        got: usize,
    },

    /// Two particles were compared while at least one had no fitness yet.
    #[error("cannot compare particles before both have been evaluated")]
    UnevaluatedComparison,

    /// The objective returned NaN, which is never a valid score.
    #[error("objective returned an invalid fitness ({value}) for particle {particle}")]
    InvalidFitness {
        /// Particle index within the swarm
        particle: usize,
        /// The rejected value
        value: f64,
    },

    /// The objective failed; the run is aborted.
    #[error("objective failed for particle {particle}: {message}")]
    Objective {
        /// Particle index within the swarm
        particle: usize,
        /// Message reported by the host
        message: String,
    },

    /// Writing the best result back into the host model failed.
    #[error("applying best result failed: {0}")]
    ApplyBest(String),

    /// A step observer failed.
    #[error("step observer failed: {0}")]
    Observer(String),

    /// A fixed-capacity history log was asked to hold more entries than it was sized for.
    #[error("history is full (capacity {capacity})")]
    HistoryFull {
        /// Capacity of the log
        capacity: usize,
    },

    /// The best result can only be applied after a normal termination.
    #[error("run has not terminated normally (state: {0:?})")]
    NotTerminated(RunState),

    /// The best result was already written back for this run.
    #[error("best result was already applied for this run")]
    AlreadyApplied,

    /// Reading a configuration file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing or serializing JSON failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for swarm operations.
pub type Result<T> = std::result::Result<T, PsoError>;

impl PsoError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        PsoError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a configuration-related error.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PsoError::InvalidConfig { .. } | PsoError::InvalidGeometry { .. }
        )
    }

    /// Returns `true` for errors caused by misuse of the API rather than by the host.
    ///
    /// This includes comparing unevaluated particles, dimension mismatches,
    /// history overflow and lifecycle violations around `apply_best`.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            PsoError::UnevaluatedComparison
                | PsoError::DimensionMismatch { .. }
                | PsoError::HistoryFull { .. }
                | PsoError::NotTerminated(_)
                | PsoError::AlreadyApplied
        )
    }

    /// Returns `true` if the objective caused the failure.
    pub fn is_evaluation_error(&self) -> bool {
        matches!(
            self,
            PsoError::Objective { .. } | PsoError::InvalidFitness { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PsoError::DimensionMismatch {
            expected: 3,
            got: 5,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, got 5");

        let err = PsoError::config("swarm_size", "must be > 0");
        assert_eq!(
            err.to_string(),
            "invalid configuration for `swarm_size`: must be > 0"
        );
    }

    #[test]
    fn test_error_categories() {
        let config_err = PsoError::config("max_steps", "must be > 0");
        let cmp_err = PsoError::UnevaluatedComparison;
        let eval_err = PsoError::Objective {
            particle: 2,
            message: "simulation diverged".into(),
        };

        assert!(config_err.is_config_error());
        assert!(!config_err.is_programmer_error());
        assert!(cmp_err.is_programmer_error());
        assert!(!cmp_err.is_evaluation_error());
        assert!(eval_err.is_evaluation_error());
        assert!(!eval_err.is_config_error());
    }
}
