//! Error types for learning-rate control.

use thiserror::Error;

/// Errors raised while constructing a controller, schedule, or score.
///
/// These are fatal: an invalid configuration is a programming error in the
/// calling training loop and is never recovered internally.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Shrink factor outside the open interval (0, 1).
    #[error("factor must be in (0, 1), got {value}")]
    InvalidFactor {
        /// Rejected factor value.
        value: f64,
    },

    /// Per-group floor list does not match the number of parameter groups.
    #[error("expected {expected} min values (one per parameter group), got {actual}")]
    FloorCountMismatch {
        /// Number of parameter groups on the bound optimizer.
        expected: usize,
        /// Length of the supplied floor list.
        actual: usize,
    },

    /// The bound optimizer exposes no parameter groups.
    #[error("optimizer has no parameter groups")]
    NoParamGroups,

    /// A step count that must be positive was zero.
    #[error("{name} must be positive")]
    ZeroSteps {
        /// Name of the offending parameter.
        name: &'static str,
    },

    /// Warmup longer than the whole schedule.
    #[error("warmup_steps ({warmup}) exceeds total_steps ({total})")]
    WarmupExceedsTotal {
        /// Configured warmup steps.
        warmup: u64,
        /// Configured total steps.
        total: u64,
    },

    /// Invalid learning-rate bound for a schedule.
    #[error("invalid {name}: {value} (must be positive and finite)")]
    InvalidRate {
        /// Name of the parameter.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// An evaluation score was built without a loss entry.
    #[error("score map must contain a \"loss\" entry")]
    MissingLoss,
}

/// Error for metric values the controller cannot compare.
///
/// Fatal for that `step` call only; the caller decides whether to skip the
/// round or abort training.
#[derive(Debug, Error)]
pub enum MetricError {
    /// The primary metric was NaN or infinite.
    #[error("primary metric is not finite: {value}")]
    NonFinitePrimary {
        /// Rejected value.
        value: f64,
    },

    /// The auxiliary metric was NaN or infinite.
    #[error("auxiliary metric is not finite: {value}")]
    NonFiniteAuxiliary {
        /// Rejected value.
        value: f64,
    },
}
