//! Error types for the tuning engines.
//!
//! Three families, matching how the driver must react:
//! - [`ProtocolError`]: the get/submit/advance sequence was violated
//! - [`CheckpointError`]: a persisted record cannot be decoded
//! - `Io` / `Csv`: the blob store is unavailable; the engine keeps its
//!   in-memory state and the driver may carry on without that save

use thiserror::Error;

/// Misuse of the trial protocol
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Neither `initialize()` nor a successful checkpoint load happened yet.
    #[error("engine is not initialized: call initialize() or load a checkpoint first")]
    NotInitialized,

    /// `submit_trial_cost()` without a preceding `get_current_parameters()`.
    #[error("no candidate handed out for generation {generation}, member {member}")]
    NoCandidate {
        /// Current generation
        generation: usize,
        /// Current member
        member: usize,
    },

    /// Cost submitted twice, or parameters requested after the cost was recorded.
    #[error("cost already recorded for generation {generation}, member {member}; call advance()")]
    AlreadyEvaluated {
        /// Current generation
        generation: usize,
        /// Current member
        member: usize,
    },

    /// `advance()` before the cost of the current member was submitted.
    #[error("cost not yet recorded for generation {generation}, member {member}")]
    NotEvaluated {
        /// Current generation
        generation: usize,
        /// Current member
        member: usize,
    },

    /// NaN or infinite cost; the current member still awaits a usable one.
    #[error("non-finite cost submitted for generation {generation}, member {member}")]
    InvalidCost {
        /// Current generation
        generation: usize,
        /// Current member
        member: usize,
    },
}

/// A checkpoint record that cannot be turned back into engine state
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("not a checkpoint record (bad magic {found:?})")]
    BadMagic { found: [u8; 4] },

    #[error("unsupported checkpoint format version {found} (expected {expected})")]
    UnsupportedVersion { expected: u16, found: u16 },

    #[error("checkpoint belongs to engine tag {found}, expected {expected}")]
    EngineMismatch { expected: u8, found: u8 },

    #[error(
        "checkpoint shape {population}x{dimensions} does not match configured {expected_population}x{expected_dimensions}"
    )]
    ShapeMismatch {
        expected_population: usize,
        expected_dimensions: usize,
        population: usize,
        dimensions: usize,
    },

    #[error("checkpoint has {found} bytes, expected {expected}")]
    SizeMismatch { expected: usize, found: usize },

    #[error("invalid trial phase tag {0}")]
    InvalidPhase(u8),

    #[error("{field} = {value} is out of range (limit {limit})")]
    IndexOutOfRange { field: &'static str, value: usize, limit: usize },

    #[error("checkpoint schedule spans {found} iterations, configured {expected}")]
    ScheduleMismatch { expected: usize, found: usize },
}

/// Errors that can occur while driving an engine
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("corrupt checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("log write error: {0}")]
    Csv(#[from] csv::Error),

    /// Population is too small for the chosen algorithm.
    #[error("population size ({pop_size}) must be >= {min}")]
    PopulationTooSmall { pop_size: usize, min: usize },

    /// A lower bound exceeds its upper bound, or one of them is not finite.
    #[error("invalid bounds for gene {index}: lower ({lower}) > upper ({upper})")]
    InvalidBounds { index: usize, lower: f64, upper: f64 },

    #[error("max_iterations must be > 0")]
    NoIterations,

    #[error("invalid mutation factor: {factor} (must be in [0, 2])")]
    InvalidMutationFactor { factor: f64 },

    #[error("invalid crossover rate: {rate} (must be in [0, 1])")]
    InvalidCrossoverRate { rate: f64 },

    /// A PSO coefficient or inertia weight is NaN or infinite.
    #[error("invalid {name}: {value} (must be finite)")]
    InvalidCoefficient { name: &'static str, value: f64 },
}

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, OptimizerError>;

impl OptimizerError {
    /// Returns `true` if the caller broke the get/submit/advance sequence.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, OptimizerError::Protocol(_))
    }

    /// Returns `true` if the blob store failed; in-memory state is still valid.
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, OptimizerError::Io(_) | OptimizerError::Csv(_))
    }

    /// Returns `true` if this is a configuration-related error.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            OptimizerError::PopulationTooSmall { .. }
                | OptimizerError::InvalidBounds { .. }
                | OptimizerError::NoIterations
                | OptimizerError::InvalidMutationFactor { .. }
                | OptimizerError::InvalidCrossoverRate { .. }
                | OptimizerError::InvalidCoefficient { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OptimizerError::from(ProtocolError::NoCandidate { generation: 2, member: 1 });
        assert_eq!(
            err.to_string(),
            "protocol violation: no candidate handed out for generation 2, member 1"
        );
    }

    #[test]
    fn test_categories() {
        let protocol = OptimizerError::from(ProtocolError::NotInitialized);
        let io = OptimizerError::from(std::io::Error::other("card removed"));
        let config = OptimizerError::PopulationTooSmall { pop_size: 2, min: 4 };

        assert!(protocol.is_protocol_error());
        assert!(!protocol.is_persistence_error());
        assert!(io.is_persistence_error());
        assert!(config.is_config_error());
        assert!(!config.is_protocol_error());
    }
}
