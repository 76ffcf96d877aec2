//! Error types for model construction and constraint setup.
//!
//! Evaluation itself never fails with an error: residuals, Jacobians and bias
//! terms are pure numeric reads. Errors are reported while building models,
//! contexts, evaluators and evaluator sets.

use thiserror::Error;

use crate::FrameId;

/// Errors that can occur while assembling kinematic constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Frame ID not present in the model.
    #[error("frame not found: {0}")]
    FrameNotFound(FrameId),

    /// No frame with the requested name.
    #[error("frame not found: {name}")]
    FrameNameNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// A frame with this name already exists.
    #[error("duplicate frame name: {name}")]
    DuplicateFrameName {
        /// The repeated name.
        name: String,
    },

    /// Joint axis cannot be normalized.
    #[error("invalid joint axis for frame {name}: axis must be finite and non-zero")]
    InvalidAxis {
        /// Name of the frame whose joint has the bad axis.
        name: String,
    },

    /// A state vector has the wrong length.
    #[error("{what} has length {actual}, expected {expected}")]
    DimensionMismatch {
        /// Which vector was wrong.
        what: &'static str,
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// An evaluator refers to a different model than the set it joins.
    #[error("evaluator '{name}' was built on a different model than this set")]
    ModelMismatch {
        /// Name of the rejected evaluator.
        name: String,
    },

    /// Evaluator index out of range.
    #[error("evaluator {index} not found (set has {len})")]
    EvaluatorNotFound {
        /// Requested index.
        index: usize,
        /// Number of evaluators in the set.
        len: usize,
    },

    /// Active-row indices are out of range or not strictly increasing.
    #[error("invalid active rows {indices:?} for evaluator of length {length}")]
    InvalidActiveRows {
        /// Offending indices.
        indices: Vec<usize>,
        /// Evaluator length.
        length: usize,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },
}

impl SimError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a frame-name lookup error.
    #[must_use]
    pub fn frame_name_not_found(name: impl Into<String>) -> Self {
        Self::FrameNameNotFound { name: name.into() }
    }

    /// Create a dimension mismatch error.
    #[must_use]
    pub const fn dimension_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Check if this error is about a missing frame.
    #[must_use]
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            Self::FrameNotFound(_) | Self::FrameNameNotFound { .. }
        )
    }
}
