//! Error types for the chord analysis engine

use std::fmt;

/// Errors that can occur during chord analysis
///
/// Ambiguous audio is never an error: low tonality, silence and validator
/// disagreement are reported as low confidence in the result instead.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid input parameters (bad sample rate, ragged channels, non-finite samples, bad config)
    InvalidInput(String),

    /// Internal algorithm fault during analysis
    ProcessingError(String),

    /// Numerical error (non-finite intermediate values)
    NumericalError(String),

    /// The configured processing budget elapsed before the pipeline finished
    DeadlineExceeded {
        /// Time spent when the budget check failed, in milliseconds
        elapsed_ms: u64,
        /// Configured budget in milliseconds
        budget_ms: u64,
    },

    /// Result serialization failed
    SerializationError(String),
}

impl AnalysisError {
    /// `true` when the failure was caused by the caller's input rather than the engine
    pub fn is_input_error(&self) -> bool {
        matches!(self, AnalysisError::InvalidInput(_))
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            AnalysisError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            AnalysisError::DeadlineExceeded {
                elapsed_ms,
                budget_ms,
            } => write!(
                f,
                "Deadline exceeded: {} ms elapsed, budget {} ms",
                elapsed_ms, budget_ms
            ),
            AnalysisError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::SerializationError(err.to_string())
    }
}
