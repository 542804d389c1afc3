//! Grader Error Types
//!
//! This module defines [`GraderError`], the single error type returned by the
//! aggregation, scoring, composition and approval operations.
//!
//! The first four variants follow the failure taxonomy of the engine:
//!
//! - [`GraderError::Structural`]: the test tree is malformed (cycle, duplicate sibling, too deep).
//! - [`GraderError::Validation`]: a score or category key is outside what the rubric allows.
//! - [`GraderError::Composition`]: a required rubric category is missing.
//! - [`GraderError::State`]: a verification-status transition is not allowed from the current state.
//!
//! None of these are ever turned into a zero score. A submission that fails with
//! one of them is ungraded, not failed.
//!
//! # Example
//!
//! ```rust
//! use grader::error::{GraderError, GraderResult};
//!
//! fn check_points(score: f64, possible: f64) -> GraderResult<()> {
//!     if score > possible {
//!         return Err(GraderError::Validation(format!("{score} exceeds {possible}")));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_points(11.0, 10.0).is_err());
//! ```

/// Every error the grading engine can produce.
#[derive(Debug, thiserror::Error)]
pub enum GraderError {
    /// Malformed or cyclic test tree. The message names the offending node.
    #[error("Structural error: {0}")]
    Structural(String),

    /// Score outside `[0, possiblePoints]` or unknown rubric category key.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A required rubric category was not supplied.
    #[error("Composition error: {0}")]
    Composition(String),

    /// Illegal verification-status transition. Stored state is left untouched.
    #[error("State error: {0}")]
    State(String),

    /// The grading configuration cannot serve this request.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GraderResult<T> = Result<T, GraderError>;
