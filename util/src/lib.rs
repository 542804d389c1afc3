//! Shared building blocks for the grading workspace.
//!
//! - [`phase`]: the ordered set of course milestones a submission can target.
//! - [`rubric_type`]: the closed set of rubric category keys.
//! - [`grading_config`]: the JSON grading configuration (points, thresholds, policies).

pub mod grading_config;
pub mod phase;
pub mod rubric_type;
