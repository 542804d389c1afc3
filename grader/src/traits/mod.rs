//!
//! Traits Module
//!
//! Extension points of the grader.
//!
//! - [`feedback`]: strategies that write the notes attached to each rubric category.

pub mod feedback;
