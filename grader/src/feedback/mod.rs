//! # Feedback Strategies Module
//!
//! Notes strategies implementing [`crate::traits::feedback::Feedback`].
//!
//! ## Available Strategies
//!
//! - [`auto_feedback`]: summarises the test run of each category (pass/fail, harness errors, extra credit).

pub mod auto_feedback;
