//! Late submission penalty.
//!
//! Each late day removes a fixed fraction of the phase's total possible score,
//! up to the configured cap on penalised days. Scores never drop below zero.

use util::grading_config::LatePolicy;

/// Outcome of applying the late policy to one score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatePenalty {
    pub days_late: u32,
    /// Days actually penalised after the cap.
    pub days_penalized: u32,
    /// Fraction of the total removed (0.3 = 30%).
    pub fraction: f64,
    pub adjusted_score: f64,
}

impl LatePenalty {
    /// "N days late. -X%", or `None` when on time.
    pub fn note(&self) -> Option<String> {
        if self.days_penalized == 0 {
            return None;
        }
        Some(format!(
            "{} days late. -{}%",
            self.days_penalized,
            (self.fraction * 100.0).round()
        ))
    }
}

pub fn apply_late_penalty(
    policy: &LatePolicy,
    score: f64,
    total_possible: f64,
    days_late: u32,
) -> LatePenalty {
    let days_penalized = days_late.min(policy.max_late_days);
    let fraction = days_penalized as f64 * policy.per_day_penalty;
    let adjusted_score = (score - fraction * total_possible).max(0.0);

    if days_penalized > 0 {
        tracing::debug!(days_late, days_penalized, fraction, score, adjusted_score, "Applied late penalty");
    }

    LatePenalty {
        days_late,
        days_penalized,
        fraction,
        adjusted_score,
    }
}
