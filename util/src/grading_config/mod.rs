//! Grading configuration.
//!
//! A single JSON document describes how every phase is scored: which rubric
//! categories it has, how many points each is worth, the threshold a category
//! must reach for the submission to pass, and the policies applied around the
//! raw scores (zero-test rule, late penalty, commit requirements).
//!
//! Every field has a serde default, so `{}` is a valid configuration and yields
//! the same record as [`GradingConfig::default_config`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::phase::Phase;
use crate::rubric_type::RubricType;

/// What a category scores when its test tree contains no scorable tests.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ZeroTestPolicy {
    FullCredit, // nothing failed, so nothing is withheld
    NoCredit,   // nothing was graded, so nothing is earned
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringOptions {
    #[serde(default = "default_zero_test_policy")]
    pub zero_test_policy: ZeroTestPolicy,

    /// Deepest test tree accepted before aggregation fails.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            zero_test_policy: default_zero_test_policy(),
            max_tree_depth: default_max_tree_depth(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LatePolicy {
    /// Days beyond this are not penalised further.
    #[serde(default = "default_max_late_days")]
    pub max_late_days: u32,

    /// Fraction of the total possible score removed per late day (0.1 = 10%).
    #[serde(default = "default_per_day_penalty")]
    pub per_day_penalty: f64,
}

impl Default for LatePolicy {
    fn default() -> Self {
        Self {
            max_late_days: default_max_late_days(),
            per_day_penalty: default_per_day_penalty(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommitRequirements {
    #[serde(default = "default_required_commits")]
    pub required_commits: u32,

    #[serde(default = "default_required_days_with_commits")]
    pub required_days_with_commits: u32,

    /// A commit below this many changed lines does not count as significant.
    #[serde(default = "default_minimum_lines_changed_per_commit")]
    pub minimum_lines_changed_per_commit: u32,

    /// Penalty (percent) applied when a TA approves a submission that failed verification.
    #[serde(default = "default_commit_penalty_pct")]
    pub penalty_pct: u32,
}

impl Default for CommitRequirements {
    fn default() -> Self {
        Self {
            required_commits: default_required_commits(),
            required_days_with_commits: default_required_days_with_commits(),
            minimum_lines_changed_per_commit: default_minimum_lines_changed_per_commit(),
            penalty_pct: default_commit_penalty_pct(),
        }
    }
}

/// Scoring parameters of one rubric category within a phase.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RubricConfigItem {
    pub category: String,
    pub criteria: String,
    pub points: f64,
    /// Minimum score (in points) this category needs for the rubric to pass.
    #[serde(default)]
    pub passing_threshold: f64,
}

/// The categories configured for a phase. Every configured category is required.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PhaseRubricConfig {
    #[serde(default)]
    pub items: BTreeMap<RubricType, RubricConfigItem>,
}

impl PhaseRubricConfig {
    pub fn item(&self, rubric_type: RubricType) -> Option<&RubricConfigItem> {
        self.items.get(&rubric_type)
    }

    pub fn required(&self) -> impl Iterator<Item = RubricType> + '_ {
        self.items.keys().copied()
    }

    pub fn total_possible_points(&self) -> f64 {
        self.items.values().map(|i| i.points).sum()
    }

    /// Four-category rubric used for every numbered phase when no file is supplied.
    pub fn standard() -> Self {
        let mut items = BTreeMap::new();
        items.insert(
            RubricType::PassoffTests,
            RubricConfigItem {
                category: RubricType::PassoffTests.label().to_string(),
                criteria: "All required passoff tests pass".to_string(),
                points: 100.0,
                passing_threshold: 100.0,
            },
        );
        items.insert(
            RubricType::UnitTests,
            RubricConfigItem {
                category: RubricType::UnitTests.label().to_string(),
                criteria: "Unit tests cover the required cases and pass".to_string(),
                points: 25.0,
                passing_threshold: 0.0,
            },
        );
        items.insert(
            RubricType::Quality,
            RubricConfigItem {
                category: RubricType::Quality.label().to_string(),
                criteria: "Code passes the automated quality checks".to_string(),
                points: 30.0,
                passing_threshold: 0.0,
            },
        );
        items.insert(
            RubricType::GitCommits,
            RubricConfigItem {
                category: RubricType::GitCommits.label().to_string(),
                criteria: "Regular, meaningful commits since the previous phase".to_string(),
                points: 0.0,
                passing_threshold: 0.0,
            },
        );
        Self { items }
    }

    /// Quality-only rubric used for the `Quality` sentinel phase.
    pub fn quality_only() -> Self {
        let mut items = BTreeMap::new();
        items.insert(
            RubricType::Quality,
            RubricConfigItem {
                category: RubricType::Quality.label().to_string(),
                criteria: "Code passes the automated quality checks".to_string(),
                points: 30.0,
                passing_threshold: 0.0,
            },
        );
        Self { items }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GradingConfig {
    #[serde(default)]
    pub scoring: ScoringOptions,

    #[serde(default)]
    pub late_policy: LatePolicy,

    #[serde(default)]
    pub commit_requirements: CommitRequirements,

    #[serde(default = "default_phases")]
    pub phases: BTreeMap<Phase, PhaseRubricConfig>,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl GradingConfig {
    pub fn default_config() -> Self {
        GradingConfig {
            scoring: ScoringOptions::default(),
            late_policy: LatePolicy::default(),
            commit_requirements: CommitRequirements::default(),
            phases: default_phases(),
        }
    }

    /// Rubric configuration for `phase`, if the phase is configured.
    pub fn phase(&self, phase: Phase) -> Option<&PhaseRubricConfig> {
        self.phases.get(&phase)
    }

    /// Reads and parses a grading config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        use std::io::ErrorKind;

        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => format!("Grading config not found at {}", path.display()),
            ErrorKind::PermissionDenied => "Permission denied reading grading config".to_string(),
            _ => format!("Failed to read grading config ({})", e.kind()),
        })?;

        let config: GradingConfig = serde_json::from_str(&raw)
            .map_err(|e| format!("Invalid grading config JSON: {e}"))?;
        config.validate()?;

        tracing::debug!(path = %path.display(), phases = config.phases.len(), "Loaded grading config");
        Ok(config)
    }

    /// Rejects negative points, thresholds above their category's points, and
    /// penalties outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.late_policy.per_day_penalty) {
            return Err(format!(
                "late_policy.per_day_penalty must be within [0, 1], got {}",
                self.late_policy.per_day_penalty
            ));
        }
        if self.scoring.max_tree_depth == 0 {
            return Err("scoring.max_tree_depth must be at least 1".to_string());
        }
        for (phase, rubric) in &self.phases {
            for (rubric_type, item) in &rubric.items {
                if !item.points.is_finite() || item.points < 0.0 {
                    return Err(format!(
                        "{phase} {rubric_type}: points must be a non-negative number"
                    ));
                }
                if !item.passing_threshold.is_finite()
                    || item.passing_threshold < 0.0
                    || item.passing_threshold > item.points
                {
                    return Err(format!(
                        "{phase} {rubric_type}: passing_threshold must be within [0, {}]",
                        item.points
                    ));
                }
            }
        }
        Ok(())
    }
}

fn default_zero_test_policy() -> ZeroTestPolicy {
    ZeroTestPolicy::FullCredit
}

fn default_max_tree_depth() -> usize {
    512
}

fn default_max_late_days() -> u32 {
    5
}

fn default_per_day_penalty() -> f64 {
    0.1
}

fn default_required_commits() -> u32 {
    10
}

fn default_required_days_with_commits() -> u32 {
    3
}

fn default_minimum_lines_changed_per_commit() -> u32 {
    5
}

fn default_commit_penalty_pct() -> u32 {
    10
}

fn default_phases() -> BTreeMap<Phase, PhaseRubricConfig> {
    Phase::ALL
        .into_iter()
        .map(|phase| {
            let rubric = if phase.is_graded() {
                PhaseRubricConfig::standard()
            } else {
                PhaseRubricConfig::quality_only()
            };
            (phase, rubric)
        })
        .collect()
}
