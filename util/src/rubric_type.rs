use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The rubric categories a submission is scored on.
///
/// Serialized as SCREAMING_SNAKE_CASE keys ("PASSOFF_TESTS", ...), which is also
/// the key format of the rubric item map in stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RubricType {
    PassoffTests,
    UnitTests,
    Quality,
    GitCommits,
}

impl RubricType {
    pub const ALL: [RubricType; 4] = [
        RubricType::PassoffTests,
        RubricType::UnitTests,
        RubricType::Quality,
        RubricType::GitCommits,
    ];

    /// The stored map key for this category.
    pub fn key(self) -> &'static str {
        match self {
            RubricType::PassoffTests => "PASSOFF_TESTS",
            RubricType::UnitTests => "UNIT_TESTS",
            RubricType::Quality => "QUALITY",
            RubricType::GitCommits => "GIT_COMMITS",
        }
    }

    /// Default human-readable category label.
    pub fn label(self) -> &'static str {
        match self {
            RubricType::PassoffTests => "Functionality",
            RubricType::UnitTests => "Unit Tests",
            RubricType::Quality => "Code Quality",
            RubricType::GitCommits => "Git Commits",
        }
    }
}

impl fmt::Display for RubricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for RubricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RubricType::ALL
            .into_iter()
            .find(|t| t.key() == s)
            .ok_or_else(|| format!("Unknown rubric category '{s}'"))
    }
}
