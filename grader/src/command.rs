//! File-driven grading used by the `grade` binary.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use util::grading_config::GradingConfig;

use crate::ledger::SubmissionLedger;
use crate::report::GradeReportResponse;
use crate::{GradingJob, GradingRequest};

/// Loads the grading config at `config_path`, or the built-in defaults when
/// the file does not exist.
pub fn load_grading_config(config_path: &Path) -> Result<GradingConfig> {
    if config_path.exists() {
        GradingConfig::load(config_path).map_err(|e| anyhow!(e))
    } else {
        tracing::warn!(
            "Grading config {} not found, using built-in defaults",
            config_path.display()
        );
        Ok(GradingConfig::default_config())
    }
}

/// Grades the request stored at `request_path` and records it in `ledger`,
/// approving it automatically when it qualifies.
pub async fn grade_file(
    request_path: &Path,
    grading_config: &GradingConfig,
    ledger: &SubmissionLedger,
) -> Result<GradeReportResponse> {
    let raw = fs::read_to_string(request_path)
        .with_context(|| format!("reading {}", request_path.display()))?;
    let request = GradingRequest::from_json(&raw)
        .with_context(|| format!("parsing {}", request_path.display()))?;

    tracing::info!(
        "grading {} for {}",
        request.identity.head_hash,
        request.identity.net_id
    );
    let graded = GradingJob::new(grading_config).grade(request)?;
    let submission = ledger.record_and_approve(graded).await?;
    Ok(GradeReportResponse::from(submission))
}

/// Grades one request file against the config file at `config_path`.
pub async fn grade_files(request_path: &Path, config_path: &Path) -> Result<GradeReportResponse> {
    let grading_config = load_grading_config(config_path)?;
    grade_file(request_path, &grading_config, &SubmissionLedger::new()).await
}
