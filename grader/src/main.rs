use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use common::config::Config;
use common::logger::init_logger;
use grader::command::grade_files;

#[derive(Parser, Debug)]
#[command(version, about = "Grade one submission and print the result as JSON")]
struct Args {
    /// Grading request JSON (identity, phase, per-category results)
    #[arg(long)]
    request: PathBuf,
    /// Environment file read before the process config is built
    #[arg(long, default_value = ".env")]
    env: String,
    /// Grading config JSON. Overrides GRADING_CONFIG_PATH
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::init(&args.env);
    init_logger(&config.log_level, &config.log_file)
        .with_context(|| format!("initialising logger at {}", config.log_file))?;

    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(&config.grading_config_path));
    tracing::info!("[{}] grading {}", config.project_name, args.request.display());

    let response = grade_files(&args.request, &config_path).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
