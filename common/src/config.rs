use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::env;

/// Process configuration, read from the environment once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub grading_config_path: String,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    /// Loads `env_path` (if it exists) into the environment, then builds the
    /// process-wide config. Later calls return the first instance.
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();
        CONFIG.get_or_init(Self::from_env)
    }

    /// Builds a config from the current environment without touching the global.
    pub fn from_env() -> Self {
        let project_name = env::var("PROJECT_NAME").unwrap_or_else(|_| "grader".into());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/grader.log".into());
        let grading_config_path =
            env::var("GRADING_CONFIG_PATH").unwrap_or_else(|_| "config/grading.json".into());

        Config {
            project_name,
            log_level,
            log_file,
            grading_config_path,
        }
    }

    pub fn get() -> Option<&'static Self> {
        CONFIG.get()
    }
}
