use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use validator::Validate;

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading error: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Application configuration, loaded once at process start.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Redis connection URL (report cache)
    pub redis_url: String,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Apply embedded migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1, max = 200))]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    #[serde(default)]
    pub sweeper: SweeperConfig,
}

/// Cadence and grace periods for the two timeout passes. Read at startup,
/// not runtime-mutable.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SweeperConfig {
    /// How often the unpaid-timeout pass runs.
    #[serde(default = "default_unpaid_check_interval_secs")]
    #[validate(range(min = 1))]
    pub unpaid_check_interval_secs: u64,

    /// How long an order may sit unpaid before it is auto-cancelled.
    #[serde(default = "default_unpaid_grace_minutes")]
    #[validate(range(min = 1))]
    pub unpaid_grace_minutes: i64,

    /// How often the undelivered-timeout pass runs.
    #[serde(default = "default_undelivered_check_interval_secs")]
    #[validate(range(min = 1))]
    pub undelivered_check_interval_secs: u64,

    /// How long a delivery may stay in progress before it is force-completed.
    #[serde(default = "default_undelivered_grace_hours")]
    #[validate(range(min = 1))]
    pub undelivered_grace_hours: i64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            unpaid_check_interval_secs: default_unpaid_check_interval_secs(),
            unpaid_grace_minutes: default_unpaid_grace_minutes(),
            undelivered_check_interval_secs: default_undelivered_check_interval_secs(),
            undelivered_grace_hours: default_undelivered_grace_hours(),
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_unpaid_check_interval_secs() -> u64 {
    60
}

fn default_unpaid_grace_minutes() -> i64 {
    15
}

fn default_undelivered_check_interval_secs() -> u64 {
    86_400
}

fn default_undelivered_grace_hours() -> i64 {
    2
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Loads configuration from defaults, `config/{default,<env>}` files and
/// `APP__`-prefixed environment variables (later sources win).
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://takeout.db?mode=rwc")?
        .set_default("redis_url", "redis://127.0.0.1:6379")?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;
    app_config.sweeper.validate()?;
    Ok(app_config)
}

/// Initializes the global tracing subscriber. `RUST_LOG` wins over the
/// configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("takeout_api={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}
