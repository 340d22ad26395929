use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// How PR status changes are checked before they are recorded.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusTransitionPolicy {
    /// Only moves allowed by the lifecycle table are accepted.
    #[default]
    Strict,
    /// Any status may be forced; every change is still recorded in history.
    Permissive,
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Shared secret every caller presents in `x-api-key`
    #[validate(length(min = 8))]
    pub store_access_key: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Insert the default role matrix when the permissions table is empty
    #[serde(default = "default_true_bool")]
    pub seed_default_permissions: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Capacity of the domain event channel
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Capacity of each per-table change feed channel
    #[serde(default = "default_realtime_channel_capacity")]
    #[validate(custom = "validate_channel_capacity")]
    pub realtime_channel_capacity: usize,

    #[serde(default)]
    pub status_transition_policy: StatusTransitionPolicy,

    /// Upper bound on rows written into a single export
    #[serde(default = "default_max_export_rows")]
    #[validate(range(min = 1))]
    pub max_export_rows: usize,
}

impl AppConfig {
    /// Builds a config with defaults for everything but the required keys.
    pub fn new(database_url: String, store_access_key: String, environment: String) -> Self {
        Self {
            database_url,
            store_access_key,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: true,
            seed_default_permissions: true,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            realtime_channel_capacity: default_realtime_channel_capacity(),
            status_transition_policy: StatusTransitionPolicy::default(),
            max_export_rows: default_max_export_rows(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Parsed list of allowed CORS origins, empty when unset.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections must not exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if self.is_production() && self.cors_origins().is_empty() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some("Set APP__CORS_ALLOWED_ORIGINS for production".into());
            errors.add("cors_allowed_origins", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true_bool() -> bool {
    true
}

fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    10
}
fn default_db_idle_timeout_secs() -> u64 {
    300
}
fn default_db_acquire_timeout_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_realtime_channel_capacity() -> usize {
    256
}

fn default_max_export_rows() -> usize {
    10_000
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("channel_capacity");
        err.message = Some("channel capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("assetdesk_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads configuration from `./config` for the profile named by `RUN_ENV`.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Layers built-in defaults, `<dir>/default`, `<dir>/<run_env>` and `APP__*`
/// environment variables, then validates the result.
pub fn load_config_from(dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir.display()
        );
    }

    // database_url and store_access_key have no defaults
    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    for key in ["database_url", "store_access_key"] {
        if config.get_string(key).is_err() {
            error!(
                "{} is not configured. Set APP__{} or add it to {}/default.toml",
                key,
                key.to_uppercase(),
                dir.display()
            );
            return Err(AppConfigError::Load(ConfigError::NotFound(format!(
                "{} is required but not configured",
                key
            ))));
        }
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
