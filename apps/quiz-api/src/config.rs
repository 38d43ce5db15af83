use axum_helpers::{CorsConfig, JwtConfig};
use core_config::{
    AppInfo, ConfigError, FromEnv, app_info, env_or_default, env_parse, server::ServerConfig,
};
use database::mongodb::ConnectionConfig;
use std::path::PathBuf;
use std::time::Duration;

pub use core_config::Environment;

pub const DEFAULT_QUESTIONS_PATH: &str = "data/questions.json";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Application-specific configuration
/// Composes shared config components from the `core_config`, `database` and `axum-helpers` libraries
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub mongodb: ConnectionConfig,
    pub cors: CorsConfig,
    pub jwt: JwtConfig,
    pub questions_path: PathBuf,
    /// Period of the stats log; `None` disables it
    pub monitor_interval: Option<Duration>,
    pub max_upload_bytes: usize,
    pub shutdown_timeout: Duration,
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        let monitor_ms: u64 = env_parse("MONGO_MONITOR_INTERVAL_MS", 0)?;

        Ok(Self {
            app: app_info!(),
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            mongodb: ConnectionConfig::from_env()?,
            cors: CorsConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            questions_path: PathBuf::from(env_or_default(
                "QUESTIONS_PATH",
                DEFAULT_QUESTIONS_PATH,
            )),
            monitor_interval: (monitor_ms > 0).then(|| Duration::from_millis(monitor_ms)),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            shutdown_timeout: Duration::from_secs(env_parse(
                "SHUTDOWN_TIMEOUT_SECS",
                DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            )?),
        })
    }
}
