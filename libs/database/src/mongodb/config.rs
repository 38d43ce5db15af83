#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_duration_ms, env_parse, env_required};
use mongodb::options::{
    Acknowledgment, ClientOptions, Compressor, ReadPreference, SelectionCriteria, WriteConcern,
};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Write acknowledgment level requested from the server
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteConcernLevel {
    Majority,
    Nodes(u32),
    Tag(String),
}

impl FromStr for WriteConcernLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("write concern cannot be empty".to_string());
        }
        if s.eq_ignore_ascii_case("majority") {
            return Ok(Self::Majority);
        }
        Ok(s.parse::<u32>()
            .map(Self::Nodes)
            .unwrap_or_else(|_| Self::Tag(s.to_string())))
    }
}

impl From<&WriteConcernLevel> for Acknowledgment {
    fn from(level: &WriteConcernLevel) -> Self {
        match level {
            WriteConcernLevel::Majority => Acknowledgment::Majority,
            WriteConcernLevel::Nodes(n) => Acknowledgment::Nodes(*n),
            WriteConcernLevel::Tag(tag) => Acknowledgment::Custom(tag.clone()),
        }
    }
}

/// Which replica-set members reads may be routed to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadPreferenceMode {
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

impl FromStr for ReadPreferenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "primarypreferred" => Ok(Self::PrimaryPreferred),
            "secondary" => Ok(Self::Secondary),
            "secondarypreferred" => Ok(Self::SecondaryPreferred),
            "nearest" => Ok(Self::Nearest),
            other => Err(format!("unknown read preference '{other}'")),
        }
    }
}

impl From<ReadPreferenceMode> for ReadPreference {
    fn from(mode: ReadPreferenceMode) -> Self {
        match mode {
            ReadPreferenceMode::Primary => ReadPreference::Primary,
            ReadPreferenceMode::PrimaryPreferred => ReadPreference::PrimaryPreferred {
                options: Default::default(),
            },
            ReadPreferenceMode::Secondary => ReadPreference::Secondary {
                options: Default::default(),
            },
            ReadPreferenceMode::SecondaryPreferred => ReadPreference::SecondaryPreferred {
                options: Default::default(),
            },
            ReadPreferenceMode::Nearest => ReadPreference::Nearest {
                options: Default::default(),
            },
        }
    }
}

/// Wire compression negotiated with the server
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Disabled,
    Zlib,
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" => Ok(Self::Disabled),
            "zlib" => Ok(Self::Zlib),
            other => Err(format!("unsupported compressor '{other}' (expected zlib or none)")),
        }
    }
}

/// MongoDB connection configuration
///
/// Built once at startup and never mutated. Defaults mirror the production
/// deployment: a 5–20 connection pool, 30s idle reaping, 5s server selection,
/// majority writes, `primaryPreferred` reads and zlib compression.
///
/// # Example
///
/// ```ignore
/// use database::mongodb::ConnectionConfig;
///
/// let config = ConnectionConfig::new("mongodb://localhost:27017/quiz")
///     .with_pool_size(50, 10)
///     .with_app_name("quiz-api");
/// ```
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Connection string: mongodb[+srv]://[user:pass@]host[:port][/database][?options]
    pub uri: String,
    /// Overrides the database named in the URI
    pub database: Option<String>,
    pub app_name: Option<String>,
    pub min_pool_size: u32,
    pub max_pool_size: u32,
    /// Idle pooled connections are closed after this long
    pub max_idle_time: Duration,
    pub server_selection_timeout: Duration,
    /// Upper bound for each round-trip issued by the connection manager itself
    pub socket_timeout: Duration,
    pub heartbeat_frequency: Duration,
    pub retry_writes: bool,
    pub retry_reads: bool,
    pub write_concern: WriteConcernLevel,
    pub write_concern_timeout: Duration,
    pub read_preference: ReadPreferenceMode,
    pub compression: Compression,
}

// Manual impl keeps credentials in the URI out of logs.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("uri", &redact_uri(&self.uri))
            .field("database", &self.database)
            .field("app_name", &self.app_name)
            .field("min_pool_size", &self.min_pool_size)
            .field("max_pool_size", &self.max_pool_size)
            .field("max_idle_time", &self.max_idle_time)
            .field("server_selection_timeout", &self.server_selection_timeout)
            .field("socket_timeout", &self.socket_timeout)
            .field("heartbeat_frequency", &self.heartbeat_frequency)
            .field("retry_writes", &self.retry_writes)
            .field("retry_reads", &self.retry_reads)
            .field("write_concern", &self.write_concern)
            .field("write_concern_timeout", &self.write_concern_timeout)
            .field("read_preference", &self.read_preference)
            .field("compression", &self.compression)
            .finish()
    }
}

impl ConnectionConfig {
    /// Create a config for `uri` with the default pool and timeout settings
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: None,
            app_name: None,
            min_pool_size: 5,
            max_pool_size: 20,
            max_idle_time: Duration::from_millis(30_000),
            server_selection_timeout: Duration::from_millis(5_000),
            socket_timeout: Duration::from_millis(45_000),
            heartbeat_frequency: Duration::from_millis(10_000),
            retry_writes: true,
            retry_reads: true,
            write_concern: WriteConcernLevel::Majority,
            write_concern_timeout: Duration::from_millis(5_000),
            read_preference: ReadPreferenceMode::PrimaryPreferred,
            compression: Compression::Zlib,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_pool_size(mut self, max_pool_size: u32, min_pool_size: u32) -> Self {
        self.max_pool_size = max_pool_size;
        self.min_pool_size = min_pool_size;
        self
    }

    /// Set the application name for server logs
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    /// Connection string with any password replaced, safe for logs
    pub fn redacted_uri(&self) -> String {
        redact_uri(&self.uri)
    }

    /// Rejects combinations the driver would only report at connect time.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_pool_size == 0 {
            return Err("max pool size must be at least 1".to_string());
        }
        if self.min_pool_size > self.max_pool_size {
            return Err(format!(
                "min pool size ({}) exceeds max pool size ({})",
                self.min_pool_size, self.max_pool_size
            ));
        }
        Ok(())
    }

    /// Copy every pool, timeout, retry and durability setting onto parsed driver options.
    pub fn apply_to(&self, options: &mut ClientOptions) {
        options.min_pool_size = Some(self.min_pool_size);
        options.max_pool_size = Some(self.max_pool_size);
        options.max_idle_time = Some(self.max_idle_time);
        options.server_selection_timeout = Some(self.server_selection_timeout);
        options.heartbeat_freq = Some(self.heartbeat_frequency);
        options.retry_writes = Some(self.retry_writes);
        options.retry_reads = Some(self.retry_reads);
        options.write_concern = Some(
            WriteConcern::builder()
                .w(Acknowledgment::from(&self.write_concern))
                .w_timeout(self.write_concern_timeout)
                .build(),
        );
        options.selection_criteria = Some(SelectionCriteria::ReadPreference(
            self.read_preference.into(),
        ));
        options.compressors = match self.compression {
            Compression::Disabled => None,
            Compression::Zlib => Some(vec![Compressor::Zlib { level: None }]),
        };

        if let Some(ref app_name) = self.app_name {
            options.app_name = Some(app_name.clone());
        }
        if let Some(ref database) = self.database {
            options.default_database = Some(database.clone());
        }
    }
}

fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => uri.to_string(),
    }
}

/// Load ConnectionConfig from environment variables
///
/// Environment variables:
/// - `MONGO_URI` (required)
/// - `MONGO_DATABASE` (optional) - overrides the database in the URI
/// - `MONGO_APP_NAME` (optional)
/// - `MONGO_MIN_POOL_SIZE` / `MONGO_MAX_POOL_SIZE` (default: 5 / 20)
/// - `MONGO_MAX_IDLE_TIME_MS` (default: 30000)
/// - `MONGO_SERVER_SELECTION_TIMEOUT_MS` (default: 5000)
/// - `MONGO_SOCKET_TIMEOUT_MS` (default: 45000)
/// - `MONGO_HEARTBEAT_FREQUENCY_MS` (default: 10000)
/// - `MONGO_RETRY_WRITES` / `MONGO_RETRY_READS` (default: true)
/// - `MONGO_WRITE_CONCERN` (default: majority) and `MONGO_WTIMEOUT_MS` (default: 5000)
/// - `MONGO_READ_PREFERENCE` (default: primaryPreferred)
/// - `MONGO_COMPRESSORS` (default: zlib; `none` disables)
#[cfg(feature = "config")]
impl FromEnv for ConnectionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::new(env_required("MONGO_URI")?);

        let config = Self {
            database: std::env::var("MONGO_DATABASE").ok().filter(|s| !s.is_empty()),
            app_name: std::env::var("MONGO_APP_NAME").ok().filter(|s| !s.is_empty()),
            min_pool_size: env_parse("MONGO_MIN_POOL_SIZE", defaults.min_pool_size)?,
            max_pool_size: env_parse("MONGO_MAX_POOL_SIZE", defaults.max_pool_size)?,
            max_idle_time: env_duration_ms("MONGO_MAX_IDLE_TIME_MS", 30_000)?,
            server_selection_timeout: env_duration_ms("MONGO_SERVER_SELECTION_TIMEOUT_MS", 5_000)?,
            socket_timeout: env_duration_ms("MONGO_SOCKET_TIMEOUT_MS", 45_000)?,
            heartbeat_frequency: env_duration_ms("MONGO_HEARTBEAT_FREQUENCY_MS", 10_000)?,
            retry_writes: env_parse("MONGO_RETRY_WRITES", defaults.retry_writes)?,
            retry_reads: env_parse("MONGO_RETRY_READS", defaults.retry_reads)?,
            write_concern: env_parse("MONGO_WRITE_CONCERN", WriteConcernLevel::Majority)?,
            write_concern_timeout: env_duration_ms("MONGO_WTIMEOUT_MS", 5_000)?,
            read_preference: env_parse("MONGO_READ_PREFERENCE", defaults.read_preference)?,
            compression: env_parse("MONGO_COMPRESSORS", defaults.compression)?,
            ..defaults
        };

        config.validate().map_err(|details| ConfigError::ParseError {
            key: "MONGO_MIN_POOL_SIZE/MONGO_MAX_POOL_SIZE".to_string(),
            details,
        })?;

        Ok(config)
    }
}
