use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anylabeling_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::units::{self, RateLimit, Rotation};

/// Log file used when `logging.file_path` is not set.
pub const DEFAULT_LOG_FILE: &str = "logs/server.log";

/// Resolved server configuration. Built once at startup and shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
}

impl Settings {
    /// Check range, enumeration and format constraints that serde cannot
    /// express. Returns the first violation found.
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.logging.validate()?;
        self.security.validate()?;
        self.performance.validate()?;
        self.concurrency.validate()?;
        Ok(())
    }

    /// Non-fatal inconsistencies the operator should hear about at startup.
    pub fn security_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.security.api_key_enabled && self.security.api_key.is_empty() {
            warnings.push(format!(
                "security.api_key_enabled is true but no API key was configured \
                 (set security.api_key or {}); requests cannot be authenticated",
                crate::loader::API_KEY_ENV
            ));
        }
        warnings
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_workers")]
    pub workers: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_workers() -> u32 {
    1
}

impl ServerConfig {
    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Validation("server.host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(Error::Validation(
                "server.port must be between 1 and 65535".into(),
            ));
        }
        if self.workers == 0 {
            return Err(Error::Validation("server.workers must be at least 1".into()));
        }
        Ok(())
    }
}

/// Log severities accepted in the configuration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[serde(alias = "trace")]
    Trace,
    #[serde(alias = "debug")]
    Debug,
    #[default]
    #[serde(alias = "info")]
    Info,
    #[serde(alias = "success")]
    Success,
    #[serde(alias = "warning")]
    Warning,
    #[serde(alias = "error")]
    Error,
    #[serde(alias = "critical")]
    Critical,
}

impl LogLevel {
    /// The `tracing` filter directive this severity maps to.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info | LogLevel::Success => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum severity written to the log file.
    pub level: LogLevel,
    /// Minimum severity written to the console.
    pub console_level: LogLevel,
    pub file_enabled: bool,
    pub file_path: Option<String>,
    /// Size (`"500 MB"`) or interval (`"daily"`) after which the file rotates.
    pub rotation: String,
    /// How long rotated files are kept (`"30 days"`).
    pub retention: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console_level: LogLevel::Info,
            file_enabled: true,
            file_path: None,
            rotation: "500 MB".to_string(),
            retention: "30 days".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LoggingConfig {
    pub fn rotation_policy(&self) -> Result<Rotation> {
        self.rotation
            .parse()
            .map_err(|e| Error::Validation(format!("logging.rotation: {e}")))
    }

    pub fn retention_period(&self) -> Result<Duration> {
        units::parse_duration(&self.retention)
            .map_err(|e| Error::Validation(format!("logging.retention: {e}")))
    }

    pub fn log_file(&self) -> PathBuf {
        PathBuf::from(self.file_path.as_deref().unwrap_or(DEFAULT_LOG_FILE))
    }

    fn validate(&self) -> Result<()> {
        self.rotation_policy()?;
        self.retention_period()?;
        if let Some(path) = &self.file_path
            && path.trim().is_empty()
        {
            return Err(Error::Validation(
                "logging.file_path must not be empty when set".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    pub api_key_enabled: bool,
    pub api_key: String,
    /// Request header carrying the API key.
    pub api_key_header: String,
    pub cors_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            api_key_enabled: false,
            api_key: String::new(),
            api_key_header: "Token".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl SecurityConfig {
    /// The configured key, or `None` when it was left empty.
    pub fn api_key(&self) -> Option<&str> {
        if self.api_key.is_empty() {
            None
        } else {
            Some(&self.api_key)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.api_key_header.trim().is_empty() {
            return Err(Error::Validation(
                "security.api_key_header must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerformanceConfig {
    /// Seconds.
    pub request_timeout: u64,
    /// Bytes; 0 means unlimited.
    pub max_image_size: u64,
    pub rate_limit_enabled: bool,
    pub rate_limit: String,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            request_timeout: 300,
            max_image_size: 0,
            rate_limit_enabled: false,
            rate_limit: "100/minute".to_string(),
        }
    }
}

impl PerformanceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn image_size_limit(&self) -> Option<u64> {
        (self.max_image_size > 0).then_some(self.max_image_size)
    }

    pub fn parsed_rate_limit(&self) -> Result<RateLimit> {
        self.rate_limit
            .parse()
            .map_err(|e| Error::Validation(format!("performance.rate_limit: {e}")))
    }

    fn validate(&self) -> Result<()> {
        if self.request_timeout == 0 {
            return Err(Error::Validation(
                "performance.request_timeout must be greater than 0".into(),
            ));
        }
        self.parsed_rate_limit()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConcurrencyConfig {
    pub max_workers: usize,
    pub max_queue_size: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_queue_size: 50,
        }
    }
}

impl ConcurrencyConfig {
    fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::Validation(
                "concurrency.max_workers must be at least 1".into(),
            ));
        }
        if self.max_queue_size == 0 {
            return Err(Error::Validation(
                "concurrency.max_queue_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
