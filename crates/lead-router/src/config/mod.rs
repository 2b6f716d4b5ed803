use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::leads::{DedupPolicy, RetryPolicy};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            pipeline: PipelineConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Qualification and dispatch tuning consumed by the lead pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub engage_threshold: u32,
    pub score_tables: Option<PathBuf>,
    pub company_name: String,
    pub retry: RetryPolicy,
    pub concurrency: usize,
    pub dedup: DedupPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            engage_threshold: 70,
            score_tables: None,
            company_name: "TechNova".to_string(),
            retry: RetryPolicy::default(),
            concurrency: 1,
            dedup: DedupPolicy::Disabled,
        }
    }
}

impl PipelineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let engage_threshold = parse_var("LEAD_ENGAGE_THRESHOLD", defaults.engage_threshold)?;
        let score_tables = env::var("LEAD_SCORE_TABLES")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let company_name = env::var("LEAD_COMPANY_NAME")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.company_name);

        let max_attempts: u32 = parse_var("LEAD_RETRY_ATTEMPTS", defaults.retry.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                key: "LEAD_RETRY_ATTEMPTS",
                detail: "must be at least 1",
            });
        }
        let backoff_ms: u64 = parse_var(
            "LEAD_RETRY_BACKOFF_MS",
            defaults.retry.initial_backoff.as_millis() as u64,
        )?;
        let timeout_ms: u64 = parse_var(
            "LEAD_EFFECT_TIMEOUT_MS",
            defaults.retry.effect_timeout.as_millis() as u64,
        )?;
        if timeout_ms == 0 {
            return Err(ConfigError::OutOfRange {
                key: "LEAD_EFFECT_TIMEOUT_MS",
                detail: "must be greater than zero",
            });
        }

        let concurrency: usize = parse_var("LEAD_CONCURRENCY", defaults.concurrency)?;
        if concurrency == 0 {
            return Err(ConfigError::OutOfRange {
                key: "LEAD_CONCURRENCY",
                detail: "must be at least 1",
            });
        }

        let dedup = match env::var("LEAD_DEDUP") {
            Ok(raw) => DedupPolicy::parse(&raw).ok_or(ConfigError::InvalidValue {
                key: "LEAD_DEDUP",
                value: raw,
            })?,
            Err(_) => defaults.dedup,
        };

        Ok(Self {
            engage_threshold,
            score_tables,
            company_name,
            retry: RetryPolicy {
                max_attempts,
                initial_backoff: Duration::from_millis(backoff_ms),
                effect_timeout: Duration::from_millis(timeout_ms),
            },
            concurrency,
            dedup,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
    OutOfRange { key: &'static str, detail: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an unsupported value '{value}'")
            }
            ConfigError::OutOfRange { key, detail } => write!(f, "{key} {detail}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::OutOfRange { .. } => None,
        }
    }
}
