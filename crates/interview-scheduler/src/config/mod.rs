use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::scheduling::{SchedulerSettings, ScoringWeights, WeightsError};

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
    pub scheduler: SchedulerConfig,
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
            scheduler: SchedulerConfig::from_env()?,
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

/// Scheduling policy knobs sourced from `SCHEDULER_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub slot_granularity_minutes: u32,
    pub buffer_minutes: u32,
    pub max_daily_interviews: u32,
    pub max_reschedules: u32,
    pub max_alternatives: usize,
    pub upstream_timeout_ms: u64,
    pub weights: ScoringWeights,
}

impl SchedulerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        use crate::scheduling::ScoreFactor::*;

        let defaults = SchedulerSettings::default();
        let default_weights = ScoringWeights::default();

        let weights = ScoringWeights::new(
            parse_var(
                "SCHEDULER_WEIGHT_TIME_PREFERENCE",
                default_weights.weight(TimePreference),
            )?,
            parse_var(
                "SCHEDULER_WEIGHT_AVAILABILITY_QUALITY",
                default_weights.weight(AvailabilityQuality),
            )?,
            parse_var(
                "SCHEDULER_WEIGHT_INTERVIEWER_WORKLOAD",
                default_weights.weight(InterviewerWorkload),
            )?,
            parse_var(
                "SCHEDULER_WEIGHT_CANDIDATE_CONVENIENCE",
                default_weights.weight(CandidateConvenience),
            )?,
            parse_var("SCHEDULER_WEIGHT_URGENCY", default_weights.weight(Urgency))?,
        )
        .map_err(ConfigError::InvalidWeights)?;

        let slot_granularity_minutes = parse_var(
            "SCHEDULER_SLOT_GRANULARITY_MINUTES",
            defaults.slot_granularity_minutes,
        )?;
        if slot_granularity_minutes == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "SCHEDULER_SLOT_GRANULARITY_MINUTES",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            slot_granularity_minutes,
            buffer_minutes: parse_var("SCHEDULER_BUFFER_MINUTES", defaults.buffer_minutes)?,
            max_daily_interviews: parse_var(
                "SCHEDULER_MAX_DAILY_INTERVIEWS",
                defaults.max_daily_interviews,
            )?,
            max_reschedules: parse_var("SCHEDULER_MAX_RESCHEDULES", defaults.max_reschedules)?,
            max_alternatives: parse_var("SCHEDULER_MAX_ALTERNATIVES", defaults.max_alternatives)?,
            upstream_timeout_ms: parse_var(
                "SCHEDULER_UPSTREAM_TIMEOUT_MS",
                defaults.upstream_timeout.as_millis() as u64,
            )?,
            weights,
        })
    }

    pub fn settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            slot_granularity_minutes: self.slot_granularity_minutes,
            buffer_minutes: self.buffer_minutes,
            max_daily_interviews: self.max_daily_interviews,
            max_reschedules: self.max_reschedules,
            max_alternatives: self.max_alternatives,
            upstream_timeout: Duration::from_millis(self.upstream_timeout_ms),
            weights: self.weights,
            ..SchedulerSettings::default()
        }
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidWeights(WeightsError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a valid positive number (got '{value}')")
            }
            ConfigError::InvalidWeights(err) => write!(f, "invalid scoring weights: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidWeights(err) => Some(err),
        }
    }
}
