use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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
    pub leasing: LeasingConfig,
    pub reminders: ReminderConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");
        let format = LogFormat::from_str(&var_or("APP_LOG_FORMAT", "compact"));

        let public_url = var_or("RENTWISE_PUBLIC_URL", "http://localhost:3000");
        let mail_from = var_or("RENTWISE_MAIL_FROM", "leasing@rentwise.local");

        let days_before = parse_day_list(
            "RENTWISE_REMINDER_DAYS_BEFORE",
            &var_or("RENTWISE_REMINDER_DAYS_BEFORE", "3"),
        )?;
        let overdue_days = parse_day_list(
            "RENTWISE_REMINDER_OVERDUE_DAYS",
            &var_or("RENTWISE_REMINDER_OVERDUE_DAYS", "1,5"),
        )?;
        let interval_secs = var_or("RENTWISE_REMINDER_INTERVAL_SECS", "3600")
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidInterval)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            leasing: LeasingConfig {
                public_url: public_url.trim_end_matches('/').to_string(),
                mail_from,
            },
            reminders: ReminderConfig {
                days_before,
                overdue_days,
                interval_secs,
            },
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_day_list(var: &'static str, value: &str) -> Result<Vec<u16>, ConfigError> {
    let mut days = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.parse::<u16>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ConfigError::InvalidList {
            var,
            value: value.to_string(),
        })?;
    days.sort_unstable();
    days.dedup();
    Ok(days)
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Compact
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Outbound links and sender identity used by lease and signature emails.
#[derive(Debug, Clone)]
pub struct LeasingConfig {
    pub public_url: String,
    pub mail_from: String,
}

impl LeasingConfig {
    pub fn signing_link(&self, request_id: &str) -> String {
        format!("{}/sign/{}", self.public_url, request_id)
    }
}

impl Default for LeasingConfig {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:3000".to_string(),
            mail_from: "leasing@rentwise.local".to_string(),
        }
    }
}

/// Rent reminder cadence. An interval of zero disables the background loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderConfig {
    pub days_before: Vec<u16>,
    pub overdue_days: Vec<u16>,
    pub interval_secs: u64,
}

impl ReminderConfig {
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            days_before: vec![3],
            overdue_days: vec![1, 5],
            interval_secs: 3600,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidList { var: &'static str, value: String },
    InvalidInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidList { var, value } => {
                write!(f, "{var} must be a comma separated list of days, got '{value}'")
            }
            ConfigError::InvalidInterval => {
                write!(f, "RENTWISE_REMINDER_INTERVAL_SECS must be a whole number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "RENTWISE_PUBLIC_URL",
            "RENTWISE_MAIL_FROM",
            "RENTWISE_REMINDER_DAYS_BEFORE",
            "RENTWISE_REMINDER_OVERDUE_DAYS",
            "RENTWISE_REMINDER_INTERVAL_SECS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert_eq!(config.reminders.days_before, vec![3]);
        assert_eq!(config.reminders.overdue_days, vec![1, 5]);
        assert_eq!(
            config.reminders.interval(),
            Some(Duration::from_secs(3600))
        );
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reminder_lists_are_sorted_and_deduplicated() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RENTWISE_REMINDER_OVERDUE_DAYS", "10, 1,5,1");
        env::set_var("RENTWISE_REMINDER_INTERVAL_SECS", "0");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.reminders.overdue_days, vec![1, 5, 10]);
        assert!(config.reminders.interval().is_none());
        reset_env();
    }

    #[test]
    fn rejects_malformed_reminder_days() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RENTWISE_REMINDER_DAYS_BEFORE", "three");
        match AppConfig::load() {
            Err(ConfigError::InvalidList { var, .. }) => {
                assert_eq!(var, "RENTWISE_REMINDER_DAYS_BEFORE")
            }
            other => panic!("expected list error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn signing_links_trim_trailing_slash() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RENTWISE_PUBLIC_URL", "https://app.example.com/");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.leasing.signing_link("sig-000001"),
            "https://app.example.com/sign/sig-000001"
        );
        reset_env();
    }
}
