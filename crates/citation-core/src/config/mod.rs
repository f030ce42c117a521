use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
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
    pub automation: AutomationConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("CITATION_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("CITATION_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("CITATION_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("CITATION_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let webdriver_url = env::var("CITATION_WEBDRIVER_URL")
            .unwrap_or_else(|_| "http://localhost:4444".to_string());
        let headless = parse_flag(
            "CITATION_HEADLESS",
            &env::var("CITATION_HEADLESS").unwrap_or_else(|_| "true".to_string()),
        )?;
        let batch_size = env::var("CITATION_BATCH_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|size| *size > 0)
            .ok_or(ConfigError::InvalidBatchSize)?;
        let attempt_timeout_secs = env::var("CITATION_ATTEMPT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "45".to_string())
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidAttemptTimeout)?;

        let progress_path = env::var("CITATION_PROGRESS_PATH")
            .unwrap_or_else(|_| "citation-progress.json".to_string());
        let ledger_path = env::var("CITATION_LEDGER_PATH")
            .unwrap_or_else(|_| "verification-ledger.json".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            automation: AutomationConfig {
                webdriver_url,
                headless,
                batch_size,
                attempt_timeout: Duration::from_secs(attempt_timeout_secs),
            },
            storage: StorageConfig {
                progress_path: PathBuf::from(progress_path),
                ledger_path: PathBuf::from(ledger_path),
            },
        })
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: raw.to_string(),
        }),
    }
}

/// Settings controlling the status service binding.
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

/// Browser automation and worker pool settings.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    pub webdriver_url: String,
    pub headless: bool,
    pub batch_size: usize,
    pub attempt_timeout: Duration,
}

/// Locations of the persisted progress snapshot and verification ledger.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub progress_path: PathBuf,
    pub ledger_path: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidBatchSize,
    InvalidAttemptTimeout,
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "CITATION_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "CITATION_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBatchSize => {
                write!(f, "CITATION_BATCH_SIZE must be a positive integer")
            }
            ConfigError::InvalidAttemptTimeout => write!(
                f,
                "CITATION_ATTEMPT_TIMEOUT_SECS must be a positive number of seconds"
            ),
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidBatchSize
            | ConfigError::InvalidAttemptTimeout
            | ConfigError::InvalidFlag { .. } => None,
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
        for key in [
            "CITATION_ENV",
            "CITATION_HOST",
            "CITATION_PORT",
            "CITATION_LOG_LEVEL",
            "CITATION_WEBDRIVER_URL",
            "CITATION_HEADLESS",
            "CITATION_BATCH_SIZE",
            "CITATION_ATTEMPT_TIMEOUT_SECS",
            "CITATION_PROGRESS_PATH",
            "CITATION_LEDGER_PATH",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.automation.webdriver_url, "http://localhost:4444");
        assert!(config.automation.headless);
        assert_eq!(config.automation.batch_size, 10);
        assert_eq!(config.automation.attempt_timeout, Duration::from_secs(45));
        assert_eq!(
            config.storage.progress_path,
            PathBuf::from("citation-progress.json")
        );
    }

    #[test]
    fn rejects_zero_batch_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CITATION_BATCH_SIZE", "0");
        let err = AppConfig::load().expect_err("zero batch size is invalid");
        assert!(matches!(err, ConfigError::InvalidBatchSize));
        reset_env();
    }

    #[test]
    fn parses_headless_toggle_and_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CITATION_HEADLESS", "off");
        env::set_var("CITATION_ATTEMPT_TIMEOUT_SECS", "30");
        let config = AppConfig::load().expect("config loads");
        assert!(!config.automation.headless);
        assert_eq!(config.automation.attempt_timeout, Duration::from_secs(30));

        env::set_var("CITATION_HEADLESS", "maybe");
        let err = AppConfig::load().expect_err("unknown flag value");
        assert!(err.to_string().contains("CITATION_HEADLESS"));
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CITATION_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }
}
