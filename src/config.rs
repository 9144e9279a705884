//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
    pub console: ConsoleConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

pub const MAX_BACKEND_RETRIES: u32 = 5;

/// Finance REST API configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,         // seconds
    pub connect_timeout_secs: u64, // seconds
    /// Applies to GET lookups only
    pub max_retries: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

/// Wallet page and top-up behaviour
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub wallet_page_path: String,
    /// Roles allowed to see and submit the top-up form
    pub topup_roles: Vec<String>,
    pub max_topup_amount: Option<Decimal>,
    pub currency_symbol: String,
    pub recent_transactions_page_size: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            wallet_page_path: "/wallet".to_string(),
            topup_roles: vec!["admin".to_string(), "institute_admin".to_string()],
            max_topup_amount: None,
            currency_symbol: "₹".to_string(),
            recent_transactions_page_size: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            backend: BackendConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            console: ConsoleConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.backend.validate()?;
        self.logging.validate()?;
        self.console.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl BackendConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(BackendConfig {
            base_url: env::var("FINANCE_API_BASE_URL")
                .map_err(|_| ConfigError::MissingVariable("FINANCE_API_BASE_URL".to_string()))?,
            api_token: env::var("FINANCE_API_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            timeout_secs: env::var("BACKEND_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BACKEND_TIMEOUT_SECS".to_string()))?,
            connect_timeout_secs: env::var("BACKEND_CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("BACKEND_CONNECT_TIMEOUT_SECS".to_string())
                })?,
            max_retries: env::var("BACKEND_MAX_RETRIES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BACKEND_MAX_RETRIES".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "FINANCE_API_BASE_URL must be a valid URL".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "BACKEND_TIMEOUT_SECS".to_string(),
            ));
        }

        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > self.timeout_secs {
            return Err(ConfigError::InvalidValue(
                "BACKEND_CONNECT_TIMEOUT_SECS must be between 1 and BACKEND_TIMEOUT_SECS"
                    .to_string(),
            ));
        }

        if self.max_retries > MAX_BACKEND_RETRIES {
            return Err(ConfigError::InvalidValue(format!(
                "BACKEND_MAX_RETRIES must be at most {}",
                MAX_BACKEND_RETRIES
            )));
        }

        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ConsoleConfig::default();
        Ok(ConsoleConfig {
            wallet_page_path: env::var("WALLET_PAGE_PATH").unwrap_or(defaults.wallet_page_path),
            topup_roles: env::var("TOPUP_ROLES")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.topup_roles),
            max_topup_amount: match env::var("TOPUP_MAX_AMOUNT") {
                Ok(raw) if !raw.trim().is_empty() => Some(
                    Decimal::from_str(raw.trim())
                        .map_err(|_| ConfigError::InvalidValue("TOPUP_MAX_AMOUNT".to_string()))?,
                ),
                _ => None,
            },
            currency_symbol: env::var("CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
            recent_transactions_page_size: env::var("RECENT_TRANSACTIONS_PAGE_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("RECENT_TRANSACTIONS_PAGE_SIZE".to_string())
                })?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.wallet_page_path.starts_with('/') {
            return Err(ConfigError::InvalidValue(
                "WALLET_PAGE_PATH must start with /".to_string(),
            ));
        }

        if let Some(max) = self.max_topup_amount {
            if max <= Decimal::ZERO {
                return Err(ConfigError::InvalidValue(
                    "TOPUP_MAX_AMOUNT must be greater than 0".to_string(),
                ));
            }
        }

        if self.recent_transactions_page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "RECENT_TRANSACTIONS_PAGE_SIZE".to_string(),
            ));
        }

        Ok(())
    }

    pub fn can_top_up(&self, role: Option<&str>) -> bool {
        role.map(|r| r.trim().to_lowercase())
            .map(|r| self.topup_roles.iter().any(|allowed| *allowed == r))
            .unwrap_or(false)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}
