//! Application configuration module.
//! Handles environment variable loading, configuration validation, and
//! application settings. The gateway secret is loaded here and injected into
//! the gateway client at construction time; nothing reads it at module scope.

use crate::gateway::types::GatewayEnvironment;
use std::env;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub fulfillment: FulfillmentConfig,
    pub orders: OrderPolicyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,   // seconds
    pub idle_timeout: Option<u64>, // seconds
}

/// Money-movement gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: GatewayEnvironment,
    pub secret_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Secondary order-management backend configuration.
#[derive(Debug, Clone)]
pub struct FulfillmentConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Business rules for the cancellation path.
#[derive(Debug, Clone)]
pub struct OrderPolicyConfig {
    /// Orders past PENDING are cancelable only within this many hours of
    /// creation.
    pub cancellation_window_hours: i64,
    /// COMPLETED orders may be canceled regardless of the window. A late
    /// business requirement that overrides normal terminality; kept
    /// configurable because it weakens the state machine.
    pub allow_completed_cancellation: bool,
}

impl Default for OrderPolicyConfig {
    fn default() -> Self {
        Self { cancellation_window_hours: 24, allow_completed_cancellation: true }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            gateway: GatewayConfig::from_env()?,
            fulfillment: FulfillmentConfig::from_env()?,
            orders: OrderPolicyConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gateway.validate()?;
        self.fulfillment.validate()?;
        self.orders.validate()?;
        self.logging.validate()?;
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
            return Err(ConfigError::InvalidValue("SERVER_PORT cannot be 0".to_string()));
        }
        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue("SERVER_HOST cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MIN_CONNECTIONS".to_string()))?,
            connection_timeout: env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_CONNECTION_TIMEOUT".to_string()))?,
            idle_timeout: env::var("DB_IDLE_TIMEOUT").ok().and_then(|val| val.parse().ok()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS must be <= DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        Ok(())
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(GatewayConfig {
            environment: env::var("GATEWAY_ENVIRONMENT")
                .unwrap_or_else(|_| "test".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GATEWAY_ENVIRONMENT".to_string()))?,
            secret_key: env::var("GATEWAY_SECRET_KEY")
                .map_err(|_| ConfigError::MissingVariable("GATEWAY_SECRET_KEY".to_string()))?,
            base_url: env::var("GATEWAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.gateway.example.com".to_string()),
            timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GATEWAY_TIMEOUT_SECS".to_string()))?,
            max_retries: env::var("GATEWAY_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GATEWAY_MAX_RETRIES".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue("GATEWAY_SECRET_KEY".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_BASE_URL must be a valid URL".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("GATEWAY_TIMEOUT_SECS".to_string()));
        }
        Ok(())
    }
}

impl FulfillmentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(FulfillmentConfig {
            base_url: env::var("FULFILLMENT_BASE_URL")
                .map_err(|_| ConfigError::MissingVariable("FULFILLMENT_BASE_URL".to_string()))?,
            timeout_secs: env::var("FULFILLMENT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("FULFILLMENT_TIMEOUT_SECS".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "FULFILLMENT_BASE_URL must be a valid URL".to_string(),
            ));
        }
        Ok(())
    }
}

impl OrderPolicyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(OrderPolicyConfig {
            cancellation_window_hours: env::var("ORDERS_CANCELLATION_WINDOW_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("ORDERS_CANCELLATION_WINDOW_HOURS".to_string())
                })?,
            allow_completed_cancellation: env::var("ORDERS_ALLOW_COMPLETED_CANCELLATION")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("ORDERS_ALLOW_COMPLETED_CANCELLATION".to_string())
                })?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cancellation_window_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "ORDERS_CANCELLATION_WINDOW_HOURS must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT").unwrap_or_else(|_| "plain".to_string()).as_str() {
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

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}
