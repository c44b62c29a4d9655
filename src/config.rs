/// Configuration management for the ScanBase admin service
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub recovery: RecoveryConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub db_path: PathBuf,
}

/// Recovery and admin-API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Bearer key required on token-administration endpoints.
    /// None means the admin surface is unconfigured and refuses requests.
    pub admin_api_key: Option<String>,
    /// Default lifetime of newly issued recovery tokens, in seconds
    pub token_ttl_secs: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("SCANBASE_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("SCANBASE_PORT")
            .unwrap_or_else(|_| "8720".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        let version = env::var("SCANBASE_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("SCANBASE_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let db_path = env::var("SCANBASE_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("scanbase.sqlite"));

        let admin_api_key = env::var("SCANBASE_ADMIN_API_KEY").ok().filter(|s| !s.is_empty());
        let token_ttl_secs = env::var("SCANBASE_RECOVERY_TOKEN_TTL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                db_path,
            },
            recovery: RecoveryConfig {
                admin_api_key,
                token_ttl_secs,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if let Some(key) = &self.recovery.admin_api_key {
            if key.len() < 16 {
                return Err(AppError::Validation(
                    "Admin API key must be at least 16 characters".to_string(),
                ));
            }
        }

        if self.recovery.token_ttl_secs <= 0 {
            return Err(AppError::Validation(
                "Recovery token TTL must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
