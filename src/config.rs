//! Application configuration
//!
//! Loaded from a TOML file (`~/.config/bike-rental/config.toml` by default).
//! Every section and field has a default, so a partial file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "BIKE_RENTAL_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub security: SecurityConfig,
    pub admin: AdminConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite://./bike-rental.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    /// bcrypt cost factor
    pub password_hash_cost: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_hours: 24,
            password_hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Bootstrap admin, created only when the user table is empty
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            email: "admin@bike-rental.local".to_string(),
            password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl AppConfig {
    /// Read and parse a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// `JWT_SECRET` and `DATABASE_URL` win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            if !secret.is_empty() {
                self.security.jwt_secret = secret;
            }
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                self.database.url = url;
            }
        }
    }

    pub fn api_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// `$BIKE_RENTAL_CONFIG`, else `<config dir>/bike-rental/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bike-rental")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.security.jwt_expiration_hours, 24);
        assert_eq!(config.logging.format, "text");
        assert_eq!(config.admin.username, "admin");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9090

            [security]
            jwt_secret = "s3cret"
            password_hash_cost = 6

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.security.jwt_secret, "s3cret");
        assert_eq!(config.security.password_hash_cost, 6);
        assert_eq!(config.security.jwt_expiration_hours, 24);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.api_address(), "0.0.0.0:9090");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(AppConfig::from_toml("[server\nport = ").is_err());
        assert!(AppConfig::from_toml("[server]\nport = \"eighty\"").is_err());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = AppConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn default_path_ends_with_app_dir() {
        if std::env::var(CONFIG_PATH_ENV).is_err() {
            let path = default_config_path();
            assert!(path.ends_with("bike-rental/config.toml"));
        }
    }
}
