use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use dotenvy::dotenv;

use crate::error::StartupError;

/// Shortest JWT signing secret accepted at startup.
pub const MIN_JWT_SECRET_LEN: usize = 16;

/// Longest credential lifetime accepted, one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

/// Work factors bcrypt accepts.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    /// `None` keeps idle connections forever.
    pub idle_timeout_secs: Option<u64>,
    pub max_lifetime_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    pub addr: String,
    pub port: u16,
    pub cors_origin: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_minutes: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub web: WebConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            web: WebConfig {
                addr: "127.0.0.1".to_string(),
                port: 8080,
                cors_origin: "http://localhost:5173".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://users.db?mode=rwc".to_string(),
                max_connections: 5,
                min_connections: 0,
                acquire_timeout_secs: 5,
                idle_timeout_secs: Some(600),
                max_lifetime_secs: Some(1800),
            },
            jwt: JwtConfig {
                secret: String::new(),
                access_token_expires_minutes: 60,
            },
            auth: AuthConfig {
                bcrypt_cost: bcrypt::DEFAULT_COST,
            },
        }
    }
}

impl AppConfig {
    /// Layers defaults, `Config.toml` and `APP_*` environment variables.
    pub fn from_env() -> Result<Self, StartupError> {
        dotenv().ok();

        let config = Self::figment().extract::<AppConfig>()?;
        config.check()?;

        tracing::info!(
            addr = %config.web.addr,
            port = config.web.port,
            max_connections = config.database.max_connections,
            "Configuration loaded"
        );

        Ok(config)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("Config.toml")) // For non-sensitive defaults
            .merge(Env::prefixed("APP_").split("__")) // e.g., APP_DATABASE__URL
    }

    /// Rejects settings the server cannot run with.
    pub fn check(&self) -> Result<(), StartupError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LEN {
            return Err(StartupError::InvalidConfig(format!(
                "jwt.secret must be at least {MIN_JWT_SECRET_LEN} bytes (set APP_JWT__SECRET)"
            )));
        }
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&self.jwt.access_token_expires_minutes) {
            return Err(StartupError::InvalidConfig(format!(
                "jwt.access_token_expires_minutes must be between 1 and {MAX_TOKEN_TTL_MINUTES}"
            )));
        }
        if self.database.max_connections == 0 {
            return Err(StartupError::InvalidConfig(
                "database.max_connections must be positive".to_string(),
            ));
        }
        if !BCRYPT_COST_RANGE.contains(&self.auth.bcrypt_cost) {
            return Err(StartupError::InvalidConfig(format!(
                "auth.bcrypt_cost must be within {BCRYPT_COST_RANGE:?}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_needs_a_secret() {
        let config = AppConfig::default();
        assert!(matches!(
            config.check(),
            Err(StartupError::InvalidConfig(_))
        ));
    }

    #[test]
    fn long_enough_secret_passes() {
        let mut config = AppConfig::default();
        config.jwt.secret = "0123456789abcdef0123".to_string();
        assert!(config.check().is_ok());
    }

    #[test]
    fn token_lifetime_is_bounded() {
        let mut config = AppConfig::default();
        config.jwt.secret = "0123456789abcdef0123".to_string();

        for minutes in [0, -5, MAX_TOKEN_TTL_MINUTES + 1, i64::MAX] {
            config.jwt.access_token_expires_minutes = minutes;
            assert!(
                matches!(config.check(), Err(StartupError::InvalidConfig(_))),
                "{minutes} minutes should be rejected"
            );
        }

        config.jwt.access_token_expires_minutes = MAX_TOKEN_TTL_MINUTES;
        assert!(config.check().is_ok());
    }

    #[test]
    fn bcrypt_cost_is_bounded() {
        let mut config = AppConfig::default();
        config.jwt.secret = "0123456789abcdef0123".to_string();
        config.auth.bcrypt_cost = 2;
        assert!(config.check().is_err());
    }
}
