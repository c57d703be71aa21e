//! Store API configuration module.
//!
//! Values are layered: built-in defaults, then an optional `store-api.toml`
//! next to the binary, then environment variables (`PORT`, `JWT_SECRET`, …).

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use config::{Config, Environment, File};
use serde::Deserialize;

const DEV_SECRET: &str = "sweet-store-dev-secret-change-in-production";

// =============================================================================
// App Environment
// =============================================================================

/// `APP_ENV`. Development exposes error details to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    #[default]
    Production,
    Test,
}

impl AppEnv {
    pub fn is_development(self) -> bool {
        self == AppEnv::Development
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
            AppEnv::Test => "test",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Token Lifetime
// =============================================================================

/// `JWT_EXPIRES_IN`: `30d`, `12h`, `45m`, `90s` or bare seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetime(Duration);

impl TokenLifetime {
    pub fn duration(self) -> Duration {
        self.0
    }
}

impl FromStr for TokenLifetime {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue("JWT_EXPIRES_IN".to_string());
        let raw = raw.trim();
        let (digits, unit) = match raw.char_indices().last() {
            Some((i, c)) if c.is_ascii_alphabetic() => (&raw[..i], Some(c)),
            Some(_) => (raw, None),
            None => return Err(invalid()),
        };
        let amount: i64 = digits.parse().map_err(|_| invalid())?;
        if amount <= 0 {
            return Err(invalid());
        }

        let duration = match unit {
            None | Some('s') => Duration::seconds(amount),
            Some('m') => Duration::minutes(amount),
            Some('h') => Duration::hours(amount),
            Some('d') => Duration::days(amount),
            Some(_) => return Err(invalid()),
        };
        Ok(TokenLifetime(duration))
    }
}

// =============================================================================
// Store API Config
// =============================================================================

/// Raw layered values, before checks.
#[derive(Debug, Deserialize)]
struct RawConfig {
    host: String,
    port: u16,
    database_path: String,
    db_max_connections: u32,
    jwt_secret: Option<String>,
    jwt_expires_in: String,
    app_env: AppEnv,
    email_from: String,
    reset_token_ttl_minutes: i64,
}

/// Store API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Upper bound on pooled connections
    pub db_max_connections: u32,

    /// HS256 signing secret
    pub jwt_secret: String,

    /// Lifetime of issued tokens
    pub jwt_expires_in: TokenLifetime,

    pub app_env: AppEnv,

    /// Sender address on outgoing mail
    pub email_from: String,

    /// Lifetime of a password-reset code
    pub reset_token_ttl_minutes: i64,
}

impl ApiConfig {
    /// Load configuration from defaults, `store-api.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let layered = Config::builder()
            .set_default("host", "0.0.0.0")
            .and_then(|b| b.set_default("port", 5000))
            .and_then(|b| b.set_default("database_path", "./sweet_store.db"))
            .and_then(|b| b.set_default("db_max_connections", 5))
            .and_then(|b| b.set_default("jwt_expires_in", "30d"))
            .and_then(|b| b.set_default("app_env", "production"))
            .and_then(|b| b.set_default("email_from", "Sweet Store <noreply@sweetstore.com>"))
            .and_then(|b| {
                b.set_default(
                    "reset_token_ttl_minutes",
                    store_core::DEFAULT_RESET_TOKEN_TTL_MINUTES,
                )
            })
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .add_source(File::with_name("store-api").required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let raw: RawConfig = layered
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        ApiConfig::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let jwt_secret = match (raw.jwt_secret, raw.app_env) {
            (Some(secret), _) if !secret.trim().is_empty() => secret,
            (_, AppEnv::Production) => {
                return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()))
            }
            _ => DEV_SECRET.to_string(),
        };

        if raw.reset_token_ttl_minutes <= 0 {
            return Err(ConfigError::InvalidValue(
                "RESET_TOKEN_TTL_MINUTES".to_string(),
            ));
        }
        if raw.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(ApiConfig {
            host: raw.host,
            port: raw.port,
            database_path: raw.database_path,
            db_max_connections: raw.db_max_connections,
            jwt_secret,
            jwt_expires_in: raw.jwt_expires_in.parse()?,
            app_env: raw.app_env,
            email_from: raw.email_from,
            reset_token_ttl_minutes: raw.reset_token_ttl_minutes,
        })
    }

    /// Settings for tests: fixed secret, development error detail off.
    pub fn for_tests() -> Self {
        ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_path: ":memory:".to_string(),
            db_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            jwt_expires_in: TokenLifetime(Duration::days(30)),
            app_env: AppEnv::Test,
            email_from: "Sweet Store <noreply@sweetstore.com>".to_string(),
            reset_token_ttl_minutes: store_core::DEFAULT_RESET_TOKEN_TTL_MINUTES,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Could not load configuration: {0}")]
    Load(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(app_env: AppEnv, jwt_secret: Option<&str>) -> RawConfig {
        RawConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_path: "store.db".to_string(),
            db_max_connections: 5,
            jwt_secret: jwt_secret.map(str::to_string),
            jwt_expires_in: "30d".to_string(),
            app_env,
            email_from: "noreply@sweetstore.com".to_string(),
            reset_token_ttl_minutes: 10,
        }
    }

    #[test]
    fn test_token_lifetime_units() {
        let secs = |s: &str| s.parse::<TokenLifetime>().unwrap().duration().num_seconds();
        assert_eq!(secs("30d"), 30 * 86_400);
        assert_eq!(secs("12h"), 12 * 3_600);
        assert_eq!(secs("45m"), 45 * 60);
        assert_eq!(secs("90s"), 90);
        assert_eq!(secs("3600"), 3_600);
    }

    #[test]
    fn test_token_lifetime_rejects_garbage() {
        for bad in ["", "d", "10w", "-5m", "0", "ten"] {
            assert!(bad.parse::<TokenLifetime>().is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_production_requires_secret() {
        let err = ApiConfig::from_raw(raw(AppEnv::Production, None)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(ref key) if key == "JWT_SECRET"));

        let config = ApiConfig::from_raw(raw(AppEnv::Production, Some("s3cret"))).unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
    }

    #[test]
    fn test_development_falls_back_to_dev_secret() {
        let config = ApiConfig::from_raw(raw(AppEnv::Development, None)).unwrap();
        assert_eq!(config.jwt_secret, DEV_SECRET);
        assert!(config.app_env.is_development());
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
    }
}
