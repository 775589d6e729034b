// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment exactly once in `main`,
//! validated eagerly, and shared by reference through `AppState`.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `MONGO_URI` | MongoDB connection string | `mongodb://localhost:27017` |
//! | `MONGO_DB_NAME` | Database name | `fusevault` |
//! | `MONGO_VERIFY_ON_CONNECT` | Ping the server when the client is built | `true` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8000` |
//! | `CORS_ORIGINS` | Comma-separated allowed origins | `http://localhost:3001` |
//! | `SESSION_TTL_SECONDS` | Session lifetime | `3600` |
//! | `COOKIE_SECURE` | Mark the session cookie `Secure` | `false` |
//! | `API_KEYS_ENABLED` | Enable API-key endpoints | `true` |
//! | `API_KEY_SECRET_KEY` | HMAC secret for API-key hashes | random per process |
//! | `API_KEY_MAX_PER_WALLET` | Active keys allowed per wallet | `10` |
//! | `API_KEY_DEFAULT_EXPIRATION_DAYS` | Lifetime of keys created without `expires_at` | `90` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{fmt, str::FromStr};

use chrono::Duration;

pub const MONGO_URI_ENV: &str = "MONGO_URI";
pub const MONGO_DB_NAME_ENV: &str = "MONGO_DB_NAME";
pub const MONGO_VERIFY_ON_CONNECT_ENV: &str = "MONGO_VERIFY_ON_CONNECT";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const CORS_ORIGINS_ENV: &str = "CORS_ORIGINS";
pub const SESSION_TTL_SECONDS_ENV: &str = "SESSION_TTL_SECONDS";
pub const COOKIE_SECURE_ENV: &str = "COOKIE_SECURE";
pub const API_KEYS_ENABLED_ENV: &str = "API_KEYS_ENABLED";
pub const API_KEY_SECRET_KEY_ENV: &str = "API_KEY_SECRET_KEY";
pub const API_KEY_MAX_PER_WALLET_ENV: &str = "API_KEY_MAX_PER_WALLET";
pub const API_KEY_DEFAULT_EXPIRATION_DAYS_ENV: &str = "API_KEY_DEFAULT_EXPIRATION_DAYS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_MONGO_DB_NAME: &str = "fusevault";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3001";
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 3600;
pub const DEFAULT_API_KEY_MAX_PER_WALLET: u64 = 10;
pub const DEFAULT_API_KEY_EXPIRATION_DAYS: i64 = 90;

/// Longest accepted session lifetime (30 days).
pub const MAX_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
/// Longest accepted default API-key lifetime (10 years).
pub const MAX_API_KEY_EXPIRATION_DAYS: i64 = 3650;

/// Errors raised while loading configuration. All of them are fatal at startup.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got {value:?}")]
    InvalidValue {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{var} must not be empty")]
    Empty { var: &'static str },

    #[error("{var} must be greater than zero")]
    NotPositive { var: &'static str },

    #[error("{var} must be at most {max}")]
    TooLarge { var: &'static str, max: i64 },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(()),
        }
    }
}

/// MongoDB connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Connection string (may embed credentials).
    pub uri: String,
    /// Database holding every FuseVault collection.
    pub db_name: String,
    /// Run a `ping` against the server while building the client so an
    /// unreachable host surfaces as a startup error.
    pub verify_on_connect: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_MONGO_URI.to_string(),
            db_name: DEFAULT_MONGO_DB_NAME.to_string(),
            verify_on_connect: true,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("uri", &redact_uri(&self.uri))
            .field("db_name", &self.db_name)
            .field("verify_on_connect", &self.verify_on_connect)
            .finish()
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Session and API-key policy.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSettings {
    /// Session lifetime; always positive.
    pub session_ttl: Duration,
    /// Add `Secure` to the session cookie (HTTPS deployments).
    pub cookie_secure: bool,
    pub api_keys_enabled: bool,
    /// HMAC secret for API-key hashes. `None` means one is generated at startup.
    pub api_key_secret: Option<String>,
    pub api_key_max_per_wallet: u64,
    pub api_key_default_expiration: Duration,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("session_ttl", &self.session_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .field("api_keys_enabled", &self.api_keys_enabled)
            .field(
                "api_key_secret",
                &self.api_key_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("api_key_max_per_wallet", &self.api_key_max_per_wallet)
            .field("api_key_default_expiration", &self.api_key_default_expiration)
            .finish()
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECONDS),
            cookie_secure: false,
            api_keys_enabled: true,
            api_key_secret: None,
            api_key_max_per_wallet: DEFAULT_API_KEY_MAX_PER_WALLET,
            api_key_default_expiration: Duration::days(DEFAULT_API_KEY_EXPIRATION_DAYS),
        }
    }
}

/// Complete process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthSettings,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            server: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                cors_origins: split_origins(DEFAULT_CORS_ORIGINS),
            },
            auth: AuthSettings::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset and blank variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database = DatabaseConfig {
            uri: get(MONGO_URI_ENV).unwrap_or_else(|| DEFAULT_MONGO_URI.to_string()),
            db_name: get(MONGO_DB_NAME_ENV).unwrap_or_else(|| DEFAULT_MONGO_DB_NAME.to_string()),
            verify_on_connect: parse_or(
                MONGO_VERIFY_ON_CONNECT_ENV,
                get(MONGO_VERIFY_ON_CONNECT_ENV),
                true,
                parse_bool,
            )?,
        };

        let server = ServerConfig {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(PORT_ENV, get(PORT_ENV), DEFAULT_PORT, |v| v.parse().ok())?,
            cors_origins: split_origins(
                get(CORS_ORIGINS_ENV)
                    .as_deref()
                    .unwrap_or(DEFAULT_CORS_ORIGINS),
            ),
        };

        let session_ttl_secs: i64 = parse_or(
            SESSION_TTL_SECONDS_ENV,
            get(SESSION_TTL_SECONDS_ENV),
            DEFAULT_SESSION_TTL_SECONDS,
            |v| v.parse().ok(),
        )?;
        let expiration_days: i64 = parse_or(
            API_KEY_DEFAULT_EXPIRATION_DAYS_ENV,
            get(API_KEY_DEFAULT_EXPIRATION_DAYS_ENV),
            DEFAULT_API_KEY_EXPIRATION_DAYS,
            |v| v.parse().ok(),
        )?;

        let session_ttl =
            Duration::try_seconds(session_ttl_secs).ok_or_else(|| ConfigError::InvalidValue {
                var: SESSION_TTL_SECONDS_ENV,
                expected: "number of seconds",
                value: session_ttl_secs.to_string(),
            })?;
        let api_key_default_expiration =
            Duration::try_days(expiration_days).ok_or_else(|| ConfigError::InvalidValue {
                var: API_KEY_DEFAULT_EXPIRATION_DAYS_ENV,
                expected: "number of days",
                value: expiration_days.to_string(),
            })?;

        let auth = AuthSettings {
            session_ttl,
            cookie_secure: parse_or(COOKIE_SECURE_ENV, get(COOKIE_SECURE_ENV), false, parse_bool)?,
            api_keys_enabled: parse_or(
                API_KEYS_ENABLED_ENV,
                get(API_KEYS_ENABLED_ENV),
                true,
                parse_bool,
            )?,
            api_key_secret: get(API_KEY_SECRET_KEY_ENV),
            api_key_max_per_wallet: parse_or(
                API_KEY_MAX_PER_WALLET_ENV,
                get(API_KEY_MAX_PER_WALLET_ENV),
                DEFAULT_API_KEY_MAX_PER_WALLET,
                |v| v.parse().ok(),
            )?,
            api_key_default_expiration,
        };

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                var: LOG_FORMAT_ENV,
                expected: "log format (json|pretty)",
                value: v,
            })?,
            None => LogFormat::default(),
        };

        let config = Self {
            database,
            server,
            auth,
            log_format,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.db_name.trim().is_empty() {
            return Err(ConfigError::Empty {
                var: MONGO_DB_NAME_ENV,
            });
        }
        if self.auth.session_ttl <= Duration::zero() {
            return Err(ConfigError::NotPositive {
                var: SESSION_TTL_SECONDS_ENV,
            });
        }
        if self.auth.session_ttl > Duration::seconds(MAX_SESSION_TTL_SECONDS) {
            return Err(ConfigError::TooLarge {
                var: SESSION_TTL_SECONDS_ENV,
                max: MAX_SESSION_TTL_SECONDS,
            });
        }
        if self.auth.api_key_default_expiration <= Duration::zero() {
            return Err(ConfigError::NotPositive {
                var: API_KEY_DEFAULT_EXPIRATION_DAYS_ENV,
            });
        }
        if self.auth.api_key_default_expiration > Duration::days(MAX_API_KEY_EXPIRATION_DAYS) {
            return Err(ConfigError::TooLarge {
                var: API_KEY_DEFAULT_EXPIRATION_DAYS_ENV,
                max: MAX_API_KEY_EXPIRATION_DAYS,
            });
        }
        if self.auth.api_key_max_per_wallet == 0 {
            return Err(ConfigError::NotPositive {
                var: API_KEY_MAX_PER_WALLET_ENV,
            });
        }
        Ok(())
    }
}

fn parse_or<T>(
    var: &'static str,
    raw: Option<String>,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => parse(&value).ok_or(ConfigError::InvalidValue {
            var,
            expected: std::any::type_name::<T>(),
            value,
        }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replace the password in a connection string so it can be logged.
///
/// Multi-host URIs (`host1,host2`) are not valid URLs, so the credentials
/// section is stripped by hand when parsing fails.
pub fn redact_uri(uri: &str) -> String {
    if let Ok(mut parsed) = url::Url::parse(uri) {
        if parsed.password().is_some() && parsed.set_password(Some("****")).is_ok() {
            return parsed.to_string();
        }
        return uri.to_string();
    }

    match (uri.find("://"), uri.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let userinfo = &uri[scheme_end + 3..at];
            let user = userinfo.split(':').next().unwrap_or_default();
            format!("{}{}:****{}", &uri[..scheme_end + 3], user, &uri[at..])
        }
        _ => uri.to_string(),
    }
}
