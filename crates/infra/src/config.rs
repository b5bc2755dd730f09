//! Environment-driven application configuration.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. Every variable has a default except `DATABASE_URL`, which is only
//! required when persistent stores are enabled.

use std::net::SocketAddr;

use thiserror::Error;
use tracing::warn;

use bazaar_auth::password::DEFAULT_COST;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60;
/// One year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 525_600;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be set{hint}")]
    Missing { key: &'static str, hint: &'static str },

    #[error("invalid value for {key} ({value:?}): {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read .env: {0}")]
    Dotenv(String),
}

/// Which storage backend the services run on.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageConfig {
    InMemory,
    Postgres { database_url: String },
}

/// The database URL carries credentials and is never printed.
impl core::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StorageConfig::InMemory => f.write_str("InMemory"),
            StorageConfig::Postgres { .. } => f.debug_struct("Postgres").finish_non_exhaustive(),
        }
    }
}

/// Operational account created at startup when it does not exist yet.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl core::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub storage: StorageConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub bcrypt_cost: u32,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("storage", &self.storage)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

/// Load `.env` into the process environment if present.
///
/// Existing variables win over the file. A missing file is not an error.
/// Call once, before reading `LOG_FORMAT`, and report the error after
/// logging is up.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ConfigError::Dotenv(e.to_string())),
    }
}

impl AppConfig {
    /// Read the process environment; `.env` must already be loaded.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            key: "BIND_ADDR",
            value: bind_addr.clone(),
            reason: e.to_string(),
        })?;

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let token_ttl_minutes = match get("TOKEN_TTL_MINUTES") {
            Some(raw) => {
                let minutes = parse_positive("TOKEN_TTL_MINUTES", &raw)?;
                if minutes > MAX_TOKEN_TTL_MINUTES {
                    return Err(ConfigError::Invalid {
                        key: "TOKEN_TTL_MINUTES",
                        value: raw,
                        reason: format!("must be at most {MAX_TOKEN_TTL_MINUTES}"),
                    });
                }
                minutes
            }
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };

        let persistent = match get("USE_PERSISTENT_STORES") {
            Some(raw) => parse_bool("USE_PERSISTENT_STORES", &raw)?,
            None => false,
        };
        let storage = if persistent {
            let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing {
                key: "DATABASE_URL",
                hint: " when USE_PERSISTENT_STORES=true",
            })?;
            StorageConfig::Postgres { database_url }
        } else {
            StorageConfig::InMemory
        };

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                password,
                name: get("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|| "Operations".to_string()),
            }),
            (Some(_), None) => {
                return Err(ConfigError::Missing {
                    key: "BOOTSTRAP_ADMIN_PASSWORD",
                    hint: " when BOOTSTRAP_ADMIN_EMAIL is set",
                });
            }
            _ => None,
        };

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(raw) => {
                let cost = parse_positive("BCRYPT_COST", &raw)?;
                if !(4..=31).contains(&cost) {
                    return Err(ConfigError::Invalid {
                        key: "BCRYPT_COST",
                        value: raw,
                        reason: "must be between 4 and 31".to_string(),
                    });
                }
                cost as u32
            }
            None => DEFAULT_COST,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            token_ttl_minutes,
            storage,
            bootstrap_admin,
            bcrypt_cost,
        })
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes)
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<i64, ConfigError> {
    match raw.parse::<i64>() {
        Ok(v) if v > 0 => Ok(v),
        Ok(_) => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "must be positive".to_string(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.token_ttl_minutes, DEFAULT_TOKEN_TTL_MINUTES);
        assert_eq!(cfg.storage, StorageConfig::InMemory);
        assert_eq!(cfg.bcrypt_cost, DEFAULT_COST);
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn persistent_stores_require_database_url() {
        let err = config(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "DATABASE_URL", .. }));

        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "1"),
            ("DATABASE_URL", "postgres://localhost/bazaar"),
        ])
        .unwrap();
        assert!(matches!(cfg.storage, StorageConfig::Postgres { .. }));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        assert!(config(&[("TOKEN_TTL_MINUTES", "soon")]).is_err());
        assert!(config(&[("TOKEN_TTL_MINUTES", "0")]).is_err());
        assert!(config(&[("TOKEN_TTL_MINUTES", "525601")]).is_err());
        assert!(config(&[("TOKEN_TTL_MINUTES", "9223372036854775807")]).is_err());
        assert!(config(&[("BCRYPT_COST", "2")]).is_err());
        assert!(config(&[("BIND_ADDR", "not-an-addr")]).is_err());
    }

    #[test]
    fn bootstrap_admin_needs_both_email_and_password() {
        assert!(config(&[("BOOTSTRAP_ADMIN_EMAIL", "ops@example.com")]).is_err());

        let cfg = config(&[
            ("BOOTSTRAP_ADMIN_EMAIL", "ops@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "change-me-now"),
        ])
        .unwrap();
        let admin = cfg.bootstrap_admin.unwrap();
        assert_eq!(admin.name, "Operations");
        assert!(!format!("{admin:?}").contains("change-me-now"));
    }

    #[test]
    fn missing_dotenv_file_is_not_an_error() {
        assert_eq!(load_dotenv(), Ok(()));
    }

    #[test]
    fn token_ttl_accepts_up_to_one_year() {
        let cfg = config(&[("TOKEN_TTL_MINUTES", "525600")]).unwrap();
        assert_eq!(cfg.token_ttl(), chrono::Duration::days(365));
    }

    #[test]
    fn debug_output_hides_the_database_url() {
        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://bazaar:hunter2secret@db/bazaar"),
            ("JWT_SECRET", "very-secret-signing-key"),
        ])
        .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("Postgres"));
        assert!(!rendered.contains("hunter2secret"));
        assert!(!rendered.contains("db/bazaar"));
        assert!(!rendered.contains("very-secret-signing-key"));
    }
}
