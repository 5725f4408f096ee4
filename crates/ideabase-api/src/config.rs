//! Server configuration from the process environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `postgres://localhost/ideabase` |
//! | `DATABASE_MAX_CONNECTIONS` | `10` |
//! | `DATABASE_ACQUIRE_TIMEOUT_SECS` | `10` |
//! | `HOST` / `PORT` | `0.0.0.0` / `3000` |
//! | `ALLOWED_ORIGINS` | `http://localhost:3000` (`*` allows any origin) |
//! | `STORAGE_BACKEND` | `filesystem` (or `http`) |
//! | `FILE_STORAGE_PATH` | `/var/lib/ideabase/objects` |
//! | `STORAGE_URL`, `STORAGE_SERVICE_KEY` | required when `STORAGE_BACKEND=http` |
//! | `STORAGE_BUCKET` | `attachments` |
//! | `UPLOAD_MAX_BYTES` | 50 MiB |
//! | `UPLOAD_VERIFY_CONTENT` | `false` |
//! | `UPLOAD_COMMIT_PROTOCOL` | `best_effort` (or `two_phase`) |
//! | `SESSION_TTL_HOURS` | `168` |

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use axum::http::HeaderValue;
use tracing::warn;

use ideabase_core::{defaults, Error, Result};
use ideabase_db::{HttpStoreConfig, PoolConfig};

use crate::services::{CommitProtocol, GatewayConfig};

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/ideabase";
const DEFAULT_FILE_STORAGE_PATH: &str = "/var/lib/ideabase/objects";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";

/// Origins accepted by the CORS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<HeaderValue>),
}

/// Parse a comma-separated origin list. Invalid entries are skipped; `*`
/// anywhere in the list allows any origin.
pub fn parse_allowed_origins(raw: &str) -> AllowedOrigins {
    let raw = if raw.trim().is_empty() {
        DEFAULT_ALLOWED_ORIGINS
    } else {
        raw
    };

    let mut origins = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if entry == "*" {
            return AllowedOrigins::Any;
        }
        match entry.parse::<HeaderValue>() {
            Ok(v) => origins.push(v),
            Err(e) => warn!("Invalid CORS origin '{}': {}", entry, e),
        }
    }
    AllowedOrigins::List(origins)
}

/// Where attachment bytes live.
#[derive(Debug, Clone)]
pub enum StorageSettings {
    Filesystem { path: PathBuf },
    Http(HttpStoreConfig),
}

impl StorageSettings {
    pub fn kind(&self) -> &'static str {
        match self {
            StorageSettings::Filesystem { .. } => "filesystem",
            StorageSettings::Http(_) => "http",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub pool: PoolConfig,
    pub host: String,
    pub port: u16,
    pub allowed_origins: AllowedOrigins,
    pub storage: StorageSettings,
    pub gateway: GatewayConfig,
    pub session_ttl: chrono::Duration,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bucket = get("STORAGE_BUCKET").unwrap_or_else(|| defaults::STORAGE_BUCKET.to_string());

        let storage = match get("STORAGE_BACKEND").as_deref().unwrap_or("filesystem") {
            "filesystem" | "fs" => StorageSettings::Filesystem {
                path: PathBuf::from(
                    get("FILE_STORAGE_PATH")
                        .unwrap_or_else(|| DEFAULT_FILE_STORAGE_PATH.to_string()),
                ),
            },
            "http" => {
                let url = get("STORAGE_URL").ok_or_else(|| {
                    Error::Config("STORAGE_URL is required when STORAGE_BACKEND=http".into())
                })?;
                let key = get("STORAGE_SERVICE_KEY").ok_or_else(|| {
                    Error::Config(
                        "STORAGE_SERVICE_KEY is required when STORAGE_BACKEND=http".into(),
                    )
                })?;
                StorageSettings::Http(HttpStoreConfig::new(url, key, bucket.clone()))
            }
            other => {
                return Err(Error::Config(format!(
                    "Unknown STORAGE_BACKEND '{}' (expected filesystem or http)",
                    other
                )))
            }
        };

        let max_file_size: u64 = parse_var(&get, "UPLOAD_MAX_BYTES", defaults::MAX_FILE_SIZE)?;
        if max_file_size == 0 {
            return Err(Error::Config("UPLOAD_MAX_BYTES must be positive".into()));
        }

        let session_ttl_hours: i64 =
            parse_var(&get, "SESSION_TTL_HOURS", defaults::SESSION_TTL_HOURS)?;
        if session_ttl_hours <= 0 {
            return Err(Error::Config("SESSION_TTL_HOURS must be positive".into()));
        }

        let pool_defaults = PoolConfig::default();
        let pool = PoolConfig::new()
            .max_connections(parse_var(
                &get,
                "DATABASE_MAX_CONNECTIONS",
                pool_defaults.max_connections,
            )?)
            .acquire_timeout(std::time::Duration::from_secs(parse_var(
                &get,
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                pool_defaults.acquire_timeout.as_secs(),
            )?));
        if pool.max_connections == 0 {
            return Err(Error::Config("DATABASE_MAX_CONNECTIONS must be positive".into()));
        }

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            pool,
            host: get("HOST").unwrap_or_else(|| defaults::SERVER_HOST.to_string()),
            port: parse_var(&get, "PORT", defaults::SERVER_PORT)?,
            allowed_origins: parse_allowed_origins(&get("ALLOWED_ORIGINS").unwrap_or_default()),
            storage,
            gateway: GatewayConfig {
                max_file_size,
                verify_content: parse_bool(&get, "UPLOAD_VERIFY_CONTENT")?,
                commit_protocol: parse_var(
                    &get,
                    "UPLOAD_COMMIT_PROTOCOL",
                    CommitProtocol::BestEffort,
                )?,
                bucket,
            },
            session_ttl: chrono::Duration::hours(session_ttl_hours),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool> {
    match get(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(Error::Config(format!("Invalid {}: {}", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.gateway.max_file_size, 50 * 1024 * 1024);
        assert!(!config.gateway.verify_content);
        assert_eq!(config.gateway.commit_protocol, CommitProtocol::BestEffort);
        assert_eq!(config.gateway.bucket, "attachments");
        assert_eq!(config.session_ttl, chrono::Duration::hours(168));
        assert_eq!(config.storage.kind(), "filesystem");
        assert_eq!(config.pool, PoolConfig::default());
    }

    #[test]
    fn test_pool_overrides() {
        let config = config_from(&[
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("DATABASE_ACQUIRE_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(config.pool.max_connections, 25);
        assert_eq!(config.pool.acquire_timeout, std::time::Duration::from_secs(3));
        assert!(matches!(
            config_from(&[("DATABASE_MAX_CONNECTIONS", "0")]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_http_storage_requires_credentials() {
        let err = config_from(&[("STORAGE_BACKEND", "http"), ("STORAGE_URL", "https://x")])
            .unwrap_err();
        assert!(err.to_string().contains("STORAGE_SERVICE_KEY"));

        let config = config_from(&[
            ("STORAGE_BACKEND", "http"),
            ("STORAGE_URL", "https://store.example.test"),
            ("STORAGE_SERVICE_KEY", "service-key"),
            ("STORAGE_BUCKET", "files"),
        ])
        .unwrap();
        match config.storage {
            StorageSettings::Http(http) => {
                assert_eq!(http.base_url, "https://store.example.test");
                assert_eq!(http.bucket, "files");
            }
            other => panic!("unexpected storage {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        assert!(matches!(
            config_from(&[("PORT", "eighty")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config_from(&[("UPLOAD_COMMIT_PROTOCOL", "yolo")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config_from(&[("UPLOAD_VERIFY_CONTENT", "maybe")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config_from(&[("UPLOAD_MAX_BYTES", "0")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config_from(&[("STORAGE_BACKEND", "tape")]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_upload_overrides() {
        let config = config_from(&[
            ("UPLOAD_MAX_BYTES", "1048576"),
            ("UPLOAD_VERIFY_CONTENT", "true"),
            ("UPLOAD_COMMIT_PROTOCOL", "two_phase"),
        ])
        .unwrap();
        assert_eq!(config.gateway.max_file_size, 1_048_576);
        assert!(config.gateway.verify_content);
        assert_eq!(config.gateway.commit_protocol, CommitProtocol::TwoPhase);
    }

    #[test]
    fn test_allowed_origins_parsing() {
        match parse_allowed_origins("https://notes.example.com, http://localhost:5173 ,") {
            AllowedOrigins::List(origins) => {
                assert_eq!(origins.len(), 2);
                assert_eq!(origins[0], "https://notes.example.com");
                assert_eq!(origins[1], "http://localhost:5173");
            }
            AllowedOrigins::Any => panic!("expected a list"),
        }
        assert_eq!(parse_allowed_origins("*"), AllowedOrigins::Any);
        assert_eq!(
            parse_allowed_origins(""),
            AllowedOrigins::List(vec![HeaderValue::from_static("http://localhost:3000")])
        );
    }
}
