//! Client configuration from the environment.

use std::path::PathBuf;

use ideabase_core::defaults;

use crate::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base URL without a trailing slash.
    pub api_url: String,
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Read `IDEABASE_API_URL` and `IDEABASE_SESSION_FILE`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let api_url = lookup(defaults::ENV_API_URL)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| defaults::API_URL.to_string());
        let api_url = api_url.trim().trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "{} must be an http(s) URL, got '{}'",
                defaults::ENV_API_URL,
                api_url
            )));
        }

        let session_file = match lookup(defaults::ENV_SESSION_FILE).filter(|v| !v.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => default_session_file()?,
        };

        Ok(Self {
            api_url,
            session_file,
        })
    }
}

fn default_session_file() -> Result<PathBuf, ClientError> {
    let base = dirs::config_dir().ok_or_else(|| {
        ClientError::Config(format!(
            "No config directory found; set {}",
            defaults::ENV_SESSION_FILE
        ))
    })?;
    Ok(base.join("ideabase").join(defaults::SESSION_FILE_NAME))
}
