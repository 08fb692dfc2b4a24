//! # Config — Collaborator Endpoint and Deadline
//!
//! Resolved once at startup into a [`ClientConfig`]. Sources, highest
//! precedence first:
//!
//! 1. command-line flags / environment variables ([`ConfigOverrides`], both
//!    filled by clap)
//! 2. the `[client]` table of an optional TOML file
//! 3. defaults: development environment, 30 s deadline
//!
//! ```toml
//! [client]
//! environment = "production"
//! # base_url = "https://example.org/"
//! deadline_ms = 45000
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::transport::DEFAULT_DEADLINE;

const DEVELOPMENT_URL: &str = "http://localhost:5000/";
const PRODUCTION_URL: &str = "https://prime-sum-backend.onrender.com/";

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
    #[error("invalid base URL {value:?}: {source}")]
    BaseUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("base URL must use http or https (got {0})")]
    NotHttp(String),
    #[error("deadline must be greater than zero")]
    ZeroDeadline,
}

/// Which deployment of the collaborator to talk to when no base URL is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Environment::Development => DEVELOPMENT_URL,
            Environment::Production => PRODUCTION_URL,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Top-level TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub client: ClientSection,
}

/// The `[client]` table. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    pub environment: Option<Environment>,
    pub base_url: Option<String>,
    pub deadline_ms: Option<u64>,
}

/// Values that beat the file: flags and their environment variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub environment: Option<Environment>,
    pub base_url: Option<String>,
    pub deadline_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub environment: Environment,
    /// Always ends in `/` so `api/<operation>` joins beneath it.
    pub base_url: Url,
    pub deadline: Duration,
}

impl ClientConfig {
    pub fn for_environment(environment: Environment) -> Result<Self, ConfigError> {
        Ok(ClientConfig {
            environment,
            base_url: parse_base_url(environment.default_base_url())?,
            deadline: DEFAULT_DEADLINE,
        })
    }

    pub fn resolve(
        overrides: &ConfigOverrides,
        file: Option<&ConfigFile>,
    ) -> Result<Self, ConfigError> {
        let section = file.map(|f| &f.client);

        let environment = overrides
            .environment
            .or_else(|| section.and_then(|s| s.environment))
            .unwrap_or_default();

        let base_url = match overrides
            .base_url
            .as_deref()
            .or_else(|| section.and_then(|s| s.base_url.as_deref()))
        {
            Some(raw) => parse_base_url(raw)?,
            None => parse_base_url(environment.default_base_url())?,
        };

        let deadline = match overrides
            .deadline_ms
            .or_else(|| section.and_then(|s| s.deadline_ms))
        {
            Some(0) => return Err(ConfigError::ZeroDeadline),
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_DEADLINE,
        };

        Ok(ClientConfig {
            environment,
            base_url,
            deadline,
        })
    }
}

pub fn load_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|source| ConfigError::BaseUrl {
        value: raw.to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::NotHttp(url.scheme().to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
