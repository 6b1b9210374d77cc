//! Client configuration.

use crate::credentials::{Credentials, SecureString};
use crate::traits::{CascadeError, CascadeResult, Protocol};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Where the HTTP+JSON transport puts the credentials.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RestAuth {
    /// `u`/`p` query parameters on every call.
    #[default]
    Query,
    /// Query parameters on GET calls, a Basic header on calls with a body.
    Header,
}

/// Settings for one connection to a Cascade instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name used in logs.
    #[serde(default = "default_name")]
    pub name: String,
    /// Instance root, e.g. `https://cms.example.edu`.
    pub base_url: String,
    #[serde(default)]
    pub protocol: Protocol,
    pub credentials: Credentials,
    #[serde(default)]
    pub rest_auth: RestAuth,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates. Only honoured in debug builds.
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_name() -> String {
    "cascade".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl ClientConfig {
    /// A configuration with defaults for everything but the endpoint and credentials.
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            name: default_name(),
            base_url: base_url.into(),
            protocol: Protocol::default(),
            credentials,
            rest_auth: RestAuth::default(),
            timeout_secs: default_timeout(),
            verify_tls: true,
            headers: HashMap::new(),
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_rest_auth(mut self, rest_auth: RestAuth) -> Self {
        self.rest_auth = rest_auth;
        self
    }

    /// Reads the configuration from the environment.
    ///
    /// Reads:
    /// - `CASCADE_URL` (required)
    /// - `CASCADE_USERNAME` (required)
    /// - `CASCADE_PASSWORD` (required)
    /// - `CASCADE_PROTOCOL` (optional, `rpc` or `rest`, default `rest`)
    /// - `CASCADE_TIMEOUT_SECS` (optional, default 30)
    pub fn from_env() -> CascadeResult<Self> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| {
                CascadeError::Configuration(format!("{} environment variable not set", name))
            })
        };

        let base_url = var("CASCADE_URL")?;
        let username = var("CASCADE_USERNAME")?;
        let password = var("CASCADE_PASSWORD")?;

        let protocol = match std::env::var("CASCADE_PROTOCOL").ok().as_deref() {
            None | Some("rest") => Protocol::Rest,
            Some("rpc") => Protocol::Rpc,
            Some(other) => {
                return Err(CascadeError::UnacceptableValue(format!(
                    "CASCADE_PROTOCOL must be 'rpc' or 'rest', got '{}'",
                    other
                )))
            }
        };

        let timeout_secs = std::env::var("CASCADE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(default_timeout);

        let config = Self {
            timeout_secs,
            ..Self::new(base_url, Credentials::new(username, SecureString::new(password)))
                .with_protocol(protocol)
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(contents: &str) -> CascadeResult<Self> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| CascadeError::Configuration(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a YAML configuration file.
    pub fn load(path: &Path) -> CascadeResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CascadeError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Checks the settings before any client is built.
    pub fn validate(&self) -> CascadeResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(CascadeError::EmptyValue("Empty base URL".to_string()));
        }
        if self.credentials.username.trim().is_empty() {
            return Err(CascadeError::EmptyValue("Empty username".to_string()));
        }
        url::Url::parse(&self.base_url).map_err(|e| {
            CascadeError::Configuration(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;
        if self.timeout_secs == 0 {
            return Err(CascadeError::UnacceptableValue(
                "Timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}
