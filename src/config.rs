//! Array connection configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default bound on records requested per page
pub const DEFAULT_MAX_RECORDS: u32 = 999;

// =============================================================================
// Transport Configuration
// =============================================================================

/// URL scheme used to reach the management endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scheme::Http => write!(f, "http"),
            Scheme::Https => write!(f, "https"),
        }
    }
}

/// Settings for the HTTP transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub scheme: Scheme,
    /// Port override; the scheme's default otherwise
    pub port: Option<u16>,
    /// Accept self-signed array certificates
    pub accept_invalid_certs: bool,
    /// API version announced in the request envelope
    pub api_major: u32,
    pub api_minor: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Https,
            port: None,
            accept_invalid_certs: false,
            api_major: 1,
            api_minor: 15,
        }
    }
}

// =============================================================================
// Array Configuration
// =============================================================================

/// Configuration for one array session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayConfig {
    /// Device address (host name or IP)
    pub address: String,
    /// Admin user
    pub user: String,
    /// Password (should come from a secret store in production)
    #[serde(default)]
    pub password: String,
    /// Per-call timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Namespace (vserver) selector
    #[serde(default)]
    pub vserver: Option<String>,
    /// Records requested per page
    #[serde(default = "default_max_records")]
    pub max_records: u32,
    #[serde(default)]
    pub transport: TransportConfig,
}

fn default_max_records() -> u32 {
    DEFAULT_MAX_RECORDS
}

impl ArrayConfig {
    pub fn new(address: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            user: user.into(),
            password: password.into(),
            timeout_secs: None,
            vserver: None,
            max_records: DEFAULT_MAX_RECORDS,
            transport: TransportConfig::default(),
        }
    }

    /// Load a single array configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a list of array configurations from a YAML file
    pub fn list_from_yaml_file(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let raw = std::fs::read_to_string(path)?;
        let configs: Vec<Self> = serde_yaml::from_str(&raw)?;
        for config in &configs {
            config.validate()?;
        }
        Ok(configs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::Configuration("device address is empty".into()));
        }
        if self.max_records == 0 {
            return Err(Error::Configuration(
                "max_records must be at least 1".into(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(Error::Configuration("timeout must be positive".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Selected namespace, ignoring an empty selector
    pub fn namespace(&self) -> Option<&str> {
        self.vserver.as_deref().filter(|v| !v.is_empty())
    }
}
