//! Provider configuration

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub const ENV_SERVER_URL: &str = "NETBOX_SERVER_URL";
pub const ENV_API_TOKEN: &str = "NETBOX_API_TOKEN";
pub const ENV_ALLOW_INSECURE_HTTPS: &str = "NETBOX_ALLOW_INSECURE_HTTPS";

/// Connection settings for a NetBox instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the NetBox server, e.g. `https://netbox.example.com`
    pub server_url: String,

    /// API token sent as `Authorization: Token <api_token>`
    pub api_token: String,

    /// Skip TLS certificate verification
    pub allow_insecure_https: bool,

    /// Extra headers added to every request
    pub headers: HashMap<String, String>,
}

impl ProviderConfig {
    /// Load configuration from file, falling back to defaults when the file is missing
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading provider config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Overlay values from the `NETBOX_*` environment variables
    pub fn with_env(self) -> Self {
        self.with_overrides(
            std::env::var(ENV_SERVER_URL).ok(),
            std::env::var(ENV_API_TOKEN).ok(),
            std::env::var(ENV_ALLOW_INSECURE_HTTPS)
                .ok()
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
        )
    }

    /// Overlay explicit values; empty strings leave the current value untouched
    pub fn with_overrides(
        mut self,
        server_url: Option<String>,
        api_token: Option<String>,
        allow_insecure_https: Option<bool>,
    ) -> Self {
        if let Some(url) = server_url.filter(|s| !s.trim().is_empty()) {
            self.server_url = url;
        }
        if let Some(token) = api_token.filter(|s| !s.trim().is_empty()) {
            self.api_token = token;
        }
        if let Some(insecure) = allow_insecure_https {
            self.allow_insecure_https = insecure;
        }
        self
    }

    /// Check that the configuration is usable for API calls
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(Error::InvalidConfig("server_url must be set".to_string()));
        }
        reqwest::Url::parse(&self.server_url).map_err(|e| {
            Error::InvalidConfig(format!("server_url {:?} is not a valid URL: {}", self.server_url, e))
        })?;
        if self.api_token.trim().is_empty() {
            return Err(Error::InvalidConfig("api_token must be set".to_string()));
        }
        Ok(())
    }

    /// Server URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }
}
