//! Layered client configuration.
//!
//! Values are merged with the precedence defaults < TOML file < environment.
//! Environment variables use the `RAWQL_` prefix, e.g. `RAWQL_ENDPOINT`.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "RAWQL_";

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("rawql/", env!("CARGO_PKG_VERSION"));

/// Settings used to build a [`crate::Client`] over `reqwest`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Absolute URL of the GraphQL endpoint.
    pub endpoint: String,
    /// Whole-request timeout applied by the HTTP client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Defaults layered underneath every other source.
#[derive(Serialize)]
struct Defaults {
    user_agent: &'static str,
}

impl ClientConfig {
    /// Configuration for `endpoint` with every other field defaulted.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }

    /// Load configuration from an optional TOML file and the environment.
    ///
    /// A missing file is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a source cannot be parsed, the endpoint
    /// is missing, or the endpoint is not an absolute URL.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Defaults {
            user_agent: DEFAULT_USER_AGENT,
        }));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the endpoint parses as an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpoint`] when it does not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.endpoint)
            .map(drop)
            .map_err(|source| ConfigError::InvalidEndpoint {
                endpoint: self.endpoint.clone().into_boxed_str(),
                source,
            })
    }
}
