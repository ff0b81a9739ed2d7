//! Provider configuration
//!
//! Built from the provider block attributes handed over by the host engine,
//! with the access token falling back to the environment.

use std::collections::HashMap;
use std::time::Duration;

use azurerm_ea_core::resource::Value;

use crate::client::DEFAULT_ENDPOINT;
use crate::error::ConfigError;
use crate::lro::PollPolicy;

/// Environment variable consulted when no access token is configured
pub const ACCESS_TOKEN_ENV: &str = "ARM_ACCESS_TOKEN";

/// Settings for the Azure provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Management plane base URL
    pub endpoint: String,
    /// Bearer token for the management plane
    pub access_token: String,
    /// Polling of long-running operations
    pub poll: PollPolicy,
}

impl ProviderConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: access_token.into(),
            poll: PollPolicy::default(),
        }
    }

    /// Build from provider block attributes, reading the token from the environment if absent
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        Self::from_attributes_with_env(attributes, |key| std::env::var(key).ok())
    }

    fn from_attributes_with_env(
        attributes: &HashMap<String, Value>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let access_token = match get_string(attributes, "access_token")? {
            Some(token) => token.to_string(),
            None => env(ACCESS_TOKEN_ENV)
                .filter(|t| !t.is_empty())
                .ok_or(ConfigError::Missing("access_token"))?,
        };

        let mut config = Self::new(access_token);

        if let Some(endpoint) = get_string(attributes, "endpoint")? {
            config.endpoint = endpoint.to_string();
        }
        if let Some(secs) = get_positive_int(attributes, "poll_interval_secs")? {
            config.poll.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = get_positive_int(attributes, "poll_max_interval_secs")? {
            config.poll.max_interval = Duration::from_secs(secs);
        }
        if let Some(attempts) = get_positive_int(attributes, "poll_max_attempts")? {
            config.poll.max_attempts =
                u32::try_from(attempts).map_err(|_| ConfigError::Invalid {
                    key: "poll_max_attempts",
                    message: "value is too large".to_string(),
                })?;
        }
        if let Some(Value::Bool(honor)) = attributes.get("poll_honor_retry_after") {
            config.poll.honor_retry_after = *honor;
        }

        Ok(config)
    }
}

fn get_string<'a>(
    attributes: &'a HashMap<String, Value>,
    key: &'static str,
) -> Result<Option<&'a str>, ConfigError> {
    match attributes.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ConfigError::Invalid {
            key,
            message: "expected a string".to_string(),
        }),
    }
}

fn get_positive_int(
    attributes: &HashMap<String, Value>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match attributes.get(key) {
        None => Ok(None),
        Some(Value::Int(n)) if *n > 0 => Ok(Some(*n as u64)),
        Some(Value::Int(_)) => Err(ConfigError::Invalid {
            key,
            message: "must be positive".to_string(),
        }),
        Some(_) => Err(ConfigError::Invalid {
            key,
            message: "expected an integer".to_string(),
        }),
    }
}
