//! Error types for provider configuration and API error conversion

use azurerm_ea_core::provider::{ProviderError, ProviderErrorKind};
use thiserror::Error;

use crate::api::ApiError;

/// Errors raised while building a provider from configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Wrap an API error without rewording it
pub fn api_error(err: ApiError) -> ProviderError {
    ProviderError::new(ProviderErrorKind::Api, err.to_string()).with_cause(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn api_error_keeps_message_and_cause() {
        let err = api_error(ApiError::MissingHeader("Location"));
        assert_eq!(err.kind, ProviderErrorKind::Api);
        assert_eq!(err.message, "Response is missing the Location header");
        assert!(err.source().is_some());
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::Invalid {
            key: "poll_interval_secs",
            message: "must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for poll_interval_secs: must be positive"
        );
    }
}
