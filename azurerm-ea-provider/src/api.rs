//! Subscription management API surface
//!
//! `SubscriptionApi` is the seam between the provider and the Azure
//! management plane. `AzureSubscriptionClient` implements it over HTTP;
//! tests substitute an in-memory fake.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the subscription API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request could not be sent or the connection failed
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The management API answered with a non-success status
    #[error("Azure API returned {status}: {code}: {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// An expected response header was absent
    #[error("Response is missing the {0} header")]
    MissingHeader(&'static str),

    /// Client configuration problem
    #[error("Invalid client configuration: {0}")]
    Configuration(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Azure AD principal that becomes an owner of the new subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdPrincipal {
    pub object_id: String,
}

/// Body of the create-subscription request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationParameters {
    pub display_name: String,
    pub offer_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<AdPrincipal>,
}

/// Final payload of a completed creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationResult {
    pub subscription_link: Option<String>,
}

/// Handle to a submitted, possibly still running, creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationOperation {
    /// Server accepted the request; poll this URL for the outcome
    Pending {
        poll_url: String,
        retry_after: Option<Duration>,
    },
    /// Server finished synchronously
    Completed(CreationResult),
}

/// Observed status of a creation operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    InProgress { retry_after: Option<Duration> },
    Succeeded(CreationResult),
    Failed { message: String },
}

/// One subscription as returned by the listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    /// Fully qualified link, e.g. "/subscriptions/<guid>"
    pub id: Option<String>,
    pub subscription_id: Option<String>,
    pub display_name: Option<String>,
    pub state: Option<String>,
}

/// One page of the subscription listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPage {
    #[serde(default)]
    pub value: Vec<SubscriptionRecord>,
    pub next_link: Option<String>,
}

/// Operations the provider needs from the Azure management plane
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    /// Submit a subscription creation under an enrollment account
    async fn create_subscription_in_enrollment_account(
        &self,
        enrollment_account_name: &str,
        params: &CreationParameters,
    ) -> ApiResult<CreationOperation>;

    /// Check the status of a pending creation
    async fn poll_creation(&self, poll_url: &str) -> ApiResult<PollStatus>;

    /// Fetch one page of subscriptions visible to the caller.
    /// `None` fetches the first page; otherwise the `next_link` of the previous page.
    async fn list_subscriptions(&self, next_link: Option<&str>) -> ApiResult<SubscriptionPage>;
}
