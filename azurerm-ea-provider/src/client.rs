//! Azure management REST client
//!
//! Direct implementation of the two subscription endpoints the provider
//! needs, using bearer token authentication.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{StatusCode, Url};
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use serde::Deserialize;

use crate::api::{
    ApiError, ApiResult, CreationOperation, CreationParameters, CreationResult, PollStatus,
    SubscriptionApi, SubscriptionPage,
};

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
const CREATE_API_VERSION: &str = "2018-03-01-preview";
const LIST_API_VERSION: &str = "2016-06-01";

/// HTTP client for the subscription endpoints
pub struct AzureSubscriptionClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl AzureSubscriptionClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Endpoint URL with `segments` appended, each percent-encoded as a single segment
    fn endpoint_url(&self, segments: &[&str], api_version: &str) -> ApiResult<Url> {
        let invalid = |reason: String| {
            ApiError::Configuration(format!("endpoint {}: {}", self.endpoint, reason))
        };
        let mut url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    fn create_url(&self, enrollment_account_name: &str) -> ApiResult<Url> {
        self.endpoint_url(
            &[
                "providers",
                "Microsoft.Billing",
                "enrollmentAccounts",
                enrollment_account_name,
                "providers",
                "Microsoft.Subscription",
                "createSubscription",
            ],
            CREATE_API_VERSION,
        )
    }

    fn list_url(&self) -> ApiResult<Url> {
        self.endpoint_url(&["subscriptions"], LIST_API_VERSION)
    }
}

#[async_trait]
impl SubscriptionApi for AzureSubscriptionClient {
    async fn create_subscription_in_enrollment_account(
        &self,
        enrollment_account_name: &str,
        params: &CreationParameters,
    ) -> ApiResult<CreationOperation> {
        let url = self.create_url(enrollment_account_name)?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(params)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        parse_create_response(status, &headers, &body)
    }

    async fn poll_creation(&self, poll_url: &str) -> ApiResult<PollStatus> {
        debug!("GET {}", poll_url);

        let response = self
            .client
            .get(poll_url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        parse_poll_response(status, &headers, &body)
    }

    async fn list_subscriptions(&self, next_link: Option<&str>) -> ApiResult<SubscriptionPage> {
        let url = match next_link {
            Some(link) => link.to_string(),
            None => self.list_url()?.into(),
        };
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

/// ARM error envelope: {"error": {"code": "...", "message": "..."}}
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

fn status_error(status: StatusCode, body: &[u8]) -> ApiError {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => ApiError::Status {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => ApiError::Status {
            status: status.as_u16(),
            code: status
                .canonical_reason()
                .unwrap_or("Unknown")
                .replace(' ', ""),
            message: String::from_utf8_lossy(body).trim().to_string(),
        },
    }
}

/// Retry-After in delay-seconds form; HTTP-date values are ignored
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn creation_result(body: &[u8]) -> ApiResult<CreationResult> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreationResult::default());
    }
    Ok(serde_json::from_slice(body)?)
}

pub(crate) fn parse_create_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<CreationOperation> {
    match status {
        StatusCode::ACCEPTED => {
            let poll_url = headers
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::MissingHeader("Location"))?;
            Ok(CreationOperation::Pending {
                poll_url: poll_url.to_string(),
                retry_after: retry_after(headers),
            })
        }
        s if s.is_success() => Ok(CreationOperation::Completed(creation_result(body)?)),
        s => Err(status_error(s, body)),
    }
}

pub(crate) fn parse_poll_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<PollStatus> {
    match status {
        StatusCode::ACCEPTED => Ok(PollStatus::InProgress {
            retry_after: retry_after(headers),
        }),
        s if s.is_success() => Ok(PollStatus::Succeeded(creation_result(body)?)),
        s => Ok(PollStatus::Failed {
            message: status_error(s, body).to_string(),
        }),
    }
}
