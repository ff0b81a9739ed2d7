//! In-memory stand-ins for the Azure API and the poll clock, used by tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{
    ApiError, ApiResult, CreationOperation, CreationParameters, PollStatus, SubscriptionApi,
    SubscriptionPage, SubscriptionRecord,
};
use crate::lro::Sleeper;

const PAGE_LINK_PREFIX: &str = "fake://subscriptions?page=";

/// Scripted `SubscriptionApi`
#[derive(Default)]
pub struct FakeSubscriptionApi {
    create_results: Mutex<VecDeque<ApiResult<CreationOperation>>>,
    poll_statuses: Mutex<VecDeque<ApiResult<PollStatus>>>,
    pages: Vec<Vec<SubscriptionRecord>>,
    last_page_links_to_itself: bool,
    list_failure: Mutex<Option<(usize, ApiError)>>,
    create_calls: Mutex<Vec<(String, CreationParameters)>>,
    poll_calls: Mutex<usize>,
    list_calls: Mutex<Vec<Option<String>>>,
}

impl FakeSubscriptionApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create_result(self, result: ApiResult<CreationOperation>) -> Self {
        self.create_results.lock().unwrap().push_back(result);
        self
    }

    pub fn with_poll_statuses(self, statuses: Vec<ApiResult<PollStatus>>) -> Self {
        self.poll_statuses.lock().unwrap().extend(statuses);
        self
    }

    /// Listing split into pages, each linked to the next
    pub fn with_pages(mut self, pages: Vec<Vec<SubscriptionRecord>>) -> Self {
        self.pages = pages;
        self
    }

    /// Make the last page's nextLink point back at that same page
    pub fn with_self_linked_last_page(mut self) -> Self {
        self.last_page_links_to_itself = true;
        self
    }

    /// Fail the fetch of the given zero-based page once
    pub fn with_list_failure(self, page: usize, err: ApiError) -> Self {
        *self.list_failure.lock().unwrap() = Some((page, err));
        self
    }

    pub fn create_calls(&self) -> Vec<(String, CreationParameters)> {
        self.create_calls.lock().unwrap().clone()
    }

    pub fn poll_calls(&self) -> usize {
        *self.poll_calls.lock().unwrap()
    }

    pub fn list_calls(&self) -> Vec<Option<String>> {
        self.list_calls.lock().unwrap().clone()
    }
}

fn not_found(message: String) -> ApiError {
    ApiError::Status {
        status: 404,
        code: "NotFound".to_string(),
        message,
    }
}

/// Build a listing record the way the management API reports it
pub fn subscription(guid: &str, display_name: &str) -> SubscriptionRecord {
    SubscriptionRecord {
        id: Some(format!("/subscriptions/{}", guid)),
        subscription_id: Some(guid.to_string()),
        display_name: Some(display_name.to_string()),
        state: Some("Enabled".to_string()),
    }
}

#[async_trait]
impl SubscriptionApi for FakeSubscriptionApi {
    async fn create_subscription_in_enrollment_account(
        &self,
        enrollment_account_name: &str,
        params: &CreationParameters,
    ) -> ApiResult<CreationOperation> {
        self.create_calls
            .lock()
            .unwrap()
            .push((enrollment_account_name.to_string(), params.clone()));
        self.create_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(not_found("no scripted create result".to_string())))
    }

    async fn poll_creation(&self, _poll_url: &str) -> ApiResult<PollStatus> {
        *self.poll_calls.lock().unwrap() += 1;
        self.poll_statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(PollStatus::InProgress { retry_after: None }))
    }

    async fn list_subscriptions(&self, next_link: Option<&str>) -> ApiResult<SubscriptionPage> {
        self.list_calls
            .lock()
            .unwrap()
            .push(next_link.map(str::to_string));

        let index = match next_link {
            None => 0,
            Some(link) => link
                .strip_prefix(PAGE_LINK_PREFIX)
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| not_found(format!("unknown page link {}", link)))?,
        };

        {
            let mut failure = self.list_failure.lock().unwrap();
            if matches!(failure.as_ref(), Some((page, _)) if *page == index)
                && let Some((_, err)) = failure.take()
            {
                return Err(err);
            }
        }

        let value = self.pages.get(index).cloned().unwrap_or_default();
        let next_index = if index + 1 < self.pages.len() {
            Some(index + 1)
        } else {
            self.last_page_links_to_itself.then_some(index)
        };
        let next_link = next_index.map(|n| format!("{}{}", PAGE_LINK_PREFIX, n));
        Ok(SubscriptionPage { value, next_link })
    }
}

/// Sleeper that returns immediately and remembers what it was asked to wait
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}
