//! Long-running operation polling
//!
//! Subscription creation is asynchronous on the server side. The poller
//! turns it into a single awaited call: poll, sleep, repeat until the
//! operation reaches a terminal state, the attempt budget runs out, or the
//! stop context fires.

use std::time::Duration;

use async_trait::async_trait;
use azurerm_ea_core::context::StopContext;
use azurerm_ea_core::provider::{ProviderError, ProviderErrorKind, ProviderResult};
use log::debug;

use crate::api::{CreationOperation, CreationResult, PollStatus, SubscriptionApi};
use crate::error::api_error;

/// How often and how long to poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between polls when the server gives no hint
    pub interval: Duration,
    /// Upper bound for any single delay, including server hints
    pub max_interval: Duration,
    /// Number of status checks before giving up
    pub max_attempts: u32,
    /// Use the server's Retry-After hint when present
    pub honor_retry_after: bool,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(60),
            max_attempts: 120,
            honor_retry_after: true,
        }
    }
}

impl PollPolicy {
    /// Delay before the next poll
    pub fn next_delay(&self, retry_after: Option<Duration>) -> Duration {
        let delay = match retry_after {
            Some(hint) if self.honor_retry_after => hint,
            _ => self.interval,
        };
        delay.min(self.max_interval)
    }
}

/// Clock abstraction for the wait between polls
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by tokio
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Wait for a creation operation to reach a terminal state
pub async fn wait_for_completion(
    api: &dyn SubscriptionApi,
    operation: CreationOperation,
    policy: &PollPolicy,
    sleeper: &dyn Sleeper,
    ctx: &StopContext,
) -> ProviderResult<CreationResult> {
    let (poll_url, mut retry_after) = match operation {
        CreationOperation::Completed(result) => return Ok(result),
        CreationOperation::Pending {
            poll_url,
            retry_after,
        } => (poll_url, retry_after),
    };

    for attempt in 1..=policy.max_attempts {
        let delay = policy.next_delay(retry_after);
        debug!(
            "Waiting {:?} before poll {} of {}",
            delay, attempt, policy.max_attempts
        );
        tokio::select! {
            biased;
            reason = ctx.stopped() => return Err(ProviderError::stopped(reason)),
            _ = sleeper.sleep(delay) => {}
        }

        let status = tokio::select! {
            biased;
            reason = ctx.stopped() => return Err(ProviderError::stopped(reason)),
            status = api.poll_creation(&poll_url) => status.map_err(api_error)?,
        };

        match status {
            PollStatus::Succeeded(result) => {
                debug!("Operation succeeded after {} poll(s)", attempt);
                return Ok(result);
            }
            PollStatus::Failed { message } => {
                return Err(ProviderError::new(
                    ProviderErrorKind::Operation,
                    format!("Operation failed: {}", message),
                ));
            }
            PollStatus::InProgress { retry_after: hint } => {
                retry_after = hint;
            }
        }
    }

    Err(ProviderError::new(
        ProviderErrorKind::Operation,
        format!(
            "Operation timed out after {} status checks",
            policy.max_attempts
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeSubscriptionApi, RecordingSleeper};

    fn pending() -> CreationOperation {
        CreationOperation::Pending {
            poll_url: "https://management.azure.com/operations/op-1".to_string(),
            retry_after: None,
        }
    }

    fn linked(link: &str) -> CreationResult {
        CreationResult {
            subscription_link: Some(link.to_string()),
        }
    }

    #[test]
    fn next_delay_caps_server_hint() {
        let policy = PollPolicy::default();
        assert_eq!(policy.next_delay(None), Duration::from_secs(5));
        assert_eq!(
            policy.next_delay(Some(Duration::from_secs(10))),
            Duration::from_secs(10)
        );
        assert_eq!(
            policy.next_delay(Some(Duration::from_secs(600))),
            Duration::from_secs(60)
        );

        let ignore_hint = PollPolicy {
            honor_retry_after: false,
            ..PollPolicy::default()
        };
        assert_eq!(
            ignore_hint.next_delay(Some(Duration::from_secs(10))),
            Duration::from_secs(5)
        );
    }

    #[tokio::test]
    async fn completed_operation_skips_polling() {
        let api = FakeSubscriptionApi::new();
        let sleeper = RecordingSleeper::default();
        let result = wait_for_completion(
            &api,
            CreationOperation::Completed(linked("/subscriptions/abc123")),
            &PollPolicy::default(),
            &sleeper,
            &StopContext::background(),
        )
        .await
        .unwrap();

        assert_eq!(result, linked("/subscriptions/abc123"));
        assert_eq!(api.poll_calls(), 0);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn polls_until_success_using_server_hints() {
        let api = FakeSubscriptionApi::new().with_poll_statuses(vec![
            Ok(PollStatus::InProgress {
                retry_after: Some(Duration::from_secs(15)),
            }),
            Ok(PollStatus::InProgress { retry_after: None }),
            Ok(PollStatus::Succeeded(linked("/subscriptions/abc123"))),
        ]);
        let sleeper = RecordingSleeper::default();

        let result = wait_for_completion(
            &api,
            pending(),
            &PollPolicy::default(),
            &sleeper,
            &StopContext::background(),
        )
        .await
        .unwrap();

        assert_eq!(result, linked("/subscriptions/abc123"));
        assert_eq!(api.poll_calls(), 3);
        assert_eq!(
            sleeper.delays(),
            vec![
                Duration::from_secs(5),
                Duration::from_secs(15),
                Duration::from_secs(5)
            ]
        );
    }

    #[tokio::test]
    async fn failed_operation_is_reported() {
        let api = FakeSubscriptionApi::new().with_poll_statuses(vec![Ok(PollStatus::Failed {
            message: "Offer type not allowed".to_string(),
        })]);

        let err = wait_for_completion(
            &api,
            pending(),
            &PollPolicy::default(),
            &RecordingSleeper::default(),
            &StopContext::background(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::Operation);
        assert_eq!(err.message, "Operation failed: Offer type not allowed");
    }

    #[tokio::test]
    async fn poll_transport_error_is_not_retried() {
        let api = FakeSubscriptionApi::new().with_poll_statuses(vec![
            Err(crate::api::ApiError::Status {
                status: 500,
                code: "InternalServerError".to_string(),
                message: "boom".to_string(),
            }),
            Ok(PollStatus::Succeeded(linked("/subscriptions/abc123"))),
        ]);

        let err = wait_for_completion(
            &api,
            pending(),
            &PollPolicy::default(),
            &RecordingSleeper::default(),
            &StopContext::background(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::Api);
        assert_eq!(
            err.message,
            "Azure API returned 500: InternalServerError: boom"
        );
        assert_eq!(api.poll_calls(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let api = FakeSubscriptionApi::new().with_poll_statuses(vec![
            Ok(PollStatus::InProgress { retry_after: None }),
            Ok(PollStatus::InProgress { retry_after: None }),
            Ok(PollStatus::InProgress { retry_after: None }),
        ]);
        let policy = PollPolicy {
            max_attempts: 3,
            ..PollPolicy::default()
        };

        let err = wait_for_completion(
            &api,
            pending(),
            &policy,
            &RecordingSleeper::default(),
            &StopContext::background(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::Operation);
        assert_eq!(err.message, "Operation timed out after 3 status checks");
        assert_eq!(api.poll_calls(), 3);
    }

    #[tokio::test]
    async fn cancellation_aborts_the_wait() {
        let api = FakeSubscriptionApi::new();
        let (handle, ctx) = StopContext::new();
        handle.stop();

        let err = wait_for_completion(
            &api,
            pending(),
            &PollPolicy::default(),
            &TokioSleeper,
            &ctx,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::Cancelled);
        assert_eq!(api.poll_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_a_slow_operation() {
        // Every poll reports progress; only the deadline can end the wait
        let api = FakeSubscriptionApi::new().with_poll_statuses(
            (0..1000)
                .map(|_| Ok(PollStatus::InProgress { retry_after: None }))
                .collect(),
        );
        let ctx = StopContext::background().with_timeout(Duration::from_secs(12));

        let err = wait_for_completion(
            &api,
            pending(),
            &PollPolicy::default(),
            &TokioSleeper,
            &ctx,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::DeadlineExceeded);
        assert_eq!(api.poll_calls(), 2);
    }
}
