//! Azure Provider implementation
//!
//! This module contains the provider that manages EA subscriptions through
//! the Azure subscription API.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use azurerm_ea_core::context::StopContext;
use azurerm_ea_core::provider::{ProviderError, ProviderErrorKind, ProviderResult};
use azurerm_ea_core::resource::{Resource, ResourceId, State, Value};
use log::{debug, info, warn};

use crate::api::{AdPrincipal, CreationParameters, SubscriptionApi, SubscriptionRecord};
use crate::client::AzureSubscriptionClient;
use crate::config::ProviderConfig;
use crate::error::{ConfigError, api_error};
use crate::lro::{PollPolicy, Sleeper, TokioSleeper, wait_for_completion};
use crate::schemas::{AzureSchemaConfig, get_schema_config, normalize_namespaced_enum};

pub const UPDATE_UNSUPPORTED: &str = "EA Subscriptions cannot currently be updated";
pub const DELETE_UNSUPPORTED: &str = "EA Subscriptions cannot currently be deleted";

/// Azure EA subscription provider
pub struct AzureProvider {
    api: Arc<dyn SubscriptionApi>,
    poll: PollPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl AzureProvider {
    /// Create a provider talking to the Azure management plane over HTTP
    pub fn from_config(config: ProviderConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder().build()?;
        let client = AzureSubscriptionClient::new(http, config.endpoint, config.access_token);
        Ok(Self::with_client(Arc::new(client), config.poll))
    }

    /// Create a provider on top of any subscription API implementation
    pub fn with_client(api: Arc<dyn SubscriptionApi>, poll: PollPolicy) -> Self {
        Self {
            api,
            poll,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the clock used between operation polls
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    // =========================================================================
    // Subscription API Methods
    // =========================================================================

    /// Walk every page of the subscription listing until `matches` accepts a record
    async fn find_subscription(
        &self,
        ctx: &StopContext,
        matches: impl Fn(&SubscriptionRecord) -> bool,
    ) -> ProviderResult<Option<SubscriptionRecord>> {
        let mut next_link: Option<String> = None;
        let mut visited: HashSet<String> = HashSet::new();
        let mut pages = 0usize;

        loop {
            let page = tokio::select! {
                biased;
                reason = ctx.stopped() => return Err(ProviderError::stopped(reason)),
                page = self.api.list_subscriptions(next_link.as_deref()) => page.map_err(api_error)?,
            };
            pages += 1;
            debug!(
                "Scanning subscription page {} ({} records)",
                pages,
                page.value.len()
            );

            if let Some(found) = page.value.into_iter().find(|r| matches(r)) {
                return Ok(Some(found));
            }

            match page.next_link {
                Some(link) if !link.is_empty() => {
                    if !visited.insert(link.clone()) {
                        return Err(ProviderError::new(
                            ProviderErrorKind::Api,
                            format!("Subscription listing links back to page {}", link),
                        ));
                    }
                    next_link = Some(link);
                }
                _ => return Ok(None),
            }
        }
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Refresh a recorded subscription by matching its display name
    pub async fn read_resource(&self, ctx: &StopContext, current: &State) -> ProviderResult<State> {
        let id = current.id.clone();
        schema_config(&id)?;

        let Some(display_name) = current.get_string("display_name") else {
            debug!("{}.{} has no display_name; nothing to match", id.resource_type, id.name);
            return Ok(State::not_found(id));
        };

        let found = self
            .find_subscription(ctx, |r| r.display_name.as_deref() == Some(display_name))
            .await
            .map_err(|e| e.for_resource(id.clone()))?;

        let Some(record) = found else {
            info!(
                "No subscription named '{}' found; treating {}.{} as deleted",
                display_name, id.resource_type, id.name
            );
            return Ok(State::not_found(id));
        };

        let link = record
            .id
            .clone()
            .ok_or_else(|| ProviderError::missing_field("id").for_resource(id.clone()))?;
        debug!("Matched subscription '{}' to {}", display_name, link);

        let mut attributes = current.attributes.clone();
        merge_record(&record, &mut attributes);
        Ok(State::existing(id, attributes).with_identifier(link))
    }

    /// Create a subscription and wait for the operation to finish
    pub async fn create_resource(
        &self,
        ctx: &StopContext,
        resource: &Resource,
    ) -> ProviderResult<State> {
        let id = resource.id.clone();
        let config = schema_config(&id)?;
        config
            .schema
            .validate(&resource.attributes)
            .map_err(|errors| ProviderError::invalid_input(&errors).for_resource(id.clone()))?;

        let enrollment_account_name = required_string(resource, "enrollment_account_name")?;
        let params = CreationParameters {
            display_name: required_string(resource, "display_name")?.to_string(),
            offer_type: normalize_namespaced_enum(required_string(resource, "offer_type")?),
            owners: owners_from_value(resource.attributes.get("owners")),
        };

        info!(
            "Creating {} '{}' ({}) in enrollment account '{}'",
            config.azure_type_name, params.display_name, params.offer_type, enrollment_account_name
        );
        let operation = tokio::select! {
            biased;
            reason = ctx.stopped() => {
                return Err(ProviderError::stopped(reason).for_resource(id.clone()));
            }
            op = self
                .api
                .create_subscription_in_enrollment_account(enrollment_account_name, &params) => {
                op.map_err(|e| api_error(e).for_resource(id.clone()))?
            }
        };

        let result = wait_for_completion(
            self.api.as_ref(),
            operation,
            &self.poll,
            self.sleeper.as_ref(),
            ctx,
        )
        .await
        .map_err(|e| e.for_resource(id.clone()))?;

        let link = result
            .subscription_link
            .filter(|l| !l.is_empty())
            .ok_or_else(|| {
                ProviderError::missing_field("subscriptionLink").for_resource(id.clone())
            })?;
        info!("Created EA subscription {}", link);

        let created = State::from(resource).with_identifier(link.clone());
        let refreshed = self.read_resource(ctx, &created).await?;
        if !refreshed.exists {
            warn!(
                "Subscription {} is not listed under '{}' yet; no identifier recorded",
                link, params.display_name
            );
        }
        Ok(refreshed)
    }

    /// Look up an existing subscription by its link
    pub async fn import_resource(
        &self,
        ctx: &StopContext,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        schema_config(id)?;

        let found = self
            .find_subscription(ctx, |r| {
                r.id
                    .as_deref()
                    .is_some_and(|link| link.eq_ignore_ascii_case(identifier))
            })
            .await
            .map_err(|e| e.for_resource(id.clone()))?;

        let record = found.ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::InvalidInput,
                format!("Subscription {} was not found", identifier),
            )
            .for_resource(id.clone())
        })?;

        let link = record.id.clone().unwrap_or_else(|| identifier.to_string());
        info!("Imported subscription {} as {}.{}", link, id.resource_type, id.name);

        let mut attributes = HashMap::new();
        merge_record(&record, &mut attributes);
        Ok(State::existing(id.clone(), attributes).with_identifier(link))
    }

    /// Subscriptions are immutable once created
    pub fn update_resource(&self, id: &ResourceId) -> ProviderResult<State> {
        Err(ProviderError::unsupported(UPDATE_UNSUPPORTED).for_resource(id.clone()))
    }

    /// Subscriptions outlive the record; removal only drops local state
    pub fn delete_resource(&self, id: &ResourceId) -> ProviderResult<()> {
        Err(ProviderError::unsupported(DELETE_UNSUPPORTED).for_resource(id.clone()))
    }
}

// =============================================================================
// Value Conversion Helpers
// =============================================================================

fn schema_config(id: &ResourceId) -> ProviderResult<AzureSchemaConfig> {
    get_schema_config(&id.resource_type).ok_or_else(|| {
        ProviderError::unsupported(format!("Unknown resource type: {}", id.resource_type))
            .for_resource(id.clone())
    })
}

fn required_string<'a>(resource: &'a Resource, key: &str) -> ProviderResult<&'a str> {
    resource.get_string(key).ok_or_else(|| {
        ProviderError::new(
            ProviderErrorKind::InvalidInput,
            format!("Required attribute '{}' is missing", key),
        )
        .for_resource(resource.id.clone())
    })
}

/// Convert `owners = [{ object_id = "..." }]` into API principals
fn owners_from_value(value: Option<&Value>) -> Vec<AdPrincipal> {
    let Some(Value::List(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Map(map) => map.get("object_id").and_then(Value::as_str),
            _ => None,
        })
        .map(|object_id| AdPrincipal {
            object_id: object_id.to_string(),
        })
        .collect()
}

/// Copy the attributes the listing reports into a state attribute map
fn merge_record(record: &SubscriptionRecord, attributes: &mut HashMap<String, Value>) {
    if let Some(name) = &record.display_name {
        attributes.insert("display_name".to_string(), Value::String(name.clone()));
    }
    if let Some(guid) = &record.subscription_id {
        attributes.insert("subscription_id".to_string(), Value::String(guid.clone()));
    }
}
