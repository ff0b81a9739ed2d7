//! AzureRM EA Provider
//!
//! Manages Enterprise Agreement subscriptions through the Azure
//! subscription API.
//!
//! ## Module Structure
//!
//! - `api` - `SubscriptionApi` trait and wire types
//! - `client` - reqwest-based implementation of the API
//! - `lro` - Polling of long-running creation operations
//! - `provider` - AzureProvider implementation
//! - `resources` - Resource type definitions
//! - `schemas` - Resource schemas

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod lro;
pub mod provider;
pub mod resources;
pub mod schemas;

#[cfg(test)]
mod fake;

// Re-export main types
pub use api::{ApiError, SubscriptionApi};
pub use client::AzureSubscriptionClient;
pub use config::ProviderConfig;
pub use error::ConfigError;
pub use lro::{PollPolicy, Sleeper, TokioSleeper};
pub use provider::AzureProvider;

use azurerm_ea_core::context::StopContext;
use azurerm_ea_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use azurerm_ea_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for AzureProvider {
    fn name(&self) -> &'static str {
        "azurerm"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read<'a>(
        &'a self,
        ctx: &'a StopContext,
        current: &'a State,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(self.read_resource(ctx, current))
    }

    fn create<'a>(
        &'a self,
        ctx: &'a StopContext,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(self.create_resource(ctx, resource))
    }

    fn update<'a>(
        &'a self,
        _ctx: &'a StopContext,
        from: &'a State,
        _to: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(async move { self.update_resource(&from.id) })
    }

    fn delete<'a>(
        &'a self,
        _ctx: &'a StopContext,
        current: &'a State,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.delete_resource(&current.id) })
    }

    fn import<'a>(
        &'a self,
        ctx: &'a StopContext,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(self.import_resource(ctx, id, identifier))
    }
}
