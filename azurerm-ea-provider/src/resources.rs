//! Resource type definitions for the Azure EA provider

use azurerm_ea_core::provider::ResourceType;
use azurerm_ea_core::schema::ResourceSchema;

use crate::schemas::ea_subscription::ea_subscription_config;

/// EA subscription resource type
pub struct EaSubscriptionType;

impl ResourceType for EaSubscriptionType {
    fn name(&self) -> &'static str {
        "ea_subscription"
    }

    fn schema(&self) -> ResourceSchema {
        ea_subscription_config().schema
    }
}

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![Box::new(EaSubscriptionType)]
}
