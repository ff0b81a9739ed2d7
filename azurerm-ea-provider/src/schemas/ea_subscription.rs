//! ea_subscription schema definition
//!
//! An Enterprise Agreement subscription created under an enrollment account.
//! Every user-settable attribute forces a new resource; the subscription
//! cannot be updated or deleted through the provider.

use super::AzureSchemaConfig;
use super::validate_namespaced_enum;
use azurerm_ea_core::resource::Value;
use azurerm_ea_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

pub const VALID_OFFER_TYPES: &[&str] = &["MS-AZR-0017P", "MS-AZR-0148P"];

fn validate_offer_type(value: &Value) -> Result<(), String> {
    validate_namespaced_enum(
        value,
        "OfferType",
        "azurerm.ea_subscription",
        VALID_OFFER_TYPES,
    )
}

fn validate_owner(value: &Value) -> Result<(), String> {
    let Value::Map(map) = value else {
        return Err("Expected map".to_string());
    };
    if let Some(key) = map.keys().find(|k| k.as_str() != "object_id") {
        return Err(format!("Unknown owner field '{}'", key));
    }
    match map.get("object_id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(()),
        Some(_) => Err("object_id must be a non-empty string".to_string()),
        None => Err("object_id is required".to_string()),
    }
}

/// Owner entry: { object_id = "..." }
pub fn owner_type() -> AttributeType {
    AttributeType::Custom {
        name: "Owner".to_string(),
        base: Box::new(AttributeType::Map(Box::new(AttributeType::String))),
        validate: validate_owner,
    }
}

/// Returns the schema config for ea_subscription
pub fn ea_subscription_config() -> AzureSchemaConfig {
    AzureSchemaConfig {
        azure_type_name: "Microsoft.Subscription/subscriptions",
        schema: ResourceSchema::new("azurerm.ea_subscription")
            .with_description("Enterprise Agreement subscription created under an enrollment account")
            .attribute(
                AttributeSchema::new("display_name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Display name of the subscription; also used to find it again.")
                    .with_provider_name("displayName"),
            )
            .attribute(
                AttributeSchema::new("enrollment_account_name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Name of the enrollment account the subscription is billed to."),
            )
            .attribute(
                AttributeSchema::new(
                    "offer_type",
                    AttributeType::Custom {
                        name: "OfferType".to_string(),
                        base: Box::new(AttributeType::String),
                        validate: validate_offer_type,
                    },
                )
                .required()
                .force_new()
                .with_description("Billing offer: MS-AZR-0017P (EA) or MS-AZR-0148P (EA Dev/Test).")
                .with_provider_name("offerType"),
            )
            .attribute(
                AttributeSchema::new("subscription_id", AttributeType::String)
                    .computed()
                    .with_description("GUID of the created subscription (read-only)")
                    .with_provider_name("subscriptionId"),
            )
            .attribute(
                AttributeSchema::new("owners", AttributeType::List(Box::new(owner_type())))
                    .force_new()
                    .with_description("Azure AD principals that become owners of the subscription.")
                    .with_provider_name("owners"),
            ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azurerm_ea_core::schema::TypeError;
    use std::collections::HashMap;

    fn owner(id: &str) -> Value {
        Value::Map(HashMap::from([(
            "object_id".to_string(),
            Value::String(id.to_string()),
        )]))
    }

    fn valid_attrs() -> HashMap<String, Value> {
        HashMap::from([
            ("display_name".to_string(), Value::String("acct-A".to_string())),
            (
                "enrollment_account_name".to_string(),
                Value::String("ea-1".to_string()),
            ),
            (
                "offer_type".to_string(),
                Value::String("MS-AZR-0017P".to_string()),
            ),
            ("owners".to_string(), Value::List(vec![owner("0000-1111")])),
        ])
    }

    #[test]
    fn valid_subscription_passes() {
        let schema = ea_subscription_config().schema;
        assert!(schema.validate(&valid_attrs()).is_ok());
    }

    #[test]
    fn required_attributes_are_enforced() {
        let schema = ea_subscription_config().schema;
        let mut errors = schema.validate(&HashMap::new()).unwrap_err();
        errors.sort_by_key(|e| e.to_string());
        let names: Vec<String> = errors
            .iter()
            .map(|e| match e {
                TypeError::MissingRequired { name } => name.clone(),
                other => panic!("unexpected error {other}"),
            })
            .collect();
        assert_eq!(
            names,
            vec!["display_name", "enrollment_account_name", "offer_type"]
        );
    }

    #[test]
    fn subscription_id_is_computed() {
        let schema = ea_subscription_config().schema;
        let mut attrs = valid_attrs();
        attrs.insert(
            "subscription_id".to_string(),
            Value::String("abc123".to_string()),
        );
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(
            &errors[..],
            [TypeError::ComputedAttribute { name }] if name == "subscription_id"
        ));
    }

    #[test]
    fn invalid_offer_type_is_rejected() {
        let schema = ea_subscription_config().schema;
        let mut attrs = valid_attrs();
        attrs.insert(
            "offer_type".to_string(),
            Value::String("MS-AZR-0003P".to_string()),
        );
        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn owner_requires_object_id_only() {
        let t = owner_type();
        assert!(t.validate(&owner("abc")).is_ok());
        assert!(t.validate(&owner("")).is_err());
        assert!(t.validate(&Value::Map(HashMap::new())).is_err());

        let extra = Value::Map(HashMap::from([
            ("object_id".to_string(), Value::String("abc".to_string())),
            ("tenant_id".to_string(), Value::String("t".to_string())),
        ]));
        assert_eq!(
            t.validate(&extra).unwrap_err().to_string(),
            "Validation failed: Unknown owner field 'tenant_id'"
        );
    }

    #[test]
    fn every_settable_attribute_forces_new() {
        let schema = ea_subscription_config().schema;
        assert_eq!(
            schema.force_new_attributes(),
            vec!["display_name", "enrollment_account_name", "offer_type", "owners"]
        );
    }
}
