//! Resource schemas for the Azure EA provider

use azurerm_ea_core::resource::Value;
use azurerm_ea_core::schema::ResourceSchema;

pub mod ea_subscription;

/// Azure schema configuration
///
/// Combines the ResourceSchema with Azure-specific metadata.
pub struct AzureSchemaConfig {
    /// Azure resource provider type (e.g., "Microsoft.Subscription/subscriptions")
    pub azure_type_name: &'static str,
    /// The resource schema with attribute definitions
    pub schema: ResourceSchema,
}

/// Normalize a namespaced enum value to its wire value.
/// Handles formats like:
/// - "MS-AZR-0017P" -> "MS-AZR-0017P"
/// - "OfferType.MS_AZR_0017P" -> "MS-AZR-0017P"
/// - "azurerm.ea_subscription.OfferType.MS_AZR_0017P" -> "MS-AZR-0017P"
pub fn normalize_namespaced_enum(s: &str) -> String {
    s.split('.').next_back().unwrap_or(s).replace('_', "-")
}

/// Validate a namespaced enum value.
/// Returns Ok(()) if valid, Err with message if invalid.
pub fn validate_namespaced_enum(
    value: &Value,
    type_name: &str,
    namespace: &str,
    valid_values: &[&str],
) -> Result<(), String> {
    let Value::String(s) = value else {
        return Err("Expected string".to_string());
    };

    if s.contains('.') {
        let parts: Vec<&str> = s.split('.').collect();
        let expected_namespace: Vec<&str> = namespace.split('.').collect();
        let well_formed = match parts.len() {
            // TypeName.value
            2 => parts[0] == type_name,
            // azurerm.resource.TypeName.value
            4 => {
                expected_namespace.len() == 2
                    && parts[0] == expected_namespace[0]
                    && parts[1] == expected_namespace[1]
                    && parts[2] == type_name
            }
            _ => false,
        };
        if !well_formed {
            return Err(format!(
                "Invalid format '{}', expected one of: value, {}.value, or {}.{}.value",
                s, type_name, namespace, type_name
            ));
        }
    }

    let normalized = normalize_namespaced_enum(s);
    if valid_values.contains(&normalized.as_str()) {
        Ok(())
    } else {
        Err(format!(
            "Invalid value '{}', expected one of: {}",
            s,
            valid_values.join(", ")
        ))
    }
}

/// Returns all schema configs
pub fn configs() -> Vec<AzureSchemaConfig> {
    vec![ea_subscription::ea_subscription_config()]
}

/// Get the schema config for a resource type
pub fn get_schema_config(resource_type: &str) -> Option<AzureSchemaConfig> {
    configs().into_iter().find(|c| {
        // Match by schema resource_type: "azurerm.ea_subscription" -> "ea_subscription"
        c.schema
            .resource_type
            .strip_prefix("azurerm.")
            .is_some_and(|t| t == resource_type)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUES: &[&str] = &["MS-AZR-0017P", "MS-AZR-0148P"];

    fn check(s: &str) -> Result<(), String> {
        validate_namespaced_enum(
            &Value::String(s.to_string()),
            "OfferType",
            "azurerm.ea_subscription",
            VALUES,
        )
    }

    #[test]
    fn normalize_forms() {
        assert_eq!(normalize_namespaced_enum("MS-AZR-0017P"), "MS-AZR-0017P");
        assert_eq!(
            normalize_namespaced_enum("OfferType.MS_AZR_0148P"),
            "MS-AZR-0148P"
        );
        assert_eq!(
            normalize_namespaced_enum("azurerm.ea_subscription.OfferType.MS_AZR_0017P"),
            "MS-AZR-0017P"
        );
    }

    #[test]
    fn validate_accepts_all_forms() {
        assert!(check("MS-AZR-0017P").is_ok());
        assert!(check("MS_AZR_0017P").is_ok());
        assert!(check("OfferType.MS_AZR_0148P").is_ok());
        assert!(check("azurerm.ea_subscription.OfferType.MS_AZR_0017P").is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert_eq!(
            check("MS-AZR-0003P").unwrap_err(),
            "Invalid value 'MS-AZR-0003P', expected one of: MS-AZR-0017P, MS-AZR-0148P"
        );
        assert!(check("Other.MS_AZR_0017P").is_err());
        assert!(check("azurerm.vpc.OfferType.MS_AZR_0017P").is_err());
        assert!(
            validate_namespaced_enum(&Value::Int(1), "OfferType", "azurerm.x", VALUES).is_err()
        );
    }

    #[test]
    fn schema_config_lookup() {
        let config = get_schema_config("ea_subscription").unwrap();
        assert_eq!(config.schema.resource_type, "azurerm.ea_subscription");
        assert!(get_schema_config("vpc").is_none());
    }
}
