//! Schema - Define type schemas for resources
//!
//! Providers define a schema for each resource type so the host engine
//! can validate desired state before any remote call is made.

use std::collections::HashMap;
use std::fmt;

use crate::resource::Value;

/// Shape of an attribute value
///
/// Closed value sets (such as offer types) are expressed as `Custom` with a
/// validator, so normalization rules stay next to the resource that owns them.
#[derive(Debug, Clone)]
pub enum AttributeType {
    String,
    /// `base` is checked first, then `validate` runs on the same value
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    List(Box<AttributeType>),
    /// String-keyed map with values of the inner type
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Custom { base, validate, .. }, _) => {
                base.validate(value)?;
                validate(value).map_err(|message| TypeError::ValidationFailed { message })
            }
            (AttributeType::List(item_type), Value::List(items)) => items
                .iter()
                .enumerate()
                .try_for_each(|(index, item)| {
                    item_type
                        .validate(item)
                        .map_err(|e| TypeError::ListItemError {
                            index,
                            inner: Box::new(e),
                        })
                }),
            (AttributeType::Map(value_type), Value::Map(entries)) => {
                entries.iter().try_for_each(|(key, item)| {
                    value_type
                        .validate(item)
                        .map_err(|e| TypeError::MapValueError {
                            key: key.clone(),
                            inner: Box::new(e),
                        })
                })
            }
            _ => Err(TypeError::TypeMismatch {
                expected: self.to_string(),
                got: value.type_name().to_string(),
            }),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => f.write_str("String"),
            AttributeType::Custom { name, .. } => f.write_str(name),
            AttributeType::List(item_type) => write!(f, "List<{}>", item_type),
            AttributeType::Map(value_type) => write!(f, "Map<{}>", value_type),
        }
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Set by the provider, never by the user
    pub computed: bool,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    pub description: Option<String>,
    /// Provider-side property name (e.g., "displayName" for the Azure API)
    pub provider_name: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            force_new: false,
            description: None,
            provider_name: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Names of the attributes whose change forces a replacement
    pub fn force_new_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Validate desired attributes, collecting every problem found.
    /// Attributes the schema does not know are ignored.
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let missing = self
            .attributes
            .values()
            .filter(|a| a.required && !attributes.contains_key(&a.name))
            .map(|a| TypeError::MissingRequired {
                name: a.name.clone(),
            });

        let invalid = attributes.iter().filter_map(|(name, value)| {
            let schema = self.attributes.get(name)?;
            if schema.computed {
                Some(TypeError::ComputedAttribute { name: name.clone() })
            } else {
                schema.attr_type.validate(value).err()
            }
        });

        let errors: Vec<TypeError> = missing.chain(invalid).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
