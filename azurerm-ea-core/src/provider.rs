//! Provider - Trait abstracting resource operations
//!
//! A Provider defines operations for a specific infrastructure (Azure, etc.).
//! It is responsible for turning lifecycle calls from the host engine into
//! actual API calls.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::context::{StopContext, StopReason};
use crate::resource::{Resource, ResourceId, State};
use crate::schema::{ResourceSchema, TypeError};

/// Broad category of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Remote call could not be submitted or was rejected
    Api,
    /// Long-running operation failed or timed out
    Operation,
    /// Remote response lacked an expected field
    MissingField,
    /// Operation is not supported for this resource type
    Unsupported,
    /// Desired state does not satisfy the schema
    InvalidInput,
    Cancelled,
    DeadlineExceeded,
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unsupported, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ProviderErrorKind::MissingField,
            format!("Response is missing expected field '{}'", field),
        )
    }

    pub fn invalid_input(errors: &[TypeError]) -> Self {
        let joined = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self::new(ProviderErrorKind::InvalidInput, joined)
    }

    /// Error for a fired `StopContext`
    pub fn stopped(reason: StopReason) -> Self {
        let kind = match reason {
            StopReason::Cancelled => ProviderErrorKind::Cancelled,
            StopReason::DeadlineExceeded => ProviderErrorKind::DeadlineExceeded,
        };
        Self::new(kind, reason.to_string())
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "ea_subscription")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// Each infrastructure provider implements this trait.
/// All operations are async, involve side effects and observe the
/// `StopContext` supplied by the host engine.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "azurerm")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Refresh a recorded state against the remote resource
    ///
    /// Returns `State::not_found()` if the resource no longer exists.
    /// On error the caller keeps its current record untouched.
    fn read<'a>(
        &'a self,
        ctx: &'a StopContext,
        current: &'a State,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the provider's internal ID
    fn create<'a>(
        &'a self,
        ctx: &'a StopContext,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    /// Update a resource
    fn update<'a>(
        &'a self,
        ctx: &'a StopContext,
        from: &'a State,
        to: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    /// Delete a resource
    fn delete<'a>(
        &'a self,
        ctx: &'a StopContext,
        current: &'a State,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Bring an existing remote resource under management by its identifier
    fn import<'a>(
        &'a self,
        ctx: &'a StopContext,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<State>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read<'a>(
        &'a self,
        ctx: &'a StopContext,
        current: &'a State,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).read(ctx, current)
    }

    fn create<'a>(
        &'a self,
        ctx: &'a StopContext,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).create(ctx, resource)
    }

    fn update<'a>(
        &'a self,
        ctx: &'a StopContext,
        from: &'a State,
        to: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).update(ctx, from, to)
    }

    fn delete<'a>(
        &'a self,
        ctx: &'a StopContext,
        current: &'a State,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        (**self).delete(ctx, current)
    }

    fn import<'a>(
        &'a self,
        ctx: &'a StopContext,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).import(ctx, id, identifier)
    }
}
