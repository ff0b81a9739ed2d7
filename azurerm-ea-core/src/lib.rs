//! AzureRM EA Core
//!
//! Provider-agnostic building blocks for the EA subscription provider:
//! resource values and state, attribute schemas, the `Provider` trait and the
//! stop context threaded through every lifecycle call.

pub mod context;
pub mod provider;
pub mod resource;
pub mod schema;
