//! Core shared types for the capability runtime.
//!
//! Identifiers, typed input schemas, and the validation step that turns raw
//! orchestrator arguments into [`ValidatedInput`].

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod schema;
mod validate;

/// Error type and result alias shared across the runtime.
pub use error::{Error, Result};
/// Capability, slug, and invocation identifiers.
pub use ids::{CapabilityId, InvocationId, Slug};
/// Input schema declarations.
pub use schema::{Constraint, FieldSpec, FieldType, InputSchema, InputSchemaBuilder};
/// Validation outcome types.
pub use validate::{ValidatedInput, ValidationError};
