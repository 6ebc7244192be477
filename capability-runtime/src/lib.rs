//! Capability registry runtime facade.
//!
//! Bundles the runtime crates behind feature flags so downstream users can
//! enable only the components they need.

#![warn(missing_docs, clippy::pedantic)]

/// Identifiers, input schemas, and validation.
pub use capability_primitives as primitives;

/// Descriptors, registry, and invocation (enabled by `registry` feature).
#[cfg(feature = "registry")]
pub use capability_registry as registry;

/// Service clients and service-backed capabilities (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use capability_adapters as adapters;

/// Node configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use capability_config as config;

/// Subscriber installation (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use capability_telemetry as telemetry;
