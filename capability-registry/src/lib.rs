//! Capability registration, discovery, and invocation.
//!
//! [`CapabilityRegistry`] owns every [`CapabilityDescriptor`] and is the only
//! gateway to their execution bodies: each `invoke` resolves the identity or
//! slug, validates the arguments against the descriptor's schema, and only
//! then runs the capability.

#![warn(missing_docs, clippy::pedantic)]

pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod observer;
pub mod registry;

pub use descriptor::{Capability, CapabilityDescriptor, CapabilityDescriptorBuilder, CapabilitySummary};
pub use discovery::{DiscoveredCapability, DiscoveryError};
pub use error::{
    CapabilityError, CapabilityErrorKind, CapabilityResult, InvocationCause, InvocationError,
    InvocationResult, InvocationStage, LookupError, RegistrationError,
};
pub use observer::{CompositeObserver, InvocationObserver, InvocationReport, TracingObserver};
pub use registry::{CapabilityListing, CapabilityRegistry, ListingIter};

#[doc(hidden)]
pub use inventory;
