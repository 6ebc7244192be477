//! Link-time declarative discovery of capabilities.
//!
//! Crates submit constructors with [`submit_capability!`](crate::submit_capability);
//! [`CapabilityRegistry::discover`] builds every submitted descriptor and
//! registers it. Constructors take no arguments, so discovery suits
//! capabilities without injected clients.

use capability_primitives::Result;
use thiserror::Error;
use tracing::debug;

use crate::descriptor::CapabilityDescriptor;
use crate::error::RegistrationError;
use crate::registry::CapabilityRegistry;

/// Constructor submitted for discovery.
#[derive(Debug)]
pub struct DiscoveredCapability {
    constructor: fn() -> Result<CapabilityDescriptor>,
}

impl DiscoveredCapability {
    /// Wraps a descriptor constructor.
    #[must_use]
    pub const fn new(constructor: fn() -> Result<CapabilityDescriptor>) -> Self {
        Self { constructor }
    }

    /// Builds the descriptor.
    ///
    /// # Errors
    ///
    /// Propagates the constructor's error.
    pub fn build(&self) -> Result<CapabilityDescriptor> {
        (self.constructor)()
    }
}

inventory::collect!(DiscoveredCapability);

/// Submits a descriptor constructor for link-time discovery.
///
/// ```ignore
/// fn weather() -> capability_primitives::Result<CapabilityDescriptor> { /* ... */ }
/// capability_registry::submit_capability!(weather);
/// ```
#[macro_export]
macro_rules! submit_capability {
    ($constructor:path) => {
        $crate::inventory::submit! {
            $crate::discovery::DiscoveredCapability::new($constructor)
        }
    };
}

/// Failure while registering discovered capabilities.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A submitted constructor returned an error.
    #[error("discovered capability could not be built: {0}")]
    Build(#[from] capability_primitives::Error),

    /// A discovered descriptor collided with an existing one.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Iterates over every submitted constructor.
pub fn submitted() -> impl Iterator<Item = &'static DiscoveredCapability> {
    inventory::iter::<DiscoveredCapability>.into_iter()
}

impl CapabilityRegistry {
    /// Builds a registry from every discovered capability.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] if a constructor fails or two discovered
    /// descriptors collide.
    pub fn discover() -> std::result::Result<Self, DiscoveryError> {
        let registry = Self::new();
        registry.register_discovered()?;
        Ok(registry)
    }

    /// Registers every discovered capability, returning how many were added.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] at the first failing constructor or
    /// collision.
    pub fn register_discovered(&self) -> std::result::Result<usize, DiscoveryError> {
        let mut count = 0;
        for entry in submitted() {
            let descriptor = entry.build()?;
            debug!(capability = %descriptor.id(), "discovered capability");
            self.register(descriptor)?;
            count += 1;
        }
        Ok(count)
    }
}
