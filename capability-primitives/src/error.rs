//! Shared error definitions for capability primitives.

use thiserror::Error;

/// Result alias used throughout the capability runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while constructing primitive types.
///
/// These are construction-time failures: a descriptor or schema that trips one
/// of them is never admitted into a registry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Capability identifier failed validation.
    #[error("invalid capability id `{id}`: {reason}")]
    InvalidCapabilityId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Slug failed validation.
    #[error("invalid slug `{slug}`: {reason}")]
    InvalidSlug {
        /// The offending slug.
        slug: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Input schema definition is inconsistent.
    #[error("invalid input schema: {reason}")]
    InvalidSchema {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Descriptor metadata failed validation.
    #[error("invalid capability descriptor: {reason}")]
    InvalidDescriptor {
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl Error {
    pub(crate) fn schema(reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for descriptor-level failures.
    #[must_use]
    pub fn descriptor(reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            reason: reason.into(),
        }
    }
}
