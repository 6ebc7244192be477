//! Error taxonomy for registration, lookup, execution, and invocation.

use std::fmt::{self, Display, Formatter};

use capability_primitives::{CapabilityId, Slug, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Result alias returned by capability execution bodies.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Result alias returned by [`CapabilityRegistry::invoke`](crate::CapabilityRegistry::invoke).
pub type InvocationResult<T> = Result<T, InvocationError>;

/// Collision detected while adding a descriptor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Identity already present in the registry.
    #[error("capability `{id}` is already registered")]
    DuplicateIdentity {
        /// The colliding identity.
        id: CapabilityId,
    },

    /// Slug already claimed by another identity.
    #[error("slug `{slug}` is already registered by capability `{existing}`")]
    DuplicateSlug {
        /// The colliding slug.
        slug: Slug,
        /// Identity that owns the slug.
        existing: CapabilityId,
    },
}

/// Failure to resolve an identity or slug.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Nothing matched in either namespace.
    #[error("no capability matches `{target}`")]
    NotFound {
        /// The identity or slug that was requested.
        target: String,
    },
}

/// Broad classification of an execution failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityErrorKind {
    /// Network or protocol failure reaching the external service.
    Transport,
    /// The external service refused the request.
    ServiceRejected,
    /// The capability did not complete in time.
    Timeout,
    /// Anything else, including panics inside the execution body.
    Unknown,
}

impl Display for CapabilityErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transport => "transport",
            Self::ServiceRejected => "service rejected",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        })
    }
}

/// Failure reported by a capability's execution body.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("{kind} error: {message}")]
pub struct CapabilityError {
    kind: CapabilityErrorKind,
    message: String,
}

impl CapabilityError {
    /// Creates an error of the supplied kind.
    #[must_use]
    pub fn new(kind: CapabilityErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(CapabilityErrorKind::Transport, message)
    }

    /// Convenience constructor for service rejections.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(CapabilityErrorKind::ServiceRejected, message)
    }

    /// Convenience constructor for timeouts.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(CapabilityErrorKind::Timeout, message)
    }

    /// Convenience constructor for unclassified failures.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(CapabilityErrorKind::Unknown, message)
    }

    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> CapabilityErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Step of the invoke pipeline at which a failure occurred.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStage {
    /// Looking up the identity or slug.
    Resolve,
    /// Checking arguments against the input schema.
    Validate,
    /// Running the execution body.
    Execute,
}

impl Display for InvocationStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolve => "resolve",
            Self::Validate => "validate",
            Self::Execute => "execute",
        })
    }
}

/// Underlying reason for an [`InvocationError`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvocationCause {
    /// Resolution failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// Validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Execution failed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// Failure of a single `invoke` call, tagged with the stage that produced it.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{stage} failed for `{target}`: {cause}")]
pub struct InvocationError {
    target: String,
    capability: Option<CapabilityId>,
    stage: InvocationStage,
    #[source]
    cause: InvocationCause,
}

impl InvocationError {
    pub(crate) fn resolve(target: &str, err: LookupError) -> Self {
        Self {
            target: target.to_owned(),
            capability: None,
            stage: InvocationStage::Resolve,
            cause: err.into(),
        }
    }

    pub(crate) fn validate(target: &str, capability: CapabilityId, err: ValidationError) -> Self {
        Self {
            target: target.to_owned(),
            capability: Some(capability),
            stage: InvocationStage::Validate,
            cause: err.into(),
        }
    }

    pub(crate) fn execute(target: &str, capability: CapabilityId, err: CapabilityError) -> Self {
        Self {
            target: target.to_owned(),
            capability: Some(capability),
            stage: InvocationStage::Execute,
            cause: err.into(),
        }
    }

    /// Identity or slug the caller asked for.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Resolved identity, if resolution succeeded.
    #[must_use]
    pub fn capability(&self) -> Option<&CapabilityId> {
        self.capability.as_ref()
    }

    /// Stage that failed.
    #[must_use]
    pub const fn stage(&self) -> InvocationStage {
        self.stage
    }

    /// Underlying cause.
    #[must_use]
    pub fn cause(&self) -> &InvocationCause {
        &self.cause
    }

    /// Returns `true` when execution ran out of time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            &self.cause,
            InvocationCause::Capability(err) if err.kind() == CapabilityErrorKind::Timeout
        )
    }

    /// One-line message meant to be returned to a language model as the
    /// tool output.
    #[must_use]
    pub fn feedback(&self) -> String {
        match &self.cause {
            InvocationCause::Lookup(err) => {
                format!("Error: {err}. Choose one of the listed tools.")
            }
            InvocationCause::Validation(err) => {
                format!("Error: invalid arguments for `{}`: {err}.", self.target)
            }
            InvocationCause::Capability(err) => {
                format!("Error: `{}` failed ({}): {}", self.target, err.kind(), err.message())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_is_single_line() {
        let err = InvocationError::execute(
            "tweeterTweet",
            CapabilityId::new("tweet.post").unwrap(),
            CapabilityError::rejected("duplicate content"),
        );
        let feedback = err.feedback();
        assert!(!feedback.contains('\n'));
        assert_eq!(
            feedback,
            "Error: `tweeterTweet` failed (service rejected): duplicate content"
        );
    }

    #[test]
    fn timeout_detection() {
        let err = InvocationError::execute(
            "slow",
            CapabilityId::new("slow").unwrap(),
            CapabilityError::timeout("deadline elapsed"),
        );
        assert!(err.is_timeout());
        assert_eq!(err.stage(), InvocationStage::Execute);

        let err = InvocationError::resolve(
            "missing",
            LookupError::NotFound {
                target: "missing".into(),
            },
        );
        assert!(!err.is_timeout());
        assert!(err.capability().is_none());
        assert_eq!(err.to_string(), "resolve failed for `missing`: no capability matches `missing`");
    }
}
