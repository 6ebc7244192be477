//! Contract shared by external service clients.

use std::time::Duration;

use async_trait::async_trait;
use capability_registry::CapabilityError;
use thiserror::Error;

/// Result alias used by service clients.
pub type ServiceResult<T> = Result<T, ServiceError>;

const MAX_REASON_LEN: usize = 200;

/// Error type shared by service client implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Client is misconfigured or missing credentials.
    #[error("service not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// Network or protocol failure.
    #[error("service transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },

    /// The service answered with a non-success status.
    #[error("service rejected the request ({status}): {reason}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Reason reported by the service, truncated.
        reason: String,
    },

    /// The service is throttling the caller.
    #[error("service rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Suggested delay before retrying.
        retry_after: Option<Duration>,
    },

    /// The service returned a body that could not be decoded.
    #[error("service response error: {reason}")]
    Response {
        /// Additional context about the response failure.
        reason: String,
    },

    /// The request did not complete within the client timeout.
    #[error("service request timed out after {elapsed:?}")]
    Timeout {
        /// Configured timeout.
        elapsed: Duration,
    },
}

impl ServiceError {
    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for undecodable responses.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }

    /// Builds a rejection, truncating the reason so response bodies never
    /// leak wholesale into capability output.
    #[must_use]
    pub fn rejected(status: u16, reason: &str) -> Self {
        Self::Rejected {
            status,
            reason: truncate(reason.trim(), MAX_REASON_LEN),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_owned(),
    }
}

impl From<ServiceError> for CapabilityError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Transport { .. } => Self::transport(message),
            ServiceError::Rejected { .. } | ServiceError::RateLimited { .. } => {
                Self::rejected(message)
            }
            ServiceError::Timeout { .. } => Self::timeout(message),
            ServiceError::Configuration { .. } | ServiceError::Response { .. } => {
                Self::unknown(message)
            }
        }
    }
}

/// Minimal metadata describing a service client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceMetadata {
    service: &'static str,
    operation: &'static str,
}

impl ServiceMetadata {
    /// Creates metadata for the supplied service and operation.
    #[must_use]
    pub const fn new(service: &'static str, operation: &'static str) -> Self {
        Self { service, operation }
    }

    /// Service name (e.g. `twitter`).
    #[must_use]
    pub const fn service(&self) -> &'static str {
        self.service
    }

    /// Operation name (e.g. `post_tweet`).
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }
}

/// One operation of an external service: text in, text out.
///
/// Implementations are shared across concurrent invocations and must be safe
/// to call in parallel.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Returns metadata about the operation.
    fn metadata(&self) -> &ServiceMetadata;

    /// Performs the operation.
    async fn call(&self, input: &str) -> ServiceResult<String>;
}
