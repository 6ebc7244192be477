//! Offline stand-in for real services.

use async_trait::async_trait;

use crate::traits::{ServiceClient, ServiceMetadata, ServiceResult};

/// Echoes its input behind a fixed prefix without any network traffic.
#[derive(Debug, Clone)]
pub struct StubClient {
    prefix: String,
    metadata: ServiceMetadata,
}

impl StubClient {
    /// Creates a stub answering `<prefix><input>`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            metadata: ServiceMetadata::new("stub", "echo"),
        }
    }
}

#[async_trait]
impl ServiceClient for StubClient {
    fn metadata(&self) -> &ServiceMetadata {
        &self.metadata
    }

    async fn call(&self, input: &str) -> ServiceResult<String> {
        Ok(format!("{}{input}", self.prefix))
    }
}
