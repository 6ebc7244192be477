//! Capability descriptors and the executor trait behind them.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use capability_primitives::{
    CapabilityId, Error, InputSchema, Result, Slug, ValidatedInput, ValidationError,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::CapabilityResult;

const MAX_DISPLAY_NAME_LEN: usize = 96;

/// Execution body of a capability.
///
/// Implementations receive arguments that already passed the descriptor's
/// schema and must report every failure as a [`CapabilityError`](crate::CapabilityError).
#[async_trait]
pub trait Capability: Send + Sync {
    /// Runs the capability.
    async fn execute(&self, input: ValidatedInput) -> CapabilityResult<String>;
}

#[async_trait]
impl<F, Fut> Capability for F
where
    F: Send + Sync + Fn(ValidatedInput) -> Fut,
    Fut: Future<Output = CapabilityResult<String>> + Send,
{
    async fn execute(&self, input: ValidatedInput) -> CapabilityResult<String> {
        (self)(input).await
    }
}

/// Self-describing unit of executable behaviour.
///
/// Cloning is cheap; the execution body is shared.
#[derive(Clone)]
pub struct CapabilityDescriptor {
    id: CapabilityId,
    display_name: String,
    slug: Slug,
    description: String,
    input_schema: InputSchema,
    executor: Arc<dyn Capability>,
}

impl fmt::Debug for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityDescriptor")
            .field("id", &self.id)
            .field("slug", &self.slug)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

impl CapabilityDescriptor {
    /// Starts building a descriptor for the supplied identity.
    #[must_use]
    pub fn builder(id: CapabilityId) -> CapabilityDescriptorBuilder {
        CapabilityDescriptorBuilder {
            id,
            display_name: None,
            slug: None,
            description: String::new(),
            input_schema: InputSchema::empty(),
            executor: None,
        }
    }

    /// Stable identity.
    #[must_use]
    pub fn id(&self) -> &CapabilityId {
        &self.id
    }

    /// Human-readable label.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Secondary lookup key.
    #[must_use]
    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    /// Free-text description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared input schema.
    #[must_use]
    pub fn input_schema(&self) -> &InputSchema {
        &self.input_schema
    }

    /// Metadata view handed to orchestrators.
    #[must_use]
    pub fn describe(&self) -> CapabilitySummary {
        CapabilitySummary {
            identity: self.id.clone(),
            display_name: self.display_name.clone(),
            slug: self.slug.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Checks raw arguments against the input schema.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self, raw_input: &Value) -> std::result::Result<ValidatedInput, ValidationError> {
        self.input_schema.validate(raw_input)
    }

    pub(crate) async fn execute(&self, input: ValidatedInput) -> CapabilityResult<String> {
        self.executor.execute(input).await
    }
}

/// Builder for [`CapabilityDescriptor`].
pub struct CapabilityDescriptorBuilder {
    id: CapabilityId,
    display_name: Option<String>,
    slug: Option<Slug>,
    description: String,
    input_schema: InputSchema,
    executor: Option<Arc<dyn Capability>>,
}

impl fmt::Debug for CapabilityDescriptorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityDescriptorBuilder")
            .field("id", &self.id)
            .field("slug", &self.slug)
            .field("executor_configured", &self.executor.is_some())
            .finish_non_exhaustive()
    }
}

impl CapabilityDescriptorBuilder {
    /// Sets the display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDescriptor`] if the name is empty or exceeds the
    /// maximum supported length.
    pub fn display_name(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::descriptor("display name cannot be empty"));
        }
        if name.len() > MAX_DISPLAY_NAME_LEN {
            return Err(Error::descriptor(format!(
                "display name length must be <= {MAX_DISPLAY_NAME_LEN}"
            )));
        }
        self.display_name = Some(name);
        Ok(self)
    }

    /// Sets the slug.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlug`] if the slug is malformed.
    pub fn slug(mut self, slug: impl Into<String>) -> Result<Self> {
        self.slug = Some(Slug::new(slug)?);
        Ok(self)
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the input schema. Defaults to [`InputSchema::empty`].
    #[must_use]
    pub fn input_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }

    /// Sets the execution body.
    #[must_use]
    pub fn executor<C>(self, executor: C) -> Self
    where
        C: Capability + 'static,
    {
        self.shared_executor(Arc::new(executor))
    }

    /// Sets an execution body that is shared with other descriptors.
    #[must_use]
    pub fn shared_executor(mut self, executor: Arc<dyn Capability>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Finalises the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDescriptor`] if the display name, slug, or
    /// executor is missing.
    pub fn build(self) -> Result<CapabilityDescriptor> {
        let display_name = self
            .display_name
            .ok_or_else(|| Error::descriptor("display name must be provided"))?;
        let slug = self
            .slug
            .ok_or_else(|| Error::descriptor("slug must be provided"))?;
        let executor = self
            .executor
            .ok_or_else(|| Error::descriptor("executor must be provided"))?;

        Ok(CapabilityDescriptor {
            id: self.id,
            display_name,
            slug,
            description: self.description,
            input_schema: self.input_schema,
            executor,
        })
    }
}

/// Read-only view of a descriptor, without its execution body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CapabilitySummary {
    identity: CapabilityId,
    display_name: String,
    slug: Slug,
    description: String,
    input_schema: InputSchema,
}

impl CapabilitySummary {
    /// Stable identity.
    #[must_use]
    pub fn identity(&self) -> &CapabilityId {
        &self.identity
    }

    /// Human-readable label.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Secondary lookup key.
    #[must_use]
    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    /// Free-text description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared input schema.
    #[must_use]
    pub fn input_schema(&self) -> &InputSchema {
        &self.input_schema
    }

    /// Function-calling definition for LLM tool catalogs. The slug is used as
    /// the tool name since identities may be UUIDs.
    #[must_use]
    pub fn to_tool_definition(&self) -> Value {
        json!({
            "name": self.slug.as_str(),
            "identity": self.identity.as_str(),
            "description": self.description,
            "parameters": self.input_schema.to_json_schema(),
        })
    }
}
