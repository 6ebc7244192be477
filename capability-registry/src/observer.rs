//! Hooks notified after every invocation.

use std::sync::Arc;
use std::time::Duration;

use capability_primitives::{CapabilityId, InvocationId};
use tracing::{info, warn};

use crate::error::InvocationResult;

/// Outcome of one `invoke` call. Arguments are deliberately absent.
#[derive(Debug)]
pub struct InvocationReport<'a> {
    invocation_id: InvocationId,
    target: &'a str,
    capability: Option<&'a CapabilityId>,
    elapsed: Duration,
    result: &'a InvocationResult<String>,
}

impl<'a> InvocationReport<'a> {
    pub(crate) fn new(
        invocation_id: InvocationId,
        target: &'a str,
        capability: Option<&'a CapabilityId>,
        elapsed: Duration,
        result: &'a InvocationResult<String>,
    ) -> Self {
        Self {
            invocation_id,
            target,
            capability,
            elapsed,
            result,
        }
    }

    /// Correlation identifier of the call.
    #[must_use]
    pub const fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    /// Identity or slug the caller supplied.
    #[must_use]
    pub fn target(&self) -> &str {
        self.target
    }

    /// Resolved identity, when resolution succeeded.
    #[must_use]
    pub fn capability(&self) -> Option<&CapabilityId> {
        self.capability
    }

    /// Wall-clock time spent in the pipeline.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Result handed back to the caller.
    #[must_use]
    pub fn result(&self) -> &InvocationResult<String> {
        self.result
    }
}

/// Observer invoked once per `invoke` call, after the result is known.
pub trait InvocationObserver: Send + Sync {
    /// Records the report.
    fn on_outcome(&self, report: &InvocationReport<'_>);
}

/// Observer that logs outcomes through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl InvocationObserver for TracingObserver {
    fn on_outcome(&self, report: &InvocationReport<'_>) {
        let capability = report.capability().map(CapabilityId::as_str);
        let elapsed_ms = u64::try_from(report.elapsed().as_millis()).unwrap_or(u64::MAX);
        match report.result() {
            Ok(output) => info!(
                invocation_id = %report.invocation_id(),
                requested = report.target(),
                capability,
                elapsed_ms,
                output_len = output.len(),
                "capability invocation succeeded"
            ),
            Err(err) => warn!(
                invocation_id = %report.invocation_id(),
                requested = report.target(),
                capability,
                elapsed_ms,
                stage = %err.stage(),
                error = %err,
                "capability invocation failed"
            ),
        }
    }
}

/// Forwards reports to a list of observers.
pub struct CompositeObserver {
    observers: Vec<Arc<dyn InvocationObserver>>,
}

impl CompositeObserver {
    /// Creates a composite from the supplied observers.
    #[must_use]
    pub fn new<I>(observers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn InvocationObserver>>,
    {
        Self {
            observers: observers.into_iter().collect(),
        }
    }

    /// Adds an observer.
    pub fn push(&mut self, observer: Arc<dyn InvocationObserver>) {
        self.observers.push(observer);
    }
}

impl InvocationObserver for CompositeObserver {
    fn on_outcome(&self, report: &InvocationReport<'_>) {
        for observer in &self.observers {
            observer.on_outcome(report);
        }
    }
}
