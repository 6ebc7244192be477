//! Capability registry and the invocation gateway.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::slice;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use capability_primitives::{CapabilityId, InvocationId, Slug, ValidatedInput};
use futures::FutureExt;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{Instrument, debug, info, info_span};

use crate::descriptor::{CapabilityDescriptor, CapabilitySummary};
use crate::error::{
    CapabilityError, CapabilityResult, InvocationError, InvocationResult, LookupError,
    RegistrationError,
};
use crate::observer::{InvocationObserver, InvocationReport};

/// Immutable mapping published to readers. Writers replace it wholesale or
/// copy-on-write through [`Arc::make_mut`].
#[derive(Clone, Default)]
struct Catalog {
    by_id: HashMap<CapabilityId, CapabilityDescriptor>,
    by_slug: HashMap<Slug, CapabilityId>,
    order: Vec<CapabilityId>,
}

impl Catalog {
    fn insert(&mut self, descriptor: CapabilityDescriptor) -> Result<(), RegistrationError> {
        if self.by_id.contains_key(descriptor.id()) {
            return Err(RegistrationError::DuplicateIdentity {
                id: descriptor.id().clone(),
            });
        }
        if let Some(existing) = self.by_slug.get(descriptor.slug()) {
            return Err(RegistrationError::DuplicateSlug {
                slug: descriptor.slug().clone(),
                existing: existing.clone(),
            });
        }

        let id = descriptor.id().clone();
        self.by_slug.insert(descriptor.slug().clone(), id.clone());
        self.order.push(id.clone());
        self.by_id.insert(id, descriptor);
        Ok(())
    }

    /// Identity namespace first, then slugs. UUID identities match in any
    /// spelling `CapabilityId::new` accepts.
    fn resolve(&self, target: &str) -> Option<&CapabilityDescriptor> {
        self.by_id
            .get(target)
            .or_else(|| {
                CapabilityId::new(target)
                    .ok()
                    .filter(|id| id.as_uuid().is_some())
                    .and_then(|id| self.by_id.get(&id))
            })
            .or_else(|| {
                self.by_slug
                    .get(target)
                    .and_then(|id| self.by_id.get(id))
            })
    }
}

/// Registry that owns capability descriptors and is the only path to their
/// execution bodies.
///
/// Reads take a snapshot of the current catalog and release the lock before
/// doing any work, so concurrent `resolve`/`invoke`/`list` calls never wait on
/// each other or on a running capability.
#[derive(Default)]
pub struct CapabilityRegistry {
    catalog: RwLock<Arc<Catalog>>,
    default_timeout: Option<Duration>,
    observer: Option<Arc<dyn InvocationObserver>>,
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let catalog = self.snapshot();
        let ids: Vec<_> = catalog.order.iter().map(CapabilityId::as_str).collect();
        f.debug_struct("CapabilityRegistry")
            .field("registered", &ids)
            .field("default_timeout", &self.default_timeout)
            .field("observer_configured", &self.observer.is_some())
            .finish()
    }
}

impl CapabilityRegistry {
    /// Creates an empty registry without a default deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a deadline to every `invoke` that does not supply its own.
    #[must_use]
    pub fn with_default_timeout(mut self, deadline: Duration) -> Self {
        self.default_timeout = Some(deadline);
        self
    }

    /// Installs an observer notified after each invocation.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn InvocationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the default deadline, if any.
    #[must_use]
    pub const fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    fn snapshot(&self) -> Arc<Catalog> {
        let guard = self.catalog.read().expect("capability registry poisoned");
        Arc::clone(&*guard)
    }

    /// Registers a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateIdentity`] or
    /// [`RegistrationError::DuplicateSlug`] on collision; the registry is left
    /// unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register(&self, descriptor: CapabilityDescriptor) -> Result<(), RegistrationError> {
        let id = descriptor.id().clone();
        let slug = descriptor.slug().clone();

        let mut guard = self.catalog.write().expect("capability registry poisoned");
        Arc::make_mut(&mut *guard).insert(descriptor)?;
        drop(guard);

        info!(capability = %id, slug = %slug, "capability registered");
        Ok(())
    }

    /// Registers each descriptor in turn, stopping at the first collision.
    ///
    /// # Errors
    ///
    /// Propagates the first [`RegistrationError`]; descriptors before it stay
    /// registered.
    pub fn register_all<I>(&self, descriptors: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = CapabilityDescriptor>,
    {
        descriptors
            .into_iter()
            .try_for_each(|descriptor| self.register(descriptor))
    }

    /// Replaces the whole catalog atomically.
    ///
    /// The new set is checked in full before the swap; readers observe either
    /// the old catalog or the new one, never a mix.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistrationError`] within the new set, in which case
    /// the current catalog is kept.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn reload<I>(&self, descriptors: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = CapabilityDescriptor>,
    {
        let mut next = Catalog::default();
        for descriptor in descriptors {
            next.insert(descriptor)?;
        }
        let count = next.order.len();

        let mut guard = self.catalog.write().expect("capability registry poisoned");
        *guard = Arc::new(next);
        drop(guard);

        info!(count, "capability registry reloaded");
        Ok(())
    }

    /// Looks up a descriptor by identity, falling back to slug.
    ///
    /// An identity match always wins over a slug match for the same string.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] when neither namespace matches.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn resolve(&self, identity_or_slug: &str) -> Result<CapabilityDescriptor, LookupError> {
        self.snapshot()
            .resolve(identity_or_slug)
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                target: identity_or_slug.to_owned(),
            })
    }

    /// Returns `true` if the identity or slug resolves.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn contains(&self, identity_or_slug: &str) -> bool {
        self.snapshot().resolve(identity_or_slug).is_some()
    }

    /// Number of registered capabilities.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().order.len()
    }

    /// Returns `true` when nothing is registered.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the registered capabilities in registration order.
    ///
    /// Later registrations or reloads do not affect the returned listing.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn list(&self) -> CapabilityListing {
        CapabilityListing {
            catalog: self.snapshot(),
        }
    }

    /// Resolves, validates, and executes a capability using the default
    /// deadline, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an [`InvocationError`] tagged with the stage that failed.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub async fn invoke(&self, identity_or_slug: &str, raw_input: Value) -> InvocationResult<String> {
        self.run(identity_or_slug, &raw_input, self.default_timeout)
            .await
    }

    /// Like [`invoke`](Self::invoke) with an explicit deadline for the
    /// execution stage.
    ///
    /// When the deadline expires the execution future is dropped and a
    /// timeout is reported. Side effects already issued to an external
    /// service are not rolled back.
    ///
    /// # Errors
    ///
    /// Returns an [`InvocationError`] tagged with the stage that failed.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub async fn invoke_with_deadline(
        &self,
        identity_or_slug: &str,
        raw_input: Value,
        deadline: Duration,
    ) -> InvocationResult<String> {
        self.run(identity_or_slug, &raw_input, Some(deadline)).await
    }

    async fn run(
        &self,
        target: &str,
        raw_input: &Value,
        deadline: Option<Duration>,
    ) -> InvocationResult<String> {
        let invocation_id = InvocationId::random();
        let span = info_span!("capability.invoke", %invocation_id, requested = target);

        async move {
            let started = Instant::now();
            let outcome = self.pipeline(target, raw_input, deadline).await;
            let elapsed = started.elapsed();

            let (capability, result) = match outcome {
                Ok((id, output)) => (Some(id), Ok(output)),
                Err(err) => (err.capability().cloned(), Err(err)),
            };

            if let Some(observer) = &self.observer {
                let report = InvocationReport::new(
                    invocation_id,
                    target,
                    capability.as_ref(),
                    elapsed,
                    &result,
                );
                observer.on_outcome(&report);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn pipeline(
        &self,
        target: &str,
        raw_input: &Value,
        deadline: Option<Duration>,
    ) -> InvocationResult<(CapabilityId, String)> {
        let descriptor = self
            .resolve(target)
            .map_err(|err| InvocationError::resolve(target, err))?;
        let id = descriptor.id().clone();
        debug!(capability = %id, "capability resolved");

        let input = descriptor
            .validate(raw_input)
            .map_err(|err| InvocationError::validate(target, id.clone(), err))?;
        debug!(capability = %id, fields = input.len(), "arguments validated");

        match execute_guarded(&descriptor, input, deadline).await {
            Ok(output) => Ok((id, output)),
            Err(err) => Err(InvocationError::execute(target, id, err)),
        }
    }
}

/// Runs the execution body, converting panics and deadline expiry into
/// [`CapabilityError`]s.
async fn execute_guarded(
    descriptor: &CapabilityDescriptor,
    input: ValidatedInput,
    deadline: Option<Duration>,
) -> CapabilityResult<String> {
    let execution = AssertUnwindSafe(descriptor.execute(input)).catch_unwind();
    let outcome = match deadline {
        Some(limit) => timeout(limit, execution).await.map_err(|_| {
            CapabilityError::timeout(format!(
                "capability did not finish within {} ms",
                limit.as_millis()
            ))
        })?,
        None => execution.await,
    };

    outcome.unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "no message".to_owned());
        Err(CapabilityError::unknown(format!("capability panicked: {detail}")))
    })
}

/// Point-in-time listing returned by [`CapabilityRegistry::list`].
///
/// Iterating is lazy and may be repeated; every pass yields the same
/// summaries in registration order.
#[derive(Clone)]
pub struct CapabilityListing {
    catalog: Arc<Catalog>,
}

impl fmt::Debug for CapabilityListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.catalog.order.iter()).finish()
    }
}

impl CapabilityListing {
    /// Iterates over descriptor summaries.
    #[must_use]
    pub fn iter(&self) -> ListingIter<'_> {
        ListingIter {
            ids: self.catalog.order.iter(),
            catalog: &self.catalog,
        }
    }

    /// Number of capabilities in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.catalog.order.len()
    }

    /// Returns `true` when the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.catalog.order.is_empty()
    }

    /// Renders the snapshot as an array of function-calling tool definitions.
    #[must_use]
    pub fn to_json_catalog(&self) -> Value {
        Value::Array(
            self.iter()
                .map(|summary| summary.to_tool_definition())
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a CapabilityListing {
    type Item = CapabilitySummary;
    type IntoIter = ListingIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`CapabilityListing`].
pub struct ListingIter<'a> {
    ids: slice::Iter<'a, CapabilityId>,
    catalog: &'a Catalog,
}

impl Iterator for ListingIter<'_> {
    type Item = CapabilitySummary;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.next()?;
        self.catalog.by_id.get(id).map(CapabilityDescriptor::describe)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl ExactSizeIterator for ListingIter<'_> {}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use capability_primitives::{FieldSpec, InputSchema, ValidationError};
    use serde_json::json;

    use super::*;
    use crate::descriptor::CapabilityDescriptorBuilder;
    use crate::error::{CapabilityErrorKind, InvocationCause, InvocationStage};
    use crate::observer::CompositeObserver;

    fn query_schema() -> InputSchema {
        InputSchema::builder()
            .field(FieldSpec::string("query").required().min_length(1))
            .build()
            .expect("schema")
    }

    fn descriptor(id: &str, slug: &str) -> CapabilityDescriptor {
        CapabilityDescriptor::builder(CapabilityId::new(id).unwrap())
            .display_name(format!("{id} capability"))
            .and_then(|b| b.slug(slug))
            .map(|b| b.input_schema(query_schema()))
            .map(|b| {
                let owner = id.to_owned();
                b.executor(move |input: ValidatedInput| {
                    let owner = owner.clone();
                    async move {
                        Ok::<_, CapabilityError>(format!(
                            "{owner}:{}",
                            input.str("query").unwrap_or_default()
                        ))
                    }
                })
            })
            .and_then(CapabilityDescriptorBuilder::build)
            .expect("descriptor")
    }

    fn counting(id: &str, slug: &str, calls: Arc<AtomicUsize>) -> CapabilityDescriptor {
        CapabilityDescriptor::builder(CapabilityId::new(id).unwrap())
            .display_name("Counting")
            .and_then(|b| b.slug(slug))
            .map(|b| b.input_schema(query_schema()))
            .map(|b| {
                b.executor(move |_input: ValidatedInput| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, CapabilityError>("counted".to_owned())
                    }
                })
            })
            .and_then(CapabilityDescriptorBuilder::build)
            .unwrap()
    }

    #[test]
    fn duplicate_identity_rejected() {
        let registry = CapabilityRegistry::new();
        registry.register(descriptor("tweet.post", "tweeterTweet")).unwrap();

        let err = registry
            .register(descriptor("tweet.post", "otherSlug"))
            .expect_err("duplicate identity");
        assert!(matches!(err, RegistrationError::DuplicateIdentity { id } if id.as_str() == "tweet.post"));
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("otherSlug"));
    }

    #[test]
    fn duplicate_slug_rejected() {
        let registry = CapabilityRegistry::new();
        registry.register(descriptor("tweet.post", "tweeterTweet")).unwrap();

        let err = registry
            .register(descriptor("tweet.repost", "tweeterTweet"))
            .expect_err("duplicate slug");
        match err {
            RegistrationError::DuplicateSlug { slug, existing } => {
                assert_eq!(slug.as_str(), "tweeterTweet");
                assert_eq!(existing.as_str(), "tweet.post");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!registry.contains("tweet.repost"));
    }

    #[test]
    fn resolve_by_identity_and_slug() {
        let registry = CapabilityRegistry::new();
        registry.register(descriptor("tweet.post", "tweeterTweet")).unwrap();

        let by_id = registry.resolve("tweet.post").unwrap();
        let by_slug = registry.resolve("tweeterTweet").unwrap();
        assert_eq!(by_id.id(), by_slug.id());

        let again = registry.resolve("tweet.post").unwrap();
        assert_eq!(by_id.describe(), again.describe());

        let err = registry.resolve("missing.tool").expect_err("missing");
        assert_eq!(
            err,
            LookupError::NotFound {
                target: "missing.tool".into()
            }
        );
    }

    #[tokio::test]
    async fn uuid_identities_resolve_in_any_spelling() {
        let registry = CapabilityRegistry::new();
        registry
            .register(descriptor("6E57B718-8953-448B-98DB-FD19C1D1469C", "recentTweets"))
            .unwrap();

        for spelling in [
            "6e57b718-8953-448b-98db-fd19c1d1469c",
            "6E57B718-8953-448B-98DB-FD19C1D1469C",
            "6e57b7188953448b98dbfd19c1d1469c",
        ] {
            let resolved = registry.resolve(spelling).unwrap();
            assert_eq!(resolved.id().as_str(), "6e57b718-8953-448b-98db-fd19c1d1469c");
            assert!(registry.contains(spelling));
        }

        let output = registry
            .invoke("6E57B7188953448B98DBFD19C1D1469C", json!({ "query": "x" }))
            .await
            .unwrap();
        assert!(output.ends_with(":x"));

        assert!(registry.resolve("6E57B718").is_err());
    }

    #[tokio::test]
    async fn identity_wins_over_slug() {
        let registry = CapabilityRegistry::new();
        registry.register(descriptor("alpha", "beta")).unwrap();
        registry.register(descriptor("gamma", "alpha")).unwrap();

        let resolved = registry.resolve("alpha").unwrap();
        assert_eq!(resolved.id().as_str(), "alpha");

        let output = registry
            .invoke("alpha", json!({ "query": "x" }))
            .await
            .unwrap();
        assert_eq!(output, "alpha:x");
    }

    #[tokio::test]
    async fn invalid_input_never_executes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = CapabilityRegistry::new();
        registry
            .register(counting("count.me", "countMe", Arc::clone(&calls)))
            .unwrap();

        for raw in [json!({}), json!({ "query": "" }), json!({ "query": 7 }), json!("query")] {
            let err = registry.invoke("countMe", raw).await.expect_err("invalid");
            assert_eq!(err.stage(), InvocationStage::Validate);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        registry
            .invoke("countMe", json!({ "query": "ok" }))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn execution_sees_only_declared_fields() {
        let seen = Arc::new(Mutex::new(None));
        let captured = Arc::clone(&seen);
        let descriptor = CapabilityDescriptor::builder(CapabilityId::new("capture").unwrap())
            .display_name("Capture")
            .and_then(|b| b.slug("capture"))
            .map(|b| b.input_schema(query_schema()))
            .map(|b| {
                b.executor(move |input: ValidatedInput| {
                    let captured = Arc::clone(&captured);
                    async move {
                        *captured.lock().unwrap() = Some(input.into_value());
                        Ok::<_, CapabilityError>(String::new())
                    }
                })
            })
            .and_then(CapabilityDescriptorBuilder::build)
            .unwrap();

        let registry = CapabilityRegistry::new();
        registry.register(descriptor).unwrap();
        registry
            .invoke("capture", json!({ "query": "hi", "extra": 1, "nested": { "a": 1 } }))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), Some(json!({ "query": "hi" })));
    }

    #[tokio::test]
    async fn deadline_expiry_reports_timeout() {
        let descriptor = CapabilityDescriptor::builder(CapabilityId::new("stall").unwrap())
            .display_name("Stall")
            .and_then(|b| b.slug("stall"))
            .map(|b| {
                b.executor(|_input: ValidatedInput| async move {
                    futures::future::pending::<()>().await;
                    Ok::<_, CapabilityError>(String::new())
                })
            })
            .and_then(CapabilityDescriptorBuilder::build)
            .unwrap();

        let registry = CapabilityRegistry::new();
        registry.register(descriptor).unwrap();

        let started = Instant::now();
        let err = registry
            .invoke_with_deadline("stall", json!({}), Duration::from_millis(50))
            .await
            .expect_err("timeout");

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(err.stage(), InvocationStage::Execute);
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn default_timeout_applies() {
        let registry = CapabilityRegistry::new().with_default_timeout(Duration::from_millis(20));
        registry
            .register(
                CapabilityDescriptor::builder(CapabilityId::new("sleepy").unwrap())
                    .display_name("Sleepy")
                    .and_then(|b| b.slug("sleepy"))
                    .map(|b| {
                        b.executor(|_input: ValidatedInput| async move {
                            tokio::time::sleep(Duration::from_secs(30)).await;
                            Ok::<_, CapabilityError>(String::new())
                        })
                    })
                    .and_then(CapabilityDescriptorBuilder::build)
                    .unwrap(),
            )
            .unwrap();

        let err = registry.invoke("sleepy", json!({})).await.expect_err("timeout");
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn panics_become_unknown_errors() {
        let registry = CapabilityRegistry::new();
        registry
            .register(
                CapabilityDescriptor::builder(CapabilityId::new("boom").unwrap())
                    .display_name("Boom")
                    .and_then(|b| b.slug("boom"))
                    .map(|b| {
                        b.executor(|_input: ValidatedInput| async move {
                            if true {
                                panic!("client exploded");
                            }
                            Ok::<_, CapabilityError>(String::new())
                        })
                    })
                    .and_then(CapabilityDescriptorBuilder::build)
                    .unwrap(),
            )
            .unwrap();

        let err = registry.invoke("boom", json!({})).await.expect_err("panic");
        match err.cause() {
            InvocationCause::Capability(cause) => {
                assert_eq!(cause.kind(), CapabilityErrorKind::Unknown);
                assert!(cause.message().contains("client exploded"));
            }
            other => panic!("unexpected cause: {other:?}"),
        }
    }

    #[tokio::test]
    async fn execution_errors_pass_through_verbatim() {
        let registry = CapabilityRegistry::new();
        registry
            .register(
                CapabilityDescriptor::builder(CapabilityId::new("reject").unwrap())
                    .display_name("Reject")
                    .and_then(|b| b.slug("reject"))
                    .map(|b| {
                        b.executor(|_input: ValidatedInput| async move {
                            Err::<String, _>(CapabilityError::rejected("rate limited"))
                        })
                    })
                    .and_then(CapabilityDescriptorBuilder::build)
                    .unwrap(),
            )
            .unwrap();

        let err = registry.invoke("reject", json!({})).await.expect_err("rejected");
        assert_eq!(
            err.cause(),
            &InvocationCause::Capability(CapabilityError::rejected("rate limited"))
        );
    }

    #[tokio::test]
    async fn unknown_target_reports_resolve_stage() {
        let registry = CapabilityRegistry::new();
        let err = registry
            .invoke("missing.tool", json!({}))
            .await
            .expect_err("missing");
        assert_eq!(err.stage(), InvocationStage::Resolve);
        assert!(matches!(err.cause(), InvocationCause::Lookup(LookupError::NotFound { .. })));
    }

    #[test]
    fn listing_is_a_snapshot() {
        let registry = CapabilityRegistry::new();
        registry.register(descriptor("first", "first")).unwrap();
        let listing = registry.list();

        registry.register(descriptor("second", "second")).unwrap();

        let ids: Vec<_> = listing.iter().map(|s| s.identity().to_string()).collect();
        assert_eq!(ids, ["first"]);
        // restartable
        assert_eq!(listing.iter().count(), 1);
        assert_eq!(registry.list().len(), 2);
    }

    #[test]
    fn listing_preserves_registration_order() {
        let registry = CapabilityRegistry::new();
        for (id, slug) in [("c", "cSlug"), ("a", "aSlug"), ("b", "bSlug")] {
            registry.register(descriptor(id, slug)).unwrap();
        }
        let slugs: Vec<_> = (&registry.list())
            .into_iter()
            .map(|s| s.slug().to_string())
            .collect();
        assert_eq!(slugs, ["cSlug", "aSlug", "bSlug"]);

        let catalog = registry.list().to_json_catalog();
        assert_eq!(catalog[1]["name"], "aSlug");
    }

    #[test]
    fn reload_swaps_atomically() {
        let registry = CapabilityRegistry::new();
        registry.register(descriptor("old", "old")).unwrap();
        let before = registry.list();

        registry
            .reload([descriptor("new.one", "newOne"), descriptor("new.two", "newTwo")])
            .unwrap();

        assert!(!registry.contains("old"));
        assert_eq!(registry.len(), 2);
        assert_eq!(before.len(), 1);
    }

    #[test]
    fn failed_reload_keeps_current_catalog() {
        let registry = CapabilityRegistry::new();
        registry.register(descriptor("keep", "keep")).unwrap();

        let err = registry
            .reload([descriptor("x", "dup"), descriptor("y", "dup")])
            .expect_err("slug collision");
        assert!(matches!(err, RegistrationError::DuplicateSlug { .. }));
        assert!(registry.contains("keep"));
        assert!(!registry.contains("x"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_invocations_do_not_interfere() {
        let registry = Arc::new(CapabilityRegistry::new());
        registry.register(descriptor("echo", "echo")).unwrap();

        let calls = (0..32).map(|n| {
            let registry = Arc::clone(&registry);
            async move {
                registry
                    .invoke("echo", json!({ "query": n.to_string() }))
                    .await
            }
        });
        let results = futures::future::join_all(calls).await;

        for (n, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap(), format!("echo:{n}"));
        }
    }

    #[derive(Default)]
    struct Recording {
        outcomes: Mutex<Vec<(Option<String>, bool)>>,
    }

    impl InvocationObserver for Recording {
        fn on_outcome(&self, report: &InvocationReport<'_>) {
            self.outcomes.lock().unwrap().push((
                report.capability().map(ToString::to_string),
                report.result().is_ok(),
            ));
        }
    }

    #[tokio::test]
    async fn observers_receive_every_outcome() {
        let recording = Arc::new(Recording::default());
        let observer = CompositeObserver::new([
            Arc::clone(&recording) as Arc<dyn InvocationObserver>,
            Arc::new(crate::observer::TracingObserver) as Arc<dyn InvocationObserver>,
        ]);
        let registry = CapabilityRegistry::new().with_observer(Arc::new(observer));
        registry.register(descriptor("tweet.post", "tweeterTweet")).unwrap();

        registry
            .invoke("tweeterTweet", json!({ "query": "hello" }))
            .await
            .unwrap();
        let _ = registry.invoke("tweeterTweet", json!({})).await;
        let _ = registry.invoke("nope", json!({})).await;

        let outcomes = recording.outcomes.lock().unwrap().clone();
        assert_eq!(
            outcomes,
            vec![
                (Some("tweet.post".to_owned()), true),
                (Some("tweet.post".to_owned()), false),
                (None, false),
            ]
        );
    }

    #[test]
    fn validation_error_is_preserved() {
        let registry = CapabilityRegistry::new();
        registry.register(descriptor("tweet.post", "tweeterTweet")).unwrap();
        let descriptor = registry.resolve("tweeterTweet").unwrap();
        let err = descriptor.validate(&json!({})).expect_err("missing");
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "query".into()
            }
        );
    }
}
