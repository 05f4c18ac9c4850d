//! The fixpoint driver.
//!
//! Each pass asks every module for its config points, drops what state already resolves,
//! and, once modules are satisfied, evaluates the pending invocations. Anything still missing
//! goes to the [`ValueSupplier`]; its answers are appended and the next pass starts. The loop
//! ends when a pass finds nothing missing and every invocation has a value.

use crate::context::{CancelSignal, RequestContext};
use crate::error::WingmanError;
use crate::expression::{ExpressionEngine, Invocation};
use crate::module::Evaluation;
use crate::registry::ModuleRegistry;
use crate::supply::ValueSupplier;
use futures::future::try_join_all;
use fxhash::FxHashSet;
use mora_domain::config::NegotiationConfig;
use mora_domain::{ConfigPoint, ModuleCapabilities, Value};
use mora_state::StateStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_PASSES: u32 = 16;

/// A config point tagged with the module that asked for it.
#[derive(Debug, Clone)]
pub struct PendingPoint {
    pub module: Arc<str>,
    pub point: ConfigPoint,
}

impl PendingPoint {
    pub fn new(module: impl Into<Arc<str>>, point: ConfigPoint) -> Self {
        Self { module: module.into(), point }
    }

    /// Dedup key: `(module, identifier)`.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.module, &self.point.identifier)
    }
}

impl fmt::Display for PendingPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.module, self.point.identifier)
    }
}

/// A converged negotiation.
#[derive(Debug)]
pub struct NegotiationOutcome {
    pub passes: u32,
    /// One value per invocation, in the order they were given.
    pub values: Vec<(Invocation, Value)>,
}

impl NegotiationOutcome {
    #[must_use]
    pub fn value(&self, module: &str, function: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(inv, _)| inv.module == module && inv.function == function)
            .map(|(_, value)| value)
    }
}

#[derive(Debug)]
pub struct Negotiator {
    registry: ModuleRegistry,
    engine: Arc<ExpressionEngine>,
    state: StateStore,
    supplier: Arc<dyn ValueSupplier>,
    max_passes: u32,
}

impl Negotiator {
    pub fn new(
        registry: ModuleRegistry,
        engine: Arc<ExpressionEngine>,
        state: StateStore,
        supplier: Arc<dyn ValueSupplier>,
    ) -> Self {
        Self { registry, engine, state, supplier, max_passes: DEFAULT_MAX_PASSES }
    }

    #[must_use]
    pub const fn max_passes(mut self, max_passes: u32) -> Self {
        self.max_passes = max_passes;
        self
    }

    #[must_use]
    pub const fn configure(self, config: &NegotiationConfig) -> Self {
        self.max_passes(config.max_passes)
    }

    #[must_use]
    pub const fn state(&self) -> &StateStore {
        &self.state
    }

    /// Runs a single module query round without supplying anything.
    ///
    /// # Errors
    /// Propagates module errors and cancellation.
    pub async fn outstanding(&self, cancel: &CancelSignal) -> Result<Vec<PendingPoint>, WingmanError> {
        let points = self.query_modules(cancel).await?;
        Ok(retain_unresolved(&self.state, points))
    }

    /// Drives modules and `invocations` to a fixpoint.
    ///
    /// # Errors
    /// - [`WingmanError::NegotiationStalled`] after `max_passes` passes with points or
    ///   invocations still outstanding. Invocations are listed as `module::function/argc`.
    /// - [`WingmanError::Cancelled`] when `cancel` fires.
    /// - Any module, function, supplier, or state error, unchanged.
    pub async fn run(
        &self,
        invocations: Vec<Invocation>,
        cancel: &CancelSignal,
    ) -> Result<NegotiationOutcome, WingmanError> {
        let host = RequestContext::new("host", self.state.clone(), cancel.clone());
        let mut values: Vec<Option<Value>> = vec![None; invocations.len()];
        let mut missing = Vec::new();

        for pass in 1..=self.max_passes {
            if cancel.is_cancelled() {
                return Err(WingmanError::cancelled());
            }

            let declared = self.query_modules(cancel).await?;
            missing = retain_unresolved(&self.state, declared);

            if missing.is_empty() {
                let mut deferred = Vec::new();
                for (invocation, slot) in invocations.iter().zip(values.iter_mut()) {
                    if slot.is_some() {
                        continue;
                    }
                    match self.engine.evaluate(&host, invocation).await? {
                        Evaluation::Value(value) => *slot = Some(value),
                        Evaluation::Deferred(points) => deferred.extend(
                            points.into_iter().map(|p| PendingPoint::new(invocation.module.as_str(), p)),
                        ),
                    }
                }
                missing = retain_unresolved(&self.state, deferred);
            }

            let unresolved = values.iter().filter(|v| v.is_none()).count();
            info!(pass, outstanding = missing.len(), unresolved, "Negotiation pass finished");

            if missing.is_empty() && unresolved == 0 {
                let values = invocations.into_iter().zip(values.into_iter().flatten()).collect();
                return Ok(NegotiationOutcome { passes: pass, values });
            }
            if missing.is_empty() {
                // Every deferred point was already resolved; evaluate again with it.
                continue;
            }

            let supplied = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(WingmanError::cancelled()),
                supplied = self.supplier.supply(&missing) => supplied?,
            };
            for entry in supplied {
                self.state.append(entry)?;
            }
        }

        let unresolved = invocations
            .iter()
            .zip(&values)
            .filter(|(_, value)| value.is_none())
            .map(|(invocation, _)| invocation.to_string());
        let outstanding: Vec<String> =
            missing.iter().map(ToString::to_string).chain(unresolved).collect();
        warn!(passes = self.max_passes, outstanding = ?outstanding, "Negotiation stalled");
        Err(WingmanError::NegotiationStalled {
            passes: self.max_passes,
            outstanding,
            context: None,
        })
    }

    /// Asks every `CONFIG_POINTS` module for its points, concurrently.
    async fn query_modules(&self, cancel: &CancelSignal) -> Result<Vec<PendingPoint>, WingmanError> {
        let queries = self.registry.with_capability(ModuleCapabilities::CONFIG_POINTS).map(|module| {
            let ctx = RequestContext::new(module.name(), self.state.clone(), cancel.clone());
            async move {
                let points = module.config_points(&ctx).await?;
                debug!(module = ctx.module_name(), points = points.len(), "Module queried");
                let module_name = ctx.module_name_arc();
                Ok::<_, WingmanError>(
                    points
                        .into_iter()
                        .map(|point| PendingPoint { module: Arc::clone(&module_name), point })
                        .collect::<Vec<_>>(),
                )
            }
        });

        let per_module = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(WingmanError::cancelled()),
            result = try_join_all(queries) => result?,
        };
        Ok(per_module.into_iter().flatten().collect())
    }
}

/// Drops points already resolved in state and deduplicates the rest by `(module, identifier)`.
fn retain_unresolved(state: &StateStore, points: Vec<PendingPoint>) -> Vec<PendingPoint> {
    let mut seen = FxHashSet::default();
    let mut kept = Vec::with_capacity(points.len());
    for pending in points {
        if state.contains(&pending.module, &pending.point.identifier) {
            warn!(
                module = %pending.module,
                identifier = %pending.point.identifier,
                "Config point is already resolved; ignoring it"
            );
            continue;
        }
        if seen.insert((Arc::clone(&pending.module), pending.point.identifier.clone())) {
            kept.push(pending);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use mora_domain::{StateConfigEntry, ValueKind};

    #[test]
    fn resolved_and_duplicate_points_are_dropped() {
        let state = StateStore::in_memory();
        state.append(StateConfigEntry::new("a", "done", ValueKind::String, "x")).unwrap();

        let points = vec![
            PendingPoint::new("a", ConfigPoint::string("done", "Done")),
            PendingPoint::new("a", ConfigPoint::secret("key", "Key")),
            PendingPoint::new("a", ConfigPoint::secret("key", "Key again")),
            PendingPoint::new("b", ConfigPoint::secret("key", "Key")),
        ];

        let kept = retain_unresolved(&state, points);
        let keys: Vec<_> = kept.iter().map(PendingPoint::key).collect();
        assert_eq!(keys, [("a", "key"), ("b", "key")]);
        assert_eq!(kept[0].point.display_name, "Key");
    }
}
