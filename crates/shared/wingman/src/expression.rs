use crate::context::{CancelSignal, RequestContext};
use crate::error::WingmanError;
use crate::module::{Evaluation, ExpressionFunction};
use crate::registry::ModuleRegistry;
use fxhash::{FxHashMap, FxHasher};
use mora_domain::{ModuleCapabilities, Value};
use mora_state::StateStore;
use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, info};

/// A reference to an expression call that the host needs a value for.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub module: String,
    pub function: String,
    pub args: Vec<Value>,
}

impl Invocation {
    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self { module: module.into(), function: function.into(), args: Vec::new() }
    }

    #[must_use]
    pub fn arg(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    /// Lock key for `(module, function, args)`. Collisions only over-serialize.
    fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.module.hash(&mut hasher);
        self.function.hash(&mut hasher);
        for arg in &self.args {
            arg.kind().hash(&mut hasher);
            arg.expose().hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}/{}", self.module, self.function, self.args.len())
    }
}

type FunctionKey = (String, String);
type LockTable = Mutex<FxHashMap<u64, Arc<tokio::sync::Mutex<()>>>>;

/// A handle on one entry of the lock table. The entry is removed when the last handle drops,
/// including handles owned by evaluations that were dropped mid-flight.
struct KeyLock<'a> {
    table: &'a LockTable,
    fingerprint: u64,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> KeyLock<'a> {
    fn acquire(table: &'a LockTable, fingerprint: u64) -> Self {
        let lock = Arc::clone(table.lock().entry(fingerprint).or_default());
        Self { table, fingerprint, lock }
    }
}

impl Drop for KeyLock<'_> {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        // Only the table and this handle remain.
        if table.get(&self.fingerprint).is_some_and(|lock| Arc::strong_count(lock) == 2) {
            table.remove(&self.fingerprint);
        }
    }
}

/// Evaluates expression functions keyed by `(module, function name)`.
///
/// Concurrent evaluations of the same invocation are serialized, so the second caller sees
/// whatever the first one appended to state.
#[derive(Debug, Default)]
pub struct ExpressionEngine {
    functions: FxHashMap<FunctionKey, Arc<dyn ExpressionFunction>>,
    locks: LockTable,
}

impl ExpressionEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the functions of every module registered with `FUNCTIONS`.
    ///
    /// # Errors
    /// Propagates provider errors; returns [`WingmanError::Registration`] on duplicate names
    /// within one module.
    pub async fn from_registry(
        registry: &ModuleRegistry,
        state: &StateStore,
        cancel: &CancelSignal,
    ) -> Result<Self, WingmanError> {
        let mut engine = Self::new();
        for module in registry.with_capability(ModuleCapabilities::FUNCTIONS) {
            let Some(provider) = module.as_function_provider() else {
                continue;
            };
            let ctx = RequestContext::new(module.name(), state.clone(), cancel.clone());
            for function in provider.functions(&ctx).await? {
                engine.register(module.name(), function)?;
            }
        }
        info!(functions = engine.functions.len(), "Expression engine ready");
        Ok(engine)
    }

    /// Adds a single function under `module`.
    ///
    /// # Errors
    /// Returns [`WingmanError::Registration`] if `module` already has a function of that name,
    /// or if the function's arity accepts no argument count at all.
    pub fn register(
        &mut self,
        module: &str,
        function: Arc<dyn ExpressionFunction>,
    ) -> Result<(), WingmanError> {
        let key = (module.to_owned(), function.name().to_owned());
        if self.functions.contains_key(&key) {
            return Err(WingmanError::Registration {
                message: format!("function `{}::{}` is registered twice", key.0, key.1).into(),
                context: None,
            });
        }
        let arity = function.arity();
        if arity.min > arity.max {
            return Err(WingmanError::Registration {
                message: format!("function `{}::{}` declares an empty arity {arity}", key.0, key.1)
                    .into(),
                context: None,
            });
        }
        debug!(module, function = function.name(), %arity, "Function registered");
        self.functions.insert(key, function);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, module: &str, function: &str) -> bool {
        self.functions.contains_key(&(module.to_owned(), function.to_owned()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Evaluates `invocation` in the namespace of its module.
    ///
    /// # Errors
    /// - [`WingmanError::UnknownFunction`] if nothing is registered under the key.
    /// - [`WingmanError::ArityMismatch`] if the argument count is out of bounds; the function
    ///   is not invoked.
    /// - [`WingmanError::Cancelled`] if `ctx` is cancelled while waiting or evaluating.
    /// - Whatever the function itself returns.
    pub async fn evaluate(
        &self,
        ctx: &RequestContext,
        invocation: &Invocation,
    ) -> Result<Evaluation, WingmanError> {
        let key = (invocation.module.clone(), invocation.function.clone());
        let Some(function) = self.functions.get(&key) else {
            return Err(WingmanError::UnknownFunction {
                module: invocation.module.clone(),
                function: invocation.function.clone(),
                context: None,
            });
        };

        let arity = function.arity();
        let given = invocation.args.len();
        if !arity.accepts(given) {
            return Err(WingmanError::ArityMismatch {
                function: format!("{}::{}", invocation.module, invocation.function).into(),
                min: arity.min,
                max: arity.max,
                given,
                context: None,
            });
        }

        let ctx = ctx.for_module(invocation.module.as_str());
        let key_lock = KeyLock::acquire(&self.locks, invocation.fingerprint());

        let _held = tokio::select! {
            biased;
            () = ctx.cancel().cancelled() => return Err(WingmanError::cancelled()),
            held = key_lock.lock.lock() => held,
        };
        let evaluation = tokio::select! {
            biased;
            () = ctx.cancel().cancelled() => return Err(WingmanError::cancelled()),
            result = function.evaluate(&ctx, &invocation.args) => result?,
        };

        match evaluation {
            Evaluation::Deferred(points) if points.is_empty() => Err(WingmanError::Internal {
                message: format!("`{invocation}` deferred without naming any config point").into(),
                context: None,
            }),
            evaluation => {
                debug!(invocation = %invocation, deferred = evaluation.is_deferred(), "Function evaluated");
                Ok(evaluation)
            },
        }
    }

    #[cfg(test)]
    fn live_locks(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::cancellation;
    use crate::module::Arity;
    use async_trait::async_trait;
    use mora_domain::ConfigPoint;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Echo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExpressionFunction for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn arity(&self) -> Arity {
            Arity::new(1, 2)
        }

        async fn evaluate(
            &self,
            _ctx: &RequestContext,
            args: &[Value],
        ) -> Result<Evaluation, WingmanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(args[0].clone().into())
        }
    }

    #[derive(Debug)]
    struct EmptyDefer;

    #[async_trait]
    impl ExpressionFunction for EmptyDefer {
        fn name(&self) -> &str {
            "empty"
        }

        fn arity(&self) -> Arity {
            Arity::exactly(0)
        }

        async fn evaluate(
            &self,
            _ctx: &RequestContext,
            _args: &[Value],
        ) -> Result<Evaluation, WingmanError> {
            Ok(Evaluation::deferred(Vec::<ConfigPoint>::new()))
        }
    }

    #[derive(Debug)]
    struct Slow;

    #[async_trait]
    impl ExpressionFunction for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn arity(&self) -> Arity {
            Arity::exactly(0)
        }

        async fn evaluate(
            &self,
            _ctx: &RequestContext,
            _args: &[Value],
        ) -> Result<Evaluation, WingmanError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::string("late").into())
        }
    }

    #[derive(Debug)]
    struct Backwards;

    #[async_trait]
    impl ExpressionFunction for Backwards {
        fn name(&self) -> &str {
            "backwards"
        }

        fn arity(&self) -> Arity {
            Arity::new(2, 1)
        }

        async fn evaluate(
            &self,
            _ctx: &RequestContext,
            _args: &[Value],
        ) -> Result<Evaluation, WingmanError> {
            unreachable!("never registered")
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new("host", StateStore::in_memory(), CancelSignal::never())
    }

    #[tokio::test]
    async fn duplicate_function_names_are_rejected() {
        let mut engine = ExpressionEngine::new();
        engine.register("m", Arc::new(Echo::default())).unwrap();
        engine.register("other", Arc::new(Echo::default())).unwrap();

        let err = engine.register("m", Arc::new(Echo::default())).unwrap_err();
        assert!(matches!(err, WingmanError::Registration { .. }));
        assert_eq!(engine.len(), 2);
    }

    #[tokio::test]
    async fn unknown_function_is_reported_with_its_key() {
        let engine = ExpressionEngine::new();
        let err = engine.evaluate(&ctx(), &Invocation::new("m", "missing")).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown function `m::missing`");
    }

    #[tokio::test]
    async fn evaluation_returns_value_and_releases_lock() {
        let mut engine = ExpressionEngine::new();
        engine.register("m", Arc::new(Echo::default())).unwrap();

        let invocation = Invocation::new("m", "echo").arg(Value::string("hi"));
        let Evaluation::Value(value) = engine.evaluate(&ctx(), &invocation).await.unwrap() else {
            panic!("expected a value");
        };
        assert_eq!(value.expose(), "hi");
        assert_eq!(engine.live_locks(), 0);
    }

    #[tokio::test]
    async fn empty_deferral_is_an_internal_error() {
        let mut engine = ExpressionEngine::new();
        engine.register("m", Arc::new(EmptyDefer)).unwrap();

        let err = engine.evaluate(&ctx(), &Invocation::new("m", "empty")).await.unwrap_err();
        assert!(matches!(err, WingmanError::Internal { .. }));
    }

    #[tokio::test]
    async fn cancelled_context_never_invokes_the_function() {
        let echo = Arc::new(Echo::default());
        let mut engine = ExpressionEngine::new();
        engine.register("m", echo.clone()).unwrap();

        let (handle, signal) = cancellation();
        handle.cancel();
        let ctx = RequestContext::new("host", StateStore::in_memory(), signal);

        let invocation = Invocation::new("m", "echo").arg(Value::string("hi"));
        let err = engine.evaluate(&ctx, &invocation).await.unwrap_err();
        assert!(matches!(err, WingmanError::Cancelled { .. }));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_arity_is_rejected_at_registration() {
        let mut engine = ExpressionEngine::new();
        let err = engine.register("m", Arc::new(Backwards)).unwrap_err();
        assert!(matches!(err, WingmanError::Registration { .. }));
        assert!(err.to_string().contains("2..=1"), "got: {err}");
        assert!(engine.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn evaluations_dropped_mid_flight_release_their_lock() {
        let mut engine = ExpressionEngine::new();
        engine.register("m", Arc::new(Slow)).unwrap();
        let invocation = Invocation::new("m", "slow");
        let (first_ctx, second_ctx) = (ctx(), ctx());

        // The second caller waits until 5s, then is dropped at 7s while evaluating.
        let (first, second) = tokio::join!(
            tokio::time::timeout(Duration::from_secs(10), engine.evaluate(&first_ctx, &invocation)),
            tokio::time::timeout(Duration::from_secs(7), engine.evaluate(&second_ctx, &invocation)),
        );

        assert!(matches!(first, Ok(Ok(Evaluation::Value(_)))));
        assert!(second.is_err());
        assert_eq!(engine.live_locks(), 0);
    }

    #[test]
    fn fingerprint_depends_on_args() {
        let a = Invocation::new("m", "f").arg(Value::string("x"));
        let b = Invocation::new("m", "f").arg(Value::string("y"));
        let c = Invocation::new("m", "f").arg(Value::secret("x"));
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_eq!(a.to_string(), "m::f/1");
    }
}
