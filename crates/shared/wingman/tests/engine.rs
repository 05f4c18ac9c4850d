use mora_domain::config::HostConfig;
use mora_wingman::config::load_host_config;
use mora_wingman::*;
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug)]
struct Counted {
    arity: Arity,
    calls: AtomicUsize,
}

#[async_trait]
impl ExpressionFunction for Counted {
    fn name(&self) -> &str {
        "counted"
    }

    fn arity(&self) -> Arity {
        self.arity
    }

    async fn evaluate(&self, _ctx: &RequestContext, _args: &[Value]) -> Result<Evaluation, WingmanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::string("ok").into())
    }
}

/// Provisions once, then serves the cached entry.
#[derive(Debug, Default)]
struct Provision {
    effects: AtomicUsize,
}

#[async_trait]
impl ExpressionFunction for Provision {
    fn name(&self) -> &str {
        "provision"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }

    async fn evaluate(&self, ctx: &RequestContext, args: &[Value]) -> Result<Evaluation, WingmanError> {
        let key = args[0].expose();
        if let Some(entry) = ctx.find_config(key) {
            let value = entry.to_value().map_err(|e| WingmanError::invalid_state(e.to_string()))?;
            return Ok(value.into());
        }

        self.effects.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let value = Value::secret(format!("resource-{key}"));
        ctx.state().append(StateConfigEntry::from_value(ctx.module_name(), key, &value))?;
        Ok(value.into())
    }
}

/// Blocks inside `deploy` until dropped, announcing that it was entered.
#[derive(Debug, Default)]
struct StuckDeployer {
    entered: tokio::sync::Notify,
}

#[async_trait]
impl Deployer for StuckDeployer {
    async fn deploy(&self, _ctx: &RequestContext, _secret: &SecretRef) -> Result<(), BoxError> {
        self.entered.notify_one();
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Deploys a fixed secret and records it as `edge_token`.
#[derive(Debug)]
struct Publish {
    deployer: Arc<StuckDeployer>,
}

#[async_trait]
impl ExpressionFunction for Publish {
    fn name(&self) -> &str {
        "publish"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(0)
    }

    async fn evaluate(&self, ctx: &RequestContext, _args: &[Value]) -> Result<Evaluation, WingmanError> {
        let secret = SecretRef::new("edge", "tok");
        materialize_secret(ctx, self.deployer.as_ref(), secret, "edge_token").await.map(Evaluation::Value)
    }
}

fn ctx(state: StateStore) -> RequestContext {
    RequestContext::new("host", state, CancelSignal::never())
}

proptest! {
    #[test]
    fn arity_violations_never_reach_the_function(min in 0usize..4, span in 0usize..3, given in 0usize..8) {
        let arity = Arity::new(min, min + span);
        let function = Arc::new(Counted { arity, calls: AtomicUsize::new(0) });
        let mut engine = ExpressionEngine::new();
        engine.register("m", function.clone()).unwrap();

        let invocation = (0..given).fold(Invocation::new("m", "counted"), |inv, i| {
            inv.arg(Value::string(i.to_string()))
        });

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let result = runtime.block_on(engine.evaluate(&ctx(StateStore::in_memory()), &invocation));

        if given < arity.min || given > arity.max {
            let is_arity_error = matches!(
                result,
                Err(WingmanError::ArityMismatch { min: m, max: x, given: g, .. })
                    if m == arity.min && x == arity.max && g == given
            );
            prop_assert!(is_arity_error);
            prop_assert_eq!(function.calls.load(Ordering::SeqCst), 0);
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(function.calls.load(Ordering::SeqCst), 1);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_evaluations_provision_once() {
    let provision = Arc::new(Provision::default());
    let mut engine = ExpressionEngine::new();
    engine.register("infra", provision.clone()).unwrap();
    let engine = Arc::new(engine);
    let state = StateStore::in_memory();

    let invocation = Invocation::new("infra", "provision").arg(Value::string("tunnel"));
    let calls = (0..4).map(|_| {
        let engine = Arc::clone(&engine);
        let ctx = ctx(state.clone());
        let invocation = invocation.clone();
        tokio::spawn(async move { engine.evaluate(&ctx, &invocation).await })
    });

    for call in futures::future::join_all(calls).await {
        let Evaluation::Value(value) = call.unwrap().unwrap() else {
            panic!("expected a value");
        };
        assert_eq!(value.expose(), "resource-tunnel");
    }

    assert_eq!(provision.effects.load(Ordering::SeqCst), 1);
    assert_eq!(state.history("infra", "tunnel").len(), 1);
}

#[tokio::test]
async fn different_args_do_not_share_a_lock() {
    let provision = Arc::new(Provision::default());
    let mut engine = ExpressionEngine::new();
    engine.register("infra", provision.clone()).unwrap();
    let state = StateStore::in_memory();
    let ctx = ctx(state.clone());

    let a = Invocation::new("infra", "provision").arg(Value::string("a"));
    let b = Invocation::new("infra", "provision").arg(Value::string("b"));
    let (ra, rb) = tokio::join!(engine.evaluate(&ctx, &a), engine.evaluate(&ctx, &b));
    ra.unwrap();
    rb.unwrap();

    assert_eq!(provision.effects.load(Ordering::SeqCst), 2);
    assert_eq!(state.len(), 2);
}

#[tokio::test]
async fn cancelling_during_deploy_appends_nothing() {
    let deployer = Arc::new(StuckDeployer::default());
    let mut engine = ExpressionEngine::new();
    engine.register("infra", Arc::new(Publish { deployer: deployer.clone() })).unwrap();
    let state = StateStore::in_memory();
    let (handle, signal) = cancellation();
    let ctx = RequestContext::new("host", state.clone(), signal);

    let invocation = Invocation::new("infra", "publish");
    let cancel_once_deploying = async {
        deployer.entered.notified().await;
        handle.cancel();
    };
    let (result, ()) = tokio::join!(engine.evaluate(&ctx, &invocation), cancel_once_deploying);

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(state.is_empty());
    assert!(state.find_config("infra", "edge_token").is_none());
}

#[test]
fn host_config_loads_from_file_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("host.toml");
    std::fs::write(
        &path,
        r#"
[negotiation]
max_passes = 4

[values.custom_image]
test = "preset-secret"
"#,
    )
    .unwrap();

    let config: HostConfig = load_host_config(Some(&path)).unwrap();
    assert_eq!(config.negotiation.max_passes, 4);
    assert_eq!(config.values.get("custom_image", "test"), Some("preset-secret"));
    assert_eq!(config.log.level, "info");
    assert!(config.state.path.is_none());
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_host_config(Some(dir.path().join("absent.toml"))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}
