//! # Mora Host
//!
//! Wires configuration, state, and modules into a [`Negotiator`] and drives it to completion.
//! Ctrl-C cancels an in-flight negotiation.
//!
//! ## Example
//! ```no_run
//! use mora_host::Host;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let outcome = Host::builder()
//!         .module(mora_custom_image::init())
//!         .build()
//!         .await?
//!         .run(Vec::new())
//!         .await?;
//!     println!("settled after {} passes", outcome.passes);
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use mora_domain::config::HostConfig;
use mora_state::{Compression, StateStore};
use mora_wingman::{
    CancelHandle, ExpressionEngine, Invocation, Module, ModuleRegistry, NegotiationOutcome,
    Negotiator, PresetSupplier, ValueSupplier, cancellation,
};
use std::sync::Arc;
use tracing::{info, warn};

/// A fluent builder for configuring and initializing the [`Host`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct HostBuilder {
    cfg: HostConfig,
    modules: Vec<Arc<dyn Module>>,
    supplier: Option<Arc<dyn ValueSupplier>>,
    state: Option<StateStore>,
}

impl HostBuilder {
    pub fn config(mut self, cfg: HostConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn module(mut self, module: Arc<dyn Module>) -> Self {
        self.modules.push(module);
        self
    }

    /// Replaces the default supplier, which answers from the configured preset values.
    pub fn supplier(mut self, supplier: Arc<dyn ValueSupplier>) -> Self {
        self.supplier = Some(supplier);
        self
    }

    /// Uses an already open store instead of opening one from `[state]`.
    pub fn state(mut self, state: StateStore) -> Self {
        self.state = Some(state);
        self
    }

    fn open_state(&self) -> Result<StateStore> {
        let compression =
            if self.cfg.state.compression { Compression::Lz4 } else { Compression::None };
        StateStore::builder()
            .maybe_path(self.cfg.state.path.as_deref())
            .compression(compression)
            .open()
            .context("Failed to open the state store")
    }

    /// Opens state, registers modules, and collects their expression functions.
    ///
    /// # Errors
    /// Returns an error if the state store cannot be opened, a module fails to register, or
    /// a function provider fails.
    pub async fn build(self) -> Result<Host> {
        let state = match &self.state {
            Some(state) => state.clone(),
            None => self.open_state()?,
        };

        let mut registry = ModuleRegistry::new();
        for module in self.modules {
            registry.register(module).context("Module registration failed")?;
        }

        let (cancel, signal) = cancellation();
        let engine = ExpressionEngine::from_registry(&registry, &state, &signal)
            .await
            .context("Failed to collect expression functions")?;

        let supplier = self
            .supplier
            .unwrap_or_else(|| Arc::new(PresetSupplier::new(self.cfg.values.clone())));

        info!(
            modules = registry.len(),
            functions = engine.len(),
            entries = state.len(),
            max_passes = self.cfg.negotiation.max_passes,
            "Host ready"
        );

        let negotiator = Negotiator::new(registry, Arc::new(engine), state, supplier)
            .configure(&self.cfg.negotiation);
        Ok(Host { negotiator, cancel })
    }
}

#[derive(Debug)]
pub struct Host {
    negotiator: Negotiator,
    cancel: CancelHandle,
}

impl Host {
    pub fn builder() -> HostBuilder {
        HostBuilder::default()
    }

    #[must_use]
    pub const fn state(&self) -> &StateStore {
        self.negotiator.state()
    }

    /// Handle that cancels [`Host::run`] from elsewhere.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Negotiates until every module is satisfied and every invocation has a value.
    ///
    /// # Errors
    /// Propagates negotiation failures, including cancellation via Ctrl-C.
    pub async fn run(&self, invocations: Vec<Invocation>) -> Result<NegotiationOutcome> {
        let cancel = self.cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling negotiation");
                cancel.cancel();
            }
        });

        let result = self.negotiator.run(invocations, &self.cancel.signal()).await;
        watcher.abort();

        let outcome = result.context("Negotiation failed")?;
        info!(passes = outcome.passes, values = outcome.values.len(), "Negotiation settled");
        Ok(outcome)
    }
}
