use mora_domain::StateConfigEntry;
use mora_state::StateStore;
use std::sync::Arc;
use tokio::sync::watch;

/// Creates a linked cancellation pair.
#[must_use]
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
}

/// Host side of a cancellation pair. Cancelling is permanent.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn signal(&self) -> CancelSignal {
        CancelSignal { rx: self.tx.subscribe() }
    }
}

/// Observer side of a cancellation pair, cloned into every request.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the handle is gone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

/// Everything a module call may look at: its own name, the shared state, and cancellation.
///
/// Immutable and cheap to clone; use [`RequestContext::for_module`] to address another module.
#[derive(Debug, Clone)]
pub struct RequestContext {
    module_name: Arc<str>,
    state: StateStore,
    cancel: CancelSignal,
}

impl RequestContext {
    pub fn new(module_name: impl Into<Arc<str>>, state: StateStore, cancel: CancelSignal) -> Self {
        Self { module_name: module_name.into(), state, cancel }
    }

    #[must_use]
    pub fn for_module(&self, module_name: impl Into<Arc<str>>) -> Self {
        Self { module_name: module_name.into(), state: self.state.clone(), cancel: self.cancel.clone() }
    }

    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    #[must_use]
    pub(crate) fn module_name_arc(&self) -> Arc<str> {
        Arc::clone(&self.module_name)
    }

    #[must_use]
    pub const fn state(&self) -> &StateStore {
        &self.state
    }

    #[must_use]
    pub const fn cancel(&self) -> &CancelSignal {
        &self.cancel
    }

    /// Looks up `name` in this module's own namespace.
    #[must_use]
    pub fn find_config(&self, name: &str) -> Option<Arc<StateConfigEntry>> {
        self.state.find_config(&self.module_name, name)
    }
}
