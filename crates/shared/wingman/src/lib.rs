//! # Wingman
//!
//! The module configuration negotiation and expression evaluation protocol.
//!
//! A host registers [`Module`]s in a [`ModuleRegistry`], builds an [`ExpressionEngine`] from
//! the modules that expose functions, and hands both to a [`Negotiator`]. The negotiator asks
//! modules which config points they still need, lets expression functions discover more
//! requirements while evaluating, and appends the answers to the shared [`StateStore`] until
//! nothing is outstanding.
//!
//! ```rust
//! use mora_wingman::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), WingmanError> {
//! let state = StateStore::in_memory();
//! let registry = ModuleRegistry::new();
//! let cancel = CancelSignal::never();
//! let engine = ExpressionEngine::from_registry(&registry, &state, &cancel).await?;
//!
//! let outcome = Negotiator::new(registry, Arc::new(engine), state, Arc::new(PresetSupplier::default()))
//!     .run(Vec::new(), &cancel)
//!     .await?;
//! assert_eq!(outcome.passes, 1);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
mod context;
mod error;
mod expression;
mod module;
pub mod negotiation;
mod registry;
mod supply;

pub use crate::adapter::{Deployer, MemoryDeployer, SecretRef, materialize_secret};
pub use crate::context::{CancelHandle, CancelSignal, RequestContext, cancellation};
pub use crate::error::{BoxError, ErrorKind, WingmanError, WingmanErrorExt};
pub use crate::expression::{ExpressionEngine, Invocation};
pub use crate::module::{Arity, Evaluation, ExpressionFunction, FunctionProvider, Module};
pub use crate::negotiation::{NegotiationOutcome, Negotiator, PendingPoint};
pub use crate::registry::ModuleRegistry;
pub use crate::supply::{PresetSupplier, ValueSupplier};

pub use async_trait::async_trait;
pub use mora_domain::{ConfigPoint, ModuleCapabilities, StateConfigEntry, Value, ValueKind};
pub use mora_state::StateStore;
