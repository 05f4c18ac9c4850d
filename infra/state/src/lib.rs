//! Append-only, module-scoped history of resolved configuration entries.
//!
//! The store keeps every [`StateConfigEntry`] ever appended, in order. Lookups are keyed by
//! `(module_name, name)` and resolve to the **most recently appended** matching entry; older
//! entries remain available through [`StateStore::history`] as an audit trail.
//!
//! # Consistency
//!
//! - **Single writer**: appends are serialized behind one write lock.
//! - **Read-your-writes**: a lookup issued after [`StateStore::append`] returns observes it.
//! - **Persist first**: the backend persists the new log before the append becomes visible. A
//!   failed persist leaves the store exactly as it was.
//!
//! # Persistence
//!
//! [`FileBackend`] rewrites the whole log as one snapshot using an atomic swap (unique temp
//! file + `fsync` + `rename`), so a crash never leaves a half-written log behind:
//!
//! ```text
//! [MAGIC "MORA"(4)][V(1)][FLAGS(1)][BODY(N)]
//! ```
//!
//! `BODY` is the postcard-encoded entry list, LZ4-compressed when `FLAGS` bit 0 is set.
//!
//! # Example
//!
//! ```rust
//! use mora_domain::{StateConfigEntry, ValueKind};
//! use mora_state::{StateError, StateStore};
//!
//! # fn main() -> Result<(), StateError> {
//! let state = StateStore::in_memory();
//! assert!(state.find_config("custom_image", "test").is_none());
//!
//! state.append(StateConfigEntry::new("custom_image", "test", ValueKind::Secret, "hunter2"))?;
//! assert!(state.find_config("custom_image", "test").is_some());
//! # Ok(())
//! # }
//! ```

mod backend;
mod builder;
mod error;
mod snapshot;
mod store;

pub use backend::{FileBackend, MemoryBackend, StateBackend};
pub use builder::StateStoreBuilder;
pub use error::{StateError, StateErrorExt};
pub use mora_domain::StateConfigEntry;
pub use snapshot::Compression;
pub use store::StateStore;
