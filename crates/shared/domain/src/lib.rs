//! # Domain Models
//!
//! Pure types for the module configuration negotiation protocol: values, config points,
//! resolved state entries, module capabilities, and the host configuration model.
//! Keep it lean: no I/O, no async, no logging. Just data and simple helpers.

pub mod capabilities;
pub mod config;
pub mod entry;
pub mod point;
pub mod value;

pub use capabilities::ModuleCapabilities;
pub use entry::StateConfigEntry;
pub use point::ConfigPoint;
pub use value::{SecretString, Value, ValueKind};
