//! Typed publish/subscribe engine at the heart of the trading core
//!
//! Adapters `put` canonical events from their I/O threads through a
//! bounded MPSC channel; a single dedicated dispatch thread delivers
//! them to type-registered and global listeners in producer order.
//! Components expose dynamic query operations to peers through a
//! string-keyed capability table.

#![deny(clippy::all)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod capability;
pub mod component;
pub mod dispatch;

pub use capability::{Capability, CapabilityTable};
pub use component::Component;
pub use dispatch::{Engine, EngineConfig, EngineHandle, EngineStats, EventHandler, HandlerId};
