//! Common types for the tickbus trading core

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod events;
pub mod order;
pub mod types;

pub use error::TransportError;
pub use events::*;
pub use order::{Order, OrderState, OrderType, TimeInForce};
pub use types::*;
