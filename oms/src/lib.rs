//! Order lifecycle and account state
//!
//! `OrderManager` owns the canonical order map and turns venue
//! execution reports into lifecycle transitions; `AccountManager`
//! aggregates fills and tickers into positions, PnL and balances. Both
//! attach to the engine as components and expose snapshots through the
//! capability table.

#![deny(clippy::all)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod account;
pub mod lifecycle;
pub mod manager;
pub mod transport;

pub use account::AccountManager;
pub use lifecycle::{ReportOutcome, apply_report};
pub use manager::OrderManager;
pub use transport::OrderTransport;
