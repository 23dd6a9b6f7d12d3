//! Venue authentication for OKX and Binance
//!
//! Each venue gets its own module; the signing schemes differ enough
//! that no shared trait is worth the indirection.

#![deny(warnings)]
#![deny(clippy::all)]

pub mod binance;
pub mod okx;

pub use binance::{BinanceCredentials, BinanceSigner};
pub use okx::{OkxCredentials, OkxLoginArgs, OkxSigner};
