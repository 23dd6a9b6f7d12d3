//! Venue adapters: session lifecycle and payload normalization
//!
//! Organized structure:
//! - okx/: OKX v5 public, business and private websocket channels
//! - binance/: Binance market streams and the user-data stream
//! - session: venue-agnostic connection state machine
//! - router: engine component feeding commands into live sessions

#![deny(clippy::all)]

pub mod binance;
pub mod endpoints;
pub mod okx;
pub mod router;
pub mod session;

pub use binance::{BinanceMarketProtocol, BinanceUserProtocol};
pub use okx::{OkxChannelKind, OkxProtocol};
pub use router::{
    CommandRouter, binance_market_channel, okx_business_channel, okx_public_channel,
};
pub use session::{Session, SessionCommand, SessionConfig, SessionHandle, Topic, VenueProtocol};
