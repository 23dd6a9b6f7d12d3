//! Seam to the venue order-entry client
//!
//! The REST wrapper that actually sends orders lives outside the core;
//! it implements this trait. Implementations must return quickly (the
//! caller runs on the engine dispatch thread) and do their I/O on their
//! own time. An implementation that cannot confirm submission within
//! its timeout simply leaves the order `Submitted`; the venue's
//! eventual execution report resolves it.

use anyhow::Result;
use common::{Order, Venue};

/// Outbound order operations, implemented by the external REST client
#[cfg_attr(test, mockall::automock)]
pub trait OrderTransport: Send + Sync {
    /// Hand a freshly submitted order to the venue
    fn place(&self, order: &Order) -> Result<()>;

    /// Request cancellation of a working order
    fn cancel(&self, venue: Venue, symbol: &str, order: &Order) -> Result<()>;
}

/// Transport that drops everything; used when running market-data only
#[derive(Debug, Default)]
pub struct NullTransport;

impl OrderTransport for NullTransport {
    fn place(&self, _order: &Order) -> Result<()> {
        Ok(())
    }

    fn cancel(&self, _venue: Venue, _symbol: &str, _order: &Order) -> Result<()> {
        Ok(())
    }
}
