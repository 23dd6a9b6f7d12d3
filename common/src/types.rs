//! Scalar types shared across the tickbus core

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange venue identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Venue {
    /// OKX v5
    Okx,
    /// Binance spot / futures
    Binance,
}

impl Venue {
    /// Stable wire code used by the journal frame layout
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Okx => 1,
            Self::Binance => 2,
        }
    }

    /// Decode a wire code back into a venue
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Okx),
            2 => Some(Self::Binance),
            _ => None,
        }
    }

    /// Lowercase venue name used in logs and capability arguments
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Okx => "okx",
            Self::Binance => "binance",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order / trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buyer-initiated
    Buy,
    /// Seller-initiated
    Sell,
}

impl Side {
    /// Sign applied to quantities in position accounting (+1 buy, -1 sell)
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }

    /// Stable wire code (0 = buy, 1 = sell)
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Buy => 0,
            Self::Sell => 1,
        }
    }

    /// Decode a wire code back into a side
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Buy),
            1 => Some(Self::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("buy"),
            Self::Sell => f.write_str("sell"),
        }
    }
}

/// Price with f64 precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Px(pub f64);

impl Px {
    /// Create a new price
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the price as f64
    #[must_use]
    pub const fn as_f64(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.0)
    }
}

/// Quantity with f64 precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Qty(pub f64);

impl Qty {
    /// Create a new quantity
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the quantity as f64
    #[must_use]
    pub const fn as_f64(&self) -> f64 {
        self.0
    }

    /// Whether the quantity is zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.0)
    }
}

/// Timestamp in nanoseconds since UNIX epoch
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Ts(pub u64);

impl Ts {
    /// Current wall-clock time
    #[must_use]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| std::time::Duration::from_secs(0))
            .as_nanos() as u64;
        Self(nanos)
    }

    /// Create timestamp from nanoseconds
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create timestamp from venue milliseconds
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000_000)
    }

    /// Get timestamp as nanoseconds
    #[must_use]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Get timestamp as milliseconds
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Identifier of the session or component that produced an event
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SourceId(pub u16);

impl SourceId {
    /// Events originated in-process rather than by an adapter session
    pub const LOCAL: Self = Self(0);

    /// Create a new source id
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "src_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venue_code_round_trip() {
        for venue in [Venue::Okx, Venue::Binance] {
            assert_eq!(Venue::from_code(venue.code()), Some(venue));
        }
        assert_eq!(Venue::from_code(0), None);
    }

    #[test]
    fn side_sign() {
        assert_eq!(Side::Buy.sign(), 1.0);
        assert_eq!(Side::Sell.sign(), -1.0);
        assert_eq!(Side::from_code(Side::Sell.code()), Some(Side::Sell));
    }

    #[test]
    fn ts_conversions() {
        let ts = Ts::from_millis(1_234);
        assert_eq!(ts.as_nanos(), 1_234_000_000);
        assert_eq!(ts.as_millis(), 1_234);
    }
}
