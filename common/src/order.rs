//! Canonical order entity and lifecycle states

use crate::types::{Px, Qty, Side, Venue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order type as accepted by both venues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Rests at a limit price
    Limit,
    /// Crosses immediately at market
    Market,
    /// Must rest on the book or be rejected
    PostOnly,
    /// Fill-or-kill
    Fok,
    /// Immediate-or-cancel
    Ioc,
}

impl OrderType {
    /// Stable wire code
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Limit => 0,
            Self::Market => 1,
            Self::PostOnly => 2,
            Self::Fok => 3,
            Self::Ioc => 4,
        }
    }

    /// Decode a wire code back into an order type
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Limit),
            1 => Some(Self::Market),
            2 => Some(Self::PostOnly),
            3 => Some(Self::Fok),
            4 => Some(Self::Ioc),
            _ => None,
        }
    }
}

/// Time in force for limit orders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good till cancelled
    #[default]
    Gtc,
    /// Immediate-or-cancel
    Ioc,
    /// Fill-or-kill
    Fok,
}

impl TimeInForce {
    /// Stable wire code
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Gtc => 0,
            Self::Ioc => 1,
            Self::Fok => 2,
        }
    }

    /// Decode a wire code back into a time-in-force
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Gtc),
            1 => Some(Self::Ioc),
            2 => Some(Self::Fok),
            _ => None,
        }
    }
}

/// Order lifecycle state
///
/// Created -> Submitted -> Accepted -> PartiallyFilled* -> Filled, with
/// terminal branches Rejected (from Submitted/Accepted), Cancelled (from
/// Accepted/PartiallyFilled) and Expired (from Accepted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    /// Built locally, not yet handed to the venue
    Created,
    /// Sent to the venue, no ack yet
    Submitted,
    /// Acknowledged live on the venue book
    Accepted,
    /// Partially executed, remainder live
    PartiallyFilled,
    /// Fully executed
    Filled,
    /// Cancelled with zero or partial execution
    Cancelled,
    /// Rejected by the venue
    Rejected,
    /// Expired by venue time-in-force rules
    Expired,
}

impl OrderState {
    /// Whether the order still occupies venue-side state
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Submitted | Self::Accepted | Self::PartiallyFilled)
    }

    /// Whether the state is terminal
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Expired
        )
    }

    /// Whether `next` is a legal successor of `self`
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Created, Self::Submitted) => true,
            (Self::Submitted, Self::Accepted | Self::Rejected) => true,
            (
                Self::Accepted,
                Self::PartiallyFilled
                | Self::Filled
                | Self::Cancelled
                | Self::Rejected
                | Self::Expired,
            ) => true,
            (Self::PartiallyFilled, Self::PartiallyFilled | Self::Filled | Self::Cancelled) => true,
            // A fill report can arrive while the ack is still in flight.
            (Self::Submitted, Self::PartiallyFilled | Self::Filled | Self::Cancelled) => true,
            _ => false,
        }
    }

    /// Stable wire code
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Submitted => 1,
            Self::Accepted => 2,
            Self::PartiallyFilled => 3,
            Self::Filled => 4,
            Self::Cancelled => 5,
            Self::Rejected => 6,
            Self::Expired => 7,
        }
    }

    /// Decode a wire code back into a state
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Created),
            1 => Some(Self::Submitted),
            2 => Some(Self::Accepted),
            3 => Some(Self::PartiallyFilled),
            4 => Some(Self::Filled),
            5 => Some(Self::Cancelled),
            6 => Some(Self::Rejected),
            7 => Some(Self::Expired),
            _ => None,
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Submitted => "submitted",
            Self::Accepted => "accepted",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Canonical order entity
///
/// `filled_price` is the volume-weighted average of fills. The venue's
/// decimal strings for price and quantity are preserved verbatim in
/// `price_text` / `qty_text` for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Locally assigned monotonic id
    pub order_id: u64,
    /// Venue-assigned id, known after the ack
    pub exchange_order_id: Option<String>,
    /// Client order id echoed by the venue
    pub client_order_id: String,
    /// Originating venue
    pub venue: Venue,
    /// Venue-native symbol
    pub symbol: String,
    /// Buy or sell
    pub side: Side,
    /// Order type
    pub order_type: OrderType,
    /// Limit price (0 for market orders)
    pub price: Px,
    /// Ordered quantity
    pub qty: Qty,
    /// Cumulative filled quantity
    pub filled_qty: Qty,
    /// VWAP of fills so far
    pub filled_price: Px,
    /// Cumulative fee in quote currency, when the venue reports one
    pub fee: Option<f64>,
    /// Lifecycle state
    pub state: OrderState,
    /// Venue update timestamp in milliseconds
    pub venue_ts: u64,
    /// Venue decimal string for the order price
    pub price_text: String,
    /// Venue decimal string for the order quantity
    pub qty_text: String,
}

impl Order {
    /// Whether the order still occupies venue-side state
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Whether the order reached a terminal state
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.state.is_final()
    }

    /// Quantity still unfilled
    #[must_use]
    pub fn remaining(&self) -> Qty {
        Qty::new((self.qty.as_f64() - self.filled_qty.as_f64()).max(0.0))
    }
}
