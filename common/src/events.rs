//! Canonical event model dispatched by the engine and carried by the journal

use crate::order::{Order, OrderType, TimeInForce};
use crate::types::{Px, Qty, Side, SourceId, Ts, Venue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Best-bid/ask + last-trade snapshot for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerEvent {
    /// Originating venue
    pub venue: Venue,
    /// Venue-native symbol
    pub symbol: String,
    /// Last traded price
    pub last: Px,
    /// Best bid, when published by the channel
    pub bid: Option<Px>,
    /// Best ask, when published by the channel
    pub ask: Option<Px>,
    /// 24h high
    pub high_24h: Option<Px>,
    /// 24h low
    pub low_24h: Option<Px>,
    /// 24h open
    pub open_24h: Option<Px>,
    /// 24h base volume
    pub volume_24h: Option<Qty>,
    /// Venue timestamp in milliseconds
    pub venue_ts: u64,
}

/// Single public trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Originating venue
    pub venue: Venue,
    /// Venue-native symbol
    pub symbol: String,
    /// Venue trade id
    pub trade_id: String,
    /// Trade price
    pub price: Px,
    /// Trade quantity
    pub qty: Qty,
    /// Taker side, when the venue reports it
    pub side: Option<Side>,
    /// Venue timestamp in milliseconds
    pub venue_ts: u64,
}

/// One price level of an order book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Level price
    pub price: Px,
    /// Resting size at the level
    pub qty: Qty,
}

impl BookLevel {
    /// Create a new level
    #[must_use]
    pub const fn new(price: Px, qty: Qty) -> Self {
        Self { price, qty }
    }
}

/// Order book snapshot truncated to the channel's depth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookEvent {
    /// Originating venue
    pub venue: Venue,
    /// Venue-native symbol
    pub symbol: String,
    /// Channel tag the snapshot came from (e.g. `books5`, `depth20`)
    pub channel: String,
    /// Bids, best first (descending price)
    pub bids: Vec<BookLevel>,
    /// Asks, best first (ascending price)
    pub asks: Vec<BookLevel>,
    /// Venue timestamp in milliseconds
    pub venue_ts: u64,
}

impl OrderBookEvent {
    /// Best bid price, if the bid side is non-empty
    #[must_use]
    pub fn best_bid(&self) -> Option<Px> {
        self.bids.first().map(|l| l.price)
    }

    /// Best ask price, if the ask side is non-empty
    #[must_use]
    pub fn best_ask(&self) -> Option<Px> {
        self.asks.first().map(|l| l.price)
    }

    /// Whether best bid >= best ask (invalid book)
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.as_f64() >= ask.as_f64(),
            _ => false,
        }
    }
}

/// Confirmed candlestick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlineEvent {
    /// Originating venue
    pub venue: Venue,
    /// Venue-native symbol
    pub symbol: String,
    /// Bar interval tag (e.g. `1m`)
    pub interval: String,
    /// Open price
    pub open: Px,
    /// High price
    pub high: Px,
    /// Low price
    pub low: Px,
    /// Close price
    pub close: Px,
    /// Base volume
    pub volume: Qty,
    /// Bar open timestamp in milliseconds
    pub venue_ts: u64,
    /// Whether the bar is closed; unconfirmed bars never reach the engine
    pub confirmed: bool,
}

/// Perpetual-swap funding rate update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRateEvent {
    /// Originating venue
    pub venue: Venue,
    /// Venue-native symbol
    pub symbol: String,
    /// Venue instrument type tag (e.g. `SWAP`)
    pub inst_type: String,
    /// Current funding rate
    pub funding_rate: f64,
    /// Predicted next funding rate
    pub next_funding_rate: Option<f64>,
    /// Current funding time in milliseconds
    pub funding_time: u64,
    /// Next funding time in milliseconds
    pub next_funding_time: Option<u64>,
    /// Venue floor for the rate
    pub min_funding_rate: Option<f64>,
    /// Venue cap for the rate
    pub max_funding_rate: Option<f64>,
    /// Venue timestamp in milliseconds
    pub venue_ts: u64,
}

/// Net position for one symbol (+ long, - short)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEvent {
    /// Originating venue
    pub venue: Venue,
    /// Venue-native symbol
    pub symbol: String,
    /// Signed quantity
    pub qty: f64,
    /// Average entry price; meaningless while `qty == 0`
    pub avg_price: Px,
    /// Mark-to-market PnL against the last ticker
    pub unrealized_pnl: f64,
    /// Realized PnL accumulated from closing fills
    pub realized_pnl: f64,
    /// Update timestamp in milliseconds
    pub ts: u64,
}

/// Balance snapshot for one quote currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEvent {
    /// Originating venue
    pub venue: Venue,
    /// Currency code (e.g. `USDT`)
    pub currency: String,
    /// Total balance
    pub balance: f64,
    /// Available balance
    pub available: f64,
    /// Frozen by open orders
    pub frozen: f64,
    /// Venue timestamp in milliseconds
    pub venue_ts: u64,
}

/// Adapter session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No socket
    Disconnected,
    /// TCP/TLS handshake in flight
    Connecting,
    /// Socket up, not yet authenticated
    Connected,
    /// Login challenge sent
    Authenticating,
    /// Login accepted
    Authenticated,
    /// Subscriptions being replayed
    Subscribing,
    /// Streaming
    Active,
    /// Failed; reconnect pending unless terminal
    Error,
    /// Backoff before the next connect attempt
    Reconnecting,
}

impl SessionState {
    /// Stable wire code
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
            Self::Authenticating => 3,
            Self::Authenticated => 4,
            Self::Subscribing => 5,
            Self::Active => 6,
            Self::Error => 7,
            Self::Reconnecting => 8,
        }
    }

    /// Decode a wire code back into a session state
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Disconnected),
            1 => Some(Self::Connecting),
            2 => Some(Self::Connected),
            3 => Some(Self::Authenticating),
            4 => Some(Self::Authenticated),
            5 => Some(Self::Subscribing),
            6 => Some(Self::Active),
            7 => Some(Self::Error),
            8 => Some(Self::Reconnecting),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Subscribing => "subscribing",
            Self::Active => "active",
            Self::Error => "error",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

/// Session lifecycle notification, including terminal auth failures and
/// journal reader lag surfaced to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Venue the session talks to
    pub venue: Venue,
    /// Session source id
    pub session: SourceId,
    /// New state
    pub state: SessionState,
    /// Human-readable detail (error text, venue code)
    pub detail: String,
}

/// Command surface emitted by strategies and the UI, consumed by adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandEvent {
    /// Submit a new order
    PlaceOrder {
        /// Target venue
        venue: Venue,
        /// Venue-native symbol
        symbol: String,
        /// Buy or sell
        side: Side,
        /// Order type
        order_type: OrderType,
        /// Limit price; `None` for market orders
        price: Option<Px>,
        /// Quantity
        qty: Qty,
        /// Client order id
        client_order_id: String,
        /// Time in force
        tif: TimeInForce,
    },
    /// Cancel a working order by local id
    CancelOrder {
        /// Target venue
        venue: Venue,
        /// Venue-native symbol
        symbol: String,
        /// Local order id
        order_id: u64,
    },
    /// Subscribe a market data channel
    Subscribe {
        /// Target venue
        venue: Venue,
        /// Channel tag (e.g. `tickers`, `books5`)
        channel: String,
        /// Venue-native symbol
        symbol: String,
    },
    /// Remove a market data subscription
    Unsubscribe {
        /// Target venue
        venue: Venue,
        /// Channel tag
        channel: String,
        /// Venue-native symbol
        symbol: String,
    },
}

impl CommandEvent {
    /// Venue the command targets
    #[must_use]
    pub const fn venue(&self) -> Venue {
        match self {
            Self::PlaceOrder { venue, .. }
            | Self::CancelOrder { venue, .. }
            | Self::Subscribe { venue, .. }
            | Self::Unsubscribe { venue, .. } => *venue,
        }
    }
}

/// Closed set of event discriminants used for listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Ticker snapshots
    Ticker,
    /// Public trades
    Trade,
    /// Order book snapshots
    OrderBook,
    /// Confirmed klines
    Kline,
    /// Funding rate updates
    Funding,
    /// Order lifecycle transitions
    Order,
    /// Position updates
    Position,
    /// Balance updates
    Account,
    /// Session lifecycle
    Session,
    /// Inbound commands
    Command,
}

/// Canonical event union
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Ticker snapshot
    Ticker(TickerEvent),
    /// Public trade
    Trade(TradeEvent),
    /// Order book snapshot
    OrderBook(OrderBookEvent),
    /// Confirmed kline
    Kline(KlineEvent),
    /// Funding rate update
    Funding(FundingRateEvent),
    /// Order lifecycle transition
    Order(Order),
    /// Position update
    Position(PositionEvent),
    /// Balance update
    Account(AccountEvent),
    /// Session lifecycle notification
    Session(SessionEvent),
    /// Inbound command
    Command(CommandEvent),
}

impl Event {
    /// Discriminant for listener registration and journal framing
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Ticker(_) => EventKind::Ticker,
            Self::Trade(_) => EventKind::Trade,
            Self::OrderBook(_) => EventKind::OrderBook,
            Self::Kline(_) => EventKind::Kline,
            Self::Funding(_) => EventKind::Funding,
            Self::Order(_) => EventKind::Order,
            Self::Position(_) => EventKind::Position,
            Self::Account(_) => EventKind::Account,
            Self::Session(_) => EventKind::Session,
            Self::Command(_) => EventKind::Command,
        }
    }

    /// Symbol the event refers to, when it has one
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Ticker(e) => Some(&e.symbol),
            Self::Trade(e) => Some(&e.symbol),
            Self::OrderBook(e) => Some(&e.symbol),
            Self::Kline(e) => Some(&e.symbol),
            Self::Funding(e) => Some(&e.symbol),
            Self::Order(o) => Some(&o.symbol),
            Self::Position(e) => Some(&e.symbol),
            Self::Account(_) | Self::Session(_) | Self::Command(_) => None,
        }
    }
}

/// Event as dispatched: payload plus engine-stamped provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Engine-assigned dispatch sequence
    pub seq: u64,
    /// Session id of the originating adapter, or [`SourceId::LOCAL`]
    pub source: SourceId,
    /// Local nanosecond timestamp stamped at ingest
    pub ingest_ts: Ts,
    /// The event payload
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(bids: &[(f64, f64)], asks: &[(f64, f64)]) -> OrderBookEvent {
        OrderBookEvent {
            venue: Venue::Okx,
            symbol: "BTC-USDT-SWAP".to_string(),
            channel: "books5".to_string(),
            bids: bids
                .iter()
                .map(|&(p, q)| BookLevel::new(Px::new(p), Qty::new(q)))
                .collect(),
            asks: asks
                .iter()
                .map(|&(p, q)| BookLevel::new(Px::new(p), Qty::new(q)))
                .collect(),
            venue_ts: 1_700_000_000_000,
        }
    }

    #[test]
    fn best_levels() {
        let b = book(&[(50_000.0, 1.0), (49_999.0, 2.0)], &[(50_001.0, 1.5)]);
        assert_eq!(b.best_bid(), Some(Px::new(50_000.0)));
        assert_eq!(b.best_ask(), Some(Px::new(50_001.0)));
        assert!(!b.is_crossed());
    }

    #[test]
    fn crossed_book_detected() {
        let b = book(&[(50_002.0, 1.0)], &[(50_001.0, 1.5)]);
        assert!(b.is_crossed());
    }

    #[test]
    fn one_sided_book_is_not_crossed() {
        let b = book(&[(50_000.0, 1.0)], &[]);
        assert!(!b.is_crossed());
    }

    #[test]
    fn event_kind_matches_variant() {
        let ev = Event::Ticker(TickerEvent {
            venue: Venue::Binance,
            symbol: "BTCUSDT".to_string(),
            last: Px::new(50_000.0),
            bid: None,
            ask: None,
            high_24h: None,
            low_24h: None,
            open_24h: None,
            volume_24h: None,
            venue_ts: 0,
        });
        assert_eq!(ev.kind(), EventKind::Ticker);
        assert_eq!(ev.symbol(), Some("BTCUSDT"));
    }
}
