//! Binance stream payload shapes

use serde::Deserialize;

/// Combined-stream wrapper: `{"stream":"btcusdt@ticker","data":{...}}`
#[derive(Debug, Deserialize)]
pub struct StreamMessage {
    pub stream: String,
    pub data: serde_json::Value,
}

/// SUBSCRIBE/UNSUBSCRIBE acknowledgement
#[derive(Debug, Deserialize)]
pub struct MethodAck {
    #[allow(dead_code)]
    pub result: Option<serde_json::Value>,
    pub id: u64,
}

/// 24hr rolling ticker (`@ticker`)
#[derive(Debug, Deserialize)]
pub struct TickerUpdate {
    #[serde(rename = "E")]
    pub event_time: u64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c")]
    pub last_price: String,
    #[serde(rename = "o", default)]
    pub open_price: String,
    #[serde(rename = "h", default)]
    pub high_price: String,
    #[serde(rename = "l", default)]
    pub low_price: String,
    #[serde(rename = "v", default)]
    pub volume: String,
    #[serde(rename = "b", default)]
    pub best_bid: String,
    #[serde(rename = "a", default)]
    pub best_ask: String,
}

/// Raw trade (`@trade`)
#[derive(Debug, Deserialize)]
pub struct TradeUpdate {
    #[serde(rename = "E")]
    pub event_time: u64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "t")]
    pub trade_id: u64,
    #[serde(rename = "p")]
    pub price: String,
    #[serde(rename = "q")]
    pub quantity: String,
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

/// Partial book snapshot (`@depth<N>`)
#[derive(Debug, Deserialize)]
pub struct PartialDepth {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
}

/// Kline wrapper (`@kline_<interval>`)
#[derive(Debug, Deserialize)]
pub struct KlineUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "k")]
    pub kline: KlineBody,
}

#[derive(Debug, Deserialize)]
pub struct KlineBody {
    #[serde(rename = "t")]
    pub open_time: u64,
    #[serde(rename = "i")]
    pub interval: String,
    #[serde(rename = "o")]
    pub open: String,
    #[serde(rename = "h")]
    pub high: String,
    #[serde(rename = "l")]
    pub low: String,
    #[serde(rename = "c")]
    pub close: String,
    #[serde(rename = "v")]
    pub volume: String,
    /// Whether the bar is closed
    #[serde(rename = "x")]
    pub is_closed: bool,
}

/// User-data execution report
#[derive(Debug, Deserialize)]
pub struct ExecutionReport {
    #[serde(rename = "E")]
    pub event_time: u64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c")]
    pub client_order_id: String,
    /// Original client id, set on cancels
    #[serde(rename = "C", default)]
    pub orig_client_order_id: String,
    #[serde(rename = "S")]
    pub side: String,
    #[serde(rename = "o")]
    pub order_type: String,
    #[serde(rename = "q")]
    pub quantity: String,
    #[serde(rename = "p")]
    pub price: String,
    #[serde(rename = "X")]
    pub order_status: String,
    #[serde(rename = "i")]
    pub order_id: u64,
    #[serde(rename = "z")]
    pub cum_filled_qty: String,
    #[serde(rename = "Z", default)]
    pub cum_quote_qty: String,
    #[serde(rename = "n", default)]
    pub commission: String,
}

/// User-data balance snapshot
#[derive(Debug, Deserialize)]
pub struct AccountPosition {
    #[serde(rename = "E")]
    pub event_time: u64,
    #[serde(rename = "B")]
    pub balances: Vec<AccountBalance>,
}

#[derive(Debug, Deserialize)]
pub struct AccountBalance {
    #[serde(rename = "a")]
    pub asset: String,
    /// Free balance
    #[serde(rename = "f")]
    pub free: String,
    /// Locked balance
    #[serde(rename = "l")]
    pub locked: String,
}
