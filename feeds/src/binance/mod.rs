//! Binance adapter: combined market streams and the user-data stream
//!
//! Market data uses the combined `/stream` endpoint with live
//! SUBSCRIBE/UNSUBSCRIBE methods; reconnects rebuild the stream list
//! into the connection URL from the subscription set. The private
//! session authorizes through a listenKey refreshed every 30 minutes.

pub mod wire;

use crate::endpoints::BinanceEndpoints;
use crate::session::{LoginOutcome, Pulse, Topic, VenueProtocol};
use async_trait::async_trait;
use auth::BinanceSigner;
use common::{
    AccountEvent, BookLevel, Event, KlineEvent, Order, OrderBookEvent, OrderState, OrderType, Px,
    Qty, Side, TickerEvent, TradeEvent, TransportError, Venue,
};
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;
use wire::{
    AccountPosition, ExecutionReport, KlineUpdate, PartialDepth, StreamMessage, TickerUpdate,
    TradeUpdate,
};

/// Stream name for a topic, e.g. `btcusdt@depth20@100ms`
fn stream_name(topic: &Topic) -> String {
    let symbol = topic.symbol.to_lowercase();
    match topic.channel.as_str() {
        "ticker" => format!("{symbol}@ticker"),
        "trade" => format!("{symbol}@trade"),
        "depth5" | "depth10" | "depth20" => format!("{symbol}@{}@100ms", topic.channel),
        channel => format!("{symbol}@{channel}"),
    }
}

/// Market-data protocol over the combined stream endpoint
pub struct BinanceMarketProtocol {
    endpoints: BinanceEndpoints,
    next_method_id: u64,
    // Monotonic lastUpdateId per symbol guards partial-book regressions.
    last_update_id: HashMap<String, u64>,
}

impl BinanceMarketProtocol {
    /// Create the market protocol
    #[must_use]
    pub fn new(endpoints: BinanceEndpoints) -> Self {
        Self {
            endpoints,
            next_method_id: 0,
            last_update_id: HashMap::new(),
        }
    }

    fn method(&mut self, method: &str, topics: &[Topic]) -> Option<String> {
        if topics.is_empty() {
            return None;
        }
        self.next_method_id += 1;
        let params: Vec<String> = topics.iter().map(stream_name).collect();
        Some(
            json!({ "method": method, "params": params, "id": self.next_method_id }).to_string(),
        )
    }

    fn normalize(
        &mut self,
        stream: &str,
        data: serde_json::Value,
        out: &mut Vec<Event>,
    ) -> Result<(), TransportError> {
        let (symbol_part, channel) = stream
            .split_once('@')
            .ok_or_else(|| TransportError::Protocol(format!("bad stream name: {stream}")))?;

        if channel == "ticker" {
            let update: TickerUpdate = decode(data)?;
            out.push(Event::Ticker(normalize_ticker(&update)?));
        } else if channel == "trade" {
            let update: TradeUpdate = decode(data)?;
            out.push(Event::Trade(normalize_trade(&update)?));
        } else if channel.starts_with("depth") {
            let update: PartialDepth = decode(data)?;
            let symbol = symbol_part.to_uppercase();
            let last = self.last_update_id.entry(symbol.clone()).or_insert(0);
            if update.last_update_id < *last {
                debug!(%symbol, update_id = update.last_update_id, "stale depth snapshot dropped");
                return Ok(());
            }
            *last = update.last_update_id;
            let depth_tag = channel.split('@').next().unwrap_or(channel);
            out.push(Event::OrderBook(normalize_depth(&symbol, depth_tag, &update)?));
        } else if channel.starts_with("kline") {
            let update: KlineUpdate = decode(data)?;
            if let Some(kline) = normalize_kline(&update)? {
                out.push(Event::Kline(kline));
            }
        } else {
            return Err(TransportError::Protocol(format!(
                "unknown Binance stream: {stream}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VenueProtocol for BinanceMarketProtocol {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    async fn endpoint(&mut self, topics: &[Topic]) -> anyhow::Result<String> {
        let streams: Vec<String> = topics.iter().map(stream_name).collect();
        Ok(format!(
            "{}?streams={}",
            self.endpoints.ws_market,
            streams.join("/")
        ))
    }

    fn login_request(&mut self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    fn check_login(&mut self, _text: &str) -> LoginOutcome {
        LoginOutcome::Pending
    }

    async fn resync_clock(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn subscribe_request(&mut self, topics: &[Topic]) -> anyhow::Result<Option<String>> {
        Ok(self.method("SUBSCRIBE", topics))
    }

    fn unsubscribe_request(&mut self, topics: &[Topic]) -> anyhow::Result<Option<String>> {
        Ok(self.method("UNSUBSCRIBE", topics))
    }

    fn ping_message(&self) -> Option<String> {
        // Binance pings first; the session replies at the websocket layer.
        None
    }

    fn handle_text(&mut self, text: &str, out: &mut Vec<Event>) -> Result<Pulse, TransportError> {
        if serde_json::from_str::<wire::MethodAck>(text).is_ok() {
            return Ok(Pulse::Control);
        }
        let message: StreamMessage = serde_json::from_str(text)
            .map_err(|e| TransportError::Protocol(format!("unparseable Binance frame: {e}")))?;
        self.normalize(&message.stream, message.data, out)?;
        Ok(Pulse::Data)
    }
}

/// User-data protocol behind the listenKey handshake
pub struct BinanceUserProtocol {
    endpoints: BinanceEndpoints,
    signer: BinanceSigner,
    listen_key: Option<String>,
}

impl BinanceUserProtocol {
    /// Create the user-data protocol
    #[must_use]
    pub fn new(endpoints: BinanceEndpoints, signer: BinanceSigner) -> Self {
        Self {
            endpoints,
            signer,
            listen_key: None,
        }
    }
}

#[async_trait]
impl VenueProtocol for BinanceUserProtocol {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    async fn endpoint(&mut self, _topics: &[Topic]) -> anyhow::Result<String> {
        // A fresh listenKey per connection attempt; the old one may have
        // expired while we were away.
        let key = self.signer.create_listen_key(self.endpoints.api).await?;
        let url = format!("{}/{}", self.endpoints.ws_user, key);
        self.listen_key = Some(key);
        Ok(url)
    }

    fn login_request(&mut self) -> anyhow::Result<Option<String>> {
        // The listenKey in the URL is the authentication.
        Ok(None)
    }

    fn check_login(&mut self, _text: &str) -> LoginOutcome {
        LoginOutcome::Pending
    }

    async fn resync_clock(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn subscribe_request(&mut self, _topics: &[Topic]) -> anyhow::Result<Option<String>> {
        // The user-data stream pushes everything; nothing to subscribe.
        Ok(None)
    }

    fn unsubscribe_request(&mut self, _topics: &[Topic]) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    fn ping_message(&self) -> Option<String> {
        None
    }

    async fn keepalive(&mut self) -> anyhow::Result<()> {
        if let Some(key) = &self.listen_key {
            self.signer
                .keepalive_listen_key(self.endpoints.api, key)
                .await?;
        }
        Ok(())
    }

    fn handle_text(&mut self, text: &str, out: &mut Vec<Event>) -> Result<Pulse, TransportError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| TransportError::Protocol(format!("unparseable user-data frame: {e}")))?;
        match value.get("e").and_then(serde_json::Value::as_str) {
            Some("executionReport") => {
                let report: ExecutionReport = decode(value)?;
                out.push(Event::Order(normalize_execution_report(&report)?));
                Ok(Pulse::Data)
            }
            Some("outboundAccountPosition") => {
                let snapshot: AccountPosition = decode(value)?;
                for balance in &snapshot.balances {
                    out.push(Event::Account(normalize_balance(snapshot.event_time, balance)?));
                }
                Ok(Pulse::Data)
            }
            Some(_) | None => Ok(Pulse::Ignored),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, TransportError> {
    serde_json::from_value(value)
        .map_err(|e| TransportError::Protocol(format!("bad Binance payload: {e}")))
}

fn num(field: &str, raw: &str) -> Result<f64, TransportError> {
    raw.parse::<f64>()
        .map_err(|_| TransportError::Protocol(format!("bad decimal in {field}: {raw:?}")))
}

fn num_opt(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        None
    } else {
        raw.parse::<f64>().ok()
    }
}

fn normalize_ticker(update: &TickerUpdate) -> Result<TickerEvent, TransportError> {
    Ok(TickerEvent {
        venue: Venue::Binance,
        symbol: update.symbol.clone(),
        last: Px::new(num("c", &update.last_price)?),
        bid: num_opt(&update.best_bid).map(Px::new),
        ask: num_opt(&update.best_ask).map(Px::new),
        high_24h: num_opt(&update.high_price).map(Px::new),
        low_24h: num_opt(&update.low_price).map(Px::new),
        open_24h: num_opt(&update.open_price).map(Px::new),
        volume_24h: num_opt(&update.volume).map(Qty::new),
        venue_ts: update.event_time,
    })
}

fn normalize_trade(update: &TradeUpdate) -> Result<TradeEvent, TransportError> {
    Ok(TradeEvent {
        venue: Venue::Binance,
        symbol: update.symbol.clone(),
        trade_id: update.trade_id.to_string(),
        price: Px::new(num("p", &update.price)?),
        qty: Qty::new(num("q", &update.quantity)?),
        // Buyer-is-maker means the taker sold.
        side: Some(if update.is_buyer_maker {
            Side::Sell
        } else {
            Side::Buy
        }),
        venue_ts: update.event_time,
    })
}

fn normalize_depth(
    symbol: &str,
    channel: &str,
    update: &PartialDepth,
) -> Result<OrderBookEvent, TransportError> {
    let parse_side = |levels: &[[String; 2]]| -> Result<Vec<BookLevel>, TransportError> {
        levels
            .iter()
            .map(|[price, size]| {
                Ok(BookLevel::new(
                    Px::new(num("depth price", price)?),
                    Qty::new(num("depth size", size)?),
                ))
            })
            .collect()
    };
    let book = OrderBookEvent {
        venue: Venue::Binance,
        symbol: symbol.to_string(),
        channel: channel.to_string(),
        bids: parse_side(&update.bids)?,
        asks: parse_side(&update.asks)?,
        // Partial book snapshots carry no venue clock; stamp arrival time.
        venue_ts: chrono::Utc::now().timestamp_millis() as u64,
    };
    if book.is_crossed() {
        return Err(TransportError::Protocol(format!(
            "crossed book for {symbol}"
        )));
    }
    Ok(book)
}

fn normalize_kline(update: &KlineUpdate) -> Result<Option<KlineEvent>, TransportError> {
    let k = &update.kline;
    // Unconfirmed bars never reach the engine.
    if !k.is_closed {
        return Ok(None);
    }
    Ok(Some(KlineEvent {
        venue: Venue::Binance,
        symbol: update.symbol.clone(),
        interval: k.interval.clone(),
        open: Px::new(num("o", &k.open)?),
        high: Px::new(num("h", &k.high)?),
        low: Px::new(num("l", &k.low)?),
        close: Px::new(num("c", &k.close)?),
        volume: Qty::new(num("v", &k.volume)?),
        venue_ts: k.open_time,
        confirmed: true,
    }))
}

fn normalize_execution_report(report: &ExecutionReport) -> Result<Order, TransportError> {
    let side = match report.side.as_str() {
        "BUY" => Side::Buy,
        "SELL" => Side::Sell,
        other => {
            return Err(TransportError::Protocol(format!(
                "unknown Binance side: {other}"
            )));
        }
    };
    let state = match report.order_status.as_str() {
        "NEW" => OrderState::Accepted,
        "PARTIALLY_FILLED" => OrderState::PartiallyFilled,
        "FILLED" => OrderState::Filled,
        "CANCELED" | "PENDING_CANCEL" => OrderState::Cancelled,
        "REJECTED" => OrderState::Rejected,
        "EXPIRED" | "EXPIRED_IN_MATCH" => OrderState::Expired,
        other => {
            return Err(TransportError::Protocol(format!(
                "unknown Binance order status: {other}"
            )));
        }
    };
    let order_type = match report.order_type.as_str() {
        "LIMIT" => OrderType::Limit,
        "MARKET" => OrderType::Market,
        "LIMIT_MAKER" => OrderType::PostOnly,
        other => {
            return Err(TransportError::Protocol(format!(
                "unknown Binance order type: {other}"
            )));
        }
    };
    let filled = num("z", &report.cum_filled_qty)?;
    let cum_quote = num_opt(&report.cum_quote_qty).unwrap_or(0.0);
    let avg_price = if filled > 0.0 { cum_quote / filled } else { 0.0 };
    // Cancels report their own client id in `c`; the original rides in `C`.
    let client_order_id = if report.orig_client_order_id.is_empty() {
        report.client_order_id.clone()
    } else {
        report.orig_client_order_id.clone()
    };
    Ok(Order {
        order_id: 0,
        exchange_order_id: Some(report.order_id.to_string()),
        client_order_id,
        venue: Venue::Binance,
        symbol: report.symbol.clone(),
        side,
        order_type,
        price: Px::new(num_opt(&report.price).unwrap_or(0.0)),
        qty: Qty::new(num("q", &report.quantity)?),
        filled_qty: Qty::new(filled),
        filled_price: Px::new(avg_price),
        fee: num_opt(&report.commission),
        state,
        venue_ts: report.event_time,
        price_text: report.price.clone(),
        qty_text: report.quantity.clone(),
    })
}

fn normalize_balance(
    event_time: u64,
    balance: &wire::AccountBalance,
) -> Result<AccountEvent, TransportError> {
    let free = num("f", &balance.free)?;
    let locked = num("l", &balance.locked)?;
    Ok(AccountEvent {
        venue: Venue::Binance,
        currency: balance.asset.clone(),
        balance: free + locked,
        available: free,
        frozen: locked,
        venue_ts: event_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints;

    fn market() -> BinanceMarketProtocol {
        BinanceMarketProtocol::new(endpoints::binance(false))
    }

    #[tokio::test]
    async fn endpoint_builds_combined_stream_url() {
        let mut p = market();
        let url = p
            .endpoint(&[
                Topic::new("ticker", "BTCUSDT"),
                Topic::new("depth20", "BTCUSDT"),
            ])
            .await
            .unwrap();
        assert_eq!(
            url,
            "wss://stream.binance.com:9443/stream?streams=btcusdt@ticker/btcusdt@depth20@100ms"
        );
    }

    #[test]
    fn ticker_frame_normalizes() {
        let mut p = market();
        let mut out = Vec::new();
        let text = r#"{"stream":"btcusdt@ticker","data":{"e":"24hrTicker","E":1700000000123,"s":"BTCUSDT","c":"50000.5","o":"49000","h":"51000","l":"48000","v":"12345","b":"50000","a":"50001"}}"#;
        let pulse = p.handle_text(text, &mut out).unwrap();
        assert_eq!(pulse, Pulse::Data);
        let Event::Ticker(t) = &out[0] else {
            panic!("expected ticker")
        };
        assert_eq!(t.symbol, "BTCUSDT");
        assert_eq!(t.last, Px::new(50_000.5));
        assert_eq!(t.bid, Some(Px::new(50_000.0)));
        assert_eq!(t.venue_ts, 1_700_000_000_123);
    }

    #[test]
    fn trade_side_comes_from_maker_flag() {
        let mut p = market();
        let mut out = Vec::new();
        let text = r#"{"stream":"btcusdt@trade","data":{"e":"trade","E":1700000000456,"s":"BTCUSDT","t":882345,"p":"50000","q":"0.25","m":true}}"#;
        p.handle_text(text, &mut out).unwrap();
        let Event::Trade(t) = &out[0] else {
            panic!("expected trade")
        };
        assert_eq!(t.side, Some(Side::Sell));
        assert_eq!(t.trade_id, "882345");
    }

    #[test]
    fn depth_frame_normalizes_and_guards_regressions() {
        let mut p = market();
        let mut out = Vec::new();
        let newer = r#"{"stream":"btcusdt@depth20@100ms","data":{"lastUpdateId":200,"bids":[["50000","1"],["49999","2"]],"asks":[["50001","1.5"]]}}"#;
        let older = r#"{"stream":"btcusdt@depth20@100ms","data":{"lastUpdateId":100,"bids":[["50000","1"]],"asks":[["50001","1"]]}}"#;
        p.handle_text(newer, &mut out).unwrap();
        p.handle_text(older, &mut out).unwrap();
        assert_eq!(out.len(), 1, "stale snapshot suppressed");
        let Event::OrderBook(b) = &out[0] else {
            panic!("expected book")
        };
        assert_eq!(b.symbol, "BTCUSDT");
        assert_eq!(b.channel, "depth20");
        assert_eq!(b.bids.len(), 2);
    }

    #[test]
    fn unconfirmed_kline_is_suppressed() {
        let mut p = market();
        let mut out = Vec::new();
        let open = r#"{"stream":"btcusdt@kline_1m","data":{"e":"kline","E":1700000000000,"s":"BTCUSDT","k":{"t":1699999940000,"i":"1m","o":"50000","h":"50100","l":"49900","c":"50050","v":"120","x":false}}}"#;
        p.handle_text(open, &mut out).unwrap();
        assert!(out.is_empty());

        let closed = r#"{"stream":"btcusdt@kline_1m","data":{"e":"kline","E":1700000000000,"s":"BTCUSDT","k":{"t":1699999940000,"i":"1m","o":"50000","h":"50100","l":"49900","c":"50050","v":"120","x":true}}}"#;
        p.handle_text(closed, &mut out).unwrap();
        let Event::Kline(k) = &out[0] else {
            panic!("expected kline")
        };
        assert_eq!(k.close, Px::new(50_050.0));
        assert_eq!(k.venue_ts, 1_699_999_940_000);
    }

    #[test]
    fn method_ack_is_control() {
        let mut p = market();
        let mut out = Vec::new();
        let pulse = p.handle_text(r#"{"result":null,"id":1}"#, &mut out).unwrap();
        assert_eq!(pulse, Pulse::Control);
    }

    #[test]
    fn execution_report_normalizes() {
        let text = r#"{"e":"executionReport","E":1700000001000,"s":"BTCUSDT","c":"cid-A","C":"","S":"BUY","o":"LIMIT","q":"0.01","p":"50000","X":"FILLED","i":8721,"z":"0.01","Z":"500.0","n":"0.00001"}"#;
        let report: ExecutionReport = serde_json::from_str(text).unwrap();
        let order = normalize_execution_report(&report).unwrap();
        assert_eq!(order.state, OrderState::Filled);
        assert_eq!(order.exchange_order_id.as_deref(), Some("8721"));
        assert_eq!(order.client_order_id, "cid-A");
        assert_eq!(order.filled_qty, Qty::new(0.01));
        assert_eq!(order.filled_price, Px::new(50_000.0));
        assert_eq!(order.price_text, "50000");
    }

    #[test]
    fn cancel_report_uses_original_client_id() {
        let text = r#"{"e":"executionReport","E":1700000002000,"s":"BTCUSDT","c":"cancel-1","C":"cid-A","S":"SELL","o":"LIMIT","q":"1.0","p":"2250","X":"CANCELED","i":8722,"z":"0.5","Z":"1125.0","n":""}"#;
        let report: ExecutionReport = serde_json::from_str(text).unwrap();
        let order = normalize_execution_report(&report).unwrap();
        assert_eq!(order.client_order_id, "cid-A");
        assert_eq!(order.state, OrderState::Cancelled);
        assert_eq!(order.filled_qty, Qty::new(0.5));
    }

    #[test]
    fn account_position_yields_balances() {
        let mut signer_protocol = BinanceUserProtocol::new(
            endpoints::binance(false),
            BinanceSigner::new(auth::BinanceCredentials::new("k", "s")),
        );
        let mut out = Vec::new();
        let text = r#"{"e":"outboundAccountPosition","E":1700000003000,"u":1700000003000,"B":[{"a":"USDT","f":"9500.0","l":"500.0"},{"a":"BTC","f":"0.5","l":"0"}]}"#;
        signer_protocol.handle_text(text, &mut out).unwrap();
        assert_eq!(out.len(), 2);
        let Event::Account(usdt) = &out[0] else {
            panic!("expected account")
        };
        assert_eq!(usdt.currency, "USDT");
        assert_eq!(usdt.balance, 10_000.0);
        assert_eq!(usdt.available, 9_500.0);
        assert_eq!(usdt.frozen, 500.0);
    }
}
