//! OKX v5 adapter: session protocol and payload normalization
//!
//! Market data lives on the public endpoint, candles on the business
//! endpoint, orders and balances on the private endpoint behind the
//! signed login challenge.

pub mod wire;

use crate::endpoints::OkxEndpoints;
use crate::session::{LoginOutcome, Pulse, Topic, VenueProtocol};
use async_trait::async_trait;
use auth::OkxSigner;
use common::{
    AccountEvent, BookLevel, Event, FundingRateEvent, KlineEvent, Order, OrderBookEvent,
    OrderState, OrderType, Px, Qty, Side, TickerEvent, TradeEvent, TransportError, Venue,
};
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;
use wire::{
    AccountData, BookData, FundingData, OrderData, TickerData, TradeData, WsFrame,
};

/// OKX error code for a rejected login timestamp
const CODE_INVALID_TIMESTAMP: &str = "60004";

/// Which OKX websocket this protocol instance speaks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OkxChannelKind {
    /// Tickers, trades, books, funding
    Public,
    /// Candles
    Business,
    /// Orders and account, requires login
    Private,
}

/// OKX protocol implementation for one websocket endpoint
pub struct OkxProtocol {
    kind: OkxChannelKind,
    endpoints: OkxEndpoints,
    signer: Option<OkxSigner>,
    // Last published book timestamp per symbol; regressions are dropped.
    last_book_ts: HashMap<String, u64>,
}

impl OkxProtocol {
    /// Public market-data protocol
    #[must_use]
    pub fn public(endpoints: OkxEndpoints) -> Self {
        Self {
            kind: OkxChannelKind::Public,
            endpoints,
            signer: None,
            last_book_ts: HashMap::new(),
        }
    }

    /// Business (candles) protocol
    #[must_use]
    pub fn business(endpoints: OkxEndpoints) -> Self {
        Self {
            kind: OkxChannelKind::Business,
            endpoints,
            signer: None,
            last_book_ts: HashMap::new(),
        }
    }

    /// Private protocol with a signed login
    #[must_use]
    pub fn private(endpoints: OkxEndpoints, signer: OkxSigner) -> Self {
        Self {
            kind: OkxChannelKind::Private,
            endpoints,
            signer: Some(signer),
            last_book_ts: HashMap::new(),
        }
    }

    fn subscription_args(topics: &[Topic]) -> Vec<serde_json::Value> {
        topics
            .iter()
            .map(|t| {
                if t.symbol.is_empty() {
                    // Account-wide channels subscribe without an instrument.
                    if t.channel == "orders" {
                        json!({ "channel": t.channel, "instType": "ANY" })
                    } else {
                        json!({ "channel": t.channel })
                    }
                } else {
                    json!({ "channel": t.channel, "instId": t.symbol })
                }
            })
            .collect()
    }

    fn normalize(
        &mut self,
        channel: &str,
        inst_id: Option<&str>,
        data: serde_json::Value,
        out: &mut Vec<Event>,
    ) -> Result<(), TransportError> {
        match channel {
            "tickers" => {
                for item in decode_items::<TickerData>(data)? {
                    out.push(Event::Ticker(normalize_ticker(&item)?));
                }
            }
            "trades" => {
                for item in decode_items::<TradeData>(data)? {
                    out.push(Event::Trade(normalize_trade(&item)?));
                }
            }
            c if c.starts_with("books") => {
                let symbol = inst_id.ok_or_else(|| {
                    TransportError::Protocol("book frame without instId".to_string())
                })?;
                for item in decode_items::<BookData>(data)? {
                    let book = normalize_book(symbol, c, &item)?;
                    let last = self.last_book_ts.entry(symbol.to_string()).or_insert(0);
                    if book.venue_ts < *last {
                        debug!(symbol, ts = book.venue_ts, "stale book snapshot dropped");
                        continue;
                    }
                    *last = book.venue_ts;
                    out.push(Event::OrderBook(book));
                }
            }
            c if c.starts_with("candle") => {
                let symbol = inst_id.ok_or_else(|| {
                    TransportError::Protocol("candle frame without instId".to_string())
                })?;
                let interval = c.trim_start_matches("candle");
                for item in decode_items::<Vec<String>>(data)? {
                    if let Some(kline) = normalize_candle(symbol, interval, &item)? {
                        out.push(Event::Kline(kline));
                    }
                }
            }
            "funding-rate" => {
                for item in decode_items::<FundingData>(data)? {
                    out.push(Event::Funding(normalize_funding(&item)?));
                }
            }
            "orders" => {
                for item in decode_items::<OrderData>(data)? {
                    out.push(Event::Order(normalize_order(&item)?));
                }
            }
            "account" => {
                for item in decode_items::<AccountData>(data)? {
                    for detail in &item.details {
                        out.push(Event::Account(normalize_balance(&item, detail)?));
                    }
                }
            }
            other => {
                return Err(TransportError::Protocol(format!(
                    "unknown OKX channel: {other}"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl VenueProtocol for OkxProtocol {
    fn venue(&self) -> Venue {
        Venue::Okx
    }

    async fn endpoint(&mut self, _topics: &[Topic]) -> anyhow::Result<String> {
        let url = match self.kind {
            OkxChannelKind::Public => self.endpoints.ws_public,
            OkxChannelKind::Business => self.endpoints.ws_business,
            OkxChannelKind::Private => self.endpoints.ws_private,
        };
        Ok(url.to_string())
    }

    fn login_request(&mut self) -> anyhow::Result<Option<String>> {
        let Some(signer) = &self.signer else {
            return Ok(None);
        };
        let args = signer.login_args()?;
        Ok(Some(json!({ "op": "login", "args": [args] }).to_string()))
    }

    fn check_login(&mut self, text: &str) -> LoginOutcome {
        let Ok(frame) = serde_json::from_str::<WsFrame>(text) else {
            return LoginOutcome::Pending;
        };
        let code = frame.code.as_deref().unwrap_or("");
        match frame.event.as_deref() {
            Some("login") if code == "0" => LoginOutcome::Success,
            Some("login" | "error") => {
                if code == CODE_INVALID_TIMESTAMP {
                    LoginOutcome::InvalidTimestamp
                } else {
                    LoginOutcome::Failed {
                        code: code.to_string(),
                        message: frame.msg.unwrap_or_default(),
                    }
                }
            }
            _ => LoginOutcome::Pending,
        }
    }

    async fn resync_clock(&mut self) -> anyhow::Result<()> {
        if let Some(signer) = &mut self.signer {
            signer.sync_clock(self.endpoints.api).await?;
        }
        Ok(())
    }

    fn subscribe_request(&mut self, topics: &[Topic]) -> anyhow::Result<Option<String>> {
        if topics.is_empty() {
            return Ok(None);
        }
        let args = Self::subscription_args(topics);
        Ok(Some(json!({ "op": "subscribe", "args": args }).to_string()))
    }

    fn unsubscribe_request(&mut self, topics: &[Topic]) -> anyhow::Result<Option<String>> {
        if topics.is_empty() {
            return Ok(None);
        }
        let args = Self::subscription_args(topics);
        Ok(Some(json!({ "op": "unsubscribe", "args": args }).to_string()))
    }

    fn ping_message(&self) -> Option<String> {
        Some("ping".to_string())
    }

    fn handle_text(&mut self, text: &str, out: &mut Vec<Event>) -> Result<Pulse, TransportError> {
        if text == "pong" {
            return Ok(Pulse::Heartbeat);
        }
        let frame: WsFrame = serde_json::from_str(text)
            .map_err(|e| TransportError::Protocol(format!("unparseable OKX frame: {e}")))?;

        if let Some(event) = frame.event.as_deref() {
            match event {
                "subscribe" | "unsubscribe" | "login" | "channel-conn-count" => {
                    return Ok(Pulse::Control);
                }
                "error" => {
                    let code = frame.code.unwrap_or_default();
                    // 60014: requests too frequent.
                    if code == "60014" {
                        return Err(TransportError::RateLimited {
                            retry_after_ms: 1_000,
                        });
                    }
                    return Err(TransportError::Protocol(format!(
                        "OKX error {}: {}",
                        code,
                        frame.msg.unwrap_or_default()
                    )));
                }
                _ => return Ok(Pulse::Ignored),
            }
        }

        let (Some(arg), Some(data)) = (frame.arg, frame.data) else {
            return Ok(Pulse::Ignored);
        };
        self.normalize(&arg.channel, arg.inst_id.as_deref(), data, out)?;
        Ok(Pulse::Data)
    }
}

fn decode_items<T: serde::de::DeserializeOwned>(
    data: serde_json::Value,
) -> Result<Vec<T>, TransportError> {
    serde_json::from_value(data)
        .map_err(|e| TransportError::Protocol(format!("bad OKX data payload: {e}")))
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

fn millis(field: &str, raw: &str) -> Result<u64, TransportError> {
    raw.parse::<u64>()
        .map_err(|_| TransportError::Protocol(format!("bad timestamp in {field}: {raw:?}")))
}

fn normalize_ticker(data: &TickerData) -> Result<TickerEvent, TransportError> {
    Ok(TickerEvent {
        venue: Venue::Okx,
        symbol: data.inst_id.clone(),
        last: Px::new(num("last", &data.last)?),
        bid: num_opt(&data.bid_px).map(Px::new),
        ask: num_opt(&data.ask_px).map(Px::new),
        high_24h: num_opt(&data.high_24h).map(Px::new),
        low_24h: num_opt(&data.low_24h).map(Px::new),
        open_24h: num_opt(&data.open_24h).map(Px::new),
        volume_24h: num_opt(&data.vol_24h).map(Qty::new),
        venue_ts: millis("ts", &data.ts)?,
    })
}

fn normalize_trade(data: &TradeData) -> Result<TradeEvent, TransportError> {
    Ok(TradeEvent {
        venue: Venue::Okx,
        symbol: data.inst_id.clone(),
        trade_id: data.trade_id.clone(),
        price: Px::new(num("px", &data.px)?),
        qty: Qty::new(num("sz", &data.sz)?),
        side: side_of(&data.side),
        venue_ts: millis("ts", &data.ts)?,
    })
}

fn normalize_book(symbol: &str, channel: &str, data: &BookData) -> Result<OrderBookEvent, TransportError> {
    let parse_side = |levels: &[Vec<String>]| -> Result<Vec<BookLevel>, TransportError> {
        levels
            .iter()
            .map(|level| {
                let price = level
                    .first()
                    .ok_or_else(|| TransportError::Protocol("empty book level".to_string()))?;
                let size = level
                    .get(1)
                    .ok_or_else(|| TransportError::Protocol("book level without size".to_string()))?;
                Ok(BookLevel::new(
                    Px::new(num("book price", price)?),
                    Qty::new(num("book size", size)?),
                ))
            })
            .collect()
    };
    let book = OrderBookEvent {
        venue: Venue::Okx,
        symbol: symbol.to_string(),
        channel: channel.to_string(),
        bids: parse_side(&data.bids)?,
        asks: parse_side(&data.asks)?,
        venue_ts: millis("ts", &data.ts)?,
    };
    if book.is_crossed() {
        return Err(TransportError::Protocol(format!(
            "crossed book for {symbol}"
        )));
    }
    Ok(book)
}

fn normalize_candle(
    symbol: &str,
    interval: &str,
    fields: &[String],
) -> Result<Option<KlineEvent>, TransportError> {
    if fields.len() < 6 {
        return Err(TransportError::Protocol(format!(
            "candle with {} fields",
            fields.len()
        )));
    }
    // Unconfirmed bars never reach the engine.
    let confirmed = fields.last().is_some_and(|c| c == "1");
    if !confirmed {
        return Ok(None);
    }
    Ok(Some(KlineEvent {
        venue: Venue::Okx,
        symbol: symbol.to_string(),
        interval: interval.to_string(),
        open: Px::new(num("open", &fields[1])?),
        high: Px::new(num("high", &fields[2])?),
        low: Px::new(num("low", &fields[3])?),
        close: Px::new(num("close", &fields[4])?),
        volume: Qty::new(num("volume", &fields[5])?),
        venue_ts: millis("ts", &fields[0])?,
        confirmed: true,
    }))
}

fn normalize_funding(data: &FundingData) -> Result<FundingRateEvent, TransportError> {
    Ok(FundingRateEvent {
        venue: Venue::Okx,
        symbol: data.inst_id.clone(),
        inst_type: data.inst_type.clone(),
        funding_rate: num("fundingRate", &data.funding_rate)?,
        next_funding_rate: num_opt(&data.next_funding_rate),
        funding_time: millis("fundingTime", &data.funding_time).unwrap_or(0),
        next_funding_time: if data.next_funding_time.is_empty() {
            None
        } else {
            Some(millis("nextFundingTime", &data.next_funding_time)?)
        },
        min_funding_rate: num_opt(&data.min_funding_rate),
        max_funding_rate: num_opt(&data.max_funding_rate),
        venue_ts: millis("ts", &data.ts)?,
    })
}

fn normalize_order(data: &OrderData) -> Result<Order, TransportError> {
    let side = side_of(&data.side)
        .ok_or_else(|| TransportError::Protocol(format!("bad order side: {}", data.side)))?;
    let state = match data.state.as_str() {
        "live" => OrderState::Accepted,
        "partially_filled" => OrderState::PartiallyFilled,
        "filled" => OrderState::Filled,
        "canceled" | "mmp_canceled" => OrderState::Cancelled,
        other => {
            return Err(TransportError::Protocol(format!(
                "unknown OKX order state: {other}"
            )));
        }
    };
    let order_type = match data.ord_type.as_str() {
        "limit" => OrderType::Limit,
        "market" => OrderType::Market,
        "post_only" => OrderType::PostOnly,
        "fok" => OrderType::Fok,
        "ioc" => OrderType::Ioc,
        other => {
            return Err(TransportError::Protocol(format!(
                "unknown OKX order type: {other}"
            )));
        }
    };
    Ok(Order {
        order_id: 0,
        exchange_order_id: Some(data.ord_id.clone()),
        client_order_id: data.cl_ord_id.clone(),
        venue: Venue::Okx,
        symbol: data.inst_id.clone(),
        side,
        order_type,
        price: Px::new(num_opt(&data.px).unwrap_or(0.0)),
        qty: Qty::new(num("sz", &data.sz)?),
        filled_qty: Qty::new(num_opt(&data.acc_fill_sz).unwrap_or(0.0)),
        filled_price: Px::new(num_opt(&data.avg_px).unwrap_or(0.0)),
        fee: num_opt(&data.fee),
        state,
        venue_ts: millis("uTime", &data.u_time)?,
        price_text: data.px.clone(),
        qty_text: data.sz.clone(),
    })
}

fn normalize_balance(
    data: &AccountData,
    detail: &wire::AccountDetail,
) -> Result<AccountEvent, TransportError> {
    let balance = num_opt(&detail.cash_bal).unwrap_or(0.0);
    let available = num_opt(&detail.avail_bal).unwrap_or(0.0);
    let frozen = num_opt(&detail.frozen_bal).unwrap_or(0.0);
    Ok(AccountEvent {
        venue: Venue::Okx,
        currency: detail.ccy.clone(),
        balance,
        available,
        frozen,
        venue_ts: millis("uTime", &data.u_time).unwrap_or(0),
    })
}

fn side_of(raw: &str) -> Option<Side> {
    match raw {
        "buy" => Some(Side::Buy),
        "sell" => Some(Side::Sell),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints;

    fn protocol() -> OkxProtocol {
        OkxProtocol::public(endpoints::okx(false))
    }

    #[test]
    fn ticker_frame_normalizes() {
        let mut p = protocol();
        let mut out = Vec::new();
        let text = r#"{"arg":{"channel":"tickers","instId":"BTC-USDT-SWAP"},"data":[{"instId":"BTC-USDT-SWAP","last":"50000.5","bidPx":"50000","askPx":"50001","high24h":"51000","low24h":"48000","open24h":"49000","vol24h":"12345","ts":"1700000000123"}]}"#;
        let pulse = p.handle_text(text, &mut out).unwrap();
        assert_eq!(pulse, Pulse::Data);
        assert_eq!(out.len(), 1);
        let Event::Ticker(t) = &out[0] else {
            panic!("expected ticker")
        };
        assert_eq!(t.symbol, "BTC-USDT-SWAP");
        assert_eq!(t.last, Px::new(50_000.5));
        assert_eq!(t.bid, Some(Px::new(50_000.0)));
        assert_eq!(t.ask, Some(Px::new(50_001.0)));
        assert_eq!(t.venue_ts, 1_700_000_000_123);
    }

    #[test]
    fn trade_frame_normalizes_side() {
        let mut p = protocol();
        let mut out = Vec::new();
        let text = r#"{"arg":{"channel":"trades","instId":"BTC-USDT-SWAP"},"data":[{"instId":"BTC-USDT-SWAP","tradeId":"882345","px":"50000","sz":"0.25","side":"sell","ts":"1700000000456"}]}"#;
        p.handle_text(text, &mut out).unwrap();
        let Event::Trade(t) = &out[0] else {
            panic!("expected trade")
        };
        assert_eq!(t.side, Some(Side::Sell));
        assert_eq!(t.qty, Qty::new(0.25));
    }

    #[test]
    fn book_frame_orders_and_truncates() {
        let mut p = protocol();
        let mut out = Vec::new();
        let text = r#"{"arg":{"channel":"books5","instId":"BTC-USDT-SWAP"},"data":[{"bids":[["50000","1","0","4"],["49999","2","0","1"]],"asks":[["50001","1.5","0","2"]],"ts":"1700000000789"}]}"#;
        p.handle_text(text, &mut out).unwrap();
        let Event::OrderBook(b) = &out[0] else {
            panic!("expected book")
        };
        assert_eq!(b.channel, "books5");
        assert_eq!(b.best_bid(), Some(Px::new(50_000.0)));
        assert_eq!(b.best_ask(), Some(Px::new(50_001.0)));
        assert!(!b.is_crossed());
    }

    #[test]
    fn stale_book_snapshot_is_dropped() {
        let mut p = protocol();
        let mut out = Vec::new();
        let newer = r#"{"arg":{"channel":"books5","instId":"X"},"data":[{"bids":[["100","1","0","1"]],"asks":[["101","1","0","1"]],"ts":"2000"}]}"#;
        let older = r#"{"arg":{"channel":"books5","instId":"X"},"data":[{"bids":[["100","1","0","1"]],"asks":[["101","1","0","1"]],"ts":"1000"}]}"#;
        p.handle_text(newer, &mut out).unwrap();
        p.handle_text(older, &mut out).unwrap();
        assert_eq!(out.len(), 1, "older snapshot suppressed");
    }

    #[test]
    fn crossed_book_is_rejected() {
        let mut p = protocol();
        let mut out = Vec::new();
        let text = r#"{"arg":{"channel":"books5","instId":"X"},"data":[{"bids":[["102","1","0","1"]],"asks":[["101","1","0","1"]],"ts":"1000"}]}"#;
        assert!(matches!(
            p.handle_text(text, &mut out),
            Err(TransportError::Protocol(_))
        ));
    }

    #[test]
    fn unconfirmed_candles_are_suppressed() {
        let mut p = OkxProtocol::business(endpoints::okx(false));
        let mut out = Vec::new();
        let unconfirmed = r#"{"arg":{"channel":"candle1m","instId":"BTC-USDT-SWAP"},"data":[["1700000000000","50000","50100","49900","50050","120","6000000","6000000","0"]]}"#;
        p.handle_text(unconfirmed, &mut out).unwrap();
        assert!(out.is_empty());

        let confirmed = r#"{"arg":{"channel":"candle1m","instId":"BTC-USDT-SWAP"},"data":[["1700000000000","50000","50100","49900","50050","120","6000000","6000000","1"]]}"#;
        p.handle_text(confirmed, &mut out).unwrap();
        let Event::Kline(k) = &out[0] else {
            panic!("expected kline")
        };
        assert!(k.confirmed);
        assert_eq!(k.interval, "1m");
        assert_eq!(k.close, Px::new(50_050.0));
    }

    #[test]
    fn funding_frame_normalizes() {
        let mut p = protocol();
        let mut out = Vec::new();
        let text = r#"{"arg":{"channel":"funding-rate","instId":"BTC-USDT-SWAP"},"data":[{"instType":"SWAP","instId":"BTC-USDT-SWAP","fundingRate":"0.0001","nextFundingRate":"0.00012","fundingTime":"1700000000000","nextFundingTime":"1700028800000","minFundingRate":"-0.0075","maxFundingRate":"0.0075","ts":"1699999990000"}]}"#;
        p.handle_text(text, &mut out).unwrap();
        let Event::Funding(f) = &out[0] else {
            panic!("expected funding")
        };
        assert_eq!(f.funding_rate, 0.0001);
        assert_eq!(f.next_funding_rate, Some(0.00012));
        assert_eq!(f.next_funding_time, Some(1_700_028_800_000));
    }

    #[test]
    fn order_report_preserves_decimal_strings() {
        let mut p = protocol();
        let mut out = Vec::new();
        let text = r#"{"arg":{"channel":"orders","instId":"BTC-USDT-SWAP"},"data":[{"instId":"BTC-USDT-SWAP","ordId":"12345","clOrdId":"cid-A","px":"50000","sz":"0.01","ordType":"limit","side":"buy","accFillSz":"0.01","avgPx":"50000","state":"filled","fee":"-0.02","uTime":"1700000001000"}]}"#;
        p.handle_text(text, &mut out).unwrap();
        let Event::Order(o) = &out[0] else {
            panic!("expected order")
        };
        assert_eq!(o.exchange_order_id.as_deref(), Some("12345"));
        assert_eq!(o.state, OrderState::Filled);
        assert_eq!(o.price_text, "50000");
        assert_eq!(o.qty_text, "0.01");
        assert_eq!(o.fee, Some(-0.02));
    }

    #[test]
    fn replaying_a_payload_yields_identical_events() {
        let text = r#"{"arg":{"channel":"tickers","instId":"BTC-USDT-SWAP"},"data":[{"instId":"BTC-USDT-SWAP","last":"50000.5","bidPx":"50000","askPx":"50001","ts":"1700000000123"}]}"#;
        let mut p1 = protocol();
        let mut p2 = protocol();
        let (mut a, mut b) = (Vec::new(), Vec::new());
        p1.handle_text(text, &mut a).unwrap();
        p2.handle_text(text, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn pong_is_a_heartbeat() {
        let mut p = protocol();
        let mut out = Vec::new();
        assert_eq!(p.handle_text("pong", &mut out).unwrap(), Pulse::Heartbeat);
    }

    #[test]
    fn login_outcomes() {
        let mut p = protocol();
        assert!(matches!(
            p.check_login(r#"{"event":"login","code":"0","msg":""}"#),
            LoginOutcome::Success
        ));
        assert!(matches!(
            p.check_login(r#"{"event":"error","code":"60004","msg":"Invalid timestamp"}"#),
            LoginOutcome::InvalidTimestamp
        ));
        match p.check_login(r#"{"event":"error","code":"60009","msg":"Login failed."}"#) {
            LoginOutcome::Failed { code, .. } => assert_eq!(code, "60009"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn subscribe_request_covers_every_topic_once() {
        let mut p = protocol();
        let request = p
            .subscribe_request(&[
                Topic::new("tickers", "BTC-USDT-SWAP"),
                Topic::new("books5", "BTC-USDT-SWAP"),
            ])
            .unwrap()
            .unwrap();
        let v: serde_json::Value = serde_json::from_str(&request).unwrap();
        assert_eq!(v["op"], "subscribe");
        assert_eq!(v["args"].as_array().unwrap().len(), 2);
        assert_eq!(v["args"][0]["channel"], "tickers");
        assert_eq!(v["args"][0]["instId"], "BTC-USDT-SWAP");
    }

    #[test]
    fn account_channel_subscribes_without_instrument() {
        let mut p = protocol();
        let request = p
            .subscribe_request(&[Topic::new("orders", ""), Topic::new("account", "")])
            .unwrap()
            .unwrap();
        let v: serde_json::Value = serde_json::from_str(&request).unwrap();
        assert_eq!(v["args"][0]["channel"], "orders");
        assert_eq!(v["args"][0]["instType"], "ANY");
        assert_eq!(v["args"][1]["channel"], "account");
        assert!(v["args"][1].get("instId").is_none());
    }
}
