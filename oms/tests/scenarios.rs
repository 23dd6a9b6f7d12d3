//! End-to-end order and position scenarios over a running engine

use common::{
    CommandEvent, Event, EventEnvelope, Order, OrderState, OrderType, Px, Qty, Side, SourceId,
    TimeInForce, Venue,
};
use crossbeam::channel::{Receiver, Sender, unbounded};
use engine::{Engine, EngineConfig, EventHandler};
use oms::{AccountManager, OrderManager};
use oms::transport::NullTransport;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const SESSION: SourceId = SourceId(5);

struct Tap {
    tx: Sender<Arc<EventEnvelope>>,
}

impl EventHandler for Tap {
    fn name(&self) -> &str {
        "tap"
    }

    fn handle(&self, envelope: &Arc<EventEnvelope>) -> anyhow::Result<()> {
        self.tx.send(Arc::clone(envelope)).ok();
        Ok(())
    }
}

struct Rig {
    engine: Engine,
    rx: Receiver<Arc<EventEnvelope>>,
}

impl Rig {
    fn new() -> Self {
        let engine = Engine::new(EngineConfig::default());
        let (tx, rx) = unbounded();
        engine.handle().register_global(Arc::new(Tap { tx }), None);
        engine
            .attach(Box::new(OrderManager::new(Arc::new(NullTransport))))
            .unwrap();
        engine.attach(Box::new(AccountManager::new())).unwrap();
        Self { engine, rx }
    }

    fn place(&self, symbol: &str, side: Side, price: f64, qty: f64, cid: &str) {
        self.engine
            .handle()
            .put(
                SourceId::new(99),
                Event::Command(CommandEvent::PlaceOrder {
                    venue: Venue::Okx,
                    symbol: symbol.to_string(),
                    side,
                    order_type: OrderType::Limit,
                    price: Some(Px::new(price)),
                    qty: Qty::new(qty),
                    client_order_id: cid.to_string(),
                    tif: TimeInForce::Gtc,
                }),
            )
            .unwrap();
    }

    fn venue_report(
        &self,
        cid: &str,
        symbol: &str,
        side: Side,
        state: OrderState,
        filled: f64,
        fill_px: f64,
        ts: u64,
    ) {
        self.engine
            .handle()
            .put(
                SESSION,
                Event::Order(Order {
                    order_id: 0,
                    exchange_order_id: Some("12345".to_string()),
                    client_order_id: cid.to_string(),
                    venue: Venue::Okx,
                    symbol: symbol.to_string(),
                    side,
                    order_type: OrderType::Limit,
                    price: Px::new(0.0),
                    qty: Qty::new(0.0),
                    filled_qty: Qty::new(filled),
                    filled_price: Px::new(fill_px),
                    fee: None,
                    state,
                    venue_ts: ts,
                    price_text: String::new(),
                    qty_text: String::new(),
                }),
            )
            .unwrap();
    }

    /// Wait for the next canonical order transition for `cid`
    fn next_transition(&self, cid: &str) -> Order {
        let deadline = Duration::from_secs(2);
        loop {
            let envelope = self.rx.recv_timeout(deadline).expect("event before timeout");
            if let Event::Order(order) = &envelope.event {
                if order.order_id != 0 && order.client_order_id == cid {
                    return order.clone();
                }
            }
        }
    }

    fn position(&self, symbol: &str) -> serde_json::Value {
        self.engine
            .handle()
            .call("get_position", json!({ "symbol": symbol }))
            .unwrap()
    }

    /// Wait until the position events for `symbol` have settled on `qty`
    fn wait_for_position_qty(&self, symbol: &str, qty: f64) {
        let deadline = Duration::from_secs(2);
        loop {
            let envelope = self.rx.recv_timeout(deadline).expect("position before timeout");
            if let Event::Position(p) = &envelope.event {
                if p.symbol == symbol && (p.qty - qty).abs() < 1e-9 {
                    return;
                }
            }
        }
    }
}

#[test]
fn limit_buy_fully_filled() {
    let rig = Rig::new();
    rig.place("BTC-USDT-SWAP", Side::Buy, 50_000.0, 0.01, "cid-A");

    let submitted = rig.next_transition("cid-A");
    assert_eq!(submitted.state, OrderState::Submitted);

    rig.venue_report(
        "cid-A",
        "BTC-USDT-SWAP",
        Side::Buy,
        OrderState::Accepted,
        0.0,
        0.0,
        1_000,
    );
    let accepted = rig.next_transition("cid-A");
    assert_eq!(accepted.state, OrderState::Accepted);
    assert_eq!(accepted.exchange_order_id.as_deref(), Some("12345"));

    rig.venue_report(
        "cid-A",
        "BTC-USDT-SWAP",
        Side::Buy,
        OrderState::Filled,
        0.01,
        50_000.0,
        2_000,
    );
    let filled = rig.next_transition("cid-A");
    assert_eq!(filled.state, OrderState::Filled);
    assert_eq!(filled.filled_qty, Qty::new(0.01));
    assert_eq!(filled.filled_price, Px::new(50_000.0));

    rig.wait_for_position_qty("BTC-USDT-SWAP", 0.01);
    let position = rig.position("BTC-USDT-SWAP");
    assert_eq!(position["qty"], json!(0.01));
    assert_eq!(position["avg_price"], json!(50_000.0));
}

#[test]
fn partial_fill_then_cancel() {
    let rig = Rig::new();

    // Seed a long of 1.0 @ 2200 so the closing sell realizes PnL.
    rig.place("ETH-USDT", Side::Buy, 2_200.0, 1.0, "seed");
    rig.next_transition("seed");
    rig.venue_report("seed", "ETH-USDT", Side::Buy, OrderState::Filled, 1.0, 2_200.0, 10);
    rig.wait_for_position_qty("ETH-USDT", 1.0);

    rig.place("ETH-USDT", Side::Sell, 2_250.0, 1.0, "cid-B");
    let submitted = rig.next_transition("cid-B");
    assert_eq!(submitted.state, OrderState::Submitted);

    rig.venue_report(
        "cid-B",
        "ETH-USDT",
        Side::Sell,
        OrderState::PartiallyFilled,
        0.5,
        2_250.0,
        20,
    );
    // The ack was still in flight: the engine must show ACCEPTED first.
    let accepted = rig.next_transition("cid-B");
    assert_eq!(accepted.state, OrderState::Accepted);
    let partial = rig.next_transition("cid-B");
    assert_eq!(partial.state, OrderState::PartiallyFilled);
    assert_eq!(partial.filled_qty, Qty::new(0.5));

    rig.venue_report(
        "cid-B",
        "ETH-USDT",
        Side::Sell,
        OrderState::Cancelled,
        0.5,
        2_250.0,
        30,
    );
    let cancelled = rig.next_transition("cid-B");
    assert_eq!(cancelled.state, OrderState::Cancelled);
    assert_eq!(cancelled.filled_qty, Qty::new(0.5));

    rig.wait_for_position_qty("ETH-USDT", 0.5);
    let position = rig.position("ETH-USDT");
    assert_eq!(position["qty"], json!(0.5));
    assert_eq!(position["avg_price"], json!(2_200.0));
    assert_eq!(position["realized_pnl"], json!(25.0));
}

#[test]
fn reverse_and_flip() {
    let rig = Rig::new();

    rig.place("BTC-USDT-SWAP", Side::Buy, 40_000.0, 0.5, "open");
    rig.next_transition("open");
    rig.venue_report(
        "open",
        "BTC-USDT-SWAP",
        Side::Buy,
        OrderState::Filled,
        0.5,
        40_000.0,
        10,
    );
    rig.wait_for_position_qty("BTC-USDT-SWAP", 0.5);

    rig.place("BTC-USDT-SWAP", Side::Sell, 42_000.0, 0.8, "flip");
    rig.next_transition("flip");
    rig.venue_report(
        "flip",
        "BTC-USDT-SWAP",
        Side::Sell,
        OrderState::Filled,
        0.8,
        42_000.0,
        20,
    );
    rig.wait_for_position_qty("BTC-USDT-SWAP", -0.3);

    let position = rig.position("BTC-USDT-SWAP");
    assert_eq!(position["realized_pnl"], json!(1_000.0));
    assert_eq!(position["avg_price"], json!(42_000.0));
    let qty = position["qty"].as_f64().unwrap();
    assert!((qty + 0.3).abs() < 1e-9);
}

#[test]
fn active_orders_capability_tracks_lifecycle() {
    let rig = Rig::new();
    rig.place("BTC-USDT-SWAP", Side::Buy, 50_000.0, 0.01, "cid-C");
    rig.next_transition("cid-C");

    let active = rig
        .engine
        .handle()
        .call("get_active_orders", json!({}))
        .unwrap();
    assert_eq!(active.as_array().unwrap().len(), 1);

    rig.venue_report(
        "cid-C",
        "BTC-USDT-SWAP",
        Side::Buy,
        OrderState::Filled,
        0.01,
        50_000.0,
        5,
    );
    rig.next_transition("cid-C");
    rig.next_transition("cid-C");

    let active = rig
        .engine
        .handle()
        .call("get_active_orders", json!({}))
        .unwrap();
    assert!(active.as_array().unwrap().is_empty());
}
