//! Order manager: canonical order ownership and command handling

use crate::lifecycle::{ReportOutcome, apply_report};
use crate::transport::OrderTransport;
use anyhow::Result;
use common::{
    CommandEvent, Event, EventEnvelope, EventKind, Order, OrderState, Px, Qty, SourceId,
};
use engine::{Component, EngineHandle, EventHandler, HandlerId};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Default)]
struct Inner {
    next_order_id: u64,
    orders: FxHashMap<u64, Order>,
    by_client_id: FxHashMap<String, u64>,
    by_exchange_id: FxHashMap<String, u64>,
}

impl Inner {
    fn index_of(&self, report: &Order) -> Option<u64> {
        if let Some(id) = report
            .exchange_order_id
            .as_ref()
            .and_then(|eid| self.by_exchange_id.get(eid))
        {
            return Some(*id);
        }
        self.by_client_id.get(&report.client_order_id).copied()
    }

    fn remove(&mut self, order: &Order) {
        self.orders.remove(&order.order_id);
        self.by_client_id.remove(&order.client_order_id);
        if let Some(eid) = &order.exchange_order_id {
            self.by_exchange_id.remove(eid);
        }
    }
}

struct OrderHandler {
    inner: Arc<Mutex<Inner>>,
    transport: Arc<dyn OrderTransport>,
    engine: EngineHandle,
}

impl OrderHandler {
    fn on_command(&self, command: &CommandEvent) -> Result<()> {
        match command {
            CommandEvent::PlaceOrder {
                venue,
                symbol,
                side,
                order_type,
                price,
                qty,
                client_order_id,
                tif: _,
            } => {
                let order = {
                    let mut inner = self.inner.lock();
                    inner.next_order_id += 1;
                    let order = Order {
                        order_id: inner.next_order_id,
                        exchange_order_id: None,
                        client_order_id: client_order_id.clone(),
                        venue: *venue,
                        symbol: symbol.clone(),
                        side: *side,
                        order_type: *order_type,
                        price: price.unwrap_or(Px::new(0.0)),
                        qty: *qty,
                        filled_qty: Qty::new(0.0),
                        filled_price: Px::new(0.0),
                        fee: None,
                        state: OrderState::Submitted,
                        venue_ts: 0,
                        price_text: price.map(|p| p.as_f64().to_string()).unwrap_or_default(),
                        qty_text: qty.as_f64().to_string(),
                    };
                    inner.orders.insert(order.order_id, order.clone());
                    inner
                        .by_client_id
                        .insert(order.client_order_id.clone(), order.order_id);
                    order
                };
                info!(
                    order_id = order.order_id,
                    symbol = %order.symbol,
                    side = %order.side,
                    "order submitted"
                );
                self.engine
                    .put(SourceId::LOCAL, Event::Order(order.clone()))?;

                if let Err(e) = self.transport.place(&order) {
                    warn!(order_id = order.order_id, error = %e, "order transport rejected submission");
                    let rejected = {
                        let mut inner = self.inner.lock();
                        let mut rejected = order;
                        rejected.state = OrderState::Rejected;
                        inner.remove(&rejected);
                        rejected
                    };
                    self.engine.put(SourceId::LOCAL, Event::Order(rejected))?;
                }
                Ok(())
            }
            CommandEvent::CancelOrder {
                venue,
                symbol,
                order_id,
            } => {
                let order = self.inner.lock().orders.get(order_id).cloned();
                match order {
                    Some(order) if order.is_active() => {
                        self.transport.cancel(*venue, symbol, &order)?;
                    }
                    Some(_) | None => {
                        debug!(order_id, "cancel for unknown or finished order ignored");
                    }
                }
                Ok(())
            }
            CommandEvent::Subscribe { .. } | CommandEvent::Unsubscribe { .. } => Ok(()),
        }
    }

    fn on_report(&self, report: &Order) -> Result<()> {
        let transitions = {
            let mut inner = self.inner.lock();
            let Some(order_id) = inner.index_of(report) else {
                debug!(
                    client_order_id = %report.client_order_id,
                    exchange_order_id = report.exchange_order_id.as_deref().unwrap_or(""),
                    "execution report for unknown order dropped"
                );
                return Ok(());
            };
            let mut order = inner.orders.get(&order_id).cloned().expect("indexed order");
            match apply_report(&mut order, report) {
                ReportOutcome::Applied(transitions) => {
                    if let Some(eid) = &order.exchange_order_id {
                        inner.by_exchange_id.insert(eid.clone(), order_id);
                    }
                    if order.is_final() {
                        inner.remove(&order);
                    } else {
                        inner.orders.insert(order_id, order);
                    }
                    transitions
                }
                ReportOutcome::DroppedStale => {
                    debug!(order_id, venue_ts = report.venue_ts, "stale report dropped");
                    return Ok(());
                }
                ReportOutcome::DroppedViolation(reason) => {
                    warn!(
                        order_id,
                        state = %order.state,
                        filled = order.filled_qty.as_f64(),
                        report_state = %report.state,
                        report_filled = report.filled_qty.as_f64(),
                        reason = %reason,
                        "report contradicts order state machine; dropped"
                    );
                    return Ok(());
                }
            }
        };
        for transition in transitions {
            self.engine.put(SourceId::LOCAL, Event::Order(transition))?;
        }
        Ok(())
    }
}

impl EventHandler for OrderHandler {
    fn name(&self) -> &str {
        "order-manager"
    }

    fn handle(&self, envelope: &Arc<EventEnvelope>) -> Result<()> {
        match &envelope.event {
            Event::Command(command) => self.on_command(command),
            // Canonical orders are re-emitted with a LOCAL source; only
            // venue-side reports feed the state machine.
            Event::Order(report) if envelope.source != SourceId::LOCAL => self.on_report(report),
            _ => Ok(()),
        }
    }
}

/// Engine component owning the active-order map
pub struct OrderManager {
    transport: Arc<dyn OrderTransport>,
    inner: Arc<Mutex<Inner>>,
    registrations: Vec<HandlerId>,
    engine: Option<EngineHandle>,
}

impl OrderManager {
    /// Create an order manager delivering through `transport`
    #[must_use]
    pub fn new(transport: Arc<dyn OrderTransport>) -> Self {
        Self {
            transport,
            inner: Arc::new(Mutex::new(Inner::default())),
            registrations: Vec::new(),
            engine: None,
        }
    }

    /// Snapshot of all active orders
    #[must_use]
    pub fn active_orders(&self) -> Vec<Order> {
        self.inner.lock().orders.values().cloned().collect()
    }
}

impl Component for OrderManager {
    fn name(&self) -> &str {
        "order-manager"
    }

    fn start(&mut self, engine: EngineHandle) -> Result<()> {
        let handler = Arc::new(OrderHandler {
            inner: Arc::clone(&self.inner),
            transport: Arc::clone(&self.transport),
            engine: engine.clone(),
        });
        self.registrations
            .push(engine.register(EventKind::Command, handler.clone()));
        self.registrations
            .push(engine.register(EventKind::Order, handler));

        let inner = Arc::clone(&self.inner);
        engine.inject(
            "get_active_orders",
            Arc::new(move |_args| {
                let orders: Vec<Order> = inner.lock().orders.values().cloned().collect();
                Ok(serde_json::to_value(orders)?)
            }),
        );
        self.engine = Some(engine);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(engine) = self.engine.take() {
            for id in self.registrations.drain(..) {
                engine.detach(id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockOrderTransport;
    use common::{OrderType, Side, TimeInForce, Venue};
    use engine::{Engine, EngineConfig};

    fn place_command() -> CommandEvent {
        CommandEvent::PlaceOrder {
            venue: Venue::Okx,
            symbol: "BTC-USDT-SWAP".to_string(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Some(Px::new(50_000.0)),
            qty: Qty::new(0.01),
            client_order_id: "cid-A".to_string(),
            tif: TimeInForce::Gtc,
        }
    }

    fn handler(transport: MockOrderTransport) -> (Engine, OrderHandler) {
        let eng = Engine::new(EngineConfig::default());
        let handle = eng.handle();
        (
            eng,
            OrderHandler {
                inner: Arc::new(Mutex::new(Inner::default())),
                transport: Arc::new(transport),
                engine: handle,
            },
        )
    }

    #[test]
    fn place_creates_submitted_order_and_calls_transport() {
        let mut transport = MockOrderTransport::new();
        transport.expect_place().times(1).returning(|_| Ok(()));
        let (_eng, h) = handler(transport);

        h.on_command(&place_command()).unwrap();

        let inner = h.inner.lock();
        assert_eq!(inner.orders.len(), 1);
        let order = inner.orders.values().next().unwrap();
        assert_eq!(order.state, OrderState::Submitted);
        assert_eq!(order.client_order_id, "cid-A");
        assert_eq!(inner.by_client_id.get("cid-A"), Some(&order.order_id));
    }

    #[test]
    fn transport_failure_rejects_the_order() {
        let mut transport = MockOrderTransport::new();
        transport
            .expect_place()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        let (_eng, h) = handler(transport);

        h.on_command(&place_command()).unwrap();
        assert!(h.inner.lock().orders.is_empty());
    }

    #[test]
    fn report_matches_by_client_id_then_exchange_id() {
        let mut transport = MockOrderTransport::new();
        transport.expect_place().returning(|_| Ok(()));
        let (_eng, h) = handler(transport);
        h.on_command(&place_command()).unwrap();

        let mut report = h.inner.lock().orders.values().next().unwrap().clone();
        report.exchange_order_id = Some("12345".to_string());
        report.state = OrderState::Accepted;
        report.venue_ts = 10;
        h.on_report(&report).unwrap();

        let inner = h.inner.lock();
        let order = inner.orders.values().next().unwrap();
        assert_eq!(order.state, OrderState::Accepted);
        assert_eq!(inner.by_exchange_id.get("12345"), Some(&order.order_id));
    }

    #[test]
    fn final_report_removes_from_active_set() {
        let mut transport = MockOrderTransport::new();
        transport.expect_place().returning(|_| Ok(()));
        let (_eng, h) = handler(transport);
        h.on_command(&place_command()).unwrap();

        let mut report = h.inner.lock().orders.values().next().unwrap().clone();
        report.exchange_order_id = Some("12345".to_string());
        report.state = OrderState::Filled;
        report.filled_qty = Qty::new(0.01);
        report.filled_price = Px::new(50_000.0);
        report.venue_ts = 20;
        h.on_report(&report).unwrap();

        assert!(h.inner.lock().orders.is_empty());
    }
}
