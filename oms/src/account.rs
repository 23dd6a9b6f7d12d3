//! Account manager: positions, PnL and balances aggregated from fills,
//! tickers and venue balance reports

use anyhow::Result;
use common::{
    Event, EventEnvelope, EventKind, Order, PositionEvent, Px, SourceId, Ts, Venue,
};
use engine::{Component, EngineHandle, EventHandler, HandlerId};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

const QTY_EPS: f64 = 1e-12;

/// One tracked position
#[derive(Debug, Clone, Default)]
pub struct Position {
    /// Signed quantity (+ long, - short)
    pub qty: f64,
    /// Average entry price; reset to zero whenever the position flattens
    pub avg_price: f64,
    /// PnL realized by closing fills
    pub realized_pnl: f64,
    /// Mark-to-market PnL against the last seen ticker
    pub unrealized_pnl: f64,
    last_price: Option<f64>,
}

impl Position {
    /// Apply one fill of `signed_qty` at `price`
    ///
    /// Same-side fills blend the average entry; opposite-side fills
    /// realize PnL on the closed quantity, and a flip re-opens at the
    /// fill price.
    pub fn apply_fill(&mut self, signed_qty: f64, price: f64) {
        if self.qty.abs() < QTY_EPS || self.qty.signum() == signed_qty.signum() {
            let new_qty = self.qty + signed_qty;
            self.avg_price = (self.avg_price * self.qty + price * signed_qty) / new_qty;
            self.qty = new_qty;
        } else {
            let close_qty = signed_qty.abs().min(self.qty.abs());
            self.realized_pnl += (price - self.avg_price) * close_qty * self.qty.signum();
            let new_qty = self.qty + signed_qty;
            if new_qty.abs() < QTY_EPS {
                self.qty = 0.0;
                self.avg_price = 0.0;
            } else if new_qty.signum() != self.qty.signum() {
                // Flipped through flat: the remainder opened at this fill.
                self.qty = new_qty;
                self.avg_price = price;
            } else {
                self.qty = new_qty;
            }
        }
        self.mark();
    }

    /// Update the mark price and recompute unrealized PnL
    pub fn on_price(&mut self, last: f64) {
        self.last_price = Some(last);
        self.mark();
    }

    fn mark(&mut self) {
        self.unrealized_pnl = match self.last_price {
            Some(last) if self.qty.abs() >= QTY_EPS => (last - self.avg_price) * self.qty,
            _ => 0.0,
        };
    }
}

/// Balance of one quote currency
#[derive(Debug, Clone, Copy, Default)]
pub struct Balance {
    /// Total balance
    pub balance: f64,
    /// Available for new orders
    pub available: f64,
    /// Frozen by open orders
    pub frozen: f64,
}

#[derive(Default)]
struct Books {
    positions: FxHashMap<(Venue, String), Position>,
    balances: FxHashMap<(Venue, String), Balance>,
    // Cumulative fill quantity and VWAP already accounted per order.
    applied: FxHashMap<u64, (f64, f64)>,
}

impl Books {
    fn position_snapshot(&self, venue: Venue, symbol: &str, ts: Ts) -> PositionEvent {
        let position = self
            .positions
            .get(&(venue, symbol.to_string()))
            .cloned()
            .unwrap_or_default();
        PositionEvent {
            venue,
            symbol: symbol.to_string(),
            qty: position.qty,
            avg_price: Px::new(position.avg_price),
            unrealized_pnl: position.unrealized_pnl,
            realized_pnl: position.realized_pnl,
            ts: ts.as_millis(),
        }
    }
}

struct AccountHandler {
    books: Arc<Mutex<Books>>,
    engine: EngineHandle,
}

impl AccountHandler {
    fn on_order(&self, order: &Order) -> Result<()> {
        // Only canonical orders carry a local id; raw venue reports are
        // the order manager's input, not ours.
        if order.order_id == 0 {
            return Ok(());
        }
        let snapshot = {
            let mut books = self.books.lock();
            let (prev_qty, prev_vwap) = books
                .applied
                .get(&order.order_id)
                .copied()
                .unwrap_or((0.0, 0.0));
            let new_qty = order.filled_qty.as_f64();
            let mut snapshot = None;
            if new_qty > prev_qty + QTY_EPS {
                let delta = new_qty - prev_qty;
                let vwap = order.filled_price.as_f64();
                let fill_price = (vwap * new_qty - prev_vwap * prev_qty) / delta;
                if !fill_price.is_finite() {
                    warn!(
                        order_id = order.order_id,
                        vwap, new_qty, "degenerate fill price; fill skipped"
                    );
                    return Ok(());
                }
                let key = (order.venue, order.symbol.clone());
                let position = books.positions.entry(key).or_default();
                position.apply_fill(delta * order.side.sign(), fill_price);
                debug!(
                    order_id = order.order_id,
                    symbol = %order.symbol,
                    delta,
                    fill_price,
                    qty = position.qty,
                    avg = position.avg_price,
                    realized = position.realized_pnl,
                    "fill accounted"
                );
                books.applied.insert(order.order_id, (new_qty, vwap));
                snapshot = Some(books.position_snapshot(order.venue, &order.symbol, Ts::now()));
            }
            if order.is_final() {
                books.applied.remove(&order.order_id);
            }
            snapshot
        };
        if let Some(snapshot) = snapshot {
            self.engine.put(SourceId::LOCAL, Event::Position(snapshot))?;
        }
        Ok(())
    }
}

impl EventHandler for AccountHandler {
    fn name(&self) -> &str {
        "account-manager"
    }

    fn handle(&self, envelope: &Arc<EventEnvelope>) -> Result<()> {
        match &envelope.event {
            Event::Order(order) => self.on_order(order),
            Event::Ticker(ticker) => {
                let mut books = self.books.lock();
                if let Some(position) = books
                    .positions
                    .get_mut(&(ticker.venue, ticker.symbol.clone()))
                {
                    position.on_price(ticker.last.as_f64());
                }
                Ok(())
            }
            Event::Account(account) => {
                let mut books = self.books.lock();
                books.balances.insert(
                    (account.venue, account.currency.clone()),
                    Balance {
                        balance: account.balance,
                        available: account.available,
                        frozen: account.frozen,
                    },
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Engine component owning the position and balance maps
///
/// All mutation happens on the dispatch thread; capability calls copy
/// entries under a short lock and return JSON snapshots.
pub struct AccountManager {
    books: Arc<Mutex<Books>>,
    registrations: Vec<HandlerId>,
    engine: Option<EngineHandle>,
}

impl AccountManager {
    /// Create an empty account manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            books: Arc::new(Mutex::new(Books::default())),
            registrations: Vec::new(),
            engine: None,
        }
    }

    /// Snapshot of one position by symbol
    #[must_use]
    pub fn position(&self, venue: Venue, symbol: &str) -> Option<Position> {
        self.books
            .lock()
            .positions
            .get(&(venue, symbol.to_string()))
            .cloned()
    }

    /// Snapshot of one balance by currency
    #[must_use]
    pub fn balance(&self, venue: Venue, currency: &str) -> Option<Balance> {
        self.books
            .lock()
            .balances
            .get(&(venue, currency.to_string()))
            .copied()
    }
}

impl Default for AccountManager {
    fn default() -> Self {
        Self::new()
    }
}

fn position_json(venue: Venue, symbol: &str, position: &Position) -> Value {
    json!({
        "venue": venue.as_str(),
        "symbol": symbol,
        "qty": position.qty,
        "avg_price": position.avg_price,
        "unrealized_pnl": position.unrealized_pnl,
        "realized_pnl": position.realized_pnl,
    })
}

impl Component for AccountManager {
    fn name(&self) -> &str {
        "account-manager"
    }

    fn start(&mut self, engine: EngineHandle) -> Result<()> {
        let handler = Arc::new(AccountHandler {
            books: Arc::clone(&self.books),
            engine: engine.clone(),
        });
        for kind in [EventKind::Order, EventKind::Ticker, EventKind::Account] {
            self.registrations.push(engine.register(kind, handler.clone()));
        }

        let books = Arc::clone(&self.books);
        engine.inject(
            "get_position",
            Arc::new(move |args| {
                let symbol = args
                    .get("symbol")
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow::anyhow!("get_position needs a symbol"))?;
                let books = books.lock();
                let entry = books
                    .positions
                    .iter()
                    .find(|((_, s), _)| s == symbol)
                    .map(|((venue, s), p)| position_json(*venue, s, p));
                Ok(entry.unwrap_or(Value::Null))
            }),
        );

        let books = Arc::clone(&self.books);
        engine.inject(
            "get_positions",
            Arc::new(move |_args| {
                let books = books.lock();
                let all: Vec<Value> = books
                    .positions
                    .iter()
                    .map(|((venue, s), p)| position_json(*venue, s, p))
                    .collect();
                Ok(Value::Array(all))
            }),
        );

        let books = Arc::clone(&self.books);
        engine.inject(
            "get_balance",
            Arc::new(move |args| {
                let currency = args.get("currency").and_then(Value::as_str);
                let books = books.lock();
                let all: Vec<Value> = books
                    .balances
                    .iter()
                    .filter(|((_, c), _)| currency.is_none_or(|want| want == c))
                    .map(|((venue, c), b)| {
                        json!({
                            "venue": venue.as_str(),
                            "currency": c,
                            "balance": b.balance,
                            "available": b.available,
                            "frozen": b.frozen,
                        })
                    })
                    .collect();
                Ok(Value::Array(all))
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

    #[test]
    fn same_side_fills_blend_average() {
        let mut p = Position::default();
        p.apply_fill(1.0, 100.0);
        p.apply_fill(1.0, 110.0);
        assert!((p.qty - 2.0).abs() < 1e-9);
        assert!((p.avg_price - 105.0).abs() < 1e-9);
        assert_eq!(p.realized_pnl, 0.0);
    }

    #[test]
    fn closing_fill_realizes_pnl() {
        let mut p = Position::default();
        p.apply_fill(1.0, 100.0);
        p.apply_fill(-0.5, 110.0);
        assert!((p.realized_pnl - 5.0).abs() < 1e-9);
        assert!((p.qty - 0.5).abs() < 1e-9);
        assert!((p.avg_price - 100.0).abs() < 1e-9, "partial close keeps avg");
    }

    #[test]
    fn flat_position_resets_average() {
        let mut p = Position::default();
        p.apply_fill(1.0, 100.0);
        p.apply_fill(-1.0, 110.0);
        assert_eq!(p.qty, 0.0);
        assert_eq!(p.avg_price, 0.0);
        assert!((p.realized_pnl - 10.0).abs() < 1e-9);

        // Next opening fill starts from the new price, not the stale avg.
        p.apply_fill(-2.0, 120.0);
        assert!((p.avg_price - 120.0).abs() < 1e-9);
    }

    #[test]
    fn reverse_and_flip_opens_at_fill_price() {
        // Existing +0.5 @ 40000, sell 0.8 @ 42000.
        let mut p = Position::default();
        p.apply_fill(0.5, 40_000.0);
        p.apply_fill(-0.8, 42_000.0);
        assert!((p.realized_pnl - 1_000.0).abs() < 1e-6);
        assert!((p.qty + 0.3).abs() < 1e-9);
        assert!((p.avg_price - 42_000.0).abs() < 1e-9);
    }

    #[test]
    fn short_side_accounting_mirrors_long() {
        let mut p = Position::default();
        p.apply_fill(-1.0, 100.0);
        p.apply_fill(-1.0, 90.0);
        assert!((p.avg_price - 95.0).abs() < 1e-9);
        // Buy back half below the average: profit.
        p.apply_fill(1.0, 80.0);
        assert!((p.realized_pnl - 15.0).abs() < 1e-9);
        assert!((p.qty + 1.0).abs() < 1e-9);
    }

    #[test]
    fn unrealized_tracks_last_price() {
        let mut p = Position::default();
        p.apply_fill(2.0, 100.0);
        p.on_price(103.0);
        assert!((p.unrealized_pnl - 6.0).abs() < 1e-9);
        p.on_price(99.0);
        assert!((p.unrealized_pnl + 2.0).abs() < 1e-9);
    }
}
