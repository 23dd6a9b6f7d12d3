//! Pure order lifecycle transitions
//!
//! Venue execution reports are merged into the canonical order here;
//! the surrounding manager decides what to do with the outcome. Rules:
//! out-of-order venue timestamps are dropped, `filled_qty` never
//! decreases, a full fill forces `Filled` regardless of the reported
//! state, and terminal states are absorbing.

use common::{Order, OrderState, Qty};

const QTY_EPS: f64 = 1e-12;

/// Result of merging one venue report into an order
#[derive(Debug)]
pub enum ReportOutcome {
    /// The report advanced the order; the listed snapshots are emitted
    /// in sequence (an implied `Accepted` may precede a fill)
    Applied(Vec<Order>),
    /// Older than what the order already saw; dropped silently
    DroppedStale,
    /// Contradicts the lifecycle model; dropped with the reason
    DroppedViolation(String),
}

/// Merge a venue execution report into `order`
///
/// `report` carries venue-mapped fields: state, cumulative fill
/// quantity, fill VWAP, fee and the venue update timestamp. The
/// canonical identity fields of `order` (local id, symbol, side) are
/// never touched by the report.
pub fn apply_report(order: &mut Order, report: &Order) -> ReportOutcome {
    if report.venue_ts < order.venue_ts {
        return ReportOutcome::DroppedStale;
    }

    if order.state.is_final() {
        return ReportOutcome::DroppedViolation(format!(
            "update in terminal state {}",
            order.state
        ));
    }

    let prev_filled = order.filled_qty.as_f64();
    let new_filled = report.filled_qty.as_f64();
    if new_filled < prev_filled - QTY_EPS {
        return ReportOutcome::DroppedViolation(format!(
            "filled quantity decreased: {prev_filled} -> {new_filled}"
        ));
    }

    let mut target = report.state;
    // A complete fill wins over whatever state the venue reported.
    if new_filled >= order.qty.as_f64() - QTY_EPS && new_filled > 0.0 {
        target = OrderState::Filled;
    }

    let fill_progressed = new_filled > prev_filled + QTY_EPS;
    let mut emitted = Vec::new();

    // Fills must never be observed before the ack.
    if order.state == OrderState::Submitted
        && fill_progressed
        && matches!(target, OrderState::PartiallyFilled | OrderState::Filled)
    {
        order.state = OrderState::Accepted;
        order.venue_ts = report.venue_ts;
        if order.exchange_order_id.is_none() {
            order.exchange_order_id = report.exchange_order_id.clone();
        }
        emitted.push(order.clone());
    }

    let same_state_refill = target == order.state && fill_progressed;
    if target != order.state && !order.state.can_transition_to(target) {
        return ReportOutcome::DroppedViolation(format!(
            "illegal transition {} -> {target}",
            order.state
        ));
    }
    if target == order.state && !same_state_refill && emitted.is_empty() {
        // Duplicate report carrying nothing new.
        return ReportOutcome::DroppedStale;
    }

    if order.exchange_order_id.is_none() {
        order.exchange_order_id = report.exchange_order_id.clone();
    }
    order.state = target;
    order.filled_qty = Qty::new(new_filled);
    if new_filled > 0.0 {
        order.filled_price = report.filled_price;
    }
    if report.fee.is_some() {
        order.fee = report.fee;
    }
    order.venue_ts = report.venue_ts;
    emitted.push(order.clone());
    ReportOutcome::Applied(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderType, Px, Side, Venue};

    fn order(state: OrderState, filled: f64, ts: u64) -> Order {
        Order {
            order_id: 1,
            exchange_order_id: None,
            client_order_id: "cid".to_string(),
            venue: Venue::Okx,
            symbol: "BTC-USDT-SWAP".to_string(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Px::new(50_000.0),
            qty: Qty::new(0.01),
            filled_qty: Qty::new(filled),
            filled_price: Px::new(if filled > 0.0 { 50_000.0 } else { 0.0 }),
            fee: None,
            state,
            venue_ts: ts,
            price_text: "50000".to_string(),
            qty_text: "0.01".to_string(),
        }
    }

    fn report(state: OrderState, filled: f64, ts: u64) -> Order {
        let mut r = order(state, filled, ts);
        r.exchange_order_id = Some("12345".to_string());
        r
    }

    #[test]
    fn ack_applies() {
        let mut o = order(OrderState::Submitted, 0.0, 1);
        let outcome = apply_report(&mut o, &report(OrderState::Accepted, 0.0, 2));
        assert!(matches!(outcome, ReportOutcome::Applied(v) if v.len() == 1));
        assert_eq!(o.state, OrderState::Accepted);
        assert_eq!(o.exchange_order_id.as_deref(), Some("12345"));
    }

    #[test]
    fn stale_timestamp_is_dropped() {
        let mut o = order(OrderState::Accepted, 0.0, 10);
        let outcome = apply_report(&mut o, &report(OrderState::Cancelled, 0.0, 5));
        assert!(matches!(outcome, ReportOutcome::DroppedStale));
        assert_eq!(o.state, OrderState::Accepted);
    }

    #[test]
    fn shrinking_fill_is_a_violation() {
        let mut o = order(OrderState::PartiallyFilled, 0.005, 10);
        let outcome = apply_report(&mut o, &report(OrderState::PartiallyFilled, 0.004, 11));
        assert!(matches!(outcome, ReportOutcome::DroppedViolation(_)));
        assert_eq!(o.filled_qty, Qty::new(0.005));
    }

    #[test]
    fn full_fill_forces_filled_state() {
        let mut o = order(OrderState::Accepted, 0.0, 1);
        // Venue still says partially_filled but the size is complete.
        let outcome = apply_report(&mut o, &report(OrderState::PartiallyFilled, 0.01, 2));
        match outcome {
            ReportOutcome::Applied(v) => assert_eq!(v.last().unwrap().state, OrderState::Filled),
            other => panic!("expected Applied, got {other:?}"),
        }
        assert_eq!(o.state, OrderState::Filled);
    }

    #[test]
    fn fill_while_submitted_emits_accepted_first() {
        let mut o = order(OrderState::Submitted, 0.0, 1);
        let outcome = apply_report(&mut o, &report(OrderState::PartiallyFilled, 0.005, 2));
        match outcome {
            ReportOutcome::Applied(v) => {
                assert_eq!(v.len(), 2);
                assert_eq!(v[0].state, OrderState::Accepted);
                assert_eq!(v[1].state, OrderState::PartiallyFilled);
            }
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[test]
    fn terminal_states_reject_updates() {
        let mut o = order(OrderState::Filled, 0.01, 10);
        let outcome = apply_report(&mut o, &report(OrderState::Cancelled, 0.01, 11));
        assert!(matches!(outcome, ReportOutcome::DroppedViolation(_)));
    }

    #[test]
    fn duplicate_report_is_stale() {
        let mut o = order(OrderState::Accepted, 0.0, 5);
        let outcome = apply_report(&mut o, &report(OrderState::Accepted, 0.0, 6));
        assert!(matches!(outcome, ReportOutcome::DroppedStale));
    }
}
