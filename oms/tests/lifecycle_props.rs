//! Property tests over the order lifecycle state machine

use common::{Order, OrderState, OrderType, Px, Qty, Side, Venue};
use oms::{ReportOutcome, apply_report};
use proptest::prelude::*;

fn fresh_order() -> Order {
    Order {
        order_id: 1,
        exchange_order_id: None,
        client_order_id: "cid".to_string(),
        venue: Venue::Okx,
        symbol: "BTC-USDT-SWAP".to_string(),
        side: Side::Buy,
        order_type: OrderType::Limit,
        price: Px::new(100.0),
        qty: Qty::new(1.0),
        filled_qty: Qty::new(0.0),
        filled_price: Px::new(0.0),
        fee: None,
        state: OrderState::Submitted,
        venue_ts: 0,
        price_text: "100".to_string(),
        qty_text: "1".to_string(),
    }
}

fn arb_state() -> impl Strategy<Value = OrderState> {
    prop_oneof![
        Just(OrderState::Accepted),
        Just(OrderState::PartiallyFilled),
        Just(OrderState::Filled),
        Just(OrderState::Cancelled),
        Just(OrderState::Rejected),
        Just(OrderState::Expired),
    ]
}

fn arb_report() -> impl Strategy<Value = (OrderState, f64, u64)> {
    (arb_state(), 0..=10u32, 0..100u64).prop_map(|(state, tenths, ts)| {
        (state, f64::from(tenths) / 10.0, ts)
    })
}

proptest! {
    /// No matter what the venue sends: fills never shrink, terminal
    /// states absorb, and every emitted transition is legal.
    #[test]
    fn invariants_hold_over_arbitrary_report_streams(
        reports in prop::collection::vec(arb_report(), 1..40)
    ) {
        let mut order = fresh_order();
        let mut last_filled = 0.0f64;
        let mut last_state = order.state;

        for (state, filled, ts) in reports {
            let mut report = fresh_order();
            report.exchange_order_id = Some("e1".to_string());
            report.state = state;
            report.filled_qty = Qty::new(filled);
            report.filled_price = Px::new(100.0);
            report.venue_ts = ts;

            let was_final = order.state.is_final();
            match apply_report(&mut order, &report) {
                ReportOutcome::Applied(transitions) => {
                    prop_assert!(!was_final, "terminal state accepted an update");
                    for t in &transitions {
                        prop_assert!(
                            t.filled_qty.as_f64() + 1e-12 >= last_filled,
                            "filled quantity shrank: {} -> {}",
                            last_filled,
                            t.filled_qty.as_f64()
                        );
                        prop_assert!(
                            t.state == last_state || last_state.can_transition_to(t.state),
                            "illegal emitted transition {} -> {}",
                            last_state,
                            t.state
                        );
                        last_filled = t.filled_qty.as_f64();
                        last_state = t.state;
                    }
                    // A complete fill always lands in Filled.
                    if order.filled_qty.as_f64() >= order.qty.as_f64() - 1e-12 {
                        prop_assert_eq!(order.state, OrderState::Filled);
                    }
                }
                ReportOutcome::DroppedStale | ReportOutcome::DroppedViolation(_) => {
                    prop_assert_eq!(order.state, last_state, "drop must not mutate state");
                    prop_assert!(
                        (order.filled_qty.as_f64() - last_filled).abs() < 1e-12,
                        "drop must not mutate fills"
                    );
                }
            }
        }
    }

    /// Replaying the same report twice never produces a second batch of
    /// transitions.
    #[test]
    fn reports_are_idempotent(state in arb_state(), tenths in 1..=10u32) {
        let mut order = fresh_order();
        let mut report = fresh_order();
        report.exchange_order_id = Some("e1".to_string());
        report.state = state;
        report.filled_qty = Qty::new(f64::from(tenths) / 10.0);
        report.filled_price = Px::new(100.0);
        report.venue_ts = 5;

        let first = apply_report(&mut order, &report);
        if matches!(first, ReportOutcome::Applied(_)) {
            let second = apply_report(&mut order, &report);
            prop_assert!(
                !matches!(second, ReportOutcome::Applied(_)),
                "duplicate report re-applied"
            );
        }
    }
}
