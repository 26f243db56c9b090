//! Integration tests for the order state machine.
//!
//! These tests drive orders through complete lifecycles using only the
//! public domain API.

use chrono::Utc;
use common::{ProductId, UserId};
use domain::{
    Cart, Money, Order, OrderError, OrderLine, OrderStatus, PaymentMethod, PaymentStatus,
    PlaceOrder, ShippingAddress, compute_totals,
};

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Ravi Kumar".to_string(),
        phone: "9876543210".to_string(),
        email: "ravi@example.com".to_string(),
        address_line1: "4 Park Street".to_string(),
        address_line2: None,
        city: "Kolkata".to_string(),
        state: "WB".to_string(),
        pincode: "700016".to_string(),
        country: "India".to_string(),
    }
}

fn line(price_major: i64, quantity: u32) -> OrderLine {
    OrderLine {
        product_id: ProductId::new(),
        name: "Widget".to_string(),
        quantity,
        size: None,
        color: None,
        price: Money::from_major(price_major),
        image: None,
    }
}

fn place_order(method: PaymentMethod) -> Order {
    Order::place(
        PlaceOrder {
            user_id: UserId::new(),
            lines: vec![line(100, 2), line(50, 1)],
            shipping_address: address(),
            payment_method: method,
            notes: None,
        },
        Utc::now(),
    )
    .unwrap()
}

mod order_lifecycle {
    use super::*;

    #[test]
    fn full_fulfillment_path() {
        let mut order = place_order(PaymentMethod::Cod);
        assert_eq!(order.status(), OrderStatus::Processing);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);

        for next in [
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            let change = order.update_status(next, None, None, Utc::now()).unwrap();
            assert_eq!(change.new_status, next);
            assert!(!change.releases_stock());
        }

        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        assert!(order.delivered_at().is_some());
        assert_eq!(order.total_amount(), Money::from_major(295));
    }

    #[test]
    fn cancellation_from_every_non_terminal_state() {
        for start in [
            OrderStatus::Processing,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
        ] {
            let mut order = place_order(PaymentMethod::Card);
            order.update_status(start, None, None, Utc::now()).unwrap();

            let old = order.cancel(Some("changed my mind".to_string()), Utc::now()).unwrap();
            assert_eq!(old, start);
            assert_eq!(order.status(), OrderStatus::Cancelled);
            assert_eq!(order.cancellation_reason(), Some("changed my mind"));
        }
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        let mut delivered = place_order(PaymentMethod::Card);
        delivered
            .update_status(OrderStatus::Delivered, None, None, Utc::now())
            .unwrap();
        let mut cancelled = place_order(PaymentMethod::Card);
        cancelled.cancel(None, Utc::now()).unwrap();

        for order in [&mut delivered, &mut cancelled] {
            for next in OrderStatus::ALL {
                let result = order.update_status(next, None, None, Utc::now());
                assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
            }
            assert!(matches!(
                order.cancel(None, Utc::now()),
                Err(OrderError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn backward_moves_are_rejected() {
        let mut order = place_order(PaymentMethod::Card);
        order
            .update_status(OrderStatus::Shipped, None, None, Utc::now())
            .unwrap();
        let result = order.update_status(OrderStatus::Confirmed, None, None, Utc::now());
        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition { current_state: OrderStatus::Shipped, .. })
        ));
    }

    #[test]
    fn same_status_update_only_touches_tracking() {
        let mut order = place_order(PaymentMethod::Card);
        order
            .update_status(OrderStatus::Shipped, None, Some("TRK-1".to_string()), Utc::now())
            .unwrap();
        let change = order
            .update_status(OrderStatus::Shipped, None, Some("TRK-2".to_string()), Utc::now())
            .unwrap();
        assert!(change.is_noop());
        assert_eq!(order.tracking_number(), Some("TRK-2"));
    }

    #[test]
    fn soft_delete_ignores_status_guard() {
        let mut order = place_order(PaymentMethod::Card);
        order
            .update_status(OrderStatus::Delivered, None, None, Utc::now())
            .unwrap();
        let old = order.soft_delete(Utc::now());
        assert_eq!(old, OrderStatus::Delivered);
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.cancellation_reason(), Some("Deleted by admin"));
    }
}

mod checkout_arithmetic {
    use super::*;

    #[test]
    fn cart_totals_feed_order_totals() {
        let mut draft = Cart::new(UserId::new()).edit();
        draft
            .add(ProductId::new(), 2, None, None, Money::from_major(100))
            .unwrap();
        draft
            .add(ProductId::new(), 1, None, None, Money::from_major(50))
            .unwrap();
        let cart = draft.commit();

        assert_eq!(cart.total_price(), Money::from_major(250));
        assert_eq!(compute_totals(cart.items()), cart.totals());

        let order = place_order(PaymentMethod::Upi);
        assert_eq!(order.subtotal(), cart.total_price());
        assert_eq!(order.tax().to_string(), "45.00");
        assert_eq!(order.total_amount().to_string(), "295.00");
    }
}
