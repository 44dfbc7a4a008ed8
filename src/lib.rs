// ============================================================================
// Order Engine Library
// Order aggregate lifecycle with reservation-based inventory consistency
// ============================================================================

//! # Order Engine
//!
//! The storefront core: orders, their line items, and the stock ledger that
//! keeps confirmed orders from overselling inventory.
//!
//! ## Features
//!
//! - **Order aggregate** whose total always equals the sum of its line
//!   subtotals; derived amounts cannot be set, only recomputed
//! - **Total lifecycle state machine** (`Pending -> Confirmed -> Shipped ->
//!   Delivered`, with cancellation): every event in every state has a
//!   defined outcome, even if that outcome is rejection
//! - **Reserve/commit stock ledger** with a lock per product, so two
//!   checkouts racing for the last unit cannot both win
//! - **Read-only revenue projections** by status, user, and date range
//!
//! ## Example
//!
//! ```rust
//! use order_engine::prelude::*;
//!
//! let engine = OrderEngine::in_memory();
//!
//! // Put a product under management
//! let desk = Product::new("Walnut desk", Money::from_parts(129, 99).unwrap(), 10).unwrap();
//! engine.register_product(&desk);
//!
//! // A customer builds an order
//! let order = engine.create_order(UserId::new()).unwrap();
//! engine.add_item(order.id(), desk.id(), Quantity::new(2).unwrap()).unwrap();
//!
//! // Stock is earmarked but not yet consumed
//! assert_eq!(engine.available_stock(desk.id()).unwrap(), 8);
//! assert_eq!(engine.product(desk.id()).unwrap().stock_quantity(), 10);
//!
//! // Confirmation commits the reservation for good
//! engine.confirm_order(order.id()).unwrap();
//! assert_eq!(engine.product(desk.id()).unwrap().stock_quantity(), 8);
//!
//! let confirmed = engine.order(order.id()).unwrap();
//! assert_eq!(confirmed.total_amount(), Money::from_parts(259, 98).unwrap());
//! ```

pub mod domain;
pub mod engine;
pub mod interfaces;
pub mod ledger;
pub mod numeric;
pub mod stats;

// Re-exports for convenience
pub mod prelude {
    pub use crate::domain::order::state::{OrderStatus, OrderTransition};
    pub use crate::domain::{
        LedgerError, LineItem, LineItemId, Order, OrderError, OrderId, OrderNumber, Product,
        ProductId, UserId,
    };
    pub use crate::engine::{OrderEngine, OrderEngineBuilder};
    pub use crate::interfaces::{
        EventHandler, InMemoryOrderStore, InMemoryProductStore, LoggingEventHandler,
        NoOpEventHandler, OrderEvent, OrderNumberGenerator, OrderStore, ProductStore,
        RandomOrderNumbers, SequentialOrderNumbers,
    };
    pub use crate::ledger::StockLedger;
    pub use crate::numeric::{Money, NumericError, NumericResult, Quantity};
    pub use crate::stats::{OrderQuery, RevenueReport};
}

#[cfg(test)]
mod integration_tests {
    use super::prelude::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn init_tracing() {
        use tracing_subscriber::EnvFilter;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_checkout_end_to_end() {
        init_tracing();
        let engine = OrderEngine::in_memory();
        let desk = Product::new("Walnut desk", Money::from_parts(129, 99).unwrap(), 10).unwrap();
        let lamp = Product::new("Brass lamp", Money::from_parts(25, 50).unwrap(), 4).unwrap();
        engine.register_product(&desk);
        engine.register_product(&lamp);

        let user = UserId::new();
        let order = engine.create_order(user).unwrap();
        engine
            .add_item(order.id(), desk.id(), Quantity::new(1).unwrap())
            .unwrap();
        engine
            .add_item(order.id(), lamp.id(), Quantity::new(2).unwrap())
            .unwrap();

        let pending = engine.order(order.id()).unwrap();
        assert_eq!(
            pending.total_amount(),
            Money::from_parts(180, 99).unwrap()
        );

        engine.confirm_order(order.id()).unwrap();
        engine.ship_order(order.id()).unwrap();
        engine.deliver_order(order.id()).unwrap();

        assert_eq!(engine.product(desk.id()).unwrap().stock_quantity(), 9);
        assert_eq!(engine.product(lamp.id()).unwrap().stock_quantity(), 2);

        let report = engine
            .report(&OrderQuery::new().with_status(OrderStatus::Delivered).for_user(user))
            .unwrap();
        assert_eq!(report.revenue, Money::from_parts(180, 99).unwrap());
        assert_eq!(report.orders, 1);
    }

    #[test]
    fn test_concurrent_checkouts_for_the_last_unit() {
        init_tracing();
        let engine = Arc::new(OrderEngine::in_memory());
        let product = Product::new("Limited print", Money::from_integer(80).unwrap(), 1).unwrap();
        let product_id = product.id();
        engine.register_product(&product);

        let barrier = Arc::new(Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let order = engine.create_order(UserId::new()).unwrap();
                    barrier.wait();
                    engine
                        .add_item(order.id(), product_id, Quantity::ONE)
                        .map(|_| order.id())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "exactly one checkout may win the unit");
        for result in &results {
            if let Err(err) = result {
                assert!(matches!(
                    err,
                    OrderError::Ledger(LedgerError::InsufficientStock {
                        available: 0,
                        requested: 1,
                    })
                ));
            }
        }

        // The winner can still confirm and consume the unit
        engine.confirm_order(*winners[0]).unwrap();
        assert_eq!(engine.product(product_id).unwrap().stock_quantity(), 0);
        assert_eq!(engine.ledger().reserved(product_id).unwrap(), 0);
    }

    #[test]
    fn test_cancelling_pending_order_restores_the_pool() {
        init_tracing();
        let engine = OrderEngine::in_memory();
        let product = Product::new("Side table", Money::from_integer(45).unwrap(), 10).unwrap();
        engine.register_product(&product);

        let order = engine.create_order(UserId::new()).unwrap();
        engine
            .add_item(order.id(), product.id(), Quantity::new(3).unwrap())
            .unwrap();
        engine
            .add_item(order.id(), product.id(), Quantity::new(5).unwrap())
            .unwrap();
        assert_eq!(engine.available_stock(product.id()).unwrap(), 2);

        engine.cancel_order(order.id()).unwrap();
        assert_eq!(engine.available_stock(product.id()).unwrap(), 10);
        assert_eq!(engine.product(product.id()).unwrap().stock_quantity(), 10);
    }
}
