// ============================================================================
// Order Engine Factory
// Builds engines with sensible defaults and custom collaborators
// ============================================================================

use crate::engine::OrderEngine;
use crate::interfaces::{
    EventHandler, InMemoryOrderStore, InMemoryProductStore, LoggingEventHandler,
    OrderNumberGenerator, OrderStore, ProductStore, RandomOrderNumbers,
};
use std::sync::Arc;

/// Builder for wiring an [`OrderEngine`] with a fluent API.
///
/// Defaults: in-memory stores, `ORD-XXXXXXXX` random order numbers, and the
/// tracing-backed logging event handler.
///
/// # Example
/// ```
/// use order_engine::prelude::*;
/// use std::sync::Arc;
///
/// let engine = OrderEngineBuilder::new()
///     .with_order_numbers(Arc::new(SequentialOrderNumbers::new()))
///     .with_event_handler(Arc::new(NoOpEventHandler))
///     .build();
/// ```
#[derive(Default)]
pub struct OrderEngineBuilder {
    orders: Option<Arc<dyn OrderStore>>,
    products: Option<Arc<dyn ProductStore>>,
    numbers: Option<Arc<dyn OrderNumberGenerator>>,
    events: Option<Arc<dyn EventHandler>>,
}

impl OrderEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Collaborator Configuration
    // ========================================================================

    /// Use a custom order store (defaults to [`InMemoryOrderStore`]).
    pub fn with_order_store(mut self, orders: Arc<dyn OrderStore>) -> Self {
        self.orders = Some(orders);
        self
    }

    /// Use a custom product store (defaults to [`InMemoryProductStore`]).
    pub fn with_product_store(mut self, products: Arc<dyn ProductStore>) -> Self {
        self.products = Some(products);
        self
    }

    /// Use a custom order number generator (defaults to
    /// [`RandomOrderNumbers`]).
    pub fn with_order_numbers(mut self, numbers: Arc<dyn OrderNumberGenerator>) -> Self {
        self.numbers = Some(numbers);
        self
    }

    /// Use a custom event handler (defaults to [`LoggingEventHandler`]).
    pub fn with_event_handler(mut self, events: Arc<dyn EventHandler>) -> Self {
        self.events = Some(events);
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the order engine
    pub fn build(self) -> OrderEngine {
        OrderEngine::new(
            self.orders
                .unwrap_or_else(|| Arc::new(InMemoryOrderStore::new())),
            self.products
                .unwrap_or_else(|| Arc::new(InMemoryProductStore::new())),
            self.numbers.unwrap_or_else(|| Arc::new(RandomOrderNumbers)),
            self.events.unwrap_or_else(|| Arc::new(LoggingEventHandler)),
        )
    }
}
