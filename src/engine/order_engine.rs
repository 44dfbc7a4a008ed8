// ============================================================================
// Order Engine
// Coordinates the order aggregate, the stock ledger, and persistence
// ============================================================================

use crate::domain::order::state::OrderTransition;
use crate::domain::{
    LineItemId, Order, OrderError, OrderId, OrderNumber, OrderStatus, Product, ProductId, UserId,
};
use crate::interfaces::{EventHandler, OrderEvent, OrderNumberGenerator, OrderStore, ProductStore};
use crate::ledger::StockLedger;
use crate::numeric::{NumericResult, Quantity};
use crate::stats::{self, OrderQuery, RevenueReport};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// The write side of the storefront core.
///
/// All order mutations go through here: the engine serializes writers per
/// order, keeps the stock ledger and the product entities in step, and emits
/// an event for every change it persists. Reads can go straight to the
/// stores.
pub struct OrderEngine {
    /// Shared stock arena crossing order boundaries
    ledger: StockLedger,

    /// Order persistence
    orders: Arc<dyn OrderStore>,

    /// Product persistence
    products: Arc<dyn ProductStore>,

    /// Identity for new orders
    numbers: Arc<dyn OrderNumberGenerator>,

    /// Event handler for processing events
    events: Arc<dyn EventHandler>,

    /// Single-writer locks, one per live order
    writer_locks: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
}

impl OrderEngine {
    /// Create an engine over the given collaborators.
    pub fn new(
        orders: Arc<dyn OrderStore>,
        products: Arc<dyn ProductStore>,
        numbers: Arc<dyn OrderNumberGenerator>,
        events: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            ledger: StockLedger::new(),
            orders,
            products,
            numbers,
            events,
            writer_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Engine with in-memory stores and defaults, ready for embedding or
    /// tests. See [`OrderEngineBuilder`](crate::engine::OrderEngineBuilder)
    /// for custom wiring.
    pub fn in_memory() -> Self {
        crate::engine::OrderEngineBuilder::new().build()
    }

    // ========================================================================
    // Product Administration
    // ========================================================================

    /// Put a product under management: persist it and start tracking its
    /// stock in the ledger.
    pub fn register_product(&self, product: &Product) {
        self.products.save(product);
        self.ledger.track(product.id(), product.stock_quantity());
        tracing::debug!(product_id = %product.id(), stock = product.stock_quantity(), "registered product");
    }

    /// Add units to a product's stock (returns/restocking).
    pub fn restock_product(
        &self,
        product_id: ProductId,
        additional: u32,
    ) -> Result<u32, OrderError> {
        let mut product = self
            .products
            .find(product_id)
            .ok_or(OrderError::ProductNotFound(product_id))?;
        let on_hand = self.ledger.restock(product_id, additional)?;
        product.set_stock_quantity(on_hand);
        self.products.save(&product);
        Ok(on_hand)
    }

    /// Overwrite a product's stock count (inventory correction). Rejected if
    /// it would drop below what in-flight orders have reserved.
    pub fn set_product_stock(
        &self,
        product_id: ProductId,
        on_hand: u32,
    ) -> Result<u32, OrderError> {
        let mut product = self
            .products
            .find(product_id)
            .ok_or(OrderError::ProductNotFound(product_id))?;
        let on_hand = self.ledger.set_stock(product_id, on_hand)?;
        product.set_stock_quantity(on_hand);
        self.products.save(&product);
        Ok(on_hand)
    }

    /// Units of a product free to sell right now.
    pub fn available_stock(&self, product_id: ProductId) -> Result<u32, OrderError> {
        Ok(self.ledger.available(product_id)?)
    }

    pub fn product(&self, product_id: ProductId) -> Result<Product, OrderError> {
        self.products
            .find(product_id)
            .ok_or(OrderError::ProductNotFound(product_id))
    }

    // ========================================================================
    // Order Creation and Lookup
    // ========================================================================

    /// Open a new empty order for a user.
    pub fn create_order(&self, user_id: UserId) -> Result<Order, OrderError> {
        let order = Order::new(self.numbers.next_number(), user_id);
        self.orders.save(&order)?;
        tracing::info!(order_id = %order.id(), number = %order.order_number(), "created order");
        self.events.on_event(OrderEvent::OrderCreated {
            order_id: order.id(),
            order_number: order.order_number().clone(),
            user_id,
            timestamp: order.created_at(),
        });
        Ok(order)
    }

    pub fn order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.orders
            .find(order_id)
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    pub fn order_by_number(&self, number: &OrderNumber) -> Option<Order> {
        self.orders.find_by_number(number)
    }

    // ========================================================================
    // Item Mutations (Pending orders only)
    // ========================================================================

    /// Add a line item, snapshotting the product's current price and
    /// earmarking its stock.
    ///
    /// # Errors
    /// Propagates `InsufficientStock` without touching the order.
    pub fn add_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<LineItemId, OrderError> {
        let lock = self.writer_lock(order_id);
        let _guard = lock.lock();

        let mut order = self.load(order_id)?;
        let product = self
            .products
            .find(product_id)
            .ok_or(OrderError::ProductNotFound(product_id))?;

        let line_item_id = order.add_item(product_id, quantity, product.price())?;
        // The loaded copy is discarded if the reservation fails, so the
        // stored order never sees a line without earmarked stock
        self.ledger.reserve(product_id, quantity)?;
        self.orders.save(&order)?;

        self.events.on_event(OrderEvent::ItemAdded {
            order_id,
            line_item_id,
            product_id,
            quantity: quantity.get(),
            unit_price: product.price(),
            timestamp: Utc::now(),
        });
        Ok(line_item_id)
    }

    /// Remove a line item and return its reservation to the pool.
    pub fn remove_item(
        &self,
        order_id: OrderId,
        line_item_id: LineItemId,
    ) -> Result<(), OrderError> {
        let lock = self.writer_lock(order_id);
        let _guard = lock.lock();

        let mut order = self.load(order_id)?;
        let removed = order.remove_item(line_item_id)?;
        self.ledger
            .release(removed.product_id(), removed.quantity())?;
        self.orders.save(&order)?;

        self.events.on_event(OrderEvent::ItemRemoved {
            order_id,
            line_item_id,
            product_id: removed.product_id(),
            quantity: removed.quantity().get(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Change a line item's quantity, adjusting the reservation by exactly
    /// the delta.
    ///
    /// # Errors
    /// Propagates `InsufficientStock` without partial mutation when
    /// increasing past availability.
    pub fn update_item_quantity(
        &self,
        order_id: OrderId,
        line_item_id: LineItemId,
        quantity: Quantity,
    ) -> Result<(), OrderError> {
        let lock = self.writer_lock(order_id);
        let _guard = lock.lock();

        let mut order = self.load(order_id)?;
        let product_id = order
            .item(line_item_id)
            .ok_or(OrderError::LineItemNotFound(line_item_id))?
            .product_id();

        let previous = order.set_item_quantity(line_item_id, quantity)?;
        let (old, new) = (previous.get(), quantity.get());
        if new > old {
            self.ledger
                .reserve(product_id, Quantity::new(new - old)?)?;
        } else if new < old {
            self.ledger
                .release(product_id, Quantity::new(old - new)?)?;
        }
        self.orders.save(&order)?;

        self.events.on_event(OrderEvent::ItemQuantityChanged {
            order_id,
            line_item_id,
            previous_quantity: old,
            quantity: new,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    // ========================================================================
    // Lifecycle Transitions
    // ========================================================================

    /// Confirm a pending order: freeze its items and turn every reservation
    /// into a durable stock decrement.
    pub fn confirm_order(&self, order_id: OrderId) -> Result<(), OrderError> {
        let lock = self.writer_lock(order_id);
        let _guard = lock.lock();

        let mut order = self.load(order_id)?;
        let now = Utc::now();
        order.apply_transition(OrderTransition::Confirm, now)?;

        let committed = self.ledger.commit_all(&Self::line_quantities(&order))?;
        // Write the authoritative counts back to the product entities
        for (product_id, on_hand) in &committed {
            match self.products.find(*product_id) {
                Some(mut product) => {
                    product.set_stock_quantity(*on_hand);
                    self.products.save(&product);
                },
                None => {
                    tracing::warn!(%product_id, "confirmed order references a missing product");
                },
            }
        }
        self.orders.save(&order)?;
        tracing::info!(%order_id, total = %order.total_amount(), "confirmed order");

        let mut events = vec![OrderEvent::OrderConfirmed {
            order_id,
            total_amount: order.total_amount(),
            timestamp: now,
        }];
        for item in order.items() {
            let remaining = committed
                .iter()
                .find(|(product_id, _)| *product_id == item.product_id())
                .map(|(_, on_hand)| *on_hand)
                .unwrap_or_default();
            events.push(OrderEvent::StockCommitted {
                order_id,
                product_id: item.product_id(),
                quantity: item.quantity().get(),
                remaining_stock: remaining,
                timestamp: now,
            });
        }
        self.events.on_events(events);
        Ok(())
    }

    /// Hand a confirmed order to a carrier.
    pub fn ship_order(&self, order_id: OrderId) -> Result<(), OrderError> {
        let lock = self.writer_lock(order_id);
        let _guard = lock.lock();

        let mut order = self.load(order_id)?;
        let now = Utc::now();
        order.apply_transition(OrderTransition::Ship, now)?;
        self.orders.save(&order)?;

        self.events.on_event(OrderEvent::OrderShipped {
            order_id,
            timestamp: now,
        });
        Ok(())
    }

    /// Mark a shipped order as delivered.
    pub fn deliver_order(&self, order_id: OrderId) -> Result<(), OrderError> {
        let lock = self.writer_lock(order_id);
        let _guard = lock.lock();

        let mut order = self.load(order_id)?;
        let now = Utc::now();
        order.apply_transition(OrderTransition::Deliver, now)?;
        self.orders.save(&order)?;

        self.events.on_event(OrderEvent::OrderDelivered {
            order_id,
            timestamp: now,
        });
        Ok(())
    }

    /// Cancel a pending or confirmed order.
    ///
    /// Cancelling a pending order returns every reservation to the pool.
    /// Cancelling a confirmed order restores nothing: the committed units
    /// stay consumed. Product owners should weigh in before that rule
    /// changes.
    pub fn cancel_order(&self, order_id: OrderId) -> Result<(), OrderError> {
        let lock = self.writer_lock(order_id);
        let _guard = lock.lock();

        let mut order = self.load(order_id)?;
        let previous_status = order.status();
        let now = Utc::now();
        order.apply_transition(OrderTransition::Cancel, now)?;

        if previous_status == OrderStatus::Pending && order.has_items() {
            self.ledger.release_all(&Self::line_quantities(&order))?;
        }
        self.orders.save(&order)?;
        tracing::info!(%order_id, from = %previous_status, "cancelled order");

        self.events.on_event(OrderEvent::OrderCancelled {
            order_id,
            previous_status,
            timestamp: now,
        });
        Ok(())
    }

    // ========================================================================
    // Administrative Operations
    // ========================================================================

    /// Remove an order outright, whatever its status. A still-pending order
    /// gives its reservations back first so earmarked stock cannot leak.
    pub fn delete_order(&self, order_id: OrderId) -> Result<(), OrderError> {
        let lock = self.writer_lock(order_id);
        let _guard = lock.lock();

        let order = self.load(order_id)?;
        if order.status() == OrderStatus::Pending && order.has_items() {
            self.ledger.release_all(&Self::line_quantities(&order))?;
        }
        self.orders.delete(order_id);
        self.writer_locks.lock().remove(&order_id);
        tracing::info!(%order_id, status = %order.status(), "deleted order");

        self.events.on_event(OrderEvent::OrderDeleted {
            order_id,
            status: order.status(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Update the opaque shipping address text.
    pub fn update_shipping_address(
        &self,
        order_id: OrderId,
        address: Option<String>,
    ) -> Result<(), OrderError> {
        self.update_opaque(order_id, |order| order.set_shipping_address(address))
    }

    /// Update the opaque billing address text.
    pub fn update_billing_address(
        &self,
        order_id: OrderId,
        address: Option<String>,
    ) -> Result<(), OrderError> {
        self.update_opaque(order_id, |order| order.set_billing_address(address))
    }

    /// Update the opaque order notes.
    pub fn update_notes(&self, order_id: OrderId, notes: Option<String>) -> Result<(), OrderError> {
        self.update_opaque(order_id, |order| order.set_notes(notes))
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    /// Orders matching a filter, newest first.
    pub fn orders_matching(&self, query: &OrderQuery) -> Vec<Order> {
        stats::orders_matching(self.orders.as_ref(), query)
    }

    /// Revenue figures for the matching orders. The caller decides which
    /// statuses count as revenue via the query.
    pub fn report(&self, query: &OrderQuery) -> NumericResult<RevenueReport> {
        stats::revenue_report(self.orders.as_ref(), query)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn ledger(&self) -> &StockLedger {
        &self.ledger
    }

    pub fn order_store(&self) -> &dyn OrderStore {
        self.orders.as_ref()
    }

    pub fn product_store(&self) -> &dyn ProductStore {
        self.products.as_ref()
    }

    // ========================================================================
    // Private methods
    // ========================================================================

    fn load(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.orders
            .find(order_id)
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    fn writer_lock(&self, order_id: OrderId) -> Arc<Mutex<()>> {
        let mut locks = self.writer_locks.lock();
        Arc::clone(
            locks
                .entry(order_id)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn line_quantities(order: &Order) -> Vec<(ProductId, u32)> {
        order
            .items()
            .iter()
            .map(|item| (item.product_id(), item.quantity().get()))
            .collect()
    }

    fn update_opaque(
        &self,
        order_id: OrderId,
        mutate: impl FnOnce(&mut Order),
    ) -> Result<(), OrderError> {
        let lock = self.writer_lock(order_id);
        let _guard = lock.lock();

        let mut order = self.load(order_id)?;
        mutate(&mut order);
        self.orders.save(&order)?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
