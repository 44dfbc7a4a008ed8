// ============================================================================
// Event Handler Interface
// Defines the contract for observing order lifecycle events
// ============================================================================

use crate::domain::{LineItemId, OrderId, OrderNumber, OrderStatus, ProductId, UserId};
use crate::numeric::Money;
use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Events emitted by the order engine
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderEvent {
    /// A new empty order was opened
    OrderCreated {
        order_id: OrderId,
        order_number: OrderNumber,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },

    /// A line item was appended and its stock earmarked
    ItemAdded {
        order_id: OrderId,
        line_item_id: LineItemId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
        timestamp: DateTime<Utc>,
    },

    /// A line item was removed and its reservation returned
    ItemRemoved {
        order_id: OrderId,
        line_item_id: LineItemId,
        product_id: ProductId,
        quantity: u32,
        timestamp: DateTime<Utc>,
    },

    /// A line item's quantity changed; the reservation followed the delta
    ItemQuantityChanged {
        order_id: OrderId,
        line_item_id: LineItemId,
        previous_quantity: u32,
        quantity: u32,
        timestamp: DateTime<Utc>,
    },

    /// The order was confirmed and its reservations committed
    OrderConfirmed {
        order_id: OrderId,
        total_amount: Money,
        timestamp: DateTime<Utc>,
    },

    /// A product's durable stock decreased as part of a confirmation
    StockCommitted {
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
        remaining_stock: u32,
        timestamp: DateTime<Utc>,
    },

    /// The order was handed to a carrier
    OrderShipped {
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },

    /// The order reached the customer
    OrderDelivered {
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },

    /// The order was cancelled
    OrderCancelled {
        order_id: OrderId,
        previous_status: OrderStatus,
        timestamp: DateTime<Utc>,
    },

    /// The order was administratively removed
    OrderDeleted {
        order_id: OrderId,
        status: OrderStatus,
        timestamp: DateTime<Utc>,
    },
}

/// Event handler trait for processing order engine events
/// Implementations can handle logging, metrics, notifications, etc.
pub trait EventHandler: Send + Sync {
    /// Handle an order event
    fn on_event(&self, event: OrderEvent);

    /// Batch event handler (optional optimization)
    fn on_events(&self, events: Vec<OrderEvent>) {
        for event in events {
            self.on_event(event);
        }
    }
}

/// No-op event handler for testing
pub struct NoOpEventHandler;

impl EventHandler for NoOpEventHandler {
    fn on_event(&self, _event: OrderEvent) {
        // Do nothing
    }
}

/// Logging event handler
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn on_event(&self, event: OrderEvent) {
        tracing::debug!("order engine event: {:?}", event);
    }
}
