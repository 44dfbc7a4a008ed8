// ============================================================================
// Domain Errors
// Business-rule failures for the ledger and the order aggregate
// ============================================================================

use super::order::state::{OrderStatus, OrderTransition};
use super::order::{LineItemId, OrderId, OrderNumber};
use super::product::ProductId;
use crate::numeric::NumericError;

// ============================================================================
// Stock Ledger Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: u32, requested: u32 },

    #[error("cannot release {requested} units, only {reserved} reserved")]
    OverRelease { reserved: u32, requested: u32 },

    #[error("cannot commit {requested} units, only {reserved} reserved")]
    ReservationNotFound { reserved: u32, requested: u32 },

    #[error("product {0} is not tracked by the stock ledger")]
    ProductNotFound(ProductId),

    #[error("stock level for product {0} would overflow")]
    StockOverflow(ProductId),

    #[error("stock level for product {product_id} cannot drop below the {reserved} reserved units")]
    StockUnderflow {
        product_id: ProductId,
        reserved: u32,
    },
}

// ============================================================================
// Order Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("invalid transition: {event} is not allowed from {from}")]
    InvalidTransition {
        from: OrderStatus,
        event: OrderTransition,
    },

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("line item {0} not found")]
    LineItemNotFound(LineItemId),

    #[error("line items can only be changed while the order is pending, not {0}")]
    ItemsFrozen(OrderStatus),

    #[error("order number {0} is already in use")]
    DuplicateOrderNumber(OrderNumber),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Numeric(#[from] NumericError),
}
