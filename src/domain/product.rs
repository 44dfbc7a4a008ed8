// ============================================================================
// Product Domain Model
// ============================================================================

use crate::numeric::{Money, NumericError, NumericResult};
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProductId(Uuid);

impl ProductId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Product Entity
// ============================================================================

/// A sellable product.
///
/// The `stock_quantity` field is the durable on-hand count. On the order
/// path it changes only through the stock ledger's commit write-back; admin
/// restocks go through the engine, which keeps the ledger and this entity in
/// step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Product {
    id: ProductId,
    name: String,
    price: Money,
    stock_quantity: u32,
    created_at: DateTime<Utc>,
}

impl Product {
    /// Create a product with a starting price and on-hand stock.
    ///
    /// # Errors
    /// Returns `InvalidAmount` if the price is negative.
    pub fn new(name: impl Into<String>, price: Money, stock_quantity: u32) -> NumericResult<Self> {
        if price.is_negative() {
            return Err(NumericError::InvalidAmount);
        }
        Ok(Self {
            id: ProductId::new(),
            name: name.into(),
            price,
            stock_quantity,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock_quantity(&self) -> u32 {
        self.stock_quantity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// Change the listed price. Existing line items keep their snapshot.
    ///
    /// # Errors
    /// Returns `InvalidAmount` if the new price is negative.
    pub fn set_price(&mut self, price: Money) -> NumericResult<()> {
        if price.is_negative() {
            return Err(NumericError::InvalidAmount);
        }
        self.price = price;
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Overwrite the on-hand count. Ledger write-back only; callers go
    /// through the engine's restock path.
    pub(crate) fn set_stock_quantity(&mut self, stock_quantity: u32) {
        self.stock_quantity = stock_quantity;
    }
}
