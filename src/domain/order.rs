// ============================================================================
// Order Aggregate
// The order, its owned line items, and the lifecycle state machine
// ============================================================================

use crate::numeric::{Money, NumericError, NumericResult, Quantity};
use chrono::{DateTime, Utc};
use smallvec::SmallVec;
use std::fmt;
use uuid::Uuid;

use super::errors::OrderError;
use super::product::ProductId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderId(Uuid);

impl OrderId {
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

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineItemId(Uuid);

impl LineItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LineItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UserId(Uuid);

impl UserId {
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

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable order identifier, unique across the store and immutable
/// once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Order State Machine
// ============================================================================

pub mod state {
    use super::OrderError;
    use std::fmt;

    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub enum OrderStatus {
        Pending,
        Confirmed,
        Shipped,
        Delivered,
        Cancelled,
    }

    impl OrderStatus {
        pub fn is_terminal(&self) -> bool {
            matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
        }

        pub fn can_be_cancelled(&self) -> bool {
            matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
        }

        /// Line items may only change while the order is still open.
        pub fn allows_item_changes(&self) -> bool {
            matches!(self, OrderStatus::Pending)
        }
    }

    impl fmt::Display for OrderStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = match self {
                OrderStatus::Pending => "Pending",
                OrderStatus::Confirmed => "Confirmed",
                OrderStatus::Shipped => "Shipped",
                OrderStatus::Delivered => "Delivered",
                OrderStatus::Cancelled => "Cancelled",
            };
            write!(f, "{}", name)
        }
    }

    /// Lifecycle events an order can be driven through
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub enum OrderTransition {
        Confirm,
        Ship,
        Deliver,
        Cancel,
    }

    impl fmt::Display for OrderTransition {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = match self {
                OrderTransition::Confirm => "confirm",
                OrderTransition::Ship => "ship",
                OrderTransition::Deliver => "deliver",
                OrderTransition::Cancel => "cancel",
            };
            write!(f, "{}", name)
        }
    }

    impl OrderStatus {
        /// Total transition function: every `(status, event)` pair has a
        /// defined outcome, even if that outcome is rejection.
        pub fn transition(self, event: OrderTransition) -> Result<OrderStatus, OrderError> {
            match (self, event) {
                (OrderStatus::Pending, OrderTransition::Confirm) => Ok(OrderStatus::Confirmed),
                (OrderStatus::Confirmed, OrderTransition::Ship) => Ok(OrderStatus::Shipped),
                (OrderStatus::Shipped, OrderTransition::Deliver) => Ok(OrderStatus::Delivered),
                (OrderStatus::Pending, OrderTransition::Cancel)
                | (OrderStatus::Confirmed, OrderTransition::Cancel) => Ok(OrderStatus::Cancelled),

                (from, event) => Err(OrderError::InvalidTransition { from, event }),
            }
        }
    }
}

use state::{OrderStatus, OrderTransition};

// ============================================================================
// Line Item
// ============================================================================

/// A line of an order: a product reference, a unit count, and the unit price
/// snapshotted when the line was added.
///
/// `subtotal` is derived from the other two fields and recomputed on every
/// mutation; there is no way to set it independently.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineItem {
    id: LineItemId,
    product_id: ProductId,
    quantity: Quantity,
    unit_price: Money,
    subtotal: Money,
}

impl LineItem {
    /// Build a line item, snapshotting the unit price.
    ///
    /// # Errors
    /// Returns `InvalidAmount` if the unit price is negative or the subtotal
    /// overflows.
    pub(crate) fn new(
        product_id: ProductId,
        quantity: Quantity,
        unit_price: Money,
    ) -> NumericResult<Self> {
        if unit_price.is_negative() {
            return Err(NumericError::InvalidAmount);
        }
        let subtotal = unit_price.checked_mul_int(i64::from(quantity.get()))?;
        Ok(Self {
            id: LineItemId::new(),
            product_id,
            quantity,
            unit_price,
            subtotal,
        })
    }

    pub fn id(&self) -> LineItemId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    /// Install a pre-validated quantity and its matching subtotal.
    fn apply_quantity(&mut self, quantity: Quantity, subtotal: Money) {
        self.quantity = quantity;
        self.subtotal = subtotal;
    }
}

// ============================================================================
// Order Aggregate Root
// ============================================================================

/// An order and the line items it exclusively owns.
///
/// `total_amount` always equals the sum of the line subtotals; every item
/// mutation validates first and recomputes the total before returning, so a
/// caller can never observe the two out of step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    user_id: UserId,
    status: OrderStatus,
    items: SmallVec<[LineItem; 4]>,
    total_amount: Money,
    shipping_address: Option<String>,
    billing_address: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Open a new, empty order in `Pending` status.
    pub fn new(order_number: OrderNumber, user_id: UserId) -> Self {
        Self {
            id: OrderId::new(),
            order_number,
            user_id,
            status: OrderStatus::Pending,
            items: SmallVec::new(),
            total_amount: Money::ZERO,
            shipping_address: None,
            billing_address: None,
            notes: None,
            created_at: Utc::now(),
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item(&self, id: LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn shipping_address(&self) -> Option<&str> {
        self.shipping_address.as_deref()
    }

    pub fn billing_address(&self) -> Option<&str> {
        self.billing_address.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == OrderStatus::Confirmed
    }

    pub fn is_shipped(&self) -> bool {
        self.status == OrderStatus::Shipped
    }

    pub fn is_delivered(&self) -> bool {
        self.status == OrderStatus::Delivered
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }

    // ========================================================================
    // Item Mutations
    // ========================================================================

    fn ensure_items_open(&self) -> Result<(), OrderError> {
        if self.status.allows_item_changes() {
            Ok(())
        } else {
            Err(OrderError::ItemsFrozen(self.status))
        }
    }

    /// Append a line item. The caller has already earmarked stock for it.
    pub(crate) fn add_item(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
        unit_price: Money,
    ) -> Result<LineItemId, OrderError> {
        self.ensure_items_open()?;
        let item = LineItem::new(product_id, quantity, unit_price)?;
        // Reject a total that would overflow before touching the item list
        self.total_amount.checked_add(item.subtotal())?;
        let id = item.id();
        self.items.push(item);
        self.recompute_total()?;
        Ok(id)
    }

    /// Remove a line item, returning it so the caller can release its
    /// reservation.
    pub(crate) fn remove_item(&mut self, id: LineItemId) -> Result<LineItem, OrderError> {
        self.ensure_items_open()?;
        let index = self
            .items
            .iter()
            .position(|item| item.id() == id)
            .ok_or(OrderError::LineItemNotFound(id))?;
        let item = self.items.remove(index);
        self.recompute_total()?;
        Ok(item)
    }

    /// Change a line item's quantity, returning the previous quantity so the
    /// caller can reserve or release the delta.
    pub(crate) fn set_item_quantity(
        &mut self,
        id: LineItemId,
        quantity: Quantity,
    ) -> Result<Quantity, OrderError> {
        self.ensure_items_open()?;
        let index = self
            .items
            .iter()
            .position(|item| item.id() == id)
            .ok_or(OrderError::LineItemNotFound(id))?;

        // Validate the new subtotal and the new total before mutating
        let new_subtotal = self.items[index]
            .unit_price()
            .checked_mul_int(i64::from(quantity.get()))?;
        Money::checked_sum(self.items.iter().enumerate().map(|(i, item)| {
            if i == index {
                new_subtotal
            } else {
                item.subtotal()
            }
        }))?;

        let previous = self.items[index].quantity();
        self.items[index].apply_quantity(quantity, new_subtotal);
        self.recompute_total()?;
        Ok(previous)
    }

    /// Recompute `total_amount` from the line subtotals. Runs after every
    /// item mutation; callers validate candidate sums first, so this cannot
    /// fail in practice.
    fn recompute_total(&mut self) -> NumericResult<()> {
        self.total_amount = Money::checked_sum(self.items.iter().map(LineItem::subtotal))?;
        Ok(())
    }

    // ========================================================================
    // Opaque Fields
    // ========================================================================

    pub(crate) fn set_shipping_address(&mut self, address: Option<String>) {
        self.shipping_address = address;
    }

    pub(crate) fn set_billing_address(&mut self, address: Option<String>) {
        self.billing_address = address;
    }

    pub(crate) fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Drive the order through a lifecycle event, stamping the timestamp the
    /// transition owns. Stock coordination happens in the engine; this only
    /// validates and applies the status change.
    pub(crate) fn apply_transition(
        &mut self,
        event: OrderTransition,
        at: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        // An empty order can exist, but it cannot become a real commitment
        if event == OrderTransition::Confirm && !self.has_items() {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                event,
            });
        }

        let next = self.status.transition(event)?;
        self.status = next;
        match next {
            OrderStatus::Shipped => self.shipped_at = Some(at),
            OrderStatus::Delivered => self.delivered_at = Some(at),
            OrderStatus::Cancelled => self.cancelled_at = Some(at),
            OrderStatus::Pending | OrderStatus::Confirmed => {},
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
