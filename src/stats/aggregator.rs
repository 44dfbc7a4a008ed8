// ============================================================================
// Revenue and Statistics Aggregation
// Read-only projections over the order store
// ============================================================================

use crate::domain::{Order, OrderStatus, UserId};
use crate::interfaces::OrderStore;
use crate::numeric::{Money, NumericResult};
use chrono::{DateTime, Utc};

// ============================================================================
// Query Filter
// ============================================================================

/// Composable filter over committed order state.
///
/// The aggregator never decides which statuses count as revenue; callers
/// pass the status they mean (conventionally `Delivered`).
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    status: Option<OrderStatus>,
    user_id: Option<UserId>,
    created_after: Option<DateTime<Utc>>,
    created_before: Option<DateTime<Utc>>,
}

impl OrderQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: keep only orders in the given status
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Builder method: keep only one user's orders
    pub fn for_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Builder method: keep orders created at or after the given instant
    pub fn created_after(mut self, instant: DateTime<Utc>) -> Self {
        self.created_after = Some(instant);
        self
    }

    /// Builder method: keep orders created at or before the given instant
    pub fn created_before(mut self, instant: DateTime<Utc>) -> Self {
        self.created_before = Some(instant);
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        if let Some(status) = self.status {
            if order.status() != status {
                return false;
            }
        }
        if let Some(user_id) = self.user_id {
            if order.user_id() != user_id {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if order.created_at() < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if order.created_at() > before {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// Projections
// ============================================================================

/// Orders matching the query, newest first.
pub fn orders_matching(store: &dyn OrderStore, query: &OrderQuery) -> Vec<Order> {
    let mut orders: Vec<Order> = store
        .all()
        .into_iter()
        .filter(|order| query.matches(order))
        .collect();
    orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    orders
}

/// Number of orders matching the query.
pub fn order_count(store: &dyn OrderStore, query: &OrderQuery) -> usize {
    store
        .all()
        .iter()
        .filter(|order| query.matches(order))
        .count()
}

/// Sum of `total_amount` over the matching orders.
pub fn revenue(store: &dyn OrderStore, query: &OrderQuery) -> NumericResult<Money> {
    Money::checked_sum(
        store
            .all()
            .iter()
            .filter(|order| query.matches(order))
            .map(Order::total_amount),
    )
}

/// Average order value in whole currency units, truncated. `None` when no
/// order matches.
pub fn average_order_value(
    store: &dyn OrderStore,
    query: &OrderQuery,
) -> NumericResult<Option<i64>> {
    let mut total = Money::ZERO;
    let mut count: i64 = 0;
    for order in store.all().iter().filter(|order| query.matches(order)) {
        total = total.checked_add(order.total_amount())?;
        count += 1;
    }
    if count == 0 {
        return Ok(None);
    }
    Ok(Some(Money::from_raw(total.raw_value() / count).integer_part()))
}

/// One-shot revenue summary for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueReport {
    pub revenue: Money,
    pub orders: usize,
    pub average_value: Option<i64>,
}

pub fn revenue_report(store: &dyn OrderStore, query: &OrderQuery) -> NumericResult<RevenueReport> {
    Ok(RevenueReport {
        revenue: revenue(store, query)?,
        orders: order_count(store, query),
        average_value: average_order_value(store, query)?,
    })
}

// ============================================================================
// Tests
// ============================================================================
