// ============================================================================
// Statistics Module
// Pure read-side projections; no write path into the aggregate
// ============================================================================

mod aggregator;

pub use aggregator::{
    average_order_value, order_count, orders_matching, revenue, revenue_report, OrderQuery,
    RevenueReport,
};
