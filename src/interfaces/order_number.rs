// ============================================================================
// Order Number Generation
// Caller-supplied identity for new orders
// ============================================================================

use crate::domain::OrderNumber;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Produces the human-readable identifiers new orders are filed under.
///
/// The format is not load-bearing anywhere in the core; uniqueness is
/// enforced at the store boundary.
pub trait OrderNumberGenerator: Send + Sync {
    fn next_number(&self) -> OrderNumber;
}

/// Default generator: `ORD-` plus the first eight hex characters of a v4
/// UUID, uppercased.
#[derive(Debug, Default)]
pub struct RandomOrderNumbers;

impl OrderNumberGenerator for RandomOrderNumbers {
    fn next_number(&self) -> OrderNumber {
        let token = Uuid::new_v4().simple().to_string();
        OrderNumber::new(format!("ORD-{}", token[..8].to_uppercase()))
    }
}

/// Deterministic generator for tests: `ORD-00000001`, `ORD-00000002`, ...
#[derive(Debug, Default)]
pub struct SequentialOrderNumbers {
    counter: AtomicU64,
}

impl SequentialOrderNumbers {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderNumberGenerator for SequentialOrderNumbers {
    fn next_number(&self) -> OrderNumber {
        let next = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        OrderNumber::new(format!("ORD-{:08}", next))
    }
}
