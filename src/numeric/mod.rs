// ============================================================================
// Numeric Module
// Fixed-point money and validated quantities for the order flow
// ============================================================================
//
// This module provides:
// - FixedDecimal<D>: Fixed-point decimal with compile-time precision
// - Money: two-decimal currency alias used across the crate
// - Quantity: positive unit count for line items and stock movements
// - NumericError: Error types for arithmetic and validation
//
// Design principles:
// - No floating-point operations
// - All arithmetic returns Result (no panics)
// - Derived amounts (subtotals, totals) are recomputed, never assigned

mod errors;
mod fixed_decimal;
mod quantity;

pub use errors::{NumericError, NumericResult};
pub use fixed_decimal::{FixedDecimal, Money};
pub use quantity::Quantity;
