// ============================================================================
// Ledger Module
// The shared stock arena crossing order boundaries
// ============================================================================

mod stock_ledger;

pub use stock_ledger::StockLedger;
