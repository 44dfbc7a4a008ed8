// ============================================================================
// Engine Module
// Contains the order lifecycle coordination logic
// ============================================================================

mod order_engine;

pub mod factory;

pub use factory::OrderEngineBuilder;
pub use order_engine::OrderEngine;
