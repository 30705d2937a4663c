//! HIR layer tests
//!
//! - Snapshot revision ordering and document reuse
//! - Cross-file declaration/definition matching order

pub mod tests_snapshot;
pub mod tests_symbol_finder;
