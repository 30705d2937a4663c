//! IDE service tests
//!
//! Tests for:
//! - Reachability garbage collection
//! - Find usages and rename through the model manager
//! - Project-wide symbol search

pub mod tests_find_usages;
pub mod tests_gc;
pub mod tests_symbol_search;
