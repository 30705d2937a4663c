//! Foundation types for the code model.
//!
//! This module provides fundamental types used throughout the engine:
//! - [`FilePath`] - Normalized, cheaply cloneable file paths
//! - [`Position`], [`Span`] - 0-based line/column positions
//! - [`Name`] - Identifier names (inline small strings)
//! - [`StringTable`] - Shared string interning with garbage collection
//! - Text helpers for identifiers and line extraction
//!
//! This module has NO dependencies on other codemodel modules.

mod intern;
mod path;
mod position;
pub mod text;

pub use intern::StringTable;
pub use path::FilePath;
pub use position::{Position, Span};

// Re-export text-size types for convenience
pub use text_size::{TextRange, TextSize};

/// An identifier as written in source.
pub type Name = smol_str::SmolStr;
