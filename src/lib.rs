//! # codemodel
//!
//! Incremental code model for C and C++ sources: preprocessing and parsing,
//! point-in-time snapshots, name binding, background indexing, symbol search
//! and find-usages.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide       → ModelManager, indexing, find usages, symbol search, tasks
//!   ↓
//! hir       → Snapshot, SourceProcessor, LookupContext, SymbolFinder
//!   ↓
//! project   → ProjectPart/ProjectInfo, WorkingCopy, Settings, disk access
//!   ↓
//! syntax    → Document (immutable parse result of one file)
//!   ↓
//! parser    → Logos lexer, preprocessor, declaration parser
//!   ↓
//! base      → Primitives (FilePath, Position, Name, StringTable)
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → syntax → project → hir → ide)
// ============================================================================

/// Foundation types: FilePath, Position/Span, Name, string interning
pub mod base;

/// Parser: Logos lexer, preprocessor, declaration tree
pub mod parser;

/// Syntax: the per-file Document
pub mod syntax;

/// Project configuration, working copy and settings
pub mod project;

/// High-level IR: snapshots, source processing, name binding
pub mod hir;

/// IDE services: model manager, indexing, searches
pub mod ide;

mod error;

pub use error::{Error, Result};

// Re-export foundation types
pub use base::{FilePath, Name, Position, Span, StringTable};
