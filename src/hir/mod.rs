//! High-level IR: snapshots, preprocessing across files, and name binding.
//!
//! ## Key Types
//!
//! - [`Snapshot`]: point-in-time map from path to [`Document`](crate::syntax::Document)
//! - [`SourceProcessor`]: turns files into documents, following includes
//! - [`LookupContext`]: name binding for one document and its includes
//! - [`SymbolFinder`]: declaration/definition matching across files
//!
//! ## Layers
//!
//! ```text
//! WorkingCopy + disk
//!     │
//!     ▼
//! SourceProcessor           ← preprocess, parse, reuse unchanged documents
//!     │
//!     ▼
//! Snapshot                  ← shared, copy-on-write
//!     │
//!     ▼
//! LookupContext             ← scopes, qualified names, SymbolKey
//!     │
//!     ▼
//! SymbolFinder              ← cached per-file search order
//! ```

mod file_iteration_order;
mod lookup;
mod snapshot;
mod source_processor;
mod symbol_finder;

pub use file_iteration_order::{FileIterationOrder, NoParts, PartMembership};
pub use lookup::{Entity, LookupContext, Symbol, SymbolKey, SymbolPath, symbol_at};
pub(crate) use lookup::parent_scope;
pub use snapshot::Snapshot;
pub use source_processor::{
    DocumentCallback, MAX_INCLUDE_DEPTH, ProcessorStats, SourceProcessor, process,
};
pub use symbol_finder::{MAX_CACHED_FILES, SymbolFinder};
