//! Parsed documents.
//!
//! A [`Document`] bundles the preprocessor output, the declaration tree and the
//! identifier table of one file. Documents are immutable and shared through
//! `Arc` by every snapshot that contains them.

mod document;

pub use document::{Document, DocumentOrigin};
