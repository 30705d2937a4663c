//! Preprocessor and declaration parser for C-family sources
//!
//! ## Architecture
//!
//! ```text
//! Source Text
//!     ↓
//! Lexer (logos) → Tokens with SyntaxKind
//!     ↓
//! Preprocessor → PpToken stream, macros, includes, diagnostics
//!     ↓
//! Parser → DeclTree (declarations + name references)
//!     ↓
//! HIR → name binding against a Snapshot
//! ```
//!
//! Keywords are classified lazily against the file's `LanguageFeatures`, so the
//! same token stream parses as C or C++.

pub mod diagnostic;
mod grammar;
pub mod keywords;
mod lexer;
#[allow(clippy::module_inception)]
mod parser;
pub mod preprocessor;
mod syntax_kind;
pub mod tree;

pub use diagnostic::{Diagnostic, Severity};
pub use keywords::Keyword;
pub use lexer::{Lexer, Token, tokenize};
pub use parser::{Parse, parse};
pub use preprocessor::{
    Environment, Include, IncludeKind, IncludeOutcome, IncludeRequest, Macro, MacroUse,
    PpToken, PreprocessedFile, PreprocessorClient, preprocess,
};
pub use syntax_kind::SyntaxKind;
pub use tree::{DeclId, DeclKind, DeclTree, RefId};
