//! Grammar rules for the declaration parser
//!
//! This module contains the construct-specific parsing logic:
//! - `declarations` - namespaces, classes, enums, using, declarators
//! - `statements` - function bodies and local scopes
//! - `expressions` - name references inside expressions and initializers
//!
//! All rules are methods on [`Parser`](super::parser::Parser).

mod declarations;
mod expressions;
mod statements;

pub(crate) use declarations::DeclContext;
