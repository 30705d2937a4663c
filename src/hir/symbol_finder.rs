//! Cross-file matching of declarations and definitions.
//!
//! Every query walks the snapshot in the [`FileIterationOrder`] of the file
//! the query starts from. Orders are cached for the most recently used
//! reference files and updated incrementally as the snapshot changes.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use super::file_iteration_order::{FileIterationOrder, PartMembership};
use super::lookup::{LookupContext, Symbol, SymbolKey};
use super::snapshot::Snapshot;
use crate::base::FilePath;
use crate::parser::tree::Decl;
use crate::parser::{DeclId, DeclKind};
use crate::syntax::Document;

/// Reference files whose iteration order is kept.
pub const MAX_CACHED_FILES: usize = 10;

#[derive(Debug, Default)]
pub struct SymbolFinder {
    /// Least recently used first.
    orders: IndexMap<FilePath, FileIterationOrder>,
    files_checked: usize,
}

/// What a candidate declaration must look like.
struct Wanted<'a> {
    name: &'a str,
    key: &'a SymbolKey,
    kinds: &'a [DeclKind],
    definition: bool,
    signature: Option<String>,
    arguments: usize,
}

impl SymbolFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reference files with a cached order.
    pub fn cached_files(&self) -> usize {
        self.orders.len()
    }

    pub fn is_cached(&self, reference: &FilePath) -> bool {
        self.orders.contains_key(reference)
    }

    /// Files that passed the identifier pre-filter during the last query.
    pub fn files_checked(&self) -> usize {
        self.files_checked
    }

    pub fn clear(&mut self) {
        self.orders.clear();
    }

    /// Snapshot files in search order for `reference`.
    pub fn file_iteration_order(
        &mut self,
        reference: &FilePath,
        snapshot: &Snapshot,
        parts: &dyn PartMembership,
    ) -> Vec<FilePath> {
        let index = match self.orders.get_index_of(reference) {
            Some(index) => {
                let last = self.orders.len() - 1;
                self.orders.move_index(index, last);
                last
            }
            None => {
                let order = FileIterationOrder::new(reference.clone(), parts.part_ids(reference));
                self.orders.insert(reference.clone(), order);
                while self.orders.len() > MAX_CACHED_FILES {
                    self.orders.shift_remove_index(0);
                }
                self.orders.len() - 1
            }
        };
        let Some((_, order)) = self.orders.get_index_mut(index) else {
            return Vec::new();
        };

        order.retain(|path| snapshot.contains(path));
        if order.len() != snapshot.len() {
            for path in snapshot.paths() {
                if !order.contains(path) {
                    let ids = parts.part_ids(path);
                    order.insert(path.clone(), &ids);
                }
            }
        }
        order.to_vec()
    }

    /// Definition of a function declaration.
    ///
    /// Returns the first candidate with the same qualified name and signature.
    /// Without `strict`, falls back to a candidate with the same number of
    /// arguments.
    pub fn find_matching_definition(
        &mut self,
        declaration: &Symbol,
        snapshot: &Snapshot,
        parts: &dyn PartMembership,
        strict: bool,
    ) -> Option<Symbol> {
        let (doc, declaration, decl) = source_decl(declaration, snapshot)?;
        if decl.kind != DeclKind::Function {
            return None;
        }
        if decl.flags.is_definition {
            return Some(declaration);
        }
        let wanted = Wanted {
            name: &declaration.name,
            key: &declaration.key,
            kinds: &[DeclKind::Function],
            definition: true,
            signature: Some(doc.tree().signature(declaration.decl)),
            arguments: doc.tree().argument_count(declaration.decl),
        };
        self.search(&declaration, snapshot, parts, &wanted, strict)
    }

    /// In-class (or header) declaration of a function definition.
    pub fn find_matching_declaration(
        &mut self,
        definition: &Symbol,
        snapshot: &Snapshot,
        parts: &dyn PartMembership,
    ) -> Option<Symbol> {
        let (doc, definition, decl) = source_decl(definition, snapshot)?;
        if decl.kind != DeclKind::Function || !decl.flags.is_definition {
            return None;
        }
        let wanted = Wanted {
            name: &definition.name,
            key: &definition.key,
            kinds: &[DeclKind::Function],
            definition: false,
            signature: Some(doc.tree().signature(definition.decl)),
            arguments: doc.tree().argument_count(definition.decl),
        };
        self.search(&definition, snapshot, parts, &wanted, false)
    }

    /// Out-of-class definition of a variable declaration, such as a static
    /// data member or an `extern` variable.
    pub fn find_matching_var_definition(
        &mut self,
        declaration: &Symbol,
        snapshot: &Snapshot,
        parts: &dyn PartMembership,
    ) -> Option<Symbol> {
        let (_, declaration, decl) = source_decl(declaration, snapshot)?;
        if decl.kind != DeclKind::Variable || declaration.is_local() {
            return None;
        }
        if decl.flags.is_definition {
            return Some(declaration);
        }
        let wanted = Wanted {
            name: &declaration.name,
            key: &declaration.key,
            kinds: &[DeclKind::Variable],
            definition: true,
            signature: None,
            arguments: 0,
        };
        self.search(&declaration, snapshot, parts, &wanted, true)
    }

    /// Class definition a forward declaration refers to.
    pub fn find_matching_class_declaration(
        &mut self,
        forward: &Symbol,
        snapshot: &Snapshot,
        parts: &dyn PartMembership,
    ) -> Option<Symbol> {
        if !matches!(forward.kind, DeclKind::ForwardClass | DeclKind::Class) {
            return None;
        }
        let wanted = Wanted {
            name: &forward.name,
            key: &forward.key,
            kinds: &[DeclKind::Class],
            definition: true,
            signature: None,
            arguments: 0,
        };
        self.search(forward, snapshot, parts, &wanted, true)
    }

    fn search(
        &mut self,
        origin: &Symbol,
        snapshot: &Snapshot,
        parts: &dyn PartMembership,
        wanted: &Wanted<'_>,
        strict: bool,
    ) -> Option<Symbol> {
        self.files_checked = 0;
        if wanted.name.is_empty() {
            return None;
        }
        let mut fuzzy: Option<Symbol> = None;
        for path in self.file_iteration_order(&origin.file, snapshot, parts) {
            let Some(doc) = snapshot.document(&path) else {
                continue;
            };
            if !doc.contains_identifier(wanted.name) {
                continue;
            }
            self.files_checked += 1;
            let candidates: Vec<DeclId> = doc
                .tree()
                .decls()
                .filter(|(_, d)| {
                    d.name.as_deref() == Some(wanted.name)
                        && wanted.kinds.contains(&d.kind)
                        && d.flags.is_definition == wanted.definition
                })
                .map(|(id, _)| id)
                .collect();
            if candidates.is_empty() {
                continue;
            }
            trace!(file = %path, candidates = candidates.len(), "checking candidates");

            let ctx = LookupContext::new(doc.clone(), snapshot);
            for id in candidates {
                let candidate = ctx.symbol(ctx.entity(id));
                if candidate.key != *wanted.key || same_declaration(&candidate, origin) {
                    continue;
                }
                let Some(signature) = &wanted.signature else {
                    return Some(candidate);
                };
                if doc.tree().signature(id) == *signature {
                    return Some(candidate);
                }
                if !strict
                    && fuzzy.is_none()
                    && doc.tree().argument_count(id) == wanted.arguments
                {
                    fuzzy = Some(candidate);
                }
            }
        }
        if strict { None } else { fuzzy }
    }
}

/// The symbol's declaration in `snapshot`. A symbol taken from an older
/// snapshot is re-resolved by path when its file was reparsed since.
fn source_decl(symbol: &Symbol, snapshot: &Snapshot) -> Option<(Arc<Document>, Symbol, Decl)> {
    let doc = snapshot.document(&symbol.file)?;
    if let Some(decl) = doc.tree().get(symbol.decl)
        && decl.kind == symbol.kind
        && decl.name.as_ref() == Some(&symbol.name)
    {
        let decl = decl.clone();
        return Some((doc, symbol.clone(), decl));
    }
    let current = LookupContext::new(doc, snapshot).resolve_path(&symbol.path())?;
    trace!(symbol = %symbol.name, file = %current.file, "re-resolved stale symbol");
    let doc = snapshot.document(&current.file)?;
    let decl = doc.tree().get(current.decl)?.clone();
    Some((doc, current, decl))
}

fn same_declaration(a: &Symbol, b: &Symbol) -> bool {
    a.file == b.file && a.decl == b.decl
}
