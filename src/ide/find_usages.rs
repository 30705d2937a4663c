//! Find usages and rename.
//!
//! A search runs as one pool task: a parallel map over the candidate files
//! (identifier pre-filter, then bind, then collect) whose results stream back
//! over a bounded channel as each file finishes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::bounded;
use rayon::prelude::*;
use tracing::{debug, info};

use super::pool::WorkerPool;
use super::symbol_search::RESULT_BUFFER;
use super::task::{SearchHandle, TaskControl, TaskHandle, TaskState};
use crate::base::{FilePath, Position};
use crate::hir::{LookupContext, Snapshot, Symbol, SymbolKey, SymbolPath};
use crate::parser::DeclKind;
use crate::parser::preprocessor::Macro;
use crate::project::WorkingCopy;
use crate::project::file_loader;
use crate::syntax::Document;
use crate::{Error, Result};

/// One occurrence of the searched symbol or macro.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Usage {
    pub file: FilePath,
    /// 0-based.
    pub line: u32,
    /// 0-based.
    pub column: u32,
    pub length: u32,
    /// Text of the occurrence as written.
    pub matched_text: String,
    /// The whole source line, for display.
    pub line_text: String,
    /// The occurrence declares or defines the symbol.
    pub is_declaration: bool,
}

/// Replacement of one usage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub file: FilePath,
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub replacement: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UsageSearchStats {
    /// Files considered.
    pub candidates: usize,
    /// Files that passed the identifier pre-filter and were bound.
    pub bound: usize,
    /// Files of those that were re-preprocessed from the working copy.
    pub reparsed: usize,
}

#[derive(Debug, Default)]
struct Counters {
    candidates: AtomicUsize,
    bound: AtomicUsize,
    reparsed: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> UsageSearchStats {
        UsageSearchStats {
            candidates: self.candidates.load(Ordering::Relaxed),
            bound: self.bound.load(Ordering::Relaxed),
            reparsed: self.reparsed.load(Ordering::Relaxed),
        }
    }
}

/// A running usage search.
#[derive(Debug)]
pub struct UsageSearch {
    handle: SearchHandle<Usage>,
    counters: Arc<Counters>,
    symbol: Option<SymbolPath>,
    replacement: Option<String>,
}

/// Everything a finished search produced, sorted by location.
#[derive(Clone, Debug)]
pub struct UsageReport {
    pub usages: Vec<Usage>,
    pub state: TaskState,
    pub stats: UsageSearchStats,
    pub replacement: Option<String>,
}

impl UsageSearch {
    pub fn task(&self) -> &TaskHandle {
        self.handle.task()
    }

    /// Next usage as it arrives; `None` when the search is over.
    pub fn next_result(&self) -> Option<Usage> {
        self.handle.next_result()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn pause(&self) {
        self.handle.pause();
    }

    pub fn resume(&self) {
        self.handle.resume();
    }

    pub fn stats(&self) -> UsageSearchStats {
        self.counters.snapshot()
    }

    /// Address of the searched symbol, for searching again later.
    pub fn symbol_path(&self) -> Option<&SymbolPath> {
        self.symbol.as_ref()
    }

    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }

    /// Wait for the search and gather its results.
    pub fn finish(self) -> UsageReport {
        let (mut usages, state) = self.handle.collect();
        usages.sort();
        usages.dedup();
        UsageReport {
            usages,
            state,
            stats: self.counters.snapshot(),
            replacement: self.replacement,
        }
    }
}

impl UsageReport {
    pub fn is_canceled(&self) -> bool {
        self.state == TaskState::Canceled
    }

    pub fn files(&self) -> Vec<&FilePath> {
        let mut files: Vec<&FilePath> = self.usages.iter().map(|u| &u.file).collect();
        files.dedup();
        files
    }

    /// Edits replacing every usage, empty unless this was a rename.
    pub fn staged_edits(&self) -> Vec<TextEdit> {
        match &self.replacement {
            Some(replacement) => staged_edits(&self.usages, replacement),
            None => Vec::new(),
        }
    }
}

/// Edits for `usages`, grouped by file and ordered last-to-first within a
/// file so they can be applied in sequence.
pub fn staged_edits(usages: &[Usage], replacement: &str) -> Vec<TextEdit> {
    let mut edits: Vec<TextEdit> = usages
        .iter()
        .map(|u| TextEdit {
            file: u.file.clone(),
            line: u.line,
            column: u.column,
            length: u.length,
            replacement: replacement.to_string(),
        })
        .collect();
    edits.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then_with(|| (b.line, b.column).cmp(&(a.line, a.column)))
    });
    edits.dedup_by(|a, b| a.file == b.file && a.line == b.line && a.column == b.column);
    edits
}

/// Apply the edits of one file to its text. Edits must not overlap.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> String {
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by(|a, b| (b.line, b.column).cmp(&(a.line, a.column)));
    let mut text = source.to_string();
    for edit in ordered {
        let Some(&start) = line_starts.get(edit.line as usize) else {
            continue;
        };
        let from = start + edit.column as usize;
        let to = from + edit.length as usize;
        if to <= text.len() && text.is_char_boundary(from) && text.is_char_boundary(to) {
            text.replace_range(from..to, &edit.replacement);
        }
    }
    text
}

/// Whether `text` can replace an identifier.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || unicode_ident::is_xid_start(c))
        && chars.all(unicode_ident::is_xid_continue)
}

fn validate_replacement(replacement: &str) -> Result<()> {
    if is_identifier(replacement) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(replacement.to_string()))
    }
}

/// Symbols whose usages can appear in files without an include edge to the
/// declaring file: classes, forward declarations and non-static symbols at
/// namespace scope.
fn is_externally_linkable(symbol: &Symbol, snapshot: &Snapshot) -> bool {
    if symbol.is_local() || symbol.internal {
        return false;
    }
    if matches!(symbol.kind, DeclKind::Class | DeclKind::ForwardClass) {
        return true;
    }
    let Some(doc) = snapshot.document(&symbol.file) else {
        return false;
    };
    let tree = doc.tree();
    if symbol.decl.index() >= tree.decl_count() {
        return false;
    }
    let decl = tree.decl(symbol.decl);
    !decl.flags.is_static
        && decl
            .parent
            .is_none_or(|p| tree.decl(p).kind == DeclKind::Namespace)
}

fn candidate_files(symbol: &Symbol, snapshot: &Snapshot) -> Vec<FilePath> {
    let mut files = if is_externally_linkable(symbol, snapshot) {
        snapshot.sorted_paths()
    } else {
        let mut files = vec![symbol.file.clone()];
        files.extend(snapshot.files_depending_on(&symbol.file));
        files
    };
    files.retain(|p| !p.is_injected());
    files.sort();
    files.dedup();
    files
}

/// The document to search in `path`: the snapshot's, or a fresh one if the
/// working copy holds a different revision.
fn bound_document(
    path: &FilePath,
    snapshot: &Snapshot,
    working_copy: &WorkingCopy,
    counters: &Counters,
) -> Option<Arc<Document>> {
    let doc = snapshot.document(path)?;
    match working_copy.get(path) {
        Some((text, revision)) if revision != doc.revision() => {
            counters.reparsed.fetch_add(1, Ordering::Relaxed);
            Some(snapshot.preprocessed_document(&text, path, doc.features(), revision))
        }
        _ => Some(doc),
    }
}

fn source_text(doc: &Document, working_copy: &WorkingCopy) -> Option<Arc<str>> {
    working_copy
        .source(doc.path())
        .or_else(|| doc.source().cloned())
        .or_else(|| file_loader::read_file(doc.path(), None).ok().map(Arc::from))
}

fn line_text(source: Option<&str>, line: u32) -> String {
    source
        .and_then(|s| s.lines().nth(line as usize))
        .unwrap_or_default()
        .to_string()
}

fn usage(
    doc: &Document,
    source: Option<&str>,
    position: Position,
    length: u32,
    is_declaration: bool,
) -> Usage {
    let line_text = line_text(source, position.line);
    let start = position.column as usize;
    let matched_text = line_text
        .get(start..start + length as usize)
        .unwrap_or_default()
        .to_string();
    Usage {
        file: doc.path().clone(),
        line: position.line,
        column: position.column,
        length,
        matched_text,
        line_text,
        is_declaration,
    }
}

/// Occurrences of the symbol identified by `key` in one bound document.
fn symbol_usages_in(
    doc: Arc<Document>,
    snapshot: &Snapshot,
    working_copy: &WorkingCopy,
    name: &str,
    key: &SymbolKey,
    is_class: bool,
) -> Vec<Usage> {
    let ctx = LookupContext::new(doc.clone(), snapshot);
    let tree = doc.tree();
    let mut sites: Vec<(Position, u32, bool)> = Vec::new();

    for (id, r) in tree.refs() {
        if r.generated || r.name.as_str() != name {
            continue;
        }
        if ctx
            .resolve_through_usings(id)
            .iter()
            .any(|&e| ctx.key(e) == *key)
        {
            sites.push((r.position, r.len, false));
        }
    }

    let class_name = key.qualified_name();
    for (id, decl) in tree.decls() {
        if decl.generated
            || matches!(decl.kind, DeclKind::UsingDirective | DeclKind::UsingDeclaration)
        {
            continue;
        }
        let Some(decl_name) = decl.name.as_deref() else {
            continue;
        };
        if decl_name == name {
            if decl.flags.is_constructor && is_class {
                let ctor_key = ctx.key(ctx.entity(id));
                if ctor_key.qualified_name().map(crate::hir::parent_scope) == class_name {
                    sites.push((decl.position, decl.len, true));
                }
            } else if ctx.key(ctx.entity(id)) == *key {
                sites.push((decl.position, decl.len, true));
            }
        } else if is_class
            && decl.flags.is_destructor
            && decl_name.strip_prefix('~') == Some(name)
        {
            let dtor_key = ctx.key(ctx.entity(id));
            if dtor_key.qualified_name().map(crate::hir::parent_scope) == class_name {
                let position = Position::new(decl.position.line, decl.position.column + 1);
                sites.push((position, decl.len.saturating_sub(1), true));
            }
        }
    }

    if sites.is_empty() {
        return Vec::new();
    }
    let source = source_text(&doc, working_copy);
    sites.sort();
    sites.dedup_by(|a, b| a.0 == b.0);
    sites
        .into_iter()
        .map(|(position, len, decl)| usage(&doc, source.as_deref(), position, len, decl))
        .collect()
}

/// Uses of the macro defined at `definition` in one bound document.
fn macro_usages_in(doc: &Document, working_copy: &WorkingCopy, definition: &Macro) -> Vec<Usage> {
    let mut sites: Vec<(Position, u32, bool)> = doc
        .macro_uses()
        .iter()
        .filter(|u| {
            u.macro_def.name == definition.name
                && u.macro_def.file == definition.file
                && u.macro_def.position == definition.position
        })
        .map(|u| (u.position, u.len, false))
        .collect();
    if doc.path() == &definition.file {
        sites.push((definition.position, definition.name.len() as u32, true));
    }
    if sites.is_empty() {
        return Vec::new();
    }
    let source = source_text(doc, working_copy);
    sites.sort();
    sites.dedup_by(|a, b| a.0 == b.0);
    sites
        .into_iter()
        .map(|(position, len, decl)| usage(doc, source.as_deref(), position, len, decl))
        .collect()
}

/// Run `map` over `candidates` in parallel under one task.
fn spawn_search(
    pool: &WorkerPool,
    name: &str,
    candidates: Vec<FilePath>,
    identifier: String,
    snapshot: Snapshot,
    working_copy: WorkingCopy,
    map: impl Fn(Arc<Document>, &Snapshot, &WorkingCopy) -> Vec<Usage> + Send + Sync + 'static,
) -> (SearchHandle<Usage>, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    counters.candidates.store(candidates.len(), Ordering::Relaxed);
    let (tx, rx) = bounded(RESULT_BUFFER);
    let control = TaskControl::new(name);
    control.set_progress_range(candidates.len());

    let task_counters = counters.clone();
    let handle = pool.spawn(control, move |control| {
        debug!(task = %control.id(), candidates = candidates.len(), identifier = %identifier, "usage search started");
        candidates.par_iter().for_each_with(tx, |tx, path| {
            if !control.wait_for_resume() {
                return;
            }
            let Some(doc) = snapshot.document(path) else {
                control.advance(1);
                return;
            };
            if !doc.contains_identifier(&identifier) {
                control.advance(1);
                return;
            }
            let Some(doc) = bound_document(path, &snapshot, &working_copy, &task_counters) else {
                control.advance(1);
                return;
            };
            task_counters.bound.fetch_add(1, Ordering::Relaxed);
            for found in map(doc, &snapshot, &working_copy) {
                if tx.send(found).is_err() {
                    control.cancel();
                    return;
                }
            }
            control.advance(1);
        });
        let stats = task_counters.snapshot();
        info!(
            task = %control.id(),
            candidates = stats.candidates,
            bound = stats.bound,
            canceled = control.is_canceled(),
            "usage search finished"
        );
    });
    (SearchHandle::new(handle, rx), counters)
}

/// Search every usage of `symbol`.
pub fn find_usages(pool: &WorkerPool, symbol: &Symbol, snapshot: Snapshot, working_copy: WorkingCopy) -> UsageSearch {
    start_symbol_search(pool, symbol, snapshot, working_copy, None)
}

/// Like [`find_usages`], staging `replacement` for every usage.
pub fn rename_usages(
    pool: &WorkerPool,
    symbol: &Symbol,
    snapshot: Snapshot,
    working_copy: WorkingCopy,
    replacement: &str,
) -> Result<UsageSearch> {
    validate_replacement(replacement)?;
    Ok(start_symbol_search(
        pool,
        symbol,
        snapshot,
        working_copy,
        Some(replacement.to_string()),
    ))
}

/// Resolve `path` in `snapshot` again and search its usages.
pub fn search_again(
    pool: &WorkerPool,
    path: &SymbolPath,
    snapshot: Snapshot,
    working_copy: WorkingCopy,
    replacement: Option<&str>,
) -> Option<UsageSearch> {
    let doc = snapshot.document(path.file())?;
    let symbol = LookupContext::new(doc, &snapshot).resolve_path(path)?;
    Some(start_symbol_search(
        pool,
        &symbol,
        snapshot,
        working_copy,
        replacement.map(str::to_string),
    ))
}

fn start_symbol_search(
    pool: &WorkerPool,
    symbol: &Symbol,
    snapshot: Snapshot,
    working_copy: WorkingCopy,
    replacement: Option<String>,
) -> UsageSearch {
    let candidates = candidate_files(symbol, &snapshot);
    let name = symbol.name.to_string();
    let key = symbol.key.clone();
    let is_class = matches!(symbol.kind, DeclKind::Class | DeclKind::ForwardClass);
    let map_name = name.clone();
    let (handle, counters) = spawn_search(
        pool,
        "find usages",
        candidates,
        name,
        snapshot,
        working_copy,
        move |doc, snapshot, working_copy| {
            symbol_usages_in(doc, snapshot, working_copy, &map_name, &key, is_class)
        },
    );
    UsageSearch {
        handle,
        counters,
        symbol: Some(symbol.path()),
        replacement,
    }
}

/// Search every use of a macro, including its definition.
pub fn find_macro_usages(
    pool: &WorkerPool,
    definition: &Macro,
    snapshot: Snapshot,
    working_copy: WorkingCopy,
) -> UsageSearch {
    start_macro_search(pool, definition, snapshot, working_copy, None)
}

pub fn rename_macro_usages(
    pool: &WorkerPool,
    definition: &Macro,
    snapshot: Snapshot,
    working_copy: WorkingCopy,
    replacement: &str,
) -> Result<UsageSearch> {
    validate_replacement(replacement)?;
    Ok(start_macro_search(
        pool,
        definition,
        snapshot,
        working_copy,
        Some(replacement.to_string()),
    ))
}

fn start_macro_search(
    pool: &WorkerPool,
    definition: &Macro,
    snapshot: Snapshot,
    working_copy: WorkingCopy,
    replacement: Option<String>,
) -> UsageSearch {
    // injected files are implicitly in front of every file
    let mut candidates = if definition.file.is_injected() {
        snapshot.sorted_paths()
    } else {
        let mut files = vec![definition.file.clone()];
        files.extend(snapshot.files_depending_on(&definition.file));
        files
    };
    candidates.retain(|p| !p.is_injected());
    candidates.sort();
    candidates.dedup();

    let definition = definition.clone();
    let (handle, counters) = spawn_search(
        pool,
        "find macro usages",
        candidates,
        definition.name.to_string(),
        snapshot,
        working_copy,
        move |doc, _snapshot, working_copy| macro_usages_in(&doc, working_copy, &definition),
    );
    UsageSearch {
        handle,
        counters,
        symbol: None,
        replacement,
    }
}

#[cfg(test)]
mod tests;
