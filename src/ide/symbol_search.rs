//! Project-wide symbol search over [`IndexItem`] trees.

use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use super::symbol_index::{IndexItem, IndexItemKind, SymbolIndexBuilder, SymbolKinds};
use super::task::TaskControl;
use crate::base::{FilePath, StringTable};
use crate::syntax::Document;

/// Capacity of the result channel of a search.
pub const RESULT_BUFFER: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum SearchScope {
    #[default]
    AllFiles,
    Files(Vec<FilePath>),
}

impl SearchScope {
    /// Member set for a search, `None` when every file is in scope.
    fn file_set(&self) -> Option<FxHashSet<&FilePath>> {
        match self {
            SearchScope::AllFiles => None,
            SearchScope::Files(files) => Some(files.iter().collect()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolSearchParameters {
    pub text: String,
    pub kinds: SymbolKinds,
    pub scope: SearchScope,
    pub case_sensitive: bool,
    pub whole_words: bool,
    pub regex: bool,
}

impl SymbolSearchParameters {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kinds: SymbolKinds::ALL,
            scope: SearchScope::AllFiles,
            case_sensitive: false,
            whole_words: false,
            regex: false,
        }
    }

    pub fn with_kinds(mut self, kinds: SymbolKinds) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn whole_words(mut self, yes: bool) -> Self {
        self.whole_words = yes;
        self
    }

    pub fn regex(mut self, yes: bool) -> Self {
        self.regex = yes;
        self
    }

    /// Compile the pattern. Literal text is escaped; whole words wrap it in `\b`.
    pub fn matcher(&self) -> crate::Result<Regex> {
        let mut pattern = if self.regex {
            self.text.clone()
        } else {
            regex::escape(&self.text)
        };
        if self.whole_words {
            pattern = format!(r"\b{pattern}\b");
        }
        Ok(RegexBuilder::new(&pattern)
            .case_insensitive(!self.case_sensitive)
            .build()?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolSearchResult {
    /// Enclosing scope, `ns::Class`.
    pub scope: Arc<str>,
    pub display_text: String,
    pub item: IndexItem,
}

impl SymbolSearchResult {
    pub fn file(&self) -> &FilePath {
        &self.item.file
    }
}

/// Per-document symbol trees, rebuilt only when the document changed.
#[derive(Debug, Default)]
pub struct SymbolIndexCache {
    entries: Mutex<FxHashMap<FilePath, (Arc<Document>, SymbolKinds, Arc<IndexItem>)>>,
}

impl SymbolIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&self, strings: &StringTable, document: &Arc<Document>, kinds: SymbolKinds) -> Arc<IndexItem> {
        if let Some((doc, cached_kinds, item)) = self.entries.lock().get(document.path())
            && Arc::ptr_eq(doc, document)
            && *cached_kinds == kinds
        {
            return item.clone();
        }
        let item = Arc::new(SymbolIndexBuilder::new(strings, kinds).index_of(document, ""));
        self.entries
            .lock()
            .insert(document.path().clone(), (document.clone(), kinds, item.clone()));
        item
    }

    /// Forget documents that are no longer in use.
    pub fn retain(&self, mut keep: impl FnMut(&FilePath) -> bool) {
        self.entries.lock().retain(|path, _| keep(path));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Match `parameters` against every document, streaming results to `results`.
///
/// Runs inside a task: checks pause and cancel between documents and stops
/// early if the receiver went away.
pub fn search_documents(
    documents: &[Arc<Document>],
    parameters: &SymbolSearchParameters,
    matcher: &Regex,
    strings: &StringTable,
    cache: &SymbolIndexCache,
    control: &TaskControl,
    results: &Sender<SymbolSearchResult>,
) {
    let scope = parameters.scope.file_set();
    let candidates: Vec<&Arc<Document>> = documents
        .iter()
        .filter(|d| !d.path().is_injected())
        .filter(|d| scope.as_ref().is_none_or(|files| files.contains(d.path())))
        .collect();
    control.set_progress_range(candidates.len());
    let mut found = 0usize;

    'documents: for document in candidates {
        if !control.wait_for_resume() {
            break;
        }
        let root = cache.get_or_build(strings, document, parameters.kinds);
        let mut matches = Vec::new();
        root.visit(&mut |item| {
            if item.kind != IndexItemKind::File && matcher.is_match(&item.name) {
                matches.push(SymbolSearchResult {
                    scope: item.scope.clone(),
                    display_text: item.display_text(),
                    item: item.clone(),
                });
            }
        });
        for result in matches {
            found += 1;
            if results.send(result).is_err() {
                control.cancel();
                break 'documents;
            }
        }
        control.advance(1);
    }
    debug!(task = %control.id(), pattern = %parameters.text, found, "symbol search done");
}

/// Compile the pattern, logging and returning `None` if it is invalid.
pub(crate) fn compile(parameters: &SymbolSearchParameters) -> Option<Regex> {
    match parameters.matcher() {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!(pattern = %parameters.text, error = %err, "invalid symbol search pattern");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::hir::{Snapshot, SourceProcessor};
    use crate::project::WorkingCopy;
    use rstest::rstest;

    fn documents(files: &[(&str, &str)]) -> Vec<Arc<Document>> {
        let mut wc = WorkingCopy::new();
        for (path, contents) in files {
            wc.insert(*path, *contents, 1);
        }
        let mut processor = SourceProcessor::new(Snapshot::new(), wc);
        files
            .iter()
            .filter_map(|(path, _)| processor.run(&FilePath::new(*path)))
            .collect()
    }

    fn run(parameters: &SymbolSearchParameters, docs: &[Arc<Document>]) -> Vec<String> {
        let matcher = parameters.matcher().unwrap();
        let control = TaskControl::new("search");
        control.start();
        let (tx, rx) = crossbeam_channel::unbounded();
        search_documents(
            docs,
            parameters,
            &matcher,
            &StringTable::new(),
            &SymbolIndexCache::new(),
            &control,
            &tx,
        );
        drop(tx);
        rx.iter().map(|r| r.item.qualified_name()).collect()
    }

    fn sample() -> Vec<Arc<Document>> {
        documents(&[
            ("/p/a.cpp", "class Widget {};\nvoid widgetFactory() {}\nint count;\n"),
            ("/p/b.cpp", "namespace ui { class WidgetBox {}; }\n"),
        ])
    }

    #[rstest]
    #[case(SymbolSearchParameters::new("widget"), vec!["Widget", "widgetFactory", "ui::WidgetBox"])]
    #[case(SymbolSearchParameters::new("widget").case_sensitive(true), vec!["widgetFactory"])]
    #[case(SymbolSearchParameters::new("Widget").whole_words(true), vec!["Widget"])]
    #[case(SymbolSearchParameters::new("^W.*x$").regex(true), vec!["ui::WidgetBox"])]
    #[case(SymbolSearchParameters::new("widget").with_kinds(SymbolKinds::CLASSES), vec!["Widget", "ui::WidgetBox"])]
    #[case(
        SymbolSearchParameters::new("widget").with_scope(SearchScope::Files(vec![FilePath::new("/p/b.cpp")])),
        vec!["ui::WidgetBox"]
    )]
    fn test_search_modes(#[case] parameters: SymbolSearchParameters, #[case] expected: Vec<&str>) {
        assert_eq!(run(&parameters, &sample()), expected);
    }

    #[test]
    fn test_literal_text_is_escaped() {
        let parameters = SymbolSearchParameters::new("a.b");
        let regex = parameters.matcher().unwrap();
        assert!(regex.is_match("a.b"));
        assert!(!regex.is_match("axb"));
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let parameters = SymbolSearchParameters::new("(unclosed").regex(true);
        assert!(matches!(parameters.matcher(), Err(crate::Error::InvalidPattern(_))));
        assert!(compile(&parameters).is_none());
    }

    #[test]
    fn test_cache_reuses_unchanged_documents() {
        let strings = StringTable::new();
        let cache = SymbolIndexCache::new();
        let docs = sample();
        let first = cache.get_or_build(&strings, &docs[0], SymbolKinds::ALL);
        let second = cache.get_or_build(&strings, &docs[0], SymbolKinds::ALL);
        assert!(Arc::ptr_eq(&first, &second));
        let classes = cache.get_or_build(&strings, &docs[0], SymbolKinds::CLASSES);
        assert!(!Arc::ptr_eq(&first, &classes));

        cache.retain(|p| p.as_str() != "/p/a.cpp");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_scope_of_many_files() {
        let mut files: Vec<FilePath> = (0..500).map(|i| FilePath::new(format!("/q/f{i}.cpp"))).collect();
        files.push(FilePath::new("/p/a.cpp"));
        let parameters = SymbolSearchParameters::new("widget").with_scope(SearchScope::Files(files));
        assert_eq!(run(&parameters, &sample()), vec!["Widget", "widgetFactory"]);
    }

    fn many_documents(count: usize) -> Vec<Arc<Document>> {
        let files: Vec<(String, String)> = (0..count)
            .map(|i| (format!("/p/w{i:03}.cpp"), format!("void widget{i}() {{}}\n")))
            .collect();
        let borrowed: Vec<(&str, &str)> = files.iter().map(|(p, s)| (p.as_str(), s.as_str())).collect();
        documents(&borrowed)
    }

    #[test]
    fn test_paused_search_makes_no_progress() {
        let docs = many_documents(5);
        let parameters = SymbolSearchParameters::new("widget");
        let matcher = parameters.matcher().unwrap();
        let control = TaskControl::new("search");
        control.start();
        control.pause();
        let (tx, rx) = crossbeam_channel::unbounded();

        let worker_control = control.clone();
        let worker = std::thread::spawn(move || {
            search_documents(
                &docs,
                &parameters,
                &matcher,
                &StringTable::new(),
                &SymbolIndexCache::new(),
                &worker_control,
                &tx,
            );
        });
        std::thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(control.progress(), (0, 5));
        assert!(rx.try_recv().is_err());

        control.resume();
        worker.join().unwrap();
        assert_eq!(rx.try_iter().count(), 5);
        assert_eq!(control.progress(), (5, 5));
    }

    #[test]
    fn test_canceled_search_keeps_partial_results() {
        let docs = many_documents(20);
        let parameters = SymbolSearchParameters::new("widget");
        let matcher = parameters.matcher().unwrap();
        let control = TaskControl::new("search");
        control.start();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let worker_control = control.clone();
        let worker = std::thread::spawn(move || {
            search_documents(
                &docs,
                &parameters,
                &matcher,
                &StringTable::new(),
                &SymbolIndexCache::new(),
                &worker_control,
                &tx,
            );
        });
        let first = rx.recv().unwrap();
        assert_eq!(first.item.qualified_name(), "widget0");
        control.cancel();
        let rest = rx.iter().count();
        worker.join().unwrap();

        assert!(rest < 19);
        assert!(control.progress().0 < 20);
        assert_eq!(control.finish(), crate::ide::task::TaskState::Canceled);
    }
}
