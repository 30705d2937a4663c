//! Point-in-time view of every processed document.
//!
//! A [`Snapshot`] is a reference-counted map from path to [`Document`].
//! Cloning is a pointer copy; the first mutation of a shared snapshot copies
//! the map (not the documents), so handles taken earlier never observe later
//! changes.

use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::base::FilePath;
use crate::parser::preprocessor::{Environment, Include, IncludeOutcome, IncludeRequest, PreprocessorClient, preprocess};
use crate::project::LanguageFeatures;
use crate::syntax::{Document, DocumentOrigin};

/// Immutable-per-handle mapping from path to document.
#[derive(Clone, Default)]
pub struct Snapshot {
    documents: Arc<FxHashMap<FilePath, Arc<Document>>>,
    /// Include graph, built on first use and dropped on mutation.
    dependencies: Arc<OnceLock<DependencyTable>>,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("documents", &self.documents.len())
            .finish()
    }
}

#[derive(Debug, Default)]
struct DependencyTable {
    includes: FxHashMap<FilePath, Vec<FilePath>>,
    included_by: FxHashMap<FilePath, Vec<FilePath>>,
}

impl DependencyTable {
    fn build(documents: &FxHashMap<FilePath, Arc<Document>>) -> Self {
        let mut table = DependencyTable::default();
        for (path, doc) in documents {
            let mut targets: Vec<FilePath> = doc.resolved_includes().cloned().collect();
            targets.sort();
            targets.dedup();
            for target in &targets {
                table
                    .included_by
                    .entry(target.clone())
                    .or_default()
                    .push(path.clone());
            }
            table.includes.insert(path.clone(), targets);
        }
        table
    }

    fn walk(edges: &FxHashMap<FilePath, Vec<FilePath>>, start: &FilePath) -> Vec<FilePath> {
        let mut seen: FxHashSet<&FilePath> = FxHashSet::default();
        let mut queue: VecDeque<&FilePath> = VecDeque::new();
        queue.push_back(start);
        seen.insert(start);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            for next in edges.get(current).into_iter().flatten() {
                if seen.insert(next) {
                    out.push(next.clone());
                    queue.push_back(next);
                }
            }
        }
        out.sort();
        out
    }
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn contains(&self, path: &FilePath) -> bool {
        self.documents.contains_key(path)
    }

    pub fn document(&self, path: &FilePath) -> Option<Arc<Document>> {
        self.documents.get(path).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FilePath, &Arc<Document>)> {
        self.documents.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &FilePath> {
        self.documents.keys()
    }

    /// Paths in sorted order.
    pub fn sorted_paths(&self) -> Vec<FilePath> {
        let mut paths: Vec<FilePath> = self.documents.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Whether both handles share the same map.
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.documents, &other.documents)
    }

    fn documents_mut(&mut self) -> &mut FxHashMap<FilePath, Arc<Document>> {
        self.dependencies = Arc::new(OnceLock::new());
        Arc::make_mut(&mut self.documents)
    }

    /// Insert or replace `doc`. A document with a non-zero revision older than
    /// the stored one is rejected. Returns whether the snapshot changed.
    pub fn insert(&mut self, doc: Arc<Document>) -> bool {
        if let Some(existing) = self.documents.get(doc.path()) {
            if Arc::ptr_eq(existing, &doc) {
                return false;
            }
            if doc.revision() != 0 && doc.revision() < existing.revision() {
                tracing::trace!(
                    path = %doc.path(),
                    stale = doc.revision(),
                    current = existing.revision(),
                    "rejecting stale document"
                );
                return false;
            }
        }
        let path = doc.path().clone();
        self.documents_mut().insert(path, doc);
        true
    }

    pub fn remove(&mut self, path: &FilePath) -> Option<Arc<Document>> {
        if !self.documents.contains_key(path) {
            return None;
        }
        self.documents_mut().remove(path)
    }

    /// Copy every document of `other` into this snapshot, honouring revisions.
    pub fn merge(&mut self, other: &Snapshot) {
        for doc in other.documents.values() {
            self.insert(doc.clone());
        }
    }

    /// Keep only documents whose path satisfies `keep`. Returns removed paths.
    pub fn retain(&mut self, mut keep: impl FnMut(&FilePath) -> bool) -> Vec<FilePath> {
        let mut removed: Vec<FilePath> = self
            .documents
            .keys()
            .filter(|p| !keep(*p))
            .cloned()
            .collect();
        if removed.is_empty() {
            return removed;
        }
        let documents = self.documents_mut();
        for path in &removed {
            documents.remove(path);
        }
        removed.sort();
        removed
    }

    fn dependency_table(&self) -> &DependencyTable {
        self.dependencies
            .get_or_init(|| DependencyTable::build(&self.documents))
    }

    /// Files that include `path`, directly or transitively.
    pub fn files_depending_on(&self, path: &FilePath) -> Vec<FilePath> {
        DependencyTable::walk(&self.dependency_table().included_by, path)
    }

    /// Files included by `path`, directly or transitively.
    pub fn all_includes_of(&self, path: &FilePath) -> Vec<FilePath> {
        DependencyTable::walk(&self.dependency_table().includes, path)
    }

    /// Re-preprocess `source` as `path` without recursing into includes. The
    /// macro environment is seeded from the injected files and from the
    /// snapshot documents of whatever the source includes.
    pub fn preprocessed_document(
        &self,
        source: &str,
        path: &FilePath,
        features: LanguageFeatures,
        revision: u32,
    ) -> Arc<Document> {
        let mut env = Environment::new();
        let mut client = SnapshotIncludes {
            snapshot: self,
            merged: FxHashSet::default(),
            previous: self.document(path),
        };
        let mut injected: Vec<&Arc<Document>> = self
            .documents
            .iter()
            .filter(|(p, _)| p.is_injected())
            .map(|(_, d)| d)
            .collect();
        injected.sort_by(|a, b| a.path().cmp(b.path()));
        for doc in injected {
            client.merge(&mut env, doc.path());
        }
        let preprocessed = preprocess(path, source, &mut env, &mut client);
        Arc::new(Document::new(
            path.clone(),
            preprocessed,
            features,
            DocumentOrigin {
                revision,
                source: Some(Arc::from(source)),
                last_modified: None,
            },
        ))
    }
}

/// Resolves includes against the snapshot only, using the include lines the
/// stored document recorded.
struct SnapshotIncludes<'a> {
    snapshot: &'a Snapshot,
    merged: FxHashSet<FilePath>,
    previous: Option<Arc<Document>>,
}

impl SnapshotIncludes<'_> {
    fn merge(&mut self, env: &mut Environment, path: &FilePath) {
        if !self.merged.insert(path.clone()) {
            return;
        }
        let Some(doc) = self.snapshot.document(path) else {
            return;
        };
        for include in doc.resolved_includes() {
            self.merge(env, include);
        }
        env.add_macros(doc.defined_macros());
    }

    fn lookup(&self, request: &IncludeRequest<'_>) -> Option<FilePath> {
        let previous = self.previous.as_ref()?;
        let matches = |inc: &&Include| inc.spelled == request.spelled && inc.kind == request.kind;
        let includes = previous.includes();
        includes
            .iter()
            .filter(matches)
            .find(|inc| inc.line == request.line)
            .or_else(|| includes.iter().find(matches))
            .and_then(|inc| inc.resolved.clone())
    }
}

impl PreprocessorClient for SnapshotIncludes<'_> {
    fn source_needed(
        &mut self,
        env: &mut Environment,
        request: &IncludeRequest<'_>,
    ) -> IncludeOutcome {
        let resolved = self.lookup(request).or_else(|| {
            let sibling = request.including_file.sibling(request.spelled);
            self.snapshot.contains(&sibling).then_some(sibling)
        });
        match resolved {
            Some(path) => {
                self.merge(env, &path);
                IncludeOutcome::Resolved(path)
            }
            None => IncludeOutcome::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::preprocessor::{NoIncludes, PreprocessedFile};

    fn doc(path: &str, revision: u32, includes: &[&str]) -> Arc<Document> {
        let mut pp = PreprocessedFile::default();
        for (line, inc) in includes.iter().enumerate() {
            pp.includes.push(Include {
                spelled: (*inc).into(),
                resolved: Some(FilePath::new(inc)),
                line: line as u32,
                kind: crate::parser::IncludeKind::Local,
            });
        }
        Arc::new(Document::new(
            FilePath::new(path),
            pp,
            LanguageFeatures::cxx(),
            DocumentOrigin {
                revision,
                ..DocumentOrigin::default()
            },
        ))
    }

    #[test]
    fn test_revision_monotonicity() {
        let mut snapshot = Snapshot::new();
        assert!(snapshot.insert(doc("/p/x.h", 5, &[])));
        assert!(!snapshot.insert(doc("/p/x.h", 3, &[])));
        let path = FilePath::new("/p/x.h");
        assert_eq!(snapshot.document(&path).unwrap().revision(), 5);
        assert!(snapshot.insert(doc("/p/x.h", 0, &[])));
        assert_eq!(snapshot.document(&path).unwrap().revision(), 0);
    }

    #[test]
    fn test_handles_are_point_in_time() {
        let mut live = Snapshot::new();
        live.insert(doc("/p/a.cpp", 0, &[]));
        let taken = live.clone();
        live.insert(doc("/p/b.cpp", 0, &[]));
        live.remove(&FilePath::new("/p/a.cpp"));
        assert_eq!(taken.len(), 1);
        assert!(taken.contains(&FilePath::new("/p/a.cpp")));
        assert!(!taken.contains(&FilePath::new("/p/b.cpp")));
    }

    #[test]
    fn test_dependency_queries() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(doc("/p/main.cpp", 0, &["/p/a.h"]));
        snapshot.insert(doc("/p/a.h", 0, &["/p/b.h"]));
        snapshot.insert(doc("/p/b.h", 0, &[]));
        snapshot.insert(doc("/p/other.cpp", 0, &["/p/b.h"]));

        let b = FilePath::new("/p/b.h");
        assert_eq!(
            snapshot.files_depending_on(&b),
            vec![
                FilePath::new("/p/a.h"),
                FilePath::new("/p/main.cpp"),
                FilePath::new("/p/other.cpp")
            ]
        );
        assert_eq!(
            snapshot.all_includes_of(&FilePath::new("/p/main.cpp")),
            vec![FilePath::new("/p/a.h"), b.clone()]
        );

        snapshot.remove(&FilePath::new("/p/other.cpp"));
        assert_eq!(snapshot.files_depending_on(&b).len(), 2);
    }

    #[test]
    fn test_retain_reports_removed() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(doc("/p/a.cpp", 0, &[]));
        snapshot.insert(doc("/p/b.cpp", 0, &[]));
        let removed = snapshot.retain(|p| p.as_str() == "/p/a.cpp");
        assert_eq!(removed, vec![FilePath::new("/p/b.cpp")]);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_preprocessed_document_sees_included_macros() {
        let header_path = FilePath::new("/p/a.h");
        let mut env = Environment::new();
        let pp = preprocess(&header_path, "#define VALUE 42\n", &mut env, &mut NoIncludes);
        let header = Arc::new(Document::new(
            header_path,
            pp,
            LanguageFeatures::cxx(),
            DocumentOrigin::default(),
        ));
        let mut snapshot = Snapshot::new();
        snapshot.insert(header);

        let doc = snapshot.preprocessed_document(
            "#include \"a.h\"\nint x = VALUE;\n",
            &FilePath::new("/p/main.cpp"),
            LanguageFeatures::cxx(),
            2,
        );
        assert_eq!(doc.macro_uses().len(), 1);
        assert_eq!(doc.revision(), 2);
        assert!(doc.source().is_some());
        assert_eq!(doc.resolved_includes().count(), 1);
    }
}
