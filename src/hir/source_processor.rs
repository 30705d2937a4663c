//! Turns files into documents.
//!
//! A [`SourceProcessor`] owns a private copy of the snapshot and a macro
//! environment. Running it on a file preprocesses the file, following
//! includes recursively: an include that is already in the private snapshot
//! only contributes its macros, anything else is read (working copy first,
//! then disk) and processed in turn.

use std::sync::Arc;
use std::time::SystemTime;

use rustc_hash::{FxHashMap, FxHashSet};

use super::snapshot::Snapshot;
use crate::base::FilePath;
use crate::parser::preprocessor::{
    Environment, IncludeKind, IncludeOutcome, IncludeRequest, PreprocessorClient, preprocess,
};
use crate::project::{
    HeaderPath, HeaderPathKind, LanguageFeatures, ProjectMacro, Settings, WorkingCopy,
    configuration_path, configuration_source, defines_text, file_loader,
};
use crate::syntax::{Document, DocumentOrigin};

/// Includes nested deeper than this are not followed.
pub const MAX_INCLUDE_DEPTH: u32 = 200;

/// Called for every document that was produced (not reused).
pub type DocumentCallback = Arc<dyn Fn(&Arc<Document>) + Send + Sync>;

/// Counters for one processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    /// Documents built from source.
    pub parsed: usize,
    /// Documents whose fingerprint matched the global snapshot and were reused.
    pub reused: usize,
    /// Files skipped for exceeding the size limit.
    pub too_large: usize,
}

enum Processed {
    Document(Arc<Document>),
    TooLarge,
    Unreadable,
}

struct Source {
    text: Arc<str>,
    revision: u32,
    from_working_copy: bool,
    last_modified: Option<SystemTime>,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct IncludeKey {
    kind: IncludeKind,
    directory: Arc<str>,
    spelled: Arc<str>,
}

pub struct SourceProcessor {
    global: Snapshot,
    snapshot: Snapshot,
    working_copy: WorkingCopy,
    header_paths: Vec<HeaderPath>,
    features: LanguageFeatures,
    file_size_limit_mb: Option<u32>,
    env: Environment,
    /// Files whose macros are in `env`.
    processed: FxHashSet<FilePath>,
    todo: FxHashSet<FilePath>,
    include_cache: FxHashMap<IncludeKey, Option<FilePath>>,
    depth: u32,
    on_document: Option<DocumentCallback>,
    stats: ProcessorStats,
}

impl SourceProcessor {
    pub fn new(global: Snapshot, working_copy: WorkingCopy) -> Self {
        Self {
            snapshot: global.clone(),
            global,
            working_copy,
            header_paths: Vec::new(),
            features: LanguageFeatures::default(),
            file_size_limit_mb: Settings::default().file_size_limit_mb,
            env: Environment::new(),
            processed: FxHashSet::default(),
            todo: FxHashSet::default(),
            include_cache: FxHashMap::default(),
            depth: 0,
            on_document: None,
            stats: ProcessorStats::default(),
        }
    }

    pub fn set_header_paths(&mut self, header_paths: Vec<HeaderPath>) {
        if header_paths != self.header_paths {
            self.header_paths = header_paths;
            self.include_cache.clear();
        }
    }

    pub fn set_language_features(&mut self, features: LanguageFeatures) {
        self.features = features;
    }

    pub fn set_file_size_limit(&mut self, limit_mb: Option<u32>) {
        self.file_size_limit_mb = limit_mb;
    }

    pub fn set_document_callback(&mut self, callback: DocumentCallback) {
        self.on_document = Some(callback);
    }

    /// Files that must be reparsed even though the snapshot has them.
    pub fn set_todo(&mut self, files: impl IntoIterator<Item = FilePath>) {
        self.todo = files.into_iter().collect();
        for path in &self.todo {
            self.snapshot.remove(path);
        }
    }

    pub fn todo_len(&self) -> usize {
        self.todo.len()
    }

    /// Forget every macro, as if starting a new translation unit.
    pub fn reset_environment(&mut self) {
        self.env.reset();
        self.processed.clear();
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn stats(&self) -> ProcessorStats {
        self.stats
    }

    /// Process `path` in the current environment. Returns `None` when the
    /// file could not be read or is above the size limit.
    pub fn run(&mut self, path: &FilePath) -> Option<Arc<Document>> {
        let mut env = std::mem::take(&mut self.env);
        let result = if self.processed.contains(path) {
            self.snapshot.document(path)
        } else if self.snapshot.contains(path) && !self.todo.contains(path) {
            self.merge_environment(&mut env, path);
            self.snapshot.document(path)
        } else {
            match self.process_file(&mut env, path) {
                Processed::Document(doc) => Some(doc),
                Processed::TooLarge | Processed::Unreadable => None,
            }
        };
        self.env = env;
        result
    }

    fn process_file(&mut self, env: &mut Environment, path: &FilePath) -> Processed {
        let source = match self.read_source(path) {
            Ok(Some(source)) => source,
            Ok(None) => {
                self.stats.too_large += 1;
                self.todo.remove(path);
                return Processed::TooLarge;
            }
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "could not read file");
                self.todo.remove(path);
                return Processed::Unreadable;
            }
        };

        self.processed.insert(path.clone());
        self.depth += 1;
        let preprocessed = preprocess(path, &source.text, env, self);
        self.depth -= 1;

        let doc = Document::new(
            path.clone(),
            preprocessed,
            self.features,
            DocumentOrigin {
                revision: source.revision,
                source: source.from_working_copy.then(|| source.text.clone()),
                last_modified: source.last_modified,
            },
        );

        let reusable = self.global.document(path).filter(|old| {
            old.fingerprint() == doc.fingerprint()
                && old.features() == doc.features()
                && old.revision() == doc.revision()
                && old.last_modified() == doc.last_modified()
        });
        let doc = match reusable {
            Some(old) => {
                tracing::trace!(path = %path, "fingerprint unchanged, reusing document");
                self.stats.reused += 1;
                old
            }
            None => {
                tracing::debug!(
                    path = %path,
                    revision = doc.revision(),
                    diagnostics = doc.diagnostics().len(),
                    "processed"
                );
                self.stats.parsed += 1;
                let doc = Arc::new(doc);
                if let Some(callback) = &self.on_document {
                    callback(&doc);
                }
                doc
            }
        };
        self.snapshot.insert(doc.clone());
        self.todo.remove(path);
        Processed::Document(doc)
    }

    /// Content for `path`: working copy first, then disk. `Ok(None)` means the
    /// file is above the size limit.
    fn read_source(&self, path: &FilePath) -> crate::Result<Option<Source>> {
        if let Some((text, revision)) = self.working_copy.get(path) {
            return Ok(Some(Source {
                text,
                revision,
                from_working_copy: true,
                last_modified: None,
            }));
        }
        match file_loader::read_file(path, self.file_size_limit_mb) {
            Ok(text) => Ok(Some(Source {
                text: Arc::from(text),
                revision: 0,
                from_working_copy: false,
                last_modified: file_loader::modified_time(path),
            })),
            Err(crate::Error::FileTooLarge { size, .. }) => {
                tracing::debug!(path = %path, size, "file above size limit, not indexed");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn merge_environment(&mut self, env: &mut Environment, path: &FilePath) {
        if !self.processed.insert(path.clone()) {
            return;
        }
        let Some(doc) = self.snapshot.document(path) else {
            return;
        };
        for include in doc.resolved_includes() {
            self.merge_environment(env, include);
        }
        env.add_macros(doc.defined_macros());
    }

    fn exists(&self, path: &FilePath) -> bool {
        self.working_copy.contains(path) || file_loader::is_file(path)
    }

    fn resolve_include(&mut self, request: &IncludeRequest<'_>) -> Option<FilePath> {
        let directory: Arc<str> = match request.kind {
            IncludeKind::Global => Arc::from(""),
            IncludeKind::Local | IncludeKind::Next => Arc::from(request.including_file.directory()),
        };
        let key = IncludeKey {
            kind: request.kind,
            directory,
            spelled: Arc::from(request.spelled),
        };
        if let Some(cached) = self.include_cache.get(&key) {
            return cached.clone();
        }
        let resolved = self.resolve_uncached(request);
        tracing::trace!(
            spelled = request.spelled,
            from = %request.including_file,
            resolved = ?resolved,
            "include resolution"
        );
        self.include_cache.insert(key, resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, request: &IncludeRequest<'_>) -> Option<FilePath> {
        let spelled = request.spelled;
        if FilePath::new(spelled).is_absolute() {
            let path = FilePath::new(spelled);
            return self.exists(&path).then_some(path);
        }
        if request.kind == IncludeKind::Local {
            let sibling = request.including_file.sibling(spelled);
            if self.exists(&sibling) {
                return Some(sibling);
            }
        }
        let start = match request.kind {
            IncludeKind::Next => self.header_path_after(request.including_file),
            _ => 0,
        };
        self.header_paths[start.min(self.header_paths.len())..]
            .iter()
            .filter_map(|hp| candidate_in(hp, spelled))
            .find(|candidate| self.exists(candidate))
    }

    /// Index of the first header path after the one holding `file`.
    fn header_path_after(&self, file: &FilePath) -> usize {
        let directory = file.directory();
        self.header_paths
            .iter()
            .position(|hp| {
                let prefix = format!("{}/", hp.path.trim_end_matches('/'));
                directory.starts_with(&prefix) || directory == prefix
            })
            .map_or(0, |idx| idx + 1)
    }
}

fn candidate_in(header_path: &HeaderPath, spelled: &str) -> Option<FilePath> {
    match header_path.kind {
        HeaderPathKind::Framework => {
            let (framework, rest) = spelled.split_once('/')?;
            Some(FilePath::join(
                &header_path.path,
                &format!("{framework}.framework/Headers/{rest}"),
            ))
        }
        HeaderPathKind::User | HeaderPathKind::System => {
            Some(FilePath::join(&header_path.path, spelled))
        }
    }
}

impl PreprocessorClient for SourceProcessor {
    fn source_needed(
        &mut self,
        env: &mut Environment,
        request: &IncludeRequest<'_>,
    ) -> IncludeOutcome {
        let Some(path) = self.resolve_include(request) else {
            return IncludeOutcome::NotFound;
        };
        if self.processed.contains(&path) {
            return IncludeOutcome::Resolved(path);
        }
        if self.snapshot.contains(&path) && !self.todo.contains(&path) {
            self.merge_environment(env, &path);
            return IncludeOutcome::Resolved(path);
        }
        if self.depth >= MAX_INCLUDE_DEPTH {
            return IncludeOutcome::TooDeep(path);
        }
        match self.process_file(env, &path) {
            Processed::Document(_) | Processed::TooLarge => IncludeOutcome::Resolved(path),
            Processed::Unreadable => IncludeOutcome::Unreadable(path),
        }
    }
}

/// Process a single file with its own configuration. `macros` become the
/// `<configuration>` file, processed first.
pub fn process(
    path: &FilePath,
    working_copy: &WorkingCopy,
    header_paths: &[HeaderPath],
    macros: &[ProjectMacro],
    features: LanguageFeatures,
) -> Option<Arc<Document>> {
    let mut working_copy = working_copy.clone();
    working_copy.insert(
        configuration_path(),
        configuration_source(&defines_text(macros)),
        0,
    );
    let mut processor = SourceProcessor::new(Snapshot::new(), working_copy);
    processor.set_header_paths(header_paths.to_vec());
    processor.set_language_features(features);
    processor.run(&configuration_path());
    processor.run(path)
}

#[cfg(test)]
mod tests;
