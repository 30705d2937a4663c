//! Background (re)indexing of source files.
//!
//! A refresh batch processes every source file before any header, with a
//! fresh macro environment per source file. The `<configuration>` pseudo-file
//! is processed in front of each source file and once before the first
//! header, so project macros are visible everywhere.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use crossbeam_channel::bounded;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use super::pool::WorkerPool;
use super::symbol_search::{
    RESULT_BUFFER, SymbolIndexCache, SymbolSearchParameters, SymbolSearchResult, compile, search_documents,
};
use super::task::{FutureSynchronizer, SearchHandle, TaskControl, TaskHandle};
use crate::base::{FilePath, StringTable};
use crate::hir::{DocumentCallback, Snapshot, SourceProcessor};
use crate::project::{
    HeaderPath, LanguageFeatures, ProjectFileKind, Settings, WorkingCopy, configuration_path,
};
use crate::syntax::Document;
use crate::{Error, Result};

/// Called with the batch's files when a batch completes without cancellation.
pub type FilesCallback = Arc<dyn Fn(&[FilePath]) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// Only batches of more than one file show progress.
    #[default]
    Reserved,
    Forced,
}

/// Everything a batch needs, captured when it is requested.
#[derive(Clone)]
pub struct RefreshRequest {
    pub files: Vec<FilePath>,
    pub snapshot: Snapshot,
    pub working_copy: WorkingCopy,
    pub header_paths: Vec<HeaderPath>,
    pub default_features: LanguageFeatures,
    /// Features of files that belong to a project part.
    pub file_features: FxHashMap<FilePath, LanguageFeatures>,
    pub file_size_limit_mb: Option<u32>,
    pub on_document: Option<DocumentCallback>,
    pub on_finished: Option<FilesCallback>,
}

impl RefreshRequest {
    pub fn new(files: Vec<FilePath>, snapshot: Snapshot, working_copy: WorkingCopy) -> Self {
        Self {
            files,
            snapshot,
            working_copy,
            header_paths: Vec::new(),
            default_features: LanguageFeatures::default(),
            file_features: FxHashMap::default(),
            file_size_limit_mb: Settings::default().file_size_limit_mb,
            on_document: None,
            on_finished: None,
        }
    }

    fn features_of(&self, path: &FilePath) -> LanguageFeatures {
        self.file_features
            .get(path)
            .copied()
            .unwrap_or(self.default_features)
    }

    /// Sources first, then headers, each in request order, without duplicates.
    fn ordered_files(&self) -> (Vec<FilePath>, usize) {
        let mut seen = rustc_hash::FxHashSet::default();
        let unique: Vec<&FilePath> = self.files.iter().filter(|p| seen.insert(*p)).collect();
        let (sources, headers): (Vec<&FilePath>, Vec<&FilePath>) = unique
            .into_iter()
            .partition(|p| ProjectFileKind::classify(p) == ProjectFileKind::Source);
        let source_count = sources.len();
        let ordered = sources.into_iter().chain(headers).cloned().collect();
        (ordered, source_count)
    }
}

/// Something that can (re)index files and search symbols.
pub trait IndexingSupport: Send + Sync {
    fn refresh_source_files(&self, request: RefreshRequest, mode: ProgressMode) -> TaskHandle;

    fn search_symbols(
        &self,
        snapshot: &Snapshot,
        parameters: SymbolSearchParameters,
    ) -> SearchHandle<SymbolSearchResult>;
}

/// The indexer built on [`SourceProcessor`].
pub struct BuiltinIndexingSupport {
    pool: Arc<WorkerPool>,
    strings: Arc<StringTable>,
    index_cache: Arc<SymbolIndexCache>,
    synchronizer: Mutex<FutureSynchronizer>,
    dump_dir: Option<PathBuf>,
    /// Held exclusively by diagnostics dumps, shared by normal batches.
    exclusive: Arc<RwLock<()>>,
}

impl BuiltinIndexingSupport {
    pub fn new(pool: Arc<WorkerPool>, settings: &Settings) -> Self {
        let mut synchronizer = FutureSynchronizer::new();
        synchronizer.set_cancel_on_wait(true);
        Self {
            pool,
            strings: Arc::new(StringTable::new()),
            index_cache: Arc::new(SymbolIndexCache::new()),
            synchronizer: Mutex::new(synchronizer),
            dump_dir: settings.dump_diagnostics.then(|| settings.dump_dir.clone()),
            exclusive: Arc::new(RwLock::new(())),
        }
    }

    pub fn string_table(&self) -> &Arc<StringTable> {
        &self.strings
    }

    pub fn index_cache(&self) -> &Arc<SymbolIndexCache> {
        &self.index_cache
    }

    pub fn is_dumping_diagnostics(&self) -> bool {
        self.dump_dir.is_some()
    }

    /// Batches currently tracked.
    pub fn tracked_batches(&self) -> usize {
        self.synchronizer.lock().len()
    }

    pub fn cancel_all(&self) {
        self.synchronizer.lock().cancel_all();
    }

    /// Cancel every tracked batch and wait for it to stop.
    pub fn wait_for_all(&self) {
        let handles: Vec<TaskHandle> = {
            let mut synchronizer = self.synchronizer.lock();
            synchronizer.cancel_all();
            let handles = synchronizer.handles().to_vec();
            *synchronizer = {
                let mut fresh = FutureSynchronizer::new();
                fresh.set_cancel_on_wait(true);
                fresh
            };
            handles
        };
        for handle in handles {
            handle.wait();
        }
    }
}

impl IndexingSupport for BuiltinIndexingSupport {
    fn refresh_source_files(&self, request: RefreshRequest, mode: ProgressMode) -> TaskHandle {
        let control = TaskControl::new("index");
        control.set_progress_visible(mode == ProgressMode::Forced || request.files.len() > 1);
        control.set_progress_range(request.files.len());

        let exclusive = self.exclusive.clone();
        let strings = self.strings.clone();
        let handle = match self.dump_dir.clone() {
            Some(dir) => self.pool.spawn(control, move |control| {
                let _guard = exclusive.write();
                let on_finished = request.on_finished.clone();
                let files = request.files.clone();
                let diagnostics = index_one_by_one(request, control);
                match write_diagnostics_report(&dir, &diagnostics) {
                    Ok(path) => info!(report = %path.display(), files = files.len(), "wrote diagnostics report"),
                    Err(err) => warn!(error = %err, "could not write diagnostics report"),
                }
                if !control.is_canceled()
                    && let Some(callback) = on_finished
                {
                    callback(&files);
                }
            }),
            None => self.pool.spawn(control, move |control| {
                let _guard = exclusive.read();
                index_files(request, control);
                strings.schedule_gc();
            }),
        };
        self.synchronizer.lock().add(handle.clone());
        handle
    }

    fn search_symbols(
        &self,
        snapshot: &Snapshot,
        parameters: SymbolSearchParameters,
    ) -> SearchHandle<SymbolSearchResult> {
        let (tx, rx) = bounded(RESULT_BUFFER);
        let control = TaskControl::new("search symbols");
        let Some(matcher) = compile(&parameters) else {
            control.start();
            control.finish();
            return SearchHandle::new(TaskHandle::new(control), rx);
        };

        let mut documents: Vec<Arc<Document>> = snapshot.iter().map(|(_, d)| d.clone()).collect();
        documents.sort_by(|a, b| a.path().cmp(b.path()));
        let strings = self.strings.clone();
        let cache = self.index_cache.clone();
        let live = snapshot.clone();
        let handle = self.pool.spawn(control, move |control| {
            strings.collect_if_requested();
            cache.retain(|p| live.contains(p));
            search_documents(&documents, &parameters, &matcher, &strings, &cache, control, &tx);
        });
        SearchHandle::new(handle, rx)
    }
}

/// Normal batch: sources first, `<configuration>` in front of each source and
/// the first header.
fn index_files(request: RefreshRequest, control: &TaskControl) {
    let (files, source_count) = request.ordered_files();
    control.set_progress_range(files.len());
    debug!(task = %control.id(), files = files.len(), sources = source_count, "indexing started");

    let mut processor = SourceProcessor::new(request.snapshot.clone(), request.working_copy.clone());
    processor.set_header_paths(request.header_paths.clone());
    processor.set_file_size_limit(request.file_size_limit_mb);
    if let Some(callback) = &request.on_document {
        processor.set_document_callback(callback.clone());
    }
    processor.set_todo(files.iter().cloned());

    let configuration = configuration_path();
    let mut processing_headers = false;
    for (index, file) in files.iter().enumerate() {
        if !control.wait_for_resume() {
            break;
        }
        let is_source = index < source_count;
        processor.set_language_features(request.features_of(file));
        if is_source || !processing_headers {
            processor.run(&configuration);
            if !is_source {
                processing_headers = true;
            }
        }
        processor.run(file);
        control.advance(1);
        if is_source {
            processor.reset_environment();
        }
    }

    let stats = processor.stats();
    let canceled = control.is_canceled();
    info!(
        task = %control.id(),
        files = files.len(),
        parsed = stats.parsed,
        reused = stats.reused,
        too_large = stats.too_large,
        canceled,
        "indexing finished"
    );
    if !canceled && let Some(callback) = &request.on_finished {
        callback(&request.files);
    }
}

/// Diagnostics dump batch: files one at a time in sorted order, each in a
/// fresh environment. Returns every diagnostic of every document produced.
fn index_one_by_one(request: RefreshRequest, control: &TaskControl) -> Vec<(FilePath, crate::parser::Diagnostic)> {
    let mut files = request.files.clone();
    files.sort();
    files.dedup();
    control.set_progress_range(files.len());

    let collected: Arc<Mutex<Vec<(FilePath, crate::parser::Diagnostic)>>> = Arc::default();
    let sink = collected.clone();
    let forward = request.on_document.clone();
    let callback: DocumentCallback = Arc::new(move |doc: &Arc<Document>| {
        sink.lock()
            .extend(doc.diagnostics().iter().map(|d| (doc.path().clone(), d.clone())));
        if let Some(forward) = &forward {
            forward(doc);
        }
    });

    let configuration = configuration_path();
    let mut snapshot = request.snapshot.clone();
    for file in &files {
        if !control.wait_for_resume() {
            break;
        }
        let mut processor = SourceProcessor::new(snapshot.clone(), request.working_copy.clone());
        processor.set_header_paths(request.header_paths.clone());
        processor.set_file_size_limit(request.file_size_limit_mb);
        processor.set_language_features(request.features_of(file));
        processor.set_document_callback(callback.clone());
        processor.set_todo([file.clone()]);
        processor.run(&configuration);
        processor.run(file);
        snapshot.merge(processor.snapshot());
        control.advance(1);
    }

    let mut diagnostics = std::mem::take(&mut *collected.lock());
    diagnostics.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.line.cmp(&b.1.line)));
    diagnostics
}

/// File name of a diagnostics report written now.
pub fn diagnostics_report_name() -> String {
    format!(
        "codemodel-diagnostics-{}.tasks",
        Local::now().format("%Y%m%d-%H%M%S%.3f")
    )
}

/// Write `file\tline\tseverity\tmessage` lines (1-based lines) into `dir`.
pub fn write_diagnostics_report(dir: &Path, diagnostics: &[(FilePath, crate::parser::Diagnostic)]) -> Result<PathBuf> {
    let mut text = String::new();
    for (file, diagnostic) in diagnostics {
        let _ = writeln!(
            text,
            "{}\t{}\t{}\t{}",
            file,
            diagnostic.line + 1,
            diagnostic.severity.label(),
            diagnostic.message
        );
    }
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let path = dir.join(diagnostics_report_name());
    std::fs::write(&path, text).map_err(|e| Error::io(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests;
