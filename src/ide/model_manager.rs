//! The orchestrator tying projects, editors, indexing and queries together.
//!
//! A [`ModelManager`] owns the live [`Snapshot`] and the registries that
//! decide how each file is parsed. Three independent locks guard it: the
//! snapshot swap, the project registry and the editor registry. None of them
//! is held while a file is parsed; batches capture what they need up front
//! and publish documents one at a time through a callback.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use crossbeam_channel::Receiver;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, warn};

use super::debounce::DebounceTimer;
use super::events::{EventBus, ModelEvent};
use super::find_usages::{self, UsageSearch};
use super::indexing::{BuiltinIndexingSupport, FilesCallback, IndexingSupport, ProgressMode, RefreshRequest};
use super::inspector::{Inspection, write_inspection};
use super::pool::WorkerPool;
use super::symbol_search::{SymbolSearchParameters, SymbolSearchResult};
use super::task::{SearchHandle, TaskHandle};
use crate::Result;
use crate::base::{FilePath, Position};
use crate::hir::{DocumentCallback, Snapshot, Symbol, SymbolFinder, SymbolPath};
use crate::parser::preprocessor::Macro;
use crate::project::{
    HeaderPath, LanguageFeatures, ProjectInfo, ProjectInfoComparer, ProjectMacro, ProjectPart,
    Settings, WorkingCopy, configuration_path, configuration_source, defines_text, file_loader,
};
use crate::syntax::Document;

/// An open editor: its unsaved contents win over the disk.
pub trait EditorDocument: Send + Sync {
    fn path(&self) -> FilePath;
    fn contents(&self) -> Arc<str>;
    /// Editor revision, at least 1 and increasing with every edit.
    fn revision(&self) -> u32;
}

/// In-memory [`EditorDocument`] for collaborators without an editor model.
pub struct TextBuffer {
    path: FilePath,
    state: Mutex<(Arc<str>, u32)>,
}

impl TextBuffer {
    pub fn new(path: impl Into<FilePath>, contents: impl Into<Arc<str>>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            state: Mutex::new((contents.into(), 1)),
        })
    }

    /// Replace the contents and bump the revision.
    pub fn set_contents(&self, contents: impl Into<Arc<str>>) {
        let mut state = self.state.lock();
        state.0 = contents.into();
        state.1 += 1;
    }
}

impl EditorDocument for TextBuffer {
    fn path(&self) -> FilePath {
        self.path.clone()
    }

    fn contents(&self) -> Arc<str> {
        self.state.lock().0.clone()
    }

    fn revision(&self) -> u32 {
        self.state.lock().1
    }
}

type PartIds = Arc<FxHashMap<FilePath, Vec<Arc<str>>>>;

/// Project side of the state. Derived indexes are rebuilt lazily.
#[derive(Default)]
struct Registry {
    projects: IndexMap<FilePath, ProjectInfo>,
    dirty: bool,
    file_parts: FxHashMap<FilePath, Vec<Arc<ProjectPart>>>,
    part_ids: PartIds,
    parts_by_id: FxHashMap<Arc<str>, Arc<ProjectPart>>,
    header_paths: Vec<HeaderPath>,
    macros: Vec<ProjectMacro>,
    /// Last indexing batch started for each project.
    project_batches: FxHashMap<FilePath, TaskHandle>,
    /// Batches of removed projects; GC waits for them.
    removal_batches: Vec<TaskHandle>,
}

impl Registry {
    fn ensure_indexes(&mut self) {
        if !self.dirty {
            return;
        }
        self.file_parts.clear();
        self.parts_by_id.clear();
        self.header_paths.clear();
        self.macros.clear();
        let mut part_ids: FxHashMap<FilePath, Vec<Arc<str>>> = FxHashMap::default();
        for info in self.projects.values() {
            for part in &info.parts {
                self.parts_by_id.insert(part.id.clone(), part.clone());
                for file in &part.files {
                    self.file_parts
                        .entry(file.path.clone())
                        .or_default()
                        .push(part.clone());
                    part_ids
                        .entry(file.path.clone())
                        .or_default()
                        .push(part.id.clone());
                }
            }
            for path in &info.header_paths {
                if !self.header_paths.contains(path) {
                    self.header_paths.push(path.clone());
                }
            }
            for m in &info.macros {
                if !self.macros.contains(m) {
                    self.macros.push(m.clone());
                }
            }
        }
        self.part_ids = Arc::new(part_ids);
        self.dirty = false;
        debug!(
            projects = self.projects.len(),
            parts = self.parts_by_id.len(),
            files = self.file_parts.len(),
            "project indexes rebuilt"
        );
    }

    fn project_files(&self) -> impl Iterator<Item = &FilePath> {
        self.projects.values().flat_map(|info| info.source_files.iter())
    }
}

#[derive(Default)]
struct Editors {
    documents: IndexMap<FilePath, Arc<dyn EditorDocument>>,
    /// Generated sources, such as files a wizard has not written yet.
    extra: IndexMap<FilePath, (Arc<str>, u32)>,
}

/// Owner of the live code model.
pub struct ModelManager {
    settings: Settings,
    pool: Arc<WorkerPool>,
    builtin: Arc<BuiltinIndexingSupport>,
    external: RwLock<Option<Arc<dyn IndexingSupport>>>,
    snapshot: Arc<Mutex<Snapshot>>,
    registry: Mutex<Registry>,
    editors: Mutex<Editors>,
    finder: Mutex<SymbolFinder>,
    events: Arc<EventBus>,
    gc_timer: DebounceTimer,
    gc_enabled: AtomicBool,
    shut_down: AtomicBool,
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("snapshot", &*self.snapshot.lock())
            .field("projects", &self.registry.lock().projects.len())
            .finish()
    }
}

impl ModelManager {
    /// Start the worker pool and the GC timer.
    pub fn new(settings: Settings) -> Result<Arc<Self>> {
        let pool = WorkerPool::new(settings.worker_threads)?;
        let builtin = Arc::new(BuiltinIndexingSupport::new(pool.clone(), &settings));

        let target: Arc<OnceLock<Weak<ModelManager>>> = Arc::default();
        let gc_target = target.clone();
        let gc_timer = DebounceTimer::new("gc", settings.gc_delay, move || {
            if let Some(manager) = gc_target.get().and_then(Weak::upgrade) {
                manager.gc();
            }
        })?;

        let manager = Arc::new(Self {
            settings,
            pool,
            builtin,
            external: RwLock::new(None),
            snapshot: Arc::default(),
            registry: Mutex::default(),
            editors: Mutex::default(),
            finder: Mutex::new(SymbolFinder::new()),
            events: Arc::new(EventBus::new()),
            gc_timer,
            gc_enabled: AtomicBool::new(true),
            shut_down: AtomicBool::new(false),
        });
        let _ = target.set(Arc::downgrade(&manager));
        info!(threads = manager.pool.threads(), "code model started");
        Ok(manager)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn builtin_indexing_support(&self) -> &Arc<BuiltinIndexingSupport> {
        &self.builtin
    }

    /// Receive every [`ModelEvent`] emitted from now on.
    pub fn subscribe(&self) -> Receiver<ModelEvent> {
        self.events.subscribe()
    }

    // ---- indexing support selection ----

    /// Install an external indexer. It runs next to the builtin one and
    /// answers symbol searches.
    pub fn set_indexing_support(&self, support: Arc<dyn IndexingSupport>) {
        *self.external.write() = Some(support);
    }

    pub fn reset_indexing_support(&self) {
        *self.external.write() = None;
    }

    pub fn has_external_indexing_support(&self) -> bool {
        self.external.read().is_some()
    }

    // ---- snapshot ----

    /// The current snapshot. Later updates do not affect the returned handle.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().clone()
    }

    pub fn document(&self, path: &FilePath) -> Option<Arc<Document>> {
        self.snapshot.lock().document(path)
    }

    /// Insert a document, honouring revisions. Returns whether it went in.
    pub fn insert_document(&self, doc: Arc<Document>) -> bool {
        let inserted = self.snapshot.lock().insert(doc.clone());
        if inserted {
            self.events.emit(ModelEvent::DocumentUpdated(doc));
        }
        inserted
    }

    /// Drop files from the snapshot, announcing them first.
    pub fn remove_files(&self, paths: &[FilePath]) {
        let present: Vec<FilePath> = {
            let snapshot = self.snapshot.lock();
            paths.iter().filter(|p| snapshot.contains(p)).cloned().collect()
        };
        if present.is_empty() {
            return;
        }
        self.events.emit(ModelEvent::AboutToRemoveFiles(present.clone()));
        let mut snapshot = self.snapshot.lock();
        for path in &present {
            snapshot.remove(path);
        }
    }

    fn document_sink(&self) -> DocumentCallback {
        let snapshot = self.snapshot.clone();
        let events = self.events.clone();
        Arc::new(move |doc: &Arc<Document>| {
            let inserted = snapshot.lock().insert(doc.clone());
            if inserted {
                events.emit(ModelEvent::DocumentUpdated(doc.clone()));
            }
        })
    }

    // ---- working copy ----

    /// Editor contents, extra sources and `<configuration>`.
    pub fn working_copy(&self) -> WorkingCopy {
        let mut wc = WorkingCopy::new();
        {
            let editors = self.editors.lock();
            for (path, (contents, revision)) in &editors.extra {
                wc.insert(path.clone(), contents.clone(), *revision);
            }
            for (path, document) in &editors.documents {
                wc.insert(path.clone(), document.contents(), document.revision());
            }
        }
        let defines = {
            let mut registry = self.registry.lock();
            registry.ensure_indexes();
            defines_text(&registry.macros)
        };
        wc.insert(configuration_path(), configuration_source(&defines), 0);
        wc
    }

    // ---- project parts ----

    /// Parts the file is a member of.
    pub fn project_part(&self, path: &FilePath) -> Vec<Arc<ProjectPart>> {
        let mut registry = self.registry.lock();
        registry.ensure_indexes();
        registry.file_parts.get(path).cloned().unwrap_or_default()
    }

    /// Parts of the files that include `path`, for headers that belong to no
    /// part themselves.
    pub fn project_part_from_dependencies(&self, path: &FilePath) -> Vec<Arc<ProjectPart>> {
        let dependents = self.snapshot().files_depending_on(path);
        let mut registry = self.registry.lock();
        registry.ensure_indexes();
        let mut seen: FxHashSet<Arc<str>> = FxHashSet::default();
        let mut parts = Vec::new();
        for dependent in &dependents {
            for part in registry.file_parts.get(dependent).into_iter().flatten() {
                if seen.insert(part.id.clone()) {
                    parts.push(part.clone());
                }
            }
        }
        parts
    }

    /// Merged configuration of every project, with the newest dialect.
    pub fn fallback_project_part(&self) -> ProjectPart {
        let mut registry = self.registry.lock();
        registry.ensure_indexes();
        ProjectPart::new(FilePath::new("<fallback>"), "fallback")
            .with_header_paths(registry.header_paths.iter().cloned())
            .with_macros(registry.macros.iter().cloned())
            .with_features(LanguageFeatures::cxx())
    }

    /// Own parts, else parts from dependencies, else the fallback.
    pub fn parts_for_file(&self, path: &FilePath) -> Vec<Arc<ProjectPart>> {
        let own = self.project_part(path);
        if !own.is_empty() {
            return own;
        }
        let from_dependencies = self.project_part_from_dependencies(path);
        if !from_dependencies.is_empty() {
            return from_dependencies;
        }
        vec![Arc::new(self.fallback_project_part())]
    }

    pub fn project_info(&self, project: &FilePath) -> Option<ProjectInfo> {
        self.registry.lock().projects.get(project).cloned()
    }

    pub fn projects(&self) -> Vec<ProjectInfo> {
        self.registry.lock().projects.values().cloned().collect()
    }

    /// Every file of every registered project.
    pub fn project_files(&self) -> Vec<FilePath> {
        let registry = self.registry.lock();
        let mut files: Vec<FilePath> = registry.project_files().cloned().collect();
        files.sort();
        files.dedup();
        files
    }

    fn part_ids(&self) -> PartIds {
        let mut registry = self.registry.lock();
        registry.ensure_indexes();
        registry.part_ids.clone()
    }

    // ---- indexing ----

    fn refresh_request(&self, files: Vec<FilePath>) -> RefreshRequest {
        let working_copy = self.working_copy();
        let mut request = RefreshRequest::new(files, self.snapshot(), working_copy);
        {
            let mut registry = self.registry.lock();
            registry.ensure_indexes();
            request.header_paths = registry.header_paths.clone();
            for file in &request.files {
                if let Some(part) = registry.file_parts.get(file).and_then(|parts| parts.first()) {
                    request.file_features.insert(file.clone(), part.features);
                }
            }
        }
        request.default_features = LanguageFeatures::cxx();
        request.file_size_limit_mb = self.settings.file_size_limit_mb;
        request
    }

    /// Reindex `files`. Oversized files are dropped first. The builtin
    /// indexer always runs; an installed external indexer runs as well.
    pub fn update_source_files(&self, files: impl IntoIterator<Item = FilePath>, mode: ProgressMode) -> TaskHandle {
        if !self.settings.indexer_enabled || self.shut_down.load(Ordering::SeqCst) {
            return TaskHandle::completed("index");
        }
        let files = file_loader::filter_by_size(files, self.settings.file_size_limit_mb);
        if files.is_empty() {
            return TaskHandle::completed("index");
        }

        let mut request = self.refresh_request(files);
        if let Some(external) = self.external.read().clone() {
            debug!(files = request.files.len(), "delegating to external indexer");
            external.refresh_source_files(request.clone(), mode);
        }
        request.on_document = Some(self.document_sink());
        let events = self.events.clone();
        let on_finished: FilesCallback = Arc::new(move |files: &[FilePath]| {
            events.emit(ModelEvent::SourceFilesRefreshed(files.to_vec()));
        });
        request.on_finished = Some(on_finished);
        self.builtin.refresh_source_files(request, mode)
    }

    /// Register a new or changed project and reindex what the change affects.
    pub fn update_project_info(&self, info: ProjectInfo) -> TaskHandle {
        if self.shut_down.load(Ordering::SeqCst) {
            return TaskHandle::completed("index");
        }
        let snapshot = self.snapshot();
        let project = info.project.clone();

        let mut to_index: Vec<FilePath> = Vec::new();
        let mut to_purge: Vec<FilePath> = Vec::new();
        let mut removed_files: Vec<FilePath> = Vec::new();
        let mut removed_parts: Vec<Arc<str>> = Vec::new();
        let mut purge_configuration = false;
        {
            let mut registry = self.registry.lock();
            match registry.projects.get(&project) {
                None => to_index.extend(info.source_files.iter().cloned()),
                Some(old) => {
                    let comparer = ProjectInfoComparer::new(old, &info);
                    let previous_canceled = registry
                        .project_batches
                        .get(&project)
                        .is_some_and(|handle| handle.is_canceled());
                    if comparer.config_changed() || previous_canceled {
                        debug!(
                            project = %project,
                            previous_canceled,
                            "configuration changed, reindexing project"
                        );
                        for file in &old.source_files {
                            to_purge.push(file.clone());
                            to_purge.extend(snapshot.all_includes_of(file));
                        }
                        purge_configuration = comparer.defines_changed();
                        to_index.extend(info.source_files.iter().cloned());
                    } else {
                        to_index.extend(comparer.added_files());
                        to_index.extend(comparer.timestamp_modified_files(
                            |path| snapshot.document(path).and_then(|doc| doc.last_modified()),
                            file_loader::modified_time,
                        ));
                    }
                    removed_files.extend(comparer.removed_files());
                    removed_parts = comparer.removed_project_parts();
                }
            }
            registry.projects.insert(project.clone(), info);
            registry.dirty = true;
            registry.ensure_indexes();
        }

        if purge_configuration {
            self.snapshot.lock().remove(&configuration_path());
        }
        to_purge.retain(|p| !p.is_injected());
        to_purge.sort();
        to_purge.dedup();
        self.remove_files(&to_purge);
        self.remove_files(&removed_files);
        if !removed_parts.is_empty() {
            self.events.emit(ModelEvent::ProjectPartsRemoved(removed_parts));
        }
        self.events.emit(ModelEvent::ProjectPartsUpdated(project.clone()));
        if self.settings.dump_project_info
            && let Err(err) = self.dump_configuration("project-info")
        {
            warn!(error = %err, "could not dump project info");
        }

        to_index.sort();
        to_index.dedup();
        info!(project = %project, files = to_index.len(), "project info updated");
        let handle = self.update_source_files(to_index, ProgressMode::Reserved);
        self.registry
            .lock()
            .project_batches
            .insert(project, handle.clone());
        handle
    }

    /// Unregister a project. Its running batch is canceled and the next GC,
    /// scheduled here, waits for that batch to stop before sweeping.
    pub fn remove_project(&self, project: &FilePath) {
        let removed = {
            let mut registry = self.registry.lock();
            let Some(info) = registry.projects.shift_remove(project) else {
                return;
            };
            if let Some(handle) = registry.project_batches.remove(project) {
                handle.cancel();
                registry.removal_batches.push(handle);
            }
            registry.dirty = true;
            registry.ensure_indexes();
            info.part_ids().into_iter().collect::<Vec<_>>()
        };
        info!(project = %project, parts = removed.len(), "project removed");
        self.events.emit(ModelEvent::ProjectPartsRemoved(removed));
        self.schedule_gc();
    }

    // ---- editors and generated sources ----

    /// Track an editor and index its contents.
    pub fn editor_opened(&self, document: Arc<dyn EditorDocument>) -> TaskHandle {
        let path = document.path();
        self.editors.lock().documents.insert(path.clone(), document);
        self.update_source_files([path], ProgressMode::Reserved)
    }

    /// Forget an editor. Files nothing else references go at the next GC.
    pub fn editor_closed(&self, path: &FilePath) {
        if self.editors.lock().documents.shift_remove(path).is_some() {
            self.schedule_gc();
        }
    }

    pub fn open_editors(&self) -> Vec<FilePath> {
        self.editors.lock().documents.keys().cloned().collect()
    }

    /// A file was saved or edited: reindex it and everything including it.
    pub fn file_changed(&self, path: &FilePath) -> TaskHandle {
        let mut files = vec![path.clone()];
        files.extend(self.snapshot().files_depending_on(path));
        self.update_source_files(files, ProgressMode::Reserved)
    }

    /// Add or replace a generated source that does not exist on disk yet.
    pub fn add_extra_source(&self, path: impl Into<FilePath>, contents: impl Into<Arc<str>>) -> TaskHandle {
        let path = path.into();
        {
            let mut editors = self.editors.lock();
            let revision = editors.extra.get(&path).map_or(1, |(_, rev)| rev + 1);
            editors.extra.insert(path.clone(), (contents.into(), revision));
        }
        self.update_source_files([path], ProgressMode::Reserved)
    }

    pub fn remove_extra_source(&self, path: &FilePath) {
        if self.editors.lock().extra.shift_remove(path).is_some() {
            self.schedule_gc();
        }
    }

    // ---- garbage collection ----

    pub fn schedule_gc(&self) {
        if self.gc_enabled.load(Ordering::SeqCst) {
            self.gc_timer.schedule();
        }
    }

    pub fn set_gc_enabled(&self, enabled: bool) {
        self.gc_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Run GC now, ahead of loading or unloading a session.
    pub fn session_about_to_change(&self) {
        self.gc();
    }

    /// Drop every document not reachable from a project file, an open editor
    /// or an extra source through recorded includes. Returns removed paths.
    pub fn gc(&self) -> Vec<FilePath> {
        if !self.gc_enabled.load(Ordering::SeqCst) {
            return Vec::new();
        }
        let pending = std::mem::take(&mut self.registry.lock().removal_batches);
        for handle in &pending {
            handle.wait();
        }

        let mut roots: Vec<FilePath> = {
            let registry = self.registry.lock();
            registry.project_files().cloned().collect()
        };
        {
            let editors = self.editors.lock();
            roots.extend(editors.documents.keys().cloned());
            roots.extend(editors.extra.keys().cloned());
        }
        roots.push(configuration_path());

        let snapshot = self.snapshot();
        let mut reachable: FxHashSet<FilePath> = FxHashSet::default();
        let mut stack = roots;
        while let Some(path) = stack.pop() {
            if !reachable.insert(path.clone()) {
                continue;
            }
            if let Some(doc) = snapshot.document(&path) {
                stack.extend(doc.resolved_includes().filter(|p| !reachable.contains(*p)).cloned());
            }
        }

        let mut doomed: Vec<FilePath> = snapshot
            .paths()
            .filter(|p| !reachable.contains(*p))
            .cloned()
            .collect();
        doomed.sort();
        if !doomed.is_empty() {
            self.events.emit(ModelEvent::AboutToRemoveFiles(doomed.clone()));
            let doomed_set: FxHashSet<&FilePath> = doomed.iter().collect();
            self.snapshot.lock().retain(|p| !doomed_set.contains(p));
            self.builtin.index_cache().retain(|p| !doomed_set.contains(p));
        }
        info!(removed = doomed.len(), kept = reachable.len(), "gc finished");
        self.events.emit(ModelEvent::GcFinished);
        doomed
    }

    // ---- queries ----

    /// Symbol under the cursor.
    pub fn symbol_at(&self, path: &FilePath, position: Position) -> Option<Symbol> {
        crate::hir::symbol_at(&self.snapshot(), path, position)
    }

    pub fn find_usages(&self, symbol: &Symbol) -> UsageSearch {
        find_usages::find_usages(&self.pool, symbol, self.snapshot(), self.working_copy())
    }

    pub fn rename_usages(&self, symbol: &Symbol, replacement: &str) -> Result<UsageSearch> {
        find_usages::rename_usages(&self.pool, symbol, self.snapshot(), self.working_copy(), replacement)
    }

    /// Repeat a search against the current snapshot.
    pub fn search_again(&self, path: &SymbolPath, replacement: Option<&str>) -> Option<UsageSearch> {
        find_usages::search_again(&self.pool, path, self.snapshot(), self.working_copy(), replacement)
    }

    pub fn find_macro_usages(&self, definition: &Macro) -> UsageSearch {
        find_usages::find_macro_usages(&self.pool, definition, self.snapshot(), self.working_copy())
    }

    pub fn rename_macro_usages(&self, definition: &Macro, replacement: &str) -> Result<UsageSearch> {
        find_usages::rename_macro_usages(&self.pool, definition, self.snapshot(), self.working_copy(), replacement)
    }

    pub fn find_matching_definition(&self, declaration: &Symbol, strict: bool) -> Option<Symbol> {
        let (snapshot, parts) = (self.snapshot(), self.part_ids());
        self.finder
            .lock()
            .find_matching_definition(declaration, &snapshot, &*parts, strict)
    }

    pub fn find_matching_declaration(&self, definition: &Symbol) -> Option<Symbol> {
        let (snapshot, parts) = (self.snapshot(), self.part_ids());
        self.finder
            .lock()
            .find_matching_declaration(definition, &snapshot, &*parts)
    }

    pub fn find_matching_var_definition(&self, declaration: &Symbol) -> Option<Symbol> {
        let (snapshot, parts) = (self.snapshot(), self.part_ids());
        self.finder
            .lock()
            .find_matching_var_definition(declaration, &snapshot, &*parts)
    }

    pub fn find_matching_class_declaration(&self, forward: &Symbol) -> Option<Symbol> {
        let (snapshot, parts) = (self.snapshot(), self.part_ids());
        self.finder
            .lock()
            .find_matching_class_declaration(forward, &snapshot, &*parts)
    }

    /// Candidate files for `reference` in symbol-finder order.
    pub fn file_iteration_order(&self, reference: &FilePath) -> Vec<FilePath> {
        let (snapshot, parts) = (self.snapshot(), self.part_ids());
        self.finder
            .lock()
            .file_iteration_order(reference, &snapshot, &*parts)
    }

    /// Project-wide symbol search, answered by the external indexer when one
    /// is installed.
    pub fn search_symbols(&self, parameters: SymbolSearchParameters) -> SearchHandle<SymbolSearchResult> {
        let snapshot = self.snapshot();
        match self.external.read().clone() {
            Some(external) => external.search_symbols(&snapshot, parameters),
            None => self.builtin.search_symbols(&snapshot, parameters),
        }
    }

    // ---- diagnostics ----

    /// Render the whole model state as text.
    pub fn configuration_text(&self, log_id: &str) -> String {
        let projects = self.projects();
        let (header_paths, macros) = {
            let mut registry = self.registry.lock();
            registry.ensure_indexes();
            (registry.header_paths.clone(), registry.macros.clone())
        };
        let working_copy = self.working_copy();
        let snapshot = self.snapshot();
        Inspection {
            log_id,
            projects: &projects,
            header_paths: &header_paths,
            macros: &macros,
            working_copy: &working_copy,
            snapshot: &snapshot,
        }
        .render()
    }

    /// Write [`configuration_text`](Self::configuration_text) into the dump
    /// directory.
    pub fn dump_configuration(&self, log_id: &str) -> Result<PathBuf> {
        let text = self.configuration_text(log_id);
        let path = write_inspection(&self.settings.dump_dir, log_id, &text)?;
        info!(path = %path.display(), "wrote model inspection");
        Ok(path)
    }

    // ---- lifecycle ----

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stop GC and timers, then cancel and wait for every batch.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.gc_enabled.store(false, Ordering::SeqCst);
        self.gc_timer.stop();
        let batches: Vec<TaskHandle> = {
            let mut registry = self.registry.lock();
            let mut batches: Vec<TaskHandle> = registry.project_batches.drain().map(|(_, h)| h).collect();
            batches.append(&mut registry.removal_batches);
            batches
        };
        for handle in &batches {
            handle.cancel();
        }
        self.builtin.wait_for_all();
        for handle in &batches {
            handle.wait();
        }
        info!("code model shut down");
    }
}
