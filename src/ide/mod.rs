//! IDE-facing services: background indexing, searches and the model manager.
//!
//! Everything here runs on one shared [`WorkerPool`]. Long operations return a
//! [`TaskHandle`] (or a [`SearchHandle`] streaming results) that supports
//! cancel, pause, resume and progress.
//!
//! ## Usage
//!
//! ```ignore
//! use codemodel::base::Position;
//! use codemodel::ide::ModelManager;
//! use codemodel::project::{ProjectInfo, ProjectPart, Settings};
//!
//! let manager = ModelManager::new(Settings::from_env())?;
//! let part = ProjectPart::new("/src/app.pro", "app").with_files(["/src/main.cpp"]);
//! manager.update_project_info(ProjectInfo::new("/src/app.pro", vec![part])).wait();
//!
//! let symbol = manager.symbol_at(&"/src/main.cpp".into(), Position::new(3, 4)).unwrap();
//! let report = manager.find_usages(&symbol).finish();
//! ```

mod debounce;
mod events;
mod find_usages;
mod indexing;
mod inspector;
mod model_manager;
mod pool;
mod symbol_index;
mod symbol_search;
mod task;

pub use debounce::DebounceTimer;
pub use events::{EventBus, ModelEvent};
pub use find_usages::{
    TextEdit, Usage, UsageReport, UsageSearch, UsageSearchStats, apply_edits, find_macro_usages,
    find_usages, is_identifier, rename_macro_usages, rename_usages, search_again, staged_edits,
};
pub use indexing::{
    BuiltinIndexingSupport, FilesCallback, IndexingSupport, ProgressMode, RefreshRequest,
    diagnostics_report_name, write_diagnostics_report,
};
pub use inspector::{Inspection, inspection_file_name, write_inspection};
pub use model_manager::{EditorDocument, ModelManager, TextBuffer};
pub use pool::WorkerPool;
pub use symbol_index::{IndexItem, IndexItemKind, SymbolIndexBuilder, SymbolKinds};
pub use symbol_search::{
    RESULT_BUFFER, SearchScope, SymbolIndexCache, SymbolSearchParameters, SymbolSearchResult,
    search_documents,
};
pub use task::{FutureSynchronizer, SearchHandle, TaskControl, TaskHandle, TaskState};
