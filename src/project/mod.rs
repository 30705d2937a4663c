//! Project configuration: parts, per-project info, working copy, disk access
//! and settings.

pub mod file_loader;
mod project_info;
mod project_part;
mod settings;
mod working_copy;

pub use project_info::{ProjectInfo, ProjectInfoComparer};
pub use project_part::{
    HeaderPath, HeaderPathKind, LanguageFeatures, ProjectFile, ProjectFileKind, ProjectMacro,
    ProjectPart, defines_text,
};
pub use settings::Settings;
pub use working_copy::{
    CONFIGURATION_FILE, CONFIGURATION_PRELUDE, WorkingCopy, configuration_path,
    configuration_source,
};
