//! On-disk projects driven through a real `ModelManager`.

use std::sync::Arc;
use std::time::Duration;

use codemodel::FilePath;
use codemodel::ide::{ModelManager, TaskState};
use codemodel::project::{ProjectInfo, ProjectPart, Settings};
use tempfile::TempDir;

/// A temporary directory plus a model manager whose GC only runs on request.
pub struct ProjectFixture {
    pub dir: TempDir,
    pub manager: Arc<ModelManager>,
}

impl ProjectFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let settings = Settings {
            dump_dir: dir.path().join("dumps"),
            gc_delay: Duration::from_secs(3600),
            worker_threads: 4,
            ..Settings::default()
        };
        let manager = ModelManager::new(settings).expect("model manager");
        Self { dir, manager }
    }

    /// Absolute path of `relative` inside the fixture.
    pub fn path(&self, relative: &str) -> FilePath {
        FilePath::from_path(&self.dir.path().join(relative))
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) -> FilePath {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dirs");
        }
        std::fs::write(&path, contents).expect("write file");
        FilePath::from_path(&path)
    }

    pub fn project(&self, name: &str) -> FilePath {
        self.path(&format!("{name}.pro"))
    }

    pub fn part(&self, project: &str, name: &str, files: &[&FilePath]) -> ProjectPart {
        ProjectPart::new(self.project(project), name).with_files(files.iter().map(|f| (*f).clone()))
    }

    /// Register `parts` as project `name` and wait for indexing.
    pub fn index(&self, name: &str, parts: Vec<ProjectPart>) -> TaskState {
        self.manager
            .update_project_info(ProjectInfo::new(self.project(name), parts))
            .wait()
    }
}
