//! Per-project configuration and change detection between two versions of it.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::SystemTime;

use rustc_hash::FxHashMap;

use super::project_part::{HeaderPath, ProjectMacro, ProjectPart};
use crate::base::FilePath;

/// Everything the code model knows about one project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectInfo {
    pub project: FilePath,
    pub parts: Vec<Arc<ProjectPart>>,
    /// Union of the parts' macros, in first-seen order.
    pub macros: Vec<ProjectMacro>,
    /// Union of the parts' header paths, in first-seen order.
    pub header_paths: Vec<HeaderPath>,
    /// Every member file of every part.
    pub source_files: BTreeSet<FilePath>,
}

impl ProjectInfo {
    pub fn new(project: impl Into<FilePath>, parts: Vec<ProjectPart>) -> Self {
        let project = project.into();
        let mut macros: Vec<ProjectMacro> = Vec::new();
        let mut header_paths: Vec<HeaderPath> = Vec::new();
        let mut source_files = BTreeSet::new();
        let parts: Vec<Arc<ProjectPart>> = parts
            .into_iter()
            .map(|mut part| {
                part.project = project.clone();
                for m in &part.macros {
                    if !macros.contains(m) {
                        macros.push(m.clone());
                    }
                }
                for hp in &part.header_paths {
                    if !header_paths.contains(hp) {
                        header_paths.push(hp.clone());
                    }
                }
                source_files.extend(part.files.iter().map(|f| f.path.clone()));
                Arc::new(part)
            })
            .collect();
        Self {
            project,
            parts,
            macros,
            header_paths,
            source_files,
        }
    }

    pub fn defines_text(&self) -> String {
        super::project_part::defines_text(&self.macros)
    }

    pub fn part(&self, id: &str) -> Option<&Arc<ProjectPart>> {
        self.parts.iter().find(|p| &*p.id == id)
    }

    pub fn part_ids(&self) -> BTreeSet<Arc<str>> {
        self.parts.iter().map(|p| p.id.clone()).collect()
    }
}

/// Differences between the previous and the new [`ProjectInfo`] of a project.
#[derive(Debug)]
pub struct ProjectInfoComparer<'a> {
    old: &'a ProjectInfo,
    new: &'a ProjectInfo,
}

impl<'a> ProjectInfoComparer<'a> {
    pub fn new(old: &'a ProjectInfo, new: &'a ProjectInfo) -> Self {
        Self { old, new }
    }

    pub fn defines_changed(&self) -> bool {
        self.old.macros != self.new.macros
    }

    pub fn header_paths_changed(&self) -> bool {
        self.old.header_paths != self.new.header_paths
    }

    /// Anything that changes how already-indexed files parse.
    pub fn config_changed(&self) -> bool {
        self.defines_changed()
            || self.header_paths_changed()
            || self.languages_changed()
            || self.old.part_ids() != self.new.part_ids()
    }

    fn languages_changed(&self) -> bool {
        let features = |info: &ProjectInfo| -> FxHashMap<Arc<str>, _> {
            info.parts
                .iter()
                .map(|p| (p.id.clone(), p.features))
                .collect()
        };
        features(self.old) != features(self.new)
    }

    pub fn files_changed(&self) -> bool {
        self.old.source_files != self.new.source_files
    }

    pub fn added_files(&self) -> BTreeSet<FilePath> {
        self.new
            .source_files
            .difference(&self.old.source_files)
            .cloned()
            .collect()
    }

    pub fn removed_files(&self) -> BTreeSet<FilePath> {
        self.old
            .source_files
            .difference(&self.new.source_files)
            .cloned()
            .collect()
    }

    /// Ids of parts that disappeared.
    pub fn removed_project_parts(&self) -> Vec<Arc<str>> {
        let new_ids = self.new.part_ids();
        self.old
            .part_ids()
            .into_iter()
            .filter(|id| !new_ids.contains(id))
            .collect()
    }

    /// Files present in both versions whose on-disk time is newer than the
    /// indexed one. `indexed_mtime` answers with the time recorded when the
    /// file was last indexed, `disk_mtime` with the current time on disk.
    pub fn timestamp_modified_files(
        &self,
        indexed_mtime: impl Fn(&FilePath) -> Option<SystemTime>,
        disk_mtime: impl Fn(&FilePath) -> Option<SystemTime>,
    ) -> BTreeSet<FilePath> {
        self.new
            .source_files
            .intersection(&self.old.source_files)
            .filter(|path| match (indexed_mtime(path), disk_mtime(path)) {
                (Some(indexed), Some(disk)) => disk != indexed,
                _ => false,
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn info(files: &[&str], macros: &[ProjectMacro]) -> ProjectInfo {
        let part = ProjectPart::new("/p/p.pro", "app")
            .with_files(files.iter().copied())
            .with_macros(macros.iter().cloned());
        ProjectInfo::new("/p/p.pro", vec![part])
    }

    #[test]
    fn test_only_files_added() {
        let old = info(&["/p/a.cpp"], &[]);
        let new = info(&["/p/a.cpp", "/p/b.cpp"], &[]);
        let cmp = ProjectInfoComparer::new(&old, &new);
        assert!(!cmp.config_changed());
        assert!(cmp.files_changed());
        assert_eq!(
            cmp.added_files().into_iter().collect::<Vec<_>>(),
            vec![FilePath::new("/p/b.cpp")]
        );
        assert!(cmp.removed_files().is_empty());
    }

    #[test]
    fn test_defines_changed() {
        let old = info(&["/p/a.cpp"], &[ProjectMacro::new("FOO", "1")]);
        let new = info(&["/p/a.cpp"], &[ProjectMacro::new("FOO", "2")]);
        let cmp = ProjectInfoComparer::new(&old, &new);
        assert!(cmp.defines_changed());
        assert!(cmp.config_changed());
    }

    #[test]
    fn test_removed_parts() {
        let old = ProjectInfo::new(
            "/p/p.pro",
            vec![
                ProjectPart::new("/p/p.pro", "app"),
                ProjectPart::new("/p/p.pro", "lib"),
            ],
        );
        let new = ProjectInfo::new("/p/p.pro", vec![ProjectPart::new("/p/p.pro", "app")]);
        let cmp = ProjectInfoComparer::new(&old, &new);
        assert_eq!(cmp.removed_project_parts().len(), 1);
        assert_eq!(&*cmp.removed_project_parts()[0], "/p/p.pro:lib");
    }

    #[test]
    fn test_timestamp_modified() {
        let old = info(&["/p/a.cpp", "/p/b.cpp"], &[]);
        let new = old.clone();
        let cmp = ProjectInfoComparer::new(&old, &new);
        let epoch = SystemTime::UNIX_EPOCH;
        let modified = cmp.timestamp_modified_files(
            |_| Some(epoch),
            |p| {
                if p.as_str() == "/p/b.cpp" {
                    Some(epoch + Duration::from_secs(5))
                } else {
                    Some(epoch)
                }
            },
        );
        assert_eq!(
            modified.into_iter().collect::<Vec<_>>(),
            vec![FilePath::new("/p/b.cpp")]
        );
    }
}
