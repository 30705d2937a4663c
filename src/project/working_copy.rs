//! Unsaved and generated file contents layered over the disk.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::base::FilePath;

/// Path of the pseudo-file holding project-wide `#define`s.
pub const CONFIGURATION_FILE: &str = "<configuration>";

/// Prelude of every `<configuration>` file.
pub const CONFIGURATION_PRELUDE: &str = "#define CODEMODEL_RUN 1\n";

pub fn configuration_path() -> FilePath {
    FilePath::new(CONFIGURATION_FILE)
}

/// Content of the `<configuration>` pseudo-file for the given define lines.
pub fn configuration_source(defines: &str) -> String {
    let mut text = String::from(CONFIGURATION_PRELUDE);
    text.push_str(defines);
    text
}

/// Path → (contents, revision). Cheap to clone; entries are shared.
#[derive(Clone, Debug, Default)]
pub struct WorkingCopy {
    entries: FxHashMap<FilePath, (Arc<str>, u32)>,
}

impl WorkingCopy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<FilePath>, contents: impl Into<Arc<str>>, revision: u32) {
        self.entries.insert(path.into(), (contents.into(), revision));
    }

    pub fn remove(&mut self, path: &FilePath) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn contains(&self, path: &FilePath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &FilePath) -> Option<(Arc<str>, u32)> {
        self.entries.get(path).cloned()
    }

    pub fn source(&self, path: &FilePath) -> Option<Arc<str>> {
        self.entries.get(path).map(|(contents, _)| contents.clone())
    }

    pub fn revision(&self, path: &FilePath) -> Option<u32> {
        self.entries.get(path).map(|&(_, rev)| rev)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &FilePath> {
        self.entries.keys()
    }

    /// Entries sorted by path.
    pub fn sorted(&self) -> Vec<(&FilePath, u32)> {
        let mut items: Vec<_> = self.entries.iter().map(|(p, (_, rev))| (p, *rev)).collect();
        items.sort();
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_entries() {
        let mut wc = WorkingCopy::new();
        wc.insert("/p/a.h", "int x;", 3);
        let path = FilePath::new("/p/a.h");
        assert!(wc.contains(&path));
        assert_eq!(wc.revision(&path), Some(3));
        assert_eq!(wc.source(&path).as_deref(), Some("int x;"));
        assert!(wc.remove(&path));
        assert!(wc.is_empty());
    }

    #[test]
    fn test_configuration_source() {
        let text = configuration_source("#define FOO 1\n");
        assert!(text.starts_with(CONFIGURATION_PRELUDE));
        assert!(text.ends_with("#define FOO 1\n"));
        assert!(configuration_path().is_injected());
    }
}
