//! Search order of candidate files for one reference file.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::base::FilePath;

/// Which project parts a file belongs to.
pub trait PartMembership {
    fn part_ids(&self, path: &FilePath) -> Vec<Arc<str>>;
}

impl PartMembership for FxHashMap<FilePath, Vec<Arc<str>>> {
    fn part_ids(&self, path: &FilePath) -> Vec<Arc<str>> {
        self.get(path).cloned().unwrap_or_default()
    }
}

/// Membership for callers without project information.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoParts;

impl PartMembership for NoParts {
    fn part_ids(&self, _path: &FilePath) -> Vec<Arc<str>> {
        Vec::new()
    }
}

type Rank = (Reverse<bool>, Reverse<usize>, FilePath);

/// Ordered candidate set. Files sharing a project part with the reference
/// file come first, then files with a longer common path prefix, then by path.
#[derive(Debug, Clone)]
pub struct FileIterationOrder {
    reference: FilePath,
    reference_parts: Vec<Arc<str>>,
    ordered: BTreeSet<Rank>,
    ranks: FxHashMap<FilePath, Rank>,
}

impl FileIterationOrder {
    pub fn new(reference: FilePath, reference_parts: Vec<Arc<str>>) -> Self {
        Self {
            reference,
            reference_parts,
            ordered: BTreeSet::new(),
            ranks: FxHashMap::default(),
        }
    }

    pub fn reference(&self) -> &FilePath {
        &self.reference
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn contains(&self, path: &FilePath) -> bool {
        self.ranks.contains_key(path)
    }

    pub fn insert(&mut self, path: FilePath, parts: &[Arc<str>]) {
        if self.ranks.contains_key(&path) {
            return;
        }
        let same_part = parts.iter().any(|p| self.reference_parts.contains(p));
        let prefix = self.reference.common_prefix_len(&path);
        let rank = (Reverse(same_part), Reverse(prefix), path.clone());
        self.ordered.insert(rank.clone());
        self.ranks.insert(path, rank);
    }

    pub fn remove(&mut self, path: &FilePath) {
        if let Some(rank) = self.ranks.remove(path) {
            self.ordered.remove(&rank);
        }
    }

    /// Drop files not in `present`.
    pub fn retain(&mut self, mut present: impl FnMut(&FilePath) -> bool) {
        let gone: Vec<FilePath> = self.ranks.keys().filter(|p| !present(p)).cloned().collect();
        for path in &gone {
            self.remove(path);
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &FilePath> {
        self.ordered.iter().map(|(_, _, path)| path)
    }

    pub fn to_vec(&self) -> Vec<FilePath> {
        self.paths().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn parts(entries: &[(&str, &str)]) -> FxHashMap<FilePath, Vec<Arc<str>>> {
        let mut map: FxHashMap<FilePath, Vec<Arc<str>>> = FxHashMap::default();
        for (path, part) in entries {
            map.entry(FilePath::new(*path)).or_default().push(Arc::from(*part));
        }
        map
    }

    #[test]
    fn test_same_part_first() {
        let membership = parts(&[
            ("/p1/a.cpp", "P1"),
            ("/p1/a_sibling.cpp", "P1"),
            ("/p1/b.cpp", "P2"),
        ]);
        let reference = FilePath::new("/p1/a.cpp");
        let mut order = FileIterationOrder::new(reference.clone(), membership.part_ids(&reference));
        for path in ["/p1/b.cpp", "/p1/a_sibling.cpp", "/p1/a.cpp"] {
            let path = FilePath::new(path);
            let ids = membership.part_ids(&path);
            order.insert(path, &ids);
        }

        assert_eq!(
            order.to_vec(),
            vec![
                FilePath::new("/p1/a.cpp"),
                FilePath::new("/p1/a_sibling.cpp"),
                FilePath::new("/p1/b.cpp"),
            ]
        );
    }

    #[test]
    fn test_common_prefix_then_path() {
        let mut order = FileIterationOrder::new(FilePath::new("/src/core/x.cpp"), Vec::new());
        for path in ["/other/z.cpp", "/src/gui/y.cpp", "/src/core/w.cpp", "/other/a.cpp"] {
            order.insert(FilePath::new(path), &[]);
        }

        assert_eq!(
            order.to_vec(),
            vec![
                FilePath::new("/src/core/w.cpp"),
                FilePath::new("/src/gui/y.cpp"),
                FilePath::new("/other/a.cpp"),
                FilePath::new("/other/z.cpp"),
            ]
        );
    }

    #[test]
    fn test_remove_and_retain() {
        let mut order = FileIterationOrder::new(FilePath::new("/a.cpp"), Vec::new());
        order.insert(FilePath::new("/b.cpp"), &[]);
        order.insert(FilePath::new("/c.cpp"), &[]);
        order.insert(FilePath::new("/b.cpp"), &[]);
        assert_eq!(order.len(), 2);

        order.remove(&FilePath::new("/b.cpp"));
        assert!(!order.contains(&FilePath::new("/b.cpp")));
        order.retain(|p| p.as_str() != "/c.cpp");
        assert!(order.is_empty());
    }
}
