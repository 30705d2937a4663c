//! Normalized file paths.

use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A normalized file path, cheap to clone.
///
/// Separators are forward slashes, `.` segments are dropped and `..` segments
/// are folded into their parent. Injected pseudo-files such as
/// `<configuration>` are kept verbatim.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilePath(Arc<str>);

impl FilePath {
    pub fn new(path: impl AsRef<str>) -> Self {
        let raw = path.as_ref();
        if raw.starts_with('<') {
            return Self(Arc::from(raw));
        }
        Self(Arc::from(normalize(raw)))
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&*self.0)
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&*self.0)
    }

    /// Pseudo-files that never exist on disk (e.g. `<configuration>`).
    pub fn is_injected(&self) -> bool {
        self.0.starts_with('<')
    }

    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/') || self.0.as_bytes().get(1) == Some(&b':')
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Directory part including the trailing slash, or `""` for bare names.
    pub fn directory(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..=idx],
            None => "",
        }
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        let idx = name.rfind('.')?;
        (idx > 0).then(|| &name[idx + 1..])
    }

    /// Resolve `relative` against this path's directory.
    pub fn sibling(&self, relative: &str) -> FilePath {
        FilePath::new(format!("{}{}", self.directory(), relative))
    }

    /// Join a directory path with a relative path.
    pub fn join(dir: &str, relative: &str) -> FilePath {
        if dir.is_empty() {
            return FilePath::new(relative);
        }
        if dir.ends_with('/') {
            FilePath::new(format!("{dir}{relative}"))
        } else {
            FilePath::new(format!("{dir}/{relative}"))
        }
    }

    /// Length of the common leading byte prefix of two paths.
    pub fn common_prefix_len(&self, other: &FilePath) -> usize {
        self.0
            .bytes()
            .zip(other.0.bytes())
            .take_while(|(a, b)| a == b)
            .count()
    }
}

fn normalize(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute { format!("/{joined}") } else { joined }
}

impl Borrow<str> for FilePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FilePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl From<&str> for FilePath {
    fn from(value: &str) -> Self {
        FilePath::new(value)
    }
}

impl From<String> for FilePath {
    fn from(value: String) -> Self {
        FilePath::new(value)
    }
}

impl From<&Path> for FilePath {
    fn from(value: &Path) -> Self {
        FilePath::from_path(value)
    }
}

impl From<PathBuf> for FilePath {
    fn from(value: PathBuf) -> Self {
        FilePath::from_path(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dots_and_separators() {
        assert_eq!(FilePath::new("/a/./b/../c.h").as_str(), "/a/c.h");
        assert_eq!(FilePath::new("C:\\src\\main.cpp").as_str(), "C:/src/main.cpp");
        assert_eq!(FilePath::new("/a//b/").as_str(), "/a/b");
        assert_eq!(FilePath::new("../x/y.h").as_str(), "../x/y.h");
    }

    #[test]
    fn test_injected_paths_are_verbatim() {
        let conf = FilePath::new("<configuration>");
        assert!(conf.is_injected());
        assert_eq!(conf.as_str(), "<configuration>");
    }

    #[test]
    fn test_directory_and_extension() {
        let path = FilePath::new("/src/app/main.cpp");
        assert_eq!(path.directory(), "/src/app/");
        assert_eq!(path.file_name(), "main.cpp");
        assert_eq!(path.extension(), Some("cpp"));
        assert_eq!(path.sibling("../inc/a.h").as_str(), "/src/inc/a.h");
    }

    #[test]
    fn test_borrow_lookup_in_hash_map() {
        let mut map = rustc_hash::FxHashMap::default();
        map.insert(FilePath::new("/a/b.h"), 1);
        assert_eq!(map.get("/a/b.h"), Some(&1));
    }
}
