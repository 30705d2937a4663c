//! Compilation configurations.

use std::fmt;
use std::sync::Arc;

use crate::base::FilePath;

/// Dialect switches that change how sources are lexed and parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LanguageFeatures {
    pub cxx: bool,
    pub cxx11: bool,
    pub cxx14: bool,
    pub cxx17: bool,
    pub cxx20: bool,
    /// `signals`, `slots` and friends are keywords.
    pub qt_keywords: bool,
}

impl LanguageFeatures {
    /// Plain C.
    pub const fn c() -> Self {
        Self {
            cxx: false,
            cxx11: false,
            cxx14: false,
            cxx17: false,
            cxx20: false,
            qt_keywords: false,
        }
    }

    /// The newest C++ dialect with Qt keywords enabled.
    pub const fn cxx() -> Self {
        Self {
            cxx: true,
            cxx11: true,
            cxx14: true,
            cxx17: true,
            cxx20: true,
            qt_keywords: true,
        }
    }

    /// Union of two feature sets.
    pub fn merged(self, other: Self) -> Self {
        Self {
            cxx: self.cxx || other.cxx,
            cxx11: self.cxx11 || other.cxx11,
            cxx14: self.cxx14 || other.cxx14,
            cxx17: self.cxx17 || other.cxx17,
            cxx20: self.cxx20 || other.cxx20,
            qt_keywords: self.qt_keywords || other.qt_keywords,
        }
    }
}

impl Default for LanguageFeatures {
    fn default() -> Self {
        Self::cxx()
    }
}

/// How a header search path is consulted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeaderPathKind {
    User,
    System,
    /// `<Fw/H.h>` maps to `<path>/Fw.framework/Headers/H.h`.
    Framework,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeaderPath {
    pub path: String,
    pub kind: HeaderPathKind,
}

impl HeaderPath {
    pub fn user(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: HeaderPathKind::User,
        }
    }

    pub fn system(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: HeaderPathKind::System,
        }
    }

    pub fn framework(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: HeaderPathKind::Framework,
        }
    }

    pub fn is_framework(&self) -> bool {
        self.kind == HeaderPathKind::Framework
    }
}

/// A `-DKEY=VALUE` style definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectMacro {
    pub key: String,
    pub value: Option<String>,
}

impl ProjectMacro {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// A macro defined without a value (`-DKEY`).
    pub fn flag(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    /// Parse `KEY`, `KEY=VALUE` or `KEY VALUE`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (key, value) = match text.split_once(['=', ' ']) {
            Some((key, value)) => (key.trim(), Some(value.trim().to_string())),
            None => (text, None),
        };
        (!key.is_empty()).then(|| Self {
            key: key.to_string(),
            value,
        })
    }

    pub fn to_define_line(&self) -> String {
        match &self.value {
            Some(value) => format!("#define {} {}", self.key, value),
            None => format!("#define {}", self.key),
        }
    }
}

/// Render macros as `#define` lines.
pub fn defines_text(macros: &[ProjectMacro]) -> String {
    let mut text = String::new();
    for m in macros {
        text.push_str(&m.to_define_line());
        text.push('\n');
    }
    text
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectFileKind {
    Source,
    Header,
}

const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "c++", "m", "mm"];
const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "h++", "inl", "tcc"];

impl ProjectFileKind {
    /// Classify by extension; unknown extensions count as headers.
    pub fn classify(path: &FilePath) -> Self {
        match path.extension().map(|e| e.to_ascii_lowercase()) {
            Some(ext) if SOURCE_EXTENSIONS.contains(&ext.as_str()) => ProjectFileKind::Source,
            _ => ProjectFileKind::Header,
        }
    }

    /// Recognized C-family extension.
    pub fn is_known(path: &FilePath) -> bool {
        path.extension()
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|ext| {
                SOURCE_EXTENSIONS.contains(&ext.as_str()) || HEADER_EXTENSIONS.contains(&ext.as_str())
            })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProjectFile {
    pub path: FilePath,
    pub kind: ProjectFileKind,
}

impl ProjectFile {
    pub fn new(path: impl Into<FilePath>) -> Self {
        let path = path.into();
        let kind = ProjectFileKind::classify(&path);
        Self { path, kind }
    }

    pub fn is_source(&self) -> bool {
        self.kind == ProjectFileKind::Source
    }
}

/// One compilation configuration of a project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectPart {
    /// Unique within the process.
    pub id: Arc<str>,
    pub display_name: String,
    /// The project this part belongs to.
    pub project: FilePath,
    pub files: Vec<ProjectFile>,
    pub header_paths: Vec<HeaderPath>,
    pub macros: Vec<ProjectMacro>,
    pub features: LanguageFeatures,
    /// Files processed before each source, like `-include`.
    pub forced_includes: Vec<FilePath>,
}

impl ProjectPart {
    pub fn new(project: impl Into<FilePath>, display_name: impl Into<String>) -> Self {
        let project = project.into();
        let display_name = display_name.into();
        let id = Arc::from(format!("{}:{}", project, display_name));
        Self {
            id,
            display_name,
            project,
            files: Vec::new(),
            header_paths: Vec::new(),
            macros: Vec::new(),
            features: LanguageFeatures::default(),
            forced_includes: Vec::new(),
        }
    }

    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<FilePath>,
    {
        self.files
            .extend(files.into_iter().map(|p| ProjectFile::new(p)));
        self
    }

    pub fn with_header_paths(mut self, paths: impl IntoIterator<Item = HeaderPath>) -> Self {
        self.header_paths.extend(paths);
        self
    }

    pub fn with_macros(mut self, macros: impl IntoIterator<Item = ProjectMacro>) -> Self {
        self.macros.extend(macros);
        self
    }

    pub fn with_features(mut self, features: LanguageFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn contains(&self, path: &FilePath) -> bool {
        self.files.iter().any(|f| &f.path == path)
    }

    pub fn defines_text(&self) -> String {
        defines_text(&self.macros)
    }
}

impl fmt::Display for ProjectPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}
