//! The parse result of one file.

use std::sync::Arc;
use std::time::SystemTime;

use rustc_hash::FxHashSet;
use xxhash_rust::xxh3::Xxh3;

use crate::base::{FilePath, Name, Position, Span};
use crate::parser::preprocessor::{
    Include, Macro, MacroUse, PpToken, PreprocessedFile, UndefinedMacroUse,
};
use crate::parser::{Diagnostic, DeclTree, Severity, parse};
use crate::project::LanguageFeatures;

/// An immutable, fully processed file.
///
/// Updating a file never mutates its `Document`; a new one replaces it in the
/// snapshot. Everything here is derived from the content the document was
/// built from.
#[derive(Debug, Clone)]
pub struct Document {
    path: FilePath,
    revision: u32,
    fingerprint: u64,
    /// Kept only for working-copy content.
    source: Option<Arc<str>>,
    last_modified: Option<SystemTime>,
    features: LanguageFeatures,
    tokens: Vec<PpToken>,
    diagnostics: Vec<Diagnostic>,
    defined_macros: Vec<Arc<Macro>>,
    macro_uses: Vec<MacroUse>,
    undefined_macro_uses: Vec<UndefinedMacroUse>,
    includes: Vec<Include>,
    skipped_ranges: Vec<Span>,
    tree: DeclTree,
    identifiers: FxHashSet<Name>,
}

/// Builder inputs that are not part of the preprocessor output.
#[derive(Debug, Clone, Default)]
pub struct DocumentOrigin {
    pub revision: u32,
    pub source: Option<Arc<str>>,
    pub last_modified: Option<SystemTime>,
}

impl Document {
    /// Parse preprocessed output into a document.
    pub fn new(
        path: FilePath,
        preprocessed: PreprocessedFile,
        features: LanguageFeatures,
        origin: DocumentOrigin,
    ) -> Self {
        let PreprocessedFile {
            tokens,
            mut diagnostics,
            defined_macros,
            macro_uses,
            undefined_macro_uses,
            includes,
            skipped_ranges,
        } = preprocessed;

        let parsed = parse(&tokens, features);
        diagnostics.extend(parsed.diagnostics);

        let identifiers = collect_identifiers(&tokens, &defined_macros, &macro_uses, &undefined_macro_uses);
        let fingerprint = fingerprint(&tokens, &includes, &defined_macros);

        Self {
            path,
            revision: origin.revision,
            fingerprint,
            source: origin.source,
            last_modified: origin.last_modified,
            features,
            tokens,
            diagnostics,
            defined_macros,
            macro_uses,
            undefined_macro_uses,
            includes,
            skipped_ranges,
            tree: parsed.tree,
            identifiers,
        }
    }

    /// A document that only records that `path` could not be read.
    pub fn unreadable(path: FilePath, revision: u32) -> Self {
        let mut preprocessed = PreprocessedFile::default();
        preprocessed
            .diagnostics
            .push(Diagnostic::warning(Position::default(), "Could not get file contents"));
        Self::new(
            path,
            preprocessed,
            LanguageFeatures::default(),
            DocumentOrigin {
                revision,
                ..DocumentOrigin::default()
            },
        )
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Hash of the token stream, the resolved includes and the macro table.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn source(&self) -> Option<&Arc<str>> {
        self.source.as_ref()
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    pub fn features(&self) -> LanguageFeatures {
        self.features
    }

    pub fn tokens(&self) -> &[PpToken] {
        &self.tokens
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity >= Severity::Error)
    }

    pub fn defined_macros(&self) -> &[Arc<Macro>] {
        &self.defined_macros
    }

    /// Last visible definition of `name` in this file.
    pub fn find_macro(&self, name: &str) -> Option<&Arc<Macro>> {
        self.defined_macros
            .iter()
            .rev()
            .find(|m| m.name == name)
            .filter(|m| !m.hidden)
    }

    pub fn macro_uses(&self) -> &[MacroUse] {
        &self.macro_uses
    }

    pub fn undefined_macro_uses(&self) -> &[UndefinedMacroUse] {
        &self.undefined_macro_uses
    }

    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    pub fn resolved_includes(&self) -> impl Iterator<Item = &FilePath> {
        self.includes.iter().filter_map(|i| i.resolved.as_ref())
    }

    pub fn unresolved_includes(&self) -> impl Iterator<Item = &Include> {
        self.includes.iter().filter(|i| i.resolved.is_none())
    }

    pub fn skipped_ranges(&self) -> &[Span] {
        &self.skipped_ranges
    }

    pub fn tree(&self) -> &DeclTree {
        &self.tree
    }

    /// Cheap pre-filter: whether `name` occurs anywhere in this file.
    pub fn contains_identifier(&self, name: &str) -> bool {
        self.identifiers.contains(name)
    }

    pub fn identifier_count(&self) -> usize {
        self.identifiers.len()
    }
}

fn collect_identifiers(
    tokens: &[PpToken],
    defined: &[Arc<Macro>],
    uses: &[MacroUse],
    undefined: &[UndefinedMacroUse],
) -> FxHashSet<Name> {
    let mut names: FxHashSet<Name> = tokens
        .iter()
        .filter(|t| t.is_ident())
        .map(|t| t.text.clone())
        .collect();
    names.extend(defined.iter().map(|m| m.name.clone()));
    names.extend(uses.iter().map(|u| u.macro_def.name.clone()));
    names.extend(undefined.iter().map(|u| u.name.clone()));
    names
}

fn fingerprint(tokens: &[PpToken], includes: &[Include], macros: &[Arc<Macro>]) -> u64 {
    let mut hasher = Xxh3::new();
    for token in tokens {
        hasher.update(&(token.kind as u16).to_le_bytes());
        hasher.update(&token.position.line.to_le_bytes());
        hasher.update(&token.position.column.to_le_bytes());
        hasher.update(&[u8::from(token.generated)]);
        hasher.update(token.text.as_bytes());
        hasher.update(&[0]);
    }
    for include in includes {
        hasher.update(&include.line.to_le_bytes());
        if let Some(resolved) = &include.resolved {
            hasher.update(resolved.as_str().as_bytes());
        }
        hasher.update(&[0]);
    }
    for def in macros {
        hasher.update(def.definition_text().as_bytes());
        hasher.update(&[u8::from(def.hidden)]);
    }
    hasher.digest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::preprocessor::{Environment, NoIncludes, preprocess};

    fn document(source: &str) -> Document {
        let path = FilePath::new("/p/a.cpp");
        let mut env = Environment::new();
        let pp = preprocess(&path, source, &mut env, &mut NoIncludes);
        Document::new(path, pp, LanguageFeatures::cxx(), DocumentOrigin::default())
    }

    #[test]
    fn test_identifier_table() {
        let doc = document("#define N 3\nint value = N;\n#ifdef MISSING\n#endif\n");
        assert!(doc.contains_identifier("value"));
        assert!(doc.contains_identifier("N"));
        assert!(doc.contains_identifier("MISSING"));
        assert!(!doc.contains_identifier("other"));
    }

    #[test]
    fn test_fingerprint_stable_and_sensitive() {
        let a = document("int f();\n");
        let b = document("int f();\n");
        let c = document("int g();\n");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_fingerprint_covers_macros() {
        let a = document("#define FOO 1\n");
        let b = document("#define FOO 2\n");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_unresolved_include_recorded() {
        let doc = document("#include \"missing.h\"\nint x;\n");
        assert_eq!(doc.unresolved_includes().count(), 1);
        assert_eq!(doc.resolved_includes().count(), 0);
        assert!(!doc.has_errors());
        assert_eq!(doc.tree().roots().len(), 1);
    }
}
