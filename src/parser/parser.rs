//! Recursive descent declaration parser
//!
//! Builds a [`DeclTree`] from preprocessed tokens. The parser is deliberately
//! forgiving: it understands enough of C and C++ to find declarations, scopes
//! and name references, reports what it cannot make sense of as diagnostics,
//! and recovers at the next `;` or `}`.

use super::diagnostic::Diagnostic;
use super::keywords::Keyword;
use super::preprocessor::PpToken;
use super::syntax_kind::SyntaxKind;
use super::tree::{Access, DeclId, DeclTree};
use crate::base::Position;
use crate::project::LanguageFeatures;

/// Nesting limit for scopes and statements.
const MAX_DEPTH: u32 = 256;

/// Parse result containing the declaration tree and any errors
#[derive(Debug, Clone, Default)]
pub struct Parse {
    pub tree: DeclTree,
    pub diagnostics: Vec<Diagnostic>,
}

impl Parse {
    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parse a preprocessed token stream
pub fn parse(tokens: &[PpToken], features: LanguageFeatures) -> Parse {
    let mut parser = Parser::new(tokens, features);
    parser.translation_unit();
    parser.finish()
}

/// Qt-style member sections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Section {
    Normal,
    Signals,
    Slots,
}

/// The parser state
pub(crate) struct Parser<'t> {
    pub(super) tokens: &'t [PpToken],
    pub(super) pos: usize,
    pub(super) features: LanguageFeatures,
    pub(super) tree: DeclTree,
    pub(super) diagnostics: Vec<Diagnostic>,
    /// Innermost enclosing declaration.
    pub(super) scope: Option<DeclId>,
    pub(super) access: Access,
    pub(super) section: Section,
    pub(super) depth: u32,
    /// A `>>` closed an inner template argument list; one `>` is still owed.
    pub(super) split_gt: bool,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [PpToken], features: LanguageFeatures) -> Self {
        Self {
            tokens,
            pos: 0,
            features,
            tree: DeclTree::new(),
            diagnostics: Vec::new(),
            scope: None,
            access: Access::Public,
            section: Section::Normal,
            depth: 0,
            split_gt: false,
        }
    }

    fn finish(self) -> Parse {
        Parse {
            tree: self.tree,
            diagnostics: self.diagnostics,
        }
    }

    fn translation_unit(&mut self) {
        while !self.at_eof() {
            self.declaration_seq(false);
            if self.at(SyntaxKind::R_BRACE) {
                self.error("unexpected '}'");
                self.bump();
            }
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    pub(super) fn current(&self) -> Option<&'t PpToken> {
        self.tokens.get(self.pos)
    }

    pub(super) fn nth(&self, n: usize) -> Option<&'t PpToken> {
        self.tokens.get(self.pos + n)
    }

    pub(super) fn current_kind(&self) -> SyntaxKind {
        self.nth_kind(0)
    }

    pub(super) fn nth_kind(&self, n: usize) -> SyntaxKind {
        self.nth(n).map(|t| t.kind).unwrap_or(SyntaxKind::ERROR)
    }

    pub(super) fn at(&self, kind: SyntaxKind) -> bool {
        self.current_kind() == kind
    }

    pub(super) fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        kinds.contains(&self.current_kind())
    }

    pub(super) fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(super) fn keyword_of(&self, token: Option<&PpToken>) -> Option<Keyword> {
        let token = token?;
        if token.kind != SyntaxKind::IDENT {
            return None;
        }
        Keyword::classify(&token.text, self.features)
    }

    pub(super) fn keyword(&self) -> Option<Keyword> {
        self.keyword_of(self.current())
    }

    pub(super) fn nth_keyword(&self, n: usize) -> Option<Keyword> {
        self.keyword_of(self.nth(n))
    }

    pub(super) fn at_kw(&self, kw: Keyword) -> bool {
        self.keyword() == Some(kw)
    }

    /// An identifier usable as a name (contextual keywords included).
    pub(super) fn is_name(&self, token: Option<&PpToken>) -> bool {
        match token {
            Some(tok) if tok.kind == SyntaxKind::IDENT => self
                .keyword_of(Some(tok))
                .is_none_or(|kw| kw.is_contextual()),
            _ => false,
        }
    }

    pub(super) fn at_name(&self) -> bool {
        self.is_name(self.current())
    }

    pub(super) fn nth_is_name(&self, n: usize) -> bool {
        self.is_name(self.nth(n))
    }

    pub(super) fn position(&self) -> Position {
        self.current()
            .or_else(|| self.tokens.last())
            .map(|t| t.position)
            .unwrap_or_default()
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    pub(super) fn bump(&mut self) -> Option<&'t PpToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(super) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(super) fn eat_kw(&mut self, kw: Keyword) -> bool {
        if self.at_kw(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(super) fn expect(&mut self, kind: SyntaxKind, what: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error(format!("expected '{what}'"));
        false
    }

    // =========================================================================
    // Error recovery
    // =========================================================================

    pub(super) fn error(&mut self, message: impl Into<String>) {
        let position = self.position();
        let len = self.current().map_or(0, |t| t.len);
        self.diagnostics
            .push(Diagnostic::error(position, message.into()).with_length(len));
    }

    /// Skip to just past the next `;` at this nesting level, or to (not past)
    /// an unmatched `}`.
    pub(super) fn recover(&mut self) {
        let mut depth = 0usize;
        while let Some(tok) = self.current() {
            match tok.kind {
                SyntaxKind::L_BRACE | SyntaxKind::L_PAREN | SyntaxKind::L_BRACKET => depth += 1,
                SyntaxKind::R_BRACE | SyntaxKind::R_PAREN | SyntaxKind::R_BRACKET => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 && tok.kind == SyntaxKind::R_BRACE {
                        self.pos += 1;
                        if self.at(SyntaxKind::SEMICOLON) {
                            self.pos += 1;
                        }
                        return;
                    }
                }
                SyntaxKind::SEMICOLON if depth == 0 => {
                    self.pos += 1;
                    return;
                }
                _ => {}
            }
            self.pos += 1;
        }
    }

    /// Skip a balanced `(...)`, `[...]` or `{...}` without recording anything.
    pub(super) fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        while let Some(tok) = self.bump() {
            match tok.kind {
                SyntaxKind::L_BRACE | SyntaxKind::L_PAREN | SyntaxKind::L_BRACKET => depth += 1,
                SyntaxKind::R_BRACE | SyntaxKind::R_PAREN | SyntaxKind::R_BRACKET => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    pub(super) fn enter(&mut self) -> bool {
        if self.depth >= MAX_DEPTH {
            self.error("nesting too deep");
            self.skip_balanced();
            return false;
        }
        self.depth += 1;
        true
    }

    pub(super) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}
