//! C preprocessor
//!
//! Runs directly over the logos token stream. Tokens are grouped into logical
//! lines (line continuations are trivia, so they never end a line); a line that
//! starts with `#` is a directive, everything else is text that is buffered and
//! macro-expanded when the next active directive (or the end of input) is seen.
//!
//! ```text
//! source ──lexer──▶ lines ──▶ directive? ──yes──▶ conditionals / #define / #include
//!                               │                                       │
//!                               no                           PreprocessorClient
//!                               ▼                                       │
//!                         pending text ──expand──▶ PpToken stream   (nested files)
//! ```
//!
//! Include resolution and recursion are delegated to a [`PreprocessorClient`],
//! which receives the live [`Environment`] so that macros defined by nested
//! files become visible to the rest of the including file.

mod environment;
mod expand;
mod expression;

use std::sync::Arc;

pub use environment::{Environment, Macro, MacroToken};
pub use expression::evaluate;

use crate::base::{FilePath, Name, Position, Span};
use crate::parser::diagnostic::Diagnostic;
use crate::parser::lexer::{Token, tokenize};
use crate::parser::syntax_kind::SyntaxKind;

use self::expand::ExpToken;

/// A token of preprocessed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpToken {
    pub kind: SyntaxKind,
    pub text: Name,
    /// Position in the preprocessed file. Tokens produced by a macro body carry
    /// the position of the macro use.
    pub position: Position,
    pub len: u32,
    /// Produced by macro expansion rather than spelled at `position`.
    pub generated: bool,
}

impl PpToken {
    pub(crate) fn from_token(token: &Token<'_>) -> Self {
        Self {
            kind: token.kind,
            text: Name::new(token.text),
            position: Position::new(token.line, token.column),
            len: token.text.len() as u32,
            generated: false,
        }
    }

    pub fn is_ident(&self) -> bool {
        self.kind == SyntaxKind::IDENT
    }
}

/// How an include was spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncludeKind {
    /// `#include "file"`
    Local,
    /// `#include <file>`
    Global,
    /// `#include_next`
    Next,
}

/// A request to make an included file's macros available.
#[derive(Debug, Clone)]
pub struct IncludeRequest<'a> {
    pub including_file: &'a FilePath,
    pub spelled: &'a str,
    pub kind: IncludeKind,
    pub line: u32,
}

/// What the client did with an [`IncludeRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeOutcome {
    Resolved(FilePath),
    NotFound,
    Unreadable(FilePath),
    TooDeep(FilePath),
}

/// An include directive as recorded on a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Include {
    pub spelled: Name,
    /// `None` when the file could not be found.
    pub resolved: Option<FilePath>,
    pub line: u32,
    pub kind: IncludeKind,
}

/// A use of a defined macro in the file's own text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroUse {
    pub macro_def: Arc<Macro>,
    pub position: Position,
    pub len: u32,
}

/// A check (`#ifdef`, `defined`) of a name that was not defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndefinedMacroUse {
    pub name: Name,
    pub position: Position,
}

/// Everything the preprocessor learned about one file.
#[derive(Debug, Clone, Default)]
pub struct PreprocessedFile {
    pub tokens: Vec<PpToken>,
    pub diagnostics: Vec<Diagnostic>,
    /// `#define`s and `#undef`s of this file, in order.
    pub defined_macros: Vec<Arc<Macro>>,
    pub macro_uses: Vec<MacroUse>,
    pub undefined_macro_uses: Vec<UndefinedMacroUse>,
    pub includes: Vec<Include>,
    /// Line ranges of inactive conditional blocks (end line exclusive).
    pub skipped_ranges: Vec<Span>,
}

/// Resolves and processes included files on behalf of the preprocessor.
pub trait PreprocessorClient {
    fn source_needed(&mut self, env: &mut Environment, request: &IncludeRequest<'_>)
    -> IncludeOutcome;
}

/// Client that resolves nothing. Includes are recorded as not found.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIncludes;

impl PreprocessorClient for NoIncludes {
    fn source_needed(&mut self, _: &mut Environment, _: &IncludeRequest<'_>) -> IncludeOutcome {
        IncludeOutcome::NotFound
    }
}

/// Preprocess `source`, reading and extending `env`.
pub fn preprocess<C: PreprocessorClient + ?Sized>(
    path: &FilePath,
    source: &str,
    env: &mut Environment,
    client: &mut C,
) -> PreprocessedFile {
    let mut pp = Preprocessor {
        path,
        source,
        env,
        client,
        out: PreprocessedFile::default(),
        conditions: Vec::new(),
        pending: Vec::new(),
        expansion_budget: expand::EXPANSION_LIMIT,
    };
    pp.run();
    pp.out
}

#[derive(Debug)]
struct Condition {
    parent_active: bool,
    taking: bool,
    taken: bool,
    seen_else: bool,
    skip_start: Option<u32>,
    line: u32,
}

pub(crate) struct Preprocessor<'a, C: ?Sized> {
    path: &'a FilePath,
    source: &'a str,
    env: &'a mut Environment,
    client: &'a mut C,
    out: PreprocessedFile,
    conditions: Vec<Condition>,
    pending: Vec<PpToken>,
    expansion_budget: usize,
}

impl<C: PreprocessorClient + ?Sized> Preprocessor<'_, C> {
    fn run(&mut self) {
        let tokens = tokenize(self.source);
        let mut start = 0;
        for (idx, token) in tokens.iter().enumerate() {
            if token.kind == SyntaxKind::NEWLINE {
                self.line(&tokens[start..idx]);
                start = idx + 1;
            }
        }
        self.line(&tokens[start..]);
        self.flush();

        let last_line = tokens.last().map_or(0, |t| t.line + 1);
        while let Some(cond) = self.conditions.pop() {
            if cond.parent_active
                && let Some(skip) = cond.skip_start
            {
                self.push_skipped(skip, last_line);
            }
            self.out.diagnostics.push(Diagnostic::error(
                Position::new(cond.line, 0),
                "unterminated conditional directive",
            ));
        }
    }

    fn is_active(&self) -> bool {
        self.conditions.last().is_none_or(|c| c.taking)
    }

    fn line(&mut self, tokens: &[Token<'_>]) {
        let Some(first) = tokens.first() else {
            return;
        };
        if first.kind == SyntaxKind::HASH {
            self.directive(first, &tokens[1..]);
        } else if self.is_active() {
            self.pending.extend(tokens.iter().map(PpToken::from_token));
        }
    }

    /// Expand buffered text into the output.
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        let expanded = self.expand_all(pending.into_iter().map(ExpToken::new).collect());
        self.out
            .tokens
            .extend(expanded.into_iter().map(|tok| tok.token));
    }

    fn directive(&mut self, hash: &Token<'_>, tokens: &[Token<'_>]) {
        let Some(name) = tokens.first() else {
            return;
        };
        let line = hash.line;
        let args = &tokens[1..];

        if self.is_active() {
            self.flush();
        }

        match name.text {
            "if" => {
                let parent_active = self.is_active();
                let value = parent_active && self.condition_value(name, args);
                self.open_condition(parent_active, value, line);
                return;
            }
            "ifdef" | "ifndef" => {
                let parent_active = self.is_active();
                let value = parent_active && {
                    let defined = match args.first() {
                        Some(tok) if tok.kind == SyntaxKind::IDENT => self.check_defined(tok),
                        _ => {
                            self.out.diagnostics.push(Diagnostic::error(
                                position_of(name),
                                format!("no macro name given in #{} directive", name.text),
                            ));
                            false
                        }
                    };
                    defined == (name.text == "ifdef")
                };
                self.open_condition(parent_active, value, line);
                return;
            }
            "elif" => {
                self.else_branch(name, Some(args), line);
                return;
            }
            "else" => {
                self.else_branch(name, None, line);
                return;
            }
            "endif" => {
                match self.conditions.pop() {
                    Some(cond) => {
                        if cond.parent_active
                            && let Some(skip) = cond.skip_start
                        {
                            self.push_skipped(skip, line);
                        }
                    }
                    None => self
                        .out
                        .diagnostics
                        .push(Diagnostic::error(position_of(name), "#endif without #if")),
                }
                return;
            }
            _ => {}
        }

        if !self.is_active() {
            return;
        }

        if name.kind != SyntaxKind::IDENT {
            self.out.diagnostics.push(Diagnostic::warning(
                position_of(name),
                "invalid preprocessing directive",
            ));
            return;
        }

        match name.text {
            "define" => self.define(name, args),
            "undef" => self.undef(name, args),
            "include" | "import" => self.include(name, args, false),
            "include_next" => self.include(name, args, true),
            "error" => {
                let message = format!("#error {}", self.rest_of_line(args));
                self.out
                    .diagnostics
                    .push(Diagnostic::error(position_of(name), message.trim_end().to_string()));
            }
            "warning" => {
                let message = format!("#warning {}", self.rest_of_line(args));
                self.out.diagnostics.push(Diagnostic::warning(
                    position_of(name),
                    message.trim_end().to_string(),
                ));
            }
            "pragma" | "line" | "ident" | "sccs" | "assert" | "unassert" => {}
            other => self.out.diagnostics.push(
                Diagnostic::warning(
                    position_of(name),
                    format!("unknown preprocessing directive '#{other}'"),
                )
                .with_length(other.len() as u32),
            ),
        }
    }

    fn open_condition(&mut self, parent_active: bool, value: bool, line: u32) {
        self.conditions.push(Condition {
            parent_active,
            taking: parent_active && value,
            taken: value,
            seen_else: false,
            skip_start: (parent_active && !value).then_some(line + 1),
            line,
        });
    }

    fn else_branch(&mut self, name: &Token<'_>, condition: Option<&[Token<'_>]>, line: u32) {
        let directive = name.text;
        let Some(cond) = self.conditions.last() else {
            self.out.diagnostics.push(Diagnostic::error(
                position_of(name),
                format!("#{directive} without #if"),
            ));
            return;
        };
        if cond.seen_else {
            self.out.diagnostics.push(Diagnostic::error(
                position_of(name),
                format!("#{directive} after #else"),
            ));
        }
        let parent_active = cond.parent_active;
        let already_taken = cond.taken;

        let value = match condition {
            Some(args) if parent_active && !already_taken => self.condition_value(name, args),
            Some(_) => false,
            None => true,
        };

        let mut closed_skip = None;
        if let Some(cond) = self.conditions.last_mut() {
            if parent_active {
                closed_skip = cond.skip_start.take();
            }
            let take = parent_active && !cond.taken && value;
            cond.taking = take;
            cond.taken |= take;
            cond.seen_else |= condition.is_none();
            if parent_active && !take {
                cond.skip_start = Some(line + 1);
            }
        }
        if let Some(skip) = closed_skip {
            self.push_skipped(skip, line);
        }
    }

    fn push_skipped(&mut self, start: u32, end: u32) {
        if end > start {
            self.out.skipped_ranges.push(Span::from_coords(start, 0, end, 0));
        }
    }

    /// Record a check of `name`, returning whether it is defined.
    fn check_defined(&mut self, name: &Token<'_>) -> bool {
        match self.env.resolve(name.text) {
            Some(def) => {
                self.out.macro_uses.push(MacroUse {
                    macro_def: Arc::clone(def),
                    position: position_of(name),
                    len: name.text.len() as u32,
                });
                true
            }
            None => {
                self.out.undefined_macro_uses.push(UndefinedMacroUse {
                    name: Name::new(name.text),
                    position: position_of(name),
                });
                false
            }
        }
    }

    fn condition_value(&mut self, directive: &Token<'_>, args: &[Token<'_>]) -> bool {
        let mut prepared = Vec::with_capacity(args.len());
        let mut idx = 0;
        while idx < args.len() {
            let token = &args[idx];
            if token.kind == SyntaxKind::IDENT && token.text == "defined" {
                let (target, consumed) = match args.get(idx + 1) {
                    Some(open) if open.kind == SyntaxKind::L_PAREN => {
                        match (args.get(idx + 2), args.get(idx + 3)) {
                            (Some(name), Some(close))
                                if name.kind == SyntaxKind::IDENT
                                    && close.kind == SyntaxKind::R_PAREN =>
                            {
                                (Some(name), 4)
                            }
                            _ => (None, 0),
                        }
                    }
                    Some(name) if name.kind == SyntaxKind::IDENT => (Some(name), 2),
                    _ => (None, 0),
                };
                let Some(target) = target else {
                    self.out.diagnostics.push(Diagnostic::error(
                        position_of(token),
                        "operator 'defined' requires an identifier",
                    ));
                    return false;
                };
                let value = self.check_defined(target);
                let mut literal = PpToken::from_token(token);
                literal.kind = SyntaxKind::NUMBER;
                literal.text = Name::new_static(if value { "1" } else { "0" });
                prepared.push(ExpToken::new(literal));
                idx += consumed;
                continue;
            }
            prepared.push(ExpToken::new(PpToken::from_token(token)));
            idx += 1;
        }

        if prepared.is_empty() {
            self.out.diagnostics.push(Diagnostic::error(
                position_of(directive),
                format!("#{} with no expression", directive.text),
            ));
            return false;
        }

        let expanded: Vec<PpToken> = self
            .expand_all(prepared)
            .into_iter()
            .map(|tok| tok.token)
            .collect();
        match evaluate(&expanded) {
            Ok(value) => value != 0,
            Err(message) => {
                self.out
                    .diagnostics
                    .push(Diagnostic::error(position_of(directive), message));
                false
            }
        }
    }

    fn define(&mut self, directive: &Token<'_>, args: &[Token<'_>]) {
        let Some(name) = args.first().filter(|t| t.kind == SyntaxKind::IDENT) else {
            self.out
                .diagnostics
                .push(Diagnostic::error(position_of(directive), "macro name missing"));
            return;
        };

        let mut body_start = 1;
        let mut params = None;
        let mut variadic = false;
        if let Some(open) = args.get(1)
            && open.kind == SyntaxKind::L_PAREN
            && open.range.start() == name.range.end()
        {
            let mut names = Vec::new();
            let mut idx = 2;
            let mut closed = false;
            while let Some(tok) = args.get(idx) {
                idx += 1;
                match tok.kind {
                    SyntaxKind::R_PAREN => {
                        closed = true;
                        break;
                    }
                    SyntaxKind::COMMA => {}
                    SyntaxKind::IDENT if !variadic => names.push(Name::new(tok.text)),
                    SyntaxKind::ELLIPSIS => variadic = true,
                    _ => break,
                }
            }
            if !closed {
                self.out.diagnostics.push(Diagnostic::error(
                    position_of(name),
                    format!("invalid parameter list for macro '{}'", name.text),
                ));
                return;
            }
            params = Some(names);
            body_start = idx;
        }

        let body_tokens = &args[body_start.min(args.len())..];
        let mut body = Vec::with_capacity(body_tokens.len());
        let mut prev_end = None;
        for tok in body_tokens {
            body.push(MacroToken {
                kind: tok.kind,
                text: Name::new(tok.text),
                spaced: prev_end.is_none_or(|end| end != tok.range.start()),
            });
            prev_end = Some(tok.range.end());
        }

        let def = Arc::new(Macro {
            name: Name::new(name.text),
            params,
            variadic,
            body,
            file: self.path.clone(),
            position: position_of(name),
            hidden: false,
        });
        tracing::trace!(file = %self.path, name = %def.name, "define");
        self.env.remember(Arc::clone(&def));
        self.out.defined_macros.push(def);
    }

    fn undef(&mut self, directive: &Token<'_>, args: &[Token<'_>]) {
        let Some(name) = args.first().filter(|t| t.kind == SyntaxKind::IDENT) else {
            self.out
                .diagnostics
                .push(Diagnostic::error(position_of(directive), "macro name missing"));
            return;
        };
        let def = Arc::new(Macro {
            name: Name::new(name.text),
            params: None,
            variadic: false,
            body: Vec::new(),
            file: self.path.clone(),
            position: position_of(name),
            hidden: true,
        });
        self.env.remember(Arc::clone(&def));
        self.out.defined_macros.push(def);
    }

    fn include(&mut self, directive: &Token<'_>, args: &[Token<'_>], next: bool) {
        let Some((spelled, quoted)) = self.include_target(args) else {
            self.out.diagnostics.push(Diagnostic::error(
                position_of(directive),
                format!("#{} expects \"FILENAME\" or <FILENAME>", directive.text),
            ));
            return;
        };
        let kind = match (next, quoted) {
            (true, _) => IncludeKind::Next,
            (false, true) => IncludeKind::Local,
            (false, false) => IncludeKind::Global,
        };
        let line = directive.line;
        let request = IncludeRequest {
            including_file: self.path,
            spelled: &spelled,
            kind,
            line,
        };
        let outcome = self.client.source_needed(self.env, &request);

        let position = args.first().map_or(position_of(directive), position_of);
        let resolved = match outcome {
            IncludeOutcome::Resolved(path) => Some(path),
            IncludeOutcome::NotFound => {
                self.out.diagnostics.push(Diagnostic::warning(
                    position,
                    format!("{spelled}: No such file or directory"),
                ));
                None
            }
            IncludeOutcome::Unreadable(path) => {
                self.out.diagnostics.push(Diagnostic::warning(
                    position,
                    format!("{spelled}: Could not get file contents"),
                ));
                Some(path)
            }
            IncludeOutcome::TooDeep(path) => {
                self.out.diagnostics.push(Diagnostic::fatal(
                    position,
                    format!("{spelled}: include nesting too deep"),
                ));
                Some(path)
            }
        };
        self.out.includes.push(Include {
            spelled: Name::new(&spelled),
            resolved,
            line,
            kind,
        });
    }

    /// The spelled include target and whether it was quoted.
    fn include_target(&mut self, args: &[Token<'_>]) -> Option<(String, bool)> {
        let first = args.first()?;
        match first.kind {
            SyntaxKind::STRING if first.text.starts_with('"') => {
                Some((unquote(first.text).to_string(), true))
            }
            SyntaxKind::LT => {
                let close = args.iter().find(|t| t.kind == SyntaxKind::GT)?;
                let start = usize::from(first.range.end());
                let end = usize::from(close.range.start());
                Some((self.source.get(start..end)?.trim().to_string(), false))
            }
            _ => {
                let tokens = args.iter().map(|t| ExpToken::new(PpToken::from_token(t))).collect();
                let expanded: Vec<PpToken> = self
                    .expand_all(tokens)
                    .into_iter()
                    .map(|tok| tok.token)
                    .collect();
                let first = expanded.first()?;
                match first.kind {
                    SyntaxKind::STRING if first.text.starts_with('"') => {
                        Some((unquote(&first.text).to_string(), true))
                    }
                    SyntaxKind::LT => {
                        let inner: String = expanded[1..]
                            .iter()
                            .take_while(|t| t.kind != SyntaxKind::GT)
                            .map(|t| t.text.as_str())
                            .collect();
                        Some((inner, false))
                    }
                    _ => None,
                }
            }
        }
    }

    fn rest_of_line(&self, args: &[Token<'_>]) -> &str {
        match (args.first(), args.last()) {
            (Some(first), Some(last)) => self
                .source
                .get(usize::from(first.range.start())..usize::from(last.range.end()))
                .unwrap_or(""),
            _ => "",
        }
    }
}

fn position_of(token: &Token<'_>) -> Position {
    Position::new(token.line, token.column)
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}
