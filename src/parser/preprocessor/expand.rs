//! Macro expansion with hide sets.

use std::collections::VecDeque;
use std::sync::Arc;

use super::{Macro, MacroUse, PpToken, Preprocessor, PreprocessorClient};
use crate::base::{Name, Position};
use crate::parser::diagnostic::Diagnostic;
use crate::parser::lexer::tokenize;
use crate::parser::syntax_kind::SyntaxKind;

/// Maximum number of macro replacements per file.
pub(super) const EXPANSION_LIMIT: usize = 100_000;

/// A token plus the names of the macros it came out of.
#[derive(Debug, Clone)]
pub(super) struct ExpToken {
    pub token: PpToken,
    pub hide: Vec<Name>,
}

impl ExpToken {
    pub fn new(token: PpToken) -> Self {
        Self {
            token,
            hide: Vec::new(),
        }
    }

    fn is_hidden(&self) -> bool {
        self.hide.contains(&self.token.text)
    }

    fn with_hide(mut self, hide: &[Name]) -> Self {
        for name in hide {
            if !self.hide.contains(name) {
                self.hide.push(name.clone());
            }
        }
        self
    }
}

type Argument = Vec<ExpToken>;

impl<C: PreprocessorClient + ?Sized> Preprocessor<'_, C> {
    pub(super) fn expand_all(&mut self, input: Vec<ExpToken>) -> Vec<ExpToken> {
        let mut queue: VecDeque<ExpToken> = input.into();
        let mut out = Vec::with_capacity(queue.len());

        while let Some(tok) = queue.pop_front() {
            if tok.token.kind != SyntaxKind::IDENT || tok.is_hidden() {
                out.push(tok);
                continue;
            }
            let Some(def) = self.env.resolve(&tok.token.text).cloned() else {
                out.push(self.builtin(tok));
                continue;
            };
            if self.expansion_budget == 0 {
                out.push(tok);
                continue;
            }

            let args = if def.is_function_like() {
                if !queue
                    .front()
                    .is_some_and(|next| next.token.kind == SyntaxKind::L_PAREN)
                {
                    out.push(tok);
                    continue;
                }
                match collect_arguments(&mut queue) {
                    Some(args) => self.match_arity(&def, &tok.token, args),
                    None => {
                        self.out.diagnostics.push(Diagnostic::error(
                            tok.token.position,
                            format!("unterminated argument list invoking macro '{}'", def.name),
                        ));
                        out.push(tok);
                        continue;
                    }
                }
            } else {
                Vec::new()
            };

            self.expansion_budget -= 1;
            if self.expansion_budget == 0 {
                self.out.diagnostics.push(Diagnostic::error(
                    tok.token.position,
                    "macro expansion limit reached",
                ));
            }
            if !tok.token.generated {
                self.out.macro_uses.push(MacroUse {
                    macro_def: Arc::clone(&def),
                    position: tok.token.position,
                    len: tok.token.len,
                });
            }

            let mut hide = tok.hide.clone();
            hide.push(def.name.clone());
            let replacement = self.substitute(&def, &tok.token, args, &hide);
            for replaced in replacement.into_iter().rev() {
                queue.push_front(replaced);
            }
        }
        out
    }

    fn builtin(&self, tok: ExpToken) -> ExpToken {
        let (kind, text) = match tok.token.text.as_str() {
            "__LINE__" => (
                SyntaxKind::NUMBER,
                Name::new((tok.token.position.line + 1).to_string()),
            ),
            "__FILE__" => (SyntaxKind::STRING, Name::new(format!("\"{}\"", self.path))),
            _ => return tok,
        };
        ExpToken {
            token: PpToken {
                kind,
                text,
                generated: true,
                ..tok.token
            },
            hide: tok.hide,
        }
    }

    fn match_arity(&mut self, def: &Macro, use_site: &PpToken, mut args: Vec<Argument>) -> Vec<Argument> {
        let declared = def.params.as_ref().map_or(0, Vec::len);
        if declared == 0 && args.len() == 1 && args[0].is_empty() {
            args.clear();
        }
        if def.variadic {
            if args.len() > declared {
                let mut rest = args.split_off(declared);
                let mut merged = rest.remove(0);
                for arg in rest {
                    merged.push(ExpToken::new(PpToken {
                        kind: SyntaxKind::COMMA,
                        text: Name::new_static(","),
                        position: use_site.position,
                        len: 1,
                        generated: true,
                    }));
                    merged.extend(arg);
                }
                args.push(merged);
            }
        } else if args.len() > declared {
            self.out.diagnostics.push(Diagnostic::warning(
                use_site.position,
                format!(
                    "macro '{}' passed {} arguments, but takes just {}",
                    def.name,
                    args.len(),
                    declared
                ),
            ));
            args.truncate(declared);
        }
        if args.len() < declared {
            self.out.diagnostics.push(Diagnostic::warning(
                use_site.position,
                format!(
                    "macro '{}' requires {} arguments, but only {} given",
                    def.name,
                    declared,
                    args.len()
                ),
            ));
        }
        let slots = declared + usize::from(def.variadic);
        args.resize_with(slots, Vec::new);
        args
    }

    fn substitute(
        &mut self,
        def: &Macro,
        use_site: &PpToken,
        args: Vec<Argument>,
        hide: &[Name],
    ) -> Vec<ExpToken> {
        let mut expanded: Vec<Option<Argument>> = vec![None; args.len()];
        let mut result: Vec<ExpToken> = Vec::with_capacity(def.body.len());
        let mut paste_next = false;
        let mut idx = 0;

        while idx < def.body.len() {
            let body_tok = &def.body[idx];

            if body_tok.kind == SyntaxKind::HASH_HASH && !result.is_empty() && idx + 1 < def.body.len()
            {
                paste_next = true;
                idx += 1;
                continue;
            }

            let param = |text: &Name| {
                if def.is_function_like() {
                    def.param_index(text)
                } else {
                    None
                }
            };

            let piece: Vec<ExpToken> = if body_tok.kind == SyntaxKind::HASH
                && let Some(next) = def.body.get(idx + 1)
                && let Some(p) = param(&next.text)
            {
                idx += 1;
                vec![ExpToken::new(PpToken {
                    kind: SyntaxKind::STRING,
                    text: Name::new(stringize(&args[p])),
                    position: use_site.position,
                    len: use_site.len,
                    generated: true,
                })]
            } else if body_tok.kind == SyntaxKind::IDENT
                && let Some(p) = param(&body_tok.text)
            {
                let next_is_paste = def
                    .body
                    .get(idx + 1)
                    .is_some_and(|n| n.kind == SyntaxKind::HASH_HASH);
                if paste_next || next_is_paste {
                    args[p].clone()
                } else {
                    if expanded[p].is_none() {
                        expanded[p] = Some(self.expand_all(args[p].clone()));
                    }
                    expanded[p].clone().unwrap_or_default()
                }
            } else {
                vec![ExpToken::new(PpToken {
                    kind: body_tok.kind,
                    text: body_tok.text.clone(),
                    position: use_site.position,
                    len: use_site.len,
                    generated: true,
                })]
            };

            let piece = piece.into_iter().map(|tok| tok.with_hide(hide));
            if paste_next {
                paste(&mut result, piece.collect());
            } else {
                result.extend(piece);
            }
            paste_next = false;
            idx += 1;
        }
        result
    }
}

/// Pop a parenthesized argument list off `queue`. On failure nothing is consumed.
fn collect_arguments(queue: &mut VecDeque<ExpToken>) -> Option<Vec<Argument>> {
    let mut consumed = Vec::new();
    let mut args: Vec<Argument> = vec![Vec::new()];
    let mut depth = 0usize;

    while let Some(tok) = queue.pop_front() {
        consumed.push(tok.clone());
        match tok.token.kind {
            SyntaxKind::L_PAREN => {
                depth += 1;
                if depth == 1 {
                    continue;
                }
            }
            SyntaxKind::R_PAREN => {
                depth -= 1;
                if depth == 0 {
                    return Some(args);
                }
            }
            SyntaxKind::COMMA if depth == 1 => {
                args.push(Vec::new());
                continue;
            }
            _ => {}
        }
        if let Some(current) = args.last_mut() {
            current.push(tok);
        }
    }

    for tok in consumed.into_iter().rev() {
        queue.push_front(tok);
    }
    None
}

fn paste(result: &mut Vec<ExpToken>, piece: Vec<ExpToken>) {
    let mut piece = piece.into_iter();
    let Some(right) = piece.next() else {
        return;
    };
    let Some(mut left) = result.pop() else {
        result.push(right);
        result.extend(piece);
        return;
    };
    let text = format!("{}{}", left.token.text, right.token.text);
    let lexed = tokenize(&text);
    left.token.kind = match lexed.as_slice() {
        [single] => single.kind,
        _ => left.token.kind,
    };
    left.token.text = Name::new(text);
    left.token.generated = true;
    for name in right.hide {
        if !left.hide.contains(&name) {
            left.hide.push(name);
        }
    }
    result.push(left);
    result.extend(piece);
}

fn stringize(arg: &[ExpToken]) -> String {
    let mut text = String::from("\"");
    let mut prev_end: Option<Position> = None;
    for tok in arg {
        let tok = &tok.token;
        if let Some(end) = prev_end
            && end != tok.position
        {
            text.push(' ');
        }
        if tok.kind == SyntaxKind::STRING || tok.kind == SyntaxKind::CHAR {
            for c in tok.text.chars() {
                if c == '"' || c == '\\' {
                    text.push('\\');
                }
                text.push(c);
            }
        } else {
            text.push_str(&tok.text);
        }
        prev_end = Some(Position::new(
            tok.position.line,
            tok.position.column + tok.len,
        ));
    }
    text.push('"');
    text
}
