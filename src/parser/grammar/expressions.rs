//! Name references inside expressions.
//!
//! Expressions are not parsed into a tree. The walker only tracks bracket
//! nesting and what a `.`/`->` applies to, which is all name binding needs.

use crate::parser::keywords::Keyword;
use crate::parser::parser::Parser;
use crate::parser::syntax_kind::SyntaxKind;
use crate::parser::tree::{NameRef, RefBase};

impl Parser<'_> {
    /// Walk an expression up to a top-level token in `stops` or an unmatched
    /// closing bracket. Neither is consumed.
    pub(in crate::parser) fn expression(&mut self, stops: &[SyntaxKind]) {
        // what each open bracket was applied to
        let mut stack: Vec<RefBase> = Vec::new();
        let mut last = RefBase::None;
        let mut member_base: Option<RefBase> = None;

        while let Some(tok) = self.current() {
            let kind = tok.kind;
            if stack.is_empty() && stops.contains(&kind) {
                return;
            }
            match kind {
                SyntaxKind::L_PAREN | SyntaxKind::L_BRACKET | SyntaxKind::L_BRACE => {
                    stack.push(last);
                    last = RefBase::None;
                    member_base = None;
                    self.bump();
                }
                SyntaxKind::R_PAREN | SyntaxKind::R_BRACKET | SyntaxKind::R_BRACE => {
                    let Some(applied_to) = stack.pop() else {
                        return;
                    };
                    last = match applied_to {
                        RefBase::Ref(_) | RefBase::This => applied_to,
                        _ => RefBase::Unknown,
                    };
                    self.bump();
                }
                SyntaxKind::DOT | SyntaxKind::ARROW => {
                    member_base = Some(match last {
                        RefBase::None => RefBase::Unknown,
                        other => other,
                    });
                    last = RefBase::None;
                    self.bump();
                }
                SyntaxKind::IDENT => match self.keyword() {
                    Some(Keyword::This) => {
                        last = RefBase::This;
                        member_base = None;
                        self.bump();
                    }
                    Some(kw) if !kw.is_contextual() => {
                        last = RefBase::Unknown;
                        member_base = None;
                        self.bump();
                    }
                    _ => {
                        if let Some(base) = member_base.take() {
                            self.bump();
                            let id = self.tree.push_ref(NameRef {
                                name: tok.text.clone(),
                                qualifier: Vec::new(),
                                global: false,
                                position: tok.position,
                                len: tok.len,
                                scope: self.scope,
                                base,
                                generated: tok.generated,
                            });
                            last = RefBase::Ref(id);
                        } else {
                            last = self.name_path(false).map_or(RefBase::Unknown, RefBase::Ref);
                        }
                    }
                },
                SyntaxKind::COLON_COLON if self.nth_is_name(1) => {
                    member_base = None;
                    last = self.name_path(false).map_or(RefBase::Unknown, RefBase::Ref);
                }
                _ => {
                    last = if kind.is_literal() {
                        RefBase::Unknown
                    } else {
                        RefBase::None
                    };
                    if kind != SyntaxKind::TILDE {
                        member_base = None;
                    }
                    self.bump();
                }
            }
        }
    }

    /// Walk a bracketed expression starting at its opening bracket.
    pub(in crate::parser) fn balanced_expression(&mut self) {
        let close = match self.current_kind() {
            SyntaxKind::L_PAREN => SyntaxKind::R_PAREN,
            SyntaxKind::L_BRACKET => SyntaxKind::R_BRACKET,
            SyntaxKind::L_BRACE => SyntaxKind::R_BRACE,
            _ => return,
        };
        self.bump();
        self.expression(&[]);
        if !self.eat(close) {
            self.error("unbalanced brackets");
            if self.at_any(&[SyntaxKind::R_PAREN, SyntaxKind::R_BRACKET]) {
                self.bump();
            }
        }
    }
}
