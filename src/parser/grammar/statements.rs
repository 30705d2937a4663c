//! Function bodies.
//!
//! Every compound statement, and every `if`/`for`/`while`/`switch`/`catch`,
//! opens a [`DeclKind::Block`] so that local declarations get the right scope.

use super::DeclContext;
use crate::base::Position;
use crate::parser::keywords::Keyword;
use crate::parser::parser::Parser;
use crate::parser::syntax_kind::SyntaxKind;
use crate::parser::tree::{Decl, DeclId, DeclKind};

impl Parser<'_> {
    /// `{ statement* }`, starting at the `{`.
    pub(in crate::parser) fn compound_statement(&mut self) {
        if !self.enter() {
            return;
        }
        let position = self.position();
        self.bump();
        let saved = self.scope;
        self.scope = Some(self.open_block(position));
        while !self.at_eof() && !self.at(SyntaxKind::R_BRACE) {
            let start = self.pos;
            self.statement();
            if self.pos == start {
                self.bump();
            }
        }
        self.expect(SyntaxKind::R_BRACE, "}");
        self.scope = saved;
        self.leave();
    }

    fn open_block(&mut self, position: Position) -> DeclId {
        let mut decl = Decl::new(DeclKind::Block, None, position);
        decl.parent = self.scope;
        self.tree.push_decl(decl)
    }

    fn statement(&mut self) {
        if !self.enter() {
            return;
        }
        self.statement_inner();
        self.leave();
    }

    fn statement_inner(&mut self) {
        match self.current_kind() {
            SyntaxKind::L_BRACE => return self.compound_statement(),
            SyntaxKind::SEMICOLON => {
                self.bump();
                return;
            }
            _ => {}
        }

        match self.keyword() {
            Some(kw @ (Keyword::If | Keyword::While | Keyword::Switch)) => {
                let position = self.position();
                self.bump();
                self.eat_kw(Keyword::Constexpr);
                let saved = self.scope;
                self.scope = Some(self.open_block(position));
                if self.at(SyntaxKind::L_PAREN) {
                    self.condition();
                }
                self.statement();
                if kw == Keyword::If && self.eat_kw(Keyword::Else) {
                    self.statement();
                }
                self.scope = saved;
            }
            Some(Keyword::For) => {
                let position = self.position();
                self.bump();
                let saved = self.scope;
                self.scope = Some(self.open_block(position));
                if self.at(SyntaxKind::L_PAREN) {
                    self.for_header();
                }
                self.statement();
                self.scope = saved;
            }
            Some(Keyword::Do) => {
                self.bump();
                self.statement();
                if self.eat_kw(Keyword::While) && self.at(SyntaxKind::L_PAREN) {
                    self.balanced_expression();
                }
                self.expect(SyntaxKind::SEMICOLON, ";");
            }
            Some(Keyword::Return | Keyword::Throw) => {
                self.bump();
                self.expression_statement();
            }
            Some(Keyword::Case) => {
                self.bump();
                self.expression(&[SyntaxKind::COLON]);
                self.expect(SyntaxKind::COLON, ":");
            }
            Some(Keyword::Default) => {
                self.bump();
                self.expect(SyntaxKind::COLON, ":");
            }
            Some(Keyword::Break | Keyword::Continue) => {
                self.bump();
                self.expect(SyntaxKind::SEMICOLON, ";");
            }
            Some(Keyword::Goto) => {
                self.bump();
                self.bump();
                self.expect(SyntaxKind::SEMICOLON, ";");
            }
            Some(Keyword::Try) => {
                self.bump();
                if self.at(SyntaxKind::L_BRACE) {
                    self.compound_statement();
                }
                while self.at_kw(Keyword::Catch) {
                    self.catch_clause();
                }
            }
            Some(
                Keyword::Using
                | Keyword::Typedef
                | Keyword::StaticAssert
                | Keyword::Namespace
                | Keyword::Template,
            ) => self.declaration(DeclContext::Local),
            _ if self.at_name() && self.nth_kind(1) == SyntaxKind::COLON => {
                self.pos += 2;
            }
            _ if self.looks_like_declaration() => self.simple_declaration(DeclContext::Local),
            _ => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) {
        self.expression(&[SyntaxKind::SEMICOLON]);
        if !self.eat(SyntaxKind::SEMICOLON) {
            self.error("expected ';'");
            self.recover();
        }
    }

    /// `( [init;] condition )` of `if`, `while` and `switch`.
    fn condition(&mut self) {
        self.bump();
        loop {
            if self.looks_like_declaration() {
                self.simple_declaration(DeclContext::Condition);
            }
            self.expression(&[SyntaxKind::SEMICOLON]);
            if !self.eat(SyntaxKind::SEMICOLON) {
                break;
            }
        }
        if !self.eat(SyntaxKind::R_PAREN) {
            self.error("expected ')'");
            self.skip_to_close_paren();
        }
    }

    fn for_header(&mut self) {
        self.bump();
        if self.looks_like_declaration() {
            self.simple_declaration(DeclContext::ForInit);
            if self.eat(SyntaxKind::COLON) {
                self.expression(&[]);
            } else {
                self.for_rest();
            }
        } else {
            self.expression(&[SyntaxKind::SEMICOLON]);
            if self.eat(SyntaxKind::COLON) {
                self.expression(&[]);
            } else {
                self.eat(SyntaxKind::SEMICOLON);
                self.for_rest();
            }
        }
        if !self.eat(SyntaxKind::R_PAREN) {
            self.error("expected ')'");
            self.skip_to_close_paren();
        }
    }

    fn for_rest(&mut self) {
        self.expression(&[SyntaxKind::SEMICOLON]);
        self.eat(SyntaxKind::SEMICOLON);
        self.expression(&[]);
    }

    pub(in crate::parser) fn catch_clause(&mut self) {
        let position = self.position();
        self.bump();
        let saved = self.scope;
        self.scope = Some(self.open_block(position));
        if self.eat(SyntaxKind::L_PAREN) {
            if !self.eat(SyntaxKind::ELLIPSIS) {
                self.parameter_declaration();
            }
            if !self.eat(SyntaxKind::R_PAREN) {
                self.error("expected ')'");
                self.skip_to_close_paren();
            }
        }
        if self.at(SyntaxKind::L_BRACE) {
            self.compound_statement();
        }
        self.scope = saved;
    }

    /// Heuristic: does a statement start with `Type name ...`?
    fn looks_like_declaration(&self) -> bool {
        match self.keyword() {
            Some(kw)
                if kw.is_builtin_type()
                    || kw.is_decl_specifier()
                    || kw.is_class_key()
                    || matches!(kw, Keyword::Enum | Keyword::Decltype | Keyword::Typedef) =>
            {
                return true;
            }
            Some(kw) if !kw.is_contextual() => return false,
            _ => {}
        }

        let mut idx = 0;
        if self.nth_kind(idx) == SyntaxKind::COLON_COLON {
            idx += 1;
        }
        if !self.nth_is_name(idx) {
            return false;
        }
        idx += 1;
        loop {
            match self.nth_kind(idx) {
                SyntaxKind::COLON_COLON if self.nth_is_name(idx + 1) => idx += 2,
                SyntaxKind::LT => {
                    let mut depth = 0i32;
                    loop {
                        match self.nth_kind(idx) {
                            SyntaxKind::LT => depth += 1,
                            SyntaxKind::GT => depth -= 1,
                            SyntaxKind::SHR => depth -= 2,
                            SyntaxKind::SEMICOLON
                            | SyntaxKind::L_BRACE
                            | SyntaxKind::R_BRACE
                            | SyntaxKind::EQ
                            | SyntaxKind::ERROR => return false,
                            _ => {}
                        }
                        idx += 1;
                        if depth <= 0 {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
        while matches!(
            self.nth_kind(idx),
            SyntaxKind::STAR | SyntaxKind::AMP | SyntaxKind::AMP_AMP
        ) || self.nth_keyword(idx) == Some(Keyword::Const)
        {
            idx += 1;
        }
        self.nth_is_name(idx)
            && matches!(
                self.nth_kind(idx + 1),
                SyntaxKind::SEMICOLON
                    | SyntaxKind::COMMA
                    | SyntaxKind::EQ
                    | SyntaxKind::L_BRACKET
                    | SyntaxKind::L_PAREN
                    | SyntaxKind::L_BRACE
                    | SyntaxKind::COLON
            )
    }
}
