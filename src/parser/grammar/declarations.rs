//! Declarations: namespaces, classes, enums, using, declarators.

use crate::base::{Name, Position};
use crate::parser::keywords::Keyword;
use crate::parser::parser::{Parser, Section};
use crate::parser::preprocessor::PpToken;
use crate::parser::syntax_kind::SyntaxKind;
use crate::parser::tree::{
    Access, ClassKey, Decl, DeclFlags, DeclId, DeclKind, NameRef, RefBase, RefId, TypeRef,
};

/// Where a declaration appears.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DeclContext {
    Namespace,
    Class,
    Local,
    /// `for (init; ...)` or `for (decl : range)`
    ForInit,
    /// `if (T x = ...)`
    Condition,
    Parameter,
}

impl DeclContext {
    fn is_local(self) -> bool {
        matches!(
            self,
            DeclContext::Local | DeclContext::ForInit | DeclContext::Condition
        )
    }
}

/// Declaration specifiers: everything before the first declarator.
#[derive(Debug, Default)]
pub(in crate::parser) struct DeclSpec {
    parts: Vec<String>,
    name: Option<RefId>,
    decl: Option<DeclId>,
    has_type: bool,
    is_const: bool,
    is_typedef: bool,
    is_friend: bool,
    /// Keywords consumed, type keywords included.
    keywords: u32,
    flags: DeclFlags,
    start: Position,
    /// `class X;` recorded as a forward declaration.
    forward: bool,
    /// A class or enum body was parsed.
    defined: bool,
}

impl DeclSpec {
    /// A lone identifier, e.g. an unexpanded `Q_OBJECT`.
    fn is_bare_name(&self) -> bool {
        self.name.is_some() && self.keywords == 0 && self.decl.is_none()
    }

    pub(in crate::parser) fn type_ref(&self, pointer: u8, reference: bool) -> Option<TypeRef> {
        if !self.has_type {
            return None;
        }
        let mut text = String::new();
        if self.is_const {
            text.push_str("const ");
        }
        text.push_str(&self.parts.join(" "));
        if pointer > 0 || reference {
            text.push(' ');
            for _ in 0..pointer {
                text.push('*');
            }
            if reference {
                text.push('&');
            }
        }
        Some(TypeRef {
            text,
            name: self.name,
            decl: self.decl,
            pointer,
            reference,
            is_const: self.is_const,
        })
    }
}

/// A declarator name.
#[derive(Debug, Clone)]
struct DeclName {
    text: Name,
    position: Position,
    len: u32,
    generated: bool,
}

impl DeclName {
    fn from_token(token: &PpToken) -> Self {
        Self {
            text: token.text.clone(),
            position: token.position,
            len: token.len,
            generated: token.generated,
        }
    }
}

/// How a declarator ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaratorEnd {
    Done,
    /// A function body was consumed; no `;` follows.
    Body,
    Failed,
}

impl Parser<'_> {
    /// Parse declarations until `}` or end of input.
    pub(in crate::parser) fn declaration_seq(&mut self, in_class: bool) {
        let ctx = if in_class {
            DeclContext::Class
        } else {
            DeclContext::Namespace
        };
        while !self.at_eof() && !self.at(SyntaxKind::R_BRACE) {
            let start = self.pos;
            self.declaration(ctx);
            if self.pos == start {
                self.error("expected declaration");
                self.bump();
            }
        }
    }

    pub(in crate::parser) fn declaration(&mut self, ctx: DeclContext) {
        match self.keyword() {
            Some(Keyword::Namespace) => self.namespace_definition(),
            Some(Keyword::Inline) if self.nth_keyword(1) == Some(Keyword::Namespace) => {
                self.bump();
                self.namespace_definition();
            }
            Some(Keyword::Using) => self.using_declaration(),
            Some(Keyword::Template) => {
                self.bump();
                if self.at(SyntaxKind::LT) {
                    self.template_arguments(false);
                }
                if !self.at_eof() && self.enter() {
                    self.declaration(ctx);
                    self.leave();
                }
            }
            Some(Keyword::Public | Keyword::Protected | Keyword::Private | Keyword::Signals | Keyword::Slots)
                if ctx == DeclContext::Class =>
            {
                self.access_specifier()
            }
            Some(Keyword::StaticAssert) => {
                self.bump();
                if self.at(SyntaxKind::L_PAREN) {
                    self.balanced_expression();
                }
                self.eat(SyntaxKind::SEMICOLON);
            }
            Some(Keyword::Extern)
                if self.nth_kind(1) == SyntaxKind::STRING
                    && self.nth_kind(2) == SyntaxKind::L_BRACE =>
            {
                self.bump();
                self.bump();
                self.bump();
                self.declaration_seq(false);
                self.expect(SyntaxKind::R_BRACE, "}");
            }
            _ if self.at(SyntaxKind::SEMICOLON) => {
                self.bump();
            }
            _ => self.simple_declaration(ctx),
        }
    }

    fn access_specifier(&mut self) {
        let mut section = Section::Normal;
        match self.keyword() {
            Some(Keyword::Public) => self.access = Access::Public,
            Some(Keyword::Protected) => self.access = Access::Protected,
            Some(Keyword::Private) => self.access = Access::Private,
            Some(Keyword::Signals) => {
                self.access = Access::Public;
                section = Section::Signals;
            }
            Some(Keyword::Slots) => section = Section::Slots,
            _ => {}
        }
        self.bump();
        if self.eat_kw(Keyword::Slots) {
            section = Section::Slots;
        } else if self.at_name() && self.nth_kind(1) == SyntaxKind::COLON {
            self.bump();
        }
        self.section = section;
        self.expect(SyntaxKind::COLON, ":");
    }

    fn namespace_definition(&mut self) {
        let Some(keyword) = self.bump() else {
            return;
        };
        let mut names: Vec<&PpToken> = Vec::new();
        while self.at_name() {
            let Some(tok) = self.bump() else {
                break;
            };
            names.push(tok);
            if !(self.at(SyntaxKind::COLON_COLON) && self.nth_is_name(1)) {
                break;
            }
            self.bump();
        }

        if self.eat(SyntaxKind::EQ) {
            // namespace alias: only the target is recorded
            self.name_path(false);
            self.expect(SyntaxKind::SEMICOLON, ";");
            return;
        }
        if !self.at(SyntaxKind::L_BRACE) {
            self.error("expected '{'");
            self.recover();
            return;
        }
        if !self.enter() {
            return;
        }
        self.bump();

        let saved = (self.scope, self.access, self.section);
        if names.is_empty() {
            let decl = self.new_decl(DeclKind::Namespace, None, keyword.position);
            self.scope = Some(self.tree.push_decl(decl));
        }
        for tok in names {
            let decl = self.new_decl(
                DeclKind::Namespace,
                Some(DeclName::from_token(tok)),
                keyword.position,
            );
            self.scope = Some(self.tree.push_decl(decl));
        }
        self.access = Access::Public;
        self.section = Section::Normal;
        self.declaration_seq(false);
        self.expect(SyntaxKind::R_BRACE, "}");
        (self.scope, self.access, self.section) = saved;
        self.leave();
    }

    fn using_declaration(&mut self) {
        let Some(keyword) = self.bump() else {
            return;
        };
        if self.eat_kw(Keyword::Namespace) {
            let target = self.name_path(false);
            let mut decl = self.new_decl(DeclKind::UsingDirective, None, keyword.position);
            decl.target = target;
            self.tree.push_decl(decl);
        } else if self.at_name() && self.nth_kind(1) == SyntaxKind::EQ {
            let name = self.bump().map(DeclName::from_token);
            self.bump();
            let spec = self.decl_specifiers(DeclContext::Parameter);
            let (pointer, reference) = self.pointer_operators();
            let mut decl = self.new_decl(DeclKind::Typedef, name, keyword.position);
            decl.ty = spec.type_ref(pointer, reference);
            self.tree.push_decl(decl);
        } else {
            self.eat_kw(Keyword::Typename);
            if let Some(target) = self.name_path(false) {
                let target_ref = self.tree.name_ref(target).clone();
                let name = DeclName {
                    text: target_ref.name,
                    position: target_ref.position,
                    len: target_ref.len,
                    generated: target_ref.generated,
                };
                let mut decl =
                    self.new_decl(DeclKind::UsingDeclaration, Some(name), keyword.position);
                decl.target = Some(target);
                self.tree.push_decl(decl);
            }
        }
        if !self.eat(SyntaxKind::SEMICOLON) {
            self.error("expected ';'");
            self.recover();
        }
    }

    /// `specifiers declarator (, declarator)* ;`
    pub(in crate::parser) fn simple_declaration(&mut self, ctx: DeclContext) {
        let spec = self.decl_specifiers(ctx);

        if ctx != DeclContext::Condition && self.eat(SyntaxKind::SEMICOLON) {
            return;
        }

        // `MACRO(args)` where a declaration was expected
        if !spec.has_type
            && self.at_name()
            && self.nth_kind(1) == SyntaxKind::L_PAREN
            && !self.is_enclosing_class_name()
        {
            self.bump();
            self.skip_balanced();
            self.eat(SyntaxKind::SEMICOLON);
            return;
        }

        if !self.at_declarator_start() {
            if spec.is_bare_name() {
                return;
            }
            if spec.defined || spec.forward {
                self.error("expected ';' after type definition");
            } else {
                self.error("expected declarator");
                self.recover();
            }
            return;
        }

        loop {
            match self.init_declarator(&spec, ctx) {
                DeclaratorEnd::Body => return,
                DeclaratorEnd::Failed => return,
                DeclaratorEnd::Done => {}
            }
            if ctx == DeclContext::ForInit && self.at(SyntaxKind::COLON) {
                return;
            }
            if !self.eat(SyntaxKind::COMMA) {
                break;
            }
        }

        if ctx == DeclContext::Condition {
            return;
        }
        if !self.eat(SyntaxKind::SEMICOLON) {
            self.error("expected ';'");
            self.recover();
        }
    }

    fn is_enclosing_class_name(&self) -> bool {
        let Some(scope) = self.scope else {
            return false;
        };
        let decl = self.tree.decl(scope);
        decl.kind == DeclKind::Class
            && decl
                .name
                .as_ref()
                .zip(self.current())
                .is_some_and(|(name, tok)| *name == tok.text)
    }

    fn at_declarator_start(&self) -> bool {
        match self.current_kind() {
            SyntaxKind::STAR
            | SyntaxKind::AMP
            | SyntaxKind::AMP_AMP
            | SyntaxKind::TILDE
            | SyntaxKind::COLON_COLON
            | SyntaxKind::L_PAREN => true,
            SyntaxKind::IDENT => self.at_name() || self.at_kw(Keyword::Operator),
            _ => false,
        }
    }

    pub(in crate::parser) fn decl_specifiers(&mut self, ctx: DeclContext) -> DeclSpec {
        let mut spec = DeclSpec {
            start: self.position(),
            ..DeclSpec::default()
        };
        while let Some(tok) = self.current() {
            if tok.kind == SyntaxKind::L_BRACKET && self.nth_kind(1) == SyntaxKind::L_BRACKET {
                self.skip_balanced();
                continue;
            }
            if tok.kind == SyntaxKind::COLON_COLON
                && !spec.has_type
                && self.nth_is_name(1)
                && !self.path_then_paren()
            {
                self.type_name(&mut spec);
                continue;
            }
            if tok.kind != SyntaxKind::IDENT {
                break;
            }
            match self.keyword() {
                Some(kw) if kw.is_builtin_type() => {
                    spec.parts.push(tok.text.to_string());
                    spec.has_type = true;
                    spec.keywords += 1;
                    self.bump();
                }
                Some(kw) if kw.is_class_key() && !spec.has_type => {
                    spec.keywords += 1;
                    self.class_specifier(&mut spec);
                }
                Some(Keyword::Enum) if !spec.has_type => {
                    spec.keywords += 1;
                    self.enum_specifier(&mut spec);
                }
                Some(Keyword::Decltype) => {
                    spec.keywords += 1;
                    self.bump();
                    if self.at(SyntaxKind::L_PAREN) {
                        let start = self.pos;
                        self.balanced_expression();
                        spec.parts.push(format!("decltype{}", self.tokens_text(start, self.pos)));
                    }
                    spec.has_type = true;
                }
                Some(kw) if kw.is_decl_specifier() || kw == Keyword::Typedef => {
                    spec.keywords += 1;
                    self.bump();
                    match kw {
                        Keyword::Const => spec.is_const = true,
                        Keyword::Static => spec.flags.is_static = true,
                        Keyword::Extern => {
                            spec.flags.is_extern = true;
                            self.eat(SyntaxKind::STRING);
                        }
                        Keyword::Inline => spec.flags.is_inline = true,
                        Keyword::Virtual => spec.flags.is_virtual = true,
                        Keyword::Friend => spec.is_friend = true,
                        Keyword::Typedef => spec.is_typedef = true,
                        _ => {}
                    }
                }
                Some(kw) if !kw.is_contextual() => break,
                _ => {
                    if spec.has_type {
                        break;
                    }
                    if is_attribute(&tok.text) {
                        self.bump();
                        if self.at(SyntaxKind::L_PAREN) {
                            self.skip_balanced();
                        }
                        continue;
                    }
                    if self.path_then_paren() && ctx != DeclContext::Parameter {
                        break;
                    }
                    self.type_name(&mut spec);
                }
            }
        }
        spec
    }

    fn type_name(&mut self, spec: &mut DeclSpec) {
        let start = self.pos;
        spec.name = self.name_path(true);
        spec.parts.push(self.tokens_text(start, self.pos));
        spec.has_type = true;
    }

    /// Lookahead: `[::] a(::b)* (` that is not `(*` or `(&`.
    fn path_then_paren(&self) -> bool {
        let mut idx = 0;
        if self.nth_kind(0) == SyntaxKind::COLON_COLON {
            idx += 1;
        }
        if !self.nth_is_name(idx) {
            return false;
        }
        idx += 1;
        loop {
            match self.nth_kind(idx) {
                SyntaxKind::L_PAREN => {
                    return !matches!(
                        self.nth_kind(idx + 1),
                        SyntaxKind::STAR | SyntaxKind::AMP | SyntaxKind::CARET
                    );
                }
                SyntaxKind::COLON_COLON => {
                    if self.nth_is_name(idx + 1) {
                        idx += 2;
                    } else {
                        return self.nth_kind(idx + 1) == SyntaxKind::TILDE
                            || self.nth_keyword(idx + 1) == Some(Keyword::Operator);
                    }
                }
                _ => return false,
            }
        }
    }

    fn class_specifier(&mut self, spec: &mut DeclSpec) {
        let Some(key_tok) = self.bump() else {
            return;
        };
        let class_key = match key_tok.text.as_str() {
            "struct" => ClassKey::Struct,
            "union" => ClassKey::Union,
            _ => ClassKey::Class,
        };
        spec.has_type = true;

        // export macros: `class Q_CORE_EXPORT Name {`
        let mut run = 0;
        while self.nth_is_name(run) && self.nth(run).is_some_and(|t| t.text != "final") {
            run += 1;
        }
        let after = if self.nth(run).is_some_and(|t| t.text == "final") {
            run + 1
        } else {
            run
        };
        if run >= 2 && matches!(self.nth_kind(after), SyntaxKind::L_BRACE | SyntaxKind::COLON) {
            self.pos += run - 1;
        }
        while self.at_name() && self.current().is_some_and(|t| is_attribute(&t.text)) {
            self.bump();
            if self.at(SyntaxKind::L_PAREN) {
                self.skip_balanced();
            }
        }

        let mut qualifier = Vec::new();
        let mut qualifier_path = Vec::new();
        let mut name = None;
        if self.at_name() && self.current().is_some_and(|t| t.text != "final") {
            while self.at_name()
                && self.nth_kind(1) == SyntaxKind::COLON_COLON
                && self.nth_is_name(2)
            {
                if let Some(tok) = self.bump() {
                    self.push_name_ref(tok, qualifier_path.clone(), false);
                    qualifier_path.push(tok.text.clone());
                    qualifier.push(tok.text.clone());
                }
                self.bump();
            }
            name = self.bump();
            if self.at(SyntaxKind::LT) {
                self.template_arguments(true);
            }
        }
        if self.current().is_some_and(|t| t.text == "final") {
            self.bump();
        }

        let is_definition = self.at(SyntaxKind::L_BRACE)
            || (self.at(SyntaxKind::COLON) && !spec.is_friend);
        if is_definition {
            let mut decl = self.new_decl(
                DeclKind::Class,
                name.map(DeclName::from_token),
                key_tok.position,
            );
            decl.class_key = Some(class_key);
            decl.qualifier = qualifier;
            decl.flags.is_definition = true;
            let id = self.tree.push_decl(decl);

            if self.eat(SyntaxKind::COLON) {
                loop {
                    while matches!(
                        self.keyword(),
                        Some(Keyword::Virtual | Keyword::Public | Keyword::Protected | Keyword::Private)
                    ) {
                        self.bump();
                    }
                    if let Some(base) = self.name_path(true) {
                        self.tree.decl_mut(id).bases.push(base);
                    }
                    self.eat(SyntaxKind::ELLIPSIS);
                    if !self.eat(SyntaxKind::COMMA) {
                        break;
                    }
                }
            }

            spec.decl = Some(id);
            spec.defined = true;
            spec.parts.push(name.map_or_else(
                || format!("<anonymous {}>", key_tok.text),
                |n| n.text.to_string(),
            ));

            if !self.at(SyntaxKind::L_BRACE) {
                self.error("expected '{'");
                return;
            }
            if !self.enter() {
                return;
            }
            self.bump();
            let saved = (self.scope, self.access, self.section);
            self.scope = Some(id);
            self.access = if class_key == ClassKey::Class {
                Access::Private
            } else {
                Access::Public
            };
            self.section = Section::Normal;
            self.declaration_seq(true);
            self.expect(SyntaxKind::R_BRACE, "}");
            (self.scope, self.access, self.section) = saved;
            self.leave();
        } else if let Some(tok) = name {
            spec.parts.push(tok.text.to_string());
            if self.at(SyntaxKind::SEMICOLON) && !spec.is_friend && spec.parts.len() == 1 {
                let mut decl = self.new_decl(
                    DeclKind::ForwardClass,
                    Some(DeclName::from_token(tok)),
                    key_tok.position,
                );
                decl.class_key = Some(class_key);
                decl.qualifier = qualifier;
                self.tree.push_decl(decl);
                spec.forward = true;
            } else {
                spec.name = Some(self.push_name_ref(tok, qualifier_path, false));
            }
        } else {
            self.error("expected class name");
        }
    }

    fn enum_specifier(&mut self, spec: &mut DeclSpec) {
        let Some(key_tok) = self.bump() else {
            return;
        };
        let scoped = self.eat_kw(Keyword::Class) || self.eat_kw(Keyword::Struct);
        let name = if self.at_name() { self.bump() } else { None };
        let mut underlying = None;
        if self.eat(SyntaxKind::COLON) {
            let ty = self.decl_specifiers(DeclContext::Parameter);
            underlying = ty.type_ref(0, false);
        }
        spec.has_type = true;

        if self.at(SyntaxKind::L_BRACE) {
            let mut decl = self.new_decl(DeclKind::Enum, name.map(DeclName::from_token), key_tok.position);
            decl.flags.is_scoped_enum = scoped;
            decl.flags.is_definition = true;
            decl.ty = underlying;
            let id = self.tree.push_decl(decl);
            spec.decl = Some(id);
            spec.defined = true;
            spec.parts.push(name.map_or_else(|| "<anonymous enum>".to_string(), |n| n.text.to_string()));

            if !self.enter() {
                return;
            }
            self.bump();
            let saved = self.scope;
            self.scope = Some(id);
            while !self.at_eof() && !self.at(SyntaxKind::R_BRACE) {
                if self.at_name() {
                    let tok = self.bump();
                    let decl = self.new_decl(
                        DeclKind::Enumerator,
                        tok.map(DeclName::from_token),
                        self.position(),
                    );
                    self.tree.push_decl(decl);
                    if self.eat(SyntaxKind::EQ) {
                        self.expression(&[SyntaxKind::COMMA]);
                    }
                } else {
                    self.error("expected enumerator");
                    self.expression(&[SyntaxKind::COMMA]);
                }
                if !self.eat(SyntaxKind::COMMA) {
                    break;
                }
            }
            self.expect(SyntaxKind::R_BRACE, "}");
            self.scope = saved;
            self.leave();
        } else if let Some(tok) = name {
            spec.parts.push(tok.text.to_string());
            spec.name = Some(self.push_name_ref(tok, Vec::new(), false));
        }
    }

    pub(in crate::parser) fn pointer_operators(&mut self) -> (u8, bool) {
        let mut pointer = 0u8;
        let mut reference = false;
        loop {
            match self.current_kind() {
                SyntaxKind::STAR => pointer = pointer.saturating_add(1),
                SyntaxKind::AMP | SyntaxKind::AMP_AMP => reference = true,
                SyntaxKind::IDENT
                    if (pointer > 0 || reference)
                        && matches!(self.keyword(), Some(Keyword::Const | Keyword::Volatile)) => {}
                _ => break,
            }
            self.bump();
        }
        (pointer, reference)
    }

    fn init_declarator(&mut self, spec: &DeclSpec, ctx: DeclContext) -> DeclaratorEnd {
        let fallback = self.position();
        let (mut pointer, mut reference) = self.pointer_operators();

        // (*name)(params), (&name)[N]
        if self.at(SyntaxKind::L_PAREN)
            && matches!(
                self.nth_kind(1),
                SyntaxKind::STAR | SyntaxKind::AMP | SyntaxKind::CARET
            )
        {
            self.bump();
            let (inner_pointer, inner_reference) = self.pointer_operators();
            pointer = pointer.saturating_add(inner_pointer.max(1));
            reference |= inner_reference;
            let name = if self.at_name() {
                self.bump().map(DeclName::from_token)
            } else {
                None
            };
            while self.at(SyntaxKind::L_BRACKET) {
                self.balanced_expression();
            }
            self.expect(SyntaxKind::R_PAREN, ")");
            while self.at_any(&[SyntaxKind::L_PAREN, SyntaxKind::L_BRACKET]) {
                self.balanced_expression();
            }
            if !spec.is_friend {
                let kind = variable_kind(spec, ctx);
                self.push_variable(kind, name, Vec::new(), spec, ctx, pointer, reference, fallback);
            }
            self.initializer(ctx);
            return DeclaratorEnd::Done;
        }

        // declarator-id
        let mut qualifier: Vec<Name> = Vec::new();
        self.eat(SyntaxKind::COLON_COLON);
        while self.at_name() && self.qualifier_follows() {
            let Some(tok) = self.bump() else {
                break;
            };
            self.push_name_ref(tok, qualifier.clone(), false);
            if self.at(SyntaxKind::LT) {
                self.template_arguments(true);
            }
            self.bump();
            qualifier.push(tok.text.clone());
        }

        let mut destructor = false;
        let mut operator = false;
        let name = if self.at(SyntaxKind::TILDE) && self.nth_is_name(1) {
            destructor = true;
            let tilde = self.bump();
            let tok = self.bump();
            tilde.zip(tok).map(|(tilde, tok)| DeclName {
                text: Name::new(format!("~{}", tok.text)),
                position: tilde.position,
                len: tok.len + 1,
                generated: tok.generated,
            })
        } else if self.at_kw(Keyword::Operator) {
            operator = true;
            self.operator_name()
        } else if self.at_name() {
            self.bump().map(DeclName::from_token)
        } else {
            None
        };

        if name.is_none() && ctx != DeclContext::Parameter {
            self.error("expected declarator");
            self.recover();
            return DeclaratorEnd::Failed;
        }
        if name.is_some() && self.at(SyntaxKind::LT) && !ctx.is_local() {
            self.template_arguments(true);
        }

        let is_function = self.at(SyntaxKind::L_PAREN)
            && match ctx {
                DeclContext::Parameter => false,
                c if c.is_local() => self.looks_like_parameters(),
                _ => !matches!(
                    self.nth_kind(1),
                    SyntaxKind::NUMBER | SyntaxKind::STRING | SyntaxKind::CHAR
                ),
            };

        if is_function {
            if spec.is_typedef || spec.is_friend {
                if spec.is_typedef {
                    self.push_variable(
                        DeclKind::Typedef,
                        name,
                        qualifier,
                        spec,
                        ctx,
                        pointer,
                        reference,
                        fallback,
                    );
                }
                self.balanced_expression();
                return self.skip_function_rest();
            }
            return self.function_declarator(spec, ctx, name, qualifier, pointer, reference, destructor, operator, fallback);
        }

        while self.at(SyntaxKind::L_BRACKET) {
            self.balanced_expression();
        }
        if ctx == DeclContext::Parameter && self.at(SyntaxKind::L_PAREN) {
            self.balanced_expression();
        }
        if !spec.is_friend {
            let kind = variable_kind(spec, ctx);
            self.push_variable(kind, name, qualifier, spec, ctx, pointer, reference, fallback);
        }
        if ctx == DeclContext::Class && self.eat(SyntaxKind::COLON) {
            self.expression(&[SyntaxKind::COMMA, SyntaxKind::SEMICOLON, SyntaxKind::EQ]);
        }
        self.initializer(ctx);
        DeclaratorEnd::Done
    }

    /// Next tokens are `::` (possibly after template arguments) and more name.
    fn qualifier_follows(&self) -> bool {
        let mut idx = 1;
        if self.nth_kind(idx) == SyntaxKind::LT {
            let mut depth = 0i32;
            loop {
                match self.nth_kind(idx) {
                    SyntaxKind::LT => depth += 1,
                    SyntaxKind::GT => depth -= 1,
                    SyntaxKind::SHR => depth -= 2,
                    SyntaxKind::SEMICOLON | SyntaxKind::L_BRACE | SyntaxKind::ERROR => return false,
                    _ => {}
                }
                idx += 1;
                if depth <= 0 {
                    break;
                }
            }
        }
        self.nth_kind(idx) == SyntaxKind::COLON_COLON
            && (self.nth_is_name(idx + 1)
                || self.nth_kind(idx + 1) == SyntaxKind::TILDE
                || self.nth_keyword(idx + 1) == Some(Keyword::Operator))
    }

    fn operator_name(&mut self) -> Option<DeclName> {
        let op = self.bump()?;
        let mut text = String::from("operator");
        match self.current_kind() {
            SyntaxKind::L_PAREN if self.nth_kind(1) == SyntaxKind::R_PAREN => {
                text.push_str("()");
                self.pos += 2;
            }
            SyntaxKind::L_BRACKET if self.nth_kind(1) == SyntaxKind::R_BRACKET => {
                text.push_str("[]");
                self.pos += 2;
            }
            SyntaxKind::IDENT | SyntaxKind::COLON_COLON => {
                let start = self.pos;
                while !self.at_eof() && !self.at(SyntaxKind::L_PAREN) {
                    if self.at(SyntaxKind::L_BRACKET) && self.nth_kind(1) == SyntaxKind::R_BRACKET {
                        self.pos += 2;
                        continue;
                    }
                    if self.at_any(&[SyntaxKind::SEMICOLON, SyntaxKind::L_BRACE]) {
                        break;
                    }
                    self.bump();
                }
                text.push(' ');
                text.push_str(&self.tokens_text(start, self.pos));
            }
            _ => {
                if let Some(tok) = self.bump() {
                    text.push_str(&tok.text);
                }
            }
        }
        Some(DeclName {
            text: Name::new(text),
            position: op.position,
            len: op.len,
            generated: op.generated,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn function_declarator(
        &mut self,
        spec: &DeclSpec,
        ctx: DeclContext,
        name: Option<DeclName>,
        qualifier: Vec<Name>,
        pointer: u8,
        reference: bool,
        destructor: bool,
        operator: bool,
        fallback: Position,
    ) -> DeclaratorEnd {
        let mut decl = self.new_decl(DeclKind::Function, name, fallback);
        decl.qualifier = qualifier;
        decl.ty = spec.type_ref(pointer, reference);
        decl.flags.is_static = spec.flags.is_static;
        decl.flags.is_extern = spec.flags.is_extern;
        decl.flags.is_inline = spec.flags.is_inline;
        decl.flags.is_virtual = spec.flags.is_virtual;
        decl.flags.is_destructor = destructor;
        decl.flags.is_constructor = !spec.has_type && !destructor && !operator;
        if ctx == DeclContext::Class {
            decl.flags.is_signal = self.section == Section::Signals;
            decl.flags.is_slot = self.section == Section::Slots;
        }
        let id = self.tree.push_decl(decl);

        let saved = self.scope;
        self.scope = Some(id);
        self.parameter_clause(id);
        self.function_trailer(id);
        let has_body = self.at_any(&[SyntaxKind::L_BRACE, SyntaxKind::COLON])
            || self.at_kw(Keyword::Try);
        if has_body {
            self.function_body(id);
        }
        self.scope = saved;

        if has_body {
            DeclaratorEnd::Body
        } else {
            DeclaratorEnd::Done
        }
    }

    /// Skip what follows the parameters of a declarator nothing is recorded for.
    fn skip_function_rest(&mut self) -> DeclaratorEnd {
        while !self.at_eof()
            && !self.at_any(&[
                SyntaxKind::SEMICOLON,
                SyntaxKind::COMMA,
                SyntaxKind::L_BRACE,
                SyntaxKind::R_BRACE,
            ])
        {
            if self.at_any(&[SyntaxKind::L_PAREN, SyntaxKind::L_BRACKET]) {
                self.skip_balanced();
            } else {
                self.bump();
            }
        }
        if self.at(SyntaxKind::L_BRACE) {
            self.skip_balanced();
            return DeclaratorEnd::Body;
        }
        DeclaratorEnd::Done
    }

    fn parameter_clause(&mut self, function: DeclId) {
        self.bump();
        if self.eat(SyntaxKind::R_PAREN) {
            return;
        }
        if self.at_kw(Keyword::Void) && self.nth_kind(1) == SyntaxKind::R_PAREN {
            self.pos += 2;
            return;
        }
        loop {
            if self.eat(SyntaxKind::ELLIPSIS) {
                self.tree.decl_mut(function).flags.is_variadic = true;
            } else {
                self.parameter_declaration();
                if self.eat(SyntaxKind::ELLIPSIS) {
                    self.tree.decl_mut(function).flags.is_variadic = true;
                }
            }
            if self.eat(SyntaxKind::COMMA) {
                continue;
            }
            if self.eat(SyntaxKind::R_PAREN) {
                return;
            }
            self.error("expected ')'");
            self.skip_to_close_paren();
            return;
        }
    }

    /// One parameter, named or not, with its default argument.
    pub(in crate::parser) fn parameter_declaration(&mut self) {
        let spec = self.decl_specifiers(DeclContext::Parameter);
        if self.at_any(&[SyntaxKind::COMMA, SyntaxKind::R_PAREN, SyntaxKind::EQ]) {
            let fallback = spec.start;
            self.push_variable(
                DeclKind::Parameter,
                None,
                Vec::new(),
                &spec,
                DeclContext::Parameter,
                0,
                false,
                fallback,
            );
            self.initializer(DeclContext::Parameter);
        } else {
            self.init_declarator(&spec, DeclContext::Parameter);
        }
    }

    pub(in crate::parser) fn skip_to_close_paren(&mut self) {
        let mut depth = 0usize;
        while let Some(tok) = self.current() {
            match tok.kind {
                SyntaxKind::L_PAREN => depth += 1,
                SyntaxKind::R_PAREN if depth == 0 => {
                    self.bump();
                    return;
                }
                SyntaxKind::R_PAREN => depth -= 1,
                SyntaxKind::SEMICOLON | SyntaxKind::L_BRACE | SyntaxKind::R_BRACE => return,
                _ => {}
            }
            self.bump();
        }
    }

    fn function_trailer(&mut self, function: DeclId) {
        loop {
            match self.keyword() {
                Some(Keyword::Const) => {
                    self.tree.decl_mut(function).flags.is_const = true;
                    self.bump();
                }
                Some(Keyword::Volatile | Keyword::Override | Keyword::Final) => {
                    self.bump();
                }
                Some(Keyword::Noexcept | Keyword::Throw) => {
                    self.bump();
                    if self.at(SyntaxKind::L_PAREN) {
                        self.skip_balanced();
                    }
                }
                Some(_) => return,
                None => match self.current_kind() {
                    SyntaxKind::AMP | SyntaxKind::AMP_AMP => {
                        self.bump();
                    }
                    SyntaxKind::ARROW => {
                        self.bump();
                        let spec = self.decl_specifiers(DeclContext::Parameter);
                        let (pointer, reference) = self.pointer_operators();
                        self.tree.decl_mut(function).ty = spec.type_ref(pointer, reference);
                    }
                    SyntaxKind::EQ => {
                        self.bump();
                        if let Some(tok) = self.bump()
                            && tok.text == "0"
                        {
                            self.tree.decl_mut(function).flags.is_pure = true;
                        }
                    }
                    SyntaxKind::IDENT => {
                        // trailing attribute macros such as Q_DECL_OVERRIDE
                        self.bump();
                        if self.at(SyntaxKind::L_PAREN) {
                            self.skip_balanced();
                        }
                    }
                    _ => return,
                },
            }
        }
    }

    fn function_body(&mut self, function: DeclId) {
        self.tree.decl_mut(function).flags.is_definition = true;
        let is_try = self.eat_kw(Keyword::Try);
        if self.eat(SyntaxKind::COLON) {
            loop {
                if self.at_name() || self.at(SyntaxKind::COLON_COLON) {
                    self.name_path(true);
                }
                if self.at_any(&[SyntaxKind::L_PAREN, SyntaxKind::L_BRACE]) {
                    self.balanced_expression();
                } else {
                    break;
                }
                self.eat(SyntaxKind::ELLIPSIS);
                if !self.eat(SyntaxKind::COMMA) {
                    break;
                }
            }
        }
        if !self.at(SyntaxKind::L_BRACE) {
            self.error("expected function body");
            self.recover();
            return;
        }
        self.compound_statement();
        if is_try {
            while self.at_kw(Keyword::Catch) {
                self.catch_clause();
            }
        }
    }

    fn initializer(&mut self, ctx: DeclContext) {
        let stops: &[SyntaxKind] = match ctx {
            DeclContext::Parameter => &[SyntaxKind::COMMA],
            _ => &[SyntaxKind::COMMA, SyntaxKind::SEMICOLON],
        };
        if self.eat(SyntaxKind::EQ) {
            if self.at(SyntaxKind::L_BRACE) {
                self.balanced_expression();
            } else {
                self.expression(stops);
            }
        } else if self.at(SyntaxKind::L_BRACE) || (ctx.is_local() && self.at(SyntaxKind::L_PAREN)) {
            self.balanced_expression();
        }
    }

    /// In a local scope, whether `(` after a declarator opens a parameter list.
    fn looks_like_parameters(&self) -> bool {
        if self.nth_kind(1) == SyntaxKind::R_PAREN {
            return true;
        }
        match self.nth_keyword(1) {
            Some(kw) => {
                kw.is_builtin_type()
                    || kw.is_class_key()
                    || matches!(kw, Keyword::Const | Keyword::Volatile | Keyword::Enum | Keyword::Typename)
            }
            None => self.nth_is_name(1) && self.nth_is_name(2),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_variable(
        &mut self,
        kind: DeclKind,
        name: Option<DeclName>,
        qualifier: Vec<Name>,
        spec: &DeclSpec,
        ctx: DeclContext,
        pointer: u8,
        reference: bool,
        fallback: Position,
    ) -> DeclId {
        let mut decl = self.new_decl(kind, name, fallback);
        decl.ty = spec.type_ref(pointer, reference);
        decl.flags.is_static = spec.flags.is_static;
        decl.flags.is_extern = spec.flags.is_extern;
        decl.flags.is_const = spec.is_const;
        decl.flags.is_definition = match kind {
            DeclKind::Variable => {
                !spec.flags.is_extern
                    && (ctx != DeclContext::Class || !spec.flags.is_static)
            }
            _ => true,
        };
        if ctx == DeclContext::Class && !qualifier.is_empty() {
            decl.flags.is_definition = true;
        }
        decl.qualifier = qualifier;
        self.tree.push_decl(decl)
    }

    fn new_decl(&self, kind: DeclKind, name: Option<DeclName>, fallback: Position) -> Decl {
        let mut decl = match name {
            Some(name) => {
                let mut decl = Decl::new(kind, Some(name.text), name.position);
                decl.len = name.len;
                decl.generated = name.generated;
                decl
            }
            None => Decl::new(kind, None, fallback),
        };
        decl.parent = self.scope;
        decl.access = self.access;
        decl
    }

    pub(in crate::parser) fn push_name_ref(
        &mut self,
        tok: &PpToken,
        qualifier: Vec<Name>,
        global: bool,
    ) -> RefId {
        self.tree.push_ref(NameRef {
            name: tok.text.clone(),
            qualifier,
            global,
            position: tok.position,
            len: tok.len,
            scope: self.scope,
            base: RefBase::None,
            generated: tok.generated,
        })
    }

    /// `[::] a [<args>] (:: b [<args>])*`, recording a reference for every
    /// component. Returns the last one.
    pub(in crate::parser) fn name_path(&mut self, template_args: bool) -> Option<RefId> {
        let global = self.at(SyntaxKind::COLON_COLON) && self.nth_is_name(1);
        if global {
            self.bump();
        }
        let mut qualifier: Vec<Name> = Vec::new();
        let mut last = None;
        while self.at_name() {
            let Some(tok) = self.bump() else {
                break;
            };
            last = Some(self.push_name_ref(tok, qualifier.clone(), global));
            if template_args && self.at(SyntaxKind::LT) {
                self.template_arguments(true);
            }
            if self.at(SyntaxKind::COLON_COLON) && self.nth_is_name(1) {
                self.bump();
                qualifier.push(tok.text.clone());
            } else {
                break;
            }
        }
        last
    }

    /// Consume `<...>`, recording names inside when `record` is set.
    pub(in crate::parser) fn template_arguments(&mut self, record: bool) {
        let mut depth: i32 = 0;
        while let Some(tok) = self.current() {
            if self.split_gt {
                self.split_gt = false;
                depth -= 1;
                if depth <= 0 {
                    return;
                }
                continue;
            }
            match tok.kind {
                SyntaxKind::LT => depth += 1,
                SyntaxKind::GT => depth -= 1,
                SyntaxKind::SHR => {
                    if depth == 1 {
                        self.split_gt = true;
                    }
                    depth -= 2;
                }
                SyntaxKind::L_PAREN | SyntaxKind::L_BRACKET => {
                    self.skip_balanced();
                    continue;
                }
                SyntaxKind::SEMICOLON | SyntaxKind::L_BRACE | SyntaxKind::R_BRACE => return,
                SyntaxKind::IDENT if record && self.at_name() && depth > 0 => {
                    self.name_path(true);
                    continue;
                }
                _ => {}
            }
            self.bump();
            if depth <= 0 {
                return;
            }
        }
    }

    /// Source-like text of `tokens[start..end]`.
    pub(in crate::parser) fn tokens_text(&self, start: usize, end: usize) -> String {
        let mut text = String::new();
        let mut prev_word = false;
        for tok in &self.tokens[start..end.min(self.tokens.len())] {
            let word = matches!(tok.kind, SyntaxKind::IDENT | SyntaxKind::NUMBER);
            if word && prev_word {
                text.push(' ');
            }
            text.push_str(&tok.text);
            if tok.kind == SyntaxKind::COMMA {
                text.push(' ');
            }
            prev_word = word;
        }
        text
    }
}

fn variable_kind(spec: &DeclSpec, ctx: DeclContext) -> DeclKind {
    if spec.is_typedef {
        DeclKind::Typedef
    } else if ctx == DeclContext::Parameter {
        DeclKind::Parameter
    } else {
        DeclKind::Variable
    }
}

fn is_attribute(text: &str) -> bool {
    text.starts_with("__attribute") || text == "__declspec" || text == "alignas"
}
