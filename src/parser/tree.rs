//! Arena-based declaration tree.
//!
//! The parser produces one [`DeclTree`] per document: declarations form a tree
//! through `parent`/`children` links, and every identifier occurrence that is
//! not itself a declarator is recorded as a [`NameRef`] pointing at the scope it
//! appears in. Name binding happens later, in `hir::lookup`.

use std::fmt;

use crate::base::{Name, Position};

/// Index of a declaration in a [`DeclTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclId(u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a name reference in a [`DeclTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefId(u32);

impl RefId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of declaration kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Namespace,
    Class,
    ForwardClass,
    Enum,
    Enumerator,
    Function,
    Parameter,
    Variable,
    Typedef,
    UsingDirective,
    UsingDeclaration,
    Block,
}

impl DeclKind {
    /// Kinds that open a named scope.
    pub fn is_scope(self) -> bool {
        matches!(
            self,
            DeclKind::Namespace | DeclKind::Class | DeclKind::Enum | DeclKind::Function | DeclKind::Block
        )
    }

    pub fn is_type(self) -> bool {
        matches!(
            self,
            DeclKind::Class | DeclKind::ForwardClass | DeclKind::Enum | DeclKind::Typedef
        )
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DeclKind::Namespace => "namespace",
            DeclKind::Class => "class",
            DeclKind::ForwardClass => "forward class",
            DeclKind::Enum => "enum",
            DeclKind::Enumerator => "enumerator",
            DeclKind::Function => "function",
            DeclKind::Parameter => "parameter",
            DeclKind::Variable => "variable",
            DeclKind::Typedef => "typedef",
            DeclKind::UsingDirective => "using directive",
            DeclKind::UsingDeclaration => "using declaration",
            DeclKind::Block => "block",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassKey {
    Class,
    Struct,
    Union,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

/// Boolean properties of a declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DeclFlags {
    pub is_static: bool,
    pub is_extern: bool,
    pub is_inline: bool,
    pub is_virtual: bool,
    pub is_const: bool,
    pub is_definition: bool,
    pub is_signal: bool,
    pub is_slot: bool,
    pub is_constructor: bool,
    pub is_destructor: bool,
    pub is_scoped_enum: bool,
    pub is_variadic: bool,
    pub is_pure: bool,
}

/// A spelled type.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TypeRef {
    /// Display text, e.g. `const Foo *`.
    pub text: String,
    /// The named type component, if the type is not a builtin.
    pub name: Option<RefId>,
    /// Class or enum defined inline, as in `struct { int x; } value;`.
    pub decl: Option<DeclId>,
    pub pointer: u8,
    pub reference: bool,
    pub is_const: bool,
}

/// A declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decl {
    pub kind: DeclKind,
    /// `None` for anonymous namespaces, classes, enums and blocks.
    pub name: Option<Name>,
    /// Out-of-line qualifier: `[A, B]` for `void A::B::f()`.
    pub qualifier: Vec<Name>,
    /// Position of the name, or of the introducing keyword when anonymous.
    pub position: Position,
    pub len: u32,
    pub parent: Option<DeclId>,
    pub children: Vec<DeclId>,
    /// Variable/parameter type, function return type, typedef target,
    /// enum underlying type.
    pub ty: Option<TypeRef>,
    pub bases: Vec<RefId>,
    pub class_key: Option<ClassKey>,
    pub access: Access,
    /// Namespace named by a using-directive, symbol named by a using-declaration.
    pub target: Option<RefId>,
    pub flags: DeclFlags,
    /// The name came out of a macro expansion.
    pub generated: bool,
}

impl Decl {
    pub fn new(kind: DeclKind, name: Option<Name>, position: Position) -> Self {
        let len = name.as_ref().map_or(0, |n| n.len() as u32);
        Self {
            kind,
            name,
            qualifier: Vec::new(),
            position,
            len,
            parent: None,
            children: Vec::new(),
            ty: None,
            bases: Vec::new(),
            class_key: None,
            access: Access::Public,
            target: None,
            flags: DeclFlags::default(),
            generated: false,
        }
    }

    pub fn name_str(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }
}

/// What a member access is applied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RefBase {
    /// Plain (possibly qualified) name.
    #[default]
    None,
    /// `this->name`
    This,
    /// `expr.name` / `expr->name` where `expr` ends in the given reference.
    Ref(RefId),
    /// Member of an expression the parser could not follow.
    Unknown,
}

/// An identifier occurrence that refers to a declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameRef {
    pub name: Name,
    /// `[A, B]` for `A::B::name`.
    pub qualifier: Vec<Name>,
    /// Leading `::`.
    pub global: bool,
    pub position: Position,
    pub len: u32,
    /// Innermost enclosing declaration, `None` at file scope.
    pub scope: Option<DeclId>,
    pub base: RefBase,
    pub generated: bool,
}

/// Declarations and references of one document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeclTree {
    decls: Vec<Decl>,
    refs: Vec<NameRef>,
    roots: Vec<DeclId>,
}

impl DeclTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration under `decl.parent`.
    pub fn push_decl(&mut self, decl: Decl) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        match decl.parent {
            Some(parent) => self.decls[parent.index()].children.push(id),
            None => self.roots.push(id),
        }
        self.decls.push(decl);
        id
    }

    pub fn push_ref(&mut self, name_ref: NameRef) -> RefId {
        let id = RefId(self.refs.len() as u32);
        self.refs.push(name_ref);
        id
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    /// Like [`decl`](Self::decl), for ids that may come from an older tree.
    pub fn get(&self, id: DeclId) -> Option<&Decl> {
        self.decls.get(id.index())
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    pub fn name_ref(&self, id: RefId) -> &NameRef {
        &self.refs[id.index()]
    }

    pub fn name_ref_mut(&mut self, id: RefId) -> &mut NameRef {
        &mut self.refs[id.index()]
    }

    pub fn roots(&self) -> &[DeclId] {
        &self.roots
    }

    pub fn children(&self, id: DeclId) -> &[DeclId] {
        &self.decls[id.index()].children
    }

    pub fn decls(&self) -> impl Iterator<Item = (DeclId, &Decl)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(idx, decl)| (DeclId(idx as u32), decl))
    }

    pub fn refs(&self) -> impl Iterator<Item = (RefId, &NameRef)> {
        self.refs
            .iter()
            .enumerate()
            .map(|(idx, r)| (RefId(idx as u32), r))
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    pub fn ref_count(&self) -> usize {
        self.refs.len()
    }

    pub fn parameters(&self, function: DeclId) -> impl Iterator<Item = DeclId> + '_ {
        self.children(function)
            .iter()
            .copied()
            .filter(|&child| self.decl(child).kind == DeclKind::Parameter)
    }

    pub fn argument_count(&self, function: DeclId) -> usize {
        self.parameters(function).count()
    }

    /// Parameter list and cv-qualifier, e.g. `(int, const char *) const`.
    pub fn signature(&self, function: DeclId) -> String {
        let params: Vec<&str> = self
            .parameters(function)
            .map(|p| self.decl(p).ty.as_ref().map_or("", |ty| ty.text.as_str()))
            .collect();
        let decl = self.decl(function);
        let mut text = format!("({}", params.join(", "));
        if decl.flags.is_variadic {
            text.push_str(if params.is_empty() { "..." } else { ", ..." });
        }
        text.push(')');
        if decl.flags.is_const {
            text.push_str(" const");
        }
        text
    }

    /// The function body block, if the function is defined here.
    pub fn body(&self, function: DeclId) -> Option<DeclId> {
        self.children(function)
            .iter()
            .copied()
            .find(|&child| self.decl(child).kind == DeclKind::Block)
    }

    /// Ancestors from the direct parent outwards.
    pub fn ancestors(&self, id: DeclId) -> impl Iterator<Item = DeclId> + '_ {
        std::iter::successors(self.decl(id).parent, move |&p| self.decl(p).parent)
    }

    /// Closest ancestor (or self) that is not a block, parameter or enumerator
    /// holder, i.e. where the declaration lives semantically.
    pub fn enclosing_non_block(&self, scope: Option<DeclId>) -> Option<DeclId> {
        let mut current = scope;
        while let Some(id) = current {
            match self.decl(id).kind {
                DeclKind::Block | DeclKind::Function => current = self.decl(id).parent,
                _ => return Some(id),
            }
        }
        None
    }

    /// Whether the declaration is inside a function body or parameter list.
    pub fn is_local(&self, id: DeclId) -> bool {
        self.ancestors(id).any(|a| {
            matches!(self.decl(a).kind, DeclKind::Block | DeclKind::Function)
        })
    }

    /// Declaration whose name covers `position`.
    pub fn decl_at(&self, position: Position) -> Option<DeclId> {
        self.decls().find_map(|(id, decl)| {
            (decl.name.is_some() && covers(decl.position, decl.len, position)).then_some(id)
        })
    }

    /// Reference covering `position`.
    pub fn ref_at(&self, position: Position) -> Option<RefId> {
        self.refs()
            .find_map(|(id, r)| (!r.generated && covers(r.position, r.len, position)).then_some(id))
    }

    /// Named declarations in document order, skipping locals.
    pub fn global_decls(&self) -> impl Iterator<Item = (DeclId, &Decl)> {
        self.decls()
            .filter(|(id, decl)| decl.name.is_some() && !self.is_local(*id))
    }
}

fn covers(start: Position, len: u32, position: Position) -> bool {
    start.line == position.line
        && position.column >= start.column
        && position.column < start.column + len.max(1)
}
