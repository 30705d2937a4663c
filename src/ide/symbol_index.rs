//! Per-document tree of searchable symbols.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use crate::base::{FilePath, StringTable};
use crate::parser::tree::Decl;
use crate::parser::{DeclId, DeclKind, DeclTree};
use crate::syntax::Document;

/// Which kinds of symbol a search is interested in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbolKinds(u8);

impl SymbolKinds {
    pub const NONE: SymbolKinds = SymbolKinds(0);
    pub const CLASSES: SymbolKinds = SymbolKinds(1);
    pub const FUNCTIONS: SymbolKinds = SymbolKinds(1 << 1);
    pub const ENUMS: SymbolKinds = SymbolKinds(1 << 2);
    pub const DECLARATIONS: SymbolKinds = SymbolKinds(1 << 3);
    pub const ALL: SymbolKinds = SymbolKinds(0b1111);

    pub fn contains(self, other: SymbolKinds) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for SymbolKinds {
    type Output = SymbolKinds;

    fn bitor(self, rhs: SymbolKinds) -> SymbolKinds {
        SymbolKinds(self.0 | rhs.0)
    }
}

impl BitOrAssign for SymbolKinds {
    fn bitor_assign(&mut self, rhs: SymbolKinds) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for SymbolKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (SymbolKinds::CLASSES, "CLASSES"),
            (SymbolKinds::FUNCTIONS, "FUNCTIONS"),
            (SymbolKinds::ENUMS, "ENUMS"),
            (SymbolKinds::DECLARATIONS, "DECLARATIONS"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(kind, _)| self.contains(*kind))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "SymbolKinds({})", set.join(" | "))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexItemKind {
    /// Root of a document's tree.
    File,
    Enum,
    Class,
    Function,
    Declaration,
}

impl IndexItemKind {
    pub fn search_kind(self) -> SymbolKinds {
        match self {
            IndexItemKind::File => SymbolKinds::NONE,
            IndexItemKind::Enum => SymbolKinds::ENUMS,
            IndexItemKind::Class => SymbolKinds::CLASSES,
            IndexItemKind::Function => SymbolKinds::FUNCTIONS,
            IndexItemKind::Declaration => SymbolKinds::DECLARATIONS,
        }
    }
}

/// One node of a document's symbol tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexItem {
    /// Name as written, possibly unqualified.
    pub name: Arc<str>,
    /// Pretty-printed type: `(int) -> void` for functions, the declared type
    /// for declarations, empty otherwise.
    pub symbol_type: Arc<str>,
    /// Enclosing scope, `ns::Class`.
    pub scope: Arc<str>,
    pub kind: IndexItemKind,
    pub file: FilePath,
    /// 0-based.
    pub line: u32,
    /// 0-based.
    pub column: u32,
    pub children: Vec<IndexItem>,
}

impl IndexItem {
    /// Name plus type for functions, `type name` for declarations.
    pub fn display_text(&self) -> String {
        match self.kind {
            IndexItemKind::Function => format!("{}{}", self.name, self.symbol_type),
            IndexItemKind::Declaration if !self.symbol_type.is_empty() => {
                if self.symbol_type.starts_with('(') {
                    format!("{}{}", self.name, self.symbol_type)
                } else {
                    format!("{} {}", self.symbol_type, self.name)
                }
            }
            _ => self.name.to_string(),
        }
    }

    /// `scope::name`, or `name` at global scope.
    pub fn qualified_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.to_string()
        } else {
            format!("{}::{}", self.scope, self.name)
        }
    }

    /// Depth-first walk over this item and its descendants.
    pub fn visit(&self, f: &mut impl FnMut(&IndexItem)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(IndexItem::count).sum::<usize>()
    }
}

/// Builds [`IndexItem`] trees with interned strings.
pub struct SymbolIndexBuilder<'a> {
    strings: &'a StringTable,
    kinds: SymbolKinds,
}

impl<'a> SymbolIndexBuilder<'a> {
    pub fn new(strings: &'a StringTable, kinds: SymbolKinds) -> Self {
        Self { strings, kinds }
    }

    /// Symbol tree of `document`, with every scope prefixed by `scope_prefix`.
    pub fn index_of(&self, document: &Document, scope_prefix: &str) -> IndexItem {
        let mut root = IndexItem {
            name: self.strings.intern(document.path().as_str()),
            symbol_type: self.strings.intern(""),
            scope: self.strings.intern(scope_prefix),
            kind: IndexItemKind::File,
            file: document.path().clone(),
            line: 0,
            column: 0,
            children: Vec::new(),
        };
        let tree = document.tree();
        for &id in tree.roots() {
            self.visit(document, tree, id, scope_prefix, &mut root.children);
        }
        root
    }

    fn visit(&self, document: &Document, tree: &DeclTree, id: DeclId, scope: &str, out: &mut Vec<IndexItem>) {
        let decl = tree.decl(id);
        if decl.generated {
            return;
        }
        match decl.kind {
            DeclKind::Namespace => {
                let name = decl.name.as_deref().unwrap_or("<anonymous namespace>");
                let inner = join(scope, name);
                for &child in tree.children(id) {
                    self.visit(document, tree, child, &inner, out);
                }
            }
            DeclKind::Class | DeclKind::Enum => {
                let (kind, wanted, anonymous) = if decl.kind == DeclKind::Class {
                    (IndexItemKind::Class, SymbolKinds::CLASSES, "<anonymous class>")
                } else {
                    (IndexItemKind::Enum, SymbolKinds::ENUMS, "<anonymous enum>")
                };
                let name = decl.name.as_deref().unwrap_or(anonymous);
                let inner = join(scope, &qualified(decl, name));
                if self.kinds.contains(wanted) {
                    let mut item = self.item(document, decl, name, "", scope, kind);
                    for &child in tree.children(id) {
                        self.visit(document, tree, child, &inner, &mut item.children);
                    }
                    out.push(item);
                } else {
                    for &child in tree.children(id) {
                        self.visit(document, tree, child, &inner, out);
                    }
                }
            }
            DeclKind::Function => {
                let Some(name) = decl.name.as_deref() else {
                    return;
                };
                let mut symbol_type = tree.signature(id);
                if let Some(ret) = decl.ty.as_ref().filter(|t| !t.text.is_empty()) {
                    symbol_type.push_str(" -> ");
                    symbol_type.push_str(&ret.text);
                }
                let item_scope = join(scope, &decl.qualifier.join("::"));
                let (kind, included) = if decl.flags.is_definition {
                    (IndexItemKind::Function, self.kinds.contains(SymbolKinds::FUNCTIONS))
                } else {
                    (
                        IndexItemKind::Declaration,
                        self.kinds.contains(SymbolKinds::DECLARATIONS)
                            || (decl.flags.is_signal && self.kinds.contains(SymbolKinds::FUNCTIONS)),
                    )
                };
                if included {
                    out.push(self.item(document, decl, name, &symbol_type, &item_scope, kind));
                }
            }
            DeclKind::Variable | DeclKind::Typedef | DeclKind::Enumerator => {
                if !self.kinds.contains(SymbolKinds::DECLARATIONS) {
                    return;
                }
                let Some(name) = decl.name.as_deref() else {
                    return;
                };
                let symbol_type = decl.ty.as_ref().map_or("", |t| t.text.as_str());
                let item_scope = join(scope, &decl.qualifier.join("::"));
                out.push(self.item(document, decl, name, symbol_type, &item_scope, IndexItemKind::Declaration));
            }
            DeclKind::ForwardClass
            | DeclKind::Parameter
            | DeclKind::Block
            | DeclKind::UsingDirective
            | DeclKind::UsingDeclaration => {}
        }
    }

    fn item(
        &self,
        document: &Document,
        decl: &Decl,
        name: &str,
        symbol_type: &str,
        scope: &str,
        kind: IndexItemKind,
    ) -> IndexItem {
        IndexItem {
            name: self.strings.intern(name),
            symbol_type: self.strings.intern(symbol_type),
            scope: self.strings.intern(scope),
            kind,
            file: document.path().clone(),
            line: decl.position.line,
            column: decl.position.column,
            children: Vec::new(),
        }
    }
}

fn qualified(decl: &Decl, name: &str) -> String {
    if decl.qualifier.is_empty() {
        name.to_string()
    } else {
        format!("{}::{name}", decl.qualifier.join("::"))
    }
}

fn join(scope: &str, name: &str) -> String {
    match (scope.is_empty(), name.is_empty()) {
        (_, true) => scope.to_string(),
        (true, false) => name.to_string(),
        (false, false) => format!("{scope}::{name}"),
    }
}

#[cfg(test)]
mod tests;
