//! Name binding.
//!
//! A [`LookupContext`] indexes one document and everything it transitively
//! includes by scope. Scopes are keyed by their qualified name (`ns::Class`),
//! so a namespace reopened in several files, or a class whose members are
//! defined out of line, is a single scope.
//!
//! ```text
//! documents ──register──▶ scopes["ns::A"] = { members, usings, definitions }
//!                                   ▲
//! NameRef ──lexical walk (blocks, params, class chain)──┘
//! ```
//!
//! Lookup is best effort: templates, overload resolution and argument-
//! dependent lookup are not modelled.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::snapshot::Snapshot;
use crate::base::{FilePath, Name, Position};
use crate::parser::tree::{Decl, RefBase};
use crate::parser::{DeclId, DeclKind, RefId};
use crate::syntax::Document;

/// Resolution gives up past this nesting (typedef chains, base classes).
const MAX_DEPTH: u32 = 24;

/// A declaration in one of the context's documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Entity {
    /// Index into [`LookupContext::documents`].
    pub doc: usize,
    pub decl: DeclId,
}

/// Identity of a symbol across documents and snapshots.
///
/// Non-local symbols are identified by their qualified name, so a
/// declaration and its out-of-line definition (and every overload) share a
/// key. Locals are identified by where they are declared.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKey {
    Qualified(Arc<str>),
    Local { file: FilePath, position: Position },
}

impl SymbolKey {
    pub fn qualified_name(&self) -> Option<&str> {
        match self {
            SymbolKey::Qualified(name) => Some(name),
            SymbolKey::Local { .. } => None,
        }
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKey::Qualified(name) => f.write_str(name),
            SymbolKey::Local { file, position } => write!(f, "{file}:{position}"),
        }
    }
}

/// Structural address of a symbol that survives a snapshot change.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolPath {
    /// Scope-qualified names from the global scope down to the symbol.
    Qualified {
        file: FilePath,
        names: Vec<Name>,
        kind: DeclKind,
    },
    Local {
        file: FilePath,
        position: Position,
        name: Name,
    },
}

impl SymbolPath {
    pub fn file(&self) -> &FilePath {
        match self {
            SymbolPath::Qualified { file, .. } | SymbolPath::Local { file, .. } => file,
        }
    }

    pub fn name(&self) -> Option<&Name> {
        match self {
            SymbolPath::Qualified { names, .. } => names.last(),
            SymbolPath::Local { name, .. } => Some(name),
        }
    }
}

/// A resolved declaration, detached from any context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub file: FilePath,
    pub decl: DeclId,
    pub kind: DeclKind,
    pub name: Name,
    pub key: SymbolKey,
    pub position: Position,
    pub len: u32,
    /// Static, or inside an anonymous namespace.
    pub internal: bool,
}

impl Symbol {
    pub fn path(&self) -> SymbolPath {
        match &self.key {
            SymbolKey::Qualified(qualified) => SymbolPath::Qualified {
                file: self.file.clone(),
                names: split_qualified(qualified).map(Name::new).collect(),
                kind: self.kind,
            },
            SymbolKey::Local { file, position } => SymbolPath::Local {
                file: file.clone(),
                position: *position,
                name: self.name.clone(),
            },
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.key, SymbolKey::Local { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum ScopeKind {
    #[default]
    Namespace,
    Class,
    Enum,
}

#[derive(Clone, Debug)]
enum UsingTarget {
    Ref { doc: usize, reference: RefId },
    Scope(Arc<str>),
}

#[derive(Debug, Default)]
struct ScopeMembers {
    kind: ScopeKind,
    members: FxHashMap<Name, Vec<Entity>>,
    usings: Vec<UsingTarget>,
    /// Class and enum definitions of this scope.
    definitions: Vec<Entity>,
}

struct Deferred {
    doc: usize,
    decl: DeclId,
    scope: Arc<str>,
}

/// Name lookup over one document and its includes.
pub struct LookupContext {
    documents: Vec<Arc<Document>>,
    scopes: FxHashMap<Arc<str>, ScopeMembers>,
    qualified: Vec<FxHashMap<DeclId, Arc<str>>>,
}

impl fmt::Debug for LookupContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupContext")
            .field("document", self.document().path())
            .field("documents", &self.documents.len())
            .field("scopes", &self.scopes.len())
            .finish()
    }
}

impl LookupContext {
    /// Index `doc` together with every snapshot document it includes.
    pub fn new(doc: Arc<Document>, snapshot: &Snapshot) -> Self {
        let mut documents = vec![doc.clone()];
        let mut seen: FxHashSet<FilePath> = FxHashSet::default();
        seen.insert(doc.path().clone());
        let mut queue: VecDeque<FilePath> = doc.resolved_includes().cloned().collect();
        while let Some(path) = queue.pop_front() {
            if !seen.insert(path.clone()) {
                continue;
            }
            if let Some(included) = snapshot.document(&path) {
                queue.extend(included.resolved_includes().cloned());
                documents.push(included);
            }
        }

        let mut ctx = Self {
            qualified: vec![FxHashMap::default(); documents.len()],
            documents,
            scopes: FxHashMap::default(),
        };
        ctx.scopes.insert(Arc::from(""), ScopeMembers::default());

        let root: Arc<str> = Arc::from("");
        let mut deferred = Vec::new();
        for doc in 0..ctx.documents.len() {
            let document = ctx.documents[doc].clone();
            for &id in document.tree().roots() {
                ctx.register(doc, id, &root, &mut deferred, false);
            }
        }
        ctx.resolve_usings(false);
        // out-of-line definitions resolve their qualifier against the index
        // built so far; nested ones may need another round
        for _ in 0..4 {
            if deferred.is_empty() {
                break;
            }
            let pending = std::mem::take(&mut deferred);
            for item in pending {
                ctx.register(item.doc, item.decl, &item.scope, &mut deferred, true);
            }
        }
        ctx.resolve_usings(true);
        ctx
    }

    /// The document the context was built for.
    pub fn document(&self) -> &Arc<Document> {
        &self.documents[0]
    }

    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    pub fn entity_document(&self, entity: Entity) -> &Arc<Document> {
        &self.documents[entity.doc]
    }

    pub fn decl(&self, entity: Entity) -> &Decl {
        self.documents[entity.doc].tree().decl(entity.decl)
    }

    /// Entity for a declaration of the primary document.
    pub fn entity(&self, decl: DeclId) -> Entity {
        Entity { doc: 0, decl }
    }

    fn document_index(&self, path: &FilePath) -> Option<usize> {
        self.documents.iter().position(|d| d.path() == path)
    }

    // =========================================================================
    // Index construction
    // =========================================================================

    fn scope_mut(&mut self, scope: &Arc<str>) -> &mut ScopeMembers {
        self.scopes.entry(scope.clone()).or_default()
    }

    fn add_member(&mut self, scope: &Arc<str>, name: &Name, entity: Entity) {
        self.scope_mut(scope)
            .members
            .entry(name.clone())
            .or_default()
            .push(entity);
    }

    fn register(
        &mut self,
        doc: usize,
        id: DeclId,
        scope: &Arc<str>,
        deferred: &mut Vec<Deferred>,
        allow_qualified: bool,
    ) {
        let document = self.documents[doc].clone();
        let tree = document.tree();
        let decl = tree.decl(id);
        let entity = Entity { doc, decl: id };

        let scope = if decl.qualifier.is_empty() {
            scope.clone()
        } else if !allow_qualified {
            deferred.push(Deferred {
                doc,
                decl: id,
                scope: scope.clone(),
            });
            return;
        } else {
            self.resolve_scope_path(doc, decl.parent, &decl.qualifier, false, decl.position, 0)
                .unwrap_or_else(|| {
                    let mut joined = scope.to_string();
                    for part in &decl.qualifier {
                        joined = join(&joined, part);
                    }
                    Arc::from(joined)
                })
        };

        match decl.kind {
            DeclKind::Block | DeclKind::Parameter => {}
            DeclKind::Namespace => {
                let qualified: Arc<str> = Arc::from(join(&scope, &segment(&document, decl)));
                self.qualified[doc].insert(id, qualified.clone());
                self.scope_mut(&qualified).kind = ScopeKind::Namespace;
                match &decl.name {
                    Some(name) => self.add_member(&scope, name, entity),
                    None => self
                        .scope_mut(&scope)
                        .usings
                        .push(UsingTarget::Scope(qualified.clone())),
                }
                for &child in tree.children(id) {
                    self.register(doc, child, &qualified, deferred, false);
                }
            }
            DeclKind::Class | DeclKind::Enum => {
                let qualified: Arc<str> = Arc::from(join(&scope, &segment(&document, decl)));
                self.qualified[doc].insert(id, qualified.clone());
                let members = self.scope_mut(&qualified);
                members.kind = if decl.kind == DeclKind::Class {
                    ScopeKind::Class
                } else {
                    ScopeKind::Enum
                };
                members.definitions.push(entity);
                if let Some(name) = &decl.name {
                    self.add_member(&scope, name, entity);
                }
                for &child in tree.children(id) {
                    self.register(doc, child, &qualified, deferred, false);
                }
                // unscoped enumerators and anonymous class members leak out
                let leaks = match decl.kind {
                    DeclKind::Enum => !decl.flags.is_scoped_enum,
                    _ => decl.name.is_none(),
                };
                if leaks {
                    for &child in tree.children(id) {
                        if let Some(name) = &tree.decl(child).name {
                            self.add_member(&scope, name, Entity { doc, decl: child });
                        }
                    }
                }
            }
            DeclKind::ForwardClass
            | DeclKind::Function
            | DeclKind::Variable
            | DeclKind::Typedef
            | DeclKind::Enumerator => {
                let Some(name) = &decl.name else {
                    return;
                };
                self.qualified[doc].insert(id, Arc::from(join(&scope, name)));
                self.add_member(&scope, name, entity);
            }
            DeclKind::UsingDirective => {
                if let Some(reference) = decl.target {
                    self.scope_mut(&scope)
                        .usings
                        .push(UsingTarget::Ref { doc, reference });
                }
            }
            DeclKind::UsingDeclaration => {
                if let Some(name) = &decl.name {
                    self.add_member(&scope, name, entity);
                }
            }
        }
    }

    /// Bind using-directives to the namespaces they name. Lookup only follows
    /// bound directives, so a directive naming an unknown namespace costs
    /// nothing later.
    fn resolve_usings(&mut self, last: bool) {
        for _ in 0..2 {
            let mut bound = Vec::new();
            for (scope, members) in &self.scopes {
                for (index, using) in members.usings.iter().enumerate() {
                    if let UsingTarget::Ref { doc, reference } = using
                        && let Some(target) = self.scope_of_ref(*doc, *reference, 0)
                    {
                        bound.push((scope.clone(), index, target));
                    }
                }
            }
            if bound.is_empty() {
                break;
            }
            for (scope, index, target) in bound {
                if let Some(members) = self.scopes.get_mut(&scope) {
                    members.usings[index] = UsingTarget::Scope(target);
                }
            }
        }
        if last {
            for members in self.scopes.values_mut() {
                members
                    .usings
                    .retain(|u| matches!(u, UsingTarget::Scope(_)));
            }
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Qualified name of a non-local declaration.
    pub fn qualified_name(&self, entity: Entity) -> Option<&Arc<str>> {
        self.qualified.get(entity.doc)?.get(&entity.decl)
    }

    /// Entities named by a fully qualified name such as `ns::Class::member`.
    pub fn lookup_qualified(&self, qualified: &str) -> Vec<Entity> {
        let (scope, name) = match qualified.rfind("::") {
            Some(idx) => (&qualified[..idx], &qualified[idx + 2..]),
            None => ("", qualified),
        };
        let mut out = Vec::new();
        self.members_of(scope, name, &mut out, &mut FxHashSet::default(), 0);
        out
    }

    fn members_of(
        &self,
        scope: &str,
        name: &str,
        out: &mut Vec<Entity>,
        visited: &mut FxHashSet<Arc<str>>,
        depth: u32,
    ) {
        if depth > MAX_DEPTH {
            return;
        }
        let Some((key, members)) = self.scopes.get_key_value(scope) else {
            return;
        };
        if !visited.insert(key.clone()) {
            return;
        }
        if let Some(found) = members.members.get(name) {
            out.extend(found.iter().copied());
        }
        if !out.is_empty() {
            return;
        }
        for using in &members.usings {
            if let UsingTarget::Scope(target) = using {
                self.members_of(target, name, out, visited, depth + 1);
            }
        }
        if !out.is_empty() || members.kind != ScopeKind::Class {
            return;
        }
        for &definition in &members.definitions {
            let document = &self.documents[definition.doc];
            for &base in &document.tree().decl(definition.decl).bases {
                if let Some(base_scope) = self.scope_of_ref(definition.doc, base, depth + 1) {
                    self.members_of(&base_scope, name, out, visited, depth + 1);
                }
            }
        }
    }

    fn using_scope(&self, using: &UsingTarget, depth: u32) -> Option<Arc<str>> {
        match using {
            UsingTarget::Scope(scope) => Some(scope.clone()),
            UsingTarget::Ref { doc, reference } => self.scope_of_ref(*doc, *reference, depth),
        }
    }

    /// Search `scope`, then each enclosing scope up to the global one.
    fn lookup_in_scope_chain(&self, scope: &str, name: &str, depth: u32) -> Vec<Entity> {
        let mut current = scope;
        loop {
            let mut out = Vec::new();
            self.members_of(current, name, &mut out, &mut FxHashSet::default(), depth);
            if !out.is_empty() || current.is_empty() {
                return out;
            }
            current = parent_scope(current);
        }
    }

    fn lookup_unqualified(
        &self,
        doc: usize,
        scope: Option<DeclId>,
        name: &str,
        position: Position,
        depth: u32,
    ) -> Vec<Entity> {
        let document = &self.documents[doc];
        let tree = document.tree();
        let mut current = scope;
        while let Some(id) = current {
            let decl = tree.decl(id);
            match decl.kind {
                DeclKind::Block => {
                    let mut found = Vec::new();
                    let mut usings = Vec::new();
                    for &child in tree.children(id) {
                        let c = tree.decl(child);
                        if c.position > position {
                            continue;
                        }
                        match c.kind {
                            DeclKind::UsingDirective => {
                                if let Some(reference) = c.target {
                                    usings.push(UsingTarget::Ref { doc, reference });
                                }
                            }
                            DeclKind::Enum if !c.flags.is_scoped_enum => {
                                if c.name.as_deref() == Some(name) {
                                    found.push(Entity { doc, decl: child });
                                }
                                found.extend(
                                    tree.children(child)
                                        .iter()
                                        .filter(|&&e| tree.decl(e).name.as_deref() == Some(name))
                                        .map(|&e| Entity { doc, decl: e }),
                                );
                            }
                            _ if c.name.as_deref() == Some(name) => {
                                found.push(Entity { doc, decl: child });
                            }
                            _ => {}
                        }
                    }
                    if !found.is_empty() {
                        return found;
                    }
                    for using in &usings {
                        if let Some(target) = self.using_scope(using, depth + 1) {
                            let mut out = Vec::new();
                            self.members_of(&target, name, &mut out, &mut FxHashSet::default(), depth + 1);
                            if !out.is_empty() {
                                return out;
                            }
                        }
                    }
                }
                DeclKind::Function => {
                    let params: Vec<Entity> = tree
                        .parameters(id)
                        .filter(|&p| tree.decl(p).name.as_deref() == Some(name))
                        .map(|p| Entity { doc, decl: p })
                        .collect();
                    if !params.is_empty() {
                        return params;
                    }
                    if !decl.qualifier.is_empty()
                        && let Some(qualified) = self.qualified_name(Entity { doc, decl: id })
                    {
                        return self.lookup_in_scope_chain(parent_scope(qualified), name, depth);
                    }
                }
                DeclKind::Class | DeclKind::Namespace | DeclKind::Enum => {
                    if let Some(qualified) = self.qualified_name(Entity { doc, decl: id }) {
                        return self.lookup_in_scope_chain(qualified, name, depth);
                    }
                }
                _ => {}
            }
            current = decl.parent;
        }
        self.lookup_in_scope_chain("", name, depth)
    }

    fn resolve_scope_path(
        &self,
        doc: usize,
        lexical: Option<DeclId>,
        qualifier: &[Name],
        global: bool,
        position: Position,
        depth: u32,
    ) -> Option<Arc<str>> {
        let Some((first, rest)) = qualifier.split_first() else {
            return global.then(|| Arc::from(""));
        };
        let entities = if global {
            let mut out = Vec::new();
            self.members_of("", first, &mut out, &mut FxHashSet::default(), depth + 1);
            out
        } else {
            self.lookup_unqualified(doc, lexical, first, position, depth + 1)
        };
        let mut current = self.scope_for_entities(&entities, depth + 1)?;
        for part in rest {
            let mut out = Vec::new();
            self.members_of(&current, part, &mut out, &mut FxHashSet::default(), depth + 1);
            current = self.scope_for_entities(&out, depth + 1)?;
        }
        Some(current)
    }

    /// The scope a set of entities names, following typedefs and using-declarations.
    fn scope_for_entities(&self, entities: &[Entity], depth: u32) -> Option<Arc<str>> {
        if depth > MAX_DEPTH {
            return None;
        }
        entities.iter().find_map(|&entity| {
            let decl = self.decl(entity);
            match decl.kind {
                DeclKind::Namespace | DeclKind::Class | DeclKind::Enum | DeclKind::ForwardClass => {
                    self.qualified_name(entity).cloned()
                }
                DeclKind::Typedef => self.type_scope(entity, depth + 1),
                DeclKind::UsingDeclaration => {
                    let target = decl.target?;
                    let resolved = self.resolve_in(entity.doc, target, depth + 1);
                    self.scope_for_entities(&resolved, depth + 1)
                }
                _ => None,
            }
        })
    }

    fn scope_of_ref(&self, doc: usize, reference: RefId, depth: u32) -> Option<Arc<str>> {
        let entities = self.resolve_in(doc, reference, depth + 1);
        self.scope_for_entities(&entities, depth + 1)
    }

    /// Class scope of a typed entity: a variable's type, a function's return
    /// type, or the class itself.
    fn type_scope(&self, entity: Entity, depth: u32) -> Option<Arc<str>> {
        if depth > MAX_DEPTH {
            return None;
        }
        let decl = self.decl(entity);
        match decl.kind {
            DeclKind::Class | DeclKind::ForwardClass | DeclKind::Enum | DeclKind::Namespace => {
                self.qualified_name(entity).cloned()
            }
            DeclKind::Variable | DeclKind::Parameter | DeclKind::Function | DeclKind::Typedef => {
                let ty = decl.ty.as_ref()?;
                if let Some(inline) = ty.decl {
                    return self
                        .qualified_name(Entity {
                            doc: entity.doc,
                            decl: inline,
                        })
                        .cloned();
                }
                self.scope_of_ref(entity.doc, ty.name?, depth + 1)
            }
            DeclKind::UsingDeclaration => {
                let resolved = self.resolve_in(entity.doc, decl.target?, depth + 1);
                resolved
                    .first()
                    .and_then(|&e| self.type_scope(e, depth + 1))
            }
            _ => None,
        }
    }

    /// Class that `this` refers to at `scope`.
    fn this_scope(&self, doc: usize, scope: Option<DeclId>) -> Option<Arc<str>> {
        let tree = self.documents[doc].tree();
        let mut current = scope;
        while let Some(id) = current {
            let decl = tree.decl(id);
            match decl.kind {
                DeclKind::Class => return self.qualified_name(Entity { doc, decl: id }).cloned(),
                DeclKind::Function if !decl.qualifier.is_empty() => {
                    return self
                        .qualified_name(Entity { doc, decl: id })
                        .map(|q| Arc::from(parent_scope(q)));
                }
                _ => current = decl.parent,
            }
        }
        None
    }

    fn resolve_in(&self, doc: usize, reference: RefId, depth: u32) -> Vec<Entity> {
        if depth > MAX_DEPTH {
            return Vec::new();
        }
        let r = self.documents[doc].tree().name_ref(reference);
        let mut out = Vec::new();
        match r.base {
            RefBase::None if r.global || !r.qualifier.is_empty() => {
                if let Some(scope) =
                    self.resolve_scope_path(doc, r.scope, &r.qualifier, r.global, r.position, depth)
                {
                    self.members_of(&scope, &r.name, &mut out, &mut FxHashSet::default(), depth + 1);
                }
            }
            RefBase::None => {
                out = self.lookup_unqualified(doc, r.scope, &r.name, r.position, depth + 1);
            }
            RefBase::This => {
                if let Some(scope) = self.this_scope(doc, r.scope) {
                    self.members_of(&scope, &r.name, &mut out, &mut FxHashSet::default(), depth + 1);
                }
            }
            RefBase::Ref(base) => {
                let base_entities = self.resolve_in(doc, base, depth + 1);
                if let Some(scope) = base_entities
                    .iter()
                    .find_map(|&e| self.type_scope(e, depth + 1))
                {
                    self.members_of(&scope, &r.name, &mut out, &mut FxHashSet::default(), depth + 1);
                }
            }
            RefBase::Unknown => {}
        }
        out
    }

    /// Declarations a reference of the primary document binds to.
    pub fn resolve(&self, reference: RefId) -> Vec<Entity> {
        self.resolve_in(0, reference, 0)
    }

    /// Like [`LookupContext::resolve`], with using-declarations replaced by
    /// what they name.
    pub fn resolve_through_usings(&self, reference: RefId) -> Vec<Entity> {
        self.follow_usings(self.resolve(reference))
    }

    fn follow_usings(&self, entities: Vec<Entity>) -> Vec<Entity> {
        let mut out = Vec::with_capacity(entities.len());
        for entity in entities {
            let decl = self.decl(entity);
            match (decl.kind, decl.target) {
                (DeclKind::UsingDeclaration, Some(target)) => {
                    let targets = self.resolve_in(entity.doc, target, 1);
                    if targets.is_empty() {
                        out.push(entity);
                    } else {
                        out.extend(targets);
                    }
                }
                _ => out.push(entity),
            }
        }
        out
    }

    /// Identity of an entity.
    pub fn key(&self, entity: Entity) -> SymbolKey {
        let decl = self.decl(entity);
        if decl.kind == DeclKind::UsingDeclaration {
            let targets = self.follow_usings(vec![entity]);
            if let Some(&target) = targets.first()
                && target != entity
            {
                return self.key(target);
            }
        }
        match self.qualified_name(entity) {
            Some(qualified) => SymbolKey::Qualified(qualified.clone()),
            None => SymbolKey::Local {
                file: self.documents[entity.doc].path().clone(),
                position: decl.position,
            },
        }
    }

    pub fn symbol(&self, entity: Entity) -> Symbol {
        let decl = self.decl(entity);
        let key = self.key(entity);
        let internal = match key.qualified_name() {
            Some(qualified) => {
                let in_class = self
                    .scopes
                    .get(parent_scope(qualified))
                    .is_some_and(|s| s.kind == ScopeKind::Class);
                (decl.flags.is_static && !in_class) || qualified.contains("<anonymous@")
            }
            None => false,
        };
        Symbol {
            file: self.documents[entity.doc].path().clone(),
            decl: entity.decl,
            kind: decl.kind,
            name: decl.name.clone().unwrap_or_default(),
            key,
            position: decl.position,
            len: decl.len,
            internal,
        }
    }

    /// Symbol under the cursor in the primary document.
    pub fn symbol_at(&self, position: Position) -> Option<Symbol> {
        let tree = self.document().tree();
        if let Some(reference) = tree.ref_at(position) {
            let resolved = self.resolve_through_usings(reference);
            return resolved.first().map(|&e| self.symbol(e));
        }
        let decl = tree.decl_at(position)?;
        let entity = self.follow_usings(vec![self.entity(decl)]);
        entity.first().map(|&e| self.symbol(e))
    }

    /// Find the symbol a [`SymbolPath`] addressed, in this context.
    pub fn resolve_path(&self, path: &SymbolPath) -> Option<Symbol> {
        match path {
            SymbolPath::Qualified { file, names, kind } => {
                let qualified = names
                    .iter()
                    .map(|n| n.as_str())
                    .collect::<Vec<_>>()
                    .join("::");
                let candidates = self.lookup_qualified(&qualified);
                let preferred = self.document_index(file);
                candidates
                    .iter()
                    .find(|e| Some(e.doc) == preferred && self.decl(**e).kind == *kind)
                    .or_else(|| candidates.iter().find(|e| self.decl(**e).kind == *kind))
                    .or_else(|| candidates.first())
                    .map(|&e| self.symbol(e))
            }
            SymbolPath::Local {
                file,
                position,
                name,
            } => {
                let doc = self.document_index(file)?;
                let tree = self.documents[doc].tree();
                let id = tree.decl_at(*position)?;
                (tree.decl(id).name.as_ref() == Some(name))
                    .then(|| self.symbol(Entity { doc, decl: id }))
            }
        }
    }
}

/// `scope::name`, or `name` at global scope.
fn join(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}::{name}")
    }
}

/// `a::b` for `a::b::c`, `""` for `c`.
pub(crate) fn parent_scope(qualified: &str) -> &str {
    match qualified.rfind("::") {
        Some(idx) => &qualified[..idx],
        None => "",
    }
}

pub(crate) fn split_qualified(qualified: &str) -> impl Iterator<Item = &str> {
    qualified.split("::")
}

/// Scope name of a declaration; unnamed scopes get a name unique to their
/// position.
fn segment(document: &Document, decl: &Decl) -> String {
    match &decl.name {
        Some(name) => name.to_string(),
        None => format!(
            "<anonymous@{}:{}:{}>",
            document.path(),
            decl.position.line,
            decl.position.column
        ),
    }
}

/// Symbol under `position` in `path`.
pub fn symbol_at(snapshot: &Snapshot, path: &FilePath, position: Position) -> Option<Symbol> {
    let doc = snapshot.document(path)?;
    LookupContext::new(doc, snapshot).symbol_at(position)
}
