//! Scopes and symbols of one IDL translation unit.
//!
//! The table is built by [`collect`] before generation starts and is then
//! consumed by the generator. Scopes and symbols live in arenas and are
//! addressed by [`ScopeId`] / [`SymbolId`].
//!
//! # Pragma scopes
//!
//! `#pragma prefix "p"` opens a scope named `p` below the root. Declarations
//! that follow live inside it, so their qualified names start with `p`. For
//! lookups from outside, pragma scopes are transparent: a child scope or
//! symbol of a pragma scope is also found through the pragma scope's parent.

pub mod collect;

use std::collections::HashMap;

use thiserror::Error;

use crate::ast::ScopedName;
use crate::diagnostics::ErrorCode;
use crate::span::Span;

pub use collect::collect;

/// Index of a scope in the [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The root (file) scope.
    pub const ROOT: ScopeId = ScopeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a symbol in the [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The file scope.
    Root,
    /// A `module`, or a synthetic `<container>_package` scope.
    Module,
    /// A scope opened by `#pragma prefix`.
    Pragma,
    /// The scope of a type declaration. Class-like types (concrete value
    /// types and exceptions) can hold nested types directly.
    Type { class_like: bool },
}

/// The kind of symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A complete type definition.
    Definition,
    /// A forward declaration which has not been completed yet.
    FwdDecl,
    /// A typedef declarator.
    Typedef,
    /// A constant or an enumerator.
    Value,
}

/// A named entry of a scope.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub declared_in: ScopeId,
    pub span: Span,
}

/// A node of the scope tree.
#[derive(Debug, Clone)]
pub struct Scope {
    pub name: String,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    child_names: HashMap<String, ScopeId>,
    symbols: HashMap<String, SymbolId>,
    pragma_ids: HashMap<String, String>,
    pragma_versions: HashMap<String, String>,
}

impl Scope {
    fn new(name: String, kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            name,
            kind,
            parent,
            children: Vec::new(),
            child_names: HashMap::new(),
            symbols: HashMap::new(),
            pragma_ids: HashMap::new(),
            pragma_versions: HashMap::new(),
        }
    }
}

/// Errors raised by symbol table operations and scoped-name resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("`{name}` is already defined in {scope}")]
    Redefinition { name: String, scope: String },

    #[error("typedef `{name}` clashes with an existing name in {scope}")]
    TypedefConflict { name: String, scope: String },

    #[error("repository id of `{name}` is already `{existing}`, can not set it to `{new}`")]
    DuplicatePragmaId {
        name: String,
        existing: String,
        new: String,
    },

    #[error("the root scope can not be closed")]
    CloseRoot,

    #[error("type only forward declared: `{name}`")]
    ForwardNotCompleted { name: String },

    #[error("scope `{name}` not found")]
    ScopeNotFound { name: String },

    #[error("scoped name not resolvable: `{name}`")]
    UnresolvedName { name: String },
}

impl ScopeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ScopeError::Redefinition { .. } => ErrorCode::Redefinition,
            ScopeError::TypedefConflict { .. } => ErrorCode::TypedefConflict,
            ScopeError::DuplicatePragmaId { .. } => ErrorCode::DuplicatePragmaId,
            ScopeError::CloseRoot => ErrorCode::InternalError,
            ScopeError::ForwardNotCompleted { .. } => ErrorCode::ForwardNotCompleted,
            ScopeError::ScopeNotFound { .. } => ErrorCode::ScopeNotFound,
            ScopeError::UnresolvedName { .. } => ErrorCode::UnresolvedName,
        }
    }
}

/// Strip the leading `_` IDL uses to escape identifiers that clash with
/// keywords.
pub fn map_identifier(name: &str) -> &str {
    name.strip_prefix('_').unwrap_or(name)
}

/// The scope tree of one translation unit.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    current: ScopeId,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(String::new(), ScopeKind::Root, None)],
            symbols: Vec::new(),
            current: ScopeId::ROOT,
        }
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    /// Number of scopes, including the root.
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Child scopes of `scope` in creation order.
    pub fn children(&self, scope: ScopeId) -> &[ScopeId] {
        &self.scope(scope).children
    }

    // ============================================================
    // Scope navigation
    // ============================================================

    /// Get or create the child `name` of `parent`.
    fn child_or_create(&mut self, parent: ScopeId, name: &str, kind: ScopeKind) -> ScopeId {
        if let Some(&existing) = self.scope(parent).child_names.get(name) {
            return existing;
        }
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes
            .push(Scope::new(name.to_string(), kind, Some(parent)));
        let parent_scope = self.scope_mut(parent);
        parent_scope.children.push(id);
        parent_scope.child_names.insert(name.to_string(), id);
        id
    }

    /// Descend into the child scope `name`, creating it on first use.
    pub fn open_scope(&mut self, name: &str, kind: ScopeKind) -> ScopeId {
        self.current = self.child_or_create(self.current, name, kind);
        self.current
    }

    /// Return to the parent of the current scope.
    pub fn close_scope(&mut self) -> Result<(), ScopeError> {
        match self.scope(self.current).parent {
            Some(parent) => {
                self.current = parent;
                Ok(())
            }
            None => Err(ScopeError::CloseRoot),
        }
    }

    /// Open the pragma scope for `prefix` below the current scope. An empty
    /// prefix opens nothing.
    pub fn open_pragma_scope(&mut self, prefix: &str) {
        if !prefix.is_empty() {
            self.open_scope(prefix, ScopeKind::Pragma);
        }
    }

    /// Leave the innermost pragma scope enclosing the current scope, if any.
    pub fn close_pragma_scope(&mut self) {
        let mut scope = self.current;
        loop {
            let entry = self.scope(scope);
            match (entry.kind, entry.parent) {
                (ScopeKind::Pragma, Some(parent)) => {
                    self.current = parent;
                    return;
                }
                (_, Some(parent)) => scope = parent,
                (_, None) => return,
            }
        }
    }

    /// Whether the current scope is the file scope or a pragma scope directly
    /// below it.
    pub fn at_file_level(&self) -> bool {
        let scope = self.scope(self.current);
        match scope.kind {
            ScopeKind::Root => true,
            ScopeKind::Pragma => scope.parent == Some(ScopeId::ROOT),
            _ => false,
        }
    }

    /// Find the child scope `name` of `scope`, looking through pragma scopes.
    pub fn get_child_scope(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        let entry = self.scope(scope);
        if let Some(&child) = entry.child_names.get(name) {
            return Some(child);
        }
        entry
            .children
            .iter()
            .filter(|child| self.scope(**child).kind == ScopeKind::Pragma)
            .find_map(|child| self.get_child_scope(*child, name))
    }

    // ============================================================
    // Symbols
    // ============================================================

    fn describe_scope(&self, scope: ScopeId) -> String {
        let name = self.fully_qualified_name(scope);
        if name.is_empty() {
            "the file scope".to_string()
        } else {
            format!("scope `{}`", name)
        }
    }

    fn push_symbol(&mut self, scope: ScopeId, name: &str, kind: SymbolKind, span: Span) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.to_string(),
            kind,
            declared_in: scope,
            span,
        });
        self.scope_mut(scope).symbols.insert(name.to_string(), id);
        id
    }

    /// Add a definition to the current scope, completing a forward
    /// declaration of the same name.
    pub fn add_symbol(&mut self, name: &str, span: Span) -> Result<SymbolId, ScopeError> {
        self.add_symbol_in(self.current, name, span)
    }

    fn add_symbol_in(&mut self, scope: ScopeId, name: &str, span: Span) -> Result<SymbolId, ScopeError> {
        match self.scope(scope).symbols.get(name).copied() {
            Some(existing) if self.symbol(existing).kind == SymbolKind::FwdDecl => {
                let symbol = &mut self.symbols[existing.index()];
                symbol.kind = SymbolKind::Definition;
                symbol.span = span;
                Ok(existing)
            }
            Some(_) => Err(ScopeError::Redefinition {
                name: name.to_string(),
                scope: self.describe_scope(scope),
            }),
            None => Ok(self.push_symbol(scope, name, SymbolKind::Definition, span)),
        }
    }

    /// Add a forward declaration. Repeating it, or forward declaring an
    /// already defined name, is accepted.
    pub fn add_fwd_decl(&mut self, name: &str, span: Span) -> SymbolId {
        match self.scope(self.current).symbols.get(name) {
            Some(&existing) => existing,
            None => self.push_symbol(self.current, name, SymbolKind::FwdDecl, span),
        }
    }

    /// Add a typedef declarator; the name must be new in the current scope.
    pub fn add_typedef(&mut self, name: &str, span: Span) -> Result<SymbolId, ScopeError> {
        if self.scope(self.current).symbols.contains_key(name) {
            return Err(ScopeError::TypedefConflict {
                name: name.to_string(),
                scope: self.describe_scope(self.current),
            });
        }
        Ok(self.push_symbol(self.current, name, SymbolKind::Typedef, span))
    }

    /// Add a constant or an enumerator; the name must be new in the current
    /// scope.
    pub fn add_symbol_value(&mut self, name: &str, span: Span) -> Result<SymbolId, ScopeError> {
        if self.scope(self.current).symbols.contains_key(name) {
            return Err(ScopeError::Redefinition {
                name: name.to_string(),
                scope: self.describe_scope(self.current),
            });
        }
        Ok(self.push_symbol(self.current, name, SymbolKind::Value, span))
    }

    /// Look up `name` in `scope` only (and, transparently, in pragma scopes
    /// below it). Enclosing scopes are not searched.
    pub fn get_symbol(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let entry = self.scope(scope);
        if let Some(&id) = entry.symbols.get(name) {
            return Some(id);
        }
        entry
            .children
            .iter()
            .filter(|child| self.scope(**child).kind == ScopeKind::Pragma)
            .find_map(|child| self.get_symbol(*child, name))
    }

    /// The scope opened by the declaration of `symbol`, if it has one.
    pub fn scope_of(&self, symbol: SymbolId) -> Option<ScopeId> {
        let symbol = self.symbol(symbol);
        self.scope(symbol.declared_in)
            .child_names
            .get(&symbol.name)
            .copied()
    }

    /// Symbols declared directly in `scope`, in declaration order.
    pub fn symbols_in(&self, scope: ScopeId) -> Vec<SymbolId> {
        let mut symbols: Vec<_> = self.scope(scope).symbols.values().copied().collect();
        symbols.sort();
        symbols
    }

    /// Record the repository id given by `#pragma ID` for `name` in `scope`.
    /// Repeating the same id is accepted.
    pub fn add_pragma_id(&mut self, scope: ScopeId, name: &str, id: &str) -> Result<(), ScopeError> {
        let ids = &mut self.scope_mut(scope).pragma_ids;
        match ids.get(name) {
            Some(existing) if existing == id => Ok(()),
            Some(existing) => Err(ScopeError::DuplicatePragmaId {
                name: name.to_string(),
                existing: existing.clone(),
                new: id.to_string(),
            }),
            None => {
                ids.insert(name.to_string(), id.to_string());
                Ok(())
            }
        }
    }

    /// Record the version given by `#pragma version` for `name` in `scope`.
    pub fn add_pragma_version(&mut self, scope: ScopeId, name: &str, version: &str) {
        self.scope_mut(scope)
            .pragma_versions
            .insert(name.to_string(), version.to_string());
    }

    /// Ensure no forward declaration is left uncompleted anywhere in the
    /// tree.
    pub fn check_all_forward_completed(&self) -> Result<(), (ScopeError, Span)> {
        match self
            .symbols
            .iter()
            .find(|symbol| symbol.kind == SymbolKind::FwdDecl)
        {
            Some(symbol) => {
                let name = self.full_name_in(symbol.declared_in, &symbol.name);
                Err((ScopeError::ForwardNotCompleted { name }, symbol.span))
            }
            None => Ok(()),
        }
    }

    // ============================================================
    // Names
    // ============================================================

    /// The `.` separated path of `scope` with identifiers mapped; the root
    /// contributes nothing.
    pub fn fully_qualified_name(&self, scope: ScopeId) -> String {
        let mut parts = Vec::new();
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let entry = self.scope(id);
            if entry.kind != ScopeKind::Root {
                parts.push(map_identifier(&entry.name));
            }
            cursor = entry.parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// The target name of `name` declared in `scope`.
    pub fn full_name_in(&self, scope: ScopeId, name: &str) -> String {
        let prefix = self.fully_qualified_name(scope);
        if prefix.is_empty() {
            map_identifier(name).to_string()
        } else {
            format!("{}.{}", prefix, map_identifier(name))
        }
    }

    /// The target name of a symbol, as declared (ignoring nested placement).
    pub fn full_name(&self, symbol: SymbolId) -> String {
        let symbol = self.symbol(symbol);
        self.full_name_in(symbol.declared_in, &symbol.name)
    }

    /// The repository id of a symbol: the `#pragma ID` if one was given,
    /// otherwise `IDL:<path>/<name>:<version>`.
    pub fn repository_id(&self, symbol: SymbolId) -> String {
        let symbol = self.symbol(symbol);
        let scope = self.scope(symbol.declared_in);
        if let Some(id) = scope.pragma_ids.get(&symbol.name) {
            return id.clone();
        }
        let version = scope
            .pragma_versions
            .get(&symbol.name)
            .map(String::as_str)
            .unwrap_or("1.0");
        let path = self.repository_path(symbol.declared_in);
        let name = map_identifier(&symbol.name);
        if path.is_empty() {
            format!("IDL:{}:{}", name, version)
        } else {
            format!("IDL:{}/{}:{}", path, name, version)
        }
    }

    fn repository_path(&self, scope: ScopeId) -> String {
        let mut parts = Vec::new();
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let entry = self.scope(id);
            match entry.kind {
                ScopeKind::Root => break,
                // A prefix is used verbatim and ends the path.
                ScopeKind::Pragma => {
                    parts.push(entry.name.as_str());
                    break;
                }
                _ => parts.push(map_identifier(&entry.name)),
            }
            cursor = entry.parent;
        }
        parts.reverse();
        parts.join("/")
    }

    // ============================================================
    // Placement of nested declarations
    // ============================================================

    /// How the type for `symbol` is placed in the output.
    pub fn placement(&self, symbol: SymbolId) -> Placement {
        let declared_in = self.symbol(symbol).declared_in;
        match self.scope(declared_in).kind {
            ScopeKind::Type { class_like: true } => Placement::NestedType {
                container: declared_in,
            },
            ScopeKind::Type { class_like: false } => Placement::Package {
                container: declared_in,
            },
            _ => Placement::TopLevel { scope: declared_in },
        }
    }

    /// The target name of `symbol` taking nested placement into account.
    pub fn placed_full_name(&self, symbol: SymbolId) -> String {
        let name = &self.symbol(symbol).name;
        match self.placement(symbol) {
            Placement::NestedType { container } => self.full_name_in(container, name),
            Placement::TopLevel { scope } => self.full_name_in(scope, name),
            Placement::Package { container } => {
                let parent = self.scope(container).parent.unwrap_or(ScopeId::ROOT);
                let package = package_scope_name(&self.scope(container).name);
                let package_name = self.full_name_in(parent, &package);
                format!("{}.{}", package_name, map_identifier(name))
            }
        }
    }

    /// Get or create the `<container>_package` scope next to a container
    /// which can not hold nested types, and register `name` there so the
    /// type can be found through the package scope.
    pub fn nested_scope_for(&mut self, container: ScopeId, name: &str, span: Span) -> ScopeId {
        let parent = self.scope(container).parent.unwrap_or(ScopeId::ROOT);
        let package = package_scope_name(&self.scope(container).name);
        let scope = self.child_or_create(parent, &package, ScopeKind::Module);
        if !self.scope(scope).symbols.contains_key(name) {
            self.push_symbol(scope, name, SymbolKind::Definition, span);
        }
        scope
    }

    /// Resolve a scoped name used in `from`.
    ///
    /// The name is tried in `from` and then in each enclosing scope in turn;
    /// inherited scopes are not searched. A leading `::` starts at the root.
    pub fn resolve(&self, from: ScopeId, name: &ScopedName) -> Result<SymbolId, ScopeError> {
        let Some((last, qualifiers)) = name.parts.split_last() else {
            return Err(ScopeError::UnresolvedName {
                name: name.to_string(),
            });
        };
        let mut search = Some(if name.absolute { ScopeId::ROOT } else { from });
        let mut missing_scope = None;
        while let Some(start) = search {
            let mut scope = Some(start);
            for part in qualifiers {
                scope = scope.and_then(|s| self.get_child_scope(s, &part.node));
                if scope.is_none() {
                    missing_scope.get_or_insert_with(|| part.node.clone());
                    break;
                }
            }
            if let Some(found) = scope.and_then(|s| self.get_symbol(s, &last.node)) {
                return Ok(found);
            }
            search = if name.absolute {
                None
            } else {
                self.scope(start).parent
            };
        }
        match missing_scope {
            Some(scope) if !qualifiers.is_empty() && self.resolves_scope(from, name) == 0 => {
                Err(ScopeError::ScopeNotFound { name: scope })
            }
            _ => Err(ScopeError::UnresolvedName {
                name: name.to_string(),
            }),
        }
    }

    /// Number of search scopes in which the qualifier path of `name` exists.
    fn resolves_scope(&self, from: ScopeId, name: &ScopedName) -> usize {
        let qualifiers = &name.parts[..name.parts.len().saturating_sub(1)];
        let mut count = 0;
        let mut search = Some(if name.absolute { ScopeId::ROOT } else { from });
        while let Some(start) = search {
            let found = qualifiers
                .iter()
                .try_fold(start, |scope, part| self.get_child_scope(scope, &part.node));
            if found.is_some() {
                count += 1;
            }
            search = if name.absolute {
                None
            } else {
                self.scope(start).parent
            };
        }
        count
    }
}

/// Where the type for a symbol is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A top level type of the module for `scope`.
    TopLevel { scope: ScopeId },
    /// A nested type of the class-like type declared by `container`.
    NestedType { container: ScopeId },
    /// A top level type of the `<container>_package` scope.
    Package { container: ScopeId },
}

fn package_scope_name(container: &str) -> String {
    format!("{}_package", container)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Spanned;

    fn scoped(absolute: bool, parts: &[&str]) -> ScopedName {
        ScopedName {
            absolute,
            parts: parts
                .iter()
                .map(|p| Spanned::new(p.to_string(), Span::dummy()))
                .collect(),
            span: Span::dummy(),
        }
    }

    #[test]
    fn test_add_symbol_completes_forward() {
        let mut table = SymbolTable::new();
        let fwd = table.add_fwd_decl("A", Span::dummy());
        assert_eq!(table.add_fwd_decl("A", Span::dummy()), fwd);
        let full = table.add_symbol("A", Span::dummy()).unwrap();
        assert_eq!(fwd, full);
        assert_eq!(table.symbol(full).kind, SymbolKind::Definition);
        assert!(matches!(
            table.add_symbol("A", Span::dummy()),
            Err(ScopeError::Redefinition { .. })
        ));
    }

    #[test]
    fn test_typedef_and_value_conflicts() {
        let mut table = SymbolTable::new();
        table.add_fwd_decl("F", Span::dummy());
        assert!(matches!(
            table.add_typedef("F", Span::dummy()),
            Err(ScopeError::TypedefConflict { .. })
        ));
        table.add_typedef("T", Span::dummy()).unwrap();
        assert!(table.add_symbol_value("T", Span::dummy()).is_err());
        table.add_symbol_value("N", Span::dummy()).unwrap();
    }

    #[test]
    fn test_lookup_is_local() {
        let mut table = SymbolTable::new();
        table.add_symbol("Outer", Span::dummy()).unwrap();
        let module = table.open_scope("M", ScopeKind::Module);
        assert!(table.get_symbol(module, "Outer").is_none());
        assert!(table.get_symbol(ScopeId::ROOT, "Outer").is_some());
    }

    #[test]
    fn test_close_root_fails() {
        let mut table = SymbolTable::new();
        table.open_scope("M", ScopeKind::Module);
        table.close_scope().unwrap();
        assert_eq!(table.close_scope(), Err(ScopeError::CloseRoot));
    }

    #[test]
    fn test_reopened_module_shares_scope() {
        let mut table = SymbolTable::new();
        let first = table.open_scope("M", ScopeKind::Module);
        table.close_scope().unwrap();
        let second = table.open_scope("M", ScopeKind::Module);
        assert_eq!(first, second);
    }

    #[test]
    fn test_pragma_id() {
        let mut table = SymbolTable::new();
        let sym = table.add_symbol("X", Span::dummy()).unwrap();
        table.add_pragma_id(ScopeId::ROOT, "X", "IDL:custom/X:2.0").unwrap();
        table.add_pragma_id(ScopeId::ROOT, "X", "IDL:custom/X:2.0").unwrap();
        assert!(matches!(
            table.add_pragma_id(ScopeId::ROOT, "X", "IDL:other:1.0"),
            Err(ScopeError::DuplicatePragmaId { .. })
        ));
        assert_eq!(table.repository_id(sym), "IDL:custom/X:2.0");
    }

    #[test]
    fn test_repository_id_and_names() {
        let mut table = SymbolTable::new();
        table.open_pragma_scope("omg.org");
        table.open_scope("_CORBA", ScopeKind::Module);
        let sym = table.add_symbol("_Any", Span::dummy()).unwrap();
        assert_eq!(table.repository_id(sym), "IDL:omg.org/CORBA/Any:1.0");
        assert_eq!(table.full_name(sym), "omg.org.CORBA.Any");

        let mut table = SymbolTable::new();
        let top = table.add_symbol("Top", Span::dummy()).unwrap();
        assert_eq!(table.repository_id(top), "IDL:Top:1.0");
        table.add_pragma_version(ScopeId::ROOT, "Top", "2.1");
        assert_eq!(table.repository_id(top), "IDL:Top:2.1");
    }

    #[test]
    fn test_pragma_scope_is_transparent() {
        let mut table = SymbolTable::new();
        table.open_pragma_scope("acme.com");
        let module = table.open_scope("M", ScopeKind::Module);
        let sym = table.add_symbol("S", Span::dummy()).unwrap();
        table.close_pragma_scope();
        assert_eq!(table.current_scope(), ScopeId::ROOT);
        assert_eq!(table.get_child_scope(ScopeId::ROOT, "M"), Some(module));
        assert_eq!(table.resolve(ScopeId::ROOT, &scoped(true, &["M", "S"])), Ok(sym));
    }

    #[test]
    fn test_empty_prefix_opens_nothing() {
        let mut table = SymbolTable::new();
        table.open_pragma_scope("");
        assert_eq!(table.current_scope(), ScopeId::ROOT);
        table.close_pragma_scope();
        assert_eq!(table.current_scope(), ScopeId::ROOT);
    }

    #[test]
    fn test_resolve_walks_enclosing_scopes() {
        let mut table = SymbolTable::new();
        let outer = table.add_symbol("T", Span::dummy()).unwrap();
        table.open_scope("A", ScopeKind::Module);
        let a_t = table.add_symbol("U", Span::dummy()).unwrap();
        let b = table.open_scope("B", ScopeKind::Module);
        assert_eq!(table.resolve(b, &scoped(false, &["T"])), Ok(outer));
        assert_eq!(table.resolve(b, &scoped(false, &["A", "U"])), Ok(a_t));
        assert!(matches!(
            table.resolve(b, &scoped(false, &["Missing"])),
            Err(ScopeError::UnresolvedName { .. })
        ));
        assert_eq!(
            table.resolve(b, &scoped(false, &["Nope", "T"])),
            Err(ScopeError::ScopeNotFound {
                name: "Nope".to_string()
            })
        );
    }

    #[test]
    fn test_absolute_name_does_not_walk() {
        let mut table = SymbolTable::new();
        let m = table.open_scope("M", ScopeKind::Module);
        table.add_symbol("X", Span::dummy()).unwrap();
        assert!(table.resolve(m, &scoped(true, &["X"])).is_err());
        assert!(table.resolve(m, &scoped(true, &["M", "X"])).is_ok());
    }

    #[test]
    fn test_placement_and_package_scope() {
        let mut table = SymbolTable::new();
        table.open_scope("M", ScopeKind::Module);
        table.add_symbol("I", Span::dummy()).unwrap();
        let iface = table.open_scope("I", ScopeKind::Type { class_like: false });
        let nested = table.add_symbol("S", Span::dummy()).unwrap();
        assert_eq!(table.placement(nested), Placement::Package { container: iface });
        assert_eq!(table.placed_full_name(nested), "M.I_package.S");

        let package = table.nested_scope_for(iface, "S", Span::dummy());
        assert_eq!(table.fully_qualified_name(package), "M.I_package");
        assert!(table.get_symbol(package, "S").is_some());
        assert_eq!(table.nested_scope_for(iface, "S", Span::dummy()), package);

        table.close_scope().unwrap();
        table.add_symbol("V", Span::dummy()).unwrap();
        let value = table.open_scope("V", ScopeKind::Type { class_like: true });
        let inner = table.add_symbol("E", Span::dummy()).unwrap();
        assert_eq!(table.placement(inner), Placement::NestedType { container: value });
        assert_eq!(table.placed_full_name(inner), "M.V.E");
    }

    #[test]
    fn test_forward_completion_check() {
        let mut table = SymbolTable::new();
        table.open_scope("M", ScopeKind::Module);
        table.add_fwd_decl("Lonely", Span::dummy());
        let err = table.check_all_forward_completed().unwrap_err();
        assert_eq!(
            err.0,
            ScopeError::ForwardNotCompleted {
                name: "M.Lonely".to_string()
            }
        );
        table.add_symbol("Lonely", Span::dummy()).unwrap();
        assert!(table.check_all_forward_completed().is_ok());
    }

    #[test]
    fn test_at_file_level() {
        let mut table = SymbolTable::new();
        assert!(table.at_file_level());
        table.open_pragma_scope("p");
        assert!(table.at_file_level());
        table.open_scope("M", ScopeKind::Module);
        assert!(!table.at_file_level());
    }
}
