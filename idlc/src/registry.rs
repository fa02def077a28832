//! Per-file registry of the types generated for symbols.
//!
//! Every type symbol moves through `unknown -> forward declared -> fully
//! declared`. A symbol whose type was committed by an earlier file, or which
//! lives in a referenced library, is registered directly as fully declared.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{GenError, GenErrorKind, GenResult};
use crate::symtab::{SymbolId, SymbolKind, SymbolTable};
use crate::typesys::{Attribute, BuildCatalog, LibraryCatalog, TypeCatalog, TypeId, TypeRef, TypeUniverse};

/// A resolved type together with the attributes describing its IDL origin.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeContainer {
    pub ty: TypeRef,
    pub attributes: Vec<Attribute>,
}

impl TypeContainer {
    pub fn new(ty: TypeRef, attributes: Vec<Attribute>) -> Self {
        Self { ty, attributes }
    }

    pub fn named(id: TypeId) -> Self {
        Self::new(TypeRef::Named(id), Vec::new())
    }

    pub fn void() -> Self {
        Self::new(TypeRef::Void, Vec::new())
    }

    /// The named type, if this is not a primitive, array or by-ref type.
    pub fn type_id(&self) -> Option<TypeId> {
        match self.ty {
            TypeRef::Named(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    in_creation: HashMap<SymbolId, TypeId>,
    defined: HashMap<SymbolId, TypeContainer>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all symbols; symbol ids are only valid for one file.
    pub fn clear(&mut self) {
        self.in_creation.clear();
        self.defined.clear();
    }

    pub fn is_forward_declared(&self, symbol: SymbolId) -> bool {
        self.in_creation.contains_key(&symbol)
    }

    pub fn is_fully_declared(&self, symbol: SymbolId) -> bool {
        self.defined.contains_key(&symbol)
    }

    pub fn is_declared(&self, symbol: SymbolId) -> bool {
        self.is_forward_declared(symbol) || self.is_fully_declared(symbol)
    }

    /// The type being built for a forward declared symbol.
    pub fn in_creation(&self, symbol: SymbolId) -> Option<TypeId> {
        self.in_creation.get(&symbol).copied()
    }

    fn already_defined(symbol: SymbolId, table: &SymbolTable) -> Box<GenError> {
        Box::new(GenError::new(
            GenErrorKind::AlreadyDefined {
                name: table.full_name(symbol),
            },
            table.symbol(symbol).span,
        ))
    }

    pub fn register_forward_decl(
        &mut self,
        id: TypeId,
        symbol: SymbolId,
        table: &SymbolTable,
    ) -> GenResult<()> {
        if self.is_declared(symbol) {
            return Err(Self::already_defined(symbol, table));
        }
        trace!(name = %table.full_name(symbol), "forward declared");
        self.in_creation.insert(symbol, id);
        Ok(())
    }

    pub fn complete_forward_decl(&mut self, symbol: SymbolId, table: &SymbolTable) -> GenResult<()> {
        match self.in_creation.remove(&symbol) {
            Some(id) => {
                self.defined.insert(symbol, TypeContainer::named(id));
                Ok(())
            }
            None => GenError::internal(
                format!("`{}` completed without a forward declaration", table.full_name(symbol)),
                table.symbol(symbol).span,
            )
            .into_err(),
        }
    }

    pub fn register_full_definition(
        &mut self,
        container: TypeContainer,
        symbol: SymbolId,
        table: &SymbolTable,
    ) -> GenResult<()> {
        if self.is_declared(symbol) {
            return Err(Self::already_defined(symbol, table));
        }
        self.defined.insert(symbol, container);
        Ok(())
    }

    /// A typedef resolves to the aliased type and its attributes.
    pub fn register_typedef(
        &mut self,
        container: TypeContainer,
        symbol: SymbolId,
        table: &SymbolTable,
    ) -> GenResult<()> {
        self.register_full_definition(container, symbol, table)
    }

    /// Resolve the type of `symbol`: this file's definitions, then types in
    /// creation, then complete types from earlier files, then referenced
    /// libraries (matching repository ids).
    pub fn get_known_type(
        &self,
        symbol: SymbolId,
        table: &SymbolTable,
        universe: &TypeUniverse,
    ) -> Option<TypeContainer> {
        if let Some(container) = self.defined.get(&symbol) {
            return Some(container.clone());
        }
        if let Some(&id) = self.in_creation.get(&symbol) {
            return Some(TypeContainer::named(id));
        }
        if !matches!(
            table.symbol(symbol).kind,
            SymbolKind::Definition | SymbolKind::FwdDecl
        ) {
            return None;
        }
        lookup_existing(symbol, table, universe).map(TypeContainer::named)
    }

    /// Fail if a type is still in creation after a whole file was walked.
    pub fn assert_all_types_defined(&self, table: &SymbolTable) -> GenResult<()> {
        let mut pending: Vec<_> = self.in_creation.keys().copied().collect();
        pending.sort();
        match pending.first() {
            None => Ok(()),
            Some(&first) => {
                let names: Vec<String> = pending.iter().map(|s| table.full_name(*s)).collect();
                GenError::internal(
                    format!("types left in creation: {}", names.join(", ")),
                    table.symbol(first).span,
                )
                .into_err()
            }
        }
    }

    /// Whether the type for `symbol` already exists, committed by an earlier
    /// file or provided by a referenced library. If so it is registered as
    /// fully declared; with `nested` set, the types declared inside it are
    /// registered as well.
    pub fn check_skip(
        &mut self,
        symbol: SymbolId,
        nested: bool,
        table: &SymbolTable,
        universe: &TypeUniverse,
    ) -> GenResult<bool> {
        let Some(id) = lookup_existing(symbol, table, universe) else {
            return Ok(false);
        };
        debug!(name = %table.placed_full_name(symbol), "type exists, skipping");
        if !self.is_declared(symbol) {
            self.defined.insert(symbol, TypeContainer::named(id));
        }
        if nested {
            self.register_nested(symbol, table, universe)?;
        }
        Ok(true)
    }

    fn register_nested(
        &mut self,
        container: SymbolId,
        table: &SymbolTable,
        universe: &TypeUniverse,
    ) -> GenResult<()> {
        let Some(scope) = table.scope_of(container) else {
            return Ok(());
        };
        for symbol in table.symbols_in(scope) {
            if table.symbol(symbol).kind != SymbolKind::Definition || self.is_declared(symbol) {
                continue;
            }
            let Some(id) = lookup_existing(symbol, table, universe) else {
                return GenError::internal(
                    format!(
                        "nested type `{}` of skipped type `{}` not found",
                        table.placed_full_name(symbol),
                        table.placed_full_name(container)
                    ),
                    table.symbol(symbol).span,
                )
                .into_err();
            };
            self.defined.insert(symbol, TypeContainer::named(id));
            self.register_nested(symbol, table, universe)?;
        }
        Ok(())
    }
}

/// Find a complete type for `symbol` outside the current file.
fn lookup_existing(symbol: SymbolId, table: &SymbolTable, universe: &TypeUniverse) -> Option<TypeId> {
    let name = table.placed_full_name(symbol);
    BuildCatalog::new(universe).lookup(&name, None).or_else(|| {
        let repository_id = table.repository_id(symbol);
        LibraryCatalog::new(universe).lookup(&name, Some(&repository_id))
    })
}
