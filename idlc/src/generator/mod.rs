//! Generation of target types from the IDL tree.
//!
//! The [`Generator`] walks one [`Specification`] at a time, consulting the
//! [`SymbolTable`] built for it by [`crate::symtab::collect`], and emits the
//! declared types into the output assembly of its [`TypeUniverse`]. Every
//! visit receives a [`BuildInfo`]: the lexical scope being walked and the
//! type under construction, if any.
//!
//! Types survive across files of one invocation; the per-file
//! [`TypeRegistry`] does not. A declaration whose type already exists (from
//! an earlier file, or in a referenced library) is registered but not
//! generated again.
//!
//! # Submodules
//!
//! - `decls` - interfaces, value types, structs, enums, exceptions, typedefs
//! - `members` - operations, attributes, fields and inherited member stubs
//! - `types` - type specifiers, unboxing and custom mappings

mod decls;
mod members;
mod types;

#[cfg(test)]
mod tests;

use tracing::{debug, trace, warn};

use crate::ast::{Definition, Ident, Pragma, PragmaKind, ScopedName, Specification};
use crate::error::{GenError, GenErrorKind, GenResult};
use crate::mapping::MappingTable;
use crate::modules::ModuleManager;
use crate::registry::{TypeContainer, TypeRegistry};
use crate::span::Span;
use crate::symtab::{map_identifier, Placement, ScopeId, SymbolId, SymbolTable};
use crate::typesys::{TypeDef, TypeId, TypeKind, TypeSysError, TypeUniverse};

/// Context of one step of the tree walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BuildInfo {
    /// The scope declarations are looked up in.
    scope: ScopeId,
    /// The type whose body is being walked.
    container: Option<TypeId>,
}

impl BuildInfo {
    fn root() -> Self {
        Self {
            scope: ScopeId::ROOT,
            container: None,
        }
    }

    /// The context for the body of `container`, declared by `scope`.
    fn body(scope: ScopeId, container: TypeId) -> Self {
        Self {
            scope,
            container: Some(container),
        }
    }
}

/// Emits the types of successive IDL files into one output assembly.
pub struct Generator {
    /// The output assembly and everything it refers to.
    universe: TypeUniverse,
    /// Scope to module assignment, kept across files.
    modules: ModuleManager,
    /// Custom mappings of IDL types to library types.
    mappings: MappingTable,
    /// The symbol table of the file being generated.
    table: SymbolTable,
    /// Type states of the file being generated.
    registry: TypeRegistry,
    /// Full names of the concrete value types generated so far.
    value_types: Vec<String>,
}

impl Generator {
    pub fn new(universe: TypeUniverse, mappings: MappingTable) -> Self {
        let modules = ModuleManager::new(&universe.output().name);
        Self {
            universe,
            modules,
            mappings,
            table: SymbolTable::new(),
            registry: TypeRegistry::new(),
            value_types: Vec::new(),
        }
    }

    /// Generate the types of one file. All of them are complete afterwards.
    pub fn generate(&mut self, spec: &Specification, table: SymbolTable) -> GenResult<()> {
        self.table = table;
        self.registry.clear();

        let mut info = BuildInfo::root();
        for definition in &spec.definitions {
            // A prefix pragma moves the following file level declarations
            // into its pragma scope.
            if let Definition::Pragma(Pragma {
                kind: PragmaKind::Prefix(prefix),
                span,
            }) = definition
            {
                info.scope = self.prefix_scope(prefix, *span)?;
                continue;
            }
            self.gen_definition(definition, info)?;
        }

        self.registry.assert_all_types_defined(&self.table)?;
        debug!(
            types = self.universe.output().types.len(),
            "file generated"
        );
        Ok(())
    }

    pub fn universe(&self) -> &TypeUniverse {
        &self.universe
    }

    /// Full names of the concrete value types generated, which need a
    /// hand-written implementation class.
    pub fn value_types(&self) -> &[String] {
        &self.value_types
    }

    pub fn into_parts(self) -> (TypeUniverse, Vec<String>) {
        (self.universe, self.value_types)
    }

    fn prefix_scope(&self, prefix: &str, span: Span) -> GenResult<ScopeId> {
        if prefix.is_empty() {
            return Ok(ScopeId::ROOT);
        }
        self.table
            .get_child_scope(ScopeId::ROOT, prefix)
            .ok_or_else(|| {
                Box::new(GenError::internal(
                    format!("pragma scope `{}` missing from the symbol table", prefix),
                    span,
                ))
            })
    }

    // ============================================================
    // Definitions
    // ============================================================

    fn gen_definition(&mut self, definition: &Definition, info: BuildInfo) -> GenResult<()> {
        match definition {
            Definition::Module(module) => {
                let scope = self.child_scope(info.scope, &module.name)?;
                trace!(module = %module.name.node, "entering module");
                let inner = BuildInfo { scope, ..info };
                for definition in &module.definitions {
                    self.gen_definition(definition, inner)?;
                }
                Ok(())
            }
            Definition::Interface(def) => self.gen_interface(def, info),
            Definition::InterfaceForward(fwd) => self.gen_interface_forward(fwd, info),
            Definition::Value(def) => self.gen_value(def, info),
            Definition::ValueBox(def) => self.gen_value_box(def, info),
            Definition::ValueForward(fwd) => self.gen_value_forward(fwd, info),
            Definition::Type(decl) => self.gen_type_decl(decl, info),
            Definition::Except(def) => self.gen_exception(def, info),
            Definition::Const(def) => {
                warn!(name = %def.name.node, "constants are not yet supported, skipping");
                Ok(())
            }
            // Only prefix pragmas at file level affect generation.
            Definition::Pragma(_) => Ok(()),
        }
    }

    // ============================================================
    // Symbols and scopes
    // ============================================================

    /// The symbol declared as `name` in `scope`.
    fn symbol_in(&self, scope: ScopeId, name: &Ident) -> GenResult<SymbolId> {
        self.table.get_symbol(scope, &name.node).ok_or_else(|| {
            Box::new(GenError::internal(
                format!("no symbol for declaration `{}`", name.node),
                name.span,
            ))
        })
    }

    /// The scope opened by the declaration `name` in `scope`.
    fn child_scope(&self, scope: ScopeId, name: &Ident) -> GenResult<ScopeId> {
        self.table.get_child_scope(scope, &name.node).ok_or_else(|| {
            Box::new(GenError::internal(
                format!("no scope for declaration `{}`", name.node),
                name.span,
            ))
        })
    }

    fn resolve(&self, scope: ScopeId, name: &ScopedName) -> GenResult<SymbolId> {
        self.table
            .resolve(scope, name)
            .map_err(|err| Box::new(GenError::new(GenErrorKind::Scope(err), name.span)))
    }

    // ============================================================
    // Type emission
    // ============================================================

    /// Define the type for `symbol` where its placement says: a top level
    /// type of the scope's module, a nested type of the container, or a top
    /// level type of the container's `_package` scope.
    fn define_placed(&mut self, symbol: SymbolId, info: BuildInfo, kind: TypeKind) -> GenResult<TypeId> {
        let span = self.table.symbol(symbol).span;
        let full_name = self.table.placed_full_name(symbol);
        match self.table.placement(symbol) {
            Placement::TopLevel { scope } => {
                let module = self.modules.get_or_create(&mut self.universe, &self.table, scope);
                self.universe
                    .define_type(module, &full_name, kind)
                    .map_err(|err| sys_error(err, span))
            }
            Placement::NestedType { .. } => {
                let container = info.container.ok_or_else(|| {
                    Box::new(GenError::internal(
                        format!("nested type `{}` outside of its container", full_name),
                        span,
                    ))
                })?;
                self.universe
                    .define_nested_type(container, &full_name, kind)
                    .map_err(|err| sys_error(err, span))
            }
            Placement::Package { container } => {
                let name = self.table.symbol(symbol).name.clone();
                let package = self.table.nested_scope_for(container, &name, span);
                let module = self.modules.get_or_create(&mut self.universe, &self.table, package);
                let id = self
                    .universe
                    .define_type(module, &full_name, kind)
                    .map_err(|err| sys_error(err, span))?;
                // Lookups through the package scope see the same type.
                if let Some(alias) = self.table.get_symbol(package, &name) {
                    if alias != symbol && !self.registry.is_declared(alias) {
                        self.registry
                            .register_full_definition(TypeContainer::named(id), alias, &self.table)?;
                    }
                }
                Ok(id)
            }
        }
    }

    /// A type of the output assembly that is still being built.
    fn type_mut(&mut self, id: TypeId, span: Span) -> GenResult<&mut TypeDef> {
        self.universe.type_mut(id).map_err(|err| sys_error(err, span))
    }

    fn create_type(&mut self, id: TypeId, span: Span) -> GenResult<()> {
        self.universe.create_type(id).map_err(|err| sys_error(err, span))
    }

    /// Finish a type registered as forward declaration.
    fn complete(&mut self, symbol: SymbolId, id: TypeId) -> GenResult<()> {
        self.create_type(id, self.table.symbol(symbol).span)?;
        self.registry.complete_forward_decl(symbol, &self.table)?;
        trace!(name = %self.universe.type_name(id), "type created");
        Ok(())
    }

    /// Target name of an IDL identifier.
    fn target_name(name: &Ident) -> String {
        map_identifier(&name.node).to_string()
    }
}

/// A type system error during generation: a clash of type names is a user
/// error, anything else a broken invariant.
fn sys_error(err: TypeSysError, span: Span) -> Box<GenError> {
    Box::new(match err {
        TypeSysError::DuplicateType { name } => {
            GenError::new(GenErrorKind::AlreadyDefined { name }, span)
        }
        other => GenError::internal(other.to_string(), span),
    })
}
