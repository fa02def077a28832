//! Builds the [`SymbolTable`] for a parsed translation unit.

use tracing::{debug, warn};

use super::{ScopeError, ScopeId, ScopeKind, SymbolTable};
use crate::ast::*;
use crate::error::{GenError, GenErrorKind, GenResult};
use crate::span::Span;

/// Walk `spec` and record every scope and symbol it declares.
///
/// Fails on redefinitions, conflicting pragmas and on forward declarations
/// that are never completed.
pub fn collect(spec: &Specification) -> GenResult<SymbolTable> {
    let mut collector = Collector {
        table: SymbolTable::new(),
    };
    collector.definitions(&spec.definitions)?;
    if let Err((err, span)) = collector.table.check_all_forward_completed() {
        return scope_error(err, span);
    }
    debug!(scopes = collector.table.scope_count(), "symbol table built");
    Ok(collector.table)
}

fn scope_error<T>(err: ScopeError, span: Span) -> GenResult<T> {
    GenError::new(GenErrorKind::Scope(err), span).into_err()
}

struct Collector {
    table: SymbolTable,
}

impl Collector {
    fn definitions(&mut self, definitions: &[Definition]) -> GenResult<()> {
        for definition in definitions {
            self.definition(definition)?;
        }
        Ok(())
    }

    fn definition(&mut self, definition: &Definition) -> GenResult<()> {
        match definition {
            Definition::Module(module) => {
                self.table.open_scope(&module.name, ScopeKind::Module);
                self.definitions(&module.definitions)?;
                self.close(module.span)
            }
            Definition::Interface(interface) => {
                self.add(&interface.name)?;
                self.table
                    .open_scope(&interface.name, ScopeKind::Type { class_like: false });
                for export in &interface.body {
                    self.export(export)?;
                }
                self.close(interface.span)
            }
            Definition::InterfaceForward(fwd) | Definition::ValueForward(fwd) => {
                self.table.add_fwd_decl(&fwd.name, fwd.name.span);
                Ok(())
            }
            Definition::Value(value) => {
                self.add(&value.name)?;
                let class_like = value.kind != ValueKind::Abstract;
                self.table
                    .open_scope(&value.name, ScopeKind::Type { class_like });
                for element in &value.body {
                    match element {
                        ValueElement::Export(export) => self.export(export)?,
                        ValueElement::State(state) => self.type_spec(&state.ty)?,
                        ValueElement::Init(_) => {}
                    }
                }
                self.close(value.span)
            }
            Definition::ValueBox(boxed) => {
                self.type_spec(&boxed.boxed)?;
                self.add(&boxed.name)
            }
            Definition::Type(decl) => self.type_decl(decl),
            Definition::Except(except) => self.exception(except),
            Definition::Const(constant) => self.constant(constant),
            Definition::Pragma(pragma) => self.pragma(pragma),
        }
    }

    fn export(&mut self, export: &Export) -> GenResult<()> {
        match export {
            Export::Type(decl) => self.type_decl(decl),
            Export::Const(constant) => self.constant(constant),
            Export::Except(except) => self.exception(except),
            Export::Pragma(pragma) => self.pragma(pragma),
            Export::Attr(_) | Export::Op(_) => Ok(()),
        }
    }

    fn type_decl(&mut self, decl: &TypeDecl) -> GenResult<()> {
        match decl {
            TypeDecl::Typedef(typedef) => {
                self.type_spec(&typedef.ty)?;
                for declarator in &typedef.declarators {
                    let name = declarator.name();
                    if let Err(err) = self.table.add_typedef(name, name.span) {
                        return scope_error(err, name.span);
                    }
                }
                Ok(())
            }
            TypeDecl::Struct(def) => self.structure(def),
            TypeDecl::Union(def) => self.union(def),
            TypeDecl::Enum(def) => self.enumeration(def),
            TypeDecl::Native(name) => self.add(name),
        }
    }

    /// Anonymous constructed types inside a type specifier declare their
    /// names in the enclosing scope.
    fn type_spec(&mut self, spec: &TypeSpec) -> GenResult<()> {
        match &spec.kind {
            TypeSpecKind::Struct(def) => self.structure(def),
            TypeSpecKind::Union(def) => self.union(def),
            TypeSpecKind::Enum(def) => self.enumeration(def),
            TypeSpecKind::Sequence { element, .. } => self.type_spec(element),
            _ => Ok(()),
        }
    }

    fn structure(&mut self, def: &StructDef) -> GenResult<()> {
        self.add(&def.name)?;
        self.table
            .open_scope(&def.name, ScopeKind::Type { class_like: false });
        for member in &def.members {
            self.type_spec(&member.ty)?;
        }
        self.close(def.span)
    }

    fn union(&mut self, def: &UnionDef) -> GenResult<()> {
        self.add(&def.name)?;
        self.table
            .open_scope(&def.name, ScopeKind::Type { class_like: false });
        self.type_spec(&def.discriminator)?;
        for case in &def.cases {
            self.type_spec(&case.ty)?;
        }
        self.close(def.span)
    }

    fn enumeration(&mut self, def: &EnumDef) -> GenResult<()> {
        self.add(&def.name)?;
        for enumerator in &def.enumerators {
            if let Err(err) = self.table.add_symbol_value(enumerator, enumerator.span) {
                return scope_error(err, enumerator.span);
            }
        }
        Ok(())
    }

    fn exception(&mut self, except: &ExceptDef) -> GenResult<()> {
        self.add(&except.name)?;
        self.table
            .open_scope(&except.name, ScopeKind::Type { class_like: true });
        for member in &except.members {
            self.type_spec(&member.ty)?;
        }
        self.close(except.span)
    }

    fn constant(&mut self, constant: &ConstDef) -> GenResult<()> {
        match self.table.add_symbol_value(&constant.name, constant.name.span) {
            Ok(_) => Ok(()),
            Err(err) => scope_error(err, constant.name.span),
        }
    }

    fn pragma(&mut self, pragma: &Pragma) -> GenResult<()> {
        match &pragma.kind {
            PragmaKind::Prefix(prefix) => {
                if self.table.at_file_level() {
                    self.table.close_pragma_scope();
                    self.table.open_pragma_scope(prefix);
                } else {
                    warn!(prefix = %prefix, "ignoring `#pragma prefix` inside a declaration");
                }
                Ok(())
            }
            PragmaKind::Id { name, id } => {
                let (scope, local) = self.pragma_target(name)?;
                match self.table.add_pragma_id(scope, local, id) {
                    Ok(()) => Ok(()),
                    Err(err) => scope_error(err, pragma.span),
                }
            }
            PragmaKind::Version { name, version } => {
                let (scope, local) = self.pragma_target(name)?;
                self.table.add_pragma_version(scope, local, version);
                Ok(())
            }
        }
    }

    /// The scope holding the last component of a pragma's scoped name,
    /// and that component.
    fn pragma_target<'n>(&self, name: &'n ScopedName) -> GenResult<(ScopeId, &'n str)> {
        let Some((local, qualifiers)) = name.parts.split_last() else {
            let err = ScopeError::UnresolvedName {
                name: name.to_string(),
            };
            return scope_error(err, name.span);
        };
        let mut scope = if name.absolute {
            ScopeId::ROOT
        } else {
            self.table.current_scope()
        };
        for part in qualifiers {
            match self.table.get_child_scope(scope, part) {
                Some(child) => scope = child,
                None => {
                    let err = ScopeError::ScopeNotFound {
                        name: part.node.clone(),
                    };
                    return scope_error(err, part.span);
                }
            }
        }
        Ok((scope, local.node.as_str()))
    }

    fn add(&mut self, name: &Ident) -> GenResult<()> {
        match self.table.add_symbol(name, name.span) {
            Ok(_) => Ok(()),
            Err(err) => scope_error(err, name.span),
        }
    }

    fn close(&mut self, span: Span) -> GenResult<()> {
        match self.table.close_scope() {
            Ok(()) => Ok(()),
            Err(err) => GenError::new(GenErrorKind::Internal(err.to_string()), span).into_err(),
        }
    }
}
