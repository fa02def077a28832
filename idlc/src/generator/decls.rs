//! Declarations: interfaces, value types, structs, enums, exceptions and
//! typedefs.

use tracing::{debug, trace};

use super::{BuildInfo, Generator};
use crate::ast::*;
use crate::error::{GenError, GenErrorKind, GenResult};
use crate::registry::TypeContainer;
use crate::span::Span;
use crate::symtab::{ScopeId, SymbolId};
use crate::typesys::{
    Attribute, BoxedType, FieldDef, InterfaceType, Primitive, RuntimeType, TypeId, TypeKind,
    TypeRef, Visibility,
};

const CONCRETE_VALUE: &str = "a value type";

fn interface_flavour(kind: InterfaceKind) -> InterfaceType {
    match kind {
        InterfaceKind::Concrete => InterfaceType::Concrete,
        InterfaceKind::Abstract => InterfaceType::Abstract,
        InterfaceKind::Local => InterfaceType::Local,
    }
}

fn describe_interface(kind: InterfaceType) -> &'static str {
    match kind {
        InterfaceType::Concrete => "an interface",
        InterfaceType::Abstract => "an abstract interface",
        InterfaceType::Local => "a local interface",
        InterfaceType::AbstractValue => "an abstract value type",
    }
}

impl Generator {
    // ============================================================
    // Interfaces
    // ============================================================

    pub(super) fn gen_interface(&mut self, def: &InterfaceDef, info: BuildInfo) -> GenResult<()> {
        let symbol = self.symbol_in(info.scope, &def.name)?;
        if self.registry.check_skip(symbol, true, &self.table, &self.universe)? {
            let scope = self.child_scope(info.scope, &def.name)?;
            return self.register_skipped_typedefs(def.body.iter(), scope);
        }

        let mut bases = Vec::with_capacity(def.inherits.len());
        for name in &def.inherits {
            let base = self.resolve_base(name, info)?;
            if !self.is_interface(base) {
                return self.invalid_inheritance(
                    symbol,
                    format!("`{}` is not an interface", name),
                    name.span,
                );
            }
            bases.push(base);
        }

        let id = self.interface_type(symbol, info, def.kind, &bases)?;
        let body = BuildInfo::body(self.child_scope(info.scope, &def.name)?, id);
        for export in &def.body {
            self.gen_export(export, body)?;
        }
        self.complete(symbol, id)?;
        debug!(name = %self.universe.type_name(id), "interface generated");
        Ok(())
    }

    pub(super) fn gen_interface_forward(&mut self, fwd: &ForwardDecl, info: BuildInfo) -> GenResult<()> {
        let symbol = self.symbol_in(info.scope, &fwd.name)?;
        if self.registry.check_skip(symbol, false, &self.table, &self.universe)? {
            return Ok(());
        }
        // A forward declaration after the definition is ignored.
        if !self.registry.is_declared(symbol) {
            let kind = if fwd.is_abstract {
                InterfaceKind::Abstract
            } else if fwd.is_local {
                InterfaceKind::Local
            } else {
                InterfaceKind::Concrete
            };
            self.interface_type(symbol, info, kind, &[])?;
        }
        Ok(())
    }

    /// The type being built for an interface: the one created by a forward
    /// declaration, extended by `bases`, or a new one.
    fn interface_type(
        &mut self,
        symbol: SymbolId,
        info: BuildInfo,
        kind: InterfaceKind,
        bases: &[TypeId],
    ) -> GenResult<TypeId> {
        let span = self.table.symbol(symbol).span;
        if let Some(id) = self.registry.in_creation(symbol) {
            trace!(name = %self.universe.type_name(id), "completing interface");
            let defined = describe_interface(interface_flavour(kind));
            self.check_forward_kind(symbol, id, defined, span)?;
            let ty = self.type_mut(id, span)?;
            for base in bases {
                if !ty.interfaces.contains(base) {
                    ty.interfaces.push(*base);
                }
            }
            return Ok(id);
        }

        let id = self.define_placed(symbol, info, TypeKind::Interface)?;
        let repository_id = self.table.repository_id(symbol);
        let ty = self.type_mut(id, span)?;
        ty.is_abstract = true;
        ty.interfaces.extend_from_slice(bases);
        ty.interfaces.push(RuntimeType::IdlEntity.id());
        ty.attributes
            .push(Attribute::InterfaceType(interface_flavour(kind)));
        ty.attributes.push(Attribute::RepositoryId(repository_id));
        self.registry.register_forward_decl(id, symbol, &self.table)?;
        Ok(id)
    }

    /// Resolve a type named in an inheritance clause. It must be fully
    /// defined.
    fn resolve_base(&self, name: &ScopedName, info: BuildInfo) -> GenResult<TypeId> {
        let symbol = self.resolve(info.scope, name)?;
        let Some(container) = self.registry.get_known_type(symbol, &self.table, &self.universe) else {
            return GenError::new(
                GenErrorKind::TypeNotSeen {
                    name: name.to_string(),
                },
                name.span,
            )
            .into_err();
        };
        if self.registry.is_forward_declared(symbol) {
            return GenError::new(
                GenErrorKind::OnlyForwardDeclared {
                    name: name.to_string(),
                },
                name.span,
            )
            .into_err();
        }
        match container.type_id() {
            Some(id) => Ok(id),
            None => GenError::new(
                GenErrorKind::NotAType {
                    name: name.to_string(),
                },
                name.span,
            )
            .with_help("only interfaces and value types can be inherited from")
            .into_err(),
        }
    }

    fn is_class(&self, id: TypeId) -> bool {
        self.universe
            .get(id)
            .is_some_and(|ty| ty.kind == TypeKind::Class)
    }

    /// Whether `id` is an interface proper, not an abstract value type.
    fn is_interface(&self, id: TypeId) -> bool {
        self.universe
            .get(id)
            .is_some_and(|ty| ty.kind == TypeKind::Interface && !ty.is_abstract_value())
    }

    fn is_abstract_value(&self, id: TypeId) -> bool {
        self.universe
            .get(id)
            .is_some_and(|ty| ty.is_abstract_value())
    }

    /// Fail unless the type created by the forward declaration of `symbol`
    /// is of the kind `defined` describes.
    fn check_forward_kind(
        &self,
        symbol: SymbolId,
        id: TypeId,
        defined: &'static str,
        span: Span,
    ) -> GenResult<()> {
        let declared = match self.universe.get(id) {
            Some(ty) if ty.kind == TypeKind::Class => CONCRETE_VALUE,
            Some(ty) => describe_interface(ty.interface_type().unwrap_or(InterfaceType::Concrete)),
            None => return GenError::internal("forward declared type missing", span).into_err(),
        };
        if declared == defined {
            return Ok(());
        }
        GenError::new(
            GenErrorKind::ForwardKindMismatch {
                name: self.table.full_name(symbol),
                declared,
                defined,
            },
            span,
        )
        .into_err()
    }

    fn invalid_inheritance<T>(&self, symbol: SymbolId, reason: String, span: Span) -> GenResult<T> {
        GenError::new(
            GenErrorKind::InvalidInheritance {
                ty: self.table.full_name(symbol),
                reason,
            },
            span,
        )
        .into_err()
    }

    // ============================================================
    // Value types
    // ============================================================

    pub(super) fn gen_value(&mut self, def: &ValueDef, info: BuildInfo) -> GenResult<()> {
        match def.kind {
            ValueKind::Abstract => self.gen_abstract_value(def, info),
            ValueKind::Concrete | ValueKind::Custom => self.gen_concrete_value(def, info),
        }
    }

    /// The types of a `supports` clause; only interfaces qualify.
    fn resolve_supports(&self, symbol: SymbolId, def: &ValueDef, info: BuildInfo) -> GenResult<Vec<TypeId>> {
        let mut supported = Vec::with_capacity(def.supports.len());
        for name in &def.supports {
            let id = self.resolve_base(name, info)?;
            if !self.is_interface(id) {
                return self.invalid_inheritance(
                    symbol,
                    format!("`{}` in the supports clause is not an interface", name),
                    name.span,
                );
            }
            supported.push(id);
        }
        Ok(supported)
    }

    fn gen_concrete_value(&mut self, def: &ValueDef, info: BuildInfo) -> GenResult<()> {
        let symbol = self.symbol_in(info.scope, &def.name)?;
        if self.registry.check_skip(symbol, true, &self.table, &self.universe)? {
            let scope = self.child_scope(info.scope, &def.name)?;
            let exports = def.body.iter().filter_map(|element| match element {
                ValueElement::Export(export) => Some(export),
                _ => None,
            });
            return self.register_skipped_typedefs(exports, scope);
        }

        // At most one concrete base, and it has to come first.
        let mut parent = None;
        let mut interfaces = Vec::new();
        for (position, name) in def.inherits.iter().enumerate() {
            let base = self.resolve_base(name, info)?;
            if self.is_class(base) {
                if position > 0 {
                    return self.invalid_inheritance(
                        symbol,
                        format!("concrete value type `{}` must be the first base", name),
                        name.span,
                    );
                }
                parent = Some(base);
            } else if self.is_abstract_value(base) {
                interfaces.push(base);
            } else {
                return self.invalid_inheritance(
                    symbol,
                    format!("`{}` is not a value type", name),
                    name.span,
                );
            }
        }
        interfaces.extend(self.resolve_supports(symbol, def, info)?);
        if def.kind == ValueKind::Custom {
            interfaces.push(RuntimeType::CustomMarshalled.id());
        }

        let id = self.value_type(symbol, info, parent, &interfaces, false)?;
        let span = def.name.span;
        let full_name = self.universe.type_name(id);
        let ty = self.type_mut(id, span)?;
        for attribute in [
            Attribute::ImplClass(format!("{}Impl", full_name)),
            Attribute::Serializable,
        ] {
            if !ty.attributes.contains(&attribute) {
                ty.attributes.push(attribute);
            }
        }

        let body = BuildInfo::body(self.child_scope(info.scope, &def.name)?, id);
        for element in &def.body {
            match element {
                ValueElement::Export(export) => self.gen_export(export, body)?,
                ValueElement::State(state) => self.gen_state_member(state, body)?,
                ValueElement::Init(init) => {
                    trace!(name = %init.name.node, "factory ignored");
                }
            }
        }
        self.complete(symbol, id)?;
        debug!(name = %full_name, "value type generated");
        self.value_types.push(full_name);
        Ok(())
    }

    fn gen_abstract_value(&mut self, def: &ValueDef, info: BuildInfo) -> GenResult<()> {
        let symbol = self.symbol_in(info.scope, &def.name)?;
        if self.registry.check_skip(symbol, true, &self.table, &self.universe)? {
            let scope = self.child_scope(info.scope, &def.name)?;
            let exports = def.body.iter().filter_map(|element| match element {
                ValueElement::Export(export) => Some(export),
                _ => None,
            });
            return self.register_skipped_typedefs(exports, scope);
        }

        let mut interfaces = Vec::new();
        for name in &def.inherits {
            let base = self.resolve_base(name, info)?;
            if !self.is_abstract_value(base) {
                return self.invalid_inheritance(
                    symbol,
                    format!(
                        "an abstract value type can only inherit from abstract value types, not from `{}`",
                        name
                    ),
                    name.span,
                );
            }
            interfaces.push(base);
        }
        interfaces.extend(self.resolve_supports(symbol, def, info)?);

        let id = self.value_type(symbol, info, None, &interfaces, true)?;
        let body = BuildInfo::body(self.child_scope(info.scope, &def.name)?, id);
        for element in &def.body {
            match element {
                ValueElement::Export(export) => self.gen_export(export, body)?,
                ValueElement::State(state) => {
                    return GenError::internal(
                        "state member in an abstract value type",
                        state.span,
                    )
                    .into_err()
                }
                ValueElement::Init(init) => {
                    return GenError::internal("factory in an abstract value type", init.span)
                        .into_err()
                }
            }
        }
        self.complete(symbol, id)?;
        debug!(name = %self.universe.type_name(id), "abstract value type generated");
        Ok(())
    }

    pub(super) fn gen_value_forward(&mut self, fwd: &ForwardDecl, info: BuildInfo) -> GenResult<()> {
        let symbol = self.symbol_in(info.scope, &fwd.name)?;
        if self.registry.check_skip(symbol, false, &self.table, &self.universe)? {
            return Ok(());
        }
        if !self.registry.is_declared(symbol) {
            self.value_type(symbol, info, None, &[], fwd.is_abstract)?;
        }
        Ok(())
    }

    /// The type being built for a value type. Classes receive abstract stubs
    /// for the members of every interface they implement.
    fn value_type(
        &mut self,
        symbol: SymbolId,
        info: BuildInfo,
        parent: Option<TypeId>,
        interfaces: &[TypeId],
        is_abstract: bool,
    ) -> GenResult<TypeId> {
        let span = self.table.symbol(symbol).span;
        let id = match self.registry.in_creation(symbol) {
            Some(id) => {
                trace!(name = %self.universe.type_name(id), "completing value type");
                let defined = if is_abstract {
                    describe_interface(InterfaceType::AbstractValue)
                } else {
                    CONCRETE_VALUE
                };
                self.check_forward_kind(symbol, id, defined, span)?;
                let ty = self.type_mut(id, span)?;
                for interface in interfaces {
                    if !ty.interfaces.contains(interface) {
                        ty.interfaces.push(*interface);
                    }
                }
                if parent.is_some() {
                    ty.parent = parent;
                }
                id
            }
            None => {
                if let (true, Some(parent)) = (is_abstract, parent) {
                    let reason = format!(
                        "an abstract value type can not inherit from the concrete `{}`",
                        self.universe.type_name(parent)
                    );
                    return self.invalid_inheritance(symbol, reason, span);
                }
                let kind = if is_abstract {
                    TypeKind::Interface
                } else {
                    TypeKind::Class
                };
                let id = self.define_placed(symbol, info, kind)?;
                let repository_id = self.table.repository_id(symbol);
                let ty = self.type_mut(id, span)?;
                ty.is_abstract = true;
                ty.parent = parent;
                ty.interfaces.extend_from_slice(interfaces);
                ty.interfaces.push(RuntimeType::IdlEntity.id());
                ty.attributes.push(Attribute::RepositoryId(repository_id));
                if is_abstract {
                    ty.attributes
                        .push(Attribute::InterfaceType(InterfaceType::AbstractValue));
                }
                self.registry.register_forward_decl(id, symbol, &self.table)?;
                id
            }
        };
        if self.is_class(id) {
            self.add_inherited_stubs(id, interfaces, span)?;
        }
        Ok(id)
    }

    pub(super) fn gen_value_box(&mut self, def: &ValueBoxDef, info: BuildInfo) -> GenResult<()> {
        let symbol = self.symbol_in(info.scope, &def.name)?;
        if self.registry.check_skip(symbol, false, &self.table, &self.universe)? {
            return Ok(());
        }
        // Boxes of boxes hold the innermost value directly.
        let boxed = self.member_type(&def.boxed, info)?;

        let id = self.define_placed(symbol, info, TypeKind::Class)?;
        let repository_id = self.table.repository_id(symbol);
        let ty = self.type_mut(id, def.span)?;
        ty.is_sealed = true;
        ty.parent = Some(RuntimeType::BoxedValueBase.id());
        ty.interfaces.push(RuntimeType::IdlEntity.id());
        ty.attributes.push(Attribute::RepositoryId(repository_id));
        ty.fields.push(FieldDef {
            visibility: Visibility::Private,
            ..FieldDef::public("m_val", boxed.ty.clone(), boxed.attributes.clone())
        });
        ty.boxed = Some(BoxedType {
            ty: boxed.ty,
            attributes: boxed.attributes,
        });
        self.create_type(id, def.span)?;
        self.registry
            .register_full_definition(TypeContainer::named(id), symbol, &self.table)?;
        debug!(name = %self.universe.type_name(id), "boxed value type generated");
        Ok(())
    }

    // ============================================================
    // Structs, enums, exceptions
    // ============================================================

    pub(super) fn gen_struct(&mut self, def: &StructDef, info: BuildInfo) -> GenResult<TypeContainer> {
        let symbol = self.symbol_in(info.scope, &def.name)?;
        if self.registry.check_skip(symbol, true, &self.table, &self.universe)? {
            return self.known_type(symbol, def.name.span);
        }

        let id = self.define_placed(symbol, info, TypeKind::Struct)?;
        let repository_id = self.table.repository_id(symbol);
        let ty = self.type_mut(id, def.span)?;
        ty.is_sealed = true;
        ty.interfaces.push(RuntimeType::IdlEntity.id());
        ty.attributes.extend([
            Attribute::IdlStruct,
            Attribute::Serializable,
            Attribute::RepositoryId(repository_id),
        ]);
        self.registry.register_forward_decl(id, symbol, &self.table)?;

        let body = BuildInfo::body(self.child_scope(info.scope, &def.name)?, id);
        for member in &def.members {
            self.gen_member(member, body)?;
        }
        self.complete(symbol, id)?;
        debug!(name = %self.universe.type_name(id), "struct generated");
        Ok(TypeContainer::named(id))
    }

    pub(super) fn gen_enum(&mut self, def: &EnumDef, info: BuildInfo) -> GenResult<TypeContainer> {
        let symbol = self.symbol_in(info.scope, &def.name)?;
        if self.registry.check_skip(symbol, false, &self.table, &self.universe)? {
            return self.known_type(symbol, def.name.span);
        }

        let id = self.define_placed(symbol, info, TypeKind::Enum)?;
        let repository_id = self.table.repository_id(symbol);
        let ty = self.type_mut(id, def.span)?;
        ty.is_sealed = true;
        ty.fields.push(FieldDef::public(
            "value__",
            TypeRef::Primitive(Primitive::Int32),
            Vec::new(),
        ));
        for (value, enumerator) in def.enumerators.iter().enumerate() {
            ty.fields.push(FieldDef {
                is_static: true,
                is_literal: true,
                constant: Some(value as i64),
                ..FieldDef::public(Self::target_name(enumerator), TypeRef::Named(id), Vec::new())
            });
        }
        ty.attributes.push(Attribute::IdlEnum);
        ty.attributes.push(Attribute::RepositoryId(repository_id));
        self.create_type(id, def.span)?;
        self.registry
            .register_full_definition(TypeContainer::named(id), symbol, &self.table)?;
        debug!(name = %self.universe.type_name(id), "enum generated");
        Ok(TypeContainer::named(id))
    }

    pub(super) fn gen_exception(&mut self, def: &ExceptDef, info: BuildInfo) -> GenResult<()> {
        let symbol = self.symbol_in(info.scope, &def.name)?;
        if self.registry.check_skip(symbol, true, &self.table, &self.universe)? {
            return Ok(());
        }

        let id = self.define_placed(symbol, info, TypeKind::Class)?;
        let repository_id = self.table.repository_id(symbol);
        let ty = self.type_mut(id, def.span)?;
        ty.parent = Some(RuntimeType::UserException.id());
        ty.attributes.push(Attribute::RepositoryId(repository_id));
        ty.attributes.push(Attribute::Serializable);
        self.registry.register_forward_decl(id, symbol, &self.table)?;

        let body = BuildInfo::body(self.child_scope(info.scope, &def.name)?, id);
        for member in &def.members {
            self.gen_member(member, body)?;
        }
        self.complete(symbol, id)?;
        debug!(name = %self.universe.type_name(id), "exception generated");
        Ok(())
    }

    fn known_type(&self, symbol: SymbolId, span: Span) -> GenResult<TypeContainer> {
        self.registry
            .get_known_type(symbol, &self.table, &self.universe)
            .ok_or_else(|| {
                Box::new(GenError::internal(
                    format!("skipped type `{}` is not registered", self.table.full_name(symbol)),
                    span,
                ))
            })
    }

    // ============================================================
    // Type declarations
    // ============================================================

    pub(super) fn gen_type_decl(&mut self, decl: &TypeDecl, info: BuildInfo) -> GenResult<()> {
        match decl {
            TypeDecl::Typedef(typedef) => self.gen_typedef(typedef, info),
            TypeDecl::Struct(def) => self.gen_struct(def, info).map(|_| ()),
            TypeDecl::Enum(def) => self.gen_enum(def, info).map(|_| ()),
            TypeDecl::Union(def) => unsupported("union", def.span),
            TypeDecl::Native(name) => unsupported("native type", name.span),
        }
    }

    /// Register every declarator of a typedef as alias of the named type.
    fn gen_typedef(&mut self, typedef: &TypedefDecl, info: BuildInfo) -> GenResult<()> {
        let aliased = self.type_spec(&typedef.ty, info)?;
        for declarator in &typedef.declarators {
            let name = match declarator {
                Declarator::Simple(name) => name,
                Declarator::Array { name, .. } => return unsupported("array declarator", name.span),
            };
            let symbol = self.symbol_in(info.scope, name)?;
            trace!(name = %self.table.full_name(symbol), "typedef registered");
            self.registry
                .register_typedef(aliased.clone(), symbol, &self.table)?;
        }
        Ok(())
    }

    /// Typedefs in the body of a skipped type are still needed to resolve
    /// names in the rest of the file.
    fn register_skipped_typedefs<'a>(
        &mut self,
        exports: impl Iterator<Item = &'a Export>,
        scope: ScopeId,
    ) -> GenResult<()> {
        let info = BuildInfo {
            scope,
            container: None,
        };
        for export in exports {
            if let Export::Type(TypeDecl::Typedef(typedef)) = export {
                self.gen_typedef(typedef, info)?;
            }
        }
        Ok(())
    }
}

pub(super) fn unsupported<T>(construct: &str, span: Span) -> GenResult<T> {
    GenError::new(
        GenErrorKind::Unsupported {
            construct: construct.to_string(),
        },
        span,
    )
    .into_err()
}
