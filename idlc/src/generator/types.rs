//! Type specifiers.
//!
//! [`Generator::type_spec`] maps a type as written to a [`TypeContainer`].
//! Slots that hold values (fields, parameters, results, properties) go
//! through [`Generator::member_type`] instead, which also applies custom
//! mappings and replaces boxed value types by the type they box.

use tracing::trace;

use super::decls::unsupported;
use super::{BuildInfo, Generator};
use crate::ast::{BaseType, ScopedName, TypeSpec, TypeSpecKind};
use crate::error::{GenError, GenErrorKind, GenResult};
use crate::registry::TypeContainer;
use crate::span::Span;
use crate::symtab::SymbolKind;
use crate::typesys::{Attribute, LibraryCatalog, ObjectIdlType, Primitive, TypeCatalog, TypeRef};

/// The target type of an IDL base type.
fn base_type(base: BaseType, span: Span) -> GenResult<TypeContainer> {
    let (primitive, attributes) = match base {
        BaseType::Float => (Primitive::Single, Vec::new()),
        BaseType::Double => (Primitive::Double, Vec::new()),
        BaseType::LongDouble => return unsupported("long double", span),
        // Unsigned integers share the signed representation.
        BaseType::Short | BaseType::UShort => (Primitive::Int16, Vec::new()),
        BaseType::Long | BaseType::ULong => (Primitive::Int32, Vec::new()),
        BaseType::LongLong | BaseType::ULongLong => (Primitive::Int64, Vec::new()),
        BaseType::Char => (Primitive::Char, vec![Attribute::WideChar(false)]),
        BaseType::WChar => (Primitive::Char, vec![Attribute::WideChar(true)]),
        BaseType::Boolean => (Primitive::Boolean, Vec::new()),
        BaseType::Octet => (Primitive::Byte, Vec::new()),
        BaseType::Any => (
            Primitive::Object,
            vec![Attribute::ObjectIdlType(ObjectIdlType::Any)],
        ),
        BaseType::Object => (Primitive::MarshalByRefObject, Vec::new()),
        BaseType::ValueBase => (
            Primitive::Object,
            vec![Attribute::ObjectIdlType(ObjectIdlType::ValueBase)],
        ),
    };
    Ok(TypeContainer::new(TypeRef::Primitive(primitive), attributes))
}

fn string_type(wide: bool) -> TypeContainer {
    TypeContainer::new(
        TypeRef::Primitive(Primitive::String),
        vec![Attribute::StringValue, Attribute::WideChar(wide)],
    )
}

/// An unbounded sequence of `element`. The element's attributes stay on the
/// sequence, below its own `IdlSequence` marker.
fn sequence_of(element: TypeContainer) -> TypeContainer {
    let order = element
        .attributes
        .iter()
        .filter_map(|attr| match attr {
            Attribute::IdlSequence(order) => Some(order + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    let mut attributes = element.attributes;
    attributes.push(Attribute::IdlSequence(order));
    TypeContainer::new(TypeRef::Array(Box::new(element.ty)), attributes)
}

impl Generator {
    /// The type denoted by `spec`. Struct and enum definitions written in
    /// place are generated on the way.
    pub(super) fn type_spec(&mut self, spec: &TypeSpec, info: BuildInfo) -> GenResult<TypeContainer> {
        match &spec.kind {
            TypeSpecKind::Base(base) => base_type(*base, spec.span),
            TypeSpecKind::Sequence { element, bound } => {
                if let Some(bound) = bound {
                    return unsupported("bounded sequence", bound.span);
                }
                let element = self.type_spec(element, info)?;
                let element = self.apply_mapping(element, spec.span)?;
                Ok(sequence_of(element))
            }
            TypeSpecKind::String { .. } => Ok(string_type(false)),
            TypeSpecKind::WString { .. } => Ok(string_type(true)),
            TypeSpecKind::Fixed => unsupported("fixed point type", spec.span),
            TypeSpecKind::Scoped(name) => self.scoped_type(name, info),
            TypeSpecKind::Struct(def) => self.gen_struct(def, info),
            TypeSpecKind::Enum(def) => self.gen_enum(def, info),
            TypeSpecKind::Union(def) => unsupported("union", def.span),
        }
    }

    /// The type for a value slot: custom mappings applied, boxed value types
    /// unboxed.
    pub(super) fn member_type(&mut self, spec: &TypeSpec, info: BuildInfo) -> GenResult<TypeContainer> {
        let container = self.type_spec(spec, info)?;
        let container = self.apply_mapping(container, spec.span)?;
        Ok(self.unbox(container))
    }

    fn scoped_type(&self, name: &ScopedName, info: BuildInfo) -> GenResult<TypeContainer> {
        let symbol = self.resolve(info.scope, name)?;
        if self.table.symbol(symbol).kind == SymbolKind::Value {
            return GenError::new(
                GenErrorKind::NotAType {
                    name: name.to_string(),
                },
                name.span,
            )
            .with_help("constants and enumerators can not be used as types")
            .into_err();
        }
        match self.registry.get_known_type(symbol, &self.table, &self.universe) {
            Some(container) => Ok(container),
            None => GenError::new(
                GenErrorKind::TypeNotSeen {
                    name: name.to_string(),
                },
                name.span,
            )
            .into_err(),
        }
    }

    /// Replace a named type by its custom mapping target, if it has one.
    fn apply_mapping(&self, container: TypeContainer, span: Span) -> GenResult<TypeContainer> {
        let Some(id) = container.type_id() else {
            return Ok(container);
        };
        let idl = self.universe.type_name(id);
        let Some(target) = self.mappings.get(&idl) else {
            return Ok(container);
        };
        match LibraryCatalog::new(&self.universe).lookup(target, None) {
            Some(mapped) => {
                trace!(idl = %idl, mapped_to = target, "custom mapping applied");
                Ok(TypeContainer::new(TypeRef::Named(mapped), container.attributes))
            }
            None => GenError::new(
                GenErrorKind::UnknownMappingTarget {
                    idl,
                    target: target.to_string(),
                },
                span,
            )
            .with_help("load the artifact defining the target type with `-r`")
            .into_err(),
        }
    }

    /// A boxed value type becomes the type it boxes, marked with the
    /// repository id of the box.
    fn unbox(&self, container: TypeContainer) -> TypeContainer {
        let Some(def) = container.type_id().and_then(|id| self.universe.get(id)) else {
            return container;
        };
        let Some(boxed) = &def.boxed else {
            return container;
        };
        let mut attributes = boxed.attributes.clone();
        attributes.push(Attribute::BoxedValue(
            def.repository_id().unwrap_or_default().to_string(),
        ));
        trace!(name = %def.full_name, "unboxed");
        TypeContainer::new(boxed.ty.clone(), attributes)
    }
}
