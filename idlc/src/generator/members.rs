//! Members: operations, attributes, fields, and the abstract stubs classes
//! receive for the interfaces they implement.

use tracing::{trace, warn};

use super::decls::unsupported;
use super::{BuildInfo, Generator};
use crate::ast::*;
use crate::error::{GenError, GenResult};
use crate::registry::TypeContainer;
use crate::span::Span;
use crate::typesys::{
    FieldDef, MethodDef, ParamDef, PropertyDef, TypeDef, TypeId, TypeRef, Visibility,
};

/// Prefix of the fields generated for private state members.
const PRIVATE_FIELD_PREFIX: &str = "m_";

fn getter_name(property: &str) -> String {
    format!("__get_{}", property)
}

fn setter_name(property: &str) -> String {
    format!("__set_{}", property)
}

/// An abstract, virtual method.
fn abstract_method(
    name: String,
    returns: TypeContainer,
    params: Vec<ParamDef>,
    is_special_name: bool,
) -> MethodDef {
    MethodDef {
        name,
        return_param: ParamDef {
            name: String::new(),
            ty: returns.ty,
            is_out: false,
            attributes: returns.attributes,
        },
        params,
        is_abstract: true,
        is_virtual: true,
        is_special_name,
    }
}

/// The property plus its accessor methods.
fn property_with_accessors(
    name: String,
    ty: TypeContainer,
    readonly: bool,
) -> (PropertyDef, Vec<MethodDef>) {
    let getter = getter_name(&name);
    let mut accessors = vec![abstract_method(getter.clone(), ty.clone(), Vec::new(), true)];
    let setter = (!readonly).then(|| setter_name(&name));
    if let Some(setter) = &setter {
        let value = ParamDef {
            name: "value".to_string(),
            ty: ty.ty.clone(),
            is_out: false,
            attributes: ty.attributes.clone(),
        };
        accessors.push(abstract_method(setter.clone(), TypeContainer::void(), vec![value], true));
    }
    let property = PropertyDef {
        name,
        ty: ty.ty,
        getter: Some(getter),
        setter,
        attributes: ty.attributes,
    };
    (property, accessors)
}

impl Generator {
    /// Generate a member of an interface or value type body.
    pub(super) fn gen_export(&mut self, export: &Export, info: BuildInfo) -> GenResult<()> {
        match export {
            Export::Type(decl) => self.gen_type_decl(decl, info),
            Export::Except(def) => self.gen_exception(def, info),
            Export::Attr(attr) => self.gen_attribute(attr, info),
            Export::Op(op) => self.gen_operation(op, info),
            Export::Const(def) => {
                warn!(name = %def.name.node, "constants are not yet supported, skipping");
                Ok(())
            }
            Export::Pragma(_) => Ok(()),
        }
    }

    /// The type whose body is being walked.
    fn container(&mut self, info: BuildInfo, span: Span) -> GenResult<&mut TypeDef> {
        match info.container {
            Some(id) => self.type_mut(id, span),
            None => GenError::internal("member outside of a type body", span).into_err(),
        }
    }

    // ============================================================
    // Operations and attributes
    // ============================================================

    fn gen_operation(&mut self, op: &OpDecl, info: BuildInfo) -> GenResult<()> {
        let returns = match &op.return_type {
            Some(ty) => self.member_type(ty, info)?,
            None => TypeContainer::void(),
        };
        let mut params = Vec::with_capacity(op.params.len());
        for param in &op.params {
            let TypeContainer { ty, attributes } = self.member_type(&param.ty, info)?;
            let (ty, is_out) = match param.direction {
                ParamDirection::In => (ty, false),
                ParamDirection::Out => (TypeRef::ByRef(Box::new(ty)), true),
                ParamDirection::InOut => (TypeRef::ByRef(Box::new(ty)), false),
            };
            params.push(ParamDef {
                name: Self::target_name(&param.name),
                ty,
                is_out,
                attributes,
            });
        }
        let method = abstract_method(Self::target_name(&op.name), returns, params, false);
        trace!(name = %method.name, "operation");
        self.container(info, op.span)?.methods.push(method);
        Ok(())
    }

    fn gen_attribute(&mut self, attr: &AttrDecl, info: BuildInfo) -> GenResult<()> {
        let ty = self.member_type(&attr.ty, info)?;
        for name in &attr.names {
            let (property, accessors) =
                property_with_accessors(Self::target_name(name), ty.clone(), attr.readonly);
            trace!(name = %property.name, readonly = attr.readonly, "attribute");
            let container = self.container(info, attr.span)?;
            container.methods.extend(accessors);
            container.properties.push(property);
        }
        Ok(())
    }

    // ============================================================
    // Fields
    // ============================================================

    /// Generate the fields of a struct or exception member.
    pub(super) fn gen_member(&mut self, member: &Member, info: BuildInfo) -> GenResult<()> {
        let ty = self.member_type(&member.ty, info)?;
        for declarator in &member.declarators {
            let name = simple_declarator(declarator)?;
            let field = FieldDef::public(Self::target_name(name), ty.ty.clone(), ty.attributes.clone());
            self.container(info, member.span)?.fields.push(field);
        }
        Ok(())
    }

    /// Generate the fields of a value type state member. Private state
    /// becomes a protected `m_` field.
    pub(super) fn gen_state_member(&mut self, state: &StateMember, info: BuildInfo) -> GenResult<()> {
        let ty = self.member_type(&state.ty, info)?;
        for declarator in &state.declarators {
            let name = Self::target_name(simple_declarator(declarator)?);
            let field = match state.visibility {
                StateVisibility::Public => FieldDef::public(name, ty.ty.clone(), ty.attributes.clone()),
                StateVisibility::Private => {
                    let name = if name.starts_with(PRIVATE_FIELD_PREFIX) {
                        name
                    } else {
                        format!("{}{}", PRIVATE_FIELD_PREFIX, name)
                    };
                    FieldDef {
                        visibility: Visibility::Protected,
                        ..FieldDef::public(name, ty.ty.clone(), ty.attributes.clone())
                    }
                }
            };
            self.container(info, state.span)?.fields.push(field);
        }
        Ok(())
    }

    // ============================================================
    // Inherited members
    // ============================================================

    /// Add abstract stubs to class `id` for the operations and attributes of
    /// `interfaces` and every interface they inherit from.
    pub(super) fn add_inherited_stubs(&mut self, id: TypeId, interfaces: &[TypeId], span: Span) -> GenResult<()> {
        let mut all = interfaces.to_vec();
        for interface in interfaces {
            for inherited in self.universe.all_interfaces(*interface) {
                if !all.contains(&inherited) {
                    all.push(inherited);
                }
            }
        }

        let mut methods = Vec::new();
        let mut properties = Vec::new();
        for interface in &all {
            let Some(def) = self.universe.get(*interface) else {
                continue;
            };
            // Accessors are regenerated together with their property.
            methods.extend(
                def.methods
                    .iter()
                    .filter(|m| !m.is_special_name)
                    .map(|m| MethodDef {
                        is_abstract: true,
                        is_virtual: true,
                        ..m.clone()
                    }),
            );
            for property in &def.properties {
                let ty = TypeContainer::new(property.ty.clone(), property.attributes.clone());
                properties.push(property_with_accessors(
                    property.name.clone(),
                    ty,
                    property.setter.is_none(),
                ));
            }
        }

        if methods.is_empty() && properties.is_empty() {
            return Ok(());
        }
        trace!(
            name = %self.universe.type_name(id),
            methods = methods.len(),
            properties = properties.len(),
            "adding inherited stubs"
        );
        let class = self.type_mut(id, span)?;
        class.methods.extend(methods);
        for (property, accessors) in properties {
            class.methods.extend(accessors);
            class.properties.push(property);
        }
        Ok(())
    }
}

fn simple_declarator(declarator: &Declarator) -> GenResult<&Ident> {
    match declarator {
        Declarator::Simple(name) => Ok(name),
        Declarator::Array { name, .. } => unsupported("array declarator", name.span),
    }
}
