//! The runtime library every generated assembly refers to.
//!
//! It declares the base types generated code builds on, plus the boxed
//! string value types CORBA predefines.

use super::{
    Assembly, Attribute, BoxedType, FieldDef, Module, Primitive, TypeDef, TypeId, TypeKind,
    TypeRef, TypeState, Visibility,
};

/// Name of the runtime library assembly.
pub const RUNTIME_ASSEMBLY: &str = "idlc.runtime";

/// Universe index of the runtime library.
const RUNTIME_INDEX: u32 = 1;

/// Types of the runtime library, in assembly order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeType {
    /// Marker interface implemented by every generated IDL type.
    IdlEntity,
    /// Base class of IDL exceptions.
    UserException,
    /// Implemented by `custom` value types, which marshal themselves.
    CustomMarshalled,
    /// Base class of boxed value types.
    BoxedValueBase,
    StringValue,
    WStringValue,
}

impl RuntimeType {
    const ALL: [RuntimeType; 6] = [
        RuntimeType::IdlEntity,
        RuntimeType::UserException,
        RuntimeType::CustomMarshalled,
        RuntimeType::BoxedValueBase,
        RuntimeType::StringValue,
        RuntimeType::WStringValue,
    ];

    pub fn id(self) -> TypeId {
        TypeId::new(RUNTIME_INDEX, self as u32)
    }

    pub fn full_name(self) -> &'static str {
        match self {
            RuntimeType::IdlEntity => "Idlc.Runtime.IIdlEntity",
            RuntimeType::UserException => "Idlc.Runtime.AbstractUserException",
            RuntimeType::CustomMarshalled => "Idlc.Runtime.ICustomMarshalled",
            RuntimeType::BoxedValueBase => "Idlc.Runtime.BoxedValueBase",
            RuntimeType::StringValue => "omg.org.CORBA.StringValue",
            RuntimeType::WStringValue => "omg.org.CORBA.WStringValue",
        }
    }

    fn definition(self) -> TypeDef {
        let mut def = TypeDef::new(self.full_name(), TypeKind::Class, 0);
        def.state = TypeState::Created;
        match self {
            RuntimeType::IdlEntity | RuntimeType::CustomMarshalled => {
                def.kind = TypeKind::Interface;
                def.is_abstract = true;
            }
            RuntimeType::UserException => def.is_abstract = true,
            RuntimeType::BoxedValueBase => def.is_abstract = true,
            RuntimeType::StringValue => string_box(&mut def, "StringValue", false),
            RuntimeType::WStringValue => string_box(&mut def, "WStringValue", true),
        }
        def
    }
}

fn string_box(def: &mut TypeDef, name: &str, wide: bool) {
    let attributes = vec![Attribute::StringValue, Attribute::WideChar(wide)];
    def.is_sealed = true;
    def.parent = Some(RuntimeType::BoxedValueBase.id());
    def.interfaces.push(RuntimeType::IdlEntity.id());
    def.attributes
        .push(Attribute::RepositoryId(format!("IDL:omg.org/CORBA/{}:1.0", name)));
    def.fields.push(FieldDef {
        visibility: Visibility::Private,
        ..FieldDef::public("m_val", TypeRef::Primitive(Primitive::String), attributes.clone())
    });
    def.boxed = Some(BoxedType {
        ty: TypeRef::Primitive(Primitive::String),
        attributes,
    });
}

/// Build the runtime library assembly.
pub fn library() -> Assembly {
    let mut assembly = Assembly::new(RUNTIME_ASSEMBLY);
    assembly.modules.push(Module {
        name: RUNTIME_ASSEMBLY.to_string(),
        types: (0..RuntimeType::ALL.len() as u32).collect(),
    });
    assembly.types = RuntimeType::ALL.iter().map(|t| t.definition()).collect();
    assembly.rebuild_index();
    assembly
}
