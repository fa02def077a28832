//! Generator tests.

use super::*;
use crate::parser::Parser;
use crate::symtab::{self, ScopeError};
use crate::typesys::{
    Attribute, InterfaceType, ObjectIdlType, Primitive, RuntimeType, TypeKind, TypeRef,
    Visibility,
};

/// Parse, collect and generate one file into `generator`.
fn generate_into(generator: &mut Generator, source: &str) -> GenResult<()> {
    let spec = match Parser::new(source).parse_specification() {
        Ok(spec) => spec,
        Err(errors) => panic!("unexpected parse errors: {:#?}", errors),
    };
    let table = symtab::collect(&spec)?;
    generator.generate(&spec, table)
}

fn generator() -> Generator {
    Generator::new(TypeUniverse::new("Test"), MappingTable::new())
}

fn assert_compiles(source: &str) -> Generator {
    let mut generator = generator();
    if let Err(err) = generate_into(&mut generator, source) {
        panic!("generation failed: {:#?}", err);
    }
    generator
}

fn assert_compile_error(source: &str) -> GenError {
    let mut generator = generator();
    match generate_into(&mut generator, source) {
        Ok(()) => panic!("expected a generation error"),
        Err(err) => *err,
    }
}

/// The output type named `name`.
fn ty<'g>(generator: &'g Generator, name: &str) -> (TypeId, &'g TypeDef) {
    let output = generator.universe().output();
    let index = output
        .find(name)
        .unwrap_or_else(|| panic!("type `{}` not generated", name));
    (TypeId::new(0, index), &output.types[index as usize])
}

fn module_of(generator: &Generator, def: &TypeDef) -> String {
    generator.universe().output().modules[def.module as usize]
        .name
        .clone()
}

fn int32() -> TypeRef {
    TypeRef::Primitive(Primitive::Int32)
}

/// A library assembly holding the given created types, as loaded by `-r`.
fn library(name: &str, types: &[(&str, TypeKind, Option<&str>)]) -> crate::typesys::Assembly {
    let mut universe = TypeUniverse::new(name);
    let module = universe.output_mut().define_module(name);
    for (full_name, kind, repository_id) in types {
        let id = universe.define_type(module, full_name, *kind).unwrap();
        if let Some(repository_id) = repository_id {
            universe
                .type_mut(id)
                .unwrap()
                .attributes
                .push(Attribute::RepositoryId(repository_id.to_string()));
        }
        universe.create_type(id).unwrap();
    }
    universe.output().clone()
}

// ============================================================
// Interfaces and operations
// ============================================================

#[test]
fn test_forward_declared_interface() {
    let generator = assert_compiles(
        "interface Foo; \
         interface Foo { void op(in long a, inout string b); };",
    );
    let (_, foo) = ty(&generator, "Foo");
    assert_eq!(foo.kind, TypeKind::Interface);
    assert!(foo.is_abstract);
    assert!(foo.is_created());
    assert_eq!(module_of(&generator, foo), "_Testdefault");
    assert_eq!(foo.repository_id(), Some("IDL:Foo:1.0"));
    assert_eq!(foo.interface_type(), Some(InterfaceType::Concrete));
    assert!(foo.interfaces.contains(&RuntimeType::IdlEntity.id()));

    let op = foo.method("op").unwrap();
    assert!(op.is_abstract && op.is_virtual && !op.is_special_name);
    assert_eq!(op.return_param.ty, TypeRef::Void);
    assert_eq!(op.params[0].ty, int32());
    assert!(!op.params[0].is_out);
    assert_eq!(
        op.params[1].ty,
        TypeRef::ByRef(Box::new(TypeRef::Primitive(Primitive::String)))
    );
    assert!(!op.params[1].is_out);
    assert_eq!(
        op.params[1].attributes,
        vec![Attribute::StringValue, Attribute::WideChar(false)]
    );
}

#[test]
fn test_parameter_types() {
    let generator = assert_compiles(
        "interface I { any get(out long x, in Object o, in ValueBase v, in wchar c, \
         in unsigned long long big, in octet b); };",
    );
    let (_, i) = ty(&generator, "I");
    let get = i.method("get").unwrap();
    assert_eq!(get.return_param.ty, TypeRef::Primitive(Primitive::Object));
    assert_eq!(
        get.return_param.attributes,
        vec![Attribute::ObjectIdlType(ObjectIdlType::Any)]
    );
    assert_eq!(get.params[0].ty, TypeRef::ByRef(Box::new(int32())));
    assert!(get.params[0].is_out);
    assert_eq!(
        get.params[1].ty,
        TypeRef::Primitive(Primitive::MarshalByRefObject)
    );
    assert_eq!(
        get.params[2].attributes,
        vec![Attribute::ObjectIdlType(ObjectIdlType::ValueBase)]
    );
    assert_eq!(get.params[3].ty, TypeRef::Primitive(Primitive::Char));
    assert_eq!(get.params[3].attributes, vec![Attribute::WideChar(true)]);
    assert_eq!(get.params[4].ty, TypeRef::Primitive(Primitive::Int64));
    assert_eq!(get.params[5].ty, TypeRef::Primitive(Primitive::Byte));
}

#[test]
fn test_interface_kinds() {
    let generator = assert_compiles("local interface L {}; abstract interface A {};");
    assert_eq!(
        ty(&generator, "L").1.interface_type(),
        Some(InterfaceType::Local)
    );
    assert_eq!(
        ty(&generator, "A").1.interface_type(),
        Some(InterfaceType::Abstract)
    );
}

#[test]
fn test_attributes_become_properties() {
    let generator = assert_compiles(
        "interface I { readonly attribute long count; attribute string name, alias; };",
    );
    let (_, i) = ty(&generator, "I");
    assert_eq!(i.properties.len(), 3);

    let count = i.property("count").unwrap();
    assert_eq!(count.ty, int32());
    assert_eq!(count.getter.as_deref(), Some("__get_count"));
    assert_eq!(count.setter, None);
    assert!(i.method("__set_count").is_none());

    let name = i.property("name").unwrap();
    assert_eq!(name.setter.as_deref(), Some("__set_name"));
    let getter = i.method("__get_name").unwrap();
    assert!(getter.is_special_name);
    assert_eq!(getter.return_param.attributes, name.attributes);
    let setter = i.method("__set_name").unwrap();
    assert_eq!(setter.return_param.ty, TypeRef::Void);
    assert_eq!(setter.params[0].name, "value");
    assert_eq!(setter.params[0].attributes, vec![Attribute::StringValue, Attribute::WideChar(false)]);
    assert!(i.property("alias").is_some());
}

#[test]
fn test_interface_inheritance() {
    let generator = assert_compiles(
        "interface A { void a(); }; interface B; interface B : A { void b(); };",
    );
    let (a, _) = ty(&generator, "A");
    let (_, b) = ty(&generator, "B");
    assert!(b.interfaces.contains(&a));
    assert!(b.interfaces.contains(&RuntimeType::IdlEntity.id()));
    // Interfaces do not receive stubs of their bases.
    assert!(b.method("a").is_none());
}

#[test]
fn test_pragma_id_overrides_repository_id() {
    let generator = assert_compiles("interface I {};\n#pragma ID I \"IDL:custom/I:3.0\"\n");
    assert_eq!(ty(&generator, "I").1.repository_id(), Some("IDL:custom/I:3.0"));
}

#[test]
fn test_pragma_prefix() {
    let generator = assert_compiles("#pragma prefix \"acme.com\"\nmodule M { interface I {}; };\n");
    let (_, i) = ty(&generator, "acme.com.M.I");
    assert_eq!(i.repository_id(), Some("IDL:acme.com/M/I:1.0"));
}

// ============================================================
// Structs, enums, exceptions, typedefs
// ============================================================

#[test]
fn test_struct_in_module() {
    let generator = assert_compiles("module M { struct Pair { long a; long b; }; };");
    let (_, pair) = ty(&generator, "M.Pair");
    assert_eq!(pair.kind, TypeKind::Struct);
    assert!(pair.is_sealed);
    assert_eq!(module_of(&generator, pair), "_Test_M");
    assert!(pair.attributes.contains(&Attribute::IdlStruct));
    assert!(pair.attributes.contains(&Attribute::Serializable));
    assert_eq!(pair.repository_id(), Some("IDL:M/Pair:1.0"));
    assert!(pair.interfaces.contains(&RuntimeType::IdlEntity.id()));
    let names: Vec<_> = pair.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
    assert!(pair
        .fields
        .iter()
        .all(|f| f.ty == int32() && f.visibility == Visibility::Public));
}

#[test]
fn test_enum() {
    let generator = assert_compiles("enum Color { RED, GREEN, BLUE };");
    let (id, color) = ty(&generator, "Color");
    assert_eq!(color.kind, TypeKind::Enum);
    assert!(color.is_sealed && color.is_created());
    assert!(color.attributes.contains(&Attribute::IdlEnum));
    assert_eq!(color.fields[0].name, "value__");
    assert_eq!(color.fields[0].ty, int32());
    assert!(!color.fields[0].is_static);
    let literals: Vec<_> = color.fields[1..]
        .iter()
        .map(|f| (f.name.as_str(), f.constant))
        .collect();
    assert_eq!(literals, [("RED", Some(0)), ("GREEN", Some(1)), ("BLUE", Some(2))]);
    assert!(color.fields[1..]
        .iter()
        .all(|f| f.is_static && f.is_literal && f.ty == TypeRef::Named(id)));
}

#[test]
fn test_exception() {
    let generator = assert_compiles("module M { exception Oops { string reason; }; };");
    let (_, oops) = ty(&generator, "M.Oops");
    assert_eq!(oops.kind, TypeKind::Class);
    assert_eq!(oops.parent, Some(RuntimeType::UserException.id()));
    assert_eq!(oops.repository_id(), Some("IDL:M/Oops:1.0"));
    assert!(oops.field("reason").is_some());
}

#[test]
fn test_typedef_of_sequence() {
    let generator =
        assert_compiles("typedef sequence<string> Names; interface I { Names list(); };");
    let (_, i) = ty(&generator, "I");
    let list = i.method("list").unwrap();
    assert_eq!(
        list.return_param.ty,
        TypeRef::Array(Box::new(TypeRef::Primitive(Primitive::String)))
    );
    assert_eq!(
        list.return_param.attributes,
        vec![
            Attribute::StringValue,
            Attribute::WideChar(false),
            Attribute::IdlSequence(0)
        ]
    );
    assert!(generator.universe().output().find("Names").is_none());
}

#[test]
fn test_sequence_keeps_element_attributes() {
    let generator = assert_compiles(
        "struct S { sequence<wstring> w; sequence<string> s; sequence<wchar> c; sequence<char> n; };",
    );
    let (_, s) = ty(&generator, "S");
    let w = s.field("w").unwrap();
    let narrow = s.field("s").unwrap();
    assert_eq!(w.ty, narrow.ty);
    assert_ne!(w.attributes, narrow.attributes);
    assert!(w.attributes.contains(&Attribute::WideChar(true)));
    assert!(narrow.attributes.contains(&Attribute::WideChar(false)));
    assert_eq!(
        s.field("c").unwrap().attributes,
        vec![Attribute::WideChar(true), Attribute::IdlSequence(0)]
    );
    assert_eq!(
        s.field("n").unwrap().attributes,
        vec![Attribute::WideChar(false), Attribute::IdlSequence(0)]
    );
}

#[test]
fn test_nested_sequence_markers_are_ordered() {
    let generator = assert_compiles("struct S { sequence<sequence<wchar> > rows; };");
    let (_, s) = ty(&generator, "S");
    let rows = s.field("rows").unwrap();
    assert_eq!(
        rows.ty,
        TypeRef::Array(Box::new(TypeRef::Array(Box::new(TypeRef::Primitive(
            Primitive::Char
        )))))
    );
    assert_eq!(
        rows.attributes,
        vec![
            Attribute::WideChar(true),
            Attribute::IdlSequence(0),
            Attribute::IdlSequence(1)
        ]
    );
}

#[test]
fn test_forward_declared_value_in_struct() {
    let generator = assert_compiles(
        "valuetype Node; struct Link { Node next; }; valuetype Node { public Link link; };",
    );
    let (node, def) = ty(&generator, "Node");
    assert!(def.is_created());
    let (link, link_def) = ty(&generator, "Link");
    assert_eq!(link_def.field("next").unwrap().ty, TypeRef::Named(node));
    assert_eq!(def.field("link").unwrap().ty, TypeRef::Named(link));
}

// ============================================================
// Nested placement
// ============================================================

#[test]
fn test_struct_in_interface_goes_to_package() {
    let generator = assert_compiles(
        "module M { interface I { struct S { long a; }; void f(in S s); }; \
         struct T { I_package::S s; }; };",
    );
    let (s, def) = ty(&generator, "M.I_package.S");
    assert_eq!(def.declaring_type, None);
    assert_eq!(module_of(&generator, def), "_Test_M_I__package");
    assert_eq!(ty(&generator, "M.I").1.method("f").unwrap().params[0].ty, TypeRef::Named(s));
    assert_eq!(ty(&generator, "M.T").1.field("s").unwrap().ty, TypeRef::Named(s));
}

#[test]
fn test_struct_in_value_type_is_nested() {
    let generator =
        assert_compiles("valuetype V { struct Inner { long a; }; public Inner i; };");
    let (v, _) = ty(&generator, "V");
    let (inner, def) = ty(&generator, "V.Inner");
    assert_eq!(def.declaring_type, Some(v));
    assert_eq!(ty(&generator, "V").1.field("i").unwrap().ty, TypeRef::Named(inner));
}

// ============================================================
// Value types
// ============================================================

const SHAPES: &str = "module M { \
    interface Shape { double area(); attribute long id; }; \
    valuetype Base { public long x; }; \
    valuetype Circle : Base supports Shape { \
        private double radius; private double m_center; public string label; \
        factory create(in double r); }; \
    };";

#[test]
fn test_concrete_value_type() {
    let generator = assert_compiles(SHAPES);
    let (shape, _) = ty(&generator, "M.Shape");
    let (base, _) = ty(&generator, "M.Base");
    let (_, circle) = ty(&generator, "M.Circle");

    assert_eq!(circle.kind, TypeKind::Class);
    assert!(circle.is_abstract);
    assert_eq!(circle.parent, Some(base));
    assert!(circle.interfaces.contains(&shape));
    assert!(circle
        .attributes
        .contains(&Attribute::ImplClass("M.CircleImpl".to_string())));
    assert!(circle.attributes.contains(&Attribute::Serializable));
    assert_eq!(circle.repository_id(), Some("IDL:M/Circle:1.0"));

    let radius = circle.field("m_radius").unwrap();
    assert_eq!(radius.visibility, Visibility::Protected);
    assert!(circle.field("m_center").is_some());
    assert!(circle.field("m_m_center").is_none());
    assert_eq!(circle.field("label").unwrap().visibility, Visibility::Public);
    assert!(circle.method("create").is_none());

    assert_eq!(generator.value_types(), ["M.Base", "M.Circle"]);
}

#[test]
fn test_value_type_receives_interface_stubs() {
    let generator = assert_compiles(SHAPES);
    let (_, circle) = ty(&generator, "M.Circle");
    let area = circle.method("area").unwrap();
    assert!(area.is_abstract && area.is_virtual);
    assert_eq!(area.return_param.ty, TypeRef::Primitive(Primitive::Double));
    assert!(circle.method("__get_id").unwrap().is_special_name);
    assert!(circle.method("__set_id").is_some());
    assert_eq!(circle.properties.len(), 1);
    // Each accessor appears once.
    assert_eq!(
        circle.methods.iter().filter(|m| m.name == "__get_id").count(),
        1
    );
}

#[test]
fn test_abstract_value_base() {
    let generator = assert_compiles(
        "abstract valuetype AV { void f(); }; valuetype V : AV { public long x; };",
    );
    let (av, def) = ty(&generator, "AV");
    assert_eq!(def.kind, TypeKind::Interface);
    assert_eq!(def.interface_type(), Some(InterfaceType::AbstractValue));
    let (_, v) = ty(&generator, "V");
    assert!(v.interfaces.contains(&av));
    assert_eq!(v.parent, None);
    assert!(v.method("f").unwrap().is_abstract);
    assert_eq!(generator.value_types(), ["V"]);
}

#[test]
fn test_custom_value_type() {
    let generator = assert_compiles("custom valuetype CV { public long x; };");
    assert!(ty(&generator, "CV")
        .1
        .interfaces
        .contains(&RuntimeType::CustomMarshalled.id()));
}

#[test]
fn test_abstract_value_can_not_inherit_concrete() {
    let err = assert_compile_error(
        "valuetype C { public long x; }; abstract valuetype A : C {};",
    );
    assert!(matches!(err.kind, GenErrorKind::InvalidInheritance { ref ty, .. } if ty == "A"));
}

#[test]
fn test_concrete_base_must_come_first() {
    let err = assert_compile_error(
        "abstract valuetype AV {}; valuetype C { public long x; }; \
         valuetype D : AV, C { public long y; };",
    );
    assert!(matches!(err.kind, GenErrorKind::InvalidInheritance { ref ty, .. } if ty == "D"));
}

#[test]
fn test_supports_requires_interface() {
    let err = assert_compile_error(
        "abstract valuetype AV {}; valuetype V supports AV { public long x; };",
    );
    assert!(matches!(err.kind, GenErrorKind::InvalidInheritance { .. }));
}

#[test]
fn test_interface_can_not_inherit_value_type() {
    let err = assert_compile_error("abstract valuetype AV {}; interface I : AV {};");
    assert!(matches!(err.kind, GenErrorKind::InvalidInheritance { ref ty, .. } if ty == "I"));
    let err = assert_compile_error("struct S { long a; }; interface I : S {};");
    assert!(matches!(err.kind, GenErrorKind::InvalidInheritance { .. }));
}

fn assert_forward_kind_mismatch(source: &str, declared: &str, defined: &str) {
    let err = assert_compile_error(source);
    match err.kind {
        GenErrorKind::ForwardKindMismatch {
            declared: d,
            defined: f,
            ..
        } => {
            assert_eq!(d, declared, "{}", source);
            assert_eq!(f, defined, "{}", source);
        }
        other => panic!("unexpected error for `{}`: {:?}", source, other),
    }
}

#[test]
fn test_forward_declaration_kind_must_match_definition() {
    assert_forward_kind_mismatch(
        "interface X; valuetype X { public long a; };",
        "an interface",
        "a value type",
    );
    assert_forward_kind_mismatch("valuetype X; interface X {};", "a value type", "an interface");
    assert_forward_kind_mismatch(
        "abstract valuetype X; valuetype X { public long a; };",
        "an abstract value type",
        "a value type",
    );
    assert_forward_kind_mismatch(
        "valuetype X; abstract valuetype X {};",
        "a value type",
        "an abstract value type",
    );
    assert_forward_kind_mismatch(
        "abstract interface X; interface X {};",
        "an abstract interface",
        "an interface",
    );
}

#[test]
fn test_forward_kind_mismatch_code() {
    let err = assert_compile_error("interface X; valuetype X { public long a; };");
    assert!(!err.is_internal());
    assert_eq!(err.to_diagnostic().code.as_deref(), Some("E0310"));
}

// ============================================================
// Boxed value types
// ============================================================

#[test]
fn test_boxed_value_is_unboxed_in_members() {
    let generator = assert_compiles(
        "valuetype LongBox long; struct S { LongBox v; }; \
         interface I { LongBox get(in LongBox b); };",
    );
    let (_, boxed) = ty(&generator, "LongBox");
    assert!(boxed.is_sealed && boxed.is_created());
    assert_eq!(boxed.parent, Some(RuntimeType::BoxedValueBase.id()));
    assert_eq!(boxed.field("m_val").unwrap().visibility, Visibility::Private);
    assert_eq!(boxed.boxed.as_ref().unwrap().ty, int32());

    let marker = Attribute::BoxedValue("IDL:LongBox:1.0".to_string());
    let v = ty(&generator, "S").1.field("v").unwrap().clone();
    assert_eq!(v.ty, int32());
    assert_eq!(v.attributes, vec![marker.clone()]);
    let get = ty(&generator, "I").1.method("get").unwrap().clone();
    assert_eq!(get.return_param.ty, int32());
    assert_eq!(get.return_param.attributes, vec![marker.clone()]);
    assert_eq!(get.params[0].attributes, vec![marker]);
}

#[test]
fn test_runtime_string_box_is_reused() {
    let generator = assert_compiles(
        "#pragma prefix \"omg.org\"\n\
         module CORBA { valuetype WStringValue wstring; };\n\
         struct T { ::CORBA::WStringValue w; };\n",
    );
    assert!(generator
        .universe()
        .output()
        .find("omg.org.CORBA.WStringValue")
        .is_none());
    let w = ty(&generator, "omg.org.T").1.field("w").unwrap().clone();
    assert_eq!(w.ty, TypeRef::Primitive(Primitive::String));
    assert_eq!(
        w.attributes,
        vec![
            Attribute::StringValue,
            Attribute::WideChar(true),
            Attribute::BoxedValue("IDL:omg.org/CORBA/WStringValue:1.0".to_string()),
        ]
    );
}

// ============================================================
// Errors
// ============================================================

#[test]
fn test_base_not_seen_yet() {
    let err = assert_compile_error("interface B : A {}; interface A {};");
    assert!(matches!(err.kind, GenErrorKind::TypeNotSeen { ref name } if name == "A"));
}

#[test]
fn test_base_only_forward_declared() {
    let err = assert_compile_error("interface A; interface B : A {}; interface A {};");
    assert!(matches!(err.kind, GenErrorKind::OnlyForwardDeclared { ref name } if name == "A"));
}

#[test]
fn test_base_must_be_a_named_type() {
    let err = assert_compile_error("typedef long L; interface B : L {};");
    assert!(matches!(err.kind, GenErrorKind::NotAType { .. }));
}

#[test]
fn test_constant_is_not_a_type() {
    let err = assert_compile_error("const long N = 1; struct S { N x; };");
    assert!(matches!(err.kind, GenErrorKind::NotAType { ref name } if name == "N"));
    assert!(err.help.is_some());
}

#[test]
fn test_unresolved_names() {
    let err = assert_compile_error("struct S { Missing m; };");
    assert!(matches!(
        err.kind,
        GenErrorKind::Scope(ScopeError::UnresolvedName { .. })
    ));
    let err = assert_compile_error("struct S { Nope::T m; };");
    assert!(matches!(
        err.kind,
        GenErrorKind::Scope(ScopeError::ScopeNotFound { ref name }) if name == "Nope"
    ));
}

#[test]
fn test_unsupported_constructs() {
    let cases = [
        ("union U switch (long) { case 1: long a; };", "union"),
        ("struct S { long double d; };", "long double"),
        ("typedef sequence<long, 5> Bounded;", "bounded sequence"),
        ("typedef long Arr[4];", "array declarator"),
        ("struct S { fixed<5, 2> amount; };", "fixed point type"),
        ("native Handle;", "native type"),
    ];
    for (source, expected) in cases {
        let err = assert_compile_error(source);
        assert!(
            matches!(err.kind, GenErrorKind::Unsupported { ref construct } if construct == expected),
            "{}: {:?}",
            source,
            err
        );
    }
}

#[test]
fn test_constants_are_skipped() {
    let generator = assert_compiles("const long MAX = 10; interface I { const long MIN = 0; };");
    let output = generator.universe().output();
    assert!(output.find("MAX").is_none());
    assert!(output.find("I").is_some());
}

// ============================================================
// Several files, libraries and mappings
// ============================================================

#[test]
fn test_same_file_twice() {
    let source = "module M { struct P { long a; }; interface I { struct S { long b; }; void f(in P p); }; };";
    let mut generator = generator();
    generate_into(&mut generator, source).unwrap();
    let count = generator.universe().output().types.len();
    generate_into(&mut generator, source).unwrap();
    assert_eq!(generator.universe().output().types.len(), count);
}

#[test]
fn test_later_file_uses_earlier_types() {
    let mut generator = generator();
    generate_into(&mut generator, "module M { struct P { long a; }; };").unwrap();
    generate_into(
        &mut generator,
        "module M { struct P { long a; }; interface Q { P get(); }; };",
    )
    .unwrap();
    let (p, _) = ty(&generator, "M.P");
    let get = ty(&generator, "M.Q").1.method("get").unwrap().clone();
    assert_eq!(get.return_param.ty, TypeRef::Named(p));
}

#[test]
fn test_skipped_types_expose_typedefs_and_nested_types() {
    let first = "interface I { typedef long Count; Count size(); }; \
                 module M { interface J { struct S { long a; }; }; };";
    let mut generator = generator();
    generate_into(&mut generator, first).unwrap();
    let second = format!("{} struct T {{ I::Count c; M::J::S s; }};", first);
    generate_into(&mut generator, &second).unwrap();
    let (s, _) = ty(&generator, "M.J_package.S");
    let (_, t) = ty(&generator, "T");
    assert_eq!(t.field("c").unwrap().ty, int32());
    assert_eq!(t.field("s").unwrap().ty, TypeRef::Named(s));
}

#[test]
fn test_library_types_are_not_generated() {
    let mut universe = TypeUniverse::new("Test");
    let lib = universe
        .add_reference(library(
            "Lib",
            &[("M.Shared", TypeKind::Interface, Some("IDL:M/Shared:1.0"))],
        ))
        .unwrap();
    let mut generator = Generator::new(universe, MappingTable::new());
    generate_into(
        &mut generator,
        "module M { interface Shared {}; interface User : Shared {}; };",
    )
    .unwrap();
    assert!(generator.universe().output().find("M.Shared").is_none());
    let (_, user) = ty(&generator, "M.User");
    assert!(user.interfaces.contains(&TypeId::new(lib, 0)));
}

#[test]
fn test_library_type_with_other_repository_id_is_ignored() {
    let mut universe = TypeUniverse::new("Test");
    universe
        .add_reference(library(
            "Lib",
            &[("M.Shared", TypeKind::Interface, Some("IDL:other/Shared:1.0"))],
        ))
        .unwrap();
    let mut generator = Generator::new(universe, MappingTable::new());
    generate_into(&mut generator, "module M { interface Shared {}; };").unwrap();
    assert!(generator.universe().output().find("M.Shared").is_some());
}

#[test]
fn test_library_type_without_repository_id_is_ignored() {
    let mut universe = TypeUniverse::new("Test");
    universe
        .add_reference(library("Lib", &[("M.Shared", TypeKind::Interface, None)]))
        .unwrap();
    let mut generator = Generator::new(universe, MappingTable::new());
    generate_into(&mut generator, "module M { interface Shared {}; };").unwrap();
    let (_, shared) = ty(&generator, "M.Shared");
    assert_eq!(shared.repository_id(), Some("IDL:M/Shared:1.0"));
}

#[test]
fn test_custom_mapping() {
    let mut universe = TypeUniverse::new("Test");
    let lib = universe
        .add_reference(library("Sys", &[("Sys.DateTime", TypeKind::Struct, None)]))
        .unwrap();
    let mut mappings = MappingTable::new();
    mappings
        .load_str("map.toml", "[[mapping]]\nidl = \"M.Date\"\ntarget = \"Sys.DateTime\"\n")
        .unwrap();
    let mut generator = Generator::new(universe, mappings);
    generate_into(
        &mut generator,
        "module M { struct Date { long ticks; }; \
         struct Event { Date when; sequence<Date> history; }; };",
    )
    .unwrap();
    let (_, event) = ty(&generator, "M.Event");
    let when = event.field("when").unwrap();
    assert_eq!(when.ty, TypeRef::Named(TypeId::new(lib, 0)));
    let history = event.field("history").unwrap();
    assert_eq!(
        history.ty,
        TypeRef::Array(Box::new(TypeRef::Named(TypeId::new(lib, 0))))
    );
    assert_eq!(history.attributes, vec![Attribute::IdlSequence(0)]);
}

#[test]
fn test_custom_mapping_to_unknown_type() {
    let mut mappings = MappingTable::new();
    mappings
        .load_str("map.toml", "[[mapping]]\nidl = \"Date\"\ntarget = \"Sys.Missing\"\n")
        .unwrap();
    let mut generator = Generator::new(TypeUniverse::new("Test"), mappings);
    let err = generate_into(&mut generator, "struct Date { long t; }; struct E { Date d; };")
        .unwrap_err();
    assert!(matches!(
        err.kind,
        GenErrorKind::UnknownMappingTarget { ref target, .. } if target == "Sys.Missing"
    ));
}
