//! End-to-end integration tests for idlc.
//!
//! These tests write IDL files to a temporary directory, run the compiler
//! driver (or the `idlc` binary) over them and inspect the persisted
//! artifact:
//! 1. Single-file scenarios produce the expected types
//! 2. Several files in one invocation share their types
//! 3. Artifacts load back as references for later invocations
//! 4. The CLI reports success, value types and failures

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use idlc::typesys::{Attribute, Primitive, TypeKind, TypeRef, TypeSysError};
use idlc::{Assembly, CompileError, Compiler, CompilerOptions, TypeDef, TypeUniverse};
use tempfile::TempDir;

// ============================================================================
// Test Infrastructure
// ============================================================================

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn options(dir: &TempDir, target: &str) -> CompilerOptions {
    CompilerOptions {
        target: target.to_string(),
        output_dir: dir.path().join("out"),
        ..CompilerOptions::default()
    }
}

/// Compile `files` in order and load the written artifact back.
fn compile(options: CompilerOptions, files: &[PathBuf]) -> (Assembly, Vec<String>) {
    let mut compiler = Compiler::new(options).unwrap();
    for file in files {
        if let Err(err) = compiler.compile_file(file) {
            panic!("compiling {} failed: {:#?}", file.display(), err);
        }
    }
    let summary = compiler.finish().unwrap();
    (Assembly::load(&summary.artifact).unwrap(), summary.value_types)
}

fn get<'a>(assembly: &'a Assembly, name: &str) -> &'a TypeDef {
    let index = assembly
        .find(name)
        .unwrap_or_else(|| panic!("type `{}` missing from `{}`", name, assembly.name));
    &assembly.types[index as usize]
}

// ============================================================================
// Single files
// ============================================================================

#[test]
fn test_forward_declared_interface() {
    let dir = TempDir::new().unwrap();
    let idl = write(
        dir.path(),
        "foo.idl",
        "interface Foo;\ninterface Foo {\n  void op(in long a, inout string b);\n};\n",
    );
    let (assembly, value_types) = compile(options(&dir, "Scenario"), &[idl]);

    let foo = get(&assembly, "Foo");
    assert_eq!(foo.kind, TypeKind::Interface);
    assert!(foo.is_created());
    assert_eq!(foo.methods.len(), 1);
    let op = &foo.methods[0];
    assert!(op.is_abstract);
    assert_eq!(op.return_param.ty, TypeRef::Void);
    assert_eq!(op.params.len(), 2);
    assert_eq!(op.params[0].ty, TypeRef::Primitive(Primitive::Int32));
    assert!(matches!(op.params[1].ty, TypeRef::ByRef(_)));
    assert!(value_types.is_empty());
}

#[test]
fn test_struct_in_module() {
    let dir = TempDir::new().unwrap();
    let idl = write(dir.path(), "pair.idl", "module M {\n  struct Pair { long a; long b; };\n};\n");
    let (assembly, _) = compile(options(&dir, "Scenario"), &[idl]);

    let pair = get(&assembly, "M.Pair");
    assert_eq!(pair.kind, TypeKind::Struct);
    assert!(pair.attributes.contains(&Attribute::IdlStruct));
    let fields: Vec<_> = pair.fields.iter().map(|f| (f.name.as_str(), &f.ty)).collect();
    let int32 = TypeRef::Primitive(Primitive::Int32);
    assert_eq!(fields, [("a", &int32), ("b", &int32)]);
    assert_eq!(assembly.modules[pair.module as usize].name, "_Scenario_M");
}

#[test]
fn test_enum() {
    let dir = TempDir::new().unwrap();
    let idl = write(dir.path(), "color.idl", "enum Color { RED, GREEN, BLUE };\n");
    let (assembly, _) = compile(options(&dir, "Scenario"), &[idl]);

    let color = get(&assembly, "Color");
    assert_eq!(color.kind, TypeKind::Enum);
    assert!(color.attributes.contains(&Attribute::IdlEnum));
    let literals: Vec<_> = color
        .fields
        .iter()
        .filter(|f| f.is_literal)
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(literals, ["RED", "GREEN", "BLUE"]);
}

#[test]
fn test_value_types_are_reported() {
    let dir = TempDir::new().unwrap();
    let idl = write(
        dir.path(),
        "values.idl",
        "module Shop {\n\
         \x20 interface Priced { double price(); };\n\
         \x20 valuetype Item supports Priced { public string name; private long stock; };\n\
         \x20 valuetype Label string;\n\
         };\n",
    );
    let (assembly, value_types) = compile(options(&dir, "Shop"), &[idl]);
    assert_eq!(value_types, ["Shop.Item"]);
    let item = get(&assembly, "Shop.Item");
    assert!(item.field("m_stock").is_some());
    assert!(item.method("price").is_some());
    assert!(get(&assembly, "Shop.Label").boxed.is_some());
}

#[test]
fn test_syntax_error_is_reported_against_preprocessed_text() {
    let dir = TempDir::new().unwrap();
    let idl = write(dir.path(), "bad.idl", "#define X\ninterface I { void f( };\n");
    let mut compiler = Compiler::new(options(&dir, "Bad")).unwrap();
    match compiler.compile_file(&idl) {
        Err(CompileError::Diagnostics { text, diagnostics, .. }) => {
            assert!(!text.contains("#define"));
            assert!(diagnostics.iter().all(|d| d.is_error()));
        }
        other => panic!("expected diagnostics, got {:?}", other),
    }
}

// ============================================================================
// Several files
// ============================================================================

#[test]
fn test_second_file_reuses_types_of_the_first() {
    let dir = TempDir::new().unwrap();
    let common = write(
        dir.path(),
        "common.idl",
        "#ifndef COMMON_IDL\n#define COMMON_IDL\nmodule M { struct P { long a; }; };\n#endif\n",
    );
    let user = write(
        dir.path(),
        "user.idl",
        "#include \"common.idl\"\nmodule M { interface Q { P get(); }; };\n",
    );
    let (assembly, _) = compile(options(&dir, "Multi"), &[common, user]);

    let p = assembly.find("M.P").unwrap();
    assert_eq!(
        assembly.types.iter().filter(|t| t.full_name == "M.P").count(),
        1
    );
    let get_p = get(&assembly, "M.Q").method("get").unwrap();
    assert_eq!(get_p.return_param.ty, TypeRef::Named(idlc::TypeId::new(0, p)));
}

#[test]
fn test_same_file_twice() {
    let dir = TempDir::new().unwrap();
    let idl = write(
        dir.path(),
        "twice.idl",
        "module M { interface I { struct S { long a; }; void f(in S s); }; };\n",
    );
    let (assembly, _) = compile(options(&dir, "Twice"), &[idl.clone(), idl]);
    assert_eq!(assembly.types.len(), 2);
    assert!(assembly.find("M.I_package.S").is_some());
}

#[test]
fn test_include_directories() {
    let dir = TempDir::new().unwrap();
    let include = dir.path().join("include");
    fs::create_dir_all(&include).unwrap();
    write(&include, "base.idl", "interface Base {};\n");
    let idl = write(dir.path(), "main.idl", "#include <base.idl>\ninterface Derived : Base {};\n");
    let (assembly, _) = compile(
        CompilerOptions {
            include_dirs: vec![include],
            ..options(&dir, "Inc")
        },
        &[idl],
    );
    let base = assembly.find("Base").unwrap();
    assert!(get(&assembly, "Derived")
        .interfaces
        .contains(&idlc::TypeId::new(0, base)));
}

// ============================================================================
// Artifacts as references
// ============================================================================

/// Build `Lib` with one interface and return the artifact path.
fn build_library(dir: &TempDir) -> PathBuf {
    let idl = write(
        dir.path(),
        "lib.idl",
        "module Lib { interface Service { long ping(); }; struct Stamp { long long ticks; }; };\n",
    );
    let mut compiler = Compiler::new(options(dir, "Lib")).unwrap();
    compiler.compile_file(&idl).unwrap();
    compiler.finish().unwrap().artifact
}

#[test]
fn test_types_from_references_are_not_regenerated() {
    let dir = TempDir::new().unwrap();
    let lib = build_library(&dir);
    let lib_idl = dir.path().join("lib.idl");
    let app = write(
        dir.path(),
        "app.idl",
        &format!(
            "#include \"{}\"\nmodule App {{ interface Client : ::Lib::Service {{ ::Lib::Stamp last(); }}; }};\n",
            lib_idl.file_name().unwrap().to_string_lossy()
        ),
    );
    let (assembly, _) = compile(
        CompilerOptions {
            references: vec![lib.clone()],
            ..options(&dir, "App")
        },
        &[app],
    );

    assert!(assembly.find("Lib.Service").is_none());
    assert_eq!(assembly.references, ["idlc.runtime", "Lib"]);
    let client = get(&assembly, "App.Client");
    let last = client.method("last").unwrap();
    assert!(matches!(last.return_param.ty, TypeRef::Named(id) if id.assembly == 2));

    // Loading the application artifact needs its references first.
    let mut universe = TypeUniverse::new("Check");
    let app_artifact = dir.path().join("out").join("App.idlasm.json");
    assert!(matches!(
        universe.load_reference(&app_artifact),
        Err(TypeSysError::MissingReference { .. })
    ));
    let lib_index = universe.load_reference(&lib).unwrap();
    let app_index = universe.load_reference(&app_artifact).unwrap();
    let app_assembly = &universe.assemblies()[app_index as usize];
    let client = &app_assembly.types[app_assembly.find("App.Client").unwrap() as usize];
    let service = universe.get(client.interfaces[0]).unwrap();
    assert_eq!(service.full_name, "Lib.Service");
    assert_eq!(client.interfaces[0].assembly, lib_index);
}

#[test]
fn test_custom_mapping_file() {
    let dir = TempDir::new().unwrap();
    let lib = build_library(&dir);
    let mapping = write(
        dir.path(),
        "map.toml",
        "[[mapping]]\nidl = \"App.Time\"\ntarget = \"Lib.Stamp\"\n",
    );
    let app = write(
        dir.path(),
        "app.idl",
        "module App { struct Time { long t; }; interface Clock { Time now(); }; };\n",
    );
    let (assembly, _) = compile(
        CompilerOptions {
            references: vec![lib],
            mapping_files: vec![mapping],
            ..options(&dir, "App")
        },
        &[app],
    );
    let now = get(&assembly, "App.Clock").method("now").unwrap();
    let TypeRef::Named(id) = now.return_param.ty else {
        panic!("expected a named type");
    };
    assert_eq!(id.assembly, 2);
}

// ============================================================================
// CLI
// ============================================================================

fn idlc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_idlc"))
}

#[test]
fn test_cli_compiles_and_lists_value_types() {
    let dir = TempDir::new().unwrap();
    let idl = write(dir.path(), "v.idl", "valuetype Point { public long x; public long y; };\n");
    let out = dir.path().join("out");
    let output = idlc()
        .arg("-q")
        .arg("Geo")
        .arg(&idl)
        .arg("-o")
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(out.join("Geo.idlasm.json").exists());

    let output = idlc().arg("Geo").arg(&idl).arg("-o").arg(&out).output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PointImpl"), "{}", stdout);
}

#[test]
fn test_cli_fails_on_invalid_idl() {
    let dir = TempDir::new().unwrap();
    let idl = write(dir.path(), "bad.idl", "interface B : Missing {};\n");
    let output = idlc()
        .args(["--color", "never", "Bad"])
        .arg(&idl)
        .arg("-o")
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Missing"), "{}", stderr);
    assert!(!dir.path().join("Bad.idlasm.json").exists());
}
