//! # idlc
//!
//! A compiler for OMG IDL. It turns interface, value type, struct, enum and
//! exception declarations into an in-memory type system model (assemblies
//! made of modules holding typed declarations with custom attributes) and
//! persists the result as one artifact per invocation.
//!
//! ## Compiler Pipeline
//!
//! ```text
//! Source -> Preprocessor -> Lexer -> Parser -> AST -> Symbol table -> Generator -> Assembly
//! ```
//!
//! Several files can be compiled in one invocation. They are processed in
//! order and each one is complete before the next starts; a type declared
//! again by a later file (typically through `#include`) is reused, not
//! regenerated.
//!
//! ## Quick Start
//!
//! ```rust
//! use idlc::{Compiler, CompilerOptions};
//!
//! let mut compiler = Compiler::new(CompilerOptions {
//!     target: "Demo".to_string(),
//!     ..CompilerOptions::default()
//! })?;
//! compiler.compile_source("demo.idl", "module M { struct Pair { long a; long b; }; };")?;
//! assert!(compiler.universe().output().find("M.Pair").is_some());
//! # Ok::<(), idlc::CompileError>(())
//! ```
//!
//! ### Error Handling
//!
//! Syntax errors come back as structured diagnostics with error codes:
//!
//! ```rust
//! use idlc::{Parser, diagnostics::DiagnosticEmitter};
//!
//! let source = "interface I { void f( };";
//! let mut parser = Parser::new(source);
//!
//! if let Err(errors) = parser.parse_specification() {
//!     let emitter = DiagnosticEmitter::new("example.idl", source);
//!     for error in &errors {
//!         eprintln!("{}", emitter.render(error));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`preprocess`] - `#include`, `#define` and conditional blocks
//! - [`lexer`] - Tokenization
//! - [`parser`] - Recursive-descent parser producing the [`ast`]
//! - [`symtab`] - Scopes, symbols, repository ids and name resolution
//! - [`typesys`] - The target type system model and its persistence
//! - [`registry`] - Per-file state of the types being generated
//! - [`modules`] - Assignment of scopes to output modules
//! - [`mapping`] - Custom mappings of IDL types to existing types
//! - [`generator`] - AST to type system generation
//! - [`compiler`] - The driver running the pipeline
//! - [`diagnostics`] - Error reporting infrastructure
//! - [`span`] - Source location tracking

pub mod ast;
pub mod compiler;
pub mod diagnostics;
pub mod error;
pub mod generator;
pub mod lexer;
pub mod mapping;
pub mod modules;
pub mod parser;
pub mod preprocess;
pub mod registry;
pub mod span;
pub mod symtab;
pub mod typesys;

// Re-export commonly used types
pub use compiler::{CompileSummary, Compiler, CompilerOptions};
pub use diagnostics::{Diagnostic, DiagnosticEmitter, DiagnosticKind, ErrorCode};
pub use error::{CompileError, GenError, GenErrorKind, GenResult};
pub use generator::Generator;
pub use lexer::{Lexer, Token, TokenKind};
pub use mapping::MappingTable;
pub use parser::Parser;
pub use span::{Span, Spanned};
pub use typesys::{Assembly, TypeDef, TypeId, TypeUniverse};
