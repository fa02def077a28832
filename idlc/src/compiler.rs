//! The compiler driver.
//!
//! A [`Compiler`] runs the whole pipeline for each input file in turn:
//!
//! ```text
//! preprocess -> lex/parse -> symbol table -> generate
//! ```
//!
//! Every file is committed to the shared output assembly before the next one
//! starts, so later files reuse the types of earlier ones. [`Compiler::finish`]
//! writes the assembly once at the end.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::CompileError;
use crate::generator::Generator;
use crate::mapping::MappingTable;
use crate::parser::Parser;
use crate::preprocess::Preprocessor;
use crate::symtab;
use crate::typesys::TypeUniverse;

/// Settings of one compiler invocation.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Name of the output assembly.
    pub target: String,
    /// Directory the artifact is written to.
    pub output_dir: PathBuf,
    /// Directories searched by `#include`.
    pub include_dirs: Vec<PathBuf>,
    /// Preprocessor symbols defined for every file.
    pub defines: Vec<String>,
    /// Artifacts whose types can be referenced.
    pub references: Vec<PathBuf>,
    /// Custom mapping files.
    pub mapping_files: Vec<PathBuf>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            target: "idl".to_string(),
            output_dir: PathBuf::from("."),
            include_dirs: Vec::new(),
            defines: Vec::new(),
            references: Vec::new(),
            mapping_files: Vec::new(),
        }
    }
}

/// Outcome of a successful invocation.
#[derive(Debug, Clone)]
pub struct CompileSummary {
    /// Path of the written artifact.
    pub artifact: PathBuf,
    /// Full names of the concrete value types, which need an implementation
    /// class written by hand.
    pub value_types: Vec<String>,
}

pub struct Compiler {
    preprocessor: Preprocessor,
    generator: Generator,
    output_dir: PathBuf,
}

impl Compiler {
    /// Set up an invocation: load the referenced artifacts and the custom
    /// mappings.
    pub fn new(options: CompilerOptions) -> Result<Self, CompileError> {
        let mut universe = TypeUniverse::new(&options.target);
        for reference in &options.references {
            universe.load_reference(reference)?;
        }
        let mut mappings = MappingTable::new();
        for path in &options.mapping_files {
            mappings.load(path)?;
        }
        debug!(
            target = %options.target,
            references = options.references.len(),
            mappings = mappings.len(),
            "compiler initialized"
        );
        Ok(Self {
            preprocessor: Preprocessor::new(options.include_dirs, &options.defines),
            generator: Generator::new(universe, mappings),
            output_dir: options.output_dir,
        })
    }

    pub fn compile_file(&mut self, path: &Path) -> Result<(), CompileError> {
        let text = self.preprocessor.process_file(path)?;
        self.compile_text(path.display().to_string(), text)
    }

    /// Compile in-memory IDL text; `name` identifies it in diagnostics.
    pub fn compile_source(&mut self, name: &str, source: &str) -> Result<(), CompileError> {
        let text = self.preprocessor.process_str(name, source, None)?;
        self.compile_text(name.to_string(), text)
    }

    fn compile_text(&mut self, file: String, text: String) -> Result<(), CompileError> {
        let mut parser = Parser::new(&text);
        let parsed = parser.parse_specification();
        for warning in parser.take_warnings() {
            warn!(file = %file, "{}", warning.message);
        }
        let spec = match parsed {
            Ok(spec) => spec,
            Err(diagnostics) => {
                return Err(CompileError::Diagnostics {
                    file,
                    text,
                    diagnostics,
                })
            }
        };

        let generated =
            symtab::collect(&spec).and_then(|table| self.generator.generate(&spec, table));
        if let Err(err) = generated {
            return Err(CompileError::Diagnostics {
                file,
                text,
                diagnostics: vec![err.to_diagnostic()],
            });
        }
        info!(file = %file, "compiled");
        Ok(())
    }

    pub fn universe(&self) -> &TypeUniverse {
        self.generator.universe()
    }

    /// Write the output assembly.
    pub fn finish(self) -> Result<CompileSummary, CompileError> {
        let (universe, value_types) = self.generator.into_parts();
        let artifact = universe.save(&self.output_dir)?;
        info!(
            artifact = %artifact.display(),
            types = universe.output().types.len(),
            "artifact written"
        );
        Ok(CompileSummary {
            artifact,
            value_types,
        })
    }
}
