//! idlc CLI
//!
//! # Usage
//!
//! ```text
//! idlc [OPTIONS] <TARGET> <IDL_FILE>...
//!
//! Arguments:
//!   <TARGET>       Name of the output assembly
//!   <IDL_FILE>...  IDL files to compile, in order
//!
//! Options:
//!   -o, --out-dir <DIR>           Directory the artifact is written to [default: .]
//!   -r, --reference <ARTIFACT>    Artifact whose types can be referenced (repeatable)
//!   -c, --mapping <MAPPING>       Custom mapping file (repeatable)
//!   -d, --define <SYMBOL>         Preprocessor symbol defined for every file (repeatable)
//!   -I, --include <DIR>           Include directory (repeatable)
//!   -v, --verbose                 Increase verbosity (can be repeated)
//!   -q, --quiet                   Suppress non-error output
//!   --color <WHEN>                Control color output [default: auto]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use idlc::{CompileError, Compiler, CompilerOptions, DiagnosticEmitter};

/// Compiles OMG IDL into a type system artifact
#[derive(Parser)]
#[command(name = "idlc")]
#[command(version)]
#[command(about = "OMG IDL compiler", long_about = None)]
struct Cli {
    /// Name of the output assembly
    #[arg(value_name = "TARGET")]
    target: String,

    /// IDL files to compile, in order
    #[arg(value_name = "IDL_FILE", required = true)]
    files: Vec<PathBuf>,

    /// Directory the artifact is written to
    #[arg(short = 'o', long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Artifact whose types can be referenced
    #[arg(short = 'r', long = "reference", value_name = "ARTIFACT")]
    references: Vec<PathBuf>,

    /// Custom mapping file
    #[arg(short = 'c', long = "mapping", value_name = "MAPPING")]
    mappings: Vec<PathBuf>,

    /// Preprocessor symbol defined for every file
    #[arg(short = 'd', long = "define", value_name = "SYMBOL")]
    defines: Vec<String>,

    /// Directory searched by `#include`
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Control when to use colored output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

/// When to use colored output
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Automatically detect if terminal supports colors
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorChoice {
    fn apply(self) {
        match self {
            ColorChoice::Auto => {} // ariadne auto-detects by default
            ColorChoice::Always => std::env::set_var("CLICOLOR_FORCE", "1"),
            ColorChoice::Never => std::env::set_var("NO_COLOR", "1"),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.color.apply();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let options = CompilerOptions {
        target: cli.target,
        output_dir: cli.out_dir,
        include_dirs: cli.include_dirs,
        defines: cli.defines,
        references: cli.references,
        mapping_files: cli.mappings,
    };
    let mut compiler = Compiler::new(options).context("failed to set up the compiler")?;
    for file in &cli.files {
        compiler.compile_file(file)?;
    }
    let summary = compiler.finish().context("failed to write the artifact")?;

    if !cli.quiet {
        println!("Wrote {}", summary.artifact.display());
        if !summary.value_types.is_empty() {
            println!("Value types needing an implementation class:");
            for name in &summary.value_types {
                println!("  {} (implement as {}Impl)", name, name);
            }
        }
    }
    Ok(())
}

/// Print an error; compilation diagnostics are rendered against the
/// preprocessed source they refer to.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<CompileError>() {
        Some(CompileError::Diagnostics {
            file,
            text,
            diagnostics,
        }) => {
            let emitter = DiagnosticEmitter::new(file, text);
            for diagnostic in diagnostics {
                emitter.emit(diagnostic);
            }
            eprintln!("error: {}", err);
        }
        Some(compile_error @ CompileError::Preprocess(_)) => {
            for diagnostic in compile_error.to_diagnostics() {
                match &diagnostic.code {
                    Some(code) => eprintln!("error[{}]: {}", code, diagnostic.message),
                    None => eprintln!("error: {}", diagnostic.message),
                }
            }
        }
        _ => eprintln!("error: {:#}", err),
    }
}
