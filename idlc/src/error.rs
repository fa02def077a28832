//! Compilation errors.
//!
//! Generation failures are [`GenError`]s: a [`GenErrorKind`] plus the span
//! of the offending declaration. They are all fatal; [`GenError::is_internal`]
//! tells broken user input apart from a violated compiler invariant.

use thiserror::Error;

use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::mapping::MappingError;
use crate::preprocess::PreprocessError;
use crate::span::Span;
use crate::symtab::ScopeError;
use crate::typesys::TypeSysError;

/// Result type alias for generation.
///
/// `GenError` is boxed to keep the `Err` path small.
pub type GenResult<T> = Result<T, Box<GenError>>;

/// A fatal error raised while building the symbol table or generating types.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind}")]
pub struct GenError {
    pub kind: GenErrorKind,
    pub span: Span,
    pub help: Option<String>,
}

/// The kind of generation error.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenErrorKind {
    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error("type not seen before: `{name}`")]
    TypeNotSeen { name: String },

    #[error("type only forward declared: `{name}`, a full definition is required")]
    OnlyForwardDeclared { name: String },

    #[error("invalid inheritance for `{ty}`: {reason}")]
    InvalidInheritance { ty: String, reason: String },

    #[error("{construct} not supported by this compiler")]
    Unsupported { construct: String },

    #[error("`{name}` does not denote a type")]
    NotAType { name: String },

    #[error("type `{name}` is already defined")]
    AlreadyDefined { name: String },

    #[error("`{name}` was forward declared as {declared} but defined as {defined}")]
    ForwardKindMismatch {
        name: String,
        declared: &'static str,
        defined: &'static str,
    },

    #[error("custom mapping for `{idl}` names unknown type `{target}`")]
    UnknownMappingTarget { idl: String, target: String },

    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl GenError {
    pub fn new(kind: GenErrorKind, span: Span) -> Self {
        Self {
            kind,
            span,
            help: None,
        }
    }

    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        Self::new(GenErrorKind::Internal(message.into()), span)
    }

    /// Wrap this error in a `Box` and return as `Err`.
    pub fn into_err<T>(self) -> GenResult<T> {
        Err(Box::new(self))
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Whether the error is a violated compiler invariant rather than a
    /// problem with the input.
    pub fn is_internal(&self) -> bool {
        self.code() == ErrorCode::InternalError
    }

    pub fn code(&self) -> ErrorCode {
        match &self.kind {
            GenErrorKind::Scope(err) => err.code(),
            GenErrorKind::TypeNotSeen { .. } => ErrorCode::TypeNotSeen,
            GenErrorKind::OnlyForwardDeclared { .. } => ErrorCode::OnlyForwardDeclared,
            GenErrorKind::InvalidInheritance { .. } => ErrorCode::InvalidInheritance,
            GenErrorKind::Unsupported { .. } => ErrorCode::Unsupported,
            GenErrorKind::NotAType { .. } => ErrorCode::NotAType,
            GenErrorKind::AlreadyDefined { .. } => ErrorCode::AlreadyDefined,
            GenErrorKind::UnknownMappingTarget { .. } => ErrorCode::UnknownMappingTarget,
            GenErrorKind::ForwardKindMismatch { .. } => ErrorCode::ForwardKindMismatch,
            GenErrorKind::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diagnostic =
            Diagnostic::error(self.kind.to_string(), self.span).with_error_code(self.code());
        if let Some(help) = &self.help {
            diagnostic = diagnostic.with_suggestion(help.clone());
        }
        diagnostic
    }
}

/// Any error that stops a compiler invocation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    /// Syntax or generation errors, reported against the preprocessed text
    /// of `file`.
    #[error("{file}: compilation failed with {} error(s)", diagnostics.len())]
    Diagnostics {
        file: String,
        text: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[error(transparent)]
    TypeSys(#[from] TypeSysError),

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl CompileError {
    /// Diagnostics for the errors that have no source text to point into.
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            CompileError::Preprocess(err) => vec![err.to_diagnostic()],
            CompileError::Diagnostics { diagnostics, .. } => diagnostics.clone(),
            other => vec![Diagnostic::error(other.to_string(), Span::dummy())],
        }
    }
}
