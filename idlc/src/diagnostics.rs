//! Diagnostic reporting infrastructure.
//!
//! Every failure the compiler can report is turned into a [`Diagnostic`]
//! before it reaches the user. Diagnostics are rendered with `ariadne`
//! against the preprocessed text of the file being compiled.
//!
//! # Error Codes
//!
//! - **E0001-E0099**: Preprocessor and lexer errors
//! - **E0100-E0199**: Syntax errors
//! - **E0200-E0299**: Scope / symbol table errors
//! - **E0300-E0399**: Type generation errors
//! - **E0900-E0999**: Internal compiler errors

use crate::span::Span;
use ariadne::{Color, Config, Label, Report, ReportKind, Source};

/// Compiler error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // ============================================================
    // Preprocessor / lexer errors (E0001-E0099)
    // ============================================================
    /// Unexpected character in source.
    UnexpectedCharacter = 1,
    /// Unclosed block comment.
    UnclosedBlockComment = 2,
    /// Unclosed string or character literal.
    UnclosedString = 3,
    /// Integer literal out of range.
    InvalidInteger = 4,
    /// Malformed preprocessor directive.
    IllegalDirective = 10,
    /// Unknown preprocessor directive.
    UnknownDirective = 11,
    /// A preprocessor symbol was defined twice.
    SymbolRedefined = 12,
    /// `#else`/`#endif` without `#ifdef`, or a missing `#endif`.
    UnbalancedConditional = 13,
    /// Included file not found.
    IncludeNotFound = 14,
    /// A file includes itself, directly or indirectly.
    IncludeCycle = 15,

    // ============================================================
    // Parser errors (E0100-E0199)
    // ============================================================
    /// Unexpected token.
    UnexpectedToken = 100,
    /// Unexpected end of file.
    UnexpectedEof = 101,
    /// Expected identifier.
    ExpectedIdentifier = 102,
    /// Expected type.
    ExpectedType = 103,
    /// Expected constant expression.
    ExpectedExpression = 104,
    /// Malformed pragma.
    InvalidPragma = 105,

    // ============================================================
    // Scope errors (E0200-E0299)
    // ============================================================
    /// A name is already fully defined in this scope.
    Redefinition = 200,
    /// A typedef name clashes with an existing name.
    TypedefConflict = 201,
    /// A repository ID was given twice for the same name.
    DuplicatePragmaId = 202,
    /// A forward declaration never received a definition.
    ForwardNotCompleted = 203,

    // ============================================================
    // Generation errors (E0300-E0399)
    // ============================================================
    /// A scoped name could not be resolved.
    UnresolvedName = 300,
    /// A qualifier of a scoped name does not denote a scope.
    ScopeNotFound = 301,
    /// A type is used before it is declared.
    TypeNotSeen = 302,
    /// A type is only forward declared where a definition is needed.
    OnlyForwardDeclared = 303,
    /// Illegal value type inheritance shape.
    InvalidInheritance = 304,
    /// The construct is not supported by this compiler.
    Unsupported = 305,
    /// The scoped name does not denote a type.
    NotAType = 306,
    /// A type was registered twice.
    AlreadyDefined = 307,
    /// A custom mapping refers to an unknown target type.
    UnknownMappingTarget = 308,
    /// A repository ID did not match a candidate type.
    RepositoryIdMismatch = 309,
    /// A definition completes a forward declaration of another kind.
    ForwardKindMismatch = 310,

    // ============================================================
    // Internal errors (E0900-E0999)
    // ============================================================
    /// An internal invariant was violated.
    InternalError = 900,
}

impl ErrorCode {
    /// Get the formatted error code string (e.g., "E0001").
    pub fn as_str(&self) -> String {
        format!("E{:04}", *self as u16)
    }

    /// Get a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::UnexpectedCharacter => "unexpected character in source",
            ErrorCode::UnclosedBlockComment => "unclosed block comment",
            ErrorCode::UnclosedString => "unclosed literal",
            ErrorCode::InvalidInteger => "invalid integer literal",
            ErrorCode::IllegalDirective => "illegal preprocessor directive",
            ErrorCode::UnknownDirective => "unknown preprocessor directive",
            ErrorCode::SymbolRedefined => "preprocessor symbol redefined",
            ErrorCode::UnbalancedConditional => "unbalanced conditional directive",
            ErrorCode::IncludeNotFound => "included file not found",
            ErrorCode::IncludeCycle => "recursive include",
            ErrorCode::UnexpectedToken => "unexpected token",
            ErrorCode::UnexpectedEof => "unexpected end of file",
            ErrorCode::ExpectedIdentifier => "expected identifier",
            ErrorCode::ExpectedType => "expected type",
            ErrorCode::ExpectedExpression => "expected constant expression",
            ErrorCode::InvalidPragma => "invalid pragma",
            ErrorCode::Redefinition => "name redefined in scope",
            ErrorCode::TypedefConflict => "typedef name already in use",
            ErrorCode::DuplicatePragmaId => "repository id already assigned",
            ErrorCode::ForwardNotCompleted => "forward declaration without definition",
            ErrorCode::UnresolvedName => "scoped name not resolvable",
            ErrorCode::ScopeNotFound => "scope not found",
            ErrorCode::TypeNotSeen => "type not seen before",
            ErrorCode::OnlyForwardDeclared => "type only forward declared",
            ErrorCode::InvalidInheritance => "invalid inheritance",
            ErrorCode::Unsupported => "construct not supported",
            ErrorCode::NotAType => "name does not denote a type",
            ErrorCode::AlreadyDefined => "type already defined",
            ErrorCode::UnknownMappingTarget => "unknown custom mapping target",
            ErrorCode::RepositoryIdMismatch => "repository id mismatch",
            ErrorCode::ForwardKindMismatch => "definition does not match forward declaration",
            ErrorCode::InternalError => "internal compiler error",
        }
    }

    /// Get a help message suggesting how to fix the error.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            ErrorCode::UnclosedBlockComment => Some("add `*/` to close the block comment"),
            ErrorCode::UnbalancedConditional => {
                Some("every `#ifdef`/`#ifndef` needs exactly one matching `#endif`")
            }
            ErrorCode::ForwardNotCompleted => {
                Some("provide a full definition for the forward declared type in the same file")
            }
            ErrorCode::OnlyForwardDeclared => {
                Some("move the full definition in front of the declaration inheriting from it")
            }
            ErrorCode::InvalidInheritance => Some(
                "a concrete value type may only appear first; abstract value types and \
                 `supports` clauses may not name concrete value types",
            ),
            ErrorCode::InternalError => Some("this is a bug in idlc, please report it"),
            _ => None,
        }
    }
}

/// The kind of diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An error that prevents compilation.
    Error,
    /// A warning that doesn't prevent compilation.
    Warning,
    /// An informational note.
    Note,
}

impl DiagnosticKind {
    fn to_report_kind(self) -> ReportKind<'static> {
        match self {
            DiagnosticKind::Error => ReportKind::Error,
            DiagnosticKind::Warning => ReportKind::Warning,
            DiagnosticKind::Note => ReportKind::Advice,
        }
    }

    fn color(self) -> Color {
        match self {
            DiagnosticKind::Error => Color::Red,
            DiagnosticKind::Warning => Color::Yellow,
            DiagnosticKind::Note => Color::Cyan,
        }
    }
}

/// A compiler diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The kind of diagnostic.
    pub kind: DiagnosticKind,
    /// The error code (e.g., "E0001").
    pub code: Option<String>,
    /// The main error message.
    pub message: String,
    /// The primary span where the error occurred.
    pub span: Span,
    /// Additional labels pointing to relevant code.
    pub labels: Vec<DiagnosticLabel>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code: None,
            message: message.into(),
            span,
            labels: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            ..Self::error(message, span)
        }
    }

    /// Set the error code. Adds the code's help message if it has one.
    pub fn with_error_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code.as_str());
        if let Some(help) = code.help() {
            self.suggestions.push(help.to_string());
        }
        self
    }

    /// Add a note pointing at another location.
    pub fn with_note(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(DiagnosticLabel {
            span,
            message: message.into(),
        });
        self
    }

    /// Add a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }
}

/// A secondary label in a diagnostic.
#[derive(Debug, Clone)]
pub struct DiagnosticLabel {
    pub span: Span,
    pub message: String,
}

/// Renders diagnostics for one source text.
pub struct DiagnosticEmitter<'a> {
    filename: &'a str,
    source: &'a str,
}

impl<'a> DiagnosticEmitter<'a> {
    pub fn new(filename: &'a str, source: &'a str) -> Self {
        Self { filename, source }
    }

    fn build(
        &self,
        diagnostic: &Diagnostic,
        color: bool,
    ) -> Report<'a, (&'a str, std::ops::Range<usize>)> {
        let mut builder = Report::build(
            diagnostic.kind.to_report_kind(),
            self.filename,
            diagnostic.span.start,
        )
        .with_config(Config::default().with_color(color));

        let message = match &diagnostic.code {
            Some(code) => format!("[{}] {}", code, diagnostic.message),
            None => diagnostic.message.clone(),
        };
        builder = builder.with_message(message);

        // Synthesized spans carry no location; don't point at offset 0.
        if diagnostic.span.start_line != 0 {
            builder = builder.with_label(
                Label::new((self.filename, diagnostic.span.start..diagnostic.span.end))
                    .with_color(diagnostic.kind.color())
                    .with_message(&diagnostic.message),
            );
        }

        for label in &diagnostic.labels {
            builder = builder.with_label(
                Label::new((self.filename, label.span.start..label.span.end))
                    .with_color(Color::Blue)
                    .with_message(&label.message),
            );
        }

        if !diagnostic.suggestions.is_empty() {
            builder = builder.with_help(diagnostic.suggestions.join("\n"));
        }

        builder.finish()
    }

    /// Emit a diagnostic to stderr.
    pub fn emit(&self, diagnostic: &Diagnostic) {
        let report = self.build(diagnostic, true);
        if let Err(err) = report.eprint((self.filename, Source::from(self.source))) {
            tracing::warn!("failed to write diagnostic: {}", err);
        }
    }

    /// Render a diagnostic without colors into a string.
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let report = self.build(diagnostic, false);
        let mut out = Vec::new();
        if report
            .write((self.filename, Source::from(self.source)), &mut out)
            .is_err()
        {
            return diagnostic.message.clone();
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}
