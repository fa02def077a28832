//! Parser for OMG IDL.
//!
//! A hand-written recursive descent parser over the token stream produced by
//! [`Lexer`]. The grammar follows CORBA 3.0 IDL restricted to what this
//! compiler can map; constructs it cannot map are still parsed so the
//! generator can report them precisely.
//!
//! # Parser Architecture
//!
//! - `item` - definitions: interfaces, value types, structs, exceptions, ...
//! - `types` - type specifiers, scoped names, declarators and constant
//!   expressions
//!
//! # Example
//!
//! ```rust
//! use idlc::Parser;
//! use idlc::ast::Definition;
//!
//! let mut parser = Parser::new("module M { interface I { void ping(); }; };");
//! let spec = parser.parse_specification().expect("parse failed");
//!
//! match &spec.definitions[0] {
//!     Definition::Module(m) => assert_eq!(m.definitions.len(), 1),
//!     _ => panic!("expected module"),
//! }
//! ```
//!
//! # Error Recovery
//!
//! The parser implements panic-mode error recovery: after the first error in
//! a definition it skips ahead to the next `;`, closing `}` or definition
//! keyword and resumes from there, so one run reports several independent
//! syntax errors.

mod item;
mod types;


use crate::ast::*;
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::span::{Span, Spanned};

/// Format a list of expected items in natural English.
fn format_expected_list(items: &[&str]) -> String {
    match items.split_last() {
        None => String::new(),
        Some((last, [])) => last.to_string(),
        Some((last, [first])) => format!("{} or {}", first, last),
        Some((last, rest)) => format!("{}, or {}", rest.join(", "), last),
    }
}

/// The IDL parser.
pub struct Parser<'src> {
    /// The lexer producing tokens.
    lexer: Lexer<'src>,
    /// The source text (for extracting lexemes).
    source: &'src str,
    /// Current token.
    current: Token,
    /// Next token (for one-token lookahead).
    next: Token,
    /// Previous token.
    previous: Token,
    /// Accumulated errors.
    errors: Vec<Diagnostic>,
    /// Accumulated warnings; these never fail the parse.
    warnings: Vec<Diagnostic>,
    /// Whether we're in panic mode (error recovery).
    panic_mode: bool,
    /// Pending `>` from splitting a `>>` that closes two nested sequences.
    pending_gt: Option<Span>,
    /// Nesting depth of `<...>` template parameter lists. While positive, `>>`
    /// is never a shift operator.
    angle_depth: u32,
}

impl<'src> Parser<'src> {
    /// Create a new parser for the given (preprocessed) source.
    pub fn new(source: &'src str) -> Self {
        let mut parser = Self {
            lexer: Lexer::new(source),
            source,
            current: Token::dummy(TokenKind::Eof),
            next: Token::dummy(TokenKind::Eof),
            previous: Token::dummy(TokenKind::Error),
            errors: Vec::new(),
            warnings: Vec::new(),
            panic_mode: false,
            pending_gt: None,
            angle_depth: 0,
        };
        parser.current = parser.lex_token();
        parser.next = parser.lex_token();
        parser
    }

    /// Parse a complete translation unit.
    #[must_use = "parsing has no effect if the result is not used"]
    pub fn parse_specification(&mut self) -> Result<Specification, Vec<Diagnostic>> {
        let start = self.current.span;
        let mut definitions = Vec::new();

        while !self.is_at_end() {
            if let Some(definition) = self.parse_definition() {
                definitions.push(definition);
            }
        }

        if self.errors.is_empty() {
            Ok(Specification {
                definitions,
                span: start.merge(self.previous.span),
            })
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    /// Take ownership of any accumulated warnings.
    pub fn take_warnings(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.warnings)
    }

    /// Check if there are any parsing errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    // ============================================================
    // Token handling
    // ============================================================

    /// Pull the next token from the lexer, reporting and skipping lexical
    /// errors.
    fn lex_token(&mut self) -> Token {
        loop {
            let token = self.lexer.next().unwrap_or_else(|| {
                Token::new(
                    TokenKind::Eof,
                    Span::new(self.source.len(), self.source.len(), 0, 0),
                )
            });
            if token.kind != TokenKind::Error {
                return token;
            }
            let text = &self.source[token.span.start..token.span.end];
            let (message, code) = if text.starts_with("/*") {
                ("unclosed block comment".to_string(), ErrorCode::UnclosedBlockComment)
            } else if text.starts_with('"') || text.starts_with('\'') {
                ("unclosed literal".to_string(), ErrorCode::UnclosedString)
            } else {
                (
                    format!("unexpected character `{}`", text),
                    ErrorCode::UnexpectedCharacter,
                )
            };
            self.errors
                .push(Diagnostic::error(message, token.span).with_error_code(code));
        }
    }

    /// Check if the current token matches the given kind.
    fn check(&self, kind: TokenKind) -> bool {
        self.pending_gt.is_none() && self.current.kind == kind
    }

    /// Check if the next token (lookahead) matches the given kind.
    fn check_next(&self, kind: TokenKind) -> bool {
        self.next.kind == kind
    }

    /// Check if we've reached the end of input.
    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    /// Advance to the next token, returning the previous.
    fn advance(&mut self) -> Token {
        self.previous = self.current.clone();

        if self.current.kind == TokenKind::Eof {
            return self.previous.clone();
        }

        self.current = self.next.clone();
        self.next = self.lex_token();
        self.previous.clone()
    }

    /// Consume a token of the expected kind, or error.
    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.error_expected(kind.description());
            None
        }
    }

    /// Try to consume a token of the expected kind.
    fn try_consume(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Get the text of a span.
    fn text(&self, span: &Span) -> &'src str {
        &self.source[span.start..span.end]
    }

    /// Consume an identifier.
    fn parse_ident(&mut self, what: &str) -> Option<Ident> {
        if self.check(TokenKind::Ident) {
            let token = self.advance();
            Some(Spanned::new(self.text(&token.span).to_string(), token.span))
        } else {
            let found = self.current.kind.description();
            let message = format!("expected {}, found {}", what, found);
            self.error_at(self.current.span, &message, ErrorCode::ExpectedIdentifier);
            None
        }
    }

    // ============================================================
    // Closing `>` handling (for `>>` disambiguation)
    // ============================================================

    /// Consume a single `>` closing a template parameter list. A `>>` token
    /// is split and its second half left pending.
    fn expect_closing_angle(&mut self) -> Option<Span> {
        if let Some(span) = self.pending_gt.take() {
            self.previous = Token::new(TokenKind::Gt, span);
            return Some(span);
        }

        match self.current.kind {
            TokenKind::Gt => Some(self.advance().span),
            TokenKind::Shr => {
                let full = self.current.span;
                let first = Span::new(full.start, full.start + 1, full.start_line, full.start_col);
                let second = Span::new(full.start + 1, full.end, full.start_line, full.start_col + 1);
                self.advance();
                self.pending_gt = Some(second);
                self.previous = Token::new(TokenKind::Gt, first);
                Some(first)
            }
            _ => {
                self.error_expected("`>`");
                None
            }
        }
    }

    // ============================================================
    // Error handling
    // ============================================================

    fn error_at(&mut self, span: Span, message: &str, code: ErrorCode) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.errors
            .push(Diagnostic::error(message, span).with_error_code(code));
    }

    /// Warnings don't trigger panic mode.
    fn warn_at(&mut self, span: Span, message: &str) {
        self.warnings.push(Diagnostic::warning(message, span));
    }

    fn error_expected(&mut self, expected: &str) {
        self.error_expected_one_of(&[expected]);
    }

    /// Report an error expecting one of several things.
    fn error_expected_one_of(&mut self, expected: &[&str]) {
        let found = if self.pending_gt.is_some() {
            TokenKind::Gt.description()
        } else {
            self.current.kind.description()
        };
        let message = format!("expected {}, found {}", format_expected_list(expected), found);
        let code = if self.is_at_end() {
            ErrorCode::UnexpectedEof
        } else {
            ErrorCode::UnexpectedToken
        };
        self.error_at(self.current.span, &message, code);
    }

    /// Synchronize after an error by skipping to a recovery point.
    ///
    /// Recovery points are a consumed `;`, a closing `}` (left for the
    /// enclosing body), or a keyword that starts a new definition. Nested
    /// braces are skipped as a whole.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        self.pending_gt = None;
        self.angle_depth = 0;

        while !self.is_at_end() {
            match self.current.kind {
                TokenKind::Semi => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace => return,
                TokenKind::LBrace => {
                    self.advance();
                    self.skip_to_closing_brace();
                    self.try_consume(TokenKind::RBrace);
                    continue;
                }
                kind if kind.starts_definition() => return,
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip tokens until the `}` matching an already consumed `{`.
    fn skip_to_closing_brace(&mut self) {
        let mut depth = 1;
        while !self.is_at_end() {
            match self.current.kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Finish a definition or export: expect its `;` and recover if anything
    /// inside went wrong.
    fn finish_item(&mut self) {
        if !self.panic_mode {
            self.expect(TokenKind::Semi);
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    // ============================================================
    // Definitions
    // ============================================================

    /// Parse a definition at file or module scope.
    fn parse_definition(&mut self) -> Option<Definition> {
        let definition = match self.current.kind {
            TokenKind::Pragma => return self.parse_pragma().map(Definition::Pragma),
            TokenKind::Module => self.parse_module().map(Definition::Module),
            TokenKind::Interface | TokenKind::Local => self.parse_interface(),
            TokenKind::Abstract if self.check_next(TokenKind::Interface) => {
                self.parse_interface()
            }
            TokenKind::Abstract | TokenKind::Custom | TokenKind::Valuetype => {
                self.parse_value()
            }
            TokenKind::Struct
            | TokenKind::Union
            | TokenKind::Enum
            | TokenKind::Typedef
            | TokenKind::Native => self.parse_type_decl().map(Definition::Type),
            TokenKind::Const => self.parse_const().map(Definition::Const),
            TokenKind::Exception => self.parse_exception().map(Definition::Except),
            _ => {
                self.error_expected_one_of(&[
                    "`module`",
                    "`interface`",
                    "`valuetype`",
                    "`struct`",
                    "`enum`",
                    "`typedef`",
                    "`const`",
                    "`exception`",
                ]);
                self.advance();
                self.synchronize();
                return None;
            }
        };
        self.finish_item();
        definition
    }

    fn parse_module(&mut self) -> Option<ModuleDef> {
        let start = self.current.span;
        self.advance(); // consume 'module'

        let name = self.parse_ident("module name")?;
        self.expect(TokenKind::LBrace)?;

        let mut definitions = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if let Some(definition) = self.parse_definition() {
                definitions.push(definition);
            }
        }
        self.expect(TokenKind::RBrace)?;

        Some(ModuleDef {
            name,
            definitions,
            span: start.merge(self.previous.span),
        })
    }

    // ============================================================
    // Pragmas
    // ============================================================

    /// Interpret a `#pragma` line. Unknown pragmas produce a warning.
    fn parse_pragma(&mut self) -> Option<Pragma> {
        let token = self.advance();
        let span = token.span;
        let text = self.text(&span);

        let body = text.trim_start_matches('#').trim_start();
        let body = body.strip_prefix("pragma").unwrap_or(body).trim();
        let (keyword, rest) = split_word(body);

        let kind = match keyword {
            "prefix" => match unquote(rest.trim()) {
                Some(prefix) => PragmaKind::Prefix(prefix.to_string()),
                None => return self.invalid_pragma(span, "`#pragma prefix` expects a string literal"),
            },
            "ID" => {
                let (name, rest) = split_word(rest);
                let id = unquote(rest.trim());
                match (pragma_scoped_name(name, span), id) {
                    (Some(name), Some(id)) => PragmaKind::Id {
                        name,
                        id: id.to_string(),
                    },
                    _ => {
                        return self.invalid_pragma(
                            span,
                            "`#pragma ID` expects a name and a string literal",
                        )
                    }
                }
            }
            "version" => {
                let (name, rest) = split_word(rest);
                let version = rest.trim();
                let well_formed = version
                    .split_once('.')
                    .map(|(major, minor)| {
                        !major.is_empty()
                            && !minor.is_empty()
                            && major.chars().all(|c| c.is_ascii_digit())
                            && minor.chars().all(|c| c.is_ascii_digit())
                    })
                    .unwrap_or(false);
                match pragma_scoped_name(name, span) {
                    Some(name) if well_formed => PragmaKind::Version {
                        name,
                        version: version.to_string(),
                    },
                    _ => {
                        return self.invalid_pragma(
                            span,
                            "`#pragma version` expects a name and a `major.minor` version",
                        )
                    }
                }
            }
            other => {
                self.warn_at(span, &format!("ignoring unknown pragma `{}`", other));
                return None;
            }
        };

        Some(Pragma { kind, span })
    }

    fn invalid_pragma(&mut self, span: Span, message: &str) -> Option<Pragma> {
        // The whole line is already consumed, so there is nothing to recover.
        self.errors
            .push(Diagnostic::error(message, span).with_error_code(ErrorCode::InvalidPragma));
        None
    }
}

/// Split off the first whitespace-delimited word.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], &text[idx..]),
        None => (text, ""),
    }
}

/// Strip the quotes of a string literal written in a pragma.
fn unquote(text: &str) -> Option<&str> {
    text.strip_prefix('"')?.strip_suffix('"')
}

/// Parse the name operand of a pragma. All parts share the pragma's span.
fn pragma_scoped_name(text: &str, span: Span) -> Option<ScopedName> {
    let (absolute, rest) = match text.strip_prefix("::") {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let mut parts = Vec::new();
    for part in rest.split("::") {
        let mut chars = part.chars();
        let valid_start = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }
        parts.push(Spanned::new(part.to_string(), span));
    }
    Some(ScopedName {
        absolute,
        parts,
        span,
    })
}
