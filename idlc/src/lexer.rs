//! Lexical analysis for OMG IDL.
//!
//! Tokenizes preprocessed IDL text. Pragmas that survive preprocessing are
//! kept as a single [`TokenKind::Pragma`] token spanning the whole line; the
//! parser interprets their content.
//!
//! # Example
//!
//! ```rust
//! use idlc::{Lexer, TokenKind};
//!
//! let tokens: Vec<_> = Lexer::new("interface Foo;").map(|t| t.kind).collect();
//! assert_eq!(tokens, vec![
//!     TokenKind::Interface,
//!     TokenKind::Ident,
//!     TokenKind::Semi,
//!     TokenKind::Eof,
//! ]);
//! ```

use crate::span::{LineIndex, Span};
use logos::Logos;

/// Token kinds for the IDL lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum TokenKind {
    // ============================================================
    // Keywords
    // ============================================================
    #[token("abstract")]
    Abstract,
    #[token("any")]
    Any,
    #[token("attribute")]
    Attribute,
    #[token("boolean")]
    Boolean,
    #[token("case")]
    Case,
    #[token("char")]
    Char,
    #[token("const")]
    Const,
    #[token("context")]
    Context,
    #[token("custom")]
    Custom,
    #[token("default")]
    Default,
    #[token("double")]
    Double,
    #[token("enum")]
    Enum,
    #[token("exception")]
    Exception,
    #[token("factory")]
    Factory,
    #[token("FALSE")]
    False,
    #[token("fixed")]
    Fixed,
    #[token("float")]
    Float,
    #[token("getraises")]
    GetRaises,
    #[token("in")]
    In,
    #[token("inout")]
    InOut,
    #[token("interface")]
    Interface,
    #[token("local")]
    Local,
    #[token("long")]
    Long,
    #[token("module")]
    Module,
    #[token("native")]
    Native,
    #[token("Object")]
    Object,
    #[token("octet")]
    Octet,
    #[token("oneway")]
    Oneway,
    #[token("out")]
    Out,
    #[token("private")]
    Private,
    #[token("public")]
    Public,
    #[token("raises")]
    Raises,
    #[token("readonly")]
    Readonly,
    #[token("sequence")]
    Sequence,
    #[token("setraises")]
    SetRaises,
    #[token("short")]
    Short,
    #[token("string")]
    String,
    #[token("struct")]
    Struct,
    #[token("supports")]
    Supports,
    #[token("switch")]
    Switch,
    #[token("TRUE")]
    True,
    #[token("truncatable")]
    Truncatable,
    #[token("typedef")]
    Typedef,
    #[token("unsigned")]
    Unsigned,
    #[token("union")]
    Union,
    #[token("ValueBase")]
    ValueBase,
    #[token("valuetype")]
    Valuetype,
    #[token("void")]
    Void,
    #[token("wchar")]
    WChar,
    #[token("wstring")]
    WString,

    // ============================================================
    // Literals and identifiers
    // ============================================================
    #[regex(r"0[xX][0-9a-fA-F]+|[0-9]+")]
    IntLit,
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?|\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+")]
    FloatLit,
    #[regex(r"([0-9]+(\.[0-9]*)?|\.[0-9]+)[dD]")]
    FixedLit,
    #[regex(r#"L?'([^'\\\n]|\\[^\n])+'"#)]
    CharLit,
    #[regex(r#"L?"([^"\\\n]|\\[^\n])*""#)]
    StringLit,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"#[ \t]*pragma[^\n]*")]
    Pragma,

    // ============================================================
    // Punctuation and operators
    // ============================================================
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("::")]
    ColonColon,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("~")]
    Tilde,
    #[token("|")]
    Or,
    #[token("^")]
    Caret,
    #[token("&")]
    And,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,

    // ============================================================
    // Special
    // ============================================================
    /// End of input.
    Eof,
    /// Lexical error.
    Error,
}

impl TokenKind {
    /// Human-readable description used in diagnostics.
    pub fn description(&self) -> &'static str {
        match self {
            TokenKind::Abstract => "keyword `abstract`",
            TokenKind::Any => "keyword `any`",
            TokenKind::Attribute => "keyword `attribute`",
            TokenKind::Boolean => "keyword `boolean`",
            TokenKind::Case => "keyword `case`",
            TokenKind::Char => "keyword `char`",
            TokenKind::Const => "keyword `const`",
            TokenKind::Context => "keyword `context`",
            TokenKind::Custom => "keyword `custom`",
            TokenKind::Default => "keyword `default`",
            TokenKind::Double => "keyword `double`",
            TokenKind::Enum => "keyword `enum`",
            TokenKind::Exception => "keyword `exception`",
            TokenKind::Factory => "keyword `factory`",
            TokenKind::False => "keyword `FALSE`",
            TokenKind::Fixed => "keyword `fixed`",
            TokenKind::Float => "keyword `float`",
            TokenKind::GetRaises => "keyword `getraises`",
            TokenKind::In => "keyword `in`",
            TokenKind::InOut => "keyword `inout`",
            TokenKind::Interface => "keyword `interface`",
            TokenKind::Local => "keyword `local`",
            TokenKind::Long => "keyword `long`",
            TokenKind::Module => "keyword `module`",
            TokenKind::Native => "keyword `native`",
            TokenKind::Object => "keyword `Object`",
            TokenKind::Octet => "keyword `octet`",
            TokenKind::Oneway => "keyword `oneway`",
            TokenKind::Out => "keyword `out`",
            TokenKind::Private => "keyword `private`",
            TokenKind::Public => "keyword `public`",
            TokenKind::Raises => "keyword `raises`",
            TokenKind::Readonly => "keyword `readonly`",
            TokenKind::Sequence => "keyword `sequence`",
            TokenKind::SetRaises => "keyword `setraises`",
            TokenKind::Short => "keyword `short`",
            TokenKind::String => "keyword `string`",
            TokenKind::Struct => "keyword `struct`",
            TokenKind::Supports => "keyword `supports`",
            TokenKind::Switch => "keyword `switch`",
            TokenKind::True => "keyword `TRUE`",
            TokenKind::Truncatable => "keyword `truncatable`",
            TokenKind::Typedef => "keyword `typedef`",
            TokenKind::Unsigned => "keyword `unsigned`",
            TokenKind::Union => "keyword `union`",
            TokenKind::ValueBase => "keyword `ValueBase`",
            TokenKind::Valuetype => "keyword `valuetype`",
            TokenKind::Void => "keyword `void`",
            TokenKind::WChar => "keyword `wchar`",
            TokenKind::WString => "keyword `wstring`",
            TokenKind::IntLit => "integer literal",
            TokenKind::FloatLit => "floating point literal",
            TokenKind::FixedLit => "fixed point literal",
            TokenKind::CharLit => "character literal",
            TokenKind::StringLit => "string literal",
            TokenKind::Ident => "identifier",
            TokenKind::Pragma => "pragma",
            TokenKind::Semi => "`;`",
            TokenKind::Comma => "`,`",
            TokenKind::Colon => "`:`",
            TokenKind::ColonColon => "`::`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Lt => "`<`",
            TokenKind::Gt => "`>`",
            TokenKind::Eq => "`=`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Tilde => "`~`",
            TokenKind::Or => "`|`",
            TokenKind::Caret => "`^`",
            TokenKind::And => "`&`",
            TokenKind::Shl => "`<<`",
            TokenKind::Shr => "`>>`",
            TokenKind::Eof => "end of file",
            TokenKind::Error => "error",
        }
    }

    /// Whether this token can start a definition inside a module or at
    /// file scope.
    pub fn starts_definition(&self) -> bool {
        matches!(
            self,
            TokenKind::Module
                | TokenKind::Interface
                | TokenKind::Abstract
                | TokenKind::Local
                | TokenKind::Custom
                | TokenKind::Valuetype
                | TokenKind::Struct
                | TokenKind::Union
                | TokenKind::Enum
                | TokenKind::Typedef
                | TokenKind::Native
                | TokenKind::Const
                | TokenKind::Exception
                | TokenKind::Pragma
        )
    }
}

/// A token with its kind and source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn dummy(kind: TokenKind) -> Self {
        Self {
            kind,
            span: Span::dummy(),
        }
    }
}

/// The lexer for preprocessed IDL text.
#[derive(Clone)]
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
    source: &'src str,
    line_index: LineIndex,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            line_index: LineIndex::new(source),
            finished: false,
        }
    }

    /// Get the source text for a span.
    pub fn slice(&self, span: &Span) -> &'src str {
        &self.source[span.start..span.end]
    }

    fn span_of(&self, range: logos::Span) -> Span {
        let (line, col) = self.line_index.line_col(range.start);
        Span::new(range.start, range.end, line, col)
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.inner.next() {
            Some(Ok(kind)) => Some(Token::new(kind, self.span_of(self.inner.span()))),
            Some(Err(())) => Some(Token::new(TokenKind::Error, self.span_of(self.inner.span()))),
            None => {
                self.finished = true;
                let end = self.source.len();
                let (line, col) = self.line_index.line_col(end);
                Some(Token::new(TokenKind::Eof, Span::new(end, end, line, col)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            lex("module interface valuetype abstract custom"),
            vec![
                TokenKind::Module,
                TokenKind::Interface,
                TokenKind::Valuetype,
                TokenKind::Abstract,
                TokenKind::Custom,
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(lex("interfaces longer _long"), vec![TokenKind::Ident; 3]);
    }

    #[test]
    fn test_scoped_name() {
        assert_eq!(
            lex("::A::B"),
            vec![
                TokenKind::ColonColon,
                TokenKind::Ident,
                TokenKind::ColonColon,
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            lex("42 0x1F 017 3.14 .5e3 1.5d 'a' L'b' \"str\" L\"wide\""),
            vec![
                TokenKind::IntLit,
                TokenKind::IntLit,
                TokenKind::IntLit,
                TokenKind::FloatLit,
                TokenKind::FloatLit,
                TokenKind::FixedLit,
                TokenKind::CharLit,
                TokenKind::CharLit,
                TokenKind::StringLit,
                TokenKind::StringLit,
            ]
        );
    }

    #[test]
    fn test_pragma_is_one_token() {
        let source = "#pragma prefix \"omg.org\"\nmodule CORBA {};";
        let tokens: Vec<_> = Lexer::new(source).collect();
        assert_eq!(tokens[0].kind, TokenKind::Pragma);
        assert_eq!(tokens[0].span.end, source.find('\n').unwrap());
        assert_eq!(tokens[1].kind, TokenKind::Module);
        assert_eq!(tokens[1].span.start_line, 2);
    }

    #[test]
    fn test_shift_tokens() {
        assert_eq!(
            lex("sequence<sequence<long>>"),
            vec![
                TokenKind::Sequence,
                TokenKind::Lt,
                TokenKind::Sequence,
                TokenKind::Lt,
                TokenKind::Long,
                TokenKind::Shr,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            lex("struct /* c */ S // trailing\n;"),
            vec![TokenKind::Struct, TokenKind::Ident, TokenKind::Semi]
        );
    }

    #[test]
    fn test_error_token() {
        assert_eq!(lex("struct $"), vec![TokenKind::Struct, TokenKind::Error]);
    }

    #[test]
    fn test_eof_emitted_once() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Eof));
        assert_eq!(lexer.next(), None);
    }
}
