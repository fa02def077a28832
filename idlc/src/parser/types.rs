//! Type specifier, scoped name and constant expression parsing.

use super::Parser;
use crate::ast::*;
use crate::diagnostics::ErrorCode;
use crate::lexer::TokenKind;

impl<'src> Parser<'src> {
    /// Whether `kind` can begin a type specifier.
    pub(super) fn is_type_start(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Float
                | TokenKind::Double
                | TokenKind::Long
                | TokenKind::Short
                | TokenKind::Unsigned
                | TokenKind::Char
                | TokenKind::WChar
                | TokenKind::Boolean
                | TokenKind::Octet
                | TokenKind::Any
                | TokenKind::Object
                | TokenKind::ValueBase
                | TokenKind::Sequence
                | TokenKind::String
                | TokenKind::WString
                | TokenKind::Fixed
                | TokenKind::Ident
                | TokenKind::ColonColon
                | TokenKind::Struct
                | TokenKind::Union
                | TokenKind::Enum
        )
    }

    // ============================================================
    // Type specifiers
    // ============================================================

    pub(super) fn parse_type_spec(&mut self) -> Option<TypeSpec> {
        let start = self.current.span;
        let kind = match self.current.kind {
            TokenKind::Struct => TypeSpecKind::Struct(Box::new(self.parse_struct()?)),
            TokenKind::Union => TypeSpecKind::Union(Box::new(self.parse_union()?)),
            TokenKind::Enum => TypeSpecKind::Enum(Box::new(self.parse_enum()?)),
            TokenKind::Sequence => {
                self.advance();
                self.expect(TokenKind::Lt)?;
                self.angle_depth += 1;
                let element = self.parse_type_spec()?;
                let bound = if self.try_consume(TokenKind::Comma) {
                    Some(self.parse_const_expr()?)
                } else {
                    None
                };
                self.angle_depth -= 1;
                self.expect_closing_angle()?;
                TypeSpecKind::Sequence {
                    element: Box::new(element),
                    bound,
                }
            }
            TokenKind::String => {
                self.advance();
                TypeSpecKind::String {
                    bound: self.parse_string_bound()?,
                }
            }
            TokenKind::WString => {
                self.advance();
                TypeSpecKind::WString {
                    bound: self.parse_string_bound()?,
                }
            }
            TokenKind::Fixed => {
                self.advance();
                if self.try_consume(TokenKind::Lt) {
                    self.angle_depth += 1;
                    self.parse_const_expr()?;
                    self.expect(TokenKind::Comma)?;
                    self.parse_const_expr()?;
                    self.angle_depth -= 1;
                    self.expect_closing_angle()?;
                }
                TypeSpecKind::Fixed
            }
            TokenKind::Ident | TokenKind::ColonColon => {
                TypeSpecKind::Scoped(self.parse_scoped_name()?)
            }
            _ => TypeSpecKind::Base(self.parse_base_type()?),
        };
        Some(TypeSpec {
            kind,
            span: start.merge(self.previous.span),
        })
    }

    fn parse_string_bound(&mut self) -> Option<Option<ConstExpr>> {
        if !self.try_consume(TokenKind::Lt) {
            return Some(None);
        }
        self.angle_depth += 1;
        let bound = self.parse_const_expr()?;
        self.angle_depth -= 1;
        self.expect_closing_angle()?;
        Some(Some(bound))
    }

    fn parse_base_type(&mut self) -> Option<BaseType> {
        let base = match self.current.kind {
            TokenKind::Float => BaseType::Float,
            TokenKind::Double => BaseType::Double,
            TokenKind::Short => BaseType::Short,
            TokenKind::Char => BaseType::Char,
            TokenKind::WChar => BaseType::WChar,
            TokenKind::Boolean => BaseType::Boolean,
            TokenKind::Octet => BaseType::Octet,
            TokenKind::Any => BaseType::Any,
            TokenKind::Object => BaseType::Object,
            TokenKind::ValueBase => BaseType::ValueBase,
            TokenKind::Long => {
                self.advance();
                return Some(if self.try_consume(TokenKind::Long) {
                    BaseType::LongLong
                } else if self.try_consume(TokenKind::Double) {
                    BaseType::LongDouble
                } else {
                    BaseType::Long
                });
            }
            TokenKind::Unsigned => {
                self.advance();
                return if self.try_consume(TokenKind::Short) {
                    Some(BaseType::UShort)
                } else if self.try_consume(TokenKind::Long) {
                    Some(if self.try_consume(TokenKind::Long) {
                        BaseType::ULongLong
                    } else {
                        BaseType::ULong
                    })
                } else {
                    self.error_expected_one_of(&["`short`", "`long`"]);
                    None
                };
            }
            _ => {
                let found = self.current.kind.description();
                let message = format!("expected type, found {}", found);
                self.error_at(self.current.span, &message, ErrorCode::ExpectedType);
                return None;
            }
        };
        self.advance();
        Some(base)
    }

    // ============================================================
    // Names and declarators
    // ============================================================

    pub(super) fn parse_scoped_name(&mut self) -> Option<ScopedName> {
        let start = self.current.span;
        let absolute = self.try_consume(TokenKind::ColonColon);
        let mut parts = vec![self.parse_ident("identifier")?];
        while self.try_consume(TokenKind::ColonColon) {
            parts.push(self.parse_ident("identifier")?);
        }
        Some(ScopedName {
            absolute,
            parts,
            span: start.merge(self.previous.span),
        })
    }

    pub(super) fn parse_scoped_name_list(&mut self) -> Option<Vec<ScopedName>> {
        let mut names = vec![self.parse_scoped_name()?];
        while self.try_consume(TokenKind::Comma) {
            names.push(self.parse_scoped_name()?);
        }
        Some(names)
    }

    pub(super) fn parse_declarators(&mut self) -> Option<Vec<Declarator>> {
        let mut declarators = vec![self.parse_declarator()?];
        while self.try_consume(TokenKind::Comma) {
            declarators.push(self.parse_declarator()?);
        }
        Some(declarators)
    }

    pub(super) fn parse_declarator(&mut self) -> Option<Declarator> {
        let name = self.parse_ident("declarator name")?;
        if !self.check(TokenKind::LBracket) {
            return Some(Declarator::Simple(name));
        }
        let mut sizes = Vec::new();
        while self.try_consume(TokenKind::LBracket) {
            sizes.push(self.parse_const_expr()?);
            self.expect(TokenKind::RBracket)?;
        }
        Some(Declarator::Array { name, sizes })
    }

    // ============================================================
    // Constant expressions
    // ============================================================

    /// Parse a constant expression, lowest precedence first:
    /// `|`, `^`, `&`, shifts, additive, multiplicative, unary.
    pub(super) fn parse_const_expr(&mut self) -> Option<ConstExpr> {
        self.parse_binary_level(0)
    }

    fn binary_op_at(&self, level: usize) -> Option<BinaryOp> {
        if self.pending_gt.is_some() {
            return None;
        }
        let op = match (level, self.current.kind) {
            (0, TokenKind::Or) => BinaryOp::Or,
            (1, TokenKind::Caret) => BinaryOp::Xor,
            (2, TokenKind::And) => BinaryOp::And,
            (3, TokenKind::Shl) => BinaryOp::Shl,
            (3, TokenKind::Shr) if self.angle_depth == 0 => BinaryOp::Shr,
            (4, TokenKind::Plus) => BinaryOp::Add,
            (4, TokenKind::Minus) => BinaryOp::Sub,
            (5, TokenKind::Star) => BinaryOp::Mul,
            (5, TokenKind::Slash) => BinaryOp::Div,
            (5, TokenKind::Percent) => BinaryOp::Mod,
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary_level(&mut self, level: usize) -> Option<ConstExpr> {
        if level > 5 {
            return self.parse_unary_expr();
        }
        let mut lhs = self.parse_binary_level(level + 1)?;
        while let Some(op) = self.binary_op_at(level) {
            self.advance();
            let rhs = self.parse_binary_level(level + 1)?;
            let span = lhs.span.merge(rhs.span);
            lhs = ConstExpr {
                kind: ConstExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }
        Some(lhs)
    }

    fn parse_unary_expr(&mut self) -> Option<ConstExpr> {
        let start = self.current.span;
        let op = match self.current.kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Tilde => UnaryOp::Not,
            _ => return self.parse_primary_expr(),
        };
        self.advance();
        let operand = self.parse_primary_expr()?;
        Some(ConstExpr {
            span: start.merge(operand.span),
            kind: ConstExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        })
    }

    fn parse_primary_expr(&mut self) -> Option<ConstExpr> {
        let start = self.current.span;
        let kind = match self.current.kind {
            TokenKind::Ident | TokenKind::ColonColon => {
                ConstExprKind::Scoped(self.parse_scoped_name()?)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_const_expr()?;
                self.expect(TokenKind::RParen)?;
                return Some(ConstExpr {
                    kind: inner.kind,
                    span: start.merge(self.previous.span),
                });
            }
            TokenKind::IntLit => {
                let token = self.advance();
                let text = self.text(&token.span);
                match parse_int_literal(text) {
                    Some(value) => ConstExprKind::Literal(Literal::Int(value)),
                    None => {
                        let message = format!("integer literal `{}` is out of range", text);
                        self.error_at(token.span, &message, ErrorCode::InvalidInteger);
                        return None;
                    }
                }
            }
            TokenKind::FloatLit => {
                let token = self.advance();
                let text = self.text(&token.span);
                ConstExprKind::Literal(Literal::Float(text.parse().unwrap_or(0.0)))
            }
            TokenKind::FixedLit => {
                let token = self.advance();
                let text = self.text(&token.span);
                ConstExprKind::Literal(Literal::Fixed(text[..text.len() - 1].to_string()))
            }
            TokenKind::CharLit => {
                let token = self.advance();
                let text = self.text(&token.span).trim_start_matches('L');
                ConstExprKind::Literal(Literal::Char(text.trim_matches('\'').to_string()))
            }
            TokenKind::StringLit => {
                // Adjacent string literals are concatenated.
                let mut value = String::new();
                while self.check(TokenKind::StringLit) {
                    let token = self.advance();
                    let text = self.text(&token.span).trim_start_matches('L');
                    value.push_str(&text[1..text.len() - 1]);
                }
                ConstExprKind::Literal(Literal::String(value))
            }
            TokenKind::True => {
                self.advance();
                ConstExprKind::Literal(Literal::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                ConstExprKind::Literal(Literal::Bool(false))
            }
            _ => {
                let found = self.current.kind.description();
                let message = format!("expected constant expression, found {}", found);
                self.error_at(self.current.span, &message, ErrorCode::ExpectedExpression);
                return None;
            }
        };
        Some(ConstExpr {
            kind,
            span: start.merge(self.previous.span),
        })
    }
}

/// Parse a decimal, octal (leading `0`) or hexadecimal integer literal.
fn parse_int_literal(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if text.len() > 1 && text.starts_with('0') {
        u64::from_str_radix(&text[1..], 8).ok()
    } else {
        text.parse().ok()
    }
}
