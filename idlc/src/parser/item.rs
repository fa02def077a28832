//! Definition parsing.

use super::Parser;
use crate::ast::*;
use crate::diagnostics::ErrorCode;
use crate::lexer::TokenKind;

impl<'src> Parser<'src> {
    // ============================================================
    // Interfaces
    // ============================================================

    /// Parse an interface definition or forward declaration.
    pub(super) fn parse_interface(&mut self) -> Option<Definition> {
        let start = self.current.span;
        let kind = if self.try_consume(TokenKind::Abstract) {
            InterfaceKind::Abstract
        } else if self.try_consume(TokenKind::Local) {
            InterfaceKind::Local
        } else {
            InterfaceKind::Concrete
        };
        self.expect(TokenKind::Interface)?;
        let name = self.parse_ident("interface name")?;

        if self.check(TokenKind::Semi) {
            return Some(Definition::InterfaceForward(ForwardDecl {
                name,
                is_abstract: kind == InterfaceKind::Abstract,
                is_local: kind == InterfaceKind::Local,
                span: start.merge(self.previous.span),
            }));
        }

        let inherits = if self.try_consume(TokenKind::Colon) {
            self.parse_scoped_name_list()?
        } else {
            Vec::new()
        };

        self.expect(TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if let Some(export) = self.parse_export() {
                body.push(export);
            }
        }
        self.expect(TokenKind::RBrace)?;

        Some(Definition::Interface(InterfaceDef {
            kind,
            name,
            inherits,
            body,
            span: start.merge(self.previous.span),
        }))
    }

    /// Parse one element of an interface body, including its `;`.
    pub(super) fn parse_export(&mut self) -> Option<Export> {
        let export = match self.current.kind {
            TokenKind::Pragma => return self.parse_pragma().map(Export::Pragma),
            TokenKind::Struct
            | TokenKind::Union
            | TokenKind::Enum
            | TokenKind::Typedef
            | TokenKind::Native => self.parse_type_decl().map(Export::Type),
            TokenKind::Const => self.parse_const().map(Export::Const),
            TokenKind::Exception => self.parse_exception().map(Export::Except),
            TokenKind::Readonly | TokenKind::Attribute => self.parse_attribute().map(Export::Attr),
            kind if kind == TokenKind::Oneway
                || kind == TokenKind::Void
                || Self::is_type_start(kind) =>
            {
                self.parse_operation().map(Export::Op)
            }
            _ => {
                self.error_expected_one_of(&[
                    "an operation",
                    "`attribute`",
                    "a type declaration",
                    "`const`",
                    "`exception`",
                ]);
                self.advance();
                self.synchronize();
                return None;
            }
        };
        self.finish_item();
        export
    }

    fn parse_operation(&mut self) -> Option<OpDecl> {
        let start = self.current.span;
        let oneway = self.try_consume(TokenKind::Oneway);
        let return_type = if self.try_consume(TokenKind::Void) {
            None
        } else {
            Some(self.parse_type_spec()?)
        };
        let name = self.parse_ident("operation name")?;

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.try_consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let raises = if self.try_consume(TokenKind::Raises) {
            self.parse_exception_list()?
        } else {
            Vec::new()
        };

        let mut context = Vec::new();
        if self.try_consume(TokenKind::Context) {
            self.expect(TokenKind::LParen)?;
            loop {
                let token = self.expect(TokenKind::StringLit)?;
                let text = self.text(&token.span);
                context.push(text.trim_start_matches('L').trim_matches('"').to_string());
                if !self.try_consume(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
        }

        Some(OpDecl {
            oneway,
            return_type,
            name,
            params,
            raises,
            context,
            span: start.merge(self.previous.span),
        })
    }

    fn parse_param(&mut self) -> Option<ParamDecl> {
        let start = self.current.span;
        let direction = match self.current.kind {
            TokenKind::In => ParamDirection::In,
            TokenKind::Out => ParamDirection::Out,
            TokenKind::InOut => ParamDirection::InOut,
            _ => {
                self.error_expected_one_of(&["`in`", "`out`", "`inout`"]);
                return None;
            }
        };
        self.advance();
        let ty = self.parse_type_spec()?;
        let name = self.parse_ident("parameter name")?;
        Some(ParamDecl {
            direction,
            ty,
            name,
            span: start.merge(self.previous.span),
        })
    }

    fn parse_attribute(&mut self) -> Option<AttrDecl> {
        let start = self.current.span;
        let readonly = self.try_consume(TokenKind::Readonly);
        self.expect(TokenKind::Attribute)?;
        let ty = self.parse_type_spec()?;

        let mut names = vec![self.parse_ident("attribute name")?];
        while self.try_consume(TokenKind::Comma) {
            names.push(self.parse_ident("attribute name")?);
        }

        let mut get_raises = Vec::new();
        let mut set_raises = Vec::new();
        if readonly {
            if self.try_consume(TokenKind::Raises) {
                get_raises = self.parse_exception_list()?;
            }
        } else {
            if self.try_consume(TokenKind::GetRaises) {
                get_raises = self.parse_exception_list()?;
            }
            if self.try_consume(TokenKind::SetRaises) {
                set_raises = self.parse_exception_list()?;
            }
        }

        Some(AttrDecl {
            readonly,
            ty,
            names,
            get_raises,
            set_raises,
            span: start.merge(self.previous.span),
        })
    }

    /// `( name, ... )` after `raises`, `getraises` or `setraises`.
    fn parse_exception_list(&mut self) -> Option<Vec<ScopedName>> {
        self.expect(TokenKind::LParen)?;
        let names = self.parse_scoped_name_list()?;
        self.expect(TokenKind::RParen)?;
        Some(names)
    }

    // ============================================================
    // Value types
    // ============================================================

    /// Parse any form of value type: forward, boxed, abstract or concrete.
    pub(super) fn parse_value(&mut self) -> Option<Definition> {
        let start = self.current.span;
        let kind = if self.try_consume(TokenKind::Abstract) {
            ValueKind::Abstract
        } else if self.try_consume(TokenKind::Custom) {
            ValueKind::Custom
        } else {
            ValueKind::Concrete
        };
        self.expect(TokenKind::Valuetype)?;
        let name = self.parse_ident("value type name")?;

        if self.check(TokenKind::Semi) && kind != ValueKind::Custom {
            return Some(Definition::ValueForward(ForwardDecl {
                name,
                is_abstract: kind == ValueKind::Abstract,
                is_local: false,
                span: start.merge(self.previous.span),
            }));
        }

        let is_header_token = self.check(TokenKind::Colon)
            || self.check(TokenKind::Supports)
            || self.check(TokenKind::LBrace);
        if kind == ValueKind::Concrete && !is_header_token && Self::is_type_start(self.current.kind)
        {
            let boxed = self.parse_type_spec()?;
            return Some(Definition::ValueBox(ValueBoxDef {
                name,
                boxed,
                span: start.merge(self.previous.span),
            }));
        }

        let mut truncatable = false;
        let mut inherits = Vec::new();
        if self.try_consume(TokenKind::Colon) {
            if self.try_consume(TokenKind::Truncatable) {
                truncatable = true;
                if kind != ValueKind::Concrete {
                    self.warn_at(
                        self.previous.span,
                        "`truncatable` is only meaningful for concrete value types",
                    );
                }
            }
            inherits = self.parse_scoped_name_list()?;
        }

        let supports = if self.try_consume(TokenKind::Supports) {
            self.parse_scoped_name_list()?
        } else {
            Vec::new()
        };

        self.expect(TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if let Some(element) = self.parse_value_element(kind) {
                body.push(element);
            }
        }
        self.expect(TokenKind::RBrace)?;

        Some(Definition::Value(ValueDef {
            kind,
            name,
            truncatable,
            inherits,
            supports,
            body,
            span: start.merge(self.previous.span),
        }))
    }

    fn parse_value_element(&mut self, kind: ValueKind) -> Option<ValueElement> {
        let stateful = matches!(
            self.current.kind,
            TokenKind::Public | TokenKind::Private | TokenKind::Factory
        );
        if !stateful {
            return self.parse_export().map(ValueElement::Export);
        }
        if kind == ValueKind::Abstract {
            self.error_at(
                self.current.span,
                "abstract value types may not contain state members or initializers",
                ErrorCode::UnexpectedToken,
            );
            self.synchronize();
            return None;
        }

        let element = if self.check(TokenKind::Factory) {
            self.parse_init().map(ValueElement::Init)
        } else {
            self.parse_state_member().map(ValueElement::State)
        };
        self.finish_item();
        element
    }

    fn parse_state_member(&mut self) -> Option<StateMember> {
        let start = self.current.span;
        let visibility = if self.try_consume(TokenKind::Public) {
            StateVisibility::Public
        } else {
            self.expect(TokenKind::Private)?;
            StateVisibility::Private
        };
        let ty = self.parse_type_spec()?;
        let declarators = self.parse_declarators()?;
        Some(StateMember {
            visibility,
            ty,
            declarators,
            span: start.merge(self.previous.span),
        })
    }

    fn parse_init(&mut self) -> Option<InitDecl> {
        let start = self.current.span;
        self.advance(); // consume 'factory'
        let name = self.parse_ident("initializer name")?;

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let param_start = self.current.span;
                // Only `in` is legal here and it may be omitted.
                self.try_consume(TokenKind::In);
                let ty = self.parse_type_spec()?;
                let param_name = self.parse_ident("parameter name")?;
                params.push(ParamDecl {
                    direction: ParamDirection::In,
                    ty,
                    name: param_name,
                    span: param_start.merge(self.previous.span),
                });
                if !self.try_consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let raises = if self.try_consume(TokenKind::Raises) {
            self.parse_exception_list()?
        } else {
            Vec::new()
        };

        Some(InitDecl {
            name,
            params,
            raises,
            span: start.merge(self.previous.span),
        })
    }

    // ============================================================
    // Type declarations
    // ============================================================

    pub(super) fn parse_type_decl(&mut self) -> Option<TypeDecl> {
        match self.current.kind {
            TokenKind::Struct => self.parse_struct().map(TypeDecl::Struct),
            TokenKind::Union => self.parse_union().map(TypeDecl::Union),
            TokenKind::Enum => self.parse_enum().map(TypeDecl::Enum),
            TokenKind::Native => {
                self.advance(); // consume 'native'
                self.parse_ident("native type name").map(TypeDecl::Native)
            }
            _ => {
                let start = self.current.span;
                self.expect(TokenKind::Typedef)?;
                let ty = self.parse_type_spec()?;
                let declarators = self.parse_declarators()?;
                Some(TypeDecl::Typedef(TypedefDecl {
                    ty,
                    declarators,
                    span: start.merge(self.previous.span),
                }))
            }
        }
    }

    pub(super) fn parse_struct(&mut self) -> Option<StructDef> {
        let start = self.current.span;
        self.expect(TokenKind::Struct)?;
        let name = self.parse_ident("struct name")?;
        self.expect(TokenKind::LBrace)?;
        let members = self.parse_members()?;
        if members.is_empty() {
            self.warn_at(name.span, "IDL requires structs to have at least one member");
        }
        self.expect(TokenKind::RBrace)?;
        Some(StructDef {
            name,
            members,
            span: start.merge(self.previous.span),
        })
    }

    /// Parse `type declarators;` members up to the closing `}`.
    fn parse_members(&mut self) -> Option<Vec<Member>> {
        let mut members = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let start = self.current.span;
            let ty = self.parse_type_spec()?;
            let declarators = self.parse_declarators()?;
            self.expect(TokenKind::Semi)?;
            members.push(Member {
                ty,
                declarators,
                span: start.merge(self.previous.span),
            });
        }
        Some(members)
    }

    pub(super) fn parse_union(&mut self) -> Option<UnionDef> {
        let start = self.current.span;
        self.expect(TokenKind::Union)?;
        let name = self.parse_ident("union name")?;
        self.expect(TokenKind::Switch)?;
        self.expect(TokenKind::LParen)?;
        let discriminator = self.parse_type_spec()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LBrace)?;

        let mut cases = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let mut labels = Vec::new();
            loop {
                if self.try_consume(TokenKind::Default) {
                    labels.push(CaseLabel::Default);
                } else {
                    self.expect(TokenKind::Case)?;
                    labels.push(CaseLabel::Value(self.parse_const_expr()?));
                }
                self.expect(TokenKind::Colon)?;
                if !self.check(TokenKind::Case) && !self.check(TokenKind::Default) {
                    break;
                }
            }
            let ty = self.parse_type_spec()?;
            let declarator = self.parse_declarator()?;
            self.expect(TokenKind::Semi)?;
            cases.push(UnionCase {
                labels,
                ty,
                declarator,
            });
        }
        self.expect(TokenKind::RBrace)?;

        Some(UnionDef {
            name,
            discriminator,
            cases,
            span: start.merge(self.previous.span),
        })
    }

    pub(super) fn parse_enum(&mut self) -> Option<EnumDef> {
        let start = self.current.span;
        self.expect(TokenKind::Enum)?;
        let name = self.parse_ident("enum name")?;
        self.expect(TokenKind::LBrace)?;
        let mut enumerators = vec![self.parse_ident("enumerator")?];
        while self.try_consume(TokenKind::Comma) {
            enumerators.push(self.parse_ident("enumerator")?);
        }
        self.expect(TokenKind::RBrace)?;
        Some(EnumDef {
            name,
            enumerators,
            span: start.merge(self.previous.span),
        })
    }

    pub(super) fn parse_exception(&mut self) -> Option<ExceptDef> {
        let start = self.current.span;
        self.advance(); // consume 'exception'
        let name = self.parse_ident("exception name")?;
        self.expect(TokenKind::LBrace)?;
        let members = self.parse_members()?;
        self.expect(TokenKind::RBrace)?;
        Some(ExceptDef {
            name,
            members,
            span: start.merge(self.previous.span),
        })
    }

    pub(super) fn parse_const(&mut self) -> Option<ConstDef> {
        let start = self.current.span;
        self.advance(); // consume 'const'
        let ty = self.parse_type_spec()?;
        let name = self.parse_ident("constant name")?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_const_expr()?;
        Some(ConstDef {
            ty,
            name,
            value,
            span: start.merge(self.previous.span),
        })
    }
}
