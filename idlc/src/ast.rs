//! Abstract syntax tree for OMG IDL.
//!
//! The tree is a closed set of tagged variants. Constructs this compiler
//! parses but does not map (unions, `fixed`, array declarators, bounded
//! sequences, constant expressions) are represented explicitly so that the
//! generator can reject them with a precise error.

use std::fmt;

use crate::span::{Span, Spanned};

/// An identifier as written in the source (a leading `_` escape included).
pub type Ident = Spanned<String>;

/// The root node of one translation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    pub definitions: Vec<Definition>,
    pub span: Span,
}

/// A definition at file or module scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Module(ModuleDef),
    Interface(InterfaceDef),
    InterfaceForward(ForwardDecl),
    Value(ValueDef),
    ValueBox(ValueBoxDef),
    ValueForward(ForwardDecl),
    Type(TypeDecl),
    Except(ExceptDef),
    Const(ConstDef),
    Pragma(Pragma),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDef {
    pub name: Ident,
    pub definitions: Vec<Definition>,
    pub span: Span,
}

/// Interface flavour, from the `abstract`/`local` modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    Concrete,
    Abstract,
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDef {
    pub kind: InterfaceKind,
    pub name: Ident,
    pub inherits: Vec<ScopedName>,
    pub body: Vec<Export>,
    pub span: Span,
}

/// A forward declaration of an interface or value type.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardDecl {
    pub name: Ident,
    pub is_abstract: bool,
    pub is_local: bool,
    pub span: Span,
}

/// A member of an interface body (also usable inside value types).
#[derive(Debug, Clone, PartialEq)]
pub enum Export {
    Type(TypeDecl),
    Const(ConstDef),
    Except(ExceptDef),
    Attr(AttrDecl),
    Op(OpDecl),
    Pragma(Pragma),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Concrete,
    /// Concrete value type with user-provided marshalling.
    Custom,
    Abstract,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueDef {
    pub kind: ValueKind,
    pub name: Ident,
    pub truncatable: bool,
    /// The value inheritance clause (`: A, B`).
    pub inherits: Vec<ScopedName>,
    /// The `supports` clause.
    pub supports: Vec<ScopedName>,
    pub body: Vec<ValueElement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueElement {
    Export(Export),
    State(StateMember),
    Init(InitDecl),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateVisibility {
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateMember {
    pub visibility: StateVisibility,
    pub ty: TypeSpec,
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

/// A `factory` initializer of a value type.
#[derive(Debug, Clone, PartialEq)]
pub struct InitDecl {
    pub name: Ident,
    pub params: Vec<ParamDecl>,
    pub raises: Vec<ScopedName>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueBoxDef {
    pub name: Ident,
    pub boxed: TypeSpec,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDecl {
    Typedef(TypedefDecl),
    Struct(StructDef),
    Union(UnionDef),
    Enum(EnumDef),
    Native(Ident),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedefDecl {
    pub ty: TypeSpec,
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: Ident,
    pub members: Vec<Member>,
    pub span: Span,
}

/// A struct or exception member.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub ty: TypeSpec,
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionDef {
    pub name: Ident,
    pub discriminator: TypeSpec,
    pub cases: Vec<UnionCase>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionCase {
    pub labels: Vec<CaseLabel>,
    pub ty: TypeSpec,
    pub declarator: Declarator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseLabel {
    Default,
    Value(ConstExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: Ident,
    pub enumerators: Vec<Ident>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptDef {
    pub name: Ident,
    pub members: Vec<Member>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDef {
    pub ty: TypeSpec,
    pub name: Ident,
    pub value: ConstExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declarator {
    Simple(Ident),
    /// `name[size]...`; parsed, but not supported by the generator.
    Array { name: Ident, sizes: Vec<ConstExpr> },
}

impl Declarator {
    pub fn name(&self) -> &Ident {
        match self {
            Declarator::Simple(name) => name,
            Declarator::Array { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub kind: TypeSpecKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpecKind {
    Base(BaseType),
    Sequence {
        element: Box<TypeSpec>,
        bound: Option<ConstExpr>,
    },
    String {
        bound: Option<ConstExpr>,
    },
    WString {
        bound: Option<ConstExpr>,
    },
    /// `fixed<digits, scale>`, or bare `fixed` in constant declarations.
    Fixed,
    Scoped(ScopedName),
    Struct(Box<StructDef>),
    Union(Box<UnionDef>),
    Enum(Box<EnumDef>),
}

/// IDL primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Float,
    Double,
    LongDouble,
    Short,
    Long,
    LongLong,
    UShort,
    ULong,
    ULongLong,
    Char,
    WChar,
    Boolean,
    Octet,
    Any,
    Object,
    ValueBase,
}

impl BaseType {
    pub fn idl_name(&self) -> &'static str {
        match self {
            BaseType::Float => "float",
            BaseType::Double => "double",
            BaseType::LongDouble => "long double",
            BaseType::Short => "short",
            BaseType::Long => "long",
            BaseType::LongLong => "long long",
            BaseType::UShort => "unsigned short",
            BaseType::ULong => "unsigned long",
            BaseType::ULongLong => "unsigned long long",
            BaseType::Char => "char",
            BaseType::WChar => "wchar",
            BaseType::Boolean => "boolean",
            BaseType::Octet => "octet",
            BaseType::Any => "any",
            BaseType::Object => "Object",
            BaseType::ValueBase => "ValueBase",
        }
    }
}

/// A possibly qualified name such as `::CORBA::Object` or `Inner::T`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedName {
    /// Starts with `::` (resolution begins at the root scope).
    pub absolute: bool,
    pub parts: Vec<Ident>,
    pub span: Span,
}

impl ScopedName {
    pub fn last(&self) -> Option<&Ident> {
        self.parts.last()
    }

    pub fn is_simple(&self) -> bool {
        !self.absolute && self.parts.len() == 1
    }
}

impl fmt::Display for ScopedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, "::")?;
        }
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, "::")?;
            }
            write!(f, "{}", part.node)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub direction: ParamDirection,
    pub ty: TypeSpec,
    pub name: Ident,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpDecl {
    pub oneway: bool,
    /// `None` for `void`.
    pub return_type: Option<TypeSpec>,
    pub name: Ident,
    pub params: Vec<ParamDecl>,
    pub raises: Vec<ScopedName>,
    pub context: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrDecl {
    pub readonly: bool,
    pub ty: TypeSpec,
    pub names: Vec<Ident>,
    pub get_raises: Vec<ScopedName>,
    pub set_raises: Vec<ScopedName>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pragma {
    pub kind: PragmaKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PragmaKind {
    /// `#pragma prefix "omg.org"`
    Prefix(String),
    /// `#pragma ID Name "IDL:Name:1.0"`
    Id { name: ScopedName, id: String },
    /// `#pragma version Name 1.2`
    Version { name: ScopedName, version: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstExpr {
    pub kind: ConstExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstExprKind {
    Literal(Literal),
    Scoped(ScopedName),
    Unary {
        op: UnaryOp,
        operand: Box<ConstExpr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<ConstExpr>,
        rhs: Box<ConstExpr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(u64),
    Float(f64),
    Fixed(String),
    Char(String),
    String(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    Xor,
    And,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}
