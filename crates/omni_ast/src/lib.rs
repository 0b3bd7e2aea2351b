//! Omni AST definitions
//!
//! This crate defines the token model and abstract syntax tree (AST) for
//! the Omni language. It serves as the contract between the parser and the
//! compiler core. Every node carries the token that introduced it so
//! diagnostics can point at a source line and column.

pub mod token;

pub use token::{Token, TokenKind, lookup_ident};

/// The top-level AST node: a whole source file.
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// Statements in the AST.
#[derive(Debug, Clone)]
pub enum Stmt {
    Let(LetStmt),
    Return(ReturnStmt),
    Expr(ExprStmt),
    Block(BlockStmt),
    While(WhileStmt),
    For(Box<ForStmt>),
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Enum(EnumDecl),
    TypeAlias(TypeAliasDecl),
    Declare(DeclareStmt),
    Import(ImportStmt),
    Export(ExportStmt),
    Spawn(SpawnStmt),
}

/// `let name[: Type] = expr;`; `const` parses to the same node.
#[derive(Debug, Clone)]
pub struct LetStmt {
    pub token: Token,
    pub name: Ident,
    /// Optional type annotation, stored as the raw spelling.
    pub ty: Option<String>,
    pub value: Expr,
}

/// `return expr;`. A bare `return;` lowers as returning 0.
#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub token: Token,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub token: Token,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub token: Token,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub token: Token,
    pub condition: Expr,
    pub body: BlockStmt,
}

/// C-style `for (init; cond; update) body`. Every slot is optional.
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub token: Token,
    pub init: Option<Stmt>,
    pub condition: Option<Expr>,
    pub update: Option<Stmt>,
    pub body: BlockStmt,
}

/// `class C [extends P] [implements I, …] { fields; methods }`
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub token: Token,
    pub name: Ident,
    pub parent: Option<Ident>,
    pub implements: Vec<Ident>,
    pub fields: Vec<Field>,
    pub methods: Vec<FnLit>,
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub token: Token,
    pub name: Ident,
    pub methods: Vec<MethodSig>,
}

#[derive(Debug, Clone)]
pub struct MethodSig {
    pub token: Token,
    pub name: String,
    pub params: Vec<Field>,
    pub return_type: String,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub token: Token,
    pub name: Ident,
    pub members: Vec<EnumMember>,
}

/// A single enum member; `value` is `None` for auto-incremented members.
#[derive(Debug, Clone)]
pub struct EnumMember {
    pub name: Ident,
    pub value: Option<Expr>,
}

/// `type Alias = SomeType;`. The target is kept as a raw spelling and
/// resolved lazily by the compiler.
#[derive(Debug, Clone)]
pub struct TypeAliasDecl {
    pub token: Token,
    pub name: Ident,
    pub target: String,
}

/// `declare function host(p: T): R;`
#[derive(Debug, Clone)]
pub struct DeclareStmt {
    pub token: Token,
    pub name: Ident,
    pub params: Vec<Field>,
    pub return_type: String,
}

/// `import { a, b } from "mod";`. Parsed, no compile-time effect.
#[derive(Debug, Clone)]
pub struct ImportStmt {
    pub token: Token,
    pub names: Vec<Ident>,
    pub source: String,
}

/// `export stmt`. Transparent to the compiler.
#[derive(Debug, Clone)]
pub struct ExportStmt {
    pub token: Token,
    pub inner: Box<Stmt>,
}

/// `spawn f(args);`. Direct calls only.
#[derive(Debug, Clone)]
pub struct SpawnStmt {
    pub token: Token,
    pub call: CallExpr,
}

/// A named field or parameter: `name: Type [= expr]`.
#[derive(Debug, Clone)]
pub struct Field {
    pub token: Token,
    pub name: Ident,
    /// Raw type spelling ("int", "Array<int>", "Foo"); empty when omitted.
    pub ty: String,
    pub value: Option<Expr>,
}

/// Expressions in the AST.
#[derive(Debug, Clone)]
pub enum Expr {
    Int(IntLit),
    Str(StrLit),
    Bool(BoolLit),
    Ident(Ident),
    Prefix(PrefixExpr),
    Infix(InfixExpr),
    Array(ArrayLit),
    Map(MapLit),
    Index(IndexExpr),
    Member(MemberExpr),
    Call(CallExpr),
    New(NewExpr),
    This(ThisExpr),
    Super(SuperExpr),
    Assign(AssignExpr),
    If(Box<IfExpr>),
    Function(FnLit),
}

impl Expr {
    /// The token that introduced this expression, for diagnostics.
    pub fn token(&self) -> &Token {
        match self {
            Expr::Int(e) => &e.token,
            Expr::Str(e) => &e.token,
            Expr::Bool(e) => &e.token,
            Expr::Ident(e) => &e.token,
            Expr::Prefix(e) => &e.token,
            Expr::Infix(e) => &e.token,
            Expr::Array(e) => &e.token,
            Expr::Map(e) => &e.token,
            Expr::Index(e) => &e.token,
            Expr::Member(e) => &e.token,
            Expr::Call(e) => &e.token,
            Expr::New(e) => &e.token,
            Expr::This(e) => &e.token,
            Expr::Super(e) => &e.token,
            Expr::Assign(e) => &e.token,
            Expr::If(e) => &e.token,
            Expr::Function(e) => &e.token,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntLit {
    pub token: Token,
    pub value: i64,
}

#[derive(Debug, Clone)]
pub struct StrLit {
    pub token: Token,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct BoolLit {
    pub token: Token,
    pub value: bool,
}

#[derive(Debug, Clone)]
pub struct Ident {
    pub token: Token,
    pub name: String,
}

/// Prefix operators: `!` and unary `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Not,
    Neg,
}

impl std::fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrefixOp::Not => write!(f, "!"),
            PrefixOp::Neg => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrefixExpr {
    pub token: Token,
    pub op: PrefixOp,
    pub right: Box<Expr>,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    Gt,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct InfixExpr {
    pub token: Token,
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct ArrayLit {
    pub token: Token,
    pub elements: Vec<Expr>,
}

/// Map literal. Pairs keep source order so emission is deterministic.
#[derive(Debug, Clone)]
pub struct MapLit {
    pub token: Token,
    pub pairs: Vec<(Expr, Expr)>,
}

#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub token: Token,
    pub left: Box<Expr>,
    pub index: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct MemberExpr {
    pub token: Token,
    pub object: Box<Expr>,
    pub property: Ident,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub token: Token,
    pub callee: Box<Expr>,
    pub arguments: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct NewExpr {
    pub token: Token,
    pub class: Ident,
    pub arguments: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct ThisExpr {
    pub token: Token,
}

#[derive(Debug, Clone)]
pub struct SuperExpr {
    pub token: Token,
}

#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub token: Token,
    pub target: Box<Expr>,
    pub value: Box<Expr>,
}

/// `if` is an expression; both arms always leave an i32 on the operand
/// stack when lowered.
#[derive(Debug, Clone)]
pub struct IfExpr {
    pub token: Token,
    pub condition: Expr,
    pub consequence: BlockStmt,
    pub alternative: Option<BlockStmt>,
}

/// A (possibly named) function literal. Top-level function declarations
/// are expression statements wrapping a named literal.
#[derive(Debug, Clone)]
pub struct FnLit {
    pub token: Token,
    pub name: String,
    pub params: Vec<Field>,
    pub return_type: String,
    pub body: BlockStmt,
}
