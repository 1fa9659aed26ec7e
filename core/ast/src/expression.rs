//! Expression nodes.

use crate::{function::Param, position::Position, statement::Statement};

/// Unary operators.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    /// Arithmetic negation, `-a`.
    Neg,
    /// Boolean negation, `!a`.
    Not,
}

/// Binary operators, in the precedence groups the parser uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `&&` (short-circuit)
    And,
    /// `||` (short-circuit)
    Or,
}

impl BinaryOp {
    /// The operator as it appears in source, for error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// A `do |params| … end` block literal attached to a call.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockLiteral {
    /// Declared block parameters, possibly type-annotated.
    pub params: Vec<Param>,
    /// The block body.
    pub body: Vec<Statement>,
    /// Position of the `do` keyword.
    pub position: Position,
}

/// A call expression: `f(a, b)`, `obj.m(a, key: v) do |x| … end`.
#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    /// The callee: an identifier or a member expression.
    pub callee: Box<Expression>,
    /// Positional arguments in source order.
    pub args: Vec<Expression>,
    /// Keyword arguments in source order.
    pub kwargs: Vec<(String, Expression)>,
    /// Optional trailing block literal.
    pub block: Option<BlockLiteral>,
    /// Position of the opening parenthesis.
    pub position: Position,
}

/// One `when` clause of a `case` expression.
#[derive(Clone, Debug, PartialEq)]
pub struct WhenClause {
    /// Candidate values; the clause matches if any equals the subject.
    pub values: Vec<Expression>,
    /// The clause body.
    pub body: Vec<Statement>,
    /// Position of the `when` keyword.
    pub position: Position,
}

/// A `case … when … else … end` expression.
#[derive(Clone, Debug, PartialEq)]
pub struct CaseExpr {
    /// The subject being matched.
    pub subject: Box<Expression>,
    /// The `when` clauses in source order.
    pub whens: Vec<WhenClause>,
    /// The optional `else` body.
    pub else_body: Option<Vec<Statement>>,
    /// Position of the `case` keyword.
    pub position: Position,
}

/// The expression node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// `nil`
    Nil(Position),
    /// `true` / `false`
    Bool(bool, Position),
    /// An integer literal.
    Int(i64, Position),
    /// A float literal.
    Float(f64, Position),
    /// A string literal.
    StringLit(String, Position),
    /// A symbol literal, `:name`.
    SymbolLit(String, Position),
    /// A plain identifier reference.
    Identifier(String, Position),
    /// An instance variable reference, `@name`.
    IVar(String, Position),
    /// A class variable reference, `@@name`.
    ClassVar(String, Position),
    /// The `self` keyword.
    SelfExpr(Position),
    /// An array literal.
    ArrayLit(Vec<Expression>, Position),
    /// A hash literal with `name:` keys, in source order.
    HashLit(Vec<(String, Expression)>, Position),
    /// An inclusive range, `a..b`.
    Range {
        /// Lower bound expression.
        start: Box<Expression>,
        /// Upper bound expression (inclusive).
        end: Box<Expression>,
        /// Position of the `..` token.
        position: Position,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expression>,
        /// Position of the operator.
        position: Position,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left-hand side.
        lhs: Box<Expression>,
        /// Right-hand side.
        rhs: Box<Expression>,
        /// Position of the operator.
        position: Position,
    },
    /// A member access, `target.name`.
    Member {
        /// The receiver expression.
        target: Box<Expression>,
        /// The member name.
        name: String,
        /// Position of the member name.
        position: Position,
    },
    /// An index access, `target[index]`.
    Index {
        /// The indexed expression.
        target: Box<Expression>,
        /// The index expression.
        index: Box<Expression>,
        /// Position of the opening bracket.
        position: Position,
    },
    /// A call.
    Call(CallExpr),
    /// `yield(args…)`
    Yield(Vec<Expression>, Position),
    /// `case … when … end`
    Case(CaseExpr),
    /// `require("name", as: alias)`
    Require {
        /// The module name expression.
        name: Box<Expression>,
        /// The optional `as:` alias expression.
        alias: Option<Box<Expression>>,
        /// Position of the `require` keyword.
        position: Position,
    },
}

impl Expression {
    /// The source position of the expression, for error wrapping.
    #[must_use]
    pub fn position(&self) -> Position {
        match self {
            Self::Nil(p)
            | Self::Bool(_, p)
            | Self::Int(_, p)
            | Self::Float(_, p)
            | Self::StringLit(_, p)
            | Self::SymbolLit(_, p)
            | Self::Identifier(_, p)
            | Self::IVar(_, p)
            | Self::ClassVar(_, p)
            | Self::SelfExpr(p)
            | Self::ArrayLit(_, p)
            | Self::HashLit(_, p)
            | Self::Yield(_, p) => *p,
            Self::Range { position, .. }
            | Self::Unary { position, .. }
            | Self::Binary { position, .. }
            | Self::Member { position, .. }
            | Self::Index { position, .. }
            | Self::Require { position, .. } => *position,
            Self::Call(call) => call.position,
            Self::Case(case) => case.position,
        }
    }
}
