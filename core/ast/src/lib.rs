//! Parse nodes for the VibeScript language.
//!
//! This crate defines the abstract syntax tree produced by
//! [`vibe_parser`](https://docs.rs/vibe_parser) and consumed, read-only, by
//! the `vibe_engine` tree walker. Nodes carry [`Position`] information so the
//! runtime can attach source locations to errors without re-scanning the
//! source.
//!
//! The tree is deliberately plain data: `Clone + Debug + PartialEq`, no
//! interning and no shared ownership. The engine decides what to wrap in
//! `Arc` when it compiles a [`Program`] into a callable script.

pub mod expression;
pub mod function;
pub mod position;
pub mod statement;

pub use expression::{
    BinaryOp, BlockLiteral, CallExpr, CaseExpr, Expression, UnaryOp, WhenClause,
};
pub use function::{ClassDef, FunctionDef, Param, TypeAnnotation};
pub use position::{Position, Span};
pub use statement::{
    AssignTarget, ElsifClause, IfStatement, RescueClause, RescueType, Statement, TryStatement,
};

/// A parsed source file: the ordered list of top-level statements.
///
/// Function and class definitions appear as ordinary statements; the engine
/// extracts them into lookup tables when it compiles the program.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    statements: Vec<Statement>,
}

impl Program {
    /// Creates a program from its top-level statements.
    #[must_use]
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// The top-level statements in source order.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }
}
