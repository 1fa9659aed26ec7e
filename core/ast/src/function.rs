//! Function, class and parameter definitions.

use crate::{expression::Expression, position::Position, statement::Statement};

/// The value kinds a parameter or return type annotation can name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TypeAnnotation {
    /// `Integer`
    Integer,
    /// `Float`
    Float,
    /// `String`
    String,
    /// `Symbol`
    Symbol,
    /// `Bool`
    Bool,
    /// `Array`
    Array,
    /// `Hash`
    Hash,
    /// `Duration`
    Duration,
    /// `Money`
    Money,
    /// `Time`
    Time,
}

impl TypeAnnotation {
    /// The annotation as written in source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::String => "String",
            Self::Symbol => "Symbol",
            Self::Bool => "Bool",
            Self::Array => "Array",
            Self::Hash => "Hash",
            Self::Duration => "Duration",
            Self::Money => "Money",
            Self::Time => "Time",
        }
    }

    /// Resolves a source name to an annotation, if it names one.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Integer" => Self::Integer,
            "Float" => Self::Float,
            "String" => Self::String,
            "Symbol" => Self::Symbol,
            "Bool" => Self::Bool,
            "Array" => Self::Array,
            "Hash" => Self::Hash,
            "Duration" => Self::Duration,
            "Money" => Self::Money,
            "Time" => Self::Time,
            _ => return None,
        })
    }
}

/// A formal parameter of a function or block.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    /// The parameter name.
    pub name: String,
    /// Optional type annotation, `name : Integer`.
    pub type_annotation: Option<TypeAnnotation>,
    /// Optional default value, `name = expr`.
    pub default: Option<Expression>,
    /// Position of the parameter name.
    pub position: Position,
}

/// A `def … end` definition.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDef {
    /// The function name.
    pub name: String,
    /// Formal parameters in declaration order.
    pub params: Vec<Param>,
    /// Optional return type annotation.
    pub return_type: Option<TypeAnnotation>,
    /// The function body.
    pub body: Vec<Statement>,
    /// Whether the definition was marked `private`.
    pub private: bool,
    /// Position of the `def` keyword.
    pub position: Position,
}

/// A `class … end` definition.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassDef {
    /// The class name.
    pub name: String,
    /// Instance methods in declaration order.
    pub methods: Vec<FunctionDef>,
    /// Class methods (`def self.name`) in declaration order.
    pub class_methods: Vec<FunctionDef>,
    /// Class variable initializers (`@@name = expr`) in declaration order.
    pub class_vars: Vec<(String, Expression)>,
    /// Position of the `class` keyword.
    pub position: Position,
}
