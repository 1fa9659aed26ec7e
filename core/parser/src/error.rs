//! Parse error types.

use vibe_ast::Position;

/// An error produced while lexing or parsing source text.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A token other than the expected one was found.
    #[error("expected {expected}, got {found} at line {}, col {}", .position.line(), .position.column())]
    Expected {
        /// Description of the expected token or construct.
        expected: Box<str>,
        /// The token actually found.
        found: Box<str>,
        /// Where the unexpected token starts.
        position: Position,
    },

    /// A general syntax error at a known position.
    #[error("{message} at line {}, col {}", .position.line(), .position.column())]
    General {
        /// The error description.
        message: Box<str>,
        /// Where the problem starts.
        position: Position,
    },

    /// The source ended in the middle of a construct.
    #[error("unexpected end of input")]
    AbruptEnd,
}

impl Error {
    /// Creates an [`Error::Expected`].
    pub fn expected<E, F>(expected: E, found: F, position: Position) -> Self
    where
        E: Into<Box<str>>,
        F: Into<Box<str>>,
    {
        Self::Expected {
            expected: expected.into(),
            found: found.into(),
            position,
        }
    }

    /// Creates an [`Error::General`].
    pub fn general<M>(message: M, position: Position) -> Self
    where
        M: Into<Box<str>>,
    {
        Self::General {
            message: message.into(),
            position,
        }
    }
}
