//! Source positions and spans.

use std::fmt;

/// A line/column cursor into the original source text.
///
/// Lines and columns are 1-based; column 0 is used as a sentinel by the
/// runtime when only the line of an event is known.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// The 1-based line number.
    #[must_use]
    pub const fn line(self) -> u32 {
        self.line
    }

    /// The 1-based column number, or 0 when unknown.
    #[must_use]
    pub const fn column(self) -> u32 {
        self.column
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open region of source, from the first character of a construct to
/// the position just past its last character.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Span {
    start: Position,
    end: Position,
}

impl Span {
    /// Creates a span from its endpoints.
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// The starting position.
    #[must_use]
    pub const fn start(self) -> Position {
        self.start
    }

    /// The position one past the end.
    #[must_use]
    pub const fn end(self) -> Position {
        self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.start, self.end)
    }
}
