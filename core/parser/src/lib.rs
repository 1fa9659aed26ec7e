//! Lexer and parser for the VibeScript language.
//!
//! The crate exposes a single entry point, [`parse`], which turns UTF-8
//! source text into a [`vibe_ast::Program`]. Lexing and parsing are both
//! hand-written: a [`lexer::Lexer`] walks the source with a character
//! cursor and produces position-tagged tokens, and a recursive-descent
//! [`parser::Parser`] with precedence climbing builds the tree.
//!
//! Errors carry the line and column of the offending token so embedders can
//! surface compile errors without re-lexing.

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::Error;

use vibe_ast::Program;

/// Parses a complete source file into a [`Program`].
///
/// # Errors
///
/// Returns a syntax [`Error`] describing the first problem found.
pub fn parse(source: &str) -> Result<Program, Error> {
    let tokens = lexer::Lexer::new(source).tokenize()?;
    parser::Parser::new(tokens).parse_program()
}
