//! Compile and runtime error types, and the user-facing error renderer.

use std::{fmt, sync::Arc};
use vibe_ast::Position;

/// How many leading stack frames are printed before eliding.
const FRAME_HEAD_BUDGET: usize = 10;
/// How many trailing stack frames are printed after eliding.
const FRAME_TAIL_BUDGET: usize = 5;
/// Context lines shown on each side of the failing line in a code frame.
const CODE_FRAME_CONTEXT: u32 = 2;

/// An error produced while turning source text into a callable script.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The parser rejected the source.
    #[error(transparent)]
    Syntax(#[from] vibe_parser::Error),

    /// Two top-level functions share a name.
    #[error("duplicate function `{0}`")]
    DuplicateFunction(String),

    /// Two classes share a name, or two methods collide within one class.
    #[error("duplicate class `{0}`")]
    DuplicateClass(String),

    /// A statement kind that module files may not contain at the top level.
    #[error("unsupported top-level statement in module at line {}, col {}", .0.line(), .0.column())]
    UnsupportedTopLevel(Position),
}

/// Classification used by `rescue` clauses.
///
/// Scripts cannot define new error classes; every failure is either a
/// general runtime error or an assertion failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Any runtime failure: type mismatches, quota exhaustion, contract
    /// violations, module problems, cancellation.
    Runtime,
    /// Raised only by the `assert` builtins.
    Assertion,
}

impl ErrorKind {
    /// The name scripts use to rescue this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Runtime => "RuntimeError",
            Self::Assertion => "AssertionError",
        }
    }
}

/// One entry of a captured call stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// The function whose body was executing.
    pub function: String,
    /// Where within it, when known.
    pub position: Option<Position>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) if pos.column() > 0 => {
                write!(f, "{} ({}:{})", self.function, pos.line(), pos.column())
            }
            Some(pos) => write!(f, "{} (line {})", self.function, pos.line()),
            None => f.write_str(&self.function),
        }
    }
}

/// A runtime failure, carrying its classification, position and the call
/// stack at the moment it was raised.
///
/// `Display` prints only the message; use [`RuntimeError::render`] for the
/// full report with code frame and stack dump.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeError {
    kind: ErrorKind,
    message: String,
    position: Option<Position>,
    frames: Vec<Frame>,
    /// The source text `position` refers to — the module file for errors
    /// raised inside a required module.
    source: Option<Arc<str>>,
}

impl RuntimeError {
    /// Creates an unpositioned error; the evaluator attaches position and
    /// frames at the first expression boundary it crosses.
    pub fn new<M: Into<String>>(kind: ErrorKind, message: M) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
            frames: Vec::new(),
            source: None,
        }
    }

    /// Shorthand for a general runtime error.
    pub fn runtime<M: Into<String>>(message: M) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    /// Shorthand for an assertion failure.
    pub fn assertion<M: Into<String>>(message: M) -> Self {
        Self::new(ErrorKind::Assertion, message)
    }

    /// Wraps an error raised by host code behind a capability method,
    /// qualifying the message with the method name. Host code that already
    /// has a `RuntimeError` should return it unchanged instead.
    pub fn from_host<E: fmt::Display>(method: &str, err: E) -> Self {
        Self::runtime(format!("{method}: {err}"))
    }

    /// The error's rescue classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The source position the error is anchored to, if any.
    #[must_use]
    pub const fn position(&self) -> Option<Position> {
        self.position
    }

    /// The captured call stack, innermost frame first.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Whether the error has been anchored to a position yet.
    ///
    /// Already-anchored errors are passed through unchanged by the
    /// evaluator to avoid double-wrapping.
    #[must_use]
    pub const fn is_anchored(&self) -> bool {
        self.position.is_some()
    }

    pub(crate) fn anchor(
        mut self,
        position: Position,
        frames: Vec<Frame>,
        source: Option<Arc<str>>,
    ) -> Self {
        if self.position.is_none() {
            self.position = Some(position);
            self.frames = frames;
            self.source = source;
        }
        self
    }

    /// Renders the full report: message, an optional code frame, and the
    /// (budgeted) stack dump.
    ///
    /// The code frame is drawn against the source captured when the error
    /// was anchored — the module file for errors raised inside a required
    /// module — falling back to `source` when none was captured.
    #[must_use]
    pub fn render(&self, source: Option<&str>) -> String {
        let mut out = self.message.clone();

        let source = self.source.as_deref().or(source);
        if let (Some(position), Some(source)) = (self.position, source) {
            if let Some(frame) = render_code_frame(source, position) {
                out.push_str("\n\n");
                out.push_str(&frame);
            }
        }

        if !self.frames.is_empty() {
            out.push_str("\n\nstack:");
            let total = self.frames.len();
            if total > FRAME_HEAD_BUDGET + FRAME_TAIL_BUDGET {
                for frame in &self.frames[..FRAME_HEAD_BUDGET] {
                    out.push_str(&format!("\n  at {frame}"));
                }
                let omitted = total - FRAME_HEAD_BUDGET - FRAME_TAIL_BUDGET;
                out.push_str(&format!("\n  ... {omitted} frames omitted ..."));
                for frame in &self.frames[total - FRAME_TAIL_BUDGET..] {
                    out.push_str(&format!("\n  at {frame}"));
                }
            } else {
                for frame in &self.frames {
                    out.push_str(&format!("\n  at {frame}"));
                }
            }
        }

        out
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Extracts the failing line ± context from the source, with a caret under
/// the failing column when it is known.
fn render_code_frame(source: &str, position: Position) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    let line = position.line();
    if line == 0 || line as usize > lines.len() {
        return None;
    }
    let first = line.saturating_sub(CODE_FRAME_CONTEXT).max(1);
    let last = (line + CODE_FRAME_CONTEXT).min(lines.len() as u32);
    let width = last.to_string().len();

    let mut out = String::new();
    for n in first..=last {
        let text = lines[(n - 1) as usize];
        let marker = if n == line { ">" } else { " " };
        out.push_str(&format!("{marker} {n:width$} | {text}\n"));
        if n == line && position.column() > 0 {
            let pad = " ".repeat(width + (position.column() as usize - 1));
            out.push_str(&format!("  {pad} | ^\n"));
        }
    }
    out.pop();
    Some(out)
}
