//! Error types for the bp pattern engine.
//!
//! The engine distinguishes two failure taxa:
//!
//! 1. [`ParseError`]: a user-visible syntactic error in pattern source,
//!    carrying a byte span and a human-readable message. Raised only by the
//!    compile operations, never during matching.
//! 2. Invariant failures: engine bugs (an unresolved reference surviving to
//!    match time, an unbounded lookbehind slipping past the parser). These
//!    are not represented as a value; the matcher reacts per the configured
//!    [`InvariantMode`]: abort the process with a diagnostic, or log and
//!    degrade to "no match" for embedded hosts that must stay alive.
//!
//! Match failures are not errors at all; the matcher reports them as
//! `None`.
//!
//! # Basic error handling
//!
//! ```
//! use bp_error::{ParseError, ParseResult};
//! use bp_pattern::Span;
//!
//! fn check(result: ParseResult<()>) {
//!     match result {
//!         Ok(()) => {}
//!         Err(ParseError::Syntax { message, span }) => {
//!             eprintln!("pattern error at {}..{}: {}", span.start, span.end, message);
//!         }
//!     }
//! }
//! check(Err(ParseError::syntax("expected a pattern", Span::new(3, 4))));
//! ```

#![warn(clippy::all)]
#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

use bp_pattern::Span;
use thiserror::Error;

/// Result type for the compile operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// A syntactic error in pattern source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Malformed pattern syntax: unterminated strings, missing closing
    /// brackets, unknown escapes, high-to-low ranges, variable-length
    /// lookbehind, unknown identifiers, or a missing required atom.
    #[error("{message} at {}..{}", span.start, span.end)]
    Syntax {
        /// Human-readable description of what went wrong.
        message: String,
        /// Byte span into the pattern source.
        span: Span,
    },
}

impl ParseError {
    /// Construct a syntax error over the given source span.
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        ParseError::Syntax { message: message.into(), span }
    }

    /// The source span this error points at.
    pub fn span(&self) -> Span {
        match self {
            ParseError::Syntax { span, .. } => *span,
        }
    }

    /// Render a caret-style context line for this error.
    ///
    /// `source` must be the pattern text the error was produced from. The
    /// output is the offending line followed by a caret run underneath the
    /// error span; multi-line spans are clipped to their first line.
    pub fn context_line(&self, source: &[u8]) -> String {
        let span = self.span();
        let start = span.start.min(source.len());
        let line_start = match source[..start].iter().rposition(|&b| b == b'\n') {
            Some(i) => i + 1,
            None => 0,
        };
        let line_end = source[line_start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(source.len(), |i| line_start + i);
        let line = String::from_utf8_lossy(&source[line_start..line_end]);
        let col = start - line_start;
        let width = span.end.clamp(start + 1, line_end.max(start + 1)) - start;
        format!("{}\n{}{}", line, " ".repeat(col), "^".repeat(width))
    }
}

/// What a compile entry point does with an uncaught [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Return the error to the caller (the library default).
    #[default]
    Return,
    /// Print the error and abort the process, for command-line hosts that
    /// treat a bad pattern as fatal.
    Abort,
}

/// What the matcher does when an internal invariant is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvariantMode {
    /// Abort the process with a diagnostic (the default contract).
    #[default]
    Abort,
    /// Log the violation and report "no match", for embedded hosts.
    Recover,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_formats_span() {
        let err = ParseError::syntax("unterminated string", Span::new(4, 9));
        assert_eq!(err.to_string(), "unterminated string at 4..9");
    }

    #[test]
    fn context_line_points_at_the_span() {
        let src = b"foo: \"bar\nnext";
        let err = ParseError::syntax("unterminated string", Span::new(5, 9));
        assert_eq!(err.context_line(src), "foo: \"bar\n     ^^^^");
    }

    #[test]
    fn context_line_clips_to_first_line() {
        let src = b"a\nbcd";
        let err = ParseError::syntax("bad", Span::new(2, 5));
        assert_eq!(err.context_line(src), "bcd\n^^^");
    }
}
