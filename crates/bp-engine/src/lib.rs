//! bp pattern engine: compile bp patterns, search byte regions, render
//! replacements.
//!
//! This crate ties the engine together behind an [`Engine`] handle that owns
//! the pattern arena, the match-node pool, and the failure-handling options.
//! Two engines share no state and never observe each other's patterns or
//! matches.
//!
//! The pattern syntax mixes PEG operators with regex-like conveniences:
//! ordered choice, juxtaposition sequences, prefix quantifiers, lookaround,
//! captures, backreferences, inline replacements, and named definitions with
//! full left-recursion support. See the `bp-parser` crate docs for the
//! syntax table.
//!
//! # Searching
//!
//! ```
//! use bp_engine::Engine;
//!
//! # fn main() -> Result<(), bp_engine::ParseError> {
//! let mut engine = Engine::new();
//! let pat = engine.compile_pattern(b"\"answer=\" @+`0-9")?;
//!
//! let input = b"the answer=42 is known";
//! let m = engine.next_match(pat, input, None, None, false).unwrap();
//! assert_eq!(&input[m.start..m.end], b"answer=42");
//!
//! let digits = engine.numbered_capture(&m, 1).unwrap();
//! assert_eq!(&input[digits.start..digits.end], b"42");
//! engine.recycle_match(m);
//! # Ok(())
//! # }
//! ```
//!
//! # Replacing
//!
//! ```
//! use bp_engine::Engine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = Engine::new();
//! let inner = engine.compile_pattern(b"@word=+\\i")?;
//! let pat = engine.compile_replacement(inner, b"<@word>")?;
//!
//! let input = b"one two";
//! let m = engine.next_match(pat, input, None, None, false).unwrap();
//! let mut out = Vec::new();
//! engine.render_match(input, &m, &mut out)?;
//! assert_eq!(out, b"<one>");
//! engine.recycle_match(m);
//! # Ok(())
//! # }
//! ```
//!
//! Matches are trees owned by the caller; hand them back with
//! [`Engine::recycle_match`] so their nodes are reused by later searches.
//! Patterns live in an arena for the life of the engine (or until
//! [`Engine::clear_patterns`]); match trees keep indices into that arena, so
//! recycle matches before clearing the patterns they refer to.

#![warn(clippy::all)]
#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

use std::io::{self, Write};

pub use bp_error::{ErrorMode, InvariantMode, ParseError, ParseResult};
pub use bp_matcher::{Match, MatchPool, SearchOptions};
pub use bp_pattern::{PatId, PatKind, PatternSet, Span};

/// Failure-handling and performance knobs for an [`Engine`].
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// What the compile operations do with a [`ParseError`].
    pub on_parse_error: ErrorMode,
    /// What the matcher does when an internal invariant is violated.
    pub on_invariant: InvariantMode,
    /// Disable to search without the prerequisite fast-forward (identical
    /// results, slower).
    pub no_prerequisite_scan: bool,
    /// Disable to search without packrat memoization (identical results,
    /// slower on grammars with shared references).
    pub no_memoize: bool,
}

/// The engine: pattern arena, match pool, and options behind one handle.
#[derive(Debug, Default)]
pub struct Engine {
    set: PatternSet,
    pool: MatchPool,
    options: EngineOptions,
}

impl Engine {
    /// An engine with default options.
    pub fn new() -> Self {
        Engine::default()
    }

    /// An engine with explicit options.
    pub fn with_options(options: EngineOptions) -> Self {
        Engine { set: PatternSet::new(), pool: MatchPool::new(), options }
    }

    /// The pattern arena, for callers that need node-level access.
    pub fn patterns(&self) -> &PatternSet {
        &self.set
    }

    /// Compile pattern source: definitions followed by an optional
    /// expression. Concatenate grammar-prelude source ahead of the user
    /// pattern to bring its definitions into scope.
    pub fn compile_pattern(&mut self, source: &[u8]) -> ParseResult<PatId> {
        let result = bp_parser::compile_pattern(&mut self.set, source);
        self.handle_parse_result(source, result)
    }

    /// Compile source that starts in string mode: literal bytes except
    /// where `\` embeds a pattern.
    pub fn compile_string_pattern(&mut self, source: &[u8]) -> ParseResult<PatId> {
        let result = bp_parser::compile_string_pattern(&mut self.set, source);
        self.handle_parse_result(source, result)
    }

    /// Wrap a compiled pattern in a replacement whose text is expanded at
    /// render time.
    pub fn compile_replacement(&mut self, pat: PatId, text: &[u8]) -> ParseResult<PatId> {
        let result = bp_parser::compile_replacement(&mut self.set, pat, text);
        self.handle_parse_result(text, result)
    }

    /// Find the first match of `pat` at or after the position implied by
    /// `prev` (starts strictly advance, by one codepoint after a zero-width
    /// match). `skip` controls where matches may begin; it never affects
    /// match content.
    pub fn next_match(
        &mut self,
        pat: PatId,
        input: &[u8],
        prev: Option<&Match>,
        skip: Option<PatId>,
        ignorecase: bool,
    ) -> Option<Match> {
        let opts = SearchOptions {
            ignorecase,
            prerequisite_scan: !self.options.no_prerequisite_scan,
            memoize: !self.options.no_memoize,
            on_invariant: self.options.on_invariant,
        };
        bp_matcher::next_match(&self.set, &mut self.pool, pat, input, prev, skip, &opts)
    }

    /// Emit a match to a byte sink: matched input verbatim, except that
    /// replacement nodes expand their text.
    pub fn render_match(
        &self,
        input: &[u8],
        m: &Match,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        bp_matcher::render_match(&self.set, input, m, out)
    }

    /// The `n`th unnamed capture inside `m` (preorder; `0` is the whole
    /// match).
    pub fn numbered_capture<'m>(&self, m: &'m Match, n: usize) -> Option<&'m Match> {
        bp_matcher::numbered_capture(&self.set, m, n)
    }

    /// The capture or tag named `name` inside `m`.
    pub fn named_capture<'m>(&self, m: &'m Match, name: &[u8]) -> Option<&'m Match> {
        bp_matcher::named_capture(&self.set, m, name)
    }

    /// Return a match tree to the pool for reuse.
    pub fn recycle_match(&mut self, m: Match) {
        self.pool.recycle(m);
    }

    /// Drop every compiled pattern at once. Previously returned [`PatId`]s
    /// and match trees referring to them become invalid.
    pub fn clear_patterns(&mut self) {
        self.set.clear();
    }

    fn handle_parse_result(
        &self,
        source: &[u8],
        result: ParseResult<PatId>,
    ) -> ParseResult<PatId> {
        if let Err(err) = &result {
            if self.options.on_parse_error == ErrorMode::Abort {
                tracing::error!("{err}");
                eprintln!("bp: {err}\n{}", err.context_line(source));
                std::process::abort();
            }
        }
        result
    }
}
