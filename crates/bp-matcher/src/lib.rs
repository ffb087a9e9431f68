//! Recursive PEG matcher for compiled bp patterns.
//!
//! Given a [`PatternSet`](bp_pattern::PatternSet) and a root node, the
//! matcher runs the pattern against an in-memory byte region and produces a
//! tree of [`Match`] nodes. Semantics are strictly PEG: ordered choice
//! commits to the first alternative, repetition is greedy and never
//! backtracks, and lookaround is zero-width. On top of the plain evaluator
//! the crate provides:
//!
//! - packrat memoization of reference evaluation, scoped per definition
//!   frame and cleared between search starts;
//! - left-recursion support through a seed-growth protocol;
//! - fixed-length lookbehind;
//! - backreferences (a backreffable capture's bytes become a literal
//!   binding for the rest of its chain);
//! - a prerequisite scan that fast-forwards the search start with `memmem`
//!   or newline jumps;
//! - a replacement renderer and capture lookup over the match tree.
//!
//! Matching never fails with an error: "no match" is `None`. Internal
//! invariant violations abort the process by default; see
//! [`SearchOptions::on_invariant`].

#![warn(clippy::all)]
#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::match_same_arms,
    clippy::uninlined_format_args
)]

mod captures;
mod machine;
mod match_tree;
mod render;
mod search;

pub use captures::{named_capture, numbered_capture};
pub use machine::SearchOptions;
pub use match_tree::{Match, MatchPool};
pub use render::render_match;
pub use search::next_match;
