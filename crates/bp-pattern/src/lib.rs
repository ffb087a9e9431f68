//! Pattern AST and arena for the bp pattern engine.
//!
//! A compiled pattern is a tree of [`PatNode`]s stored in a [`PatternSet`]
//! arena and addressed by [`PatId`] indices. Every node carries the byte span
//! of the source text it was parsed from and structural match-length bounds
//! that the matcher uses to prune lookbehind and to fast-forward searches.
//!
//! The arena owns every node for the life of the set; freeing is wholesale
//! (drop or [`PatternSet::clear`]). Nodes never point back at their parents,
//! so the tree is safe to walk with plain indices.

#![warn(clippy::all)]
#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::match_same_arms,
    clippy::uninlined_format_args
)]

pub mod ast;
pub mod chars;

pub use ast::{PatId, PatKind, PatNode, PatternSet, Span};
