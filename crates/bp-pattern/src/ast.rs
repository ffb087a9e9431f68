//! Pattern node definitions and the arena that owns them.
//!
//! The node set mirrors the bp surface syntax: single-character atoms,
//! zero-width anchors, PEG combinators (sequence, ordered choice, greedy
//! repetition, lookaround, negation), captures, inline replacements, and
//! named definitions with references. Match-length bounds are computed
//! structurally at insertion time, bottom-up, so a parent node can read its
//! children's bounds from the arena while it is being built.

/// Byte span into the pattern source a node was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a span covering `start..end`.
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

/// Stable index of a pattern node inside its [`PatternSet`].
///
/// Ids are assigned monotonically and double as the pattern component of the
/// matcher's memoization key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatId(u32);

impl PatId {
    /// The arena slot this id refers to.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw id value, used as a memoization key component.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// The kind of a pattern node.
///
/// Children are stored as [`PatId`] indices into the owning arena. Sequences
/// are binary and right-leaning: `a b c` is `Chain(a, Chain(b, c))`, which
/// lets a backreffable capture in `a` scope everything that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatKind {
    /// One UTF-8 codepoint that is not a newline.
    AnyChar,
    /// A single byte in the inclusive range `lo..=hi`.
    ByteRange { lo: u8, hi: u8 },
    /// An exact byte sequence. Zero-length literals match zero-width.
    Literal(Vec<u8>),
    /// One identifier-start codepoint (ASCII letter or `_`).
    IdStart,
    /// One identifier-continue codepoint (ASCII letter, digit, `_`, or `-`).
    IdContinue,
    /// Zero-width: at an identifier boundary.
    WordBoundary,
    /// Zero-width: at the start of a line.
    LineStart,
    /// Zero-width: at the start of the input region.
    FileStart,
    /// Zero-width: at the end of a line.
    LineEnd,
    /// Zero-width: at the end of the input region (a final newline counts).
    FileEnd,
    /// A newline followed by the current line's leading-whitespace prefix.
    Nodent,
    /// The current line's leading-whitespace prefix, at the current position.
    CurDent,
    /// Zero-width: succeeds iff the inner pattern fails here.
    Not(PatId),
    /// Zero-width lookahead: succeeds iff the inner pattern matches here.
    Before(PatId),
    /// Zero-width lookbehind. The inner pattern must have a bounded maximum
    /// match length; the parser rejects it otherwise.
    After(PatId),
    /// Sequence: match the first, then the second from where it ended.
    Chain(PatId, PatId),
    /// Ordered choice: try the first; only on failure try the second.
    Otherwise(PatId, PatId),
    /// Greedy non-backtracking repetition with an optional separator.
    /// `max == None` means unbounded.
    Repeat {
        min: u32,
        max: Option<u32>,
        pat: PatId,
        sep: Option<PatId>,
    },
    /// Advance until `target` matches at the current position (the target is
    /// peeked, never consumed). Steps go through `skip` when it matches;
    /// the non-strict form also falls back to a single codepoint, stopping
    /// at newlines. With neither target nor skip, runs to end of line.
    Upto {
        target: Option<PatId>,
        skip: Option<PatId>,
        strict: bool,
    },
    /// `pat ~ inner`: the text matched by `pat` must itself contain a match
    /// of `inner`.
    MatchedBy { pat: PatId, inner: PatId },
    /// `pat !~ inner`: the text matched by `pat` must not contain a match of
    /// `inner`.
    NotMatchedBy { pat: PatId, inner: PatId },
    /// A capture. Backreffable captures install their matched bytes as a
    /// literal definition scoping the rest of the chain they appear in.
    Capture {
        pat: PatId,
        name: Option<Vec<u8>>,
        backreffable: bool,
    },
    /// An inherently named capture, produced by `@:Tag` syntax and tagged
    /// definitions (`name:: body`).
    Tagged { pat: PatId, tag: Vec<u8> },
    /// An inline replacement: when rendered, `text` is emitted with `@` and
    /// backslash substitutions instead of the matched bytes.
    Replace { pat: Option<PatId>, text: Vec<u8> },
    /// A reference to a named definition in the active scope.
    Ref { name: Vec<u8> },
    /// A named definition scoping its continuation. `next` is either another
    /// definition or the expression the definitions govern.
    Def {
        name: Vec<u8>,
        meaning: PatId,
        next: Option<PatId>,
    },
}

/// A pattern node: kind, source span, and structural match-length bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatNode {
    /// What this node matches.
    pub kind: PatKind,
    /// Where in the pattern source this node came from.
    pub span: Span,
    /// Minimum number of input bytes a match of this node can cover.
    pub min_len: usize,
    /// Maximum number of input bytes, or `None` when unbounded.
    pub max_len: Option<usize>,
}

impl PatNode {
    /// True when this node can only ever match zero-width.
    pub fn is_zero_width(&self) -> bool {
        self.max_len == Some(0)
    }
}

// Longest UTF-8 encoding of a single codepoint.
const MAX_CHAR_LEN: usize = 4;

/// Arena owning a set of pattern nodes.
///
/// Nodes are appended and never removed individually; [`PatternSet::clear`]
/// drops the whole set at once. Several independently compiled patterns may
/// share one set (the engine compiles everything into a single arena).
#[derive(Debug, Default)]
pub struct PatternSet {
    nodes: Vec<PatNode>,
}

impl PatternSet {
    /// Create an empty arena.
    pub fn new() -> Self {
        PatternSet::default()
    }

    /// Number of nodes currently allocated.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no nodes have been allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node, releasing the whole arena at once.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Look up a node by id.
    pub fn node(&self, id: PatId) -> &PatNode {
        &self.nodes[id.index()]
    }

    /// Look up just the kind of a node.
    pub fn kind(&self, id: PatId) -> &PatKind {
        &self.nodes[id.index()].kind
    }

    /// Insert a node, computing its match-length bounds from its children.
    pub fn insert(&mut self, kind: PatKind, span: Span) -> PatId {
        let (min_len, max_len) = self.bounds_of(&kind);
        let id = PatId(self.nodes.len() as u32);
        self.nodes.push(PatNode { kind, span, min_len, max_len });
        id
    }

    /// Build a sequence of two patterns, eliding zero-length literals.
    pub fn chain(&mut self, first: PatId, second: PatId) -> PatId {
        if self.is_empty_literal(first) {
            return second;
        }
        if self.is_empty_literal(second) {
            return first;
        }
        let span = Span::new(self.node(first).span.start, self.node(second).span.end);
        self.insert(PatKind::Chain(first, second), span)
    }

    /// Fold a list of juxtaposed patterns into a right-leaning chain.
    ///
    /// Right-leaning nesting is what lets a backreffable capture early in the
    /// list scope every pattern after it.
    pub fn chain_all(&mut self, items: &[PatId]) -> Option<PatId> {
        let mut iter = items.iter().rev().copied();
        let last = iter.next()?;
        let mut acc = last;
        for item in iter {
            acc = self.chain(item, acc);
        }
        Some(acc)
    }

    /// Build an ordered choice of two patterns.
    pub fn choice(&mut self, first: PatId, second: PatId) -> PatId {
        let span = Span::new(self.node(first).span.start, self.node(second).span.end);
        self.insert(PatKind::Otherwise(first, second), span)
    }

    fn is_empty_literal(&self, id: PatId) -> bool {
        matches!(self.kind(id), PatKind::Literal(bytes) if bytes.is_empty())
    }

    fn child_bounds(&self, id: PatId) -> (usize, Option<usize>) {
        let node = self.node(id);
        (node.min_len, node.max_len)
    }

    fn bounds_of(&self, kind: &PatKind) -> (usize, Option<usize>) {
        match kind {
            PatKind::AnyChar => (1, Some(MAX_CHAR_LEN)),
            PatKind::ByteRange { .. } => (1, Some(1)),
            PatKind::Literal(bytes) => (bytes.len(), Some(bytes.len())),
            PatKind::IdStart | PatKind::IdContinue => (1, Some(1)),
            PatKind::WordBoundary
            | PatKind::LineStart
            | PatKind::FileStart
            | PatKind::LineEnd
            | PatKind::FileEnd
            | PatKind::Not(_)
            | PatKind::Before(_)
            | PatKind::After(_) => (0, Some(0)),
            // The indentation prefix has no structural length limit.
            PatKind::Nodent => (1, None),
            PatKind::CurDent => (0, None),
            PatKind::Chain(a, b) => {
                let (amin, amax) = self.child_bounds(*a);
                let (bmin, bmax) = self.child_bounds(*b);
                (amin.saturating_add(bmin), add_max(amax, bmax))
            }
            PatKind::Otherwise(a, b) => {
                let (amin, amax) = self.child_bounds(*a);
                let (bmin, bmax) = self.child_bounds(*b);
                let max = match (amax, bmax) {
                    (Some(x), Some(y)) => Some(x.max(y)),
                    _ => None,
                };
                (amin.min(bmin), max)
            }
            PatKind::Repeat { min, max, pat, sep } => {
                let (pmin, pmax) = self.child_bounds(*pat);
                let (smin, smax) = match sep {
                    Some(s) => self.child_bounds(*s),
                    None => (0, Some(0)),
                };
                let n = *min as usize;
                let min_len = pmin
                    .saturating_mul(n)
                    .saturating_add(smin.saturating_mul(n.saturating_sub(1)));
                let max_len = match max {
                    None => {
                        // Unbounded repetition of zero-width patterns still
                        // covers zero bytes.
                        if pmax == Some(0) && smax == Some(0) {
                            Some(0)
                        } else {
                            None
                        }
                    }
                    Some(0) => Some(0),
                    Some(m) => {
                        let m = *m as usize;
                        mul_max(pmax, m).and_then(|p| {
                            mul_max(smax, m - 1).map(|s| p.saturating_add(s))
                        })
                    }
                };
                (min_len, max_len)
            }
            PatKind::Upto { .. } => (0, None),
            PatKind::MatchedBy { pat, .. } | PatKind::NotMatchedBy { pat, .. } => {
                self.child_bounds(*pat)
            }
            PatKind::Capture { pat, .. } => self.child_bounds(*pat),
            PatKind::Tagged { pat, .. } => self.child_bounds(*pat),
            PatKind::Replace { pat, .. } => match pat {
                Some(p) => self.child_bounds(*p),
                None => (0, Some(0)),
            },
            // A reference's meaning is only known at match time.
            PatKind::Ref { .. } => (0, None),
            PatKind::Def { next, .. } => match next {
                Some(n) => self.child_bounds(*n),
                None => (0, Some(0)),
            },
        }
    }
}

fn add_max(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.saturating_add(y)),
        _ => None,
    }
}

fn mul_max(a: Option<usize>, n: usize) -> Option<usize> {
    a.map(|x| x.saturating_mul(n))
}
