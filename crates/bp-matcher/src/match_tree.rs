//! Match nodes and the pool that recycles them.
//!
//! A successful match is a tree: the root covers the whole matched span and
//! `children` hold the sub-matches produced along the way, in source order.
//! The caller owns the tree returned by a search and is expected to hand it
//! back to the pool before asking for the next match; recycled nodes keep
//! their child vectors' capacity, so steady-state searching allocates
//! nothing.

use bp_pattern::PatId;

/// One node of a match tree.
///
/// `start == end` is legal: zero-width assertions and empty literals produce
/// empty spans. Child spans never extend outside an ancestor's span except
/// for lookaround children, which the renderer clips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The pattern node this match was produced by.
    pub pat: PatId,
    /// Start offset into the input (inclusive).
    pub start: usize,
    /// End offset into the input (exclusive).
    pub end: usize,
    /// Sub-matches in source order.
    pub children: Vec<Match>,
}

impl Match {
    /// Length of the matched span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True for zero-width matches.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Free list of match nodes.
///
/// `take` pops a recycled node or allocates a fresh one; `recycle` walks a
/// tree back into the list without recursing on the host stack.
#[derive(Debug, Default)]
pub struct MatchPool {
    free: Vec<Match>,
}

impl MatchPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        MatchPool::default()
    }

    /// Number of nodes currently waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Produce a childless node for `pat` covering `start..end`.
    pub fn take(&mut self, pat: PatId, start: usize, end: usize) -> Match {
        match self.free.pop() {
            Some(mut node) => {
                node.pat = pat;
                node.start = start;
                node.end = end;
                node.children.clear();
                node
            }
            None => Match { pat, start, end, children: Vec::new() },
        }
    }

    /// Return a whole tree to the pool.
    pub fn recycle(&mut self, root: Match) {
        let mut stack = vec![root];
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
            self.free.push(node);
        }
    }

    /// Return a list of trees to the pool.
    pub fn recycle_all(&mut self, nodes: Vec<Match>) {
        for node in nodes {
            self.recycle(node);
        }
    }
}
