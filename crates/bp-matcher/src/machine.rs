//! The recursive pattern evaluator.
//!
//! Evaluation is deterministic PEG semantics: ordered choice commits to the
//! first alternative that matches, repetition is greedy and never gives
//! back, and all failure is reported as `None`. The matcher threads a scope
//! stack: every `Def` entry (and every transient backreference binding)
//! pushes a frame holding its bindings and its own memoization cache, popped
//! on every exit path.
//!
//! Left recursion is handled with a seed-growth protocol: evaluating a
//! reference installs a sentinel binding for its name at the current
//! position; if the rule's own evaluation reads that sentinel, the result is
//! re-evaluated with the previous result as the seed until it stops growing.

use bp_error::InvariantMode;
use bp_pattern::chars;
use bp_pattern::{PatId, PatKind, PatternSet};
use rustc_hash::FxHashMap;

use crate::match_tree::{Match, MatchPool};

/// Memoization table: `(input position, pattern id)` to match end, where
/// `None` records a definite failure.
type Cache = FxHashMap<(usize, u32), Option<usize>>;

/// Knobs for a single search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Fold ASCII case when comparing literals and backreferences.
    pub ignorecase: bool,
    /// Fast-forward the search start with the leftmost concrete anchor.
    /// Disabling this changes performance, never results.
    pub prerequisite_scan: bool,
    /// Memoize reference evaluation. Disabling this changes performance,
    /// never results.
    pub memoize: bool,
    /// What to do when an engine invariant is violated.
    pub on_invariant: InvariantMode,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            ignorecase: false,
            prerequisite_scan: true,
            memoize: true,
            on_invariant: InvariantMode::default(),
        }
    }
}

/// How a name resolves in the current scope.
#[derive(Clone, Copy)]
enum Binding {
    /// A definition's meaning.
    Rule(PatId),
    /// Bytes captured by a backreffable capture; later references must
    /// match exactly this input slice again.
    Text { start: usize, end: usize },
    /// A left-recursion sentinel, indexing into the growth stack.
    LeftRec(usize),
}

struct Frame<'p> {
    names: Vec<(&'p [u8], Binding)>,
    cache: Cache,
}

impl<'p> Frame<'p> {
    fn new() -> Self {
        Frame { names: Vec::new(), cache: Cache::default() }
    }

    fn with_binding(name: &'p [u8], binding: Binding) -> Self {
        Frame { names: vec![(name, binding)], cache: Cache::default() }
    }
}

/// An in-flight left-recursion growth record. The sentinel binding in the
/// scope frame carries the name; the record only tracks growth state.
struct LeftRec {
    pos: usize,
    rule: PatId,
    seed: Option<Match>,
    visited: bool,
}

pub(crate) struct Matcher<'a> {
    set: &'a PatternSet,
    input: &'a [u8],
    /// Current region bounds; anchors are relative to these.
    start: usize,
    end: usize,
    opts: &'a SearchOptions,
    pool: &'a mut MatchPool,
    frames: Vec<Frame<'a>>,
    leftrecs: Vec<LeftRec>,
}

impl<'a> Matcher<'a> {
    pub(crate) fn new(
        set: &'a PatternSet,
        input: &'a [u8],
        opts: &'a SearchOptions,
        pool: &'a mut MatchPool,
    ) -> Self {
        Matcher {
            set,
            input,
            start: 0,
            end: input.len(),
            opts,
            pool,
            frames: vec![Frame::new()],
            leftrecs: Vec::new(),
        }
    }

    /// Drop every scope and cache from the previous attempt so a stale hit
    /// from an earlier start position cannot satisfy a later query.
    pub(crate) fn reset_for_attempt(&mut self) {
        self.frames.truncate(1);
        if let Some(root) = self.frames.first_mut() {
            root.cache.clear();
        }
        self.leftrecs.clear();
    }

    pub(crate) fn discard(&mut self, m: Match) {
        self.pool.recycle(m);
    }

    fn node(&mut self, pat: PatId, start: usize, end: usize) -> Match {
        self.pool.take(pat, start, end)
    }

    fn invariant(&self, what: &str) -> Option<Match> {
        tracing::error!("invariant violated: {what}");
        match self.opts.on_invariant {
            InvariantMode::Abort => {
                eprintln!("bp: internal error: {what}");
                std::process::abort()
            }
            InvariantMode::Recover => None,
        }
    }

    /// Evaluate `pid` at `pos`; `None` is "no match", never an error.
    pub(crate) fn match_pat(&mut self, pid: PatId, pos: usize) -> Option<Match> {
        let set = self.set;
        match set.kind(pid) {
            PatKind::AnyChar => {
                if pos < self.end && self.input[pos] != b'\n' {
                    let next = chars::next_char(self.input, pos).min(self.end);
                    Some(self.node(pid, pos, next))
                } else {
                    None
                }
            }
            PatKind::ByteRange { lo, hi } => {
                if pos < self.end && (*lo..=*hi).contains(&self.input[pos]) {
                    Some(self.node(pid, pos, pos + 1))
                } else {
                    None
                }
            }
            PatKind::Literal(bytes) => {
                let n = bytes.len();
                if pos + n <= self.end
                    && bytes_equal(&self.input[pos..pos + n], bytes, self.opts.ignorecase)
                {
                    Some(self.node(pid, pos, pos + n))
                } else {
                    None
                }
            }
            PatKind::IdStart => {
                if pos < self.end && chars::is_id_start(self.input[pos]) {
                    Some(self.node(pid, pos, pos + 1))
                } else {
                    None
                }
            }
            PatKind::IdContinue => {
                if pos < self.end && chars::is_id_continue(self.input[pos]) {
                    Some(self.node(pid, pos, pos + 1))
                } else {
                    None
                }
            }
            PatKind::WordBoundary => {
                let before = pos > self.start && chars::is_id_continue(self.input[pos - 1]);
                let after = pos < self.end && chars::is_id_continue(self.input[pos]);
                if pos == self.start || before != after {
                    Some(self.node(pid, pos, pos))
                } else {
                    None
                }
            }
            PatKind::LineStart => {
                if pos == self.start || self.input[pos - 1] == b'\n' {
                    Some(self.node(pid, pos, pos))
                } else {
                    None
                }
            }
            PatKind::FileStart => {
                if pos == self.start {
                    Some(self.node(pid, pos, pos))
                } else {
                    None
                }
            }
            PatKind::LineEnd => {
                if pos == self.end || self.input[pos] == b'\n' {
                    Some(self.node(pid, pos, pos))
                } else {
                    None
                }
            }
            PatKind::FileEnd => {
                if pos == self.end || (pos + 1 == self.end && self.input[pos] == b'\n') {
                    Some(self.node(pid, pos, pos))
                } else {
                    None
                }
            }
            PatKind::Nodent => self.match_nodent(pid, pos),
            PatKind::CurDent => self.match_curdent(pid, pos),
            PatKind::Not(p) => {
                let p = *p;
                match self.match_pat(p, pos) {
                    Some(m) => {
                        self.pool.recycle(m);
                        None
                    }
                    None => Some(self.node(pid, pos, pos)),
                }
            }
            PatKind::Before(p) => {
                let p = *p;
                let inner = self.match_pat(p, pos)?;
                let mut out = self.node(pid, pos, pos);
                out.children.push(inner);
                Some(out)
            }
            PatKind::After(p) => self.match_after(pid, *p, pos),
            PatKind::Chain(a, b) => self.match_chain(pid, *a, *b, pos),
            PatKind::Otherwise(a, b) => {
                let (a, b) = (*a, *b);
                match self.match_pat(a, pos) {
                    Some(m) => Some(m),
                    None => self.match_pat(b, pos),
                }
            }
            PatKind::Repeat { min, max, pat, sep } => {
                self.match_repeat(pid, pos, *min, *max, *pat, *sep)
            }
            PatKind::Upto { target, skip, strict } => {
                self.match_upto(pid, pos, *target, *skip, *strict)
            }
            PatKind::MatchedBy { pat, inner } => {
                self.match_contains(pid, *pat, *inner, pos, true)
            }
            PatKind::NotMatchedBy { pat, inner } => {
                self.match_contains(pid, *pat, *inner, pos, false)
            }
            PatKind::Capture { pat, .. } | PatKind::Tagged { pat, .. } => {
                let pat = *pat;
                let inner = self.match_pat(pat, pos)?;
                let end = inner.end;
                let mut out = self.node(pid, pos, end);
                out.children.push(inner);
                Some(out)
            }
            PatKind::Replace { pat, .. } => match pat {
                Some(p) => {
                    let p = *p;
                    let inner = self.match_pat(p, pos)?;
                    let end = inner.end;
                    let mut out = self.node(pid, pos, end);
                    out.children.push(inner);
                    Some(out)
                }
                None => Some(self.node(pid, pos, pos)),
            },
            PatKind::Ref { name } => self.match_ref(pid, name, pos),
            PatKind::Def { name, meaning, next } => {
                let (meaning, next) = (*meaning, *next);
                self.frames.push(Frame::with_binding(name, Binding::Rule(meaning)));
                let result = match next {
                    Some(n) => self.match_pat(n, pos),
                    None => Some(self.node(pid, pos, pos)),
                };
                self.frames.pop();
                result
            }
        }
    }

    /// A newline followed by the current line's indentation, repeated
    /// exactly as many times as it leads the current line.
    fn match_nodent(&mut self, pid: PatId, pos: usize) -> Option<Match> {
        if pos >= self.end || self.input[pos] != b'\n' {
            return None;
        }
        let line = chars::line_start(self.input, self.start, pos);
        let (denter, dents) = chars::indent_run(self.input, line, pos);
        let indent_end = pos + 1 + dents;
        if indent_end > self.end {
            return None;
        }
        if !self.input[pos + 1..indent_end].iter().all(|&b| b == denter) {
            return None;
        }
        Some(self.node(pid, pos, indent_end))
    }

    /// The current line's indentation, matched again at `pos`.
    fn match_curdent(&mut self, pid: PatId, pos: usize) -> Option<Match> {
        let line = chars::line_start(self.input, self.start, pos);
        let (denter, dents) = chars::indent_run(self.input, line, pos);
        let indent_end = pos + dents;
        if indent_end > self.end {
            return None;
        }
        if !self.input[pos..indent_end].iter().all(|&b| b == denter) {
            return None;
        }
        Some(self.node(pid, pos, indent_end))
    }

    /// Bounded lookbehind: try candidates from nearest to farthest; the
    /// inner match must end exactly at `pos`. Anchors inside the inner
    /// pattern see the whole region, not a shrunken slice.
    fn match_after(&mut self, pid: PatId, inner: PatId, pos: usize) -> Option<Match> {
        let bounds = self.set.node(inner);
        let Some(max_back) = bounds.max_len else {
            return self.invariant("unbounded lookbehind reached the matcher");
        };
        let min_back = bounds.min_len;
        if pos < self.start + min_back {
            return None;
        }
        let lowest = pos.saturating_sub(max_back).max(self.start);
        let mut cand = pos;
        loop {
            if pos - cand >= min_back {
                if let Some(m) = self.match_pat(inner, cand) {
                    if m.end == pos {
                        let mut out = self.node(pid, pos, pos);
                        out.children.push(m);
                        return Some(out);
                    }
                    self.pool.recycle(m);
                }
            }
            if cand <= lowest {
                return None;
            }
            cand = chars::prev_char(self.input, cand, self.start);
        }
    }

    fn match_chain(&mut self, pid: PatId, a: PatId, b: PatId, pos: usize) -> Option<Match> {
        let set = self.set;
        let first = self.match_pat(a, pos)?;
        // A backreffable capture scopes the rest of the chain: its matched
        // bytes become a literal binding for its name.
        let pushed = match set.kind(a) {
            PatKind::Capture { name: Some(name), backreffable: true, .. } => {
                self.frames.push(Frame::with_binding(
                    name,
                    Binding::Text { start: first.start, end: first.end },
                ));
                true
            }
            _ => false,
        };
        let second = self.match_pat(b, first.end);
        if pushed {
            self.frames.pop();
        }
        match second {
            Some(second) => {
                let end = second.end;
                let mut out = self.node(pid, pos, end);
                out.children.push(first);
                out.children.push(second);
                Some(out)
            }
            None => {
                self.pool.recycle(first);
                None
            }
        }
    }

    /// Greedy non-backtracking repetition with optional separator.
    fn match_repeat(
        &mut self,
        pid: PatId,
        pos: usize,
        min: u32,
        max: Option<u32>,
        pat: PatId,
        sep: Option<PatId>,
    ) -> Option<Match> {
        let mut children: Vec<Match> = Vec::new();
        let mut cur = pos;
        let mut count: u32 = 0;
        loop {
            if max.is_some_and(|m| count >= m) {
                break;
            }
            let iter_start = cur;
            let mut sep_match = None;
            if count >= 1 {
                if let Some(sp) = sep {
                    match self.match_pat(sp, cur) {
                        Some(m) => {
                            cur = m.end;
                            sep_match = Some(m);
                        }
                        None => break,
                    }
                }
            }
            match self.match_pat(pat, cur) {
                Some(m) => {
                    let zero_width_round = m.end == iter_start;
                    cur = m.end;
                    if let Some(sm) = sep_match {
                        children.push(sm);
                    }
                    children.push(m);
                    let round = count;
                    count += 1;
                    if zero_width_round && round >= 1 {
                        // Neither separator nor pattern consumed anything:
                        // every further round would be identical, so commit
                        // the remainder and stop.
                        count = max.unwrap_or_else(|| count.max(min));
                        break;
                    }
                }
                None => {
                    if let Some(sm) = sep_match {
                        self.pool.recycle(sm);
                    }
                    cur = iter_start;
                    break;
                }
            }
        }
        if count >= min {
            let mut out = self.node(pid, pos, cur);
            out.children = children;
            Some(out)
        } else {
            self.pool.recycle_all(children);
            None
        }
    }

    /// Advance until the target matches at the current position. The target
    /// is peeked, never consumed.
    fn match_upto(
        &mut self,
        pid: PatId,
        pos: usize,
        target: Option<PatId>,
        skip: Option<PatId>,
        strict: bool,
    ) -> Option<Match> {
        let mut children: Vec<Match> = Vec::new();
        let mut cur = pos;
        loop {
            if let Some(t) = target {
                if let Some(m) = self.match_pat(t, cur) {
                    self.pool.recycle(m);
                    let mut out = self.node(pid, pos, cur);
                    out.children = children;
                    return Some(out);
                }
            }
            if let Some(s) = skip {
                if let Some(m) = self.match_pat(s, cur) {
                    if m.end > cur {
                        cur = m.end;
                        children.push(m);
                        continue;
                    }
                    self.pool.recycle(m);
                }
            }
            if strict {
                self.pool.recycle_all(children);
                return None;
            }
            // The plain single-character step does not cross newlines.
            if cur >= self.end || self.input[cur] == b'\n' {
                if target.is_none() {
                    let mut out = self.node(pid, pos, cur);
                    out.children = children;
                    return Some(out);
                }
                self.pool.recycle_all(children);
                return None;
            }
            cur = chars::next_char(self.input, cur).min(self.end);
        }
    }

    /// `pat ~ inner` / `pat !~ inner`: match `pat`, then search its matched
    /// text alone for `inner`.
    fn match_contains(
        &mut self,
        pid: PatId,
        pat: PatId,
        inner: PatId,
        pos: usize,
        must: bool,
    ) -> Option<Match> {
        let outer = self.match_pat(pat, pos)?;
        let hit = self.search_slice(inner, outer.start, outer.end);
        match (hit, must) {
            (Some(found), true) => {
                let end = outer.end;
                let mut out = self.node(pid, pos, end);
                out.children.push(outer);
                out.children.push(found);
                Some(out)
            }
            (None, false) => {
                let end = outer.end;
                let mut out = self.node(pid, pos, end);
                out.children.push(outer);
                Some(out)
            }
            (Some(found), false) => {
                self.pool.recycle(found);
                self.pool.recycle(outer);
                None
            }
            (None, true) => {
                self.pool.recycle(outer);
                None
            }
        }
    }

    /// Search for `inner` anywhere inside `[from, to)`, treating that slice
    /// as the whole region (anchors bind to it).
    fn search_slice(&mut self, inner: PatId, from: usize, to: usize) -> Option<Match> {
        let (outer_start, outer_end) = (self.start, self.end);
        self.start = from;
        self.end = to;
        self.frames.push(Frame::new());
        let mut result = None;
        let mut p = from;
        loop {
            if let Some(m) = self.match_pat(inner, p) {
                result = Some(m);
                break;
            }
            if p >= to {
                break;
            }
            p = chars::next_char(self.input, p).min(to);
        }
        self.frames.pop();
        self.start = outer_start;
        self.end = outer_end;
        result
    }

    fn lookup(&self, name: &[u8]) -> Option<Binding> {
        for frame in self.frames.iter().rev() {
            for (bound, binding) in frame.names.iter().rev() {
                if *bound == name {
                    return Some(*binding);
                }
            }
        }
        None
    }

    fn match_ref(&mut self, pid: PatId, name: &'a [u8], pos: usize) -> Option<Match> {
        let Some(binding) = self.lookup(name) else {
            return self.invariant("reference to an undefined name reached the matcher");
        };
        match binding {
            Binding::Text { start, end } => {
                let n = end - start;
                if pos + n <= self.end
                    && bytes_equal(
                        &self.input[pos..pos + n],
                        &self.input[start..end],
                        self.opts.ignorecase,
                    )
                {
                    Some(self.node(pid, pos, pos + n))
                } else {
                    None
                }
            }
            Binding::LeftRec(idx) => {
                if self.leftrecs[idx].pos == pos {
                    self.leftrecs[idx].visited = true;
                    self.leftrecs[idx].seed.clone()
                } else {
                    let rule = self.leftrecs[idx].rule;
                    self.eval_rule(pid, name, rule, pos)
                }
            }
            Binding::Rule(rule) => self.eval_rule(pid, name, rule, pos),
        }
    }

    /// Evaluate a rule reference with memoization and the left-recursion
    /// growth loop.
    fn eval_rule(
        &mut self,
        pid: PatId,
        name: &'a [u8],
        rule: PatId,
        pos: usize,
    ) -> Option<Match> {
        let key = (pos, pid.as_u32());
        // Caching is suspended while any growth is active at this position;
        // results computed against an interim seed would go stale between
        // rounds.
        if self.caching_allowed(pos) {
            let cached = self.frames.last().and_then(|f| f.cache.get(&key).copied());
            if let Some(outcome) = cached {
                return outcome.map(|end| self.node(pid, pos, end));
            }
        }
        let idx = self.leftrecs.len();
        self.leftrecs.push(LeftRec { pos, rule, seed: None, visited: false });
        self.frames.push(Frame::with_binding(name, Binding::LeftRec(idx)));
        let mut result = self.match_pat(rule, pos);
        if self.leftrecs[idx].visited {
            tracing::debug!(
                name = %String::from_utf8_lossy(name),
                pos,
                "left recursion detected; growing seed"
            );
            loop {
                let Some(candidate) = result else {
                    // The last round failed outright; the best seed wins.
                    result = self.leftrecs[idx].seed.take();
                    break;
                };
                let grew = match &self.leftrecs[idx].seed {
                    Some(seed) => candidate.end > seed.end,
                    None => true,
                };
                if !grew {
                    self.pool.recycle(candidate);
                    result = self.leftrecs[idx].seed.take();
                    break;
                }
                if let Some(old) = self.leftrecs[idx].seed.replace(candidate) {
                    self.pool.recycle(old);
                }
                // Results memoized against the previous seed are stale.
                if let Some(frame) = self.frames.last_mut() {
                    frame.cache.clear();
                }
                result = self.match_pat(rule, pos);
            }
        }
        self.frames.pop();
        self.leftrecs.pop();
        let out = result.map(|inner| {
            let end = inner.end;
            let mut wrapper = self.node(pid, pos, end);
            wrapper.children.push(inner);
            wrapper
        });
        if self.caching_allowed(pos) {
            let outcome = out.as_ref().map(|m| m.end);
            if let Some(frame) = self.frames.last_mut() {
                frame.cache.insert(key, outcome);
            }
        }
        out
    }

    fn caching_allowed(&self, pos: usize) -> bool {
        self.opts.memoize && !self.leftrecs.iter().any(|l| l.pos == pos)
    }
}

fn bytes_equal(a: &[u8], b: &[u8], ignorecase: bool) -> bool {
    if ignorecase {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}
