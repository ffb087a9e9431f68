//! The `next_match` iteration loop and the prerequisite fast-forward.
//!
//! Search tries the pattern at successive start positions, stepping one
//! codepoint at a time (or through the skip pattern when one is supplied).
//! Before stepping, the leftmost concrete anchor of the pattern (a literal
//! string or a line/file boundary) is used to jump the start position past
//! text that cannot possibly begin a match. The jump is a pure optimisation:
//! candidate positions are still matched in full.

use bp_pattern::chars;
use bp_pattern::{PatId, PatKind, PatternSet};
use memchr::{memchr, memmem};

use crate::machine::{Matcher, SearchOptions};
use crate::match_tree::{Match, MatchPool};

/// Find the first match of `pat` at or after the position implied by
/// `prev`.
///
/// With `prev == None` the search starts at the beginning of `input`. After
/// a zero-width previous match the start advances one codepoint, so
/// iteration always makes progress. The optional `skip` pattern controls
/// where matches may begin: when an attempt fails, the skip pattern's match
/// at that position (if any) is hopped over instead of a single codepoint.
pub fn next_match(
    set: &PatternSet,
    pool: &mut MatchPool,
    pat: PatId,
    input: &[u8],
    prev: Option<&Match>,
    skip: Option<PatId>,
    opts: &SearchOptions,
) -> Option<Match> {
    let end = input.len();
    let mut pos = match prev {
        None => 0,
        Some(p) if p.start == p.end => {
            if p.end >= end {
                return None;
            }
            chars::next_char(input, p.end)
        }
        Some(p) => p.end,
    };
    tracing::trace!(start = pos, len = end, "next_match");
    let prereq = if skip.is_none() && opts.prerequisite_scan && !opts.ignorecase {
        find_prerequisite(set, pat)
    } else {
        Prereq::None
    };
    let finder = match prereq {
        Prereq::Text(needle) => Some(memmem::Finder::new(needle)),
        _ => None,
    };
    let mut matcher = Matcher::new(set, input, opts, pool);
    loop {
        if pos > end {
            return None;
        }
        match prereq {
            Prereq::Text(_) => {
                let jump = finder.as_ref().and_then(|f| f.find(&input[pos..]));
                match jump {
                    Some(offset) => pos += offset,
                    None => return None,
                }
            }
            Prereq::LineStart => {
                if pos != 0 && input[pos - 1] != b'\n' {
                    match memchr(b'\n', &input[pos..]) {
                        Some(offset) => pos += offset + 1,
                        None => return None,
                    }
                }
            }
            Prereq::LineEnd => {
                if pos < end && input[pos] != b'\n' {
                    match memchr(b'\n', &input[pos..]) {
                        Some(offset) => pos += offset,
                        None => pos = end,
                    }
                }
            }
            Prereq::FileStart => {
                if pos != 0 {
                    return None;
                }
            }
            Prereq::FileEnd => {
                pos = pos.max(end.saturating_sub(1));
            }
            Prereq::None => {}
        }
        if pos > end {
            return None;
        }
        matcher.reset_for_attempt();
        if let Some(found) = matcher.match_pat(pat, pos) {
            return Some(found);
        }
        if pos >= end {
            return None;
        }
        let mut next = chars::next_char(input, pos);
        if let Some(sk) = skip {
            if let Some(hop) = matcher.match_pat(sk, pos) {
                if hop.end > pos {
                    next = hop.end;
                }
                matcher.discard(hop);
            }
        }
        pos = next;
    }
}

/// The leftmost concrete anchor a match of the pattern must begin with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prereq<'p> {
    None,
    Text(&'p [u8]),
    LineStart,
    LineEnd,
    FileStart,
    FileEnd,
}

fn find_prerequisite(set: &PatternSet, pat: PatId) -> Prereq<'_> {
    let mut defs: Vec<(&[u8], PatId)> = Vec::new();
    descend(set, pat, &mut defs, 0)
}

fn descend<'p>(
    set: &'p PatternSet,
    pat: PatId,
    defs: &mut Vec<(&'p [u8], PatId)>,
    depth: usize,
) -> Prereq<'p> {
    // Recursive grammars would otherwise loop through their references.
    if depth > 32 {
        return Prereq::None;
    }
    match set.kind(pat) {
        PatKind::Literal(bytes) if !bytes.is_empty() => Prereq::Text(bytes),
        PatKind::LineStart => Prereq::LineStart,
        PatKind::LineEnd => Prereq::LineEnd,
        PatKind::FileStart => Prereq::FileStart,
        PatKind::FileEnd => Prereq::FileEnd,
        PatKind::Before(p) => descend(set, *p, defs, depth + 1),
        PatKind::Repeat { min, pat, .. } if *min >= 1 => descend(set, *pat, defs, depth + 1),
        PatKind::Capture { pat, .. } | PatKind::Tagged { pat, .. } => {
            descend(set, *pat, defs, depth + 1)
        }
        PatKind::MatchedBy { pat, .. } | PatKind::NotMatchedBy { pat, .. } => {
            descend(set, *pat, defs, depth + 1)
        }
        PatKind::Replace { pat: Some(p), .. } => descend(set, *p, defs, depth + 1),
        PatKind::Chain(a, b) => {
            let (a, b) = (*a, *b);
            let first = descend(set, a, defs, depth + 1);
            let first_is_zero_width = set.node(a).is_zero_width();
            match first {
                // A file boundary pins the search outright.
                Prereq::FileStart | Prereq::FileEnd => first,
                Prereq::None if first_is_zero_width => descend(set, b, defs, depth + 1),
                // A line boundary is a weaker jump than a literal further
                // along the chain; prefer the literal when one exists.
                Prereq::LineStart | Prereq::LineEnd if first_is_zero_width => {
                    match descend(set, b, defs, depth + 1) {
                        Prereq::Text(needle) => Prereq::Text(needle),
                        _ => first,
                    }
                }
                other => other,
            }
        }
        PatKind::Def { name, meaning, next } => {
            defs.push((name, *meaning));
            match next {
                Some(n) => descend(set, *n, defs, depth + 1),
                None => Prereq::None,
            }
        }
        PatKind::Ref { name } => {
            let rule = defs
                .iter()
                .rev()
                .find(|(bound, _)| *bound == &name[..])
                .map(|(_, rule)| *rule);
            match rule {
                Some(rule) => descend(set, rule, defs, depth + 1),
                None => Prereq::None,
            }
        }
        _ => Prereq::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_pattern::Span;

    fn lit(set: &mut PatternSet, s: &str) -> PatId {
        set.insert(PatKind::Literal(s.as_bytes().to_vec()), Span::default())
    }

    #[test]
    fn literal_is_its_own_prerequisite() {
        let mut set = PatternSet::new();
        let a = lit(&mut set, "needle");
        assert_eq!(find_prerequisite(&set, a), Prereq::Text(b"needle"));
    }

    #[test]
    fn chain_descends_past_zero_width_heads() {
        let mut set = PatternSet::new();
        let anchor = set.insert(PatKind::WordBoundary, Span::default());
        let needle = lit(&mut set, "x");
        let chain = set.chain(anchor, needle);
        assert_eq!(find_prerequisite(&set, chain), Prereq::Text(b"x"));
    }

    #[test]
    fn line_anchor_defers_to_a_literal_in_the_tail() {
        let mut set = PatternSet::new();
        let caret = set.insert(PatKind::LineStart, Span::default());
        let needle = lit(&mut set, "fn ");
        let chain = set.chain(caret, needle);
        assert_eq!(find_prerequisite(&set, chain), Prereq::Text(b"fn "));
    }

    #[test]
    fn file_anchor_wins_over_everything() {
        let mut set = PatternSet::new();
        let bof = set.insert(PatKind::FileStart, Span::default());
        let needle = lit(&mut set, "x");
        let chain = set.chain(bof, needle);
        assert_eq!(find_prerequisite(&set, chain), Prereq::FileStart);
    }

    #[test]
    fn recursive_references_do_not_loop() {
        let mut set = PatternSet::new();
        let r = set.insert(PatKind::Ref { name: b"r".to_vec() }, Span::default());
        let tail = lit(&mut set, "x");
        let body = set.chain(r, tail);
        let def = set.insert(
            PatKind::Def { name: b"r".to_vec(), meaning: body, next: Some(r) },
            Span::default(),
        );
        // Just must terminate.
        let _ = find_prerequisite(&set, def);
    }

    #[test]
    fn consuming_head_without_literal_gives_no_prerequisite() {
        let mut set = PatternSet::new();
        let any = set.insert(PatKind::AnyChar, Span::default());
        let needle = lit(&mut set, "x");
        let chain = set.chain(any, needle);
        assert_eq!(find_prerequisite(&set, chain), Prereq::None);
    }
}
