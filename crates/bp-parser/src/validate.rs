//! Post-parse validation of references.
//!
//! Resolution at match time is dynamic (definitions scope their
//! continuation, and forward references between definitions are legal), so
//! validation collects every definition name in the tree first, then walks
//! checking that each `Ref` is satisfied either by a definition or by a
//! backreffable capture earlier in the same chain.

use bp_error::{ParseError, ParseResult};
use bp_pattern::{PatId, PatKind, PatternSet};

pub(crate) fn check_references(set: &PatternSet, root: PatId) -> ParseResult<()> {
    let mut defs: Vec<Vec<u8>> = Vec::new();
    collect_defs(set, root, &mut defs);
    let mut scope: Vec<Vec<u8>> = Vec::new();
    check(set, root, &defs, &mut scope)
}

fn collect_defs(set: &PatternSet, id: PatId, out: &mut Vec<Vec<u8>>) {
    if let PatKind::Def { name, .. } = set.kind(id) {
        out.push(name.clone());
    }
    for child in children(set, id) {
        collect_defs(set, child, out);
    }
}

fn check(
    set: &PatternSet,
    id: PatId,
    defs: &[Vec<u8>],
    scope: &mut Vec<Vec<u8>>,
) -> ParseResult<()> {
    match set.kind(id) {
        PatKind::Ref { name } => {
            if defs.iter().any(|d| d == name) || scope.iter().any(|s| s == name) {
                Ok(())
            } else {
                Err(ParseError::syntax(
                    format!("unknown identifier '{}'", String::from_utf8_lossy(name)),
                    set.node(id).span,
                ))
            }
        }
        PatKind::Chain(a, b) => {
            let (a, b) = (*a, *b);
            check(set, a, defs, scope)?;
            let pushed = match set.kind(a) {
                PatKind::Capture { name: Some(name), backreffable: true, .. } => {
                    scope.push(name.clone());
                    true
                }
                _ => false,
            };
            let result = check(set, b, defs, scope);
            if pushed {
                scope.pop();
            }
            result
        }
        _ => {
            for child in children(set, id) {
                check(set, child, defs, scope)?;
            }
            Ok(())
        }
    }
}

fn children(set: &PatternSet, id: PatId) -> Vec<PatId> {
    match set.kind(id) {
        PatKind::Not(p) | PatKind::Before(p) | PatKind::After(p) => vec![*p],
        PatKind::Chain(a, b) | PatKind::Otherwise(a, b) => vec![*a, *b],
        PatKind::Repeat { pat, sep, .. } => {
            let mut v = vec![*pat];
            v.extend(*sep);
            v
        }
        PatKind::Upto { target, skip, .. } => {
            let mut v = Vec::new();
            v.extend(*target);
            v.extend(*skip);
            v
        }
        PatKind::MatchedBy { pat, inner } | PatKind::NotMatchedBy { pat, inner } => {
            vec![*pat, *inner]
        }
        PatKind::Capture { pat, .. } | PatKind::Tagged { pat, .. } => vec![*pat],
        PatKind::Replace { pat, .. } => pat.iter().copied().collect(),
        PatKind::Def { meaning, next, .. } => {
            let mut v = vec![*meaning];
            v.extend(*next);
            v
        }
        _ => Vec::new(),
    }
}
