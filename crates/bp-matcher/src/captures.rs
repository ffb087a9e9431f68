//! Capture lookup over a match tree.
//!
//! Both lookups are depth-first preorder walks. Numbered lookup counts only
//! unnamed captures; named lookup compares exact bytes against capture names
//! and tags.

use bp_pattern::{PatKind, PatternSet};

use crate::match_tree::Match;

/// The `n`th unnamed capture inside `root`, counting preorder from 1.
///
/// `n == 0` names the root itself (the whole match).
pub fn numbered_capture<'m>(
    set: &PatternSet,
    root: &'m Match,
    n: usize,
) -> Option<&'m Match> {
    if n == 0 {
        return Some(root);
    }
    let mut remaining = n;
    walk_numbered(set, root, &mut remaining)
}

fn walk_numbered<'m>(
    set: &PatternSet,
    node: &'m Match,
    remaining: &mut usize,
) -> Option<&'m Match> {
    if let PatKind::Capture { name: None, .. } = set.kind(node.pat) {
        *remaining -= 1;
        if *remaining == 0 {
            return Some(node);
        }
    }
    for child in &node.children {
        if let Some(found) = walk_numbered(set, child, remaining) {
            return Some(found);
        }
    }
    None
}

/// The first capture or tag inside `root` whose name is exactly `name`.
pub fn named_capture<'m>(
    set: &PatternSet,
    root: &'m Match,
    name: &[u8],
) -> Option<&'m Match> {
    let hit = match set.kind(root.pat) {
        PatKind::Capture { name: Some(n), .. } => n == name,
        PatKind::Tagged { tag, .. } => tag == name,
        _ => false,
    };
    if hit {
        return Some(root);
    }
    for child in &root.children {
        if let Some(found) = named_capture(set, child, name) {
            return Some(found);
        }
    }
    None
}
