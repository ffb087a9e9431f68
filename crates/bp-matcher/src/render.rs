//! Emitting a match back out as bytes.
//!
//! A non-replacement match renders as its matched input, verbatim: the
//! renderer writes the spans between children and recurses into each child.
//! A replacement match renders its text with substitutions instead. A
//! monotone output cursor guarantees that overlapping child spans (lookahead
//! children, containment-check children) are emitted at most once, so the
//! output of a replacement-free match is byte-identical to its input span.
//!
//! Replacement text substitutions:
//!
//! - `@N`: the Nth unnamed capture (`@0` is the whole match)
//! - `@name`: the named capture; an optional `;` ends the name
//! - `@@`: a literal `@`
//! - `\N`: a newline plus the match line's leading indentation
//! - `\<c>`: the usual escapes; unknown escapes emit the character itself
//! - a missing capture leaves the `@…` text intact
//!
//! All resolution happens under the replacement's matched pattern, so
//! captures outside the replacement are not visible to it.

use std::io::{self, Write};

use bp_pattern::chars;
use bp_pattern::{PatKind, PatternSet};

use crate::captures::{named_capture, numbered_capture};
use crate::match_tree::Match;

/// Render `m` (matched against `input`) into `out`.
pub fn render_match(
    set: &PatternSet,
    input: &[u8],
    m: &Match,
    out: &mut dyn Write,
) -> io::Result<()> {
    let mut cursor = m.start;
    render_node(set, input, m, &mut cursor, m.end, out)
}

fn render_node(
    set: &PatternSet,
    input: &[u8],
    m: &Match,
    cursor: &mut usize,
    limit: usize,
    out: &mut dyn Write,
) -> io::Result<()> {
    if let PatKind::Replace { text, .. } = set.kind(m.pat) {
        render_replacement(set, input, m, text, out)?;
        *cursor = (*cursor).max(m.end.min(limit));
        return Ok(());
    }
    for child in &m.children {
        // Skip spans already emitted (lookbehind children) and spans beyond
        // the clip limit (lookahead children past the match end).
        if child.end <= *cursor || child.start >= limit {
            continue;
        }
        if child.start > *cursor {
            out.write_all(&input[*cursor..child.start])?;
            *cursor = child.start;
        }
        render_node(set, input, child, cursor, limit, out)?;
    }
    let end = m.end.min(limit);
    if end > *cursor {
        out.write_all(&input[*cursor..end])?;
        *cursor = end;
    }
    Ok(())
}

fn render_replacement(
    set: &PatternSet,
    input: &[u8],
    m: &Match,
    text: &[u8],
    out: &mut dyn Write,
) -> io::Result<()> {
    let target = m.children.first();
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            b'@' => match text.get(i + 1).copied() {
                Some(b'@') => {
                    out.write_all(b"@")?;
                    i += 2;
                }
                Some(d) if d.is_ascii_digit() => {
                    let mut j = i + 1;
                    let mut n: usize = 0;
                    while j < text.len() && text[j].is_ascii_digit() {
                        n = n.saturating_mul(10).saturating_add(usize::from(text[j] - b'0'));
                        j += 1;
                    }
                    match target.and_then(|t| numbered_capture(set, t, n)) {
                        Some(cap) => render_capture(set, input, cap, out)?,
                        None => out.write_all(&text[i..j])?,
                    }
                    i = j;
                }
                Some(c) if chars::is_id_start(c) => {
                    let mut j = i + 1;
                    while j < text.len() && chars::is_id_continue(text[j]) {
                        j += 1;
                    }
                    let name = &text[i + 1..j];
                    // An optional `;` terminates the name.
                    let consumed = if text.get(j) == Some(&b';') { j + 1 } else { j };
                    match target.and_then(|t| named_capture(set, t, name)) {
                        Some(cap) => render_capture(set, input, cap, out)?,
                        None => out.write_all(&text[i..consumed])?,
                    }
                    i = consumed;
                }
                _ => {
                    out.write_all(b"@")?;
                    i += 1;
                }
            },
            b'\\' => match text.get(i + 1).copied() {
                None => {
                    out.write_all(b"\\")?;
                    i += 1;
                }
                Some(b'N') => {
                    // Newline plus the indentation of the line the match
                    // starts on.
                    let line = chars::line_start(input, 0, m.start);
                    let (denter, dents) = chars::indent_run(input, line, m.start);
                    out.write_all(b"\n")?;
                    for _ in 0..dents {
                        out.write_all(&[denter])?;
                    }
                    i += 2;
                }
                Some(c) => {
                    let (byte, used) = decode_text_escape(&text[i + 1..], c);
                    out.write_all(&[byte])?;
                    i += 1 + used;
                }
            },
            b => {
                out.write_all(&[b])?;
                i += 1;
            }
        }
    }
    Ok(())
}

/// Render a capture subtree on its own cursor, so nested replacements
/// inside it still apply.
fn render_capture(
    set: &PatternSet,
    input: &[u8],
    cap: &Match,
    out: &mut dyn Write,
) -> io::Result<()> {
    let mut cursor = cap.start;
    render_node(set, input, cap, &mut cursor, cap.end, out)
}

/// Decode the escape starting at `rest[0] == c`; returns the byte and how
/// many bytes of `rest` were consumed. Unknown escapes yield the escaped
/// character itself.
fn decode_text_escape(rest: &[u8], c: u8) -> (u8, usize) {
    match c {
        b'n' => (b'\n', 1),
        b't' => (b'\t', 1),
        b'r' => (b'\r', 1),
        b'e' => (0x1B, 1),
        b'a' => (0x07, 1),
        b'f' => (0x0C, 1),
        b'v' => (0x0B, 1),
        b'\\' => (b'\\', 1),
        b'@' => (b'@', 1),
        b'x' => {
            let mut value: u32 = 0;
            let mut used = 1;
            while used < 3 {
                let digit = match rest.get(used) {
                    Some(d @ b'0'..=b'9') => u32::from(d - b'0'),
                    Some(d @ b'a'..=b'f') => u32::from(d - b'a') + 10,
                    Some(d @ b'A'..=b'F') => u32::from(d - b'A') + 10,
                    _ => break,
                };
                value = value * 16 + digit;
                used += 1;
            }
            if used == 1 { (b'x', 1) } else { (value as u8, used) }
        }
        b'0'..=b'7' => {
            let mut value: u32 = 0;
            let mut used = 0;
            while used < 3 {
                match rest.get(used) {
                    Some(d @ b'0'..=b'7') => {
                        value = value * 8 + u32::from(d - b'0');
                        used += 1;
                    }
                    _ => break,
                }
            }
            ((value & 0xFF) as u8, used)
        }
        other => (other, 1),
    }
}
