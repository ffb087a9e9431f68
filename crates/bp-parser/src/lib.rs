//! Recursive-descent parser for the bp pattern syntax.
//!
//! The surface syntax mixes PEG operators with regex-like conveniences.
//! The important forms, roughly in binding order:
//!
//! | Syntax          | Meaning                                             |
//! |-----------------|-----------------------------------------------------|
//! | `pat1 pat2`     | Sequence (juxtaposition)                            |
//! | `pat1 / pat2`   | Ordered choice                                      |
//! | `pat ~ sub`     | `pat` whose text contains a match of `sub`          |
//! | `pat !~ sub`    | `pat` whose text contains no match of `sub`         |
//! | `.`             | Any character except newline                        |
//! | `..pat`         | Up to (but not including) `pat`                     |
//! | `` `c ``        | Character, `` `a-z `` range, `` `a,e,i `` list      |
//! | `\n`, `\xFF`    | Escapes; `\x00-\x1F` byte ranges                    |
//! | `"text"`        | Literal string (also `'text'` and `{text}`)         |
//! | `[pat]`         | Optional                                            |
//! | `*pat`, `+pat`  | Zero/one-or-more, optional `% sep`                  |
//! | `3pat`, `2-4pat`| Counted repetition, optional `% sep`                |
//! | `<pat`, `>pat`  | Lookbehind / lookahead                              |
//! | `!pat`          | Negation                                            |
//! | `@pat`          | Capture (`@name=pat` named, `@name:pat` backref)    |
//! | `@:Tag`         | Tagged capture                                      |
//! | `^`, `^^`       | Start of line / start of input                      |
//! | `$`, `$$`       | End of line / end of input                          |
//! | `\|`            | Identifier boundary                                 |
//! | `name`          | Reference to a definition                           |
//! | `name: body`    | Definition (`name:: body` tagged)                   |
//! | `pat => "text"` | Replacement                                         |
//!
//! Comments run from `#` to end of line. A pattern source is a sequence of
//! definitions followed by an optional expression; definition bodies end at
//! a newline unless parenthesised.
//!
//! Compilation never panics: every malformed input is reported as a
//! [`ParseError`] with the byte span of the offending source. After parsing,
//! a validation walk rejects references that no definition (and no
//! backreffable capture earlier in the same chain) can satisfy, so unknown
//! names surface at compile time rather than during matching.

#![warn(clippy::all)]
#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

mod parser;
mod validate;

use bp_error::{ParseError, ParseResult};
use bp_pattern::{PatId, PatKind, PatternSet, Span};

use crate::parser::Parser;

/// Compile pattern source into the arena, returning the root node.
///
/// The source is a sequence of definitions followed by an optional
/// expression. Grammar preludes are supported by concatenating their source
/// ahead of the user pattern before calling this.
pub fn compile_pattern(set: &mut PatternSet, source: &[u8]) -> ParseResult<PatId> {
    tracing::trace!(len = source.len(), "compile_pattern");
    let root = Parser::new(set, source).parse_top()?;
    validate::check_references(set, root)?;
    Ok(root)
}

/// Compile pattern source that starts in string mode: literal bytes, except
/// that `\` introduces an embedded pattern (an escape or a parenthesised
/// expression) and an optional `;` terminates the embed.
pub fn compile_string_pattern(set: &mut PatternSet, source: &[u8]) -> ParseResult<PatId> {
    tracing::trace!(len = source.len(), "compile_string_pattern");
    let root = Parser::new(set, source).parse_string_pattern()?;
    validate::check_references(set, root)?;
    Ok(root)
}

/// Wrap an already-compiled pattern in a replacement.
///
/// `text` is stored verbatim and expanded at render time with `@N`,
/// `@name`, `@@`, `\N`, and escape substitutions.
pub fn compile_replacement(
    set: &mut PatternSet,
    pat: PatId,
    text: &[u8],
) -> ParseResult<PatId> {
    // The only hard compile-time error in replacement text is a dangling
    // backslash; everything else is decoded leniently at render time. An
    // even-length trailing run is just escaped backslashes.
    let trailing = text.iter().rev().take_while(|&&b| b == b'\\').count();
    if trailing % 2 == 1 {
        let at = text.len() - 1;
        return Err(ParseError::syntax(
            "replacement text ends with a dangling backslash",
            Span::new(at, at + 1),
        ));
    }
    let span = set.node(pat).span;
    Ok(set.insert(PatKind::Replace { pat: Some(pat), text: text.to_vec() }, span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> (PatternSet, PatId) {
        let mut set = PatternSet::new();
        let id = compile_pattern(&mut set, src.as_bytes())
            .unwrap_or_else(|e| panic!("parse failed for {src:?}: {e}"));
        (set, id)
    }

    fn parse_err(src: &str) -> ParseError {
        let mut set = PatternSet::new();
        match compile_pattern(&mut set, src.as_bytes()) {
            Ok(_) => panic!("expected parse error for {src:?}"),
            Err(e) => e,
        }
    }

    #[test]
    fn parses_literal_string() {
        let (set, id) = parse("\"hello\"");
        assert_eq!(*set.kind(id), PatKind::Literal(b"hello".to_vec()));
    }

    #[test]
    fn juxtaposition_builds_right_leaning_chain() {
        let (set, id) = parse("\"a\" \"b\" \"c\"");
        let PatKind::Chain(a, rest) = *set.kind(id) else {
            panic!("expected chain, got {:?}", set.kind(id));
        };
        assert_eq!(*set.kind(a), PatKind::Literal(b"a".to_vec()));
        assert!(matches!(*set.kind(rest), PatKind::Chain(..)));
    }

    #[test]
    fn choice_binds_looser_than_juxtaposition() {
        let (set, id) = parse("\"a\" \"b\" / \"c\"");
        let PatKind::Otherwise(left, right) = *set.kind(id) else {
            panic!("expected choice, got {:?}", set.kind(id));
        };
        assert!(matches!(*set.kind(left), PatKind::Chain(..)));
        assert_eq!(*set.kind(right), PatKind::Literal(b"c".to_vec()));
    }

    #[test]
    fn prefix_quantifiers_and_separators() {
        let (set, id) = parse("*\"a\" % \",\"");
        let PatKind::Repeat { min: 0, max: None, sep: Some(sep), .. } = *set.kind(id) else {
            panic!("expected repeat, got {:?}", set.kind(id));
        };
        assert_eq!(*set.kind(sep), PatKind::Literal(b",".to_vec()));
    }

    #[test]
    fn counted_repetition_forms() {
        let (set, id) = parse("3\"a\"");
        assert!(matches!(*set.kind(id), PatKind::Repeat { min: 3, max: Some(3), .. }));
        let (set, id) = parse("2-4\"a\"");
        assert!(matches!(*set.kind(id), PatKind::Repeat { min: 2, max: Some(4), .. }));
        let (set, id) = parse("2+\"a\"");
        assert!(matches!(*set.kind(id), PatKind::Repeat { min: 2, max: None, .. }));
    }

    #[test]
    fn optional_is_zero_or_one() {
        let (set, id) = parse("[\"a\"]");
        assert!(matches!(*set.kind(id), PatKind::Repeat { min: 0, max: Some(1), .. }));
    }

    #[test]
    fn lookaround_and_negation() {
        let (set, id) = parse("<\"ab\"");
        assert!(matches!(*set.kind(id), PatKind::After(_)));
        let (set, id) = parse(">\"ab\"");
        assert!(matches!(*set.kind(id), PatKind::Before(_)));
        let (set, id) = parse("!\"ab\"");
        assert!(matches!(*set.kind(id), PatKind::Not(_)));
    }

    #[test]
    fn variable_length_lookbehind_is_rejected() {
        let err = parse_err("<*\"a\"");
        assert!(err.to_string().contains("lookbehind"), "got: {err}");
    }

    #[test]
    fn backtick_characters_ranges_and_lists() {
        let (set, id) = parse("`x");
        assert_eq!(*set.kind(id), PatKind::Literal(b"x".to_vec()));
        let (set, id) = parse("`a-z");
        assert_eq!(*set.kind(id), PatKind::ByteRange { lo: b'a', hi: b'z' });
        let (set, id) = parse("`a,e,i");
        assert!(matches!(*set.kind(id), PatKind::Otherwise(..)));
    }

    #[test]
    fn high_to_low_range_is_rejected() {
        let err = parse_err("`z-a");
        assert!(err.to_string().contains("range"), "got: {err}");
    }

    #[test]
    fn escapes_decode_to_bytes_and_ranges() {
        let (set, id) = parse("\\n");
        assert_eq!(*set.kind(id), PatKind::Literal(b"\n".to_vec()));
        let (set, id) = parse("\\x41");
        assert_eq!(*set.kind(id), PatKind::Literal(b"A".to_vec()));
        let (set, id) = parse("\\x00-\\x1F");
        assert_eq!(*set.kind(id), PatKind::ByteRange { lo: 0x00, hi: 0x1F });
        let (set, id) = parse("\\101");
        assert_eq!(*set.kind(id), PatKind::Literal(b"A".to_vec()));
    }

    #[test]
    fn named_escapes_are_pattern_atoms() {
        let (set, id) = parse("\\i");
        assert_eq!(*set.kind(id), PatKind::IdStart);
        let (set, id) = parse("\\I");
        assert_eq!(*set.kind(id), PatKind::IdContinue);
        let (set, id) = parse("\\b");
        assert_eq!(*set.kind(id), PatKind::WordBoundary);
        let (set, id) = parse("\\N");
        assert_eq!(*set.kind(id), PatKind::Nodent);
        let (set, id) = parse("\\C");
        assert_eq!(*set.kind(id), PatKind::CurDent);
    }

    #[test]
    fn unknown_escape_is_an_error() {
        let err = parse_err("\\q");
        assert!(err.to_string().contains("escape"), "got: {err}");
    }

    #[test]
    fn anchors_parse_as_atoms() {
        let (set, id) = parse("^");
        assert_eq!(*set.kind(id), PatKind::LineStart);
        let (set, id) = parse("^^");
        assert_eq!(*set.kind(id), PatKind::FileStart);
        let (set, id) = parse("$");
        assert_eq!(*set.kind(id), PatKind::LineEnd);
        let (set, id) = parse("$$");
        assert_eq!(*set.kind(id), PatKind::FileEnd);
        let (set, id) = parse("|");
        assert_eq!(*set.kind(id), PatKind::WordBoundary);
    }

    #[test]
    fn defined_anchor_name_becomes_a_reference() {
        let (set, id) = parse("^: \"start\"\n^");
        let PatKind::Def { ref name, next: Some(next), .. } = *set.kind(id) else {
            panic!("expected definition, got {:?}", set.kind(id));
        };
        assert_eq!(name, b"^");
        assert_eq!(*set.kind(next), PatKind::Ref { name: b"^".to_vec() });
    }

    #[test]
    fn dots_peel_off_into_upto() {
        let (set, id) = parse(".");
        assert_eq!(*set.kind(id), PatKind::AnyChar);
        let (set, id) = parse("..\"END\"");
        assert!(matches!(*set.kind(id), PatKind::Upto { target: Some(_), skip: None, strict: false }));
        let (set, id) = parse("...\"END\"");
        let PatKind::Chain(first, rest) = *set.kind(id) else {
            panic!("expected chain, got {:?}", set.kind(id));
        };
        assert_eq!(*set.kind(first), PatKind::AnyChar);
        assert!(matches!(*set.kind(rest), PatKind::Upto { .. }));
    }

    #[test]
    fn upto_skip_and_strict_clauses() {
        let (set, id) = parse("..%\\n \"END\"");
        assert!(matches!(*set.kind(id), PatKind::Upto { target: Some(_), skip: Some(_), strict: false }));
        let (set, id) = parse("..=\"END\"");
        assert!(matches!(*set.kind(id), PatKind::Upto { target: Some(_), skip: None, strict: true }));
    }

    #[test]
    fn captures_in_all_forms() {
        let (set, id) = parse("@\"a\"");
        assert!(matches!(
            *set.kind(id),
            PatKind::Capture { name: None, backreffable: false, .. }
        ));
        let (set, id) = parse("@x=\"a\"");
        let PatKind::Capture { name: Some(ref n), backreffable: false, .. } = *set.kind(id) else {
            panic!("expected named capture, got {:?}", set.kind(id));
        };
        assert_eq!(n, b"x");
        let (set, id) = parse("@x:\"a\" x");
        let PatKind::Chain(cap, _) = *set.kind(id) else {
            panic!("expected chain, got {:?}", set.kind(id));
        };
        assert!(matches!(*set.kind(cap), PatKind::Capture { backreffable: true, .. }));
    }

    #[test]
    fn tagged_capture_with_and_without_pattern() {
        let (set, id) = parse("@:Marker");
        let PatKind::Tagged { ref tag, pat } = *set.kind(id) else {
            panic!("expected tagged capture, got {:?}", set.kind(id));
        };
        assert_eq!(tag, b"Marker");
        assert_eq!(*set.kind(pat), PatKind::Literal(Vec::new()));
        let (set, id) = parse("@:Word=\"w\"");
        assert!(matches!(*set.kind(id), PatKind::Tagged { .. }));
    }

    #[test]
    fn postfix_contains_operators() {
        let (set, id) = parse("\"abc\" ~ \"b\"");
        assert!(matches!(*set.kind(id), PatKind::MatchedBy { .. }));
        let (set, id) = parse("\"abc\" !~ \"b\"");
        assert!(matches!(*set.kind(id), PatKind::NotMatchedBy { .. }));
    }

    #[test]
    fn replacement_attaches_to_the_whole_expression() {
        let (set, id) = parse("\"a\" / \"b\" => \"[0]\"");
        let PatKind::Replace { pat: Some(inner), ref text } = *set.kind(id) else {
            panic!("expected replacement, got {:?}", set.kind(id));
        };
        assert_eq!(text, b"[0]");
        assert!(matches!(*set.kind(inner), PatKind::Otherwise(..)));
    }

    #[test]
    fn stacked_replacements_nest() {
        let (set, id) = parse("\"a\" => \"x\" => \"y\"");
        let PatKind::Replace { pat: Some(inner), ref text } = *set.kind(id) else {
            panic!("expected replacement, got {:?}", set.kind(id));
        };
        assert_eq!(text, b"y");
        assert!(matches!(*set.kind(inner), PatKind::Replace { .. }));
    }

    #[test]
    fn definitions_scope_the_expression() {
        let (set, id) = parse("greeting: \"hi\"\ngreeting \"!\"");
        let PatKind::Def { ref name, meaning, next: Some(_) } = *set.kind(id) else {
            panic!("expected definition, got {:?}", set.kind(id));
        };
        assert_eq!(name, b"greeting");
        assert_eq!(*set.kind(meaning), PatKind::Literal(b"hi".to_vec()));
    }

    #[test]
    fn tagged_definition_wraps_meaning() {
        let (set, id) = parse("word:: +\\i\nword");
        let PatKind::Def { meaning, .. } = *set.kind(id) else {
            panic!("expected definition, got {:?}", set.kind(id));
        };
        assert!(matches!(*set.kind(meaning), PatKind::Tagged { .. }));
    }

    #[test]
    fn definitions_may_reference_forward() {
        let (_, _) = parse("a: b\nb: \"x\"\na");
    }

    #[test]
    fn unknown_reference_is_a_compile_error() {
        let err = parse_err("nosuchrule");
        assert!(err.to_string().contains("unknown identifier"), "got: {err}");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = parse_err("\"abc");
        assert!(err.to_string().contains("unterminated"), "got: {err}");
    }

    #[test]
    fn missing_close_paren_is_an_error() {
        let err = parse_err("(\"a\"");
        assert!(err.to_string().contains(")"), "got: {err}");
    }

    #[test]
    fn parenthesised_expressions_may_span_lines() {
        let (_, _) = parse("(\"a\" /\n \"b\")");
    }

    #[test]
    fn comments_are_skipped() {
        let (set, id) = parse("# leading comment\n\"a\" # trailing\n");
        assert_eq!(*set.kind(id), PatKind::Literal(b"a".to_vec()));
    }

    #[test]
    fn empty_source_is_an_empty_literal() {
        let (set, id) = parse("");
        assert_eq!(*set.kind(id), PatKind::Literal(Vec::new()));
    }

    #[test]
    fn string_pattern_mode_embeds_patterns() {
        let mut set = PatternSet::new();
        let id = compile_string_pattern(&mut set, b"foo\\n;bar")
            .unwrap_or_else(|e| panic!("string pattern failed: {e}"));
        // foo, newline escape, bar
        let PatKind::Chain(first, rest) = *set.kind(id) else {
            panic!("expected chain, got {:?}", set.kind(id));
        };
        assert_eq!(*set.kind(first), PatKind::Literal(b"foo".to_vec()));
        let PatKind::Chain(mid, last) = *set.kind(rest) else {
            panic!("expected chain, got {:?}", set.kind(rest));
        };
        assert_eq!(*set.kind(mid), PatKind::Literal(b"\n".to_vec()));
        assert_eq!(*set.kind(last), PatKind::Literal(b"bar".to_vec()));
    }

    #[test]
    fn string_pattern_mode_allows_paren_embeds() {
        let mut set = PatternSet::new();
        let id = compile_string_pattern(&mut set, b"a\\(\"b\" / \"c\")d")
            .unwrap_or_else(|e| panic!("string pattern failed: {e}"));
        assert!(matches!(*set.kind(id), PatKind::Chain(..)));
    }

    #[test]
    fn replacement_compile_rejects_dangling_backslash() {
        let mut set = PatternSet::new();
        let pat = compile_pattern(&mut set, b"\"a\"")
            .unwrap_or_else(|e| panic!("parse failed: {e}"));
        assert!(compile_replacement(&mut set, pat, b"ok").is_ok());
        assert!(compile_replacement(&mut set, pat, b"bad\\").is_err());
    }

    #[test]
    fn error_spans_point_into_the_source() {
        let err = parse_err("\"a\" \\q");
        let span = err.span();
        assert_eq!(span.start, 4);
    }
}
