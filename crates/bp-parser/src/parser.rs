//! The recursive-descent parser over raw pattern bytes.
//!
//! Each `parse_*` method consumes source from `self.pos` and either returns
//! a node id in the arena or a [`ParseError`] spanning the offending bytes.
//! Newline handling is threaded through `allow_newlines`: definitions and
//! top-level expressions end at a newline, while parenthesised and bracketed
//! subexpressions may span lines.

use bp_error::{ParseError, ParseResult};
use bp_pattern::chars::{char_len, is_id_continue, is_id_start};
use bp_pattern::{PatId, PatKind, PatternSet, Span};

pub(crate) struct Parser<'a, 's> {
    set: &'a mut PatternSet,
    src: &'s [u8],
    pos: usize,
    allow_newlines: bool,
    /// Definition names seen so far; `^` and friends parse as references
    /// instead of built-in anchors once a definition shadows them.
    defined: Vec<Vec<u8>>,
}

impl<'a, 's> Parser<'a, 's> {
    pub(crate) fn new(set: &'a mut PatternSet, src: &'s [u8]) -> Self {
        Parser { set, src, pos: 0, allow_newlines: false, defined: Vec::new() }
    }

    // ------------------------------------------------------------------
    // Entry points

    /// `pattern := definitions* expression?`
    pub(crate) fn parse_top(&mut self) -> ParseResult<PatId> {
        let mut defs: Vec<(Vec<u8>, PatId, Span)> = Vec::new();
        loop {
            self.allow_newlines = true;
            self.skip_space();
            if self.at_end() {
                break;
            }
            let def_start = self.pos;
            match self.try_parse_definition()? {
                Some((name, meaning)) => {
                    self.defined.push(name.clone());
                    defs.push((name, meaning, Span::new(def_start, self.pos)));
                }
                None => break,
            }
        }
        let expr = if self.at_end() {
            None
        } else {
            self.allow_newlines = false;
            Some(self.parse_expression()?)
        };
        self.allow_newlines = true;
        self.skip_space();
        if !self.at_end() {
            return Err(self.err_here("unexpected text after pattern"));
        }
        let mut next = expr;
        for (name, meaning, span) in defs.into_iter().rev() {
            next = Some(self.set.insert(PatKind::Def { name, meaning, next }, span));
        }
        Ok(match next {
            Some(id) => id,
            None => self.set.insert(PatKind::Literal(Vec::new()), Span::new(0, 0)),
        })
    }

    /// String mode: literal bytes, `\` embeds a pattern, `;` ends the embed.
    pub(crate) fn parse_string_pattern(&mut self) -> ParseResult<PatId> {
        let mut items: Vec<PatId> = Vec::new();
        let mut lit = Vec::new();
        let mut lit_start = self.pos;
        while let Some(b) = self.peek() {
            if b != b'\\' {
                lit.push(b);
                self.pos += 1;
                continue;
            }
            if !lit.is_empty() {
                let span = Span::new(lit_start, self.pos);
                items.push(self.set.insert(PatKind::Literal(std::mem::take(&mut lit)), span));
            }
            let embed = if self.peek_at(1) == Some(b'(') {
                self.pos += 1;
                self.parse_simple()?
            } else {
                self.parse_escape_atom()?
            };
            items.push(embed);
            if self.peek() == Some(b';') {
                self.pos += 1;
            }
            lit_start = self.pos;
        }
        if !lit.is_empty() {
            let span = Span::new(lit_start, self.pos);
            items.push(self.set.insert(PatKind::Literal(lit), span));
        }
        match self.set.chain_all(&items) {
            Some(id) => Ok(id),
            None => Ok(self.set.insert(PatKind::Literal(Vec::new()), Span::new(0, 0))),
        }
    }

    // ------------------------------------------------------------------
    // Grammar productions

    /// `name ":" body` or `name "::" body`; `None` if this is not a
    /// definition (the position is restored for expression parsing).
    fn try_parse_definition(&mut self) -> ParseResult<Option<(Vec<u8>, PatId)>> {
        let snapshot = self.pos;
        let Some(name) = self.scan_name() else {
            return Ok(None);
        };
        let saved = self.allow_newlines;
        self.allow_newlines = false;
        self.skip_space();
        if self.peek() != Some(b':') {
            self.pos = snapshot;
            self.allow_newlines = saved;
            return Ok(None);
        }
        self.pos += 1;
        let tagged = self.peek() == Some(b':');
        if tagged {
            self.pos += 1;
        }
        self.skip_space();
        if !self.can_start_atom() {
            self.allow_newlines = saved;
            return Err(self.err_here("expected a pattern after definition"));
        }
        let body_start = self.pos;
        let body = self.parse_expression()?;
        self.allow_newlines = saved;
        let meaning = if tagged {
            let span = Span::new(body_start, self.pos);
            self.set.insert(PatKind::Tagged { pat: body, tag: name.clone() }, span)
        } else {
            body
        };
        Ok(Some((name, meaning)))
    }

    /// `expression := chain ( "/" chain )* ( "=>" string-literal )*`
    fn parse_expression(&mut self) -> ParseResult<PatId> {
        let mut alts = vec![self.parse_chain()?];
        loop {
            self.skip_space();
            if self.peek() == Some(b'/') {
                self.pos += 1;
                alts.push(self.parse_chain()?);
            } else {
                break;
            }
        }
        let mut expr = alts.pop().unwrap_or_else(|| {
            self.set.insert(PatKind::Literal(Vec::new()), Span::new(self.pos, self.pos))
        });
        while let Some(first) = alts.pop() {
            expr = self.set.choice(first, expr);
        }
        loop {
            self.skip_space();
            if self.peek() == Some(b'=') && self.peek_at(1) == Some(b'>') {
                self.pos += 2;
                let text = self.parse_replacement_literal()?;
                let span = self.set.node(expr).span;
                expr = self.set.insert(PatKind::Replace { pat: Some(expr), text }, span);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// `chain := postfix+` (juxtaposition).
    fn parse_chain(&mut self) -> ParseResult<PatId> {
        let start = self.pos;
        let mut items = Vec::new();
        loop {
            self.skip_space();
            if !self.can_start_atom() {
                break;
            }
            items.push(self.parse_postfix()?);
        }
        match self.set.chain_all(&items) {
            Some(id) => Ok(id),
            None => Err(ParseError::syntax(
                "expected a pattern",
                Span::new(start, (start + 1).min(self.src.len().max(start + 1))),
            )),
        }
    }

    /// `postfix := simple ( ("~"|"!~") simple )*`
    fn parse_postfix(&mut self) -> ParseResult<PatId> {
        let mut pat = self.parse_simple()?;
        loop {
            let save = self.pos;
            self.skip_space();
            if self.peek() == Some(b'~') {
                self.pos += 1;
                let inner = self.parse_simple()?;
                let span = Span::new(self.set.node(pat).span.start, self.pos);
                pat = self.set.insert(PatKind::MatchedBy { pat, inner }, span);
            } else if self.peek() == Some(b'!') && self.peek_at(1) == Some(b'~') {
                self.pos += 2;
                let inner = self.parse_simple()?;
                let span = Span::new(self.set.node(pat).span.start, self.pos);
                pat = self.set.insert(PatKind::NotMatchedBy { pat, inner }, span);
            } else {
                self.pos = save;
                break;
            }
        }
        Ok(pat)
    }

    /// One atom, possibly introduced by a prefix operator.
    fn parse_simple(&mut self) -> ParseResult<PatId> {
        self.skip_space();
        let start = self.pos;
        let Some(b) = self.peek() else {
            return Err(self.err_here("expected a pattern"));
        };
        match b {
            b'.' => self.parse_dots(),
            b'`' => self.parse_backtick(),
            b'\\' => self.parse_escape_atom(),
            b'"' | b'\'' => self.parse_quoted(b),
            b'{' => self.parse_bracket_string(),
            b'(' => self.parse_group(b')'),
            b'[' => {
                let inner = self.parse_group(b']')?;
                let span = Span::new(start, self.pos);
                Ok(self.set.insert(
                    PatKind::Repeat { min: 0, max: Some(1), pat: inner, sep: None },
                    span,
                ))
            }
            b'*' => {
                self.pos += 1;
                self.parse_repeat(0, None, start)
            }
            b'+' => {
                self.pos += 1;
                self.parse_repeat(1, None, start)
            }
            b'0'..=b'9' => self.parse_counted(start),
            b'<' => {
                self.pos += 1;
                let pat = self.parse_simple()?;
                let span = Span::new(start, self.pos);
                if self.set.node(pat).max_len.is_none() {
                    return Err(ParseError::syntax(
                        "lookbehind pattern must have a bounded length",
                        span,
                    ));
                }
                Ok(self.set.insert(PatKind::After(pat), span))
            }
            b'>' => {
                self.pos += 1;
                let pat = self.parse_simple()?;
                let span = Span::new(start, self.pos);
                Ok(self.set.insert(PatKind::Before(pat), span))
            }
            b'!' => {
                self.pos += 1;
                let pat = self.parse_simple()?;
                let span = Span::new(start, self.pos);
                Ok(self.set.insert(PatKind::Not(pat), span))
            }
            b'@' => self.parse_capture(start),
            b'^' => {
                if self.peek_at(1) == Some(b'^') {
                    self.pos += 2;
                    Ok(self.anchor_or_ref(b"^^", PatKind::FileStart, start))
                } else {
                    self.pos += 1;
                    Ok(self.anchor_or_ref(b"^", PatKind::LineStart, start))
                }
            }
            b'$' => {
                if self.peek_at(1) == Some(b'$') {
                    self.pos += 2;
                    Ok(self.anchor_or_ref(b"$$", PatKind::FileEnd, start))
                } else {
                    self.pos += 1;
                    Ok(self.anchor_or_ref(b"$", PatKind::LineEnd, start))
                }
            }
            b'|' => {
                self.pos += 1;
                Ok(self.anchor_or_ref(b"|", PatKind::WordBoundary, start))
            }
            _ if is_id_start(b) => {
                let name = self.scan_ident();
                let span = Span::new(start, self.pos);
                Ok(self.set.insert(PatKind::Ref { name }, span))
            }
            _ => Err(ParseError::syntax(
                format!("unexpected character '{}'", b.escape_ascii()),
                Span::new(start, start + 1),
            )),
        }
    }

    /// `.`, `..`, `...`: each dot beyond the trailing two is one `AnyChar`.
    fn parse_dots(&mut self) -> ParseResult<PatId> {
        let start = self.pos;
        let mut k = 0;
        while self.peek() == Some(b'.') {
            self.pos += 1;
            k += 1;
        }
        if k == 1 {
            return Ok(self.set.insert(PatKind::AnyChar, Span::new(start, self.pos)));
        }
        let upto = self.parse_upto_clauses(start)?;
        let mut items = Vec::with_capacity(k - 1);
        for i in 0..k - 2 {
            items.push(
                self.set
                    .insert(PatKind::AnyChar, Span::new(start + i, start + i + 1)),
            );
        }
        items.push(upto);
        match self.set.chain_all(&items) {
            Some(id) => Ok(id),
            None => Ok(upto),
        }
    }

    /// After `..`: an optional `%skip` or `=` (strict) clause, then an
    /// optional target atom.
    fn parse_upto_clauses(&mut self, start: usize) -> ParseResult<PatId> {
        let mut skip = None;
        let mut strict = false;
        if self.peek() == Some(b'%') {
            self.pos += 1;
            skip = Some(self.parse_simple()?);
        } else if self.peek() == Some(b'=') && self.peek_at(1) != Some(b'>') {
            self.pos += 1;
            strict = true;
        }
        let save = self.pos;
        self.skip_space();
        let target = if self.can_start_atom() {
            Some(self.parse_simple()?)
        } else {
            self.pos = save;
            None
        };
        let span = Span::new(start, self.pos);
        Ok(self.set.insert(PatKind::Upto { target, skip, strict }, span))
    }

    /// `` `c ``, `` `a-z ``, and comma lists of either.
    fn parse_backtick(&mut self) -> ParseResult<PatId> {
        let start = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            let item_start = self.pos;
            let lo = self.scan_raw_char("expected a character after `")?;
            if self.peek() == Some(b'-') && self.peek_at(1).is_some() {
                self.pos += 1;
                let hi = self.scan_raw_char("expected a character after -")?;
                let (&[lo], &[hi]) = (&lo[..], &hi[..]) else {
                    return Err(ParseError::syntax(
                        "character range endpoints must be single bytes",
                        Span::new(item_start, self.pos),
                    ));
                };
                if hi < lo {
                    return Err(ParseError::syntax(
                        "character range is high-to-low",
                        Span::new(item_start, self.pos),
                    ));
                }
                items.push(
                    self.set
                        .insert(PatKind::ByteRange { lo, hi }, Span::new(item_start, self.pos)),
                );
            } else {
                items.push(
                    self.set
                        .insert(PatKind::Literal(lo), Span::new(item_start, self.pos)),
                );
            }
            if self.peek() == Some(b',') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let mut expr = match items.pop() {
            Some(id) => id,
            None => return Err(self.err_at(start, "expected a character after `")),
        };
        while let Some(first) = items.pop() {
            expr = self.set.choice(first, expr);
        }
        Ok(expr)
    }

    /// One raw codepoint, as its UTF-8 bytes.
    fn scan_raw_char(&mut self, missing: &str) -> ParseResult<Vec<u8>> {
        match self.peek() {
            None | Some(b'\n') => Err(self.err_here(missing)),
            Some(lead) => {
                let len = char_len(lead).min(self.src.len() - self.pos);
                let bytes = self.src[self.pos..self.pos + len].to_vec();
                self.pos += len;
                Ok(bytes)
            }
        }
    }

    /// Backslash atom: named classes, escape bytes, and byte ranges.
    fn parse_escape_atom(&mut self) -> ParseResult<PatId> {
        let start = self.pos;
        self.pos += 1;
        let Some(c) = self.peek() else {
            return Err(self.err_at(start, "expected an escape sequence after backslash"));
        };
        let named = match c {
            b'N' => Some(PatKind::Nodent),
            b'C' => Some(PatKind::CurDent),
            b'i' => Some(PatKind::IdStart),
            b'I' => Some(PatKind::IdContinue),
            b'b' => Some(PatKind::WordBoundary),
            _ => None,
        };
        if let Some(kind) = named {
            self.pos += 1;
            return Ok(self.set.insert(kind, Span::new(start, self.pos)));
        }
        let lo = self.decode_escape_byte(start)?;
        if self.peek() == Some(b'-') && self.peek_at(1) == Some(b'\\') {
            self.pos += 2;
            let hi = self.decode_escape_byte(start)?;
            if hi < lo {
                return Err(ParseError::syntax(
                    "byte range is high-to-low",
                    Span::new(start, self.pos),
                ));
            }
            return Ok(self
                .set
                .insert(PatKind::ByteRange { lo, hi }, Span::new(start, self.pos)));
        }
        Ok(self
            .set
            .insert(PatKind::Literal(vec![lo]), Span::new(start, self.pos)))
    }

    /// The byte value of the escape at `self.pos` (just past a backslash).
    fn decode_escape_byte(&mut self, start: usize) -> ParseResult<u8> {
        let Some(c) = self.peek() else {
            return Err(self.err_at(start, "expected an escape sequence after backslash"));
        };
        let simple = match c {
            b'n' => Some(b'\n'),
            b't' => Some(b'\t'),
            b'r' => Some(b'\r'),
            b'e' => Some(0x1B),
            b'a' => Some(0x07),
            b'f' => Some(0x0C),
            b'v' => Some(0x0B),
            b'\\' => Some(b'\\'),
            _ => None,
        };
        if let Some(byte) = simple {
            self.pos += 1;
            return Ok(byte);
        }
        if c == b'x' {
            self.pos += 1;
            let mut value: u32 = 0;
            let mut digits = 0;
            while digits < 2 {
                match self.peek().and_then(hex_digit) {
                    Some(d) => {
                        value = value * 16 + d;
                        self.pos += 1;
                        digits += 1;
                    }
                    None => break,
                }
            }
            if digits == 0 {
                return Err(self.err_at(start, "invalid hex escape"));
            }
            return Ok(value as u8);
        }
        if c.is_ascii_digit() {
            let mut value: u32 = 0;
            let mut digits = 0;
            while digits < 3 {
                match self.peek() {
                    Some(d @ b'0'..=b'7') => {
                        value = value * 8 + u32::from(d - b'0');
                        self.pos += 1;
                        digits += 1;
                    }
                    _ => break,
                }
            }
            if digits == 0 || value > 0xFF {
                return Err(self.err_at(start, "invalid octal escape"));
            }
            return Ok(value as u8);
        }
        Err(ParseError::syntax(
            format!("invalid escape sequence '\\{}'", c.escape_ascii()),
            Span::new(start, self.pos + 1),
        ))
    }

    /// `"…"` or `'…'`, raw bytes, no escape processing.
    fn parse_quoted(&mut self, quote: u8) -> ParseResult<PatId> {
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                let bytes = self.src[content_start..self.pos].to_vec();
                self.pos += 1;
                return Ok(self
                    .set
                    .insert(PatKind::Literal(bytes), Span::new(start, self.pos)));
            }
            self.pos += 1;
        }
        Err(self.err_at(start, "unterminated string"))
    }

    /// `{…}`: the bracketed literal-string form.
    fn parse_bracket_string(&mut self) -> ParseResult<PatId> {
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'}' {
                let bytes = self.src[content_start..self.pos].to_vec();
                self.pos += 1;
                return Ok(self
                    .set
                    .insert(PatKind::Literal(bytes), Span::new(start, self.pos)));
            }
            self.pos += 1;
        }
        Err(self.err_at(start, "unterminated { string"))
    }

    /// A parenthesised or bracketed subexpression; newlines are allowed
    /// inside.
    fn parse_group(&mut self, close: u8) -> ParseResult<PatId> {
        let start = self.pos;
        self.pos += 1;
        let saved = self.allow_newlines;
        self.allow_newlines = true;
        let inner = self.parse_expression()?;
        self.skip_space();
        if self.peek() != Some(close) {
            self.allow_newlines = saved;
            return Err(self.err_at(
                start,
                if close == b')' { "expected a closing )" } else { "expected a closing ]" },
            ));
        }
        self.pos += 1;
        self.allow_newlines = saved;
        Ok(inner)
    }

    /// The pattern and optional `% sep` of a `*`/`+`/counted repetition.
    fn parse_repeat(
        &mut self,
        min: u32,
        max: Option<u32>,
        start: usize,
    ) -> ParseResult<PatId> {
        let pat = self.parse_simple()?;
        let sep = self.parse_separator()?;
        let span = Span::new(start, self.pos);
        Ok(self.set.insert(PatKind::Repeat { min, max, pat, sep }, span))
    }

    fn parse_separator(&mut self) -> ParseResult<Option<PatId>> {
        let save = self.pos;
        self.skip_space();
        if self.peek() == Some(b'%') {
            self.pos += 1;
            Ok(Some(self.parse_simple()?))
        } else {
            self.pos = save;
            Ok(None)
        }
    }

    /// `N pat`, `N-M pat`, `N+ pat`.
    fn parse_counted(&mut self, start: usize) -> ParseResult<PatId> {
        let min = self.scan_number(start)?;
        match self.peek() {
            // Adjacent only: `2+pat` is "two or more", `2 +pat` is two
            // one-or-more repeats.
            Some(b'+') => {
                self.pos += 1;
                self.parse_repeat(min, None, start)
            }
            Some(b'-') if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => {
                self.pos += 1;
                let max = self.scan_number(start)?;
                if max < min {
                    return Err(ParseError::syntax(
                        "repetition range is high-to-low",
                        Span::new(start, self.pos),
                    ));
                }
                self.parse_repeat(min, Some(max), start)
            }
            _ => self.parse_repeat(min, Some(min), start),
        }
    }

    fn scan_number(&mut self, start: usize) -> ParseResult<u32> {
        let mut value: u64 = 0;
        let mut digits = 0;
        while let Some(d) = self.peek().filter(u8::is_ascii_digit) {
            value = value * 10 + u64::from(d - b'0');
            if value > u64::from(u32::MAX) {
                return Err(self.err_at(start, "repetition count is too large"));
            }
            self.pos += 1;
            digits += 1;
        }
        if digits == 0 {
            return Err(self.err_here("expected a number"));
        }
        Ok(value as u32)
    }

    /// `@pat`, `@name=pat`, `@name:pat`, `@:Tag`, `@:Tag=pat`.
    fn parse_capture(&mut self, start: usize) -> ParseResult<PatId> {
        self.pos += 1;
        if self.peek() == Some(b':') {
            self.pos += 1;
            let Some(tag) = self.scan_name() else {
                return Err(self.err_here("expected a name after @:"));
            };
            let pat = if self.peek() == Some(b'=') {
                self.pos += 1;
                self.parse_simple()?
            } else {
                self.set
                    .insert(PatKind::Literal(Vec::new()), Span::new(self.pos, self.pos))
            };
            let span = Span::new(start, self.pos);
            return Ok(self.set.insert(PatKind::Tagged { pat, tag }, span));
        }
        let save = self.pos;
        let mut name = None;
        let mut backreffable = false;
        if let Some(scanned) = self.scan_name() {
            match self.peek() {
                Some(b'=') => {
                    self.pos += 1;
                    name = Some(scanned);
                }
                Some(b':') => {
                    self.pos += 1;
                    name = Some(scanned);
                    backreffable = true;
                }
                // Plain `@foo`: the identifier is the captured pattern.
                _ => self.pos = save,
            }
        }
        let pat = self.parse_simple()?;
        let span = Span::new(start, self.pos);
        Ok(self
            .set
            .insert(PatKind::Capture { pat, name, backreffable }, span))
    }

    /// `=> "text"` replacement literal: `"…"`, `'…'`, `{…}`, or the
    /// low-ASCII `\x02 … \x03` delimited form.
    fn parse_replacement_literal(&mut self) -> ParseResult<Vec<u8>> {
        self.skip_space();
        let start = self.pos;
        let close = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            Some(b'{') => b'}',
            Some(0x02) => 0x03,
            _ => return Err(self.err_here("expected a replacement string after =>")),
        };
        self.pos += 1;
        let content_start = self.pos;
        while let Some(b) = self.peek() {
            if b == close {
                let text = self.src[content_start..self.pos].to_vec();
                self.pos += 1;
                let trailing = text.iter().rev().take_while(|&&b| b == b'\\').count();
                if trailing % 2 == 1 {
                    return Err(ParseError::syntax(
                        "replacement text ends with a dangling backslash",
                        Span::new(content_start, self.pos),
                    ));
                }
                return Ok(text);
            }
            self.pos += 1;
        }
        Err(self.err_at(start, "unterminated replacement string"))
    }

    /// An anchor atom, unless a definition shadows its name.
    fn anchor_or_ref(&mut self, name: &[u8], kind: PatKind, start: usize) -> PatId {
        let span = Span::new(start, self.pos);
        if self.defined.iter().any(|d| d == name) {
            self.set.insert(PatKind::Ref { name: name.to_vec() }, span)
        } else {
            self.set.insert(kind, span)
        }
    }

    // ------------------------------------------------------------------
    // Lexical helpers

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn err_here(&self, message: &str) -> ParseError {
        self.err_at(self.pos, message)
    }

    fn err_at(&self, start: usize, message: &str) -> ParseError {
        let end = (start + 1).max(self.pos).min(self.src.len().max(start + 1));
        ParseError::syntax(message, Span::new(start, end))
    }

    /// Skip spaces, tabs, carriage returns, and `#` comments; newlines only
    /// when the current context allows them.
    fn skip_space(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'#' => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                }
                b'\n' if self.allow_newlines => self.pos += 1,
                _ => break,
            }
        }
    }

    /// True when the next byte can begin an atom.
    fn can_start_atom(&self) -> bool {
        match self.peek() {
            None => false,
            Some(b) => match b {
                b'.' | b'`' | b'\\' | b'"' | b'\'' | b'{' | b'(' | b'[' | b'*' | b'+'
                | b'<' | b'>' | b'!' | b'@' | b'^' | b'$' | b'|' => true,
                b'0'..=b'9' => true,
                _ => is_id_start(b),
            },
        }
    }

    /// An ordinary identifier: letter or `_`, then letters, digits, `-`.
    fn scan_ident(&mut self) -> Vec<u8> {
        let start = self.pos;
        while self.peek().is_some_and(is_id_continue) {
            self.pos += 1;
        }
        self.src[start..self.pos].to_vec()
    }

    /// A definition or capture name: an identifier, or one of the special
    /// single-character names `^`, `^^`, `$`, `$$`, `|`.
    fn scan_name(&mut self) -> Option<Vec<u8>> {
        match self.peek()? {
            b if is_id_start(b) => Some(self.scan_ident()),
            b'^' => {
                if self.peek_at(1) == Some(b'^') {
                    self.pos += 2;
                    Some(b"^^".to_vec())
                } else {
                    self.pos += 1;
                    Some(b"^".to_vec())
                }
            }
            b'$' => {
                if self.peek_at(1) == Some(b'$') {
                    self.pos += 2;
                    Some(b"$$".to_vec())
                } else {
                    self.pos += 1;
                    Some(b"$".to_vec())
                }
            }
            b'|' => {
                self.pos += 1;
                Some(b"|".to_vec())
            }
            _ => None,
        }
    }
}

fn hex_digit(b: u8) -> Option<u32> {
    match b {
        b'0'..=b'9' => Some(u32::from(b - b'0')),
        b'a'..=b'f' => Some(u32::from(b - b'a') + 10),
        b'A'..=b'F' => Some(u32::from(b - b'A') + 10),
        _ => None,
    }
}
