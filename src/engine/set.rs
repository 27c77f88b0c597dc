//! Unicode set literals.
//!
//! A set is parsed from the bracketed syntax used in rule scripts:
//!
//! ```text
//! [abc]  [a-z0-9]  [^a-z]  [\-\_]  [ä 'x']  [{ch} {ä}]
//! [[:Lowercase:]]  [:^L:]  [\p{Latin}]  [[a-z] - [aeiou]]  [[\p{L}] & [\p{Latin}]]
//! ```
//!
//! Membership is evaluated on a small expression tree rather than a flattened
//! code point table. Explicit characters become sorted, merged ranges; Unicode
//! properties are delegated to the `regex` crate's property tables.
//!
//! Strings (`{...}`) only take part in matching, never in `contains`, and are
//! dropped by complementation and intersection.

use super::syntax::{Cursor, Escaped};
use crate::error::EngineError;
use regex::Regex;

#[derive(Debug, Clone)]
enum SetExpr {
    Ranges(Vec<(char, char)>),
    Property(Regex),
    Union(Vec<SetExpr>),
    Difference(Box<SetExpr>, Box<SetExpr>),
    Intersection(Box<SetExpr>, Box<SetExpr>),
    Complement(Box<SetExpr>),
}

impl SetExpr {
    fn contains(&self, c: char) -> bool {
        match self {
            SetExpr::Ranges(ranges) => ranges
                .binary_search_by(|&(lo, hi)| {
                    if hi < c {
                        std::cmp::Ordering::Less
                    } else if lo > c {
                        std::cmp::Ordering::Greater
                    } else {
                        std::cmp::Ordering::Equal
                    }
                })
                .is_ok(),
            SetExpr::Property(re) => {
                let mut buf = [0u8; 4];
                re.is_match(c.encode_utf8(&mut buf))
            }
            SetExpr::Union(items) => items.iter().any(|item| item.contains(c)),
            SetExpr::Difference(a, b) => a.contains(c) && !b.contains(c),
            SetExpr::Intersection(a, b) => a.contains(c) && b.contains(c),
            SetExpr::Complement(inner) => !inner.contains(c),
        }
    }
}

/// A parsed Unicode set.
#[derive(Debug, Clone)]
pub(crate) struct UnicodeSet {
    expr: SetExpr,
    /// Multi-character strings, longest first.
    strings: Vec<Vec<char>>,
}

impl UnicodeSet {
    /// The set of all code points (`.` in patterns).
    pub(crate) fn any() -> Self {
        UnicodeSet { expr: SetExpr::Complement(Box::new(SetExpr::Ranges(Vec::new()))), strings: Vec::new() }
    }

    pub(crate) fn contains(&self, c: char) -> bool {
        self.expr.contains(c)
    }

    /// Length of the longest match at `pos`: a string of the set, or one character.
    pub(crate) fn match_at(&self, text: &[char], pos: usize) -> Option<usize> {
        let rest = text.get(pos..)?;
        if let Some(s) = self.strings.iter().find(|s| rest.starts_with(s)) {
            return Some(s.len());
        }
        rest.first().filter(|&&c| self.contains(c)).map(|_| 1)
    }

    /// Like [`match_at`](Self::match_at), for a match that ends at `end`.
    pub(crate) fn match_before(&self, text: &[char], end: usize) -> Option<usize> {
        let head = text.get(..end)?;
        if let Some(s) = self.strings.iter().find(|s| head.ends_with(s)) {
            return Some(s.len());
        }
        head.last().filter(|&&c| self.contains(c)).map(|_| 1)
    }

    fn complement(self) -> Self {
        UnicodeSet { expr: SetExpr::Complement(Box::new(self.expr)), strings: Vec::new() }
    }

    fn property(cur: &Cursor<'_>, name: &str, negated: bool) -> Result<Self, EngineError> {
        let name = name.trim();
        let valid_name = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '=' | '-' | '.'));
        if !valid_name {
            return Err(cur.error(format!("invalid property name \"{name}\"")));
        }
        let re = Regex::new(&format!(r"^\p{{{name}}}$"))
            .map_err(|_| cur.error(format!("unknown property \"{name}\"")))?;
        let set = UnicodeSet { expr: SetExpr::Property(re), strings: Vec::new() };
        Ok(if negated { set.complement() } else { set })
    }
}

#[derive(Debug, Clone, Copy)]
enum SetOp {
    Difference,
    Intersection,
}

#[derive(Default)]
struct SetBuilder {
    base: Option<SetExpr>,
    ranges: Vec<(char, char)>,
    parts: Vec<SetExpr>,
    strings: Vec<Vec<char>>,
}

impl SetBuilder {
    fn has_operand(&self) -> bool {
        self.base.is_some() || !self.ranges.is_empty() || !self.parts.is_empty()
    }

    fn push_range(&mut self, lo: char, hi: char) {
        self.ranges.push((lo, hi));
    }

    fn push_string(&mut self, s: Vec<char>) {
        match s.as_slice() {
            [] => {}
            [c] => self.push_range(*c, *c),
            _ => self.strings.push(s),
        }
    }

    fn union(&mut self, set: UnicodeSet) {
        self.parts.push(set.expr);
        self.strings.extend(set.strings);
    }

    fn apply(&mut self, op: SetOp, rhs: UnicodeSet) {
        let lhs = Box::new(self.take_current());
        let rhs_expr = Box::new(rhs.expr);
        self.base = Some(match op {
            SetOp::Difference => {
                self.strings.retain(|s| !rhs.strings.contains(s));
                SetExpr::Difference(lhs, rhs_expr)
            }
            SetOp::Intersection => {
                self.strings.retain(|s| rhs.strings.contains(s));
                SetExpr::Intersection(lhs, rhs_expr)
            }
        });
    }

    fn take_current(&mut self) -> SetExpr {
        let mut items = Vec::new();
        if let Some(base) = self.base.take() {
            items.push(base);
        }
        if !self.ranges.is_empty() {
            items.push(SetExpr::Ranges(merge_ranges(std::mem::take(&mut self.ranges))));
        }
        items.append(&mut self.parts);
        match items.len() {
            0 => SetExpr::Ranges(Vec::new()),
            1 => items.remove(0),
            _ => SetExpr::Union(items),
        }
    }

    fn finish(mut self) -> UnicodeSet {
        let expr = self.take_current();
        let mut strings = std::mem::take(&mut self.strings);
        strings.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        strings.dedup();
        UnicodeSet { expr, strings }
    }
}

fn merge_ranges(mut ranges: Vec<(char, char)>) -> Vec<(char, char)> {
    ranges.sort_unstable();
    let mut merged: Vec<(char, char)> = Vec::with_capacity(ranges.len());
    for (lo, hi) in ranges {
        match merged.last_mut() {
            Some(last) if (lo as u32) <= (last.1 as u32).saturating_add(1) => {
                if hi > last.1 {
                    last.1 = hi;
                }
            }
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

/// Parse a set starting at the cursor, which must be on `[` (or `\p`/`\P`).
pub(crate) fn parse(cur: &mut Cursor<'_>) -> Result<UnicodeSet, EngineError> {
    if cur.peek() == Some('\\') {
        return match cur.escape()? {
            Escaped::Property { name, negated } => UnicodeSet::property(cur, &name, negated),
            Escaped::Char(c) => Err(cur.error(format!("expected a set, found `\\{c}`"))),
        };
    }
    if cur.peek() != Some('[') {
        return Err(cur.error("expected `[`"));
    }
    if cur.peek_at(1) == Some(':') {
        return parse_posix_property(cur);
    }
    cur.bump();
    let negated = cur.eat('^');

    let mut builder = SetBuilder::default();
    let mut range_start: Option<char> = None;

    loop {
        cur.skip_whitespace();
        let Some(c) = cur.peek() else {
            return Err(cur.error("unterminated set, missing `]`"));
        };
        match c {
            ']' => {
                cur.bump();
                break;
            }
            '[' => {
                builder.union(parse(cur)?);
                range_start = None;
            }
            '-' | '&' if builder.has_operand() && starts_nested_set(cur, 1) => {
                cur.bump();
                cur.skip_whitespace();
                let op = if c == '-' { SetOp::Difference } else { SetOp::Intersection };
                let rhs = parse(cur)?;
                builder.apply(op, rhs);
                range_start = None;
            }
            '-' if range_start.is_some() && cur.peek_significant(1).is_some_and(|(_, next)| next != ']') => {
                cur.bump();
                cur.skip_whitespace();
                let hi = literal_char(cur)?;
                let lo = range_start.take().unwrap_or(hi);
                if hi < lo {
                    return Err(cur.error(format!("invalid range {lo}-{hi}")));
                }
                builder.push_range(lo, hi);
            }
            '{' => {
                cur.bump();
                builder.push_string(string_literal(cur)?);
                range_start = None;
            }
            '\'' => {
                let text = cur.quoted()?;
                for ch in text.chars() {
                    builder.push_range(ch, ch);
                }
                range_start = text.chars().last();
            }
            '\\' if matches!(cur.peek_at(1), Some('p' | 'P')) => {
                builder.union(parse(cur)?);
                range_start = None;
            }
            _ => {
                let ch = literal_char(cur)?;
                builder.push_range(ch, ch);
                range_start = Some(ch);
            }
        }
    }

    let set = builder.finish();
    Ok(if negated { set.complement() } else { set })
}

fn starts_nested_set(cur: &Cursor<'_>, offset: usize) -> bool {
    match cur.peek_significant(offset) {
        Some((_, '[')) => true,
        Some((at, '\\')) => matches!(cur.peek_at(at + 1), Some('p' | 'P')),
        _ => false,
    }
}

/// `[:Name:]` or `[:^Name:]`.
fn parse_posix_property(cur: &mut Cursor<'_>) -> Result<UnicodeSet, EngineError> {
    cur.bump();
    cur.bump();
    let negated = cur.eat('^');
    let mut name = String::new();
    loop {
        match cur.bump() {
            None => return Err(cur.error("unterminated property, missing `:]`")),
            Some(':') if cur.eat(']') => break,
            Some(c) => name.push(c),
        }
    }
    UnicodeSet::property(cur, &name, negated)
}

fn literal_char(cur: &mut Cursor<'_>) -> Result<char, EngineError> {
    match cur.peek() {
        Some('\\') => match cur.escape()? {
            Escaped::Char(c) => Ok(c),
            Escaped::Property { .. } => Err(cur.error("property is not allowed as a range bound")),
        },
        Some(c) => {
            cur.bump();
            Ok(c)
        }
        None => Err(cur.error("unexpected end of set")),
    }
}

/// Contents of `{...}`; the opening brace is already consumed.
fn string_literal(cur: &mut Cursor<'_>) -> Result<Vec<char>, EngineError> {
    let mut out = Vec::new();
    loop {
        cur.skip_whitespace();
        match cur.peek() {
            None => return Err(cur.error("unterminated string, missing `}`")),
            Some('}') => {
                cur.bump();
                return Ok(out);
            }
            Some('\'') => out.extend(cur.quoted()?.chars()),
            Some(_) => out.push(literal_char(cur)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(src: &str) -> UnicodeSet {
        let chars: Vec<char> = src.chars().collect();
        let mut cur = Cursor::new(&chars, src);
        let set = parse(&mut cur).unwrap();
        assert!(cur.is_eof(), "trailing input after {src}");
        set
    }

    fn parse_err(src: &str) -> EngineError {
        let chars: Vec<char> = src.chars().collect();
        let mut cur = Cursor::new(&chars, src);
        parse(&mut cur).unwrap_err()
    }

    #[test]
    fn literal_chars_and_ranges() {
        let s = set("[a-cx \\- \\u00E4]");
        for c in ['a', 'b', 'c', 'x', '-', 'ä'] {
            assert!(s.contains(c), "{c}");
        }
        for c in ['d', 'w', ' ', 'A'] {
            assert!(!s.contains(c), "{c}");
        }
    }

    #[test]
    fn negation_and_difference() {
        let s = set("[^a-z]");
        assert!(s.contains('A'));
        assert!(!s.contains('q'));

        let s = set("[[a-zA-Z] - [a-z]]");
        assert!(s.contains('Q'));
        assert!(!s.contains('q'));
        assert!(!s.contains('1'));
    }

    #[test]
    fn intersection_with_property() {
        let s = set("[[a-z0-9] & [:Letter:]]");
        assert!(s.contains('k'));
        assert!(!s.contains('7'));
    }

    #[test]
    fn properties() {
        let lower = set("[:Lowercase:]");
        assert!(lower.contains('ä'));
        assert!(!lower.contains('Ä'));

        let not_letter = set("[:^L:]");
        assert!(not_letter.contains('1'));
        assert!(!not_letter.contains('x'));

        let marks = set("[\\p{Mn}\\p{Lm}]");
        assert!(marks.contains('\u{308}'));
        assert!(marks.contains('ʹ'));
        assert!(!marks.contains('a'));

        let loose = set("[:Nonspacing_Mark:]");
        assert!(loose.contains('\u{301}'));
    }

    #[test]
    fn strings_match_longest_first() {
        let s = set("[ä {a \\u0308} {__}]");
        let text: Vec<char> = "a\u{308}__ä_".chars().collect();
        assert_eq!(s.match_at(&text, 0), Some(2));
        assert_eq!(s.match_at(&text, 2), Some(2));
        assert_eq!(s.match_at(&text, 4), Some(1));
        assert_eq!(s.match_at(&text, 5), None);
        assert_eq!(s.match_at(&text, 6), None);
        assert!(!s.contains('a'));

        assert_eq!(s.match_before(&text, 2), Some(2));
        assert_eq!(s.match_before(&text, 5), Some(1));
        assert_eq!(s.match_before(&text, 0), None);
    }

    #[test]
    fn escaped_punctuation_from_compiled_literals() {
        let s = set("[^\\-\\.0-9a-z]");
        assert!(!s.contains('.'));
        assert!(!s.contains('-'));
        assert!(s.contains('_'));
    }

    #[test]
    fn trailing_hyphen_is_literal() {
        let s = set("[a-]");
        assert!(s.contains('-'));
        assert!(s.contains('a'));
    }

    #[test]
    fn rejects_malformed_sets() {
        assert!(parse_err("[a-z").message.contains("unterminated"));
        assert!(parse_err("[z-a]").message.contains("invalid range"));
        assert!(parse_err("[:NoSuchProperty:]").message.contains("unknown property"));
        assert!(parse_err("[{ab]").message.contains("unterminated string"));
    }
}
