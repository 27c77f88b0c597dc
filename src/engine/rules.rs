//! Rule script parsing and execution for the built-in engine.
//!
//! A script is a list of `;`-terminated statements:
//!
//! ```text
//! :: NFC ;                          transform pass
//! :: [^a-z] Latin-ASCII ;           filtered transform pass
//! $AE = [Ä {A \u0308}] ;            variable
//! $AE } [:Lowercase:] > Ae ;        conversion rule (key, after context)
//! ^ [{\-}]+ > ;                     anchored conversion rule
//! :: Null ;                         pass separator
//! ```
//!
//! Consecutive conversion rules form one pass. Within a pass the rules are
//! tried in order at each position; the first one that matches replaces its
//! key and the cursor continues after the replacement. Matching is greedy and
//! never backtracks.
//!
//! ## Design notes
//!
//! - Variables are substituted textually before a statement is parsed, so a
//!   variable can hold any pattern fragment.
//! - Reverse-only rules (`<`, `←`) are accepted and ignored.
//! - Transform passes with a filter apply the transform to each maximal run
//!   of filtered characters independently.

use super::named::NamedTransform;
use super::set::{self, UnicodeSet};
use super::syntax::{Cursor, Escaped};
use crate::error::EngineError;
use std::collections::HashMap;

/// A parsed, executable rule script.
#[derive(Debug, Clone, Default)]
pub(crate) struct Program {
    passes: Vec<Pass>,
}

#[derive(Debug, Clone)]
enum Pass {
    Named { filter: Option<UnicodeSet>, transform: NamedTransform },
    Rules(Vec<Rule>),
}

impl Program {
    pub(crate) fn named(transform: NamedTransform) -> Self {
        Program { passes: vec![Pass::Named { filter: None, transform }] }
    }

    pub(crate) fn parse(script: &str) -> Result<Self, EngineError> {
        let mut variables: HashMap<String, String> = HashMap::new();
        let mut passes = Vec::new();
        let mut pending: Vec<Rule> = Vec::new();

        for statement in split_statements(script) {
            if let Some((name, value)) = variable_definition(&statement) {
                let value = substitute(value, &variables, &statement)?;
                variables.insert(name.to_string(), value);
                continue;
            }

            let text = substitute(&statement, &variables, &statement)?;
            if let Some(body) = text.trim_start().strip_prefix("::") {
                if !pending.is_empty() {
                    passes.push(Pass::Rules(std::mem::take(&mut pending)));
                }
                if let Some(pass) = parse_transform(body, &statement)? {
                    passes.push(pass);
                }
            } else if let Some(rule) = Rule::parse(&text, &statement)? {
                pending.push(rule);
            }
        }
        if !pending.is_empty() {
            passes.push(Pass::Rules(pending));
        }

        Ok(Program { passes })
    }

    pub(crate) fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub(crate) fn run(&self, text: &str) -> String {
        let mut text = text.to_string();
        for pass in &self.passes {
            text = match pass {
                Pass::Named { filter: None, transform } => transform.apply(&text),
                Pass::Named { filter: Some(filter), transform } => apply_filtered(filter, *transform, &text),
                Pass::Rules(rules) => run_rules(rules, &text),
            };
        }
        text
    }
}

fn apply_filtered(filter: &UnicodeSet, transform: NamedTransform, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = String::new();
    for c in text.chars() {
        if filter.contains(c) {
            run.push(c);
        } else {
            if !run.is_empty() {
                out.push_str(&transform.apply(&run));
                run.clear();
            }
            out.push(c);
        }
    }
    if !run.is_empty() {
        out.push_str(&transform.apply(&run));
    }
    out
}

fn run_rules(rules: &[Rule], text: &str) -> String {
    let mut buf: Vec<char> = text.chars().collect();
    let mut pos = 0;
    while pos < buf.len() {
        let hit = rules.iter().find_map(|rule| rule.match_at(&buf, pos).map(|m| (rule, m)));
        match hit {
            Some((rule, m)) => {
                let replacement = rule.render(&buf, &m.captures);
                let len = replacement.len();
                buf.splice(pos..m.key_end, replacement);
                pos += len;
            }
            None => pos += 1,
        }
    }
    buf.into_iter().collect()
}

/// `:: [filter] Id (Inverse)` after the `::`. `None` for `Null`.
fn parse_transform(body: &str, statement: &str) -> Result<Option<Pass>, EngineError> {
    let chars: Vec<char> = body.chars().collect();
    let mut cur = Cursor::new(&chars, statement);
    cur.skip_whitespace();

    let filter = if matches!(cur.peek(), Some('[')) { Some(set::parse(&mut cur)?) } else { None };

    let rest = cur.rest();
    let id = rest.split('(').next().unwrap_or_default().trim();
    if id.is_empty() {
        return Err(cur.error(if filter.is_some() { "global filters are not supported" } else { "missing transform id" }));
    }

    match NamedTransform::lookup(id) {
        Some(NamedTransform::Null) => Ok(None),
        Some(transform) => Ok(Some(Pass::Named { filter, transform })),
        None => Err(cur.error(format!("unknown transform id \"{id}\""))),
    }
}

#[derive(Debug, Clone)]
enum Element {
    Literal(char),
    Set(UnicodeSet),
    Segment(usize, Vec<Element>),
    Repeat { element: Box<Element>, min: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    Text(char),
    Segment(usize),
}

#[derive(Debug, Clone)]
struct Rule {
    anchor_start: bool,
    anchor_end: bool,
    before: Vec<Element>,
    key: Vec<Element>,
    after: Vec<Element>,
    output: Vec<Output>,
    segments: usize,
}

struct RuleMatch {
    key_end: usize,
    captures: Vec<Option<(usize, usize)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
    Both,
}

impl Rule {
    /// Parse a conversion rule; `None` for reverse-only rules.
    fn parse(text: &str, statement: &str) -> Result<Option<Rule>, EngineError> {
        let chars: Vec<char> = text.chars().collect();
        let Some((op_at, op_len, direction)) = find_operator(&chars) else {
            return Err(EngineError::new("missing `>` operator", statement));
        };
        if direction == Direction::Reverse {
            return Ok(None);
        }

        let mut pattern = PatternParser { cur: Cursor::new(&chars[..op_at], statement), segments: 0 };
        let (anchor_start, before, key, after, anchor_end) = pattern.parse_lhs()?;
        if key.is_empty() {
            return Err(pattern.cur.error("rule has an empty key"));
        }

        let mut out = Cursor::new(&chars[op_at + op_len..], statement);
        let output = parse_output(&mut out, pattern.segments)?;

        Ok(Some(Rule { anchor_start, anchor_end, before, key, after, output, segments: pattern.segments }))
    }

    fn match_at(&self, text: &[char], pos: usize) -> Option<RuleMatch> {
        if self.anchor_start && self.before.is_empty() && pos != 0 {
            return None;
        }
        let mut captures = vec![None; self.segments];

        let start = match_seq_rev(&self.before, text, pos, &mut captures)?;
        if self.anchor_start && start != 0 {
            return None;
        }
        let key_end = match_seq(&self.key, text, pos, &mut captures)?;
        if key_end == pos {
            return None;
        }
        let end = match_seq(&self.after, text, key_end, &mut captures)?;
        if self.anchor_end && end != text.len() {
            return None;
        }
        Some(RuleMatch { key_end, captures })
    }

    fn render(&self, text: &[char], captures: &[Option<(usize, usize)>]) -> Vec<char> {
        let mut out = Vec::new();
        for part in &self.output {
            match *part {
                Output::Text(c) => out.push(c),
                Output::Segment(n) => {
                    if let Some(Some((start, end))) = captures.get(n - 1) {
                        out.extend_from_slice(&text[*start..*end]);
                    }
                }
            }
        }
        out
    }
}

/// Locate the rule operator outside sets, quotes and escapes.
fn find_operator(chars: &[char]) -> Option<(usize, usize, Direction)> {
    let mut depth = 0usize;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '\'' => {
                i += 1;
                while i < chars.len() && chars[i] != '\'' {
                    i += 1;
                }
            }
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            '<' if chars.get(i + 1) == Some(&'>') => return Some((i, 2, Direction::Both)),
            '<' | '←' => return Some((i, 1, Direction::Reverse)),
            '>' | '→' => return Some((i, 1, Direction::Forward)),
            '↔' => return Some((i, 1, Direction::Both)),
            _ => {}
        }
        i += 1;
    }
    None
}

type Lhs = (bool, Vec<Element>, Vec<Element>, Vec<Element>, bool);

struct PatternParser<'a> {
    cur: Cursor<'a>,
    segments: usize,
}

impl PatternParser<'_> {
    fn parse_lhs(&mut self) -> Result<Lhs, EngineError> {
        self.cur.skip_whitespace();
        let anchor_start = self.cur.eat('^');

        let first = self.parse_seq(false)?;
        let (before, key, after) = match self.cur.peek() {
            Some('{') => {
                self.cur.bump();
                let key = self.parse_seq(false)?;
                let after = if self.cur.eat('}') { self.parse_seq(false)? } else { Vec::new() };
                (first, key, after)
            }
            Some('}') => {
                self.cur.bump();
                (Vec::new(), first, self.parse_seq(false)?)
            }
            _ => (Vec::new(), first, Vec::new()),
        };

        let anchor_end = self.cur.eat('$');
        self.cur.skip_whitespace();
        if !self.cur.is_eof() {
            let message = if anchor_end {
                "`$` anchor must end the pattern".to_string()
            } else {
                format!("unexpected `{}`", self.cur.rest())
            };
            return Err(self.cur.error(message));
        }
        Ok((anchor_start, before, key, after, anchor_end))
    }

    /// Elements up to `{`, `}`, a trailing `$`, or `)` when inside a segment.
    fn parse_seq(&mut self, in_segment: bool) -> Result<Vec<Element>, EngineError> {
        let mut elements = Vec::new();
        loop {
            self.cur.skip_whitespace();
            let Some(c) = self.cur.peek() else {
                if in_segment {
                    return Err(self.cur.error("unterminated segment, missing `)`"));
                }
                return Ok(elements);
            };
            match c {
                '{' | '}' | '$' if !in_segment => return Ok(elements),
                ')' if in_segment => return Ok(elements),
                ')' => return Err(self.cur.error("unbalanced `)`")),
                '{' | '}' | '$' => return Err(self.cur.error(format!("`{c}` is not allowed inside a segment"))),
                '[' => elements.push(Element::Set(set::parse(&mut self.cur)?)),
                '\\' if matches!(self.cur.peek_at(1), Some('p' | 'P')) => {
                    elements.push(Element::Set(set::parse(&mut self.cur)?))
                }
                '\\' => match self.cur.escape()? {
                    Escaped::Char(ch) => elements.push(Element::Literal(ch)),
                    Escaped::Property { .. } => return Err(self.cur.error("unexpected property escape")),
                },
                '\'' => elements.extend(self.cur.quoted()?.chars().map(Element::Literal)),
                '(' => {
                    self.cur.bump();
                    self.segments += 1;
                    let index = self.segments;
                    let inner = self.parse_seq(true)?;
                    self.cur.bump();
                    elements.push(Element::Segment(index, inner));
                }
                '.' => {
                    self.cur.bump();
                    elements.push(Element::Set(UnicodeSet::any()));
                }
                '+' | '*' | '?' => {
                    self.cur.bump();
                    let Some(element) = elements.pop() else {
                        return Err(self.cur.error(format!("quantifier `{c}` has nothing to repeat")));
                    };
                    let (min, max) = match c {
                        '+' => (1, usize::MAX),
                        '*' => (0, usize::MAX),
                        _ => (0, 1),
                    };
                    elements.push(Element::Repeat { element: Box::new(element), min, max });
                }
                '|' | '@' => return Err(self.cur.error("cursor positioning is not supported")),
                '^' => return Err(self.cur.error("`^` anchor must start the pattern")),
                _ => {
                    self.cur.bump();
                    elements.push(Element::Literal(c));
                }
            }
        }
    }
}

fn parse_output(cur: &mut Cursor<'_>, segments: usize) -> Result<Vec<Output>, EngineError> {
    let mut output = Vec::new();
    loop {
        cur.skip_whitespace();
        let Some(c) = cur.peek() else {
            return Ok(output);
        };
        match c {
            '\\' => match cur.escape()? {
                Escaped::Char(ch) => output.push(Output::Text(ch)),
                Escaped::Property { .. } => return Err(cur.error("property is not allowed in a replacement")),
            },
            '\'' => output.extend(cur.quoted()?.chars().map(Output::Text)),
            '$' => {
                cur.bump();
                let n = cur.bump().and_then(|d| d.to_digit(10)).unwrap_or(0) as usize;
                if n == 0 || n > segments {
                    return Err(cur.error("replacement refers to an undefined segment"));
                }
                output.push(Output::Segment(n));
            }
            '|' | '@' | '{' | '}' => return Err(cur.error("cursor positioning is not supported")),
            _ => {
                cur.bump();
                output.push(Output::Text(c));
            }
        }
    }
}

fn match_seq(elements: &[Element], text: &[char], mut pos: usize, caps: &mut [Option<(usize, usize)>]) -> Option<usize> {
    for element in elements {
        pos = match_element(element, text, pos, caps)?;
    }
    Some(pos)
}

fn match_element(element: &Element, text: &[char], pos: usize, caps: &mut [Option<(usize, usize)>]) -> Option<usize> {
    match element {
        Element::Literal(c) => (text.get(pos) == Some(c)).then_some(pos + 1),
        Element::Set(set) => set.match_at(text, pos).map(|len| pos + len),
        Element::Segment(index, inner) => {
            let end = match_seq(inner, text, pos, caps)?;
            caps[index - 1] = Some((pos, end));
            Some(end)
        }
        Element::Repeat { element, min, max } => {
            let (mut pos, mut count) = (pos, 0);
            while count < *max {
                match match_element(element, text, pos, caps) {
                    Some(next) if next > pos => {
                        pos = next;
                        count += 1;
                    }
                    _ => break,
                }
            }
            (count >= *min).then_some(pos)
        }
    }
}

/// Match `elements` so that they end at `end`; returns the start.
fn match_seq_rev(elements: &[Element], text: &[char], mut end: usize, caps: &mut [Option<(usize, usize)>]) -> Option<usize> {
    for element in elements.iter().rev() {
        end = match_element_rev(element, text, end, caps)?;
    }
    Some(end)
}

fn match_element_rev(element: &Element, text: &[char], end: usize, caps: &mut [Option<(usize, usize)>]) -> Option<usize> {
    match element {
        Element::Literal(c) => (end > 0 && text.get(end - 1) == Some(c)).then(|| end - 1),
        Element::Set(set) => set.match_before(text, end).map(|len| end - len),
        Element::Segment(index, inner) => {
            let start = match_seq_rev(inner, text, end, caps)?;
            caps[index - 1] = Some((start, end));
            Some(start)
        }
        Element::Repeat { element, min, max } => {
            let (mut end, mut count) = (end, 0);
            while count < *max {
                match match_element_rev(element, text, end, caps) {
                    Some(prev) if prev < end => {
                        end = prev;
                        count += 1;
                    }
                    _ => break,
                }
            }
            (count >= *min).then_some(end)
        }
    }
}

/// Split a script into statements on `;`, dropping `#` comments.
fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = script.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '\'' => {
                current.push(c);
                for next in chars.by_ref() {
                    current.push(next);
                    if next == '\'' {
                        break;
                    }
                }
            }
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '#' if depth == 0 => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        current.push(next);
                        break;
                    }
                }
            }
            ';' if depth == 0 => {
                if !current.trim().is_empty() {
                    statements.push(std::mem::take(&mut current));
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        statements.push(current);
    }
    statements
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `$name = value`, returning the name and the raw value.
fn variable_definition(statement: &str) -> Option<(&str, &str)> {
    let rest = statement.trim_start().strip_prefix('$')?;
    let end = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
    let name = &rest[..end];
    if !name.starts_with(is_ident_start) {
        return None;
    }
    let value = rest[end..].trim_start().strip_prefix('=')?;
    Some((name, value))
}

/// Replace `$name` references outside quotes and escapes.
fn substitute(text: &str, variables: &HashMap<String, String>, statement: &str) -> Result<String, EngineError> {
    if !text.contains('$') {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '\'' => {
                out.push(c);
                for next in chars.by_ref() {
                    out.push(next);
                    if next == '\'' {
                        break;
                    }
                }
            }
            '$' if chars.peek().is_some_and(|&next| is_ident_start(next)) => {
                let mut name = String::new();
                while let Some(&next) = chars.peek().filter(|&&next| is_ident_char(next)) {
                    name.push(next);
                    chars.next();
                }
                let value = variables
                    .get(&name)
                    .ok_or_else(|| EngineError::new(format!("undefined variable ${name}"), statement))?;
                out.push_str(value);
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(script: &str, text: &str) -> String {
        Program::parse(script).unwrap().run(text)
    }

    fn parse_err(script: &str) -> EngineError {
        Program::parse(script).unwrap_err()
    }

    #[test]
    fn splits_statements_respecting_sets_quotes_and_comments() {
        let statements = split_statements("a > b; [\\;;] > x ; ';' > y; # comment ; here\n c > d");
        let trimmed: Vec<&str> = statements.iter().map(|s| s.trim()).collect();
        assert_eq!(trimmed, ["a > b", "[\\;;] > x", "';' > y", "c > d"]);
    }

    #[test]
    fn simple_replacements() {
        assert_eq!(run("a > 1; b > 1; c > 3;", "abcd"), "113d");
        assert_eq!(run("ab > x; a > y;", "aab"), "yx");
        assert_eq!(run("x > ;", "axbx"), "ab");
    }

    #[test]
    fn first_matching_rule_wins_and_output_is_not_rescanned() {
        assert_eq!(run("a > b; b > c;", "ab"), "bc");
        assert_eq!(run("o > oo;", "o"), "oo");
    }

    #[test]
    fn segments_pass_text_through() {
        assert_eq!(run("([b0-9]) > $1; a > 1; b > 2; c > 3;", "abc"), "1b3");
        assert_eq!(run("(a)(b) > $2$1;", "abab"), "baba");
    }

    #[test]
    fn contexts_and_anchors() {
        assert_eq!(run("a { b } c > X;", "abc abd bc"), "aXc abd bc");
        assert_eq!(run("b } [:Lowercase:] > X;", "ba bA"), "Xa bA");
        assert_eq!(run("x { y > Z;", "xy y"), "xZ y");
        assert_eq!(run("^ [\\-]+ > ;", "--a--"), "a--");
        assert_eq!(run("[\\-]+ $ > ;", "--a--"), "--a");
    }

    #[test]
    fn collapses_runs_into_delimiter() {
        let script = "[[^a-z0-9]{\\-}]+ > \\- ;\n:: Null ;\n^ [{\\-}]+ > ;\n[{\\-}]+ $ > ;\n:: Null ;";
        assert_eq!(run(script, "-a b--c- "), "a-b-c");
        let script = "[[^A-Z]{\\_\\_}]+ > \\_\\_ ;\n:: Null ;\n^ [{\\_\\_}]+ > ;\n[{\\_\\_}]+ $ > ;";
        assert_eq!(run(script, "OE-AEPFEL FUSS"), "OE__AEPFEL__FUSS");
    }

    #[test]
    fn variables_are_substituted() {
        let script = "$AE = [Ä {A \\u0308}]; $AE } [:Lowercase:] > Ae; $AE > AE;";
        assert_eq!(run(script, "Äpfel Ö Ä"), "Aepfel Ö AE");
        assert_eq!(run(script, "A\u{308}b"), "Aeb");
    }

    #[test]
    fn quoted_and_escaped_output() {
        assert_eq!(run("x > Chocolate \\u0020 Ice;", "x!"), "Chocolate Ice!");
        assert_eq!(run("x > 'a b';", "x"), "a b");
    }

    #[test]
    fn transform_passes_with_filters() {
        assert_eq!(run(":: Upper ;", "abc"), "ABC");
        assert_eq!(run(":: [a-b] Upper ;", "abc"), "ABc");
        assert_eq!(run(":: [^a-z] Latin-ASCII ;", "äbç"), "abc");
        assert_eq!(run(":: NFD ; [:Mn:] > ; :: NFC ;", "föobär"), "foobar");
        assert_eq!(run(":: Any-Upper(Any-Lower) ;", "ab"), "AB");
    }

    #[test]
    fn passes_are_sequential() {
        assert_eq!(run("ö > ä; :: Null; ä > x;", "ö"), "x");
        assert_eq!(run("ö > ä; ä > x;", "ö"), "ä");
    }

    #[test]
    fn reverse_rules_are_ignored() {
        assert_eq!(run("a < b; b <> c; d → e;", "abd"), "ace");
        let program = Program::parse("a < b;").unwrap();
        assert_eq!(program.pass_count(), 0);
    }

    #[test]
    fn quantifiers_are_greedy() {
        assert_eq!(run("a+ > x;", "caaab"), "cxb");
        assert_eq!(run("ba* > x;", "b baa"), "x x");
        assert_eq!(run("ab? > x;", "a ab"), "x x");
    }

    #[test]
    fn reports_invalid_statements() {
        assert_eq!(parse_err("invalid rule").message, "missing `>` operator");
        assert_eq!(parse_err("invalid rule").statement, "invalid rule");
        assert!(parse_err(":: Foo ;").message.contains("unknown transform id \"Foo\""));
        assert!(parse_err(":: [a-z] ;").message.contains("global filters"));
        assert!(parse_err("$nope > x;").message.contains("undefined variable $nope"));
        assert!(parse_err("a > $1;").message.contains("undefined segment"));
        assert!(parse_err("a | b > c;").message.contains("cursor"));
        assert!(parse_err("a $ b > c;").message.contains("must end the pattern"));
        assert!(parse_err("(a > x;").message.contains("unterminated segment"));
    }
}
