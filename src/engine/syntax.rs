//! Character-level reading shared by the set and rule parsers.
//!
//! Rule scripts are parsed one statement at a time. A `Cursor` walks the
//! characters of a statement and knows how to read the lexical forms that can
//! appear anywhere: backslash escapes and single-quoted text.
//!
//! Only ASCII whitespace is insignificant. Other Unicode spaces are literal
//! characters, so compiled set literals can contain them unescaped.

use crate::error::EngineError;

/// Result of reading a backslash escape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Escaped {
    Char(char),
    /// `\p{Name}` or `\P{Name}`.
    Property { name: String, negated: bool },
}

#[derive(Debug)]
pub(crate) struct Cursor<'a> {
    chars: &'a [char],
    pos: usize,
    statement: &'a str,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(chars: &'a [char], statement: &'a str) -> Self {
        Cursor { chars, pos: 0, statement }
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Next character that is not ASCII whitespace, starting `offset` chars ahead.
    pub(crate) fn peek_significant(&self, offset: usize) -> Option<(usize, char)> {
        self.chars[(self.pos + offset).min(self.chars.len())..]
            .iter()
            .position(|c| !c.is_ascii_whitespace())
            .map(|i| (offset + i, self.chars[self.pos + offset + i]))
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    pub(crate) fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub(crate) fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Everything not consumed yet.
    pub(crate) fn rest(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> EngineError {
        EngineError::new(message, self.statement)
    }

    /// Read an escape; the cursor must be on the backslash.
    pub(crate) fn escape(&mut self) -> Result<Escaped, EngineError> {
        debug_assert_eq!(self.peek(), Some('\\'));
        self.pos += 1;
        let c = self.bump().ok_or_else(|| self.error("dangling `\\` at end of statement"))?;
        match c {
            'u' => self.hex_char(4).map(Escaped::Char),
            'U' => self.hex_char(8).map(Escaped::Char),
            'x' => {
                if self.eat('{') {
                    let digits = self.take_until('}')?;
                    char_from_hex(&digits)
                        .map(Escaped::Char)
                        .ok_or_else(|| self.error(format!("invalid escape \\x{{{digits}}}")))
                } else {
                    self.hex_char(2).map(Escaped::Char)
                }
            }
            'p' | 'P' => {
                let name = if self.eat('{') {
                    self.take_until('}')?
                } else {
                    self.bump().map(String::from).ok_or_else(|| self.error("missing property name"))?
                };
                Ok(Escaped::Property { name, negated: c == 'P' })
            }
            't' => Ok(Escaped::Char('\t')),
            'n' => Ok(Escaped::Char('\n')),
            'r' => Ok(Escaped::Char('\r')),
            other => Ok(Escaped::Char(other)),
        }
    }

    /// Read quoted text; the cursor must be on the opening quote.
    /// `''` is an apostrophe, both inside quotes and on its own.
    pub(crate) fn quoted(&mut self) -> Result<String, EngineError> {
        debug_assert_eq!(self.peek(), Some('\''));
        self.pos += 1;
        if self.eat('\'') {
            return Ok("'".to_string());
        }
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated quote")),
                Some('\'') if self.eat('\'') => out.push('\''),
                Some('\'') => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn hex_char(&mut self, len: usize) -> Result<char, EngineError> {
        let end = self.pos + len;
        let digits: String = self.chars.get(self.pos..end).map(|s| s.iter().collect()).unwrap_or_default();
        match char_from_hex(&digits).filter(|_| digits.len() == len) {
            Some(c) => {
                self.pos = end;
                Ok(c)
            }
            None => Err(self.error(format!("invalid escape, expected {len} hex digits"))),
        }
    }

    fn take_until(&mut self, close: char) -> Result<String, EngineError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(format!("missing `{close}`"))),
                Some(c) if c == close => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }
}

fn char_from_hex(digits: &str) -> Option<char> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(chars: &[char]) -> Cursor<'_> {
        Cursor::new(chars, "test")
    }

    #[test]
    fn reads_unicode_escapes() {
        let chars: Vec<char> = r"\u0308\U0001F4A9\x41\x{1F600}\-".chars().collect();
        let mut cur = cursor(&chars);
        assert_eq!(cur.escape().unwrap(), Escaped::Char('\u{308}'));
        assert_eq!(cur.escape().unwrap(), Escaped::Char('💩'));
        assert_eq!(cur.escape().unwrap(), Escaped::Char('A'));
        assert_eq!(cur.escape().unwrap(), Escaped::Char('😀'));
        assert_eq!(cur.escape().unwrap(), Escaped::Char('-'));
        assert!(cur.is_eof());
    }

    #[test]
    fn reads_property_escapes() {
        let chars: Vec<char> = r"\p{Ll}\PL".chars().collect();
        let mut cur = cursor(&chars);
        assert_eq!(cur.escape().unwrap(), Escaped::Property { name: "Ll".to_string(), negated: false });
        assert_eq!(cur.escape().unwrap(), Escaped::Property { name: "L".to_string(), negated: true });
    }

    #[test]
    fn rejects_short_hex_escapes() {
        let chars: Vec<char> = r"\u30".chars().collect();
        assert!(cursor(&chars).escape().is_err());
        let chars: Vec<char> = r"\".chars().collect();
        assert!(cursor(&chars).escape().is_err());
    }

    #[test]
    fn reads_quoted_text() {
        let chars: Vec<char> = "'it''s'x".chars().collect();
        let mut cur = cursor(&chars);
        assert_eq!(cur.quoted().unwrap(), "it's");
        assert_eq!(cur.peek(), Some('x'));

        let chars: Vec<char> = "''".chars().collect();
        let mut cur = cursor(&chars);
        assert_eq!(cur.quoted().unwrap(), "'");
        assert!(cur.is_eof());

        let chars: Vec<char> = "'open".chars().collect();
        assert!(cursor(&chars).quoted().is_err());
    }

    #[test]
    fn peek_significant_skips_ascii_whitespace_only() {
        let chars: Vec<char> = "a  \u{3000}b".chars().collect();
        let cur = cursor(&chars);
        assert_eq!(cur.peek_significant(1), Some((3, '\u{3000}')));
        assert_eq!(cur.peek_significant(5), None);
    }
}
