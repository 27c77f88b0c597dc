use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Every Unicode scalar value from U+0001 up, in order.
static ALL_SCALARS: Lazy<String> = Lazy::new(|| (1u32..=0x10FFFF).filter_map(char::from_u32).collect());

static SHARED: Lazy<Arc<UnicodeSetCache>> = Lazy::new(|| Arc::new(UnicodeSetCache::new()));

/// Hit and miss counters of a [`UnicodeSetCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Memo of compiled set literals keyed by `(class body, case insensitive)`.
///
/// Entries are pure functions of their key and are never evicted.
#[derive(Debug, Default)]
pub struct UnicodeSetCache {
    entries: RwLock<HashMap<(String, bool), Arc<str>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl UnicodeSetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by generators that don't bring their own.
    pub fn shared() -> Arc<UnicodeSetCache> {
        Arc::clone(&SHARED)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats { hits: self.hits.load(Ordering::Relaxed), misses: self.misses.load(Ordering::Relaxed) }
    }

    fn get(&self, key: &(String, bool)) -> Option<Arc<str>> {
        let entries = self.entries.read().ok()?;
        entries.get(key).cloned()
    }

    fn insert(&self, key: (String, bool), value: Arc<str>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.entry(key).or_insert(value);
        }
    }
}

/// Turns regex character-class bodies into explicit set literals.
///
/// The literal lists every matching code point in ascending order, with ASCII
/// punctuation, symbols and whitespace backslash-escaped, ready to be placed
/// inside `[...]` in a rule script.
#[derive(Debug, Clone)]
pub struct UnicodeSetCompiler {
    cache: Arc<UnicodeSetCache>,
}

impl Default for UnicodeSetCompiler {
    fn default() -> Self {
        Self::new(UnicodeSetCache::shared())
    }
}

impl UnicodeSetCompiler {
    pub fn new(cache: Arc<UnicodeSetCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &UnicodeSetCache {
        &self.cache
    }

    /// Compile `body` case-sensitively.
    pub fn compile(&self, body: &str) -> Result<Arc<str>> {
        self.compile_with(body, false)
    }

    /// Compile `body` with case-insensitive matching.
    pub fn compile_case_insensitive(&self, body: &str) -> Result<Arc<str>> {
        self.compile_with(body, true)
    }

    fn compile_with(&self, body: &str, case_insensitive: bool) -> Result<Arc<str>> {
        let key = (body.to_string(), case_insensitive);
        if let Some(hit) = self.cache.get(&key) {
            self.cache.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit);
        }
        self.cache.misses.fetch_add(1, Ordering::Relaxed);

        let started = Instant::now();
        let literal: Arc<str> = sweep(body, case_insensitive)?.into();
        tracing::debug!(
            class = body,
            case_insensitive,
            literal_len = literal.len(),
            elapsed = ?started.elapsed(),
            "compiled unicode set"
        );

        self.cache.insert(key, Arc::clone(&literal));
        Ok(literal)
    }
}

/// Test every scalar value against `[body]` and quote the members.
fn sweep(body: &str, case_insensitive: bool) -> Result<String> {
    let class =
        Regex::new(&class_pattern(body, case_insensitive)).map_err(|_| Error::InvalidCharacterClass(body.to_string()))?;

    let mut literal = String::new();
    for m in class.find_iter(&ALL_SCALARS) {
        let mut chars = m.as_str().chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(Error::InvalidCharacterClass(body.to_string()));
        };
        push_quoted(&mut literal, c);
    }
    Ok(literal)
}

/// The regex matching one member of `[body]`.
///
/// Case-insensitive matching only folds the literal part of the body.
/// Property escapes keep their exact membership, so `\p{Lu}` stays the
/// uppercase letters instead of growing into every cased letter.
fn class_pattern(body: &str, case_insensitive: bool) -> String {
    if !case_insensitive {
        return format!("[{body}]");
    }
    let (properties, rest) = split_properties(body);
    match (properties.is_empty(), rest.is_empty()) {
        (true, _) => format!("(?i)[{body}]"),
        (false, true) => format!("[{properties}]"),
        (false, false) => {
            let caret = if rest.starts_with('^') { "\\" } else { "" };
            format!("[{properties}]|(?i:[{caret}{rest}])")
        }
    }
}

/// Split `body` into its `\p`/`\P` escapes and everything else.
///
/// Bodies with nested classes are left whole.
fn split_properties(body: &str) -> (String, String) {
    if body.contains('[') {
        return (String::new(), body.to_string());
    }
    let mut properties = String::new();
    let mut rest = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            rest.push(c);
            continue;
        }
        match chars.next() {
            Some(kind @ ('p' | 'P')) => {
                properties.push('\\');
                properties.push(kind);
                if chars.peek() == Some(&'{') {
                    for c in chars.by_ref() {
                        properties.push(c);
                        if c == '}' {
                            break;
                        }
                    }
                } else if let Some(name) = chars.next() {
                    properties.push(name);
                }
            }
            Some(other) => {
                rest.push('\\');
                rest.push(other);
            }
            None => rest.push('\\'),
        }
    }
    (properties, rest)
}

/// Append `c`, escaping it if it is ASCII but not alphanumeric.
pub(crate) fn push_quoted(out: &mut String, c: char) {
    if c.is_ascii() && !c.is_ascii_alphanumeric() {
        out.push('\\');
    }
    out.push(c);
}

/// Quote every character of `text` for use in a rule script.
pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        push_quoted(&mut out, c);
    }
    out
}
