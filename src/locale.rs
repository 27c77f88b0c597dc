//! Locale tag helpers.
//!
//! Tags are accepted with either `-` or `_` separators and canonicalized to
//! the underscore form used by transform ids (`de`, `de_AT`, `tr_Latn_AT`).
//! Only the structure is checked; whether a language actually has tailored
//! transforms is up to the engine catalog.

/// A parsed locale tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleTag {
    pub language: String,
    pub script: Option<String>,
    pub region: Option<String>,
    pub variants: Vec<String>,
}

impl LocaleTag {
    /// Parse `tag`, returning `None` if any subtag is malformed.
    pub fn parse(tag: &str) -> Option<Self> {
        let mut parts = tag.split(['-', '_']);

        let language = parts.next()?;
        if !is_language(language) {
            return None;
        }

        let mut parsed = LocaleTag {
            language: language.to_ascii_lowercase(),
            script: None,
            region: None,
            variants: Vec::new(),
        };

        for part in parts {
            if parsed.script.is_none() && parsed.region.is_none() && parsed.variants.is_empty() && is_script(part) {
                parsed.script = Some(titlecase(part));
            } else if parsed.region.is_none() && parsed.variants.is_empty() && is_region(part) {
                parsed.region = Some(part.to_ascii_uppercase());
            } else if is_variant(part) {
                parsed.variants.push(part.to_ascii_uppercase());
            } else {
                return None;
            }
        }

        Some(parsed)
    }

    /// Render in canonical underscore form.
    pub fn canonical(&self) -> String {
        let mut out = self.language.clone();
        for part in self.script.iter().chain(self.region.iter()).chain(self.variants.iter()) {
            out.push('_');
            out.push_str(part);
        }
        out
    }
}

/// Whether `tag` parses as a locale.
pub fn is_valid(tag: &str) -> bool {
    LocaleTag::parse(tag).is_some()
}

/// Canonical form of `tag`, or `None` if it is malformed.
pub fn canonicalize(tag: &str) -> Option<String> {
    LocaleTag::parse(tag).map(|t| t.canonical())
}

/// The primary language subtag of `tag` (`"de"` for `"de_AT"`).
///
/// Malformed tags fall back to everything before the first separator.
pub fn primary_language(tag: &str) -> String {
    match LocaleTag::parse(tag) {
        Some(t) => t.language,
        None => tag.split(['-', '_']).next().unwrap_or_default().to_ascii_lowercase(),
    }
}

fn is_language(s: &str) -> bool {
    matches!(s.len(), 2..=3 | 5..=8) && s.bytes().all(|b| b.is_ascii_alphabetic())
}

fn is_script(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_alphabetic())
}

fn is_region(s: &str) -> bool {
    (s.len() == 2 && s.bytes().all(|b| b.is_ascii_alphabetic()))
        || (s.len() == 3 && s.bytes().all(|b| b.is_ascii_digit()))
}

fn is_variant(s: &str) -> bool {
    let alnum = s.bytes().all(|b| b.is_ascii_alphanumeric());
    alnum && ((5..=8).contains(&s.len()) || (s.len() == 4 && s.as_bytes()[0].is_ascii_digit()))
}

fn titlecase(s: &str) -> String {
    let lower = s.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_separators_and_case() {
        assert_eq!(canonicalize("de").as_deref(), Some("de"));
        assert_eq!(canonicalize("de-at").as_deref(), Some("de_AT"));
        assert_eq!(canonicalize("EN_us").as_deref(), Some("en_US"));
        assert_eq!(canonicalize("tr-latn-at").as_deref(), Some("tr_Latn_AT"));
        assert_eq!(canonicalize("es_419").as_deref(), Some("es_419"));
        assert_eq!(canonicalize("de_DE_1901").as_deref(), Some("de_DE_1901"));
    }

    #[test]
    fn rejects_malformed_tags() {
        for tag in ["", "x", "-de", "de--AT", "de_A", "toolonglanguage", "de AT", "d3"] {
            assert!(!is_valid(tag), "{tag:?} should be invalid");
        }
    }

    #[test]
    fn primary_language_strips_everything_after_the_language() {
        assert_eq!(primary_language("de_AT"), "de");
        assert_eq!(primary_language("tr_Latn_AT"), "tr");
        assert_eq!(primary_language("EL"), "el");
    }
}
