//! Slug generator options.
//!
//! `SlugOptions` is a validated value object. Setters check their input
//! eagerly, so a `SlugOptions` that exists is always usable by the script
//! builder. Options can also be set by name through [`OptionKey`], which is
//! the only place option names are mapped to fields.
//!
//! Options remember which of them were set explicitly. [`SlugOptions::merge`]
//! only copies those, so a partial `SlugOptions` works as a per-call override.

use crate::error::{Error, Result};
use crate::locale;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_DELIMITER: &str = "-";
pub const DEFAULT_VALID_CHARS: &str = "a-z0-9";
pub const DEFAULT_IGNORE_CHARS: &str = r"\p{Mn}\p{Lm}";

/// Case transforms run again after the script and ASCII transforms because
/// those can introduce characters whose case was not normalized yet.
pub const DEFAULT_TRANSFORMS: &[&str] = &["Upper", "Lower", "Latn", "ASCII", "Upper", "Lower"];

/// Names accepted by [`SlugOptions::set`] and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionKey {
    Delimiter,
    ValidChars,
    IgnoreChars,
    Locale,
    Transforms,
    PreTransforms,
    PostTransforms,
}

impl OptionKey {
    pub const ALL: [OptionKey; 7] = [
        OptionKey::Delimiter,
        OptionKey::ValidChars,
        OptionKey::IgnoreChars,
        OptionKey::Locale,
        OptionKey::Transforms,
        OptionKey::PreTransforms,
        OptionKey::PostTransforms,
    ];

    /// The option name as used in option maps and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            OptionKey::Delimiter => "delimiter",
            OptionKey::ValidChars => "validChars",
            OptionKey::IgnoreChars => "ignoreChars",
            OptionKey::Locale => "locale",
            OptionKey::Transforms => "transforms",
            OptionKey::PreTransforms => "preTransforms",
            OptionKey::PostTransforms => "postTransforms",
        }
    }
}

impl FromStr for OptionKey {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        OptionKey::ALL.into_iter().find(|key| key.name() == name).ok_or_else(|| Error::UnknownOption(name.to_string()))
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A raw option value: a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Text(String),
    List(Vec<String>),
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::List(value)
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(value: Vec<&str>) -> Self {
        OptionValue::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for OptionValue {
    fn from(value: &[&str]) -> Self {
        OptionValue::List(value.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for OptionValue {
    fn from(value: [&str; N]) -> Self {
        OptionValue::List(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Validated slug generator options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugOptions {
    delimiter: String,
    valid_chars: String,
    ignore_chars: String,
    locale: String,
    transforms: Vec<String>,
    /// Options that were set explicitly (pre/post transforms count as `Transforms`).
    explicit: BTreeSet<OptionKey>,
}

impl Default for SlugOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            valid_chars: DEFAULT_VALID_CHARS.to_string(),
            ignore_chars: DEFAULT_IGNORE_CHARS.to_string(),
            locale: String::new(),
            transforms: DEFAULT_TRANSFORMS.iter().map(|s| s.to_string()).collect(),
            explicit: BTreeSet::new(),
        }
    }
}

impl SlugOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from `(name, value)` pairs applied over the defaults, in order.
    ///
    /// ```
    /// use slugrule::{OptionValue, SlugOptions};
    ///
    /// let options = SlugOptions::from_pairs([("locale", OptionValue::from("de-at"))]).unwrap();
    /// assert_eq!(options.locale(), "de_AT");
    /// ```
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, OptionValue)>,
    {
        Self::default().merge_pairs(pairs)
    }

    /// Return a copy with every `(name, value)` pair applied in order.
    pub fn merge_pairs<'a, I>(&self, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, OptionValue)>,
    {
        let mut merged = self.clone();
        for (name, value) in pairs {
            merged.set(name.parse()?, value)?;
        }
        Ok(merged)
    }

    /// Return a copy with the explicitly set options of `overrides` applied.
    pub fn merge(&self, overrides: &SlugOptions) -> Self {
        let mut merged = self.clone();
        for &key in &overrides.explicit {
            match key {
                OptionKey::Delimiter => merged.delimiter = overrides.delimiter.clone(),
                OptionKey::ValidChars => merged.valid_chars = overrides.valid_chars.clone(),
                OptionKey::IgnoreChars => merged.ignore_chars = overrides.ignore_chars.clone(),
                OptionKey::Locale => merged.locale = overrides.locale.clone(),
                OptionKey::Transforms | OptionKey::PreTransforms | OptionKey::PostTransforms => {
                    merged.transforms = overrides.transforms.clone()
                }
            }
            merged.explicit.insert(key);
        }
        merged
    }

    /// The explicitly set options with their current values.
    pub fn explicit(&self) -> impl Iterator<Item = (OptionKey, OptionValue)> + '_ {
        self.explicit.iter().map(move |&key| {
            let value = match key {
                OptionKey::Delimiter => OptionValue::from(self.delimiter.as_str()),
                OptionKey::ValidChars => OptionValue::from(self.valid_chars.as_str()),
                OptionKey::IgnoreChars => OptionValue::from(self.ignore_chars.as_str()),
                OptionKey::Locale => OptionValue::from(self.locale.as_str()),
                OptionKey::Transforms | OptionKey::PreTransforms | OptionKey::PostTransforms => {
                    OptionValue::List(self.transforms.clone())
                }
            };
            (key, value)
        })
    }

    /// Set an option by key.
    pub fn set(&mut self, key: OptionKey, value: OptionValue) -> Result<&mut Self> {
        match (key, value) {
            (OptionKey::Delimiter, OptionValue::Text(v)) => Ok(self.set_delimiter(v)),
            (OptionKey::ValidChars, OptionValue::Text(v)) => self.set_valid_chars(v),
            (OptionKey::IgnoreChars, OptionValue::Text(v)) => self.set_ignore_chars(v),
            (OptionKey::Locale, OptionValue::Text(v)) => self.set_locale(&v),
            (OptionKey::Transforms, OptionValue::List(v)) => self.set_transforms(v),
            (OptionKey::PreTransforms, OptionValue::List(v)) => self.set_pre_transforms(v),
            (OptionKey::PostTransforms, OptionValue::List(v)) => self.set_post_transforms(v),
            (OptionKey::Transforms | OptionKey::PreTransforms | OptionKey::PostTransforms, OptionValue::Text(_)) => {
                Err(Error::InvalidOptionValue { option: key.name(), expected: "a list of strings" })
            }
            (_, OptionValue::List(_)) => Err(Error::InvalidOptionValue { option: key.name(), expected: "a string" }),
        }
    }

    /// Delimiter placed between runs of valid characters.
    pub fn set_delimiter(&mut self, delimiter: impl Into<String>) -> &mut Self {
        self.delimiter = delimiter.into();
        self.explicit.insert(OptionKey::Delimiter);
        self
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Allowed characters as a regular expression character class body,
    /// e.g. `abc`, `a-z0-9` or `\p{Ll}\-_`.
    pub fn set_valid_chars(&mut self, valid: impl Into<String>) -> Result<&mut Self> {
        let valid = valid.into();
        assert_character_class(&valid)?;
        self.valid_chars = valid;
        self.explicit.insert(OptionKey::ValidChars);
        Ok(self)
    }

    pub fn valid_chars(&self) -> &str {
        &self.valid_chars
    }

    /// Characters that are removed before and after the transforms,
    /// as a regular expression character class body.
    pub fn set_ignore_chars(&mut self, ignore: impl Into<String>) -> Result<&mut Self> {
        let ignore = ignore.into();
        assert_character_class(&ignore)?;
        self.ignore_chars = ignore;
        self.explicit.insert(OptionKey::IgnoreChars);
        Ok(self)
    }

    pub fn ignore_chars(&self) -> &str {
        &self.ignore_chars
    }

    /// Locale used to pick tailored transforms, e.g. `de` or `en_US`.
    /// The empty string clears it.
    pub fn set_locale(&mut self, tag: &str) -> Result<&mut Self> {
        self.locale = if tag.is_empty() {
            String::new()
        } else {
            locale::canonicalize(tag).ok_or_else(|| Error::InvalidLocale(tag.to_string()))?
        };
        self.explicit.insert(OptionKey::Locale);
        Ok(self)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Add a transform name (`Lower`, `ASCII`) or inline rules (`a > b; c > d;`),
    /// before the existing transforms when `top` is set, after them otherwise.
    pub fn add_transform(&mut self, transform: impl Into<String>, top: bool) -> Result<&mut Self> {
        let transform = transform.into();
        if transform.is_empty() {
            return Err(Error::EmptyTransform);
        }
        if top {
            self.transforms.insert(0, transform);
        } else {
            self.transforms.push(transform);
        }
        self.explicit.insert(OptionKey::Transforms);
        Ok(self)
    }

    /// Replace the transform list.
    pub fn set_transforms<I, S>(&mut self, transforms: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let transforms = collect_transforms(transforms)?;
        self.transforms = transforms;
        self.explicit.insert(OptionKey::Transforms);
        Ok(self)
    }

    /// Add transforms before the existing ones.
    pub fn set_pre_transforms<I, S>(&mut self, transforms: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut transforms = collect_transforms(transforms)?;
        transforms.append(&mut self.transforms);
        self.transforms = transforms;
        self.explicit.insert(OptionKey::Transforms);
        Ok(self)
    }

    /// Add transforms after the existing ones.
    pub fn set_post_transforms<I, S>(&mut self, transforms: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let transforms = collect_transforms(transforms)?;
        self.transforms.extend(transforms);
        self.explicit.insert(OptionKey::Transforms);
        Ok(self)
    }

    pub fn transforms(&self) -> &[String] {
        &self.transforms
    }

    // Builder-style variants of the setters.

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.set_delimiter(delimiter);
        self
    }

    pub fn with_valid_chars(mut self, valid: impl Into<String>) -> Result<Self> {
        self.set_valid_chars(valid)?;
        Ok(self)
    }

    pub fn with_ignore_chars(mut self, ignore: impl Into<String>) -> Result<Self> {
        self.set_ignore_chars(ignore)?;
        Ok(self)
    }

    pub fn with_locale(mut self, tag: &str) -> Result<Self> {
        self.set_locale(tag)?;
        Ok(self)
    }

    pub fn with_transforms<I, S>(mut self, transforms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_transforms(transforms)?;
        Ok(self)
    }

    pub fn with_pre_transforms<I, S>(mut self, transforms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_pre_transforms(transforms)?;
        Ok(self)
    }

    pub fn with_post_transforms<I, S>(mut self, transforms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_post_transforms(transforms)?;
        Ok(self)
    }
}

fn collect_transforms<I, S>(transforms: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let transforms: Vec<String> = transforms.into_iter().map(Into::into).collect();
    if transforms.iter().any(String::is_empty) {
        return Err(Error::EmptyTransform);
    }
    Ok(transforms)
}

/// A class body must work inside a single-character match, both case
/// sensitive and insensitive, and must not negate itself.
fn assert_character_class(chars: &str) -> Result<()> {
    if chars.is_empty() {
        return Ok(());
    }
    let invalid = || Error::InvalidCharacterClass(chars.to_string());
    if chars.starts_with('^') {
        return Err(invalid());
    }
    Regex::new(&format!("^[{chars}]?$")).map_err(|_| invalid())?;
    Regex::new(&format!("(?i)^[{chars}]?$")).map_err(|_| invalid())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = SlugOptions::default();
        assert_eq!(options.delimiter(), "-");
        assert_eq!(options.valid_chars(), "a-z0-9");
        assert_eq!(options.ignore_chars(), r"\p{Mn}\p{Lm}");
        assert_eq!(options.locale(), "");
        assert_eq!(options.transforms(), ["Upper", "Lower", "Latn", "ASCII", "Upper", "Lower"]);
        assert_eq!(options.explicit().count(), 0);
    }

    #[test]
    fn unknown_option_names_the_option() {
        let err = SlugOptions::from_pairs([("foo", OptionValue::from("bar"))]).unwrap_err();
        assert_eq!(err, Error::UnknownOption("foo".to_string()));
        assert!(err.to_string().contains("foo"));
    }

    #[test]
    fn option_names_round_trip() {
        for key in OptionKey::ALL {
            assert_eq!(key.name().parse::<OptionKey>().unwrap(), key);
        }
        assert!("ValidChars".parse::<OptionKey>().is_err());
    }

    #[test]
    fn rejects_invalid_character_classes() {
        let mut options = SlugOptions::default();
        for class in ["^a-z", "z-a", r"\p{NotAProperty}", "a-z[", r"a\"] {
            assert_eq!(
                options.set_valid_chars(class).unwrap_err(),
                Error::InvalidCharacterClass(class.to_string()),
                "{class}"
            );
            assert!(options.set_ignore_chars(class).is_err(), "{class}");
        }
        assert_eq!(options.valid_chars(), "a-z0-9");
    }

    #[test]
    fn accepts_unicode_classes() {
        let mut options = SlugOptions::default();
        for class in ["", "a-z", r"\p{Ll}", r"\p{Latin}", "äöü", r"b\d", r"\-_", "’'"] {
            options.set_valid_chars(class).unwrap();
            assert_eq!(options.valid_chars(), class);
        }
    }

    #[test]
    fn canonicalizes_locale() {
        let mut options = SlugOptions::default();
        options.set_locale("de-at").unwrap();
        assert_eq!(options.locale(), "de_AT");
        options.set_locale("").unwrap();
        assert_eq!(options.locale(), "");
        assert_eq!(options.set_locale("not a locale").unwrap_err(), Error::InvalidLocale("not a locale".to_string()));
    }

    #[test]
    fn transforms_reject_empty_entries() {
        let mut options = SlugOptions::default();
        assert_eq!(options.set_transforms(["Lower", ""]).unwrap_err(), Error::EmptyTransform);
        assert_eq!(options.add_transform("", true).unwrap_err(), Error::EmptyTransform);
        assert_eq!(options.transforms().len(), DEFAULT_TRANSFORMS.len());
    }

    #[test]
    fn pre_and_post_transforms_extend_the_list() {
        let mut options = SlugOptions::default();
        options.set_transforms(["B"]).unwrap();
        options.set_pre_transforms(["A"]).unwrap();
        options.set_post_transforms(["C", "D"]).unwrap();
        options.add_transform("top", true).unwrap();
        options.add_transform("bottom", false).unwrap();
        assert_eq!(options.transforms(), ["top", "A", "B", "C", "D", "bottom"]);
    }

    #[test]
    fn set_rejects_mismatched_value_shapes() {
        let mut options = SlugOptions::default();
        assert!(matches!(
            options.set(OptionKey::Transforms, "Lower".into()),
            Err(Error::InvalidOptionValue { option: "transforms", .. })
        ));
        assert!(matches!(
            options.set(OptionKey::Locale, vec!["de"].into()),
            Err(Error::InvalidOptionValue { option: "locale", .. })
        ));
    }

    #[test]
    fn merge_applies_only_explicit_options() {
        let mut base = SlugOptions::default();
        base.set_delimiter("_");
        base.set_locale("de").unwrap();

        let mut overrides = SlugOptions::default();
        overrides.set_valid_chars("a-z").unwrap();

        let merged = base.merge(&overrides);
        assert_eq!(merged.delimiter(), "_");
        assert_eq!(merged.locale(), "de");
        assert_eq!(merged.valid_chars(), "a-z");

        let keys: Vec<OptionKey> = merged.explicit().map(|(key, _)| key).collect();
        assert_eq!(keys, [OptionKey::Delimiter, OptionKey::ValidChars, OptionKey::Locale]);
    }

    #[test]
    fn builder_methods_mark_options_explicit() {
        let options = SlugOptions::new().with_delimiter("_").with_locale("tr").unwrap().with_valid_chars("A-Z").unwrap();
        assert_eq!(options.delimiter(), "_");
        assert_eq!(options.locale(), "tr");
        assert_eq!(options.valid_chars(), "A-Z");
        assert_eq!(options.explicit().count(), 3);
        assert!(SlugOptions::new().with_ignore_chars("z-a").is_err());
    }

    #[test]
    fn merge_pairs_applies_pre_transforms_to_base_list() {
        let mut base = SlugOptions::default();
        base.set_transforms(["Lower"]).unwrap();
        let merged = base.merge_pairs([("preTransforms", OptionValue::from(["x > y"]))]).unwrap();
        assert_eq!(merged.transforms(), ["x > y", "Lower"]);
        assert_eq!(base.transforms(), ["Lower"]);
    }
}
