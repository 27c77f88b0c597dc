//! Named transforms of the built-in engine.
//!
//! Ids follow the `Source-Target` convention. Lookup is case-insensitive and
//! accepts a few short aliases (`NFC`, `Lower`, `Latn`).

use deunicode::deunicode_char;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NamedTransform {
    Null,
    Nfc,
    Nfd,
    Nfkc,
    Nfkd,
    Upper,
    Lower,
    TurkicUpper,
    TurkicLower,
    Latin,
    GreekLatin,
    LatinAscii,
    Remove,
}

/// Canonical ids in catalog order.
pub(crate) const CATALOG: &[(&str, NamedTransform)] = &[
    ("Any-Null", NamedTransform::Null),
    ("Any-NFC", NamedTransform::Nfc),
    ("Any-NFD", NamedTransform::Nfd),
    ("Any-NFKC", NamedTransform::Nfkc),
    ("Any-NFKD", NamedTransform::Nfkd),
    ("Any-Upper", NamedTransform::Upper),
    ("Any-Lower", NamedTransform::Lower),
    ("tr-Upper", NamedTransform::TurkicUpper),
    ("tr-Lower", NamedTransform::TurkicLower),
    ("az-Upper", NamedTransform::TurkicUpper),
    ("az-Lower", NamedTransform::TurkicLower),
    ("Any-Latin", NamedTransform::Latin),
    ("el-Latin", NamedTransform::GreekLatin),
    ("Latin-ASCII", NamedTransform::LatinAscii),
    ("Any-Remove", NamedTransform::Remove),
];

const ALIASES: &[(&str, NamedTransform)] = &[
    ("Null", NamedTransform::Null),
    ("NFC", NamedTransform::Nfc),
    ("NFD", NamedTransform::Nfd),
    ("NFKC", NamedTransform::Nfkc),
    ("NFKD", NamedTransform::Nfkd),
    ("Upper", NamedTransform::Upper),
    ("Lower", NamedTransform::Lower),
    ("Latin", NamedTransform::Latin),
    ("Latn", NamedTransform::Latin),
    ("Any-Latn", NamedTransform::Latin),
    ("el-Latn", NamedTransform::GreekLatin),
    ("Remove", NamedTransform::Remove),
];

impl NamedTransform {
    pub(crate) fn lookup(id: &str) -> Option<Self> {
        let id = id.trim();
        CATALOG
            .iter()
            .chain(ALIASES)
            .find(|(name, _)| name.eq_ignore_ascii_case(id))
            .map(|&(_, transform)| transform)
    }

    pub(crate) fn apply(self, text: &str) -> String {
        match self {
            NamedTransform::Null => text.to_string(),
            NamedTransform::Nfc => text.nfc().collect(),
            NamedTransform::Nfd => text.nfd().collect(),
            NamedTransform::Nfkc => text.nfkc().collect(),
            NamedTransform::Nfkd => text.nfkd().collect(),
            NamedTransform::Upper => text.to_uppercase(),
            NamedTransform::Lower => text.to_lowercase(),
            NamedTransform::TurkicUpper => turkic_upper(text),
            NamedTransform::TurkicLower => turkic_lower(text),
            NamedTransform::Latin => to_latin(text),
            NamedTransform::GreekLatin => greek_to_latin(text),
            NamedTransform::LatinAscii => latin_to_ascii(text),
            NamedTransform::Remove => String::new(),
        }
    }
}

fn turkic_upper(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'i' => out.push('İ'),
            _ => out.extend(c.to_uppercase()),
        }
    }
    out
}

fn turkic_lower(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            'I' if chars.peek() == Some(&'\u{307}') => {
                chars.next();
                out.push('i');
            }
            'I' => out.push('ı'),
            'İ' => out.push('i'),
            _ => out.extend(c.to_lowercase()),
        }
    }
    out
}

/// Spellings that differ from `deunicode`'s, looked up first.
///
/// Ukrainian letters follow the Cyrillic-Latin convention with the accents
/// already folded away.
const LATIN_OVERRIDES: &[(char, &str)] =
    &[('є', "e"), ('Є', "E"), ('ї', "i"), ('Ї', "I"), ('ґ', "g"), ('Ґ', "G")];

/// `ẞ` is `SS` whatever follows it.
const ASCII_OVERRIDES: &[(char, &str)] = &[('ẞ', "SS")];

/// Modern Greek letters, lowercase then uppercase. Diacritics are split off
/// beforehand and kept as combining marks.
const GREEK_LETTERS: &[(char, &str)] = &[
    ('α', "a"), ('β', "v"), ('γ', "g"), ('δ', "d"), ('ε', "e"), ('ζ', "z"), ('η', "i"), ('θ', "th"),
    ('ι', "i"), ('κ', "k"), ('λ', "l"), ('μ', "m"), ('ν', "n"), ('ξ', "x"), ('ο', "o"), ('π', "p"),
    ('ρ', "r"), ('σ', "s"), ('ς', "s"), ('τ', "t"), ('υ', "y"), ('φ', "f"), ('χ', "ch"), ('ψ', "ps"),
    ('ω', "o"),
    ('Α', "A"), ('Β', "V"), ('Γ', "G"), ('Δ', "D"), ('Ε', "E"), ('Ζ', "Z"), ('Η', "I"), ('Θ', "Th"),
    ('Ι', "I"), ('Κ', "K"), ('Λ', "L"), ('Μ', "M"), ('Ν', "N"), ('Ξ', "X"), ('Ο', "O"), ('Π', "P"),
    ('Ρ', "R"), ('Σ', "S"), ('Τ', "T"), ('Υ', "Y"), ('Φ', "F"), ('Χ', "Ch"), ('Ψ', "Ps"), ('Ω', "O"),
];

/// Vowel pairs spelled as a unit; the second letter is always `υ`.
const GREEK_DIGRAPHS: &[(char, &str)] = &[('ο', "ou"), ('Ο', "Ou"), ('α', "av"), ('Α', "Av"), ('ε', "ev"), ('Ε', "Ev")];

fn lookup(table: &[(char, &'static str)], c: char) -> Option<&'static str> {
    table.iter().find(|(from, _)| *from == c).map(|&(_, to)| to)
}

fn is_latin_or_common(c: char) -> bool {
    let mut buf = [0u8; 4];
    crate::regex!(r"^[\p{Latin}\p{Common}\p{Inherited}]$").is_match(c.encode_utf8(&mut buf))
}

fn is_han(c: char) -> bool {
    let mut buf = [0u8; 4];
    crate::regex!(r"^\p{Han}$").is_match(c.encode_utf8(&mut buf))
}

/// Characters of other scripts become their closest Latin spelling.
/// Han readings come out lowercase.
fn to_latin(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_latin_or_common(c) {
            out.push(c);
        } else if let Some(latin) = lookup(LATIN_OVERRIDES, c) {
            out.push_str(latin);
        } else {
            match deunicode_char(c) {
                Some(latin) if is_han(c) => out.push_str(&latin.to_lowercase()),
                Some(latin) => out.push_str(latin),
                None => out.push(c),
            }
        }
    }
    out
}

/// Greek to Latin by modern pronunciation: `Καλημέρα` becomes `Kaliméra`.
fn greek_to_latin(text: &str) -> String {
    let decomposed: Vec<char> = text.nfd().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < decomposed.len() {
        let c = decomposed[i];
        let next = decomposed.get(i + 1).copied();
        if let (Some(pair), Some('υ' | 'Υ')) = (lookup(GREEK_DIGRAPHS, c), next) {
            out.push_str(pair);
            i += 2;
            continue;
        }
        match lookup(GREEK_LETTERS, c) {
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
        i += 1;
    }
    out.nfc().collect()
}

/// Non-ASCII Latin and common characters become ASCII; other scripts pass through.
fn latin_to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() || !is_latin_or_common(c) {
            out.push(c);
        } else if let Some(ascii) = lookup(ASCII_OVERRIDES, c) {
            out.push_str(ascii);
        } else {
            match deunicode_char(c) {
                Some(ascii) => out.push_str(ascii),
                None => out.push(c),
            }
        }
    }
    out
}
