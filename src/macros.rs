/// A `&'static Regex` compiled once on first use.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build [`SlugOptions`](crate::SlugOptions) from `name => value` pairs.
///
/// ```
/// let options = slugrule::slug_options! {
///     "validChars" => "A-Z",
///     "transforms" => ["Upper"],
/// }
/// .unwrap();
/// assert_eq!(options.valid_chars(), "A-Z");
/// ```
#[macro_export]
macro_rules! slug_options {
    ($($name:literal => $value:expr),* $(,)?) => {
        $crate::SlugOptions::from_pairs([$(($name, $crate::OptionValue::from($value))),*])
    };
}
