//! Error types for slug generation.
//!
//! Every failure is fatal for the call that produced it: the generator never
//! returns a partial slug. Errors are grouped by where they surface:
//!
//! - option validation (`UnknownOption`, `InvalidOptionValue`,
//!   `InvalidCharacterClass`, `InvalidLocale`, `EmptyTransform`)
//! - input validation (`InvalidEncoding`)
//! - script building (`UnresolvedTransform`)
//! - script compilation (`InvalidTransformRule`, `ScriptCompileFailure`)

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The main error type returned by [`SlugGenerator`](crate::SlugGenerator) and
/// [`SlugOptions`](crate::SlugOptions).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The input text is not well-formed UTF-8.
    #[error("text is invalid UTF-8 (first invalid byte at offset {offset})")]
    InvalidEncoding {
        /// Byte offset of the first invalid sequence.
        offset: usize,
    },

    /// An option name that is not part of the configuration surface.
    #[error("unknown option \"{0}\"")]
    UnknownOption(String),

    /// A known option received a value of the wrong shape (e.g. a list for `locale`).
    #[error("invalid value for option \"{option}\": expected {expected}")]
    InvalidOptionValue {
        /// Name of the option.
        option: &'static str,
        /// Description of the accepted shape.
        expected: &'static str,
    },

    /// A `validChars`/`ignoreChars` value that is not a usable character class body.
    #[error("invalid regular expression character class \"{0}\"")]
    InvalidCharacterClass(String),

    /// A locale tag that could not be parsed.
    #[error("invalid locale \"{0}\"")]
    InvalidLocale(String),

    /// An empty string in the transform list.
    #[error("transform must not be empty")]
    EmptyTransform,

    /// No candidate transform id is available and no compatibility patch applies.
    #[error("no transform rule found for \"{rule}\" with locale \"{locale}\"")]
    UnresolvedTransform {
        /// The requested transform name.
        rule: String,
        /// The locale used for resolution (may be empty).
        locale: String,
    },

    /// A single transform fragment fails to compile on its own.
    #[error("invalid transform rule \"{rule}\" with locale \"{locale}\": {reason}")]
    InvalidTransformRule {
        /// The transform as given in the options.
        rule: String,
        /// The locale used for resolution (may be empty).
        locale: String,
        /// The engine's compile error.
        reason: String,
    },

    /// The composed script fails to compile and no single transform is to blame.
    #[error("failed to build transform from rules: {reason}\n{script}")]
    ScriptCompileFailure {
        /// The complete rendered rule script.
        script: String,
        /// The engine's compile error.
        reason: String,
    },
}

/// Compile error reported by a [`TransliterationEngine`](crate::TransliterationEngine).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (in statement `{statement}`)")]
pub struct EngineError {
    /// What went wrong.
    pub message: String,
    /// The offending statement, trimmed.
    pub statement: String,
}

impl EngineError {
    pub(crate) fn new(message: impl Into<String>, statement: &str) -> Self {
        Self { message: message.into(), statement: statement.trim().to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rule_message_names_rule_and_locale() {
        let err = Error::InvalidTransformRule {
            rule: "invalid rule".to_string(),
            locale: "de_AT".to_string(),
            reason: "missing `>`".to_string(),
        };
        let msg = err.to_string();
        let rule_at = msg.find("\"invalid rule\"").unwrap();
        let locale_at = msg.find("\"de_AT\"").unwrap();
        assert!(rule_at < locale_at);
    }

    #[test]
    fn encoding_error_mentions_utf8() {
        let msg = Error::InvalidEncoding { offset: 0 }.to_string().to_lowercase();
        assert!(msg.contains("utf-8"));
    }

    #[test]
    fn engine_error_trims_statement() {
        let err = EngineError::new("unknown transform id \"Foo\"", "  :: Foo  ");
        assert_eq!(err.statement, ":: Foo");
        assert!(err.to_string().contains("`:: Foo`"));
    }
}
