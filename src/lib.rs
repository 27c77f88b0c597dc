//! Rule-compiling slug generator.
//!
//! Text is turned into a slug by a single transliteration script composed
//! from the options: normalize, drop ignored characters, run the requested
//! transforms on everything that isn't already valid, drop ignored characters
//! again, and collapse the rest into delimiters.
//!
//! ```
//! use slugrule::{SlugGenerator, SlugOptions};
//!
//! let generator = SlugGenerator::new();
//! let german = SlugOptions::new().with_locale("de").unwrap();
//! assert_eq!(generator.generate("Öl & Äpfel", &german).unwrap(), "oel-aepfel");
//! ```

extern crate self as slugrule;

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
pub mod locale;
mod metrics;
mod options;
mod script;


pub use api::{GenerateDetails, GenerateResultVerbose, SlugGenerator, Slugify, generate, generate_with};
pub use engine::{BuiltinEngine, CompiledTransform, TransliterationEngine};
pub use error::{EngineError, Error, Result};
pub use metrics::{PhaseTimings, StageCounts};
pub use options::{
    DEFAULT_DELIMITER, DEFAULT_IGNORE_CHARS, DEFAULT_TRANSFORMS, DEFAULT_VALID_CHARS, OptionKey, OptionValue,
    SlugOptions,
};
pub use script::{
    CacheStats, Fragment, PatchStep, RuleScript, RuleScriptBuilder, Stages, TransformIdResolver, UnicodeSetCache,
    UnicodeSetCompiler, patch as compatibility_patch,
};
