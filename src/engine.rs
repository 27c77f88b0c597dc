//! Transliteration engine capability and the built-in implementation.
//!
//! The slug pipeline never touches text directly. It renders a rule script
//! and hands it to a [`TransliterationEngine`], which owns normalization, the
//! catalog of named transforms, and rule compilation and execution.
//!
//! ## How the parts work together
//!
//! ```text
//! rule script ── split_statements ──┐                    (rules.rs)
//!                                   │  $vars substituted
//!                                   v
//!                   statements ── `:: [filter] Id`  ──> NamedTransform  (named.rs)
//!                              └─ `a { b } c > d`   ──> Rule
//!                                     │                 sets: set.rs
//!                                     │                 escapes/quotes: syntax.rs
//!                                     v
//!                              Program (ordered passes)
//!                                     │
//!                          apply ─────┴──> String
//! ```
//!
//! ## Extension points
//!
//! - Another engine (for example bindings to a full Unicode transform
//!   library) only has to implement [`TransliterationEngine`]. The generator
//!   is generic over it.
//! - `create_transform` returns `Option` so the resolver can try candidate ids
//!   without any engine-wide error mode.

#[path = "engine/builtin.rs"]
mod builtin;
#[path = "engine/named.rs"]
mod named;
#[path = "engine/rules.rs"]
mod rules;
#[path = "engine/set.rs"]
mod set;
#[path = "engine/syntax.rs"]
mod syntax;

use crate::error::EngineError;
use crate::locale;

#[allow(unused_imports)]
pub use builtin::{BuiltinEngine, CompiledTransform};

/// What the slug generator needs from a transliteration engine.
pub trait TransliterationEngine: Send + Sync {
    /// Executable transform handle.
    type Transform;

    /// Canonical composition of `text`.
    fn normalize_nfc(&self, text: &str) -> String;

    /// Ids of the named transforms in the engine's catalog.
    fn available_ids(&self) -> Vec<String>;

    /// Build a transform from an id, or `None` if the engine can't.
    fn create_transform(&self, id: &str) -> Option<Self::Transform>;

    /// Compile a rule script.
    fn compile_rules(&self, script: &str) -> Result<Self::Transform, EngineError>;

    fn apply(&self, transform: &Self::Transform, text: &str) -> String;

    /// Primary language subtag of a locale tag.
    fn primary_language(&self, tag: &str) -> String {
        locale::primary_language(tag)
    }

    fn canonicalize_locale(&self, tag: &str) -> Option<String> {
        locale::canonicalize(tag)
    }

    fn is_valid_locale(&self, tag: &str) -> bool {
        locale::is_valid(tag)
    }
}
