use super::TransliterationEngine;
use super::named::{CATALOG, NamedTransform};
use super::rules::Program;
use crate::error::EngineError;
use unicode_normalization::UnicodeNormalization;

/// The transliteration engine that ships with the crate.
///
/// It interprets the rule-script subset produced by the script builder plus
/// ordinary inline conversion rules, and provides the named transforms listed
/// in [`available_ids`](TransliterationEngine::available_ids). There is no
/// `de-ASCII` in its catalog; German umlauts are handled by the compatibility
/// rules the script builder substitutes for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinEngine;

impl BuiltinEngine {
    pub fn new() -> Self {
        BuiltinEngine
    }
}

/// An executable transform produced by [`BuiltinEngine`].
#[derive(Debug, Clone)]
pub struct CompiledTransform {
    program: Program,
}

impl CompiledTransform {
    /// Number of passes the script compiled into.
    pub fn pass_count(&self) -> usize {
        self.program.pass_count()
    }
}

impl TransliterationEngine for BuiltinEngine {
    type Transform = CompiledTransform;

    fn normalize_nfc(&self, text: &str) -> String {
        text.nfc().collect()
    }

    fn available_ids(&self) -> Vec<String> {
        CATALOG.iter().map(|(id, _)| id.to_string()).collect()
    }

    fn create_transform(&self, id: &str) -> Option<CompiledTransform> {
        NamedTransform::lookup(id).map(|transform| CompiledTransform { program: Program::named(transform) })
    }

    fn compile_rules(&self, script: &str) -> Result<CompiledTransform, EngineError> {
        Program::parse(script).map(|program| CompiledTransform { program })
    }

    fn apply(&self, transform: &CompiledTransform, text: &str) -> String {
        transform.program.run(text)
    }
}
