use super::compat;
use crate::engine::TransliterationEngine;
use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::RwLock;

/// Maps a transform name plus locale to an id the engine can run.
///
/// Candidates are tried in order and the first available one wins:
///
/// ```text
/// de_AT-ASCII  ->  de-ASCII  ->  Latin-ASCII  ->  ASCII
/// ```
///
/// An id is available if the engine lists it, can construct it, or a
/// compatibility patch exists for it. Resolutions and the catalog are
/// memoized, so a resolver must only ever be used with one engine.
#[derive(Debug, Default)]
pub struct TransformIdResolver {
    catalog: OnceCell<Vec<String>>,
    resolved: RwLock<HashMap<(String, String), String>>,
}

impl TransformIdResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve<E: TransliterationEngine>(&self, engine: &E, name: &str, locale: &str) -> Result<String> {
        let key = (name.to_string(), locale.to_string());
        if let Some(id) = self.resolved.read().ok().and_then(|memo| memo.get(&key).cloned()) {
            return Ok(id);
        }

        let id = candidates(engine, name, locale)
            .into_iter()
            .find(|candidate| self.is_available(engine, candidate))
            .ok_or_else(|| Error::UnresolvedTransform { rule: name.to_string(), locale: locale.to_string() })?;
        tracing::debug!(name, locale, id = id.as_str(), "resolved transform");

        if let Ok(mut memo) = self.resolved.write() {
            memo.insert(key, id.clone());
        }
        Ok(id)
    }

    /// Whether the engine's catalog lists `id`, ignoring case.
    pub fn in_catalog<E: TransliterationEngine>(&self, engine: &E, id: &str) -> bool {
        self.catalog.get_or_init(|| engine.available_ids()).iter().any(|known| known.eq_ignore_ascii_case(id))
    }

    fn is_available<E: TransliterationEngine>(&self, engine: &E, id: &str) -> bool {
        self.in_catalog(engine, id) || engine.create_transform(id).is_some() || compat::patch(id).is_some()
    }
}

fn candidates<E: TransliterationEngine>(engine: &E, name: &str, locale: &str) -> Vec<String> {
    let mut ids = Vec::with_capacity(4);
    if !locale.is_empty() {
        ids.push(format!("{locale}-{name}"));
        let primary = engine.primary_language(locale);
        if primary != locale {
            ids.push(format!("{primary}-{name}"));
        }
    }
    ids.push(format!("Latin-{name}"));
    ids.push(name.to_string());
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BuiltinEngine;

    #[test]
    fn candidate_order() {
        assert_eq!(candidates(&BuiltinEngine, "ASCII", "de_AT"), ["de_AT-ASCII", "de-ASCII", "Latin-ASCII", "ASCII"]);
        assert_eq!(candidates(&BuiltinEngine, "ASCII", "de"), ["de-ASCII", "Latin-ASCII", "ASCII"]);
        assert_eq!(candidates(&BuiltinEngine, "Lower", ""), ["Latin-Lower", "Lower"]);
    }

    #[test]
    fn prefers_locale_specific_ids() {
        let resolver = TransformIdResolver::new();
        assert_eq!(resolver.resolve(&BuiltinEngine, "Upper", "tr").unwrap(), "tr-Upper");
        assert_eq!(resolver.resolve(&BuiltinEngine, "Upper", "tr_TR").unwrap(), "tr-Upper");
        assert_eq!(resolver.resolve(&BuiltinEngine, "Upper", "de").unwrap(), "Upper");
    }

    #[test]
    fn falls_back_to_latin_and_patches() {
        let resolver = TransformIdResolver::new();
        assert_eq!(resolver.resolve(&BuiltinEngine, "ASCII", "").unwrap(), "Latin-ASCII");
        assert_eq!(resolver.resolve(&BuiltinEngine, "ASCII", "de_AT").unwrap(), "de-ASCII");
        assert_eq!(resolver.resolve(&BuiltinEngine, "Latn", "").unwrap(), "Latn");
    }

    #[test]
    fn unresolved_names_rule_and_locale() {
        let err = TransformIdResolver::new().resolve(&BuiltinEngine, "Klingon", "de").unwrap_err();
        assert_eq!(err, Error::UnresolvedTransform { rule: "Klingon".to_string(), locale: "de".to_string() });
    }

    #[test]
    fn catalog_lookup_ignores_case() {
        let resolver = TransformIdResolver::new();
        assert!(resolver.in_catalog(&BuiltinEngine, "latin-ascii"));
        assert!(!resolver.in_catalog(&BuiltinEngine, "de-ASCII"));
    }
}
