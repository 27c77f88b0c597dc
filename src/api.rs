use crate::engine::{BuiltinEngine, TransliterationEngine};
use crate::error::{Error, Result};
use crate::metrics::{self, PhaseTimings, StageCounts};
use crate::options::{OptionValue, SlugOptions};
use crate::script::{CacheStats, RuleScript, RuleScriptBuilder, TransformIdResolver, UnicodeSetCache, UnicodeSetCompiler};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::{Duration, Instant};

static DEFAULT_GENERATOR: Lazy<SlugGenerator> = Lazy::new(SlugGenerator::new);

/// Anything that turns text into slugs.
pub trait Slugify {
    /// Slug for `text` with the generator's own options.
    fn slugify(&self, text: &str) -> Result<String> {
        self.slugify_with(text, &SlugOptions::new())
    }

    /// Slug for `text` with `overrides` merged over the generator's options.
    fn slugify_with(&self, text: &str, overrides: &SlugOptions) -> Result<String>;
}

/// Additional details returned by [`SlugGenerator::generate_verbose`].
///
/// Meant for debugging a slug and profiling the pipeline; the plain
/// [`SlugGenerator::generate`] path does not collect any of it.
#[derive(Debug, Clone)]
pub struct GenerateDetails {
    /// The options after merging overrides.
    pub options: SlugOptions,
    /// The rendered rule script (empty when `validChars` is empty).
    pub script: String,
    /// Script fragments per stage.
    pub stages: StageCounts,
    pub timings: PhaseTimings,
    /// Set-cache lookups during the build.
    pub cache: CacheStats,
}

/// Result from [`SlugGenerator::generate_verbose`].
#[derive(Debug, Clone)]
pub struct GenerateResultVerbose {
    pub text: String,
    pub slug: String,
    pub elapsed: Duration,
    pub details: GenerateDetails,
}

/// Turns text into slugs by composing one rule script per call.
///
/// The generator holds base options, the engine, a set compiler backed by a
/// (by default process-wide) [`UnicodeSetCache`], and a transform id
/// resolver memoized for its engine.
#[derive(Debug)]
pub struct SlugGenerator<E: TransliterationEngine = BuiltinEngine> {
    engine: E,
    options: SlugOptions,
    sets: UnicodeSetCompiler,
    resolver: TransformIdResolver,
}

impl SlugGenerator<BuiltinEngine> {
    /// A generator with the built-in engine and default options.
    pub fn new() -> Self {
        Self::with_options(SlugOptions::new())
    }

    pub fn with_options(options: SlugOptions) -> Self {
        Self::with_engine(BuiltinEngine::new(), options)
    }
}

impl Default for SlugGenerator<BuiltinEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: TransliterationEngine> SlugGenerator<E> {
    pub fn with_engine(engine: E, options: SlugOptions) -> Self {
        Self { engine, options, sets: UnicodeSetCompiler::default(), resolver: TransformIdResolver::new() }
    }

    /// Use `cache` for compiled set literals instead of the shared one.
    pub fn with_cache(mut self, cache: Arc<UnicodeSetCache>) -> Self {
        self.sets = UnicodeSetCompiler::new(cache);
        self
    }

    pub fn options(&self) -> &SlugOptions {
        &self.options
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn set_cache(&self) -> &UnicodeSetCache {
        self.sets.cache()
    }

    /// Generate a slug for `text`, with the explicitly set options of
    /// `overrides` taking precedence over the generator's options.
    pub fn generate(&self, text: &str, overrides: &SlugOptions) -> Result<String> {
        let options = self.merged(overrides)?;
        if options.valid_chars().is_empty() {
            return Ok(String::new());
        }
        let text = self.engine.normalize_nfc(text);
        let script = self.build_script(&options)?;
        let transform = self.compile(&script, options.locale())?;
        Ok(self.engine.apply(&transform, &text))
    }

    /// Like [`generate`](Self::generate) with overrides given by option name.
    ///
    /// `preTransforms` and `postTransforms` extend the generator's own
    /// transform list.
    pub fn generate_with<'a, I>(&self, text: &str, overrides: I) -> Result<String>
    where
        I: IntoIterator<Item = (&'a str, OptionValue)>,
    {
        let options = self.options.merge_pairs(overrides)?;
        self.generate(text, &options)
    }

    /// Like [`generate`](Self::generate) for raw bytes, which must be UTF-8.
    pub fn generate_bytes(&self, bytes: &[u8], overrides: &SlugOptions) -> Result<String> {
        let text = std::str::from_utf8(bytes).map_err(|err| Error::InvalidEncoding { offset: err.valid_up_to() })?;
        self.generate(text, overrides)
    }

    /// Generate a slug and return timings and the script that produced it.
    pub fn generate_verbose(&self, text: &str, overrides: &SlugOptions) -> Result<GenerateResultVerbose> {
        let started = Instant::now();
        let options = self.merged(overrides)?;

        if options.valid_chars().is_empty() {
            let details = GenerateDetails {
                options,
                script: String::new(),
                stages: StageCounts::default(),
                timings: PhaseTimings::default(),
                cache: CacheStats::default(),
            };
            return Ok(GenerateResultVerbose {
                text: text.to_string(),
                slug: String::new(),
                elapsed: started.elapsed(),
                details,
            });
        }

        let cache_before = self.sets.cache().stats();
        let script = self.build_script(&options)?;
        let built = Instant::now();
        let cache = metrics::cache_delta(cache_before, self.sets.cache().stats());

        let transform = self.compile(&script, options.locale())?;
        let compiled = Instant::now();

        let slug = self.engine.apply(&transform, &self.engine.normalize_nfc(text));
        let applied = Instant::now();

        let details = GenerateDetails {
            stages: StageCounts::of(&script),
            script: script.render(),
            timings: PhaseTimings {
                build: built - started,
                compile: compiled - built,
                apply: applied - compiled,
            },
            cache,
            options,
        };
        Ok(GenerateResultVerbose { text: text.to_string(), slug, elapsed: started.elapsed(), details })
    }

    /// Merge `overrides` over the generator's options and let the engine
    /// vet and canonicalize the resulting locale.
    fn merged(&self, overrides: &SlugOptions) -> Result<SlugOptions> {
        let mut options = self.options.merge(overrides);
        let tag = options.locale().to_string();
        if tag.is_empty() {
            return Ok(options);
        }
        let canonical = Some(&tag)
            .filter(|tag| self.engine.is_valid_locale(tag))
            .and_then(|tag| self.engine.canonicalize_locale(tag))
            .ok_or_else(|| Error::InvalidLocale(tag.clone()))?;
        if canonical != tag {
            tracing::debug!(locale = tag.as_str(), canonical = canonical.as_str(), "engine canonicalized locale");
            options.set_locale(&canonical)?;
        }
        Ok(options)
    }

    /// The rule script for `options` (already merged).
    pub fn build_script(&self, options: &SlugOptions) -> Result<RuleScript> {
        RuleScriptBuilder::new(&self.engine, &self.sets, &self.resolver).build(options)
    }

    fn compile(&self, script: &RuleScript, locale: &str) -> Result<E::Transform> {
        let rendered = script.render();
        match self.engine.compile_rules(&rendered) {
            Ok(transform) => Ok(transform),
            Err(err) => Err(self.diagnose(script, rendered, locale, err.to_string())),
        }
    }

    /// Find the transform responsible for a script that failed to compile.
    fn diagnose(&self, script: &RuleScript, rendered: String, locale: &str, reason: String) -> Error {
        tracing::debug!(reason = reason.as_str(), "rule script failed to compile, checking transforms one by one");
        for (rule, fragment) in script.transform_scripts() {
            if let Err(err) = self.engine.compile_rules(&fragment) {
                tracing::debug!(rule = rule.as_str(), error = %err, "transform failed to compile");
                return Error::InvalidTransformRule { rule, locale: locale.to_string(), reason: err.to_string() };
            }
        }
        Error::ScriptCompileFailure { script: rendered, reason }
    }
}

impl<E: TransliterationEngine> Slugify for SlugGenerator<E> {
    fn slugify_with(&self, text: &str, overrides: &SlugOptions) -> Result<String> {
        self.generate(text, overrides)
    }
}

/// Generate a slug for `text` with the default options.
///
/// # Example
/// ```
/// use slugrule::generate;
///
/// assert_eq!(generate("Hello Wörld!").unwrap(), "hello-world");
/// ```
pub fn generate(text: &str) -> Result<String> {
    DEFAULT_GENERATOR.generate(text, &SlugOptions::new())
}

/// Generate a slug for `text` with `options` merged over the defaults.
pub fn generate_with(text: &str, options: &SlugOptions) -> Result<String> {
    DEFAULT_GENERATOR.generate(text, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> SlugGenerator {
        SlugGenerator::new().with_cache(UnicodeSetCache::shared())
    }

    #[test]
    fn generate_applies_overrides() {
        let generator = generator();
        assert_eq!(generator.generate("föobär", &SlugOptions::new()).unwrap(), "foobar");
        let german = SlugOptions::new().with_locale("de").unwrap();
        assert_eq!(generator.generate("föobär", &german).unwrap(), "foeobaer");
        assert_eq!(generator.options().locale(), "");
    }

    #[test]
    fn generate_bytes_rejects_invalid_utf8() {
        let err = generator().generate_bytes(b"ab\xffcd", &SlugOptions::new()).unwrap_err();
        assert_eq!(err, Error::InvalidEncoding { offset: 2 });
        assert_eq!(generator().generate_bytes("Ab C".as_bytes(), &SlugOptions::new()).unwrap(), "ab-c");
    }

    #[test]
    fn generate_verbose_includes_script_and_timings() {
        let res = generator().generate_verbose("Ab C", &SlugOptions::new()).unwrap();
        assert_eq!(res.slug, "ab-c");
        assert_eq!(res.text, "Ab C");
        assert!(res.details.script.starts_with(":: NFC ;"));
        assert_eq!(res.details.stages.transforms, 6);
        assert_eq!(res.details.stages.delimit, 2);
        assert!(res.details.timings.total() <= res.elapsed);
    }

    #[test]
    fn generate_verbose_with_empty_valid_chars() {
        let overrides = SlugOptions::new().with_valid_chars("").unwrap();
        let res = generator().generate_verbose("abc", &overrides).unwrap();
        assert_eq!(res.slug, "");
        assert!(res.details.script.is_empty());
    }

    #[test]
    fn invalid_inline_rule_names_rule_and_locale() {
        let overrides = SlugOptions::new().with_locale("de_AT").unwrap().with_transforms(["invalid rule"]).unwrap();
        let err = generator().generate("abc", &overrides).unwrap_err();
        assert!(matches!(&err, Error::InvalidTransformRule { rule, locale, .. } if rule == "invalid rule" && locale == "de_AT"));
    }

    #[test]
    fn slugify_trait_uses_generator_options() {
        let options = SlugOptions::new().with_delimiter("_");
        let generator = SlugGenerator::with_options(options);
        let slugger: &dyn Slugify = &generator;
        assert_eq!(slugger.slugify("A b").unwrap(), "a_b");
    }

    #[test]
    fn free_functions_use_defaults() {
        assert_eq!(generate("Hello Wörld!").unwrap(), "hello-world");
        let options = SlugOptions::new().with_delimiter(".");
        assert_eq!(generate_with("Hello Wörld!", &options).unwrap(), "hello.world");
    }
}
