use super::compat::{self, PatchStep};
use super::resolver::TransformIdResolver;
use super::unicode_set::{UnicodeSetCompiler, quote};
use super::{RuleScript, Stages};
use crate::engine::TransliterationEngine;
use crate::error::{Error, Result};
use crate::options::SlugOptions;
use once_cell::unsync::OnceCell;
use regex::{Captures, Regex};
use std::sync::Arc;

/// Composes the rule script for a set of options.
///
/// ```text
/// :: NFC ;                                  normalize
/// [<ignore>] > ; :: Null ;                  ignore
/// :: [[<insensitive>]-[<valid>]] Upper ;    transforms (case)
/// :: [^<valid>] Latn ;                      transforms (other)
/// ([<valid>]) > $1 ; <inline rules> ; :: Null ;
/// [<ignore>] > ; :: Null ;                  ignore again
/// [[^<valid>]{<d>}]+ > <d> ; :: Null ;      delimit
/// ^ [{<d>}]+ > ; [{<d>}]+ $ > ; :: Null ;
/// ```
pub struct RuleScriptBuilder<'a, E: TransliterationEngine> {
    engine: &'a E,
    sets: &'a UnicodeSetCompiler,
    resolver: &'a TransformIdResolver,
}

/// Set literals for one build, compiled on first use.
struct BuildSets<'o> {
    options: &'o SlugOptions,
    valid: Option<Arc<str>>,
    insensitive: OnceCell<Arc<str>>,
}

impl<'a, E: TransliterationEngine> RuleScriptBuilder<'a, E> {
    pub fn new(engine: &'a E, sets: &'a UnicodeSetCompiler, resolver: &'a TransformIdResolver) -> Self {
        Self { engine, sets, resolver }
    }

    pub fn build(&self, options: &SlugOptions) -> Result<RuleScript> {
        let valid = match options.valid_chars() {
            "" => None,
            body => Some(self.sets.compile(body)?),
        };
        let build = BuildSets { options, valid, insensitive: OnceCell::new() };

        let ignore = match options.ignore_chars() {
            "" => None,
            body => Some(format!("[{}] > ;\n:: Null ;", self.sets.compile(body)?)),
        };

        let mut script = RuleScript::new();
        script.push(Stages::NORMALIZE, ":: NFC ;");
        if let Some(ignore) = &ignore {
            script.push(Stages::IGNORE, ignore.as_str());
        }
        for (index, transform) in options.transforms().iter().enumerate() {
            self.push_transform(&mut script, &build, index, transform, transform)?;
        }
        if let Some(ignore) = ignore {
            script.push(Stages::IGNORE_AGAIN, ignore);
        }
        push_delimit(&mut script, build.valid.as_deref().unwrap_or(""), options.delimiter());

        tracing::debug!(
            fragments = script.fragments().len(),
            transforms = options.transforms().len(),
            locale = options.locale(),
            "built rule script"
        );
        Ok(script)
    }

    /// Emit `transform` for the option entry `source` at `index`.
    fn push_transform(
        &self,
        script: &mut RuleScript,
        build: &BuildSets<'_>,
        index: usize,
        source: &str,
        transform: &str,
    ) -> Result<()> {
        if !is_bare_identifier(transform) {
            let mut text = String::new();
            if let Some(valid) = &build.valid {
                text.push_str(&format!("([{valid}]) > $1 ;\n"));
            }
            let rules = transform.trim_end();
            text.push_str(rules);
            if !rules.ends_with(';') {
                text.push_str(" ;");
            }
            text.push_str("\n:: Null ;");
            script.push_transform(index, source, text);
            return Ok(());
        }

        let locale = build.options.locale();
        let id = self.resolver.resolve(self.engine, transform, locale)?;

        if !self.resolver.in_catalog(self.engine, &id) {
            if let Some(steps) = compat::patch(&id) {
                tracing::debug!(id = id.as_str(), steps = steps.len(), "substituting compatibility patch");
                for step in steps {
                    match *step {
                        PatchStep::Rules(rules) => self.push_transform(script, build, index, source, rules)?,
                        PatchStep::Transform(name) => self.push_transform(script, build, index, source, name)?,
                    }
                }
                return Ok(());
            }
        }

        let text = match &build.valid {
            None => format!(":: {id} ;"),
            Some(valid) if is_case_transform(transform) || is_case_transform(&id) => {
                let insensitive = build.insensitive.get_or_try_init(|| {
                    let body = case_insensitive_body(build.options.valid_chars())?;
                    self.sets.compile_case_insensitive(&body)
                })?;
                format!(":: [[{insensitive}]-[{valid}]] {id} ;")
            }
            Some(valid) => format!(":: [^{valid}] {id} ;"),
        };
        script.push_transform(index, source, text);
        Ok(())
    }
}

fn push_delimit(script: &mut RuleScript, valid: &str, delimiter: &str) {
    let d = quote(delimiter);
    if d.is_empty() {
        script.push(Stages::DELIMIT, format!("[^{valid}]+ > ;\n:: Null ;"));
        return;
    }
    script.push(Stages::DELIMIT, format!("[[^{valid}]{{{d}}}]+ > {d} ;\n:: Null ;"));
    script.push(Stages::DELIMIT, format!("^ [{{{d}}}]+ > ;\n[{{{d}}}]+ $ > ;\n:: Null ;"));
}

/// Transform names are plain ids; anything else is an inline rule script.
fn is_bare_identifier(transform: &str) -> bool {
    transform.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-'))
}

fn is_case_transform(name: &str) -> bool {
    let target = name.rsplit('-').next().unwrap_or(name);
    target.eq_ignore_ascii_case("Upper") || target.eq_ignore_ascii_case("Lower")
}

/// The class whose case-insensitive closure selects what case transforms
/// may touch: dotted and dotless i are added when either is valid, and the
/// lowercase and uppercase letter properties trade places.
fn case_insensitive_body(valid: &str) -> Result<String> {
    let class = Regex::new(&format!("^[{valid}]$")).map_err(|_| Error::InvalidCharacterClass(valid.to_string()))?;
    let mut body = valid.to_string();
    if class.is_match("İ") || class.is_match("ı") {
        body.push_str("İı");
    }
    let swapped = regex!(r"\\([pP])\{(Ll|Lu)\}").replace_all(&body, |caps: &Captures<'_>| {
        let other = if &caps[2] == "Ll" { "Lu" } else { "Ll" };
        format!("\\{}{{{other}}}", &caps[1])
    });
    Ok(swapped.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BuiltinEngine;
    use crate::script::UnicodeSetCache;

    fn build(options: &SlugOptions) -> Result<RuleScript> {
        let sets = UnicodeSetCompiler::new(Arc::new(UnicodeSetCache::new()));
        let resolver = TransformIdResolver::new();
        RuleScriptBuilder::new(&BuiltinEngine, &sets, &resolver).build(options)
    }

    #[test]
    fn renders_every_stage_in_order() {
        let options = SlugOptions::new()
            .with_valid_chars("a-c")
            .unwrap()
            .with_ignore_chars("x")
            .unwrap()
            .with_transforms(["Lower", "Latn"])
            .unwrap();
        let expected = [
            ":: NFC ;",
            "[x] > ;",
            ":: Null ;",
            ":: [[ABCabc]-[abc]] Lower ;",
            ":: [^abc] Latn ;",
            "[x] > ;",
            ":: Null ;",
            r"[[^abc]{\-}]+ > \- ;",
            ":: Null ;",
            r"^ [{\-}]+ > ;",
            r"[{\-}]+ $ > ;",
            ":: Null ;",
        ]
        .join("\n");
        assert_eq!(build(&options).unwrap().render(), expected);
    }

    #[test]
    fn inline_rules_get_a_pass_through() {
        let options =
            SlugOptions::new().with_valid_chars("b").unwrap().with_ignore_chars("").unwrap().with_transforms(["a > b;"]);
        let script = build(&options.unwrap()).unwrap();
        assert_eq!(script.transform_scripts(), [("a > b;".to_string(), "([b]) > $1 ;\na > b;\n:: Null ;".to_string())]);
        assert_eq!(script.count(Stages::IGNORE), 0);

        let options = SlugOptions::new().with_valid_chars("").unwrap().with_transforms(["invalid rule"]).unwrap();
        let script = build(&options).unwrap();
        assert_eq!(script.transform_scripts()[0].1, "invalid rule ;\n:: Null ;");
    }

    #[test]
    fn empty_valid_chars_drop_filters() {
        let options = SlugOptions::new()
            .with_valid_chars("")
            .unwrap()
            .with_ignore_chars("")
            .unwrap()
            .with_transforms(["Upper", "x > y;"])
            .unwrap()
            .with_delimiter("");
        let script = build(&options).unwrap();
        assert_eq!(script.render(), ":: NFC ;\n:: Upper ;\nx > y;\n:: Null ;\n[^]+ > ;\n:: Null ;");
    }

    #[test]
    fn german_locale_expands_the_umlaut_patch() {
        let options = SlugOptions::new().with_locale("de").unwrap().with_transforms(["ASCII"]).unwrap();
        let scripts = build(&options).unwrap().transform_scripts();
        assert_eq!(scripts.len(), 1);
        let (source, text) = &scripts[0];
        assert_eq!(source, "ASCII");
        assert!(text.contains("[ä {a \\u0308}] > ae"));
        assert!(text.trim_end().ends_with("Latin-ASCII ;"));
    }

    #[test]
    fn locale_specific_case_transform_gets_case_filter() {
        let options =
            SlugOptions::new().with_locale("tr").unwrap().with_valid_chars("a").unwrap().with_transforms(["Upper"]);
        let script = build(&options.unwrap()).unwrap();
        assert_eq!(script.transform_scripts()[0].1, ":: [[Aa]-[a]] tr-Upper ;");
    }

    #[test]
    fn unresolved_transform_fails_the_build() {
        let options = SlugOptions::new().with_locale("de_AT").unwrap().with_transforms(["Klingon"]).unwrap();
        assert_eq!(
            build(&options).unwrap_err(),
            Error::UnresolvedTransform { rule: "Klingon".to_string(), locale: "de_AT".to_string() }
        );
    }

    #[test]
    fn case_insensitive_body_swaps_letter_properties() {
        assert_eq!(case_insensitive_body(r"\p{Ll}").unwrap(), r"\p{Lu}İı");
        assert_eq!(case_insensitive_body(r"\p{Lu}\P{Ll}").unwrap(), r"\p{Ll}\P{Lu}İı");
        assert_eq!(case_insensitive_body("a-z").unwrap(), "a-z");
        assert_eq!(case_insensitive_body("ı").unwrap(), "ıİı");
    }

    #[test]
    fn identifiers_and_case_names() {
        assert!(is_bare_identifier("Any-Latin/BGN"));
        assert!(!is_bare_identifier("a > b;"));
        assert!(is_case_transform("Lower"));
        assert!(is_case_transform("tr-Upper"));
        assert!(!is_case_transform("Latin-ASCII"));
    }
}
