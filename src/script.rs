//! Rule script composition.
//!
//! This is where slug options become a single transliteration script:
//!
//! ```text
//! SlugOptions ──> RuleScriptBuilder::build ──> RuleScript ──> engine.compile_rules
//!                   │         │
//!                   │         └─ TransformIdResolver   name + locale -> id
//!                   │               └─ compat          patches for missing ids
//!                   └─ UnicodeSetCompiler              class body -> set literal
//! ```
//!
//! A `RuleScript` keeps its fragments tagged by stage, so a failing script can
//! be taken apart again: each transform fragment compiles on its own, and the
//! first one that fails is reported with the transform it came from.
//!
//! ## Design notes
//!
//! - Fragment order is the execution order. Normalization comes first,
//!   delimiter collapsing last.
//! - The script depends only on the options, the engine catalog and the set
//!   cache, so the same options always render the same script.

#[path = "script/builder.rs"]
mod builder;
#[path = "script/compat.rs"]
mod compat;
#[path = "script/resolver.rs"]
mod resolver;
#[path = "script/unicode_set.rs"]
mod unicode_set;

#[allow(unused_imports)]
pub use builder::RuleScriptBuilder;
#[allow(unused_imports)]
pub use compat::{PatchStep, patch};
#[allow(unused_imports)]
pub use resolver::TransformIdResolver;
#[allow(unused_imports)]
pub use unicode_set::{CacheStats, UnicodeSetCache, UnicodeSetCompiler};

bitflags::bitflags! {
    /// Pipeline stages a script fragment can belong to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Stages: u8 {
        const NORMALIZE    = 1 << 0;
        const IGNORE       = 1 << 1;
        const TRANSFORMS   = 1 << 2;
        const IGNORE_AGAIN = 1 << 3;
        const DELIMIT      = 1 << 4;
    }
}

impl Stages {
    const LABELS: [(Stages, &'static str); 5] = [
        (Stages::NORMALIZE, "normalize"),
        (Stages::IGNORE, "ignore"),
        (Stages::TRANSFORMS, "transforms"),
        (Stages::IGNORE_AGAIN, "ignore-again"),
        (Stages::DELIMIT, "delimit"),
    ];

    /// Human-readable stage name for a single-stage value.
    pub fn label(self) -> &'static str {
        Self::LABELS.iter().find(|(stage, _)| *stage == self).map_or("mixed", |&(_, label)| label)
    }
}

/// One piece of a rule script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub stage: Stages,
    /// Position and text of the transform in the options, for fragments of
    /// the transforms stage.
    pub transform: Option<(usize, String)>,
    pub text: String,
}

/// An ordered list of script fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleScript {
    fragments: Vec<Fragment>,
}

impl RuleScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, stage: Stages, text: impl Into<String>) {
        self.fragments.push(Fragment { stage, transform: None, text: text.into() });
    }

    pub(crate) fn push_transform(&mut self, index: usize, transform: &str, text: impl Into<String>) {
        self.fragments.push(Fragment {
            stage: Stages::TRANSFORMS,
            transform: Some((index, transform.to_string())),
            text: text.into(),
        });
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The whole script, fragments joined by newlines.
    pub fn render(&self) -> String {
        self.render_stages(Stages::all())
    }

    /// Only the fragments of the given stages.
    pub fn render_stages(&self, stages: Stages) -> String {
        self.fragments
            .iter()
            .filter(|fragment| stages.contains(fragment.stage))
            .map(|fragment| fragment.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Transform fragments grouped per requested transform, in order.
    ///
    /// A transform that expanded into several fragments (compatibility
    /// patches) yields them joined as one script.
    pub fn transform_scripts(&self) -> Vec<(String, String)> {
        let mut grouped: Vec<(usize, String, String)> = Vec::new();
        for fragment in &self.fragments {
            let Some((index, transform)) = &fragment.transform else {
                continue;
            };
            match grouped.last_mut() {
                Some((last, _, script)) if *last == *index => {
                    script.push('\n');
                    script.push_str(&fragment.text);
                }
                _ => grouped.push((*index, transform.clone(), fragment.text.clone())),
            }
        }
        grouped.into_iter().map(|(_, transform, script)| (transform, script)).collect()
    }

    /// Number of fragments in `stage`.
    pub fn count(&self, stage: Stages) -> usize {
        self.fragments.iter().filter(|fragment| fragment.stage == stage).count()
    }
}
