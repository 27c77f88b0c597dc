//! Generation metrics.
//!
//! `SlugGenerator::generate` keeps the hot path free of bookkeeping.
//! `SlugGenerator::generate_verbose` runs the same pipeline and records what
//! each phase cost, for profiling and for debugging a surprising slug.
//!
//! ## Design notes
//!
//! - Set-cache counters are read before and after the build. With a cache
//!   shared between threads the delta may include other callers' lookups.

use crate::script::{CacheStats, RuleScript, Stages};
use std::time::Duration;

/// Timings for one generation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimings {
    /// Building the rule script, including set compilation.
    pub build: Duration,
    /// Compiling the script in the engine.
    pub compile: Duration,
    /// Applying the compiled transform to the text.
    pub apply: Duration,
}

impl PhaseTimings {
    pub fn total(&self) -> Duration {
        self.build + self.compile + self.apply
    }
}

/// Number of script fragments per stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageCounts {
    pub normalize: usize,
    pub ignore: usize,
    pub transforms: usize,
    pub ignore_again: usize,
    pub delimit: usize,
}

impl StageCounts {
    pub fn of(script: &RuleScript) -> Self {
        StageCounts {
            normalize: script.count(Stages::NORMALIZE),
            ignore: script.count(Stages::IGNORE),
            transforms: script.count(Stages::TRANSFORMS),
            ignore_again: script.count(Stages::IGNORE_AGAIN),
            delimit: script.count(Stages::DELIMIT),
        }
    }

    /// `(stage, count)` pairs in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (Stages, usize)> {
        [
            (Stages::NORMALIZE, self.normalize),
            (Stages::IGNORE, self.ignore),
            (Stages::TRANSFORMS, self.transforms),
            (Stages::IGNORE_AGAIN, self.ignore_again),
            (Stages::DELIMIT, self.delimit),
        ]
        .into_iter()
    }
}

/// Set-cache activity during one build.
pub(crate) fn cache_delta(before: CacheStats, after: CacheStats) -> CacheStats {
    CacheStats { hits: after.hits.saturating_sub(before.hits), misses: after.misses.saturating_sub(before.misses) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_phases() {
        let timings = PhaseTimings {
            build: Duration::from_millis(2),
            compile: Duration::from_millis(3),
            apply: Duration::from_millis(5),
        };
        assert_eq!(timings.total(), Duration::from_millis(10));
    }

    #[test]
    fn counts_fragments_per_stage() {
        let mut script = RuleScript::new();
        script.push(Stages::NORMALIZE, ":: NFC ;");
        script.push_transform(0, "Lower", ":: Lower ;");
        script.push_transform(1, "Upper", ":: Upper ;");
        script.push(Stages::DELIMIT, "[^a]+ > ;");
        let counts = StageCounts::of(&script);
        assert_eq!(counts, StageCounts { normalize: 1, transforms: 2, delimit: 1, ..StageCounts::default() });
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 4);
    }

    #[test]
    fn cache_delta_subtracts() {
        let before = CacheStats { hits: 3, misses: 1 };
        let after = CacheStats { hits: 5, misses: 4 };
        assert_eq!(cache_delta(before, after), CacheStats { hits: 2, misses: 3 });
    }
}
