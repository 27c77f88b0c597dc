//! Replacements for transform ids that older engine catalogs lack.

/// One step of a compatibility patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStep {
    /// Inline rules, emitted like a user-supplied rule transform.
    Rules(&'static str),
    /// A transform name, resolved again like a requested transform.
    Transform(&'static str),
}

/// German umlauts: lowercase to `ae`/`oe`/`ue`, uppercase to `Ae`/`Oe`/`Ue`
/// before a lowercase letter and `AE`/`OE`/`UE` otherwise. Decomposed forms
/// are matched as well.
const GERMAN_UMLAUTS: &str = concat!(
    "$AE = [Ä {A \\u0308}] ; $OE = [Ö {O \\u0308}] ; $UE = [Ü {U \\u0308}] ; ",
    "[ä {a \\u0308}] > ae ; [ö {o \\u0308}] > oe ; [ü {u \\u0308}] > ue ; ",
    "$AE } [:Lowercase:] > Ae ; $OE } [:Lowercase:] > Oe ; $UE } [:Lowercase:] > Ue ; ",
    "$AE > AE ; $OE > OE ; $UE > UE ;",
);

const DE_ASCII: &[PatchStep] = &[PatchStep::Rules(GERMAN_UMLAUTS), PatchStep::Transform("Latin-ASCII")];

const LATIN_ASCII: &[PatchStep] =
    &[PatchStep::Transform("NFD"), PatchStep::Rules("[:Mn:] > ;"), PatchStep::Transform("NFC")];

const PATCHES: &[(&str, &[PatchStep])] = &[("de-ASCII", DE_ASCII), ("Latin-ASCII", LATIN_ASCII)];

/// The patch for `id`, matched case-insensitively.
pub fn patch(id: &str) -> Option<&'static [PatchStep]> {
    PATCHES.iter().find(|(name, _)| name.eq_ignore_ascii_case(id)).map(|&(_, steps)| steps)
}
