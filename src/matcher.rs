// SPDX-License-Identifier: GPL-3.0-or-later

//! License text matching and normalization.
//!
//! Package metadata spells licenses in every way imaginable: SPDX
//! identifiers, boolean SPDX expressions, classifier lines, free-form
//! README prose. [`LicenseMatcher`] funnels all of that through a
//! multi-strategy pipeline (expression decomposition, exact lookup,
//! variant-spelling normalization, substring containment, fuzzy
//! similarity) and returns whichever canonical identifiers it can
//! establish. Matching never fails; "nothing matched" is the empty set.

use std::collections::{BTreeMap, BTreeSet};

use crate::spdx;

/// Default similarity threshold for the fuzzy fallback strategy.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

/// Common variant spellings and their normalized forms.
///
/// Keys are matched against lowercased, trimmed input. Values are
/// canonicalized against the vocabulary when possible, otherwise used
/// verbatim (some targets, like `Proprietary`, are deliberately outside
/// the SPDX list).
const NORMALIZATIONS: &[(&str, &str)] = &[
    ("apache", "Apache"),
    ("apache 2.0", "Apache-2.0"),
    ("apache 2", "Apache-2.0"),
    ("apache license 2.0", "Apache-2.0"),
    ("apache license", "Apache-2.0"),
    ("mit license", "MIT"),
    ("mit", "MIT"),
    ("bsd", "BSD"),
    ("bsd license", "BSD"),
    ("bsd 3-clause", "BSD-3-Clause"),
    ("bsd 2-clause", "BSD-2-Clause"),
    ("3-clause bsd", "BSD-3-Clause"),
    ("2-clause bsd", "BSD-2-Clause"),
    ("gpl", "GPL"),
    ("gplv2", "GPL-2.0"),
    ("gplv3", "GPL-3.0"),
    ("gpl v2", "GPL-2.0"),
    ("gpl v3", "GPL-3.0"),
    ("lgpl", "LGPL"),
    ("lgplv2", "LGPL-2.0"),
    ("lgplv3", "LGPL-3.0"),
    ("mpl", "MPL"),
    ("mpl 2.0", "MPL-2.0"),
    ("mozilla public license", "MPL"),
    ("isc", "ISC"),
    ("isc license", "ISC"),
    ("unlicense", "Unlicense"),
    ("public domain", "Public-Domain"),
    ("proprietary", "Proprietary"),
    ("commercial", "Proprietary"),
    ("unknown", "Unknown"),
];

/// Separators that indicate multiple licenses in one free-form string.
const SEPARATORS: &[&str] = &[" or ", " and ", " / ", ", ", ";"];

/// Matches raw license text against a known SPDX vocabulary.
pub struct LicenseMatcher {
    vocabulary: BTreeSet<String>,
    fuzzy_threshold: f64,
    /// lowercase identifier -> canonical identifier. A BTreeMap keeps the
    /// fuzzy scan deterministic: ties resolve to the lexicographically
    /// smallest lowercased identifier.
    lower_map: BTreeMap<String, String>,
}

impl LicenseMatcher {
    /// Build a matcher over `vocabulary` with the default fuzzy threshold.
    pub fn new(vocabulary: BTreeSet<String>) -> Self {
        Self::with_threshold(vocabulary, DEFAULT_FUZZY_THRESHOLD)
    }

    /// Build a matcher with a custom fuzzy similarity threshold in `[0, 1]`.
    pub fn with_threshold(vocabulary: BTreeSet<String>, fuzzy_threshold: f64) -> Self {
        let lower_map = vocabulary
            .iter()
            .map(|id| (id.to_lowercase(), id.clone()))
            .collect();
        Self {
            vocabulary,
            fuzzy_threshold,
            lower_map,
        }
    }

    /// Match license text to canonical identifiers.
    ///
    /// Inputs that decompose into an SPDX expression (more than one token,
    /// or a single `-or-later` token) are matched per sub-token and the
    /// results unioned. Everything else goes through the single-text
    /// strategies: exact lookup, normalization, containment, and, only if
    /// all of those came up empty, fuzzy similarity.
    pub fn match_text(&self, text: &str) -> BTreeSet<String> {
        if text.trim().is_empty() {
            return BTreeSet::new();
        }

        let parsed = spdx::parse(text);
        if parsed.len() > 1 || parsed.first().is_some_and(|t| t.contains("-or-later")) {
            let mut matched = BTreeSet::new();
            for part in &parsed {
                matched.extend(self.match_single(part));
            }
            if !matched.is_empty() {
                return matched;
            }
        }

        self.match_single(text)
    }

    /// Normalize a set of raw license strings.
    ///
    /// Every input that matches contributes its canonical identifiers;
    /// inputs that match nothing are kept verbatim, so no license is ever
    /// silently dropped.
    pub fn normalize_license_set(&self, licenses: &BTreeSet<String>) -> BTreeSet<String> {
        let mut normalized = BTreeSet::new();
        for lic in licenses {
            let matched = self.match_text(lic);
            if matched.is_empty() {
                normalized.insert(lic.clone());
            } else {
                normalized.extend(matched);
            }
        }
        normalized
    }

    /// Run the non-expression strategies over a single license string.
    ///
    /// Exact, normalization and containment results are merged; fuzzy
    /// matching is a last resort that only runs when the rest found
    /// nothing, and contributes at most one identifier.
    fn match_single(&self, text: &str) -> BTreeSet<String> {
        let mut matched = BTreeSet::new();

        matched.extend(self.exact_match(text));

        if let Some(normalized) = self.normalize(text) {
            matched.insert(normalized);
        }

        matched.extend(self.find_contained(text));

        if matched.is_empty() {
            if let Some(fuzzy) = self.fuzzy_match(text) {
                matched.insert(fuzzy);
            }
        }

        matched
    }

    /// Case-insensitive exact lookup, with a second chance for strings
    /// that hold several identifiers joined by a common separator.
    fn exact_match(&self, text: &str) -> BTreeSet<String> {
        let text_lower = text.trim().to_lowercase();

        if let Some(canonical) = self.lower_map.get(&text_lower) {
            return BTreeSet::from([canonical.clone()]);
        }

        for sep in SEPARATORS {
            if text_lower.contains(sep) {
                let matches: BTreeSet<String> = text_lower
                    .split(sep)
                    .filter_map(|part| self.lower_map.get(part.trim()).cloned())
                    .collect();
                if !matches.is_empty() {
                    return matches;
                }
            }
        }

        BTreeSet::new()
    }

    /// Look the text up in the variant-spelling table, both as-is and with
    /// a trailing `license` / leading `the` stripped.
    fn normalize(&self, text: &str) -> Option<String> {
        let text_lower = text.trim().to_lowercase();

        if let Some(normalized) = lookup_normalization(&text_lower) {
            return Some(self.canonicalize(normalized));
        }

        let cleaned = strip_wrappers(&text_lower);
        if let Some(normalized) = lookup_normalization(&cleaned) {
            return Some(self.canonicalize(normalized));
        }

        None
    }

    /// Substitute the vocabulary's canonical casing when the identifier is
    /// known; pass non-vocabulary targets through verbatim.
    fn canonicalize(&self, id: &str) -> String {
        self.lower_map
            .get(&id.to_lowercase())
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Collect every vocabulary identifier that appears anywhere inside
    /// the text (case-insensitive substring containment).
    fn find_contained(&self, text: &str) -> BTreeSet<String> {
        let text_upper = text.to_uppercase();
        self.vocabulary
            .iter()
            .filter(|id| text_upper.contains(&id.to_uppercase()))
            .cloned()
            .collect()
    }

    /// Pick the single closest vocabulary entry at or above the threshold.
    fn fuzzy_match(&self, text: &str) -> Option<String> {
        let text_lower = text.trim().to_lowercase();

        let mut best_match = None;
        let mut best_ratio = 0.0f64;

        for (lower, canonical) in &self.lower_map {
            let ratio = strsim::normalized_levenshtein(&text_lower, lower);
            if ratio > best_ratio && ratio >= self.fuzzy_threshold {
                best_ratio = ratio;
                best_match = Some(canonical.clone());
            }
        }

        best_match
    }
}

/// Table lookup over the variant spellings.
fn lookup_normalization(text_lower: &str) -> Option<&'static str> {
    NORMALIZATIONS
        .iter()
        .find(|(variant, _)| *variant == text_lower)
        .map(|(_, normalized)| *normalized)
}

/// Strip a trailing ` license` and a leading `the ` wrapper, when present.
fn strip_wrappers(text_lower: &str) -> String {
    let mut cleaned = text_lower.to_string();

    let trimmed = cleaned.trim_end();
    if let Some(stem) = trimmed.strip_suffix("license") {
        if stem.ends_with(|c: char| c.is_whitespace()) {
            cleaned = stem.trim_end().to_string();
        }
    }

    if let Some(rest) = cleaned.strip_prefix("the") {
        if rest.starts_with(|c: char| c.is_whitespace()) {
            cleaned = rest.trim_start().to_string();
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> LicenseMatcher {
        let vocab: BTreeSet<String> = [
            "MIT",
            "Apache-2.0",
            "BSD-3-Clause",
            "BSD-2-Clause",
            "GPL-2.0",
            "GPL-3.0",
            "GPL-2.0-or-later",
            "MPL-2.0",
            "ISC",
            "Unlicense",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        LicenseMatcher::new(vocab)
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_canonical_casing() {
        assert_eq!(matcher().match_text("MIT"), set(&["MIT"]));
        assert_eq!(matcher().match_text("mit"), set(&["MIT"]));
        assert_eq!(matcher().match_text("Mit"), set(&["MIT"]));
    }

    #[test]
    fn blank_input_matches_nothing() {
        assert!(matcher().match_text("").is_empty());
        assert!(matcher().match_text("   ").is_empty());
    }

    #[test]
    fn spdx_expression_matches_each_part() {
        assert_eq!(
            matcher().match_text("MIT OR Apache-2.0"),
            set(&["MIT", "Apache-2.0"])
        );
    }

    #[test]
    fn or_later_single_token_goes_through_expression_path() {
        assert_eq!(
            matcher().match_text("GPL-2.0+"),
            set(&["GPL-2.0", "GPL-2.0-or-later"])
        );
    }

    #[test]
    fn normalization_table_hits() {
        assert_eq!(matcher().match_text("Apache 2.0"), set(&["Apache-2.0"]));
        assert_eq!(matcher().match_text("gplv3"), set(&["GPL-3.0"]));
    }

    #[test]
    fn normalization_strips_wrappers() {
        assert_eq!(matcher().match_text("The MIT License"), set(&["MIT"]));
        assert_eq!(matcher().match_text("ISC license"), set(&["ISC"]));
    }

    #[test]
    fn normalization_target_outside_vocabulary_kept_verbatim() {
        assert_eq!(matcher().match_text("proprietary"), set(&["Proprietary"]));
        assert_eq!(matcher().match_text("public domain"), set(&["Public-Domain"]));
    }

    #[test]
    fn contained_identifier_found_in_prose() {
        let m = matcher();
        let found = m.match_text("Licensed under the Apache-2.0 license terms");
        assert!(found.contains("Apache-2.0"));
    }

    #[test]
    fn contained_finds_multiple_identifiers() {
        let found = matcher().match_text("dual licensed: MPL-2.0 plus GPL-2.0 text follows");
        assert!(found.contains("MPL-2.0"));
        assert!(found.contains("GPL-2.0"));
    }

    #[test]
    fn separator_split_exact_matches() {
        assert_eq!(
            matcher().match_text("mit / isc"),
            set(&["MIT", "ISC"])
        );
    }

    #[test]
    fn fuzzy_match_close_misspelling() {
        // One character off from "apache-2.0"
        let found = matcher().match_text("Apach-2.0");
        assert_eq!(found, set(&["Apache-2.0"]));
    }

    #[test]
    fn fuzzy_respects_threshold() {
        let strict = LicenseMatcher::with_threshold(set(&["MIT", "BSD-3-Clause"]), 0.99);
        assert!(strict.match_text("BSD-3-Clauze").is_empty());
    }

    #[test]
    fn garbage_matches_nothing() {
        let m = LicenseMatcher::new(set(&["MIT", "BSD-3-Clause"]));
        assert!(m.match_text("Unknown-License-XYZ-123").is_empty());
    }

    #[test]
    fn normalize_set_keeps_unmatched_verbatim() {
        let m = matcher();
        let input = set(&["mit", "SomeCustomLicense-9.9"]);
        let normalized = m.normalize_license_set(&input);
        assert!(normalized.contains("MIT"));
        assert!(normalized.contains("SomeCustomLicense-9.9"));
    }

    #[test]
    fn normalize_set_is_idempotent_on_canonical_input() {
        let m = matcher();
        let canonical = set(&["MIT", "Apache-2.0"]);
        let once = m.normalize_license_set(&canonical);
        let twice = m.normalize_license_set(&once);
        assert_eq!(once, twice);
        assert_eq!(once, canonical);
    }

    #[test]
    fn expression_with_unknown_part_keeps_known_matches() {
        let found = matcher().match_text("MIT OR TotallyMadeUp-1.0");
        assert!(found.contains("MIT"));
    }

    #[test]
    fn classifier_line_matches_by_containment() {
        let found = matcher().match_text("License :: OSI Approved :: MIT License");
        assert!(found.contains("MIT"));
    }
}
