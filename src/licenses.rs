// SPDX-License-Identifier: GPL-3.0-or-later

//! Built-in SPDX license vocabulary.
//!
//! A locally embedded subset of the SPDX license list covering the
//! identifiers that show up in real package metadata. The matcher treats
//! this as its reference vocabulary; refreshing it from the SPDX registry
//! is a release-time chore, not a runtime concern.

use std::collections::BTreeSet;

/// Canonical SPDX license identifiers known to this build.
///
/// Source: <https://spdx.org/licenses/>
const SPDX_LICENSES: &[&str] = &[
    "0BSD",
    "AFL-3.0",
    "AGPL-3.0",
    "AGPL-3.0-only",
    "AGPL-3.0-or-later",
    "Apache-1.1",
    "Apache-2.0",
    "Artistic-1.0",
    "Artistic-2.0",
    "BlueOak-1.0.0",
    "BSD-1-Clause",
    "BSD-2-Clause",
    "BSD-2-Clause-Patent",
    "BSD-3-Clause",
    "BSD-3-Clause-Clear",
    "BSD-4-Clause",
    "BSL-1.0",
    "CC-BY-3.0",
    "CC-BY-4.0",
    "CC-BY-SA-4.0",
    "CC0-1.0",
    "CDDL-1.0",
    "CDDL-1.1",
    "CECILL-2.1",
    "CPL-1.0",
    "ECL-2.0",
    "EPL-1.0",
    "EPL-2.0",
    "EUPL-1.1",
    "EUPL-1.2",
    "GFDL-1.3",
    "GPL-1.0",
    "GPL-2.0",
    "GPL-2.0-only",
    "GPL-2.0-or-later",
    "GPL-3.0",
    "GPL-3.0-only",
    "GPL-3.0-or-later",
    "HPND",
    "ICU",
    "IJG",
    "ISC",
    "LGPL-2.0",
    "LGPL-2.0-only",
    "LGPL-2.0-or-later",
    "LGPL-2.1",
    "LGPL-2.1-only",
    "LGPL-2.1-or-later",
    "LGPL-3.0",
    "LGPL-3.0-only",
    "LGPL-3.0-or-later",
    "MIT",
    "MIT-0",
    "MPL-1.1",
    "MPL-2.0",
    "MS-PL",
    "MS-RL",
    "MulanPSL-2.0",
    "NCSA",
    "OFL-1.1",
    "OLDAP-2.8",
    "OpenSSL",
    "OSL-3.0",
    "PHP-3.01",
    "PostgreSQL",
    "PSF-2.0",
    "Python-2.0",
    "Ruby",
    "SSPL-1.0",
    "Unicode-DFS-2016",
    "Unlicense",
    "UPL-1.0",
    "Vim",
    "W3C",
    "WTFPL",
    "X11",
    "Zend-2.0",
    "Zlib",
    "ZPL-2.1",
];

/// The built-in vocabulary as an owned set, ready for matcher construction.
pub fn builtin_vocabulary() -> BTreeSet<String> {
    SPDX_LICENSES.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_contains_common_licenses() {
        let vocab = builtin_vocabulary();
        for id in ["MIT", "Apache-2.0", "GPL-3.0-or-later", "BSD-3-Clause", "ISC"] {
            assert!(vocab.contains(id), "{id} should be in the vocabulary");
        }
    }

    #[test]
    fn vocabulary_has_no_duplicates() {
        let vocab = builtin_vocabulary();
        assert_eq!(vocab.len(), SPDX_LICENSES.len());
    }

    #[test]
    fn identifiers_are_canonically_cased() {
        // The matcher relies on vocabulary casing being the canonical one
        let vocab = builtin_vocabulary();
        assert!(vocab.contains("MIT"));
        assert!(!vocab.contains("mit"));
    }
}
