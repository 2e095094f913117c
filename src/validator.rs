// SPDX-License-Identifier: GPL-3.0-or-later

//! License classification against a policy.
//!
//! Every dependency lands in exactly one of four buckets: allowed, error,
//! warning, or skipped. Precedence is strict: a skip-listed package is
//! never classified further, and a single trigger-error license outweighs
//! any number of allowed ones.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::LicensePolicy;
use crate::discover::DependencyMap;

/// How a single dependency was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Allowed,
    Error,
    Warning,
    Skip,
}

/// Aggregate outcome of a validation run.
///
/// The four sets partition the validated package names; a package appears
/// in exactly one of them.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ValidationResult {
    pub allowed: BTreeSet<String>,
    pub errors: BTreeSet<String>,
    pub warnings: BTreeSet<String>,
    pub skipped: BTreeSet<String>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_success(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }

    /// Number of dependencies actually checked. Skipped packages are not
    /// counted at all; skip means "leave this one out of compliance".
    pub fn total_checked(&self) -> usize {
        self.allowed.len() + self.errors.len() + self.warnings.len()
    }
}

/// Classifies dependency license sets against a [`LicensePolicy`].
pub struct LicenseValidator {
    policy: LicensePolicy,
}

impl LicenseValidator {
    pub fn new(policy: LicensePolicy) -> Self {
        Self { policy }
    }

    /// Classify every dependency in the map.
    ///
    /// When the policy configures no trigger-error licenses, the operator
    /// never separated "forbidden" from "merely unrecognized", so all
    /// warnings are promoted to errors rather than letting unknown
    /// licenses pass silently.
    pub fn validate(&self, dependencies: &DependencyMap) -> ValidationResult {
        let mut result = ValidationResult::default();

        for (name, licenses) in dependencies {
            match self.get_classification(name, licenses) {
                Classification::Allowed => result.allowed.insert(name.clone()),
                Classification::Error => result.errors.insert(name.clone()),
                Classification::Warning => result.warnings.insert(name.clone()),
                Classification::Skip => result.skipped.insert(name.clone()),
            };
        }

        // Base-identifier expansion maps empty to empty, so this check on
        // the expanded set matches the as-configured one.
        if self.policy.trigger_error.is_empty() {
            result.errors.extend(std::mem::take(&mut result.warnings));
        }

        result
    }

    /// Classify one dependency. First match wins:
    /// skip-listed name, then trigger-error license, then allowed license,
    /// then warning.
    pub fn get_classification(&self, name: &str, licenses: &BTreeSet<String>) -> Classification {
        if self.policy.skip_libraries.contains(name) {
            return Classification::Skip;
        }

        if licenses.iter().any(|l| self.policy.trigger_error.contains(l)) {
            return Classification::Error;
        }

        if licenses.iter().any(|l| self.policy.allowed.contains(l)) {
            return Classification::Allowed;
        }

        Classification::Warning
    }
}
