// SPDX-License-Identifier: GPL-3.0-or-later

//! License policy configuration.
//!
//! A policy is three sets: allowed licenses, trigger-error licenses, and
//! package names to skip entirely. Policies come either from an ecosystem's
//! own settings (e.g. `[tool.licheck]` in `pyproject.toml`) or from a
//! standalone config file in the project directory. Configuration problems
//! are fatal: validating against a contradictory policy is worse than not
//! validating at all.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

/// Candidate config filenames, searched in order.
pub const CONFIG_FILES: &[&str] = &[
    "licheck.toml",
    ".licheck.toml",
    "licheck.yaml",
    ".licheck.yaml",
    "licheck.yml",
];

/// Policy settings supplied directly by an ecosystem backend:
/// `(allowed, trigger_error, skip_libraries)`.
pub type PolicySettings = (BTreeSet<String>, BTreeSet<String>, BTreeSet<String>);

/// Invalid, missing, or conflicting policy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("conflicting licenses: {0:?} cannot be both allowed and trigger errors")]
    ConflictingLicenses(Vec<String>),

    #[error("no configuration file found in {} (expected one of: {candidates})", .dir.display())]
    NotFound { dir: PathBuf, candidates: String },

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to load {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// The allow/error/skip license policy a validation run is checked against.
///
/// Both license sets are closed under base-identifier expansion: every
/// hyphenated member also contributes the substring before its first
/// hyphen (`Apache-2.0` implies `Apache`), so a policy author can allow or
/// deny at the family level or the precise version level interchangeably.
#[derive(Debug, Clone, Default)]
pub struct LicensePolicy {
    pub allowed: BTreeSet<String>,
    pub trigger_error: BTreeSet<String>,
    /// Package names (not licenses) excluded from classification.
    pub skip_libraries: BTreeSet<String>,
}

impl LicensePolicy {
    /// Build a policy, expanding base identifiers into both license sets.
    ///
    /// Construction does not validate; loaders of untrusted input must
    /// call [`LicensePolicy::validate`] before use.
    pub fn new(
        allowed: BTreeSet<String>,
        trigger_error: BTreeSet<String>,
        skip_libraries: BTreeSet<String>,
    ) -> Self {
        Self {
            allowed: expand_bases(allowed),
            trigger_error: expand_bases(trigger_error),
            skip_libraries,
        }
    }

    /// Reject policies whose expanded allowed and trigger-error sets
    /// overlap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let conflicts: Vec<String> = self
            .allowed
            .intersection(&self.trigger_error)
            .cloned()
            .collect();

        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ConflictingLicenses(conflicts))
        }
    }
}

/// Add the first-hyphen base identifier of every member to the set.
fn expand_bases(set: BTreeSet<String>) -> BTreeSet<String> {
    let mut expanded = set.clone();
    for lic in &set {
        if let Some((base, _)) = lic.split_once('-') {
            expanded.insert(base.to_string());
        }
    }
    expanded
}

/// On-disk policy file shape. Every key is optional.
#[derive(Debug, Default, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    allowed_licenses: Vec<String>,
    #[serde(default)]
    trigger_error_licenses: Vec<String>,
    #[serde(default)]
    skip_libraries: Vec<String>,
}

/// Loads and validates license policies from settings or config files.
pub struct ConfigManager {
    base_dir: PathBuf,
}

impl ConfigManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Load a policy from an explicit settings tuple, or fall back to the
    /// first config file found in the base directory.
    pub fn load_policy(
        &self,
        settings: Option<PolicySettings>,
    ) -> Result<LicensePolicy, ConfigError> {
        if let Some((allowed, trigger_error, skip_libraries)) = settings {
            let policy = LicensePolicy::new(allowed, trigger_error, skip_libraries);
            policy.validate()?;
            return Ok(policy);
        }

        let path = self
            .find_config_file()
            .ok_or_else(|| ConfigError::NotFound {
                dir: self.base_dir.clone(),
                candidates: CONFIG_FILES.join(", "),
            })?;

        self.load_policy_from(&path)
    }

    /// Load and validate a policy from a specific config file, parsed as
    /// TOML or YAML by extension.
    pub fn load_policy_from(&self, path: &Path) -> Result<LicensePolicy, ConfigError> {
        let file = load_policy_file(path)?;
        let policy = LicensePolicy::new(
            file.allowed_licenses.into_iter().collect(),
            file.trigger_error_licenses.into_iter().collect(),
            file.skip_libraries.into_iter().collect(),
        );
        policy.validate()?;
        Ok(policy)
    }

    /// First existing candidate config file, in search order.
    fn find_config_file(&self) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| self.base_dir.join(name))
            .find(|path| path.exists())
    }
}

fn load_policy_file(path: &Path) -> Result<PolicyFile, ConfigError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match ext {
        "toml" | "yaml" | "yml" => {}
        other => return Err(ConfigError::UnsupportedFormat(format!(".{other}"))),
    }

    let load_err = |source: anyhow::Error| ConfigError::Load {
        path: path.to_path_buf(),
        source,
    };

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
        .map_err(load_err)?;

    match ext {
        "toml" => toml::from_str(&content)
            .context("Failed to parse TOML")
            .map_err(load_err),
        _ => serde_yaml::from_str(&content)
            .context("Failed to parse YAML")
            .map_err(load_err),
    }
}

/// Per-user cache directory for licheck state.
pub fn cache_dir() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    Ok(dirs.cache_dir().to_path_buf())
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "licheck").context("Could not determine home directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn policy_expands_base_identifiers() {
        let policy = LicensePolicy::new(set(&["Apache-2.0"]), set(&[]), set(&[]));
        assert!(policy.allowed.contains("Apache-2.0"));
        assert!(policy.allowed.contains("Apache"));
        policy.validate().unwrap();
    }

    #[test]
    fn policy_expands_trigger_errors_too() {
        let policy = LicensePolicy::new(set(&[]), set(&["GPL-3.0"]), set(&[]));
        assert!(policy.trigger_error.contains("GPL"));
        assert!(policy.trigger_error.contains("GPL-3.0"));
    }

    #[test]
    fn unhyphenated_identifiers_expand_to_themselves() {
        let policy = LicensePolicy::new(set(&["MIT"]), set(&[]), set(&[]));
        assert_eq!(policy.allowed, set(&["MIT"]));
    }

    #[test]
    fn direct_conflict_is_rejected() {
        let policy = LicensePolicy::new(set(&["MIT"]), set(&["MIT"]), set(&[]));
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("MIT"));
    }

    #[test]
    fn conflict_through_expansion_is_rejected() {
        // GPL-2.0 and GPL-3.0 share the base identifier GPL
        let policy = LicensePolicy::new(set(&["GPL-2.0"]), set(&["GPL-3.0"]), set(&[]));
        let err = policy.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingLicenses(_)));
        assert!(err.to_string().contains("GPL"));
    }

    #[test]
    fn skip_libraries_are_not_expanded() {
        let policy = LicensePolicy::new(set(&["MIT"]), set(&[]), set(&["my-internal-lib"]));
        // Package names keep their hyphens as-is
        assert_eq!(policy.skip_libraries, set(&["my-internal-lib"]));
        policy.validate().unwrap();
    }

    #[test]
    fn load_policy_from_settings_tuple() {
        let manager = ConfigManager::new("/nonexistent");
        let policy = manager
            .load_policy(Some((set(&["MIT"]), set(&["GPL-3.0"]), set(&[]))))
            .unwrap();
        assert!(policy.allowed.contains("MIT"));
        assert!(policy.trigger_error.contains("GPL"));
    }

    #[test]
    fn conflicting_settings_tuple_fails() {
        let manager = ConfigManager::new("/nonexistent");
        let err = manager
            .load_policy(Some((set(&["MIT"]), set(&["MIT"]), set(&[]))))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingLicenses(_)));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::new(dir.path());
        let err = manager.load_policy(None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(err.to_string().contains("licheck.toml"));
    }

    #[test]
    fn loads_toml_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("licheck.toml"),
            "allowed_licenses = [\"MIT\", \"Apache-2.0\"]\n\
             trigger_error_licenses = [\"GPL-3.0\"]\n\
             skip_libraries = [\"vendored-lib\"]\n",
        )
        .unwrap();

        let policy = ConfigManager::new(dir.path()).load_policy(None).unwrap();
        assert!(policy.allowed.contains("Apache"));
        assert!(policy.trigger_error.contains("GPL-3.0"));
        assert!(policy.skip_libraries.contains("vendored-lib"));
    }

    #[test]
    fn loads_yaml_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("licheck.yaml"),
            "allowed_licenses:\n  - MIT\ntrigger_error_licenses:\n  - AGPL-3.0\n",
        )
        .unwrap();

        let policy = ConfigManager::new(dir.path()).load_policy(None).unwrap();
        assert!(policy.allowed.contains("MIT"));
        assert!(policy.trigger_error.contains("AGPL-3.0"));
        assert!(policy.skip_libraries.is_empty());
    }

    #[test]
    fn missing_keys_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("licheck.toml"),
            "allowed_licenses = [\"MIT\"]\n",
        )
        .unwrap();

        let policy = ConfigManager::new(dir.path()).load_policy(None).unwrap();
        assert!(policy.trigger_error.is_empty());
        assert!(policy.skip_libraries.is_empty());
    }

    #[test]
    fn toml_config_wins_over_yaml_in_search_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("licheck.toml"),
            "allowed_licenses = [\"MIT\"]\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("licheck.yaml"),
            "allowed_licenses:\n  - ISC\n",
        )
        .unwrap();

        let policy = ConfigManager::new(dir.path()).load_policy(None).unwrap();
        assert!(policy.allowed.contains("MIT"));
        assert!(!policy.allowed.contains("ISC"));
    }

    #[test]
    fn conflicting_config_file_fails_at_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("licheck.toml"),
            "allowed_licenses = [\"MIT\"]\ntrigger_error_licenses = [\"MIT\"]\n",
        )
        .unwrap();

        let err = ConfigManager::new(dir.path()).load_policy(None).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingLicenses(_)));
    }

    #[test]
    fn unparseable_config_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("licheck.toml"), "allowed_licenses = not toml").unwrap();

        let err = ConfigManager::new(dir.path()).load_policy(None).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn unsupported_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("licheck.ini");
        fs::write(&path, "allowed=MIT").unwrap();

        let err = ConfigManager::new(dir.path())
            .load_policy_from(&path)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
        assert!(err.to_string().contains(".ini"));
    }
}
