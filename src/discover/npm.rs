// SPDX-License-Identifier: GPL-3.0-or-later

//! npm ecosystem backend.
//!
//! Dependency names come from `package.json` (`dependencies` and
//! `devDependencies`); licenses are read from each installed package's
//! own `node_modules/<name>/package.json`, handling the modern `license`
//! string, the object form `{"type": ...}`, and the legacy `licenses`
//! array.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use super::{DependencyMap, DiscoveryContext, Ecosystem};
use crate::config::PolicySettings;

const MANIFEST: &str = "package.json";

pub struct NpmEcosystem<'a> {
    project_dir: PathBuf,
    ctx: &'a DiscoveryContext,
}

impl<'a> NpmEcosystem<'a> {
    pub fn new(project_dir: &Path, ctx: &'a DiscoveryContext) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            ctx,
        }
    }

    fn read_manifest(&self) -> Result<serde_json::Value> {
        let path = self.project_dir.join(MANIFEST);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

impl Ecosystem for NpmEcosystem<'_> {
    fn name(&self) -> &str {
        "npm"
    }

    fn is_available(&self) -> bool {
        self.project_dir.join(MANIFEST).is_file()
    }

    fn discover(&self) -> Result<DependencyMap> {
        let manifest = self.read_manifest()?;

        let mut names = BTreeSet::new();
        for section in ["dependencies", "devDependencies"] {
            if let Some(deps) = manifest.get(section).and_then(|d| d.as_object()) {
                names.extend(deps.keys().cloned());
            }
        }

        if names.is_empty() {
            return Ok(DependencyMap::new());
        }

        let pb = ProgressBar::new(names.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {bar:30} {pos}/{len} dependencies")
                .unwrap(),
        );

        let mut result = DependencyMap::new();
        for name in names {
            let licenses = self
                .ctx
                .resolve(&name, || installed_package_licenses(&self.project_dir, &name));
            pb.inc(1);
            result.insert(name, licenses);
        }

        pb.finish_and_clear();
        Ok(result)
    }

    fn load_settings(&self) -> Result<Option<PolicySettings>> {
        if !self.is_available() {
            return Ok(None);
        }

        let manifest = self.read_manifest()?;
        let Some(section) = manifest.get("licheck") else {
            return Ok(None);
        };

        Ok(Some((
            string_set(section.get("allowed")),
            string_set(section.get("trigger_error")),
            string_set(section.get("skip_libraries")),
        )))
    }
}

/// Raw license strings from an installed package's own manifest.
///
/// The caller's [`DiscoveryContext::resolve`] normalizes these, so this
/// returns the declared strings untouched.
fn installed_package_licenses(project_dir: &Path, name: &str) -> BTreeSet<String> {
    let path = project_dir.join("node_modules").join(name).join(MANIFEST);
    let Ok(content) = fs::read_to_string(&path) else {
        return BTreeSet::new();
    };
    let Ok(manifest) = serde_json::from_str::<serde_json::Value>(&content) else {
        eprintln!("  Warning: failed to parse {}", path.display());
        return BTreeSet::new();
    };

    let mut raw = BTreeSet::new();

    match manifest.get("license") {
        Some(serde_json::Value::String(s)) => {
            raw.insert(s.clone());
        }
        Some(serde_json::Value::Object(obj)) => {
            if let Some(t) = obj.get("type").and_then(|t| t.as_str()) {
                raw.insert(t.to_string());
            }
        }
        _ => {}
    }

    // Legacy: "licenses": [{"type": "MIT"}, ...] or ["MIT", ...]
    if let Some(list) = manifest.get("licenses").and_then(|l| l.as_array()) {
        for item in list {
            match item {
                serde_json::Value::String(s) => {
                    raw.insert(s.clone());
                }
                serde_json::Value::Object(obj) => {
                    if let Some(t) = obj.get("type").and_then(|t| t.as_str()) {
                        raw.insert(t.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    raw
}

/// Values of an optional JSON string array as a set.
fn string_set(value: Option<&serde_json::Value>) -> BTreeSet<String> {
    value
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
