// SPDX-License-Identifier: GPL-3.0-or-later

//! Python ecosystem backend.
//!
//! Dependency names come from `pyproject.toml` (PEP 621 and Poetry
//! tables) and from `*req*.txt` / `*dep*.txt` requirement files in the
//! project directory. Licenses are derived from the `METADATA` files of
//! installed distributions found under the project's virtualenv
//! site-packages, preferring the `License` field, then
//! `License-Expression`, then the license trove classifiers.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use super::{DependencyMap, DiscoveryContext, Ecosystem};
use crate::config::PolicySettings;
use crate::matcher::LicenseMatcher;

const PYPROJECT: &str = "pyproject.toml";

/// Version-specifier separators, checked in order.
const SPECIFIER_SEPARATORS: &[&str] = &[">=", "==", "<=", "~=", "!=", "<", ">"];

pub struct PythonEcosystem<'a> {
    project_dir: PathBuf,
    ctx: &'a DiscoveryContext,
}

impl<'a> PythonEcosystem<'a> {
    pub fn new(project_dir: &Path, ctx: &'a DiscoveryContext) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            ctx,
        }
    }

    /// Dependency names declared in `pyproject.toml`.
    fn pyproject_dependencies(&self) -> Result<BTreeSet<String>> {
        let path = self.project_dir.join(PYPROJECT);
        if !path.is_file() {
            return Ok(BTreeSet::new());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let mut deps = BTreeSet::new();

        // PEP 621: [project] dependencies = ["requests>=2.0", ...]
        if let Some(list) = config
            .get("project")
            .and_then(|p| p.get("dependencies"))
            .and_then(|d| d.as_array())
        {
            for dep in list {
                if let Some(name) = dep.as_str().and_then(clean_requirement) {
                    deps.insert(name);
                }
            }
        }

        // Poetry: every [tool.poetry.*dependencies*] table, plus groups
        if let Some(poetry) = config
            .get("tool")
            .and_then(|t| t.get("poetry"))
            .and_then(|p| p.as_table())
        {
            for (key, value) in poetry {
                if key.contains("dependencies") {
                    if let Some(table) = value.as_table() {
                        deps.extend(poetry_dependency_names(table));
                    }
                }
            }
            if let Some(groups) = poetry.get("group").and_then(|g| g.as_table()) {
                for group in groups.values() {
                    if let Some(table) = group.get("dependencies").and_then(|d| d.as_table()) {
                        deps.extend(poetry_dependency_names(table));
                    }
                }
            }
        }

        Ok(deps)
    }

    /// Dependency names from requirement files (`requirements.txt`,
    /// `dev-deps.txt`, ...) in the project directory.
    fn requirements_dependencies(&self) -> BTreeSet<String> {
        let mut deps = BTreeSet::new();

        let Ok(entries) = fs::read_dir(&self.project_dir) else {
            return deps;
        };

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !name.ends_with(".txt") || !(name.contains("req") || name.contains("dep")) {
                continue;
            }

            match fs::read_to_string(entry.path()) {
                Ok(content) => {
                    for line in content.lines() {
                        if let Some(dep) = clean_requirement_line(line) {
                            deps.insert(dep);
                        }
                    }
                }
                Err(e) => {
                    eprintln!("  Warning: failed to read {}: {}", entry.path().display(), e);
                }
            }
        }

        deps
    }

    /// Whether any requirement file exists, without reading contents.
    fn has_requirement_files(&self) -> bool {
        fs::read_dir(&self.project_dir)
            .map(|entries| {
                entries.flatten().any(|e| {
                    e.file_name().to_str().is_some_and(|n| {
                        n.ends_with(".txt") && (n.contains("req") || n.contains("dep"))
                    })
                })
            })
            .unwrap_or(false)
    }
}

impl Ecosystem for PythonEcosystem<'_> {
    fn name(&self) -> &str {
        "python"
    }

    fn is_available(&self) -> bool {
        self.project_dir.join(PYPROJECT).is_file() || self.has_requirement_files()
    }

    fn discover(&self) -> Result<DependencyMap> {
        let mut names = self.pyproject_dependencies()?;
        names.extend(self.requirements_dependencies());

        if names.is_empty() {
            return Ok(DependencyMap::new());
        }

        let dist_infos = scan_dist_info(&site_package_roots(&self.project_dir));
        let names: Vec<String> = names.into_iter().collect();

        let pb = ProgressBar::new(names.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {bar:30} {pos}/{len} dependencies")
                .unwrap(),
        );

        let resolved: Vec<(String, BTreeSet<String>)> = names
            .par_iter()
            .map(|name| {
                let licenses = self.ctx.resolve(name, || {
                    dist_infos
                        .get(&canonical_name(name))
                        .map(|path| read_metadata_licenses(path, &self.ctx.matcher, &pb))
                        .unwrap_or_default()
                });
                pb.inc(1);
                (name.clone(), licenses)
            })
            .collect();

        pb.finish_and_clear();

        Ok(resolved.into_iter().collect())
    }

    fn load_settings(&self) -> Result<Option<PolicySettings>> {
        let path = self.project_dir.join(PYPROJECT);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let Some(section) = config.get("tool").and_then(|t| t.get("licheck")) else {
            return Ok(None);
        };

        Ok(Some((
            string_set(section.get("allowed")),
            string_set(section.get("trigger_error")),
            string_set(section.get("skip_libraries")),
        )))
    }
}

/// Keys of a Poetry dependency table, minus the interpreter pin.
fn poetry_dependency_names(table: &toml::value::Table) -> Vec<String> {
    table.keys().filter(|k| *k != "python").cloned().collect()
}

/// Reduce a requirement specifier to the bare package name.
///
/// Handles environment markers (`; python_version < "3.9"`), extras
/// (`requests[socks]`), parenthesized constraints (`pkg (>=1.0)`) and
/// inline version specifiers (`pkg>=1.0`).
fn clean_requirement(spec: &str) -> Option<String> {
    let mut name = spec;
    for cut in [';', '(', '['] {
        if let Some((head, _)) = name.split_once(cut) {
            name = head;
        }
    }
    for sep in SPECIFIER_SEPARATORS {
        if let Some((head, _)) = name.split_once(sep) {
            name = head;
            break;
        }
    }

    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Clean one requirements-file line; comments yield `None`.
fn clean_requirement_line(line: &str) -> Option<String> {
    if line.trim_start().starts_with('#') {
        return None;
    }
    let line = line.split('#').next().unwrap_or(line).trim();
    if line.is_empty() {
        return None;
    }
    clean_requirement(line)
}

/// PEP 503-style name folding so manifest names match dist-info names.
fn canonical_name(name: &str) -> String {
    name.to_lowercase().replace(['-', '.'], "_")
}

/// Site-packages directories under the project's virtualenv, if any.
fn site_package_roots(project_dir: &Path) -> Vec<PathBuf> {
    let mut roots = Vec::new();

    for venv in [".venv", "venv"] {
        let lib = project_dir.join(venv).join("lib");
        if let Ok(entries) = fs::read_dir(&lib) {
            for entry in entries.flatten() {
                let site = entry.path().join("site-packages");
                if site.is_dir() {
                    roots.push(site);
                }
            }
        }

        // Windows layout
        let site = project_dir.join(venv).join("Lib").join("site-packages");
        if site.is_dir() {
            roots.push(site);
        }
    }

    roots
}

/// Map canonical package names to their installed `METADATA` file.
fn scan_dist_info(roots: &[PathBuf]) -> BTreeMap<String, PathBuf> {
    let mut map = BTreeMap::new();

    for root in roots {
        let Ok(entries) = fs::read_dir(root) else {
            continue;
        };
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(dir_name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = dir_name.strip_suffix(".dist-info") else {
                continue;
            };
            // Directory names are `<name>-<version>.dist-info`
            let name = stem.rsplit_once('-').map(|(n, _)| n).unwrap_or(stem);

            let metadata = entry.path().join("METADATA");
            if metadata.is_file() {
                map.entry(canonical_name(name)).or_insert(metadata);
            }
        }
    }

    map
}

fn read_metadata_licenses(
    path: &Path,
    matcher: &LicenseMatcher,
    pb: &ProgressBar,
) -> BTreeSet<String> {
    match fs::read_to_string(path) {
        Ok(content) => parse_metadata_licenses(&content, matcher),
        Err(e) => {
            pb.suspend(|| {
                eprintln!("  Warning: failed to read {}: {}", path.display(), e);
            });
            BTreeSet::new()
        }
    }
}

/// Extract licenses from core-metadata headers, first non-empty source
/// wins: `License`, then `License-Expression`, then the classifiers.
fn parse_metadata_licenses(content: &str, matcher: &LicenseMatcher) -> BTreeSet<String> {
    let mut license_fields = Vec::new();
    let mut expression_fields = Vec::new();
    let mut classifiers = Vec::new();

    for line in content.lines() {
        // Headers end at the first blank line; the body is the long
        // description and full of false positives
        if line.is_empty() {
            break;
        }

        // Longest prefix first: `License:` would also match these lines
        if let Some(value) = line.strip_prefix("License-Expression:") {
            expression_fields.push(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("License:") {
            license_fields.push(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Classifier:") {
            let value = value.trim();
            if value.to_lowercase().contains("license") {
                classifiers.push(value.to_string());
            }
        }
    }

    for source in [license_fields, expression_fields, classifiers] {
        let matched: BTreeSet<String> = source
            .iter()
            .flat_map(|text| matcher.match_text(text))
            .collect();
        if !matched.is_empty() {
            return matched;
        }
    }

    BTreeSet::new()
}

/// Values of an optional TOML string array as a set.
fn string_set(value: Option<&toml::Value>) -> BTreeSet<String> {
    value
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
