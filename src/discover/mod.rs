// SPDX-License-Identifier: GPL-3.0-or-later

//! Dependency discovery system.
//!
//! This module provides a pluggable framework for discovering the
//! third-party dependencies a project declares and deriving their
//! licenses from local metadata. Each supported ecosystem is represented
//! by a *backend* that implements the [`Ecosystem`] trait. At startup the
//! application calls [`active_ecosystems()`] to obtain the subset of
//! backends whose manifests are actually present in the project
//! directory, and then asks each one for its dependency map.
//!
//! Backends are registered statically in [`all_ecosystems()`]; there is
//! no runtime plugin loading. All per-run state (matcher, cache) lives in
//! a [`DiscoveryContext`] that is injected at construction, so repeated
//! runs in one process never bleed state into each other.
//!
//! # Adding a new backend
//!
//! 1. Create a new sub-module (e.g. `cargo.rs`) and implement
//!    [`Ecosystem`] for a struct holding the project directory and the
//!    shared context.
//! 2. Register the backend in [`all_ecosystems()`] by appending a
//!    `Box::new(...)` entry.
//!
//! See [`python::PythonEcosystem`] for a reference implementation.

mod npm;
mod python;

pub use npm::NpmEcosystem;
pub use python::PythonEcosystem;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;

use crate::cache::LicenseCache;
use crate::config::PolicySettings;
use crate::matcher::LicenseMatcher;

/// Placeholder license for dependencies whose license cannot be derived.
pub const UNKNOWN_LICENSE: &str = "Unknown";

/// Discovered dependencies: package name to detected license set.
pub type DependencyMap = BTreeMap<String, BTreeSet<String>>;

/// Shared per-run state handed to every backend.
///
/// The cache sits behind a mutex because backends may derive licenses
/// from a worker pool. Writers are last-write-wins (each `set` rewrites
/// the cache file), which is acceptable for a best-effort cache.
pub struct DiscoveryContext {
    pub matcher: LicenseMatcher,
    cache: Mutex<LicenseCache>,
    use_cache: bool,
}

impl DiscoveryContext {
    pub fn new(matcher: LicenseMatcher, cache: LicenseCache, use_cache: bool) -> Self {
        Self {
            matcher,
            cache: Mutex::new(cache),
            use_cache,
        }
    }

    /// Resolve one package's licenses: consult the cache, then fall back
    /// to `raw_licenses` and normalize whatever it yields.
    ///
    /// An empty derivation becomes `{Unknown}` and is not cached, so a
    /// later run (or a populated metadata source) can still improve on
    /// it. Non-empty results are normalized through the matcher and
    /// written back to the cache.
    pub fn resolve(
        &self,
        package: &str,
        raw_licenses: impl FnOnce() -> BTreeSet<String>,
    ) -> BTreeSet<String> {
        if self.use_cache {
            if let Some(hit) = self.cache.lock().unwrap().get(package, None) {
                return hit.into_iter().collect();
            }
        }

        let raw = raw_licenses();
        if raw.is_empty() {
            return BTreeSet::from([UNKNOWN_LICENSE.to_string()]);
        }

        let normalized = self.matcher.normalize_license_set(&raw);
        if self.use_cache {
            let list: Vec<String> = normalized.iter().cloned().collect();
            self.cache.lock().unwrap().set(package, &list, None);
        }
        normalized
    }
}

/// Trait for ecosystem backends.
///
/// Each implementation covers a single packaging ecosystem (python, npm,
/// ...). The lifecycle is:
///
/// 1. The backend is instantiated unconditionally with the project
///    directory and the shared [`DiscoveryContext`].
/// 2. [`Ecosystem::is_available()`] is called to check whether the
///    ecosystem's manifest exists in this project.
/// 3. If available, [`Ecosystem::discover()`] enumerates the declared
///    dependencies and their licenses, and
///    [`Ecosystem::load_settings()`] may contribute an
///    ecosystem-embedded license policy.
pub trait Ecosystem {
    /// A stable, lowercase identifier for this ecosystem.
    ///
    /// Used as a key in reports and the `--lang` filter, so it must not
    /// change between releases.
    fn name(&self) -> &str;

    /// Returns `true` if this ecosystem's manifest is present in the
    /// project directory. Must be cheap; limited to existence checks.
    fn is_available(&self) -> bool;

    /// Enumerate the project's dependencies with their detected licenses.
    ///
    /// A dependency whose license cannot be derived is reported with
    /// `{Unknown}` rather than dropped; one package's failure never
    /// aborts the rest of the batch.
    ///
    /// # Errors
    ///
    /// Returns an error only when the manifest itself cannot be read or
    /// parsed. The caller logs the error and continues with other
    /// backends.
    fn discover(&self) -> Result<DependencyMap>;

    /// Policy settings embedded in the ecosystem's own manifest, when the
    /// project carries them (e.g. `[tool.licheck]` in `pyproject.toml`).
    fn load_settings(&self) -> Result<Option<PolicySettings>>;
}

/// Every known backend for a project directory, available or not.
pub fn all_ecosystems<'a>(
    project_dir: &Path,
    ctx: &'a DiscoveryContext,
) -> Vec<Box<dyn Ecosystem + 'a>> {
    vec![
        Box::new(PythonEcosystem::new(project_dir, ctx)),
        Box::new(NpmEcosystem::new(project_dir, ctx)),
    ]
}

/// The subset of backends whose ecosystem is present in the project.
pub fn active_ecosystems<'a>(
    project_dir: &Path,
    ctx: &'a DiscoveryContext,
) -> Vec<Box<dyn Ecosystem + 'a>> {
    all_ecosystems(project_dir, ctx)
        .into_iter()
        .filter(|e| e.is_available())
        .collect()
}
