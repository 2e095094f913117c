// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent license lookup cache.
//!
//! License derivation can be expensive (metadata scans, README parsing),
//! so results are cached on disk in a single JSON file keyed by
//! `lowercase(package)[@version]`. Entries expire after a TTL (24 hours by
//! default). There is no size bound; the cache grows with the number of
//! unique packages checked and can be compacted with [`LicenseCache::clear_expired`].
//!
//! Persistence is best-effort: a corrupt file is discarded with a warning
//! on load, and a failed save leaves the in-memory cache fully usable.
//! Every `set` rewrites the whole file, so concurrent writers are
//! last-write-wins; that is acceptable for a cache and no locking is done.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config;

/// Default time-to-live for cache entries: 24 hours.
pub const DEFAULT_TTL_SECONDS: i64 = 86_400;

const CACHE_FILE_NAME: &str = "license_cache.json";

/// One cached license lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Sorted license identifiers for deterministic persisted ordering.
    pub licenses: Vec<String>,
    /// Unix timestamp (seconds) of when the entry was stored.
    pub timestamp: i64,
    /// Version the lookup was made for, when the caller supplied one.
    #[serde(default)]
    pub version: Option<String>,
}

impl CacheEntry {
    /// Whether this entry is older than `ttl_seconds`.
    pub fn is_expired(&self, ttl_seconds: i64) -> bool {
        Utc::now().timestamp() - self.timestamp > ttl_seconds
    }
}

/// Counts returned by [`LicenseCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub expired: usize,
    pub valid: usize,
}

/// Disk-backed cache mapping packages to previously derived license sets.
pub struct LicenseCache {
    cache_file: PathBuf,
    ttl_seconds: i64,
    entries: HashMap<String, CacheEntry>,
}

impl LicenseCache {
    /// Open the cache at the default per-user location with the default TTL.
    pub fn open() -> Result<Self> {
        let dir = config::cache_dir()?;
        Ok(Self::open_dir(&dir, DEFAULT_TTL_SECONDS))
    }

    /// Open the cache under a custom directory with a custom TTL.
    ///
    /// The directory does not need to exist yet; it is created on first
    /// save. A missing or unreadable cache file yields an empty cache.
    pub fn open_dir(dir: &Path, ttl_seconds: i64) -> Self {
        let cache_file = dir.join(CACHE_FILE_NAME);
        let entries = load_entries(&cache_file);
        Self {
            cache_file,
            ttl_seconds,
            entries,
        }
    }

    /// Path of the backing JSON file.
    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// Look up a package's cached licenses.
    ///
    /// Returns `None` for unknown keys and for expired entries. An expired
    /// entry is dropped from memory only; the on-disk copy disappears with
    /// the next save.
    pub fn get(&mut self, package: &str, version: Option<&str>) -> Option<Vec<String>> {
        let key = make_key(package, version);

        let expired = self.entries.get(&key)?.is_expired(self.ttl_seconds);
        if expired {
            self.entries.remove(&key);
            return None;
        }

        self.entries.get(&key).map(|entry| entry.licenses.clone())
    }

    /// Store a package's licenses, overwriting any previous entry, and
    /// persist immediately.
    pub fn set(&mut self, package: &str, licenses: &[String], version: Option<&str>) {
        let key = make_key(package, version);
        let mut sorted: Vec<String> = licenses.to_vec();
        sorted.sort();

        self.entries.insert(
            key,
            CacheEntry {
                licenses: sorted,
                timestamp: Utc::now().timestamp(),
                version: version.map(str::to_string),
            },
        );
        self.save();
    }

    /// Remove every entry and persist the empty cache.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.save();
    }

    /// Remove expired entries, persisting once if anything was removed.
    /// Returns the number of entries removed.
    pub fn clear_expired(&mut self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl_seconds;
        self.entries.retain(|_, entry| !entry.is_expired(ttl));
        let removed = before - self.entries.len();

        if removed > 0 {
            self.save();
        }
        removed
    }

    /// Entry counts, split by expiry state. Read-only.
    pub fn stats(&self) -> CacheStats {
        let expired = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(self.ttl_seconds))
            .count();
        CacheStats {
            total: self.entries.len(),
            expired,
            valid: self.entries.len() - expired,
        }
    }

    /// Number of entries currently held, expired or not.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Write the cache to disk. Failures are warnings, not errors; the
    /// in-memory cache stays usable for the rest of the run.
    fn save(&self) {
        if let Err(e) = self.try_save() {
            eprintln!("Warning: failed to save license cache: {e}");
        }
    }

    fn try_save(&self) -> Result<()> {
        if let Some(parent) = self.cache_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.cache_file, json)?;
        Ok(())
    }
}

/// Cache key: case-folded package name, `@version`-suffixed when given.
fn make_key(package: &str, version: Option<&str>) -> String {
    let package_lower = package.to_lowercase();
    match version {
        Some(version) => format!("{package_lower}@{version}"),
        None => package_lower,
    }
}

/// Load entries from disk; a missing file is an empty cache, and a corrupt
/// one is discarded with a warning.
fn load_entries(cache_file: &Path) -> HashMap<String, CacheEntry> {
    if !cache_file.exists() {
        return HashMap::new();
    }

    let content = match fs::read_to_string(cache_file) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Warning: failed to read license cache: {e}");
            return HashMap::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Warning: discarding corrupt license cache: {e}");
            HashMap::new()
        }
    }
}
