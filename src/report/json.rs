// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::classification_of;
use crate::discover::DependencyMap;
use crate::validator::{Classification, ValidationResult};

/// A JSON-serializable report of one ecosystem's validation run.
#[derive(Serialize)]
pub struct JsonReport {
    pub generated_at: DateTime<Utc>,
    pub language: String,
    pub summary: Summary,
    pub packages: Vec<PackageReport>,
}

#[derive(Serialize)]
pub struct Summary {
    pub total_checked: usize,
    pub allowed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub skipped: usize,
    pub success: bool,
}

#[derive(Serialize)]
pub struct PackageReport {
    pub name: String,
    pub licenses: Vec<String>,
    pub status: Classification,
}

/// Build the report structure from a validation run.
pub fn build_report(
    language: &str,
    dependencies: &DependencyMap,
    result: &ValidationResult,
    timestamp: DateTime<Utc>,
) -> JsonReport {
    let packages = dependencies
        .iter()
        .map(|(name, licenses)| PackageReport {
            name: name.clone(),
            licenses: licenses.iter().cloned().collect(),
            status: classification_of(result, name),
        })
        .collect();

    JsonReport {
        generated_at: timestamp,
        language: language.to_string(),
        summary: Summary {
            total_checked: result.total_checked(),
            allowed: result.allowed.len(),
            errors: result.errors.len(),
            warnings: result.warnings.len(),
            skipped: result.skipped.len(),
            success: result.is_success(),
        },
        packages,
    }
}

/// Generate a JSON report and print it to stdout.
pub fn print_json(
    language: &str,
    dependencies: &DependencyMap,
    result: &ValidationResult,
) -> Result<()> {
    let report = build_report(language, dependencies, result, Utc::now());
    let json = serde_json::to_string_pretty(&report)?;
    println!("{json}");
    Ok(())
}
