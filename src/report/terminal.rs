// SPDX-License-Identifier: GPL-3.0-or-later

use comfy_table::{ContentArrangement, Table};

use super::{classification_mark, classification_of, verdict_line};
use crate::discover::DependencyMap;
use crate::validator::ValidationResult;

/// Print a validation report for one ecosystem to stdout.
///
/// One row per dependency with its status mark and detected licenses,
/// followed by summary counts and the verdict line.
pub fn print_report(language: &str, dependencies: &DependencyMap, result: &ValidationResult) {
    if dependencies.is_empty() {
        println!("No dependencies found for {language}.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["", "Package", "Licenses"]);

    for (name, licenses) in dependencies {
        let mark = classification_mark(classification_of(result, name));
        let license_list: Vec<&str> = licenses.iter().map(String::as_str).collect();
        table.add_row(vec![mark, name.as_str(), &license_list.join("; ")]);
    }

    println!("{table}");
    println!();
    println!("{}", summary_line(result));
    println!("{}", verdict_line(result));
}

/// Counts line shown under the table.
fn summary_line(result: &ValidationResult) -> String {
    format!(
        "Checked {} dependencies: {} allowed, {} errors, {} warnings, {} skipped",
        result.total_checked(),
        result.allowed.len(),
        result.errors.len(),
        result.warnings.len(),
        result.skipped.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample_result() -> ValidationResult {
        let mut result = ValidationResult::default();
        result.allowed.insert("requests".to_string());
        result.errors.insert("copyleft-pkg".to_string());
        result.warnings.insert("mystery".to_string());
        result.skipped.insert("internal".to_string());
        result
    }

    #[test]
    fn summary_line_counts() {
        let line = summary_line(&sample_result());
        assert!(line.contains("Checked 3 dependencies"));
        assert!(line.contains("1 allowed"));
        assert!(line.contains("1 errors"));
        assert!(line.contains("1 warnings"));
        assert!(line.contains("1 skipped"));
    }

    #[test]
    fn summary_line_excludes_skipped_from_total() {
        let mut result = ValidationResult::default();
        result.skipped.insert("only-skipped".to_string());
        let line = summary_line(&result);
        assert!(line.contains("Checked 0 dependencies"));
        assert!(line.contains("1 skipped"));
    }

    #[test]
    fn print_report_handles_empty_map() {
        // Smoke test: must not panic
        print_report("python", &DependencyMap::new(), &ValidationResult::default());
    }

    #[test]
    fn print_report_smoke() {
        let mut deps = DependencyMap::new();
        deps.insert(
            "requests".to_string(),
            BTreeSet::from(["Apache-2.0".to_string()]),
        );
        print_report("python", &deps, &sample_result());
    }
}
