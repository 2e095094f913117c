// SPDX-License-Identifier: GPL-3.0-or-later

//! Report generation in multiple output formats.

pub mod json;
pub mod terminal;

use crate::validator::{Classification, ValidationResult};

/// Status mark for a classification, as shown in terminal output.
pub fn classification_mark(classification: Classification) -> &'static str {
    match classification {
        Classification::Allowed => "\u{2714}", // ✔
        Classification::Error => "\u{2716}",   // ✖
        Classification::Warning => "\u{203C}", // ‼
        Classification::Skip => "s",
    }
}

/// Where a validated package ended up, looked up from the result sets.
pub fn classification_of(result: &ValidationResult, name: &str) -> Classification {
    if result.skipped.contains(name) {
        Classification::Skip
    } else if result.errors.contains(name) {
        Classification::Error
    } else if result.warnings.contains(name) {
        Classification::Warning
    } else {
        Classification::Allowed
    }
}

/// One-line verdict for the end of a report.
pub fn verdict_line(result: &ValidationResult) -> &'static str {
    if result.has_errors() {
        "License compliance check failed."
    } else if result.has_warnings() {
        "License compliance warning."
    } else {
        "License compliance successful."
    }
}
