// SPDX-License-Identifier: GPL-3.0-or-later

//! SPDX license expression decomposition.
//!
//! Flattens boolean SPDX expressions like `MIT OR Apache-2.0` into their
//! individual license identifiers. The logical operators are treated purely
//! as separators: `AND` is not evaluated as a conjunction requirement, and
//! `WITH` exceptions are split off as independent tokens. Parentheses are
//! cosmetic and nesting is ignored.

/// SPDX operators, in the order they are split on (case-insensitive).
const OPERATORS: [&str; 3] = ["OR", "AND", "WITH"];

/// Parse an SPDX expression into individual license identifiers.
///
/// Tokens are returned in the order encountered, without deduplication.
/// A trailing `+` is rewritten to the `-or-later` form (`GPL-2.0+` becomes
/// `GPL-2.0-or-later`). Empty or whitespace-only input yields an empty vec.
///
/// Unparseable fragments come back as literal tokens; this never fails.
pub fn parse(expression: &str) -> Vec<String> {
    if expression.is_empty() {
        return Vec::new();
    }

    // Parentheses are grouping sugar only
    let expression = expression.replace(['(', ')'], " ");

    let mut tokens = vec![expression];
    for op in OPERATORS {
        tokens = tokens
            .iter()
            .flat_map(|token| split_on_operator(token, op))
            .collect();
    }

    let mut licenses = Vec::new();
    for token in &tokens {
        let token = token.trim();
        if token.is_empty() || OPERATORS.iter().any(|op| token.eq_ignore_ascii_case(op)) {
            continue;
        }
        if let Some(stem) = token.strip_suffix('+') {
            licenses.push(format!("{}-or-later", stem.trim()));
        } else {
            licenses.push(token.to_string());
        }
    }

    licenses
}

/// Split `text` on every occurrence of `op` that is surrounded by
/// whitespace on both sides (case-insensitive).
///
/// An operator at the very start or end of the string is not a separator;
/// the final filtering in [`parse`] drops such bare operator tokens.
fn split_on_operator(text: &str, op: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let end = i + op.len();
        if let Some(candidate) = text.get(i..end) {
            let preceded = i > 0 && bytes[i - 1].is_ascii_whitespace();
            let followed = end < bytes.len() && bytes[end].is_ascii_whitespace();
            if preceded && followed && candidate.eq_ignore_ascii_case(op) {
                parts.push(text[start..i].to_string());
                i = end + 1;
                start = i;
                continue;
            }
        }
        i += 1;
    }

    parts.push(text[start..].to_string());
    parts
}
