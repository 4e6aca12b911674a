//! Parser for the `Depends:` relationship field.
//!
//! ```text
//! depends := group (',' group)*
//! group   := alt ('|' alt)*
//! alt     := ws* name (version-constraint)? (arch-qualifier)? ws*
//! name    := [A-Za-z0-9+.-]+
//! ```
//!
//! Every alternative of a group is reported; constraints and architecture
//! qualifiers are dropped.

use crate::model::DependencyList;

pub fn parse_depends(expression: &str) -> DependencyList {
    let mut dependencies = DependencyList::new();

    for group in split_top_level(expression, ',') {
        for alternative in split_top_level(group, '|') {
            let Some(name) = leading_name(alternative) else {
                continue;
            };
            if !dependencies.iter().any(|known| known == name) {
                dependencies.push(name.to_string());
            }
        }
    }

    dependencies
}

/// Splits on `separator` only where it is not enclosed in `(...)`.
fn split_top_level(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (index, ch) in input.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&input[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);

    parts
}

fn leading_name(alternative: &str) -> Option<&str> {
    let trimmed = alternative.trim();
    let end = trimmed
        .find(|ch: char| !is_name_char(ch))
        .unwrap_or(trimmed.len());

    (end > 0).then(|| &trimmed[..end])
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.')
}
