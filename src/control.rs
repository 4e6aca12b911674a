//! Helpers for Debian control-file indices (`Packages`).
//!
//! An index is a sequence of stanzas separated by a blank line; each stanza
//! holds `Key: Value` lines describing one package build.

const STANZA_DELIMITER: &str = "\n\n";
const PACKAGE_PREFIX: &str = "Package: ";
const VERSION_FIELD: &str = "Version:";
const DEPENDS_FIELD: &str = "Depends:";

pub fn split_stanzas(index: &str) -> Vec<&str> {
    if index.is_empty() {
        return Vec::new();
    }

    index.split(STANZA_DELIMITER).collect()
}

/// Returns the first stanza for `name` whose version equals `version` or
/// contains it as a substring.
pub fn find_stanza<'a>(stanzas: &[&'a str], name: &str, version: &str) -> Option<&'a str> {
    let package_marker = format!("{PACKAGE_PREFIX}{name}");

    stanzas.iter().copied().find(|stanza| {
        if !stanza.contains(&package_marker) {
            return false;
        }

        match field_value(stanza, VERSION_FIELD) {
            Some(found) => found == version || found.contains(version),
            None => false,
        }
    })
}

pub fn extract_depends(stanza: &str) -> &str {
    field_value(stanza, DEPENDS_FIELD).unwrap_or_default()
}

fn field_value<'a>(stanza: &'a str, field: &str) -> Option<&'a str> {
    stanza
        .lines()
        .find_map(|line| line.strip_prefix(field))
        .map(str::trim)
}
