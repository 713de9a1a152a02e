use std::sync::LazyLock;

use regex::Regex;

/// Narrow "this line closes an entry" test: `(01202) 525072` or `0207 1234567`.
static BOUNDARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*\d+\s*\)\s*\d+|\b0\d{2,4}[\s-]+\d{5,8}\b").unwrap()
});

/// Split extracted text into one blob per directory entry.
///
/// Lines are accumulated (space-joined) until a line carries a phone number,
/// which closes the current entry. Trailing lines with no phone line still
/// form a final blob.
pub fn split_entries(text: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(line);

        if BOUNDARY_RE.is_match(line) {
            entries.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        entries.push(current);
    }

    entries
}
