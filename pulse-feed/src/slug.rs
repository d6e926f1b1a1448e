//! Route slug normalization.

/// Normalizes a display label or route segment into a slug.
///
/// ASCII letters and digits are lowercased, every run of other characters
/// becomes a single `-`, and leading or trailing separators are dropped.
pub fn normalize(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}
