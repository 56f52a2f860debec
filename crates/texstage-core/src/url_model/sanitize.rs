//! Cross-platform filename character replacement.

/// Characters rejected by at least one common filesystem.
pub const ILLEGAL_FILENAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replaces each illegal character with `_`. Nothing else is touched.
pub fn replace_illegal_chars(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
