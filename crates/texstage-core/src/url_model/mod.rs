//! URL modeling and staged filename derivation.
//!
//! Staged maps are named after the basename of their source URL, with
//! characters that are illegal in Windows or Unix file names replaced.

mod path;
mod sanitize;

pub use path::basename_of;
pub use sanitize::{replace_illegal_chars, ILLEGAL_FILENAME_CHARS};

/// Default filename when the URL path yields nothing usable.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Derives a filesystem-safe name from a URL (or from an already-derived name).
///
/// Takes the basename of the URL's path component (query and fragment are
/// dropped), then replaces every character in [`ILLEGAL_FILENAME_CHARS`] with
/// `_`. Applying it to its own output returns the output unchanged.
///
/// # Examples
///
/// - `sanitize_filename("https://dl.example.com/a/rock_arm_4k.png?x=1")` → `"rock_arm_4k.png"`
/// - `sanitize_filename("https://dl.example.com/")` → `"download.bin"`
pub fn sanitize_filename(url: &str) -> String {
    let base = basename_of(url);
    let sanitized = replace_illegal_chars(&base);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}
