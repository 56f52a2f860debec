//! Basename extraction from a URL path.

/// Returns the final path segment of `input`.
///
/// When `input` parses as an absolute URL only its path is considered, so the
/// query string and fragment never reach the filename. Anything else is taken
/// as a plain path. A trailing separator yields an empty basename.
pub fn basename_of(input: &str) -> String {
    let path = match url::Url::parse(input) {
        Ok(parsed) if !parsed.cannot_be_a_base() => parsed.path().to_string(),
        _ => input.to_string(),
    };
    match path.rfind('/') {
        Some(idx) => path[idx + 1..].to_string(),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal() {
        assert_eq!(basename_of("https://example.com/a/b/file.png"), "file.png");
        assert_eq!(basename_of("https://example.com/single"), "single");
    }

    #[test]
    fn root_or_trailing_slash() {
        assert_eq!(basename_of("https://example.com/"), "");
        assert_eq!(basename_of("https://example.com/dir/"), "");
    }

    #[test]
    fn with_query() {
        assert_eq!(basename_of("https://example.com/file.png?token=abc"), "file.png");
    }

    #[test]
    fn plain_path() {
        assert_eq!(basename_of("staging/rock_arm_4k.png"), "rock_arm_4k.png");
        assert_eq!(basename_of("rock_arm_4k.png"), "rock_arm_4k.png");
    }
}
