//! Flag naming and value quoting helpers
//!
//! Pure functions shared by the argument builder and the definition registry.

const QUOTE: char = '\'';

/// Turn a bare logical name into a flag token.
///
/// Names that already start with a dash are returned unchanged. Otherwise a
/// single dash is prefixed and, unless `no_double_dash` is set, any token
/// longer than two characters becomes a long `--flag-name` form with
/// underscores converted to dashes.
///
/// ```
/// use cmdweave::utils::naming::canonicalize;
///
/// assert_eq!(canonicalize("g", false), "-g");
/// assert_eq!(canonicalize("color_test", false), "--color-test");
/// assert_eq!(canonicalize("vcodec", true), "-vcodec");
/// ```
pub fn canonicalize(name: &str, no_double_dash: bool) -> String {
    if name.starts_with('-') {
        return name.to_string();
    }

    let token = format!("-{name}");
    if !no_double_dash && token.len() > 2 {
        format!("-{}", token.replace('_', "-"))
    } else {
        token
    }
}

/// Wrap a value in single quotes unless it is empty or already quoted.
pub fn quote(value: &str) -> String {
    if value.is_empty() || is_quoted(value) {
        value.to_string()
    } else {
        format!("{QUOTE}{value}{QUOTE}")
    }
}

/// Strip one layer of single quotes added by [`quote`].
pub fn unquote(value: &str) -> &str {
    if is_quoted(value) {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with(QUOTE) && value.ends_with(QUOTE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_names_stay_single_dash() {
        assert_eq!(canonicalize("g", false), "-g");
        assert_eq!(canonicalize("y", true), "-y");
    }

    #[test]
    fn test_long_names_get_double_dash() {
        assert_eq!(canonicalize("color", false), "--color");
        assert_eq!(canonicalize("color_test", false), "--color-test");
    }

    #[test]
    fn test_double_dash_suppressed() {
        assert_eq!(canonicalize("vcodec", true), "-vcodec");
        assert_eq!(canonicalize("fake_but_ok", true), "-fake_but_ok");
    }

    #[test]
    fn test_dashed_names_unchanged() {
        assert_eq!(canonicalize("-y", false), "-y");
        assert_eq!(canonicalize("--already_long", false), "--already_long");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("libx264"), "'libx264'");
        assert_eq!(quote("'kept'"), "'kept'");
        assert_eq!(quote(""), "");
        assert_eq!(quote("'"), "'''");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'video.mp4'"), "video.mp4");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("''"), "");
    }
}
