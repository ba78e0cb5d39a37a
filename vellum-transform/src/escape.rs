//! Argument escaping for the converter process boundary.
//!
//! Markup is passed to the converter as a single process argument. Quote and
//! backslash characters are escaped on this side and unescaped by the
//! converter script, so the dialect source survives the boundary byte for
//! byte. [`unescape_argument`] is the exact inverse and doubles as the
//! reference for what the scripts implement.

/// Escape `"`, `'`, and `\` with a leading backslash.
pub fn escape_argument(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '"' | '\'' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Inverse of [`escape_argument`]. A backslash not followed by an escapable
/// character passes through unchanged.
pub fn unescape_argument(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(&next) if matches!(next, '"' | '\'' | '\\') => {
                    out.push(next);
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape_argument(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_argument("it's"), r"it\'s");
        assert_eq!(escape_argument(r"c:\path"), r"c:\\path");
    }

    #[test]
    fn round_trips_mixed_input() {
        let original = r#"<p class="x">don't \ escape {a["b"]}</p>"#;
        assert_eq!(unescape_argument(&escape_argument(original)), original);
    }

    #[test]
    fn plain_markup_is_untouched() {
        let markup = "<p>hello</p>";
        assert_eq!(escape_argument(markup), markup);
        assert_eq!(unescape_argument(markup), markup);
    }

    #[test]
    fn stray_backslash_survives_unescape() {
        assert_eq!(unescape_argument(r"a\n"), r"a\n");
    }
}
