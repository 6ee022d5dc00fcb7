//! LIKE translation, pattern compilation and the zero-value test.

use regex::Regex;

/// Translate a SQL LIKE pattern into an anchored regular expression.
///
/// `%` matches any run of characters, `_` exactly one character, and a
/// backslash makes the next `%`, `_` or `\` literal. Everything else is matched
/// literally.
pub fn like_to_regex(pattern: &str) -> String {
    let mut result = String::with_capacity(pattern.len() * 2 + 8);
    // (?s) lets the wildcards cross newlines
    result.push_str("(?s)^");

    let mut chars = pattern.chars().peekable();
    let mut buf = [0u8; 4];
    while let Some(c) = chars.next() {
        match c {
            '%' => result.push_str(".*"),
            '_' => result.push('.'),
            '\\' => match chars.peek() {
                Some(&next) if matches!(next, '%' | '_' | '\\') => {
                    chars.next();
                    result.push_str(&regex::escape(next.encode_utf8(&mut buf)));
                }
                _ => result.push_str(r"\\"),
            },
            _ => result.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }

    result.push('$');
    result
}

/// Compile a LIKE pattern
pub fn compile_like(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&like_to_regex(pattern))
}

/// Compile a REGEXP pattern; matching is unanchored
pub fn compile_regexp(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)
}

/// Whether `value` is the zero value: empty, or a number equal to 0
pub fn is_zero_value(value: &str) -> bool {
    value.is_empty() || value.parse::<f64>().is_ok_and(|n| n == 0.0)
}
