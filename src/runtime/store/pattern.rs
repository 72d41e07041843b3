//! Delimited key patterns: `/body/flags`.
//!
//! The first character is the delimiter. Bracket delimiters close with
//! their partner (`(..)`, `[..]`, `{..}`, `<..>`). Supported flags are
//! `i`, `m`, `s` and `x`.

use regex::{Regex, RegexBuilder};

use crate::runtime::errors::{ContainerError, ContainerResult};

fn closing_delimiter(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        other => other,
    }
}

/// Parse and compile a delimited pattern such as `/key[0-9]0/i`
pub fn parse_pattern(pattern: &str) -> ContainerResult<Regex> {
    let mut chars = pattern.chars();
    let open = chars
        .next()
        .ok_or_else(|| ContainerError::InvalidPattern("empty pattern".to_string()))?;
    if open.is_alphanumeric() || open.is_whitespace() || open == '\\' {
        return Err(ContainerError::InvalidPattern(format!(
            "delimiter must not be alphanumeric, whitespace or backslash: {:?}",
            pattern
        )));
    }

    let rest = chars.as_str();
    let close = closing_delimiter(open);
    let end = rest.rfind(close).ok_or_else(|| {
        ContainerError::InvalidPattern(format!("no ending delimiter '{}' found: {:?}", close, pattern))
    })?;
    let body = &rest[..end];
    let flags = &rest[end + close.len_utf8()..];

    let mut builder = RegexBuilder::new(body);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            unknown => {
                return Err(ContainerError::InvalidPattern(format!(
                    "unknown modifier '{}'",
                    unknown
                )))
            }
        };
    }
    builder
        .build()
        .map_err(|e| ContainerError::InvalidPattern(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_delimited() {
        let re = parse_pattern("/key[0-9]0/").unwrap();
        assert!(re.is_match("key10"));
        assert!(re.is_match("key40"));
        assert!(!re.is_match("key4"));
        assert!(!re.is_match("key11"));
    }

    #[test]
    fn test_flags() {
        assert!(parse_pattern("/KEY/i").unwrap().is_match("key"));
        assert!(parse_pattern("#^b$#m").unwrap().is_match("a\nb"));
        assert!(parse_pattern("/a b/x").unwrap().is_match("ab"));
    }

    #[test]
    fn test_bracket_delimiters() {
        assert!(parse_pattern("{k[0-9]}").unwrap().is_match("k1"));
        assert!(parse_pattern("(x)").unwrap().is_match("x"));
    }

    #[test]
    fn test_invalid_patterns() {
        for bad in ["", "abc", "/unterminated", "/a/q", "/(/", " / /"] {
            let err = parse_pattern(bad).unwrap_err();
            assert_eq!(err.kind(), "InvalidPattern", "pattern {:?}", bad);
        }
    }
}
