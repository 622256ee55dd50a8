/// Quote a value so the query scanner reads it back as a single token.
///
/// Backslashes and double quotes are escaped, common control characters use
/// their short escapes and any other control character is written as
/// `\u{..}`.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Scan a double-quoted string at the start of `input`.
///
/// Returns the unescaped value and the number of bytes consumed, including
/// both quotes. Returns `None` if `input` does not start with `"` or the
/// closing quote is missing.
///
/// Unknown escapes are kept verbatim (`"\d+"` scans as `\d+`) so quoted
/// regular expressions survive unchanged.
pub fn scan_quoted(input: &str) -> Option<(String, usize)> {
    let mut chars = input.char_indices();
    if chars.next()?.1 != '"' {
        return None;
    }

    let mut value = String::new();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' => return Some((value, idx + 1)),
            '\\' => {
                let (_, escaped) = chars.next()?;
                match escaped {
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    'u' if chars.clone().next().map(|(_, c)| c) == Some('{') => {
                        chars.next();
                        let mut hex = String::new();
                        loop {
                            let (_, c) = chars.next()?;
                            if c == '}' {
                                break;
                            }
                            hex.push(c);
                        }
                        match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                            Some(c) => value.push(c),
                            None => {
                                value.push_str("\\u{");
                                value.push_str(&hex);
                                value.push('}');
                            }
                        }
                    }
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
            }
            c => value.push(c),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote("foo bar"), "\"foo bar\"");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\"b\\c"), r#""a\"b\\c""#);
        assert_eq!(quote("tab\there"), r#""tab\there""#);
    }

    #[test]
    fn test_scan_quoted_consumes_only_the_string() {
        let (value, used) = scan_quoted(r#""foo bar" baz"#).unwrap();
        assert_eq!(value, "foo bar");
        assert_eq!(used, 9);
    }

    #[test]
    fn test_scan_quoted_unterminated() {
        assert!(scan_quoted("\"foo").is_none());
        assert!(scan_quoted("\"foo\\").is_none());
        assert!(scan_quoted("foo").is_none());
    }

    #[test]
    fn test_scan_quoted_keeps_regex_escapes() {
        let (value, _) = scan_quoted(r#""\d+\.rs""#).unwrap();
        assert_eq!(value, r"\d+\.rs");
    }

    #[test]
    fn test_quote_then_scan() {
        for value in ["", "plain", "with \"quotes\"", "back\\slash", "line\nbreak", "bell\u{7}"] {
            let quoted = quote(value);
            let (scanned, used) = scan_quoted(&quoted).unwrap();
            assert_eq!(scanned, value);
            assert_eq!(used, quoted.len());
        }
    }
}
