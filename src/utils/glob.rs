use globset::GlobBuilder;

/// Translate a glob into an anchored regular expression string.
///
/// `*` does not cross `/`, `**` does. globset emits a byte-oriented regex
/// with non-ASCII literals written as `\xNN` byte escapes; those runs are
/// turned back into escaped characters so the result compiles with the
/// unicode-aware `regex::Regex` used by validation and the backend.
pub fn glob_to_regex(glob: &str) -> Result<String, globset::Error> {
    let compiled = GlobBuilder::new(glob).literal_separator(true).build()?;
    let re = compiled.regex();
    Ok(decode_byte_escapes(re.strip_prefix("(?-u)").unwrap_or(re)))
}

fn decode_byte_escapes(re: &str) -> String {
    let mut out = String::with_capacity(re.len());
    let mut bytes: Vec<u8> = Vec::new();
    let mut chars = re.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            flush_bytes(&mut bytes, &mut out);
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            flush_bytes(&mut bytes, &mut out);
            out.push(c);
            break;
        };
        if next == 'x' {
            let hex: String = chars.clone().take(2).collect();
            if hex.len() == 2 {
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    chars.nth(1);
                    bytes.push(byte);
                    continue;
                }
            }
        }
        flush_bytes(&mut bytes, &mut out);
        out.push(c);
        out.push(next);
    }
    flush_bytes(&mut bytes, &mut out);
    out
}

fn flush_bytes(bytes: &mut Vec<u8>, out: &mut String) {
    if bytes.is_empty() {
        return;
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => out.push_str(&regex::escape(text)),
        Err(_) => {
            for byte in bytes.iter() {
                out.push_str(&format!("\\x{:02x}", byte));
            }
        }
    }
    bytes.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_star_does_not_cross_separator() {
        let re = Regex::new(&glob_to_regex("src/*.rs").unwrap()).unwrap();
        assert!(re.is_match("src/main.rs"));
        assert!(!re.is_match("src/query/parser.rs"));
    }

    #[test]
    fn test_double_star() {
        let re = Regex::new(&glob_to_regex("src/**/*.rs").unwrap()).unwrap();
        assert!(re.is_match("src/query/parser.rs"));
    }

    #[test]
    fn test_anchored() {
        let re = Regex::new(&glob_to_regex("*.go").unwrap()).unwrap();
        assert!(re.is_match("main.go"));
        assert!(!re.is_match("main.go.orig"));
    }

    #[test]
    fn test_non_ascii_literals() {
        let re = Regex::new(&glob_to_regex("café/*.rs").unwrap()).unwrap();
        assert!(re.is_match("café/a.rs"));
        assert!(!re.is_match("cafã©/a.rs"));

        let re = Regex::new(&glob_to_regex("**/日本語.md").unwrap()).unwrap();
        assert!(re.is_match("docs/日本語.md"));
    }

    #[test]
    fn test_byte_escapes_decoded() {
        assert_eq!(decode_byte_escapes(r"^caf\xc3\xa9$"), "^café$");
        assert_eq!(decode_byte_escapes(r"a\.b\\x"), r"a\.b\\x");
    }

    #[test]
    fn test_invalid_glob() {
        assert!(glob_to_regex("src/[a-").is_err());
    }
}
