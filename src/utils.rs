/// Pull the first digest out of checksum-file text. Accepted line shapes:
/// - a single hex token
/// - "<hash>  <filename>" (sha256sum style)
/// - "<filename> <hash>"
pub fn parse_first_hash_from_text(s: &str) -> Option<String> {
    for line in s.lines() {
        let t = line.trim();
        if t.is_empty() || t.starts_with('#') { continue; }
        let tokens: Vec<&str> = t.split_whitespace().collect();
        if tokens.len() == 1 && is_hex(tokens[0]) {
            return Some(tokens[0].to_ascii_lowercase());
        }
        for &tok in &tokens {
            // sha256sum marks binary mode with a leading '*' on the filename, not the hash
            if is_hex(tok) && tok.len() >= 16 {
                return Some(tok.to_ascii_lowercase());
            }
        }
    }
    None
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Trim, drop an "algo:" prefix, lowercase.
pub fn normalize_digest(s: &str) -> String {
    let t = s.trim();
    let t = match t.rsplit_once(':') {
        Some((_, rest)) => rest.trim(),
        None => t,
    };
    t.to_ascii_lowercase()
}

pub fn digests_match(computed: &str, reference: &str) -> bool {
    let reference = normalize_digest(reference);
    !reference.is_empty() && normalize_digest(computed) == reference
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_hash() {
        assert_eq!(
            parse_first_hash_from_text("\n  D41D8CD98F00B204E9800998ECF8427E \n"),
            Some("d41d8cd98f00b204e9800998ecf8427e".to_string())
        );
    }

    #[test]
    fn parses_checksum_tool_lines() {
        let sums = "# generated\nba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad *abc.txt\n";
        assert_eq!(
            parse_first_hash_from_text(sums),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad".to_string())
        );
        assert_eq!(
            parse_first_hash_from_text("abc.txt 900150983cd24fb0d6963f7d28e17f72"),
            Some("900150983cd24fb0d6963f7d28e17f72".to_string())
        );
    }

    #[test]
    fn nothing_hash_like() {
        assert_eq!(parse_first_hash_from_text("hello world\nreadme"), None);
        assert_eq!(parse_first_hash_from_text(""), None);
    }

    #[test]
    fn compares_normalized_digests() {
        assert!(digests_match("abcdef", "  ABCDEF\n"));
        assert!(digests_match("abcdef", "sha256:ABCDEF"));
        assert!(!digests_match("abcdef", "abcde0"));
        assert!(!digests_match("", ""));
    }
}
