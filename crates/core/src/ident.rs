use crate::error::ConfigError;

/// True if `s` consists of letters, digits and underscores and does not
/// start with a digit.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Trims `s` and checks it against [`is_identifier`].
pub fn identifier(s: &str) -> Result<&str, ConfigError> {
    let t = s.trim();
    if is_identifier(t) {
        Ok(t)
    } else {
        Err(ConfigError::InvalidIdentifier { text: s.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_identifiers() {
        for s in ["A", "_x", "Druck_1", "Überschrift"] {
            assert!(is_identifier(s), "{s}");
        }
    }

    #[test]
    fn rejects_non_identifiers() {
        for s in ["", "1abc", "a-b", "a b", "x'"] {
            assert!(!is_identifier(s), "{s}");
        }
    }

    #[test]
    fn identifier_trims() {
        assert_eq!(identifier("  PrintMe \n").unwrap(), "PrintMe");
        assert!(identifier("not valid").is_err());
    }
}
