//! Address normalization and RFC 5322 style syntax validation
//!
//! Pure functions, no I/O. An address is trimmed and lower-cased, then split
//! at the last `@` into its local part and domain.

use regex::Regex;
use std::sync::LazyLock;

/// Shortest accepted address (`a@b.c`)
pub const MIN_ADDRESS_LENGTH: usize = 5;
/// RFC 5321 path limit minus the angle brackets
pub const MAX_ADDRESS_LENGTH: usize = 254;
pub const MAX_LOCAL_PART_LENGTH: usize = 64;

// Unquoted local parts accept dots anywhere; misplaced dots are flagged by the
// suspicious pattern heuristics instead of being rejected here.
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?i)^(?:[a-z0-9.!#$%&'*+/=?^_`{|}~-]+|"(?:[\x20\x21\x23-\x5b\x5d-\x7e]|\\[\x20-\x7e])*")"#,
        r"@",
        r"(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*",
        r"|\[(?:(?:25[0-5]|2[0-4][0-9]|1?[0-9]?[0-9])(?:\.(?:25[0-5]|2[0-4][0-9]|1?[0-9]?[0-9])){3}|ipv6:[0-9a-f:.]+)\])$",
    ))
    .expect("address grammar is a valid regex")
});

/// A normalized address with its derived parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    normalized: String,
    split: Option<usize>,
}

impl Address {
    /// Normalize raw input; never fails, malformed input simply has empty parts
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        let split = normalized.rfind('@');
        Self { normalized, split }
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn local_part(&self) -> &str {
        match self.split {
            Some(at) => &self.normalized[..at],
            None => "",
        }
    }

    pub fn domain(&self) -> &str {
        match self.split {
            Some(at) => &self.normalized[at + 1..],
            None => "",
        }
    }

    pub fn is_valid_syntax(&self) -> bool {
        is_valid_syntax(&self.normalized)
    }
}

/// Check an address against the address grammar and length limits
pub fn is_valid_syntax(raw: &str) -> bool {
    let email = raw.trim();
    let length = email.chars().count();

    if !(MIN_ADDRESS_LENGTH..=MAX_ADDRESS_LENGTH).contains(&length) {
        return false;
    }

    match email.rfind('@') {
        Some(at) if email[..at].chars().count() <= MAX_LOCAL_PART_LENGTH => {}
        _ => return false,
    }

    ADDRESS_PATTERN.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_address_normalization() {
        let address = Address::parse("  John.Doe@Example.COM \n");
        assert_eq!(address.normalized(), "john.doe@example.com");
        assert_eq!(address.local_part(), "john.doe");
        assert_eq!(address.domain(), "example.com");
    }

    #[test]
    fn test_address_without_at() {
        let address = Address::parse("no-at-sign");
        assert_eq!(address.local_part(), "");
        assert_eq!(address.domain(), "");
        assert!(!address.is_valid_syntax());
    }

    #[test]
    fn test_split_uses_last_at() {
        let address = Address::parse("\"a@b\"@example.com");
        assert_eq!(address.local_part(), "\"a@b\"");
        assert_eq!(address.domain(), "example.com");
        assert!(address.is_valid_syntax());
    }

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_syntax("user@gmail.com"));
        assert!(is_valid_syntax("a@b.c"));
        assert!(is_valid_syntax("first.last+tag@sub.example.co.uk"));
        assert!(is_valid_syntax("o'brien@example.ie"));
        assert!(is_valid_syntax("user@localhost"));
        assert!(is_valid_syntax("user@[192.168.0.1]"));
        assert!(is_valid_syntax("user@[IPv6:2001:db8::1]"));
        assert!(is_valid_syntax("\"john doe\"@example.com"));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(!is_valid_syntax(""));
        assert!(!is_valid_syntax("a@b"));
        assert!(!is_valid_syntax("plainaddress"));
        assert!(!is_valid_syntax("@example.com"));
        assert!(!is_valid_syntax("user@"));
        assert!(!is_valid_syntax("user name@example.com"));
        assert!(!is_valid_syntax("user@-example.com"));
        assert!(!is_valid_syntax("user@example-.com"));
        assert!(!is_valid_syntax("user@exa_mple.com"));
        assert!(!is_valid_syntax("user@example..com"));
        assert!(!is_valid_syntax("user@[300.1.1.1]"));
        assert!(!is_valid_syntax("a@b@example.com"));
    }

    #[test]
    fn test_length_limits() {
        let local = "a".repeat(64);
        assert!(is_valid_syntax(&format!("{local}@example.com")));

        let local = "a".repeat(65);
        assert!(!is_valid_syntax(&format!("{local}@example.com")));

        // 64 + 1 + 189 = 254
        let domain = format!("{}.{}.{}.com", "b".repeat(60), "c".repeat(60), "d".repeat(63));
        let address = format!("{}@{domain}", "a".repeat(64));
        assert_eq!(address.len(), 254);
        assert!(is_valid_syntax(&address));

        let address = format!("{}@x{domain}", "a".repeat(64));
        assert!(!is_valid_syntax(&address));
    }
}
