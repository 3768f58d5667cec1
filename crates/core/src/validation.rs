use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("email pattern compiles"));

/// Field validation failures reported back to API clients verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name is required")]
    NameRequired,
    #[error("Email is required")]
    EmailRequired,
    #[error("Invalid email format")]
    InvalidEmail,
}

/// Returns `true` when `value` looks like `local-part@domain.tld`.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimal_address() {
        assert!(is_valid_email("a@b.c"));
        assert!(is_valid_email("new@example.com"));
        assert!(is_valid_email("first.last@mail.example.co.uk"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for value in [
            "invalid-email",
            "@example.com",
            "user@",
            "user@example",
            "user@@example.com",
            "a@b@c.d",
            "user@example.",
        ] {
            assert!(!is_valid_email(value), "{value} should be rejected");
        }
    }

    #[test]
    fn messages_match_api_contract() {
        assert_eq!(ValidationError::NameRequired.to_string(), "Name is required");
        assert_eq!(ValidationError::EmailRequired.to_string(), "Email is required");
        assert_eq!(ValidationError::InvalidEmail.to_string(), "Invalid email format");
    }
}
