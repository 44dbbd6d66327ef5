//! Table and database name validation.
//!
//! Identifiers cannot be bound as statement parameters, so every name that is
//! spliced into statement text goes through [`validate_identifier`] first and is
//! then double-quoted with [`quote_identifier`].

use crate::{Error, Result};
use thiserror::Error as ThisError;

/// Characters that are never accepted in a table or database name.
const ILLEGAL_CHARS: &[char] = &[' ', ';'];

/// Reason an identifier was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
    /// The name was the empty string.
    #[error("empty")]
    Empty,
    /// The name contained a disallowed character.
    #[error("illegal character {0:?}")]
    IllegalCharacter(char),
}

/// Validates a table or database name.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] if the name is empty or contains a
/// space or semicolon.
///
/// # Examples
///
/// ```
/// use sqlkv::validate_identifier;
///
/// assert!(validate_identifier("a_b-2").is_ok());
/// assert!(validate_identifier("a;b").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<()> {
    check(name).map_err(|reason| Error::InvalidIdentifier {
        name: name.to_string(),
        reason,
    })
}

fn check(name: &str) -> std::result::Result<(), IdentifierError> {
    if name.is_empty() {
        return Err(IdentifierError::Empty);
    }
    match name.chars().find(|c| ILLEGAL_CHARS.contains(c)) {
        Some(c) => Err(IdentifierError::IllegalCharacter(c)),
        None => Ok(()),
    }
}

/// Double-quotes an already validated identifier, doubling embedded quotes.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("abc" ; "plain")]
    #[test_case("a_b-2" ; "underscore and dash")]
    #[test_case("Users" ; "mixed case")]
    #[test_case("日志" ; "unicode")]
    fn test_valid_identifiers(name: &str) {
        assert!(validate_identifier(name).is_ok());
    }

    #[test_case("", IdentifierError::Empty ; "empty")]
    #[test_case("a b", IdentifierError::IllegalCharacter(' ') ; "space")]
    #[test_case("a;b", IdentifierError::IllegalCharacter(';') ; "semicolon")]
    #[test_case("t;drop table x", IdentifierError::IllegalCharacter(';') ; "injection")]
    fn test_invalid_identifiers(name: &str, expected: IdentifierError) {
        let result = validate_identifier(name);
        assert!(
            matches!(result, Err(Error::InvalidIdentifier { reason, .. }) if reason == expected),
            "expected {expected:?} for {name:?}"
        );
    }

    #[test]
    fn test_semicolon_found_after_valid_prefix() {
        // Every illegal character must be checked, not just the first one.
        assert!(validate_identifier("abc;").is_err());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
