//! Identifier validation and quoting.
//!
//! SQL identifiers (table names, column names) cannot be passed as
//! parameters in prepared statements - only data values can be
//! parameterized. Every identifier the gateway interpolates into SQL goes
//! through [`quote`], which validates the name and applies SQL Server
//! bracket quoting with `]` doubling. Identifiers additionally get checked
//! against the introspected schema before they reach this point; quoting is
//! the last line of defense, not the only one.

use crate::error::{GatewayError, Result};

/// Maximum identifier length (SQL Server limit).
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects empty identifiers, identifiers containing null bytes, and
/// identifiers exceeding the engine's maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GatewayError::Validation(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(GatewayError::Validation(format!(
            "Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(GatewayError::Validation(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a SQL Server identifier using brackets.
///
/// Escapes closing brackets by doubling them and wraps in brackets.
/// Validates the identifier before quoting.
pub fn quote(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}

/// Qualify a table name with its schema, quoting both parts.
pub fn qualify(schema: &str, table: &str) -> Result<String> {
    Ok(format!("{}.{}", quote(schema)?, quote(table)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("Orders").is_ok());
        assert!(validate_identifier("my_table").is_ok());
        assert!(validate_identifier("Column With Spaces").is_ok());
        assert!(validate_identifier("日本語").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        let result = validate_identifier("");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        let result = validate_identifier("table\0name");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("null byte"));
    }

    #[test]
    fn test_validate_identifier_rejects_too_long() {
        let long_name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert!(validate_identifier(&long_name).is_err());
    }

    #[test]
    fn test_validate_identifier_accepts_max_length() {
        let max_name = "a".repeat(MAX_IDENTIFIER_LENGTH);
        assert!(validate_identifier(&max_name).is_ok());
    }

    #[test]
    fn test_quote_normal() {
        assert_eq!(quote("Orders").unwrap(), "[Orders]");
        assert_eq!(quote("my_table").unwrap(), "[my_table]");
    }

    #[test]
    fn test_quote_escapes_bracket() {
        assert_eq!(quote("table]name").unwrap(), "[table]]name]");
        assert_eq!(quote("a]b]c").unwrap(), "[a]]b]]c]");
    }

    #[test]
    fn test_quote_sql_injection_safely_quoted() {
        let result = quote("Robert]; DROP TABLE Students;--");
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "[Robert]]; DROP TABLE Students;--]");
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("dbo", "Orders").unwrap(), "[dbo].[Orders]");
    }

    #[test]
    fn test_qualify_rejects_invalid_parts() {
        assert!(qualify("", "Orders").is_err());
        assert!(qualify("dbo", "table\0name").is_err());
    }
}
