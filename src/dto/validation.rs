//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a team identifier is a non-empty string of ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_team_id("101") // Ok
/// validate_team_id("")    // Err - empty
/// validate_team_id("10a") // Err - not a digit
/// ```
pub fn validate_team_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        let mut err = ValidationError::new("team_id_empty");
        err.message = Some("Team number must not be empty".into());
        return Err(err);
    }

    if !id.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("team_id_format");
        err.message = Some("Team number must contain only digits".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_team_id_valid() {
        assert!(validate_team_id("101").is_ok());
        assert!(validate_team_id("0").is_ok());
        assert!(validate_team_id("000123").is_ok());
    }

    #[test]
    fn test_validate_team_id_empty() {
        assert!(validate_team_id("").is_err());
    }

    #[test]
    fn test_validate_team_id_invalid_format() {
        assert!(validate_team_id("10a").is_err());
        assert!(validate_team_id(" 101").is_err()); // leading space
        assert!(validate_team_id("-1").is_err());
        assert!(validate_team_id("١٠١").is_err()); // non-ASCII digits
    }
}
