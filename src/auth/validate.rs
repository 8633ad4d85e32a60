//! Form-level credential checks, run before any network call.

use super::AuthFlowError;

/// Minimal structural email check: one `@`, non-empty local part, and a
/// dotted domain. The identity service performs the authoritative
/// validation; this only catches obvious typos before a round trip.
pub fn email(raw: &str) -> Result<(), AuthFlowError> {
    let valid = match raw.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !raw.contains(char::is_whitespace)
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AuthFlowError::Validation(
            "Please enter a valid email address".to_string(),
        ))
    }
}

pub fn password(raw: &str) -> Result<(), AuthFlowError> {
    if raw.len() >= 8 {
        Ok(())
    } else {
        Err(AuthFlowError::Validation(
            "Password must be at least 8 characters".to_string(),
        ))
    }
}
