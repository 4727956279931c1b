//! Identifier validation rules
//!
//! Every identifier that ends up in a URL or a SQL statement passes through
//! here first. Vault and secret names follow the key-vault naming rules; login
//! names follow the SQL Server login grammar so they can be quoted as an
//! identifier.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::{IdentifierKind, ValidationError};

/// Maximum length of a data-service login name
pub const MAX_LOGIN_LENGTH: usize = 128;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+$").unwrap());

static LOGIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_@][A-Za-z0-9_@#$]*$").unwrap());

/// Validate a vault (secret store) name
pub fn validate_vault_name(value: &str) -> Result<(), ValidationError> {
    validate_name(IdentifierKind::Vault, value)
}

/// Validate a secret name
pub fn validate_secret_name(value: &str) -> Result<(), ValidationError> {
    validate_name(IdentifierKind::Secret, value)
}

/// Validate a data-service login name
///
/// # Examples
///
/// ```
/// use keyturn_credential::utils::validate_login_name;
///
/// assert!(validate_login_name("app_user").is_ok());
/// assert!(validate_login_name("@svc#1").is_ok());
/// assert!(validate_login_name("1user").is_err());
/// assert!(validate_login_name("user]; DROP LOGIN sa;--").is_err());
/// ```
pub fn validate_login_name(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(
            IdentifierKind::Login,
            value,
            "must not be empty",
        ));
    }

    if value.chars().count() > MAX_LOGIN_LENGTH {
        return Err(ValidationError::new(
            IdentifierKind::Login,
            value,
            format!("exceeds maximum length of {MAX_LOGIN_LENGTH} characters"),
        ));
    }

    if !LOGIN_PATTERN.is_match(value) {
        return Err(ValidationError::new(
            IdentifierKind::Login,
            value,
            "must start with a letter, `_` or `@` and contain only letters, digits, `_`, `@`, `#` or `$`",
        ));
    }

    Ok(())
}

fn validate_name(kind: IdentifierKind, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(kind, value, "must not be empty"));
    }

    if !NAME_PATTERN.is_match(value) {
        return Err(ValidationError::new(
            kind,
            value,
            "may only contain ASCII letters, digits and hyphens",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("myvault")]
    #[case("my-vault-01")]
    #[case("A")]
    #[case("---")]
    fn accepts_valid_vault_and_secret_names(#[case] name: &str) {
        assert!(validate_vault_name(name).is_ok());
        assert!(validate_secret_name(name).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("my_vault")]
    #[case("my vault")]
    #[case("vault.example")]
    #[case("../etc")]
    #[case("vault\n")]
    #[case("sécret")]
    fn rejects_invalid_vault_and_secret_names(#[case] name: &str) {
        let err = validate_vault_name(name).unwrap_err();
        assert_eq!(err.kind, IdentifierKind::Vault);

        let err = validate_secret_name(name).unwrap_err();
        assert_eq!(err.kind, IdentifierKind::Secret);
        assert_eq!(err.value, name);
    }

    #[rstest]
    #[case("sa")]
    #[case("_svc")]
    #[case("@login")]
    #[case("app_user#1$")]
    fn accepts_valid_logins(#[case] login: &str) {
        assert!(validate_login_name(login).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("1user")]
    #[case("#temp")]
    #[case("user-name")]
    #[case("user]")]
    #[case("user name")]
    #[case("x'; DROP LOGIN sa;--")]
    fn rejects_invalid_logins(#[case] login: &str) {
        let err = validate_login_name(login).unwrap_err();
        assert_eq!(err.kind, IdentifierKind::Login);
    }

    #[test]
    fn login_length_boundary() {
        let at_limit = format!("a{}", "b".repeat(MAX_LOGIN_LENGTH - 1));
        assert!(validate_login_name(&at_limit).is_ok());

        let over_limit = format!("a{}", "b".repeat(MAX_LOGIN_LENGTH));
        let err = validate_login_name(&over_limit).unwrap_err();
        assert!(err.reason.contains("128"));
    }
}
