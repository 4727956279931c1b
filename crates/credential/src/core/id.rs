//! Validated identifiers
//!
//! Provides [`VaultName`], [`SecretName`] and [`LoginName`] newtypes so that
//! nothing downstream of the validator ever handles an unchecked identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::ValidationError;
use crate::utils::{validate_login_name, validate_secret_name, validate_vault_name};

macro_rules! validated_name {
    ($(#[$meta:meta])* $name:ident, $validate:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap the identifier
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                $validate(&value)?;
                Ok(Self(value))
            }

            /// Borrow the identifier
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

validated_name!(
    /// Name of a secret store (vault); ASCII letters, digits and hyphens
    ///
    /// ```
    /// use keyturn_credential::VaultName;
    ///
    /// assert!(VaultName::new("prod-vault").is_ok());
    /// assert!(VaultName::new("prod.vault").is_err());
    /// ```
    VaultName,
    validate_vault_name
);

validated_name!(
    /// Name of a secret inside a vault; ASCII letters, digits and hyphens
    SecretName,
    validate_secret_name
);

validated_name!(
    /// Data-service login name, safe to quote as a SQL identifier
    LoginName,
    validate_login_name
);

/// Fully qualified reference to a secret: vault plus secret name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretRef {
    /// Vault holding the secret
    pub vault: VaultName,
    /// Secret name within the vault
    pub name: SecretName,
}

impl SecretRef {
    /// Create a reference from already validated parts
    pub fn new(vault: VaultName, name: SecretName) -> Self {
        Self { vault, name }
    }

    /// Validate raw vault and secret names
    ///
    /// The vault is checked first, matching the order in which the
    /// identifiers are used.
    pub fn parse(vault: &str, name: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            vault: VaultName::new(vault)?,
            name: SecretName::new(name)?,
        })
    }

    /// Key used for per-secret mutual exclusion
    ///
    /// Vault and secret names are case-insensitive in the store, so the key is
    /// lower-cased.
    pub fn lease_key(&self) -> String {
        format!("{}/{}", self.vault, self.name).to_ascii_lowercase()
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.vault, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IdentifierKind;

    #[test]
    fn secret_ref_parses_both_parts() {
        let secret = SecretRef::parse("myvault", "db-login-secret").unwrap();
        assert_eq!(secret.vault.as_str(), "myvault");
        assert_eq!(secret.name.as_str(), "db-login-secret");
        assert_eq!(secret.to_string(), "myvault/db-login-secret");
    }

    #[test]
    fn secret_ref_reports_vault_error_first() {
        let err = SecretRef::parse("bad vault", "bad secret").unwrap_err();
        assert_eq!(err.kind, IdentifierKind::Vault);

        let err = SecretRef::parse("vault", "bad_secret").unwrap_err();
        assert_eq!(err.kind, IdentifierKind::Secret);
    }

    #[test]
    fn lease_key_is_case_insensitive() {
        let a = SecretRef::parse("MyVault", "DB-Secret").unwrap();
        let b = SecretRef::parse("myvault", "db-secret").unwrap();
        assert_eq!(a.lease_key(), b.lease_key());
    }

    #[test]
    fn serde_rejects_invalid_login() {
        let ok: LoginName = serde_json::from_str("\"app_user\"").unwrap();
        assert_eq!(ok.as_str(), "app_user");

        let err = serde_json::from_str::<LoginName>("\"app-user\"");
        assert!(err.is_err());
    }
}
