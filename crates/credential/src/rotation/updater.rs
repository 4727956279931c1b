//! Live password change
//!
//! The login name cannot be a statement parameter, so it is validated
//! upstream and quoted as an identifier. The password is always bound.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use super::error::{RotationError, RotationResult};
use crate::core::LoginName;
use crate::traits::{DataService, ServiceEndpoint, Statement, StatementParam};

/// Name of the bound parameter carrying the new password
pub const NEW_PASSWORD_PARAM: &str = "@newPassword";

/// Quote `name` as a bracket-delimited identifier
///
/// ```
/// use keyturn_credential::rotation::quote_identifier;
///
/// assert_eq!(quote_identifier("app_user"), "[app_user]");
/// assert_eq!(quote_identifier("odd]name"), "[odd]]name]");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Build the login-alteration statement for `login`
pub fn alter_login_statement(login: &LoginName, new_password: &SecretString) -> Statement {
    Statement {
        sql: format!(
            "ALTER LOGIN {} WITH PASSWORD = {NEW_PASSWORD_PARAM}",
            quote_identifier(login.as_str())
        ),
        params: vec![StatementParam {
            name: NEW_PASSWORD_PARAM.to_string(),
            value: SecretString::from(new_password.expose_secret().to_owned()),
        }],
    }
}

/// Applies a new password to the live login
#[derive(Clone)]
pub struct ServicePasswordUpdater {
    service: Arc<dyn DataService>,
}

impl ServicePasswordUpdater {
    pub fn new(service: Arc<dyn DataService>) -> Self {
        Self { service }
    }

    /// Connect with the current credential in `endpoint` and set `new_password`
    pub async fn update(
        &self,
        endpoint: &ServiceEndpoint,
        new_password: &SecretString,
    ) -> RotationResult<()> {
        let failed = |source| RotationError::CredentialUpdateFailed {
            login: endpoint.login.to_string(),
            source,
        };

        let mut connection = self.service.connect(endpoint).await.map_err(failed)?;
        let statement = alter_login_statement(&endpoint.login, new_password);
        let affected = connection.execute(&statement).await.map_err(failed)?;

        tracing::debug!(host = %endpoint.host, login = %endpoint.login, affected, "Login altered");

        if let Err(e) = connection.close().await {
            tracing::warn!(host = %endpoint.host, error = %e, "Connection close failed after password change");
        }
        Ok(())
    }
}
