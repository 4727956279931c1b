//! Data-service boundary

use std::fmt;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use crate::core::LoginName;

/// Errors reported by a data service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Host could not be reached
    #[error("data service `{host}` unreachable: {reason}")]
    Unreachable { host: String, reason: String },

    /// Credential rejected by the service
    #[error("login `{login}` failed to authenticate against `{host}`")]
    AuthenticationFailed { host: String, login: String },

    /// Statement execution failed
    #[error("statement failed: {0}")]
    Statement(String),
}

/// Where and as whom to connect
#[derive(Debug)]
pub struct ServiceEndpoint {
    /// Host name, e.g. `mydb.database.windows.net`
    pub host: String,
    /// Login to authenticate as
    pub login: LoginName,
    /// Password for the login
    pub password: SecretString,
}

/// Named statement parameter; values are always bound, never spliced
pub struct StatementParam {
    /// Parameter name as referenced in the SQL text, e.g. `@newPassword`
    pub name: String,
    /// Bound value
    pub value: SecretString,
}

impl fmt::Debug for StatementParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementParam")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// SQL text plus bound parameters
#[derive(Debug)]
pub struct Statement {
    /// SQL text
    pub sql: String,
    /// Bound parameters
    pub params: Vec<StatementParam>,
}

impl Statement {
    /// Look up a bound parameter by name
    pub fn param(&self, name: &str) -> Option<&SecretString> {
        self.params
            .iter()
            .find(|param| param.name == name)
            .map(|param| &param.value)
    }
}

/// An open, authenticated connection
#[async_trait]
pub trait ServiceConnection: Send {
    /// Execute a statement, returning the affected row count
    async fn execute(&mut self, statement: &Statement) -> Result<u64, ServiceError>;

    /// Close the connection
    async fn close(self: Box<Self>) -> Result<(), ServiceError>;
}

/// Relational data service hosting the rotated login
#[async_trait]
pub trait DataService: Send + Sync {
    /// Open a connection authenticated as `endpoint.login`
    async fn connect(
        &self,
        endpoint: &ServiceEndpoint,
    ) -> Result<Box<dyn ServiceConnection>, ServiceError>;
}
