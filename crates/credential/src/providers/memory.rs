//! In-memory collaborators
//!
//! Back local runs and end-to-end tests. Each one records enough history to
//! assert on ordering and failure isolation, and exposes switches to inject
//! failures.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

use crate::core::{SecretRef, Tags};
use crate::rotation::NEW_PASSWORD_PARAM;
use crate::traits::{
    DataService, LeaseGuard, LeaseProvider, LockError, NewSecretVersion, SecretStore,
    ServiceConnection, ServiceEndpoint, ServiceError, Statement, StoreError, StoredSecret,
    TargetConfigStore, TargetError,
};

fn copy_secret(value: &SecretString) -> SecretString {
    SecretString::from(value.expose_secret().to_owned())
}

// ---------------------------------------------------------------------------
// Secret store
// ---------------------------------------------------------------------------

/// One immutable version held by [`MemorySecretStore`]
#[derive(Debug)]
pub struct MemoryVersion {
    pub id: String,
    pub value: SecretString,
    pub tags: Tags,
    pub expires_on: Option<DateTime<Utc>>,
    pub created_on: DateTime<Utc>,
}

impl MemoryVersion {
    fn snapshot(&self) -> Self {
        Self {
            id: self.id.clone(),
            value: copy_secret(&self.value),
            tags: self.tags.clone(),
            expires_on: self.expires_on,
            created_on: self.created_on,
        }
    }
}

/// Versioned secret store; names compare case-insensitively
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: DashMap<String, Vec<MemoryVersion>>,
    next_version: AtomicU64,
    failing_sets: AtomicU32,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a version; returns its id
    pub fn insert(&self, secret: &SecretRef, value: &str, tags: Tags) -> String {
        self.append(secret, SecretString::from(value.to_owned()), tags, None)
    }

    /// Make the next `count` writes fail
    pub fn fail_next_sets(&self, count: u32) {
        self.failing_sets.store(count, Ordering::SeqCst);
    }

    /// Number of versions of `secret`
    pub fn version_count(&self, secret: &SecretRef) -> usize {
        self.secrets
            .get(&secret.lease_key())
            .map(|versions| versions.len())
            .unwrap_or(0)
    }

    /// Snapshot of the current version
    pub fn latest(&self, secret: &SecretRef) -> Option<MemoryVersion> {
        self.secrets
            .get(&secret.lease_key())
            .and_then(|versions| versions.last().map(MemoryVersion::snapshot))
    }

    fn append(
        &self,
        secret: &SecretRef,
        value: SecretString,
        tags: Tags,
        expires_on: Option<DateTime<Utc>>,
    ) -> String {
        let id = format!("{:032x}", self.next_version.fetch_add(1, Ordering::SeqCst) + 1);
        self.secrets
            .entry(secret.lease_key())
            .or_default()
            .push(MemoryVersion {
                id: id.clone(),
                value,
                tags,
                expires_on,
                created_on: Utc::now(),
            });
        id
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, secret: &SecretRef) -> Result<StoredSecret, StoreError> {
        let latest = self.latest(secret).ok_or_else(|| StoreError::NotFound {
            secret: secret.to_string(),
        })?;

        Ok(StoredSecret {
            value: latest.value,
            tags: latest.tags,
            expires_on: latest.expires_on,
            version: Some(latest.id),
        })
    }

    async fn set(
        &self,
        secret: &SecretRef,
        version: NewSecretVersion,
    ) -> Result<String, StoreError> {
        let failing = self
            .failing_sets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Backend("injected write failure".into()));
        }

        Ok(self.append(
            secret,
            version.value,
            version.tags,
            Some(version.expires_on),
        ))
    }
}

// ---------------------------------------------------------------------------
// Data service
// ---------------------------------------------------------------------------

static ALTER_LOGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ALTER LOGIN \[((?:[^\]]|\]\])+)\] WITH PASSWORD = (@\w+)$").unwrap()
});

struct LoginRecord {
    password: SecretString,
    changed_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct ServiceState {
    logins: DashMap<(String, String), LoginRecord>,
    unreachable: Mutex<HashSet<String>>,
    fail_statements: AtomicBool,
    executed: Mutex<Vec<String>>,
}

/// Data service keyed by `(host, login)`
///
/// Understands the login-alteration statement only.
#[derive(Clone, Default)]
pub struct MemoryDataService {
    state: Arc<ServiceState>,
}

impl MemoryDataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or reset a login
    pub fn add_login(&self, host: &str, login: &str, password: &str) {
        self.state.logins.insert(
            (host.to_ascii_lowercase(), login.to_string()),
            LoginRecord {
                password: SecretString::from(password.to_owned()),
                changed_at: None,
            },
        );
    }

    /// Refuse connections to `host`
    pub fn set_unreachable(&self, host: &str) {
        self.state.unreachable.lock().insert(host.to_ascii_lowercase());
    }

    /// Make every statement fail
    pub fn fail_statements(&self, fail: bool) {
        self.state.fail_statements.store(fail, Ordering::SeqCst);
    }

    /// Current password of a login
    pub fn password(&self, host: &str, login: &str) -> Option<SecretString> {
        self.state
            .logins
            .get(&(host.to_ascii_lowercase(), login.to_string()))
            .map(|record| copy_secret(&record.password))
    }

    /// When the login's password last changed
    pub fn password_changed_at(&self, host: &str, login: &str) -> Option<DateTime<Utc>> {
        self.state
            .logins
            .get(&(host.to_ascii_lowercase(), login.to_string()))
            .and_then(|record| record.changed_at)
    }

    /// SQL text of every executed statement, in order
    pub fn executed(&self) -> Vec<String> {
        self.state.executed.lock().clone()
    }
}

#[async_trait]
impl DataService for MemoryDataService {
    async fn connect(
        &self,
        endpoint: &ServiceEndpoint,
    ) -> Result<Box<dyn ServiceConnection>, ServiceError> {
        let host = endpoint.host.to_ascii_lowercase();
        if self.state.unreachable.lock().contains(&host) {
            return Err(ServiceError::Unreachable {
                host: endpoint.host.clone(),
                reason: "connection refused".into(),
            });
        }

        let authenticated = self
            .state
            .logins
            .get(&(host.clone(), endpoint.login.to_string()))
            .is_some_and(|record| {
                record.password.expose_secret() == endpoint.password.expose_secret()
            });
        if !authenticated {
            return Err(ServiceError::AuthenticationFailed {
                host: endpoint.host.clone(),
                login: endpoint.login.to_string(),
            });
        }

        Ok(Box::new(MemoryConnection {
            state: self.state.clone(),
            host,
        }))
    }
}

struct MemoryConnection {
    state: Arc<ServiceState>,
    host: String,
}

#[async_trait]
impl ServiceConnection for MemoryConnection {
    async fn execute(&mut self, statement: &Statement) -> Result<u64, ServiceError> {
        self.state.executed.lock().push(statement.sql.clone());

        if self.state.fail_statements.load(Ordering::SeqCst) {
            return Err(ServiceError::Statement("injected statement failure".into()));
        }

        let captures = ALTER_LOGIN
            .captures(&statement.sql)
            .ok_or_else(|| ServiceError::Statement(format!("unsupported statement: {}", statement.sql)))?;
        let login = captures[1].replace("]]", "]");
        let param = &captures[2];
        if param != NEW_PASSWORD_PARAM {
            return Err(ServiceError::Statement(format!("unexpected parameter {param}")));
        }
        let password = statement
            .param(param)
            .ok_or_else(|| ServiceError::Statement(format!("parameter {param} not bound")))?;

        let mut record = self
            .state
            .logins
            .get_mut(&(self.host.clone(), login.clone()))
            .ok_or_else(|| ServiceError::Statement(format!("login `{login}` does not exist")))?;
        record.password = copy_secret(password);
        record.changed_at = Some(Utc::now());
        Ok(1)
    }

    async fn close(self: Box<Self>) -> Result<(), ServiceError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dependent targets
// ---------------------------------------------------------------------------

/// Configuration entries keyed by `(target, entry)`
#[derive(Default)]
pub struct MemoryTargetStore {
    entries: DashMap<(String, String), SecretString>,
    failing: Mutex<HashSet<String>>,
    writes: Mutex<Vec<String>>,
}

impl MemoryTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entry(&self, target: &str, entry: &str, value: &str) {
        self.entries.insert(
            (target.to_string(), entry.to_string()),
            SecretString::from(value.to_owned()),
        );
    }

    pub fn entry(&self, target: &str, entry: &str) -> Option<SecretString> {
        self.entries
            .get(&(target.to_string(), entry.to_string()))
            .map(|value| copy_secret(&value))
    }

    /// Make every read and write against `target` fail
    pub fn fail_target(&self, target: &str) {
        self.failing.lock().insert(target.to_string());
    }

    /// Targets written to, in order
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().clone()
    }

    fn check(&self, target: &str) -> Result<(), TargetError> {
        if self.failing.lock().contains(target) {
            Err(TargetError::Backend(format!("injected failure for `{target}`")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TargetConfigStore for MemoryTargetStore {
    async fn read_config_entry(
        &self,
        target: &str,
        entry: &str,
    ) -> Result<Option<SecretString>, TargetError> {
        self.check(target)?;
        Ok(self.entry(target, entry))
    }

    async fn write_config_entry(
        &self,
        target: &str,
        entry: &str,
        value: &SecretString,
    ) -> Result<(), TargetError> {
        self.check(target)?;
        self.entries
            .insert((target.to_string(), entry.to_string()), copy_secret(value));
        self.writes.lock().push(target.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Leases
// ---------------------------------------------------------------------------

struct LeaseEntry {
    token: u64,
    expires_at: tokio::time::Instant,
}

/// Process-local leases with expiry
#[derive(Clone, Default)]
pub struct MemoryLeaseProvider {
    leases: Arc<DashMap<String, LeaseEntry>>,
    next_token: Arc<AtomicU64>,
}

impl MemoryLeaseProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently held
    pub fn is_held(&self, key: &str) -> bool {
        self.leases
            .get(key)
            .is_some_and(|entry| entry.expires_at > tokio::time::Instant::now())
    }
}

#[async_trait]
impl LeaseProvider for MemoryLeaseProvider {
    async fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<Box<dyn LeaseGuard>>, LockError> {
        let now = tokio::time::Instant::now();
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);

        let mut acquired = false;
        self.leases
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.expires_at <= now {
                    entry.token = token;
                    entry.expires_at = now + ttl;
                    acquired = true;
                }
            })
            .or_insert_with(|| {
                acquired = true;
                LeaseEntry {
                    token,
                    expires_at: now + ttl,
                }
            });

        if !acquired {
            return Ok(None);
        }

        Ok(Some(Box::new(MemoryLeaseGuard {
            leases: self.leases.clone(),
            key: key.to_string(),
            token,
            released: false,
        })))
    }
}

struct MemoryLeaseGuard {
    leases: Arc<DashMap<String, LeaseEntry>>,
    key: String,
    token: u64,
    released: bool,
}

impl MemoryLeaseGuard {
    /// Remove the entry if it is still ours; false when it expired and moved on
    fn remove_own(&mut self) -> bool {
        self.released = true;
        self.leases
            .remove_if(&self.key, |_, entry| entry.token == self.token)
            .is_some()
    }
}

#[async_trait]
impl LeaseGuard for MemoryLeaseGuard {
    async fn renew(&self, ttl: Duration) -> Result<(), LockError> {
        match self.leases.get_mut(&self.key) {
            Some(mut entry) if entry.token == self.token => {
                entry.expires_at = tokio::time::Instant::now() + ttl;
                Ok(())
            }
            _ => Err(LockError::Lost),
        }
    }

    async fn release(mut self: Box<Self>) -> Result<(), LockError> {
        if self.remove_own() {
            Ok(())
        } else {
            Err(LockError::Lost)
        }
    }
}

impl Drop for MemoryLeaseGuard {
    fn drop(&mut self) {
        if !self.released {
            self.remove_own();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LoginName;
    use crate::rotation::alter_login_statement;

    fn secret() -> SecretRef {
        SecretRef::parse("vault", "db-secret").unwrap()
    }

    #[tokio::test]
    async fn store_appends_versions() {
        let store = MemorySecretStore::new();
        let first = store.insert(&secret(), "one", Tags::new());

        let second = store
            .set(
                &secret(),
                NewSecretVersion {
                    value: SecretString::from("two"),
                    tags: Tags::new(),
                    expires_on: Utc::now(),
                },
            )
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(store.version_count(&secret()), 2);
        let current = store.get(&SecretRef::parse("VAULT", "DB-Secret").unwrap()).await.unwrap();
        assert_eq!(current.value.expose_secret(), "two");
        assert_eq!(current.version.as_deref(), Some(second.as_str()));
    }

    #[tokio::test]
    async fn injected_write_failures_are_consumed() {
        let store = MemorySecretStore::new();
        store.fail_next_sets(1);
        let version = || NewSecretVersion {
            value: SecretString::from("x"),
            tags: Tags::new(),
            expires_on: Utc::now(),
        };

        assert!(store.set(&secret(), version()).await.is_err());
        assert!(store.set(&secret(), version()).await.is_ok());
    }

    #[tokio::test]
    async fn service_applies_alter_login() {
        let service = MemoryDataService::new();
        service.add_login("db.example", "app_user", "old");
        let endpoint = ServiceEndpoint {
            host: "db.example".into(),
            login: LoginName::new("app_user").unwrap(),
            password: SecretString::from("old"),
        };

        let mut connection = service.connect(&endpoint).await.unwrap();
        let statement = alter_login_statement(&endpoint.login, &SecretString::from("new"));
        connection.execute(&statement).await.unwrap();

        assert_eq!(
            service.password("db.example", "app_user").unwrap().expose_secret(),
            "new"
        );
        assert!(service.password_changed_at("db.example", "app_user").is_some());
        assert!(service.connect(&endpoint).await.is_err());
    }

    #[tokio::test]
    async fn lease_is_exclusive_until_released() {
        let leases = MemoryLeaseProvider::new();
        let ttl = Duration::from_secs(60);

        let guard = leases.try_acquire("k", ttl).await.unwrap().unwrap();
        assert!(leases.try_acquire("k", ttl).await.unwrap().is_none());
        assert!(leases.try_acquire("other", ttl).await.unwrap().is_some());

        guard.release().await.unwrap();
        assert!(leases.try_acquire("k", ttl).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn dropped_guard_releases_lease() {
        let leases = MemoryLeaseProvider::new();
        let ttl = Duration::from_secs(60);

        {
            let _guard = leases.try_acquire("k", ttl).await.unwrap().unwrap();
            assert!(leases.is_held("k"));
        }
        assert!(!leases.is_held("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_lease_can_be_taken_over() {
        let leases = MemoryLeaseProvider::new();

        let stale = leases
            .try_acquire("k", Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        tokio::time::advance(Duration::from_millis(20)).await;

        let fresh = leases.try_acquire("k", Duration::from_secs(60)).await.unwrap();
        assert!(fresh.is_some());
        assert_eq!(stale.release().await, Err(LockError::Lost));
        assert!(leases.is_held("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn renewed_lease_outlives_its_first_ttl() {
        let leases = MemoryLeaseProvider::new();
        let ttl = Duration::from_secs(10);

        let guard = leases.try_acquire("k", ttl).await.unwrap().unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        guard.renew(ttl).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        assert!(leases.is_held("k"));
        assert!(leases.try_acquire("k", ttl).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn renew_fails_after_takeover() {
        let leases = MemoryLeaseProvider::new();

        let stale = leases
            .try_acquire("k", Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        tokio::time::advance(Duration::from_millis(20)).await;
        let _fresh = leases
            .try_acquire("k", Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(stale.renew(Duration::from_secs(60)).await, Err(LockError::Lost));
    }
}
