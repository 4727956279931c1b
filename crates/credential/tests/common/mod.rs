//! Shared fixtures for rotation integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keyturn_credential::core::tags;
use keyturn_credential::prelude::*;
use keyturn_credential::traits::Statement;

pub const VAULT: &str = "myvault";
pub const SECRET: &str = "db-login-secret";
pub const LOGIN: &str = "app_user";
pub const CURRENT_PASSWORD: &str = "current-password";
pub const HOST: &str = "mydb.database.windows.net";
pub const PROVIDER_ADDRESS: &str =
    "/subscriptions/x/resourceGroups/y/providers/Microsoft.Sql/servers/mydb/databases/orders";

/// In-memory collaborators wired into an orchestrator
pub struct Harness {
    pub store: Arc<MemorySecretStore>,
    pub service: MemoryDataService,
    pub targets: Arc<MemoryTargetStore>,
    pub leases: MemoryLeaseProvider,
    pub orchestrator: Arc<RotationOrchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(RotationConfig::default())
    }

    pub fn with_config(config: RotationConfig) -> Self {
        Self::build(config, None)
    }

    /// Harness whose password changes take `delay` to execute
    pub fn with_slow_service(config: RotationConfig, delay: Duration) -> Self {
        Self::build(config, Some(delay))
    }

    fn build(config: RotationConfig, delay: Option<Duration>) -> Self {
        let store = Arc::new(MemorySecretStore::new());
        let service = MemoryDataService::new();
        let targets = Arc::new(MemoryTargetStore::new());
        let leases = MemoryLeaseProvider::new();

        let data_service: Arc<dyn DataService> = match delay {
            Some(delay) => Arc::new(SlowDataService {
                inner: service.clone(),
                delay,
            }),
            None => Arc::new(service.clone()),
        };

        let orchestrator = RotationOrchestrator::builder()
            .secret_store(store.clone())
            .data_service(data_service)
            .target_store(targets.clone())
            .lease_provider(Arc::new(leases.clone()))
            .config(config)
            .build()
            .expect("valid configuration");

        Self {
            store,
            service,
            targets,
            leases,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Seed the secret and matching login with `extra` tags appended
    pub fn seed(&self, extra: &[(&str, &str)]) {
        let mut seeded = base_tags();
        for (key, value) in extra {
            seeded.insert((*key).to_string(), (*value).to_string());
        }
        self.store.insert(&secret_ref(), CURRENT_PASSWORD, seeded);
        self.service.add_login(HOST, LOGIN, CURRENT_PASSWORD);
    }

    pub fn processor(&self) -> BatchProcessor {
        BatchProcessor::new(self.orchestrator.clone())
    }
}

pub fn base_tags() -> Tags {
    let mut out = Tags::new();
    out.insert(tags::CREDENTIAL_ID.to_string(), LOGIN.to_string());
    out.insert(tags::PROVIDER_ADDRESS.to_string(), PROVIDER_ADDRESS.to_string());
    out.insert(tags::VALIDITY_PERIOD_DAYS.to_string(), "30".to_string());
    out
}

pub fn secret_ref() -> SecretRef {
    SecretRef::parse(VAULT, SECRET).expect("valid names")
}

pub fn notification() -> RotationNotification {
    RotationNotification::new(VAULT, SECRET)
}

/// Data service whose statements sleep before running
pub struct SlowDataService {
    inner: MemoryDataService,
    delay: Duration,
}

#[async_trait]
impl DataService for SlowDataService {
    async fn connect(
        &self,
        endpoint: &ServiceEndpoint,
    ) -> Result<Box<dyn ServiceConnection>, ServiceError> {
        let inner = self.inner.connect(endpoint).await?;
        Ok(Box::new(SlowConnection {
            inner,
            delay: self.delay,
        }))
    }
}

struct SlowConnection {
    inner: Box<dyn ServiceConnection>,
    delay: Duration,
}

#[async_trait]
impl ServiceConnection for SlowConnection {
    async fn execute(&mut self, statement: &Statement) -> Result<u64, ServiceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.execute(statement).await
    }

    async fn close(self: Box<Self>) -> Result<(), ServiceError> {
        self.inner.close().await
    }
}
