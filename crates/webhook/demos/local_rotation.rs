//! Local webhook backed by in-memory collaborators
//!
//! ```text
//! cargo run -p keyturn-webhook --example local_rotation
//! curl -X POST localhost:7071/api/rotation -d '[{
//!   "subject": "db-login-secret",
//!   "topic": "/subscriptions/x/resourceGroups/y/providers/Microsoft.KeyVault/vaults/myvault",
//!   "data": { "Version": "abc123" }
//! }]'
//! ```

use std::sync::Arc;

use keyturn_credential::core::tags;
use keyturn_credential::prelude::*;
use keyturn_webhook::{WebhookConfig, WebhookState, serve};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = keyturn_log::init_with(keyturn_log::Config::development())?;

    let store = Arc::new(MemorySecretStore::new());
    let service = MemoryDataService::new();
    let targets = Arc::new(MemoryTargetStore::new());

    let mut seeded = Tags::new();
    seeded.insert(tags::CREDENTIAL_ID.into(), "app_user".into());
    seeded.insert(
        tags::PROVIDER_ADDRESS.into(),
        "/subscriptions/x/resourceGroups/y/providers/Microsoft.Sql/servers/mydb/databases/orders"
            .into(),
    );
    seeded.insert(tags::VALIDITY_PERIOD_DAYS.into(), "30".into());
    seeded.insert("webapp[0]".into(), "orders-api".into());
    seeded.insert("connstring[0]".into(), "OrdersDb".into());

    store.insert(&SecretRef::parse("myvault", "db-login-secret")?, "initial", seeded);
    service.add_login("mydb.database.windows.net", "app_user", "initial");
    targets.set_entry(
        "orders-api",
        "OrdersDb",
        "Server=tcp:mydb.database.windows.net,1433;User ID=app_user;Password=initial;",
    );

    let orchestrator = RotationOrchestrator::builder()
        .secret_store(store)
        .data_service(Arc::new(service))
        .target_store(targets)
        .build()?;
    let processor = BatchProcessor::new(Arc::new(orchestrator));

    serve(WebhookConfig::default(), WebhookState::new(Arc::new(processor))).await?;
    Ok(())
}
