//! Integration tests for dependent-consumer propagation
//!
//! Propagation is best effort: a broken binding is recorded and the rotation
//! still completes.

mod common;

use std::sync::Arc;

use common::*;
use keyturn_credential::prelude::*;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

fn three_bindings() -> [(&'static str, &'static str); 6] {
    [
        ("webapp[0]", "app-one"),
        ("webapp[1]", "app-two"),
        ("webapp[2]", "app-three"),
        ("connstring[0]", "Db"),
        ("connstring[1]", "Db"),
        ("connstring[2]", "Db"),
    ]
}

#[tokio::test]
async fn test_second_binding_failure_is_isolated() {
    // GIVEN: Three bindings where the second target is broken
    let harness = Harness::new();
    harness.seed(&three_bindings());
    for target in ["app-one", "app-two", "app-three"] {
        harness
            .targets
            .set_entry(target, "Db", "Server=tcp:x,1433;User ID=app_user;Password=old;");
    }
    harness.targets.fail_target("app-two");

    // WHEN: The secret is rotated
    let report = harness.orchestrator.rotate(&notification()).await.unwrap();

    // THEN: The first and third bindings were updated and the rotation is done
    assert_eq!(report.history.last(), Some(&RotationState::Done));
    assert_eq!(report.propagation.attempted, 3);
    assert_eq!(report.propagation.updated, 2);
    assert_eq!(report.propagation.failures.len(), 1);
    assert_eq!(report.propagation.failures[0].binding.target, "app-two");
    assert_eq!(harness.targets.writes(), vec!["app-one", "app-three"]);

    let new_password = harness.store.latest(&secret_ref()).unwrap().value;
    let expected = format!(
        "Server=tcp:x,1433;User ID=app_user;Password={};",
        new_password.expose_secret()
    );
    for target in ["app-one", "app-three"] {
        let entry = harness.targets.entry(target, "Db").unwrap();
        assert_eq!(entry.expose_secret(), expected);
    }
}

#[tokio::test]
async fn test_missing_entry_is_built_from_metadata() {
    // GIVEN: A binding whose configuration entry does not exist yet
    let harness = Harness::new();
    harness.seed(&[("webapp[0]", "fresh-app"), ("connstring[0]", "OrdersDb")]);

    // WHEN: The secret is rotated
    harness.orchestrator.rotate(&notification()).await.unwrap();

    // THEN: A full connection string is written
    let new_password = harness.store.latest(&secret_ref()).unwrap().value;
    let entry = harness.targets.entry("fresh-app", "OrdersDb").unwrap();
    assert_eq!(
        entry.expose_secret(),
        format!(
            "Server=tcp:{HOST},1433;Initial Catalog=orders;User ID={LOGIN};Password={};Encrypt=True;",
            new_password.expose_secret()
        )
    );
}

#[tokio::test]
async fn test_unpaired_binding_tags_are_ignored() {
    // GIVEN: Two targets but only one configuration entry
    let harness = Harness::new();
    harness.seed(&[
        ("webapp[0]", "app-one"),
        ("webapp[1]", "app-two"),
        ("connstring[0]", "Db"),
    ]);

    // WHEN: The secret is rotated with the default policy
    let report = harness.orchestrator.rotate(&notification()).await.unwrap();

    // THEN: Only the overlapping pair is processed
    assert_eq!(report.propagation.attempted, 1);
    assert_eq!(harness.targets.writes(), vec!["app-one"]);
}

#[tokio::test]
async fn test_reject_policy_fails_before_mutation() {
    // GIVEN: Mismatched binding tags and the strict policy
    let harness = Harness::with_config(RotationConfig {
        binding_policy: BindingPolicy::Reject,
        ..RotationConfig::default()
    });
    harness.seed(&[("webapp[0]", "app-one"), ("webapp[1]", "app-two"), ("connstring[0]", "Db")]);

    // WHEN: The secret is rotated
    let err = harness.orchestrator.rotate(&notification()).await.unwrap_err();

    // THEN: Metadata is invalid and nothing changed
    assert_eq!(err.kind(), FailureKind::InvalidMetadata);
    assert!(harness.service.executed().is_empty());
    assert_eq!(harness.store.version_count(&secret_ref()), 1);
}

#[tokio::test]
async fn test_no_target_store_skips_propagation() {
    // GIVEN: An orchestrator built without a target store
    let store = Arc::new(MemorySecretStore::new());
    let service = MemoryDataService::new();
    let mut seeded = base_tags();
    seeded.insert("webapp[0]".into(), "app-one".into());
    seeded.insert("connstring[0]".into(), "Db".into());
    store.insert(&secret_ref(), CURRENT_PASSWORD, seeded);
    service.add_login(HOST, LOGIN, CURRENT_PASSWORD);

    let orchestrator = RotationOrchestrator::builder()
        .secret_store(store.clone())
        .data_service(Arc::new(service))
        .build()
        .unwrap();

    // WHEN: The secret is rotated
    let report = orchestrator.rotate(&notification()).await.unwrap();

    // THEN: The rotation completes and the binding is reported as skipped
    assert_eq!(report.propagation.skipped, 1);
    assert_eq!(report.propagation.attempted, 0);
    assert_eq!(store.version_count(&secret_ref()), 2);
}
