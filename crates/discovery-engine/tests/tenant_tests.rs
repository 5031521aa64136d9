//! Tenant isolation and switching
//!
//! Run with: cargo test --package discovery-engine --test tenant_tests

use discovery_engine::prelude::*;
use discovery_engine::{
    HealedSteps, PersistOutcome, RecoveryReason, SwitchOutcome, VALUES_DISCOVERY_CHAIN,
};
use discovery_model::{timestamp, DiscoveryState};
use discovery_test_utils::{completed_goals, completed_values, test_key, CountingStore};
use discovery_vault::{
    CorruptReason, EncryptedStorage, Envelope, MemoryStore, NamespaceResolver, ProfileState,
    ReadOutcome,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn store_over(backend: CountingStore) -> ProfileStore<CountingStore> {
    ProfileStore::new(backend, &test_key(), &EngineConfig::default()).unwrap()
}

async fn stored_profile(backend: &MemoryStore, tenant: &Tenant) -> Option<Profile> {
    let storage = EncryptedStorage::new(backend.clone(), &test_key());
    let key = NamespaceResolver::default().resolve(tenant);
    match storage.read_json::<Envelope<ProfileState>>(&key).await.unwrap() {
        ReadOutcome::Loaded(envelope) => envelope.state.current_profile,
        _ => None,
    }
}

#[tokio::test]
async fn consumer_profile_survives_a_restart() {
    let backend = CountingStore::new();
    let mut store = store_over(backend.clone());
    store.initialize("u1");
    store
        .update_section(
            SectionName::BasicContext,
            json!({ "firstName": "Jo", "birthYear": 1970 }),
        )
        .unwrap();
    store.persist().await.unwrap();
    let written = store.profile().cloned().unwrap();

    let mut reopened = store_over(backend);
    let restored = reopened.restore().await.unwrap();
    assert_eq!(restored.source, LoadSource::Restored);
    assert!(restored.healed.is_empty());
    assert_eq!(reopened.profile(), Some(&written));
    assert!(!reopened.is_dirty());
}

#[tokio::test]
async fn persist_twice_writes_once() {
    let backend = CountingStore::new();
    let mut store = store_over(backend.clone());
    store.initialize("u1");

    assert!(matches!(
        store.persist().await.unwrap(),
        PersistOutcome::Written(_)
    ));
    assert_eq!(store.persist().await.unwrap(), PersistOutcome::Clean);
    assert_eq!(backend.writes(), 1);

    store.update_notes("call on Tuesday").unwrap();
    store.persist().await.unwrap();
    assert_eq!(backend.writes(), 2);
}

#[tokio::test]
async fn switch_flushes_outgoing_tenant_under_its_own_key() {
    let backend = CountingStore::new();
    let mut store = store_over(backend.clone());
    let a = Tenant::client("a");
    let b = Tenant::client("b");

    store.switch_tenant(a.clone()).await.unwrap();
    store
        .update_section(SectionName::BasicContext, json!({ "firstName": "Ann" }))
        .unwrap();

    let outcome = store.switch_tenant(b.clone()).await.unwrap();
    assert_eq!(
        outcome,
        SwitchOutcome {
            tenant: b.clone(),
            source: LoadSource::Fresh,
            flushed: true,
            healed: HealedSteps::new(),
        }
    );
    assert_eq!(store.profile().unwrap().owner_id, "b");
    assert_eq!(store.profile().unwrap().basic_context.first_name, None);

    let stored_a = stored_profile(backend.memory(), &a).await.unwrap();
    assert_eq!(stored_a.owner_id, "a");
    assert_eq!(stored_a.basic_context.first_name.as_deref(), Some("Ann"));
    assert!(stored_profile(backend.memory(), &b).await.is_none());

    // and back again
    let back = store.switch_tenant(a).await.unwrap();
    assert_eq!(back.source, LoadSource::Restored);
    assert_eq!(
        store.profile().unwrap().basic_context.first_name.as_deref(),
        Some("Ann")
    );
}

#[tokio::test]
async fn edits_never_leak_between_tenants() {
    let backend = CountingStore::new();
    let mut store = store_over(backend.clone());

    store.switch_tenant(Tenant::client("a")).await.unwrap();
    store.update_notes("notes for a").unwrap();
    store.switch_tenant(Tenant::client("b")).await.unwrap();
    store.update_notes("notes for b").unwrap();
    store.switch_tenant(Tenant::Consumer).await.unwrap();

    let a = stored_profile(backend.memory(), &Tenant::client("a")).await.unwrap();
    let b = stored_profile(backend.memory(), &Tenant::client("b")).await.unwrap();
    assert_eq!(a.advisor_notes, "notes for a");
    assert_eq!(b.advisor_notes, "notes for b");
    assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn failing_flush_keeps_outgoing_tenant_resident() {
    let backend = CountingStore::new();
    let mut store = store_over(backend.clone());
    store.switch_tenant(Tenant::client("a")).await.unwrap();
    store.update_notes("unsaved").unwrap();

    backend.set_failing(true);
    let err = store.switch_tenant(Tenant::client("b")).await.unwrap_err();
    assert!(matches!(err, StoreError::FlushFailed { .. }));
    assert_eq!(store.tenant(), &Tenant::client("a"));
    assert_eq!(store.profile().unwrap().advisor_notes, "unsaved");
    assert!(store.is_dirty());

    backend.set_failing(false);
    let outcome = store.switch_tenant(Tenant::client("b")).await.unwrap();
    assert!(outcome.flushed);
    let a = stored_profile(backend.memory(), &Tenant::client("a")).await.unwrap();
    assert_eq!(a.advisor_notes, "unsaved");
}

#[tokio::test]
async fn corrupt_client_blob_starts_fresh() {
    let backend = CountingStore::new();
    let key = NamespaceResolver::default().resolve(&Tenant::client("c42"));
    backend.memory().insert_raw(key.as_str(), vec![0x44, 0x53]);

    let mut store = store_over(backend);
    let outcome = store.switch_tenant(Tenant::client("c42")).await.unwrap();
    assert_eq!(
        outcome.source,
        LoadSource::Recovered(RecoveryReason::Corrupt(CorruptReason::Truncated(2)))
    );
    let profile = store.profile().unwrap();
    assert_eq!(profile.owner_id, "c42");
    assert_eq!(profile.status, ProfileStatus::NotStarted);
    assert!(store.is_dirty());
}

#[tokio::test]
async fn foreign_owner_in_client_namespace_is_discarded() {
    let backend = CountingStore::new();
    let key = NamespaceResolver::default().resolve(&Tenant::client("c1"));
    let foreign = Profile::new("intruder", timestamp::now());
    EncryptedStorage::new(backend.clone(), &test_key())
        .write_json(&key, &Envelope::new(ProfileState::with_profile(foreign)))
        .await
        .unwrap();

    let mut store = store_over(backend.clone());
    let outcome = store.switch_tenant(Tenant::client("c1")).await.unwrap();
    assert_eq!(
        outcome.source,
        LoadSource::Recovered(RecoveryReason::OwnerMismatch {
            found: "intruder".to_string()
        })
    );
    assert_eq!(store.profile().unwrap().owner_id, "c1");

    let lenient = EngineConfig::new().with_verify_ownership(false);
    let mut store = ProfileStore::new(backend, &test_key(), &lenient).unwrap();
    let outcome = store.switch_tenant(Tenant::client("c1")).await.unwrap();
    assert_eq!(outcome.source, LoadSource::Restored);
}

#[tokio::test]
async fn purge_removes_only_the_named_tenant() {
    let backend = CountingStore::new();
    let mut store = store_over(backend.clone());
    store.switch_tenant(Tenant::client("a")).await.unwrap();
    store.switch_tenant(Tenant::client("b")).await.unwrap();
    store.persist().await.unwrap();

    store.purge_tenant(&Tenant::client("a")).await.unwrap();
    assert!(stored_profile(backend.memory(), &Tenant::client("a")).await.is_none());
    assert!(store.profile().is_some());

    store.purge_tenant(&Tenant::client("b")).await.unwrap();
    assert!(store.profile().is_none());
    assert!(backend.memory().is_empty());
}

#[tokio::test]
async fn shared_store_serializes_concurrent_switches() {
    let backend = CountingStore::new();
    let shared = store_over(backend.clone()).shared();

    let mut handles = Vec::new();
    for name in ["a", "b", "c", "d"] {
        let shared = shared.clone();
        handles.push(tokio::spawn(async move {
            let mut store = shared.lock().await;
            store.switch_tenant(Tenant::client(name)).await.unwrap();
            store.update_notes(format!("notes for {name}")).unwrap();
            store.persist().await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for name in ["a", "b", "c", "d"] {
        let profile = stored_profile(backend.memory(), &Tenant::client(name))
            .await
            .unwrap();
        assert_eq!(profile.owner_id, name);
        assert_eq!(profile.advisor_notes, format!("notes for {name}"));
    }
}

#[tokio::test]
async fn stored_profile_with_broken_step_order_is_healed_on_switch() {
    let backend = CountingStore::new();
    let key = NamespaceResolver::default().resolve(&Tenant::client("c1"));
    let mut stored = Profile::new("c1", timestamp::now());
    stored.values_discovery = completed_values();
    stored.values_discovery.piles_completed_at = None;
    stored.financial_goals = completed_goals();
    EncryptedStorage::new(backend.clone(), &test_key())
        .write_json(&key, &Envelope::new(ProfileState::with_profile(stored)))
        .await
        .unwrap();

    let mut store = store_over(backend.clone());
    let outcome = store.switch_tenant(Tenant::client("c1")).await.unwrap();
    assert_eq!(outcome.source, LoadSource::Restored);
    assert_eq!(
        outcome.healed,
        HealedSteps::from([(
            SectionName::ValuesDiscovery,
            vec!["top10", "top5", "tradeoffs", "nonNegotiables"],
        )])
    );

    let values = &store.profile().unwrap().values_discovery;
    assert!(VALUES_DISCOVERY_CHAIN.check_ordering(values).is_ok());
    assert_eq!(values.derived, None);
    assert_eq!(values.state, DiscoveryState::InProgress);
    assert_eq!(store.profile().unwrap().financial_goals, completed_goals());
    assert!(store.is_dirty());

    // the healed profile replaces the broken blob
    store.persist().await.unwrap();
    let rewritten = stored_profile(backend.memory(), &Tenant::client("c1")).await.unwrap();
    assert!(VALUES_DISCOVERY_CHAIN
        .check_ordering(&rewritten.values_discovery)
        .is_ok());
}

#[tokio::test]
async fn initialize_under_a_client_tenant_keeps_the_client_owner() {
    let backend = CountingStore::new();
    let mut store = store_over(backend.clone());
    let c1 = Tenant::client("c1");
    store.switch_tenant(c1.clone()).await.unwrap();

    assert_eq!(store.initialize("someone-else").owner_id, "c1");
    store
        .update_section(SectionName::BasicContext, json!({ "firstName": "Ann" }))
        .unwrap();
    store.switch_tenant(Tenant::Consumer).await.unwrap();

    let back = store.switch_tenant(c1).await.unwrap();
    assert_eq!(back.source, LoadSource::Restored);
    assert_eq!(
        store.profile().unwrap().basic_context.first_name.as_deref(),
        Some("Ann")
    );
}
