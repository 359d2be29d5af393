//! Staging store lifecycle through the public API: insertion contract,
//! transition guard, read interface and compensation operations

use factsync::adapters::database::StagingStore;
use factsync::core::registry::CodeRegistry;
use factsync::core::staging::{InMemoryStagingStore, StagingManager};
use factsync::domain::fact::MAX_RAW_TEXT_CHARS;
use factsync::domain::{FactId, NewFact, PatientId, SessionId, SyncStatus};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use std::sync::Arc;
use test_case::test_case;

fn manager() -> (Arc<InMemoryStagingStore>, StagingManager) {
    let store = Arc::new(InMemoryStagingStore::new());
    let manager = StagingManager::new(store.clone(), Arc::new(CodeRegistry::builtin()));
    (store, manager)
}

fn fact(session: &str, patient: &str, marker: &str, value: &str) -> NewFact {
    let filler: String = Sentence(3..8).fake();
    NewFact::new(
        SessionId::new(session).unwrap(),
        marker,
        value,
        format!("{marker} {value}. {filler}"),
    )
    .unwrap()
    .with_patient(PatientId::new(patient).unwrap())
}

#[tokio::test]
async fn test_insert_enforces_inbound_contract() {
    let (store, manager) = manager();
    let long_text: String = "x".repeat(MAX_RAW_TEXT_CHARS * 2);

    let id = manager
        .insert(
            NewFact::new(SessionId::new("s").unwrap(), "Temp", "38.5", &long_text)
                .unwrap()
                .with_confidence(-3.0)
                .with_page_number(4)
                .with_element_type("table"),
        )
        .await
        .unwrap();

    let row = store.get(id).await.unwrap();
    assert_eq!(row.sync_status, SyncStatus::Pending);
    assert_eq!(row.raw_text.chars().count(), MAX_RAW_TEXT_CHARS);
    assert_eq!(row.confidence, 0.0);
    assert_eq!(row.page_number, Some(4));
    assert!(row.external_resource_id.is_none());

    assert!(NewFact::new(SessionId::new("s").unwrap(), "Temp", "38.5", "   ").is_err());
}

#[test_case(SyncStatus::Synced, SyncStatus::Pending ; "synced never returns to pending")]
#[test_case(SyncStatus::Synced, SyncStatus::Failed ; "synced is final")]
#[test_case(SyncStatus::Superseded, SyncStatus::Synced ; "superseded is final")]
#[test_case(SyncStatus::Failed, SyncStatus::Pending ; "failed never returns to pending")]
#[tokio::test]
async fn test_forbidden_transitions_are_rejected(first: SyncStatus, second: SyncStatus) {
    let (store, manager) = manager();
    let id = manager.insert(fact("s", "p", "ER", "positive")).await.unwrap();

    store.update_status(id, first, None).await.unwrap();
    assert!(store.update_status(id, second, None).await.is_err());
    assert_eq!(store.get(id).await.unwrap().sync_status, first);
}

#[tokio::test]
async fn test_bulk_update_with_one_bad_id_changes_nothing() {
    let (store, manager) = manager();
    let a = manager.insert(fact("s", "p", "ER", "positive")).await.unwrap();
    let b = manager.insert(fact("s", "p", "PR", "negative")).await.unwrap();
    store.update_status(b, SyncStatus::Synced, Some("Observation/1")).await.unwrap();

    // b is SYNCED and cannot become FAILED, so a must stay PENDING too
    assert!(store
        .bulk_update_status(&[a, b], SyncStatus::Failed, None)
        .await
        .is_err());
    assert_eq!(store.get(a).await.unwrap().sync_status, SyncStatus::Pending);

    // Unknown ids are rejected the same way
    assert!(store
        .bulk_update_status(&[a, FactId::new(9_999)], SyncStatus::Failed, None)
        .await
        .is_err());
    assert_eq!(store.get(a).await.unwrap().sync_status, SyncStatus::Pending);
}

#[tokio::test]
async fn test_read_interface_scoping() {
    let (store, manager) = manager();
    let s1 = SessionId::new("s1").unwrap();
    let p1 = PatientId::new("p1").unwrap();

    let a = manager.insert(fact("s1", "p1", "ER", "positive")).await.unwrap();
    let b = manager.insert(fact("s1", "p1", "Temp", "38.5")).await.unwrap();
    let c = manager.insert(fact("s2", "p2", "ER", "negative")).await.unwrap();
    store.update_status(a, SyncStatus::Synced, Some("Observation/7")).await.unwrap();
    store.update_status(c, SyncStatus::Synced, Some("Observation/8")).await.unwrap();

    let pending: Vec<_> = manager.get_pending(Some(&s1)).await.unwrap();
    assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![b]);

    let synced_p1 = manager.get_synced(Some(&p1)).await.unwrap();
    assert_eq!(synced_p1.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a]);
    assert_eq!(manager.get_synced(None).await.unwrap().len(), 2);

    let session_rows = manager.get_by_session(&s1).await.unwrap();
    assert_eq!(session_rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a, b]);

    let counts = manager.status_counts(Some(&s1)).await.unwrap();
    assert_eq!(counts.get(SyncStatus::Pending), 1);
    assert_eq!(counts.get(SyncStatus::Synced), 1);
    assert_eq!(counts.total(), 2);
}

#[tokio::test]
async fn test_split_known_against_synced_rows() {
    let (store, manager) = manager();
    let p1 = PatientId::new("p1").unwrap();

    let synced = manager.insert(fact("s1", "p1", "ER Status", "Positive")).await.unwrap();
    store.update_status(synced, SyncStatus::Synced, Some("Observation/1")).await.unwrap();

    manager.insert(fact("s2", "p1", "ER", " positive ")).await.unwrap();
    manager.insert(fact("s2", "p1", "ER", "negative")).await.unwrap();

    let candidates = manager
        .get_pending(Some(&SessionId::new("s2").unwrap()))
        .await
        .unwrap();
    let split = manager.split_known(&p1, candidates).await.unwrap();

    assert_eq!(split.known.len(), 1);
    assert_eq!(split.known[0].marker_value, " positive ");
    assert_eq!(split.new.len(), 1);
    assert_eq!(split.new[0].marker_value, "negative");
}

#[tokio::test]
async fn test_promotions_only_touch_their_source_status() {
    let (store, manager) = manager();
    let session = SessionId::new("s1").unwrap();

    let failed_a = manager.insert(fact("s1", "p1", "ER", "positive")).await.unwrap();
    let failed_b = manager.insert(fact("s1", "p1", "ER", "POSITIVE")).await.unwrap();
    let pending = manager.insert(fact("s1", "p1", "Temp", "38.5")).await.unwrap();
    store
        .bulk_update_status(&[failed_a, failed_b], SyncStatus::Failed, None)
        .await
        .unwrap();

    let summary = manager.promote_failed_to_synced(&session).await.unwrap();
    assert_eq!(summary.synced, 1);
    assert_eq!(summary.superseded, 1);
    assert_eq!(store.get(pending).await.unwrap().sync_status, SyncStatus::Pending);

    let summary = manager.promote_pending_to_synced(&session).await.unwrap();
    assert_eq!(summary.total(), 1);
    assert_eq!(store.get(pending).await.unwrap().sync_status, SyncStatus::Synced);

    // Nothing left to promote
    let summary = manager.promote_failed_to_synced(&session).await.unwrap();
    assert_eq!(summary.total(), 0);
}
