//! Two clients editing the same list through one local datastore.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use noto::{create_list, parse_markdown_todos, ConnectionStatus, ListState, ListStore, Reconciler};
use noto_backend::repository::IN_MEMORY;
use noto_backend::{AppState, BackendConfig, LocalDatastore};

async fn setup() -> AppState {
    let config = BackendConfig {
        database_path: PathBuf::from(IN_MEMORY),
        ..Default::default()
    };
    AppState::init(config).await.expect("init backend")
}

/// Poll a store until its cache satisfies `done`
async fn eventually<F, Fut>(store: &ListStore<LocalDatastore>, done: F) -> ListState
where
    F: Fn(ListState) -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let snapshot = store.snapshot().await;
            if done(snapshot.clone()).await {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("store never caught up")
}

#[tokio::test]
async fn test_edits_propagate_between_clients() {
    let state = setup().await;
    let list_id = create_list(state.datastore.as_ref(), "Weekend").await.unwrap();

    let alice = ListStore::new(Arc::clone(&state.datastore), list_id);
    let bob = ListStore::new(Arc::clone(&state.datastore), list_id);
    alice.load_list(false).await.unwrap();
    bob.load_list(false).await.unwrap();

    let _reconciler = Reconciler::start(state.datastore.as_ref(), bob.clone());

    let group = alice.add_group("Garden").await.unwrap();
    let item = alice.add_item(group.id, "Mow the lawn").await.unwrap();

    let seen = eventually(&bob, |s| async move { s.items.len() == 1 }).await;
    assert_eq!(seen.groups[0].name, "Garden");
    assert_eq!(seen.items[0].text, "Mow the lawn");
    assert!(!seen.loading);

    alice.toggle_item(item.id).await.unwrap();
    let seen = eventually(&bob, |s| async move { s.items.first().map_or(false, |i| i.done) }).await;
    assert!(seen.items[0].completed_at.is_some());

    alice.rename_list("Long weekend").await.unwrap();
    eventually(&bob, |s| async move {
        s.list.as_ref().map_or(false, |l| l.name == "Long weekend")
    })
    .await;

    alice.delete_group(group.id).await.unwrap();
    let seen = eventually(&bob, |s| async move { s.groups.is_empty() }).await;
    assert!(seen.items.is_empty());
}

#[tokio::test]
async fn test_import_reaches_other_client() {
    let state = setup().await;
    let list_id = create_list(state.datastore.as_ref(), "Week").await.unwrap();

    let writer = ListStore::new(Arc::clone(&state.datastore), list_id);
    let reader = ListStore::new(Arc::clone(&state.datastore), list_id);
    writer.load_list(false).await.unwrap();
    reader.load_list(false).await.unwrap();
    let reconciler = Reconciler::start(state.datastore.as_ref(), reader.clone());

    let parsed = parse_markdown_todos("Work\n- [ ] Review\n- [x] Ship\n\nHome\n- [ ] Cook");
    let summary = writer.import_groups(&parsed).await.unwrap();
    assert_eq!(summary.to_string(), "2 groups, 3 items");

    let seen = eventually(&reader, |s| async move { s.items.len() == 3 }).await;
    let names: Vec<&str> = seen.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Work", "Home"]);
    assert_eq!(seen.completed_count(), 1);
    assert_eq!(reconciler.status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_other_lists_do_not_leak_in() {
    let state = setup().await;
    let mine = create_list(state.datastore.as_ref(), "Mine").await.unwrap();
    let theirs = create_list(state.datastore.as_ref(), "Theirs").await.unwrap();

    let watcher = ListStore::new(Arc::clone(&state.datastore), mine);
    watcher.load_list(false).await.unwrap();
    let _reconciler = Reconciler::start(state.datastore.as_ref(), watcher.clone());

    let other = ListStore::new(Arc::clone(&state.datastore), theirs);
    other.load_list(false).await.unwrap();
    let group = other.add_group("Elsewhere").await.unwrap();
    other.add_item(group.id, "Not yours").await.unwrap();

    // Item events are unfiltered; the reload they trigger still only reads this list
    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = watcher.snapshot().await;
    assert!(snapshot.groups.is_empty());
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.list.map(|l| l.name), Some("Mine".to_string()));
}

#[tokio::test]
async fn test_stopped_reconciler_no_longer_reloads() {
    let state = setup().await;
    let list_id = create_list(state.datastore.as_ref(), "Quiet").await.unwrap();

    let writer = ListStore::new(Arc::clone(&state.datastore), list_id);
    let reader = ListStore::new(Arc::clone(&state.datastore), list_id);
    writer.load_list(false).await.unwrap();
    reader.load_list(false).await.unwrap();

    let mut reconciler = Reconciler::start(state.datastore.as_ref(), reader.clone());
    tokio::time::sleep(Duration::from_millis(20)).await;
    reconciler.stop();
    assert_eq!(reconciler.status(), ConnectionStatus::Connecting);

    writer.add_group("Unseen").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(reader.snapshot().await.groups.is_empty());
}
