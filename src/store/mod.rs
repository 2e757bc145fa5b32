//! List State Manager
//!
//! Mediates every read and write between the presentation layer and the
//! datastore. Mutations are applied to the local cache first, then
//! persisted; a failed write is repaired either by removing the exact
//! record that was added or by reloading the whole list.
//!
//! The cache lock is only taken for synchronous sections and is never
//! held across a datastore call.

mod state;


use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::datastore::{Datastore, StoreError, StoreResult};
use crate::import::{ImportSummary, ParsedGroup};
use crate::models::{GroupPatch, ItemPatch, ListPatch, TodoGroup, TodoItem, TodoList};

pub use state::ListState;

/// Name given to lists created without one
pub const DEFAULT_LIST_NAME: &str = "Untitled List";

/// Insert a fresh list and return its identifier.
///
/// Does not touch any cache; used before a list is loaded.
pub async fn create_list<D: Datastore + ?Sized>(datastore: &D, name: &str) -> StoreResult<Uuid> {
    let list = TodoList::new(name);
    datastore.insert_list(&list).await?;
    log::info!("Created list {} ({})", list.id, list.name);
    Ok(list.id)
}

/// Handle to the cached state of one list.
///
/// Cloning is cheap and every clone shares the same cache.
pub struct ListStore<D: ?Sized> {
    datastore: Arc<D>,
    list_id: Uuid,
    state: Arc<RwLock<ListState>>,
}

impl<D: ?Sized> Clone for ListStore<D> {
    fn clone(&self) -> Self {
        Self {
            datastore: Arc::clone(&self.datastore),
            list_id: self.list_id,
            state: Arc::clone(&self.state),
        }
    }
}

impl<D: Datastore + ?Sized> ListStore<D> {
    pub fn new(datastore: Arc<D>, list_id: Uuid) -> Self {
        Self {
            datastore,
            list_id,
            state: Arc::new(RwLock::new(ListState::new())),
        }
    }

    pub fn list_id(&self) -> Uuid {
        self.list_id
    }

    pub fn datastore(&self) -> &Arc<D> {
        &self.datastore
    }

    /// Copy of the current cache for rendering
    pub async fn snapshot(&self) -> ListState {
        self.state.read().await.clone()
    }

    // ========================
    // Reads
    // ========================

    /// Replace the cache with a fresh read of the list, its groups and items.
    ///
    /// A `silent` load leaves the loading flag alone so background
    /// reconciliation does not flicker the view.
    pub async fn load_list(&self, silent: bool) -> StoreResult<()> {
        {
            let mut state = self.state.write().await;
            if !silent {
                state.loading = true;
            }
            state.error = None;
        }

        let fetched = tokio::try_join!(
            self.datastore.fetch_list(self.list_id),
            self.datastore.fetch_groups(self.list_id),
            self.datastore.fetch_items(self.list_id),
        );

        let mut state = self.state.write().await;
        if !silent {
            state.loading = false;
        }
        match fetched {
            Ok((list, groups, items)) => {
                log::debug!(
                    "Loaded list {}: {} groups, {} items",
                    self.list_id,
                    groups.len(),
                    items.len()
                );
                state.list = Some(list);
                state.groups = groups;
                state.items = items;
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to load list {}: {}", self.list_id, e);
                state.list = None;
                state.error = Some(e.clone());
                Err(e)
            }
        }
    }

    // ========================
    // List
    // ========================

    /// Rename the list. The local name stays ahead of the store on failure;
    /// the next reload settles it.
    pub async fn rename_list(&self, name: &str) -> StoreResult<()> {
        let patch = ListPatch::rename(name, Utc::now());
        {
            let mut state = self.state.write().await;
            if let Some(list) = state.list.as_mut() {
                patch.apply(list);
            }
        }
        self.datastore.update_list(self.list_id, &patch).await
    }

    // ========================
    // Groups
    // ========================

    pub async fn add_group(&self, name: &str) -> StoreResult<TodoGroup> {
        let group = {
            let mut state = self.state.write().await;
            let group = TodoGroup::new(self.list_id, name, state.next_group_position());
            state.groups.push(group.clone());
            group
        };

        if let Err(e) = self.datastore.insert_groups(std::slice::from_ref(&group)).await {
            log::warn!("Rolling back group {}: {}", group.id, e);
            self.state.write().await.groups.retain(|g| g.id != group.id);
            return Err(e);
        }
        Ok(group)
    }

    pub async fn update_group(&self, group_id: Uuid, patch: GroupPatch) -> StoreResult<()> {
        self.state.write().await.merge_group(group_id, &patch);

        if let Err(e) = self.datastore.update_group(group_id, &patch).await {
            self.reconcile_after(&e).await;
            return Err(e);
        }
        Ok(())
    }

    /// Delete a group together with its items
    pub async fn delete_group(&self, group_id: Uuid) -> StoreResult<()> {
        self.state.write().await.remove_group(group_id);

        if let Err(e) = self.datastore.delete_group(group_id).await {
            self.reconcile_after(&e).await;
            return Err(e);
        }
        Ok(())
    }

    // ========================
    // Items
    // ========================

    pub async fn add_item(&self, group_id: Uuid, text: &str) -> StoreResult<TodoItem> {
        let item = {
            let mut state = self.state.write().await;
            if state.group(group_id).is_none() {
                return Err(StoreError::InvalidInput(format!("unknown group {}", group_id)));
            }
            let position = state.next_item_position(group_id);
            let item = TodoItem::new(self.list_id, group_id, text, position);
            state.items.push(item.clone());
            item
        };

        if let Err(e) = self.datastore.insert_items(std::slice::from_ref(&item)).await {
            log::warn!("Rolling back item {}: {}", item.id, e);
            self.state.write().await.remove_item(item.id);
            return Err(e);
        }
        Ok(item)
    }

    /// Patch an item. `completed_at` always follows `done`; a patch that
    /// only carries a timestamp changes nothing.
    pub async fn update_item(&self, item_id: Uuid, patch: ItemPatch) -> StoreResult<()> {
        let patch = {
            let mut state = self.state.write().await;
            let patch = patch.normalized(state.item(item_id), Utc::now());
            if patch.is_empty() {
                return Ok(());
            }
            state.merge_item(item_id, &patch);
            patch
        };

        if let Err(e) = self.datastore.update_item(item_id, &patch).await {
            self.reconcile_after(&e).await;
            return Err(e);
        }
        Ok(())
    }

    /// Flip completion. Unknown items are ignored.
    pub async fn toggle_item(&self, item_id: Uuid) -> StoreResult<()> {
        let done = match self.state.read().await.item(item_id) {
            Some(item) => !item.done,
            None => return Ok(()),
        };
        self.update_item(item_id, ItemPatch::completion(done, Utc::now()))
            .await
    }

    pub async fn delete_item(&self, item_id: Uuid) -> StoreResult<()> {
        self.state.write().await.remove_item(item_id);

        if let Err(e) = self.datastore.delete_item(item_id).await {
            self.reconcile_after(&e).await;
            return Err(e);
        }
        Ok(())
    }

    // ========================
    // Bulk import
    // ========================

    /// Append parsed groups and their items after the existing groups.
    pub async fn import_groups(&self, parsed: &[ParsedGroup]) -> StoreResult<ImportSummary> {
        if parsed.is_empty() {
            return Ok(ImportSummary::default());
        }

        let now = Utc::now();
        let (groups, items) = {
            let mut state = self.state.write().await;
            let base = state.next_group_position();
            let mut groups = Vec::with_capacity(parsed.len());
            let mut items = Vec::new();

            for (offset, source) in parsed.iter().enumerate() {
                let group = TodoGroup::new(self.list_id, source.name.clone(), base + offset as i32);
                for (position, entry) in source.items.iter().enumerate() {
                    let mut item =
                        TodoItem::new(self.list_id, group.id, entry.text.clone(), position as i32);
                    if entry.done {
                        item.set_done(true, now);
                    }
                    items.push(item);
                }
                groups.push(group);
            }

            state.groups.extend(groups.iter().cloned());
            state.items.extend(items.iter().cloned());
            (groups, items)
        };

        if let Err(e) = self.datastore.insert_groups(&groups).await {
            self.discard(&groups, &items).await;
            return Err(e);
        }
        if !items.is_empty() {
            if let Err(e) = self.datastore.insert_items(&items).await {
                // Groups are already stored; only a reload shows them truthfully
                self.discard(&groups, &items).await;
                self.reconcile_after(&e).await;
                return Err(e);
            }
        }

        let summary = ImportSummary {
            groups: groups.len(),
            items: items.len(),
        };
        log::info!("Imported {} into list {}", summary, self.list_id);
        Ok(summary)
    }

    // ========================
    // Repair
    // ========================

    /// Drop optimistically inserted records
    async fn discard(&self, groups: &[TodoGroup], items: &[TodoItem]) {
        let group_ids: HashSet<Uuid> = groups.iter().map(|g| g.id).collect();
        let item_ids: HashSet<Uuid> = items.iter().map(|i| i.id).collect();

        let mut state = self.state.write().await;
        state.groups.retain(|g| !group_ids.contains(&g.id));
        state.items.retain(|i| !item_ids.contains(&i.id));
    }

    /// Re-read ground truth after a write the cache cannot undo precisely
    async fn reconcile_after(&self, cause: &StoreError) {
        log::warn!("Write to list {} failed ({}), reloading", self.list_id, cause);
        if let Err(e) = self.load_list(false).await {
            log::error!("Reload of list {} failed: {}", self.list_id, e);
        }
    }
}
