//! SQLite-backed datastore.
//!
//! Serves the client's [`Datastore`] seam from the repositories and
//! publishes one change event per affected row once a write commits.

use async_trait::async_trait;
use uuid::Uuid;

use noto::sync::{ChangeEvent, ChangeFeed, ChannelSpec, Record, StatusHandler, Subscription};
use noto::{Datastore, GroupPatch, ItemPatch, ListPatch, StoreError, StoreResult, TodoGroup, TodoItem, TodoList};

use crate::domain::DomainError;
use crate::realtime::RealtimeHub;
use crate::repository::{
    DbState, GroupRepository, ItemRepository, ListRepository, ListScoped, Patchable, Repository,
};

pub struct LocalDatastore {
    lists: ListRepository,
    groups: GroupRepository,
    items: ItemRepository,
    hub: RealtimeHub,
}

impl LocalDatastore {
    pub fn new(db: &DbState, hub: RealtimeHub) -> Self {
        Self {
            lists: ListRepository::new(db.connection()),
            groups: GroupRepository::new(db.connection()),
            items: ItemRepository::new(db.connection()),
            hub,
        }
    }

    pub fn hub(&self) -> &RealtimeHub {
        &self.hub
    }

    fn publish_all(&self, events: impl IntoIterator<Item = ChangeEvent>) {
        for event in events {
            self.hub.publish(event);
        }
    }
}

fn store_error(err: DomainError) -> StoreError {
    err.into()
}

#[async_trait]
impl Datastore for LocalDatastore {
    async fn insert_list(&self, list: &TodoList) -> StoreResult<()> {
        let created = self.lists.create(list).await.map_err(store_error)?;
        self.hub.publish(ChangeEvent::insert(Record::List(created)));
        Ok(())
    }

    async fn fetch_list(&self, id: Uuid) -> StoreResult<TodoList> {
        self.lists
            .find_by_id(id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| StoreError::NotFound(format!("list {}", id)))
    }

    async fn update_list(&self, id: Uuid, patch: &ListPatch) -> StoreResult<()> {
        let (old, new) = self.lists.patch(id, patch).await.map_err(store_error)?;
        self.hub.publish(ChangeEvent::update(Record::List(old), Record::List(new)));
        Ok(())
    }

    async fn fetch_groups(&self, list_id: Uuid) -> StoreResult<Vec<TodoGroup>> {
        self.groups.list_by_list(list_id).await.map_err(store_error)
    }

    async fn insert_groups(&self, groups: &[TodoGroup]) -> StoreResult<()> {
        let created = self.groups.create_many(groups).await.map_err(store_error)?;
        self.publish_all(created.into_iter().map(|g| ChangeEvent::insert(Record::Group(g))));
        Ok(())
    }

    async fn update_group(&self, id: Uuid, patch: &GroupPatch) -> StoreResult<()> {
        let (old, new) = self.groups.patch(id, patch).await.map_err(store_error)?;
        self.hub.publish(ChangeEvent::update(Record::Group(old), Record::Group(new)));
        Ok(())
    }

    async fn delete_group(&self, id: Uuid) -> StoreResult<()> {
        let (group, items) = self.groups.delete_cascade(id).await.map_err(store_error)?;
        self.publish_all(items.into_iter().map(|i| ChangeEvent::delete(Record::Item(i))));
        self.hub.publish(ChangeEvent::delete(Record::Group(group)));
        Ok(())
    }

    async fn fetch_items(&self, list_id: Uuid) -> StoreResult<Vec<TodoItem>> {
        self.items.list_by_list(list_id).await.map_err(store_error)
    }

    async fn insert_items(&self, items: &[TodoItem]) -> StoreResult<()> {
        let created = self.items.create_many(items).await.map_err(store_error)?;
        self.publish_all(created.into_iter().map(|i| ChangeEvent::insert(Record::Item(i))));
        Ok(())
    }

    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> StoreResult<()> {
        let (old, new) = self.items.patch(id, patch).await.map_err(store_error)?;
        self.hub.publish(ChangeEvent::update(Record::Item(old), Record::Item(new)));
        Ok(())
    }

    async fn delete_item(&self, id: Uuid) -> StoreResult<()> {
        let item = self
            .items
            .find_by_id(id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| StoreError::NotFound(format!("item {}", id)))?;
        self.items.delete(id).await.map_err(store_error)?;
        self.hub.publish(ChangeEvent::delete(Record::Item(item)));
        Ok(())
    }
}

impl ChangeFeed for LocalDatastore {
    fn subscribe(&self, spec: ChannelSpec, on_status: StatusHandler) -> Box<dyn Subscription> {
        self.hub.subscribe(spec, on_status)
    }
}
