//! Cached List State
//!
//! In-memory copy of one list, its groups and its items.

use uuid::Uuid;

use crate::datastore::StoreError;
use crate::models::{GroupPatch, ItemPatch, TodoGroup, TodoItem, TodoList};

/// Local cache for a single list
#[derive(Clone, Debug)]
pub struct ListState {
    /// The list record; `None` until loaded or after a failed load
    pub list: Option<TodoList>,
    /// Groups ordered by position
    pub groups: Vec<TodoGroup>,
    /// Items of every group, ordered by position
    pub items: Vec<TodoItem>,
    /// True while a non-silent load is in flight
    pub loading: bool,
    /// Error retained from the last load
    pub error: Option<StoreError>,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            list: None,
            groups: Vec::new(),
            items: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

impl ListState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the list should be presented as missing
    pub fn is_not_found(&self) -> bool {
        !self.loading && (self.error.is_some() || self.list.is_none())
    }

    pub fn group(&self, group_id: Uuid) -> Option<&TodoGroup> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    pub fn item(&self, item_id: Uuid) -> Option<&TodoItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Items belonging to a group, in cache order
    pub fn group_items(&self, group_id: Uuid) -> impl Iterator<Item = &TodoItem> {
        self.items.iter().filter(move |i| i.group_id == group_id)
    }

    /// One past the highest group position, 0 for an empty list.
    ///
    /// Equals the group count until something is deleted; after that it
    /// never reuses a position, so sibling positions stay unique.
    pub fn next_group_position(&self) -> i32 {
        self.groups.iter().map(|g| g.position + 1).max().unwrap_or(0)
    }

    /// One past the highest item position inside a group; same rule as
    /// [`ListState::next_group_position`]
    pub fn next_item_position(&self, group_id: Uuid) -> i32 {
        self.group_items(group_id)
            .map(|i| i.position + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|i| i.done).count()
    }

    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    // ========================
    // Cache helpers
    // ========================

    pub(crate) fn merge_group(&mut self, group_id: Uuid, patch: &GroupPatch) {
        if let Some(group) = self.groups.iter_mut().find(|g| g.id == group_id) {
            patch.apply(group);
        }
    }

    /// Remove a group and every item referencing it
    pub(crate) fn remove_group(&mut self, group_id: Uuid) {
        self.groups.retain(|g| g.id != group_id);
        self.items.retain(|i| i.group_id != group_id);
    }

    pub(crate) fn merge_item(&mut self, item_id: Uuid, patch: &ItemPatch) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            patch.apply(item);
        }
    }

    pub(crate) fn remove_item(&mut self, item_id: Uuid) {
        self.items.retain(|i| i.id != item_id);
    }
}
