//! Client Models
//!
//! Row shapes for the three record kinds, plus typed partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shareable todo list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoList {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoList {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A named bucket of items within a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoGroup {
    pub id: Uuid,
    pub list_id: Uuid,
    pub name: String,
    /// Order among the groups of the same list
    pub position: i32,
    /// Shared collapse state
    #[serde(default)]
    pub collapsed: bool,
    pub created_at: DateTime<Utc>,
}

impl TodoGroup {
    pub fn new(list_id: Uuid, name: impl Into<String>, position: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            list_id,
            name: name.into(),
            position,
            collapsed: false,
            created_at: Utc::now(),
        }
    }
}

/// A single checklist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: Uuid,
    pub group_id: Uuid,
    /// Denormalized owner list, kept equal to the group's list
    pub list_id: Uuid,
    pub text: String,
    pub done: bool,
    /// Order within the owning group
    pub position: i32,
    pub created_at: DateTime<Utc>,
    /// Set iff `done` is true
    pub completed_at: Option<DateTime<Utc>>,
}

impl TodoItem {
    pub fn new(list_id: Uuid, group_id: Uuid, text: impl Into<String>, position: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            list_id,
            text: text.into(),
            done: false,
            position,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Mark done or not done, keeping `completed_at` consistent
    pub fn set_done(&mut self, done: bool, now: DateTime<Utc>) {
        self.done = done;
        self.completed_at = if done { Some(now) } else { None };
    }
}

// ========================
// Partial updates
// ========================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPatch {
    pub name: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ListPatch {
    pub fn rename(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: Some(name.into()),
            updated_at: Some(now),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.updated_at.is_none()
    }

    pub fn apply(&self, list: &mut TodoList) {
        if let Some(name) = &self.name {
            list.name = name.clone();
        }
        if let Some(updated_at) = self.updated_at {
            list.updated_at = updated_at;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub position: Option<i32>,
    pub collapsed: Option<bool>,
}

impl GroupPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.position.is_none() && self.collapsed.is_none()
    }

    pub fn apply(&self, group: &mut TodoGroup) {
        if let Some(name) = &self.name {
            group.name = name.clone();
        }
        if let Some(position) = self.position {
            group.position = position;
        }
        if let Some(collapsed) = self.collapsed {
            group.collapsed = collapsed;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub text: Option<String>,
    pub done: Option<bool>,
    pub position: Option<i32>,
    /// Outer `None` leaves the field alone, `Some(None)` clears it
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl ItemPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Completion flag and timestamp together
    pub fn completion(done: bool, now: DateTime<Utc>) -> Self {
        Self {
            done: Some(done),
            completed_at: Some(if done { Some(now) } else { None }),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.done.is_none()
            && self.position.is_none()
            && self.completed_at.is_none()
    }

    /// Make `completed_at` agree with `done`.
    ///
    /// `completed_at` is only ever written alongside `done`: a timestamp
    /// without `done` is dropped, `done = false` clears it and `done = true`
    /// sets it. An item that is already done keeps its completion time;
    /// otherwise a given timestamp is used, falling back to `now`.
    pub fn normalized(mut self, current: Option<&TodoItem>, now: DateTime<Utc>) -> Self {
        self.completed_at = match self.done {
            Some(true) => {
                let kept = current.filter(|item| item.done).and_then(|item| item.completed_at);
                let given = self.completed_at.flatten();
                Some(Some(kept.or(given).unwrap_or(now)))
            }
            Some(false) => Some(None),
            None => None,
        };
        self
    }

    pub fn apply(&self, item: &mut TodoItem) {
        if let Some(text) = &self.text {
            item.text = text.clone();
        }
        if let Some(done) = self.done {
            item.done = done;
        }
        if let Some(position) = self.position {
            item.position = position;
        }
        if let Some(completed_at) = self.completed_at {
            item.completed_at = completed_at;
        }
    }
}
