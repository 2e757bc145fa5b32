//! Item Repository
//!
//! SQLite-backed storage for todo items.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::columns::{decode_id, encode_time, id_at, optional_time_at, time_at};
use super::db::SharedConnection;
use super::traits::{ListScoped, Patchable, Repository};
use crate::domain::{DomainError, DomainResult, ItemPatch, TodoItem};

pub(super) const ITEM_COLUMNS: &str =
    "id, group_id, list_id, text, done, position, created_at, completed_at";

pub struct ItemRepository {
    conn: SharedConnection,
}

impl ItemRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Insert several items atomically; one bad item rejects them all
    pub async fn create_many(&self, items: &[TodoItem]) -> DomainResult<Vec<TodoItem>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let tx = conn.transaction()?;
        for item in items {
            insert(&tx, item)?;
        }
        tx.commit()?;

        Ok(items.to_vec())
    }
}

#[async_trait]
impl Repository<TodoItem> for ItemRepository {
    async fn create(&self, entity: &TodoItem) -> DomainResult<TodoItem> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        insert(conn, entity)?;
        Ok(entity.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<TodoItem>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        fetch(conn, id)
    }

    async fn update(&self, entity: &TodoItem) -> DomainResult<TodoItem> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        write(conn, entity)?;
        Ok(entity.clone())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let deleted = conn.execute("DELETE FROM todo_items WHERE id = ?", params![id.to_string()])?;
        if deleted == 0 {
            return Err(DomainError::NotFound(format!("item {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ListScoped<TodoItem> for ItemRepository {
    async fn list_by_list(&self, list_id: Uuid) -> DomainResult<Vec<TodoItem>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM todo_items WHERE list_id = ? ORDER BY position, created_at",
            ITEM_COLUMNS
        ))?;
        let mut rows = stmt.query(params![list_id.to_string()])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(row_to_item(row)?);
        }
        Ok(items)
    }
}

#[async_trait]
impl Patchable<TodoItem, ItemPatch> for ItemRepository {
    async fn patch(&self, id: Uuid, patch: &ItemPatch) -> DomainResult<(TodoItem, TodoItem)> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let old = fetch(conn, id)?.ok_or_else(|| DomainError::NotFound(format!("item {}", id)))?;
        let mut new = old.clone();
        // Writers other than the list store may send raw patches
        patch.clone().normalized(Some(&old), Utc::now()).apply(&mut new);
        write(conn, &new)?;
        Ok((old, new))
    }
}

fn insert(conn: &Connection, item: &TodoItem) -> DomainResult<()> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT list_id FROM todo_groups WHERE id = ?",
            params![item.group_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    match owner.as_deref().map(decode_id).transpose()? {
        None => {
            return Err(DomainError::InvalidInput(format!(
                "item {} references unknown group {}",
                item.id, item.group_id
            )))
        }
        Some(list_id) if list_id != item.list_id => {
            return Err(DomainError::InvalidInput(format!(
                "group {} does not belong to list {}",
                item.group_id, item.list_id
            )))
        }
        Some(_) => {}
    }

    conn.execute(
        "INSERT INTO todo_items (id, group_id, list_id, text, done, position, created_at, completed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            item.id.to_string(),
            item.group_id.to_string(),
            item.list_id.to_string(),
            item.text,
            item.done,
            item.position,
            encode_time(&item.created_at),
            item.completed_at.as_ref().map(encode_time),
        ],
    )?;
    Ok(())
}

fn fetch(conn: &Connection, id: Uuid) -> DomainResult<Option<TodoItem>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM todo_items WHERE id = ?", ITEM_COLUMNS))?;
    let row = stmt
        .query_row(params![id.to_string()], |row| Ok(row_to_item(row)))
        .optional()?;
    row.transpose()
}

fn write(conn: &Connection, item: &TodoItem) -> DomainResult<()> {
    let updated = conn.execute(
        "UPDATE todo_items SET text = ?, done = ?, position = ?, completed_at = ? WHERE id = ?",
        params![
            item.text,
            item.done,
            item.position,
            item.completed_at.as_ref().map(encode_time),
            item.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DomainError::NotFound(format!("item {}", item.id)));
    }
    Ok(())
}

/// Convert a database row to TodoItem
pub(super) fn row_to_item(row: &rusqlite::Row) -> DomainResult<TodoItem> {
    Ok(TodoItem {
        id: id_at(row, 0)?,
        group_id: id_at(row, 1)?,
        list_id: id_at(row, 2)?,
        text: row.get(3)?,
        done: row.get(4)?,
        position: row.get(5)?,
        created_at: time_at(row, 6)?,
        completed_at: optional_time_at(row, 7)?,
    })
}
