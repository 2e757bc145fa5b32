//! Group Repository
//!
//! SQLite-backed storage for groups. A group always belongs to an
//! existing list; deleting it removes its items in the same transaction.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::columns::{encode_time, id_at, time_at};
use super::db::SharedConnection;
use super::item_repo::{row_to_item, ITEM_COLUMNS};
use super::traits::{ListScoped, Patchable, Repository};
use crate::domain::{DomainError, DomainResult, GroupPatch, TodoGroup, TodoItem};

const GROUP_COLUMNS: &str = "id, list_id, name, position, collapsed, created_at";

pub struct GroupRepository {
    conn: SharedConnection,
}

impl GroupRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Insert several groups atomically
    pub async fn create_many(&self, groups: &[TodoGroup]) -> DomainResult<Vec<TodoGroup>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let tx = conn.transaction()?;
        for group in groups {
            insert(&tx, group)?;
        }
        tx.commit()?;

        Ok(groups.to_vec())
    }

    /// Delete a group and its items, returning everything removed
    pub async fn delete_cascade(&self, id: Uuid) -> DomainResult<(TodoGroup, Vec<TodoItem>)> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let tx = conn.transaction()?;
        let group = fetch(&tx, id)?.ok_or_else(|| DomainError::NotFound(format!("group {}", id)))?;

        let items = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM todo_items WHERE group_id = ? ORDER BY position, created_at",
                ITEM_COLUMNS
            ))?;
            let mut rows = stmt.query(params![id.to_string()])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(row_to_item(row)?);
            }
            items
        };

        tx.execute("DELETE FROM todo_items WHERE group_id = ?", params![id.to_string()])?;
        tx.execute("DELETE FROM todo_groups WHERE id = ?", params![id.to_string()])?;
        tx.commit()?;

        Ok((group, items))
    }
}

#[async_trait]
impl Repository<TodoGroup> for GroupRepository {
    async fn create(&self, entity: &TodoGroup) -> DomainResult<TodoGroup> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        insert(conn, entity)?;
        Ok(entity.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<TodoGroup>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        fetch(conn, id)
    }

    async fn update(&self, entity: &TodoGroup) -> DomainResult<TodoGroup> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        write(conn, entity)?;
        Ok(entity.clone())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        self.delete_cascade(id).await.map(|_| ())
    }
}

#[async_trait]
impl ListScoped<TodoGroup> for GroupRepository {
    async fn list_by_list(&self, list_id: Uuid) -> DomainResult<Vec<TodoGroup>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM todo_groups WHERE list_id = ? ORDER BY position, created_at",
            GROUP_COLUMNS
        ))?;
        let mut rows = stmt.query(params![list_id.to_string()])?;

        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(row_to_group(row)?);
        }
        Ok(groups)
    }
}

#[async_trait]
impl Patchable<TodoGroup, GroupPatch> for GroupRepository {
    async fn patch(&self, id: Uuid, patch: &GroupPatch) -> DomainResult<(TodoGroup, TodoGroup)> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let old = fetch(conn, id)?.ok_or_else(|| DomainError::NotFound(format!("group {}", id)))?;
        let mut new = old.clone();
        patch.apply(&mut new);
        write(conn, &new)?;
        Ok((old, new))
    }
}

fn insert(conn: &Connection, group: &TodoGroup) -> DomainResult<()> {
    let list_exists = conn
        .query_row(
            "SELECT 1 FROM todo_lists WHERE id = ?",
            params![group.list_id.to_string()],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !list_exists {
        return Err(DomainError::InvalidInput(format!(
            "group {} references unknown list {}",
            group.id, group.list_id
        )));
    }

    conn.execute(
        "INSERT INTO todo_groups (id, list_id, name, position, collapsed, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            group.id.to_string(),
            group.list_id.to_string(),
            group.name,
            group.position,
            group.collapsed,
            encode_time(&group.created_at),
        ],
    )?;
    Ok(())
}

fn fetch(conn: &Connection, id: Uuid) -> DomainResult<Option<TodoGroup>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM todo_groups WHERE id = ?", GROUP_COLUMNS))?;
    let row = stmt
        .query_row(params![id.to_string()], |row| Ok(row_to_group(row)))
        .optional()?;
    row.transpose()
}

fn write(conn: &Connection, group: &TodoGroup) -> DomainResult<()> {
    let updated = conn.execute(
        "UPDATE todo_groups SET name = ?, position = ?, collapsed = ? WHERE id = ?",
        params![group.name, group.position, group.collapsed, group.id.to_string()],
    )?;
    if updated == 0 {
        return Err(DomainError::NotFound(format!("group {}", group.id)));
    }
    Ok(())
}

/// Convert a database row to TodoGroup
fn row_to_group(row: &rusqlite::Row) -> DomainResult<TodoGroup> {
    Ok(TodoGroup {
        id: id_at(row, 0)?,
        list_id: id_at(row, 1)?,
        name: row.get(2)?,
        position: row.get(3)?,
        collapsed: row.get(4)?,
        created_at: time_at(row, 5)?,
    })
}
