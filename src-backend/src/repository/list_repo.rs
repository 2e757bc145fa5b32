//! List Repository
//!
//! SQLite-backed storage for list rows. Deleting a list removes its
//! groups and items through the foreign keys.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::columns::{encode_time, id_at, time_at};
use super::db::SharedConnection;
use super::traits::{Patchable, Repository};
use crate::domain::{DomainError, DomainResult, ListPatch, TodoList};

pub struct ListRepository {
    conn: SharedConnection,
}

impl ListRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Repository<TodoList> for ListRepository {
    async fn create(&self, entity: &TodoList) -> DomainResult<TodoList> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        conn.execute(
            "INSERT INTO todo_lists (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
            params![
                entity.id.to_string(),
                entity.name,
                encode_time(&entity.created_at),
                encode_time(&entity.updated_at),
            ],
        )?;

        Ok(entity.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<TodoList>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        fetch(conn, id)
    }

    async fn update(&self, entity: &TodoList) -> DomainResult<TodoList> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        write(conn, entity)?;
        Ok(entity.clone())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let deleted = conn.execute("DELETE FROM todo_lists WHERE id = ?", params![id.to_string()])?;
        if deleted == 0 {
            return Err(DomainError::NotFound(format!("list {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl Patchable<TodoList, ListPatch> for ListRepository {
    async fn patch(&self, id: Uuid, patch: &ListPatch) -> DomainResult<(TodoList, TodoList)> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let old = fetch(conn, id)?.ok_or_else(|| DomainError::NotFound(format!("list {}", id)))?;
        let mut new = old.clone();
        patch.apply(&mut new);
        write(conn, &new)?;
        Ok((old, new))
    }
}

fn fetch(conn: &Connection, id: Uuid) -> DomainResult<Option<TodoList>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at, updated_at FROM todo_lists WHERE id = ?")?;
    let row = stmt
        .query_row(params![id.to_string()], |row| Ok(row_to_list(row)))
        .optional()?;
    row.transpose()
}

fn write(conn: &Connection, list: &TodoList) -> DomainResult<()> {
    let updated = conn.execute(
        "UPDATE todo_lists SET name = ?, updated_at = ? WHERE id = ?",
        params![list.name, encode_time(&list.updated_at), list.id.to_string()],
    )?;
    if updated == 0 {
        return Err(DomainError::NotFound(format!("list {}", list.id)));
    }
    Ok(())
}

/// Convert a database row to TodoList
fn row_to_list(row: &rusqlite::Row) -> DomainResult<TodoList> {
    Ok(TodoList {
        id: id_at(row, 0)?,
        name: row.get(1)?,
        created_at: time_at(row, 2)?,
        updated_at: time_at(row, 3)?,
    })
}
