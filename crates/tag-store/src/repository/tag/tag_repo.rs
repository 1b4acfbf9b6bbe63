//! Tag Repository - Core CRUD Operations
//!
//! SQLite-backed implementation for tag CRUD operations.
//! Specialized operations are in separate modules:
//! - tag_attributes: color map and favorites set
//! - tag_positioning: sort order management

use async_trait::async_trait;
use rusqlite::params;

use super::super::db::SharedConnection;
use super::super::traits::Repository;
use crate::domain::{DomainError, DomainResult, TagColor, TagId, TagRecord};

const TAG_COLUMNS: &str =
    "id, name, color, parent_id, is_parent, is_pinned, is_favorite, sort_order";

/// SQLite implementation of the tag repository
pub struct SqliteTagRepository {
    pub(super) conn: SharedConnection,
}

impl SqliteTagRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

pub(super) fn not_initialized() -> DomainError {
    DomainError::Persistence("Database not initialized".to_string())
}

#[async_trait]
impl Repository<TagRecord> for SqliteTagRepository {
    async fn create(&self, entity: &TagRecord) -> DomainResult<TagRecord> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        conn.execute(
            "INSERT INTO tags (name, color, parent_id, is_parent, is_pinned, is_favorite, sort_order, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entity.name,
                entity.color.to_string(),
                entity.parent_id.map(|p| p.0),
                entity.is_parent,
                entity.is_pinned,
                entity.is_favorite,
                entity.sort_order,
                chrono::Utc::now().timestamp_millis()
            ],
        )?;

        let mut tag = entity.clone();
        tag.id = TagId(conn.last_insert_rowid() as u32);
        Ok(tag)
    }

    async fn find_by_id(&self, id: TagId) -> DomainResult<Option<TagRecord>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let mut stmt = conn.prepare(&format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS))?;
        let mut rows = stmt.query(params![id.0])?;

        match rows.next()? {
            Some(row) => Ok(Some(row_to_tag(row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> DomainResult<Vec<TagRecord>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tags ORDER BY sort_order, id",
            TAG_COLUMNS
        ))?;
        let mut rows = stmt.query([])?;

        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(row_to_tag(row)?);
        }
        Ok(tags)
    }

    async fn update(&self, entity: &TagRecord) -> DomainResult<TagRecord> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn.execute(
            "UPDATE tags SET name = ?, color = ?, parent_id = ?, is_parent = ?, is_pinned = ?,
                 is_favorite = ?, sort_order = ?, updated_at = ?
             WHERE id = ?",
            params![
                entity.name,
                entity.color.to_string(),
                entity.parent_id.map(|p| p.0),
                entity.is_parent,
                entity.is_pinned,
                entity.is_favorite,
                entity.sort_order,
                chrono::Utc::now().timestamp_millis(),
                entity.id.0
            ],
        )?;

        if changed == 0 {
            return Err(DomainError::NotFound(format!("Tag {} not found", entity.id)));
        }
        Ok(entity.clone())
    }

    async fn delete(&self, id: TagId) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn.execute("DELETE FROM tags WHERE id = ?", params![id.0])?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Tag {} not found", id)));
        }
        Ok(())
    }
}

/// Convert a database row to TagRecord
pub(super) fn row_to_tag(row: &rusqlite::Row) -> DomainResult<TagRecord> {
    let color: String = row.get(2)?;
    Ok(TagRecord {
        id: TagId(row.get(0)?),
        name: row.get(1)?,
        // Unknown color strings from older clients fall back to the default
        color: color.parse::<TagColor>().unwrap_or_default(),
        parent_id: row.get::<_, Option<u32>>(3)?.map(TagId),
        is_parent: row.get(4)?,
        is_pinned: row.get(5)?,
        is_favorite: row.get(6)?,
        sort_order: row.get(7)?,
    })
}
