//! Tag Positioning Operations
//!
//! New tags are appended after the current maximum sort order.

use async_trait::async_trait;

use super::super::traits::{slot_after, TagPositioningOperations};
use super::tag_repo::{not_initialized, SqliteTagRepository};
use crate::domain::DomainResult;

#[async_trait]
impl TagPositioningOperations for SqliteTagRepository {
    async fn next_sort_order(&self) -> DomainResult<i32> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let max: Option<i32> = conn.query_row("SELECT MAX(sort_order) FROM tags", [], |row| row.get(0))?;
        slot_after(max)
    }
}
