//! Tag Attribute Operations
//!
//! Name-keyed side tables: `tag_colors` and `favorite_tags`.

use async_trait::async_trait;
use rusqlite::params;
use std::collections::{BTreeMap, BTreeSet};

use super::super::traits::TagAttributeOperations;
use super::tag_repo::{not_initialized, SqliteTagRepository};
use crate::domain::{DomainResult, TagColor};

#[async_trait]
impl TagAttributeOperations for SqliteTagRepository {
    async fn load_colors(&self) -> DomainResult<BTreeMap<String, TagColor>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let mut stmt = conn.prepare("SELECT name, color FROM tag_colors")?;
        let mut rows = stmt.query([])?;

        let mut colors = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let raw: String = row.get(1)?;
            match raw.parse::<TagColor>() {
                Ok(color) => {
                    colors.insert(name, color);
                }
                Err(e) => log::warn!("Skipping color for '{}': {}", name, e),
            }
        }
        Ok(colors)
    }

    async fn save_color(&self, name: &str, color: &TagColor) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        conn.execute(
            "INSERT INTO tag_colors (name, color) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET name = ?1, color = ?2",
            params![name, color.to_string()],
        )?;
        Ok(())
    }

    async fn remove_color(&self, name: &str) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        conn.execute("DELETE FROM tag_colors WHERE name = ?", params![name])?;
        Ok(())
    }

    async fn rename_color(&self, old_name: &str, new_name: &str) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;

        let tx = conn.transaction()?;
        // Stale entry left under the new name by an earlier delete
        tx.execute(
            "DELETE FROM tag_colors WHERE name = ?1 AND name <> ?2",
            params![new_name, old_name],
        )?;
        tx.execute(
            "UPDATE tag_colors SET name = ?1 WHERE name = ?2",
            params![new_name, old_name],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn load_favorites(&self) -> DomainResult<BTreeSet<String>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let mut stmt = conn.prepare("SELECT name FROM favorite_tags")?;
        let mut rows = stmt.query([])?;

        let mut names = BTreeSet::new();
        while let Some(row) = rows.next()? {
            names.insert(row.get::<_, String>(0)?);
        }
        Ok(names)
    }

    async fn save_favorites(&self, names: &BTreeSet<String>) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM favorite_tags", [])?;
        for name in names {
            tx.execute("INSERT INTO favorite_tags (name) VALUES (?)", params![name])?;
        }
        tx.commit()?;
        Ok(())
    }
}
