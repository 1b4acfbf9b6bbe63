//! Database Connection and Setup
//!
//! Manages the SQLite connection and migrations.

use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};

/// Shared connection handle. `None` until `init_db` has run.
pub type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Database state wrapper
pub struct DbState {
    conn: SharedConnection,
}

impl DbState {
    /// State with no open database
    pub fn new() -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle to hand to repositories
    pub fn connection(&self) -> SharedConnection {
        Arc::clone(&self.conn)
    }

    pub async fn is_initialized(&self) -> bool {
        self.conn.lock().await.is_some()
    }
}

impl Default for DbState {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize database with path. `:memory:` opens a private in-memory database.
pub async fn init_db(db_path: &Path) -> DomainResult<DbState> {
    let conn = if db_path.as_os_str() == ":memory:" {
        Connection::open_in_memory()?
    } else {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DomainError::Persistence(format!("Failed to create db dir: {}", e)))?;
            }
        }
        Connection::open(db_path)?
    };

    run_migrations(&conn)?;
    log::info!("Tag database ready at {}", db_path.display());

    let state = DbState::new();
    *state.conn.lock().await = Some(conn);
    Ok(state)
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let query = format!("PRAGMA table_info({})", table);
    let Ok(mut stmt) = conn.prepare(&query) else {
        return false;
    };
    let Ok(mut rows) = stmt.query([]) else {
        return false;
    };
    while let Ok(Some(row)) = rows.next() {
        if let Ok(name) = row.get::<_, String>(1) {
            if name == column {
                return true;
            }
        }
    }
    false
}

fn add_column(conn: &Connection, table: &str, column: &str, decl: &str) -> DomainResult<()> {
    if !column_exists(conn, table, column) {
        conn.execute(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl), [])
            .map_err(|e| DomainError::Persistence(format!("Failed to add {}: {}", column, e)))?;
        log::debug!("Migrated {}: added column {}", table, column);
    }
    Ok(())
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    // Tags table - create if not exists
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            color TEXT NOT NULL DEFAULT 'default',
            updated_at INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // Hierarchy and display columns, added to older databases in place
    add_column(conn, "tags", "parent_id", "INTEGER")?;
    add_column(conn, "tags", "is_parent", "INTEGER NOT NULL DEFAULT 0")?;
    add_column(conn, "tags", "is_pinned", "INTEGER NOT NULL DEFAULT 0")?;
    add_column(conn, "tags", "is_favorite", "INTEGER NOT NULL DEFAULT 0")?;
    add_column(conn, "tags", "sort_order", "INTEGER NOT NULL DEFAULT 0")?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_name ON tags(name COLLATE NOCASE)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tags_parent ON tags(parent_id)",
        [],
    )?;

    // Name-keyed side tables
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tag_colors (
            name TEXT PRIMARY KEY COLLATE NOCASE,
            color TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS favorite_tags (
            name TEXT PRIMARY KEY
        )",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert!(column_exists(&conn, "tags", "sort_order"));
        assert!(!column_exists(&conn, "tags", "position"));
    }

    #[tokio::test]
    async fn test_upgrades_old_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE tags (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, color TEXT NOT NULL DEFAULT 'default', updated_at INTEGER NOT NULL DEFAULT 0)",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO tags (name) VALUES ('Old')", []).unwrap();
        run_migrations(&conn).unwrap();

        let is_parent: i64 = conn
            .query_row("SELECT is_parent FROM tags WHERE name = 'Old'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(is_parent, 0);
    }

    #[tokio::test]
    async fn test_init_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tags.db");
        let state = init_db(&path).await.unwrap();
        assert!(state.is_initialized().await);
        assert!(path.exists());
    }
}
