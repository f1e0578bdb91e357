use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::debug;

/// Ensure the database file exists, run lazy migrations, and return a live
/// connection.
pub fn ensure_schema(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(db_path).context("failed to open SQLite database")?;
    init_schema(&conn)?;
    debug!(path = %db_path.display(), "database ready");
    Ok(conn)
}

/// Create every table on an already open connection. Tests call this on an
/// in-memory database. Foreign keys are switched on so deleting a songbook
/// cascades to its pages, intro/outro images and share rows.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'user'
        )",
        [],
    )
    .context("failed to create users table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )
    .context("failed to create authors table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS songs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author_id INTEGER,
            FOREIGN KEY(author_id) REFERENCES authors(id)
        )",
        [],
    )
    .context("failed to create songs table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS song_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id TEXT NOT NULL,
            image_path TEXT NOT NULL,
            FOREIGN KEY(song_id) REFERENCES songs(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create song_images table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS songbooks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            owner_id INTEGER,
            first_page_side TEXT NOT NULL DEFAULT 'right',
            img_path_cover_preview TEXT,
            img_path_cover_front_outer TEXT,
            img_path_cover_front_inner TEXT,
            img_path_cover_back_inner TEXT,
            img_path_cover_back_outer TEXT,
            is_public INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(owner_id) REFERENCES users(id) ON DELETE SET NULL
        )",
        [],
    )
    .context("failed to create songbooks table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS songbook_pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            songbook_id TEXT NOT NULL,
            song_id TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            FOREIGN KEY(songbook_id) REFERENCES songbooks(id) ON DELETE CASCADE,
            FOREIGN KEY(song_id) REFERENCES songs(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create songbook_pages table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS songbook_intro_outro_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            songbook_id TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('intro', 'outro')),
            image_path TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(songbook_id) REFERENCES songbooks(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create songbook_intro_outro_images table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_songbook_access (
            user_id INTEGER NOT NULL,
            songbook_id TEXT NOT NULL,
            permission TEXT NOT NULL DEFAULT 'view',
            PRIMARY KEY (user_id, songbook_id),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(songbook_id) REFERENCES songbooks(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create user_songbook_access table")?;

    Ok(())
}

#[cfg(test)]
pub(crate) fn test_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory database");
    init_schema(&conn).expect("schema");
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let conn = test_connection();
        init_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 8);
    }

    #[test]
    fn ensure_schema_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("songbooks.sqlite");
        let conn = ensure_schema(&path).unwrap();
        drop(conn);
        assert!(path.exists());
    }
}
