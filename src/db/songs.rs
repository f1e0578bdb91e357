use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};

use crate::models::Song;

/// Author name attached to placeholder songs that only exist to hold a
/// non-song page (an index, a blank sheet, an illustration).
pub const SYSTEM_AUTHOR: &str = "System";

/// Return the id of the author called `name`, inserting it on first use.
pub fn ensure_author(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO authors (name) VALUES (?1)",
        [name],
    )
    .context("failed to insert author")?;

    conn.query_row("SELECT id FROM authors WHERE name = ?1", [name], |row| {
        row.get(0)
    })
    .context("failed to load author id")
}

/// Insert or refresh a song row. Existing songs keep their images.
pub fn upsert_song(conn: &Connection, id: &str, title: &str, author_id: Option<i64>) -> Result<()> {
    conn.execute(
        "INSERT INTO songs (id, title, author_id) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET title = excluded.title, author_id = excluded.author_id",
        params![id, title, author_id],
    )
    .context("failed to upsert song")?;
    Ok(())
}

/// Attach a page image to a song. Attaching the same path twice is a no-op.
pub fn add_song_image(conn: &Connection, song_id: &str, image_path: &str) -> Result<()> {
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM song_images WHERE song_id = ?1 AND image_path = ?2)",
            params![song_id, image_path],
            |row| row.get(0),
        )
        .context("failed to check song image")?;
    if exists {
        return Ok(());
    }

    conn.execute(
        "INSERT INTO song_images (song_id, image_path) VALUES (?1, ?2)",
        params![song_id, image_path],
    )
    .map_err(|err| match err.sqlite_error_code() {
        Some(rusqlite::ErrorCode::ConstraintViolation) => anyhow!("Song {song_id} does not exist."),
        _ => err.into(),
    })
    .context("failed to insert song image")?;
    Ok(())
}

/// Images of a song in the order they were attached.
pub fn fetch_song_images(conn: &Connection, song_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT image_path FROM song_images WHERE song_id = ?1 ORDER BY id")
        .context("failed to prepare song image query")?;

    let images = stmt
        .query_map([song_id], |row| row.get(0))
        .context("failed to iterate song images")?
        .collect::<Result<Vec<String>, _>>()
        .context("failed to collect song images")?;

    Ok(images)
}

/// Every real song (placeholders excluded), ordered case-insensitively so the
/// song picker groups mixed-case titles together.
pub fn fetch_all_songs(conn: &Connection) -> Result<Vec<Song>> {
    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.title, COALESCE(a.name, '')
             FROM songs s
             LEFT JOIN authors a ON a.id = s.author_id
             WHERE COALESCE(a.name, '') <> ?1
             ORDER BY s.title COLLATE NOCASE, a.name COLLATE NOCASE",
        )
        .context("failed to prepare all songs query")?;

    let songs = stmt
        .query_map([SYSTEM_AUTHOR], |row| {
            Ok(Song {
                id: row.get(0)?,
                title: row.get(1)?,
                author: row.get(2)?,
            })
        })
        .context("failed to iterate songs")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect songs")?;

    Ok(songs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_connection;

    #[test]
    fn authors_are_reused() {
        let conn = test_connection();
        let first = ensure_author(&conn, "Karel Kryl").unwrap();
        let second = ensure_author(&conn, "Karel Kryl").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn song_images_keep_insertion_order_without_duplicates() {
        let conn = test_connection();
        upsert_song(&conn, "1_a", "Song A", None).unwrap();
        add_song_image(&conn, "1_a", "p2.png").unwrap();
        add_song_image(&conn, "1_a", "p1.png").unwrap();
        add_song_image(&conn, "1_a", "p2.png").unwrap();

        assert_eq!(fetch_song_images(&conn, "1_a").unwrap(), ["p2.png", "p1.png"]);
    }

    #[test]
    fn image_for_unknown_song_fails() {
        let conn = test_connection();
        assert!(add_song_image(&conn, "missing", "p1.png").is_err());
    }

    #[test]
    fn placeholder_songs_are_hidden_from_picker() {
        let conn = test_connection();
        let system = ensure_author(&conn, SYSTEM_AUTHOR).unwrap();
        let author = ensure_author(&conn, "Author").unwrap();
        upsert_song(&conn, "1_page_3", "Non-song page 3", Some(system)).unwrap();
        upsert_song(&conn, "1_b", "beta", Some(author)).unwrap();
        upsert_song(&conn, "1_a", "Alpha", None).unwrap();

        let titles: Vec<String> = fetch_all_songs(&conn)
            .unwrap()
            .into_iter()
            .map(|song| song.title)
            .collect();
        assert_eq!(titles, ["Alpha", "beta"]);
    }
}
