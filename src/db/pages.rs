use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::models::{SectionKind, Song, SongbookPage};

/// Page rows of a songbook joined with their songs, in printed order. Rows
/// sharing a page number (several songs on one sheet) keep insertion order.
pub fn fetch_pages(conn: &Connection, songbook_id: &str) -> Result<Vec<SongbookPage>> {
    let mut stmt = conn
        .prepare(
            "SELECT p.id, p.songbook_id, p.page_number, s.id, s.title, COALESCE(a.name, '')
             FROM songbook_pages p
             INNER JOIN songs s ON s.id = p.song_id
             LEFT JOIN authors a ON a.id = s.author_id
             WHERE p.songbook_id = ?1
             ORDER BY p.page_number, p.id",
        )
        .context("failed to prepare songbook pages query")?;

    let pages = stmt
        .query_map([songbook_id], |row| {
            Ok(SongbookPage {
                id: row.get(0)?,
                songbook_id: row.get(1)?,
                page_number: row.get(2)?,
                song: Song {
                    id: row.get(3)?,
                    title: row.get(4)?,
                    author: row.get(5)?,
                },
            })
        })
        .context("failed to iterate songbook pages")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect songbook pages")?;

    Ok(pages)
}

/// Place a song on a specific page number.
pub fn insert_page(conn: &Connection, songbook_id: &str, song_id: &str, page_number: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO songbook_pages (songbook_id, song_id, page_number) VALUES (?1, ?2, ?3)",
        params![songbook_id, song_id, page_number],
    )
    .context("failed to insert songbook page")?;
    Ok(conn.last_insert_rowid())
}

/// Place a song on a new page after the last one and return that page number.
pub fn append_page(conn: &Connection, songbook_id: &str, song_id: &str) -> Result<i64> {
    let next: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(page_number), 0) + 1 FROM songbook_pages WHERE songbook_id = ?1",
            [songbook_id],
            |row| row.get(0),
        )
        .context("failed to compute next page number")?;
    insert_page(conn, songbook_id, song_id, next)?;
    Ok(next)
}

/// Delete one page row and close the gap it leaves.
pub fn remove_page(conn: &mut Connection, songbook_id: &str, page_id: i64) -> Result<()> {
    let tx = conn.transaction().context("failed to start transaction")?;
    let deleted = tx
        .execute(
            "DELETE FROM songbook_pages WHERE id = ?1 AND songbook_id = ?2",
            params![page_id, songbook_id],
        )
        .context("failed to delete songbook page")?;
    if deleted == 0 {
        return Err(anyhow!("Page not found"));
    }
    renumber_pages(&tx, songbook_id)?;
    tx.commit().context("failed to commit page removal")
}

/// Swap the page holding `page_id` with its neighbour in direction `delta`
/// (negative = towards the front). Every row on both page numbers moves, so
/// songs sharing a sheet stay together. Returns false at either end of the
/// book.
pub fn move_page(conn: &mut Connection, songbook_id: &str, page_id: i64, delta: i32) -> Result<bool> {
    if delta == 0 {
        return Ok(false);
    }

    let tx = conn.transaction().context("failed to start transaction")?;
    let current: i64 = tx
        .query_row(
            "SELECT page_number FROM songbook_pages WHERE id = ?1 AND songbook_id = ?2",
            params![page_id, songbook_id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to load page")?
        .ok_or_else(|| anyhow!("Page not found"))?;

    let neighbour_sql = if delta < 0 {
        "SELECT page_number FROM songbook_pages
         WHERE songbook_id = ?1 AND page_number < ?2
         ORDER BY page_number DESC LIMIT 1"
    } else {
        "SELECT page_number FROM songbook_pages
         WHERE songbook_id = ?1 AND page_number > ?2
         ORDER BY page_number LIMIT 1"
    };
    let Some(neighbour) = tx
        .query_row(neighbour_sql, params![songbook_id, current], |row| row.get::<_, i64>(0))
        .optional()
        .context("failed to find neighbouring page")?
    else {
        return Ok(false);
    };

    tx.execute(
        "UPDATE songbook_pages
         SET page_number = CASE WHEN page_number = ?2 THEN ?3 ELSE ?2 END
         WHERE songbook_id = ?1 AND page_number IN (?2, ?3)",
        params![songbook_id, current, neighbour],
    )
    .context("failed to swap pages")?;
    renumber_pages(&tx, songbook_id)?;
    tx.commit().context("failed to commit page move")?;

    debug!(songbook_id, page_id, from = current, to = neighbour, "moved page");
    Ok(true)
}

/// Rewrite page numbers to run 1, 2, 3... in their current order. Callers
/// run this inside their own transaction.
pub fn renumber_pages(conn: &Connection, songbook_id: &str) -> Result<()> {
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT page_number FROM songbook_pages
             WHERE songbook_id = ?1 ORDER BY page_number",
        )
        .context("failed to prepare page number query")?;
    let numbers = stmt
        .query_map([songbook_id], |row| row.get::<_, i64>(0))
        .context("failed to iterate page numbers")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect page numbers")?;

    // Park every row on a negative number first so old and new numbers never
    // overlap while rewriting.
    for (idx, old) in numbers.iter().enumerate() {
        conn.execute(
            "UPDATE songbook_pages SET page_number = ?1 WHERE songbook_id = ?2 AND page_number = ?3",
            params![-(idx as i64 + 1), songbook_id, old],
        )
        .context("failed to renumber page")?;
    }
    conn.execute(
        "UPDATE songbook_pages SET page_number = -page_number
         WHERE songbook_id = ?1 AND page_number < 0",
        [songbook_id],
    )
    .context("failed to finish renumbering")?;
    Ok(())
}

/// Append an intro or outro image after the existing ones of that kind.
/// Re-adding a path already present is a no-op.
pub fn add_section_image(
    conn: &Connection,
    songbook_id: &str,
    kind: SectionKind,
    image_path: &str,
) -> Result<()> {
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1 FROM songbook_intro_outro_images
                WHERE songbook_id = ?1 AND type = ?2 AND image_path = ?3
            )",
            params![songbook_id, kind.as_str(), image_path],
            |row| row.get(0),
        )
        .context("failed to check intro/outro image")?;
    if exists {
        return Ok(());
    }

    conn.execute(
        "INSERT INTO songbook_intro_outro_images (songbook_id, type, image_path, sort_order)
         SELECT ?1, ?2, ?3, COALESCE(MAX(sort_order), -1) + 1
         FROM songbook_intro_outro_images
         WHERE songbook_id = ?1 AND type = ?2",
        params![songbook_id, kind.as_str(), image_path],
    )
    .context("failed to insert intro/outro image")?;
    Ok(())
}

/// Intro or outro images of a songbook in display order.
pub fn fetch_section_images(
    conn: &Connection,
    songbook_id: &str,
    kind: SectionKind,
) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT image_path FROM songbook_intro_outro_images
             WHERE songbook_id = ?1 AND type = ?2
             ORDER BY sort_order, id",
        )
        .context("failed to prepare intro/outro query")?;

    let images = stmt
        .query_map(params![songbook_id, kind.as_str()], |row| row.get(0))
        .context("failed to iterate intro/outro images")?
        .collect::<Result<Vec<String>, _>>()
        .context("failed to collect intro/outro images")?;

    Ok(images)
}
