use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::layout::{CoverImages, PageSide};
use crate::models::{CurrentUser, Songbook};

const SONGBOOK_COLUMNS: &str = "s.id, s.title, s.owner_id, s.first_page_side,
    s.img_path_cover_preview, s.img_path_cover_front_outer, s.img_path_cover_front_inner,
    s.img_path_cover_back_inner, s.img_path_cover_back_outer, s.is_public";

fn songbook_from_row(row: &Row<'_>) -> rusqlite::Result<Songbook> {
    let side: String = row.get(3)?;
    let is_public: i64 = row.get(9)?;
    Ok(Songbook {
        id: row.get(0)?,
        title: row.get(1)?,
        owner_id: row.get(2)?,
        first_page_side: PageSide::from_db(&side),
        cover_preview: row.get(4)?,
        covers: CoverImages {
            front_outer: non_empty(row.get(5)?),
            front_inner: non_empty(row.get(6)?),
            back_inner: non_empty(row.get(7)?),
            back_outer: non_empty(row.get(8)?),
        },
        is_public: is_public != 0,
    })
}

/// Older imports stored empty strings for missing covers.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|path| !path.trim().is_empty())
}

pub fn fetch_songbook(conn: &Connection, id: &str) -> Result<Option<Songbook>> {
    conn.query_row(
        &format!("SELECT {SONGBOOK_COLUMNS} FROM songbooks s WHERE s.id = ?1"),
        [id],
        songbook_from_row,
    )
    .optional()
    .context("failed to load songbook")
}

/// Songbooks the user may open: public ones, their own, ones shared with
/// them, or everything for administrators. Sorted by title for the shelf.
pub fn fetch_visible_songbooks(conn: &Connection, user: &CurrentUser) -> Result<Vec<Songbook>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SONGBOOK_COLUMNS}
             FROM songbooks s
             WHERE ?1
                OR s.is_public = 1
                OR s.owner_id = ?2
                OR EXISTS (
                    SELECT 1 FROM user_songbook_access a
                    WHERE a.songbook_id = s.id AND a.user_id = ?2
                )
             ORDER BY s.title COLLATE NOCASE, s.id"
        ))
        .context("failed to prepare songbook query")?;

    let songbooks = stmt
        .query_map(params![user.is_admin(), user.id], songbook_from_row)
        .context("failed to load songbooks")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect songbooks")?;

    Ok(songbooks)
}

/// Insert a complete songbook row, overwriting an existing one with the same
/// id. Used by the seed importer, which owns the identifiers. Existing rows
/// are updated in place so their pages survive.
pub fn insert_songbook(conn: &Connection, songbook: &Songbook) -> Result<()> {
    conn.execute(
        "INSERT INTO songbooks (
            id, title, owner_id, first_page_side,
            img_path_cover_preview,
            img_path_cover_front_outer, img_path_cover_front_inner,
            img_path_cover_back_inner, img_path_cover_back_outer,
            is_public
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            owner_id = excluded.owner_id,
            first_page_side = excluded.first_page_side,
            img_path_cover_preview = excluded.img_path_cover_preview,
            img_path_cover_front_outer = excluded.img_path_cover_front_outer,
            img_path_cover_front_inner = excluded.img_path_cover_front_inner,
            img_path_cover_back_inner = excluded.img_path_cover_back_inner,
            img_path_cover_back_outer = excluded.img_path_cover_back_outer,
            is_public = excluded.is_public",
        params![
            songbook.id,
            songbook.title,
            songbook.owner_id,
            songbook.first_page_side.as_str(),
            songbook.cover_preview,
            songbook.covers.front_outer,
            songbook.covers.front_inner,
            songbook.covers.back_inner,
            songbook.covers.back_outer,
            songbook.is_public,
        ],
    )
    .context("failed to insert songbook")?;
    Ok(())
}

/// Create a new private songbook for `owner_id` and return it. Identifiers
/// are zero-padded numbers continuing after the highest numeric id in use.
pub fn create_songbook(conn: &Connection, title: &str, owner_id: Option<i64>) -> Result<Songbook> {
    let title = title.trim();
    if title.is_empty() {
        return Err(anyhow!("Songbook title is required."));
    }

    let next: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(CAST(id AS INTEGER)), 0) + 1 FROM songbooks",
            [],
            |row| row.get(0),
        )
        .context("failed to compute next songbook id")?;

    let songbook = Songbook {
        id: format!("{next:05}"),
        title: title.to_string(),
        owner_id,
        first_page_side: PageSide::default(),
        cover_preview: None,
        covers: CoverImages::default(),
        is_public: false,
    };
    insert_songbook(conn, &songbook)?;
    info!(id = %songbook.id, title = %songbook.title, "created songbook");
    Ok(songbook)
}

pub fn rename_songbook(conn: &Connection, id: &str, title: &str) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(anyhow!("Songbook title is required."));
    }
    let updated = conn
        .execute(
            "UPDATE songbooks SET title = ?1 WHERE id = ?2",
            params![title, id],
        )
        .context("failed to rename songbook")?;
    expect_one(updated)
}

pub fn set_public(conn: &Connection, id: &str, is_public: bool) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE songbooks SET is_public = ?1 WHERE id = ?2",
            params![is_public, id],
        )
        .context("failed to update songbook visibility")?;
    expect_one(updated)
}

pub fn set_first_page_side(conn: &Connection, id: &str, side: PageSide) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE songbooks SET first_page_side = ?1 WHERE id = ?2",
            params![side.as_str(), id],
        )
        .context("failed to update first page side")?;
    expect_one(updated)
}

/// Remove a songbook. Pages, intro/outro images and share rows cascade.
pub fn delete_songbook(conn: &Connection, id: &str) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM songbooks WHERE id = ?1", [id])
        .context("failed to delete songbook")?;
    expect_one(deleted)
}

/// Wipe a songbook together with the songs that were imported for it (their
/// ids carry the songbook id as prefix) so it can be imported again.
pub fn reset_songbook(conn: &Connection, id: &str) -> Result<()> {
    let prefix = format!("{id}\\_%");
    conn.execute(
        "DELETE FROM songbook_pages WHERE songbook_id = ?1",
        [id],
    )
    .context("failed to clear songbook pages")?;
    conn.execute(
        "DELETE FROM songs WHERE id LIKE ?1 ESCAPE '\\'
         AND NOT EXISTS (SELECT 1 FROM songbook_pages p WHERE p.song_id = songs.id)",
        [&prefix],
    )
    .context("failed to clear songbook songs")?;
    conn.execute(
        "DELETE FROM songbook_intro_outro_images WHERE songbook_id = ?1",
        [id],
    )
    .context("failed to clear intro/outro images")?;
    conn.execute("DELETE FROM songbooks WHERE id = ?1", [id])
        .context("failed to delete songbook")?;
    Ok(())
}

fn expect_one(rows: usize) -> Result<()> {
    if rows == 0 {
        Err(anyhow!("Songbook not found"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_connection;
    use crate::db::{share_songbook, ensure_user, upsert_song};
    use crate::models::{Permission, Role};

    fn public_book(conn: &Connection, id: &str, title: &str) {
        insert_songbook(
            conn,
            &Songbook {
                id: id.into(),
                title: title.into(),
                owner_id: None,
                first_page_side: PageSide::Left,
                cover_preview: None,
                covers: CoverImages {
                    front_outer: Some(format!("{id}/coverfrontout.png")),
                    ..Default::default()
                },
                is_public: true,
            },
        )
        .unwrap();
    }

    #[test]
    fn round_trips_songbook_columns() {
        let conn = test_connection();
        public_book(&conn, "00001", "Campfire");

        let book = fetch_songbook(&conn, "00001").unwrap().unwrap();
        assert_eq!(book.first_page_side, PageSide::Left);
        assert_eq!(book.covers.front_outer.as_deref(), Some("00001/coverfrontout.png"));
        assert!(book.covers.front_inner.is_none());
        assert!(book.is_public);
    }

    #[test]
    fn visibility_follows_ownership_and_sharing() {
        let conn = test_connection();
        let owner = ensure_user(&conn, "owner@test.com", Role::User).unwrap();
        let friend = ensure_user(&conn, "friend@test.com", Role::User).unwrap();
        let stranger = ensure_user(&conn, "stranger@test.com", Role::User).unwrap();
        let admin = ensure_user(&conn, "admin@test.com", Role::Admin).unwrap();

        public_book(&conn, "00001", "Public");
        let private = create_songbook(&conn, "Private", Some(owner.id)).unwrap();
        share_songbook(&conn, &private.id, friend.id, Permission::View).unwrap();

        let titles = |user: &CurrentUser| -> Vec<String> {
            fetch_visible_songbooks(&conn, user)
                .unwrap()
                .into_iter()
                .map(|book| book.title)
                .collect()
        };

        assert_eq!(titles(&CurrentUser::from_user(&owner)), ["Private", "Public"]);
        assert_eq!(titles(&CurrentUser::from_user(&friend)), ["Private", "Public"]);
        assert_eq!(titles(&CurrentUser::from_user(&stranger)), ["Public"]);
        assert_eq!(titles(&CurrentUser::anonymous()), ["Public"]);
        assert_eq!(titles(&CurrentUser::from_user(&admin)), ["Private", "Public"]);
    }

    #[test]
    fn created_ids_continue_numbering() {
        let conn = test_connection();
        public_book(&conn, "00101", "Seeded");
        let created = create_songbook(&conn, "  Mine  ", None).unwrap();
        assert_eq!(created.id, "00102");
        assert_eq!(created.title, "Mine");
        assert!(create_songbook(&conn, "   ", None).is_err());
    }

    #[test]
    fn updates_report_missing_songbooks() {
        let conn = test_connection();
        public_book(&conn, "00001", "Book");

        rename_songbook(&conn, "00001", "Renamed").unwrap();
        set_public(&conn, "00001", false).unwrap();
        set_first_page_side(&conn, "00001", PageSide::Right).unwrap();
        let book = fetch_songbook(&conn, "00001").unwrap().unwrap();
        assert_eq!(book.title, "Renamed");
        assert!(!book.is_public);
        assert_eq!(book.first_page_side, PageSide::Right);

        assert!(rename_songbook(&conn, "99999", "x").is_err());
        assert!(delete_songbook(&conn, "99999").is_err());
    }

    #[test]
    fn reset_removes_imported_songs_only() {
        let conn = test_connection();
        public_book(&conn, "00001", "Book");
        upsert_song(&conn, "00001_1", "Own", None).unwrap();
        upsert_song(&conn, "000010_1", "Other book", None).unwrap();
        crate::db::append_page(&conn, "00001", "00001_1").unwrap();

        reset_songbook(&conn, "00001").unwrap();

        assert!(fetch_songbook(&conn, "00001").unwrap().is_none());
        let remaining: Vec<String> = conn
            .prepare("SELECT id FROM songs")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(remaining, ["000010_1"]);
    }
}
