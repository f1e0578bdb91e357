//! Import songbooks from JSON seed files.
//!
//! A seed file describes one songbook: its covers, its songs, and the page
//! images with the songs printed on each. Intro/outro pages carry no songs and
//! are flagged by `type`. Importing replaces any previous copy of the songbook.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::{
    add_section_image, add_song_image, ensure_author, ensure_user, insert_page, insert_songbook,
    reset_songbook, share_songbook, upsert_song, SYSTEM_AUTHOR,
};
use crate::layout::{CoverImages, PageSide};
use crate::models::{Permission, Role, SectionKind, Songbook};

const UNKNOWN_AUTHOR: &str = "Unknown author";

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub first_page_side: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    /// E-mail of the owning account. Owned songbooks default to private.
    #[serde(default)]
    pub owner: Option<String>,
    /// E-mails granted edit access.
    #[serde(default)]
    pub shared: Vec<String>,
    pub img_path_cover_preview: Option<String>,
    pub img_path_cover_front_outer: Option<String>,
    pub img_path_cover_front_inner: Option<String>,
    pub img_path_cover_back_inner: Option<String>,
    pub img_path_cover_back_outer: Option<String>,
    #[serde(default)]
    pub songs: Vec<SeedSong>,
    #[serde(default)]
    pub pages: Vec<SeedPage>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSong {
    pub song_id: SeedId,
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedPage {
    pub page_number: Option<i64>,
    pub image_path: Option<String>,
    #[serde(default)]
    pub song_ids: Vec<SeedId>,
    #[serde(rename = "type", default)]
    pub page_type: Option<String>,
}

/// Song ids appear both as numbers and as strings in existing seed files.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum SeedId {
    Number(i64),
    Text(String),
}

impl SeedId {
    fn key(&self) -> String {
        match self {
            SeedId::Number(n) => n.to_string(),
            SeedId::Text(s) => s.trim().to_string(),
        }
    }
}

/// Totals reported after an import run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub songbooks: usize,
    pub songs: usize,
    pub pages: usize,
    pub skipped_pages: usize,
}

impl SeedSummary {
    fn absorb(&mut self, other: SeedSummary) {
        self.songbooks += other.songbooks;
        self.songs += other.songs;
        self.pages += other.pages;
        self.skipped_pages += other.skipped_pages;
    }
}

/// Import every `*.json` file found at `path`, which may be a single file or a
/// directory (scanned non-recursively, in file name order).
pub fn seed_path(conn: &mut Connection, path: &Path) -> Result<SeedSummary> {
    let files = seed_files(path)?;
    let mut summary = SeedSummary::default();
    for file in files {
        summary.absorb(seed_file(conn, &file)?);
    }
    info!(
        songbooks = summary.songbooks,
        songs = summary.songs,
        pages = summary.pages,
        skipped = summary.skipped_pages,
        "seed import finished"
    );
    Ok(summary)
}

fn seed_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = fs::read_dir(path)
        .with_context(|| format!("failed to read seed directory {}", path.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to list seed directory")?;
    files.retain(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"));
    files.sort();
    Ok(files)
}

/// Import one seed file inside a single transaction.
pub fn seed_file(conn: &mut Connection, path: &Path) -> Result<SeedSummary> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let seed: SeedFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse seed file {}", path.display()))?;

    let fallback_id = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let tx = conn.transaction().context("failed to start seed transaction")?;
    let summary = import_seed(&tx, &seed, &fallback_id)?;
    tx.commit().context("failed to commit seed import")?;
    Ok(summary)
}

/// Write one parsed seed into the store. The caller owns the transaction.
pub fn import_seed(conn: &Connection, seed: &SeedFile, fallback_id: &str) -> Result<SeedSummary> {
    let songbook_id = seed
        .id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| fallback_id.to_string());
    let title = seed.title.clone().unwrap_or_else(|| songbook_id.clone());

    let owner = match seed.owner.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(email) => Some(ensure_user(conn, email, Role::User)?),
        None => None,
    };

    reset_songbook(conn, &songbook_id)?;
    insert_songbook(
        conn,
        &Songbook {
            id: songbook_id.clone(),
            title,
            owner_id: owner.as_ref().map(|user| user.id),
            first_page_side: seed
                .first_page_side
                .as_deref()
                .map(PageSide::from_db)
                .unwrap_or_default(),
            cover_preview: seed.img_path_cover_preview.clone(),
            covers: CoverImages {
                front_outer: seed.img_path_cover_front_outer.clone(),
                front_inner: seed.img_path_cover_front_inner.clone(),
                back_inner: seed.img_path_cover_back_inner.clone(),
                back_outer: seed.img_path_cover_back_outer.clone(),
            },
            is_public: seed.is_public.unwrap_or(owner.is_none()),
        },
    )?;

    let mut summary = SeedSummary {
        songbooks: 1,
        ..Default::default()
    };

    for song in &seed.songs {
        let key = song.song_id.key();
        let title = song
            .title
            .clone()
            .unwrap_or_else(|| format!("Untitled {key}"));
        let author = song.author.as_deref().unwrap_or(UNKNOWN_AUTHOR);
        let author_id = ensure_author(conn, author)?;
        upsert_song(conn, &song_row_id(&songbook_id, &key), &title, Some(author_id))?;
        summary.songs += 1;
    }

    let known_songs: HashSet<String> = seed.songs.iter().map(|song| song.song_id.key()).collect();

    for page in &seed.pages {
        let image_path = page.image_path.as_deref().filter(|p| !p.trim().is_empty());

        if page.song_ids.is_empty() {
            let Some(image_path) = image_path else {
                warn!(songbook_id = %songbook_id, page = ?page.page_number, "page has no image, skipped");
                summary.skipped_pages += 1;
                continue;
            };
            match page.page_type.as_deref() {
                Some("intro") => add_section_image(conn, &songbook_id, SectionKind::Intro, image_path)?,
                Some("outro") => add_section_image(conn, &songbook_id, SectionKind::Outro, image_path)?,
                _ => {
                    let Some(number) = page.page_number else {
                        warn!(songbook_id = %songbook_id, image_path, "non-song page without number, skipped");
                        summary.skipped_pages += 1;
                        continue;
                    };
                    let song_id = format!("{songbook_id}_page_{number}");
                    let system = ensure_author(conn, SYSTEM_AUTHOR)?;
                    upsert_song(conn, &song_id, &format!("Non-song page {number}"), Some(system))?;
                    add_song_image(conn, &song_id, image_path)?;
                    insert_page(conn, &songbook_id, &song_id, number)?;
                }
            }
            summary.pages += 1;
            continue;
        }

        let Some(number) = page.page_number else {
            warn!(songbook_id = %songbook_id, image_path = ?image_path, "song page without number, skipped");
            summary.skipped_pages += 1;
            continue;
        };
        if image_path.is_none() {
            warn!(songbook_id = %songbook_id, page = number, "song page has no image");
        }
        for seed_id in &page.song_ids {
            let key = seed_id.key();
            let song_id = song_row_id(&songbook_id, &key);
            if !known_songs.contains(&key) {
                warn!(songbook_id = %songbook_id, song = %song_id, "page refers to unknown song");
                continue;
            }
            insert_page(conn, &songbook_id, &song_id, number)?;
            if let Some(image_path) = image_path {
                add_song_image(conn, &song_id, image_path)?;
            }
        }
        summary.pages += 1;
    }

    for email in seed.shared.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        if owner.as_ref().is_some_and(|o| o.email.eq_ignore_ascii_case(email)) {
            continue;
        }
        let user = ensure_user(conn, email, Role::User)?;
        share_songbook(conn, &songbook_id, user.id, Permission::Edit)?;
    }

    info!(songbook_id = %songbook_id, songs = summary.songs, pages = summary.pages, "imported songbook");
    Ok(summary)
}

fn song_row_id(songbook_id: &str, key: &str) -> String {
    format!("{songbook_id}_{key}")
}
