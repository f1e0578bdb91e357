//! Turns stored songbook rows into the input of the book layout.

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use tracing::debug;

use crate::db::{fetch_pages, fetch_section_images, fetch_song_images, fetch_songbook, SYSTEM_AUTHOR};
use crate::layout::{LayoutInput, PageSlot};
use crate::models::{SectionKind, SongbookPage, TocEntry};

/// Content run of a songbook plus where each song starts in it.
struct ContentRun {
    slots: Vec<PageSlot>,
    toc: Vec<TocEntry>,
}

/// Assemble the layout input for one songbook.
pub fn get_layout_input(conn: &Connection, songbook_id: &str) -> Result<LayoutInput> {
    let songbook = fetch_songbook(conn, songbook_id)?
        .ok_or_else(|| anyhow!("Songbook {songbook_id} not found"))?;

    let run = collect_content(conn, songbook_id)?;
    let input = LayoutInput {
        first_page_side: songbook.first_page_side,
        intro_images: fetch_section_images(conn, songbook_id, SectionKind::Intro)?,
        content_pages: run.slots,
        outro_images: fetch_section_images(conn, songbook_id, SectionKind::Outro)?,
        covers: songbook.covers,
    };
    debug!(
        songbook_id,
        intro = input.intro_images.len(),
        content = input.content_pages.len(),
        outro = input.outro_images.len(),
        "resolved songbook"
    );
    Ok(input)
}

/// Songs of a songbook with the printed number of their first page.
/// Placeholder songs for non-song pages are left out.
pub fn table_of_contents(conn: &Connection, songbook_id: &str) -> Result<Vec<TocEntry>> {
    Ok(collect_content(conn, songbook_id)?.toc)
}

/// Walk the page rows in stored order and expand them into numbered slots.
///
/// A song on several page rows has one image per page; its n-th row shows its
/// n-th image and the last row takes any images left over. An image already
/// placed earlier in the run (a sheet shared by two songs) is not placed
/// again. Each page row of a song without any image is a blank, numbered page.
fn collect_content(conn: &Connection, songbook_id: &str) -> Result<ContentRun> {
    let pages = fetch_pages(conn, songbook_id)?;

    let mut rows_per_song: HashMap<&str, usize> = HashMap::new();
    for page in &pages {
        *rows_per_song.entry(page.song.id.as_str()).or_default() += 1;
    }

    let mut images_by_song: HashMap<&str, Vec<String>> = HashMap::new();
    let mut seen_rows: HashMap<&str, usize> = HashMap::new();
    let mut number_of_image: HashMap<String, u32> = HashMap::new();
    let mut listed_songs: HashSet<&str> = HashSet::new();

    let mut slots = Vec::new();
    let mut toc = Vec::new();

    for page in &pages {
        let song_id = page.song.id.as_str();
        if !images_by_song.contains_key(song_id) {
            images_by_song.insert(song_id, fetch_song_images(conn, song_id)?);
        }
        let images = &images_by_song[song_id];

        let occurrence = seen_rows.entry(song_id).or_default();
        let index = *occurrence;
        *occurrence += 1;
        let is_last_row = index + 1 >= rows_per_song[song_id];

        let mut first_number = None;
        if images.is_empty() {
            let number = slots.len() as u32 + 1;
            slots.push(PageSlot::content(None, number));
            first_number = Some(number);
        } else {
            let assigned: &[String] = match (is_last_row, images.get(index..)) {
                (true, Some(rest)) => rest,
                (false, Some(rest)) if !rest.is_empty() => &rest[..1],
                _ => &[],
            };
            for image in assigned {
                let number = match number_of_image.get(image) {
                    Some(&number) => number,
                    None => {
                        let number = slots.len() as u32 + 1;
                        slots.push(PageSlot::content(Some(image.clone()), number));
                        number_of_image.insert(image.clone(), number);
                        number
                    }
                };
                first_number.get_or_insert(number);
            }
        }

        if let Some(number) = first_number {
            if is_listed(page) && listed_songs.insert(song_id) {
                toc.push(TocEntry {
                    title: page.song.title.clone(),
                    author: page.song.author.clone(),
                    page_number: number,
                });
            }
        }
    }

    Ok(ContentRun { slots, toc })
}

fn is_listed(page: &SongbookPage) -> bool {
    page.song.author != SYSTEM_AUTHOR
}
