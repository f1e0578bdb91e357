use anyhow::Result;
use rusqlite::Connection;

use crate::db::fetch_all_songs;
use crate::layout::{BookLayout, PageSlot};
use crate::models::{Song, Songbook, SongbookPage, TocEntry};

/// How the book viewer walks through the pages.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ViewMode {
    /// Two facing pages at a time, as printed.
    Spread,
    /// One page at a time, without fillers.
    Scroll,
}

impl ViewMode {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ViewMode::Spread => "Spreads",
            ViewMode::Scroll => "Single pages",
        }
    }
}

/// State of an opened songbook.
pub(crate) struct ViewerScreen {
    pub(crate) songbook: Songbook,
    pub(crate) layout: BookLayout,
    pub(crate) toc: Vec<TocEntry>,
    pub(crate) mode: ViewMode,
    pub(crate) spread: usize,
    pub(crate) scroll: usize,
    pub(crate) can_edit: bool,
}

impl ViewerScreen {
    pub(crate) fn new(
        songbook: Songbook,
        layout: BookLayout,
        toc: Vec<TocEntry>,
        can_edit: bool,
    ) -> Self {
        Self {
            songbook,
            layout,
            toc,
            mode: ViewMode::Spread,
            spread: 0,
            scroll: 0,
            can_edit,
        }
    }

    fn position_count(&self) -> usize {
        match self.mode {
            ViewMode::Spread => self.layout.spreads.len(),
            ViewMode::Scroll => self.layout.scroll_list.len(),
        }
    }

    fn position_mut(&mut self) -> &mut usize {
        match self.mode {
            ViewMode::Spread => &mut self.spread,
            ViewMode::Scroll => &mut self.scroll,
        }
    }

    pub(crate) fn move_by(&mut self, offset: isize) {
        let count = self.position_count();
        if count == 0 {
            return;
        }
        let position = self.position_mut();
        let next = (*position as isize + offset).clamp(0, count as isize - 1);
        *position = next as usize;
    }

    pub(crate) fn first(&mut self) {
        *self.position_mut() = 0;
    }

    pub(crate) fn last(&mut self) {
        let count = self.position_count();
        *self.position_mut() = count.saturating_sub(1);
    }

    /// Switch between spreads and single pages, staying on the same sheet.
    pub(crate) fn toggle_mode(&mut self) {
        match self.mode {
            ViewMode::Spread => {
                let before: usize = self
                    .layout
                    .spreads
                    .iter()
                    .take(self.spread)
                    .map(|spread| visible_pages(&spread.left, &spread.right))
                    .sum();
                self.scroll = before.min(self.layout.scroll_list.len().saturating_sub(1));
                self.mode = ViewMode::Scroll;
            }
            ViewMode::Scroll => {
                let mut seen = 0;
                let mut target = self.layout.spreads.len().saturating_sub(1);
                for (index, spread) in self.layout.spreads.iter().enumerate() {
                    seen += visible_pages(&spread.left, &spread.right);
                    if seen > self.scroll {
                        target = index;
                        break;
                    }
                }
                self.spread = target;
                self.mode = ViewMode::Spread;
            }
        }
    }

    /// Show the sheet carrying content page `page_number`.
    pub(crate) fn jump_to_page(&mut self, page_number: u32) -> bool {
        let found = match self.mode {
            ViewMode::Spread => self.layout.spread_index_of_page(page_number),
            ViewMode::Scroll => self.layout.scroll_index_of_page(page_number),
        };
        match found {
            Some(index) => {
                *self.position_mut() = index;
                true
            }
            None => false,
        }
    }

    /// Slots on screen, left to right.
    pub(crate) fn visible_slots(&self) -> Vec<&PageSlot> {
        match self.mode {
            ViewMode::Spread => self
                .layout
                .spreads
                .get(self.spread)
                .map(|spread| vec![&spread.left, &spread.right])
                .unwrap_or_default(),
            ViewMode::Scroll => self.layout.scroll_list.get(self.scroll).into_iter().collect(),
        }
    }

    /// Image that `Enter` opens: the right-hand page first, as it is the one
    /// a reader turns to.
    pub(crate) fn primary_image(&self) -> Option<&str> {
        self.visible_slots()
            .into_iter()
            .rev()
            .find_map(|slot| slot.content.image())
    }

    pub(crate) fn position_label(&self) -> String {
        let count = self.position_count();
        let current = match self.mode {
            ViewMode::Spread => self.spread,
            ViewMode::Scroll => self.scroll,
        };
        if count == 0 {
            return "empty".to_string();
        }
        let unit = match self.mode {
            ViewMode::Spread => "Spread",
            ViewMode::Scroll => "Page",
        };
        format!("{unit} {}/{count}", current + 1)
    }

    /// Take over a freshly loaded copy of the book, keeping the view mode and
    /// the position where the new layout still reaches it.
    pub(crate) fn replace_layout(&mut self, fresh: ViewerScreen) {
        self.songbook = fresh.songbook;
        self.layout = fresh.layout;
        self.toc = fresh.toc;
        self.can_edit = fresh.can_edit;
        self.spread = self.spread.min(self.layout.spreads.len().saturating_sub(1));
        self.scroll = self.scroll.min(self.layout.scroll_list.len().saturating_sub(1));
    }
}

fn visible_pages(left: &PageSlot, right: &PageSlot) -> usize {
    [left, right]
        .iter()
        .filter(|slot| !slot.content.is_filler())
        .count()
}

/// Table of contents palette shown over the viewer.
pub(crate) struct TocState {
    pub(crate) entries: Vec<TocEntry>,
    pub(crate) selected: usize,
}

impl TocState {
    pub(crate) fn new(entries: Vec<TocEntry>) -> Self {
        Self {
            entries,
            selected: 0,
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = step(self.selected, offset, self.entries.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.entries.len().saturating_sub(1);
    }

    pub(crate) fn current(&self) -> Option<&TocEntry> {
        self.entries.get(self.selected)
    }
}

/// Ordered page rows of a songbook being edited.
pub(crate) struct PageEditorScreen {
    pub(crate) songbook: Songbook,
    pub(crate) pages: Vec<SongbookPage>,
    pub(crate) selected: usize,
    /// Viewer the editor was opened from, restored on the way back.
    pub(crate) return_to: Option<Box<ViewerScreen>>,
}

impl PageEditorScreen {
    pub(crate) fn new(songbook: Songbook, pages: Vec<SongbookPage>) -> Self {
        let mut screen = Self {
            songbook,
            pages,
            selected: 0,
            return_to: None,
        };
        screen.ensure_in_bounds();
        screen
    }

    pub(crate) fn current_page(&self) -> Option<&SongbookPage> {
        self.pages.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = step(self.selected, offset, self.pages.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.pages.len().saturating_sub(1);
    }

    /// Replace the rows and keep the cursor on `focus_id` when it still exists.
    pub(crate) fn set_pages(&mut self, pages: Vec<SongbookPage>, focus_id: Option<i64>) {
        self.pages = pages;
        if let Some(index) = focus_id.and_then(|id| self.pages.iter().position(|p| p.id == id)) {
            self.selected = index;
        }
        self.ensure_in_bounds();
    }

    pub(crate) fn ensure_in_bounds(&mut self) {
        if self.pages.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.pages.len() {
            self.selected = self.pages.len() - 1;
        }
    }
}

/// Song list used to append a page, filtered by what the user types.
pub(crate) struct SongPicker {
    pub(crate) songbook_id: String,
    pub(crate) songs: Vec<Song>,
    pub(crate) filtered: Vec<Song>,
    pub(crate) query: String,
    pub(crate) selected: usize,
}

impl SongPicker {
    pub(crate) fn load(conn: &Connection, songbook_id: &str) -> Result<Self> {
        Ok(Self::new(songbook_id, fetch_all_songs(conn)?))
    }

    pub(crate) fn new(songbook_id: &str, songs: Vec<Song>) -> Self {
        let mut picker = Self {
            songbook_id: songbook_id.to_string(),
            filtered: songs.clone(),
            songs,
            query: String::new(),
            selected: 0,
        };
        picker.apply_filter();
        picker
    }

    fn apply_filter(&mut self) {
        let query = self.query.trim().to_lowercase();
        self.filtered = if query.is_empty() {
            self.songs.clone()
        } else {
            self.songs
                .iter()
                .filter(|song| {
                    song.title.to_lowercase().contains(&query)
                        || song.author.to_lowercase().contains(&query)
                })
                .cloned()
                .collect()
        };
        if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len().saturating_sub(1);
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) {
        if !ch.is_control() {
            self.query.push(ch);
            self.apply_filter();
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.query.pop();
        self.apply_filter();
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = step(self.selected, offset, self.filtered.len());
    }

    pub(crate) fn current_song(&self) -> Option<&Song> {
        self.filtered.get(self.selected)
    }
}

fn step(current: usize, offset: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + offset).clamp(0, len as isize - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{build_spreads, CoverImages, LayoutInput, PageSide};

    fn songbook() -> Songbook {
        Songbook {
            id: "00001".into(),
            title: "Book".into(),
            owner_id: None,
            first_page_side: PageSide::Right,
            cover_preview: None,
            covers: CoverImages::default(),
            is_public: true,
        }
    }

    fn viewer(pages: u32) -> ViewerScreen {
        viewer_from(PageSide::Right, pages)
    }

    fn viewer_from(first_page_side: PageSide, pages: u32) -> ViewerScreen {
        let input = LayoutInput {
            first_page_side,
            content_pages: (1..=pages)
                .map(|n| PageSlot::content(Some(format!("{n}.png")), n))
                .collect(),
            ..Default::default()
        };
        ViewerScreen::new(songbook(), build_spreads(&input), Vec::new(), false)
    }

    #[test]
    fn replaced_layout_keeps_position_within_bounds() {
        // right start, 6 pages: (_,1) (2,3) (4,5) (6,_)
        let mut screen = viewer(6);
        screen.move_by(2);
        screen.replace_layout(viewer(6));
        assert_eq!(screen.spread, 2);

        screen.toggle_mode();
        screen.last();
        screen.toggle_mode();
        screen.replace_layout(viewer(2));
        assert_eq!(screen.mode, ViewMode::Spread);
        assert_eq!(screen.spread, 1);
        assert_eq!(screen.scroll, 1);
    }

    #[test]
    fn paging_stops_at_both_ends() {
        // right start, 4 pages: (_,1) (2,3) (4,_)
        let mut screen = viewer(4);
        screen.move_by(-1);
        assert_eq!(screen.spread, 0);
        screen.move_by(10);
        assert_eq!(screen.spread, 2);
        screen.first();
        assert_eq!(screen.position_label(), "Spread 1/3");
    }

    #[test]
    fn toggling_mode_keeps_the_sheet() {
        let mut screen = viewer(4);
        screen.move_by(1);
        screen.toggle_mode();
        assert_eq!(screen.mode, ViewMode::Scroll);
        assert_eq!(screen.primary_image(), Some("2.png"));

        screen.move_by(2);
        assert_eq!(screen.primary_image(), Some("4.png"));
        screen.toggle_mode();
        assert_eq!(screen.spread, 2);
        assert_eq!(screen.primary_image(), Some("4.png"));
    }

    #[test]
    fn jump_finds_spread_of_page() {
        let mut screen = viewer(4);
        assert!(screen.jump_to_page(3));
        assert_eq!(screen.spread, 1);
        assert_eq!(screen.primary_image(), Some("3.png"));
        assert!(!screen.jump_to_page(9));
        assert_eq!(screen.spread, 1);
    }

    #[test]
    fn empty_book_has_no_positions() {
        let mut screen = viewer_from(PageSide::Left, 0);
        screen.move_by(1);
        screen.last();
        assert_eq!(screen.position_label(), "empty");
        assert!(screen.visible_slots().is_empty());
        screen.toggle_mode();
        assert_eq!(screen.position_label(), "empty");
    }

    #[test]
    fn picker_filters_by_title_or_author() {
        let songs = vec![
            Song {
                id: "1".into(),
                title: "Amazing Grace".into(),
                author: "Newton".into(),
            },
            Song {
                id: "2".into(),
                title: "Blowin' in the Wind".into(),
                author: "Dylan".into(),
            },
        ];
        let mut picker = SongPicker::new("00001", songs);
        picker.move_selection(1);
        for ch in "dyl".chars() {
            picker.push_char(ch);
        }
        assert_eq!(picker.filtered.len(), 1);
        assert_eq!(picker.current_song().map(|s| s.id.as_str()), Some("2"));
        picker.backspace();
        picker.backspace();
        picker.backspace();
        assert_eq!(picker.filtered.len(), 2);
    }
}
