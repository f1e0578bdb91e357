use std::mem;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use crossterm::event::KeyCode;
use open::that as open_link;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::access::{can_edit, require_edit, require_view};
use crate::db::{
    append_page, create_songbook, delete_songbook, ensure_user, fetch_pages, fetch_songbook,
    fetch_visible_songbooks, move_page, remove_page, rename_songbook, set_first_page_side,
    set_public, share_songbook,
};
use crate::layout::{build_spreads, PageContent, PageSlot};
use crate::models::{CurrentUser, Permission, Role, Songbook};
use crate::resolver::{get_layout_input, table_of_contents};

use super::forms::{
    ConfirmPageRemove, ConfirmSongbookDelete, ShareField, ShareForm, SongbookForm,
};
use super::helpers::{
    build_cover_lines, centered_rect, image_location, slot_caption, surface_error,
};
use super::screens::{PageEditorScreen, SongPicker, TocState, ViewMode, ViewerScreen};

/// Number of songbook cards shown in each row of the shelf.
const GRID_COLUMNS: usize = 4;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// ASCII textures used to decorate covers, rotated through the shelf.
const COVER_ART: &[&[&str]] = &[
    &["/\\/\\/", "\\/\\/\\"],
    &["*+*+", "+*+*"],
    &["=--=", "--=="],
    &["<>><", "><<>"],
    &["..--", "--.."],
    &["oOo ", " OoO"],
    &["##  ", "  ##"],
    &["||--", "--||"],
    &["~~  ", "  ~~"],
    &["^v^v", "v^v^"],
    &["::''", "''::"],
    &["[]<>", "<>[]"],
];

/// Top-level views.
enum Screen {
    Shelf,
    Viewer(ViewerScreen),
    Editor(PageEditorScreen),
}

/// Dialogs and palettes layered over the current screen.
enum Mode {
    Normal,
    CreatingSongbook(SongbookForm),
    RenamingSongbook { id: String, form: SongbookForm },
    ConfirmSongbookDelete(ConfirmSongbookDelete),
    Sharing { songbook_id: String, form: ShareForm },
    Contents(TocState),
    AddingPage(SongPicker),
    ConfirmPageRemove(ConfirmPageRemove),
}

struct StatusMessage {
    text: String,
    kind: StatusKind,
}

enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    conn: Connection,
    user: CurrentUser,
    image_root: PathBuf,
    songbooks: Vec<Songbook>,
    selected: usize,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    /// Load the shelf of songbooks `user` may see.
    pub fn new(conn: Connection, user: CurrentUser, image_root: PathBuf) -> Result<Self> {
        let songbooks = fetch_visible_songbooks(&conn, &user)?;
        info!(user = user.display_name(), songbooks = songbooks.len(), "shelf loaded");
        Ok(Self {
            conn,
            user,
            image_root,
            songbooks,
            selected: 0,
            screen: Screen::Shelf,
            mode: Mode::Normal,
            status: None,
        })
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => match self.screen {
                Screen::Shelf => self.handle_shelf_key(code, &mut exit)?,
                Screen::Viewer(_) => self.handle_viewer_key(code, &mut exit)?,
                Screen::Editor(_) => self.handle_editor_key(code, &mut exit)?,
            },
            Mode::CreatingSongbook(form) => self.handle_create_songbook(code, form)?,
            Mode::RenamingSongbook { id, form } => self.handle_rename_songbook(code, id, form)?,
            Mode::ConfirmSongbookDelete(confirm) => {
                self.handle_confirm_songbook_delete(code, confirm)?
            }
            Mode::Sharing { songbook_id, form } => self.handle_share(code, songbook_id, form)?,
            Mode::Contents(state) => self.handle_contents(code, state)?,
            Mode::AddingPage(picker) => self.handle_add_page(code, picker)?,
            Mode::ConfirmPageRemove(confirm) => self.handle_confirm_page_remove(code, confirm)?,
        };

        Ok(exit)
    }

    fn handle_shelf_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Left => self.move_horizontal(-1),
            KeyCode::Right => self.move_horizontal(1),
            KeyCode::Up => self.move_vertical(-1),
            KeyCode::Down => self.move_vertical(1),
            KeyCode::Enter => match self.current_songbook_id() {
                Some(id) => {
                    self.clear_status();
                    let result = self.open_viewer(&id);
                    self.report(result);
                }
                None => self.set_status("No songbook selected.", StatusKind::Error),
            },
            KeyCode::Char('p') | KeyCode::Char('P') => match self.current_songbook_id() {
                Some(id) => {
                    self.clear_status();
                    let result = self.open_editor(&id);
                    self.report(result);
                }
                None => self.set_status("No songbook selected.", StatusKind::Error),
            },
            KeyCode::Char('+') => {
                if !self.can_create() {
                    self.set_status("Sign in to create songbooks.", StatusKind::Error);
                } else {
                    self.clear_status();
                    return Ok(Mode::CreatingSongbook(SongbookForm::default()));
                }
            }
            KeyCode::Char('e') | KeyCode::Char('E') => {
                if let Some(id) = self.current_songbook_id() {
                    return Ok(self.rename_mode(&id));
                }
                self.set_status("No songbook selected to rename.", StatusKind::Error);
            }
            KeyCode::Char('-') => {
                if let Some(id) = self.current_songbook_id() {
                    match require_edit(&self.conn, &self.user, &id) {
                        Ok(songbook) => {
                            self.clear_status();
                            return Ok(Mode::ConfirmSongbookDelete(ConfirmSongbookDelete::from(
                                &songbook,
                            )));
                        }
                        Err(err) => {
                            self.report(Err(err));
                        }
                    }
                } else {
                    self.set_status("No songbook selected to delete.", StatusKind::Error);
                }
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.reload_songbooks(None)?;
                self.set_status("Shelf refreshed.", StatusKind::Info);
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_viewer_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let Screen::Viewer(viewer) = &mut self.screen else {
            return Ok(Mode::Normal);
        };

        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc => {
                self.screen = Screen::Shelf;
                self.clear_status();
            }
            KeyCode::Left | KeyCode::Up | KeyCode::PageUp | KeyCode::Backspace => {
                viewer.move_by(-1)
            }
            KeyCode::Right | KeyCode::Down | KeyCode::PageDown | KeyCode::Char(' ') => {
                viewer.move_by(1)
            }
            KeyCode::Home => viewer.first(),
            KeyCode::End => viewer.last(),
            KeyCode::Char('m') | KeyCode::Char('M') => {
                viewer.toggle_mode();
                let label = viewer.mode.label();
                self.set_status(format!("{label} view."), StatusKind::Info);
            }
            KeyCode::Char('t') | KeyCode::Char('T') => {
                if viewer.toc.is_empty() {
                    self.set_status("This songbook lists no songs.", StatusKind::Error);
                } else {
                    return Ok(Mode::Contents(TocState::new(viewer.toc.clone())));
                }
            }
            KeyCode::Enter => {
                let image = viewer.primary_image().map(str::to_string);
                self.open_image(image);
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                let result = self.edit_from_viewer();
                self.report(result);
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_editor_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let Screen::Editor(editor) = &mut self.screen else {
            return Ok(Mode::Normal);
        };
        let songbook_id = editor.songbook.id.clone();

        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc => {
                self.clear_status();
                let result = self.close_editor();
                self.report(result);
            }
            KeyCode::Up => editor.move_selection(-1),
            KeyCode::Down => editor.move_selection(1),
            KeyCode::PageUp => editor.move_selection(-10),
            KeyCode::PageDown => editor.move_selection(10),
            KeyCode::Home => editor.select_first(),
            KeyCode::End => editor.select_last(),
            KeyCode::Char('J') | KeyCode::Char('K') => {
                let delta = if code == KeyCode::Char('J') { 1 } else { -1 };
                if let Some(page_id) = editor.current_page().map(|page| page.id) {
                    let result = self.move_current_page(&songbook_id, page_id, delta);
                    self.report(result);
                }
            }
            KeyCode::Char('+') => {
                let picker = SongPicker::load(&self.conn, &songbook_id)?;
                if picker.songs.is_empty() {
                    self.set_status("No songs to add yet.", StatusKind::Error);
                } else {
                    self.clear_status();
                    return Ok(Mode::AddingPage(picker));
                }
            }
            KeyCode::Char('-') => match editor.current_page() {
                Some(page) => return Ok(Mode::ConfirmPageRemove(ConfirmPageRemove::from(page))),
                None => self.set_status("No page selected to remove.", StatusKind::Error),
            },
            KeyCode::Char('v') | KeyCode::Char('V') => {
                let is_public = !editor.songbook.is_public;
                let result = set_public(&self.conn, &songbook_id, is_public)
                    .and_then(|_| self.refresh_editor(None));
                if self.report(result) {
                    let text = if is_public {
                        "Songbook is now public."
                    } else {
                        "Songbook is now private."
                    };
                    self.set_status(text, StatusKind::Info);
                }
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                let side = editor.songbook.first_page_side.flipped();
                let result = set_first_page_side(&self.conn, &songbook_id, side)
                    .and_then(|_| self.refresh_editor(None));
                if self.report(result) {
                    self.set_status(format!("First page now on the {side}."), StatusKind::Info);
                }
            }
            KeyCode::Char('h') | KeyCode::Char('H') => {
                self.clear_status();
                return Ok(Mode::Sharing {
                    songbook_id,
                    form: ShareForm::default(),
                });
            }
            KeyCode::Char('e') | KeyCode::Char('E') => return Ok(self.rename_mode(&songbook_id)),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_create_songbook(&mut self, code: KeyCode, mut form: SongbookForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("New songbook cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Backspace => {
                form.backspace();
                Ok(Mode::CreatingSongbook(form))
            }
            KeyCode::Enter => match self.save_new_songbook(&form) {
                Ok(_) => Ok(Mode::Normal),
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                    Ok(Mode::CreatingSongbook(form))
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
                Ok(Mode::CreatingSongbook(form))
            }
            _ => Ok(Mode::CreatingSongbook(form)),
        }
    }

    fn handle_rename_songbook(
        &mut self,
        code: KeyCode,
        id: String,
        mut form: SongbookForm,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Rename cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_songbook_title(&id, &form) {
                Ok(_) => return Ok(Mode::Normal),
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Ok(Mode::RenamingSongbook { id, form })
    }

    fn handle_confirm_songbook_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmSongbookDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&confirm) {
                    Ok(_) => Ok(Mode::Normal),
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                        Ok(Mode::ConfirmSongbookDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmSongbookDelete(confirm)),
        }
    }

    fn handle_share(&mut self, code: KeyCode, songbook_id: String, mut form: ShareForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Sharing cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_share(&songbook_id, &form) {
                Ok(_) => return Ok(Mode::Normal),
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Ok(Mode::Sharing { songbook_id, form })
    }

    fn handle_contents(&mut self, code: KeyCode, mut state: TocState) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('t') | KeyCode::Char('T') => return Ok(Mode::Normal),
            KeyCode::Up => state.move_selection(-1),
            KeyCode::Down => state.move_selection(1),
            KeyCode::PageUp => state.move_selection(-10),
            KeyCode::PageDown => state.move_selection(10),
            KeyCode::Home => state.select_first(),
            KeyCode::End => state.select_last(),
            KeyCode::Enter => {
                let Some(entry) = state.current().cloned() else {
                    return Ok(Mode::Normal);
                };
                let jumped = match &mut self.screen {
                    Screen::Viewer(viewer) => viewer.jump_to_page(entry.page_number),
                    _ => false,
                };
                if jumped {
                    self.set_status(
                        format!("{} starts on page {}.", entry.title, entry.page_number),
                        StatusKind::Info,
                    );
                } else {
                    self.set_status(
                        format!("Page {} is not in this songbook.", entry.page_number),
                        StatusKind::Error,
                    );
                }
                return Ok(Mode::Normal);
            }
            _ => {}
        }
        Ok(Mode::Contents(state))
    }

    fn handle_add_page(&mut self, code: KeyCode, mut picker: SongPicker) -> Result<Mode> {
        match code {
            KeyCode::Esc => return Ok(Mode::Normal),
            KeyCode::Up => picker.move_selection(-1),
            KeyCode::Down => picker.move_selection(1),
            KeyCode::PageUp => picker.move_selection(-10),
            KeyCode::PageDown => picker.move_selection(10),
            KeyCode::Backspace => picker.backspace(),
            KeyCode::Char(ch) => picker.push_char(ch),
            KeyCode::Enter => {
                let Some(song) = picker.current_song().cloned() else {
                    return Ok(Mode::AddingPage(picker));
                };
                let result = append_page(&self.conn, &picker.songbook_id, &song.id);
                match result {
                    Ok(page_number) => {
                        self.refresh_editor(None)?;
                        if let Screen::Editor(editor) = &mut self.screen {
                            editor.select_last();
                        }
                        info!(songbook_id = %picker.songbook_id, song = %song.id, page_number, "page added");
                        self.set_status(
                            format!("Added {} as page {page_number}.", song.display_title()),
                            StatusKind::Info,
                        );
                        return Ok(Mode::Normal);
                    }
                    Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
                }
            }
            _ => {}
        }
        Ok(Mode::AddingPage(picker))
    }

    fn handle_confirm_page_remove(
        &mut self,
        code: KeyCode,
        confirm: ConfirmPageRemove,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Removal cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                let result = remove_page(&mut self.conn, &confirm.songbook_id, confirm.page_id)
                    .and_then(|_| self.refresh_editor(None));
                if self.report(result) {
                    self.set_status(
                        format!("Removed page {} ({}).", confirm.page_number, confirm.title),
                        StatusKind::Info,
                    );
                    Ok(Mode::Normal)
                } else {
                    Ok(Mode::ConfirmPageRemove(confirm))
                }
            }
            _ => Ok(Mode::ConfirmPageRemove(confirm)),
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Shelf => self.draw_shelf(frame, content_area),
            Screen::Viewer(viewer) => self.draw_viewer(frame, content_area, viewer),
            Screen::Editor(editor) => self.draw_editor(frame, content_area, editor),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::CreatingSongbook(form) => {
                self.draw_songbook_form(frame, area, "New Songbook", form)
            }
            Mode::RenamingSongbook { form, .. } => {
                self.draw_songbook_form(frame, area, "Rename Songbook", form)
            }
            Mode::ConfirmSongbookDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::Sharing { form, .. } => self.draw_share_form(frame, area, form),
            Mode::Contents(state) => self.draw_contents(frame, area, state),
            Mode::AddingPage(picker) => self.draw_song_picker(frame, area, picker),
            Mode::ConfirmPageRemove(confirm) => self.draw_confirm_page_remove(frame, area, confirm),
            Mode::Normal => {}
        }
    }

    fn draw_shelf(&self, frame: &mut Frame, area: Rect) {
        if self.songbooks.is_empty() {
            let hint = if self.can_create() {
                "No songbooks yet. Press '+' to create one."
            } else {
                "No songbooks to show."
            };
            let message = Paragraph::new(hint)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::NONE));
            frame.render_widget(message, area);
            return;
        }

        for (row_idx, row_chunk) in self.split_rows(area).into_iter().enumerate() {
            for (col_idx, column_chunk) in split_columns(row_chunk).into_iter().enumerate() {
                let index = row_idx * GRID_COLUMNS + col_idx;
                let Some(songbook) = self.songbooks.get(index) else {
                    continue;
                };
                let selected = index == self.selected;
                let mut block = Block::default()
                    .borders(Borders::ALL)
                    .title(format!("No. {}", songbook.id));
                if selected {
                    block = block.style(Style::default().fg(Color::Yellow));
                }
                let lines = build_cover_lines(
                    songbook,
                    COVER_ART[index % COVER_ART.len()],
                    column_chunk.width.saturating_sub(2),
                    column_chunk.height.saturating_sub(2),
                    selected,
                );
                frame.render_widget(Paragraph::new(lines).block(block), column_chunk);
            }
        }
    }

    fn draw_viewer(&self, frame: &mut Frame, area: Rect, viewer: &ViewerScreen) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(1)])
            .split(area);

        let book = &viewer.songbook;
        let access = if viewer.can_edit { "editable" } else { "read only" };
        let header = Paragraph::new(vec![
            Line::from(vec![
                Span::styled(book.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!("  |  {}  |  {}", viewer.mode.label(), viewer.position_label())),
            ]),
            Line::from(Span::styled(
                format!(
                    "{} pages, {} songs  |  first page on the {}  |  {access}",
                    viewer.layout.scroll_list.len(),
                    viewer.toc.len(),
                    book.first_page_side
                ),
                Style::default().fg(Color::Gray),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title("Songbook"));
        frame.render_widget(header, chunks[0]);

        let slots = viewer.visible_slots();
        if slots.is_empty() {
            let message = Paragraph::new("This songbook has no pages yet.")
                .alignment(Alignment::Center);
            frame.render_widget(message, chunks[1]);
            return;
        }

        match viewer.mode {
            ViewMode::Spread => {
                let halves = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                    .split(chunks[1]);
                for (slot, half) in slots.into_iter().zip(halves.iter()) {
                    self.draw_page(frame, *half, slot);
                }
            }
            ViewMode::Scroll => {
                let columns = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([
                        Constraint::Percentage(25),
                        Constraint::Percentage(50),
                        Constraint::Percentage(25),
                    ])
                    .split(chunks[1]);
                self.draw_page(frame, columns[1], slots[0]);
            }
        }
    }

    /// One printed page. Slots outside the physical book stay empty; blank
    /// pages keep their frame.
    fn draw_page(&self, frame: &mut Frame, area: Rect, slot: &PageSlot) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(slot_caption(slot));
        match &slot.content {
            PageContent::Nothing => {}
            PageContent::Blank => {
                frame.render_widget(block.style(Style::default().fg(Color::DarkGray)), area);
            }
            PageContent::Image(path) => {
                let location = image_location(&self.image_root, path);
                let name = location
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.clone());
                let mut lines = vec![
                    Line::from(""),
                    Line::from(Span::styled(name, Style::default().add_modifier(Modifier::BOLD))),
                    Line::from(Span::styled(path.clone(), Style::default().fg(Color::Gray))),
                    Line::from(""),
                ];
                if location.exists() {
                    lines.push(Line::from(Span::styled(
                        "Enter opens the image",
                        Style::default().fg(Color::DarkGray),
                    )));
                } else {
                    lines.push(Line::from(Span::styled(
                        "image file not found",
                        Style::default().fg(Color::Red),
                    )));
                }
                let paragraph = Paragraph::new(lines)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true })
                    .block(block);
                frame.render_widget(paragraph, area);
            }
        }
    }

    fn draw_editor(&self, frame: &mut Frame, area: Rect, editor: &PageEditorScreen) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(1)])
            .split(area);

        let book = &editor.songbook;
        let visibility = if book.is_public { "public" } else { "private" };
        let header = Paragraph::new(vec![
            Line::from(Span::styled(
                book.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::raw(format!(
                "{} page rows  |  {visibility}  |  first page on the {}",
                editor.pages.len(),
                book.first_page_side
            ))),
        ])
        .block(Block::default().borders(Borders::ALL).title("Edit Pages"));
        frame.render_widget(header, chunks[0]);

        if editor.pages.is_empty() {
            let message = Paragraph::new("No pages yet. Press '+' to add a song.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(message, chunks[1]);
            return;
        }

        let items: Vec<ListItem> = editor
            .pages
            .iter()
            .map(|page| {
                ListItem::new(format!("{:>4}  {}", page.page_number, page.song.display_title()))
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");
        let mut list_state = ListState::default();
        list_state.select(Some(editor.selected));
        frame.render_stateful_widget(list, chunks[1], &mut list_state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = match &self.status {
            Some(status) => Line::from(Span::styled(status.text.clone(), status.kind.style())),
            None => Line::from(Span::styled(
                format!("Signed in as {}", self.user.display_name()),
                Style::default().fg(Color::DarkGray),
            )),
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let keys: &[(&str, &str)] = match (&self.screen, &self.mode) {
            (_, Mode::Contents(_)) => &[("[Up/Down]", "Navigate"), ("[Enter]", "Jump"), ("[Esc]", "Close")],
            (_, Mode::AddingPage(_)) => &[
                ("[Type]", "Filter"),
                ("[Up/Down]", "Navigate"),
                ("[Enter]", "Add Page"),
                ("[Esc]", "Cancel"),
            ],
            (_, Mode::Sharing { .. }) => &[
                ("[Tab]", "Switch Field"),
                ("[Space]", "Toggle Access"),
                ("[Enter]", "Share"),
                ("[Esc]", "Cancel"),
            ],
            (_, Mode::CreatingSongbook(_)) | (_, Mode::RenamingSongbook { .. }) => {
                &[("[Enter]", "Save"), ("[Esc]", "Cancel")]
            }
            (_, Mode::ConfirmSongbookDelete(_)) | (_, Mode::ConfirmPageRemove(_)) => {
                &[("[Y]", "Confirm"), ("[N/Esc]", "Cancel")]
            }
            (Screen::Shelf, Mode::Normal) => &[
                ("[Arrows]", "Navigate"),
                ("[Enter]", "Open"),
                ("[+]", "New"),
                ("[E]", "Rename"),
                ("[P]", "Pages"),
                ("[-]", "Delete"),
                ("[R]", "Refresh"),
                ("[Q]", "Quit"),
            ],
            (Screen::Viewer(_), Mode::Normal) => &[
                ("[Left/Right]", "Turn"),
                ("[M]", "Spreads/Pages"),
                ("[T]", "Contents"),
                ("[Enter]", "Open Image"),
                ("[P]", "Edit Pages"),
                ("[Esc]", "Shelf"),
                ("[Q]", "Quit"),
            ],
            (Screen::Editor(_), Mode::Normal) => &[
                ("[Up/Down]", "Select"),
                ("[J/K]", "Move"),
                ("[+]", "Add"),
                ("[-]", "Remove"),
                ("[V]", "Public"),
                ("[S]", "Side"),
                ("[H]", "Share"),
                ("[E]", "Rename"),
                ("[Esc]", "View"),
            ],
        };

        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let mut spans = Vec::with_capacity(keys.len() * 2);
        for (key, action) in keys {
            spans.push(Span::styled(key.to_string(), key_style));
            spans.push(Span::raw(format!(" {action}   ")));
        }
        Line::from(spans)
    }

    fn draw_songbook_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &SongbookForm) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![form.build_line(), Line::from("")];
        lines.push(form_hint(form.error.as_deref(), "Enter to save, Esc to cancel"));
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let prefix = "Title: ".len() as u16;
        frame.set_cursor_position((inner.x + prefix + form.value_len() as u16, inner.y));
    }

    fn draw_share_form(&self, frame: &mut Frame, area: Rect, form: &ShareForm) {
        let popup_area = centered_rect(60, 35, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Share Songbook").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            form.build_line(ShareField::Email),
            form.build_line(ShareField::Permission),
            Line::from(""),
            form_hint(form.error.as_deref(), "Enter to share, Tab to switch, Esc to cancel"),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        if form.active == ShareField::Email {
            let prefix = "E-mail: ".len() as u16;
            frame.set_cursor_position((inner.x + prefix + form.value_len() as u16, inner.y));
        }
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmSongbookDelete) {
        let lines = vec![
            Line::from(format!("Delete songbook \"{}\"?", confirm.title)),
            Line::from("Its page list, intro/outro pages and sharing are removed too."),
        ];
        draw_confirm(frame, area, "Confirm Deletion", lines);
    }

    fn draw_confirm_page_remove(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmPageRemove) {
        let lines = vec![
            Line::from(format!("Remove page {} ({})?", confirm.page_number, confirm.title)),
            Line::from("Later pages move up by one."),
        ];
        draw_confirm(frame, area, "Confirm Removal", lines);
    }

    fn draw_contents(&self, frame: &mut Frame, area: Rect, state: &TocState) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Contents").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let items: Vec<ListItem> = state
            .entries
            .iter()
            .map(|entry| {
                let author = if entry.author.trim().is_empty() {
                    String::new()
                } else {
                    format!(" - {}", entry.author)
                };
                ListItem::new(format!("{:>4}  {}{author}", entry.page_number, entry.title))
            })
            .collect();
        let list = List::new(items)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");
        let mut list_state = ListState::default();
        list_state.select(Some(state.selected));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn draw_song_picker(&self, frame: &mut Frame, area: Rect, picker: &SongPicker) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Add Page").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(1)])
            .split(inner);
        let query = Paragraph::new(format!("Filter: {}", picker.query));
        frame.render_widget(query, chunks[0]);

        let items: Vec<ListItem> = picker
            .filtered
            .iter()
            .map(|song| ListItem::new(song.display_title()))
            .collect();
        let list = List::new(items)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");
        let mut list_state = ListState::default();
        list_state.select(Some(picker.selected));
        frame.render_stateful_widget(list, chunks[1], &mut list_state);

        let prefix = "Filter: ".len() as u16;
        frame.set_cursor_position((
            chunks[0].x + prefix + picker.query.chars().count() as u16,
            chunks[0].y,
        ));
    }

    fn split_rows(&self, area: Rect) -> Vec<Rect> {
        let row_count = self.songbooks.len().div_ceil(GRID_COLUMNS).max(1) as u16;
        let percent = (100 / row_count).max(1);
        Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Percentage(percent); row_count as usize])
            .split(area)
            .to_vec()
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    /// Show a failed action in the footer. Returns whether it succeeded.
    fn report(&mut self, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "action failed");
                self.set_status(surface_error(&err), StatusKind::Error);
                false
            }
        }
    }

    fn can_create(&self) -> bool {
        self.user.is_authenticated && self.user.role != Role::Guest
    }

    fn rename_mode(&mut self, songbook_id: &str) -> Mode {
        match require_edit(&self.conn, &self.user, songbook_id) {
            Ok(songbook) => {
                self.clear_status();
                Mode::RenamingSongbook {
                    id: songbook.id.clone(),
                    form: SongbookForm::from_songbook(&songbook),
                }
            }
            Err(err) => {
                self.report(Err(err));
                Mode::Normal
            }
        }
    }

    fn open_viewer(&mut self, songbook_id: &str) -> Result<()> {
        let viewer = self.load_viewer(songbook_id)?;
        info!(songbook_id, spreads = viewer.layout.spreads.len(), "opened songbook");
        self.screen = Screen::Viewer(viewer);
        Ok(())
    }

    fn load_viewer(&self, songbook_id: &str) -> Result<ViewerScreen> {
        let songbook = require_view(&self.conn, &self.user, songbook_id)?;
        let layout = build_spreads(&get_layout_input(&self.conn, songbook_id)?);
        let toc = table_of_contents(&self.conn, songbook_id)?;
        let editable = can_edit(&self.conn, &self.user, &songbook)?;
        Ok(ViewerScreen::new(songbook, layout, toc, editable))
    }

    /// Open the page editor for the book in the viewer, parking the viewer
    /// so that leaving the editor returns to the same place.
    fn edit_from_viewer(&mut self) -> Result<()> {
        let Screen::Viewer(viewer) = mem::replace(&mut self.screen, Screen::Shelf) else {
            return Ok(());
        };
        let songbook_id = viewer.songbook.id.clone();
        match self.open_editor(&songbook_id) {
            Ok(()) => {
                if let Screen::Editor(editor) = &mut self.screen {
                    editor.return_to = Some(Box::new(viewer));
                }
                Ok(())
            }
            Err(err) => {
                self.screen = Screen::Viewer(viewer);
                Err(err)
            }
        }
    }

    fn close_editor(&mut self) -> Result<()> {
        let Screen::Editor(editor) = mem::replace(&mut self.screen, Screen::Shelf) else {
            return Ok(());
        };
        match editor.return_to {
            Some(mut viewer) => {
                viewer.replace_layout(self.load_viewer(&editor.songbook.id)?);
                self.screen = Screen::Viewer(*viewer);
                Ok(())
            }
            None => self.open_viewer(&editor.songbook.id),
        }
    }

    fn open_editor(&mut self, songbook_id: &str) -> Result<()> {
        let songbook = require_edit(&self.conn, &self.user, songbook_id)?;
        let pages = fetch_pages(&self.conn, songbook_id)?;
        self.screen = Screen::Editor(PageEditorScreen::new(songbook, pages));
        Ok(())
    }

    /// Reload the edited songbook and its rows after a change.
    fn refresh_editor(&mut self, focus_id: Option<i64>) -> Result<()> {
        if let Screen::Editor(editor) = &mut self.screen {
            let id = editor.songbook.id.clone();
            editor.songbook =
                fetch_songbook(&self.conn, &id)?.ok_or_else(|| anyhow!("Songbook {id} not found"))?;
            let pages = fetch_pages(&self.conn, &id)?;
            editor.set_pages(pages, focus_id);
        }
        self.reload_songbooks(None)
    }

    fn move_current_page(&mut self, songbook_id: &str, page_id: i64, delta: i32) -> Result<()> {
        if move_page(&mut self.conn, songbook_id, page_id, delta)? {
            self.refresh_editor(Some(page_id))?;
        } else {
            let edge = if delta > 0 { "last" } else { "first" };
            self.set_status(format!("Already the {edge} page."), StatusKind::Info);
        }
        Ok(())
    }

    fn open_image(&mut self, image: Option<String>) {
        let Some(image) = image else {
            self.set_status("Nothing to open on this spread.", StatusKind::Error);
            return;
        };
        let location = image_location(&self.image_root, &image);
        if !location.exists() {
            self.set_status(
                format!("Image not found: {}", location.display()),
                StatusKind::Error,
            );
            return;
        }
        match open_link(&location) {
            Ok(()) => self.set_status(format!("Opened {image}."), StatusKind::Info),
            Err(err) => {
                warn!(path = %location.display(), error = %err, "failed to open image");
                self.set_status(format!("Failed to open image: {err}"), StatusKind::Error);
            }
        }
    }

    fn save_new_songbook(&mut self, form: &SongbookForm) -> Result<()> {
        let title = form.parse_title()?;
        let songbook = create_songbook(&self.conn, &title, self.user.id)?;
        info!(songbook_id = %songbook.id, "songbook created");
        self.reload_songbooks(Some(songbook.id.as_str()))?;
        self.set_status(format!("Created \"{}\".", songbook.title), StatusKind::Info);
        Ok(())
    }

    fn save_songbook_title(&mut self, id: &str, form: &SongbookForm) -> Result<()> {
        let title = form.parse_title()?;
        rename_songbook(&self.conn, id, &title)?;
        match &mut self.screen {
            Screen::Viewer(viewer) if viewer.songbook.id == id => viewer.songbook.title = title.clone(),
            Screen::Editor(editor) if editor.songbook.id == id => editor.songbook.title = title.clone(),
            _ => {}
        }
        self.reload_songbooks(Some(id))?;
        self.set_status(format!("Renamed to \"{title}\"."), StatusKind::Info);
        Ok(())
    }

    fn save_share(&mut self, songbook_id: &str, form: &ShareForm) -> Result<()> {
        let (email, permission) = form.parse_inputs()?;
        let songbook = require_edit(&self.conn, &self.user, songbook_id)?;
        let grantee = ensure_user(&self.conn, &email, Role::User)?;
        if songbook.owner_id == Some(grantee.id) {
            return Err(anyhow!("{email} owns this songbook."));
        }
        share_songbook(&self.conn, songbook_id, grantee.id, permission)?;
        info!(songbook_id, grantee = %email, permission = permission.as_str(), "songbook shared");
        let access = match permission {
            Permission::View => "view",
            Permission::Edit => "edit",
        };
        self.set_status(format!("{email} can now {access} this songbook."), StatusKind::Info);
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmSongbookDelete) -> Result<()> {
        require_edit(&self.conn, &self.user, &confirm.id)?;
        delete_songbook(&self.conn, &confirm.id)?;
        info!(songbook_id = %confirm.id, "songbook deleted");
        self.screen = Screen::Shelf;
        self.reload_songbooks(None)?;
        self.set_status(format!("Deleted \"{}\".", confirm.title), StatusKind::Info);
        Ok(())
    }

    fn reload_songbooks(&mut self, focus_id: Option<&str>) -> Result<()> {
        self.songbooks = fetch_visible_songbooks(&self.conn, &self.user)?;
        if let Some(index) = focus_id.and_then(|id| self.songbooks.iter().position(|b| b.id == id)) {
            self.selected = index;
        } else if self.selected >= self.songbooks.len() {
            self.selected = self.songbooks.len().saturating_sub(1);
        }
        Ok(())
    }

    fn current_songbook_id(&self) -> Option<String> {
        self.songbooks.get(self.selected).map(|b| b.id.clone())
    }

    fn move_horizontal(&mut self, offset: isize) {
        let target = self.selected as isize + offset;
        if (0..self.songbooks.len() as isize).contains(&target) {
            self.selected = target as usize;
        }
    }

    fn move_vertical(&mut self, offset: isize) {
        self.move_horizontal(offset * GRID_COLUMNS as isize);
    }
}

fn split_columns(area: Rect) -> Vec<Rect> {
    let percent = (100 / GRID_COLUMNS as u16).max(1);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Percentage(percent); GRID_COLUMNS])
        .split(area)
        .to_vec()
}

fn form_hint(error: Option<&str>, hint: &str) -> Line<'static> {
    match error {
        Some(error) => Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))),
        None => Line::from(Span::styled(hint.to_string(), Style::default().fg(Color::Gray))),
    }
}

fn draw_confirm(frame: &mut Frame, area: Rect, title: &str, mut lines: Vec<Line<'static>>) {
    let popup_area = centered_rect(60, 30, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press Y to confirm or N / Esc to cancel.",
        Style::default().fg(Color::Gray),
    )));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{add_song_image, ensure_user, insert_page, test_connection, upsert_song};
    use crate::layout::PageSide;
    use crate::models::User;

    fn seeded() -> (Connection, User) {
        let conn = test_connection();
        let owner = ensure_user(&conn, "owner@test.com", Role::User).unwrap();
        let book = create_songbook(&conn, "Campfire", Some(owner.id)).unwrap();
        for (id, number) in [("a", 1), ("b", 2), ("c", 3)] {
            upsert_song(&conn, id, &format!("Song {id}"), None).unwrap();
            add_song_image(&conn, id, &format!("{id}.png")).unwrap();
            insert_page(&conn, &book.id, id, number).unwrap();
        }
        (conn, owner)
    }

    fn press(app: &mut App, keys: &[KeyCode]) {
        for key in keys {
            assert!(!app.handle_key(*key).unwrap());
        }
    }

    fn editor_titles(app: &App) -> Vec<String> {
        match &app.screen {
            Screen::Editor(editor) => editor.pages.iter().map(|p| p.song.title.clone()).collect(),
            _ => panic!("editor not open"),
        }
    }

    #[test]
    fn guest_sees_only_public_books_and_cannot_create() {
        let (conn, _) = seeded();
        let mut app = App::new(conn, CurrentUser::anonymous(), PathBuf::from("/tmp")).unwrap();
        assert!(app.songbooks.is_empty());

        press(&mut app, &[KeyCode::Char('+')]);
        assert!(matches!(app.mode, Mode::Normal));
        assert!(matches!(app.status, Some(StatusMessage { kind: StatusKind::Error, .. })));
        assert!(app.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn owner_browses_spreads_and_contents() {
        let (conn, owner) = seeded();
        let mut app = App::new(conn, CurrentUser::from_user(&owner), PathBuf::from("/tmp")).unwrap();

        press(&mut app, &[KeyCode::Enter, KeyCode::Right]);
        let Screen::Viewer(viewer) = &app.screen else {
            panic!("viewer not open");
        };
        // right start: (_,1) (2,3)
        assert_eq!(viewer.spread, 1);
        assert!(viewer.can_edit);

        press(&mut app, &[KeyCode::Char('t'), KeyCode::Up, KeyCode::Up, KeyCode::Enter]);
        let Screen::Viewer(viewer) = &app.screen else {
            panic!("viewer not open");
        };
        assert_eq!(viewer.spread, 0);

        press(&mut app, &[KeyCode::Char('m')]);
        let Screen::Viewer(viewer) = &app.screen else {
            panic!("viewer not open");
        };
        assert_eq!(viewer.mode, ViewMode::Scroll);
        assert_eq!(viewer.primary_image(), Some("a.png"));

        press(&mut app, &[KeyCode::Esc]);
        assert!(matches!(app.screen, Screen::Shelf));
    }

    #[test]
    fn leaving_editor_returns_to_same_spread() {
        let (conn, owner) = seeded();
        let mut app = App::new(conn, CurrentUser::from_user(&owner), PathBuf::from("/tmp")).unwrap();

        press(&mut app, &[KeyCode::Enter, KeyCode::Right, KeyCode::Char('p')]);
        assert!(matches!(app.screen, Screen::Editor(_)));

        press(&mut app, &[KeyCode::Char('J'), KeyCode::Esc]);
        let Screen::Viewer(viewer) = &app.screen else {
            panic!("viewer not open");
        };
        assert_eq!(viewer.spread, 1);
        let toc: Vec<(&str, u32)> = viewer
            .toc
            .iter()
            .map(|entry| (entry.title.as_str(), entry.page_number))
            .collect();
        assert_eq!(toc, [("Song b", 1), ("Song a", 2), ("Song c", 3)]);
    }

    #[test]
    fn editor_reorders_and_flips_side() {
        let (conn, owner) = seeded();
        let mut app = App::new(conn, CurrentUser::from_user(&owner), PathBuf::from("/tmp")).unwrap();

        press(&mut app, &[KeyCode::Char('p'), KeyCode::Char('J')]);
        assert_eq!(editor_titles(&app), ["Song b", "Song a", "Song c"]);
        let Screen::Editor(editor) = &app.screen else {
            panic!("editor not open");
        };
        assert_eq!(editor.selected, 1);

        press(&mut app, &[KeyCode::Char('s'), KeyCode::Char('v')]);
        let Screen::Editor(editor) = &app.screen else {
            panic!("editor not open");
        };
        assert_eq!(editor.songbook.first_page_side, PageSide::Left);
        assert!(editor.songbook.is_public);

        press(&mut app, &[KeyCode::Char('-'), KeyCode::Char('y')]);
        assert_eq!(editor_titles(&app), ["Song b", "Song c"]);
    }

    #[test]
    fn new_songbook_form_validates_title() {
        let (conn, owner) = seeded();
        let mut app = App::new(conn, CurrentUser::from_user(&owner), PathBuf::from("/tmp")).unwrap();

        press(&mut app, &[KeyCode::Char('+'), KeyCode::Enter]);
        match &app.mode {
            Mode::CreatingSongbook(form) => assert!(form.error.is_some()),
            _ => panic!("form closed"),
        }

        let mut keys: Vec<KeyCode> = "Hymns".chars().map(KeyCode::Char).collect();
        keys.push(KeyCode::Enter);
        press(&mut app, &keys);
        assert!(matches!(app.mode, Mode::Normal));
        let titles: Vec<&str> = app.songbooks.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["Campfire", "Hymns"]);
        assert_eq!(app.songbooks[app.selected].title, "Hymns");
    }

    #[test]
    fn share_grants_access_to_another_account() {
        let (conn, owner) = seeded();
        let mut app = App::new(conn, CurrentUser::from_user(&owner), PathBuf::from("/tmp")).unwrap();

        let mut keys = vec![KeyCode::Char('p'), KeyCode::Char('h')];
        keys.extend("friend@test.com".chars().map(KeyCode::Char));
        keys.extend([KeyCode::Tab, KeyCode::Char('e'), KeyCode::Enter]);
        press(&mut app, &keys);
        assert!(matches!(app.mode, Mode::Normal));

        let friend = crate::db::fetch_user_by_email(&app.conn, "friend@test.com")
            .unwrap()
            .unwrap();
        let book_id = app.songbooks[0].id.clone();
        assert_eq!(
            crate::db::fetch_permission(&app.conn, &book_id, friend.id).unwrap(),
            Some(Permission::Edit)
        );
    }
}
