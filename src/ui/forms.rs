use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Permission, Songbook, SongbookPage};

/// Single-field form used to create or rename a songbook.
#[derive(Default, Clone)]
pub(crate) struct SongbookForm {
    pub(crate) title: String,
    pub(crate) error: Option<String>,
}

impl SongbookForm {
    pub(crate) fn from_songbook(songbook: &Songbook) -> Self {
        Self {
            title: songbook.title.clone(),
            error: None,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.title.push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.title.pop();
    }

    pub(crate) fn parse_title(&self) -> Result<String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(anyhow!("Songbook title is required."));
        }
        Ok(title.to_string())
    }

    pub(crate) fn build_line(&self) -> Line<'static> {
        field_line("Title", &self.title, true)
    }

    pub(crate) fn value_len(&self) -> usize {
        self.title.chars().count()
    }
}

/// Fields of the share form.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum ShareField {
    #[default]
    Email,
    Permission,
}

/// Grant another account access to a songbook.
#[derive(Clone)]
pub(crate) struct ShareForm {
    pub(crate) email: String,
    pub(crate) permission: Permission,
    pub(crate) active: ShareField,
    pub(crate) error: Option<String>,
}

impl Default for ShareForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            permission: Permission::View,
            active: ShareField::Email,
            error: None,
        }
    }
}

impl ShareForm {
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            ShareField::Email => ShareField::Permission,
            ShareField::Permission => ShareField::Email,
        };
    }

    /// Type into the e-mail, or flip the permission with space / `v` / `e`.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            ShareField::Email => {
                if ch.is_control() || ch.is_whitespace() {
                    return false;
                }
                self.email.push(ch);
                true
            }
            ShareField::Permission => {
                self.permission = match (ch, self.permission) {
                    ('v' | 'V', _) => Permission::View,
                    ('e' | 'E', _) => Permission::Edit,
                    (' ', Permission::View) => Permission::Edit,
                    (' ', Permission::Edit) => Permission::View,
                    _ => return false,
                };
                true
            }
        }
    }

    pub(crate) fn backspace(&mut self) {
        if self.active == ShareField::Email {
            self.email.pop();
        }
    }

    pub(crate) fn parse_inputs(&self) -> Result<(String, Permission)> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(anyhow!("E-mail is required."));
        }
        if !email.contains('@') {
            return Err(anyhow!("'{email}' is not an e-mail address."));
        }
        Ok((email.to_lowercase(), self.permission))
    }

    pub(crate) fn build_line(&self, field: ShareField) -> Line<'static> {
        match field {
            ShareField::Email => field_line("E-mail", &self.email, self.active == field),
            ShareField::Permission => {
                let value = match self.permission {
                    Permission::View => "view only",
                    Permission::Edit => "can edit",
                };
                field_line("Access", value, self.active == field)
            }
        }
    }

    pub(crate) fn value_len(&self) -> usize {
        self.email.chars().count()
    }
}

fn field_line(field_name: &str, value: &str, is_active: bool) -> Line<'static> {
    let display = if value.is_empty() {
        "<required>".to_string()
    } else {
        value.to_string()
    };

    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{field_name}: ")),
        Span::styled(display, style),
    ])
}

#[derive(Clone)]
pub(crate) struct ConfirmSongbookDelete {
    pub(crate) id: String,
    pub(crate) title: String,
}

impl ConfirmSongbookDelete {
    pub(crate) fn from(songbook: &Songbook) -> Self {
        Self {
            id: songbook.id.clone(),
            title: songbook.title.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct ConfirmPageRemove {
    pub(crate) songbook_id: String,
    pub(crate) page_id: i64,
    pub(crate) page_number: i64,
    pub(crate) title: String,
}

impl ConfirmPageRemove {
    pub(crate) fn from(page: &SongbookPage) -> Self {
        Self {
            songbook_id: page.songbook_id.clone(),
            page_id: page.id,
            page_number: page.page_number,
            title: page.song.display_title(),
        }
    }
}
