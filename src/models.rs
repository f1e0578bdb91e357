//! Domain models that mirror the SQLite schema and get passed throughout the
//! viewer. These types stay light-weight data holders so other layers can
//! focus on presentation, layout and persistence logic.

use std::fmt;

use crate::layout::{CoverImages, PageSide};

/// Account role. Guests can browse public songbooks but never edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Admin,
    #[default]
    User,
    Guest,
}

impl Role {
    pub fn from_db(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            "guest" => Role::Guest,
            _ => Role::User,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Guest => "guest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

/// Who is looking at the songbooks. Authentication itself happens elsewhere;
/// the viewer only receives the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub role: Role,
    pub is_authenticated: bool,
}

impl CurrentUser {
    /// Anonymous visitor with guest rights.
    pub fn anonymous() -> Self {
        Self {
            id: None,
            email: None,
            role: Role::Guest,
            is_authenticated: false,
        }
    }

    pub fn from_user(user: &User) -> Self {
        Self {
            id: Some(user.id),
            email: Some(user.email.clone()),
            role: user.role,
            is_authenticated: true,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated && self.role == Role::Admin
    }

    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or("guest")
    }
}

/// Level of access granted when a songbook is shared with another user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    View,
    Edit,
}

impl Permission {
    pub fn from_db(value: &str) -> Self {
        match value {
            "edit" => Permission::Edit,
            _ => Permission::View,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::View => "view",
            Permission::Edit => "edit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A songbook as stored. Pages and intro/outro images live in their own
/// tables and are pulled in by the resolver when the book is opened.
pub struct Songbook {
    pub id: String,
    pub title: String,
    /// `None` for the shared public collection.
    pub owner_id: Option<i64>,
    pub first_page_side: PageSide,
    pub cover_preview: Option<String>,
    pub covers: CoverImages,
    pub is_public: bool,
}

impl fmt::Display for Songbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub id: String,
    pub title: String,
    /// Empty when the song has no author on record.
    pub author: String,
}

impl Song {
    /// `Title - Author`, omitting the hyphen when the author is blank.
    pub fn display_title(&self) -> String {
        if self.author.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.author)
        }
    }
}

/// One row of `songbook_pages` joined with its song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongbookPage {
    pub id: i64,
    pub songbook_id: String,
    pub page_number: i64,
    pub song: Song,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Intro,
    Outro,
}

impl SectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Intro => "intro",
            SectionKind::Outro => "outro",
        }
    }
}

/// Table-of-contents line for the viewer side panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    pub author: String,
    /// Printed number of the song's first page.
    pub page_number: u32,
}
