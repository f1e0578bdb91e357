//! Who may open or change a songbook.

use anyhow::Result;
use rusqlite::Connection;
use thiserror::Error;

use crate::db::{fetch_permission, fetch_songbook};
use crate::models::{CurrentUser, Permission, Role, Songbook};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Songbook {0} does not exist.")]
    NotFound(String),

    #[error("You do not have access to this songbook.")]
    Forbidden,

    #[error("Guests cannot change songbooks.")]
    ReadOnly,
}

/// Share grant of `user` on `songbook`, if any.
fn grant(conn: &Connection, user: &CurrentUser, songbook: &Songbook) -> Result<Option<Permission>> {
    match user.id {
        Some(user_id) if user.is_authenticated => fetch_permission(conn, &songbook.id, user_id),
        _ => Ok(None),
    }
}

fn is_owner(user: &CurrentUser, songbook: &Songbook) -> bool {
    user.is_authenticated && user.id.is_some() && songbook.owner_id == user.id
}

pub fn can_view(conn: &Connection, user: &CurrentUser, songbook: &Songbook) -> Result<bool> {
    if songbook.is_public || user.is_admin() || is_owner(user, songbook) {
        return Ok(true);
    }
    Ok(grant(conn, user, songbook)?.is_some())
}

pub fn can_edit(conn: &Connection, user: &CurrentUser, songbook: &Songbook) -> Result<bool> {
    if !user.is_authenticated || user.role == Role::Guest {
        return Ok(false);
    }
    if user.is_admin() || is_owner(user, songbook) {
        return Ok(true);
    }
    Ok(grant(conn, user, songbook)? == Some(Permission::Edit))
}

/// Load a songbook the user is allowed to open.
pub fn require_view(conn: &Connection, user: &CurrentUser, songbook_id: &str) -> Result<Songbook> {
    let songbook = fetch_songbook(conn, songbook_id)?
        .ok_or_else(|| AccessError::NotFound(songbook_id.to_string()))?;
    if !can_view(conn, user, &songbook)? {
        return Err(AccessError::Forbidden.into());
    }
    Ok(songbook)
}

/// Load a songbook the user is allowed to change.
pub fn require_edit(conn: &Connection, user: &CurrentUser, songbook_id: &str) -> Result<Songbook> {
    let songbook = require_view(conn, user, songbook_id)?;
    if user.role == Role::Guest || !user.is_authenticated {
        return Err(AccessError::ReadOnly.into());
    }
    if !can_edit(conn, user, &songbook)? {
        return Err(AccessError::Forbidden.into());
    }
    Ok(songbook)
}
