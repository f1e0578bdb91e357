use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{Role, User};

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(2)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        role: Role::from_db(&role),
    })
}

/// Look up an account by e-mail. Comparison is case-insensitive because the
/// address usually comes from configuration typed by hand.
pub fn fetch_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, email, role FROM users WHERE email = ?1 COLLATE NOCASE",
        [email.trim()],
        user_from_row,
    )
    .optional()
    .context("failed to load user")
}

/// Return the account for `email`, creating it with `role` when missing.
/// Existing accounts keep their role.
pub fn ensure_user(conn: &Connection, email: &str, role: Role) -> Result<User> {
    let email = email.trim();
    if email.is_empty() {
        return Err(anyhow!("E-mail is required."));
    }

    if let Some(user) = fetch_user_by_email(conn, email)? {
        return Ok(user);
    }

    conn.execute(
        "INSERT INTO users (email, role) VALUES (?1, ?2)",
        params![email, role.as_str()],
    )
    .context("failed to insert user")?;

    Ok(User {
        id: conn.last_insert_rowid(),
        email: email.to_string(),
        role,
    })
}
