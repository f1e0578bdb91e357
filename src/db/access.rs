use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::models::Permission;

/// Grant `user_id` access to a songbook, upgrading or downgrading an existing
/// grant in place.
pub fn share_songbook(
    conn: &Connection,
    songbook_id: &str,
    user_id: i64,
    permission: Permission,
) -> Result<()> {
    conn.execute(
        "INSERT INTO user_songbook_access (user_id, songbook_id, permission)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, songbook_id) DO UPDATE SET permission = excluded.permission",
        params![user_id, songbook_id, permission.as_str()],
    )
    .context("failed to share songbook")?;
    info!(songbook_id, user_id, permission = permission.as_str(), "shared songbook");
    Ok(())
}

/// Permission granted to `user_id` on a songbook, if any.
pub fn fetch_permission(
    conn: &Connection,
    songbook_id: &str,
    user_id: i64,
) -> Result<Option<Permission>> {
    let permission: Option<String> = conn
        .query_row(
            "SELECT permission FROM user_songbook_access WHERE songbook_id = ?1 AND user_id = ?2",
            params![songbook_id, user_id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to load songbook permission")?;
    Ok(permission.as_deref().map(Permission::from_db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_connection;
    use crate::db::{create_songbook, ensure_user};
    use crate::models::Role;

    #[test]
    fn sharing_again_replaces_permission() {
        let conn = test_connection();
        let user = ensure_user(&conn, "friend@test.com", Role::User).unwrap();
        let book = create_songbook(&conn, "Book", None).unwrap();

        assert_eq!(fetch_permission(&conn, &book.id, user.id).unwrap(), None);
        share_songbook(&conn, &book.id, user.id, Permission::View).unwrap();
        share_songbook(&conn, &book.id, user.id, Permission::Edit).unwrap();
        assert_eq!(
            fetch_permission(&conn, &book.id, user.id).unwrap(),
            Some(Permission::Edit)
        );
    }
}
