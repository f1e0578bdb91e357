//! Persistence module split across logical submodules. Every function wraps
//! one query (or one transaction) so the resolver and the UI never touch SQL.

mod access;
mod connection;
mod pages;
mod songbooks;
mod songs;
mod users;

pub use access::{fetch_permission, share_songbook};
pub use connection::{ensure_schema, init_schema};
pub use pages::{
    add_section_image, append_page, fetch_pages, fetch_section_images, insert_page, move_page,
    remove_page, renumber_pages,
};
pub use songbooks::{
    create_songbook, delete_songbook, fetch_songbook, fetch_visible_songbooks, insert_songbook,
    rename_songbook, reset_songbook, set_first_page_side, set_public,
};
pub use songs::{
    add_song_image, ensure_author, fetch_all_songs, fetch_song_images, upsert_song, SYSTEM_AUTHOR,
};
pub use users::{ensure_user, fetch_user_by_email};

#[cfg(test)]
pub(crate) use connection::test_connection;
