//! Songbook viewer: lays scanned songbook pages out as printed spreads and
//! serves them through a terminal UI backed by SQLite.
//!
//! `layout` holds the pure spread arrangement; `resolver` turns stored rows
//! into its input; `db`, `access` and `seed` cover persistence, permissions
//! and bulk import; `ui` is the interactive front-end.
pub mod access;
pub mod config;
pub mod db;
pub mod layout;
pub mod logging;
pub mod models;
pub mod resolver;
pub mod seed;
pub mod ui;

pub use access::{can_edit, can_view, require_edit, require_view, AccessError};
pub use config::{Cli, Command, Config};
pub use db::ensure_schema;
pub use layout::{build_spreads, BookLayout, LayoutInput, PageContent, PageSide, PageSlot, Spread};
pub use models::{CurrentUser, Role, Songbook};
pub use resolver::{get_layout_input, table_of_contents};
pub use ui::{run_app, App};
