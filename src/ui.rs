//! Terminal front-end: the songbook shelf, the book viewer and the page
//! editor, drawn with ratatui on a crossterm backend.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
