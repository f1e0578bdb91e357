//! Binary entry point: resolve configuration, open the store, then either
//! import seed files or hand the terminal to the viewer.
use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use songbook_viewer::db::fetch_user_by_email;
use songbook_viewer::logging::init_logging;
use songbook_viewer::seed::seed_path;
use songbook_viewer::{ensure_schema, run_app, App, Cli, Command, Config, CurrentUser};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?.apply_cli(&cli);
    init_logging(&config)?;
    info!(db = %config.db_path.display(), "starting songbook viewer v{}", env!("CARGO_PKG_VERSION"));

    let mut conn = ensure_schema(&config.db_path)?;

    if let Some(Command::Seed { paths }) = &cli.command {
        for path in paths {
            let summary = seed_path(&mut conn, path)?;
            println!(
                "{}: {} songbook(s), {} song(s), {} page(s), {} skipped",
                path.display(),
                summary.songbooks,
                summary.songs,
                summary.pages,
                summary.skipped_pages
            );
        }
        return Ok(());
    }

    let user = match config.user_email.as_deref() {
        Some(email) => match fetch_user_by_email(&conn, email)? {
            Some(user) => CurrentUser::from_user(&user),
            None => {
                warn!(email, "unknown account, browsing as guest");
                eprintln!("No account for {email}; browsing as guest.");
                CurrentUser::anonymous()
            }
        },
        None => CurrentUser::anonymous(),
    };

    let mut app = App::new(conn, user, config.image_root.clone())?;
    run_app(&mut app)
}
