use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use directories::BaseDirs;

const DATA_DIR_NAME: &str = ".songbook-viewer";
const DB_FILE_NAME: &str = "songbooks.sqlite";
const IMAGE_DIR_NAME: &str = "images";
const LOG_FILE_NAME: &str = "songbook-viewer.log";

#[derive(Debug, Parser)]
#[command(name = "songbook-viewer")]
#[command(about = "Browse scanned songbooks page by page, as printed spreads")]
#[command(version)]
pub struct Cli {
    /// SQLite database file (overrides SONGBOOK_DB_PATH)
    #[arg(long = "db", global = true)]
    pub db_path: Option<PathBuf>,

    /// Directory page image paths are relative to (overrides SONGBOOK_IMAGE_ROOT)
    #[arg(long = "images", global = true)]
    pub image_root: Option<PathBuf>,

    /// E-mail of the signed-in account; browse as a guest when absent
    #[arg(long = "user", global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import songbook JSON files (or directories of them) and exit
    Seed {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

/// Runtime settings, resolved once at startup and handed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub image_root: PathBuf,
    pub user_email: Option<String>,
    pub log_filter: String,
    pub log_path: PathBuf,
}

impl Config {
    /// Read the environment (after loading `.env`, if any) and fall back to
    /// paths under `~/.songbook-viewer`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
        let data_dir = base_dirs.home_dir().join(DATA_DIR_NAME);
        Ok(Self::from_lookup(&data_dir, |key| std::env::var(key).ok()))
    }

    fn from_lookup(data_dir: &std::path::Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Config {
            db_path: var("SONGBOOK_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(DB_FILE_NAME)),
            image_root: var("SONGBOOK_IMAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(IMAGE_DIR_NAME)),
            user_email: var("SONGBOOK_USER"),
            log_filter: var("SONGBOOK_LOG").unwrap_or_else(|| "info".to_string()),
            log_path: data_dir.join(LOG_FILE_NAME),
        }
    }

    /// Command-line flags win over the environment.
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(path) = &cli.db_path {
            self.db_path = path.clone();
        }
        if let Some(root) = &cli.image_root {
            self.image_root = root.clone();
        }
        if let Some(email) = cli.user.as_deref().filter(|e| !e.trim().is_empty()) {
            self.user_email = Some(email.trim().to_string());
        }
        if let Some(parent) = self.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.log_path = parent.join(LOG_FILE_NAME);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(Path::new("/home/me/.songbook-viewer"), |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_live_in_data_dir() {
        let config = config_with(&[]);
        assert_eq!(
            config.db_path,
            PathBuf::from("/home/me/.songbook-viewer/songbooks.sqlite")
        );
        assert_eq!(config.image_root, PathBuf::from("/home/me/.songbook-viewer/images"));
        assert_eq!(config.user_email, None);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn environment_and_flags_override() {
        let config = config_with(&[
            ("SONGBOOK_DB_PATH", "/srv/books.sqlite"),
            ("SONGBOOK_USER", "env@test.com"),
            ("SONGBOOK_LOG", "debug"),
            ("SONGBOOK_IMAGE_ROOT", "  "),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/srv/books.sqlite"));
        assert_eq!(config.image_root, PathBuf::from("/home/me/.songbook-viewer/images"));
        assert_eq!(config.log_filter, "debug");

        let cli = Cli::parse_from(["songbook-viewer", "--user", "cli@test.com", "--db", "/tmp/x.sqlite"]);
        let config = config.apply_cli(&cli);
        assert_eq!(config.user_email.as_deref(), Some("cli@test.com"));
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(config.log_path, PathBuf::from("/tmp/songbook-viewer.log"));
    }

    #[test]
    fn seed_subcommand_takes_paths() {
        let cli = Cli::parse_from(["songbook-viewer", "seed", "a.json", "dir"]);
        match cli.command {
            Some(Command::Seed { paths }) => {
                assert_eq!(paths, [PathBuf::from("a.json"), PathBuf::from("dir")])
            }
            None => panic!("expected seed command"),
        }
        assert!(Cli::try_parse_from(["songbook-viewer", "seed"]).is_err());
    }
}
