use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ConfigLoader;

pub mod commands;

use self::commands::{CalendarArgs, FilterArgs};

const LOG_FILE: &str = "archive-tui.log";

#[derive(Parser, Debug)]
#[command(
    name = "archive-tui",
    version,
    about = "Terminal browser for a static post archive"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over ARCHIVE_TUI_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the site root (takes precedence over ARCHIVE_TUI_SITE)
    #[arg(long)]
    pub site: Option<PathBuf>,

    /// Open this page instead of the configured start page
    #[arg(long)]
    pub page: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Browse the archive interactively (default)
    Tui,
    /// Apply one filter to a page and print the visible posts
    Filter(FilterArgs),
    /// Print the archive calendar for a month
    Calendar(CalendarArgs),
    /// Print the model status table and indicator
    Status,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("ARCHIVE_TUI_CONFIG", path);
    }
    if let Some(path) = &cli.site {
        env::set_var("ARCHIVE_TUI_SITE", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    let command = cli.command.unwrap_or(Commands::Tui);
    let log_file = matches!(command, Commands::Tui).then(|| paths.log_dir.join(LOG_FILE));
    init_tracing(&cli.log_level, log_file.as_deref())
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let page = cli.page.unwrap_or_else(|| config.site.start_page());
    tracing::debug!(page = %page.display(), config = %paths.config_file.display(), "starting");

    match command {
        Commands::Tui => commands::run_tui(config, &page),
        Commands::Filter(args) => commands::filter_posts(&config, &page, args),
        Commands::Calendar(args) => commands::show_calendar(&page, args),
        Commands::Status => commands::show_status(&config, &page),
    }
}

/// The TUI owns the screen, so its logs go to a file instead of stderr.
fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
            None => {
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}
