//! winbar - window list for lemonbar-style status bars
//!
//! Prints one markup line per window tree change on stdout. Logs go to
//! stderr so the bar only ever sees rendered lines.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use winbar::config::{BarConfig, Config, Identity};
use winbar::event::{render_once, run_bar};
use winbar::ipc::{self, I3ChangeSource, I3TreeSource};

/// winbar - list i3 windows in a status bar
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/winbar/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// i3 IPC socket path (default: $I3SOCK, $SWAYSOCK or i3 --get-socketpath)
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Print a single line and exit
    #[arg(long)]
    once: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_required(path)?,
        None => Config::load(),
    };
    let bar = BarConfig::from_config(&config, &Identity::current())
        .context("invalid configuration")?;
    log::debug!("Click command: {}", bar.click_command);

    if cli.check_config {
        log::info!("Configuration is valid");
        return Ok(());
    }

    let socket = ipc::socket_path(cli.socket.as_deref())?;
    let mut tree = I3TreeSource::connect(&socket)?;
    let mut out = io::stdout().lock();

    if cli.once {
        return render_once(&bar, &mut tree, &mut out);
    }

    // Subscribe before the first render so no change is missed in between
    let changes = I3ChangeSource::connect(&socket)?;
    log::info!("Starting winbar");
    run_bar(&bar, &mut tree, changes, &mut out)
}
