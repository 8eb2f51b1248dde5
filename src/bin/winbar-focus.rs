//! winbar-focus - click handler for winbar entries
//!
//! The bar runs this with the container id of the clicked entry; it asks
//! the window manager to focus that container.
//!
//! # Examples
//!
//! ```bash
//! # Focus container 94251026335600
//! winbar-focus 94251026335600
//!
//! # Talk to a specific socket
//! winbar-focus --socket /run/user/1000/i3/ipc-socket.1234 0x55b8c3a0e2f0
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use winbar::ipc::{self, I3Connection};

/// winbar-focus - focus a window by container id
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Container id (decimal or hex with 0x prefix)
    window: String,

    /// i3 IPC socket path (default: $I3SOCK, $SWAYSOCK or i3 --get-socketpath)
    #[arg(long)]
    socket: Option<PathBuf>,
}

fn parse_window_id(s: &str) -> Result<u64> {
    if let Some(hex) = s.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).with_context(|| format!("invalid hex window id: {}", s))
    } else {
        s.parse()
            .with_context(|| format!("invalid window id: {}", s))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn")
    ).init();

    let cli = Cli::parse();
    let id = parse_window_id(&cli.window)?;

    let socket = ipc::socket_path(cli.socket.as_deref())?;
    let mut conn = I3Connection::connect(&socket)?;
    let outcomes = conn.run_command(&format!("[con_id={}] focus", id))?;

    for outcome in outcomes {
        if !outcome.success {
            bail!(
                "focus {} failed: {}",
                id,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    Ok(())
}
