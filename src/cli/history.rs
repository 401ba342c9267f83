//! History commands: list, show.

use std::path::Path;

use clap::Subcommand;

use crate::{sink::live::render_row, storage::Storage};

use super::format::{format_peaks, format_session_line, format_summary};

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List archived sessions, oldest first.
    List,

    /// Show one session with every part in testing order.
    Show {
        /// Session ID: full UUID or unambiguous prefix (e.g. `4f1c`).
        session: String,
    },
}

fn open_storage(data_dir: &Path) -> Result<Storage, String> {
    Storage::open(Storage::default_path(data_dir))
        .map_err(|e| format!("failed to open history: {e}"))
}

pub(super) fn cmd_list(data_dir: &Path) -> Result<(), String> {
    let storage = open_storage(data_dir)?;
    let sessions = storage
        .list_sessions()
        .map_err(|e| format!("failed to list sessions: {e}"))?;

    if sessions.is_empty() {
        println!("No sessions");
        return Ok(());
    }

    for summary in &sessions {
        println!("{}", format_session_line(summary));
    }

    Ok(())
}

pub(super) fn cmd_show(data_dir: &Path, reference: &str) -> Result<(), String> {
    let storage = open_storage(data_dir)?;
    let id = storage
        .find_session(reference)
        .map_err(|e| e.to_string())?;
    let (summary, parts) = storage
        .load_session(id)
        .map_err(|e| format!("failed to load session: {e}"))?;

    println!("{}", format_summary(&summary));
    if parts.is_empty() {
        println!("\nNo parts");
        return Ok(());
    }

    println!();
    for part in &parts {
        println!("{}  ({})", render_row(part), format_peaks(part));
    }

    Ok(())
}
