//! CLI interface for Magpi.
//!
//! Commands split into three groups:
//!
//! - `magpi run` replays a recorded feed through a fresh session.
//! - `magpi history list|show` reads archived sessions.
//! - `magpi catalog operators|parts|params` reads the catalog.
//!
//! `history show` takes a full session UUID or an unambiguous prefix.

mod catalog;
mod format;
mod history;
mod run;

use clap::{Parser, Subcommand};

use crate::config::Config;

use catalog::CatalogCommand;
use history::HistoryCommand;
use run::RunArgs;

/// Magpi: classify magnetic-particle inspection readings.
#[derive(Debug, Parser)]
#[command(name = "magpi", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: inspecting a batch
  1. magpi run --readings shift-a.jsonl --operator dana --part-description Crankshaft \
         --headshot 5.0 --coilshot 3.0 --save-params
     → prints each row as it changes, then the session summary
  2. magpi history list
  3. magpi history show 4f1c

Feed lines (JSONL):
  {"kind":"reading","channel":"headshot","current":5.2,"duration":0.25}
  {"kind":"nextPart","partNumber":2}
  {"kind":"thresholds","headshot":5.5,"coilshot":3.0}"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a session over a recorded feed.
    ///
    /// Readings are classified against the session thresholds as they
    /// arrive. The session is archived to history when the feed ends.
    Run(RunArgs),

    /// Browse archived sessions.
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Show operators, part descriptions, and saved thresholds.
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config) -> Result<(), String> {
    let cli = Cli::parse();
    let data_dir = config
        .data_dir()
        .ok_or("could not determine home directory")?;

    match cli.command {
        Command::Run(args) => run::cmd_run(config, &data_dir, &args),
        Command::History { command } => match command {
            HistoryCommand::List => history::cmd_list(&data_dir),
            HistoryCommand::Show { session } => history::cmd_show(&data_dir, &session),
        },
        Command::Catalog { command } => match command {
            CatalogCommand::Operators => catalog::cmd_operators(&data_dir),
            CatalogCommand::Parts => catalog::cmd_parts(&data_dir),
            CatalogCommand::Params { description } => {
                catalog::cmd_params(&data_dir, &description)
            }
        },
    }
}
