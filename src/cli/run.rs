//! The run command: one session over one recorded feed.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use clap::Args;
use uuid::Uuid;

use crate::{
    catalog::{Catalog, FileCatalog},
    config::Config,
    engine::{EngineHandle, IngestionEngine},
    model::{Session, SessionInfo, Thresholds},
    sink::{HistoryArchive, Journal, LiveView, Overflow, QueuedSink},
    storage::{self, Storage},
    transport::{ReplayFeed, spawn_reader},
};

use super::format::format_summary;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// JSONL feed of readings, part changes, and threshold changes.
    #[arg(long)]
    readings: PathBuf,

    /// Who is running the session.
    #[arg(long, default_value = "")]
    operator: String,

    /// Machine ID. Defaults to the configured one.
    #[arg(long)]
    machine: Option<String>,

    /// Supervisor ID. Defaults to the configured one.
    #[arg(long)]
    supervisor: Option<String>,

    /// Company. Defaults to the configured one.
    #[arg(long)]
    company: Option<String>,

    /// Description given to every part in the session.
    #[arg(long)]
    part_description: String,

    /// Headshot pass threshold. Overrides the catalog and config.
    #[arg(long)]
    headshot: Option<f64>,

    /// Coilshot pass threshold. Overrides the catalog and config.
    #[arg(long)]
    coilshot: Option<f64>,

    /// Also append every change event to this JSONL file.
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Save the resolved thresholds to the catalog for this description.
    #[arg(long)]
    save_params: bool,
}

pub(super) fn cmd_run(config: &Config, data_dir: &Path, args: &RunArgs) -> Result<(), String> {
    let feed = ReplayFeed::open(&args.readings)
        .map_err(|e| format!("failed to open {}: {e}", args.readings.display()))?;

    let mut catalog = FileCatalog::open(FileCatalog::default_path(data_dir))
        .map_err(|e| format!("failed to open catalog: {e}"))?;

    let thresholds = resolve_thresholds(
        args.headshot,
        args.coilshot,
        catalog.part_parameters(&args.part_description),
        config,
    );

    let info = SessionInfo {
        operator: args.operator.clone(),
        machine_id: args.machine.clone().unwrap_or_else(|| config.machine_id.clone()),
        supervisor_id: args
            .supervisor
            .clone()
            .unwrap_or_else(|| config.supervisor_id.clone()),
        company: args.company.clone().unwrap_or_else(|| config.company.clone()),
        part_description: args.part_description.clone(),
    };
    // Validates the thresholds before anything is written to the catalog.
    let mut engine = IngestionEngine::new(Session::new(info, thresholds))
        .map_err(|e| format!("cannot start session: {e}"))?;

    catalog
        .add_operator(&args.operator)
        .and_then(|()| catalog.add_part_description(&args.part_description))
        .map_err(|e| format!("failed to update catalog: {e}"))?;
    if args.save_params {
        catalog
            .save_part_parameters(&args.part_description, thresholds)
            .map_err(|e| format!("failed to save thresholds: {e}"))?;
    }

    let archived = add_sinks(&mut engine, config, data_dir, args.journal.as_deref())
        .map_err(|e| format!("failed to start sinks: {e}"))?;

    let session = engine.session();
    eprintln!(
        "Session {} started at {} (headshot {:.2}, coilshot {:.2})",
        &session.id().to_string()[..8],
        session.started_at(),
        thresholds.headshot,
        thresholds.coilshot
    );

    let handle = EngineHandle::new(engine);
    let feed = spawn_reader(feed, handle.clone())
        .map_err(|e| format!("failed to start reader: {e}"))?
        .join()
        .map_err(|_| "reader thread panicked".to_string())?;

    let summary = handle
        .end_session()
        .map_err(|e| format!("failed to end session: {e}"))?;
    // Last handle: dropping it drains and joins every sink.
    drop(handle);

    for rejection in feed.rejections() {
        eprintln!("line {}: rejected: {}", rejection.line, rejection.error);
    }
    if feed.malformed() > 0 {
        eprintln!("{} malformed line(s) skipped", feed.malformed());
    }
    eprintln!(
        "{} feed entries applied, {} rejected",
        feed.applied(),
        feed.rejections().len()
    );

    println!("{}", format_summary(&summary));
    check_archived(&archived)
}

/// The archive sink has been joined by now, so its outcome is either queued
/// or was never produced.
fn check_archived(archived: &Receiver<storage::Result<Uuid>>) -> Result<(), String> {
    match archived.try_recv() {
        Ok(Ok(id)) => {
            eprintln!("Session {} archived", &id.to_string()[..8]);
            Ok(())
        }
        Ok(Err(e)) => Err(format!("failed to archive session: {e}")),
        Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
            Err("history archive did not report; session was not archived".to_string())
        }
    }
}

fn add_sinks(
    engine: &mut IngestionEngine,
    config: &Config,
    data_dir: &Path,
    journal: Option<&Path>,
) -> io::Result<Receiver<storage::Result<Uuid>>> {
    let capacity = config.sink_capacity;

    let live = LiveView::new(io::stdout());
    engine.add_sink(QueuedSink::spawn("live", live, capacity, Overflow::DropOldest)?);

    let storage = Storage::open(Storage::default_path(data_dir)).map_err(io::Error::other)?;
    eprintln!("Archiving to {}", storage.path().display());
    let (outcomes, archived) = mpsc::channel();
    let archive = HistoryArchive::new(storage, outcomes);
    engine.add_sink(QueuedSink::spawn(
        "history",
        archive,
        capacity,
        Overflow::Backpressure,
    )?);

    if let Some(path) = journal {
        let journal = Journal::open(path)?;
        eprintln!("Journaling to {}", journal.path().display());
        engine.add_sink(QueuedSink::spawn(
            "journal",
            journal,
            capacity,
            Overflow::Backpressure,
        )?);
    }

    Ok(archived)
}

/// Command line first, then the catalog entry for the description, then
/// the configured defaults. Each channel resolves on its own.
fn resolve_thresholds(
    headshot: Option<f64>,
    coilshot: Option<f64>,
    saved: Option<Thresholds>,
    config: &Config,
) -> Thresholds {
    let base = saved.unwrap_or_else(|| config.default_thresholds());
    Thresholds::new(
        headshot.unwrap_or(base.headshot),
        coilshot.unwrap_or(base.coilshot),
    )
}
