//! History archive: replicates ended sessions into the history store.

use std::sync::mpsc::Sender;

use log::{debug, error, info};
use uuid::Uuid;

use crate::model::PartSnapshot;
use crate::storage::{self, Storage};

use super::{ChangeEvent, ChangeSink};

/// Buffers `Archive` snapshots and commits them with the session summary.
///
/// Row events are ignored; only the final copies emitted at session end are
/// kept. Writes hit the database, so this sink belongs behind a queue.
///
/// The result of every archive attempt is sent to `outcomes`, so whoever
/// ended the session can tell whether it actually reached history.
pub struct HistoryArchive {
    storage: Storage,
    pending: Vec<PartSnapshot>,
    outcomes: Sender<storage::Result<Uuid>>,
}

impl HistoryArchive {
    pub fn new(storage: Storage, outcomes: Sender<storage::Result<Uuid>>) -> Self {
        Self {
            storage,
            pending: Vec::new(),
            outcomes,
        }
    }
}

impl ChangeSink for HistoryArchive {
    fn notify(&mut self, event: &ChangeEvent) {
        match event {
            ChangeEvent::Archive(part) => self.pending.push(part.clone()),
            ChangeEvent::SessionEnded(summary) => {
                let parts = std::mem::take(&mut self.pending);
                let outcome = self.storage.archive_session(summary, &parts);
                match &outcome {
                    Ok(()) => info!(
                        "archived session {} ({} part(s)) to {}",
                        summary.id,
                        parts.len(),
                        self.storage.path().display()
                    ),
                    Err(e) => error!("failed to archive session {}: {e}", summary.id),
                }
                if self.outcomes.send(outcome.map(|()| summary.id)).is_err() {
                    debug!("nobody is waiting for the archive outcome of {}", summary.id);
                }
            }
            ChangeEvent::RowAppended(_)
            | ChangeEvent::RowChanged(_)
            | ChangeEvent::ThresholdsChanged(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::mpsc;

    use jiff::Timestamp;
    use tempfile::TempDir;

    use crate::model::{PartStatus, SessionInfo, SessionSummary, Thresholds};
    use crate::storage::StorageError;

    fn snapshot(session_id: Uuid, part_number: u32) -> PartSnapshot {
        PartSnapshot {
            session_id,
            part_number,
            description: "Hub".into(),
            created_at: Timestamp::now(),
            headshot: vec![],
            coilshot: vec![],
            status: PartStatus::Unset,
        }
    }

    fn ended(id: Uuid, total: usize) -> ChangeEvent {
        ChangeEvent::SessionEnded(SessionSummary {
            id,
            info: SessionInfo::default(),
            thresholds: Thresholds::default(),
            started_at: Timestamp::now(),
            ended_at: Some(Timestamp::now()),
            total,
            accepted: 0,
            rejected: 0,
        })
    }

    #[test]
    fn commits_buffered_parts_on_session_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.sqlite");
        let id = Uuid::new_v4();
        let (tx, outcomes) = mpsc::channel();

        let mut archive = HistoryArchive::new(Storage::open(&path).unwrap(), tx);
        archive.notify(&ChangeEvent::RowAppended(snapshot(id, 1)));
        archive.notify(&ChangeEvent::Archive(snapshot(id, 1)));
        archive.notify(&ChangeEvent::Archive(snapshot(id, 2)));
        archive.notify(&ended(id, 2));
        drop(archive);

        assert_eq!(outcomes.try_recv().unwrap().unwrap(), id);
        let storage = Storage::open(&path).unwrap();
        let (summary, parts) = storage.load_session(id).unwrap();
        assert_eq!(summary.total, 2);
        let numbers: Vec<u32> = parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn failed_archive_is_reported() {
        let dir = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        let (tx, outcomes) = mpsc::channel();

        let mut archive =
            HistoryArchive::new(Storage::open(dir.path().join("history.sqlite")).unwrap(), tx);
        archive.notify(&ended(id, 0));
        archive.notify(&ended(id, 0));

        assert_eq!(outcomes.try_recv().unwrap().unwrap(), id);
        let err = outcomes.try_recv().unwrap().unwrap_err();
        assert!(matches!(err, StorageError::SessionAlreadyArchived(e) if e == id));
    }
}
