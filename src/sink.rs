//! Change notification: the events the engine pushes to its observers.
//!
//! The engine never polls and never hands out references into its state.
//! Every event carries owned copies, and sinks are notified synchronously
//! right after a mutation is committed.
//!
//! A sink's `notify` must not block on I/O. Sinks that write to a terminal,
//! a file or a database are wrapped in a [`QueuedSink`], which moves the work
//! onto its own thread behind a bounded queue.

mod archive;
mod journal;
pub mod live;
mod queue;

use serde::{Deserialize, Serialize};

use crate::model::{PartSnapshot, SessionSummary, Thresholds};

pub use archive::HistoryArchive;
pub use journal::Journal;
pub use live::LiveView;
pub use queue::{Overflow, QueuedSink};

/// Something that happened to the session, as seen from outside the engine.
///
/// Tagged so each journal line is self-describing when read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ChangeEvent {
    /// A part was added to the session.
    RowAppended(PartSnapshot),

    /// A slot of a part was filled. Carries the whole part, not a delta.
    RowChanged(PartSnapshot),

    /// Thresholds were replaced. Existing verdicts are unaffected.
    ThresholdsChanged(Thresholds),

    /// Final copy of a part, emitted once per part when the session ends.
    Archive(PartSnapshot),

    /// The session was closed. Always follows the last `Archive`.
    SessionEnded(SessionSummary),
}

/// A consumer of engine notifications.
pub trait ChangeSink: Send {
    /// Receives one event. Must return promptly.
    fn notify(&mut self, event: &ChangeEvent);
}
