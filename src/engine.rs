//! The ingestion engine: turns incoming readings into classified part state.
//!
//! The engine owns the live [`Session`] and every part in it. Each operation
//! either commits completely and then notifies sinks, or fails and leaves the
//! session exactly as it was.
//!
//! Access from several threads goes through [`EngineHandle`], a mutex around
//! the whole engine. Slot scan, slot write and status derivation all happen
//! under one lock acquisition.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jiff::Timestamp;
use log::{debug, info, warn};

use crate::classify::classify;
use crate::model::{
    Channel, Measurement, PartRecord, PartSnapshot, SLOTS_PER_CHANNEL, Session, SessionSummary,
    Slot, Thresholds, Verdict,
};
use crate::sink::{ChangeEvent, ChangeSink};

/// Part number used when a reading arrives before any part was started.
pub const FIRST_PART_NUMBER: u32 = 1;

/// Reasons an engine operation is refused. None of them are fatal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("session is closed")]
    SessionClosed,

    #[error("part {0} already exists in this session")]
    DuplicatePart(u32),

    #[error("part {part} has no free {channel} slot")]
    ChannelFull { part: u32, channel: Channel },

    #[error("invalid {channel} threshold: {value}")]
    InvalidThreshold { channel: Channel, value: f64 },

    #[error("reading is not numeric: {0}")]
    InvalidReading(Measurement),
}

pub type Result<T> = core::result::Result<T, EngineError>;

/// Where an ingested reading landed and how it was classified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub part_number: u32,
    pub channel: Channel,
    pub index: usize,
    pub verdict: Verdict,
}

/// Single-writer owner of a session.
pub struct IngestionEngine {
    session: Session,
    sinks: Vec<Box<dyn ChangeSink>>,
}

impl IngestionEngine {
    /// Takes ownership of a fresh session.
    ///
    /// Fails with `InvalidThreshold` when the session's starting thresholds
    /// are negative or non-finite, the same rule `set_thresholds` applies.
    pub fn new(session: Session) -> Result<Self> {
        if let Some((channel, value)) = session.thresholds().first_invalid() {
            warn!("rejected session {}: invalid {channel} threshold {value}", session.id());
            return Err(EngineError::InvalidThreshold { channel, value });
        }
        info!(
            "session {} started by {} on {}",
            session.id(),
            session.info().operator,
            session.info().machine_id
        );
        Ok(Self {
            session,
            sinks: Vec::new(),
        })
    }

    /// Registers a sink. Every later event is delivered to it.
    pub fn add_sink(&mut self, sink: impl ChangeSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Attributes a reading to the active part, classifies it, and records it.
    ///
    /// The active part is the most recently created one. When the session has
    /// no parts yet, part 1 is created first. The threshold in effect right
    /// now is used; earlier slots are never reclassified.
    pub fn ingest(&mut self, measurement: Measurement) -> Result<Placement> {
        self.try_ingest(measurement)
            .inspect_err(|e| warn!("rejected reading ({measurement}): {e}"))
    }

    fn try_ingest(&mut self, measurement: Measurement) -> Result<Placement> {
        if self.session.is_closed() {
            return Err(EngineError::SessionClosed);
        }
        if !measurement.is_numeric() {
            return Err(EngineError::InvalidReading(measurement));
        }

        let channel = measurement.channel();
        if let Some(part) = self.session.parts().last()
            && part.filled(channel) == SLOTS_PER_CHANNEL
        {
            return Err(EngineError::ChannelFull {
                part: part.number(),
                channel,
            });
        }

        if self.session.active_part_number().is_none() {
            let description = self.session.info().part_description.clone();
            self.append_part(FIRST_PART_NUMBER, description);
        }

        let threshold = self.session.thresholds().for_channel(channel);
        let verdict = classify(measurement.current(), threshold);
        let slot = Slot {
            current: measurement.current(),
            duration: measurement.duration(),
            verdict,
        };

        let session_id = self.session.id();
        let part = self
            .session
            .active_part_mut()
            .ok_or(EngineError::SessionClosed)?;
        let index = part.fill_slot(channel, slot).ok_or(EngineError::ChannelFull {
            part: part.number(),
            channel,
        })?;
        let snapshot = PartSnapshot::of(session_id, part);

        debug!(
            "part {} {channel}[{index}] = {:.2} vs {threshold:.2}: {}",
            snapshot.part_number,
            slot.current,
            verdict.as_str()
        );
        let placement = Placement {
            part_number: snapshot.part_number,
            channel,
            index,
            verdict,
        };
        self.emit(&ChangeEvent::RowChanged(snapshot));
        Ok(placement)
    }

    /// Starts a new part, which becomes the active part.
    pub fn start_new_part(&mut self, number: u32, description: impl Into<String>) -> Result<()> {
        let description = description.into();
        self.try_start_new_part(number, description)
            .inspect_err(|e| warn!("rejected new part {number}: {e}"))
    }

    fn try_start_new_part(&mut self, number: u32, description: String) -> Result<()> {
        if self.session.is_closed() {
            return Err(EngineError::SessionClosed);
        }
        if self.session.part(number).is_some() {
            return Err(EngineError::DuplicatePart(number));
        }
        self.append_part(number, description);
        Ok(())
    }

    /// Replaces both thresholds. Applies to readings classified from now on.
    pub fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<()> {
        self.try_set_thresholds(thresholds)
            .inspect_err(|e| warn!("rejected thresholds {thresholds:?}: {e}"))
    }

    fn try_set_thresholds(&mut self, thresholds: Thresholds) -> Result<()> {
        if self.session.is_closed() {
            return Err(EngineError::SessionClosed);
        }
        if let Some((channel, value)) = thresholds.first_invalid() {
            return Err(EngineError::InvalidThreshold { channel, value });
        }
        self.session.set_thresholds(thresholds);
        info!(
            "thresholds set: headshot {:.2}, coilshot {:.2}",
            thresholds.headshot, thresholds.coilshot
        );
        self.emit(&ChangeEvent::ThresholdsChanged(thresholds));
        Ok(())
    }

    /// Closes the session for good.
    ///
    /// Emits one `Archive` per part in testing order, then `SessionEnded`.
    /// A second call fails with `SessionClosed` and emits nothing.
    pub fn end_session(&mut self) -> Result<SessionSummary> {
        if self.session.is_closed() {
            warn!("rejected end of session {}: already closed", self.session.id());
            return Err(EngineError::SessionClosed);
        }

        let session_id = self.session.id();
        let archives: Vec<ChangeEvent> = self
            .session
            .parts()
            .iter()
            .map(|p| ChangeEvent::Archive(PartSnapshot::of(session_id, p)))
            .collect();
        for event in &archives {
            self.emit(event);
        }

        self.session.close(Timestamp::now());
        let summary = self.session.summary();
        info!(
            "session {} ended: {} part(s), {} accepted, {} rejected",
            summary.id, summary.total, summary.accepted, summary.rejected
        );
        self.emit(&ChangeEvent::SessionEnded(summary.clone()));
        Ok(summary)
    }

    fn append_part(&mut self, number: u32, description: String) {
        let part = PartRecord::new(number, description, Timestamp::now());
        let snapshot = PartSnapshot::of(self.session.id(), &part);
        self.session.push_part(part);
        info!("part {number} started");
        self.emit(&ChangeEvent::RowAppended(snapshot));
    }

    fn emit(&mut self, event: &ChangeEvent) {
        for sink in &mut self.sinks {
            sink.notify(event);
        }
    }
}

/// Cloneable handle to an engine shared between threads.
///
/// Every call takes the engine lock for its whole duration.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<Mutex<IngestionEngine>>,
}

impl EngineHandle {
    pub fn new(engine: IngestionEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, IngestionEngine> {
        // Operations never leave the session half-written, so a poisoned lock
        // still guards consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ingest(&self, measurement: Measurement) -> Result<Placement> {
        self.lock().ingest(measurement)
    }

    pub fn start_new_part(&self, number: u32, description: impl Into<String>) -> Result<()> {
        self.lock().start_new_part(number, description)
    }

    pub fn set_thresholds(&self, thresholds: Thresholds) -> Result<()> {
        self.lock().set_thresholds(thresholds)
    }

    pub fn end_session(&self) -> Result<SessionSummary> {
        self.lock().end_session()
    }

    /// Runs a read-only closure against the session under the lock.
    pub fn with_session<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(self.lock().session())
    }
}
