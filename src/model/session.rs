//! Session types: one complete test run.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Channel, PartRecord, PartStatus};

/// Who ran the session, on what, and for whom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub operator: String,
    pub machine_id: String,
    pub supervisor_id: String,
    pub company: String,
    /// Description given to parts created in this session.
    pub part_description: String,
}

/// Pass thresholds for both channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub headshot: f64,
    pub coilshot: f64,
}

impl Thresholds {
    pub fn new(headshot: f64, coilshot: f64) -> Self {
        Self { headshot, coilshot }
    }

    pub fn for_channel(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Headshot => self.headshot,
            Channel::Coilshot => self.coilshot,
        }
    }

    /// The first channel whose threshold is negative or non-finite.
    pub fn first_invalid(&self) -> Option<(Channel, f64)> {
        Channel::ALL
            .into_iter()
            .map(|c| (c, self.for_channel(c)))
            .find(|&(_, value)| !value.is_finite() || value < 0.0)
    }
}

/// A test run: configuration plus every part tested, in testing order.
///
/// The session is the single owner of its parts. Mutation goes through the
/// engine, which enforces part-number uniqueness and the closed state.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    info: SessionInfo,
    thresholds: Thresholds,
    started_at: Timestamp,
    ended_at: Option<Timestamp>,
    parts: Vec<PartRecord>,
}

impl Session {
    pub fn new(info: SessionInfo, thresholds: Thresholds) -> Self {
        Self {
            id: Uuid::new_v4(),
            info,
            thresholds,
            started_at: Timestamp::now(),
            ended_at: None,
            parts: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn is_closed(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Parts in insertion order, which is testing order.
    pub fn parts(&self) -> &[PartRecord] {
        &self.parts
    }

    pub fn part(&self, number: u32) -> Option<&PartRecord> {
        self.parts.iter().find(|p| p.number() == number)
    }

    /// The part readings are attributed to: the most recently created one.
    pub fn active_part_number(&self) -> Option<u32> {
        self.parts.last().map(PartRecord::number)
    }

    pub fn summary(&self) -> SessionSummary {
        let count = |status| {
            self.parts
                .iter()
                .filter(|p| p.status() == status)
                .count()
        };
        SessionSummary {
            id: self.id,
            info: self.info.clone(),
            thresholds: self.thresholds,
            started_at: self.started_at,
            ended_at: self.ended_at,
            total: self.parts.len(),
            accepted: count(PartStatus::Pass),
            rejected: count(PartStatus::Fail),
        }
    }

    pub(crate) fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
    }

    pub(crate) fn push_part(&mut self, part: PartRecord) {
        self.parts.push(part);
    }

    pub(crate) fn active_part_mut(&mut self) -> Option<&mut PartRecord> {
        self.parts.last_mut()
    }

    pub(crate) fn close(&mut self, at: Timestamp) {
        self.ended_at = Some(at);
    }
}

/// Header and tallies of a session, as archived and reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub info: SessionInfo,
    pub thresholds: Thresholds,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub total: usize,
    /// Parts whose status is pass.
    pub accepted: usize,
    /// Parts whose status is fail.
    pub rejected: usize,
}
