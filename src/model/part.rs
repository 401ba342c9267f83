//! Part records: the per-part aggregate of classified readings.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::classify::derive_status;

use super::Channel;

/// Readings recorded per channel per part.
pub const SLOTS_PER_CHANNEL: usize = 5;

/// Pass/fail classification of a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
        }
    }
}

/// Aggregate status of a part, derived from all of its slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PartStatus {
    /// No slot holds a verdict yet.
    #[default]
    Unset,
    Pass,
    Fail,
}

impl PartStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PartStatus::Unset => "unset",
            PartStatus::Pass => "pass",
            PartStatus::Fail => "fail",
        }
    }
}

/// A filled slot: the reading's values and the verdict recorded for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub current: f64,
    pub duration: f64,
    pub verdict: Verdict,
}

/// One physical part under test.
///
/// Slots are filled left to right and never rewritten. There is no way to
/// modify a filled slot through this type; `status` is recomputed and stored
/// on every fill.
#[derive(Debug, Clone)]
pub struct PartRecord {
    number: u32,
    description: String,
    created_at: Timestamp,
    headshot: [Option<Slot>; SLOTS_PER_CHANNEL],
    coilshot: [Option<Slot>; SLOTS_PER_CHANNEL],
    status: PartStatus,
}

impl PartRecord {
    pub fn new(number: u32, description: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            number,
            description: description.into(),
            created_at,
            headshot: [None; SLOTS_PER_CHANNEL],
            coilshot: [None; SLOTS_PER_CHANNEL],
            status: PartStatus::Unset,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn status(&self) -> PartStatus {
        self.status
    }

    /// All slot positions for a channel, filled or not.
    pub fn slots(&self, channel: Channel) -> &[Option<Slot>; SLOTS_PER_CHANNEL] {
        match channel {
            Channel::Headshot => &self.headshot,
            Channel::Coilshot => &self.coilshot,
        }
    }

    /// The filled slots of a channel, in fill order.
    pub fn filled_slots(&self, channel: Channel) -> impl Iterator<Item = &Slot> {
        self.slots(channel).iter().flatten()
    }

    /// Number of filled slots in a channel.
    pub fn filled(&self, channel: Channel) -> usize {
        self.filled_slots(channel).count()
    }

    /// Index of the next slot a reading would land in, if any is left.
    pub fn next_free(&self, channel: Channel) -> Option<usize> {
        self.slots(channel).iter().position(Option::is_none)
    }

    /// Writes a slot into the first free position of a channel.
    ///
    /// Returns the index written, or `None` when every slot is already
    /// filled. The record is untouched in that case.
    pub(crate) fn fill_slot(&mut self, channel: Channel, slot: Slot) -> Option<usize> {
        let index = self.next_free(channel)?;
        let slots = match channel {
            Channel::Headshot => &mut self.headshot,
            Channel::Coilshot => &mut self.coilshot,
        };
        slots[index] = Some(slot);
        self.status = derive_status(
            Channel::ALL
                .iter()
                .flat_map(|&c| self.filled_slots(c))
                .map(|s| s.verdict),
        );
        Some(index)
    }
}
