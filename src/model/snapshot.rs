//! Part snapshots: immutable copies handed to change sinks.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Channel, PartRecord, PartStatus, Slot};

/// A full copy of a part as it stood when an event was emitted.
///
/// Sinks keep snapshots, never references into engine-owned state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartSnapshot {
    pub session_id: Uuid,
    pub part_number: u32,
    pub description: String,
    pub created_at: Timestamp,
    /// Filled headshot slots, in fill order.
    pub headshot: Vec<Slot>,
    /// Filled coilshot slots, in fill order.
    pub coilshot: Vec<Slot>,
    pub status: PartStatus,
}

impl PartSnapshot {
    pub fn of(session_id: Uuid, part: &PartRecord) -> Self {
        Self {
            session_id,
            part_number: part.number(),
            description: part.description().to_string(),
            created_at: part.created_at(),
            headshot: part.filled_slots(Channel::Headshot).copied().collect(),
            coilshot: part.filled_slots(Channel::Coilshot).copied().collect(),
            status: part.status(),
        }
    }

    pub fn slots(&self, channel: Channel) -> &[Slot] {
        match channel {
            Channel::Headshot => &self.headshot,
            Channel::Coilshot => &self.coilshot,
        }
    }

    /// Highest current recorded on a channel, or 0.0 when nothing is recorded.
    pub fn highest_current(&self, channel: Channel) -> f64 {
        self.slots(channel)
            .iter()
            .map(|s| s.current)
            .reduce(f64::max)
            .unwrap_or(0.0)
    }
}
