//! Core data model for Magpi.
//!
//! These types represent an inspection run: measurements arriving from the
//! meters, the parts they are attributed to, and the session that owns them.

mod measurement;
mod part;
mod session;
mod snapshot;

pub use measurement::{Channel, Measurement};
pub use part::{PartRecord, PartStatus, SLOTS_PER_CHANNEL, Slot, Verdict};
pub use session::{Session, SessionInfo, SessionSummary, Thresholds};
pub use snapshot::PartSnapshot;
