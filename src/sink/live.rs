//! Live view: a terminal projection of the session table.
//!
//! Verdicts are mapped to marks here, at render time. Nothing visual is
//! stored in the engine.

use std::io::Write;

use log::warn;

use crate::model::{Channel, PartSnapshot, PartStatus, SLOTS_PER_CHANNEL, SessionSummary, Slot, Verdict};

use super::{ChangeEvent, ChangeSink};

/// Writes one line per row event to any writer, typically stdout.
pub struct LiveView<W> {
    out: W,
}

impl<W: Write + Send> LiveView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consumes the view and returns the underlying writer.
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ChangeSink for LiveView<W> {
    fn notify(&mut self, event: &ChangeEvent) {
        let line = match event {
            ChangeEvent::RowAppended(part) => format!("+ {}", render_row(part)),
            ChangeEvent::RowChanged(part) => format!("  {}", render_row(part)),
            ChangeEvent::ThresholdsChanged(t) => format!(
                "thresholds: headshot {:.2}, coilshot {:.2}",
                t.headshot, t.coilshot
            ),
            ChangeEvent::Archive(_) => return,
            ChangeEvent::SessionEnded(summary) => render_summary(summary),
        };
        if let Err(e) = writeln!(self.out, "{line}") {
            warn!("live view write failed: {e}");
        }
    }
}

/// Mark shown next to a classified current.
pub fn mark(verdict: Verdict) -> char {
    match verdict {
        Verdict::Pass => '✓',
        Verdict::Fail => '✗',
    }
}

/// One table row: part number, both channels' slots, status.
pub fn render_row(part: &PartSnapshot) -> String {
    let channels: Vec<String> = Channel::ALL
        .iter()
        .map(|&c| format!("{} [{}]", c, render_slots(part.slots(c))))
        .collect();
    format!(
        "#{:<4} {}  {}",
        part.part_number,
        channels.join("  "),
        render_status(part.status)
    )
}

fn render_slots(slots: &[Slot]) -> String {
    let mut cells: Vec<String> = slots
        .iter()
        .map(|s| format!("{:.2}{}", s.current, mark(s.verdict)))
        .collect();
    cells.resize(SLOTS_PER_CHANNEL, "·".to_string());
    cells.join(" ")
}

fn render_status(status: PartStatus) -> &'static str {
    match status {
        PartStatus::Unset => "-",
        PartStatus::Pass => "ACCEPT",
        PartStatus::Fail => "REJECT",
    }
}

fn render_summary(summary: &SessionSummary) -> String {
    format!(
        "session {} ended: {} part(s), {} accepted, {} rejected",
        &summary.id.to_string()[..8],
        summary.total,
        summary.accepted,
        summary.rejected
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use uuid::Uuid;

    fn sample_snapshot() -> PartSnapshot {
        PartSnapshot {
            session_id: Uuid::new_v4(),
            part_number: 7,
            description: "Axle".into(),
            created_at: Timestamp::now(),
            headshot: vec![
                Slot {
                    current: 4.9,
                    duration: 0.2,
                    verdict: Verdict::Fail,
                },
                Slot {
                    current: 5.0,
                    duration: 0.2,
                    verdict: Verdict::Pass,
                },
            ],
            coilshot: vec![],
            status: PartStatus::Fail,
        }
    }

    #[test]
    fn row_marks_each_verdict() {
        let row = render_row(&sample_snapshot());
        assert!(row.starts_with("#7"));
        assert!(row.contains("Headshot [4.90✗ 5.00✓ · · ·]"));
        assert!(row.contains("Coilshot [· · · · ·]"));
        assert!(row.ends_with("REJECT"));
    }

    #[test]
    fn archive_events_are_not_rendered() {
        let mut view = LiveView::new(Vec::new());
        view.notify(&ChangeEvent::Archive(sample_snapshot()));
        view.notify(&ChangeEvent::RowChanged(sample_snapshot()));

        let out = String::from_utf8(view.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 1);
    }
}
