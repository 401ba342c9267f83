//! Output formatting for CLI display.

use jiff::Timestamp;

use crate::model::{Channel, PartSnapshot, SessionSummary, Thresholds};

/// Multi-line session header with tallies.
pub(super) fn format_summary(summary: &SessionSummary) -> String {
    let info = &summary.info;
    let mut lines = vec![
        format!("Session {}", summary.id),
        format!("  Operator:    {}", or_dash(&info.operator)),
        format!("  Machine:     {}", or_dash(&info.machine_id)),
        format!("  Supervisor:  {}", or_dash(&info.supervisor_id)),
        format!("  Company:     {}", or_dash(&info.company)),
        format!("  Part:        {}", or_dash(&info.part_description)),
        format!("  Thresholds:  {}", format_thresholds(summary.thresholds)),
        format!("  Started:     {}", format_time(summary.started_at)),
    ];
    if let Some(ended_at) = summary.ended_at {
        lines.push(format!("  Ended:       {}", format_time(ended_at)));
    }
    lines.push(format!(
        "  Parts:       {} ({} accepted, {} rejected)",
        summary.total, summary.accepted, summary.rejected
    ));
    lines.join("\n")
}

/// One line per session for `history list`.
pub(super) fn format_session_line(summary: &SessionSummary) -> String {
    let short_id = &summary.id.to_string()[..8];
    format!(
        "{short_id}  {}  [{}] {}  {}/{}/{}",
        format_time(summary.started_at),
        or_dash(&summary.info.operator),
        or_dash(&summary.info.part_description),
        summary.total,
        summary.accepted,
        summary.rejected
    )
}

pub(super) fn format_thresholds(thresholds: Thresholds) -> String {
    format!(
        "headshot {:.2}, coilshot {:.2}",
        thresholds.headshot, thresholds.coilshot
    )
}

/// Highest current per channel, as shown beside a history row.
pub(super) fn format_peaks(part: &PartSnapshot) -> String {
    Channel::ALL
        .iter()
        .map(|&c| format!("{} max {:.2}", c.as_str(), part.highest_current(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_time(at: Timestamp) -> String {
    at.strftime("%Y-%m-%d %H:%M:%S").to_string()
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
