//! Session storage: archive, load, list, and resolve ended sessions.

use jiff::Timestamp;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::model::{
    Channel, PartSnapshot, PartStatus, SessionInfo, SessionSummary, Slot, Thresholds, Verdict,
};

use super::{Result, Storage, StorageError};

impl Storage {
    /// Writes a session and all of its parts in one transaction.
    ///
    /// Parts keep the order given, which must be testing order.
    pub fn archive_session(&mut self, summary: &SessionSummary, parts: &[PartSnapshot]) -> Result<()> {
        let tx = self.conn.transaction()?;
        let id = summary.id.to_string();

        let exists = tx
            .query_row("SELECT 1 FROM session WHERE id = ?1", [&id], |_| Ok(()))
            .optional()?
            .is_some();
        if exists {
            return Err(StorageError::SessionAlreadyArchived(summary.id));
        }

        tx.execute(
            "INSERT INTO session (id, operator, machine_id, supervisor_id, company, part_description,
                                  headshot_threshold, coilshot_threshold, started_at, ended_at,
                                  total, accepted, rejected)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                id,
                summary.info.operator,
                summary.info.machine_id,
                summary.info.supervisor_id,
                summary.info.company,
                summary.info.part_description,
                summary.thresholds.headshot,
                summary.thresholds.coilshot,
                summary.started_at.to_string(),
                summary.ended_at.map(|t| t.to_string()),
                to_i64(summary.total)?,
                to_i64(summary.accepted)?,
                to_i64(summary.rejected)?,
            ],
        )?;

        for (seq, part) in parts.iter().enumerate() {
            tx.execute(
                "INSERT INTO part (session_id, seq, part_number, description, created_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    to_i64(seq)?,
                    part.part_number,
                    part.description,
                    part.created_at.to_string(),
                    part.status.as_str(),
                ],
            )?;
            for channel in Channel::ALL {
                for (idx, slot) in part.slots(channel).iter().enumerate() {
                    tx.execute(
                        "INSERT INTO slot (session_id, part_number, channel, idx, current, duration, verdict)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![
                            id,
                            part.part_number,
                            channel.as_str(),
                            to_i64(idx)?,
                            slot.current,
                            slot.duration,
                            slot.verdict.as_str(),
                        ],
                    )?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Lists every archived session, oldest first.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, operator, machine_id, supervisor_id, company, part_description,
                    headshot_threshold, coilshot_threshold, started_at, ended_at,
                    total, accepted, rejected
             FROM session",
        )?;
        let mut rows = stmt.query([])?;
        let mut sessions = Vec::new();
        while let Some(row) = rows.next()? {
            sessions.push(row_to_summary(row)?);
        }
        sessions.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(sessions)
    }

    /// Loads a session's summary and its parts in testing order.
    pub fn load_session(&self, id: Uuid) -> Result<(SessionSummary, Vec<PartSnapshot>)> {
        let summary = self
            .conn
            .query_row(
                "SELECT id, operator, machine_id, supervisor_id, company, part_description,
                        headshot_threshold, coilshot_threshold, started_at, ended_at,
                        total, accepted, rejected
                 FROM session WHERE id = ?1",
                [id.to_string()],
                |row| Ok(row_to_summary(row)),
            )
            .optional()?
            .ok_or(StorageError::SessionNotFound(id))??;

        let parts = load_parts(&self.conn, id)?;
        Ok((summary, parts))
    }

    /// Resolves a session reference (full UUID or unambiguous prefix).
    pub fn find_session(&self, reference: &str) -> Result<Uuid> {
        if let Ok(id) = reference.parse::<Uuid>() {
            return Ok(id);
        }

        let matches: Vec<Uuid> = self
            .list_sessions()?
            .into_iter()
            .map(|s| s.id)
            .filter(|id| id.to_string().starts_with(reference))
            .collect();

        match matches.as_slice() {
            [] => Err(StorageError::NoSessionMatching(reference.to_string())),
            [id] => Ok(*id),
            _ => Err(StorageError::AmbiguousSession {
                prefix: reference.to_string(),
                count: matches.len(),
            }),
        }
    }
}

fn load_parts(conn: &Connection, session_id: Uuid) -> Result<Vec<PartSnapshot>> {
    let id = session_id.to_string();
    let mut stmt = conn.prepare(
        "SELECT part_number, description, created_at, status
         FROM part WHERE session_id = ?1 ORDER BY seq",
    )?;
    let mut rows = stmt.query([&id])?;
    let mut parts = Vec::new();
    while let Some(row) = rows.next()? {
        let part_number: u32 = row.get(0)?;
        parts.push(PartSnapshot {
            session_id,
            part_number,
            description: row.get(1)?,
            created_at: parse_timestamp(&row.get::<_, String>(2)?, "created_at")?,
            headshot: Vec::new(),
            coilshot: Vec::new(),
            status: parse_status(&row.get::<_, String>(3)?)?,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT part_number, channel, current, duration, verdict
         FROM slot WHERE session_id = ?1 ORDER BY part_number, channel, idx",
    )?;
    let mut rows = stmt.query([&id])?;
    while let Some(row) = rows.next()? {
        let part_number: u32 = row.get(0)?;
        let channel = parse_channel(&row.get::<_, String>(1)?)?;
        let slot = Slot {
            current: row.get(2)?,
            duration: row.get(3)?,
            verdict: parse_verdict(&row.get::<_, String>(4)?)?,
        };
        let part = parts
            .iter_mut()
            .find(|p| p.part_number == part_number)
            .ok_or_else(|| StorageError::Corrupt(format!("slot for unknown part {part_number}")))?;
        match channel {
            Channel::Headshot => part.headshot.push(slot),
            Channel::Coilshot => part.coilshot.push(slot),
        }
    }

    Ok(parts)
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> Result<SessionSummary> {
    let id = row
        .get::<_, String>(0)?
        .parse::<Uuid>()
        .map_err(|e| StorageError::Corrupt(format!("invalid session id: {e}")))?;
    Ok(SessionSummary {
        id,
        info: SessionInfo {
            operator: row.get(1)?,
            machine_id: row.get(2)?,
            supervisor_id: row.get(3)?,
            company: row.get(4)?,
            part_description: row.get(5)?,
        },
        thresholds: Thresholds::new(row.get(6)?, row.get(7)?),
        started_at: parse_timestamp(&row.get::<_, String>(8)?, "started_at")?,
        ended_at: row
            .get::<_, Option<String>>(9)?
            .map(|s| parse_timestamp(&s, "ended_at"))
            .transpose()?,
        total: to_usize(row.get(10)?)?,
        accepted: to_usize(row.get(11)?)?,
        rejected: to_usize(row.get(12)?)?,
    })
}

fn parse_timestamp(value: &str, field: &str) -> Result<Timestamp> {
    value
        .parse::<Timestamp>()
        .map_err(|e| StorageError::Corrupt(format!("invalid {field}: {e}")))
}

fn parse_channel(value: &str) -> Result<Channel> {
    Channel::ALL
        .into_iter()
        .find(|c| c.as_str() == value)
        .ok_or_else(|| StorageError::Corrupt(format!("unknown channel: {value}")))
}

fn parse_verdict(value: &str) -> Result<Verdict> {
    match value {
        "pass" => Ok(Verdict::Pass),
        "fail" => Ok(Verdict::Fail),
        other => Err(StorageError::Corrupt(format!("unknown verdict: {other}"))),
    }
}

fn parse_status(value: &str) -> Result<PartStatus> {
    match value {
        "unset" => Ok(PartStatus::Unset),
        "pass" => Ok(PartStatus::Pass),
        "fail" => Ok(PartStatus::Fail),
        other => Err(StorageError::Corrupt(format!("unknown part status: {other}"))),
    }
}

fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| StorageError::Corrupt(format!("count {value} out of range")))
}

fn to_usize(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| StorageError::Corrupt(format!("negative count {value}")))
}
