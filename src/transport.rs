//! Transport side: where readings come from and how they reach the engine.
//!
//! A [`ReadingSource`] runs on its own reader thread and pushes entries one
//! at a time through an [`EngineHandle`], in arrival order. Whatever the
//! engine refuses is reported straight back to the source.

mod replay;

use std::{
    io,
    thread::{self, JoinHandle},
};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::engine::{EngineError, EngineHandle};
use crate::model::{Measurement, Thresholds};

pub use replay::{FeedError, ReplayFeed};

/// One item pushed by the transport.
///
/// Readings come from the meters. Part and threshold changes are operator
/// actions recorded in the same stream so a run can be replayed in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FeedEntry {
    Reading(Measurement),

    #[serde(rename_all = "camelCase")]
    NextPart {
        part_number: u32,
        /// Defaults to the session's part description.
        #[serde(default)]
        description: Option<String>,
    },

    Thresholds(Thresholds),
}

/// A producer of feed entries.
pub trait ReadingSource: Send {
    /// The next entry in arrival order, `None` once the feed is exhausted.
    fn next_entry(&mut self) -> Option<Result<FeedEntry, FeedError>>;

    /// Receives every entry the engine refused, right after it was refused.
    fn rejected(&mut self, entry: &FeedEntry, error: &EngineError);
}

/// Runs a source on a dedicated thread until it is exhausted or the session
/// closes. Joining the thread hands the source back.
pub fn spawn_reader<S>(mut source: S, engine: EngineHandle) -> io::Result<JoinHandle<S>>
where
    S: ReadingSource + 'static,
{
    thread::Builder::new()
        .name("magpi-reader".into())
        .spawn(move || {
            while let Some(next) = source.next_entry() {
                let entry = match next {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("skipping feed entry: {e}");
                        continue;
                    }
                };
                if let Err(e) = apply(&engine, &entry) {
                    source.rejected(&entry, &e);
                    if e == EngineError::SessionClosed {
                        info!("session closed; reader stopping");
                        break;
                    }
                }
            }
            source
        })
}

/// Pushes one entry into the engine.
pub fn apply(engine: &EngineHandle, entry: &FeedEntry) -> Result<(), EngineError> {
    match entry {
        FeedEntry::Reading(measurement) => engine.ingest(*measurement).map(|_| ()),
        FeedEntry::NextPart {
            part_number,
            description,
        } => {
            let description = match description {
                Some(d) => d.clone(),
                None => engine.with_session(|s| s.info().part_description.clone()),
            };
            engine.start_new_part(*part_number, description)
        }
        FeedEntry::Thresholds(thresholds) => engine.set_thresholds(*thresholds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;

    use crate::engine::IngestionEngine;
    use crate::model::{Channel, PartStatus, Session, SessionInfo, Verdict};

    /// Feeds a fixed list of entries and records what was refused.
    struct Scripted {
        entries: VecDeque<FeedEntry>,
        rejected: Vec<(FeedEntry, EngineError)>,
    }

    impl Scripted {
        fn new(entries: Vec<FeedEntry>) -> Self {
            Self {
                entries: entries.into(),
                rejected: Vec::new(),
            }
        }
    }

    impl ReadingSource for Scripted {
        fn next_entry(&mut self) -> Option<Result<FeedEntry, FeedError>> {
            self.entries.pop_front().map(Ok)
        }

        fn rejected(&mut self, entry: &FeedEntry, error: &EngineError) {
            self.rejected.push((entry.clone(), error.clone()));
        }
    }

    fn handle() -> EngineHandle {
        let info = SessionInfo {
            part_description: "Axle".into(),
            ..SessionInfo::default()
        };
        EngineHandle::new(
            IngestionEngine::new(Session::new(info, Thresholds::new(5.0, 3.0))).unwrap(),
        )
    }

    fn reading(channel: Channel, current: f64) -> FeedEntry {
        FeedEntry::Reading(Measurement::new(channel, current, 0.2))
    }

    #[test]
    fn feed_entry_json_shapes() {
        let entry: FeedEntry =
            serde_json::from_str(r#"{"kind":"reading","channel":"coilshot","current":3.2,"duration":0.4}"#)
                .unwrap();
        assert_eq!(
            entry,
            FeedEntry::Reading(Measurement::new(Channel::Coilshot, 3.2, 0.4))
        );

        let entry: FeedEntry = serde_json::from_str(r#"{"kind":"nextPart","partNumber":7}"#).unwrap();
        assert_eq!(
            entry,
            FeedEntry::NextPart {
                part_number: 7,
                description: None
            }
        );

        let entry: FeedEntry =
            serde_json::from_str(r#"{"kind":"thresholds","headshot":6.0,"coilshot":2.5}"#).unwrap();
        assert_eq!(entry, FeedEntry::Thresholds(Thresholds::new(6.0, 2.5)));
    }

    #[test]
    fn reader_applies_entries_in_order() {
        let engine = handle();
        let source = Scripted::new(vec![
            reading(Channel::Headshot, 4.0),
            FeedEntry::NextPart {
                part_number: 7,
                description: None,
            },
            reading(Channel::Headshot, 6.0),
            FeedEntry::Thresholds(Thresholds::new(7.0, 3.0)),
            reading(Channel::Headshot, 6.0),
        ]);

        let source = spawn_reader(source, engine.clone())
            .unwrap()
            .join()
            .unwrap();

        assert!(source.rejected.is_empty());
        engine.with_session(|s| {
            assert_eq!(s.part(1).unwrap().status(), PartStatus::Fail);
            let part = s.part(7).unwrap();
            assert_eq!(part.description(), "Axle");
            let verdicts: Vec<Verdict> = part
                .filled_slots(Channel::Headshot)
                .map(|slot| slot.verdict)
                .collect();
            assert_eq!(verdicts, vec![Verdict::Pass, Verdict::Fail]);
        });
    }

    #[test]
    fn rejections_are_reported_to_the_source() {
        let engine = handle();
        let mut entries = vec![FeedEntry::NextPart {
            part_number: 1,
            description: Some("Hub".into()),
        }];
        entries.extend((0..6).map(|_| reading(Channel::Coilshot, 3.0)));
        entries.push(FeedEntry::NextPart {
            part_number: 1,
            description: None,
        });

        let source = spawn_reader(Scripted::new(entries), engine.clone())
            .unwrap()
            .join()
            .unwrap();

        let errors: Vec<&EngineError> = source.rejected.iter().map(|(_, e)| e).collect();
        assert_eq!(
            errors,
            vec![
                &EngineError::ChannelFull {
                    part: 1,
                    channel: Channel::Coilshot
                },
                &EngineError::DuplicatePart(1),
            ]
        );
        engine.with_session(|s| assert_eq!(s.part(1).unwrap().description(), "Hub"));
    }

    #[test]
    fn reader_stops_once_session_is_closed() {
        let engine = handle();
        engine.end_session().unwrap();
        let source = Scripted::new(vec![
            reading(Channel::Headshot, 6.0),
            reading(Channel::Headshot, 6.0),
        ]);

        let source = spawn_reader(source, engine.clone())
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(source.rejected.len(), 1);
        assert_eq!(source.rejected[0].1, EngineError::SessionClosed);
        assert_eq!(source.entries.len(), 1);
    }
}
