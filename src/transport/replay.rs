//! Replay feed: a recorded run read back from JSONL.
//!
//! One entry per line. Blank lines are skipped. A line that does not parse
//! is reported with its line number and skipped; an I/O error ends the feed.

use std::{
    fs,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::engine::EngineError;

use super::{FeedEntry, ReadingSource};

/// Errors produced while reading a feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
}

/// An entry the engine refused, with the line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub line: usize,
    pub error: EngineError,
}

/// Reads feed entries from any buffered reader.
pub struct ReplayFeed<R> {
    lines: io::Lines<R>,
    line: usize,
    done: bool,
    applied: usize,
    malformed: usize,
    rejections: Vec<Rejection>,
}

impl ReplayFeed<BufReader<fs::File>> {
    /// Opens a JSONL feed file.
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(fs::File::open(path)?)))
    }
}

impl<R: BufRead> ReplayFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            done: false,
            applied: 0,
            malformed: 0,
            rejections: Vec::new(),
        }
    }

    /// Entries handed out that the engine did not refuse.
    pub fn applied(&self) -> usize {
        self.applied - self.rejections.len()
    }

    /// Lines skipped because they did not parse.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Entries the engine refused, in feed order.
    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }
}

impl<R: BufRead + Send> ReadingSource for ReplayFeed<R> {
    fn next_entry(&mut self) -> Option<Result<FeedEntry, FeedError>> {
        if self.done {
            return None;
        }
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }
            return Some(match serde_json::from_str(&text) {
                Ok(entry) => {
                    self.applied += 1;
                    Ok(entry)
                }
                Err(source) => {
                    self.malformed += 1;
                    Err(FeedError::Json {
                        line: self.line,
                        source,
                    })
                }
            });
        }
    }

    fn rejected(&mut self, _entry: &FeedEntry, error: &EngineError) {
        self.rejections.push(Rejection {
            line: self.line,
            error: error.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use crate::model::{Channel, Measurement, Thresholds};

    fn feed(text: &str) -> ReplayFeed<Cursor<Vec<u8>>> {
        ReplayFeed::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn reads_entries_and_skips_blank_lines() {
        let mut feed = feed(concat!(
            "{\"kind\":\"thresholds\",\"headshot\":5.0,\"coilshot\":3.0}\n",
            "\n",
            "{\"kind\":\"reading\",\"channel\":\"headshot\",\"current\":5.2,\"duration\":0.25}\n",
        ));

        assert_eq!(
            feed.next_entry().unwrap().unwrap(),
            FeedEntry::Thresholds(Thresholds::new(5.0, 3.0))
        );
        assert_eq!(
            feed.next_entry().unwrap().unwrap(),
            FeedEntry::Reading(Measurement::new(Channel::Headshot, 5.2, 0.25))
        );
        assert!(feed.next_entry().is_none());
        assert_eq!(feed.applied(), 2);
    }

    #[test]
    fn malformed_line_reports_line_number_and_continues() {
        let mut feed = feed(concat!(
            "{\"kind\":\"nextPart\",\"partNumber\":2}\n",
            "{\"kind\":\"reading\",\"channel\":\"sideshot\"}\n",
            "{\"kind\":\"nextPart\",\"partNumber\":3}\n",
        ));

        assert!(feed.next_entry().unwrap().is_ok());
        let err = feed.next_entry().unwrap().unwrap_err();
        assert!(matches!(err, FeedError::Json { line: 2, .. }));
        assert!(feed.next_entry().unwrap().is_ok());
        assert!(feed.next_entry().is_none());
        assert_eq!(feed.malformed(), 1);
    }

    #[test]
    fn rejections_record_the_current_line() {
        let mut feed = feed(concat!(
            "{\"kind\":\"nextPart\",\"partNumber\":2}\n",
            "\n",
            "{\"kind\":\"nextPart\",\"partNumber\":2}\n",
        ));
        feed.next_entry();
        let entry = feed.next_entry().unwrap().unwrap();
        feed.rejected(&entry, &EngineError::DuplicatePart(2));

        assert_eq!(
            feed.rejections(),
            &[Rejection {
                line: 3,
                error: EngineError::DuplicatePart(2)
            }]
        );
        assert_eq!(feed.applied(), 1);
    }
}
