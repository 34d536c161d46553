//! Event journal: bounded in-memory history with optional JSONL persistence
//!
//! The journal is the narrow sink the monitor and the orchestrator report
//! through. History is held in a [`BoundedRing`], so memory stays flat no
//! matter how long the daemon runs. When a path is configured, every event is
//! also appended to a JSON Lines file for an external collector to pick up.
//!
//! ## Example
//!
//! ```
//! use lifeline_observability::{EventPayload, EventSink, Journal};
//!
//! let journal = Journal::in_memory(100);
//! journal.record_event(EventPayload::MonitorStopped);
//!
//! assert_eq!(journal.len(), 1);
//! assert_eq!(journal.recent(1)[0].payload.kind(), "monitor_stopped");
//! ```

use crate::event::{EventPayload, LifelineEvent};
use lifeline_core_resilience::ring::{BoundedRing, RingStats};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur during journaling
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed journal line {line}: {source}")]
    MalformedLine {
        line: usize,
        source: serde_json::Error,
    },
}

/// Result type for journal operations
pub type Result<T> = std::result::Result<T, JournalError>;

/// Narrow interface for recording events
///
/// Implementations must not block for long: callers invoke this from inside
/// the monitor's tick and the orchestrator's cycle.
pub trait EventSink: Send + Sync {
    fn record_event(&self, payload: EventPayload);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record_event(&self, _payload: EventPayload) {}
}

/// Bounded event journal
#[derive(Debug)]
pub struct Journal {
    inner: Mutex<JournalInner>,
}

#[derive(Debug)]
struct JournalInner {
    ring: BoundedRing<LifelineEvent>,
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    next_sequence: u64,
    write_failures: u64,
}

impl Journal {
    /// Journal that keeps at most `capacity` events in memory
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(JournalInner {
                ring: BoundedRing::new(capacity),
                writer: None,
                path: None,
                next_sequence: 0,
                write_failures: 0,
            }),
        }
    }

    /// Journal that also appends every event to `path` in JSON Lines format
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created/opened.
    pub fn with_file(capacity: usize, path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Mutex::new(JournalInner {
                ring: BoundedRing::new(capacity),
                writer: Some(BufWriter::new(file)),
                path: Some(path.to_path_buf()),
                next_sequence: 0,
                write_failures: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, JournalInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an event and return it with its assigned sequence number.
    ///
    /// The event is kept in memory even when the file write fails.
    pub fn append(&self, payload: EventPayload) -> Result<LifelineEvent> {
        let mut inner = self.lock();

        let event = LifelineEvent::new(inner.next_sequence, payload);
        inner.next_sequence += 1;
        inner.ring.push(event.clone());

        let written = match inner.writer.as_mut() {
            Some(writer) => write_line(writer, &event),
            None => Ok(()),
        };

        if written.is_err() {
            inner.write_failures += 1;
        }
        written.map(|_| event)
    }

    /// Newest `n` events, oldest first
    pub fn recent(&self, n: usize) -> Vec<LifelineEvent> {
        self.lock().ring.recent(n)
    }

    /// Drop in-memory history. The file, if any, is left untouched.
    pub fn clear(&self) {
        self.lock().ring.clear();
    }

    /// Flush the underlying writer
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.lock();
        if let Some(ref mut writer) = inner.writer {
            writer.flush()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().ring.is_empty()
    }

    /// Get the journal file path (if any)
    pub fn path(&self) -> Option<PathBuf> {
        self.lock().path.clone()
    }

    pub fn stats(&self) -> JournalStats {
        let inner = self.lock();
        JournalStats {
            ring: inner.ring.stats(),
            next_sequence: inner.next_sequence,
            write_failures: inner.write_failures,
            persistent: inner.writer.is_some(),
        }
    }
}

impl EventSink for Journal {
    fn record_event(&self, payload: EventPayload) {
        if let Err(e) = self.append(payload) {
            warn!("📝 Journal write failed (event kept in memory): {}", e);
        }
    }
}

fn write_line(writer: &mut BufWriter<File>, event: &LifelineEvent) -> Result<()> {
    let json = serde_json::to_string(event)?;
    writeln!(writer, "{}", json)?;
    writer.flush()?;
    Ok(())
}

/// Journal occupancy and persistence counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalStats {
    pub ring: RingStats,
    pub next_sequence: u64,
    pub write_failures: u64,
    pub persistent: bool,
}

/// Read every event back from a JSONL journal file
///
/// Blank lines are ignored. A line that fails to parse is reported with its
/// 1-based line number.
pub fn read_journal_file(path: &Path) -> Result<Vec<LifelineEvent>> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|source| JournalError::MalformedLine {
            line: idx + 1,
            source,
        })?;
        events.push(event);
    }

    Ok(events)
}
