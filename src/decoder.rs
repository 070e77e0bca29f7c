//! Record reassembly for the pixel stream.
//!
//! The stream is a bare sequence of 4-byte records with no header or
//! delimiter, so the only framing state is how many bytes of the current
//! record have arrived. A record that never completes ends the session:
//! there is no way to find the next record boundary again.

use std::io::{self, ErrorKind, Read};
use std::thread;
use std::time::{Duration, Instant};
use crate::sink::DisplaySink;
use crate::stats::Stats;
use crate::surface::Surface;
use crate::{PixelUpdate, RECORD_LEN};

/// How long a started record may take to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl ReadPolicy {
    pub fn max_wait(&self) -> Duration {
        self.retry_delay * self.max_retries
    }
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self { max_retries: 10, retry_delay: Duration::from_millis(1) }
    }
}

#[derive(Debug)]
pub enum ReadOutcome {
    Record(PixelUpdate),
    /// No bytes pending at a record boundary.
    Empty,
    /// EOF at a record boundary.
    Closed,
    /// EOF after `received` bytes of a record.
    Torn { received: usize },
    /// Bytes stopped arriving mid-record for longer than the policy allows.
    TimedOut { received: usize },
    Failed(io::Error),
}

/// The single in-flight record window.
#[derive(Debug, Default)]
pub struct RecordReader {
    buf: [u8; RECORD_LEN],
    filled: usize,
}

impl RecordReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the current record received so far, 0..=3.
    pub fn pending(&self) -> usize {
        self.filled
    }

    /// Read until one record is complete, the stream has nothing to offer at
    /// a boundary, or the stream fails. `stream` must be non-blocking.
    pub fn read_record<R: Read>(&mut self, stream: &mut R, policy: &ReadPolicy) -> ReadOutcome {
        let mut retries = 0;
        loop {
            match stream.read(&mut self.buf[self.filled..]) {
                Ok(0) => {
                    let received = self.filled;
                    self.filled = 0;
                    return if received == 0 { ReadOutcome::Closed } else { ReadOutcome::Torn { received } };
                }
                Ok(n) => {
                    self.filled += n;
                    if self.filled == RECORD_LEN {
                        self.filled = 0;
                        return ReadOutcome::Record(PixelUpdate::from_bytes(&self.buf));
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if self.filled == 0 {
                        return ReadOutcome::Empty;
                    }
                    if retries >= policy.max_retries {
                        let received = self.filled;
                        self.filled = 0;
                        return ReadOutcome::TimedOut { received };
                    }
                    retries += 1;
                    thread::sleep(policy.retry_delay);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    self.filled = 0;
                    return ReadOutcome::Failed(e);
                }
            }
        }
    }
}

#[derive(Debug)]
pub enum PumpOutcome {
    /// Stream is idle at a record boundary.
    Drained(usize),
    /// Record or time budget for this tick used up; more may be pending.
    Yielded(usize),
    /// Peer closed cleanly between records.
    Closed(usize),
    /// Peer left a record incomplete, by closing or by stalling.
    Desynced { decoded: usize, received: usize },
    Failed { decoded: usize, error: io::Error },
}

impl PumpOutcome {
    pub fn decoded(&self) -> usize {
        match self {
            PumpOutcome::Drained(n) | PumpOutcome::Yielded(n) | PumpOutcome::Closed(n) => *n,
            PumpOutcome::Desynced { decoded, .. } | PumpOutcome::Failed { decoded, .. } => *decoded,
        }
    }

    /// Whether the session survives this outcome.
    pub fn is_live(&self) -> bool {
        matches!(self, PumpOutcome::Drained(_) | PumpOutcome::Yielded(_))
    }
}

/// Moves records from a stream to a display sink, at most `budget` records
/// and roughly `time_budget` per call.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    pub policy: ReadPolicy,
    pub budget: usize,
    /// Checked between records, so one call may overrun it by at most one
    /// record's `policy.max_wait()`. At least one record is always attempted.
    pub time_budget: Duration,
}

impl Decoder {
    pub fn new(policy: ReadPolicy, budget: usize, time_budget: Duration) -> Self {
        Self { policy, budget: budget.max(1), time_budget }
    }

    pub fn pump<R: Read, S: Surface>(
        &self,
        stream: &mut R,
        reader: &mut RecordReader,
        sink: &mut DisplaySink<S>,
        stats: &mut Stats,
    ) -> PumpOutcome {
        let start = Instant::now();
        let mut decoded = 0;
        while decoded < self.budget {
            if decoded > 0 && start.elapsed() >= self.time_budget {
                break;
            }
            match reader.read_record(stream, &self.policy) {
                ReadOutcome::Record(update) => {
                    stats.frames += 1;
                    sink.apply(update, stats);
                    decoded += 1;
                }
                ReadOutcome::Empty => return PumpOutcome::Drained(decoded),
                ReadOutcome::Closed => return PumpOutcome::Closed(decoded),
                ReadOutcome::Torn { received } | ReadOutcome::TimedOut { received } => {
                    return PumpOutcome::Desynced { decoded, received };
                }
                ReadOutcome::Failed(error) => return PumpOutcome::Failed { decoded, error },
            }
        }
        PumpOutcome::Yielded(decoded)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(ReadPolicy::default(), 4096, Duration::from_millis(10))
    }
}
