use std::fmt;
use std::time::{Duration, Instant};
use crate::decoder::RecordReader;
use crate::stats::Stats;

/// Where the receiver stands with respect to its peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No peer attached.
    Idle,
    /// Peer accepted, no record decoded yet.
    Connected,
    /// At least one record decoded from the current peer.
    Streaming,
}

/// Why a session stopped. Every reason leads back to `Phase::Idle`
/// until the next accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Peer closed at a record boundary.
    Disconnected,
    /// Peer left a record incomplete.
    Desynced,
    /// A newer peer was accepted.
    Replaced,
    /// Nothing received for longer than the configured idle timeout.
    IdleTimeout,
    /// The socket reported an error.
    Failed,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndReason::Disconnected => "disconnected",
            EndReason::Desynced => "stream desynced",
            EndReason::Replaced => "replaced by new client",
            EndReason::IdleTimeout => "idle timeout",
            EndReason::Failed => "socket error",
        };
        f.write_str(s)
    }
}

/// State scoped to one accepted peer. Dropped as a whole when the peer goes
/// away, so nothing carries over to the next one.
pub struct Session<C> {
    pub stream: C,
    pub peer: String,
    pub reader: RecordReader,
    pub stats: Stats,
    started: Instant,
    last_rx: Instant,
}

impl<C> Session<C> {
    pub fn new(stream: C, peer: String) -> Self {
        let now = Instant::now();
        Self {
            stream,
            peer,
            reader: RecordReader::new(),
            stats: Stats::default(),
            started: now,
            last_rx: now,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.stats.frames == 0 {
            Phase::Connected
        } else {
            Phase::Streaming
        }
    }

    pub fn touch(&mut self) {
        self.last_rx = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_rx.elapsed()
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}
