use std::fmt;

/// Per-session counters. Nothing reads these except the logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Records decoded, in or out of bounds.
    pub frames: u64,
    pub applied: u64,
    pub dropped: u64,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frames={} applied={} dropped={}", self.frames, self.applied, self.dropped)
    }
}
