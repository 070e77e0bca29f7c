//! Scripted streams, acceptors and surfaces for unit tests.

use std::cell::Cell;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::rc::Rc;
use crate::server::{Acceptor, Connection};
use crate::surface::{Framebuffer, Surface};
use crate::Geometry;

pub enum Step {
    Data(Vec<u8>),
    WouldBlock,
    Error(io::ErrorKind),
}

/// A non-blocking stream that replays `steps` and then either reports EOF
/// or keeps returning `WouldBlock`.
pub struct ScriptedStream {
    steps: VecDeque<Step>,
    eof_at_end: bool,
    pub closed: Rc<Cell<bool>>,
}

impl ScriptedStream {
    pub fn open(steps: Vec<Step>) -> Self {
        Self { steps: steps.into(), eof_at_end: false, closed: Rc::new(Cell::new(false)) }
    }

    pub fn closing(steps: Vec<Step>) -> Self {
        Self { eof_at_end: true, ..Self::open(steps) }
    }

    /// One `Data` step per chunk, with a `WouldBlock` between chunks.
    pub fn chunked(chunks: &[&[u8]], eof_at_end: bool) -> Self {
        let mut steps = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                steps.push(Step::WouldBlock);
            }
            steps.push(Step::Data(chunk.to_vec()));
        }
        Self { eof_at_end, ..Self::open(steps) }
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.steps.pop_front() {
            Some(Step::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.steps.push_front(Step::Data(data.split_off(n)));
                }
                Ok(n)
            }
            Some(Step::WouldBlock) => Err(io::ErrorKind::WouldBlock.into()),
            Some(Step::Error(kind)) => Err(kind.into()),
            None if self.eof_at_end => Ok(0),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }
}

impl Connection for ScriptedStream {
    fn is_connected(&self) -> bool {
        if self.closed.get() {
            return false;
        }
        match self.steps.front() {
            Some(Step::Error(kind)) => matches!(kind, io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted),
            Some(_) => true,
            None => !self.eof_at_end,
        }
    }

    fn close(&mut self) {
        self.closed.set(true);
    }
}

/// Hands out queued streams, one per `try_accept` call that finds one.
#[derive(Default)]
pub struct ScriptedAcceptor {
    pub pending: VecDeque<ScriptedStream>,
    pub accepted: usize,
}

impl ScriptedAcceptor {
    pub fn push(&mut self, stream: ScriptedStream) -> Rc<Cell<bool>> {
        let closed = stream.closed.clone();
        self.pending.push_back(stream);
        closed
    }
}

impl Acceptor for ScriptedAcceptor {
    type Stream = ScriptedStream;

    fn try_accept(&mut self) -> io::Result<Option<(ScriptedStream, String)>> {
        Ok(self.pending.pop_front().map(|s| {
            self.accepted += 1;
            (s, format!("peer-{}", self.accepted))
        }))
    }
}

/// Records every `set_pixel`/`clear` call on top of a real framebuffer.
pub struct RecordingSurface {
    pub fb: Framebuffer,
    pub writes: Vec<(u16, u16, u16)>,
    pub clears: Vec<u16>,
    pub flushes: usize,
}

impl RecordingSurface {
    pub fn new(geometry: Geometry) -> Self {
        Self { fb: Framebuffer::new(geometry), writes: Vec::new(), clears: Vec::new(), flushes: 0 }
    }
}

impl Surface for RecordingSurface {
    fn geometry(&self) -> Geometry {
        self.fb.geometry()
    }

    fn set_pixel(&mut self, x: u16, y: u16, color: u16) {
        self.writes.push((x, y, color));
        self.fb.set_pixel(x, y, color);
    }

    fn clear(&mut self, color: u16) {
        self.clears.push(color);
        self.fb.clear(color);
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn snapshot(&self) -> &Framebuffer {
        &self.fb
    }
}
