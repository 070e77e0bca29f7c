use std::io::{self, ErrorKind, Read};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::time::Duration;
use anyhow::Result;
use log::{debug, info, warn};
use crate::decoder::{Decoder, PumpOutcome, ReadPolicy};
use crate::session::{EndReason, Phase, Session};
use crate::sink::DisplaySink;
use crate::stats::Stats;
use crate::surface::Surface;
use crate::rgb565;

/// A connected peer the receiver can read records from.
pub trait Connection: Read {
    /// Whether the peer is still there, without consuming any bytes.
    fn is_connected(&self) -> bool;

    fn close(&mut self);
}

impl Connection for TcpStream {
    /// Expects the stream to be in non-blocking mode.
    fn is_connected(&self) -> bool {
        let mut byte = [0u8; 1];
        match self.peek(&mut byte) {
            Ok(0) => false,
            Ok(_) => true,
            Err(e) => matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted),
        }
    }

    fn close(&mut self) {
        let _ = self.shutdown(Shutdown::Both);
    }
}

/// Source of new peers. `try_accept` must not block.
pub trait Acceptor {
    type Stream: Connection;

    fn try_accept(&mut self) -> io::Result<Option<(Self::Stream, String)>>;
}

impl Acceptor for TcpListener {
    type Stream = TcpStream;

    /// Expects the listener to be in non-blocking mode.
    fn try_accept(&mut self) -> io::Result<Option<(TcpStream, String)>> {
        match self.accept() {
            Ok((stream, addr)) => {
                stream.set_nonblocking(true)?;
                stream.set_nodelay(true)?;
                Ok(Some((stream, addr.to_string())))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReceiverOptions {
    /// Color the surface is cleared to when a peer is accepted.
    pub background: u16,
    pub read: ReadPolicy,
    pub max_records_per_tick: usize,
    /// Time one tick may spend decoding before it yields.
    pub tick_budget: Duration,
    /// `None` keeps a silent peer attached forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for ReceiverOptions {
    fn default() -> Self {
        Self {
            background: rgb565::BLACK,
            read: ReadPolicy::default(),
            max_records_per_tick: 4096,
            tick_budget: Duration::from_millis(10),
            idle_timeout: None,
        }
    }
}

/// Owns the listener, the one active session and the display sink.
pub struct ConnectionManager<A: Acceptor, S: Surface> {
    acceptor: A,
    sink: DisplaySink<S>,
    decoder: Decoder,
    options: ReceiverOptions,
    session: Option<Session<A::Stream>>,
    last_end: Option<EndReason>,
    sessions: u64,
}

impl<A: Acceptor, S: Surface> ConnectionManager<A, S> {
    pub fn new(acceptor: A, sink: DisplaySink<S>, options: ReceiverOptions) -> Self {
        Self {
            acceptor,
            sink,
            decoder: Decoder::new(options.read, options.max_records_per_tick, options.tick_budget),
            options,
            session: None,
            last_end: None,
            sessions: 0,
        }
    }

    /// One scheduling step: accept, decode what is pending, push to the device.
    pub fn tick(&mut self) -> Result<()> {
        self.try_accept_or_continue();
        self.pump();
        self.sink.flush()
    }

    /// Poll the listener once. A new peer always wins over the current one.
    pub fn try_accept_or_continue(&mut self) {
        match self.acceptor.try_accept() {
            Ok(Some((stream, peer))) => self.begin_session(stream, peer),
            Ok(None) => {}
            Err(e) => debug!("accept failed: {}", e),
        }
    }

    /// Decode pending records from the active peer, ending the session if
    /// the stream closed, tore a record or went quiet for too long.
    pub fn pump(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let outcome = self.decoder.pump(
            &mut session.stream,
            &mut session.reader,
            &mut self.sink,
            &mut session.stats,
        );
        if outcome.decoded() > 0 {
            session.touch();
        }

        let end = match outcome {
            PumpOutcome::Drained(_) | PumpOutcome::Yielded(_) => None,
            PumpOutcome::Closed(_) => Some(EndReason::Disconnected),
            PumpOutcome::Desynced { received, .. } => {
                warn!("{}: stream desynced with {} of 4 record bytes pending", session.peer, received);
                Some(EndReason::Desynced)
            }
            PumpOutcome::Failed { error, .. } => {
                warn!("{}: read failed: {}", session.peer, error);
                Some(EndReason::Failed)
            }
        };
        let end = end.or_else(|| match self.options.idle_timeout {
            Some(limit) if session.idle_for() >= limit => {
                warn!("{}: nothing received for {:?}", session.peer, session.idle_for());
                Some(EndReason::IdleTimeout)
            }
            _ => None,
        });
        if let Some(reason) = end {
            self.end_session(reason);
        }
    }

    /// True while a peer is attached and its socket still reports itself
    /// connected. A peer seen closing here is only torn down by the next
    /// `pump`, which first drains whatever it sent before closing.
    pub fn is_active(&self) -> bool {
        self.session.as_ref().map_or(false, |s| s.stream.is_connected())
    }

    pub fn phase(&self) -> Phase {
        match &self.session {
            Some(s) if s.stream.is_connected() => s.phase(),
            _ => Phase::Idle,
        }
    }

    pub fn peer(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.peer.as_str())
    }

    /// Counters of the active session, zero when idle.
    pub fn stats(&self) -> Stats {
        self.session.as_ref().map(|s| s.stats).unwrap_or_default()
    }

    pub fn last_end(&self) -> Option<EndReason> {
        self.last_end
    }

    /// Number of peers accepted since start.
    pub fn sessions(&self) -> u64 {
        self.sessions
    }

    pub fn sink(&self) -> &DisplaySink<S> {
        &self.sink
    }

    pub fn log_stats(&self) {
        match &self.session {
            Some(s) => info!("{}: {:?} {} up {:?}", s.peer, s.phase(), s.stats, s.uptime()),
            None => info!("Idle, waiting for client ({} served)", self.sessions),
        }
    }

    fn begin_session(&mut self, stream: A::Stream, peer: String) {
        if self.session.is_some() {
            self.end_session(EndReason::Replaced);
        }
        info!("Connected to client {}", peer);
        self.sink.clear(self.options.background);
        self.session = Some(Session::new(stream, peer));
        self.sessions += 1;
    }

    fn end_session(&mut self, reason: EndReason) {
        if let Some(mut session) = self.session.take() {
            session.stream.close();
            info!("Client {} {} ({})", session.peer, reason, session.stats);
            self.last_end = Some(reason);
        }
    }
}
