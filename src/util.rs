use std::net::TcpListener;
use std::thread;
use std::time::Duration;
use anyhow::Result;
use flume::{Receiver, RecvTimeoutError};
use log::{info, warn};
use crate::rgb565;

/// Open a non-blocking listener on `addr`, retrying every `delay` until the
/// network lets us bind. Returns `None` if `shutdown` fires first.
pub fn bind_listener(addr: &str, delay: Duration, shutdown: &Receiver<()>) -> Result<Option<TcpListener>> {
    let mut attempts = 0u32;
    loop {
        match TcpListener::bind(addr) {
            Ok(listener) => {
                listener.set_nonblocking(true)?;
                if attempts > 0 {
                    info!("Bound {} after {} retries", addr, attempts);
                }
                return Ok(Some(listener));
            }
            Err(e) => {
                if attempts == 0 {
                    warn!("Cannot listen on {} yet ({}), retrying...", addr, e);
                }
                attempts += 1;
            }
        }
        match shutdown.recv_timeout(delay) {
            Ok(()) => return Ok(None),
            Err(RecvTimeoutError::Disconnected) => thread::sleep(delay),
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

/// Parse a color given as RGB565 (`0x07E0`, `#07E0`, decimal) or as
/// 24-bit `#rrggbb`, which is reduced to RGB565.
pub fn parse_color(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let invalid = |e: std::num::ParseIntError| format!("invalid color {:?}: {}", s, e);
    if let Some(digits) = s.strip_prefix('#').filter(|d| d.len() == 6) {
        let [_, r, g, b] = u32::from_str_radix(digits, 16).map_err(invalid)?.to_be_bytes();
        return Ok(rgb565::from_rgb888(r, g, b));
    }
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix('#'));
    match hex {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => s.parse::<u16>(),
    }
    .map_err(invalid)
}
