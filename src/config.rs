use std::path::PathBuf;
use std::time::Duration;
use clap::{Parser, ValueEnum};
use crate::decoder::ReadPolicy;
use crate::server::ReceiverOptions;
use crate::{util, Geometry, DEFAULT_PORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Desktop window
    Window,
    /// Linux framebuffer device
    Fbdev,
    /// In-memory only, for testing senders
    Headless,
}

/// Receive a stream of 4-byte pixel records over TCP and draw them
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "PIXWIRE_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// TCP port to listen on
    #[arg(short, long, env = "PIXWIRE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Display width in pixels
    #[arg(long, env = "PIXWIRE_WIDTH", default_value_t = crate::DEFAULT_WIDTH,
        value_parser = clap::value_parser!(u16).range(1..))]
    pub width: u16,

    /// Display height in pixels
    #[arg(long, env = "PIXWIRE_HEIGHT", default_value_t = crate::DEFAULT_HEIGHT,
        value_parser = clap::value_parser!(u16).range(1..))]
    pub height: u16,

    /// Color shown when a client connects (RGB565 like 0x07E0 or decimal, or #rrggbb)
    #[arg(long, env = "PIXWIRE_BACKGROUND", default_value = "0x0000", value_parser = util::parse_color)]
    pub background: u16,

    /// Where pixels are drawn
    #[arg(short, long, env = "PIXWIRE_BACKEND", value_enum, default_value_t = Backend::Window)]
    pub backend: Backend,

    /// Framebuffer device for the fbdev backend
    #[arg(long, env = "PIXWIRE_FBDEV", default_value = "/dev/fb0")]
    pub fbdev: PathBuf,

    /// Window scale factor (1, 2, 4 or 8)
    #[arg(long, env = "PIXWIRE_SCALE", default_value_t = 2)]
    pub scale: u8,

    /// Pause between scheduling ticks, in milliseconds
    #[arg(long, env = "PIXWIRE_TICK_MS", default_value_t = 1)]
    pub tick_ms: u64,

    /// Waits allowed for the rest of a started record
    #[arg(long, env = "PIXWIRE_READ_RETRIES", default_value_t = 10)]
    pub read_retries: u32,

    /// Length of each of those waits, in milliseconds
    #[arg(long, env = "PIXWIRE_RETRY_DELAY_MS", default_value_t = 1)]
    pub retry_delay_ms: u64,

    /// Records decoded per tick before yielding
    #[arg(long, env = "PIXWIRE_MAX_RECORDS_PER_TICK", default_value_t = 4096,
        value_parser = clap::value_parser!(u64).range(1..))]
    pub max_records_per_tick: u64,

    /// Time spent decoding per tick before yielding, in milliseconds
    #[arg(long, env = "PIXWIRE_TICK_BUDGET_MS", default_value_t = 10)]
    pub tick_budget_ms: u64,

    /// Drop a client that sends nothing for this many seconds (default: never)
    #[arg(long, env = "PIXWIRE_IDLE_TIMEOUT_SECS")]
    pub idle_timeout_secs: Option<u64>,

    /// Interval between statistics log lines, in seconds (0 disables)
    #[arg(long, env = "PIXWIRE_STATS_SECS", default_value_t = 5)]
    pub stats_secs: u64,

    /// Delay between attempts to open the listening socket, in milliseconds
    #[arg(long, env = "PIXWIRE_BIND_RETRY_MS", default_value_t = 500)]
    pub bind_retry_ms: u64,

    /// Save the final display contents as PNG on exit
    #[arg(long, env = "PIXWIRE_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.width, self.height)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn bind_retry(&self) -> Duration {
        Duration::from_millis(self.bind_retry_ms)
    }

    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_secs > 0).then(|| Duration::from_secs(self.stats_secs))
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    pub fn receiver_options(&self) -> ReceiverOptions {
        ReceiverOptions {
            background: self.background,
            read: ReadPolicy {
                max_retries: self.read_retries,
                retry_delay: Duration::from_millis(self.retry_delay_ms),
            },
            max_records_per_tick: self.max_records_per_tick as usize,
            tick_budget: Duration::from_millis(self.tick_budget_ms),
            idle_timeout: self.idle_timeout_secs.map(Duration::from_secs),
        }
    }
}
