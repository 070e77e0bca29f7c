use std::thread;
use std::time::Instant;
use anyhow::Result;
use clap::Parser;
use flume::Receiver;
use log::info;
use pixwire::canvas::Canvas;
use pixwire::config::{Backend, Config};
use pixwire::server::ConnectionManager;
use pixwire::sink::DisplaySink;
use pixwire::surface::{Framebuffer, Surface};
use pixwire::util;

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = Config::parse();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(config.log_level()));

    info!("Backend: {:?}", config.backend);
    info!("Geometry: {}x{}", config.width, config.height);
    info!("Record wait limit: {:?}", config.receiver_options().read.max_wait());
    info!("Tick budget: {:?}", config.receiver_options().tick_budget);
    info!("Idle timeout: {:?}", config.receiver_options().idle_timeout);

    // handle control+c
    let (shutdown_tx, shutdown_rx) = flume::bounded(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })?;

    match config.backend {
        Backend::Window => run(&config, Canvas::new(config.geometry(), config.scale)?, &shutdown_rx),
        Backend::Headless => run(&config, Framebuffer::new(config.geometry()), &shutdown_rx),
        Backend::Fbdev => run_fbdev(&config, &shutdown_rx),
    }
}

#[cfg(target_os = "linux")]
fn run_fbdev(config: &Config, shutdown: &Receiver<()>) -> Result<()> {
    let surface = pixwire::fbdev::FbDev::open(&config.fbdev, config.geometry())?;
    run(config, surface, shutdown)
}

#[cfg(not(target_os = "linux"))]
fn run_fbdev(_config: &Config, _shutdown: &Receiver<()>) -> Result<()> {
    anyhow::bail!("the fbdev backend is only available on Linux")
}

fn run<S: Surface>(config: &Config, surface: S, shutdown: &Receiver<()>) -> Result<()> {
    let addr = config.listen_addr();
    let Some(listener) = util::bind_listener(&addr, config.bind_retry(), shutdown)? else {
        info!("Stopped before the listener came up");
        return Ok(());
    };
    info!("Listening on: {}", listener.local_addr()?);

    let mut manager = ConnectionManager::new(listener, DisplaySink::new(surface), config.receiver_options());
    let mut last_report = Instant::now();

    loop {
        if shutdown.try_recv().is_ok() {
            info!("Interrupted, shutting down");
            break;
        }
        manager.tick()?;
        if !manager.sink().surface().is_open() {
            info!("Window closed, shutting down");
            break;
        }
        if let Some(interval) = config.stats_interval() {
            if last_report.elapsed() >= interval {
                manager.log_stats();
                last_report = Instant::now();
            }
        }
        thread::sleep(config.tick());
    }

    if let Some(path) = &config.snapshot {
        manager.sink().surface().snapshot().save_png(path)?;
        info!("Snapshot written to {}", path.display());
    }
    Ok(())
}
