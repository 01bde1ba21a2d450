//! CAN Monitor CLI Application
//!
//! Command-line front end for the can-monitor library:
//! - Reads remote protocol events from a file, a TCP connection or stdin
//! - Feeds them into a rate-limited monitor session
//! - Prints the row table each time the session publishes

use anyhow::Result;
use can_monitor::{Monitor, SortOrder, SourceEvent, TableMode, TimeFormat};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

mod config;
mod render;
mod source;

use config::AppConfig;
use render::Renderer;
use source::Source;

/// Upper bound on how long the loop blocks when no flush is pending
const IDLE_WAIT: Duration = Duration::from_millis(500);

/// CAN Monitor - Live table of CAN traffic from a remote bus
#[derive(Parser, Debug)]
#[command(name = "can-monitor")]
#[command(about = "Show live CAN traffic as a table (one row per frame type)", long_about = None)]
#[command(version)]
struct Args {
    /// JSON-lines file of remote protocol events
    #[arg(short, long, value_name = "FILE", conflicts_with = "tcp")]
    input: Option<PathBuf>,

    /// Read JSON-lines events from a TCP server
    #[arg(long, value_name = "HOST:PORT")]
    tcp: Option<String>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Minimum time between table updates in milliseconds
    #[arg(long, value_name = "MS")]
    window_ms: Option<u64>,

    /// Show every frame as its own row instead of one row per frame type
    #[arg(long)]
    log_mode: bool,

    /// Show absolute timestamps instead of delta times
    #[arg(long)]
    absolute_time: bool,

    /// Display order of the rows
    #[arg(long, value_enum)]
    sort: Option<SortArg>,

    /// Clear the table when the source disconnects
    #[arg(long)]
    clear_on_disconnect: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    None,
    Time,
    Id,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::None => SortOrder::None,
            SortArg::Time => SortOrder::Time,
            SortArg::Id => SortOrder::Id,
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Monitor CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using monitor library v{}", can_monitor::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    apply_overrides(&mut config, &args);
    log::debug!("Effective configuration: {:?}", config);

    let source = if let Some(path) = &args.input {
        Source::File(path.clone())
    } else if let Some(addr) = &args.tcp {
        Source::Tcp(addr.clone())
    } else {
        Source::Stdin
    };

    run(source, config)
}

/// Command-line flags win over config file values
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(window_ms) = args.window_ms {
        config.monitor.window_ms = window_ms;
    }
    if args.log_mode {
        config.monitor.mode = TableMode::Log;
    }
    if args.clear_on_disconnect {
        config.monitor.clear_on_disconnect = true;
    }
    if args.absolute_time {
        config.display.time_format = TimeFormat::Absolute;
    }
    if let Some(sort) = args.sort {
        config.display.sort = sort.into();
    }
}

/// Event loop: the only owner of the monitor session
fn run(source: Source, config: AppConfig) -> Result<()> {
    let mut monitor = Monitor::new(config.monitor)?;
    let renderer = Renderer::new(config.display.time_format, config.display.sort);
    monitor.subscribe(move |table| renderer.print(table));

    let (tx, rx) = mpsc::channel();
    let reader = source::spawn(source, tx)?;

    loop {
        let timeout = monitor
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_WAIT);

        match rx.recv_timeout(timeout) {
            Ok(event) => {
                let lifecycle = !matches!(event, SourceEvent::Frame(_));
                let closed = matches!(event, SourceEvent::Disconnected);
                monitor.handle_event(event, Instant::now());
                if lifecycle {
                    println!(
                        "{}",
                        render::status_line(
                            monitor.status(),
                            monitor.table().len(),
                            monitor.pending()
                        )
                    );
                }
                if closed {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        monitor.poll(Instant::now());
    }

    // Covers a source that ended without sending `Disconnected`
    monitor.flush();

    if reader.join().is_err() {
        log::error!("Source thread panicked");
    }

    let stats = monitor.stats();
    log::info!(
        "Session ended: {} rows, {} frames received, {} reconciled, {} rejected, {} flushes",
        monitor.table().len(),
        stats.frames_received,
        stats.frames_reconciled,
        stats.frames_rejected,
        stats.flushes
    );
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
