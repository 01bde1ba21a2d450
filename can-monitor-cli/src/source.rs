//! Event sources
//!
//! Each source reads newline-delimited remote protocol events on its own
//! thread and forwards them to the main loop as `SourceEvent`s. The main loop
//! is the only owner of the monitor.

use anyhow::{Context, Result};
use can_monitor::{protocol, SourceEvent};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// Where events come from
#[derive(Debug, Clone)]
pub enum Source {
    /// JSON-lines file
    File(PathBuf),
    /// JSON-lines over a TCP connection
    Tcp(String),
    /// JSON-lines on standard input
    Stdin,
}

/// Open the source and start its reader thread
pub fn spawn(source: Source, tx: Sender<SourceEvent>) -> Result<JoinHandle<()>> {
    match source {
        Source::File(path) => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open input file: {:?}", path))?;
            spawn_reader(BufReader::new(file), format!("file {}", path.display()), tx)
        }
        Source::Tcp(addr) => {
            let stream = TcpStream::connect(&addr)
                .with_context(|| format!("Failed to connect to {}", addr))?;
            log::info!("Connected to tcp://{}", addr);
            spawn_reader(BufReader::new(stream), format!("tcp://{}", addr), tx)
        }
        Source::Stdin => spawn_reader(BufReader::new(io::stdin()), "stdin".to_string(), tx),
    }
}

fn spawn_reader<R>(reader: R, endpoint: String, tx: Sender<SourceEvent>) -> Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("can-monitor-source".to_string())
        .spawn(move || read_events(reader, &endpoint, &tx))
        .context("Failed to spawn source thread")
}

/// Read events until EOF, a read error, or the receiver going away
///
/// Emits `Connected` with the endpoint first; a `bus_response` from the
/// server later replaces it with the server's channel info. Lines that fail
/// to decode are logged and skipped. Always ends with `Disconnected` unless
/// the receiver is gone.
pub fn read_events<R: BufRead>(reader: R, endpoint: &str, tx: &Sender<SourceEvent>) {
    let connected = SourceEvent::Connected {
        channel_info: endpoint.to_string(),
    };
    if tx.send(connected).is_err() {
        return;
    }

    for (line_no, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("Read error on {}: {}", endpoint, e);
                let _ = tx.send(SourceEvent::Error(e.to_string()));
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match protocol::decode_text(line) {
            Ok(event) => {
                if let Some(event) = event.into_source_event(endpoint) {
                    if tx.send(event).is_err() {
                        log::debug!("Receiver closed, stopping {}", endpoint);
                        return;
                    }
                }
            }
            Err(e) => log::warn!("{} line {}: {}", endpoint, line_no + 1, e),
        }
    }

    log::debug!("End of stream on {}", endpoint);
    let _ = tx.send(SourceEvent::Disconnected);
}
