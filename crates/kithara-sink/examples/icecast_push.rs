//! Example: push an MP3 file to an Icecast mount point.
//!
//! Payloads are written only when the worker asks for them
//! (`SinkEvent::Demand`), so the sink never overruns.
//!
//! Run with:
//! ```
//! cargo run -p kithara-sink --example icecast_push -- FILE [HOST] [PORT] [PASSWORD] [MOUNT]
//! ```

use std::{env::args, error::Error, fs, time::Duration};

use bytes::Bytes;
use kithara_sink::{ConnectParams, IcecastOptions, Sink, SinkConfig, SinkEvent};
use tracing::{info, metadata::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

/// Roughly 256 ms of 128 kbit/s audio.
const CHUNK_SIZE: usize = 4096;

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::default()
                .add_directive("kithara_sink=debug".parse()?)
                .add_directive("kithara_icecast=debug".parse()?)
                .add_directive(LevelFilter::INFO.into()),
        )
        .with_line_number(false)
        .with_file(false)
        .init();

    let mut args = args().skip(1);
    let path = args.next().ok_or("usage: icecast_push FILE [HOST] [PORT] [PASSWORD] [MOUNT]")?;
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port = args.next().map_or(Ok(8000), |p| p.parse())?;
    let password = args.next().unwrap_or_else(|| "hackme".to_string());
    let mount = args.next().unwrap_or_else(|| "/kithara.mp3".to_string());

    let data = Bytes::from(fs::read(&path)?);
    if data.is_empty() {
        warn!(%path, "nothing to stream");
        return Ok(());
    }
    info!(%path, bytes = data.len(), %host, port, %mount, "streaming file");

    let params = ConnectParams::new(host, port, password, mount);
    let (events_tx, events_rx) = kanal::unbounded();
    let sink = Sink::icecast(
        SinkConfig::new(params).with_capacity(16),
        IcecastOptions::default().with_bitrate_kbps(128),
        events_tx,
    )?;
    sink.start()?;

    let mut chunks = (0..data.len())
        .step_by(CHUNK_SIZE)
        .map(|start| data.slice(start..(start + CHUNK_SIZE).min(data.len())));
    let mut finished = false;

    while let Ok(event) = events_rx.recv() {
        match event {
            SinkEvent::Demand(n) if !finished => {
                for _ in 0..n {
                    match chunks.next() {
                        Some(chunk) => sink.write(chunk)?,
                        None => {
                            finished = true;
                            break;
                        }
                    }
                }
            }
            SinkEvent::Demand(_) => {
                if sink.available() == 0 {
                    break;
                }
            }
            SinkEvent::Underrun(duration) => warn!(?duration, "underrun"),
            SinkEvent::ConnectionError(message) | SinkEvent::SendError(message) => {
                sink.wait_until_idle(Duration::from_secs(1));
                return Err(message.into());
            }
        }
    }

    sink.stop()?;
    info!("done");
    Ok(())
}
