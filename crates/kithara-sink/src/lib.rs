#![forbid(unsafe_code)]

//! # kithara-sink
//!
//! Real-time paced sink pushing encoded audio to a streaming server.
//!
//! A producer hands payloads to [`Sink::write`]; they land in a bounded
//! [`RingBuffer`]. A dedicated worker thread owns the [`Transport`], drains
//! the buffer in FIFO order and paces sends with [`Transport::sync`].
//!
//! ## Flow control
//!
//! The worker reports [`SinkEvent::Demand`] for every slot it frees, so a
//! producer that writes exactly as much as demanded never overruns. A write
//! into a full buffer fails with [`SinkError::Overrun`] without blocking.
//! A worker that finds the buffer empty reports the gap as
//! [`SinkEvent::Underrun`] once data (or a stop) arrives.
//!
//! ## Failures
//!
//! Transport failures end the run: the worker publishes
//! [`SinkEvent::ConnectionError`] or [`SinkEvent::SendError`], closes the
//! transport, drops buffered payloads and goes [`WorkerState::Idle`]. The
//! caller may `start` again.
//!
//! ```no_run
//! use kithara_sink::{ConnectParams, IcecastOptions, Sink, SinkConfig, SinkEvent};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params = ConnectParams::new("localhost", 8000, "hackme", "/live.mp3");
//! let (tx, rx) = kanal::unbounded();
//! let sink = Sink::icecast(SinkConfig::new(params), IcecastOptions::default(), tx)?;
//! sink.start()?;
//!
//! while let Ok(event) = rx.recv() {
//!     if let SinkEvent::Demand(n) = event {
//!         for _ in 0..n {
//!             sink.write(vec![0u8; 417])?;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod events;
mod ring;
mod sink;
mod state;
mod worker;

pub use kithara_icecast::{
    ConnectParam, ConnectParams, Format, IcecastOptions, IcecastTransport, Protocol, Transport,
    TransportError,
};

pub use crate::{
    config::{DEFAULT_CAPACITY, SinkConfig},
    error::{SinkError, SinkResult},
    events::{EventBus, NotificationSink, SinkClosed, SinkEvent},
    ring::RingBuffer,
    sink::{IcecastSink, Sink},
    state::WorkerState,
};
