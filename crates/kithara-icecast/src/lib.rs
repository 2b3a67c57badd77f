#![forbid(unsafe_code)]

//! # kithara-icecast
//!
//! Source-client transport for pushing an encoded stream to an Icecast
//! server.
//!
//! - [`Transport`]: blocking connection abstraction (`apply`, `open`, `send`,
//!   `sync`, `close`, `last_error`) driven by the sink worker thread
//! - [`IcecastTransport`]: HTTP `PUT` / legacy `SOURCE` client with Basic
//!   authentication and bitrate pacing
//! - [`ConnectParams`]: host, port, credentials, mount, protocol and format
//!
//! Only the handshake and raw payload delivery are implemented. Metadata
//! updates, TLS and reconnection are left to the caller.

mod client;
mod error;
mod options;
mod pacer;
mod params;
mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use crate::{
    client::IcecastTransport,
    error::{TransportError, TransportResult},
    options::IcecastOptions,
    pacer::Pacer,
    params::{ConnectParam, ConnectParams, Format, Protocol},
    traits::Transport,
};

#[cfg(any(test, feature = "test-utils"))]
pub use crate::traits::MockTransport;
