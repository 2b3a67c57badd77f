//! Transport abstraction used by the sink worker.

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::{error::TransportResult, params::ConnectParam};

/// Connection to a streaming server.
///
/// All calls block. A transport is configured with [`apply`](Transport::apply)
/// before [`open`](Transport::open), then driven by exactly one thread at a
/// time: `send` → `sync` → `send` → ... → `close`.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait Transport: Send + 'static {
    /// Validate and store one connection parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is rejected or the transport is
    /// already connected.
    fn apply(&mut self, param: &ConnectParam) -> TransportResult<()>;

    /// Connect and perform the source handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or refuses the stream.
    fn open(&mut self) -> TransportResult<()>;

    /// Push one payload to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is not connected or the write fails.
    fn send(&mut self, data: &[u8]) -> TransportResult<()>;

    /// Block until the next payload is due to keep real-time cadence.
    fn sync(&mut self);

    /// Close the connection. Safe to call when not connected.
    fn close(&mut self);

    /// Message of the most recent failure, if any.
    fn last_error(&self) -> Option<String>;
}
