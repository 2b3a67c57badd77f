//! Test transports.
//!
//! [`MockTransport`](crate::MockTransport) (generated by mockall) covers
//! call-level expectations. Lifecycle and ordering tests need something
//! that can be observed from another thread while a worker drives it, so
//! [`RecordingTransport`] keeps its history behind a shared
//! [`RecordingHandle`] and lets tests block until a number of payloads
//! were sent.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::{
    error::{TransportError, TransportResult},
    params::ConnectParam,
    traits::Transport,
};

#[derive(Debug, Default)]
struct Recording {
    applied: Vec<ConnectParam>,
    sent: Vec<Vec<u8>>,
    opens: usize,
    closes: usize,
    syncs: usize,
    connected: bool,
}

#[derive(Debug, Default)]
struct Shared {
    recording: Mutex<Recording>,
    changed: Condvar,
}

/// Observer side of a [`RecordingTransport`].
#[derive(Debug, Clone, Default)]
pub struct RecordingHandle {
    shared: Arc<Shared>,
}

impl RecordingHandle {
    /// Payloads sent so far, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.shared.recording.lock().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.shared.recording.lock().sent.len()
    }

    pub fn applied(&self) -> Vec<ConnectParam> {
        self.shared.recording.lock().applied.clone()
    }

    pub fn opens(&self) -> usize {
        self.shared.recording.lock().opens
    }

    pub fn closes(&self) -> usize {
        self.shared.recording.lock().closes
    }

    pub fn syncs(&self) -> usize {
        self.shared.recording.lock().syncs
    }

    pub fn is_connected(&self) -> bool {
        self.shared.recording.lock().connected
    }

    /// Block until at least `count` payloads were sent.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_for_sent(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut recording = self.shared.recording.lock();
        while recording.sent.len() < count {
            if self
                .shared
                .changed
                .wait_until(&mut recording, deadline)
                .timed_out()
            {
                return recording.sent.len() >= count;
            }
        }
        true
    }

    /// Block until the transport was closed at least `count` times.
    pub fn wait_for_closes(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut recording = self.shared.recording.lock();
        while recording.closes < count {
            if self
                .shared
                .changed
                .wait_until(&mut recording, deadline)
                .timed_out()
            {
                return recording.closes >= count;
            }
        }
        true
    }

    fn update<R>(&self, f: impl FnOnce(&mut Recording) -> R) -> R {
        let result = f(&mut self.shared.recording.lock());
        self.shared.changed.notify_all();
        result
    }
}

/// In-memory transport recording every call.
///
/// Failures are scripted up front: a failing `open`, a failing `send` at a
/// given payload index, or a rejected parameter.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    handle: RecordingHandle,
    fail_open: Option<String>,
    fail_send_at: Option<(usize, String)>,
    reject_param: Option<&'static str>,
    sync_delay: Duration,
    last_error: Option<String>,
}

impl RecordingTransport {
    /// Create a transport and its observer handle.
    pub fn new() -> (Self, RecordingHandle) {
        let transport = Self::default();
        let handle = transport.handle.clone();
        (transport, handle)
    }

    /// Make every `open` fail with `message`.
    #[must_use]
    pub fn failing_open<S: Into<String>>(mut self, message: S) -> Self {
        self.fail_open = Some(message.into());
        self
    }

    /// Make the `index`-th send (zero based) fail with `message`.
    #[must_use]
    pub fn failing_send_at<S: Into<String>>(mut self, index: usize, message: S) -> Self {
        self.fail_send_at = Some((index, message.into()));
        self
    }

    /// Reject the parameter with the given name in `apply`.
    #[must_use]
    pub fn rejecting(mut self, name: &'static str) -> Self {
        self.reject_param = Some(name);
        self
    }

    /// Sleep this long in every `sync`.
    #[must_use]
    pub fn with_sync_delay(mut self, delay: Duration) -> Self {
        self.sync_delay = delay;
        self
    }
}

impl Transport for RecordingTransport {
    fn apply(&mut self, param: &ConnectParam) -> TransportResult<()> {
        if self.reject_param == Some(param.name()) {
            let error = TransportError::invalid(param.name(), "rejected");
            self.last_error = Some(error.to_string());
            return Err(error);
        }
        self.handle.update(|r| r.applied.push(param.clone()));
        Ok(())
    }

    fn open(&mut self) -> TransportResult<()> {
        self.handle.update(|r| r.opens += 1);
        if let Some(message) = self.fail_open.clone() {
            self.last_error = Some(message.clone());
            return Err(TransportError::Connect {
                addr: "recording".to_string(),
                reason: message,
            });
        }
        self.handle.update(|r| r.connected = true);
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> TransportResult<()> {
        let index = self.handle.sent_count();
        if let Some((fail_at, message)) = &self.fail_send_at
            && *fail_at == index
        {
            self.last_error = Some(message.clone());
            return Err(TransportError::Io(message.clone()));
        }
        self.handle.update(|r| r.sent.push(data.to_vec()));
        Ok(())
    }

    fn sync(&mut self) {
        self.handle.update(|r| r.syncs += 1);
        if !self.sync_delay.is_zero() {
            std::thread::sleep(self.sync_delay);
        }
    }

    fn close(&mut self) {
        self.handle.update(|r| {
            r.closes += 1;
            r.connected = false;
        });
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}
