//! Send loop executed on the worker thread.

use std::time::Instant;

use bytes::Bytes;
use kithara_icecast::Transport;
use parking_lot::MutexGuard;
use tracing::{debug, info, trace, warn};

use crate::{
    events::{NotificationSink, SinkEvent},
    state::{Shared, WorkerState},
};

/// Owns the transport for the duration of one run.
///
/// Dropping the worker performs cleanup, so every exit path (including a
/// panic inside a transport call) reports a pending underrun, closes the
/// transport, drops buffered payloads and leaves the state `Idle`.
pub(crate) struct StreamWorker<'a, T: Transport, N: NotificationSink> {
    shared: &'a Shared<T, N>,
    transport: MutexGuard<'a, T>,
    underrun_since: Option<Instant>,
}

impl<'a, T: Transport, N: NotificationSink> StreamWorker<'a, T, N> {
    pub(crate) fn new(shared: &'a Shared<T, N>) -> Self {
        Self {
            transport: shared.transport.lock(),
            shared,
            underrun_since: None,
        }
    }

    pub(crate) fn run(mut self) {
        if let Err(e) = self.transport.open() {
            let message = self.transport.last_error().unwrap_or_else(|| e.to_string());
            warn!(error = %message, "transport connect failed");
            self.notify(SinkEvent::ConnectionError(message));
            return;
        }
        info!("transport connected");

        let free = self.shared.lock().ring.free();
        if free > 0 && !self.notify(SinkEvent::Demand(free)) {
            return;
        }

        while let Some(payload) = self.next_payload() {
            if !self.send(payload) {
                return;
            }
            self.transport.sync();
        }
        debug!("stop requested");
    }

    /// Block until a payload is buffered or a stop is requested.
    fn next_payload(&mut self) -> Option<Bytes> {
        let shared = self.shared;
        let mut control = shared.lock();
        loop {
            if control.worker != WorkerState::Running {
                return None;
            }
            if let Some(payload) = control.ring.try_read() {
                return Some(payload);
            }
            if self.underrun_since.is_none() {
                trace!("buffer empty, waiting");
                self.underrun_since = Some(Instant::now());
            }
            shared.data_ready.wait(&mut control);
        }
    }

    /// Push one payload. Returns `false` when the run must end.
    fn send(&mut self, payload: Bytes) -> bool {
        if !self.report_underrun() {
            return false;
        }

        let result = self.transport.send(&payload);
        let len = payload.len();
        drop(payload);

        if let Err(e) = result {
            let message = self.transport.last_error().unwrap_or_else(|| e.to_string());
            warn!(error = %message, "transport send failed");
            self.notify(SinkEvent::SendError(message));
            return false;
        }
        trace!(len, "payload sent");
        self.notify(SinkEvent::Demand(1))
    }

    fn report_underrun(&mut self) -> bool {
        match self.underrun_since.take() {
            Some(since) => {
                let duration = since.elapsed();
                warn!(?duration, "buffer underrun");
                self.notify(SinkEvent::Underrun(duration))
            }
            None => true,
        }
    }

    fn notify(&self, event: SinkEvent) -> bool {
        match self.shared.events.notify(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "notification sink closed, stopping worker");
                false
            }
        }
    }
}

impl<T: Transport, N: NotificationSink> Drop for StreamWorker<'_, T, N> {
    fn drop(&mut self) {
        self.report_underrun();
        self.transport.close();

        let mut control = self.shared.lock();
        let dropped = control.ring.clear();
        control.worker = WorkerState::Idle;
        drop(control);
        self.shared.idle.notify_all();
        debug!(dropped, "worker idle");
    }
}
