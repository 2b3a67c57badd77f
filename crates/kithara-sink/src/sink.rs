use std::{
    fmt,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use bytes::Bytes;
use kithara_icecast::{IcecastOptions, IcecastTransport, Transport};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    config::SinkConfig,
    error::{SinkError, SinkResult},
    events::NotificationSink,
    state::{Shared, WorkerState},
    worker::StreamWorker,
};

/// Sink streaming to an Icecast server.
pub type IcecastSink<N> = Sink<IcecastTransport, N>;

/// Handle to a paced streaming sink.
///
/// Producers call [`write`](Sink::write) from any thread; a dedicated worker
/// started with [`start`](Sink::start) drains the buffer into the transport.
/// All methods take `&self`, so a sink can be shared behind an `Arc`.
///
/// Dropping a running sink stops it and joins the worker.
pub struct Sink<T: Transport, N: NotificationSink> {
    shared: Arc<Shared<T, N>>,
    /// Lifecycle lock. Always taken before the state lock.
    worker: Mutex<Option<JoinHandle<()>>>,
    thread_name: String,
}

impl<T: Transport, N: NotificationSink> Sink<T, N> {
    /// Configure `transport` and allocate an idle sink.
    ///
    /// Connection parameters are applied in the order host, protocol, port,
    /// password, mount, user, format; nothing after a rejected parameter is
    /// applied.
    ///
    /// # Errors
    ///
    /// - [`SinkError::Internal`] with `"capacity"` for a zero capacity
    /// - [`SinkError::Internal`] with `"set_<param>"` when the transport
    ///   rejects a parameter
    pub fn create(config: SinkConfig, mut transport: T, events: N) -> SinkResult<Self> {
        if config.capacity == 0 {
            return Err(SinkError::internal("capacity"));
        }
        for param in config.params.to_params() {
            if let Err(e) = transport.apply(&param) {
                warn!(param = param.name(), error = %e, "transport rejected parameter");
                return Err(SinkError::internal(format!("set_{}", param.name())));
            }
        }

        debug!(
            capacity = config.capacity,
            thread = %config.thread_name,
            "sink created"
        );
        Ok(Self {
            shared: Arc::new(Shared::new(transport, events, config.capacity)),
            worker: Mutex::new(None),
            thread_name: config.thread_name,
        })
    }

    /// Spawn the worker thread.
    ///
    /// # Errors
    ///
    /// - [`SinkError::AlreadyStarted`] unless the worker is idle
    /// - [`SinkError::Internal`] with `"thread_create"` if the thread could
    ///   not be spawned
    pub fn start(&self) -> SinkResult<()> {
        let mut handle = self.worker.lock();
        if self.state() != WorkerState::Idle {
            return Err(SinkError::AlreadyStarted);
        }
        // Worker that exited on its own (transport error).
        if let Some(stale) = handle.take() {
            join_worker(stale);
        }

        self.shared.lock().worker = WorkerState::Running;
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || StreamWorker::new(&shared).run());

        match spawned {
            Ok(worker) => {
                debug!(thread = %self.thread_name, "worker started");
                *handle = Some(worker);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to spawn worker thread");
                self.shared.lock().worker = WorkerState::Idle;
                self.shared.idle.notify_all();
                Err(SinkError::internal("thread_create"))
            }
        }
    }

    /// Request the worker to stop and wait for it to exit.
    ///
    /// Waits for an in-flight `send`/`sync` to return; there is no timeout.
    ///
    /// # Errors
    ///
    /// [`SinkError::NotStarted`] when the worker is already idle.
    pub fn stop(&self) -> SinkResult<()> {
        let mut handle = self.worker.lock();
        {
            let mut control = self.shared.lock();
            if control.worker == WorkerState::Idle {
                drop(control);
                if let Some(stale) = handle.take() {
                    join_worker(stale);
                }
                return Err(SinkError::NotStarted);
            }
            control.worker = WorkerState::Stopping;
            self.shared.data_ready.notify_all();
        }

        if let Some(worker) = handle.take() {
            join_worker(worker);
        }
        debug!("worker stopped");
        Ok(())
    }

    /// Enqueue one payload. Works in any state; never blocks on the worker.
    ///
    /// # Errors
    ///
    /// [`SinkError::Overrun`] when the buffer is full. The buffer is left
    /// unchanged and the payload is dropped.
    pub fn write<B: Into<Bytes>>(&self, payload: B) -> SinkResult<()> {
        let payload = payload.into();
        let len = payload.len();

        let mut control = self.shared.lock();
        let was_empty = control.ring.is_empty();
        if control.ring.write(payload).is_err() {
            trace!(len, "buffer overrun");
            return Err(SinkError::Overrun);
        }
        if was_empty {
            self.shared.data_ready.notify_one();
        }
        trace!(len, buffered = control.ring.available(), "payload buffered");
        Ok(())
    }

    pub fn state(&self) -> WorkerState {
        self.shared.lock().worker
    }

    /// Number of buffered payloads.
    pub fn available(&self) -> usize {
        self.shared.lock().ring.available()
    }

    pub fn capacity(&self) -> usize {
        self.shared.lock().ring.capacity()
    }

    /// Block until the worker is idle. Returns `false` on timeout.
    ///
    /// Useful after a `ConnectionError`/`SendError` notification, which is
    /// sent shortly before the worker finishes its cleanup.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        self.shared.wait_idle(timeout)
    }
}

impl<N: NotificationSink> Sink<IcecastTransport, N> {
    /// Create a sink over a new [`IcecastTransport`].
    ///
    /// # Errors
    ///
    /// Same as [`Sink::create`].
    pub fn icecast(config: SinkConfig, options: IcecastOptions, events: N) -> SinkResult<Self> {
        Self::create(config, IcecastTransport::new(options), events)
    }
}

impl<T: Transport, N: NotificationSink> Drop for Sink<T, N> {
    fn drop(&mut self) {
        if self.stop().is_ok() {
            debug!("sink dropped while running");
        }
    }
}

impl<T: Transport, N: NotificationSink> fmt::Debug for Sink<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let control = self.shared.lock();
        f.debug_struct("Sink")
            .field("state", &control.worker)
            .field("available", &control.ring.available())
            .field("capacity", &control.ring.capacity())
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        warn!("worker thread panicked");
    }
}
