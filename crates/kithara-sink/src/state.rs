use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::ring::RingBuffer;

/// Lifecycle of the worker thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorkerState {
    /// No worker thread, or it has fully exited.
    #[default]
    Idle,
    /// The send loop is running.
    Running,
    /// Stop requested; the worker is unwinding.
    Stopping,
}

/// Everything guarded by the state mutex.
#[derive(Debug)]
pub(crate) struct Control {
    pub(crate) worker: WorkerState,
    pub(crate) ring: RingBuffer<Bytes>,
}

/// State shared between the controller and the worker thread.
pub(crate) struct Shared<T, N> {
    /// Held by the worker for a whole run.
    pub(crate) transport: Mutex<T>,
    pub(crate) control: Mutex<Control>,
    /// Buffer became non-empty or a stop was requested.
    pub(crate) data_ready: Condvar,
    /// Worker reached `Idle`.
    pub(crate) idle: Condvar,
    pub(crate) events: N,
}

impl<T, N> Shared<T, N> {
    pub(crate) fn new(transport: T, events: N, capacity: usize) -> Self {
        Self {
            transport: Mutex::new(transport),
            control: Mutex::new(Control {
                worker: WorkerState::Idle,
                ring: RingBuffer::new(capacity),
            }),
            data_ready: Condvar::new(),
            idle: Condvar::new(),
            events,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock()
    }

    /// Block until the worker is idle or `timeout` elapses.
    pub(crate) fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut control = self.lock();
        while control.worker != WorkerState::Idle {
            if self.idle.wait_until(&mut control, deadline).timed_out() {
                return control.worker == WorkerState::Idle;
            }
        }
        true
    }
}
