use kithara_icecast::ConnectParams;

/// Default ring buffer capacity, in payloads.
pub const DEFAULT_CAPACITY: usize = 8;

const DEFAULT_THREAD_NAME: &str = "kithara-sink";

/// Configuration for a [`Sink`](crate::Sink).
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Connection parameters applied to the transport on create.
    pub params: ConnectParams,
    /// Ring buffer capacity in payload slots (not bytes).
    pub capacity: usize,
    /// Name of the worker thread.
    pub thread_name: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::new(ConnectParams::default())
    }
}

impl SinkConfig {
    pub fn new(params: ConnectParams) -> Self {
        Self {
            params,
            capacity: DEFAULT_CAPACITY,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.thread_name = name.into();
        self
    }
}
