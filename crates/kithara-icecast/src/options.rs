use std::time::Duration;

/// Socket and pacing options for [`IcecastTransport`](crate::IcecastTransport).
#[derive(Clone, Debug)]
pub struct IcecastOptions {
    /// Timeout for the TCP connect and for reading the handshake response.
    pub connect_timeout: Duration,
    /// Write timeout applied to the socket once connected.
    ///
    /// - `Some(d)`: a stalled server fails the send after `d`
    /// - `None`: sends block until the kernel accepts the data
    pub write_timeout: Option<Duration>,
    /// Nominal stream bitrate used to pace sends to real time. Default: 128.
    pub bitrate_kbps: u32,
    /// `User-Agent` header sent in the handshake.
    pub user_agent: String,
}

impl Default for IcecastOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            write_timeout: Some(Duration::from_secs(10)),
            bitrate_kbps: 128,
            user_agent: concat!("kithara-icecast/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl IcecastOptions {
    /// Set connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set write timeout.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set nominal bitrate for pacing.
    #[must_use]
    pub fn with_bitrate_kbps(mut self, bitrate_kbps: u32) -> Self {
        self.bitrate_kbps = bitrate_kbps;
        self
    }
}
