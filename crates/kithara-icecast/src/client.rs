//! Icecast source client over a blocking TCP socket.

use std::{
    io::{Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    thread,
    time::{Duration, Instant},
};

use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{debug, trace, warn};
use url::Host;

use crate::{
    error::{TransportError, TransportResult},
    options::IcecastOptions,
    pacer::Pacer,
    params::{ConnectParam, Format, Protocol},
    traits::Transport,
};

/// Upper bound for the handshake response head.
const MAX_RESPONSE_HEAD: usize = 8 * 1024;

/// Transport pushing a stream to an Icecast mount point.
///
/// Parameters are applied one by one (see [`Transport::apply`]); `open`
/// connects, sends the `PUT`/`SOURCE` request with Basic authentication and
/// waits for the server to accept the stream. After that every `send` writes
/// raw payload bytes and `sync` sleeps according to the configured bitrate.
#[derive(Debug)]
pub struct IcecastTransport {
    options: IcecastOptions,
    host: Option<String>,
    port: u16,
    password: Option<String>,
    mount: Option<String>,
    user: String,
    protocol: Protocol,
    format: Format,
    stream: Option<TcpStream>,
    pacer: Pacer,
    last_error: Option<String>,
}

impl Default for IcecastTransport {
    fn default() -> Self {
        Self::new(IcecastOptions::default())
    }
}

impl IcecastTransport {
    #[must_use]
    pub fn new(options: IcecastOptions) -> Self {
        let pacer = Pacer::new(options.bitrate_kbps);
        Self {
            options,
            host: None,
            port: 8000,
            password: None,
            mount: None,
            user: "source".to_string(),
            protocol: Protocol::default(),
            format: Format::default(),
            stream: None,
            pacer,
            last_error: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// How long [`sync`](Transport::sync) would block right now.
    pub fn delay(&self) -> Duration {
        self.pacer.delay(Instant::now())
    }

    fn fail<T>(&mut self, error: TransportError) -> TransportResult<T> {
        self.last_error = Some(error.to_string());
        Err(error)
    }

    fn validate(param: &ConnectParam) -> TransportResult<()> {
        match param {
            ConnectParam::Host(host) => {
                if host.is_empty() {
                    return Err(TransportError::invalid("host", "empty"));
                }
                Host::parse(host).map_err(|e| TransportError::invalid("host", e.to_string()))?;
            }
            ConnectParam::Port(0) => return Err(TransportError::invalid("port", "zero")),
            ConnectParam::Mount(mount) => {
                if !mount.starts_with('/') {
                    return Err(TransportError::invalid("mount", "must start with '/'"));
                }
                if mount.len() < 2 || mount.chars().any(char::is_whitespace) {
                    return Err(TransportError::invalid("mount", "malformed"));
                }
            }
            ConnectParam::User(user) if user.is_empty() || user.contains(':') => {
                return Err(TransportError::invalid("user", "empty or contains ':'"));
            }
            ConnectParam::Password(password) if password.contains(['\r', '\n']) => {
                return Err(TransportError::invalid("password", "contains line break"));
            }
            _ => {}
        }
        Ok(())
    }

    fn connect(&self, host: &str) -> TransportResult<TcpStream> {
        let addr = format!("{host}:{}", self.port);
        let addrs = (host, self.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::Connect {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;

        let mut last = None;
        for candidate in addrs {
            match TcpStream::connect_timeout(&candidate, self.options.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    trace!(%candidate, error = %e, "connect attempt failed");
                    last = Some(e);
                }
            }
        }

        Err(TransportError::Connect {
            addr,
            reason: last.map_or_else(|| "no address resolved".to_string(), |e| e.to_string()),
        })
    }

    fn request_head(&self, host: &str, mount: &str, password: &str) -> String {
        let credentials = STANDARD.encode(format!("{}:{password}", self.user));
        let version = match self.protocol {
            Protocol::Http => "HTTP/1.1",
            Protocol::Source => "HTTP/1.0",
        };
        format!(
            "{method} {mount} {version}\r\n\
             Host: {host}:{port}\r\n\
             Authorization: Basic {credentials}\r\n\
             User-Agent: {agent}\r\n\
             Content-Type: {content_type}\r\n\
             Ice-Public: 0\r\n\
             \r\n",
            method = self.protocol.method(),
            port = self.port,
            agent = self.options.user_agent,
            content_type = self.format.content_type(),
        )
    }

    fn handshake(&self, stream: &mut TcpStream, head: &str) -> TransportResult<()> {
        stream.set_read_timeout(Some(self.options.connect_timeout))?;
        stream.write_all(head.as_bytes())?;
        stream.flush()?;

        let response = read_response_head(stream)?;
        let status = parse_status(&response)?;
        debug!(status, "handshake response");

        match status {
            200..=299 => Ok(()),
            401 => Err(TransportError::Unauthorized),
            403 => Err(TransportError::MountInUse),
            other => Err(TransportError::UnexpectedStatus(other)),
        }
    }
}

impl Transport for IcecastTransport {
    fn apply(&mut self, param: &ConnectParam) -> TransportResult<()> {
        if self.is_connected() {
            return self.fail(TransportError::AlreadyConnected);
        }
        if let Err(e) = Self::validate(param) {
            return self.fail(e);
        }

        match param {
            ConnectParam::Host(host) => self.host = Some(host.clone()),
            ConnectParam::Protocol(protocol) => self.protocol = *protocol,
            ConnectParam::Port(port) => self.port = *port,
            ConnectParam::Password(password) => self.password = Some(password.clone()),
            ConnectParam::Mount(mount) => self.mount = Some(mount.clone()),
            ConnectParam::User(user) => self.user.clone_from(user),
            ConnectParam::Format(format) => self.format = *format,
        }
        trace!(param = ?param, "parameter applied");
        Ok(())
    }

    fn open(&mut self) -> TransportResult<()> {
        if self.is_connected() {
            return self.fail(TransportError::AlreadyConnected);
        }
        let Some(host) = self.host.clone() else {
            return self.fail(TransportError::MissingParam("host"));
        };
        let Some(mount) = self.mount.clone() else {
            return self.fail(TransportError::MissingParam("mount"));
        };
        let Some(password) = self.password.clone() else {
            return self.fail(TransportError::MissingParam("password"));
        };

        debug!(%host, port = self.port, %mount, "connecting to icecast");
        let mut stream = match self.connect(&host) {
            Ok(stream) => stream,
            Err(e) => return self.fail(e),
        };

        let head = self.request_head(&host, &mount, &password);
        if let Err(e) = self.handshake(&mut stream, &head) {
            let _ = stream.shutdown(Shutdown::Both);
            return self.fail(e);
        }

        if let Err(e) = stream
            .set_write_timeout(self.options.write_timeout)
            .and_then(|()| stream.set_nodelay(true))
        {
            warn!(error = %e, "failed to tune socket");
        }

        self.pacer.reset();
        self.last_error = None;
        self.stream = Some(stream);
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> TransportResult<()> {
        let Some(stream) = self.stream.as_mut() else {
            return self.fail(TransportError::NotConnected);
        };
        if let Err(e) = stream.write_all(data) {
            return self.fail(e.into());
        }
        self.pacer.record(data.len(), Instant::now());
        Ok(())
    }

    fn sync(&mut self) {
        let delay = self.delay();
        if !delay.is_zero() {
            trace!(?delay, "pacing");
            thread::sleep(delay);
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!("icecast connection closed");
        }
        self.pacer.reset();
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

impl Drop for IcecastTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_response_head(stream: &mut TcpStream) -> TransportResult<String> {
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_RESPONSE_HEAD {
            return Err(TransportError::Protocol("response head too large".to_string()));
        }
        match stream.read(&mut byte)? {
            0 => {
                return Err(TransportError::Protocol(
                    "connection closed during handshake".to_string(),
                ));
            }
            _ => head.push(byte[0]),
        }
    }
    Ok(String::from_utf8_lossy(&head).into_owned())
}

fn parse_status(head: &str) -> TransportResult<u16> {
    let line = head.lines().next().unwrap_or_default();
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") || version == "ICE/1.0" => code
            .parse()
            .map_err(|_| TransportError::Protocol(format!("bad status line: {line}"))),
        _ => Err(TransportError::Protocol(format!("bad status line: {line}"))),
    }
}
