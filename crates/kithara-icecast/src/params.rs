use std::fmt;

/// Source protocol spoken to the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Protocol {
    /// HTTP `PUT` (Icecast 2.4+).
    #[default]
    Http,
    /// Legacy `SOURCE` method understood by older Icecast releases.
    Source,
}

impl Protocol {
    pub fn method(self) -> &'static str {
        match self {
            Self::Http => "PUT",
            Self::Source => "SOURCE",
        }
    }
}

/// Container format of the pushed stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Mp3,
    Ogg,
    Webm,
}

impl Format {
    /// MIME type announced in `Content-Type`.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "application/ogg",
            Self::Webm => "video/webm",
        }
    }
}

/// A single connection parameter applied to a transport.
#[derive(Clone, PartialEq, Eq)]
pub enum ConnectParam {
    Host(String),
    Protocol(Protocol),
    Port(u16),
    Password(String),
    Mount(String),
    User(String),
    Format(Format),
}

impl ConnectParam {
    /// Short parameter name used in error reasons.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Host(_) => "host",
            Self::Protocol(_) => "protocol",
            Self::Port(_) => "port",
            Self::Password(_) => "password",
            Self::Mount(_) => "mount",
            Self::User(_) => "user",
            Self::Format(_) => "format",
        }
    }
}

impl fmt::Debug for ConnectParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(host) => f.debug_tuple("Host").field(host).finish(),
            Self::Protocol(protocol) => f.debug_tuple("Protocol").field(protocol).finish(),
            Self::Port(port) => f.debug_tuple("Port").field(port).finish(),
            Self::Password(_) => f.debug_tuple("Password").field(&"<redacted>").finish(),
            Self::Mount(mount) => f.debug_tuple("Mount").field(mount).finish(),
            Self::User(user) => f.debug_tuple("User").field(user).finish(),
            Self::Format(format) => f.debug_tuple("Format").field(format).finish(),
        }
    }
}

/// Connection parameters for a source client.
///
/// Applied to a transport one by one, in the order returned by
/// [`ConnectParams::to_params`].
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Server host name or IP address.
    pub host: String,
    /// Server port. Default: 8000.
    pub port: u16,
    /// Source password.
    pub password: String,
    /// Mount point, e.g. `/live.mp3`.
    pub mount: String,
    /// Source user. Default: `source`.
    pub user: String,
    /// Source protocol. Default: HTTP `PUT`.
    pub protocol: Protocol,
    /// Stream format. Default: MP3.
    pub format: Format,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            password: String::new(),
            mount: "/stream".to_string(),
            user: "source".to_string(),
            protocol: Protocol::default(),
            format: Format::default(),
        }
    }
}

impl ConnectParams {
    /// Create parameters for the given server and mount.
    #[must_use]
    pub fn new<H, P, M>(host: H, port: u16, password: P, mount: M) -> Self
    where
        H: Into<String>,
        P: Into<String>,
        M: Into<String>,
    {
        Self {
            host: host.into(),
            port,
            password: password.into(),
            mount: mount.into(),
            ..Self::default()
        }
    }

    /// Set source user.
    #[must_use]
    pub fn with_user<S: Into<String>>(mut self, user: S) -> Self {
        self.user = user.into();
        self
    }

    /// Set source protocol.
    #[must_use]
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set stream format.
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Parameters in application order.
    pub fn to_params(&self) -> Vec<ConnectParam> {
        vec![
            ConnectParam::Host(self.host.clone()),
            ConnectParam::Protocol(self.protocol),
            ConnectParam::Port(self.port),
            ConnectParam::Password(self.password.clone()),
            ConnectParam::Mount(self.mount.clone()),
            ConnectParam::User(self.user.clone()),
            ConnectParam::Format(self.format),
        ]
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("mount", &self.mount)
            .field("user", &self.user)
            .field("protocol", &self.protocol)
            .field("format", &self.format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_are_applied_in_fixed_order() {
        let params = ConnectParams::new("radio.example.org", 8010, "hackme", "/live.mp3");
        let names: Vec<_> = params.to_params().iter().map(ConnectParam::name).collect();
        assert_eq!(
            names,
            ["host", "protocol", "port", "password", "mount", "user", "format"]
        );
    }

    #[test]
    fn debug_redacts_password() {
        let params = ConnectParams::new("localhost", 8000, "hackme", "/live");
        let debug = format!("{params:?}");
        assert!(!debug.contains("hackme"));
        assert!(debug.contains("<redacted>"));

        let param = ConnectParam::Password("hackme".to_string());
        assert!(!format!("{param:?}").contains("hackme"));
    }

    #[test]
    fn defaults_match_icecast_source_conventions() {
        let params = ConnectParams::default();
        assert_eq!(params.port, 8000);
        assert_eq!(params.user, "source");
        assert_eq!(params.protocol.method(), "PUT");
        assert_eq!(params.format.content_type(), "audio/mpeg");
    }
}
