//! Client configuration applied to every slot connection.

use std::time::Duration;

use serde::Deserialize;

/// Socket settings for connections opened by the TCP connector.
///
/// Deserializes from JSON with every field optional, e.g.
/// `{"connect_timeout_ms": 2000, "read_timeout_ms": 5000}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Optional TCP connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Optional TCP read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,
    /// Optional TCP write timeout in milliseconds.
    pub write_timeout_ms: Option<u64>,
    /// Disable Nagle on new connections.
    pub nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            connect_timeout_ms: None,
            read_timeout_ms: None,
            write_timeout_ms: None,
            nodelay: true,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        to_duration(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        to_duration(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        to_duration(self.write_timeout_ms)
    }
}

// Zero would be rejected by the socket setters; treat it as "no timeout".
fn to_duration(ms: Option<u64>) -> Option<Duration> {
    ms.filter(|ms| *ms > 0).map(Duration::from_millis)
}
