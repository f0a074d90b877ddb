//! Client configuration.
//!
//! Durations are written as float seconds:
//!
//! ```toml
//! host = "indiserver"
//! port = 7624
//! device = "LX200 OnStep"
//! drain_wait = 1.5
//!
//! [tolerance]
//! ra_hours = 0.01
//! dec_degrees = 0.5
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sansio::protocol::{DEFAULT_PORT, PROTOCOL_VERSION};
use crate::sansio::types::{CompletionPolicy, Tolerance};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// INDI device name of the mount
    pub device: String,
    pub protocol_version: String,
    #[serde(with = "seconds")]
    pub connect_timeout: Duration,
    /// Time to let the peer respond before draining the socket.
    ///
    /// Too short a wait yields a truncated snapshot, not an error.
    #[serde(with = "seconds")]
    pub drain_wait: Duration,
    #[serde(with = "seconds")]
    pub poll_interval: Duration,
    #[serde(with = "seconds")]
    pub slew_timeout: Duration,
    pub tolerance: Tolerance,
    pub policy: CompletionPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "localhost".into(),
            port: DEFAULT_PORT,
            device: "LX200 OnStep".into(),
            protocol_version: PROTOCOL_VERSION.into(),
            connect_timeout: Duration::from_secs(10),
            drain_wait: Duration::from_millis(500),
            poll_interval: Duration::from_secs(1),
            slew_timeout: Duration::from_secs(30),
            tolerance: Tolerance::default(),
            policy: CompletionPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read '{}': {}", path.display(), e)))?;
        Self::from_toml_str(&s)
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

mod seconds {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
