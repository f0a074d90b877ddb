use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection to '{address}' failed: {source}")]
    Connection {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("Timeout Error")]
    Timeout,
    #[error("Connection Closed")]
    ConnectionClosed,
    #[error("IO error: {0}")]
    Io(#[source] io::Error),
    #[error("Invalid coordinate: RA {ra_hours}h, Dec {dec_degrees}°")]
    InvalidCoordinate { ra_hours: f64, dec_degrees: f64 },
    #[error("No slew requested")]
    NoActiveSlew,
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// True for errors after which the session cannot be used any more.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Connection { .. } | Error::ConnectionClosed)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::NotConnected => Error::ConnectionClosed,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::Timeout,
            _ => Error::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
