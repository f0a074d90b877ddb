//! Handle the network connection to an indiserver

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;
use std::{fmt, io};

use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::error::*;
use crate::stream::Stream;

/// Prefix of the textual result of a failed best-effort exchange.
pub const ERROR_PREFIX: &str = "ERROR: ";

const READ_CHUNK: usize = 8192;

/// One request/response exchange with the peer.
///
/// INDI has no message framing and no request correlation, so an exchange is
/// "send, wait, take whatever arrived". There must never be more than one
/// exchange in flight on a connection.
pub trait Exchange {
    fn exchange(&mut self, message: &str, wait: Duration) -> Result<String>;
}

/// A TCP session with an indiserver.
///
/// Once disconnected, by [`Connection::disconnect`] or by the peer, a
/// connection stays disconnected. Connect again with a new instance.
pub struct Connection {
    stream: Option<Box<dyn Stream>>,
    address: String,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Connection {
    /// Open a TCP session. There is no retry.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let address = format!("{}:{}", host, port);
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|source| Error::Connection {
                address: address.clone(),
                source,
            })?;

        let mut last_err = io::Error::new(ErrorKind::AddrNotAvailable, "no address resolved");
        for addr in addrs {
            let ret = if timeout.is_zero() {
                TcpStream::connect(addr)
            } else {
                TcpStream::connect_timeout(&addr, timeout)
            };
            match ret {
                Ok(stream) => {
                    debug!(%address, %addr, "connected");
                    return Self::from_stream(Box::new(stream), &address, timeout);
                }
                Err(e) => {
                    debug!(%address, %addr, error = %e, "connect failed");
                    last_err = e;
                }
            }
        }

        Err(Error::Connection {
            address,
            source: last_err,
        })
    }

    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        Self::connect(&config.host, config.port, config.connect_timeout)
    }

    /// Wrap an already connected stream and apply the blocking I/O timeout.
    ///
    /// A stream that cannot be configured is reported as a failed connection.
    pub fn from_stream(
        mut stream: Box<dyn Stream>,
        address: &str,
        timeout: Duration,
    ) -> Result<Self> {
        stream
            .set_timeouts(Some(timeout))
            .map_err(|source| Error::Connection {
                address: address.into(),
                source,
            })?;
        Ok(Connection {
            stream: Some(stream),
            address: address.into(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Write the whole message.
    pub fn send(&mut self, message: &str) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
        debug!(address = %self.address, bytes = message.len(), "send");

        let ret = stream
            .write_all(message.as_bytes())
            .and_then(|_| stream.flush());
        if let Err(e) = ret {
            let e = Error::from(e);
            if e.is_fatal() {
                self.disconnect();
            }
            return Err(e);
        }
        Ok(())
    }

    /// Sleep `wait`, then read without blocking until nothing more is
    /// available or the peer closed the stream.
    ///
    /// Invalid UTF-8 sequences are dropped from the result. If the peer closed
    /// the stream, the data received so far is returned and the connection is
    /// disconnected.
    pub fn drain(&mut self, wait: Duration) -> Result<String> {
        let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;

        if !wait.is_zero() {
            thread::sleep(wait);
        }

        stream.set_nonblocking(true)?;

        let mut response = Vec::new();
        let mut buf = [0u8; READ_CHUNK];
        let mut closed = false;
        let ret = loop {
            match stream.read(&mut buf) {
                Ok(0) => {
                    closed = true;
                    break Ok(());
                }
                Ok(n) => response.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => break Err(e),
            }
        };
        let restored = stream.set_nonblocking(false);

        trace!(address = %self.address, bytes = response.len(), closed, "drained");

        if closed {
            debug!(address = %self.address, "peer closed the connection");
            self.disconnect();
        } else {
            restored?;
        }
        if let Err(e) = ret {
            let e = Error::from(e);
            if e.is_fatal() {
                self.disconnect();
            }
            return Err(e);
        }

        Ok(decode(&response))
    }

    pub fn send_and_drain(&mut self, message: &str, wait: Duration) -> Result<String> {
        self.send(message)?;
        self.drain(wait)
    }

    /// Best-effort [`send_and_drain`](Connection::send_and_drain).
    ///
    /// Errors degrade to a textual result starting with [`ERROR_PREFIX`], so
    /// that a health-check loop can carry on with its other checks.
    pub fn query(&mut self, message: &str, wait: Duration) -> String {
        match self.send_and_drain(message, wait) {
            Ok(response) => response,
            Err(e) => {
                warn!(address = %self.address, error = %e, "exchange failed");
                format!("{}{}", ERROR_PREFIX, e)
            }
        }
    }

    /// Close the socket. Calling this more than once is fine.
    pub fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            debug!(address = %self.address, "disconnect");
            let _ = stream.shutdown();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl Exchange for Connection {
    fn exchange(&mut self, message: &str, wait: Duration) -> Result<String> {
        self.send_and_drain(message, wait)
    }
}

/// True for the textual result of a failed best-effort exchange.
pub fn is_error_reply(response: &str) -> bool {
    response.starts_with(ERROR_PREFIX)
}

/// Connect, exchange one message and disconnect again.
///
/// Best-effort like [`Connection::query`], including connection failures.
pub fn send_once(config: &ClientConfig, message: &str, wait: Duration) -> String {
    match Connection::with_config(config) {
        Ok(mut connection) => connection.query(message, wait),
        Err(e) => {
            warn!(error = %e, "connect failed");
            format!("{}{}", ERROR_PREFIX, e)
        }
    }
}

/// True if a TCP session to `host:port` can be opened within `timeout`.
pub fn probe(host: &str, port: u16, timeout: Duration) -> bool {
    Connection::connect(host, port, timeout).is_ok()
}

fn decode(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}
