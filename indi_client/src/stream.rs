use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::error::*;

/// The socket a [`Connection`](crate::Connection) owns.
pub trait Stream: Read + Write + Send {
    fn set_nonblocking(&mut self, b: bool) -> Result<()>;
    fn set_timeouts(&mut self, timeout: Option<Duration>) -> io::Result<()>;
    fn shutdown(&mut self) -> Result<()>;
}

impl Stream for TcpStream {
    #[inline]
    fn set_nonblocking(&mut self, b: bool) -> Result<()> {
        TcpStream::set_nonblocking(self, b)?;
        Ok(())
    }

    #[inline]
    fn set_timeouts(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        // a zero duration is rejected by std, treat it as "no timeout"
        let timeout = timeout.filter(|t| !t.is_zero());
        TcpStream::set_read_timeout(self, timeout)?;
        TcpStream::set_write_timeout(self, timeout)
    }

    #[inline]
    fn shutdown(&mut self) -> Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)?;
        Ok(())
    }
}
