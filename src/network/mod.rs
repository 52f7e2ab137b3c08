//! Transport abstraction used by the bundled HTTP and MQTT collaborators.
//!
//! The crate never opens sockets itself. Callers supply a [`Connect`]
//! implementation (TCP over smoltcp, a modem AT-command bridge, a test double)
//! and the protocol clients in [`application`] speak over whatever
//! [`Connection`] it hands back.

#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Application layer protocol clients (HTTP, MQTT).
pub mod application;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connect, Connection, Read, ReadReady, Write};
}

/// Byte source half of a connection.
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data into `buf`, blocking until at least one byte arrives.
    ///
    /// `Ok(0)` means the peer closed the stream and nothing more will come.
    /// A transport that gives up waiting reports that as an error.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Readiness query for the byte source, used to poll without blocking.
pub trait ReadReady: Read {
    /// Whether a [`Read::read`] call would return without blocking.
    ///
    /// Must be `true` once the peer has closed the stream, so the end of
    /// stream is observed by the next read.
    fn read_ready(&mut self) -> Result<bool, Self::Error>;
}

/// Byte sink half of a connection.
pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Consuming shutdown of a connection.
pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous, stream oriented connection.
pub trait Connection: Read + ReadReady + Write + Close {}

/// Opens connections to `host:port` style remotes.
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open a connection
    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error>;
}

/// Writes the whole buffer, looping over short writes.
pub(crate) fn write_all<W: Write>(writer: &mut W, mut buf: &[u8]) -> Result<(), error::Error> {
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => return Err(error::Error::ConnectionClosed),
            Ok(n) => buf = &buf[n..],
            Err(_) => return Err(error::Error::WriteError),
        }
    }
    Ok(())
}

/// Fills the whole buffer, treating `Ok(0)` as a closed peer.
pub(crate) fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), error::Error> {
    let mut total_read = 0;
    while total_read < buf.len() {
        match reader.read(&mut buf[total_read..]) {
            Ok(0) => return Err(error::Error::ConnectionClosed),
            Ok(n) => total_read += n,
            Err(_) => return Err(error::Error::ReadError),
        }
    }
    Ok(())
}
