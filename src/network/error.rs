//! Common error types for network operations

use core::fmt;

/// Error raised by the bundled protocol clients.
///
/// Transport specific errors are flattened into these variants so that the
/// HTTP and MQTT clients stay independent of the caller's socket type.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An operation was attempted on a connection that is not open.
    NotOpen,
    /// An error occurred during a write operation.
    WriteError,
    /// An error occurred during a read operation.
    ReadError,
    /// The peer refused the connection, a CONNACK return code 1..=5 or a
    /// SUBACK failure code.
    ConnectionRefused,
    /// The connection was closed.
    ConnectionClosed,
    /// An invalid address or URL was provided.
    InvalidAddress,
    /// The peer sent something the client could not parse.
    ProtocolError,
    /// A request or packet did not fit into its fixed-size buffer.
    BufferOverflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Error::NotOpen => "connection not open",
            Error::WriteError => "write failed",
            Error::ReadError => "read failed",
            Error::ConnectionRefused => "connection refused",
            Error::ConnectionClosed => "connection closed",
            Error::InvalidAddress => "invalid address",
            Error::ProtocolError => "protocol error",
            Error::BufferOverflow => "buffer overflow",
        };
        f.write_str(text)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectionRefused => defmt::write!(f, "ConnectionRefused"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::ProtocolError => defmt::write!(f, "ProtocolError"),
            Error::BufferOverflow => defmt::write!(f, "BufferOverflow"),
        }
    }
}
