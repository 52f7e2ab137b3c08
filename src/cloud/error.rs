//! Error type for the device facade.

use core::fmt;

/// Why a device operation failed.
///
/// Every fallible operation returns `Result<_, Error>`; callers that only care
/// about success or failure can use `is_ok()`. Variants carry just enough to
/// log or branch on, never borrowed data.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The registration endpoint answered with a non-200 status.
    Http(u16),
    /// The HTTP or MQTT transport failed before an answer arrived.
    Transport,
    /// The registration body was not JSON with string `uuid` and `secret` fields.
    InvalidResponse,
    /// The broker rejected the CONNECT or the transport could not be opened.
    Connect,
    /// A subscription failed while (re)establishing the session.
    Subscribe,
    /// Servicing the session failed; it will be re-established on the next tick.
    Poll,
    /// The topic registry has no free slot; the binding was dropped.
    RegistryFull,
    /// A topic exceeds [`MAX_TOPIC_LEN`](super::topics::MAX_TOPIC_LEN).
    TopicTooLong,
    /// An identity or secret does not fit its buffer.
    CredentialTooLong,
    /// The operation needs both identity and secret to be set.
    MissingCredentials,
    /// A URL or client identifier does not fit its buffer.
    ConfigTooLong,
    /// Reading or writing persisted credentials failed.
    Storage,
    /// Persisted credentials are absent or fail their checksum.
    CorruptCredentials,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(status) => write!(f, "registration answered with status {}", status),
            Error::Transport => f.write_str("transport failure"),
            Error::InvalidResponse => f.write_str("malformed registration response"),
            Error::Connect => f.write_str("broker connect failed"),
            Error::Subscribe => f.write_str("subscribe failed"),
            Error::Poll => f.write_str("session poll failed"),
            Error::RegistryFull => f.write_str("topic registry full"),
            Error::TopicTooLong => f.write_str("topic too long"),
            Error::CredentialTooLong => f.write_str("credential too long"),
            Error::MissingCredentials => f.write_str("credentials not set"),
            Error::ConfigTooLong => f.write_str("configuration value too long"),
            Error::Storage => f.write_str("credential storage failed"),
            Error::CorruptCredentials => f.write_str("no valid stored credentials"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Http(status) => defmt::write!(f, "Http({})", status),
            Error::Transport => defmt::write!(f, "Transport"),
            Error::InvalidResponse => defmt::write!(f, "InvalidResponse"),
            Error::Connect => defmt::write!(f, "Connect"),
            Error::Subscribe => defmt::write!(f, "Subscribe"),
            Error::Poll => defmt::write!(f, "Poll"),
            Error::RegistryFull => defmt::write!(f, "RegistryFull"),
            Error::TopicTooLong => defmt::write!(f, "TopicTooLong"),
            Error::CredentialTooLong => defmt::write!(f, "CredentialTooLong"),
            Error::MissingCredentials => defmt::write!(f, "MissingCredentials"),
            Error::ConfigTooLong => defmt::write!(f, "ConfigTooLong"),
            Error::Storage => defmt::write!(f, "Storage"),
            Error::CorruptCredentials => defmt::write!(f, "CorruptCredentials"),
        }
    }
}
