//! Device configuration.

use super::error::Error;
use super::topics::DEFAULT_TOPIC_CAPACITY;
use core::fmt::Write as _;
use heapless::String;

/// Broker host of the Kinton testing environment.
pub const DEFAULT_SERVER_ADDRESS: &str = "broker.testing.kinton.io";
/// Broker port of the Kinton testing environment.
pub const DEFAULT_SERVER_PORT: u16 = 51884;
/// Fleet API base; the fleet key and `/registerMote` are appended to it.
pub const DEFAULT_REGISTRATION_BASE_URL: &str = "http://api.testing.kinton.io/api/fleets/";
/// MQTT client identifier used when none is configured.
pub const DEFAULT_CLIENT_ID: &str = "kinton-mote";

/// Longest `host:port` produced by [`Config::broker_remote`].
pub const MAX_REMOTE_LEN: usize = 128;

/// Everything the device needs to know about the backend.
///
/// ```rust
/// use kinton::cloud::Config;
///
/// let config = Config::default()
///     .with_client_id("greenhouse-7")
///     .with_topic_capacity(4);
///
/// assert_eq!(config.server_port, 51884);
/// assert_eq!(config.topic_capacity, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config<'a> {
    /// Broker host name or address.
    pub server_address: &'a str,
    /// Broker TCP port.
    pub server_port: u16,
    /// Registration base URL, expected to end with `/`.
    pub registration_base_url: &'a str,
    /// Runtime limit on topic bindings, capped by the registry's compile-time size.
    pub topic_capacity: usize,
    /// MQTT client identifier.
    pub client_id: &'a str,
    /// MQTT keep-alive interval in seconds.
    pub keep_alive_seconds: u16,
}

impl Default for Config<'_> {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS,
            server_port: DEFAULT_SERVER_PORT,
            registration_base_url: DEFAULT_REGISTRATION_BASE_URL,
            topic_capacity: DEFAULT_TOPIC_CAPACITY,
            client_id: DEFAULT_CLIENT_ID,
            keep_alive_seconds: 60,
        }
    }
}

impl<'a> Config<'a> {
    /// Sets the broker host and port.
    pub fn with_server(mut self, address: &'a str, port: u16) -> Self {
        self.server_address = address;
        self.server_port = port;
        self
    }

    /// Sets the registration base URL.
    pub fn with_registration_base_url(mut self, url: &'a str) -> Self {
        self.registration_base_url = url;
        self
    }

    /// Sets the runtime topic limit.
    pub fn with_topic_capacity(mut self, capacity: usize) -> Self {
        self.topic_capacity = capacity;
        self
    }

    /// Sets the MQTT client identifier.
    pub fn with_client_id(mut self, client_id: &'a str) -> Self {
        self.client_id = client_id;
        self
    }

    /// Sets the MQTT keep-alive interval.
    pub fn with_keep_alive(mut self, seconds: u16) -> Self {
        self.keep_alive_seconds = seconds;
        self
    }

    /// The broker as a `host:port` remote for [`Connect`](crate::network::Connect).
    pub fn broker_remote(&self) -> Result<String<MAX_REMOTE_LEN>, Error> {
        let mut remote = String::new();
        write!(remote, "{}:{}", self.server_address, self.server_port)
            .map_err(|_| Error::ConfigTooLong)?;
        Ok(remote)
    }
}
