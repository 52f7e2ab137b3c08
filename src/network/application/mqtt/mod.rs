//! MQTT 3.1.1 for a Kinton device.
//!
//! The device authenticates with its identity and secret as username and
//! password, subscribes to the topics bound in its registry and receives
//! publishes on them. Two layers:
//!
//! - [`Client`]: one live connection, packet encoding and decoding
//! - [`MqttSession`]: owns a [`Connect`](crate::network::Connect) and opens a
//!   fresh [`Client`] on every (re)connect, implementing
//!   [`Session`](crate::cloud::Session) for the connection manager
//!
//! ```rust,no_run
//! use kinton::network::application::mqtt::{Client, Options, QoS};
//! # use kinton::network::Connection;
//! # struct MockConnection;
//! # impl Connection for MockConnection {}
//! # impl kinton::network::Read for MockConnection {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl kinton::network::ReadReady for MockConnection {
//! #     fn read_ready(&mut self) -> Result<bool, Self::Error> { Ok(false) }
//! # }
//! # impl kinton::network::Write for MockConnection {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl kinton::network::Close for MockConnection {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//!
//! let options = Options {
//!     client_id: "kinton-mote",
//!     keep_alive_seconds: 60,
//!     clean_session: true,
//!     username: Some("6a1f0c2e-device-uuid"),
//!     password: Some("device-secret"),
//! };
//!
//! // let mut client = Client::connect(MockConnection, options)?;
//! // client.subscribe("greenhouse/valve", QoS::AtMostOnce, |_| {})?;
//! ```

/// MQTT client implementation and supporting types.
pub mod client;

/// Reconnecting session for the connection manager.
pub mod session;

pub use client::{Client, Options, PublishPacket, QoS};
pub use session::MqttSession;
