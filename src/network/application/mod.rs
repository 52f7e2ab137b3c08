//! # Application Layer Clients
//!
//! The two protocols a Kinton device speaks:
//!
//! - **[`http`]**: one-shot HTTP/1.1 requests, used for fleet registration
//! - **[`mqtt`]**: MQTT 3.1.1 client and the reconnecting session used by the
//!   connection manager
//!
//! Both work with any type implementing [`Connection`](crate::network::Connection)
//! and use fixed-size buffers only.

/// HTTP/1.1 client and URL-driven connector.
pub mod http;

/// MQTT 3.1.1 client and session.
pub mod mqtt;
