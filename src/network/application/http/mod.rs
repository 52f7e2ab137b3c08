//! HTTP/1.1 support for fleet registration.
//!
//! The registration exchange is a single `POST` with an empty body, so this is
//! deliberately small: one request per connection, `Connection: close`, fixed
//! size buffers for both directions.
//!
//! ```rust,no_run
//! use kinton::network::application::http::{Client, Request, Method};
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
//! let mut client = Client::new(MockConnection);
//!
//! let request = Request {
//!     method: Method::Post,
//!     path: "/api/fleets/my-fleet/registerMote",
//!     headers: heapless::Vec::new(),
//!     body: None,
//! };
//!
//! // let response = client.request(&request)?;
//! ```

/// HTTP client implementation and supporting types.
pub mod client;

pub use client::{Client, Connector, Header, Method, Request, Response, Url};
