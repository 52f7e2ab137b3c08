//! # Kinton device context
//!
//! [`Device`] ties together what a mote needs to talk to the Kinton cloud:
//! its [`Credentials`], a [`TopicRegistry`] of callbacks, and a
//! [`ConnectionManager`] that keeps the broker session up from the caller's
//! loop.
//!
//! ```rust,no_run
//! use kinton::cloud::{Config, Device};
//! use kinton::network::application::http::Connector;
//! use kinton::network::application::mqtt::MqttSession;
//! # use kinton::network::{Close, Connect, Connection, Read, ReadReady, Write};
//! # #[derive(Debug)] struct Tcp;
//! # #[derive(Debug)] struct Socket;
//! # impl Connection for Socket {}
//! # impl Read for Socket { type Error = (); fn read(&mut self, _: &mut [u8]) -> Result<usize, ()> { Ok(0) } }
//! # impl ReadReady for Socket { fn read_ready(&mut self) -> Result<bool, ()> { Ok(false) } }
//! # impl Write for Socket { type Error = (); fn write(&mut self, b: &[u8]) -> Result<usize, ()> { Ok(b.len()) } fn flush(&mut self) -> Result<(), ()> { Ok(()) } }
//! # impl Close for Socket { type Error = (); fn close(self) -> Result<(), ()> { Ok(()) } }
//! # impl Connect for Tcp { type Connection = Socket; type Error = (); fn connect(&mut self, _: &str) -> Result<Socket, ()> { Ok(Socket) } }
//! # fn main() -> Result<(), kinton::cloud::Error> {
//! let config = Config::default().with_client_id("greenhouse-7");
//! let session = MqttSession::from_config(Tcp, &config)?;
//! let mut valve = |payload: &[u8]| {
//!     let _open = payload == b"open";
//! };
//!
//! let mut device: Device<'_, _, _> = Device::new(config, session, Connector::new(Tcp));
//! device.register_device("fleet-key")?;
//! device.on("greenhouse/valve", &mut valve)?;
//!
//! loop {
//!     if device.tick().is_err() {
//!         // back off before the next attempt
//!     }
//! }
//! # }
//! ```

/// Device configuration.
pub mod config;
/// Broker session management.
pub mod connection;
/// Device identity and secret.
pub mod credentials;
/// Error type for device operations.
pub mod error;
/// Fleet registration.
pub mod registration;
/// Topic to callback registry.
pub mod topics;

pub use config::Config;
pub use connection::{ConnectionManager, Session, State};
pub use credentials::Credentials;
pub use error::Error;
pub use registration::HttpPost;
pub use topics::{DEFAULT_TOPIC_CAPACITY, InboundHandler, TopicCallback, TopicRegistry};

use crate::storage::{BlockingErase, ReadStorage, Storage};

/// A Kinton mote.
///
/// `S` carries the broker session, `H` the registration `POST`, and `N` is
/// the compile-time topic slot count.
#[derive(Debug)]
pub struct Device<'a, S: Session, H: HttpPost, const N: usize = DEFAULT_TOPIC_CAPACITY> {
    config: Config<'a>,
    credentials: Credentials,
    registry: TopicRegistry<'a, N>,
    manager: ConnectionManager<S>,
    http: H,
}

impl<'a, S: Session, H: HttpPost, const N: usize> Device<'a, S, H, N> {
    /// A device with unset credentials, no bindings and a closed session.
    pub fn new(config: Config<'a>, session: S, http: H) -> Self {
        Self {
            registry: TopicRegistry::with_capacity(config.topic_capacity),
            config,
            credentials: Credentials::new(),
            manager: ConnectionManager::new(session),
            http,
        }
    }

    /// Registers with the fleet identified by `fleet_key` and adopts the
    /// returned identity and secret.
    ///
    /// On failure the current credentials are left as they were.
    pub fn register_device(&mut self, fleet_key: &str) -> Result<(), Error> {
        self.credentials =
            registration::register(&mut self.http, self.config.registration_base_url, fleet_key)?;
        Ok(())
    }

    /// Sets identity and secret directly, replacing any previous values.
    pub fn set_credentials(&mut self, identity: &str, secret: &str) -> Result<(), Error> {
        self.credentials.set(identity, secret)
    }

    /// The device identity, if known.
    pub fn identity(&self) -> Option<&str> {
        self.credentials.identity()
    }

    /// The device secret, if known.
    pub fn secret(&self) -> Option<&str> {
        self.credentials.secret()
    }

    /// Both credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Binds `callback` to `topic`. See [`TopicRegistry::on`].
    ///
    /// A topic bound while connected is subscribed on the next reconnect.
    pub fn on(&mut self, topic: &str, callback: &'a mut dyn TopicCallback) -> Result<(), Error> {
        self.registry.on(topic, callback)
    }

    /// Runs one step of the connection loop. See [`ConnectionManager::tick`].
    pub fn tick(&mut self) -> Result<(), Error> {
        self.manager
            .tick(self.config.client_id, &mut self.registry, &self.credentials)
    }

    /// Persists the credentials at `offset` in `storage`.
    pub fn save_credentials<St: Storage + BlockingErase>(
        &self,
        storage: &mut St,
        offset: u32,
    ) -> Result<(), Error> {
        self.credentials.save(storage, offset)
    }

    /// Adopts credentials persisted at `offset` in `storage`.
    ///
    /// On failure the current credentials are left as they were.
    pub fn load_credentials<St: ReadStorage>(
        &mut self,
        storage: &mut St,
        offset: u32,
    ) -> Result<(), Error> {
        self.credentials = Credentials::load(storage, offset)?;
        Ok(())
    }

    /// Connection state.
    pub fn state(&self) -> State {
        self.manager.state()
    }

    /// The configuration the device was built with.
    pub fn config(&self) -> &Config<'a> {
        &self.config
    }

    /// The topic bindings.
    pub fn topics(&self) -> &TopicRegistry<'a, N> {
        &self.registry
    }

    /// The broker session.
    pub fn session(&self) -> &S {
        self.manager.session()
    }

    /// The broker session, mutably (e.g. to send keep-alive pings).
    pub fn session_mut(&mut self) -> &mut S {
        self.manager.session_mut()
    }

    /// The registration transport, mutably.
    pub fn http_mut(&mut self) -> &mut H {
        &mut self.http
    }
}
