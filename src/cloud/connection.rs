//! Keeps the broker session alive and feeds inbound messages to the registry.
//!
//! Nothing here blocks beyond what the session's own calls do and nothing
//! retries on its own; the caller's loop calls [`ConnectionManager::tick`] and
//! each tick either services the live session or makes one attempt to bring
//! it back.

use super::credentials::Credentials;
use super::error::Error;
use super::topics::{InboundHandler, MAX_TOPIC_LEN, TopicRegistry};
use heapless::String;

/// A publish/subscribe session with the broker.
///
/// [`MqttSession`](crate::network::application::mqtt::MqttSession) is the
/// bundled implementation.
pub trait Session {
    /// Opens the session. `username`/`password` are the device identity and
    /// secret, `None` while they are unknown.
    fn connect(
        &mut self,
        client_id: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), Error>;

    /// Subscribes to exactly `topic`.
    ///
    /// Messages received before the broker confirms the subscription go to
    /// `handler`.
    fn subscribe(&mut self, topic: &str, handler: &mut dyn InboundHandler) -> Result<(), Error>;

    /// Whether the session is believed to be open.
    fn connected(&self) -> bool;

    /// Services the session once, handing every received message to `handler`.
    fn poll(&mut self, handler: &mut dyn InboundHandler) -> Result<(), Error>;

    /// Closes the session. Closing a closed session is a no-op.
    fn disconnect(&mut self);
}

impl<T: Session + ?Sized> Session for &mut T {
    fn connect(
        &mut self,
        client_id: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), Error> {
        (**self).connect(client_id, username, password)
    }

    fn subscribe(&mut self, topic: &str, handler: &mut dyn InboundHandler) -> Result<(), Error> {
        (**self).subscribe(topic, handler)
    }

    fn connected(&self) -> bool {
        (**self).connected()
    }

    fn poll(&mut self, handler: &mut dyn InboundHandler) -> Result<(), Error> {
        (**self).poll(handler)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }
}

/// Where the manager stands with its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No session; the next tick connects.
    Disconnected,
    /// Session open and every bound topic subscribed.
    Connected,
}

/// Drives a [`Session`] from the caller's loop.
#[derive(Debug)]
pub struct ConnectionManager<S: Session> {
    session: S,
    state: State,
}

impl<S: Session> ConnectionManager<S> {
    /// Wraps a closed session.
    pub fn new(session: S) -> Self {
        Self {
            session,
            state: State::Disconnected,
        }
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The wrapped session.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// The wrapped session, mutably.
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// One step of the connection loop.
    ///
    /// When the session is down, connect with `credentials` and subscribe to
    /// every distinct topic in `registry`; a failure at either step ends the
    /// tick. Then poll the session, dispatching inbound messages through
    /// `registry`.
    pub fn tick<const N: usize>(
        &mut self,
        client_id: &str,
        registry: &mut TopicRegistry<'_, N>,
        credentials: &Credentials,
    ) -> Result<(), Error> {
        if !self.session.connected() {
            self.state = State::Disconnected;
            self.establish(client_id, registry, credentials)?;
        }

        if let Err(err) = self.session.poll(registry) {
            warn!("connection: poll failed: {}", err);
            self.session.disconnect();
            self.state = State::Disconnected;
            return Err(Error::Poll);
        }
        Ok(())
    }

    fn establish<const N: usize>(
        &mut self,
        client_id: &str,
        registry: &mut TopicRegistry<'_, N>,
        credentials: &Credentials,
    ) -> Result<(), Error> {
        debug!("connection: connecting as {}", client_id);
        if let Err(err) =
            self.session
                .connect(client_id, credentials.identity(), credentials.secret())
        {
            warn!("connection: connect failed: {}", err);
            return Err(Error::Connect);
        }

        // Copied out so the registry can take messages while subscribing.
        let mut index = 0;
        loop {
            let topic: String<MAX_TOPIC_LEN> = match registry.subscriptions().nth(index) {
                Some(topic) => String::try_from(topic).map_err(|_| Error::TopicTooLong)?,
                None => break,
            };
            index += 1;
            if let Err(err) = self.session.subscribe(&topic, registry) {
                warn!("connection: subscribe to {} failed: {}", topic.as_str(), err);
                self.session.disconnect();
                return Err(Error::Subscribe);
            }
            debug!("connection: subscribed to {}", topic.as_str());
        }

        info!("connection: connected, {} topics bound", registry.len());
        self.state = State::Connected;
        Ok(())
    }
}
