//! [`Session`] over the bundled MQTT [`Client`].

use super::client::{Client, Options, PublishPacket, QoS};
use crate::cloud::config::MAX_REMOTE_LEN;
use crate::cloud::connection::Session;
use crate::cloud::topics::InboundHandler;
use crate::cloud::{Config, Error};
use crate::network::Connect;
use crate::network::error::Error as NetworkError;
use core::fmt;
use heapless::String;

/// Messages handed to the handler per [`Session::poll`] call at most, so one
/// busy topic cannot keep the caller's loop from running.
pub const MAX_MESSAGES_PER_POLL: usize = 8;

/// A broker session that reconnects through `N` whenever it is (re)opened.
pub struct MqttSession<N: Connect> {
    network: N,
    remote: String<MAX_REMOTE_LEN>,
    keep_alive_seconds: u16,
    client: Option<Client<N::Connection>>,
}

impl<N: Connect> MqttSession<N> {
    /// A closed session that will dial `remote` (`host:port`).
    pub fn new(network: N, remote: &str, keep_alive_seconds: u16) -> Result<Self, Error> {
        Ok(Self {
            network,
            remote: String::try_from(remote).map_err(|_| Error::ConfigTooLong)?,
            keep_alive_seconds,
            client: None,
        })
    }

    /// A closed session for the broker and keep-alive in `config`.
    pub fn from_config(network: N, config: &Config) -> Result<Self, Error> {
        let remote = config.broker_remote()?;
        Self::new(network, &remote, config.keep_alive_seconds)
    }

    /// The `host:port` this session dials.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Sends a keep-alive `PINGREQ`.
    ///
    /// There is no clock in here; call this at least every keep-alive interval
    /// while connected. A failure drops the session.
    pub fn ping(&mut self) -> Result<(), NetworkError> {
        let client = self.client.as_mut().ok_or(NetworkError::NotOpen)?;
        let result = client.ping();
        if result.is_err() {
            self.client = None;
        }
        result
    }

    /// Publishes `payload` on `topic` at QoS 0.
    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), NetworkError> {
        let client = self.client.as_mut().ok_or(NetworkError::NotOpen)?;
        let result = client.publish(topic, payload, QoS::AtMostOnce);
        if result.is_err() {
            self.client = None;
        }
        result
    }
}

impl<N: Connect> Session for MqttSession<N> {
    fn connect(
        &mut self,
        client_id: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), Error> {
        self.disconnect();

        let connection = self.network.connect(&self.remote).map_err(|_| {
            warn!("mqtt: cannot reach {}", self.remote.as_str());
            Error::Connect
        })?;
        let options = Options {
            client_id,
            keep_alive_seconds: self.keep_alive_seconds,
            clean_session: true,
            username,
            password,
        };
        let client = Client::connect(connection, options).map_err(|err| {
            warn!("mqtt: CONNECT rejected: {}", err);
            Error::Connect
        })?;
        self.client = Some(client);
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, handler: &mut dyn InboundHandler) -> Result<(), Error> {
        let client = self.client.as_mut().ok_or(Error::Subscribe)?;
        let deliver = |publish: &PublishPacket| handler.on_message(&publish.topic, &publish.payload);
        client.subscribe(topic, QoS::AtMostOnce, deliver).map_err(|err| {
            warn!("mqtt: SUBSCRIBE {} failed: {}", topic, err);
            Error::Subscribe
        })
    }

    fn connected(&self) -> bool {
        self.client.as_ref().is_some_and(Client::is_connected)
    }

    fn poll(&mut self, handler: &mut dyn InboundHandler) -> Result<(), Error> {
        let client = self.client.as_mut().ok_or(Error::Poll)?;
        for _ in 0..MAX_MESSAGES_PER_POLL {
            match client.poll() {
                Ok(Some(publish)) => handler.on_message(&publish.topic, &publish.payload),
                Ok(None) => break,
                Err(err) => {
                    warn!("mqtt: session lost: {}", err);
                    self.client = None;
                    return Err(Error::Poll);
                }
            }
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(client) = self.client.take() {
            if client.disconnect().is_err() {
                debug!("mqtt: DISCONNECT on a dead connection");
            }
        }
    }
}

impl<N: Connect> fmt::Debug for MqttSession<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttSession")
            .field("remote", &self.remote.as_str())
            .field("keep_alive_seconds", &self.keep_alive_seconds)
            .field("connected", &self.connected())
            .finish_non_exhaustive()
    }
}
