//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use kinton::cloud::{Error as CloudError, HttpPost, InboundHandler, Session};
use kinton::network::application::http::Response;
use kinton::network::error::Error;
use kinton::network::{Close, Connect, Connection, Read, ReadReady, Write};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Both directions of a fake socket, shared between the test and the
/// connections handed out by [`MockNetwork`].
#[derive(Debug, Default)]
pub struct Wire {
    /// Bytes the peer will send, in order.
    pub inbound: VecDeque<u8>,
    /// Everything the code under test wrote.
    pub outbound: Vec<u8>,
    /// Remotes dialled, in order.
    pub dialled: Vec<String>,
    /// Connections closed so far.
    pub closes: usize,
    /// Reads fail once the inbound script is exhausted.
    pub fail_when_drained: bool,
    /// The peer has hung up; reported as ready so the end of stream is read.
    pub peer_closed: bool,
    /// Replies still in flight. One chunk lands each time the code under test
    /// blocks on an empty wire or finds it not ready.
    pub late: VecDeque<Vec<u8>>,
}

impl Wire {
    pub fn feed(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    pub fn feed_late(&mut self, bytes: &[u8]) {
        self.late.push_back(bytes.to_vec());
    }

    pub fn take_outbound(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.outbound)
    }
}

pub type SharedWire = Rc<RefCell<Wire>>;

#[derive(Debug)]
pub struct MockConnection {
    wire: SharedWire,
}

impl Read for MockConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.inbound.is_empty() {
            if let Some(chunk) = wire.late.pop_front() {
                wire.feed(&chunk);
            }
        }
        if wire.inbound.is_empty() && wire.fail_when_drained {
            return Err(Error::ReadError);
        }
        // A drained wire reads as end of stream.
        let n = buf.len().min(wire.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(wire.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl ReadReady for MockConnection {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if !wire.inbound.is_empty() || wire.fail_when_drained {
            return Ok(true);
        }
        if let Some(chunk) = wire.late.pop_front() {
            wire.feed(&chunk);
            return Ok(false);
        }
        Ok(wire.peer_closed)
    }
}

impl Write for MockConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.wire.borrow_mut().outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for MockConnection {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        self.wire.borrow_mut().closes += 1;
        Ok(())
    }
}

impl Connection for MockConnection {}

#[derive(Debug, Clone, Default)]
pub struct MockNetwork {
    pub wire: SharedWire,
    pub refuse: bool,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Connect for MockNetwork {
    type Connection = MockConnection;
    type Error = Error;

    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error> {
        self.wire.borrow_mut().dialled.push(remote.to_string());
        if self.refuse {
            return Err(Error::ConnectionRefused);
        }
        Ok(MockConnection {
            wire: Rc::clone(&self.wire),
        })
    }
}

/// Canned registration endpoint.
#[derive(Debug, Default)]
pub struct MockHttp {
    pub status: u16,
    pub body: Vec<u8>,
    pub down: bool,
    pub urls: Vec<String>,
}

impl MockHttp {
    pub fn answering(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.as_bytes().to_vec(),
            ..Default::default()
        }
    }
}

impl HttpPost for MockHttp {
    type Error = Error;

    fn post(&mut self, url: &str) -> Result<Response, Self::Error> {
        self.urls.push(url.to_string());
        if self.down {
            return Err(Error::ConnectionRefused);
        }
        Ok(Response {
            status_code: self.status,
            headers: heapless::Vec::new(),
            body: heapless::Vec::from_slice(&self.body).map_err(|_| Error::BufferOverflow)?,
        })
    }
}

/// What a [`MockSession`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect {
        client_id: String,
        username: Option<String>,
        password: Option<String>,
    },
    Subscribe(String),
    Poll,
    Disconnect,
}

/// Scriptable broker session.
#[derive(Debug, Default)]
pub struct MockSession {
    pub open: bool,
    pub refuse_connect: bool,
    pub refuse_subscribe: Vec<String>,
    pub fail_poll: bool,
    /// Delivered on the next poll.
    pub inbound: VecDeque<(String, Vec<u8>)>,
    /// Handed over while subscribing to the matching topic.
    pub retained: Vec<(String, Vec<u8>)>,
    pub calls: Vec<Call>,
}

impl MockSession {
    pub fn deliver(&mut self, topic: &str, payload: &[u8]) {
        self.inbound.push_back((topic.to_string(), payload.to_vec()));
    }

    pub fn subscriptions(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Subscribe(topic) => Some(topic.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Connect { .. }))
            .count()
    }
}

impl Session for MockSession {
    fn connect(
        &mut self,
        client_id: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), CloudError> {
        self.calls.push(Call::Connect {
            client_id: client_id.to_string(),
            username: username.map(str::to_string),
            password: password.map(str::to_string),
        });
        if self.refuse_connect {
            return Err(CloudError::Connect);
        }
        self.open = true;
        Ok(())
    }

    fn subscribe(
        &mut self,
        topic: &str,
        handler: &mut dyn InboundHandler,
    ) -> Result<(), CloudError> {
        self.calls.push(Call::Subscribe(topic.to_string()));
        if self.refuse_subscribe.iter().any(|t| t == topic) {
            return Err(CloudError::Subscribe);
        }
        if let Some(payload) = self.retained.iter().find(|(t, _)| t == topic).map(|(_, p)| p) {
            handler.on_message(topic, payload);
        }
        Ok(())
    }

    fn connected(&self) -> bool {
        self.open
    }

    fn poll(&mut self, handler: &mut dyn InboundHandler) -> Result<(), CloudError> {
        self.calls.push(Call::Poll);
        if self.fail_poll {
            self.open = false;
            return Err(CloudError::Poll);
        }
        while let Some((topic, payload)) = self.inbound.pop_front() {
            handler.on_message(&topic, &payload);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.calls.push(Call::Disconnect);
        self.open = false;
    }
}

/// An encoded MQTT PUBLISH as a broker would send it.
pub fn publish_packet(topic: &str, payload: &[u8], packet_id: Option<u16>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(topic.len() as u16).to_be_bytes());
    body.extend_from_slice(topic.as_bytes());
    if let Some(id) = packet_id {
        body.extend_from_slice(&id.to_be_bytes());
    }
    body.extend_from_slice(payload);

    let header = if packet_id.is_some() { 0x32 } else { 0x30 };
    let mut packet = vec![header];
    let mut len = body.len();
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        packet.push(byte);
        if len == 0 {
            break;
        }
    }
    packet.extend_from_slice(&body);
    packet
}

pub const CONNACK_ACCEPTED: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

pub fn suback(packet_id: u16, code: u8) -> [u8; 5] {
    let id = packet_id.to_be_bytes();
    [0x90, 0x03, id[0], id[1], code]
}
