//! A blocking MQTT 3.1.1 client over any [`Connection`].
//!
//! Only the subset a Kinton device needs is implemented: CONNECT with
//! username/password, SUBSCRIBE, QoS 0/1 PUBLISH in both directions, PINGREQ
//! and DISCONNECT. Packets are read whole into fixed-size buffers.
use crate::network::error::Error;
use crate::network::{Connection, read_exact, write_all};
use heapless::{String, Vec};

// MQTT Control Packet types (first byte, flags included where fixed)
const CONNECT: u8 = 0x10;
const CONNACK: u8 = 0x20;
const PUBLISH: u8 = 0x30;
const PUBACK: u8 = 0x40;
const SUBSCRIBE: u8 = 0x82;
const SUBACK: u8 = 0x90;
const PINGREQ: u8 = 0xC0;
const DISCONNECT: u8 = 0xE0;

const PROTOCOL_NAME: &[u8] = b"MQTT";
const PROTOCOL_LEVEL: u8 = 4; // MQTT 3.1.1

const FLAG_USERNAME: u8 = 0x80;
const FLAG_PASSWORD: u8 = 0x40;
const FLAG_CLEAN_SESSION: u8 = 0x02;

/// SUBACK return code signalling a refused subscription.
const SUBACK_FAILURE: u8 = 0x80;

/// Longest topic accepted in either direction.
pub const MAX_TOPIC_LEN: usize = 256;
/// Largest payload accepted in either direction.
pub const MAX_PAYLOAD_LEN: usize = 1024;
/// Largest packet body (everything after the fixed header).
pub const MAX_PACKET_LEN: usize = 2 + MAX_TOPIC_LEN + 2 + MAX_PAYLOAD_LEN;

/// An incoming publish.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublishPacket {
    /// The topic on which the message was published.
    pub topic: String<MAX_TOPIC_LEN>,
    /// The message payload.
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

/// Quality of Service levels for MQTT messages.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum QoS {
    /// Fire and forget.
    AtMostOnce = 0,
    /// Acknowledged delivery.
    AtLeastOnce = 1,
}

/// Options for the CONNECT handshake.
#[derive(Debug, Clone)]
pub struct Options<'a> {
    /// The client identifier, must be unique per broker.
    pub client_id: &'a str,
    /// The keep-alive interval in seconds, 0 disables it.
    pub keep_alive_seconds: u16,
    /// Whether the broker should discard previous session state.
    pub clean_session: bool,
    /// Username, the device identity on Kinton.
    pub username: Option<&'a str>,
    /// Password, the device secret on Kinton. Ignored without a username.
    pub password: Option<&'a str>,
}

/// An MQTT 3.1.1 client.
#[derive(Debug)]
pub struct Client<C: Connection> {
    connection: C,
    is_connected: bool,
    next_packet_id: u16,
}

impl<C: Connection> Client<C> {
    /// Sends `CONNECT` over `connection` and waits for a successful `CONNACK`.
    pub fn connect(mut connection: C, options: Options) -> Result<Self, Error> {
        let mut packet: Vec<u8, MAX_PACKET_LEN> = Vec::new();

        // --- Variable Header ---
        put_str(&mut packet, PROTOCOL_NAME)?;
        put(&mut packet, &[PROTOCOL_LEVEL])?;

        let mut connect_flags = 0;
        if options.clean_session {
            connect_flags |= FLAG_CLEAN_SESSION;
        }
        if options.username.is_some() {
            connect_flags |= FLAG_USERNAME;
            if options.password.is_some() {
                connect_flags |= FLAG_PASSWORD;
            }
        }
        put(&mut packet, &[connect_flags])?;
        put(&mut packet, &options.keep_alive_seconds.to_be_bytes())?;

        // --- Payload ---
        put_str(&mut packet, options.client_id.as_bytes())?;
        if let Some(username) = options.username {
            put_str(&mut packet, username.as_bytes())?;
            if let Some(password) = options.password {
                put_str(&mut packet, password.as_bytes())?;
            }
        }

        write_packet(&mut connection, CONNECT, &packet)?;

        let mut connack = [0u8; 4];
        read_exact(&mut connection, &mut connack)?;
        if connack[0] != CONNACK || connack[1] != 2 {
            return Err(Error::ProtocolError);
        }

        match connack[3] {
            0 => Ok(Self {
                connection,
                is_connected: true,
                next_packet_id: 1,
            }),
            1..=5 => Err(Error::ConnectionRefused),
            _ => Err(Error::ProtocolError),
        }
    }

    /// Whether the connection is still believed to be alive.
    ///
    /// Flips to `false` after any transport or framing error.
    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// Publishes a message.
    pub fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), Error> {
        let mut packet: Vec<u8, MAX_PACKET_LEN> = Vec::new();
        put_str(&mut packet, topic.as_bytes())?;
        if qos == QoS::AtLeastOnce {
            let packet_id = self.take_packet_id();
            put(&mut packet, &packet_id.to_be_bytes())?;
        }
        put(&mut packet, payload)?;

        let result = write_packet(&mut self.connection, PUBLISH | ((qos as u8) << 1), &packet);
        self.track(result)
    }

    /// Subscribes to a topic filter and waits for its `SUBACK`.
    ///
    /// Publishes that overtake the `SUBACK`, typically retained messages for
    /// filters subscribed just before, are handed to `on_publish` as they
    /// arrive.
    pub fn subscribe<F>(&mut self, topic: &str, qos: QoS, mut on_publish: F) -> Result<(), Error>
    where
        F: FnMut(&PublishPacket),
    {
        let packet_id = self.take_packet_id();

        let mut packet: Vec<u8, MAX_PACKET_LEN> = Vec::new();
        put(&mut packet, &packet_id.to_be_bytes())?;
        put_str(&mut packet, topic.as_bytes())?;
        put(&mut packet, &[qos as u8])?;

        let result = write_packet(&mut self.connection, SUBSCRIBE, &packet);
        self.track(result)?;

        loop {
            let result = self.next_packet(true);
            let (header, body) = match self.track(result)? {
                Some(packet) => packet,
                None => continue,
            };
            match header & 0xF0 {
                SUBACK => {
                    if body.len() != 3 || u16::from_be_bytes([body[0], body[1]]) != packet_id {
                        self.is_connected = false;
                        return Err(Error::ProtocolError);
                    }
                    return match body[2] {
                        SUBACK_FAILURE => Err(Error::ConnectionRefused),
                        _ => Ok(()),
                    };
                }
                PUBLISH => {
                    let result = self.accept_publish(header, &body);
                    if let Some(publish) = self.track(result)? {
                        on_publish(&publish);
                    }
                }
                _ => {}
            }
        }
    }

    /// Returns the next incoming publish, or `None` when nothing is waiting.
    ///
    /// Never blocks waiting for a packet to start; once a packet header has
    /// been read, the rest of the packet is read to completion. A peer that
    /// closed the stream fails with [`Error::ConnectionClosed`].
    pub fn poll(&mut self) -> Result<Option<PublishPacket>, Error> {
        loop {
            let result = self.next_packet(false);
            let (header, body) = match self.track(result)? {
                Some(packet) => packet,
                None => return Ok(None),
            };
            if header & 0xF0 == PUBLISH {
                let result = self.accept_publish(header, &body);
                if let Some(publish) = self.track(result)? {
                    return Ok(Some(publish));
                }
            }
            // PINGRESP, late SUBACKs and PUBACKs carry nothing for us.
        }
    }

    /// Sends `PINGREQ`. The `PINGRESP` is consumed by a later [`poll`](Self::poll).
    pub fn ping(&mut self) -> Result<(), Error> {
        let result = write_packet(&mut self.connection, PINGREQ, &[]);
        self.track(result)
    }

    /// Sends `DISCONNECT` and closes the connection.
    pub fn disconnect(mut self) -> Result<(), Error> {
        let sent = write_packet(&mut self.connection, DISCONNECT, &[]);
        let closed = self.connection.close().map_err(|_| Error::ConnectionClosed);
        sent.and(closed)
    }

    fn take_packet_id(&mut self) -> u16 {
        let id = self.next_packet_id;
        self.next_packet_id = match id.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        id
    }

    fn track<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if result.is_err() {
            self.is_connected = false;
        }
        result
    }

    /// Decodes a PUBLISH and acknowledges it when QoS 1.
    ///
    /// Returns `None` for a publish that does not fit our buffers.
    fn accept_publish(&mut self, header: u8, body: &[u8]) -> Result<Option<PublishPacket>, Error> {
        let (publish, packet_id) = match decode_publish(header, body)? {
            Decoded::Publish(publish, packet_id) => (publish, packet_id),
            Decoded::Oversized(packet_id) => {
                warn!("mqtt: dropping publish that exceeds local buffers");
                if let Some(packet_id) = packet_id {
                    write_packet(&mut self.connection, PUBACK, &packet_id.to_be_bytes())?;
                }
                return Ok(None);
            }
        };
        if let Some(packet_id) = packet_id {
            write_packet(&mut self.connection, PUBACK, &packet_id.to_be_bytes())?;
        }
        Ok(Some(publish))
    }

    /// Reads one whole packet. `None` means no packet has started yet, which
    /// only happens without `blocking`.
    fn next_packet(&mut self, blocking: bool) -> Result<Option<(u8, Vec<u8, MAX_PACKET_LEN>)>, Error> {
        if !blocking && !self.connection.read_ready().map_err(|_| Error::ReadError)? {
            return Ok(None);
        }
        let mut header = [0u8; 1];
        read_exact(&mut self.connection, &mut header)?;

        let remaining_len = self.read_remaining_length()?;
        let mut body: Vec<u8, MAX_PACKET_LEN> = Vec::new();
        if remaining_len > body.capacity() {
            // Keep the stream in sync, then hand back a truncated body so the
            // caller can still see the header. An empty body decodes as oversized.
            self.discard(remaining_len)?;
            return Ok(Some((header[0], body)));
        }
        body.resize(remaining_len, 0)
            .map_err(|_| Error::BufferOverflow)?;
        read_exact(&mut self.connection, &mut body)?;
        Ok(Some((header[0], body)))
    }

    fn read_remaining_length(&mut self) -> Result<usize, Error> {
        let mut value = 0usize;
        let mut multiplier = 1usize;
        for _ in 0..4 {
            let mut byte = [0u8; 1];
            read_exact(&mut self.connection, &mut byte)?;
            value += (byte[0] & 0x7F) as usize * multiplier;
            if byte[0] & 0x80 == 0 {
                return Ok(value);
            }
            multiplier *= 128;
        }
        Err(Error::ProtocolError)
    }

    fn discard(&mut self, mut len: usize) -> Result<(), Error> {
        let mut sink = [0u8; 64];
        while len > 0 {
            let n = len.min(sink.len());
            read_exact(&mut self.connection, &mut sink[..n])?;
            len -= n;
        }
        Ok(())
    }
}

enum Decoded {
    Publish(PublishPacket, Option<u16>),
    Oversized(Option<u16>),
}

fn decode_publish(header: u8, body: &[u8]) -> Result<Decoded, Error> {
    let qos = (header >> 1) & 0x03;
    // QoS 2 is never requested and would need PUBREC, not PUBACK.
    if qos > 1 {
        return Err(Error::ProtocolError);
    }
    if body.is_empty() {
        return Ok(Decoded::Oversized(None));
    }
    if body.len() < 2 {
        return Err(Error::ProtocolError);
    }
    let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
    let mut cursor = 2 + topic_len;
    let topic_bytes = body.get(2..cursor).ok_or(Error::ProtocolError)?;

    let packet_id = if qos > 0 {
        let id = body.get(cursor..cursor + 2).ok_or(Error::ProtocolError)?;
        cursor += 2;
        Some(u16::from_be_bytes([id[0], id[1]]))
    } else {
        None
    };

    let topic = core::str::from_utf8(topic_bytes).map_err(|_| Error::ProtocolError)?;
    let (Ok(topic), Ok(payload)) = (String::try_from(topic), Vec::from_slice(&body[cursor..]))
    else {
        return Ok(Decoded::Oversized(packet_id));
    };
    Ok(Decoded::Publish(PublishPacket { topic, payload }, packet_id))
}

fn put(packet: &mut Vec<u8, MAX_PACKET_LEN>, bytes: &[u8]) -> Result<(), Error> {
    packet
        .extend_from_slice(bytes)
        .map_err(|_| Error::BufferOverflow)
}

/// Appends a length-prefixed MQTT string.
fn put_str(packet: &mut Vec<u8, MAX_PACKET_LEN>, bytes: &[u8]) -> Result<(), Error> {
    let len = u16::try_from(bytes.len()).map_err(|_| Error::BufferOverflow)?;
    put(packet, &len.to_be_bytes())?;
    put(packet, bytes)
}

fn write_packet<C: Connection>(connection: &mut C, header: u8, body: &[u8]) -> Result<(), Error> {
    let mut fixed_header: Vec<u8, 5> = Vec::new();
    fixed_header
        .push(header)
        .map_err(|_| Error::BufferOverflow)?;
    encode_remaining_length(&mut fixed_header, body.len()).map_err(|_| Error::BufferOverflow)?;

    write_all(connection, &fixed_header)?;
    write_all(connection, body)?;
    connection.flush().map_err(|_| Error::WriteError)
}

/// Encodes the remaining length field for an MQTT packet.
fn encode_remaining_length(buf: &mut Vec<u8, 5>, mut len: usize) -> Result<(), ()> {
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        buf.push(byte).map_err(|_| ())?;
        if len == 0 {
            break;
        }
    }
    Ok(())
}
