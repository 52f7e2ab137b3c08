use criterion::{BatchSize, Criterion, Throughput};
use kinton::network::application::mqtt::client::{Client, Options};
use kinton::network::{Close, Connection, Read, ReadReady, Write};
use std::collections::VecDeque;

/// A connection replaying a canned broker stream and discarding writes.
struct Replay {
    inbound: VecDeque<u8>,
}

impl Read for Replay {
    type Error = ();
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl ReadReady for Replay {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.inbound.is_empty())
    }
}

impl Write for Replay {
    type Error = ();
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for Replay {
    type Error = ();
    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Connection for Replay {}

fn publish(topic: &str, payload: &[u8], packet_id: Option<u16>) -> Vec<u8> {
    let mut body = (topic.len() as u16).to_be_bytes().to_vec();
    body.extend_from_slice(topic.as_bytes());
    if let Some(id) = packet_id {
        body.extend_from_slice(&id.to_be_bytes());
    }
    body.extend_from_slice(payload);
    assert!(body.len() < 128, "single byte remaining length only");

    let header = if packet_id.is_some() { 0x32 } else { 0x30 };
    let mut packet = vec![header, body.len() as u8];
    packet.extend_from_slice(&body);
    packet
}

fn setup_client(messages: usize, qos1: bool) -> Client<Replay> {
    let mut inbound: VecDeque<u8> = [0x20, 0x02, 0x00, 0x00].into_iter().collect();
    for i in 0..messages {
        let packet_id = qos1.then_some(i as u16 + 1);
        inbound.extend(publish("fleet/mote/valve", b"open", packet_id));
    }
    let options = Options {
        client_id: "kinton-bench",
        keep_alive_seconds: 60,
        clean_session: true,
        username: Some("bench-uuid"),
        password: Some("bench-secret"),
    };
    Client::connect(Replay { inbound }, options).expect("Failed to connect")
}

fn bench_poll(c: &mut Criterion, name: &str, qos1: bool) {
    let mut group = c.benchmark_group(name);
    group.throughput(Throughput::Elements(50));
    group.bench_function(name, |b| {
        b.iter_batched_ref(
            || setup_client(50, qos1),
            |client| {
                while client.poll().expect("Failed to poll").is_some() {}
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_poll_qos0(c: &mut Criterion) {
    bench_poll(c, "poll_qos0", false);
}

pub fn bench_poll_qos1(c: &mut Criterion) {
    bench_poll(c, "poll_qos1", true);
}
