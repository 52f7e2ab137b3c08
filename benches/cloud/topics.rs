use criterion::{BenchmarkId, Criterion};
use kinton::cloud::TopicRegistry;
use std::cell::Cell;
use std::hint::black_box;

const SLOTS: usize = 32;

fn topic_names() -> Vec<String> {
    (0..SLOTS).map(|i| format!("fleet/mote/{i}")).collect()
}

pub fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let topics = topic_names();
    let hits = Cell::new(0u64);
    let mut callbacks: Vec<_> = (0..SLOTS)
        .map(|_| |payload: &[u8]| hits.set(hits.get() + payload.len() as u64))
        .collect();

    let mut registry: TopicRegistry<'_, SLOTS> = TopicRegistry::new();
    for (topic, callback) in topics.iter().zip(callbacks.iter_mut()) {
        registry.on(topic, callback).expect("registry sized for all topics");
    }

    for slot in [0, SLOTS / 2, SLOTS - 1] {
        let topic = topics[slot].as_str();
        group.bench_with_input(BenchmarkId::new("hit", slot), &topic, |b, topic| {
            b.iter(|| registry.dispatch(black_box(topic), black_box(b"22.5")))
        });
    }
    group.bench_function("miss", |b| {
        b.iter(|| registry.dispatch(black_box("fleet/mote/none"), black_box(b"22.5")))
    });
    group.finish();
}

pub fn bench_subscriptions(c: &mut Criterion) {
    let topics = topic_names();
    let mut callbacks = [|_: &[u8]| {}; SLOTS];
    let mut registry: TopicRegistry<'_, SLOTS> = TopicRegistry::new();
    for (topic, callback) in topics.iter().zip(callbacks.iter_mut()) {
        registry.on(topic, callback).expect("registry sized for all topics");
    }

    c.bench_function("subscriptions", |b| {
        b.iter(|| black_box(&registry).subscriptions().count())
    });
}
