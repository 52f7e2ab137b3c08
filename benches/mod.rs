use criterion::{criterion_group, criterion_main};

mod cloud;
mod network;

criterion_group!(
    benches,
    cloud::topics::bench_dispatch,
    cloud::topics::bench_subscriptions,
    network::application::mqtt::client::bench_poll_qos0,
    network::application::mqtt::client::bench_poll_qos1
);
criterion_main!(benches);
