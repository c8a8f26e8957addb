use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use packetsim::core::support::simulation_time::SimulationTime;
use packetsim::core::work::event::Event;
use packetsim::core::work::event_queue::EventQueue;
use packetsim::network::graph::NodeId;
use rand::Rng;

fn random_events(count: usize) -> Vec<Event> {
    let mut random = packetsim::utility::random::rng_from_seed(0);
    (0..count)
        .map(|_| {
            // times are drawn from a small set so that many events tie
            let time = SimulationTime::new(f64::from(random.gen_range(0..100u32))).unwrap();
            Event::arrival(time, NodeId::new(0), NodeId::new(1), 64)
        })
        .collect()
}

#[inline(never)]
fn schedule_and_drain(events: Vec<Event>) -> usize {
    let mut queue = EventQueue::new();
    for event in events {
        queue.schedule(event);
    }

    let mut count = 0;
    while let Some(event) = queue.next() {
        black_box(event);
        count += 1;
    }
    count
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("event queue");
    for size in [100, 10_000] {
        let events = random_events(size);
        group.bench_function(format!("schedule and drain {size}"), |b| {
            b.iter_batched(
                || events.clone(),
                schedule_and_drain,
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
