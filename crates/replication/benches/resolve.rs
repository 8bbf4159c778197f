//! Replica resolution throughput over rings of growing size.

use corelib::node::{Node, NodeId};
use corelib::partitioner::{Partitioner, SipPartitioner};
use corelib::ring::RingTopology;
use corelib::token::Token;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use replication::{ReplicationStrategy, SimpleStrategy};

fn ring_with(nodes: u32, tokens_per_node: u32) -> RingTopology {
    let ring = RingTopology::new();
    for n in 0..nodes {
        let tokens: Vec<Token> = (0..tokens_per_node)
            .map(|i| SipPartitioner.partition(format!("{n}:{i}").as_bytes()))
            .collect();
        ring.add_node(Node::new(NodeId::new(format!("10.0.{}.{}", n / 256, n % 256), 9042)), tokens)
            .expect("hashed tokens collide");
    }
    ring
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    for nodes in [4u32, 32, 256] {
        let snapshot = ring_with(nodes, 16).snapshot();
        let strategy = SimpleStrategy::new(3);
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &snapshot, |b, snapshot| {
            let mut i = 0u64;
            b.iter(|| {
                i += 1;
                let token = SipPartitioner.partition(&i.to_le_bytes());
                black_box(strategy.replicas_for_token(snapshot, token).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
