// model = "claude-opus-4-5"
// created = "2026-02-06"
// modified = "2026-02-06"
// driver = "Isaac Clayton"

//! Remote integration benchmarks.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tandem::{Bias, Buffer, Operation, ReplicaId, WireRecord};

/// `count` single-character edits typed on `replica`, at random places.
fn typed_operations(replica: ReplicaId, count: usize, seed: u64) -> Vec<Operation> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut buffer = Buffer::with_replica(replica, "");
    let mut ops = Vec::with_capacity(count);
    for _ in 0..count {
        let len = buffer.len();
        if len > 0 && rng.gen_bool(0.2) {
            let start = buffer.rope().clip_offset(rng.gen_range(0..len), Bias::Left);
            let end = buffer.rope().clip_offset(start + 1, Bias::Right);
            buffer.delete(start..end).unwrap();
        } else {
            let at = buffer.rope().clip_offset(rng.gen_range(0..=len), Bias::Left);
            let c = (b'a' + rng.gen_range(0..26)) as char;
            buffer.insert(at, c.encode_utf8(&mut [0; 4])).unwrap();
        }
        ops.extend(buffer.take_outgoing());
    }
    return ops;
}

// =============================================================================
// Integration
// =============================================================================

fn bench_apply_remote(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_remote");

    for count in [100, 1000, 5000] {
        let ops = typed_operations(1, count, 3);
        group.throughput(Throughput::Elements(ops.len() as u64));

        group.bench_with_input(BenchmarkId::new("sequential", count), &ops, |b, ops| {
            b.iter(|| {
                let mut replica = Buffer::with_replica(2, "");
                for op in ops {
                    replica.apply_remote(op).unwrap();
                }
                black_box(replica.len())
            });
        });
    }

    group.finish();
}

fn bench_concurrent_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_merge");

    for count in [100, 1000] {
        // Two replicas edit the same empty document without talking.
        let left = typed_operations(1, count, 5);
        let right = typed_operations(2, count, 9);
        group.throughput(Throughput::Elements((left.len() + right.len()) as u64));

        group.bench_with_input(BenchmarkId::new("interleaved", count), &(left, right), |b, (left, right)| {
            b.iter(|| {
                let mut replica = Buffer::with_replica(3, "");
                for (l, r) in left.iter().zip(right.iter()) {
                    replica.apply_remote(l).unwrap();
                    replica.apply_remote(r).unwrap();
                }
                black_box(replica.len())
            });
        });
    }

    group.finish();
}

// =============================================================================
// Wire
// =============================================================================

fn bench_wire(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire");
    let ops = typed_operations(1, 1000, 13);
    group.throughput(Throughput::Elements(ops.len() as u64));

    group.bench_function("encode_decode", |b| {
        b.iter(|| {
            let mut bytes = 0;
            for op in &ops {
                let frame = WireRecord::from_operation(1, 0, op).unwrap().encode().unwrap();
                bytes += frame.len();
                black_box(WireRecord::decode(&frame).unwrap().operation().unwrap());
            }
            black_box(bytes)
        });
    });

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(benches, bench_apply_remote, bench_concurrent_merge, bench_wire);

criterion_main!(benches);
