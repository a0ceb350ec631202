// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Staging buffer microbenchmarks
//!
//! Models the steady-state pattern of the bridge: serial chunks pushed at
//! the back, partial acknowledgements popped from the front.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use uart_bridge_core::StagingBuffer;

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("staging_buffer_push_pop");

    for chunk_size in [16usize, 128, 1024] {
        let chunk = vec![0xA5u8; chunk_size];
        group.throughput(Throughput::Bytes(chunk_size as u64 * 64));
        group.bench_with_input(BenchmarkId::from_parameter(chunk_size), &chunk, |b, chunk| {
            let mut buffer = StagingBuffer::with_capacity(1024);
            b.iter(|| {
                for _ in 0..64 {
                    buffer.push(black_box(chunk));
                    // Acknowledge half of what is staged, like a link
                    // writing smaller frames than it receives.
                    let ack = buffer.len() / 2;
                    buffer.pop_front(ack);
                }
                buffer.clear();
            });
        });
    }

    group.finish();
}

fn bench_growth(c: &mut Criterion) {
    c.bench_function("staging_buffer_growth_from_1", |b| {
        let chunk = [0u8; 100];
        b.iter(|| {
            let mut buffer = StagingBuffer::with_capacity(1);
            for _ in 0..100 {
                buffer.push(black_box(&chunk));
            }
            black_box(buffer.len())
        });
    });
}

criterion_group!(benches, bench_push_pop, bench_growth);
criterion_main!(benches);
