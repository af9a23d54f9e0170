// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_order::{MultiGraph, TopologicalSorter, schedule_ids, sort_ids};

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn gen_range_u32(&mut self, upper_exclusive: u32) -> u32 {
        if upper_exclusive == 0 {
            return 0;
        }
        self.next_u32() % upper_exclusive
    }
}

fn build_dag(n: u32, edges_per_vertex: u32, seed: u64) -> MultiGraph<u32, u32> {
    let mut graph = MultiGraph::with_capacity(n as usize);
    graph.add_vertices(0..n);
    let mut rng = Lcg::new(seed);

    // Ensure a DAG by only adding edges `from -> to` where `from < to`.
    for to in 1..n {
        for serial in 0..edges_per_vertex.min(to) {
            let from = rng.gen_range_u32(to);
            graph
                .add_edge(&from, &to, serial)
                .expect("both endpoints are registered");
        }
    }
    graph
}

/// A DAG plus one back edge per `stride` vertices; back edges carry `u32::MAX`.
fn build_cyclic(n: u32, edges_per_vertex: u32, stride: u32, seed: u64) -> MultiGraph<u32, u32> {
    let mut graph = build_dag(n, edges_per_vertex, seed);
    for to in (0..n).step_by(stride as usize) {
        let from = (to + stride / 2).min(n - 1);
        if from != to {
            graph
                .add_edge(&from, &to, u32::MAX)
                .expect("both endpoints are registered");
        }
    }
    graph
}

fn bench_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_order");
    group.sample_size(50);

    for &(n, edges_per_vertex) in &[
        (256_u32, 1_u32),
        (256_u32, 4_u32),
        (4_096_u32, 1_u32),
        (4_096_u32, 4_u32),
    ] {
        group.bench_function(format!("build(n={n},e={edges_per_vertex})"), |b| {
            b.iter(|| black_box(build_dag(n, edges_per_vertex, 0x0BDE_0000_0000_0001)));
        });

        let dag = build_dag(n, edges_per_vertex, 0x0BDE_0000_0000_0002);

        group.bench_function(format!("sort_ids(n={n},e={edges_per_vertex})"), |b| {
            b.iter(|| black_box(sort_ids(&dag).map(|order| order.len())));
        });

        group.bench_function(format!("sort_values(n={n},e={edges_per_vertex})"), |b| {
            b.iter(|| black_box(dag.sort().map(|order| order.len()).ok()));
        });

        group.bench_function(format!("schedule_ids(n={n},e={edges_per_vertex})"), |b| {
            b.iter(|| black_box(schedule_ids(&dag).map(|waves| waves.len())));
        });

        group.bench_function(
            format!("sort_breaking_cycles(n={n},e={edges_per_vertex})"),
            |b| {
                b.iter_batched(
                    || build_cyclic(n, edges_per_vertex, 16, 0x0BDE_0000_0000_0003),
                    |graph| {
                        let mut back_edges =
                            |_: &u32, _: &u32, edges: &[u32]| edges.contains(&u32::MAX);
                        let placed = TopologicalSorter::new(&graph)
                            .break_edges_with(&mut back_edges)
                            .sort()
                            .map(|order| order.len())
                            .ok();
                        black_box(placed);
                    },
                    BatchSize::LargeInput,
                );
            },
        );

        group.bench_function(
            format!("schedule_cycle_report(n={n},e={edges_per_vertex})"),
            |b| {
                let cyclic = build_cyclic(n, edges_per_vertex, 16, 0x0BDE_0000_0000_0004);
                b.iter(|| black_box(schedule_ids(&cyclic).err().map(|c| c.vertex_count())));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_order);
criterion_main!(benches);
