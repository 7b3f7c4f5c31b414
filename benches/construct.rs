//! Construction throughput over synthesized loop-heavy graphs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use wpo::{AdjacencyGraph, WeakPartialOrdering};

/// A chain of `loops` natural loops, each with `width` body nodes.
fn loop_ladder(loops: u32, width: u32) -> AdjacencyGraph {
    let n = 1 + loops * (width + 1);
    let mut g = AdjacencyGraph::new(n as usize, 0);
    let mut prev = 0u32;
    let mut next = 1u32;
    for _ in 0..loops {
        let head = next;
        next += 1;
        g.add_edge(prev, head);
        let mut cur = head;
        for _ in 0..width {
            let body = next;
            next += 1;
            g.add_edge(cur, body);
            cur = body;
        }
        g.add_edge(cur, head);
        prev = head;
    }
    g
}

/// `depth` loops nested inside each other, innermost a self-loop.
fn nested_loops(depth: u32) -> AdjacencyGraph {
    let mut g = AdjacencyGraph::new(depth as usize + 1, 0);
    for i in 0..depth {
        g.add_edge(i, i + 1);
    }
    g.add_edge(depth, depth);
    for i in 1..depth {
        g.add_edge(i + 1, i);
    }
    g
}

fn bench_construct(c: &mut Criterion) {
    let mut group = c.benchmark_group("construct");

    for &loops in &[16u32, 128, 1024] {
        let g = loop_ladder(loops, 8);
        group.throughput(Throughput::Elements(g.len() as u64));
        group.bench_with_input(BenchmarkId::new("ladder", loops), &g, |b, g| {
            b.iter(|| WeakPartialOrdering::new(black_box(g)))
        });
    }

    for &depth in &[8u32, 64, 512] {
        let g = nested_loops(depth);
        group.throughput(Throughput::Elements(g.len() as u64));
        group.bench_with_input(BenchmarkId::new("nested", depth), &g, |b, g| {
            b.iter(|| WeakPartialOrdering::new(black_box(g)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_construct);
criterion_main!(benches);
