// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for shape propagation over residual conv stacks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use model_ir::{Graph, Initializer, Node, ValueInfo};
use shape_infer::ShapeInferencer;
use std::hint::black_box;
use tensor_meta::{Dim, ElemType};

/// `blocks` repetitions of `y = Relu(Conv(x) + x)` on a 64-channel map.
fn residual_stack(blocks: usize) -> Graph {
    let mut builder = Graph::builder("residual").input(ValueInfo::tensor(
        "x0",
        ElemType::Float,
        vec![Dim::from("N"), Dim::Known(64), Dim::Known(56), Dim::Known(56)],
    ));
    for b in 0..blocks {
        let (x, w, c, s, y) = (
            format!("x{b}"),
            format!("w{b}"),
            format!("c{b}"),
            format!("s{b}"),
            format!("x{}", b + 1),
        );
        builder = builder
            .initializer(Initializer::from_f32(&w, vec![64, 64, 3, 3], vec![0.0; 64 * 64 * 9]))
            .node(
                Node::new("Conv", &[x.as_str(), w.as_str()], &[c.as_str()])
                    .with_attr("pads", vec![1i64, 1, 1, 1]),
            )
            .node(Node::new("Add", &[c.as_str(), x.as_str()], &[s.as_str()]))
            .node(Node::new("Relu", &[s.as_str()], &[y.as_str()]));
    }
    builder
        .output(ValueInfo::untyped(format!("x{blocks}")))
        .build()
        .expect("benchmark graph is well-formed")
}

fn bench_residual_stack(c: &mut Criterion) {
    let inferencer = ShapeInferencer::default();
    let mut group = c.benchmark_group("infer_residual_stack");
    for blocks in [8usize, 64, 256] {
        let graph = residual_stack(blocks);
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &graph, |b, graph| {
            b.iter(|| {
                let mut g = graph.clone();
                black_box(inferencer.run_in_place(&mut g, 13))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_residual_stack);
criterion_main!(benches);
