//! Benchmarks for the flow pipeline.

use criterion::{criterion_group, criterion_main, Criterion};
use riccimap::algo::boundary::trace_boundary;
use riccimap::algo::embed::{embed, EmbedOptions};
use riccimap::algo::flow::{
    ricci_flow, update_corner_angles, update_edge_lengths, update_edge_weights,
    update_vertex_curvature, FlowOptions,
};
use riccimap::prelude::*;
use nalgebra::Point3;

fn create_grid_mesh(n: usize) -> HalfEdgeMesh {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n * 2);

    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(i as f64, j as f64, 0.0));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    build_from_triangles(&vertices, &faces).unwrap()
}

fn bench_evaluation(c: &mut Criterion) {
    let mut mesh = create_grid_mesh(50);

    c.bench_function("metric_update_50x50", |b| {
        b.iter(|| {
            update_edge_lengths(&mut mesh);
            update_edge_weights(&mut mesh);
            update_corner_angles(&mut mesh, false).unwrap();
            update_vertex_curvature(&mut mesh);
        });
    });

    c.bench_function("trace_boundary_50x50", |b| {
        b.iter(|| trace_boundary(&mesh).len());
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    group.bench_function("flow_and_embed_20x20", |b| {
        b.iter(|| {
            let mut mesh = create_grid_mesh(20);
            ricci_flow(&mut mesh, &FlowOptions::default()).unwrap();
            embed(&mut mesh, &EmbedOptions::default()).unwrap();
            mesh
        });
    });

    group.finish();
}

criterion_group!(benches, bench_evaluation, bench_pipeline);
criterion_main!(benches);
