//! Construction benchmarks: the canonical cube and seeded random
//! clouds inside a containing tetrahedron.

use cdt3d::{compute_cdt, CdtOptions};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::distributions::{Distribution, Uniform};
use rand_pcg::Pcg64;

const PCG_STATE: u128 = 0xcafe_f00d_d15e_a5e5;
const PCG_STREAM: u128 = 0xa02b_dbf7_bb3c_0a7a_c28f_a16a_64ab_f96;

fn cube_input() -> (Vec<f64>, Vec<u32>) {
    let vertices = vec![
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0,
    ];
    let triangles = vec![
        0, 2, 1, 0, 3, 2, 4, 5, 6, 4, 6, 7, 0, 1, 5, 0, 5, 4, //
        1, 2, 6, 1, 6, 5, 2, 3, 7, 2, 7, 6, 3, 0, 4, 3, 4, 7,
    ];
    (vertices, triangles)
}

fn cloud_input(points: usize) -> (Vec<f64>, Vec<u32>) {
    let mut rng = Pcg64::new(PCG_STATE, PCG_STREAM);
    let dist = Uniform::new(1.0f64, 3.0);
    let mut vertices = vec![
        0.0, 0.0, 0.0, //
        10.0, 0.0, 0.0, //
        0.0, 10.0, 0.0, //
        0.0, 0.0, 10.0,
    ];
    for _ in 0..points {
        vertices.push(dist.sample(&mut rng));
        vertices.push(dist.sample(&mut rng));
        vertices.push(dist.sample(&mut rng));
    }
    let triangles = vec![0, 2, 1, 0, 1, 3, 1, 2, 3, 2, 0, 3];
    (vertices, triangles)
}

fn bench_cube(c: &mut Criterion) {
    let (vertices, triangles) = cube_input();
    let options = CdtOptions::default();
    c.bench_function("cdt/unit_cube", |b| {
        b.iter(|| {
            let result = compute_cdt(black_box(&vertices), black_box(&triangles), &options);
            assert!(result.success);
            result
        });
    });
}

fn bench_clouds(c: &mut Criterion) {
    let options = CdtOptions::default();
    let mut group = c.benchmark_group("cdt/interior_cloud");
    for points in [25usize, 100, 400] {
        let (vertices, triangles) = cloud_input(points);
        group.bench_with_input(BenchmarkId::from_parameter(points), &points, |b, _| {
            b.iter(|| compute_cdt(black_box(&vertices), black_box(&triangles), &options));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cube, bench_clouds);
criterion_main!(benches);
