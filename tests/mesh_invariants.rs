//! Structural and geometric invariants of returned meshes, checked
//! with the crate's own exact predicates.

use approx::assert_abs_diff_eq;
use cdt3d::core::{tetrahedrize, TetMesh};
use cdt3d::geometry::{insphere_sign, orient3d_sign, Pt3, VertexRep};
use cdt3d::{compute_cdt, CdtOptions, CdtResult};
use rand::distributions::{Distribution, Uniform};
use rand_pcg::Pcg64;
use std::collections::HashMap;

const PCG_STATE: u128 = 0xcafe_f00d_d15e_a5e5;
const PCG_STREAM: u128 = 0xa02b_dbf7_bb3c_0a7a_c28f_a16a_64ab_f96;

fn cube() -> (Vec<f64>, Vec<u32>) {
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

fn rep(result: &CdtResult, i: u32) -> VertexRep {
    let i = i as usize;
    VertexRep::Input(Pt3::new(
        result.vertices[3 * i],
        result.vertices[3 * i + 1],
        result.vertices[3 * i + 2],
    ))
}

/// Invariant: distinct in-range indices, strictly positive orientation.
#[test]
fn returned_tetrahedra_are_sound() {
    let (v, t) = cube();
    let result = compute_cdt(&v, &t, &CdtOptions::default());
    assert!(result.success);
    let total = (result.num_input_vertices + result.num_steiner_vertices) as u32;
    for tet in result.tetrahedra.chunks_exact(4) {
        for &i in tet {
            assert!(i < total);
        }
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert_ne!(tet[i], tet[j]);
            }
        }
        let [a, b, c, d] = [
            rep(&result, tet[0]),
            rep(&result, tet[1]),
            rep(&result, tet[2]),
            rep(&result, tet[3]),
        ];
        assert_eq!(
            orient3d_sign([&a, &b, &c, &d]),
            1,
            "tetrahedron {tet:?} is not positively oriented"
        );
    }
}

/// Invariant: a face (vertex triple) is shared by at most two returned
/// tetrahedra.
#[test]
fn faces_are_shared_by_at_most_two_tetrahedra() {
    let (v, t) = cube();
    let result = compute_cdt(&v, &t, &CdtOptions::default());
    let mut counts: HashMap<[u32; 3], u32> = HashMap::new();
    for tet in result.tetrahedra.chunks_exact(4) {
        for skip in 0..4 {
            let mut face: Vec<u32> = (0..4).filter(|&i| i != skip).map(|i| tet[i]).collect();
            face.sort_unstable();
            *counts.entry([face[0], face[1], face[2]]).or_insert(0) += 1;
        }
    }
    for (face, count) in counts {
        assert!(count <= 2, "face {face:?} appears in {count} tetrahedra");
    }
}

/// Invariant: every input triangle is tiled by faces of the returned
/// tetrahedra (area sums and vertex containment).
#[test]
fn constraint_triangles_are_tiled_by_mesh_faces() {
    let (v, t) = cube();
    let result = compute_cdt(&v, &t, &CdtOptions::default());
    assert!(result.success && result.is_polyhedron);

    let point = |i: u32| {
        let i = i as usize;
        Pt3::new(
            result.vertices[3 * i],
            result.vertices[3 * i + 1],
            result.vertices[3 * i + 2],
        )
    };
    let area = |a: Pt3, b: Pt3, c: Pt3| ((b - a).cross(&(c - a))).norm() / 2.0;

    for tri in t.chunks_exact(3) {
        let [p, q, r] = [point(tri[0]), point(tri[1]), point(tri[2])];
        let tri_reps = [rep(&result, tri[0]), rep(&result, tri[1]), rep(&result, tri[2])];
        // Collect candidate child faces: tet faces with all three
        // vertices exactly on the triangle's plane and inside it.
        let mut child_area = 0.0;
        let mut seen: Vec<[u32; 3]> = Vec::new();
        for tet in result.tetrahedra.chunks_exact(4) {
            for skip in 0..4 {
                let mut face: Vec<u32> =
                    (0..4).filter(|&i| i != skip).map(|i| tet[i]).collect();
                face.sort_unstable();
                let face = [face[0], face[1], face[2]];
                if seen.contains(&face) {
                    continue;
                }
                let on_triangle = face.iter().all(|&w| {
                    let wr = rep(&result, w);
                    orient3d_sign([&tri_reps[0], &tri_reps[1], &tri_reps[2], &wr]) == 0
                        && inside_triangle(p, q, r, point(w))
                });
                if on_triangle {
                    seen.push(face);
                    child_area += area(point(face[0]), point(face[1]), point(face[2]));
                }
            }
        }
        let triangle_area = area(p, q, r);
        assert_abs_diff_eq!(child_area, triangle_area, epsilon = 1e-12);
    }
}

fn inside_triangle(p: Pt3, q: Pt3, r: Pt3, w: Pt3) -> bool {
    // Closed 2D containment in the supporting plane.
    let n = (q - p).cross(&(r - p));
    for (a, b) in [(p, q), (q, r), (r, p)] {
        if (b - a).cross(&(w - a)).dot(&n) < -1e-12 {
            return false;
        }
    }
    true
}

/// Invariant: input vertex coordinates are returned bit-exactly.
#[test]
fn input_coordinates_are_bit_exact() {
    let v = vec![
        0.1, 0.2, 0.3, //
        1.0000000000000002, 0.0, 0.0, //
        0.0, 1e-300, 0.0, //
        -0.0, 0.0, 1.0,
    ];
    let t = vec![0, 2, 1, 0, 1, 3, 1, 2, 3, 2, 0, 3];
    let result = compute_cdt(&v, &t, &CdtOptions::default());
    assert!(result.success);
    for (out, input) in result.vertices.iter().zip(&v) {
        assert_eq!(out.to_bits(), input.to_bits());
    }
}

/// Without a bounding box no vertex is added outside the input hull.
#[test]
fn no_bounding_box_means_no_outside_vertices() {
    let (v, t) = cube();
    let result = compute_cdt(&v, &t, &CdtOptions::default());
    for chunk in result.vertices.chunks_exact(3) {
        for &c in chunk {
            assert!((0.0..=1.0).contains(&c));
        }
    }
}

/// The unconstrained Delaunay stage leaves every internal face locally
/// Delaunay (no neighbor apex strictly inside a circumsphere).
#[test]
fn random_cloud_is_locally_delaunay() {
    let mut rng = Pcg64::new(PCG_STATE, PCG_STREAM);
    let dist = Uniform::new_inclusive(-10.0f64, 10.0);
    let reps: Vec<VertexRep> = (0..30)
        .map(|_| {
            VertexRep::Input(Pt3::new(
                dist.sample(&mut rng),
                dist.sample(&mut rng),
                dist.sample(&mut rng),
            ))
        })
        .collect();
    let mut mesh = TetMesh::new(reps);
    tetrahedrize(&mut mesh).unwrap();
    mesh.validate().unwrap();

    for t in mesh.tets() {
        if mesh.is_ghost(t) {
            continue;
        }
        let n = mesh.nodes(t);
        for f in 0..4 {
            let (u, g) = mesh.neighbor(t, f);
            if mesh.is_ghost(u) {
                continue;
            }
            let apex = mesh.node(u, g);
            let s = insphere_sign([
                mesh.rep(n[0]),
                mesh.rep(n[1]),
                mesh.rep(n[2]),
                mesh.rep(n[3]),
                mesh.rep(apex),
            ]);
            assert!(
                s <= 0,
                "apex {apex} strictly inside circumsphere of tetrahedron {t}"
            );
        }
    }
}
