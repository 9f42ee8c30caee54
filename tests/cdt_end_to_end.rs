//! End-to-end pipeline scenarios: canonical closed surfaces, malformed
//! inputs, and degenerate geometry.

use approx::assert_abs_diff_eq;
use cdt3d::{compute_cdt, validate_mesh, CdtOptions, CdtOptionsBuilder};

fn cube() -> (Vec<f64>, Vec<u32>) {
    let vertices = vec![
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, 0.0, 1.0, //
        1.0, 0.0, 1.0, //
        1.0, 1.0, 1.0, //
        0.0, 1.0, 1.0,
    ];
    let triangles = vec![
        0, 2, 1, 0, 3, 2, // bottom
        4, 5, 6, 4, 6, 7, // top
        0, 1, 5, 0, 5, 4, // front
        1, 2, 6, 1, 6, 5, // right
        2, 3, 7, 2, 7, 6, // back
        3, 0, 4, 3, 4, 7, // left
    ];
    (vertices, triangles)
}

fn regular_tetrahedron() -> (Vec<f64>, Vec<u32>) {
    let vertices = vec![
        1.0, 1.0, 1.0, //
        1.0, -1.0, -1.0, //
        -1.0, 1.0, -1.0, //
        -1.0, -1.0, 1.0,
    ];
    let triangles = vec![0, 1, 2, 0, 3, 1, 0, 2, 3, 1, 3, 2];
    (vertices, triangles)
}

fn octahedron() -> (Vec<f64>, Vec<u32>) {
    let vertices = vec![
        1.0, 0.0, 0.0, //
        -1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, -1.0, 0.0, //
        0.0, 0.0, 1.0, //
        0.0, 0.0, -1.0,
    ];
    let triangles = vec![
        0, 2, 4, 2, 1, 4, 1, 3, 4, 3, 0, 4, //
        2, 0, 5, 1, 2, 5, 3, 1, 5, 0, 3, 5,
    ];
    (vertices, triangles)
}

#[test]
fn unit_cube() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (v, t) = cube();
    let result = compute_cdt(&v, &t, &CdtOptions::default());
    assert!(result.success);
    assert!(result.is_polyhedron);
    assert_eq!(result.num_input_vertices, 8);
    assert_eq!(result.num_steiner_vertices, 0);
    assert!(
        (5..=24).contains(&result.num_tetrahedra),
        "cube produced {} tetrahedra",
        result.num_tetrahedra
    );
    assert_eq!(result.tetrahedra.len(), 4 * result.num_tetrahedra as usize);
    assert_eq!(result.vertices.len(), 3 * 8);
}

#[test]
fn regular_tetrahedron_is_a_single_tet() {
    let (v, t) = regular_tetrahedron();
    let result = compute_cdt(&v, &t, &CdtOptions::default());
    assert!(result.success);
    assert!(result.is_polyhedron);
    assert_eq!(result.num_tetrahedra, 1);
    assert_eq!(result.num_steiner_vertices, 0);
    let mut tet = result.tetrahedra.clone();
    tet.sort_unstable();
    assert_eq!(tet, vec![0, 1, 2, 3]);
}

#[test]
fn regular_octahedron() {
    let (v, t) = octahedron();
    let result = compute_cdt(&v, &t, &CdtOptions::default());
    assert!(result.success);
    assert!(result.is_polyhedron);
    assert!(
        (4..=12).contains(&result.num_tetrahedra),
        "octahedron produced {} tetrahedra",
        result.num_tetrahedra
    );
    assert_eq!(result.num_steiner_vertices, 0);
}

#[test]
fn vertex_array_length_not_divisible() {
    let (v, t) = cube();
    let truncated = &v[..v.len() - 1];
    let info = validate_mesh(truncated, &t);
    assert!(!info.valid);
    let result = compute_cdt(truncated, &t, &CdtOptions::default());
    assert!(!result.success);
    assert!(result.vertices.is_empty());
    assert!(result.tetrahedra.is_empty());
    assert_eq!(result.num_tetrahedra, 0);
}

#[test]
fn triangle_index_out_of_range() {
    let (v, mut t) = cube();
    t[5] = 8; // one past the last vertex
    let info = validate_mesh(&v, &t);
    assert!(!info.valid);
    let result = compute_cdt(&v, &t, &CdtOptions::default());
    assert!(!result.success);
    assert!(result.vertices.is_empty());
    assert!(result.tetrahedra.is_empty());
}

#[test]
fn coplanar_vertices_fail_cleanly() {
    let v = vec![
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, //
        0.0, 1.0, 0.0,
    ];
    let t = vec![0, 1, 2, 0, 2, 3];
    // The input is well-formed...
    assert!(validate_mesh(&v, &t).valid);
    // ...but no Delaunay seed exists.
    let result = compute_cdt(&v, &t, &CdtOptions::default());
    assert!(!result.success);
    assert!(result.tetrahedra.is_empty());
}

#[test]
fn cube_with_bounding_box() {
    let (v, t) = cube();
    let options = CdtOptionsBuilder::default()
        .add_bounding_box(true)
        .build()
        .unwrap();
    let result = compute_cdt(&v, &t, &options);
    assert!(result.success);
    assert!(result.is_polyhedron);
    // The box is reported as non-input; input handles are unchanged.
    assert_eq!(result.num_input_vertices, 8);
    assert_eq!(&result.vertices[..24], &v[..]);
    assert_eq!(
        result.vertices.len(),
        3 * (8 + 8 + result.num_steiner_vertices as usize)
    );
    // Inner tetrahedra still tile exactly the cube.
    let volume: f64 = tet_volumes(&result.vertices, &result.tetrahedra).sum();
    assert_abs_diff_eq!(volume, 1.0, epsilon = 1e-9);
}

#[test]
fn inner_volume_matches_the_solid() {
    let (v, t) = cube();
    let result = compute_cdt(&v, &t, &CdtOptions::default());
    let volume: f64 = tet_volumes(&result.vertices, &result.tetrahedra).sum();
    assert_abs_diff_eq!(volume, 1.0, epsilon = 1e-12);

    let (v, t) = octahedron();
    let result = compute_cdt(&v, &t, &CdtOptions::default());
    let volume: f64 = tet_volumes(&result.vertices, &result.tetrahedra).sum();
    assert_abs_diff_eq!(volume, 4.0 / 3.0, epsilon = 1e-12);
}

fn tet_volumes<'a>(
    vertices: &'a [f64],
    tetrahedra: &'a [u32],
) -> impl Iterator<Item = f64> + 'a {
    tetrahedra.chunks_exact(4).map(move |tet| {
        let p = |i: u32| {
            let i = i as usize;
            [vertices[3 * i], vertices[3 * i + 1], vertices[3 * i + 2]]
        };
        let [a, b, c, d] = [p(tet[0]), p(tet[1]), p(tet[2]), p(tet[3])];
        let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let w = [d[0] - a[0], d[1] - a[1], d[2] - a[2]];
        (u[0] * (v[1] * w[2] - v[2] * w[1]) + u[1] * (v[2] * w[0] - v[0] * w[2])
            + u[2] * (v[0] * w[1] - v[1] * w[0]))
            / 6.0
    })
}
