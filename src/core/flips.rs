//! Edge removal by bistellar flips.
//!
//! Constraint recovery wants specific edges gone: an edge blocking a
//! constraint segment, or one stabbing through a constraint triangle.
//! [`remove_edge`] retetrahedrizes the ring of tetrahedra around an
//! edge with a fan from one ring vertex: for a ring of three this is
//! the classical 3-2 flip, for larger rings a general edge removal.
//! Candidate configurations are validated with strict orientation
//! tests before anything is mutated; an invalid configuration is
//! reported, not applied.
//!
//! Rings through the hull (containing the infinite vertex) are allowed
//! in exactly one shape: the coplanar diagonal swap, where the flipped
//! edge and the fan apex pair lie in one hull plane. That is the move
//! that exchanges the diagonal of a flat quadrilateral on the hull,
//! ghosts included.

#![forbid(unsafe_code)]

use thiserror::Error;

use super::collections::FastHashMap;
use super::tet_mesh::{TetMesh, INFINITE_VERTEX};
use crate::geometry::predicates::orient3d_sign;

/// Why an edge could not be flipped away.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlipError {
    /// The edge is not present in the mesh.
    #[error("edge ({a}, {b}) does not exist")]
    EdgeMissing {
        /// First endpoint.
        a: u32,
        /// Second endpoint.
        b: u32,
    },
    /// The ring around the edge could not be traversed.
    #[error("edge ({a}, {b}) has a malformed ring")]
    MalformedRing {
        /// First endpoint.
        a: u32,
        /// Second endpoint.
        b: u32,
    },
    /// No fan apex yields strictly valid replacement tetrahedra.
    #[error("no valid flip configuration removes edge ({a}, {b})")]
    NoValidConfiguration {
        /// First endpoint.
        a: u32,
        /// Second endpoint.
        b: u32,
    },
}

/// What a successful flip did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlipInfo {
    /// Tetrahedra removed (the ring size).
    pub removed: usize,
    /// Tetrahedra created.
    pub created: usize,
}

/// Remove edge `(a, b)` by retetrahedrizing its ring, if a strictly
/// valid configuration exists.
///
/// With `keep = Some((u, v))` only fans from `u` or `v` are considered
/// and only when the other endpoint is on the ring, so the new
/// tetrahedra are guaranteed to contain edge `(u, v)`.
///
/// # Errors
///
/// [`FlipError`] when the edge is missing, its ring cannot be walked,
/// or no candidate fan passes the orientation checks. The mesh is
/// unchanged on error.
pub fn remove_edge(
    mesh: &mut TetMesh,
    a: u32,
    b: u32,
    keep: Option<(u32, u32)>,
) -> Result<FlipInfo, FlipError> {
    debug_assert!(a != INFINITE_VERTEX && b != INFINITE_VERTEX);
    if !mesh.edge_exists(a, b) {
        return Err(FlipError::EdgeMissing { a, b });
    }
    let (ring_tets, ring) = mesh
        .edge_ring(a, b)
        .ok_or(FlipError::MalformedRing { a, b })?;
    let n = ring.len();
    debug_assert!(n >= 3);

    let candidates: Vec<u32> = match keep {
        Some((u, v)) => [u, v]
            .into_iter()
            .filter(|&apex| {
                apex != INFINITE_VERTEX
                    && ring.contains(&apex)
                    && ring.contains(if apex == u { &v } else { &u })
            })
            .collect(),
        None => ring
            .iter()
            .copied()
            .filter(|&w| w != INFINITE_VERTEX)
            .collect(),
    };

    for apex in candidates {
        let Some(triangles) = fan_triangles(&ring, apex) else {
            continue;
        };
        if let Some(info) = try_apply(mesh, a, b, &ring_tets, &triangles) {
            return Ok(info);
        }
    }
    Err(FlipError::NoValidConfiguration { a, b })
}

/// The fan triangles `(apex, w_i, w_{i+1})` of the ring polygon, in
/// ring order. `None` if the apex is not a ring vertex.
fn fan_triangles(ring: &[u32], apex: u32) -> Option<Vec<[u32; 3]>> {
    let k = ring.iter().position(|&w| w == apex)?;
    let n = ring.len();
    let mut triangles = Vec::with_capacity(n - 2);
    for i in 1..(n - 1) {
        let p = ring[(k + i) % n];
        let q = ring[(k + i + 1) % n];
        triangles.push([apex, p, q]);
    }
    Some(triangles)
}

/// Validate the fan configuration and, if sound, apply it.
fn try_apply(
    mesh: &mut TetMesh,
    a: u32,
    b: u32,
    ring_tets: &[u32],
    triangles: &[[u32; 3]],
) -> Option<FlipInfo> {
    // -------- validation (no mutation) -------------------------------
    let ghost_triangles = triangles
        .iter()
        .filter(|t| t.contains(&INFINITE_VERTEX))
        .count();
    for tri in triangles {
        if tri.contains(&INFINITE_VERTEX) {
            // Hull ring: only the coplanar diagonal swap is safe. The
            // infinite vertex must be adjacent to the apex (a single
            // ghost pair is rebuilt) and the flipped edge must lie in
            // one plane with the new hull diagonal.
            if ghost_triangles != 1 {
                return None;
            }
            debug_assert!(tri[0] != INFINITE_VERTEX);
            let far = if tri[1] == INFINITE_VERTEX {
                tri[2]
            } else if tri[2] == INFINITE_VERTEX {
                tri[1]
            } else {
                return None; // apex slot: fans never put it there
            };
            let coplanar = orient3d_sign([
                mesh.rep(a),
                mesh.rep(b),
                mesh.rep(tri[0]),
                mesh.rep(far),
            ]) == 0;
            if !coplanar {
                return None;
            }
            continue;
        }
        let up = orient3d_sign([
            mesh.rep(tri[0]),
            mesh.rep(tri[1]),
            mesh.rep(tri[2]),
            mesh.rep(b),
        ]);
        let down = orient3d_sign([
            mesh.rep(tri[0]),
            mesh.rep(tri[2]),
            mesh.rep(tri[1]),
            mesh.rep(a),
        ]);
        if up != 1 || down != 1 {
            return None;
        }
    }

    // -------- collect outer bonds ------------------------------------
    let mut pending: FastHashMap<[u32; 3], (u32, usize)> = FastHashMap::default();
    for &t in ring_tets {
        for f in 0..4 {
            let face = mesh.face_vertices(t, f);
            let has_a = face.contains(&a);
            let has_b = face.contains(&b);
            if has_a && has_b {
                continue; // internal ring face, disappears
            }
            let (u, g) = mesh.neighbor(t, f);
            debug_assert!(!ring_tets.contains(&u));
            pending.insert(sorted3(face), (u, g));
        }
    }

    // -------- rebuild ------------------------------------------------
    for &t in ring_tets {
        mesh.free_tet(t);
    }
    let mut created = 0;
    let mut new_tets = Vec::with_capacity(2 * triangles.len());
    for tri in triangles {
        new_tets.push(mesh.alloc_tet([tri[0], tri[1], tri[2], b]));
        new_tets.push(mesh.alloc_tet([tri[0], tri[2], tri[1], a]));
        created += 2;
    }
    for &nt in &new_tets {
        for f in 0..4 {
            let key = sorted3(mesh.face_vertices(nt, f));
            if let Some((o, of)) = pending.remove(&key) {
                mesh.bond(nt, f, o, of);
            } else {
                pending.insert(key, (nt, f));
            }
        }
    }
    assert!(
        pending.is_empty(),
        "edge removal left unmatched faces around ({a}, {b})"
    );
    debug_assert!(mesh.validate().is_ok());
    Some(FlipInfo {
        removed: ring_tets.len(),
        created,
    })
}

fn sorted3(mut f: [u32; 3]) -> [u32; 3] {
    f.sort_unstable();
    f
}
