//! Segment recovery.
//!
//! After Delaunay construction an input edge may be absent from the
//! mesh. For each constraint edge `(u, v)` this pass walks the
//! tetrahedra along the segment from `u` and classifies the first
//! entity the segment leaves through: a collinear mesh vertex (the
//! chain simply continues there), the interior of a face, or a mesh
//! edge. A blocking edge is first attacked with an edge-removal flip
//! that is required to create the missing segment edge; when no valid
//! flip exists — or the flip budget is spent — a Steiner vertex is
//! inserted at the exact intersection point and the local cavity is
//! re-Delaunayed. Every Steiner vertex strictly subdivides an
//! uncovered interval of the segment, so the loop terminates.
//!
//! Later insertions can locally rebuild a region that an earlier chain
//! ran through, so after the first pass every chain is re-verified and
//! re-recovered until stable.

#![forbid(unsafe_code)]

use super::delaunay::{Inserter, TetrahedrizeStats, TriangulationError};
use super::flips::remove_edge;
use super::overlay::StructuredPlc;
use super::tet_mesh::{TetMesh, FACE_VERTS};
use crate::geometry::exact::segment_plane_intersection;
use crate::geometry::point::VertexRep;
use crate::geometry::predicates::orient3d_sign;

/// Flip attempts per constraint edge before falling back to Steiner
/// insertion unconditionally.
const FLIP_BUDGET: usize = 64;
/// Hard cap on recovery steps per constraint edge.
const STEP_BUDGET: usize = 10_000;
/// Re-verification sweeps over all chains.
const SWEEP_BUDGET: usize = 32;

/// What the segment walk runs into first, leaving `cur` toward the
/// target.
enum Crossing {
    /// A mesh vertex exactly on the open segment.
    Vertex(u32),
    /// The interior of a mesh face.
    Face { face: [u32; 3] },
    /// The interior of mesh edge `(a, b)`; `face` is a face through
    /// that edge, used to construct the intersection point.
    Edge { a: u32, b: u32, face: [u32; 3] },
}

/// Recover every constraint edge as a chain of mesh edges.
///
/// # Errors
///
/// [`TriangulationError::RecoveryStall`] when an edge exhausts its step
/// budget (pathological input); insertion errors propagate unchanged.
pub fn recover_segments(
    mesh: &mut TetMesh,
    overlay: &mut StructuredPlc,
    inserter: &mut Inserter,
    stats: &mut TetrahedrizeStats,
) -> Result<(), TriangulationError> {
    for sweep in 0..SWEEP_BUDGET {
        let mut dirty = false;
        for e in 0..overlay.edges.len() {
            let chain_ok = {
                let edge = &overlay.edges[e];
                edge.chain.len() >= 2
                    && edge
                        .child_edges()
                        .all(|(a, b)| mesh.edge_exists(a, b))
            };
            if chain_ok {
                continue;
            }
            dirty = true;
            let [u, v] = overlay.edges[e].verts;
            let chain = recover_one(mesh, u, v, inserter, stats)?;
            overlay.edges[e].chain = chain;
        }
        if !dirty {
            log::debug!("segment recovery converged after {sweep} sweeps");
            return Ok(());
        }
    }
    // One final verification: the last sweep may have been the one
    // that settled everything.
    let stable = overlay.edges.iter().all(|edge| {
        edge.chain.len() >= 2 && edge.child_edges().all(|(a, b)| mesh.edge_exists(a, b))
    });
    if stable {
        return Ok(());
    }
    Err(TriangulationError::RecoveryStall {
        message: format!("segment chains still unstable after {SWEEP_BUDGET} sweeps"),
    })
}

/// Establish the chain for one constraint edge `(u, v)`.
fn recover_one(
    mesh: &mut TetMesh,
    u: u32,
    v: u32,
    inserter: &mut Inserter,
    stats: &mut TetrahedrizeStats,
) -> Result<Vec<u32>, TriangulationError> {
    let mut chain = vec![u];
    let mut cur = u;
    let mut flips_left = FLIP_BUDGET;

    for _ in 0..STEP_BUDGET {
        if cur == v {
            return Ok(chain);
        }
        if mesh.edge_exists(cur, v) {
            chain.push(v);
            return Ok(chain);
        }
        match classify_crossing(mesh, cur, v)? {
            Crossing::Vertex(w) => {
                chain.push(w);
                cur = w;
            }
            Crossing::Edge { a, b, face } => {
                if flips_left > 0 && remove_edge(mesh, a, b, Some((cur, v))).is_ok() {
                    flips_left -= 1;
                    // Re-test from the same chain vertex.
                    continue;
                }
                let s = insert_split_point(mesh, cur, v, face, inserter, stats)?;
                chain.push(s);
                cur = s;
            }
            Crossing::Face { face } => {
                let s = insert_split_point(mesh, cur, v, face, inserter, stats)?;
                chain.push(s);
                cur = s;
            }
        }
    }
    Err(TriangulationError::RecoveryStall {
        message: format!("edge ({u}, {v}) exceeded its recovery step budget"),
    })
}

/// Insert a Steiner vertex at the exact intersection of segment
/// `(cur, v)` with the plane of `face`, and re-Delaunay around it.
fn insert_split_point(
    mesh: &mut TetMesh,
    cur: u32,
    v: u32,
    face: [u32; 3],
    inserter: &mut Inserter,
    stats: &mut TetrahedrizeStats,
) -> Result<u32, TriangulationError> {
    let s0 = mesh.rep(cur).homogeneous();
    let s1 = mesh.rep(v).homogeneous();
    let t0 = mesh.rep(face[0]).homogeneous();
    let t1 = mesh.rep(face[1]).homogeneous();
    let t2 = mesh.rep(face[2]).homogeneous();
    let point = segment_plane_intersection(&s0, &s1, [&t0, &t1, &t2]).ok_or_else(|| {
        TriangulationError::RecoveryStall {
            message: format!("segment ({cur}, {v}) does not cross face plane {face:?}"),
        }
    })?;
    let s = mesh.push_vertex(VertexRep::Intersection(point));
    log::trace!("steiner vertex {s} splits segment ({cur}, {v})");
    inserter.insert(mesh, s, None, stats)?;
    Ok(s)
}

/// Classify the first mesh entity the open segment `cur -> v` passes
/// through, scanning the tetrahedra incident to `cur`.
fn classify_crossing(
    mesh: &TetMesh,
    cur: u32,
    v: u32,
) -> Result<Crossing, TriangulationError> {
    let target = mesh.rep(v);
    for t in mesh.incident_tets(cur) {
        if mesh.is_ghost(t) {
            continue;
        }
        let k = mesh
            .corner_of(t, cur)
            .expect("incident tetrahedron without the vertex");
        let n = mesh.nodes(t);
        let fv = FACE_VERTS[k];
        let face = [n[fv[0]], n[fv[1]], n[fv[2]]];

        // The segment leaves through this tetrahedron's far face iff
        // the target is inside the cone spanned at `cur` by the face:
        // all three side-plane orientations non-positive.
        let sides = [
            orient3d_sign([mesh.rep(cur), mesh.rep(face[0]), mesh.rep(face[1]), target]),
            orient3d_sign([mesh.rep(cur), mesh.rep(face[1]), mesh.rep(face[2]), target]),
            orient3d_sign([mesh.rep(cur), mesh.rep(face[2]), mesh.rep(face[0]), target]),
        ];
        if sides.iter().any(|&s| s > 0) {
            continue;
        }
        let plane = orient3d_sign([
            mesh.rep(face[0]),
            mesh.rep(face[1]),
            mesh.rep(face[2]),
            target,
        ]);
        let zeros = sides.iter().filter(|&&s| s == 0).count();
        match zeros {
            0 => {
                // Interior of the cone. The target must be strictly
                // beyond the far face, or it would be inside this
                // tetrahedron, which a mesh vertex cannot be.
                if plane < 0 {
                    return Ok(Crossing::Face { face });
                }
            }
            1 => {
                if plane < 0 {
                    let (a, b) = if sides[0] == 0 {
                        (face[0], face[1])
                    } else if sides[1] == 0 {
                        (face[1], face[2])
                    } else {
                        (face[2], face[0])
                    };
                    return Ok(Crossing::Edge { a, b, face });
                }
            }
            2 => {
                // Two side planes vanish: the segment runs through
                // their common vertex.
                let w = if sides[0] == 0 && sides[1] == 0 {
                    face[1]
                } else if sides[1] == 0 && sides[2] == 0 {
                    face[2]
                } else {
                    face[0]
                };
                return Ok(Crossing::Vertex(w));
            }
            _ => {}
        }
    }
    Err(TriangulationError::RecoveryStall {
        message: format!("no crossing found for segment ({cur}, {v})"),
    })
}
