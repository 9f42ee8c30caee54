//! Face recovery.
//!
//! Once a triangle's three edges exist as chains of mesh edges, the
//! triangle itself is present iff no mesh edge passes through its
//! interior: a transversal edge (endpoints strictly on opposite sides
//! of the plane, crossing point interior to the triangle) is the only
//! way the tiling can be blocked, because mesh simplices never cross
//! each other transversely. Each offending edge is first attacked with
//! an edge-removal flip; when none is valid, a Steiner vertex is
//! inserted at the exact edge/triangle intersection and the cavity
//! re-Delaunayed. Mesh surgery can disturb already-recovered segment
//! chains, so every round of fixes is followed by a chain
//! re-stabilization sweep before coverage is finally verified.
//!
//! Recovery can fail on pathological input (e.g. a self-intersecting
//! surface handed in as a polyhedron); that is reported as a clean
//! `false`, never a crash, and the rest of the pipeline still runs.

#![forbid(unsafe_code)]

use super::collections::{FastHashMap, FastHashSet};
use super::delaunay::{Inserter, TetrahedrizeStats, TriangulationError};
use super::flips::remove_edge;
use super::overlay::StructuredPlc;
use super::segment_recovery::recover_segments;
use super::tet_mesh::{TetMesh, EDGE_VERTS};
use crate::geometry::exact::{orient2d_exact, segment_plane_intersection};
use crate::geometry::point::VertexRep;
use crate::geometry::predicates::orient3d_sign;

/// Rounds of fix-then-restabilize before giving up.
const ROUND_BUDGET: usize = 16;
/// Crossing fixes per triangle per round.
const FIX_BUDGET: usize = 256;

/// Force every constraint triangle to appear as a union of mesh faces
/// and record the children. Returns whether recovery fully succeeded.
///
/// # Errors
///
/// Propagates insertion failures; a mere failure to converge is the
/// `Ok(false)` outcome, not an error.
pub fn recover_faces(
    mesh: &mut TetMesh,
    overlay: &mut StructuredPlc,
    inserter: &mut Inserter,
    stats: &mut TetrahedrizeStats,
) -> Result<bool, TriangulationError> {
    for round in 0..ROUND_BUDGET {
        let mut mutated = false;
        for ti in 0..overlay.triangles.len() {
            mutated |= resolve_crossings(mesh, overlay, ti, inserter, stats)?;
        }
        if mutated {
            // Steiner insertions and flips may have rebuilt regions an
            // earlier chain ran through.
            recover_segments(mesh, overlay, inserter, stats)?;
            continue;
        }
        log::debug!("face recovery: no crossings after {round} rounds");
        let mut all_covered = true;
        for ti in 0..overlay.triangles.len() {
            let children = collect_children(mesh, overlay, ti);
            let covered = verify_coverage(overlay, ti, &children);
            if !covered {
                log::debug!("face recovery: triangle {ti} is not tiled by mesh faces");
                all_covered = false;
            }
            overlay.triangles[ti].children = children;
        }
        return Ok(all_covered);
    }
    log::debug!("face recovery gave up after {ROUND_BUDGET} rounds");
    Ok(false)
}

/// Remove every mesh edge properly crossing triangle `ti`'s interior.
/// Returns whether the mesh was modified.
fn resolve_crossings(
    mesh: &mut TetMesh,
    overlay: &StructuredPlc,
    ti: usize,
    inserter: &mut Inserter,
    stats: &mut TetrahedrizeStats,
) -> Result<bool, TriangulationError> {
    let tri = overlay.triangles[ti].verts;
    let mut mutated = false;
    for _ in 0..FIX_BUDGET {
        let Some((a, b)) = find_crossing_edge(mesh, tri) else {
            return Ok(mutated);
        };
        mutated = true;
        if remove_edge(mesh, a, b, None).is_ok() {
            continue;
        }
        let s0 = mesh.rep(a).homogeneous();
        let s1 = mesh.rep(b).homogeneous();
        let t0 = mesh.rep(tri[0]).homogeneous();
        let t1 = mesh.rep(tri[1]).homogeneous();
        let t2 = mesh.rep(tri[2]).homogeneous();
        let point = segment_plane_intersection(&s0, &s1, [&t0, &t1, &t2]).ok_or_else(|| {
            TriangulationError::RecoveryStall {
                message: format!("edge ({a}, {b}) does not cross triangle {ti}'s plane"),
            }
        })?;
        let s = mesh.push_vertex(VertexRep::Intersection(point));
        log::trace!("steiner vertex {s} splits edge ({a}, {b}) on triangle {ti}");
        inserter.insert(mesh, s, None, stats)?;
    }
    Err(TriangulationError::RecoveryStall {
        message: format!("triangle {ti} exceeded its crossing-fix budget"),
    })
}

/// First mesh edge properly crossing the triangle's interior, in
/// deterministic scan order.
fn find_crossing_edge(mesh: &TetMesh, tri: [u32; 3]) -> Option<(u32, u32)> {
    let [p, q, r] = tri;
    let mut tested: FastHashSet<(u32, u32)> = FastHashSet::default();
    for t in mesh.tets() {
        if mesh.is_ghost(t) {
            continue;
        }
        let n = mesh.nodes(t);
        for ev in EDGE_VERTS {
            let (a, b) = (n[ev[0]], n[ev[1]]);
            let key = if a < b { (a, b) } else { (b, a) };
            if !tested.insert(key) {
                continue;
            }
            if a == p || a == q || a == r || b == p || b == q || b == r {
                continue;
            }
            let sa = orient3d_sign([mesh.rep(p), mesh.rep(q), mesh.rep(r), mesh.rep(a)]);
            if sa == 0 {
                continue;
            }
            let sb = orient3d_sign([mesh.rep(p), mesh.rep(q), mesh.rep(r), mesh.rep(b)]);
            if sb == 0 || sa == sb {
                continue;
            }
            // Strictly opposite sides; the crossing point is interior
            // to the triangle iff the three side volumes agree in sign.
            let s1 = orient3d_sign([mesh.rep(p), mesh.rep(q), mesh.rep(a), mesh.rep(b)]);
            let s2 = orient3d_sign([mesh.rep(q), mesh.rep(r), mesh.rep(a), mesh.rep(b)]);
            let s3 = orient3d_sign([mesh.rep(r), mesh.rep(p), mesh.rep(a), mesh.rep(b)]);
            if (s1 > 0 && s2 > 0 && s3 > 0) || (s1 < 0 && s2 < 0 && s3 < 0) {
                return Some(key);
            }
        }
    }
    None
}

/// All mesh faces lying on triangle `ti` (each face once).
fn collect_children(mesh: &TetMesh, overlay: &StructuredPlc, ti: usize) -> Vec<[u32; 3]> {
    let tri = overlay.triangles[ti].verts;
    // A geometrically degenerate constraint triangle has no tiling.
    let Some(basis) = ProjectedTriangle::new(mesh, tri) else {
        return Vec::new();
    };
    let mut children = Vec::new();
    for t in mesh.tets() {
        if mesh.is_ghost(t) {
            continue;
        }
        for f in 0..4 {
            let (u, _) = mesh.neighbor(t, f);
            // Count interior faces once, hull faces from the real side.
            if !mesh.is_ghost(u) && u < t {
                continue;
            }
            let face = mesh.face_vertices(t, f);
            if face
                .iter()
                .all(|&w| basis.contains(mesh, w))
            {
                children.push(face);
            }
        }
    }
    children
}

/// A constraint triangle with its projection fixed for exact 2D
/// containment tests.
struct ProjectedTriangle {
    verts: [u32; 3],
    axes: (usize, usize),
    orientation: i32,
}

impl ProjectedTriangle {
    fn new(mesh: &TetMesh, verts: [u32; 3]) -> Option<Self> {
        let h = [
            mesh.rep(verts[0]).homogeneous(),
            mesh.rep(verts[1]).homogeneous(),
            mesh.rep(verts[2]).homogeneous(),
        ];
        for axes in [(0usize, 1usize), (0, 2), (1, 2)] {
            let o = orient2d_exact([&h[0], &h[1], &h[2]], axes);
            if o != 0 {
                return Some(Self {
                    verts,
                    axes,
                    orientation: o,
                });
            }
        }
        None
    }

    /// Is vertex `w` on the closed triangle (plane membership plus 2D
    /// containment)?
    fn contains(&self, mesh: &TetMesh, w: u32) -> bool {
        let [p, q, r] = self.verts;
        if w == p || w == q || w == r {
            return true;
        }
        if orient3d_sign([mesh.rep(p), mesh.rep(q), mesh.rep(r), mesh.rep(w)]) != 0 {
            return false;
        }
        let hw = mesh.rep(w).homogeneous();
        let hp = mesh.rep(p).homogeneous();
        let hq = mesh.rep(q).homogeneous();
        let hr = mesh.rep(r).homogeneous();
        for (e0, e1) in [(&hp, &hq), (&hq, &hr), (&hr, &hp)] {
            if orient2d_exact([e0, e1, &hw], self.axes) * self.orientation < 0 {
                return false;
            }
        }
        true
    }
}

/// Combinatorial tiling check: every child-set edge is either a chain
/// edge of the triangle's boundary (bounding exactly one child) or
/// interior (shared by exactly two children).
fn verify_coverage(overlay: &StructuredPlc, ti: usize, children: &[[u32; 3]]) -> bool {
    if children.is_empty() {
        return false;
    }
    let mut chain_edges: FastHashSet<(u32, u32)> = FastHashSet::default();
    for &e in &overlay.triangles[ti].edges {
        let edge = &overlay.edges[e as usize];
        if edge.chain.len() < 2 {
            return false;
        }
        for (a, b) in edge.child_edges() {
            chain_edges.insert(if a < b { (a, b) } else { (b, a) });
        }
    }
    let mut counts: FastHashMap<(u32, u32), u32> = FastHashMap::default();
    for face in children {
        for (a, b) in [
            (face[0], face[1]),
            (face[1], face[2]),
            (face[2], face[0]),
        ] {
            let key = if a < b { (a, b) } else { (b, a) };
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    for (&edge, &count) in &counts {
        let expected = if chain_edges.contains(&edge) { 1 } else { 2 };
        if count != expected {
            return false;
        }
    }
    // Every boundary chain edge must bound a child.
    chain_edges.iter().all(|e| counts.contains_key(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::delaunay::tetrahedrize;
    use crate::core::plc::InputPlc;

    fn run_pipeline(plc: &InputPlc) -> (TetMesh, StructuredPlc, bool) {
        let mut mesh = TetMesh::new(
            (0..plc.num_vertices())
                .map(|i| VertexRep::Input(plc.vertex(i)))
                .collect(),
        );
        tetrahedrize(&mut mesh).unwrap();
        let mut overlay = StructuredPlc::build(plc);
        let mut inserter = Inserter::new();
        let mut stats = TetrahedrizeStats::default();
        recover_segments(&mut mesh, &mut overlay, &mut inserter, &mut stats).unwrap();
        let ok = recover_faces(&mut mesh, &mut overlay, &mut inserter, &mut stats).unwrap();
        (mesh, overlay, ok)
    }

    #[test]
    fn tetrahedron_faces_are_their_own_children() {
        let v = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0,
        ];
        let t = [0u32, 2, 1, 0, 1, 3, 1, 2, 3, 2, 0, 3];
        let plc = InputPlc::from_packed(&v, &t).unwrap();
        let (_, overlay, ok) = run_pipeline(&plc);
        assert!(ok);
        for tri in &overlay.triangles {
            assert_eq!(tri.children.len(), 1);
            let mut expect = tri.verts;
            expect.sort_unstable();
            let mut got = tri.children[0];
            got.sort_unstable();
            assert_eq!(got, expect);
        }
    }

    #[test]
    fn cube_faces_are_recovered_without_steiner_points() {
        let v = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, //
            1.0, 0.0, 1.0, //
            1.0, 1.0, 1.0, //
            0.0, 1.0, 1.0,
        ];
        // Standard 12-triangle cube surface, outward-facing.
        let t = [
            0u32, 2, 1, 0, 3, 2, // bottom
            4, 5, 6, 4, 6, 7, // top
            0, 1, 5, 0, 5, 4, // front
            1, 2, 6, 1, 6, 5, // right
            2, 3, 7, 2, 7, 6, // back
            3, 0, 4, 3, 4, 7, // left
        ];
        let plc = InputPlc::from_packed(&v, &t).unwrap();
        let (mesh, overlay, ok) = run_pipeline(&plc);
        assert!(ok, "cube faces not recovered");
        assert_eq!(mesh.num_vertices(), 8, "no Steiner vertices expected");
        for tri in &overlay.triangles {
            assert!(!tri.children.is_empty());
        }
        mesh.validate().unwrap();
    }
}
