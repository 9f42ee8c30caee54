//! Incremental Delaunay tetrahedrization.
//!
//! Bowyer–Watson construction over the ghost-closed tetrahedron store:
//! a seed tetrahedron is found by scanning for four non-coplanar input
//! vertices, the hull is closed with four ghost tetrahedra, and every
//! remaining vertex is inserted by locating a conflicting tetrahedron
//! with an oriented walk, carving the conflict cavity with the
//! symbolically perturbed insphere predicate, and connecting the new
//! vertex to every cavity boundary face.
//!
//! Insertion order is the caller's vertex order; handles are never
//! remapped. Exact duplicates are detected at location time and left
//! out of the tetrahedrization without renumbering anything.
//!
//! Degenerate inputs are the interesting part. Cospherical point sets
//! (a cube) give ties that `insphere_sos` breaks deterministically, and
//! a query exactly on a hull face plane falls through to an in-circle
//! test against that face. After the conflict cavity is collected it is
//! expanded until every real boundary face sees the new vertex strictly
//! positively, which is what keeps zero-volume tetrahedra out of the
//! mesh when points land on existing face planes.

#![forbid(unsafe_code)]

use thiserror::Error;

use super::collections::FastHashMap;
use super::tet_mesh::{TetMesh, FACE_VERTS, INFINITE_VERTEX};
use crate::geometry::expansion::Expansion;
use crate::geometry::point::{Pt3, VertexRep};
use crate::geometry::predicates::{incircle_sos, insphere_sos, orient3d_sign};

/// Errors raised while building or locally repairing the
/// tetrahedrization.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TriangulationError {
    /// Fewer than four vertices were supplied.
    #[error("cannot tetrahedrize {available} vertices; at least 4 are required")]
    NotEnoughVertices {
        /// Number of vertices available.
        available: usize,
    },
    /// No four input vertices span three dimensions.
    #[error("geometric degeneracy: {message}")]
    GeometricDegeneracy {
        /// What degenerated.
        message: String,
    },
    /// A conflict cavity could not be retetrahedrized consistently.
    #[error("cavity inconsistency while inserting vertex {vertex}: {message}")]
    CavityInconsistency {
        /// Vertex being inserted.
        vertex: u32,
        /// What went wrong.
        message: String,
    },
    /// Constraint recovery stopped making progress.
    #[error("constraint recovery stalled: {message}")]
    RecoveryStall {
        /// What stalled.
        message: String,
    },
}

/// Counters reported by [`tetrahedrize`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TetrahedrizeStats {
    /// Vertices actually inserted (seed included).
    pub vertices_inserted: usize,
    /// Exact duplicates skipped.
    pub duplicates_skipped: usize,
    /// Boundary faces that forced a cavity expansion.
    pub cavity_expansions: usize,
    /// Largest conflict cavity seen.
    pub largest_cavity: usize,
}

/// Outcome of a single vertex insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The vertex is now part of the tetrahedrization.
    Inserted,
    /// The vertex exactly duplicates an existing one and was skipped.
    Duplicate,
}

// =============================================================================
// SEED SELECTION
// =============================================================================

fn exactly_collinear(a: &Pt3, b: &Pt3, c: &Pt3) -> bool {
    let u = [
        Expansion::from_diff(b.x, a.x),
        Expansion::from_diff(b.y, a.y),
        Expansion::from_diff(b.z, a.z),
    ];
    let v = [
        Expansion::from_diff(c.x, a.x),
        Expansion::from_diff(c.y, a.y),
        Expansion::from_diff(c.z, a.z),
    ];
    let cross_x = u[1].mul(&v[2]).sub(&u[2].mul(&v[1]));
    let cross_y = u[2].mul(&v[0]).sub(&u[0].mul(&v[2]));
    let cross_z = u[0].mul(&v[1]).sub(&u[1].mul(&v[0]));
    cross_x.sign() == 0 && cross_y.sign() == 0 && cross_z.sign() == 0
}

/// Scan for four affinely independent vertices, in index order.
fn find_seed(mesh: &TetMesh) -> Result<[u32; 4], TriangulationError> {
    let n = mesh.num_vertices();
    let v0 = 0u32;
    let p0 = *mesh.coord(v0);

    let v1 = (1..n as u32)
        .find(|&j| *mesh.coord(j) != p0)
        .ok_or_else(|| TriangulationError::GeometricDegeneracy {
            message: "all vertices coincide".to_string(),
        })?;
    let p1 = *mesh.coord(v1);

    let v2 = ((v1 + 1)..n as u32)
        .find(|&j| !exactly_collinear(&p0, &p1, mesh.coord(j)))
        .ok_or_else(|| TriangulationError::GeometricDegeneracy {
            message: "all vertices are collinear".to_string(),
        })?;

    let v3 = ((v2 + 1)..n as u32)
        .find(|&j| {
            orient3d_sign([mesh.rep(v0), mesh.rep(v1), mesh.rep(v2), mesh.rep(j)]) != 0
        })
        .ok_or_else(|| TriangulationError::GeometricDegeneracy {
            message: "all vertices are coplanar".to_string(),
        })?;

    Ok([v0, v1, v2, v3])
}

/// Create the seed tetrahedron and its four ghost neighbors.
fn make_seed(mesh: &mut TetMesh, seed: [u32; 4]) -> u32 {
    let [v0, v1, v2, v3] = seed;
    let s = orient3d_sign([mesh.rep(v0), mesh.rep(v1), mesh.rep(v2), mesh.rep(v3)]);
    debug_assert!(s != 0);
    let nodes = if s > 0 {
        [v0, v1, v2, v3]
    } else {
        [v0, v2, v1, v3]
    };
    let t0 = mesh.alloc_tet(nodes);

    let mut ghosts = [0u32; 4];
    for f in 0..4 {
        let [g0, g1, g2] = mesh.face_vertices(t0, f);
        // Reversed hull face plus the infinite apex keeps the tuple
        // positively oriented with infinity on the outside.
        let ghost = mesh.alloc_tet([g0, g2, g1, INFINITE_VERTEX]);
        mesh.bond(t0, f, ghost, 3);
        ghosts[f] = ghost;
    }
    // Adjacent ghosts share a hull edge plus the infinite vertex.
    for f in 0..4 {
        for fp in (f + 1)..4 {
            let mut shared = mesh
                .face_vertices(t0, f)
                .into_iter()
                .filter(|v| mesh.face_vertices(t0, fp).contains(v));
            let e0 = shared.next().expect("seed faces share an edge");
            let e1 = shared.next().expect("seed faces share an edge");
            let fa = mesh
                .find_face(ghosts[f], [e0, e1, INFINITE_VERTEX])
                .expect("ghost face along shared edge");
            let fb = mesh
                .find_face(ghosts[fp], [e0, e1, INFINITE_VERTEX])
                .expect("ghost face along shared edge");
            mesh.bond(ghosts[f], fa, ghosts[fp], fb);
        }
    }
    t0
}

// =============================================================================
// POINT INSERTION
// =============================================================================

/// Reusable insertion machinery: walk hints and cavity stamps.
#[derive(Debug, Default)]
pub struct Inserter {
    stamp: Vec<u32>,
    epoch: u32,
    last_tet: Option<u32>,
}

enum Located {
    /// A tetrahedron in conflict with the query.
    Conflict(u32),
    /// The query equals an existing vertex.
    Duplicate,
}

impl Inserter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert vertex `v` (already pushed into the mesh) into the
    /// tetrahedrization, re-establishing the Delaunay property locally.
    ///
    /// `hint` is a tetrahedron to start the locating walk from.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::CavityInconsistency`] if the
    /// conflict cavity cannot be retetrahedrized; the mesh is not
    /// usable afterwards.
    pub fn insert(
        &mut self,
        mesh: &mut TetMesh,
        v: u32,
        hint: Option<u32>,
        stats: &mut TetrahedrizeStats,
    ) -> Result<InsertOutcome, TriangulationError> {
        let seed = match self.locate(mesh, v, hint) {
            Located::Duplicate => {
                stats.duplicates_skipped += 1;
                return Ok(InsertOutcome::Duplicate);
            }
            Located::Conflict(t) => t,
        };

        // -------- conflict cavity ------------------------------------
        self.begin_epoch(mesh);
        let mut cavity: Vec<u32> = vec![seed];
        self.stamp[seed as usize] = self.epoch;
        let mut head = 0;
        while head < cavity.len() {
            let t = cavity[head];
            head += 1;
            for f in 0..4 {
                let (u, _) = mesh.neighbor(t, f);
                if self.stamp[u as usize] == self.epoch {
                    continue;
                }
                if conflicts(mesh, u, v) {
                    self.stamp[u as usize] = self.epoch;
                    cavity.push(u);
                }
            }
        }

        // -------- expansion: strict visibility of real faces ---------
        // A real boundary face the new vertex cannot see strictly would
        // become a zero-volume tetrahedron; pull the outside tetrahedron
        // into the cavity instead and re-check.
        'expand: loop {
            let mut i = 0;
            while i < cavity.len() {
                let t = cavity[i];
                i += 1;
                for f in 0..4 {
                    let (u, _) = mesh.neighbor(t, f);
                    if self.stamp[u as usize] == self.epoch {
                        continue;
                    }
                    let face = mesh.face_vertices(t, f);
                    if face.contains(&INFINITE_VERTEX) {
                        continue;
                    }
                    let s = orient3d_sign([
                        mesh.rep(face[0]),
                        mesh.rep(face[1]),
                        mesh.rep(face[2]),
                        mesh.rep(v),
                    ]);
                    if s <= 0 {
                        self.stamp[u as usize] = self.epoch;
                        cavity.push(u);
                        stats.cavity_expansions += 1;
                        if cavity.len() > mesh.num_tets() {
                            return Err(TriangulationError::CavityInconsistency {
                                vertex: v,
                                message: "cavity expansion swallowed the mesh".to_string(),
                            });
                        }
                        continue 'expand;
                    }
                }
            }
            break;
        }
        stats.largest_cavity = stats.largest_cavity.max(cavity.len());

        // -------- boundary faces -------------------------------------
        struct Boundary {
            face: [u32; 3],
            outside: u32,
            outside_face: usize,
        }
        let mut boundary: Vec<Boundary> = Vec::with_capacity(cavity.len() + 4);
        for &t in &cavity {
            for f in 0..4 {
                let (u, g) = mesh.neighbor(t, f);
                if self.stamp[u as usize] != self.epoch {
                    boundary.push(Boundary {
                        face: mesh.face_vertices(t, f),
                        outside: u,
                        outside_face: g,
                    });
                }
            }
        }
        if boundary.is_empty() {
            return Err(TriangulationError::CavityInconsistency {
                vertex: v,
                message: "conflict cavity has no boundary".to_string(),
            });
        }
        // Every cavity vertex must survive on the boundary, or the
        // retetrahedrization would bury it inside the cavity region.
        {
            let mut on_boundary: Vec<u32> = boundary
                .iter()
                .flat_map(|b| b.face.into_iter())
                .collect();
            on_boundary.sort_unstable();
            for &t in &cavity {
                for n in mesh.nodes(t) {
                    if on_boundary.binary_search(&n).is_err() {
                        return Err(TriangulationError::CavityInconsistency {
                            vertex: v,
                            message: format!("vertex {n} swallowed by the cavity"),
                        });
                    }
                }
            }
        }

        // -------- retetrahedrize -------------------------------------
        for &t in &cavity {
            mesh.free_tet(t);
        }
        let mut ridge: FastHashMap<(u32, u32), (u32, usize)> = FastHashMap::default();
        let mut last_real = None;
        for b in &boundary {
            let nt = mesh.alloc_tet([b.face[0], b.face[1], b.face[2], v]);
            mesh.bond(nt, 3, b.outside, b.outside_face);
            for i in 0..3 {
                let (ea, eb) = match i {
                    0 => (b.face[1], b.face[2]),
                    1 => (b.face[0], b.face[2]),
                    _ => (b.face[0], b.face[1]),
                };
                let key = if ea < eb { (ea, eb) } else { (eb, ea) };
                if let Some((ot, of)) = ridge.remove(&key) {
                    mesh.bond(nt, i, ot, of);
                } else {
                    ridge.insert(key, (nt, i));
                }
            }
            if !b.face.contains(&INFINITE_VERTEX) {
                last_real = Some(nt);
                debug_assert_eq!(
                    orient3d_sign([
                        mesh.rep(b.face[0]),
                        mesh.rep(b.face[1]),
                        mesh.rep(b.face[2]),
                        mesh.rep(v)
                    ]),
                    1
                );
            }
        }
        if !ridge.is_empty() {
            return Err(TriangulationError::CavityInconsistency {
                vertex: v,
                message: "cavity boundary is not watertight".to_string(),
            });
        }
        self.last_tet = last_real;
        stats.vertices_inserted += 1;
        Ok(InsertOutcome::Inserted)
    }

    fn begin_epoch(&mut self, mesh: &TetMesh) {
        self.stamp.resize(mesh.num_tet_slots(), 0);
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            self.stamp.fill(0);
            self.epoch = 1;
        }
    }

    /// Find a tetrahedron in conflict with vertex `v` by an oriented
    /// walk, falling back to an exhaustive scan if the walk cycles on
    /// degenerate geometry.
    fn locate(&mut self, mesh: &TetMesh, v: u32, hint: Option<u32>) -> Located {
        let mut t = hint
            .or(self.last_tet)
            .filter(|&t| (t as usize) < mesh.num_tet_slots() && !mesh.is_free(t))
            .unwrap_or_else(|| mesh.tets().next().expect("mesh has no tetrahedra"));
        if mesh.is_ghost(t) {
            let real_face = mesh.infinite_corner(t).expect("ghost without infinite corner");
            t = mesh.neighbor(t, real_face).0;
        }

        let mut prev = u32::MAX;
        let max_steps = 4 * mesh.num_tets() + 64;
        for _ in 0..max_steps {
            if mesh.is_ghost(t) {
                // Walked out of the hull: the ghost is in conflict.
                return Located::Conflict(t);
            }
            if duplicate_in(mesh, t, v).is_some() {
                return Located::Duplicate;
            }
            let mut next = None;
            for f in 0..4 {
                let face = mesh.face_vertices(t, f);
                let s = orient3d_sign([
                    mesh.rep(face[0]),
                    mesh.rep(face[1]),
                    mesh.rep(face[2]),
                    mesh.rep(v),
                ]);
                if s < 0 {
                    let (u, _) = mesh.neighbor(t, f);
                    if u != prev {
                        next = Some(u);
                        break;
                    }
                    if next.is_none() {
                        next = Some(u);
                    }
                }
            }
            match next {
                Some(u) => {
                    prev = t;
                    t = u;
                }
                // No negative face: v is inside (or on the boundary of)
                // this tetrahedron, hence inside its circumsphere.
                None => return Located::Conflict(t),
            }
        }

        // Walk exceeded its budget; scan for any conflict.
        for t in mesh.tets() {
            if !mesh.is_ghost(t) && duplicate_in(mesh, t, v).is_some() {
                return Located::Duplicate;
            }
        }
        for t in mesh.tets() {
            if conflicts(mesh, t, v) {
                return Located::Conflict(t);
            }
        }
        unreachable!("no tetrahedron conflicts with vertex {v}");
    }
}

fn duplicate_in(mesh: &TetMesh, t: u32, v: u32) -> Option<u32> {
    let p = mesh.rep(v).as_input()?;
    for n in mesh.nodes(t) {
        if n == INFINITE_VERTEX || n == v {
            continue;
        }
        if let Some(q) = mesh.rep(n).as_input() {
            if p == q {
                return Some(n);
            }
        }
    }
    None
}

/// Conflict test: is `v` inside the (possibly degenerate) circumsphere
/// of tetrahedron `t`?
///
/// For a ghost the sphere degenerates to the closed half-space beyond
/// the hull face, plus the face's own circumcircle for queries exactly
/// on its plane.
fn conflicts(mesh: &TetMesh, t: u32, v: u32) -> bool {
    if mesh.is_ghost(t) {
        let k = mesh.infinite_corner(t).expect("ghost without infinite corner");
        let face = mesh.face_vertices(t, k);
        debug_assert!(!face.contains(&INFINITE_VERTEX));
        let s = orient3d_sign([
            mesh.rep(face[0]),
            mesh.rep(face[1]),
            mesh.rep(face[2]),
            mesh.rep(v),
        ]);
        if s != 0 {
            return s > 0;
        }
        incircle_sos(
            [
                mesh.rep(face[0]),
                mesh.rep(face[1]),
                mesh.rep(face[2]),
                mesh.rep(v),
            ],
            [face[0], face[1], face[2], v],
        ) > 0
    } else {
        let n = mesh.nodes(t);
        insphere_sos(
            [
                mesh.rep(n[0]),
                mesh.rep(n[1]),
                mesh.rep(n[2]),
                mesh.rep(n[3]),
                mesh.rep(v),
            ],
            [n[0], n[1], n[2], n[3], v],
        ) > 0
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// Build the Delaunay tetrahedrization of all mesh vertices.
///
/// # Errors
///
/// [`TriangulationError::NotEnoughVertices`] or
/// [`TriangulationError::GeometricDegeneracy`] when no seed tetrahedron
/// exists; [`TriangulationError::CavityInconsistency`] if an insertion
/// fails (which indicates a bug rather than bad input).
pub fn tetrahedrize(mesh: &mut TetMesh) -> Result<TetrahedrizeStats, TriangulationError> {
    let n = mesh.num_vertices();
    if n < 4 {
        return Err(TriangulationError::NotEnoughVertices { available: n });
    }
    let seed = find_seed(mesh)?;
    make_seed(mesh, seed);

    let mut stats = TetrahedrizeStats {
        vertices_inserted: 4,
        ..TetrahedrizeStats::default()
    };
    let mut inserter = Inserter::new();
    for v in 0..n as u32 {
        if seed.contains(&v) {
            continue;
        }
        inserter.insert(mesh, v, None, &mut stats)?;
    }
    log::debug!(
        "tetrahedrized {} vertices into {} tetrahedra ({} duplicates skipped, \
         largest cavity {}, {} forced expansions)",
        n,
        mesh.num_tets(),
        stats.duplicates_skipped,
        stats.largest_cavity,
        stats.cavity_expansions,
    );
    debug_assert!(mesh.validate().is_ok());
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::Pt3;

    fn mesh_from(points: &[[f64; 3]]) -> TetMesh {
        TetMesh::new(
            points
                .iter()
                .map(|p| VertexRep::Input(Pt3::new(p[0], p[1], p[2])))
                .collect(),
        )
    }

    fn count_real(mesh: &TetMesh) -> usize {
        mesh.tets().filter(|&t| !mesh.is_ghost(t)).count()
    }

    #[test]
    fn four_points_make_one_tet_and_four_ghosts() {
        let mut mesh = mesh_from(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ]);
        tetrahedrize(&mut mesh).unwrap();
        assert_eq!(count_real(&mesh), 1);
        assert_eq!(mesh.num_tets(), 5);
        mesh.validate().unwrap();
    }

    #[test]
    fn interior_point_splits_into_four() {
        let mut mesh = mesh_from(&[
            [0.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
            [0.0, 4.0, 0.0],
            [0.0, 0.0, 4.0],
            [0.5, 0.5, 0.5],
        ]);
        tetrahedrize(&mut mesh).unwrap();
        assert_eq!(count_real(&mesh), 4);
        mesh.validate().unwrap();
    }

    #[test]
    fn exterior_point_extends_the_hull() {
        let mut mesh = mesh_from(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [2.0, 2.0, 2.0],
        ]);
        tetrahedrize(&mut mesh).unwrap();
        assert!(count_real(&mesh) >= 2);
        mesh.validate().unwrap();
        // All real tetrahedra are positively oriented.
        for t in mesh.tets() {
            if mesh.is_ghost(t) {
                continue;
            }
            let n = mesh.nodes(t);
            assert_eq!(
                orient3d_sign([mesh.rep(n[0]), mesh.rep(n[1]), mesh.rep(n[2]), mesh.rep(n[3])]),
                1
            );
        }
    }

    #[test]
    fn duplicate_vertices_are_skipped() {
        let mut mesh = mesh_from(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
        ]);
        let stats = tetrahedrize(&mut mesh).unwrap();
        assert_eq!(stats.duplicates_skipped, 1);
        assert_eq!(count_real(&mesh), 1);
        // The duplicate handle exists but participates in nothing.
        assert!(mesh.incident_tets(4).is_empty());
    }

    #[test]
    fn coplanar_input_reports_degeneracy() {
        let mut mesh = mesh_from(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
        ]);
        assert!(matches!(
            tetrahedrize(&mut mesh),
            Err(TriangulationError::GeometricDegeneracy { .. })
        ));
    }

    #[test]
    fn cube_corners_tetrahedrize_cleanly() {
        // All eight corners are cospherical; every insertion past the
        // seed exercises the symbolic perturbation.
        let mut mesh = mesh_from(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ]);
        tetrahedrize(&mut mesh).unwrap();
        mesh.validate().unwrap();
        let real = count_real(&mesh);
        assert!((5..=6).contains(&real), "cube split into {real} tetrahedra");
        for t in mesh.tets() {
            if mesh.is_ghost(t) {
                continue;
            }
            let n = mesh.nodes(t);
            assert_eq!(
                orient3d_sign([mesh.rep(n[0]), mesh.rep(n[1]), mesh.rep(n[2]), mesh.rep(n[3])]),
                1,
                "flat or inverted tetrahedron in cube mesh"
            );
        }
    }
}
