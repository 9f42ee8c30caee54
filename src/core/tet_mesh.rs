//! Flat-array tetrahedron store.
//!
//! Tetrahedra live in two parallel flat arrays: `tet_node` holds four
//! vertex handles per tetrahedron and `tet_neigh` four neighbor corner
//! codes (`adjacent_tet * 4 + adjacent_face`). The adjacency graph is
//! intrinsically cyclic, so everything is indices into this one owning
//! arena; freed slots are threaded into a free-list through their first
//! neighbor entry. Growth is amortized doubling via `Vec`; there is no
//! per-tetrahedron heap allocation.
//!
//! The convex hull is closed combinatorially by ghost tetrahedra: a
//! tetrahedron is a ghost iff one of its vertices is
//! [`INFINITE_VERTEX`]. Every live tetrahedron, ghost or not, keeps the
//! convention that its vertex tuple is positively oriented (with the
//! infinite vertex read as a point far on the outside of the hull), so
//! face tables and parity arguments apply uniformly.

#![forbid(unsafe_code)]

use thiserror::Error;

use super::collections::FastHashSet;
use crate::geometry::point::{Pt3, VertexRep};

/// Handle of the vertex at infinity.
pub const INFINITE_VERTEX: u32 = u32::MAX;

/// Missing neighbor sentinel (only seen mid-construction).
const NO_NEIGHBOR: u64 = u64::MAX;

/// Vertices of face `f` (the face opposite corner `f`), ordered so that
/// `orient3d(face[0], face[1], face[2], node(t, f))` is positive for a
/// positively oriented tuple.
pub const FACE_VERTS: [[usize; 3]; 4] = [[1, 3, 2], [0, 2, 3], [0, 3, 1], [1, 2, 0]];

/// Corner pairs of the six edges of a tetrahedron.
pub const EDGE_VERTS: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];

/// Inside/outside classification of a tetrahedron.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TetMark {
    /// Not yet classified.
    Unset,
    /// Interior to the constrained region.
    In,
    /// Exterior (or ghost).
    Out,
}

/// Structural defects reported by [`TetMesh::validate`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MeshValidationError {
    /// A vertex handle is out of range or repeated within a tetrahedron.
    #[error("tetrahedron {tet} has an invalid vertex tuple")]
    InvalidVertices {
        /// Offending tetrahedron.
        tet: u32,
    },
    /// A neighbor link is missing or not mutual.
    #[error("tetrahedron {tet} face {face} has a broken neighbor link")]
    BrokenNeighbor {
        /// Offending tetrahedron.
        tet: u32,
        /// Offending face.
        face: u8,
    },
    /// Two bonded faces do not share the same vertex set.
    #[error("tetrahedra {tet} and {neighbor} disagree on their shared face")]
    FaceMismatch {
        /// First tetrahedron.
        tet: u32,
        /// Second tetrahedron.
        neighbor: u32,
    },
}

/// The tetrahedron store.
#[derive(Clone, Debug, Default)]
pub struct TetMesh {
    reps: Vec<VertexRep>,
    coords: Vec<Pt3>,
    tet_node: Vec<u32>,
    tet_neigh: Vec<u64>,
    marks: Vec<TetMark>,
    /// One live corner (`tet * 4 + corner`) per vertex, or `NO_NEIGHBOR`.
    vert_corner: Vec<u64>,
    /// Head of the free-list threaded through `tet_neigh[4t]`.
    first_free: Option<u32>,
    num_alive: usize,
}

impl TetMesh {
    /// A mesh over the given vertices, with no tetrahedra yet.
    #[must_use]
    pub fn new(reps: Vec<VertexRep>) -> Self {
        let coords = reps.iter().map(VertexRep::approx).collect();
        let vert_corner = vec![NO_NEIGHBOR; reps.len()];
        Self {
            reps,
            coords,
            tet_node: Vec::new(),
            tet_neigh: Vec::new(),
            marks: Vec::new(),
            vert_corner,
            first_free: None,
            num_alive: 0,
        }
    }

    // =========================================================================
    // VERTICES
    // =========================================================================

    #[inline]
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.reps.len()
    }

    /// Append a vertex (used for Steiner points) and return its handle.
    pub fn push_vertex(&mut self, rep: VertexRep) -> u32 {
        let handle = u32::try_from(self.reps.len()).expect("vertex handle overflow");
        self.coords.push(rep.approx());
        self.reps.push(rep);
        self.vert_corner.push(NO_NEIGHBOR);
        handle
    }

    /// Predicate-level representation of vertex `v`.
    #[inline]
    #[must_use]
    pub fn rep(&self, v: u32) -> &VertexRep {
        &self.reps[v as usize]
    }

    /// Approximate coordinates of vertex `v`.
    #[inline]
    #[must_use]
    pub fn coord(&self, v: u32) -> &Pt3 {
        &self.coords[v as usize]
    }

    // =========================================================================
    // TETRAHEDRA
    // =========================================================================

    /// Number of tetrahedron slots, free ones included.
    #[inline]
    #[must_use]
    pub fn num_tet_slots(&self) -> usize {
        self.tet_node.len() / 4
    }

    /// Number of live tetrahedra (ghosts included).
    #[inline]
    #[must_use]
    pub fn num_tets(&self) -> usize {
        self.num_alive
    }

    #[inline]
    #[must_use]
    pub fn is_free(&self, t: u32) -> bool {
        let base = t as usize * 4;
        self.tet_node[base] == INFINITE_VERTEX && self.tet_node[base + 1] == INFINITE_VERTEX
    }

    /// True iff tetrahedron `t` has the infinite vertex as a corner.
    #[inline]
    #[must_use]
    pub fn is_ghost(&self, t: u32) -> bool {
        debug_assert!(!self.is_free(t));
        self.nodes(t).contains(&INFINITE_VERTEX)
    }

    /// Iterate over the handles of all live tetrahedra.
    pub fn tets(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.num_tet_slots() as u32).filter(|&t| !self.is_free(t))
    }

    /// Allocate a tetrahedron with the given vertex tuple.
    ///
    /// Neighbors start unset and must be bonded before the mesh is used;
    /// the new tetrahedron is registered as the incident corner of each
    /// of its finite vertices.
    pub fn alloc_tet(&mut self, nodes: [u32; 4]) -> u32 {
        let t = if let Some(free) = self.first_free {
            let base = free as usize * 4;
            let next = self.tet_neigh[base];
            self.first_free = if next == NO_NEIGHBOR {
                None
            } else {
                Some(u32::try_from(next).expect("free-list entry overflow"))
            };
            free
        } else {
            let t = u32::try_from(self.num_tet_slots()).expect("tetrahedron handle overflow");
            self.tet_node.resize(self.tet_node.len() + 4, INFINITE_VERTEX);
            self.tet_neigh.resize(self.tet_neigh.len() + 4, NO_NEIGHBOR);
            self.marks.push(TetMark::Unset);
            t
        };
        let base = t as usize * 4;
        self.tet_node[base..base + 4].copy_from_slice(&nodes);
        self.tet_neigh[base..base + 4].fill(NO_NEIGHBOR);
        self.marks[t as usize] = TetMark::Unset;
        for (corner, &v) in nodes.iter().enumerate() {
            if v != INFINITE_VERTEX {
                self.vert_corner[v as usize] = base as u64 + corner as u64;
            }
        }
        self.num_alive += 1;
        t
    }

    /// Release a tetrahedron back to the free-list.
    pub fn free_tet(&mut self, t: u32) {
        debug_assert!(!self.is_free(t));
        let base = t as usize * 4;
        self.tet_node[base..base + 4].fill(INFINITE_VERTEX);
        self.tet_neigh[base] = self.first_free.map_or(NO_NEIGHBOR, u64::from);
        self.marks[t as usize] = TetMark::Unset;
        self.first_free = Some(t);
        self.num_alive -= 1;
    }

    #[inline]
    #[must_use]
    pub fn node(&self, t: u32, corner: usize) -> u32 {
        self.tet_node[t as usize * 4 + corner]
    }

    #[inline]
    #[must_use]
    pub fn nodes(&self, t: u32) -> [u32; 4] {
        let base = t as usize * 4;
        [
            self.tet_node[base],
            self.tet_node[base + 1],
            self.tet_node[base + 2],
            self.tet_node[base + 3],
        ]
    }

    /// Position of vertex `v` in tetrahedron `t`, if present.
    #[must_use]
    pub fn corner_of(&self, t: u32, v: u32) -> Option<usize> {
        self.nodes(t).iter().position(|&n| n == v)
    }

    /// Position of the infinite vertex in a ghost tetrahedron.
    #[must_use]
    pub fn infinite_corner(&self, t: u32) -> Option<usize> {
        self.corner_of(t, INFINITE_VERTEX)
    }

    /// The three vertices of face `f` of tetrahedron `t`, in canonical
    /// (apex-positive) order.
    #[must_use]
    pub fn face_vertices(&self, t: u32, f: usize) -> [u32; 3] {
        let n = self.nodes(t);
        let fv = FACE_VERTS[f];
        [n[fv[0]], n[fv[1]], n[fv[2]]]
    }

    /// The face of `t` whose vertex set is `{verts}`.
    #[must_use]
    pub fn find_face(&self, t: u32, verts: [u32; 3]) -> Option<usize> {
        let mut want = verts;
        want.sort_unstable();
        (0..4).find(|&f| {
            let mut have = self.face_vertices(t, f);
            have.sort_unstable();
            have == want
        })
    }

    // =========================================================================
    // NEIGHBORS
    // =========================================================================

    /// Neighbor across face `f`: the adjacent tetrahedron and the face
    /// of it that looks back at `t`.
    #[inline]
    #[must_use]
    pub fn neighbor(&self, t: u32, f: usize) -> (u32, usize) {
        let code = self.tet_neigh[t as usize * 4 + f];
        debug_assert!(code != NO_NEIGHBOR, "unbonded face {f} of tetrahedron {t}");
        ((code / 4) as u32, (code % 4) as usize)
    }

    #[inline]
    #[must_use]
    pub fn has_neighbor(&self, t: u32, f: usize) -> bool {
        self.tet_neigh[t as usize * 4 + f] != NO_NEIGHBOR
    }

    /// Bond face `f` of `t` to face `g` of `u`, both directions.
    pub fn bond(&mut self, t: u32, f: usize, u: u32, g: usize) {
        self.tet_neigh[t as usize * 4 + f] = u as u64 * 4 + g as u64;
        self.tet_neigh[u as usize * 4 + g] = t as u64 * 4 + f as u64;
    }

    // =========================================================================
    // MARKS
    // =========================================================================

    #[inline]
    #[must_use]
    pub fn mark(&self, t: u32) -> TetMark {
        self.marks[t as usize]
    }

    #[inline]
    pub fn set_mark(&mut self, t: u32, mark: TetMark) {
        self.marks[t as usize] = mark;
    }

    // =========================================================================
    // INCIDENCE QUERIES
    // =========================================================================

    /// All live tetrahedra incident to vertex `v`, by breadth-first
    /// search over face adjacency from the stored incident corner.
    #[must_use]
    pub fn incident_tets(&self, v: u32) -> Vec<u32> {
        let corner = self.vert_corner[v as usize];
        if corner == NO_NEIGHBOR {
            return Vec::new();
        }
        let start = (corner / 4) as u32;
        debug_assert!(!self.is_free(start) && self.corner_of(start, v).is_some());
        let mut seen: FastHashSet<u32> = FastHashSet::default();
        let mut stack = vec![start];
        let mut out = Vec::new();
        seen.insert(start);
        while let Some(t) = stack.pop() {
            out.push(t);
            let at = self.corner_of(t, v).expect("incidence walk left the star");
            for f in 0..4 {
                if f == at || !self.has_neighbor(t, f) {
                    continue;
                }
                let (u, _) = self.neighbor(t, f);
                if self.corner_of(u, v).is_some() && seen.insert(u) {
                    stack.push(u);
                }
            }
        }
        out.sort_unstable();
        out
    }

    /// True iff `(a, b)` is an edge of some live tetrahedron.
    #[must_use]
    pub fn edge_exists(&self, a: u32, b: u32) -> bool {
        self.incident_tets(a)
            .iter()
            .any(|&t| self.corner_of(t, b).is_some())
    }

    /// Permutation parity of the arrangement `arr` of the vertex tuple
    /// of `t`: `+1` when even (so `orient3d(arr)` would be positive for
    /// the positively oriented tuple), `-1` when odd.
    #[must_use]
    pub fn arrangement_parity(&self, t: u32, arr: [u32; 4]) -> i32 {
        let nodes = self.nodes(t);
        let mut perm = arr.map(|v| {
            nodes
                .iter()
                .position(|&n| n == v)
                .expect("arrangement vertex not in tetrahedron")
        });
        let mut sign = 1;
        for i in 0..3 {
            for j in (i + 1)..4 {
                if perm[j] < perm[i] {
                    perm.swap(i, j);
                    sign = -sign;
                }
            }
        }
        sign
    }

    /// The tetrahedra around edge `(a, b)` and their link vertices, in
    /// a cyclic order consistent with orientation: tetrahedron `i` of
    /// the result holds vertices `{a, b, ring[i], ring[i + 1 mod n]}`,
    /// arranged so that `(a, b, ring[i], ring[i + 1])` is an even
    /// arrangement of its tuple.
    ///
    /// Returns `None` when the edge does not exist or its star is not a
    /// closed fan (which a consistent mesh never produces).
    #[must_use]
    pub fn edge_ring(&self, a: u32, b: u32) -> Option<(Vec<u32>, Vec<u32>)> {
        let t0 = self
            .incident_tets(a)
            .into_iter()
            .find(|&t| self.corner_of(t, b).is_some())?;
        let nodes = self.nodes(t0);
        let mut others = nodes.iter().copied().filter(|&n| n != a && n != b);
        let x = others.next()?;
        let y = others.next()?;
        let (x, y) = if self.arrangement_parity(t0, [a, b, x, y]) > 0 {
            (x, y)
        } else {
            (y, x)
        };

        let mut tets = vec![t0];
        let mut ring = vec![x, y];
        let (mut prev, mut cur, mut current) = (x, y, t0);
        loop {
            let at = self.corner_of(current, prev)?;
            if !self.has_neighbor(current, at) {
                return None;
            }
            let (u, _) = self.neighbor(current, at);
            if u == t0 {
                break;
            }
            let new_w = self
                .nodes(u)
                .into_iter()
                .find(|&n| n != a && n != b && n != cur)?;
            tets.push(u);
            if new_w != ring[0] {
                ring.push(new_w);
            }
            prev = cur;
            cur = new_w;
            current = u;
            if tets.len() > self.num_alive {
                return None;
            }
        }
        if cur != ring[0] {
            return None;
        }
        Some((tets, ring))
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Check structural invariants: vertex handle ranges, distinctness,
    /// and mutual face-consistent neighbor links.
    ///
    /// # Errors
    ///
    /// Returns the first defect found.
    pub fn validate(&self) -> Result<(), MeshValidationError> {
        let nv = self.num_vertices() as u32;
        for t in self.tets().collect::<Vec<_>>() {
            let nodes = self.nodes(t);
            for i in 0..4 {
                if nodes[i] != INFINITE_VERTEX && nodes[i] >= nv {
                    return Err(MeshValidationError::InvalidVertices { tet: t });
                }
                for j in (i + 1)..4 {
                    if nodes[i] == nodes[j] {
                        return Err(MeshValidationError::InvalidVertices { tet: t });
                    }
                }
            }
            for f in 0..4 {
                if !self.has_neighbor(t, f) {
                    return Err(MeshValidationError::BrokenNeighbor { tet: t, face: f as u8 });
                }
                let (u, g) = self.neighbor(t, f);
                if self.is_free(u) || self.neighbor(u, g) != (t, f) {
                    return Err(MeshValidationError::BrokenNeighbor { tet: t, face: f as u8 });
                }
                let mut mine = self.face_vertices(t, f);
                let mut theirs = self.face_vertices(u, g);
                mine.sort_unstable();
                theirs.sort_unstable();
                if mine != theirs {
                    return Err(MeshValidationError::FaceMismatch { tet: t, neighbor: u });
                }
            }
        }
        Ok(())
    }
}
