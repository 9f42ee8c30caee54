//! Structured PLC: input constraints overlaid on the tetrahedral mesh.
//!
//! Each input triangle and each distinct input edge is tracked with the
//! mesh entities that realize it. Right after Delaunay construction
//! every constraint is unresolved; segment recovery fills the edge
//! chains and face recovery the child faces. The overlay borrows vertex
//! handles from the mesh and owns no geometry.

#![forbid(unsafe_code)]

use super::collections::{FastHashMap, SmallBuffer};
use super::plc::InputPlc;

/// A distinct input edge and, after recovery, its chain of mesh
/// vertices from one endpoint to the other.
#[derive(Clone, Debug)]
pub struct ConstraintEdge {
    /// Endpoint vertex handles, as given (unsorted).
    pub verts: [u32; 2],
    /// Input triangles incident to this edge.
    pub triangles: SmallBuffer<u32, 2>,
    /// Ordered vertex chain `verts[0] .. verts[1]`; empty while
    /// unresolved. Consecutive pairs are mesh edges.
    pub chain: Vec<u32>,
}

impl ConstraintEdge {
    /// The recovered child edges, in order along the segment.
    pub fn child_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.chain.windows(2).map(|w| (w[0], w[1]))
    }
}

/// An input triangle and, after recovery, the mesh faces tiling it.
#[derive(Clone, Debug)]
pub struct ConstraintTriangle {
    /// Corner vertex handles, as given.
    pub verts: [u32; 3],
    /// Indices into [`StructuredPlc::edges`] of the three sides.
    pub edges: [u32; 3],
    /// Vertex triples of the mesh faces whose union is this triangle;
    /// empty while unresolved.
    pub children: Vec<[u32; 3]>,
}

/// The constraint overlay.
#[derive(Clone, Debug)]
pub struct StructuredPlc {
    /// One record per input triangle, in input order.
    pub triangles: Vec<ConstraintTriangle>,
    /// Distinct input edges, in order of first appearance.
    pub edges: Vec<ConstraintEdge>,
    /// True iff the input surface is closed and 2-manifold: every
    /// constraint edge is shared by exactly two input triangles.
    pub is_polyhedron: bool,
}

impl StructuredPlc {
    /// Cross-index the input constraints.
    #[must_use]
    pub fn build(plc: &InputPlc) -> Self {
        let mut edges: Vec<ConstraintEdge> = Vec::new();
        let mut edge_index: FastHashMap<(u32, u32), u32> = FastHashMap::default();
        let mut triangles = Vec::with_capacity(plc.num_triangles());

        for t in 0..plc.num_triangles() {
            let verts = plc.triangle(t);
            let mut edge_ids = [0u32; 3];
            for (k, (a, b)) in [
                (verts[0], verts[1]),
                (verts[1], verts[2]),
                (verts[2], verts[0]),
            ]
            .into_iter()
            .enumerate()
            {
                let key = if a < b { (a, b) } else { (b, a) };
                let id = *edge_index.entry(key).or_insert_with(|| {
                    edges.push(ConstraintEdge {
                        verts: [a, b],
                        triangles: SmallBuffer::new(),
                        chain: Vec::new(),
                    });
                    (edges.len() - 1) as u32
                });
                edges[id as usize].triangles.push(t as u32);
                edge_ids[k] = id;
            }
            triangles.push(ConstraintTriangle {
                verts,
                edges: edge_ids,
                children: Vec::new(),
            });
        }

        let is_polyhedron =
            !triangles.is_empty() && edges.iter().all(|e| e.triangles.len() == 2);
        log::debug!(
            "structured PLC: {} triangles, {} distinct edges, polyhedron: {}",
            triangles.len(),
            edges.len(),
            is_polyhedron,
        );
        Self {
            triangles,
            edges,
            is_polyhedron,
        }
    }

    /// True once every edge chain and every triangle's children are
    /// recorded.
    #[must_use]
    pub fn fully_resolved(&self) -> bool {
        self.edges.iter().all(|e| e.chain.len() >= 2)
            && self.triangles.iter().all(|t| !t.children.is_empty())
    }
}
