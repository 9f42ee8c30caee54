//! Inside/outside classification of tetrahedra.
//!
//! The union of all child faces of all constraint triangles forms a cut
//! in the tetrahedron adjacency graph. Flood-filling outward marks from
//! the ghost tetrahedra, refusing to step across the cut, labels the
//! unbounded component `Out`; everything left is enclosed by the input
//! surface and becomes `In`. When the input surface is not a closed
//! 2-manifold there is no meaningful inside, so marking degenerates to
//! labelling every finite tetrahedron `In` and the caller effectively
//! receives the whole tetrahedrization.

#![forbid(unsafe_code)]

use std::collections::VecDeque;

use super::collections::FastHashSet;
use super::overlay::StructuredPlc;
use super::tet_mesh::{TetMark, TetMesh};

/// Classify every live tetrahedron as `In` or `Out` and return the
/// number of finite `In` tetrahedra.
pub fn mark_regions(mesh: &mut TetMesh, overlay: &StructuredPlc) -> usize {
    if !overlay.is_polyhedron {
        let mut inner = 0;
        for t in mesh.tets().collect::<Vec<_>>() {
            if mesh.is_ghost(t) {
                mesh.set_mark(t, TetMark::Out);
            } else {
                mesh.set_mark(t, TetMark::In);
                inner += 1;
            }
        }
        log::debug!("marking skipped (open surface): {inner} tetrahedra kept");
        return inner;
    }

    let mut cut: FastHashSet<[u32; 3]> = FastHashSet::default();
    for tri in &overlay.triangles {
        for child in &tri.children {
            let mut key = *child;
            key.sort_unstable();
            cut.insert(key);
        }
    }

    // Outward flood fill from the ghosts, blocked by the cut.
    let mut queue: VecDeque<u32> = VecDeque::new();
    for t in mesh.tets().collect::<Vec<_>>() {
        mesh.set_mark(t, TetMark::Unset);
        if mesh.is_ghost(t) {
            mesh.set_mark(t, TetMark::Out);
            queue.push_back(t);
        }
    }
    while let Some(t) = queue.pop_front() {
        for f in 0..4 {
            let (u, _) = mesh.neighbor(t, f);
            if mesh.mark(u) != TetMark::Unset {
                continue;
            }
            let mut key = mesh.face_vertices(t, f);
            key.sort_unstable();
            if cut.contains(&key) {
                continue;
            }
            mesh.set_mark(u, TetMark::Out);
            queue.push_back(u);
        }
    }

    let mut inner = 0;
    for t in mesh.tets().collect::<Vec<_>>() {
        if mesh.mark(t) == TetMark::Unset {
            mesh.set_mark(t, TetMark::In);
            inner += 1;
        }
    }
    log::debug!(
        "marking: {} inner tetrahedra, cut of {} faces",
        inner,
        cut.len()
    );
    inner
}
