//! # cdt3d
//!
//! Constrained Delaunay tetrahedrization of three-dimensional
//! [piecewise linear complexes](https://en.wikipedia.org/wiki/Piecewise_linear_manifold).
//! Given packed vertex coordinates and triangular surface constraints,
//! [`compute_cdt`] produces a tetrahedral decomposition in which every
//! input triangle appears as a union of mesh faces, inserting Steiner
//! vertices only where a constraint is otherwise unrecoverable.
//!
//! # Features
//!
//! - Exact, adaptive geometric predicates (floating-point filter →
//!   interval arithmetic → Shewchuk-style expansion arithmetic), with
//!   deterministic symbolic perturbation for cospherical input
//! - Incremental Bowyer–Watson tetrahedrization with ghost tetrahedra
//!   closing the convex hull
//! - Segment and face recovery with flip-first constraint insertion and
//!   exact homogeneous Steiner points
//! - Inside/outside classification of the resulting tetrahedra against
//!   the input surface
//!
//! # Basic Usage
//!
//! ```rust
//! use cdt3d::{compute_cdt, CdtOptions};
//!
//! // The unit cube: 8 vertices and 12 constraint triangles.
//! let vertices: Vec<f64> = vec![
//!     0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
//!     0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0,
//! ];
//! let triangles: Vec<u32> = vec![
//!     0, 2, 1, 0, 3, 2, // bottom
//!     4, 5, 6, 4, 6, 7, // top
//!     0, 1, 5, 0, 5, 4, // front
//!     1, 2, 6, 1, 6, 5, // right
//!     2, 3, 7, 2, 7, 6, // back
//!     3, 0, 4, 3, 4, 7, // left
//! ];
//!
//! let result = compute_cdt(&vertices, &triangles, &CdtOptions::default());
//! assert!(result.success);
//! assert!(result.is_polyhedron);
//! assert!(result.num_tetrahedra >= 5);
//! assert_eq!(result.num_steiner_vertices, 0);
//! ```
//!
//! # Determinism
//!
//! For the same input bytes the output arrays are bit-identical across
//! runs and machines: every branch the algorithms take goes through
//! certified predicate signs, ties are broken by vertex handle, and no
//! unordered container is ever iterated on a result-affecting path.
//!
//! # Error Handling
//!
//! The façade collapses every failure into `success == false` (see
//! [`CdtResult`]); the typed pipeline [`build_cdt`] reports *why* via
//! [`CdtError`]. Pathological inputs (e.g. a self-intersecting surface
//! declared as a polyhedron) can legitimately fail face recovery; that
//! is a reported outcome, not a crash.

// Allow multiple crate versions due to transitive dependencies
#![expect(clippy::multiple_crate_versions)]
// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// Core combinatorial data structures and the recovery pipeline.
///
/// The tetrahedron store, the incremental Delaunay builder, the
/// constraint overlay, and the recovery passes that turn an
/// unconstrained Delaunay tetrahedrization into a CDT.
pub mod core {
    pub mod collections;
    pub mod delaunay;
    pub mod face_recovery;
    pub mod flips;
    pub mod marking;
    pub mod overlay;
    pub mod plc;
    pub mod segment_recovery;
    pub mod tet_mesh;

    pub use delaunay::*;
    pub use flips::*;
    pub use overlay::*;
    pub use plc::*;
    pub use tet_mesh::*;
}

/// Geometric kernel: exact and adaptive predicates.
///
/// Certified-sign predicates over plain and symbolic (Steiner) points.
/// Everything the combinatorial core branches on comes from here.
pub mod geometry {
    pub mod exact;
    pub mod expansion;
    pub mod fpu;
    pub mod interval;
    pub mod point;
    pub mod predicates;

    pub use exact::*;
    pub use fpu::*;
    pub use point::*;
    pub use predicates::*;
}

mod cdt;

pub use cdt::{
    build_cdt, compute_cdt, validate_mesh, CdtError, CdtOptions, CdtOptionsBuilder, CdtResult,
    MeshInfo,
};

/// Commonly used types and entry points.
pub mod prelude {
    pub use crate::cdt::{
        build_cdt, compute_cdt, validate_mesh, CdtError, CdtOptions, CdtOptionsBuilder,
        CdtResult, MeshInfo,
    };
    pub use crate::core::{
        delaunay::{tetrahedrize, TriangulationError},
        plc::{InputPlc, PlcError},
        tet_mesh::{TetMark, TetMesh, INFINITE_VERTEX},
    };
    pub use crate::geometry::{
        point::{Pt3, VertexRep},
        predicates::{insphere, orient3d, InSphere, Orientation},
    };
}
