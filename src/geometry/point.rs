//! Vertex coordinate representations.
//!
//! Input vertices carry plain double-precision coordinates. Steiner
//! vertices introduced by constraint recovery are exact intersections
//! of a segment and a triangle and are stored in the homogeneous exact
//! form of [`crate::geometry::exact`]; their double coordinates are
//! materialized only for output.

#![forbid(unsafe_code)]

use nalgebra::Point3;

use super::exact::ExactPoint;

/// Double-precision point, the working coordinate type of the mesh.
pub type Pt3 = Point3<f64>;

/// How a mesh vertex is represented for predicate evaluation.
#[derive(Clone, Debug)]
pub enum VertexRep {
    /// A vertex taken verbatim from the input arrays.
    Input(Pt3),
    /// A Steiner vertex: the exact intersection of a segment and a
    /// triangle, kept in homogeneous exact coordinates.
    Intersection(ExactPoint),
}

impl VertexRep {
    /// True for Steiner vertices.
    #[inline]
    #[must_use]
    pub fn is_steiner(&self) -> bool {
        matches!(self, Self::Intersection(_))
    }

    /// The exact homogeneous form used by the predicate kernel.
    #[must_use]
    pub fn homogeneous(&self) -> ExactPoint {
        match self {
            Self::Input(p) => ExactPoint::from_coords(p.x, p.y, p.z),
            Self::Intersection(e) => e.clone(),
        }
    }

    /// Approximate double-precision coordinates.
    ///
    /// Exact (bit-identical to the input) for input vertices; the
    /// closest representable realization for Steiner vertices.
    #[must_use]
    pub fn approx(&self) -> Pt3 {
        match self {
            Self::Input(p) => *p,
            Self::Intersection(e) => {
                let [x, y, z] = e.approx();
                Pt3::new(x, y, z)
            }
        }
    }

    /// Plain input coordinates, if this is an input vertex.
    #[inline]
    #[must_use]
    pub fn as_input(&self) -> Option<&Pt3> {
        match self {
            Self::Input(p) => Some(p),
            Self::Intersection(_) => None,
        }
    }
}
