//! Input piecewise linear complex.
//!
//! The canonical, validated form of the caller's packed arrays: a
//! contiguous coordinate array (x, y, z per vertex) and a contiguous
//! triangle index array. Handles are dense and stable; the first `V`
//! vertex handles are exactly the input indices.

#![forbid(unsafe_code)]

use thiserror::Error;

use crate::geometry::point::Pt3;

/// Number of vertices appended by [`InputPlc::add_bounding_box`].
pub const BOUNDING_BOX_VERTICES: usize = 8;

/// Errors detected while validating input arrays.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlcError {
    /// The coordinate array length is not a multiple of 3.
    #[error("vertex array length {len} is not divisible by 3")]
    VertexLengthNotDivisible {
        /// Offending length.
        len: usize,
    },
    /// The triangle index array length is not a multiple of 3.
    #[error("triangle array length {len} is not divisible by 3")]
    TriangleLengthNotDivisible {
        /// Offending length.
        len: usize,
    },
    /// The input contains no vertices or no triangles.
    #[error("input is empty: {num_vertices} vertices, {num_triangles} triangles")]
    Empty {
        /// Number of vertices provided.
        num_vertices: usize,
        /// Number of triangles provided.
        num_triangles: usize,
    },
    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index}, but only {num_vertices} exist")]
    IndexOutOfRange {
        /// Triangle ordinal.
        triangle: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of input vertices.
        num_vertices: usize,
    },
    /// A triangle uses the same vertex twice.
    #[error("triangle {triangle} is degenerate: indices ({a}, {b}, {c})")]
    DegenerateTriangle {
        /// Triangle ordinal.
        triangle: usize,
        /// First index.
        a: u32,
        /// Second index.
        b: u32,
        /// Third index.
        c: u32,
    },
    /// A coordinate is NaN or infinite.
    #[error("vertex {vertex} has a non-finite coordinate")]
    NonFiniteCoordinate {
        /// Offending vertex index.
        vertex: usize,
    },
}

/// Validated input complex.
#[derive(Clone, Debug)]
pub struct InputPlc {
    coordinates: Vec<f64>,
    triangle_vertices: Vec<u32>,
    /// Vertex count before any bounding box was appended.
    num_input: usize,
    bounding_box_added: bool,
}

impl InputPlc {
    /// Validate and adopt packed input arrays.
    ///
    /// `vertices` holds x, y, z per vertex; `triangles` holds three
    /// vertex indices per constraint triangle.
    ///
    /// # Errors
    ///
    /// Returns a [`PlcError`] for non-divisible lengths, empty input,
    /// out-of-range indices, repeated indices within a triangle, or
    /// non-finite coordinates.
    pub fn from_packed(vertices: &[f64], triangles: &[u32]) -> Result<Self, PlcError> {
        if vertices.len() % 3 != 0 {
            return Err(PlcError::VertexLengthNotDivisible {
                len: vertices.len(),
            });
        }
        if triangles.len() % 3 != 0 {
            return Err(PlcError::TriangleLengthNotDivisible {
                len: triangles.len(),
            });
        }
        let num_vertices = vertices.len() / 3;
        let num_triangles = triangles.len() / 3;
        if num_vertices == 0 || num_triangles == 0 {
            return Err(PlcError::Empty {
                num_vertices,
                num_triangles,
            });
        }
        for (i, chunk) in vertices.chunks_exact(3).enumerate() {
            if !chunk.iter().all(|c| c.is_finite()) {
                return Err(PlcError::NonFiniteCoordinate { vertex: i });
            }
        }
        for (t, tri) in triangles.chunks_exact(3).enumerate() {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            for &index in tri {
                if index as usize >= num_vertices {
                    return Err(PlcError::IndexOutOfRange {
                        triangle: t,
                        index,
                        num_vertices,
                    });
                }
            }
            if a == b || b == c || a == c {
                return Err(PlcError::DegenerateTriangle {
                    triangle: t,
                    a,
                    b,
                    c,
                });
            }
        }
        Ok(Self {
            coordinates: vertices.to_vec(),
            triangle_vertices: triangles.to_vec(),
            num_input: num_vertices,
            bounding_box_added: false,
        })
    }

    /// Append eight axis-aligned vertices just outside the bounding box
    /// of the input, and no triangles.
    ///
    /// The added vertices guarantee that every input vertex is strictly
    /// interior to the Delaunay hull, which simplifies constraint
    /// recovery near the boundary. They receive the handles directly
    /// after the input vertices and are not counted as input by the
    /// pipeline's reporting.
    pub fn add_bounding_box(&mut self) {
        debug_assert!(!self.bounding_box_added);
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for chunk in self.coordinates.chunks_exact(3) {
            for k in 0..3 {
                min[k] = min[k].min(chunk[k]);
                max[k] = max[k].max(chunk[k]);
            }
        }
        // Pad by 5% of the largest extent so box vertices never
        // coincide with input, even for flat inputs.
        let extent = (max[0] - min[0]).max(max[1] - min[1]).max(max[2] - min[2]);
        let pad = if extent > 0.0 { 0.05 * extent } else { 1.0 };
        let lo = [min[0] - pad, min[1] - pad, min[2] - pad];
        let hi = [max[0] + pad, max[1] + pad, max[2] + pad];
        for zi in 0..2 {
            for yi in 0..2 {
                for xi in 0..2 {
                    self.coordinates.push(if xi == 0 { lo[0] } else { hi[0] });
                    self.coordinates.push(if yi == 0 { lo[1] } else { hi[1] });
                    self.coordinates.push(if zi == 0 { lo[2] } else { hi[2] });
                }
            }
        }
        self.bounding_box_added = true;
    }

    /// Total number of vertices, including any bounding box.
    #[inline]
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.coordinates.len() / 3
    }

    /// Number of vertices provided by the caller.
    #[inline]
    #[must_use]
    pub fn num_input_vertices(&self) -> usize {
        self.num_input
    }

    #[inline]
    #[must_use]
    pub fn num_triangles(&self) -> usize {
        self.triangle_vertices.len() / 3
    }

    #[inline]
    #[must_use]
    pub fn bounding_box_added(&self) -> bool {
        self.bounding_box_added
    }

    /// Coordinates of vertex `i`.
    #[inline]
    #[must_use]
    pub fn vertex(&self, i: usize) -> Pt3 {
        Pt3::new(
            self.coordinates[3 * i],
            self.coordinates[3 * i + 1],
            self.coordinates[3 * i + 2],
        )
    }

    /// Vertex indices of triangle `t`.
    #[inline]
    #[must_use]
    pub fn triangle(&self, t: usize) -> [u32; 3] {
        [
            self.triangle_vertices[3 * t],
            self.triangle_vertices[3 * t + 1],
            self.triangle_vertices[3 * t + 2],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRI: [u32; 3] = [0, 1, 2];

    #[test]
    fn accepts_minimal_input() {
        let v = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let plc = InputPlc::from_packed(&v, &TRI).unwrap();
        assert_eq!(plc.num_vertices(), 3);
        assert_eq!(plc.num_triangles(), 1);
        assert_eq!(plc.triangle(0), TRI);
        assert_eq!(plc.vertex(1), Pt3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn rejects_bad_lengths() {
        let v = [0.0, 0.0, 0.0, 1.0];
        assert!(matches!(
            InputPlc::from_packed(&v, &TRI),
            Err(PlcError::VertexLengthNotDivisible { len: 4 })
        ));
        let v = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        assert!(matches!(
            InputPlc::from_packed(&v, &[0, 1]),
            Err(PlcError::TriangleLengthNotDivisible { len: 2 })
        ));
    }

    #[test]
    fn rejects_out_of_range_and_degenerate() {
        let v = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        assert!(matches!(
            InputPlc::from_packed(&v, &[0, 1, 3]),
            Err(PlcError::IndexOutOfRange { index: 3, .. })
        ));
        assert!(matches!(
            InputPlc::from_packed(&v, &[0, 1, 1]),
            Err(PlcError::DegenerateTriangle { .. })
        ));
    }

    #[test]
    fn rejects_non_finite() {
        let v = [0.0, 0.0, 0.0, f64::NAN, 0.0, 0.0, 0.0, 1.0, 0.0];
        assert!(matches!(
            InputPlc::from_packed(&v, &TRI),
            Err(PlcError::NonFiniteCoordinate { vertex: 1 })
        ));
    }

    #[test]
    fn bounding_box_is_appended_after_input() {
        let v = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let mut plc = InputPlc::from_packed(&v, &TRI).unwrap();
        plc.add_bounding_box();
        assert_eq!(plc.num_vertices(), 4 + BOUNDING_BOX_VERTICES);
        assert_eq!(plc.num_input_vertices(), 4);
        // Box corners strictly enclose every input vertex.
        for b in 4..plc.num_vertices() {
            let p = plc.vertex(b);
            assert!(p.x < 0.0 || p.x > 1.0);
        }
    }
}
