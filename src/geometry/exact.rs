//! Exact homogeneous points and determinant predicates.
//!
//! Steiner vertices produced by constraint recovery are intersections
//! of a segment and a triangle, i.e. rational functions of input
//! coordinates. They are carried here as homogeneous 4-tuples
//! `(X, Y, Z, W)` of [`Expansion`]s, which keeps every predicate exact:
//! an orientation over homogeneous points is the sign of a 4x4
//! determinant corrected by the signs of the `W` components, and the
//! insphere test is the sign of a 5x5 determinant whose rows are scaled
//! by `W_i^2` (an always-positive factor).
//!
//! Intersections of intersections stay in the same representation:
//! the homogeneous components are polynomials in input doubles no
//! matter how the operands were produced, so the algebra is closed.

#![forbid(unsafe_code)]

use super::expansion::Expansion;

/// A point with exact homogeneous coordinates `(x/w, y/w, z/w)`.
#[derive(Clone, Debug, Default)]
pub struct ExactPoint {
    pub x: Expansion,
    pub y: Expansion,
    pub z: Expansion,
    pub w: Expansion,
}

impl ExactPoint {
    /// Embed a plain double-precision point (`w = 1`).
    #[must_use]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Expansion::from_f64(x),
            y: Expansion::from_f64(y),
            z: Expansion::from_f64(z),
            w: Expansion::from_f64(1.0),
        }
    }

    /// Component by axis index (0 = x, 1 = y, 2 = z).
    #[inline]
    #[must_use]
    pub fn axis(&self, axis: usize) -> &Expansion {
        match axis {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }

    #[inline]
    #[must_use]
    pub fn w_sign(&self) -> i32 {
        self.w.sign()
    }

    /// Closest double-precision realization of the point.
    #[must_use]
    pub fn approx(&self) -> [f64; 3] {
        let w = self.w.estimate();
        debug_assert!(w != 0.0, "homogeneous point with zero weight");
        [
            self.x.estimate() / w,
            self.y.estimate() / w,
            self.z.estimate() / w,
        ]
    }
}

// =============================================================================
// DETERMINANTS OVER EXPANSIONS
// =============================================================================

pub(crate) fn det2_e(m: &[[Expansion; 2]; 2]) -> Expansion {
    m[0][0].mul(&m[1][1]).sub(&m[0][1].mul(&m[1][0]))
}

pub(crate) fn det3_e(m: &[[Expansion; 3]; 3]) -> Expansion {
    let minor = |c: usize| -> Expansion {
        let cols: [usize; 2] = match c {
            0 => [1, 2],
            1 => [0, 2],
            _ => [0, 1],
        };
        det2_e(&[
            [m[1][cols[0]].clone(), m[1][cols[1]].clone()],
            [m[2][cols[0]].clone(), m[2][cols[1]].clone()],
        ])
    };
    let mut acc = m[0][0].mul(&minor(0));
    acc = acc.sub(&m[0][1].mul(&minor(1)));
    acc.add(&m[0][2].mul(&minor(2)))
}

fn det4_e(m: &[[Expansion; 4]; 4]) -> Expansion {
    let minor = |c: usize| -> Expansion {
        let cols: [usize; 3] = match c {
            0 => [1, 2, 3],
            1 => [0, 2, 3],
            2 => [0, 1, 3],
            _ => [0, 1, 2],
        };
        let row = |r: usize| -> [Expansion; 3] {
            [
                m[r][cols[0]].clone(),
                m[r][cols[1]].clone(),
                m[r][cols[2]].clone(),
            ]
        };
        det3_e(&[row(1), row(2), row(3)])
    };
    let mut acc = m[0][0].mul(&minor(0));
    acc = acc.sub(&m[0][1].mul(&minor(1)));
    acc = acc.add(&m[0][2].mul(&minor(2)));
    acc.sub(&m[0][3].mul(&minor(3)))
}

fn det5_e(m: &[[Expansion; 5]; 5]) -> Expansion {
    let minor = |c: usize| -> Expansion {
        let mut cols = [0usize; 4];
        let mut k = 0;
        for j in 0..5 {
            if j != c {
                cols[k] = j;
                k += 1;
            }
        }
        let row = |r: usize| -> [Expansion; 4] {
            [
                m[r][cols[0]].clone(),
                m[r][cols[1]].clone(),
                m[r][cols[2]].clone(),
                m[r][cols[3]].clone(),
            ]
        };
        det4_e(&[row(1), row(2), row(3), row(4)])
    };
    let mut acc = Expansion::zero();
    let mut sign = 1.0;
    for c in 0..5 {
        let term = m[0][c].mul(&minor(c)).scale(sign);
        acc = acc.add(&term);
        sign = -sign;
    }
    acc
}

// =============================================================================
// EXACT PREDICATES
// =============================================================================

/// Exact orientation of four homogeneous points.
///
/// Positive iff the affine tetrahedron `(p0, p1, p2, p3)` is positively
/// oriented, i.e. `det(p1-p0, p2-p0, p3-p0) > 0`.
#[must_use]
pub fn orient3d_exact(p: [&ExactPoint; 4]) -> i32 {
    let row = |q: &ExactPoint| -> [Expansion; 4] {
        [q.x.clone(), q.y.clone(), q.z.clone(), q.w.clone()]
    };
    let det = det4_e(&[row(p[0]), row(p[1]), row(p[2]), row(p[3])]);
    let mut s = -det.sign();
    for q in p {
        s *= q.w_sign();
    }
    s
}

/// Exact insphere test of a query point against the circumsphere of a
/// positively oriented tetrahedron.
///
/// Positive iff `p[4]` lies strictly inside the circumsphere of the
/// tetrahedron `(p[0], p[1], p[2], p[3])`, which must be positively
/// oriented; zero iff the five points are cospherical.
#[must_use]
pub fn insphere_exact(p: [&ExactPoint; 5]) -> i32 {
    let row = |q: &ExactPoint| -> [Expansion; 5] {
        let lift = q
            .x
            .mul(&q.x)
            .add(&q.y.mul(&q.y))
            .add(&q.z.mul(&q.z));
        [
            q.x.mul(&q.w),
            q.y.mul(&q.w),
            q.z.mul(&q.w),
            lift,
            q.w.mul(&q.w),
        ]
    };
    let det = det5_e(&[row(p[0]), row(p[1]), row(p[2]), row(p[3]), row(p[4])]);
    -det.sign()
}

/// Exact 2D orientation of three homogeneous points projected onto the
/// coordinate plane spanned by `axes`.
#[must_use]
pub fn orient2d_exact(p: [&ExactPoint; 3], axes: (usize, usize)) -> i32 {
    let row = |q: &ExactPoint| -> [Expansion; 3] {
        [q.axis(axes.0).clone(), q.axis(axes.1).clone(), q.w.clone()]
    };
    let det = det3_e(&[row(p[0]), row(p[1]), row(p[2])]);
    let mut s = det.sign();
    for q in p {
        s *= q.w_sign();
    }
    s
}

/// Exact 2D incircle test in the projection onto `axes`.
///
/// Positive iff `p[3]` lies strictly inside the circle through
/// `(p[0], p[1], p[2])`, provided that triangle is counterclockwise in
/// the projection; the caller flips the sign for clockwise triangles.
#[must_use]
pub fn incircle_exact(p: [&ExactPoint; 4], axes: (usize, usize)) -> i32 {
    let row = |q: &ExactPoint| -> [Expansion; 4] {
        let u = q.axis(axes.0);
        let v = q.axis(axes.1);
        [
            u.mul(&q.w),
            v.mul(&q.w),
            u.mul(u).add(&v.mul(v)),
            q.w.mul(&q.w),
        ]
    };
    let det = det4_e(&[row(p[0]), row(p[1]), row(p[2]), row(p[3])]);
    det.sign()
}

// =============================================================================
// INTERSECTION CONSTRUCTION
// =============================================================================

/// The plane through three homogeneous points, as coefficients
/// `(a, b, c, d)` of `a x + b y + c z + d w = 0`.
fn plane_through(t: [&ExactPoint; 3]) -> [Expansion; 4] {
    let m = |cols: [fn(&ExactPoint) -> &Expansion; 3]| -> Expansion {
        let row = |q: &ExactPoint| -> [Expansion; 3] {
            [cols[0](q).clone(), cols[1](q).clone(), cols[2](q).clone()]
        };
        det3_e(&[row(t[0]), row(t[1]), row(t[2])])
    };
    let a = m([|q| &q.y, |q| &q.z, |q| &q.w]);
    let b = m([|q| &q.x, |q| &q.z, |q| &q.w]).neg();
    let c = m([|q| &q.x, |q| &q.y, |q| &q.w]);
    let d = m([|q| &q.x, |q| &q.y, |q| &q.z]).neg();
    [a, b, c, d]
}

fn plane_dot(plane: &[Expansion; 4], q: &ExactPoint) -> Expansion {
    plane[0]
        .mul(&q.x)
        .add(&plane[1].mul(&q.y))
        .add(&plane[2].mul(&q.z))
        .add(&plane[3].mul(&q.w))
}

/// Exact intersection of the line through `s0, s1` with the plane of
/// the triangle `(t0, t1, t2)`.
///
/// Returns `None` when the line is parallel to (or contained in) the
/// plane, or when the triangle is degenerate. Callers that have already
/// classified the crossing as transversal can expect `Some`.
#[must_use]
pub fn segment_plane_intersection(
    s0: &ExactPoint,
    s1: &ExactPoint,
    tri: [&ExactPoint; 3],
) -> Option<ExactPoint> {
    let plane = plane_through(tri);
    let d0 = plane_dot(&plane, s0);
    let d1 = plane_dot(&plane, s1);
    // P = (L.s1) s0 - (L.s0) s1 spans the pencil point on the plane.
    let p = ExactPoint {
        x: d1.mul(&s0.x).sub(&d0.mul(&s1.x)),
        y: d1.mul(&s0.y).sub(&d0.mul(&s1.y)),
        z: d1.mul(&s0.z).sub(&d0.mul(&s1.z)),
        w: d1.mul(&s0.w).sub(&d0.mul(&s1.w)),
    };
    if p.w.is_zero() {
        return None;
    }
    Some(p)
}
