//! Adaptive geometric predicates.
//!
//! The two predicates the tetrahedrizer branches on — `orient3d` and
//! `insphere` — return a certified sign in `{-1, 0, +1}`: a nonzero
//! answer is never wrong, and zero means the configuration is exactly
//! degenerate, not merely numerically small. Evaluation is tiered:
//!
//! 1. a double-precision computation with an a-priori error bound
//!    (Shewchuk's A-bound constants),
//! 2. interval arithmetic ([`crate::geometry::interval`]),
//! 3. exact expansion arithmetic ([`crate::geometry::exact`]).
//!
//! Arguments involving Steiner vertices skip straight to the exact
//! homogeneous tier; the fast tiers only apply to plain input points.
//!
//! Cospherical and cocircular ties (a cube's eight corners lie on one
//! sphere) are broken by `insphere_sos`/`incircle_sos`: a deterministic
//! symbolic perturbation of the lifted weights, ordered by vertex
//! handle, in the manner of simulation-of-simplicity Delaunay codes.
//! For the same input bytes every sign is bit-identical across runs.

#![forbid(unsafe_code)]

use super::exact::{
    det3_e, incircle_exact, insphere_exact, orient2d_exact, orient3d_exact, ExactPoint,
};
use super::expansion::Expansion;
use super::interval::Interval;
use super::point::{Pt3, VertexRep};

// =============================================================================
// SIGN ENUMS
// =============================================================================

/// Position of a query point relative to a circumsphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InSphere {
    /// The point is strictly outside the circumsphere.
    OUTSIDE,
    /// The point is exactly on the circumsphere.
    BOUNDARY,
    /// The point is strictly inside the circumsphere.
    INSIDE,
}

impl std::fmt::Display for InSphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OUTSIDE => write!(f, "OUTSIDE"),
            Self::BOUNDARY => write!(f, "BOUNDARY"),
            Self::INSIDE => write!(f, "INSIDE"),
        }
    }
}

/// Orientation of an ordered tetrahedron.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Negative orientation (determinant < 0).
    NEGATIVE,
    /// Exactly degenerate (coplanar points).
    DEGENERATE,
    /// Positive orientation (determinant > 0).
    POSITIVE,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NEGATIVE => write!(f, "NEGATIVE"),
            Self::DEGENERATE => write!(f, "DEGENERATE"),
            Self::POSITIVE => write!(f, "POSITIVE"),
        }
    }
}

// =============================================================================
// FILTER CONSTANTS
// =============================================================================

/// Unit roundoff of `f64` (2^-53).
const EPS: f64 = f64::EPSILON / 2.0;
/// A-bound coefficient for the 3x3 orientation determinant.
const O3D_BOUND_A: f64 = (7.0 + 56.0 * EPS) * EPS;
/// A-bound coefficient for the 4x4 insphere determinant.
const ISP_BOUND_A: f64 = (16.0 + 224.0 * EPS) * EPS;

// =============================================================================
// ORIENT3D
// =============================================================================

/// Sign of `det(b - a, c - a, d - a)`.
///
/// Positive iff the tetrahedron `(a, b, c, d)` is positively oriented;
/// zero iff the four points are exactly coplanar.
#[must_use]
pub fn orient3d_sign(p: [&VertexRep; 4]) -> i32 {
    match (
        p[0].as_input(),
        p[1].as_input(),
        p[2].as_input(),
        p[3].as_input(),
    ) {
        (Some(a), Some(b), Some(c), Some(d)) => orient3d_points([a, b, c, d]),
        _ => orient3d_exact([
            &p[0].homogeneous(),
            &p[1].homogeneous(),
            &p[2].homogeneous(),
            &p[3].homogeneous(),
        ]),
    }
}

/// [`orient3d_sign`] wrapped in the [`Orientation`] enum.
#[must_use]
pub fn orient3d(p: [&VertexRep; 4]) -> Orientation {
    match orient3d_sign(p) {
        1 => Orientation::POSITIVE,
        -1 => Orientation::NEGATIVE,
        _ => Orientation::DEGENERATE,
    }
}

/// Adaptive orientation of four plain double-precision points.
#[must_use]
pub(crate) fn orient3d_points(p: [&Pt3; 4]) -> i32 {
    if let Some(s) = orient3d_filter(p) {
        return s;
    }
    if let Some(s) = orient3d_interval(p) {
        return s;
    }
    orient3d_expansion(p)
}

fn orient3d_filter(p: [&Pt3; 4]) -> Option<i32> {
    let [a, b, c, d] = p;
    let bax = b.x - a.x;
    let bay = b.y - a.y;
    let baz = b.z - a.z;
    let cax = c.x - a.x;
    let cay = c.y - a.y;
    let caz = c.z - a.z;
    let dax = d.x - a.x;
    let day = d.y - a.y;
    let daz = d.z - a.z;

    let m1 = cay * daz - caz * day;
    let m2 = caz * dax - cax * daz;
    let m3 = cax * day - cay * dax;
    let det = bax * m1 + bay * m2 + baz * m3;

    let permanent = ((cay * daz).abs() + (caz * day).abs()) * bax.abs()
        + ((caz * dax).abs() + (cax * daz).abs()) * bay.abs()
        + ((cax * day).abs() + (cay * dax).abs()) * baz.abs();
    let errbound = O3D_BOUND_A * permanent;
    if det > errbound {
        Some(1)
    } else if -det > errbound {
        Some(-1)
    } else if permanent == 0.0 {
        // All differences vanish; the determinant is exactly zero.
        Some(0)
    } else {
        None
    }
}

fn orient3d_interval(p: [&Pt3; 4]) -> Option<i32> {
    let [a, b, c, d] = p;
    let iv = Interval::new;
    let sub3 = |u: &Pt3, v: &Pt3| {
        [
            iv(u.x).sub(iv(v.x)),
            iv(u.y).sub(iv(v.y)),
            iv(u.z).sub(iv(v.z)),
        ]
    };
    let ba = sub3(b, a);
    let ca = sub3(c, a);
    let da = sub3(d, a);
    let m1 = ca[1].mul(da[2]).sub(ca[2].mul(da[1]));
    let m2 = ca[2].mul(da[0]).sub(ca[0].mul(da[2]));
    let m3 = ca[0].mul(da[1]).sub(ca[1].mul(da[0]));
    ba[0]
        .mul(m1)
        .add(ba[1].mul(m2))
        .add(ba[2].mul(m3))
        .sign()
}

fn orient3d_expansion(p: [&Pt3; 4]) -> i32 {
    let [a, b, c, d] = p;
    let row = |u: &Pt3| -> [Expansion; 3] {
        [
            Expansion::from_diff(u.x, a.x),
            Expansion::from_diff(u.y, a.y),
            Expansion::from_diff(u.z, a.z),
        ]
    };
    det3_e(&[row(b), row(c), row(d)]).sign()
}

// =============================================================================
// INSPHERE
// =============================================================================

/// Sign of the insphere determinant.
///
/// Positive iff `p[4]` lies strictly inside the circumsphere of the
/// tetrahedron `(p[0], p[1], p[2], p[3])`, which must be positively
/// oriented. Zero iff the five points are exactly cospherical.
#[must_use]
pub fn insphere_sign(p: [&VertexRep; 5]) -> i32 {
    match (
        p[0].as_input(),
        p[1].as_input(),
        p[2].as_input(),
        p[3].as_input(),
        p[4].as_input(),
    ) {
        (Some(a), Some(b), Some(c), Some(d), Some(e)) => insphere_points([a, b, c, d, e]),
        _ => insphere_exact([
            &p[0].homogeneous(),
            &p[1].homogeneous(),
            &p[2].homogeneous(),
            &p[3].homogeneous(),
            &p[4].homogeneous(),
        ]),
    }
}

/// [`insphere_sign`] wrapped in the [`InSphere`] enum.
#[must_use]
pub fn insphere(p: [&VertexRep; 5]) -> InSphere {
    match insphere_sign(p) {
        1 => InSphere::INSIDE,
        -1 => InSphere::OUTSIDE,
        _ => InSphere::BOUNDARY,
    }
}

fn insphere_points(p: [&Pt3; 5]) -> i32 {
    if let Some(s) = insphere_filter(p) {
        return s;
    }
    if let Some(s) = insphere_interval(p) {
        return s;
    }
    insphere_exact([
        &ExactPoint::from_coords(p[0].x, p[0].y, p[0].z),
        &ExactPoint::from_coords(p[1].x, p[1].y, p[1].z),
        &ExactPoint::from_coords(p[2].x, p[2].y, p[2].z),
        &ExactPoint::from_coords(p[3].x, p[3].y, p[3].z),
        &ExactPoint::from_coords(p[4].x, p[4].y, p[4].z),
    ])
}

#[allow(clippy::similar_names)]
fn insphere_filter(p: [&Pt3; 5]) -> Option<i32> {
    let [a, b, c, d, e] = p;
    let aex = a.x - e.x;
    let aey = a.y - e.y;
    let aez = a.z - e.z;
    let bex = b.x - e.x;
    let bey = b.y - e.y;
    let bez = b.z - e.z;
    let cex = c.x - e.x;
    let cey = c.y - e.y;
    let cez = c.z - e.z;
    let dex = d.x - e.x;
    let dey = d.y - e.y;
    let dez = d.z - e.z;

    let ab = aex * bey - bex * aey;
    let bc = bex * cey - cex * bey;
    let cd = cex * dey - dex * cey;
    let da = dex * aey - aex * dey;
    let ac = aex * cey - cex * aey;
    let bd = bex * dey - dex * bey;

    let abc = aez * bc - bez * ac + cez * ab;
    let bcd = bez * cd - cez * bd + dez * bc;
    let cda = cez * da + dez * ac + aez * cd;
    let dab = dez * ab + aez * bd + bez * da;

    let alift = aex * aex + aey * aey + aez * aez;
    let blift = bex * bex + bey * bey + bez * bez;
    let clift = cex * cex + cey * cey + cez * cez;
    let dlift = dex * dex + dey * dey + dez * dez;

    let det = (dlift * abc - clift * dab) + (blift * cda - alift * bcd);

    let aezplus = aez.abs();
    let bezplus = bez.abs();
    let cezplus = cez.abs();
    let dezplus = dez.abs();
    let aexbeyplus = (aex * bey).abs();
    let bexaeyplus = (bex * aey).abs();
    let bexceyplus = (bex * cey).abs();
    let cexbeyplus = (cex * bey).abs();
    let cexdeyplus = (cex * dey).abs();
    let dexceyplus = (dex * cey).abs();
    let dexaeyplus = (dex * aey).abs();
    let aexdeyplus = (aex * dey).abs();
    let aexceyplus = (aex * cey).abs();
    let cexaeyplus = (cex * aey).abs();
    let bexdeyplus = (bex * dey).abs();
    let dexbeyplus = (dex * bey).abs();
    let permanent = ((cexdeyplus + dexceyplus) * bezplus
        + (dexbeyplus + bexdeyplus) * cezplus
        + (bexceyplus + cexbeyplus) * dezplus)
        * alift
        + ((dexaeyplus + aexdeyplus) * cezplus
            + (aexceyplus + cexaeyplus) * dezplus
            + (cexdeyplus + dexceyplus) * aezplus)
            * blift
        + ((aexbeyplus + bexaeyplus) * dezplus
            + (bexdeyplus + dexbeyplus) * aezplus
            + (dexaeyplus + aexdeyplus) * bezplus)
            * clift
        + ((bexceyplus + cexbeyplus) * aezplus
            + (cexaeyplus + aexceyplus) * bezplus
            + (aexbeyplus + bexaeyplus) * cezplus)
            * dlift;
    let errbound = ISP_BOUND_A * permanent;
    // The determinant above follows the orientation convention where
    // the tetrahedron rows are taken relative to the query point; under
    // this crate's positive orientation its sign is flipped.
    if det > errbound {
        Some(-1)
    } else if -det > errbound {
        Some(1)
    } else if permanent == 0.0 {
        Some(0)
    } else {
        None
    }
}

#[allow(clippy::similar_names)]
fn insphere_interval(p: [&Pt3; 5]) -> Option<i32> {
    let [a, b, c, d, e] = p;
    let iv = Interval::new;
    let sub3 = |u: &Pt3| {
        [
            iv(u.x).sub(iv(e.x)),
            iv(u.y).sub(iv(e.y)),
            iv(u.z).sub(iv(e.z)),
        ]
    };
    let ae = sub3(a);
    let be = sub3(b);
    let ce = sub3(c);
    let de = sub3(d);
    let cross = |u: &[Interval; 3], v: &[Interval; 3]| u[0].mul(v[1]).sub(v[0].mul(u[1]));
    let ab = cross(&ae, &be);
    let bc = cross(&be, &ce);
    let cd = cross(&ce, &de);
    let da = cross(&de, &ae);
    let ac = cross(&ae, &ce);
    let bd = cross(&be, &de);

    let abc = ae[2].mul(bc).sub(be[2].mul(ac)).add(ce[2].mul(ab));
    let bcd = be[2].mul(cd).sub(ce[2].mul(bd)).add(de[2].mul(bc));
    let cda = ce[2].mul(da).add(de[2].mul(ac)).add(ae[2].mul(cd));
    let dab = de[2].mul(ab).add(ae[2].mul(bd)).add(be[2].mul(da));

    let lift = |u: &[Interval; 3]| u[0].mul(u[0]).add(u[1].mul(u[1])).add(u[2].mul(u[2]));
    let alift = lift(&ae);
    let blift = lift(&be);
    let clift = lift(&ce);
    let dlift = lift(&de);

    let det = dlift
        .mul(abc)
        .sub(clift.mul(dab))
        .add(blift.mul(cda).sub(alift.mul(bcd)));
    det.sign().map(|s| -s)
}

// =============================================================================
// SYMBOLIC PERTURBATION
// =============================================================================

/// Insphere with symbolic perturbation: never returns zero.
///
/// Resolves exactly cospherical configurations by perturbing the lifted
/// weight of each point by an infinitesimal that decreases with the
/// vertex handle, so higher handles dominate. The perturbation is a
/// single global assignment: any two evaluations over the same five
/// vertices agree no matter which tetrahedron asked.
///
/// # Panics
///
/// Panics if the five points do not span three dimensions, which would
/// mean the mesh holds a degenerate tetrahedron.
#[must_use]
pub fn insphere_sos(p: [&VertexRep; 5], handles: [u32; 5]) -> i32 {
    let s = insphere_sign(p);
    if s != 0 {
        return s;
    }
    let mut order = [0usize, 1, 2, 3, 4];
    order.sort_by_key(|&i| std::cmp::Reverse(handles[i]));
    for &i in &order {
        let mut rest = [0usize; 4];
        let mut k = 0;
        for j in 0..5 {
            if j != i {
                rest[k] = j;
                k += 1;
            }
        }
        let o = orient3d_sign([p[rest[0]], p[rest[1]], p[rest[2]], p[rest[3]]]);
        if o != 0 {
            // Perturbed determinant sign is (-1)^i * o; the insphere
            // sign is its negation.
            return if i % 2 == 0 { -o } else { o };
        }
    }
    panic!("insphere symbolic perturbation exhausted: degenerate tetrahedron in mesh");
}

/// In-circumcircle test for four coplanar points, with symbolic
/// perturbation; never returns zero.
///
/// `p[3]` is tested against the circle through `(p[0], p[1], p[2])`
/// within their common plane. Used for ghost tetrahedra when the query
/// point lies exactly on a hull face's plane.
///
/// # Panics
///
/// Panics if `(p[0], p[1], p[2])` is degenerate (collinear).
#[must_use]
pub fn incircle_sos(p: [&VertexRep; 4], handles: [u32; 4]) -> i32 {
    let h = [
        p[0].homogeneous(),
        p[1].homogeneous(),
        p[2].homogeneous(),
        p[3].homogeneous(),
    ];
    let href = [&h[0], &h[1], &h[2], &h[3]];
    // Deterministic projection: the first coordinate plane in which the
    // triangle has nonzero area.
    let mut axes = (0usize, 1usize);
    let mut o = 0;
    for cand in [(0usize, 1usize), (0, 2), (1, 2)] {
        o = orient2d_exact([href[0], href[1], href[2]], cand);
        if o != 0 {
            axes = cand;
            break;
        }
    }
    assert!(o != 0, "incircle of a degenerate (collinear) hull face");

    let s = incircle_exact(href, axes);
    if s != 0 {
        return s * o;
    }
    let mut order = [0usize, 1, 2, 3];
    order.sort_by_key(|&i| std::cmp::Reverse(handles[i]));
    for &i in &order {
        let mut rest = [0usize; 3];
        let mut k = 0;
        for j in 0..4 {
            if j != i {
                rest[k] = j;
                k += 1;
            }
        }
        let oo = orient2d_exact([href[rest[0]], href[rest[1]], href[rest[2]]], axes);
        if oo != 0 {
            let c = if i % 2 == 0 { oo } else { -oo };
            return c * o;
        }
    }
    panic!("incircle symbolic perturbation exhausted: degenerate hull face");
}
