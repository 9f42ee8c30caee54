//! Multi-precision floating-point expansion arithmetic.
//!
//! An expansion represents a real number exactly as a sum of
//! non-overlapping `f64` components stored in increasing order of
//! magnitude (Shewchuk, *Adaptive Precision Floating-Point Arithmetic
//! and Fast Robust Geometric Predicates*, 1997). Expansions are the
//! final tier of the adaptive predicate kernel: when the floating-point
//! filter and the interval filter cannot certify a determinant sign,
//! the determinant is recomputed here and the sign is exact.
//!
//! All operations assume (and preserve) round-to-nearest IEEE-754
//! double arithmetic; see [`crate::geometry::fpu`].

#![forbid(unsafe_code)]

use smallvec::SmallVec;

/// 2^27 + 1, used to split a double into two half-width halves.
const SPLITTER: f64 = 134_217_729.0;

/// Sum of `a + b` with exact roundoff: returns `(x, y)` with
/// `a + b == x + y` exactly and `x == fl(a + b)`.
#[inline]
pub fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let x = a + b;
    let bvirt = x - a;
    let avirt = x - bvirt;
    let bround = b - bvirt;
    let around = a - avirt;
    (x, around + bround)
}

/// `two_sum` specialization requiring `|a| >= |b|`.
#[inline]
pub fn fast_two_sum(a: f64, b: f64) -> (f64, f64) {
    let x = a + b;
    let bvirt = x - a;
    (x, b - bvirt)
}

/// Difference `a - b` with exact roundoff.
#[inline]
pub fn two_diff(a: f64, b: f64) -> (f64, f64) {
    let x = a - b;
    let bvirt = a - x;
    let avirt = x + bvirt;
    let bround = bvirt - b;
    let around = a - avirt;
    (x, around + bround)
}

#[inline]
fn split(a: f64) -> (f64, f64) {
    let c = SPLITTER * a;
    let abig = c - a;
    let ahi = c - abig;
    (ahi, a - ahi)
}

/// Product `a * b` with exact roundoff: `a * b == x + y` exactly.
#[inline]
pub fn two_product(a: f64, b: f64) -> (f64, f64) {
    let x = a * b;
    let (ahi, alo) = split(a);
    let (bhi, blo) = split(b);
    let err1 = x - ahi * bhi;
    let err2 = err1 - alo * bhi;
    let err3 = err2 - ahi * blo;
    (x, alo * blo - err3)
}

/// An exact multi-component floating-point value.
///
/// The empty expansion represents zero. Components are non-overlapping,
/// zero-free, and sorted by increasing magnitude, so the sign of the
/// whole value is the sign of the last component.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expansion {
    components: SmallVec<[f64; 8]>,
}

impl Expansion {
    /// The zero expansion.
    #[inline]
    #[must_use]
    pub fn zero() -> Self {
        Self {
            components: SmallVec::new(),
        }
    }

    /// Single-component expansion. `a` must be finite.
    #[inline]
    #[must_use]
    pub fn from_f64(a: f64) -> Self {
        debug_assert!(a.is_finite());
        let mut components = SmallVec::new();
        if a != 0.0 {
            components.push(a);
        }
        Self { components }
    }

    /// Exact difference `a - b` of two doubles as an expansion.
    #[must_use]
    pub fn from_diff(a: f64, b: f64) -> Self {
        let (x, y) = two_diff(a, b);
        Self::from_parts(x, y)
    }

    /// Exact sum `a + b` of two doubles as an expansion.
    #[must_use]
    pub fn from_sum(a: f64, b: f64) -> Self {
        let (x, y) = two_sum(a, b);
        Self::from_parts(x, y)
    }

    /// Exact product `a * b` of two doubles as an expansion.
    #[must_use]
    pub fn from_product(a: f64, b: f64) -> Self {
        let (x, y) = two_product(a, b);
        Self::from_parts(x, y)
    }

    fn from_parts(hi: f64, lo: f64) -> Self {
        let mut components = SmallVec::new();
        if lo != 0.0 {
            components.push(lo);
        }
        if hi != 0.0 {
            components.push(hi);
        }
        Self { components }
    }

    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.components.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Sign of the exact value: -1, 0, or +1.
    #[inline]
    #[must_use]
    pub fn sign(&self) -> i32 {
        match self.components.last() {
            None => 0,
            Some(&c) if c > 0.0 => 1,
            Some(_) => -1,
        }
    }

    /// Closest double approximation (the components summed from the
    /// least significant up).
    #[must_use]
    pub fn estimate(&self) -> f64 {
        self.components.iter().sum()
    }

    /// Exact negation.
    #[must_use]
    pub fn neg(&self) -> Self {
        Self {
            components: self.components.iter().map(|c| -c).collect(),
        }
    }

    /// Exact sum of two expansions (`FAST-EXPANSION-SUM` with zero
    /// elimination).
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let e = &self.components;
        let f = &other.components;
        if e.is_empty() {
            return other.clone();
        }
        if f.is_empty() {
            return self.clone();
        }

        let mut h: SmallVec<[f64; 8]> = SmallVec::new();
        let (elen, flen) = (e.len(), f.len());
        let mut eindex = 0;
        let mut findex = 0;
        let mut enow = e[0];
        let mut fnow = f[0];

        // Merge consuming the smaller-magnitude component first.
        let mut q;
        if (fnow > enow) == (fnow > -enow) {
            q = enow;
            eindex += 1;
            if eindex < elen {
                enow = e[eindex];
            }
        } else {
            q = fnow;
            findex += 1;
            if findex < flen {
                fnow = f[findex];
            }
        }

        if eindex < elen && findex < flen {
            let (qnew, hh) = if (fnow > enow) == (fnow > -enow) {
                let r = fast_two_sum(enow, q);
                eindex += 1;
                if eindex < elen {
                    enow = e[eindex];
                }
                r
            } else {
                let r = fast_two_sum(fnow, q);
                findex += 1;
                if findex < flen {
                    fnow = f[findex];
                }
                r
            };
            q = qnew;
            if hh != 0.0 {
                h.push(hh);
            }
            while eindex < elen && findex < flen {
                let (qnew, hh) = if (fnow > enow) == (fnow > -enow) {
                    let r = two_sum(q, enow);
                    eindex += 1;
                    if eindex < elen {
                        enow = e[eindex];
                    }
                    r
                } else {
                    let r = two_sum(q, fnow);
                    findex += 1;
                    if findex < flen {
                        fnow = f[findex];
                    }
                    r
                };
                q = qnew;
                if hh != 0.0 {
                    h.push(hh);
                }
            }
        }
        while eindex < elen {
            let (qnew, hh) = two_sum(q, e[eindex]);
            eindex += 1;
            q = qnew;
            if hh != 0.0 {
                h.push(hh);
            }
        }
        while findex < flen {
            let (qnew, hh) = two_sum(q, f[findex]);
            findex += 1;
            q = qnew;
            if hh != 0.0 {
                h.push(hh);
            }
        }
        if q != 0.0 {
            h.push(q);
        }
        Self { components: h }
    }

    /// Exact difference of two expansions.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    /// Exact product with a double (`SCALE-EXPANSION` with zero
    /// elimination).
    #[must_use]
    pub fn scale(&self, b: f64) -> Self {
        debug_assert!(b.is_finite());
        let e = &self.components;
        if e.is_empty() || b == 0.0 {
            return Self::zero();
        }

        let mut h: SmallVec<[f64; 8]> = SmallVec::new();
        let (mut q, hh) = two_product(e[0], b);
        if hh != 0.0 {
            h.push(hh);
        }
        for &ei in &e[1..] {
            let (p1, p0) = two_product(ei, b);
            let (sum, hh) = two_sum(q, p0);
            if hh != 0.0 {
                h.push(hh);
            }
            let (qnew, hh) = fast_two_sum(p1, sum);
            q = qnew;
            if hh != 0.0 {
                h.push(hh);
            }
        }
        if q != 0.0 {
            h.push(q);
        }
        Self { components: h }
    }

    /// Exact product of two expansions (distributed scaling).
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        // Distribute over the shorter operand.
        let (long, short) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut acc = Self::zero();
        for &c in &short.components {
            acc = acc.add(&long.scale(c));
        }
        acc
    }
}

/// Exact 2x2 determinant `a*d - b*c` of doubles as an expansion
/// (`TWO-PRODUCT` difference).
#[must_use]
pub fn det2(a: f64, b: f64, c: f64, d: f64) -> Expansion {
    Expansion::from_product(a, d).sub(&Expansion::from_product(b, c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_sum_is_exact() {
        let (x, y) = two_sum(1.0, 1e-30);
        assert_eq!(x, 1.0);
        assert_eq!(y, 1e-30);
    }

    #[test]
    fn two_product_captures_roundoff() {
        let a = 1.0 + f64::EPSILON;
        let (x, y) = two_product(a, a);
        // (1+eps)^2 = 1 + 2eps + eps^2; the eps^2 term does not fit.
        assert_eq!(x, 1.0 + 2.0 * f64::EPSILON);
        assert_eq!(y, f64::EPSILON * f64::EPSILON);
    }

    #[test]
    fn add_cancels_exactly() {
        let e = Expansion::from_sum(1.0, 1e-30);
        let f = e.neg();
        assert_eq!(e.add(&f).sign(), 0);
    }

    #[test]
    fn sign_of_tiny_difference() {
        // 0.1 + 0.2 - 0.3 is not zero in doubles; the expansion knows
        // its exact sign.
        let s = Expansion::from_sum(0.1, 0.2).sub(&Expansion::from_f64(0.3));
        assert_eq!(s.sign(), ((0.1f64 + 0.2) - 0.3).signum() as i32);
        assert!(!s.is_zero());
    }

    #[test]
    fn mul_against_integers() {
        let a = Expansion::from_f64(3.0).mul(&Expansion::from_f64(7.0));
        assert_eq!(a.estimate(), 21.0);
        let b = a.mul(&Expansion::from_diff(2.0, 5.0));
        assert_eq!(b.estimate(), -63.0);
        assert_eq!(b.sign(), -1);
    }

    #[test]
    fn det2_exact_zero() {
        assert_eq!(det2(2.0, 4.0, 3.0, 6.0).sign(), 0);
        assert_eq!(det2(2.0, 4.0, 3.0, 6.0 + 1e-15).sign(), 1);
    }
}
