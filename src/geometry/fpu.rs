//! Floating-point environment guard.
//!
//! Every sign the predicate kernel certifies assumes IEEE-754 binary64
//! arithmetic in round-to-nearest mode with no extended-precision
//! double rounding. [`FpuGuard::acquire`] verifies those assumptions
//! before any geometric work and is held, RAII-style, for the duration
//! of a pipeline run. On the targets Rust supports this is a check, not
//! a mode switch: `f64` arithmetic is already IEEE-conforming, and the
//! crate-wide `forbid(unsafe_code)` rules out touching control
//! registers. Restoration on drop is therefore a no-op, but the scope
//! still marks the region in which predicate results are trusted.

#![forbid(unsafe_code)]

use thiserror::Error;

/// The floating-point environment does not meet the kernel's
/// assumptions.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FpuError {
    /// Addition did not round to nearest.
    #[error("floating-point unit is not in round-to-nearest mode")]
    NotRoundToNearest,
    /// Intermediate results carry excess precision.
    #[error("floating-point unit computes with extended precision")]
    ExtendedPrecision,
}

/// Scoped witness of a verified floating-point environment.
#[derive(Debug)]
pub struct FpuGuard {
    _private: (),
}

impl FpuGuard {
    /// Verify the floating-point environment and return a guard for it.
    ///
    /// # Errors
    ///
    /// Returns an [`FpuError`] if the environment is misconfigured, in
    /// which case no geometric computation should be attempted.
    pub fn acquire() -> Result<Self, FpuError> {
        // Round-to-nearest, ties to even: 1 + 2^-53 rounds down to 1,
        // and 1 + 1.5*eps ties to even, landing on 1 + 2*eps.
        let ulp_half = f64::EPSILON / 2.0;
        let one = std::hint::black_box(1.0f64);
        if one + std::hint::black_box(ulp_half) != 1.0 {
            return Err(FpuError::NotRoundToNearest);
        }
        if one + std::hint::black_box(1.5 * f64::EPSILON) != 1.0 + 2.0 * f64::EPSILON {
            return Err(FpuError::NotRoundToNearest);
        }
        // With 64-bit significands (x87 extended precision) the sum
        // below survives; in binary64 the small term is absorbed.
        let big = std::hint::black_box(9_007_199_254_740_992.0f64); // 2^53
        if big + std::hint::black_box(1.0) != big {
            return Err(FpuError::ExtendedPrecision);
        }
        Ok(Self { _private: () })
    }
}
