//! Fixed-point money type.
//!
//! # Motivation
//!
//! All money amounts in this system use a 1e-6 (micros) fixed-point
//! representation stored as `i64`. Using raw `i64` for money is error-prone:
//! it allows accidental arithmetic with unrelated integers (quantities, IDs,
//! prices at different scales) without any compile-time signal.
//!
//! `Micros` wraps the raw `i64` so the type system prevents:
//! - Implicit construction from raw `i64` (no `From<i64>` impl).
//! - Mixing `Micros` with unrelated `i64` values in arithmetic.
//!
//! # Scale
//!
//! 1 unit = 1_000_000 Micros. All monetary values (cash, PnL, price × qty)
//! use this scale. Non-monetary quantities (share counts, timestamps) remain
//! plain `i64` and are never implicitly convertible.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// A fixed-point monetary amount at 1e-6 scale (micros).
///
/// # Construction
///
/// Use [`Micros::new`] for explicit construction. There is intentionally no
/// `From<i64>` implementation — callers must be deliberate about when a raw
/// integer represents a monetary amount.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Micros(i64);

impl Micros {
    pub const ZERO: Micros = Micros(0);
    pub const MAX: Micros = Micros(i64::MAX);
    pub const MIN: Micros = Micros(i64::MIN);

    #[inline]
    pub const fn new(raw: i64) -> Self {
        Micros(raw)
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Saturating addition — clamps at [`Micros::MAX`] on overflow.
    #[inline]
    pub fn saturating_add(self, rhs: Micros) -> Micros {
        Micros(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction — clamps at [`Micros::MIN`] on underflow.
    #[inline]
    pub fn saturating_sub(self, rhs: Micros) -> Micros {
        Micros(self.0.saturating_sub(rhs.0))
    }

    /// Absolute value. `Micros::MIN.abs()` saturates to `Micros::MAX`.
    #[inline]
    pub fn abs(self) -> Micros {
        Micros(self.0.saturating_abs())
    }

    #[inline]
    pub fn signum(self) -> i64 {
        self.0.signum()
    }

    #[inline]
    pub fn is_non_negative(self) -> bool {
        self.0 >= 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Multiply a per-unit price by an integer share quantity.
    ///
    /// Returns `None` on `i64` overflow; callers must handle this explicitly
    /// rather than have it silently clamp.
    #[inline]
    pub fn checked_mul_qty(self, qty: i64) -> Option<Micros> {
        self.0.checked_mul(qty).map(Micros)
    }

}

impl Add for Micros {
    type Output = Micros;
    #[inline]
    fn add(self, rhs: Micros) -> Micros {
        Micros(self.0 + rhs.0)
    }
}

impl Sub for Micros {
    type Output = Micros;
    #[inline]
    fn sub(self, rhs: Micros) -> Micros {
        Micros(self.0 - rhs.0)
    }
}

impl Neg for Micros {
    type Output = Micros;
    #[inline]
    fn neg(self) -> Micros {
        Micros(-self.0)
    }
}

impl AddAssign for Micros {
    #[inline]
    fn add_assign(&mut self, rhs: Micros) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Micros {
    #[inline]
    fn sub_assign(&mut self, rhs: Micros) {
        self.0 -= rhs.0;
    }
}

impl std::fmt::Display for Micros {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dollars = self.0 / 1_000_000;
        let frac = (self.0 % 1_000_000).abs();
        if self.0 < 0 && dollars == 0 {
            write!(f, "-{dollars}.{frac:06}")
        } else {
            write!(f, "{dollars}.{frac:06}")
        }
    }
}

/// Clamp an `i128` intermediate (used to avoid overflow in money math before
/// the final value is known to fit) back into `i64` range.
pub fn i128_to_i64_clamp(v: i128) -> i64 {
    if v > i64::MAX as i128 {
        i64::MAX
    } else if v < i64::MIN as i128 {
        i64::MIN
    } else {
        v as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_additive_identity() {
        let a = Micros::new(42_000_000);
        assert_eq!(a + Micros::ZERO, a);
    }

    #[test]
    fn add_and_sub_roundtrip() {
        let a = Micros::new(100_000_000);
        let b = Micros::new(25_000_000);
        assert_eq!((a + b) - b, a);
    }

    #[test]
    fn saturating_add_clamps_at_max() {
        assert_eq!(Micros::MAX.saturating_add(Micros::new(1)), Micros::MAX);
    }

    #[test]
    fn saturating_sub_clamps_at_min() {
        assert_eq!(Micros::MIN.saturating_sub(Micros::new(1)), Micros::MIN);
    }

    #[test]
    fn checked_mul_qty_overflow_returns_none() {
        assert_eq!(Micros::MAX.checked_mul_qty(2), None);
    }

    #[test]
    fn display_formats_with_six_decimal_places() {
        assert_eq!(format!("{}", Micros::new(1_500_000)), "1.500000");
    }

    #[test]
    fn display_negative_under_one() {
        assert_eq!(format!("{}", Micros::new(-750_000)), "-0.750000");
    }

    #[test]
    fn i128_clamp_saturates() {
        assert_eq!(i128_to_i64_clamp(i128::MAX), i64::MAX);
        assert_eq!(i128_to_i64_clamp(i128::MIN), i64::MIN);
        assert_eq!(i128_to_i64_clamp(42), 42);
    }
}
