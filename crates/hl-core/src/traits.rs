//! Capability contracts.
//!
//! Each trait names a set of operations a scalar-like type must provide.
//! The contracts are layered the same way the algebra is:
//!
//! ```text
//! Additive ─► Ring ─┬─► Field ──────┐
//!                   └─► Absolute ───┼─► Floating
//!       Trigonometric ──────────────┘
//! ```
//!
//! The laws listed on each trait are not checked by the compiler. Breaking one
//! is a bug in the implementing type; the property tests in this workspace
//! exercise them for every provided implementation.
//!
//! Constructors (`one`, `constant`, `zero`, `lift`) take `&self` as a context
//! witness. A reverse-mode tape value cannot build even a constant without the
//! trace it belongs to, so lifting always starts from an existing value.
//! Never rely on a "default" value being zero; go through these constructors.

use std::ops::{Add, Div, Mul, Neg, Sub};

/// Additive group.
///
/// ```text
///        a + b == b + a
///  (a + b) + c == a + (b + c)
///     zero + a == a
///   a + (-a)   == zero
/// ```
///
/// Implemented for every `Copy` type with closed `+`, `-` and unary `-`.
pub trait Additive:
    Copy + Add<Output = Self> + Sub<Output = Self> + Neg<Output = Self>
{
}

impl<T> Additive for T where T: Copy + Add<Output = T> + Sub<Output = T> + Neg<Output = T> {}

/// Ring: an additive group with an associative, distributive `*`.
///
/// ```text
/// a * (b * c) == (a * b) * c
///     one * a == a == a * one
/// a * (b + c) == a * b + a * c
/// ```
pub trait Ring: Additive + Mul<Output = Self> {
    /// Multiplicative identity in the same context as `self`.
    fn one(&self) -> Self;

    /// Lift an integer into the same context as `self`.
    fn constant(&self, k: i32) -> Self;

    /// Additive identity in the same context as `self`.
    #[inline]
    fn zero(&self) -> Self {
        self.constant(0)
    }

    /// Integer power.
    fn powi(self, k: i32) -> Self;
}

/// Field: a ring with division.
///
/// ```text
/// b != 0  =>  (a * b) / b == a
/// a != 0  =>  a * recip(a) == one
/// ```
pub trait Field: Ring + Div<Output = Self> {
    /// Multiplicative inverse.
    fn recip(self) -> Self;
}

/// Ring with an absolute value.
///
/// ```text
/// a != 0  =>  abs(sign(a)) == 1
///             abs(a) * sign(a) == a
/// ```
pub trait Absolute: Ring {
    /// Absolute value.
    fn abs(self) -> Self;

    /// `-1` for a negative magnitude, `+1` otherwise.
    ///
    /// Zero (and NaN) map to `+1`; this is the canonical tie-break used by
    /// every implementation and by the derivative of [`Absolute::abs`].
    fn sign(&self) -> i32;
}

/// Trigonometric and transcendental functions.
pub trait Trigonometric: Sized {
    /// Sine, argument in radians.
    fn sin(self) -> Self;

    /// Sine, argument in degrees.
    fn sin_deg(self) -> Self;

    /// Cosine, argument in radians.
    fn cos(self) -> Self;

    /// Cosine, argument in degrees.
    fn cos_deg(self) -> Self;

    /// Exponential.
    fn exp(self) -> Self;

    /// Natural logarithm.
    fn ln(self) -> Self;
}

/// The full floating-point kernel: every contract above plus mixed
/// operations against a native `f64` literal.
///
/// The default literal operations lift the literal with [`Floating::lift`]
/// and fall back to the closed operators. Implementations override them when
/// the literal can be applied more directly.
pub trait Floating: Field + Absolute + Trigonometric {
    /// Lift an `f64` literal into the same context as `self`.
    fn lift(&self, x: f64) -> Self;

    /// The primal magnitude as an `f64`.
    fn value(&self) -> f64;

    /// `self + rhs`
    #[inline]
    fn add_scalar(self, rhs: f64) -> Self {
        let c = self.lift(rhs);
        self + c
    }

    /// `self - rhs`
    #[inline]
    fn sub_scalar(self, rhs: f64) -> Self {
        let c = self.lift(rhs);
        self - c
    }

    /// `lhs - self`
    #[inline]
    fn sub_from(self, lhs: f64) -> Self {
        let c = self.lift(lhs);
        c - self
    }

    /// `self * rhs`
    #[inline]
    fn mul_scalar(self, rhs: f64) -> Self {
        let c = self.lift(rhs);
        self * c
    }

    /// `self / rhs`
    #[inline]
    fn div_scalar(self, rhs: f64) -> Self {
        let c = self.lift(rhs);
        self / c
    }
}

/// A derivative channel over magnitudes of type `S`.
///
/// Forward-mode duals need to multiply a tangent by a local partial that
/// lives in the magnitude algebra. Every [`Floating`] type is a tangent over
/// itself; other algebras (for example a reverse-mode tape value carrying the
/// derivative of a plain-scalar dual) provide their own scaling.
pub trait Tangent<S>: Floating {
    /// `self * k`
    fn scale(self, k: S) -> Self;
}

impl<T: Floating> Tangent<T> for T {
    #[inline]
    fn scale(self, k: T) -> T {
        self * k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// `x^2 - 2x + 1` written once against the contracts.
    fn square_minus<T: Floating>(x: T) -> T {
        x.powi(2) - x.constant(2) * x + x.one()
    }

    #[test]
    fn test_generic_code_over_leaf_scalars() {
        assert_relative_eq!(square_minus(3.0_f64), 4.0, epsilon = 1e-12);
        assert_relative_eq!(square_minus(3.0_f32), 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_default_literal_ops() {
        // f64 overrides these; the defaults are exercised through a wrapper.
        #[derive(Debug, Clone, Copy, PartialEq)]
        struct Wrapped(f64);

        impl Add for Wrapped {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Wrapped(self.0 + rhs.0)
            }
        }
        impl Sub for Wrapped {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Wrapped(self.0 - rhs.0)
            }
        }
        impl Mul for Wrapped {
            type Output = Self;
            fn mul(self, rhs: Self) -> Self {
                Wrapped(self.0 * rhs.0)
            }
        }
        impl Div for Wrapped {
            type Output = Self;
            fn div(self, rhs: Self) -> Self {
                Wrapped(self.0 / rhs.0)
            }
        }
        impl Neg for Wrapped {
            type Output = Self;
            fn neg(self) -> Self {
                Wrapped(-self.0)
            }
        }
        impl Ring for Wrapped {
            fn one(&self) -> Self {
                Wrapped(1.0)
            }
            fn constant(&self, k: i32) -> Self {
                Wrapped(k as f64)
            }
            fn powi(self, k: i32) -> Self {
                Wrapped(self.0.powi(k))
            }
        }
        impl Field for Wrapped {
            fn recip(self) -> Self {
                Wrapped(1.0 / self.0)
            }
        }
        impl Absolute for Wrapped {
            fn abs(self) -> Self {
                Wrapped(self.0.abs())
            }
            fn sign(&self) -> i32 {
                if self.0 < 0.0 { -1 } else { 1 }
            }
        }
        impl Trigonometric for Wrapped {
            fn sin(self) -> Self {
                Wrapped(self.0.sin())
            }
            fn sin_deg(self) -> Self {
                Wrapped(self.0.to_radians().sin())
            }
            fn cos(self) -> Self {
                Wrapped(self.0.cos())
            }
            fn cos_deg(self) -> Self {
                Wrapped(self.0.to_radians().cos())
            }
            fn exp(self) -> Self {
                Wrapped(self.0.exp())
            }
            fn ln(self) -> Self {
                Wrapped(self.0.ln())
            }
        }
        impl Floating for Wrapped {
            fn lift(&self, x: f64) -> Self {
                Wrapped(x)
            }
            fn value(&self) -> f64 {
                self.0
            }
        }

        let w = Wrapped(6.0);
        assert_eq!(w.add_scalar(1.5), Wrapped(7.5));
        assert_eq!(w.sub_scalar(1.5), Wrapped(4.5));
        assert_eq!(w.sub_from(10.0), Wrapped(4.0));
        assert_eq!(w.mul_scalar(0.5), Wrapped(3.0));
        assert_eq!(w.div_scalar(4.0), Wrapped(1.5));
        assert_eq!(w.zero(), Wrapped(0.0));
        assert_eq!(w.scale(Wrapped(2.0)), Wrapped(12.0));
    }
}
