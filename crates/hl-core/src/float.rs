//! Leaf scalars: the capability contracts on native `f32` and `f64`.
//!
//! Every operation is the native floating-point operation. Nothing is
//! trapped: `1/0` is `inf`, `ln(-1)` is `NaN`, and both propagate through
//! whatever is built on top.

use crate::traits::{Absolute, Field, Floating, Ring, Trigonometric};

/// Degree-to-radian factor, `π/180`.
pub const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

macro_rules! impl_leaf_scalar {
    ($t:ty) => {
        impl Ring for $t {
            #[inline]
            fn one(&self) -> Self {
                1.0
            }

            #[inline]
            fn constant(&self, k: i32) -> Self {
                k as $t
            }

            #[inline]
            fn powi(self, k: i32) -> Self {
                <$t>::powi(self, k)
            }
        }

        impl Field for $t {
            #[inline]
            fn recip(self) -> Self {
                1.0 / self
            }
        }

        impl Absolute for $t {
            #[inline]
            fn abs(self) -> Self {
                <$t>::abs(self)
            }

            #[inline]
            fn sign(&self) -> i32 {
                if *self < 0.0 { -1 } else { 1 }
            }
        }

        impl Trigonometric for $t {
            #[inline]
            fn sin(self) -> Self {
                <$t>::sin(self)
            }

            #[inline]
            fn sin_deg(self) -> Self {
                <$t>::sin(self * DEG_TO_RAD as $t)
            }

            #[inline]
            fn cos(self) -> Self {
                <$t>::cos(self)
            }

            #[inline]
            fn cos_deg(self) -> Self {
                <$t>::cos(self * DEG_TO_RAD as $t)
            }

            #[inline]
            fn exp(self) -> Self {
                <$t>::exp(self)
            }

            #[inline]
            fn ln(self) -> Self {
                <$t>::ln(self)
            }
        }

        impl Floating for $t {
            #[inline]
            fn lift(&self, x: f64) -> Self {
                x as $t
            }

            #[inline]
            fn value(&self) -> f64 {
                *self as f64
            }

            #[inline]
            fn add_scalar(self, rhs: f64) -> Self {
                self + rhs as $t
            }

            #[inline]
            fn sub_scalar(self, rhs: f64) -> Self {
                self - rhs as $t
            }

            #[inline]
            fn sub_from(self, lhs: f64) -> Self {
                lhs as $t - self
            }

            #[inline]
            fn mul_scalar(self, rhs: f64) -> Self {
                self * rhs as $t
            }

            #[inline]
            fn div_scalar(self, rhs: f64) -> Self {
                self / rhs as $t
            }
        }
    };
}

impl_leaf_scalar!(f32);
impl_leaf_scalar!(f64);
