//! Forward-mode automatic differentiation via dual numbers.
//!
//! A [`Dual`] pairs a magnitude `val` with a derivative channel `dot`. Every
//! operation produces the new `dot` from the operands' `dot`s by the chain
//! rule; it is never recomputed independently.
//!
//! The derivative channel is generic. `Dual<f64>` carries a plain `f64`
//! derivative; `Dual<Dual<f64>>` nests to carry second derivatives (see
//! [`second_derivative`]); a [`Tape`](crate::tape::Tape) can also serve as the
//! channel over plain magnitudes.
//!
//! # Example
//! ```
//! use hl_ad::dual::Dual;
//! use hl_core::{Ring, Trigonometric};
//!
//! // d/dx [x^2 + sin x] = 2x + cos x
//! let x = Dual::var(3.0_f64);
//! let y = x.powi(2) + x.sin();
//! assert!((y.dot - (6.0 + 3.0_f64.cos())).abs() < 1e-12);
//! ```

use hl_core::{Absolute, DEG_TO_RAD, Field, Floating, Ring, Tangent, Trigonometric};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A dual number for forward-mode AD.
///
/// `val` holds the primal value, `dot` the derivative with respect to
/// whatever input was seeded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dual<S, D = S> {
    /// Primal (function) value.
    pub val: S,
    /// Tangent (derivative) value.
    pub dot: D,
}

impl<S, D> Dual<S, D> {
    /// Create a dual with an explicit tangent.
    #[inline]
    pub fn new(val: S, dot: D) -> Self {
        Self { val, dot }
    }
}

impl<S: Floating> Dual<S, S> {
    /// Create a constant (derivative = 0).
    #[inline]
    pub fn constant(val: S) -> Self {
        Self { val, dot: val.zero() }
    }

    /// Create an independent variable (derivative = 1).
    #[inline]
    pub fn var(val: S) -> Self {
        Self { val, dot: val.one() }
    }
}

impl<S: Floating, D: Tangent<S>> Dual<S, D> {
    #[inline]
    fn with_dot(&self, val: S, dot: D) -> Self {
        Self { val, dot }
    }

    /// `sign(self)` as a value, with a zero derivative.
    pub fn signum(self) -> Self {
        Self { val: self.val.constant(self.val.sign()), dot: self.dot.zero() }
    }

    /// Maximum of two duals. Derivative follows the larger operand.
    pub fn max(self, other: Self) -> Self {
        if self.val.value() >= other.val.value() { self } else { other }
    }
}

impl<S: fmt::Display, D: fmt::Display> fmt::Display for Dual<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}ϵ", self.val, self.dot)
    }
}

// --- Arithmetic: Dual op Dual ---

impl<S: Floating, D: Tangent<S>> Add for Dual<S, D> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self { val: self.val + rhs.val, dot: self.dot + rhs.dot }
    }
}

impl<S: Floating, D: Tangent<S>> Sub for Dual<S, D> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self { val: self.val - rhs.val, dot: self.dot - rhs.dot }
    }
}

impl<S: Floating, D: Tangent<S>> Mul for Dual<S, D> {
    type Output = Self;
    /// Product rule: `(a·b, a'·b + a·b')`.
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self { val: self.val * rhs.val, dot: self.dot.scale(rhs.val) + rhs.dot.scale(self.val) }
    }
}

impl<S: Floating, D: Tangent<S>> Div for Dual<S, D> {
    type Output = Self;
    /// Quotient rule: `(a/b, (a'·b - a·b') / b²)`.
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let b = rhs.val;
        Self {
            val: self.val / b,
            dot: (self.dot.scale(b) - rhs.dot.scale(self.val)).scale((b * b).recip()),
        }
    }
}

impl<S: Floating, D: Tangent<S>> Neg for Dual<S, D> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self { val: -self.val, dot: -self.dot }
    }
}

// --- Arithmetic: Dual op f64 / f64 op Dual ---

impl<S: Floating, D: Tangent<S>> Add<f64> for Dual<S, D> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: f64) -> Self {
        self.add_scalar(rhs)
    }
}

impl<S: Floating, D: Tangent<S>> Sub<f64> for Dual<S, D> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: f64) -> Self {
        self.sub_scalar(rhs)
    }
}

impl<S: Floating, D: Tangent<S>> Mul<f64> for Dual<S, D> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        self.mul_scalar(rhs)
    }
}

impl<S: Floating, D: Tangent<S>> Div<f64> for Dual<S, D> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f64) -> Self {
        self.div_scalar(rhs)
    }
}

impl<S: Floating, D: Tangent<S>> Add<Dual<S, D>> for f64 {
    type Output = Dual<S, D>;
    #[inline]
    fn add(self, rhs: Dual<S, D>) -> Dual<S, D> {
        rhs.add_scalar(self)
    }
}

impl<S: Floating, D: Tangent<S>> Sub<Dual<S, D>> for f64 {
    type Output = Dual<S, D>;
    #[inline]
    fn sub(self, rhs: Dual<S, D>) -> Dual<S, D> {
        rhs.sub_from(self)
    }
}

impl<S: Floating, D: Tangent<S>> Mul<Dual<S, D>> for f64 {
    type Output = Dual<S, D>;
    #[inline]
    fn mul(self, rhs: Dual<S, D>) -> Dual<S, D> {
        rhs.mul_scalar(self)
    }
}

impl<S: Floating, D: Tangent<S>> Div<Dual<S, D>> for f64 {
    type Output = Dual<S, D>;
    #[inline]
    fn div(self, rhs: Dual<S, D>) -> Dual<S, D> {
        rhs.recip().mul_scalar(self)
    }
}

// --- Capability contracts ---

impl<S: Floating, D: Tangent<S>> Ring for Dual<S, D> {
    #[inline]
    fn one(&self) -> Self {
        self.with_dot(self.val.one(), self.dot.zero())
    }

    #[inline]
    fn constant(&self, k: i32) -> Self {
        self.with_dot(self.val.constant(k), self.dot.zero())
    }

    /// `(a^k, k·a^(k-1)·a')`.
    fn powi(self, k: i32) -> Self {
        let a = self.val;
        Self { val: a.powi(k), dot: self.dot.scale(powi_partial(a, k)) }
    }
}

impl<S: Floating, D: Tangent<S>> Field for Dual<S, D> {
    /// `(1/a, -a'/a²)`.
    #[inline]
    fn recip(self) -> Self {
        let a = self.val;
        Self { val: a.recip(), dot: self.dot.scale(-(a * a).recip()) }
    }
}

impl<S: Floating, D: Tangent<S>> Absolute for Dual<S, D> {
    /// `(|a|, a')` for `a ≥ 0`, `(|a|, -a')` otherwise.
    fn abs(self) -> Self {
        let dot = if self.val.sign() < 0 { -self.dot } else { self.dot };
        Self { val: self.val.abs(), dot }
    }

    #[inline]
    fn sign(&self) -> i32 {
        self.val.sign()
    }
}

impl<S: Floating, D: Tangent<S>> Trigonometric for Dual<S, D> {
    fn sin(self) -> Self {
        let a = self.val;
        Self { val: a.sin(), dot: self.dot.scale(a.cos()) }
    }

    /// The degree-to-radian factor `π/180` appears in the derivative.
    fn sin_deg(self) -> Self {
        let a = self.val;
        Self { val: a.sin_deg(), dot: self.dot.scale(a.cos_deg().mul_scalar(DEG_TO_RAD)) }
    }

    fn cos(self) -> Self {
        let a = self.val;
        Self { val: a.cos(), dot: self.dot.scale(-a.sin()) }
    }

    fn cos_deg(self) -> Self {
        let a = self.val;
        Self { val: a.cos_deg(), dot: self.dot.scale(-a.sin_deg().mul_scalar(DEG_TO_RAD)) }
    }

    fn exp(self) -> Self {
        let e = self.val.exp();
        Self { val: e, dot: self.dot.scale(e) }
    }

    fn ln(self) -> Self {
        let a = self.val;
        Self { val: a.ln(), dot: self.dot.scale(a.recip()) }
    }
}

/// Literal operands are constants: they never touch the derivative channel
/// except through the product/quotient rule.
impl<S: Floating, D: Tangent<S>> Floating for Dual<S, D> {
    #[inline]
    fn lift(&self, x: f64) -> Self {
        self.with_dot(self.val.lift(x), self.dot.zero())
    }

    #[inline]
    fn value(&self) -> f64 {
        self.val.value()
    }

    #[inline]
    fn add_scalar(self, rhs: f64) -> Self {
        Self { val: self.val.add_scalar(rhs), dot: self.dot }
    }

    #[inline]
    fn sub_scalar(self, rhs: f64) -> Self {
        Self { val: self.val.sub_scalar(rhs), dot: self.dot }
    }

    #[inline]
    fn sub_from(self, lhs: f64) -> Self {
        Self { val: self.val.sub_from(lhs), dot: -self.dot }
    }

    #[inline]
    fn mul_scalar(self, rhs: f64) -> Self {
        Self { val: self.val.mul_scalar(rhs), dot: self.dot.mul_scalar(rhs) }
    }

    #[inline]
    fn div_scalar(self, rhs: f64) -> Self {
        Self { val: self.val.div_scalar(rhs), dot: self.dot.div_scalar(rhs) }
    }
}

/// `d/da a^k = k·a^(k-1)`.
///
/// `k = 0` gives exactly zero rather than `0 · a^-1`, which is NaN at `a = 0`.
/// `k - 1` overflows for `i32::MIN`; that case divides `a^k` by `a` instead.
pub(crate) fn powi_partial<S: Floating>(a: S, k: i32) -> S {
    if k == 0 {
        return a.zero();
    }
    let lowered = match k.checked_sub(1) {
        Some(k1) => a.powi(k1),
        None => a.powi(k) / a,
    };
    lowered.mul_scalar(k as f64)
}

// --- Sum / From / PartialOrd ---

macro_rules! impl_leaf_conversions {
    ($t:ty) => {
        impl Sum for Dual<$t> {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Dual::constant(0.0), |acc, x| acc + x)
            }
        }

        impl From<$t> for Dual<$t> {
            fn from(val: $t) -> Self {
                Self::constant(val)
            }
        }
    };
}

impl_leaf_conversions!(f32);
impl_leaf_conversions!(f64);

impl<S: PartialOrd, D: PartialEq> PartialOrd for Dual<S, D> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.val.partial_cmp(&other.val)
    }
}

// --- Helpers ---

/// Value and first derivative of `f` at `x`.
pub fn derivative<S: Floating>(f: impl Fn(Dual<S>) -> Dual<S>, x: S) -> (S, S) {
    let y = f(Dual::var(x));
    (y.val, y.dot)
}

/// Forward-mode gradient: one evaluation per input, each with a single
/// seeded variable. Returns `(value, gradient)`.
pub fn gradient<S: Floating>(f: impl Fn(&[Dual<S>]) -> Dual<S>, xs: &[S]) -> (S, Vec<S>) {
    let mut args: Vec<Dual<S>> = xs.iter().copied().map(Dual::constant).collect();
    let mut grad = Vec::with_capacity(xs.len());
    let mut value = None;
    for seed in 0..xs.len() {
        args[seed] = Dual::var(xs[seed]);
        let y = f(&args);
        grad.push(y.dot);
        value.get_or_insert(y.val);
        args[seed] = Dual::constant(xs[seed]);
    }
    let value = value.unwrap_or_else(|| f(&args).val);
    (value, grad)
}

/// Value, first and second derivative of `f` at `x`, by nesting duals.
///
/// The outer magnitude is `x + 1ϵ₁` and the outer tangent `1 + 0ϵ₁`; the
/// product rule then places `f''` in the inner tangent of the outer tangent.
pub fn second_derivative<S: Floating>(f: impl Fn(Dual<Dual<S>>) -> Dual<Dual<S>>, x: S) -> (S, S, S) {
    let inner = Dual::var(x);
    let y = f(Dual::new(inner, inner.one()));
    (y.val.val, y.val.dot, y.dot.dot)
}
