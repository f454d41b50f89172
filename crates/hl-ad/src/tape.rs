//! Reverse-mode tape values.
//!
//! A [`Tape`] is a magnitude, the id of the node that produced it, and a
//! borrowed handle to the recorder. Every operation computes the new magnitude
//! with the wrapped scalar's own arithmetic and appends exactly one node
//! holding the local partial derivative with respect to each operand.
//!
//! | op | `partial1` | `partial2` |
//! |----|-----------|-----------|
//! | `a + b` | `1` | `1` |
//! | `a - b` | `1` | `-1` |
//! | `a * b` | `b` | `a` |
//! | `a / b` | `1/b` | `-a/b²` |
//! | `-a` | `-1` | |
//! | `a^k` | `k·a^(k-1)` | |
//! | `exp a` | `exp a` | |
//! | `ln a` | `1/a` | |
//! | `abs a` | `sign a` | |
//! | `sin a` / `cos a` | `cos a` / `-sin a` | |
//! | `sin_deg a` / `cos_deg a` | `π/180·cos_deg a` / `-π/180·sin_deg a` | |
//!
//! Values built with [`Ring::one`], [`Ring::constant`] or [`Floating::lift`]
//! are *detached*: they carry the sentinel id and take no node slot, so no
//! adjoint is ever accumulated for them. Use [`Trace::constant`] for a
//! constant whose adjoint you want to read.

use crate::backward::{Gradient, recorder_addr};
use crate::dual::powi_partial;
use crate::node::{Node, NodeId, Op};
use crate::trace::{Recorder, Trace};
use hl_core::{Absolute, DEG_TO_RAD, Field, Floating, Result, Ring, Tangent, Trigonometric};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A value recorded on a trace.
///
/// Equality compares node ids only: two tape values are the same iff they
/// are the same node. All detached values share id 0 and compare equal.
pub struct Tape<'t, T, R = Trace<T>> {
    magnitude: T,
    id: NodeId,
    trace: &'t R,
}

impl<'t, T: Copy, R> Clone for Tape<'t, T, R> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<'t, T: Copy, R> Copy for Tape<'t, T, R> {}

impl<'t, T, R> PartialEq for Tape<'t, T, R> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<'t, T, R> Eq for Tape<'t, T, R> {}

impl<'t, T: fmt::Debug, R> fmt::Debug for Tape<'t, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tape").field("magnitude", &self.magnitude).field("id", &self.id).finish()
    }
}

impl<'t, T: fmt::Display, R> fmt::Display for Tape<'t, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + Xϵ", self.magnitude)
    }
}

impl<'t, T: Copy, R> Tape<'t, T, R> {
    /// The forward value.
    #[inline]
    pub fn magnitude(&self) -> T {
        self.magnitude
    }

    /// Id of the node that produced this value (sentinel if detached).
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Whether this value has no node of its own.
    #[inline]
    pub fn is_detached(&self) -> bool {
        self.id.is_sentinel()
    }

    /// The recorder this value appends to.
    #[inline]
    pub fn trace(&self) -> &'t R {
        self.trace
    }
}

impl<'t, T: Floating, R: Recorder<T>> Tape<'t, T, R> {
    /// Record an independent input on `trace`.
    pub fn var(trace: &'t R, x: T) -> Self {
        let id = trace.record(Node::leaf(Op::Var, x.zero()));
        Self { magnitude: x, id, trace }
    }

    /// Record a constant on `trace`.
    pub fn constant(trace: &'t R, x: T) -> Self {
        let id = trace.record(Node::leaf(Op::Const, x.zero()));
        Self { magnitude: x, id, trace }
    }

    #[inline]
    fn detached(&self, magnitude: T) -> Self {
        Self { magnitude, id: NodeId::SENTINEL, trace: self.trace }
    }

    #[inline]
    fn push(&self, magnitude: T, node: Node<T>) -> Self {
        Self { magnitude, id: self.trace.record(node), trace: self.trace }
    }

    #[inline]
    fn unary(self, magnitude: T, partial: T, op: Op) -> Self {
        self.push(magnitude, Node::unary(self.id, partial, partial.zero(), op))
    }

    #[inline]
    fn binary(self, rhs: Self, magnitude: T, partial1: T, partial2: T, op: Op) -> Self {
        debug_assert!(std::ptr::eq(self.trace, rhs.trace), "operands recorded on different traces");
        self.push(magnitude, Node::binary(self.id, partial1, rhs.id, partial2, op))
    }

    /// `sign(self)` as a value: `-1` or `+1`, recorded with a zero partial.
    pub fn signum(self) -> Self {
        let a = self.magnitude;
        self.unary(a.constant(a.sign()), a.zero(), Op::Sign)
    }

    /// Backward pass seeded with one: `∂self/∂node` for every node.
    pub fn backward(&self) -> Result<Gradient<T>> {
        self.backward_with_seed(self.magnitude.one())
    }

    /// Backward pass with an explicit seed adjoint.
    pub fn backward_with_seed(&self, seed: T) -> Result<Gradient<T>> {
        let config = self.trace.config();
        let gradient =
            self.trace.with_nodes(|nodes| crate::backward::backward(nodes, self.id, seed, &config))?;
        Ok(gradient.with_origin(recorder_addr(self.trace)))
    }
}

// --- Arithmetic: Tape op Tape ---

impl<'t, T: Floating, R: Recorder<T>> Add for Tape<'t, T, R> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        let one = self.magnitude.one();
        self.binary(rhs, self.magnitude + rhs.magnitude, one, one, Op::Add)
    }
}

impl<'t, T: Floating, R: Recorder<T>> Sub for Tape<'t, T, R> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        let one = self.magnitude.one();
        self.binary(rhs, self.magnitude - rhs.magnitude, one, -one, Op::Sub)
    }
}

impl<'t, T: Floating, R: Recorder<T>> Mul for Tape<'t, T, R> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let (a, b) = (self.magnitude, rhs.magnitude);
        self.binary(rhs, a * b, b, a, Op::Mul)
    }
}

impl<'t, T: Floating, R: Recorder<T>> Div for Tape<'t, T, R> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let (a, b) = (self.magnitude, rhs.magnitude);
        self.binary(rhs, a / b, b.recip(), -(a / (b * b)), Op::Div)
    }
}

impl<'t, T: Floating, R: Recorder<T>> Neg for Tape<'t, T, R> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        let a = self.magnitude;
        self.unary(-a, -a.one(), Op::Neg)
    }
}

// --- Arithmetic: Tape op f64 / f64 op Tape ---

impl<'t, T: Floating, R: Recorder<T>> Add<f64> for Tape<'t, T, R> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: f64) -> Self {
        self.add_scalar(rhs)
    }
}

impl<'t, T: Floating, R: Recorder<T>> Sub<f64> for Tape<'t, T, R> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: f64) -> Self {
        self.sub_scalar(rhs)
    }
}

impl<'t, T: Floating, R: Recorder<T>> Mul<f64> for Tape<'t, T, R> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        self.mul_scalar(rhs)
    }
}

impl<'t, T: Floating, R: Recorder<T>> Div<f64> for Tape<'t, T, R> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f64) -> Self {
        self.div_scalar(rhs)
    }
}

impl<'t, T: Floating, R: Recorder<T>> Add<Tape<'t, T, R>> for f64 {
    type Output = Tape<'t, T, R>;
    #[inline]
    fn add(self, rhs: Tape<'t, T, R>) -> Tape<'t, T, R> {
        rhs.add_scalar(self)
    }
}

impl<'t, T: Floating, R: Recorder<T>> Sub<Tape<'t, T, R>> for f64 {
    type Output = Tape<'t, T, R>;
    #[inline]
    fn sub(self, rhs: Tape<'t, T, R>) -> Tape<'t, T, R> {
        rhs.sub_from(self)
    }
}

impl<'t, T: Floating, R: Recorder<T>> Mul<Tape<'t, T, R>> for f64 {
    type Output = Tape<'t, T, R>;
    #[inline]
    fn mul(self, rhs: Tape<'t, T, R>) -> Tape<'t, T, R> {
        rhs.mul_scalar(self)
    }
}

// --- Capability contracts ---

impl<'t, T: Floating, R: Recorder<T>> Ring for Tape<'t, T, R> {
    #[inline]
    fn one(&self) -> Self {
        self.detached(self.magnitude.one())
    }

    #[inline]
    fn constant(&self, k: i32) -> Self {
        self.detached(self.magnitude.constant(k))
    }

    fn powi(self, k: i32) -> Self {
        let a = self.magnitude;
        self.unary(a.powi(k), powi_partial(a, k), Op::Pow)
    }
}

impl<'t, T: Floating, R: Recorder<T>> Field for Tape<'t, T, R> {
    /// `one / self`, recorded as a `Div` node whose first parent is the
    /// sentinel.
    #[inline]
    fn recip(self) -> Self {
        self.one() / self
    }
}

impl<'t, T: Floating, R: Recorder<T>> Absolute for Tape<'t, T, R> {
    fn abs(self) -> Self {
        let a = self.magnitude;
        let partial = if a.sign() < 0 { -a.one() } else { a.one() };
        self.unary(a.abs(), partial, Op::Abs)
    }

    #[inline]
    fn sign(&self) -> i32 {
        self.magnitude.sign()
    }
}

impl<'t, T: Floating, R: Recorder<T>> Trigonometric for Tape<'t, T, R> {
    fn sin(self) -> Self {
        let a = self.magnitude;
        self.unary(a.sin(), a.cos(), Op::Sin)
    }

    fn sin_deg(self) -> Self {
        let a = self.magnitude;
        self.unary(a.sin_deg(), a.cos_deg().mul_scalar(DEG_TO_RAD), Op::SinDeg)
    }

    fn cos(self) -> Self {
        let a = self.magnitude;
        self.unary(a.cos(), -a.sin(), Op::Cos)
    }

    fn cos_deg(self) -> Self {
        let a = self.magnitude;
        self.unary(a.cos_deg(), -a.sin_deg().mul_scalar(DEG_TO_RAD), Op::CosDeg)
    }

    fn exp(self) -> Self {
        let e = self.magnitude.exp();
        self.unary(e, e, Op::Exp)
    }

    fn ln(self) -> Self {
        let a = self.magnitude;
        self.unary(a.ln(), a.recip(), Op::Log)
    }
}

impl<'t, T: Floating, R: Recorder<T>> Floating for Tape<'t, T, R> {
    #[inline]
    fn lift(&self, x: f64) -> Self {
        self.detached(self.magnitude.lift(x))
    }

    #[inline]
    fn value(&self) -> f64 {
        self.magnitude.value()
    }

    fn add_scalar(self, rhs: f64) -> Self {
        let a = self.magnitude;
        self.unary(a.add_scalar(rhs), a.one(), Op::Add)
    }

    fn sub_scalar(self, rhs: f64) -> Self {
        let a = self.magnitude;
        self.unary(a.sub_scalar(rhs), a.one(), Op::Sub)
    }

    /// `lhs - self`: the operand sits in the second slot with partial `-1`,
    /// as it would in a binary `Sub` whose first operand is detached.
    fn sub_from(self, lhs: f64) -> Self {
        let a = self.magnitude;
        let zero = a.zero();
        self.push(a.sub_from(lhs), Node::binary(NodeId::SENTINEL, zero, self.id, -a.one(), Op::Sub))
    }

    fn mul_scalar(self, rhs: f64) -> Self {
        let a = self.magnitude;
        self.unary(a.mul_scalar(rhs), a.lift(rhs), Op::Mul)
    }

    fn div_scalar(self, rhs: f64) -> Self {
        let a = self.magnitude;
        self.unary(a.div_scalar(rhs), a.lift(rhs).recip(), Op::Div)
    }
}

/// A tape value can carry the derivative channel of a dual whose magnitudes
/// are plain `T`; scaling records a `Mul` node.
impl<'t, T: Floating, R: Recorder<T>> Tangent<T> for Tape<'t, T, R> {
    #[inline]
    fn scale(self, k: T) -> Self {
        self.unary(self.magnitude * k, k, Op::Mul)
    }
}
