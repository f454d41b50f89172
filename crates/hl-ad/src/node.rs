//! Trace node record.
//!
//! `(parent1, partial1, parent2, partial2, op)` is the shape every recorder
//! stores and every backward pass reads. It is also the serialized form of a
//! trace, so trace-inspection tooling can rely on it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node in a trace.
///
/// Ids start at 1 and are handed out in creation order. `0` is the sentinel
/// meaning "no dependency": unary nodes use it for their second slot, and
/// detached constants carry it as their own id.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The "no dependency" id.
    pub const SENTINEL: NodeId = NodeId(0);

    /// Raw index (also the position in an adjoint vector).
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }

    /// Whether this is the sentinel.
    #[inline]
    pub fn is_sentinel(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Operation that produced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    /// Independent input (leaf).
    Var,
    /// Recorded constant (leaf).
    Const,
    /// `-a`
    Neg,
    /// `sign(a)`; locally constant.
    Sign,
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// Integer power.
    Pow,
    /// `exp(a)`
    Exp,
    /// Natural logarithm.
    Log,
    /// `|a|`
    Abs,
    /// `sin(a)`, radians.
    Sin,
    /// `sin(a)`, degrees.
    SinDeg,
    /// `cos(a)`, radians.
    Cos,
    /// `cos(a)`, degrees.
    CosDeg,
}

impl Op {
    /// Leaves have no parents.
    #[inline]
    pub fn is_leaf(self) -> bool {
        matches!(self, Op::Var | Op::Const)
    }
}

/// One entry of the trace.
///
/// `partial1`/`partial2` are the local partial derivatives of this node's
/// value with respect to `parent1`/`parent2`, evaluated at the magnitudes the
/// operation saw. A sentinel parent carries a zero partial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node<T> {
    /// First dependency, or the sentinel.
    pub parent1: NodeId,
    /// `∂self/∂parent1`
    pub partial1: T,
    /// Second dependency, or the sentinel.
    pub parent2: NodeId,
    /// `∂self/∂parent2`
    pub partial2: T,
    /// Producing operation.
    pub op: Op,
}

impl<T: Copy> Node<T> {
    /// A leaf (`Var`/`Const`) node.
    #[inline]
    pub fn leaf(op: Op, zero: T) -> Self {
        Self { parent1: NodeId::SENTINEL, partial1: zero, parent2: NodeId::SENTINEL, partial2: zero, op }
    }

    /// A node depending on a single parent.
    #[inline]
    pub fn unary(parent: NodeId, partial: T, zero: T, op: Op) -> Self {
        Self { parent1: parent, partial1: partial, parent2: NodeId::SENTINEL, partial2: zero, op }
    }

    /// A node depending on two parents (either may be the sentinel).
    #[inline]
    pub fn binary(parent1: NodeId, partial1: T, parent2: NodeId, partial2: T, op: Op) -> Self {
        Self { parent1, partial1, parent2, partial2, op }
    }

    /// Whether both parents precede `own` (or are the sentinel).
    #[inline]
    pub fn respects_order(&self, own: NodeId) -> bool {
        self.parent1 < own && self.parent2 < own
    }
}
