//! Append-only traces (Wengert lists).
//!
//! A trace is owned by the root computation context; every [`Tape`] value
//! derived from it borrows it. Nodes are appended, never edited or removed
//! individually, and are addressed purely by [`NodeId`].
//!
//! Two recorders are provided:
//! - [`Trace`]: single-threaded, `RefCell`-backed
//! - [`SyncTrace`]: `Mutex`-backed, for forward passes that share one trace
//!   across threads. Appends are serialized by the lock, so every id is still
//!   assigned after the ids of its parents.
//!
//! # Example
//! ```
//! use hl_ad::Trace;
//! use hl_core::Trigonometric;
//!
//! let trace = Trace::new();
//! let x = trace.var(2.0);
//! let y = trace.var(3.0);
//! let f = x * y + x.sin();
//! let g = f.backward().unwrap();
//! assert!((g.wrt(&x) - (3.0 + 2.0_f64.cos())).abs() < 1e-12);
//! assert_eq!(g.wrt(&y), 2.0);
//! ```

use crate::backward::{Gradient, backward, recorder_addr};
use crate::node::{Node, NodeId, Op};
use crate::tape::Tape;
use hl_core::{Error, Floating, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Trace construction and backward-pass options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Nodes to pre-allocate. Default: 0.
    pub capacity: usize,
    /// Skip nodes whose adjoint magnitude is exactly zero during the backward
    /// pass. Faster on sparse graphs, but a skipped node no longer turns a
    /// `NaN`/`inf` partial into a `NaN` adjoint upstream, and nested tangents
    /// with a zero magnitude are dropped. Default: `false`.
    pub prune_zero_adjoints: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self { capacity: 0, prune_zero_adjoints: false }
    }
}

impl TraceConfig {
    /// Default options with a pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, ..Self::default() }
    }
}

/// The recording seam: append a node, get its id back.
///
/// Implementations must hand out ids `1, 2, 3, …` in append order and never
/// modify a node once appended.
pub trait Recorder<T> {
    /// Append `node` and return its id.
    fn record(&self, node: Node<T>) -> NodeId;

    /// Number of recorded nodes.
    fn len(&self) -> usize;

    /// Whether nothing has been recorded.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` over the recorded nodes (node `i` sits at index `i - 1`).
    fn with_nodes<U>(&self, f: impl FnOnce(&[Node<T>]) -> U) -> U;

    /// Options this recorder was built with.
    fn config(&self) -> TraceConfig;
}

#[inline]
fn push<T: Copy>(nodes: &mut Vec<Node<T>>, node: Node<T>) -> NodeId {
    let id = NodeId(nodes.len() + 1);
    debug_assert!(node.respects_order(id), "node {id} references a later node");
    nodes.push(node);
    id
}

/// Check the no-forward-reference invariant over a node list.
pub(crate) fn validate<T>(nodes: &[Node<T>]) -> Result<()> {
    for (i, node) in nodes.iter().enumerate() {
        let own = NodeId(i + 1);
        if node.parent1 >= own || node.parent2 >= own {
            return Err(Error::Validation(format!(
                "node {own} ({:?}) references {} / {}, which do not precede it",
                node.op, node.parent1, node.parent2
            )));
        }
    }
    Ok(())
}

// --- Single-threaded trace ---

/// Single-threaded append-only trace.
///
/// Tape values borrow the trace, so it cannot be cleared or dropped while any
/// of them is alive.
#[derive(Debug, Default)]
pub struct Trace<T> {
    nodes: RefCell<Vec<Node<T>>>,
    config: TraceConfig,
}

impl<T: Floating> Trace<T> {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::with_config(TraceConfig::default())
    }

    /// Create an empty trace pre-allocated for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(TraceConfig::with_capacity(capacity))
    }

    /// Create an empty trace with explicit options.
    pub fn with_config(config: TraceConfig) -> Self {
        Self { nodes: RefCell::new(Vec::with_capacity(config.capacity)), config }
    }

    /// Rebuild a trace from a node list, checking that no node references a
    /// node at or after itself.
    pub fn from_nodes(nodes: Vec<Node<T>>) -> Result<Self> {
        validate(&nodes)?;
        Ok(Self { nodes: RefCell::new(nodes), config: TraceConfig::default() })
    }

    /// Record an independent input.
    pub fn var(&self, x: T) -> Tape<'_, T> {
        Tape::var(self, x)
    }

    /// Record a constant. It gets a node slot, so its adjoint can be read,
    /// but nothing upstream of it exists.
    pub fn constant(&self, x: T) -> Tape<'_, T> {
        Tape::constant(self, x)
    }

    /// Copy of node `id`, or `None` for the sentinel / an out-of-range id.
    pub fn node(&self, id: NodeId) -> Option<Node<T>> {
        let i = id.index().checked_sub(1)?;
        self.nodes.borrow().get(i).copied()
    }

    /// Copy of every node, in id order.
    pub fn nodes(&self) -> Vec<Node<T>> {
        self.nodes.borrow().clone()
    }

    /// Forget every node. Needs `&mut self`, so no tape value can outlive it.
    pub fn clear(&mut self) {
        log::trace!("clearing trace of {} nodes", self.nodes.get_mut().len());
        self.nodes.get_mut().clear();
    }

    /// Backward pass from `output`, seeding its adjoint with `seed`.
    pub fn backward(&self, output: NodeId, seed: T) -> Result<Gradient<T>> {
        let gradient = backward(self.nodes.borrow().as_slice(), output, seed, &self.config)?;
        Ok(gradient.with_origin(recorder_addr(self)))
    }

    /// Serialize the node list as JSON.
    pub fn to_json(&self) -> Result<String>
    where
        T: Serialize,
    {
        Ok(serde_json::to_string(&*self.nodes.borrow())?)
    }

    /// Rebuild a trace from [`Trace::to_json`] output.
    pub fn from_json(s: &str) -> Result<Self>
    where
        T: DeserializeOwned,
    {
        Self::from_nodes(serde_json::from_str(s)?)
    }
}

impl<T: Floating> Recorder<T> for Trace<T> {
    #[inline]
    fn record(&self, node: Node<T>) -> NodeId {
        push(&mut self.nodes.borrow_mut(), node)
    }

    #[inline]
    fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    fn with_nodes<U>(&self, f: impl FnOnce(&[Node<T>]) -> U) -> U {
        f(self.nodes.borrow().as_slice())
    }

    fn config(&self) -> TraceConfig {
        self.config
    }
}

// --- Thread-safe trace ---

/// Append-only trace whose appends are serialized by a mutex.
///
/// Tape values over a `SyncTrace<T>` are `Send` when `T` is, so independent
/// sub-expressions can be built on several threads. The backward pass holds
/// the lock for its whole sweep, so it never overlaps an append.
#[derive(Debug, Default)]
pub struct SyncTrace<T> {
    nodes: Mutex<Vec<Node<T>>>,
    config: TraceConfig,
}

impl<T: Floating> SyncTrace<T> {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::with_config(TraceConfig::default())
    }

    /// Create an empty trace with explicit options.
    pub fn with_config(config: TraceConfig) -> Self {
        Self { nodes: Mutex::new(Vec::with_capacity(config.capacity)), config }
    }

    // A panicking appender cannot leave a half-written node behind, so a
    // poisoned lock still guards a valid list.
    fn lock(&self) -> MutexGuard<'_, Vec<Node<T>>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an independent input.
    pub fn var(&self, x: T) -> Tape<'_, T, Self> {
        Tape::var(self, x)
    }

    /// Record a constant.
    pub fn constant(&self, x: T) -> Tape<'_, T, Self> {
        Tape::constant(self, x)
    }

    /// Copy of every node, in id order.
    pub fn nodes(&self) -> Vec<Node<T>> {
        self.lock().clone()
    }

    /// Backward pass from `output`, seeding its adjoint with `seed`.
    pub fn backward(&self, output: NodeId, seed: T) -> Result<Gradient<T>> {
        let gradient = backward(self.lock().as_slice(), output, seed, &self.config)?;
        Ok(gradient.with_origin(recorder_addr(self)))
    }

    /// Move the nodes into a single-threaded [`Trace`].
    pub fn into_trace(self) -> Trace<T> {
        let nodes = self.nodes.into_inner().unwrap_or_else(PoisonError::into_inner);
        Trace { nodes: RefCell::new(nodes), config: self.config }
    }
}

impl<T: Floating> Recorder<T> for SyncTrace<T> {
    #[inline]
    fn record(&self, node: Node<T>) -> NodeId {
        push(&mut self.lock(), node)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn with_nodes<U>(&self, f: impl FnOnce(&[Node<T>]) -> U) -> U {
        f(self.lock().as_slice())
    }

    fn config(&self) -> TraceConfig {
        self.config
    }
}

/// Count the nodes with opcode `op`.
pub fn count_ops<T>(nodes: &[Node<T>], op: Op) -> usize {
    nodes.iter().filter(|n| n.op == op).count()
}
