//! Reverse sweep over a trace.
//!
//! Every node stores the local partials of its value with respect to its
//! parents, and no node references a node at or after itself. Visiting ids
//! in descending order therefore reaches each node only after every node that
//! consumes it, and one sweep accumulates all adjoints:
//!
//! ```text
//! adjoint[output] = seed
//! for id in output..=1:
//!     adjoint[parent1] += adjoint[id] * partial1
//!     adjoint[parent2] += adjoint[id] * partial2
//! ```
//!
//! Sentinel parents are skipped, so `adjoint[0]` stays zero.

use crate::node::{Node, NodeId, Op};
use crate::tape::Tape;
use crate::trace::TraceConfig;
use hl_core::{Error, Floating, Result};

/// Adjoints produced by one backward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient<T> {
    /// `adjoints[i]` is `∂output/∂node_i`; index 0 is the (zero) sentinel slot.
    adjoints: Vec<T>,
    /// Ids of every `Var` node, in creation order.
    variables: Vec<NodeId>,
    output: NodeId,
    /// Address of the recorder the nodes came from, when known.
    origin: Option<usize>,
}

/// Identity of a recorder, compared by address.
#[inline]
pub(crate) fn recorder_addr<R>(trace: &R) -> usize {
    (trace as *const R).cast::<()>() as usize
}

impl<T: Copy> Gradient<T> {
    /// `∂output/∂x`.
    ///
    /// Detached values (id 0) read as zero. The trace `x` was recorded on is
    /// not checked: a value from another trace reads whatever adjoint sits at
    /// its id, or zero past the end. Use [`Gradient::try_wrt`] to reject it.
    #[inline]
    pub fn wrt<R>(&self, x: &Tape<'_, T, R>) -> T {
        self.adjoints.get(x.id().index()).copied().unwrap_or(self.adjoints[0])
    }

    /// `∂output/∂x`, checking that `x` belongs to the trace this gradient was
    /// computed from.
    ///
    /// Errors with [`Error::Validation`] for a value recorded on a different
    /// trace, and [`Error::UnknownNode`] for an id beyond this one. A gradient
    /// built by the free [`backward`] function has no recorded origin, so only
    /// the id range is checked.
    pub fn try_wrt<R>(&self, x: &Tape<'_, T, R>) -> Result<T> {
        if self.origin.is_some_and(|origin| origin != recorder_addr(x.trace())) {
            return Err(Error::Validation(format!("{} was recorded on a different trace", x.id())));
        }
        self.adjoint(x.id())
            .ok_or(Error::UnknownNode { id: x.id().index(), len: self.adjoints.len() - 1 })
    }

    /// Adjoint of node `id`, or `None` if `id` is beyond the trace.
    #[inline]
    pub fn adjoint(&self, id: NodeId) -> Option<T> {
        self.adjoints.get(id.index()).copied()
    }

    /// `(id, ∂output/∂var)` for every `Var` node, in creation order.
    pub fn variables(&self) -> impl Iterator<Item = (NodeId, T)> + '_ {
        self.variables.iter().map(|&id| (id, self.adjoints[id.index()]))
    }

    /// The node the sweep started from.
    pub fn output(&self) -> NodeId {
        self.output
    }

    /// Every adjoint, indexed by node id (slot 0 is the sentinel).
    pub fn as_slice(&self) -> &[T] {
        &self.adjoints
    }

    pub(crate) fn with_origin(mut self, origin: usize) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// Run the backward pass over `nodes` from `output`, seeding its adjoint with
/// `seed`.
///
/// Errors if `output` is the sentinel or beyond the trace, or if a visited
/// node references a node at or after itself.
pub fn backward<T: Floating>(
    nodes: &[Node<T>],
    output: NodeId,
    seed: T,
    config: &TraceConfig,
) -> Result<Gradient<T>> {
    let len = nodes.len();
    let out = output.index();
    if output.is_sentinel() || out > len {
        return Err(Error::UnknownNode { id: out, len });
    }
    log::debug!("backward pass from {output} over {len} nodes");

    let zero = seed.zero();
    let mut adjoints = vec![zero; len + 1];
    adjoints[out] = seed;

    let mut visited = 0usize;
    for id in (1..=out).rev() {
        let adj = adjoints[id];
        if config.prune_zero_adjoints && adj.value() == 0.0 {
            continue;
        }
        let node = &nodes[id - 1];
        if !node.respects_order(NodeId(id)) {
            return Err(Error::Validation(format!(
                "node #{id} ({:?}) references {} / {}, which do not precede it",
                node.op, node.parent1, node.parent2
            )));
        }
        if !node.parent1.is_sentinel() {
            let p = node.parent1.index();
            adjoints[p] = adjoints[p] + adj * node.partial1;
        }
        if !node.parent2.is_sentinel() {
            let p = node.parent2.index();
            adjoints[p] = adjoints[p] + adj * node.partial2;
        }
        visited += 1;
    }

    if adjoints.iter().any(|a| !a.value().is_finite()) {
        log::warn!("backward pass from {output} produced non-finite adjoints");
    }
    log::debug!("backward pass visited {visited} of {out} nodes");

    let variables = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.op == Op::Var)
        .map(|(i, _)| NodeId(i + 1))
        .collect();

    Ok(Gradient { adjoints, variables, output, origin: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Trace;
    use approx::assert_relative_eq;
    use hl_core::{Field, Ring, Trigonometric};

    fn leaf() -> Node<f64> {
        Node::leaf(Op::Var, 0.0)
    }

    #[test]
    fn test_hand_built_nodes() {
        // f = x * y + sin(x) at x = 2, y = 3
        let (x, y) = (2.0_f64, 3.0_f64);
        let nodes = vec![
            leaf(),
            leaf(),
            Node::binary(NodeId(1), y, NodeId(2), x, Op::Mul),
            Node::unary(NodeId(1), x.cos(), 0.0, Op::Sin),
            Node::binary(NodeId(3), 1.0, NodeId(4), 1.0, Op::Add),
        ];
        let g = backward(&nodes, NodeId(5), 1.0, &TraceConfig::default()).unwrap();
        assert_relative_eq!(g.adjoint(NodeId(1)).unwrap(), 3.0 + 2.0_f64.cos(), epsilon = 1e-12);
        assert_relative_eq!(g.adjoint(NodeId(2)).unwrap(), 2.0, epsilon = 1e-12);
        assert_eq!(g.adjoint(NodeId::SENTINEL), Some(0.0));
        assert_eq!(g.adjoint(NodeId(6)), None);
        assert_eq!(g.output(), NodeId(5));
        assert_eq!(g.as_slice().len(), 6);

        let vars: Vec<_> = g.variables().map(|(id, _)| id).collect();
        assert_eq!(vars, vec![NodeId(1), NodeId(2)]);
    }

    #[test]
    fn test_unknown_output() {
        let nodes = vec![leaf()];
        let cfg = TraceConfig::default();
        assert!(matches!(
            backward(&nodes, NodeId::SENTINEL, 1.0, &cfg),
            Err(Error::UnknownNode { id: 0, len: 1 })
        ));
        assert!(matches!(
            backward(&nodes, NodeId(2), 1.0, &cfg),
            Err(Error::UnknownNode { id: 2, len: 1 })
        ));
    }

    #[test]
    fn test_forward_reference_is_rejected() {
        let nodes = vec![leaf(), Node::unary(NodeId(2), 1.0, 0.0, Op::Neg)];
        let err = backward(&nodes, NodeId(2), 1.0, &TraceConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_nodes_after_output_are_ignored() {
        let trace = Trace::new();
        let x = trace.var(3.0);
        let y = x * x;
        let _later = y.exp();
        let g = y.backward().unwrap();
        assert_relative_eq!(g.wrt(&x), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_seed_scales_linearly() {
        let trace = Trace::new();
        let x = trace.var(0.7);
        let y = trace.var(-1.3);
        let f = (x * y).exp() + x.recip();
        let g1 = f.backward().unwrap();
        let g5 = f.backward_with_seed(5.0).unwrap();
        for ((_, a), (_, b)) in g1.variables().zip(g5.variables()) {
            assert_relative_eq!(b, 5.0 * a, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_try_wrt_rejects_foreign_values() {
        let first = Trace::new();
        let second = Trace::new();
        let x = first.var(2.0);
        let y = first.var(5.0);
        let u = second.var(7.0);
        let g = (x * y).backward().unwrap();

        assert_relative_eq!(g.try_wrt(&x).unwrap(), 5.0, epsilon = 1e-12);
        // `u` shares id #1 with `x`, so the unchecked read aliases it
        assert_eq!(u.id(), x.id());
        assert_relative_eq!(g.wrt(&u), 5.0, epsilon = 1e-12);
        assert!(matches!(g.try_wrt(&u), Err(Error::Validation(_))));

        // detached values on the same trace are fine
        assert_eq!(g.try_wrt(&x.one()).unwrap(), 0.0);

        // gradients computed through the trace carry its identity too
        let h = first.backward(x.id(), 1.0).unwrap();
        assert!(h.try_wrt(&x).is_ok());
        assert!(h.try_wrt(&u).is_err());
    }

    #[test]
    fn test_try_wrt_without_origin_checks_range() {
        let nodes = vec![leaf()];
        let g = backward(&nodes, NodeId(1), 1.0, &TraceConfig::default()).unwrap();
        let trace = Trace::new();
        let a = trace.var(1.0);
        let b = trace.var(1.0);
        assert_eq!(g.try_wrt(&a).unwrap(), 1.0);
        assert!(matches!(g.try_wrt(&b), Err(Error::UnknownNode { id: 2, len: 1 })));
    }

    #[test]
    fn test_nan_propagates_without_pruning() {
        // d/dx [0 * ln(x)] at x = -1: partial of ln is finite (-1), but the
        // product with ln(-1) = NaN poisons the adjoint of the constant side.
        let trace = Trace::new();
        let x = trace.var(-1.0_f64);
        let zero = trace.constant(0.0);
        let f = zero * x.ln();
        let g = f.backward().unwrap();
        assert!(g.wrt(&zero).is_nan());
        assert!(f.magnitude().is_nan());
    }

    #[test]
    fn test_pruning_skips_zero_adjoints() {
        // The final `* 0` cuts the graph; without pruning, the `0 * NaN`
        // products below it still reach `c`.
        fn dead_branch(trace: &Trace<f64>) -> f64 {
            let c = trace.var(0.0);
            let d = c.one() / c;
            let f = (d * c.zero()).sin() * c.zero();
            f.backward().unwrap().wrt(&c)
        }

        let pruned = Trace::with_config(TraceConfig { prune_zero_adjoints: true, ..Default::default() });
        assert_eq!(dead_branch(&pruned), 0.0);
        assert!(dead_branch(&Trace::new()).is_nan());
    }
}
