//! # hl-ad
//!
//! Automatic differentiation over the hl-core capability contracts.
//!
//! Provides:
//! - **Forward-mode AD** via [`dual::Dual`] numbers (efficient for few inputs),
//!   with a generic derivative channel so duals nest for higher derivatives
//! - **Reverse-mode AD** via [`tape::Tape`] values recorded on an append-only
//!   [`trace::Trace`] (efficient for many inputs)
//! - A single [`backward::backward`] sweep producing every adjoint at once
//!
//! Every AD type implements [`Floating`], so code written against the
//! contracts runs unchanged on `f64`, `Dual`, or `Tape`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backward;
pub mod dual;
pub mod node;
pub mod tape;
pub mod trace;

pub use backward::{Gradient, backward};
pub use dual::Dual;
pub use hl_core::{Absolute, Additive, Field, Floating, Ring, Tangent, Trigonometric};
pub use node::{Node, NodeId, Op};
pub use tape::Tape;
pub use trace::{Recorder, SyncTrace, Trace, TraceConfig, count_ops};
