//! # hl-core
//!
//! Capability contracts and leaf scalars for the hl-algebra AD engine.
//!
//! Provides:
//! - The capability traits ([`Additive`], [`Ring`], [`Field`], [`Absolute`],
//!   [`Trigonometric`], [`Floating`]) that every scalar-like type implements
//! - [`Tangent`], the bound a derivative channel must satisfy
//! - Leaf implementations for `f32` and `f64` (see [`float`])
//! - The crate-wide [`Error`] type

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod float;
pub mod traits;

pub use error::{Error, Result};
pub use float::DEG_TO_RAD;
pub use traits::{Absolute, Additive, Field, Floating, Ring, Tangent, Trigonometric};
