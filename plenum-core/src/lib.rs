//! Core primitives shared across the Plenum fluid-network simulation.
//!
//! This crate carries no simulation logic of its own. It provides the
//! building blocks the other Plenum crates agree on:
//!
//! - [`constraint`]: zero-cost wrappers that enforce numeric invariants
//!   (non-negative, strictly positive, left-open unit interval) at
//!   construction time.
//! - [`units`]: `uom` quantity aliases for the derived quantities this
//!   domain needs that `uom` does not name, such as mass-flow conductance.
//! - [`BodyForceField`]: the combined linear and rotational fictitious-force
//!   field whose scalar potential orders fluid inside a container.

pub mod constraint;
pub mod units;

mod field;

pub use field::BodyForceField;
