//! Container geometry and the stratified-fluid cache.
//!
//! A [`Container`] owns a tetrahedral mesh of its interior, a body-force
//! field, and a substance ledger. From these it derives two cached
//! structures:
//!
//! - a [`SliceStack`]: the container volume binned into potential intervals
//!   (rebuilt when geometry or acceleration changes), and
//! - a [`Stratification`]: the assignment of each condensed substance to a
//!   contiguous potential range, with the gas ullage above (rebuilt when
//!   contents change).
//!
//! Sampling a point answers its pressure, resident phase, and the driving
//! potential the network solver compares across pipes.

mod container;
mod slices;
mod strata;

pub use container::{Container, INLET_SNAP_DISTANCE, NODE_MERGE_DISTANCE};
pub use slices::{Slice, SliceStack};
pub use strata::{FluidLayer, Stratification};
