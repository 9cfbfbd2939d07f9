//! Substance property modeling and the pure thermodynamic equations of the
//! Plenum fluid network.
//!
//! Substances are plain property records interned into a
//! [`SubstanceRegistry`]; tank contents and pipe transfers are sparse
//! [`Mixture`] ledgers keyed by [`SubstanceId`]. The equation modules are
//! stateless:
//!
//! - [`conductance`]: pipe mass-flow conductance across the laminar,
//!   turbulent, and choked regimes.
//! - [`equilibrium`]: ullage pressure and vapor–liquid flash relaxation.
//!
//! [`capability`] defines the [`capability::FlowEndpoint`] seam through
//! which containers, producers, and consumers plug into the network solver.

pub mod capability;
pub mod conductance;
pub mod equilibrium;

mod error;
mod mixture;
mod registry;
mod state;
mod substance;

pub use error::RegistryError;
pub use mixture::Mixture;
pub use registry::SubstanceRegistry;
pub use state::FluidState;
pub use substance::{Phase, Substance, SubstanceId, VaporCurve};
