//! Flow network assembly and the per-tick equilibrium solver.
//!
//! External participants register endpoints and pipes through a
//! [`NetworkBuilder`] during a fixed-point build phase; the frozen
//! [`Network`] then advances toward hydraulic equilibrium one bounded
//! [`Network::step`] at a time, transporting substances along solved pipe
//! flows and handing results back through each participant's apply
//! callback.
//!
//! The solver's stability heuristics — regime-correct conductance, learned
//! per-pipe relaxation with oscillation detection, and proactive
//! stiffness damping — live in the private solver module and surface only
//! as [`SolverConfig`] knobs.

mod builder;
mod config;
mod error;
mod event;
mod handle;
mod network;
mod pipe;
mod solver;

pub use builder::{BuildOutcome, NetworkBuilder, Participant, build_network};
pub use config::SolverConfig;
pub use error::{BuildError, StepError};
pub use event::{IterationEvent, StepObserver};
pub use handle::{EndpointId, FlowRef, OwnerId, PipeId};
pub use network::{Network, NetworkStatus, StepReport};
pub use pipe::{Pipe, PipePort, PipeSpec};
