//! The capability seam between flow endpoints and the network solver.
//!
//! Anything that produces or consumes fluid — a tank, an engine feed, a
//! test boundary — implements [`FlowEndpoint`]. The solver samples endpoint
//! states, records transported substances into the endpoints' inflow and
//! outflow accumulators, and asks every endpoint to commit them once per
//! step. The solver never names a concrete endpoint type.

use std::{cell::RefCell, rc::Rc};

use glam::DVec3;
use uom::{
    ConstZero,
    si::{
        f64::{Area, MassRate, Time},
        ratio::ratio,
    },
};

use plenum_core::units::PotentialStiffness;

use crate::{FluidState, Mixture};

/// The capability set a producer/consumer exposes to the flow network.
///
/// Each endpoint owns its inflow/outflow accumulator mixtures; the solver
/// mutates them only through [`Self::add_inflow`] and [`Self::add_outflow`]
/// and they are drained exactly once per step by [`Self::apply_flows`].
/// Methods take `&mut self` because implementations may refresh derived
/// caches lazily on access.
pub trait FlowEndpoint {
    /// Samples the fluid state at a position in the endpoint's local frame.
    ///
    /// `orifice_area` is the area of the opening doing the sampling;
    /// implementations may use it for velocity terms or ignore it.
    fn sample(&mut self, position: DVec3, orifice_area: Area) -> FluidState;

    /// Returns the substances available for extraction at `position`, up to
    /// `|flow_rate|·dt` of mass, net of anything already promised through
    /// the outflow accumulator. May return less than requested; the caller
    /// transports exactly what it receives.
    fn sample_substances(&mut self, position: DVec3, flow_rate: MassRate, dt: Time) -> Mixture;

    /// Records substances delivered to this endpoint, pending
    /// [`Self::apply_flows`].
    fn add_inflow(&mut self, mixture: &Mixture);

    /// Records substances drawn from this endpoint, pending
    /// [`Self::apply_flows`].
    fn add_outflow(&mut self, mixture: &Mixture);

    /// Commits the accumulated inflow/outflow into the endpoint's ledger.
    /// Called exactly once per solver step, after all pipes have
    /// transported.
    fn apply_flows(&mut self, dt: Time);

    /// ∂potential/∂volume: how sharply this endpoint's driving potential
    /// rises per unit of volume pushed into it. Zero for endpoints that
    /// absorb volume without pressure response.
    fn stiffness(&mut self) -> PotentialStiffness {
        PotentialStiffness::ZERO
    }
}

/// An unbounded source/sink pinned at a fixed fluid state.
///
/// Supplies any requested mass at a fixed composition and swallows anything
/// delivered to it. Stands in for external boundaries — a sea, a supply
/// main, an engine that consumes whatever arrives — and for scenario tests.
#[derive(Debug, Clone)]
pub struct Reservoir {
    state: FluidState,
    composition: Mixture,
    inflow: Mixture,
    outflow: Mixture,
}

impl Reservoir {
    /// Creates a reservoir at `state` supplying `composition` (relative
    /// proportions; the magnitude is irrelevant).
    #[must_use]
    pub fn new(state: FluidState, composition: Mixture) -> Self {
        Self {
            state,
            composition,
            inflow: Mixture::new(),
            outflow: Mixture::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> FluidState {
        self.state
    }

    pub fn set_state(&mut self, state: FluidState) {
        self.state = state;
    }

    /// Substances delivered since the last [`FlowEndpoint::apply_flows`].
    #[must_use]
    pub fn received(&self) -> &Mixture {
        &self.inflow
    }

    /// Substances extracted since the last [`FlowEndpoint::apply_flows`].
    #[must_use]
    pub fn supplied(&self) -> &Mixture {
        &self.outflow
    }
}

impl FlowEndpoint for Reservoir {
    fn sample(&mut self, _position: DVec3, _orifice_area: Area) -> FluidState {
        self.state
    }

    fn sample_substances(&mut self, _position: DVec3, flow_rate: MassRate, dt: Time) -> Mixture {
        let requested = flow_rate.abs() * dt;
        let total = self.composition.total_mass();
        if requested.value <= 0.0 || total.value <= 0.0 {
            return Mixture::new();
        }
        self.composition.scaled((requested / total).get::<ratio>())
    }

    fn add_inflow(&mut self, mixture: &Mixture) {
        self.inflow.add_all(mixture);
    }

    fn add_outflow(&mut self, mixture: &Mixture) {
        self.outflow.add_all(mixture);
    }

    fn apply_flows(&mut self, _dt: Time) {
        // Unbounded: deliveries vanish, extractions never deplete.
        self.inflow.clear();
        self.outflow.clear();
    }
}

/// A shared handle to an endpoint the host wants to keep inspecting.
///
/// The network owns one clone as its registered endpoint; the host keeps
/// another to read state between ticks. Single-threaded by construction
/// (`Rc<RefCell>`): the network model never shares endpoints across
/// threads, and borrows never overlap because a step runs to completion
/// before the host looks again.
pub struct SharedEndpoint<T: FlowEndpoint> {
    inner: Rc<RefCell<T>>,
}

impl<T: FlowEndpoint> SharedEndpoint<T> {
    #[must_use]
    pub fn new(endpoint: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(endpoint)),
        }
    }

    /// Borrows the endpoint immutably.
    ///
    /// # Panics
    ///
    /// Panics if called while the network is mid-sample, which the
    /// synchronous tick model never does.
    #[must_use]
    pub fn borrow(&self) -> std::cell::Ref<'_, T> {
        self.inner.borrow()
    }

    /// Borrows the endpoint mutably.
    ///
    /// # Panics
    ///
    /// Panics on overlapping borrows; see [`Self::borrow`].
    #[must_use]
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.inner.borrow_mut()
    }
}

impl<T: FlowEndpoint> Clone for SharedEndpoint<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: FlowEndpoint> FlowEndpoint for SharedEndpoint<T> {
    fn sample(&mut self, position: DVec3, orifice_area: Area) -> FluidState {
        self.inner.borrow_mut().sample(position, orifice_area)
    }

    fn sample_substances(&mut self, position: DVec3, flow_rate: MassRate, dt: Time) -> Mixture {
        self.inner
            .borrow_mut()
            .sample_substances(position, flow_rate, dt)
    }

    fn add_inflow(&mut self, mixture: &Mixture) {
        self.inner.borrow_mut().add_inflow(mixture);
    }

    fn add_outflow(&mut self, mixture: &Mixture) {
        self.inner.borrow_mut().add_outflow(mixture);
    }

    fn apply_flows(&mut self, dt: Time) {
        self.inner.borrow_mut().apply_flows(dt);
    }

    fn stiffness(&mut self) -> PotentialStiffness {
        self.inner.borrow_mut().stiffness()
    }
}
