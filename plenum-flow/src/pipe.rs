use std::f64::consts::PI;

use glam::DVec3;
use plenum_core::{
    constraint::{Constrained, UnitIntervalLeftOpen},
    units::FlowConductance,
};
use uom::{
    ConstZero,
    si::f64::{Area, AvailableEnergy, Length, MassRate},
};

use crate::handle::EndpointId;

/// One end of a pipe: the endpoint it connects to, the anchor position in
/// that endpoint's local frame, and the orifice area presented to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipePort {
    pub endpoint: EndpointId,
    pub anchor: DVec3,
    pub orifice_area: Area,
}

impl PipePort {
    #[must_use]
    pub fn new(endpoint: EndpointId, anchor: DVec3, orifice_area: Area) -> Self {
        Self {
            endpoint,
            anchor,
            orifice_area,
        }
    }
}

/// Geometry for registering a pipe with the network builder.
///
/// Positive flow runs `from → to`; the solver may drive it negative when
/// the potential gradient reverses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipeSpec {
    pub from: PipePort,
    pub to: PipePort,
    pub length: Length,
    pub diameter: Length,
    /// Pump/valve contribution added to the driving potential difference.
    pub head_added: AvailableEnergy,
}

impl PipeSpec {
    #[must_use]
    pub fn new(from: PipePort, to: PipePort, length: Length, diameter: Length) -> Self {
        Self {
            from,
            to,
            length,
            diameter,
            head_added: AvailableEnergy::ZERO,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if !(self.length.value > 0.0) {
            return Err("pipe length must be positive");
        }
        if !(self.diameter.value > 0.0) {
            return Err("pipe diameter must be positive");
        }
        if !self.head_added.value.is_finite() {
            return Err("head_added must be finite");
        }
        Ok(())
    }
}

/// A conduit between two endpoints, carrying the per-pipe solver memory:
/// last-step flow and conductance, and the learned relaxation factor the
/// stability heuristics decay when the pipe oscillates.
#[derive(Debug, Clone)]
pub struct Pipe {
    pub(crate) from: PipePort,
    pub(crate) to: PipePort,
    length: Length,
    diameter: Length,
    area: Area,
    head_added: AvailableEnergy,
    pub(crate) flow_rate: MassRate,
    pub(crate) conductance: FlowConductance,
    pub(crate) relaxation: Constrained<f64, UnitIntervalLeftOpen>,
}

impl Pipe {
    pub(crate) fn new(spec: PipeSpec) -> Self {
        Self {
            from: spec.from,
            to: spec.to,
            length: spec.length,
            diameter: spec.diameter,
            area: spec.diameter * spec.diameter * (PI / 4.0),
            head_added: spec.head_added,
            flow_rate: MassRate::ZERO,
            conductance: FlowConductance::ZERO,
            relaxation: UnitIntervalLeftOpen::one(),
        }
    }

    #[must_use]
    pub fn from_port(&self) -> PipePort {
        self.from
    }

    #[must_use]
    pub fn to_port(&self) -> PipePort {
        self.to
    }

    #[must_use]
    pub fn length(&self) -> Length {
        self.length
    }

    #[must_use]
    pub fn diameter(&self) -> Length {
        self.diameter
    }

    /// Internal flow area, π/4·d².
    #[must_use]
    pub fn flow_area(&self) -> Area {
        self.area
    }

    #[must_use]
    pub fn head_added(&self) -> AvailableEnergy {
        self.head_added
    }

    /// Sets the pump/valve head contribution. Takes effect at the next
    /// solver step; never mutated by the solver itself.
    pub fn set_head_added(&mut self, head: AvailableEnergy) {
        self.head_added = head;
    }

    /// Mass flow transported last step, signed `from → to`.
    #[must_use]
    pub fn flow_rate(&self) -> MassRate {
        self.flow_rate
    }

    /// Conductance used last step.
    #[must_use]
    pub fn conductance(&self) -> FlowConductance {
        self.conductance
    }

    /// The learned relaxation factor, in `(0, 1]`.
    #[must_use]
    pub fn relaxation_factor(&self) -> f64 {
        self.relaxation.get()
    }
}
