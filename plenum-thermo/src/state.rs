use uom::{
    ConstZero,
    si::f64::{
        AvailableEnergy, DynamicViscosity, MassDensity, Pressure, ThermodynamicTemperature,
        Velocity,
    },
};

use crate::SubstanceId;

/// The fluid conditions at a sampled point.
///
/// `potential` is the *driving* potential of the point — for a submerged
/// point the free-surface potential, for a gas-filled region the point's own
/// geometric potential plus a pressure-derived term. It is the generalized
/// head that moves fluid through the network: flow runs from high to low
/// `potential`.
///
/// The transport fields (`density`, `viscosity`, `speed_of_sound`) describe
/// the phase resident at the point and feed the conductance correlations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidState {
    pub pressure: Pressure,
    pub temperature: ThermodynamicTemperature,
    /// Bulk velocity magnitude at the sample point.
    pub velocity: Velocity,
    /// Driving potential, J/kg.
    pub potential: AvailableEnergy,
    pub density: MassDensity,
    pub viscosity: DynamicViscosity,
    pub speed_of_sound: Velocity,
    /// The condensed substance resident at the point, or `None` in a gas
    /// region or vacuum.
    pub substance: Option<SubstanceId>,
}

impl FluidState {
    /// The state of empty space: zero pressure and density, with the given
    /// geometric potential and bulk temperature.
    ///
    /// Sampling an empty container yields exactly this.
    #[must_use]
    pub fn vacuum(potential: AvailableEnergy, temperature: ThermodynamicTemperature) -> Self {
        Self {
            pressure: Pressure::ZERO,
            temperature,
            velocity: Velocity::ZERO,
            potential,
            density: MassDensity::ZERO,
            viscosity: DynamicViscosity::ZERO,
            speed_of_sound: Velocity::ZERO,
            substance: None,
        }
    }

    /// Returns a copy with a different driving potential.
    #[must_use]
    pub fn with_potential(self, potential: AvailableEnergy) -> Self {
        Self { potential, ..self }
    }

    /// Returns a copy with a different pressure.
    #[must_use]
    pub fn with_pressure(self, pressure: Pressure) -> Self {
        Self { pressure, ..self }
    }
}
