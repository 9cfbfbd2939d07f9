//! Derived quantities this domain needs that `uom` does not name.
//!
//! The network solver relates mass flow to differences in *specific*
//! potential (J/kg), so its conductances and stiffnesses carry dimensions
//! that have no everyday name. They are defined here once, as `uom` type
//! aliases, so every crate agrees on them.

use uom::{
    si::{
        ISQ, Quantity, SI,
        f64::{TemperatureInterval, ThermodynamicTemperature},
        temperature_interval::kelvin as delta_kelvin,
        thermodynamic_temperature::kelvin as abs_kelvin,
    },
    typenum::{N1, N2, P1, P2, Z0},
};

/// Mass-flow conductance, kg·s/m² in SI.
///
/// Relates mass flow rate to a specific-potential difference:
/// `m_dot = G·Δφ` with `Δφ` in J/kg.
pub type FlowConductance = Quantity<ISQ<N2, P1, P1, Z0, Z0, Z0, Z0>, SI<f64>, f64>;

/// Potential stiffness, (J/kg)/m³ in SI.
///
/// How sharply a container's driving potential rises per unit of volume
/// pushed into it. Nearly-full and hydraulically locked containers are
/// stiff; a large ullage is soft.
pub type PotentialStiffness = Quantity<ISQ<N1, Z0, N2, Z0, Z0, Z0, Z0>, SI<f64>, f64>;

/// Specific gas constant, J/kg·K in SI.
pub type SpecificGasConstant = Quantity<ISQ<P2, Z0, N2, Z0, N1, Z0, Z0>, SI<f64>, f64>;

/// Computes the signed difference `to - from` between two temperatures.
///
/// A `TemperatureInterval` is a distinct quantity from a
/// `ThermodynamicTemperature` in `uom`; this helper is the unit-safe way to
/// subtract absolute temperatures.
#[inline]
#[must_use]
pub fn temperature_difference(
    from: ThermodynamicTemperature,
    to: ThermodynamicTemperature,
) -> TemperatureInterval {
    TemperatureInterval::new::<delta_kelvin>(to.get::<abs_kelvin>() - from.get::<abs_kelvin>())
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::{
        f64::{AvailableEnergy, MassRate, Volume},
        available_energy::joule_per_kilogram,
        mass_rate::kilogram_per_second,
        volume::cubic_meter,
    };

    #[test]
    fn conductance_times_potential_is_mass_rate() {
        let flow = MassRate::new::<kilogram_per_second>(3.0);
        let drop = AvailableEnergy::new::<joule_per_kilogram>(1.5);

        let conductance: FlowConductance = flow / drop;
        let recovered: MassRate = conductance * drop;

        assert_relative_eq!(recovered.get::<kilogram_per_second>(), 3.0);
    }

    #[test]
    fn stiffness_times_volume_is_potential() {
        let potential = AvailableEnergy::new::<joule_per_kilogram>(9.81);
        let volume = Volume::new::<cubic_meter>(0.5);

        let stiffness: PotentialStiffness = potential / volume;
        let recovered: AvailableEnergy = stiffness * volume;

        assert_relative_eq!(recovered.get::<joule_per_kilogram>(), 9.81);
    }

    #[test]
    fn temperature_difference_is_signed() {
        let from = ThermodynamicTemperature::new::<abs_kelvin>(300.0);
        let to = ThermodynamicTemperature::new::<abs_kelvin>(290.0);

        let delta = temperature_difference(from, to);
        assert_relative_eq!(delta.get::<delta_kelvin>(), -10.0);
    }
}
