//! Vapor–liquid equilibrium: ullage pressure and flash relaxation.
//!
//! Both entry points are pure functions over a [`Mixture`] and a
//! [`SubstanceRegistry`]; the registry is passed by reference and carries
//! the condensed → gas phase partnerships.

use uom::{
    ConstZero,
    si::{
        f64::{Mass, Pressure, ThermodynamicTemperature, Volume},
        ratio::ratio,
    },
};

use crate::{Mixture, Phase, SubstanceRegistry};

/// Tuning for the [`flash`] relaxation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlashConfig {
    /// Fraction of the equilibrium mass gap transferred per call.
    pub relaxation: f64,
    /// Relative pressure gap (fraction of the vapor pressure) below which no
    /// transfer happens. Prevents evaporate/condense chatter at equilibrium.
    pub dead_zone: f64,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            relaxation: 0.1,
            dead_zone: 0.01,
        }
    }
}

impl FlashConfig {
    /// Validates that both knobs are finite and within their ranges.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.relaxation.is_finite() || self.relaxation <= 0.0 || self.relaxation > 1.0 {
            return Err("relaxation must lie in (0, 1]");
        }
        if !self.dead_zone.is_finite() || self.dead_zone < 0.0 {
            return Err("dead_zone must be finite and non-negative");
        }
        Ok(())
    }
}

/// Total condensed-phase volume of a mixture at its current densities.
#[must_use]
pub fn condensed_volume(contents: &Mixture, registry: &SubstanceRegistry) -> Volume {
    contents
        .iter()
        .fold(Volume::ZERO, |acc, (id, mass)| {
            let substance = registry.get(id);
            if substance.phase == Phase::Condensed && substance.reference_density.value > 0.0 {
                acc + mass / substance.reference_density
            } else {
                acc
            }
        })
}

/// Dalton-law gas pressure over an ullage volume: `Σ mᵢ·Rᵢ·T / V`.
///
/// Returns zero for a non-positive ullage (the hydraulic-lock branch owns
/// that case).
#[must_use]
pub fn gas_pressure(
    contents: &Mixture,
    registry: &SubstanceRegistry,
    temperature: ThermodynamicTemperature,
    ullage: Volume,
) -> Pressure {
    if ullage.value <= 0.0 {
        return Pressure::ZERO;
    }
    contents.iter().fold(Pressure::ZERO, |acc, (id, mass)| {
        let substance = registry.get(id);
        if substance.is_gas() {
            acc + mass * substance.gas_constant * temperature / ullage
        } else {
            acc
        }
    })
}

/// Container pressure from contents alone.
///
/// Ideal-gas pressure over the ullage volume while the condensed phase
/// fits; once condensed volume exceeds the container volume the pressure is
/// the bulk-modulus compression strain instead:
///
/// ```text
/// P = K̄ · (V_condensed − V_container) / V_container
/// ```
///
/// with `K̄` the mass-weighted bulk modulus of the condensed contents.
/// Never NaN, never negative.
#[must_use]
pub fn pressure_only(
    contents: &Mixture,
    registry: &SubstanceRegistry,
    temperature: ThermodynamicTemperature,
    container_volume: Volume,
) -> Pressure {
    if container_volume.value <= 0.0 {
        return Pressure::ZERO;
    }

    let condensed = condensed_volume(contents, registry);
    if condensed >= container_volume {
        let strain = ((condensed - container_volume) / container_volume).get::<ratio>();
        return mean_bulk_modulus(contents, registry) * strain;
    }

    gas_pressure(contents, registry, temperature, container_volume - condensed)
}

/// Mass-weighted bulk modulus of the condensed contents. Zero when nothing
/// condensed is present.
#[must_use]
pub fn mean_bulk_modulus(contents: &Mixture, registry: &SubstanceRegistry) -> Pressure {
    let mut weighted = Pressure::ZERO;
    let mut total = Mass::ZERO;
    for (id, mass) in contents.iter() {
        let substance = registry.get(id);
        if substance.phase == Phase::Condensed {
            weighted += substance.bulk_modulus * (mass.value);
            total += mass;
        }
    }
    if total.value <= 0.0 {
        return Pressure::ZERO;
    }
    weighted / total.value
}

/// One vapor–liquid flash relaxation pass.
///
/// Each condensed substance with a registered gas partner moves mass toward
/// its partner in proportion to the gap between its mole-fraction-weighted
/// vapor pressure and the partner's current partial pressure, subject to the
/// config's relaxation factor and dead-zone. Latent heat absorbed or
/// released updates the bulk temperature, which is returned.
///
/// With no gas space (hydraulic lock) or degenerate temperature the contents
/// are left untouched.
#[must_use]
pub fn flash(
    contents: &mut Mixture,
    registry: &SubstanceRegistry,
    temperature: ThermodynamicTemperature,
    container_volume: Volume,
    config: &FlashConfig,
) -> ThermodynamicTemperature {
    if temperature.value <= 0.0 {
        return temperature;
    }
    let condensed = condensed_volume(contents, registry);
    if condensed >= container_volume || container_volume.value <= 0.0 {
        return temperature;
    }
    let ullage = container_volume - condensed;

    // Mole proxy for Raoult weighting: n ∝ m·R_specific.
    let molar_sum = contents.iter().fold(0.0, |acc, (id, mass)| {
        let substance = registry.get(id);
        if substance.phase == Phase::Condensed && substance.vapor.is_some() {
            acc + (mass * substance.gas_constant).value
        } else {
            acc
        }
    });
    if molar_sum <= 0.0 {
        return temperature;
    }

    // (condensed id, gas id, signed mass to evaporate, latent heat)
    let mut transfers = Vec::new();
    for (id, mass) in contents.iter() {
        let substance = registry.get(id);
        let (Phase::Condensed, Some(curve), Some(gas_id)) =
            (substance.phase, substance.vapor, registry.gas_partner(id))
        else {
            continue;
        };
        let gas = registry.get(gas_id);

        let mole_fraction = (mass * substance.gas_constant).value / molar_sum;
        let vapor_pressure = mole_fraction * curve.vapor_pressure(temperature, gas.gas_constant);
        let partial_pressure =
            contents.mass_of(gas_id) * gas.gas_constant * temperature / ullage;

        let gap = vapor_pressure - partial_pressure;
        if gap.abs() < config.dead_zone * vapor_pressure.abs() {
            continue;
        }

        let rt = gas.gas_constant * temperature;
        if rt.value <= 0.0 {
            continue;
        }

        // Positive: evaporate (condensed → gas). Negative: condense.
        let mut delta: Mass = config.relaxation * (gap * ullage / rt);
        if delta.value > 0.0 {
            delta = delta.min(mass);
        } else {
            delta = -((-delta).min(contents.mass_of(gas_id)));
        }
        if delta.value != 0.0 {
            transfers.push((id, gas_id, delta, curve.latent_heat));
        }
    }

    if transfers.is_empty() {
        return temperature;
    }

    let heat_capacity = contents.iter().fold(
        uom::si::f64::HeatCapacity::ZERO,
        |acc, (id, mass)| acc + mass * registry.get(id).specific_heat,
    );

    let mut energy = uom::si::f64::Energy::ZERO;
    for (condensed_id, gas_id, delta, latent) in transfers {
        if delta.value > 0.0 {
            let moved = contents.remove(condensed_id, delta);
            contents.add(gas_id, moved);
            energy -= latent * moved;
        } else {
            let moved = contents.remove(gas_id, -delta);
            contents.add(condensed_id, moved);
            energy += latent * moved;
        }
    }

    if heat_capacity.value <= 0.0 {
        return temperature;
    }
    temperature + energy / heat_capacity
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::{
        available_energy::joule_per_kilogram,
        f64::{
            AvailableEnergy, DynamicViscosity, MassDensity, SpecificHeatCapacity,
            TemperatureInterval, Velocity,
        },
        mass::kilogram,
        mass_density::kilogram_per_cubic_meter,
        pressure::pascal,
        specific_heat_capacity::joule_per_kilogram_kelvin,
        temperature_interval::kelvin as delta_kelvin,
        thermodynamic_temperature::kelvin,
        volume::cubic_meter,
    };

    use crate::{Substance, SubstanceId, VaporCurve};
    use plenum_core::units::SpecificGasConstant;

    fn gas_constant(r: f64) -> SpecificGasConstant {
        AvailableEnergy::new::<joule_per_kilogram>(r)
            / TemperatureInterval::new::<delta_kelvin>(1.0)
    }

    fn water() -> Substance {
        Substance {
            name: "water".into(),
            phase: Phase::Condensed,
            gas_constant: gas_constant(461.5),
            reference_density: MassDensity::new::<kilogram_per_cubic_meter>(1000.0),
            dynamic_viscosity: DynamicViscosity::ZERO,
            specific_heat: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(4186.0),
            bulk_modulus: Pressure::new::<pascal>(2.2e9),
            speed_of_sound: Velocity::ZERO,
            vapor: Some(VaporCurve {
                reference_pressure: Pressure::new::<pascal>(101_325.0),
                reference_temperature: ThermodynamicTemperature::new::<kelvin>(373.15),
                latent_heat: AvailableEnergy::new::<joule_per_kilogram>(2.26e6),
            }),
        }
    }

    fn steam() -> Substance {
        Substance {
            name: "steam".into(),
            phase: Phase::Gas,
            gas_constant: gas_constant(461.5),
            reference_density: MassDensity::ZERO,
            dynamic_viscosity: DynamicViscosity::ZERO,
            specific_heat: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(1996.0),
            bulk_modulus: Pressure::ZERO,
            speed_of_sound: Velocity::ZERO,
            vapor: None,
        }
    }

    fn nitrogen() -> Substance {
        Substance {
            name: "nitrogen".into(),
            phase: Phase::Gas,
            gas_constant: gas_constant(296.8),
            reference_density: MassDensity::ZERO,
            dynamic_viscosity: DynamicViscosity::ZERO,
            specific_heat: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(1040.0),
            bulk_modulus: Pressure::ZERO,
            speed_of_sound: Velocity::ZERO,
            vapor: None,
        }
    }

    fn loaded_registry() -> (SubstanceRegistry, SubstanceId, SubstanceId, SubstanceId) {
        let mut registry = SubstanceRegistry::new();
        let water_id = registry.register(water()).unwrap();
        let steam_id = registry.register(steam()).unwrap();
        let nitrogen_id = registry.register(nitrogen()).unwrap();
        registry.link_phases(water_id, steam_id).unwrap();
        (registry, water_id, steam_id, nitrogen_id)
    }

    #[test]
    fn ideal_gas_pressure_over_ullage() {
        let (registry, _, _, nitrogen_id) = loaded_registry();
        let contents = Mixture::of(nitrogen_id, Mass::new::<kilogram>(1.0));
        let temperature = ThermodynamicTemperature::new::<kelvin>(300.0);

        let p = pressure_only(
            &contents,
            &registry,
            temperature,
            Volume::new::<cubic_meter>(1.0),
        );

        // P = m·R·T/V = 1·296.8·300/1
        assert_relative_eq!(p.get::<pascal>(), 89_040.0, epsilon = 1e-6);
    }

    #[test]
    fn liquid_reduces_the_gas_volume() {
        let (registry, water_id, _, nitrogen_id) = loaded_registry();
        let mut contents = Mixture::of(nitrogen_id, Mass::new::<kilogram>(1.0));
        // 0.5 m³ of water in a 1 m³ tank doubles the nitrogen pressure.
        contents.add(water_id, Mass::new::<kilogram>(500.0));
        let temperature = ThermodynamicTemperature::new::<kelvin>(300.0);

        let p = pressure_only(
            &contents,
            &registry,
            temperature,
            Volume::new::<cubic_meter>(1.0),
        );

        assert_relative_eq!(p.get::<pascal>(), 2.0 * 89_040.0, epsilon = 1e-6);
    }

    #[test]
    fn dalton_sums_partial_pressures() {
        let (registry, _, steam_id, nitrogen_id) = loaded_registry();
        let mut contents = Mixture::of(nitrogen_id, Mass::new::<kilogram>(1.0));
        contents.add(steam_id, Mass::new::<kilogram>(0.5));
        let temperature = ThermodynamicTemperature::new::<kelvin>(300.0);

        let p = gas_pressure(
            &contents,
            &registry,
            temperature,
            Volume::new::<cubic_meter>(1.0),
        );

        // 1·296.8·300 + 0.5·461.5·300
        assert_relative_eq!(p.get::<pascal>(), 89_040.0 + 69_225.0, epsilon = 1e-6);
    }

    #[test]
    fn overfill_switches_to_bulk_modulus_penalty() {
        let (registry, water_id, _, _) = loaded_registry();
        // 1.1 m³ of water forced into a 1 m³ tank: 10% strain.
        let contents = Mixture::of(water_id, Mass::new::<kilogram>(1100.0));
        let temperature = ThermodynamicTemperature::new::<kelvin>(300.0);

        let p = pressure_only(
            &contents,
            &registry,
            temperature,
            Volume::new::<cubic_meter>(1.0),
        );

        assert_relative_eq!(p.get::<pascal>(), 2.2e9 * 0.1, epsilon = 10.0);
        assert!(p.value.is_finite());
    }

    #[test]
    fn empty_contents_have_zero_pressure() {
        let (registry, _, _, _) = loaded_registry();
        let p = pressure_only(
            &Mixture::new(),
            &registry,
            ThermodynamicTemperature::new::<kelvin>(300.0),
            Volume::new::<cubic_meter>(1.0),
        );
        assert_eq!(p, Pressure::ZERO);
    }

    #[test]
    fn flash_evaporates_into_an_empty_ullage() {
        let (registry, water_id, steam_id, _) = loaded_registry();
        let mut contents = Mixture::of(water_id, Mass::new::<kilogram>(100.0));
        let temperature = ThermodynamicTemperature::new::<kelvin>(330.0);

        let new_temperature = flash(
            &mut contents,
            &registry,
            temperature,
            Volume::new::<cubic_meter>(1.0),
            &FlashConfig::default(),
        );

        let evaporated = contents.mass_of(steam_id).get::<kilogram>();
        assert!(evaporated > 0.0, "vapor pressure should drive evaporation");
        assert!(
            new_temperature < temperature,
            "evaporation absorbs latent heat"
        );
        // Mass is conserved across the phase change.
        assert_relative_eq!(
            contents.total_mass().get::<kilogram>(),
            100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn flash_condenses_supersaturated_vapor() {
        let (registry, water_id, steam_id, _) = loaded_registry();
        let mut contents = Mixture::of(water_id, Mass::new::<kilogram>(100.0));
        // Far more steam than the ~17 kPa vapor pressure at 330 K supports.
        contents.add(steam_id, Mass::new::<kilogram>(5.0));
        let temperature = ThermodynamicTemperature::new::<kelvin>(330.0);

        let before = contents.mass_of(steam_id);
        let new_temperature = flash(
            &mut contents,
            &registry,
            temperature,
            Volume::new::<cubic_meter>(1.0),
            &FlashConfig::default(),
        );

        assert!(contents.mass_of(steam_id) < before);
        assert!(
            new_temperature > temperature,
            "condensation releases latent heat"
        );
    }

    #[test]
    fn flash_dead_zone_suppresses_chatter() {
        let (registry, water_id, steam_id, _) = loaded_registry();
        let temperature = ThermodynamicTemperature::new::<kelvin>(330.0);
        let volume = Volume::new::<cubic_meter>(1.0);
        let config = FlashConfig {
            relaxation: 1.0,
            dead_zone: 0.01,
        };

        // Drive to equilibrium, then verify another pass is a no-op.
        let mut contents = Mixture::of(water_id, Mass::new::<kilogram>(100.0));
        let mut t = temperature;
        for _ in 0..200 {
            t = flash(&mut contents, &registry, t, volume, &config);
        }
        let settled = contents.mass_of(steam_id);
        let t2 = flash(&mut contents, &registry, t, volume, &config);

        assert_relative_eq!(
            contents.mass_of(steam_id).get::<kilogram>(),
            settled.get::<kilogram>(),
            epsilon = 1e-9
        );
        assert_relative_eq!(t2.get::<kelvin>(), t.get::<kelvin>(), epsilon = 1e-9);
    }

    #[test]
    fn flash_does_nothing_under_hydraulic_lock() {
        let (registry, water_id, _, _) = loaded_registry();
        let mut contents = Mixture::of(water_id, Mass::new::<kilogram>(1100.0));
        let before = contents.clone();
        let temperature = ThermodynamicTemperature::new::<kelvin>(330.0);

        let t = flash(
            &mut contents,
            &registry,
            temperature,
            Volume::new::<cubic_meter>(1.0),
            &FlashConfig::default(),
        );

        assert_eq!(contents, before);
        assert_eq!(t, temperature);
    }

    #[test]
    fn flash_config_validation() {
        assert!(FlashConfig::default().validate().is_ok());
        assert!(
            FlashConfig {
                relaxation: 0.0,
                dead_zone: 0.01
            }
            .validate()
            .is_err()
        );
        assert!(
            FlashConfig {
                relaxation: 0.5,
                dead_zone: -1.0
            }
            .validate()
            .is_err()
        );
    }
}
