use plenum_thermo::{Mixture, Phase, SubstanceId, SubstanceRegistry, equilibrium};
use uom::si::{
    f64::{ThermodynamicTemperature, Volume},
    mass::kilogram,
    pressure::pascal,
    volume::cubic_meter,
};

/// Minimum ullage volume, m³. Keeps the gas-law division alive even in a
/// brim-full tank.
const ULLAGE_FLOOR: f64 = 1e-9;

/// One condensed substance's contiguous potential range.
///
/// Potentials are in J/kg, volumes in m³, densities in kg/m³. Layers are
/// ordered bottom-up, which by construction is descending density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidLayer {
    pub substance: SubstanceId,
    pub density: f64,
    pub volume: f64,
    pub potential_start: f64,
    pub potential_end: f64,
}

/// The current assignment of a container's contents to potential ranges.
///
/// Condensed substances occupy contiguous layers from the bottom potential
/// up; the remaining volume is the ullage, in which all gas substances mix
/// uniformly (Dalton). When the condensed phase overfills the container the
/// layers are scaled to fit and the pressure carries a bulk-modulus penalty
/// instead of a gas-law term (`locked`).
#[derive(Debug, Clone, Default)]
pub struct Stratification {
    layers: Vec<FluidLayer>,
    /// Potential of the exposed liquid surface, J/kg. Equals the bottom
    /// potential when no condensed substance is present.
    pub surface_potential: f64,
    /// Gas-occupied volume, m³ (≥ a tiny positive floor while unlocked).
    pub ullage_volume: f64,
    /// Ullage pressure, Pa: Dalton partial-pressure sum, or the
    /// bulk-modulus penalty under hydraulic lock.
    pub ullage_pressure: f64,
    /// Total gas mass, kg.
    pub gas_mass: f64,
    /// True when condensed volume exceeded the container volume.
    pub locked: bool,
}

impl Stratification {
    /// Stratification of an empty or hollow container.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assigns contents to potential ranges over a baked slice stack.
    #[must_use]
    pub fn build(
        slices: &crate::SliceStack,
        contents: &Mixture,
        registry: &SubstanceRegistry,
        temperature: ThermodynamicTemperature,
    ) -> Self {
        let capacity = slices.total_capacity();
        if slices.is_empty() || capacity <= 0.0 {
            return Self::empty();
        }

        let mut gas_mass = 0.0;
        // (id, density kg/m³, volume m³), sorted densest first.
        let mut condensed: Vec<(SubstanceId, f64, f64)> = Vec::new();
        for (id, mass) in contents.iter() {
            let substance = registry.get(id);
            match substance.phase {
                Phase::Gas => gas_mass += mass.get::<kilogram>(),
                Phase::Condensed => {
                    let density = substance.reference_density.value;
                    if density > 0.0 {
                        condensed.push((id, density, mass.get::<kilogram>() / density));
                    }
                }
            }
        }
        condensed.sort_by(|a, b| b.1.total_cmp(&a.1));

        let condensed_total: f64 = condensed.iter().map(|&(_, _, v)| v).sum();
        let locked = condensed_total > capacity;
        let fit_scale = if locked {
            (capacity - ULLAGE_FLOOR).max(0.0) / condensed_total
        } else {
            1.0
        };

        let mut layers = Vec::with_capacity(condensed.len());
        let mut poured = 0.0;
        let mut start = slices.bottom_potential();
        for (id, density, volume) in condensed {
            let fitted = volume * fit_scale;
            poured += fitted;
            let end = slices.potential_at_volume(poured);
            layers.push(FluidLayer {
                substance: id,
                density,
                volume: fitted,
                potential_start: start,
                potential_end: end,
            });
            start = end;
        }

        let surface_potential = layers
            .last()
            .map_or(slices.bottom_potential(), |l| l.potential_end);
        let ullage_volume = (capacity - poured).max(ULLAGE_FLOOR);

        let ullage_pressure = equilibrium::pressure_only(
            contents,
            registry,
            temperature,
            Volume::new::<cubic_meter>(capacity),
        )
        .get::<pascal>();

        Self {
            layers,
            surface_potential,
            ullage_volume,
            ullage_pressure,
            gas_mass,
            locked,
        }
    }

    /// Layers bottom-up (descending density).
    #[must_use]
    pub fn layers(&self) -> &[FluidLayer] {
        &self.layers
    }

    /// The condensed layer resident at `potential`, or `None` in the gas
    /// region at or above the surface. Potentials below the bottom layer
    /// clamp into it.
    #[must_use]
    pub fn layer_at(&self, potential: f64) -> Option<&FluidLayer> {
        if potential >= self.surface_potential {
            return None;
        }
        self.layers
            .iter()
            .find(|l| potential < l.potential_end)
            .or(self.layers.last())
    }

    /// Hydrostatic pressure at a potential below the surface, Pa: the
    /// ullage pressure plus `Σ ρᵢ·Δφᵢ` across every layer between the point
    /// and the surface.
    #[must_use]
    pub fn pressure_at(&self, potential: f64) -> f64 {
        let mut pressure = self.ullage_pressure;
        for layer in &self.layers {
            let from = layer.potential_start.max(potential);
            if layer.potential_end > from {
                pressure += layer.density * (layer.potential_end - from);
            }
        }
        pressure
    }
}
