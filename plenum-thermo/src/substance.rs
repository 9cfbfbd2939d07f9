use plenum_core::units::SpecificGasConstant;
use serde::{Deserialize, Serialize};
use uom::{
    ConstZero,
    si::{
        f64::{
            AvailableEnergy, DynamicViscosity, MassDensity, Pressure, SpecificHeatCapacity,
            ThermodynamicTemperature, Velocity,
        },
        temperature_interval,
        thermodynamic_temperature::kelvin,
    },
};

/// Identifies a substance interned in a [`SubstanceRegistry`].
///
/// Ids are minted by [`SubstanceRegistry::register`] and are only meaningful
/// for the registry that produced them.
///
/// [`SubstanceRegistry`]: crate::SubstanceRegistry
/// [`SubstanceRegistry::register`]: crate::SubstanceRegistry::register
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubstanceId(pub(crate) usize);

impl SubstanceId {
    /// The registry slot backing this id.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Bulk phase of a substance as stored in a container.
///
/// Condensed substances stratify into potential-ordered layers; gas
/// substances mix uniformly in the ullage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Condensed,
    Gas,
}

/// Vapor-pressure curve linking a condensed substance to its gas-phase
/// partner.
///
/// The curve is the Clausius–Clapeyron form anchored at a reference point:
///
/// ```text
/// P_vap(T) = P_ref · exp(−L/R · (1/T − 1/T_ref))
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VaporCurve {
    /// Vapor pressure at the reference temperature.
    pub reference_pressure: Pressure,
    /// Temperature at which `reference_pressure` holds.
    pub reference_temperature: ThermodynamicTemperature,
    /// Specific latent heat of vaporization, J/kg.
    pub latent_heat: AvailableEnergy,
}

impl VaporCurve {
    /// Evaluates the vapor pressure at `temperature`.
    ///
    /// `gas_constant` is the specific gas constant of the *vapor* phase.
    /// Non-positive temperatures evaluate to zero pressure.
    #[must_use]
    pub fn vapor_pressure(
        &self,
        temperature: ThermodynamicTemperature,
        gas_constant: SpecificGasConstant,
    ) -> Pressure {
        let t = temperature.get::<kelvin>();
        let t_ref = self.reference_temperature.get::<kelvin>();
        if t <= 0.0 || t_ref <= 0.0 || gas_constant.value <= 0.0 {
            return Pressure::ZERO;
        }

        let scale = (self.latent_heat / gas_constant).get::<temperature_interval::kelvin>();
        let exponent = -scale * (1.0 / t - 1.0 / t_ref);
        self.reference_pressure * exponent.exp()
    }
}

/// Fixed physical properties of a single substance.
///
/// Supplied as in-memory records by the host's content-loading layer; the
/// serde derives exist for that layer's benefit. Simulation state never
/// serializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substance {
    pub name: String,
    pub phase: Phase,
    /// Specific gas constant. Drives ullage partial pressure for gases and
    /// mole-fraction weighting for condensed substances.
    pub gas_constant: SpecificGasConstant,
    /// Condensed-phase density. Unused for pure gases, whose density follows
    /// the ideal gas law.
    pub reference_density: MassDensity,
    pub dynamic_viscosity: DynamicViscosity,
    pub specific_heat: SpecificHeatCapacity,
    /// Bulk modulus of the condensed phase; sets the hydraulic-lock
    /// pressure penalty.
    pub bulk_modulus: Pressure,
    pub speed_of_sound: Velocity,
    /// Present when this condensed substance can exchange mass with a
    /// registered gas-phase partner.
    pub vapor: Option<VaporCurve>,
}

impl Substance {
    /// True for gas-phase substances.
    #[must_use]
    pub fn is_gas(&self) -> bool {
        self.phase == Phase::Gas
    }
}
