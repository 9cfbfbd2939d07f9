//! Pipe mass-flow conductance across the laminar, turbulent, and choked
//! regimes.
//!
//! Conductance relates mass flow to the *specific*-potential difference
//! across a pipe: `m_dot = G·Δφ` with `Δφ` in J/kg. All functions here are
//! stateless; the per-pipe memory (last-step flow magnitude) is owned by the
//! network and passed in.
//!
//! Degenerate inputs (vacuum, zero-size geometry) return the defined
//! fallbacks from the error-handling design — zero conductance when nothing
//! can flow, a near-infinite conductance at zero flow in the turbulent
//! branch so flow can initiate — and never divide by zero.

use std::f64::consts::PI;

use plenum_core::units::FlowConductance;
use uom::{
    ConstZero,
    si::{
        available_energy::joule_per_kilogram,
        f64::{Area, AvailableEnergy, DynamicViscosity, Length, MassDensity, MassRate, Velocity},
        mass_rate::kilogram_per_second,
        ratio::ratio,
    },
};

/// Upper Reynolds number of the laminar regime.
pub const LAMINAR_REYNOLDS_LIMIT: f64 = 2300.0;

/// Below this Reynolds number the Blasius correlation is held constant to
/// avoid the `Re → 0` singularity.
const BLASIUS_FLOOR_REYNOLDS: f64 = 1.0;

const BLASIUS_COEFFICIENT: f64 = 0.316;

/// Flow magnitudes below this (kg/s) count as "no flow" for the turbulent
/// fallback.
const FLOW_EPSILON: f64 = 1e-12;

/// Reynolds number of pipe flow from the mass flow rate.
///
/// `Re = |m_dot|·d / (A·μ)`. Returns zero for degenerate geometry or
/// viscosity.
#[must_use]
pub fn reynolds_number(
    flow: MassRate,
    diameter: Length,
    area: Area,
    viscosity: DynamicViscosity,
) -> f64 {
    if area.value <= 0.0 || viscosity.value <= 0.0 || diameter.value <= 0.0 {
        return 0.0;
    }
    (flow.abs() * diameter / (area * viscosity)).get::<ratio>()
}

/// Darcy friction factor via the Blasius correlation `f = 0.316·Re^−¼`,
/// clamped to a constant below Re = 1.
#[must_use]
pub fn darcy_friction_factor(reynolds: f64) -> f64 {
    let re = reynolds.max(BLASIUS_FLOOR_REYNOLDS);
    BLASIUS_COEFFICIENT / re.powf(0.25)
}

/// Hagen–Poiseuille laminar conductance.
///
/// From `m_dot = π·d⁴·ρ·ΔP / (128·μ·L)` with `ΔP = ρ·Δφ`:
///
/// ```text
/// G = π·d⁴·ρ² / (128·μ·L)
/// ```
///
/// Returns zero conductance when the pipe or fluid is degenerate (vacuum,
/// zero-size geometry).
#[must_use]
pub fn laminar_conductance(
    diameter: Length,
    length: Length,
    density: MassDensity,
    viscosity: DynamicViscosity,
) -> FlowConductance {
    if diameter.value <= 0.0
        || length.value <= 0.0
        || density.value <= 0.0
        || viscosity.value <= 0.0
    {
        return FlowConductance::ZERO;
    }
    let d2 = diameter * diameter;
    let d4 = d2 * d2;
    PI * d4 * density * density / (128.0 * viscosity * length)
}

/// Turbulent conductance from the Darcy friction factor and the last-step
/// flow magnitude.
///
/// Linearizes `ΔP = f·(L/d)·ρv²/2` around the previous flow:
///
/// ```text
/// G = 2·d·ρ²·A² / (f·L·|m_dot|)
/// ```
///
/// At zero flow the linearization is undefined; the near-infinite fallback
/// lets any potential difference start a flow, after which the next step
/// sees a real magnitude.
#[must_use]
pub fn turbulent_conductance(
    last_flow: MassRate,
    friction_factor: f64,
    diameter: Length,
    area: Area,
    length: Length,
    density: MassDensity,
) -> FlowConductance {
    if diameter.value <= 0.0
        || area.value <= 0.0
        || length.value <= 0.0
        || density.value <= 0.0
        || friction_factor <= 0.0
    {
        return FlowConductance::ZERO;
    }

    let magnitude = last_flow.abs();
    if magnitude.get::<kilogram_per_second>() < FLOW_EPSILON {
        return unbounded_conductance();
    }

    2.0 * diameter * density * density * area * area / (friction_factor * length * magnitude)
}

/// Sonic ceiling on mass flow through a flow area: `ρ·A·c`.
#[must_use]
pub fn choked_flow_limit(density: MassDensity, area: Area, speed_of_sound: Velocity) -> MassRate {
    if density.value <= 0.0 || area.value <= 0.0 || speed_of_sound.value <= 0.0 {
        return MassRate::ZERO;
    }
    density * area * speed_of_sound
}

/// The "let flow start" conductance: large enough that any potential
/// difference produces flow, small enough to stay finite.
#[must_use]
pub fn unbounded_conductance() -> FlowConductance {
    MassRate::new::<kilogram_per_second>(1.0e9) / AvailableEnergy::new::<joule_per_kilogram>(1.0)
}

/// Regime-selected conductance from the last-step flow magnitude.
///
/// Laminar below [`LAMINAR_REYNOLDS_LIMIT`], turbulent above. The choked
/// ceiling is applied to the resulting *flow*, not the conductance, by the
/// solver.
#[must_use]
pub fn flow_conductance(
    last_flow: MassRate,
    diameter: Length,
    area: Area,
    length: Length,
    density: MassDensity,
    viscosity: DynamicViscosity,
) -> FlowConductance {
    let re = reynolds_number(last_flow, diameter, area, viscosity);
    if re <= LAMINAR_REYNOLDS_LIMIT {
        laminar_conductance(diameter, length, density, viscosity)
    } else {
        turbulent_conductance(
            last_flow,
            darcy_friction_factor(re),
            diameter,
            area,
            length,
            density,
        )
    }
}
