use std::sync::Arc;

use glam::DVec3;
use plenum_core::{BodyForceField, units::PotentialStiffness};
use plenum_mesh::{TetraMesh, tetrahedralize};
use plenum_thermo::{
    FluidState, Mixture, Phase, SubstanceId, SubstanceRegistry,
    capability::FlowEndpoint,
    equilibrium::{self, FlashConfig},
};
use uom::{
    ConstZero,
    si::{
        available_energy::joule_per_kilogram,
        dynamic_viscosity::pascal_second,
        f64::{
            Area, AvailableEnergy, Mass, MassDensity, MassRate, Pressure,
            ThermodynamicTemperature, Time, Velocity, Volume,
        },
        mass::kilogram,
        mass_density::kilogram_per_cubic_meter,
        pressure::pascal,
        velocity::meter_per_second,
        volume::cubic_meter,
    },
};

use crate::{SliceStack, Stratification};

/// Interior points this close (m) to an inlet are elided in favor of the
/// inlet position, so inlets always coincide with a mesh node.
pub const INLET_SNAP_DISTANCE: f64 = 0.05;

/// Positions closer than this (m) merge into a single mesh node.
pub const NODE_MERGE_DISTANCE: f64 = 1e-3;

/// Fixed reference density (kg/m³) for the pressure term of the gas-branch
/// driving potential. Shared by every container so gas-region potentials
/// compare across the network.
const REFERENCE_DENSITY: f64 = 1000.0;

/// A fluid container: tetrahedralized interior, body-force field, substance
/// ledger, and the derived slice/stratification caches.
///
/// Two dirty flags drive cache invalidation. Geometry or acceleration
/// changes re-bake the slices (which forces re-stratification); contents
/// changes re-stratify over the existing slices. Both refresh lazily on the
/// next sampling call.
#[derive(Debug, Clone)]
pub struct Container {
    volume: Volume,
    temperature: ThermodynamicTemperature,
    registry: Arc<SubstanceRegistry>,
    field: BodyForceField,
    mesh: TetraMesh,
    contents: Mixture,
    slices: SliceStack,
    strata: Stratification,
    geometry_dirty: bool,
    fluids_dirty: bool,
    inflow: Mixture,
    outflow: Mixture,
}

impl Container {
    /// Creates a container of the given capacity with no geometry yet.
    /// Call [`Self::set_nodes`] before sampling anything meaningful.
    #[must_use]
    pub fn new(
        volume: Volume,
        temperature: ThermodynamicTemperature,
        registry: Arc<SubstanceRegistry>,
    ) -> Self {
        Self {
            volume,
            temperature,
            registry,
            field: BodyForceField::default(),
            mesh: TetraMesh::default(),
            contents: Mixture::new(),
            slices: SliceStack::empty(),
            strata: Stratification::empty(),
            geometry_dirty: true,
            fluids_dirty: true,
            inflow: Mixture::new(),
            outflow: Mixture::new(),
        }
    }

    /// Meshes the container interior from sample points and inlet anchors.
    ///
    /// Interior points within [`INLET_SNAP_DISTANCE`] of an inlet are elided
    /// in favor of the inlet position; all remaining positions closer than
    /// [`NODE_MERGE_DISTANCE`] merge into one node.
    pub fn set_nodes(&mut self, interior: &[DVec3], inlets: &[DVec3]) {
        let mut points: Vec<DVec3> = inlets.to_vec();
        points.extend(interior.iter().copied().filter(|p| {
            inlets
                .iter()
                .all(|inlet| (*p - *inlet).length() > INLET_SNAP_DISTANCE)
        }));
        self.mesh = tetrahedralize(&points, NODE_MERGE_DISTANCE);
        self.geometry_dirty = true;
    }

    /// Updates the body-force field. Invalidates geometry and fluids.
    pub fn set_body_force(&mut self, field: BodyForceField) {
        if self.field != field {
            self.field = field;
            self.geometry_dirty = true;
        }
    }

    pub fn set_temperature(&mut self, temperature: ThermodynamicTemperature) {
        self.temperature = temperature;
        self.fluids_dirty = true;
    }

    /// Adds mass of one substance to the contents.
    pub fn add_contents(&mut self, id: SubstanceId, mass: Mass) {
        self.contents.add(id, mass);
        self.fluids_dirty = true;
    }

    /// Replaces the contents wholesale.
    pub fn set_contents(&mut self, contents: Mixture) {
        self.contents = contents;
        self.fluids_dirty = true;
    }

    #[must_use]
    pub fn contents(&self) -> &Mixture {
        &self.contents
    }

    #[must_use]
    pub fn volume(&self) -> Volume {
        self.volume
    }

    #[must_use]
    pub fn temperature(&self) -> ThermodynamicTemperature {
        self.temperature
    }

    #[must_use]
    pub fn field(&self) -> BodyForceField {
        self.field
    }

    #[must_use]
    pub fn mesh(&self) -> &TetraMesh {
        &self.mesh
    }

    /// The raw geometric potential at a position (no fluid involved).
    #[must_use]
    pub fn potential_at(&self, position: DVec3) -> AvailableEnergy {
        self.field.potential_at(position)
    }

    /// Current ullage pressure.
    #[must_use]
    pub fn pressure(&mut self) -> Pressure {
        self.refresh();
        Pressure::new::<pascal>(self.strata.ullage_pressure)
    }

    /// Runs one vapor–liquid flash relaxation pass over the contents and
    /// absorbs the latent-heat temperature change.
    pub fn equilibrate(&mut self, config: &FlashConfig) {
        self.temperature = equilibrium::flash(
            &mut self.contents,
            &self.registry,
            self.temperature,
            self.volume,
            config,
        );
        self.fluids_dirty = true;
    }

    /// Mass-weighted center of the contained fluid, container-local frame.
    /// Empty containers report the geometric centroid.
    #[must_use]
    pub fn center_of_mass(&mut self) -> DVec3 {
        self.refresh();
        let mut total_mass = 0.0;
        let mut weighted = DVec3::ZERO;

        for layer in self.strata.layers() {
            let (_, centroid) = self
                .slices
                .centroid_between(layer.potential_start, layer.potential_end);
            let mass = layer.density * layer.volume;
            weighted += centroid * mass;
            total_mass += mass;
        }
        if self.strata.gas_mass > 0.0 {
            let (_, centroid) = self
                .slices
                .centroid_between(self.strata.surface_potential, self.slices.top_potential());
            weighted += centroid * self.strata.gas_mass;
            total_mass += self.strata.gas_mass;
        }

        if total_mass > 0.0 {
            weighted / total_mass
        } else {
            self.mesh.centroid()
        }
    }

    /// Samples the fluid state at a position in the container's frame.
    ///
    /// Below the liquid surface the pressure is the hydrostatic integral to
    /// the surface and the driving potential is the surface potential (plus
    /// the ullage-pressure term, so the branches agree at the interface).
    /// In the gas region the driving potential is the point's own potential
    /// plus `P/ρ_ref`. An empty container reports zero pressure at the raw
    /// geometric potential.
    pub fn sample(&mut self, position: DVec3, _orifice_area: Area) -> FluidState {
        self.refresh();
        let raw = self.field.raw_potential_at(position);

        if let Some(layer) = self.strata.layer_at(raw) {
            let substance = self.registry.get(layer.substance);
            return FluidState {
                pressure: Pressure::new::<pascal>(self.strata.pressure_at(raw)),
                temperature: self.temperature,
                velocity: Velocity::ZERO,
                potential: AvailableEnergy::new::<joule_per_kilogram>(
                    self.strata.surface_potential
                        + self.strata.ullage_pressure / REFERENCE_DENSITY,
                ),
                density: MassDensity::new::<kilogram_per_cubic_meter>(layer.density),
                viscosity: substance.dynamic_viscosity,
                speed_of_sound: substance.speed_of_sound,
                substance: Some(layer.substance),
            };
        }

        // Gas region (or vacuum).
        let pressure = self.strata.ullage_pressure;
        let gas_density = if self.strata.ullage_volume > 0.0 {
            self.strata.gas_mass / self.strata.ullage_volume
        } else {
            0.0
        };
        let (viscosity, speed_of_sound) = self.mean_gas_transport();
        FluidState {
            pressure: Pressure::new::<pascal>(pressure),
            temperature: self.temperature,
            velocity: Velocity::ZERO,
            potential: AvailableEnergy::new::<joule_per_kilogram>(
                raw + pressure / REFERENCE_DENSITY,
            ),
            density: MassDensity::new::<kilogram_per_cubic_meter>(gas_density),
            viscosity: uom::si::f64::DynamicViscosity::new::<pascal_second>(viscosity),
            speed_of_sound: Velocity::new::<meter_per_second>(speed_of_sound),
            substance: None,
        }
    }

    /// Substances available for extraction at a position, up to
    /// `|flow_rate|·dt` of mass.
    ///
    /// Submerged points yield the resident layer's substance; gas-region
    /// points yield a mass-weighted mixture of all gases, scaled down when
    /// the request exceeds what is present. Mass already promised through
    /// the outflow accumulator this step is not offered twice.
    pub fn sample_substances(
        &mut self,
        position: DVec3,
        flow_rate: MassRate,
        dt: Time,
    ) -> Mixture {
        self.refresh();
        let requested = (flow_rate.abs() * dt).get::<kilogram>();
        if requested <= 0.0 {
            return Mixture::new();
        }
        let raw = self.field.raw_potential_at(position);

        if let Some(layer) = self.strata.layer_at(raw) {
            let in_layer = layer.density * layer.volume;
            let unpromised = (self.contents.mass_of(layer.substance)
                - self.outflow.mass_of(layer.substance))
            .get::<kilogram>()
            .max(0.0);
            let take = requested.min(in_layer).min(unpromised);
            return Mixture::of(layer.substance, Mass::new::<kilogram>(take));
        }

        // Gas branch: available mass net of pending outflow.
        let mut available = 0.0;
        for (id, mass) in self.contents.iter() {
            if self.registry.get(id).is_gas() {
                available += (mass - self.outflow.mass_of(id)).get::<kilogram>().max(0.0);
            }
        }
        if available <= 0.0 {
            return Mixture::new();
        }
        let scale = (requested / available).min(1.0);
        let mut drawn = Mixture::new();
        for (id, mass) in self.contents.iter() {
            if self.registry.get(id).is_gas() {
                let net = (mass - self.outflow.mass_of(id)).max(Mass::ZERO);
                drawn.add(id, net * scale);
            }
        }
        drawn
    }

    /// ∂potential/∂volume of this container.
    ///
    /// The liquid surface contributes the reciprocal of the slice volume
    /// per unit potential; the ullage contributes its pressure sensitivity
    /// normalized by the resident gas density, which for a pure gas is
    /// exactly `R·T/V`. Hydraulic lock swamps both with the bulk-modulus
    /// term.
    pub fn stiffness(&mut self) -> PotentialStiffness {
        self.refresh();
        if self.slices.is_empty() {
            return PotentialStiffness::ZERO;
        }

        let mut k = 0.0;
        if self.strata.locked {
            let bulk = equilibrium::mean_bulk_modulus(&self.contents, &self.registry)
                .get::<pascal>();
            k += bulk / (REFERENCE_DENSITY * self.volume.get::<cubic_meter>());
        } else {
            if !self.strata.layers().is_empty() {
                let dv_dphi = self
                    .slices
                    .volume_per_potential_at(self.strata.surface_potential);
                if dv_dphi.is_finite() && dv_dphi > 0.0 {
                    k += 1.0 / dv_dphi;
                }
            }
            if self.strata.gas_mass > 0.0 {
                k += self.strata.ullage_pressure / self.strata.gas_mass;
            }
        }

        AvailableEnergy::new::<joule_per_kilogram>(k) / Volume::new::<cubic_meter>(1.0)
    }

    /// Commits accumulated inflow/outflow into the contents ledger and
    /// invalidates the stratification.
    pub fn apply_flows(&mut self, _dt: Time) {
        if self.inflow.is_empty() && self.outflow.is_empty() {
            return;
        }
        let inflow = std::mem::take(&mut self.inflow);
        let outflow = std::mem::take(&mut self.outflow);
        self.contents.add_all(&inflow);
        self.contents.remove_all(&outflow);
        self.fluids_dirty = true;
    }

    /// Mass-weighted viscosity and speed of sound of the gas contents, in
    /// SI base units. Zero in vacuum.
    fn mean_gas_transport(&self) -> (f64, f64) {
        let mut mass_sum = 0.0;
        let mut viscosity = 0.0;
        let mut speed = 0.0;
        for (id, mass) in self.contents.iter() {
            let substance = self.registry.get(id);
            if substance.phase == Phase::Gas {
                let m = mass.get::<kilogram>();
                mass_sum += m;
                viscosity += m * substance.dynamic_viscosity.value;
                speed += m * substance.speed_of_sound.value;
            }
        }
        if mass_sum > 0.0 {
            (viscosity / mass_sum, speed / mass_sum)
        } else {
            (0.0, 0.0)
        }
    }

    fn refresh(&mut self) {
        if self.geometry_dirty {
            self.slices =
                SliceStack::bake(&self.mesh, &self.field, self.volume.get::<cubic_meter>());
            self.geometry_dirty = false;
            self.fluids_dirty = true;
        }
        if self.fluids_dirty {
            self.strata = Stratification::build(
                &self.slices,
                &self.contents,
                &self.registry,
                self.temperature,
            );
            self.fluids_dirty = false;
        }
    }
}

impl FlowEndpoint for Container {
    fn sample(&mut self, position: DVec3, orifice_area: Area) -> FluidState {
        Container::sample(self, position, orifice_area)
    }

    fn sample_substances(&mut self, position: DVec3, flow_rate: MassRate, dt: Time) -> Mixture {
        Container::sample_substances(self, position, flow_rate, dt)
    }

    fn add_inflow(&mut self, mixture: &Mixture) {
        self.inflow.add_all(mixture);
    }

    fn add_outflow(&mut self, mixture: &Mixture) {
        self.outflow.add_all(mixture);
    }

    fn apply_flows(&mut self, dt: Time) {
        Container::apply_flows(self, dt);
    }

    fn stiffness(&mut self) -> PotentialStiffness {
        Container::stiffness(self)
    }
}
