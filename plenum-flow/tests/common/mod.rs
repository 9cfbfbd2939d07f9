#![allow(dead_code)]

use std::{cell::Cell, rc::Rc, sync::Arc};

use glam::DVec3;
use plenum_core::BodyForceField;
use plenum_flow::{
    BuildOutcome, Network, NetworkBuilder, OwnerId, Participant, PipeId, PipePort, PipeSpec,
};
use plenum_tank::Container;
use plenum_thermo::{
    Phase, Substance, SubstanceId, SubstanceRegistry, VaporCurve,
    capability::SharedEndpoint,
};
use uom::si::{
    area::square_meter,
    available_energy::joule_per_kilogram,
    dynamic_viscosity::pascal_second,
    f64::{
        Area, AvailableEnergy, DynamicViscosity, Length, MassDensity, Pressure,
        SpecificHeatCapacity, TemperatureInterval, ThermodynamicTemperature, Velocity, Volume,
    },
    length::meter,
    mass_density::kilogram_per_cubic_meter,
    pressure::pascal,
    specific_heat_capacity::joule_per_kilogram_kelvin,
    temperature_interval::kelvin as delta_kelvin,
    thermodynamic_temperature::kelvin,
    velocity::meter_per_second,
    volume::cubic_meter,
};

fn gas_constant(r: f64) -> plenum_core::units::SpecificGasConstant {
    AvailableEnergy::new::<joule_per_kilogram>(r) / TemperatureInterval::new::<delta_kelvin>(1.0)
}

fn water() -> Substance {
    Substance {
        name: "water".into(),
        phase: Phase::Condensed,
        gas_constant: gas_constant(461.5),
        reference_density: MassDensity::new::<kilogram_per_cubic_meter>(1000.0),
        dynamic_viscosity: DynamicViscosity::new::<pascal_second>(1e-3),
        specific_heat: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(4186.0),
        bulk_modulus: Pressure::new::<pascal>(2.2e9),
        speed_of_sound: Velocity::new::<meter_per_second>(1481.0),
        vapor: None::<VaporCurve>,
    }
}

fn nitrogen() -> Substance {
    Substance {
        name: "nitrogen".into(),
        phase: Phase::Gas,
        gas_constant: gas_constant(296.8),
        reference_density: MassDensity::new::<kilogram_per_cubic_meter>(0.0),
        dynamic_viscosity: DynamicViscosity::new::<pascal_second>(1.76e-5),
        specific_heat: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(1040.0),
        bulk_modulus: Pressure::new::<pascal>(0.0),
        speed_of_sound: Velocity::new::<meter_per_second>(353.0),
        vapor: None,
    }
}

/// Water + nitrogen registry shared by the scenario tests.
pub fn load_registry() -> (Arc<SubstanceRegistry>, SubstanceId, SubstanceId) {
    let mut registry = SubstanceRegistry::new();
    let water_id = registry.register(water()).unwrap();
    let nitrogen_id = registry.register(nitrogen()).unwrap();
    (Arc::new(registry), water_id, nitrogen_id)
}

/// Unit-cube interior sampled at three heights, with a bottom-center inlet.
pub fn cube_tank(
    volume_m3: f64,
    registry: Arc<SubstanceRegistry>,
) -> SharedEndpoint<Container> {
    let mut points = Vec::new();
    for x in [0.0, 1.0] {
        for y in [0.0, 1.0] {
            for z in [0.0, 0.5, 1.0] {
                points.push(DVec3::new(x, y, z));
            }
        }
    }

    let mut tank = Container::new(
        Volume::new::<cubic_meter>(volume_m3),
        ThermodynamicTemperature::new::<kelvin>(293.15),
        registry,
    );
    tank.set_nodes(&points, &[bottom_port(), top_port()]);
    tank.set_body_force(BodyForceField::uniform(DVec3::new(0.0, 0.0, -9.81)));
    SharedEndpoint::new(tank)
}

/// Bottom-center inlet anchor shared by tanks and pipes.
pub fn bottom_port() -> DVec3 {
    DVec3::new(0.5, 0.5, 0.0)
}

/// Lid-center inlet anchor for gas lines.
pub fn top_port() -> DVec3 {
    DVec3::new(0.5, 0.5, 1.0)
}

/// Registers one shared container endpoint.
pub struct TankParticipant {
    name: String,
    owner: OwnerId,
    tank: SharedEndpoint<Container>,
}

impl TankParticipant {
    pub fn new(name: &str, owner: u64, tank: SharedEndpoint<Container>) -> Self {
        Self {
            name: name.to_string(),
            owner: OwnerId(owner),
            tank,
        }
    }
}

impl Participant for TankParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn build(&mut self, builder: &mut NetworkBuilder<'_>) -> BuildOutcome {
        builder.add_endpoint(self.owner, Box::new(self.tank.clone()));
        BuildOutcome::Finished
    }
}

/// Registers one pipe between two owners' endpoints, retrying until both
/// exist.
pub struct LineParticipant {
    name: String,
    owner: OwnerId,
    from_owner: OwnerId,
    to_owner: OwnerId,
    from_anchor: DVec3,
    to_anchor: DVec3,
    diameter_m: f64,
    length_m: f64,
    pub pipe: Rc<Cell<Option<PipeId>>>,
}

impl LineParticipant {
    pub fn new(name: &str, owner: u64, from: u64, to: u64, anchor: DVec3) -> Self {
        Self {
            name: name.to_string(),
            owner: OwnerId(owner),
            from_owner: OwnerId(from),
            to_owner: OwnerId(to),
            from_anchor: anchor,
            to_anchor: anchor,
            diameter_m: 0.05,
            length_m: 1.0,
            pipe: Rc::new(Cell::new(None)),
        }
    }

    pub fn with_diameter(mut self, diameter_m: f64) -> Self {
        self.diameter_m = diameter_m;
        self
    }
}

impl Participant for LineParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn build(&mut self, builder: &mut NetworkBuilder<'_>) -> BuildOutcome {
        let (Some(from), Some(to)) = (
            builder.endpoint_of(self.from_owner),
            builder.endpoint_of(self.to_owner),
        ) else {
            return BuildOutcome::Retry;
        };

        let orifice = Area::new::<square_meter>(
            std::f64::consts::PI / 4.0 * self.diameter_m * self.diameter_m,
        );
        let spec = PipeSpec::new(
            PipePort::new(from, self.from_anchor, orifice),
            PipePort::new(to, self.to_anchor, orifice),
            Length::new::<meter>(self.length_m),
            Length::new::<meter>(self.diameter_m),
        );
        match builder.add_pipe(self.owner, spec) {
            Ok(id) => {
                self.pipe.set(Some(id));
                BuildOutcome::Finished
            }
            Err(err) => BuildOutcome::Failed(err.to_string()),
        }
    }

    fn is_valid(&self, network: &Network) -> bool {
        self.pipe.get().is_some_and(|id| network.pipe(id).is_some())
    }
}
