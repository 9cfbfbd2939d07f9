//! Two-tank scenarios: hydrostatic equilibrium and mass conservation.

mod common;

use approx::assert_relative_eq;
use common::{LineParticipant, TankParticipant, bottom_port, cube_tank, load_registry};
use plenum_flow::{Participant, SolverConfig, build_network};
use uom::si::{
    f64::{Mass, Time},
    mass::kilogram,
    mass_rate::kilogram_per_second,
    time::second,
};

fn dt() -> Time {
    Time::new::<second>(0.02)
}

fn kg(mass: f64) -> Mass {
    Mass::new::<kilogram>(mass)
}

#[test]
fn two_tanks_reach_hydrostatic_equilibrium() {
    let (registry, water, _) = load_registry();
    let tank_a = cube_tank(1.0, registry.clone());
    let tank_b = cube_tank(1.0, registry);
    tank_a.borrow_mut().add_contents(water, kg(600.0));
    tank_b.borrow_mut().add_contents(water, kg(400.0));

    let line = LineParticipant::new("base-line", 3, 1, 2, bottom_port());
    let pipe = line.pipe.clone();
    let mut participants: Vec<Box<dyn Participant>> = vec![
        Box::new(TankParticipant::new("tank-a", 1, tank_a.clone())),
        Box::new(TankParticipant::new("tank-b", 2, tank_b.clone())),
        Box::new(line),
    ];
    let mut network = build_network(&mut participants, SolverConfig::default()).unwrap();

    let mut steps = 0;
    loop {
        network.step(dt(), &mut participants).unwrap();
        steps += 1;

        let flow = network
            .pipe(pipe.get().unwrap())
            .unwrap()
            .flow_rate()
            .get::<kilogram_per_second>();
        if flow.abs() <= 1e-6 && steps > 10 {
            break;
        }
        assert!(steps < 10_000, "equilibrium should arrive well before this");
    }

    let mass_a = tank_a.borrow().contents().mass_of(water).get::<kilogram>();
    let mass_b = tank_b.borrow().contents().mass_of(water).get::<kilogram>();

    // Equal bases, equal geometry: the water levels out.
    assert_relative_eq!(mass_a, 500.0, epsilon = 5.0);
    assert_relative_eq!(mass_b, 500.0, epsilon = 5.0);
    assert_relative_eq!(mass_a + mass_b, 1000.0, epsilon = 1e-6);

    // Idempotence at equilibrium: further stepping changes nothing.
    for _ in 0..100 {
        network.step(dt(), &mut participants).unwrap();
    }
    let settled_a = tank_a.borrow().contents().mass_of(water).get::<kilogram>();
    let flow = network
        .pipe(pipe.get().unwrap())
        .unwrap()
        .flow_rate()
        .get::<kilogram_per_second>();

    assert_relative_eq!(settled_a, mass_a, epsilon = 1e-3);
    assert!(flow.abs() <= 1e-6);
}

#[test]
fn closed_network_conserves_mass() {
    let (registry, water, nitrogen) = load_registry();
    let tank_a = cube_tank(1.0, registry.clone());
    let tank_b = cube_tank(1.0, registry);
    tank_a.borrow_mut().add_contents(water, kg(700.0));
    tank_a.borrow_mut().add_contents(nitrogen, kg(0.2));
    tank_b.borrow_mut().add_contents(water, kg(300.0));
    tank_b.borrow_mut().add_contents(nitrogen, kg(0.1));

    let mut participants: Vec<Box<dyn Participant>> = vec![
        Box::new(TankParticipant::new("tank-a", 1, tank_a.clone())),
        Box::new(TankParticipant::new("tank-b", 2, tank_b.clone())),
        Box::new(LineParticipant::new("base-line", 3, 1, 2, bottom_port())),
    ];
    let mut network = build_network(&mut participants, SolverConfig::default()).unwrap();

    let initial = tank_a.borrow().contents().total_mass().get::<kilogram>()
        + tank_b.borrow().contents().total_mass().get::<kilogram>();

    for _ in 0..500 {
        network.step(dt(), &mut participants).unwrap();
    }

    let after = tank_a.borrow().contents().total_mass().get::<kilogram>()
        + tank_b.borrow().contents().total_mass().get::<kilogram>();

    assert_relative_eq!(after, initial, epsilon = 1e-6);
    assert_relative_eq!(after, 1000.3, epsilon = 1e-6);
}

#[test]
fn pressurized_gas_migrates_toward_the_empty_tank() {
    let (registry, _, nitrogen) = load_registry();
    let tank_a = cube_tank(1.0, registry.clone());
    let tank_b = cube_tank(1.0, registry);
    tank_a.borrow_mut().add_contents(nitrogen, kg(1.0));

    let mut participants: Vec<Box<dyn Participant>> = vec![
        Box::new(TankParticipant::new("tank-a", 1, tank_a.clone())),
        Box::new(TankParticipant::new("tank-b", 2, tank_b.clone())),
        Box::new(LineParticipant::new(
            "gas-line",
            3,
            1,
            2,
            common::top_port(),
        )),
    ];
    let mut network = build_network(&mut participants, SolverConfig::default()).unwrap();

    let initial_gap = {
        let mut a = tank_a.borrow_mut();
        let mut b = tank_b.borrow_mut();
        (a.pressure() - b.pressure()).value.abs()
    };

    for _ in 0..2000 {
        network.step(dt(), &mut participants).unwrap();
    }

    let mass_a = tank_a.borrow().contents().mass_of(nitrogen).get::<kilogram>();
    let mass_b = tank_b.borrow().contents().mass_of(nitrogen).get::<kilogram>();

    assert!(mass_b > 0.1, "gas must migrate into the empty tank: {mass_b}");
    assert!(mass_a > mass_b, "migration must not overshoot");
    assert_relative_eq!(mass_a + mass_b, 1.0, epsilon = 1e-9);

    let final_gap = {
        let mut a = tank_a.borrow_mut();
        let mut b = tank_b.borrow_mut();
        (a.pressure() - b.pressure()).value.abs()
    };
    assert!(
        final_gap < initial_gap / 2.0,
        "partial pressures must approach each other: {final_gap} vs {initial_gap}"
    );
}
