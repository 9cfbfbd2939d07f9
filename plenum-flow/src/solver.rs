//! The per-step fixed-point flow solve and its stability heuristics.
//!
//! One call to [`solve_step`] performs the whole tick: sample port states,
//! iterate pipe flows until the largest change drops below tolerance,
//! apply the learned relaxation and proactive stiffness damping per pipe,
//! transport substances, and commit every endpoint's accumulated flows.

use glam::DVec3;
use plenum_core::constraint::UnitIntervalLeftOpen;
use plenum_core::units::FlowConductance;
use plenum_thermo::conductance::{choked_flow_limit, flow_conductance};
use uom::si::{
    f64::{Mass, MassRate, Time},
    mass::kilogram,
    mass_rate::kilogram_per_second,
    time::second,
};

use crate::{
    config::SolverConfig,
    error::StepError,
    event::{IterationEvent, StepObserver},
    network::FlowArena,
};

/// Flow magnitudes below this (kg/s) do not count for oscillation
/// detection.
const OSCILLATION_FLOW_EPSILON: f64 = 1e-12;

pub(crate) struct SolveOutcome {
    pub(crate) iterations: usize,
    pub(crate) residual: MassRate,
    pub(crate) transported: Mass,
}

/// Per-pipe working state for one step. All scalar fields are SI base
/// units (J/kg, kg/s, kg/m³).
struct PipeSolve {
    index: usize,
    from_slot: usize,
    to_slot: usize,
    from_anchor: DVec3,
    to_anchor: DVec3,
    potential_from: f64,
    potential_to: f64,
    head: f64,
    conductance: FlowConductance,
    /// Sonic flow ceiling, kg/s; infinite when the transport side is vacuum.
    choke_limit: f64,
    /// Transport-side density, kg/m³; zero means nothing can flow.
    density: f64,
    /// Current flow iterate, kg/s, signed from → to.
    flow: f64,
}

pub(crate) fn solve_step(
    arena: &mut FlowArena,
    config: &SolverConfig,
    dt: Time,
    observer: &mut dyn StepObserver,
) -> Result<SolveOutcome, StepError> {
    let endpoints = &mut arena.endpoints;
    let pipes = &mut arena.pipes;
    let dt_seconds = dt.get::<second>();
    let slot_count = endpoints.len();

    // 1. Sample each live pipe's port states and pick its transport side.
    let mut work: Vec<PipeSolve> = Vec::new();
    let mut involved = vec![false; slot_count];
    for (index, slot) in pipes.iter().enumerate() {
        let Some(pipe) = slot else { continue };
        let (from, to) = (pipe.from, pipe.to);

        let Some(from_endpoint) = endpoints[from.endpoint.0].as_deref_mut() else {
            continue;
        };
        let from_state = from_endpoint.sample(from.anchor, from.orifice_area);
        let Some(to_endpoint) = endpoints[to.endpoint.0].as_deref_mut() else {
            continue;
        };
        let to_state = to_endpoint.sample(to.anchor, to.orifice_area);

        let head = pipe.head_added().value;
        let forward = from_state.potential.value + head >= to_state.potential.value;
        // Conductance and choking follow the side the flow leaves from; if
        // that side is vacuum, fall back to the other so a filled sink can
        // still push back.
        let upwind = if forward { &from_state } else { &to_state };
        let fallback = if forward { &to_state } else { &from_state };
        let transport = if upwind.density.value > 0.0 {
            upwind
        } else {
            fallback
        };

        let conductance = flow_conductance(
            pipe.flow_rate(),
            pipe.diameter(),
            pipe.flow_area(),
            pipe.length(),
            transport.density,
            transport.viscosity,
        );
        let choke = choked_flow_limit(transport.density, pipe.flow_area(), transport.speed_of_sound);
        let choke_limit = if choke.value > 0.0 {
            choke.value
        } else {
            f64::INFINITY
        };

        involved[from.endpoint.0] = true;
        involved[to.endpoint.0] = true;
        work.push(PipeSolve {
            index,
            from_slot: from.endpoint.0,
            to_slot: to.endpoint.0,
            from_anchor: from.anchor,
            to_anchor: to.anchor,
            potential_from: from_state.potential.value,
            potential_to: to_state.potential.value,
            head,
            conductance,
            choke_limit,
            density: transport.density.value,
            flow: pipe.flow_rate().value,
        });
    }

    if work.is_empty() {
        for endpoint in endpoints.iter_mut().flatten() {
            endpoint.apply_flows(dt);
        }
        return Ok(SolveOutcome {
            iterations: 0,
            residual: MassRate::new::<kilogram_per_second>(0.0),
            transported: Mass::new::<kilogram>(0.0),
        });
    }

    // 2. Endpoint stiffness, sampled once per involved endpoint.
    let mut stiffness = vec![0.0_f64; slot_count];
    for (slot, flag) in involved.iter().enumerate() {
        if *flag {
            if let Some(endpoint) = endpoints[slot].as_deref_mut() {
                stiffness[slot] = endpoint.stiffness().value;
            }
        }
    }

    // 3. Bounded fixed-point iteration on the pipe flows. Sampling is
    // side-effect-free, so within one step the endpoint potentials are
    // fixed and each pipe relaxes toward `G·(Δφ + head)`, capped at its
    // sonic ceiling; the endpoints' pressure response to the flows is
    // carried by the stiffness damping below and by next step's re-sample.
    let mut residual = f64::INFINITY;
    let mut iterations = 0;
    let mut converged = false;
    while iterations < config.max_iterations {
        iterations += 1;

        residual = 0.0;
        for pipe in &mut work {
            let mut target = pipe.conductance.value
                * (pipe.potential_from - pipe.potential_to + pipe.head);
            target = target.clamp(-pipe.choke_limit, pipe.choke_limit);

            let next = pipe.flow + config.inner_relaxation * (target - pipe.flow);
            residual = residual.max((next - pipe.flow).abs());
            pipe.flow = next;
        }

        observer.on_iteration(&IterationEvent {
            iteration: iterations,
            residual,
            pipe_count: work.len(),
        });

        if residual <= config.tolerance {
            converged = true;
            break;
        }
    }
    if !converged {
        return Err(StepError::NotConverged {
            iterations,
            residual,
        });
    }

    // 4. Stability heuristics, then substance transport.
    let mut transported = Mass::new::<kilogram>(0.0);
    for pipe_solve in &work {
        let applied;
        {
            let Some(pipe) = pipes[pipe_solve.index].as_mut() else {
                continue;
            };

            let previous = pipe.flow_rate().value;
            let mut factor = pipe.relaxation_factor();
            let flipped = previous * pipe_solve.flow < 0.0
                && previous.abs() > OSCILLATION_FLOW_EPSILON
                && pipe_solve.flow.abs() > OSCILLATION_FLOW_EPSILON;
            if flipped && pipe_solve.conductance.value > config.high_conductance {
                factor = (factor * config.oscillation_decay).max(config.relaxation_floor);
            } else {
                factor = (factor * config.relaxation_recovery).min(1.0);
            }
            pipe.relaxation = UnitIntervalLeftOpen::new(factor)
                .unwrap_or_else(|_| UnitIntervalLeftOpen::one());

            // Proactive damping against the *receiving* side: the stiffer
            // the sink, the less of the raw flow is actually applied in one
            // step. Keeps a single step from slamming volume into a small
            // or nearly incompressible container.
            let sink_slot = if pipe_solve.flow >= 0.0 {
                pipe_solve.to_slot
            } else {
                pipe_solve.from_slot
            };
            let damping = if pipe_solve.density > 0.0 {
                let sink_response = pipe_solve.conductance.value
                    * stiffness[sink_slot]
                    * dt_seconds
                    / pipe_solve.density;
                1.0 / (1.0 + sink_response)
            } else {
                1.0
            };

            applied = pipe_solve.flow * factor * damping;
            pipe.flow_rate = MassRate::new::<kilogram_per_second>(applied);
            pipe.conductance = pipe_solve.conductance;
        }

        if applied.abs() * dt_seconds <= 0.0 {
            continue;
        }

        // Extract from the upwind side, deliver downwind: exactly what was
        // extracted is delivered, so mass is conserved by construction.
        let (source_slot, source_anchor, sink_slot) = if applied >= 0.0 {
            (
                pipe_solve.from_slot,
                pipe_solve.from_anchor,
                pipe_solve.to_slot,
            )
        } else {
            (
                pipe_solve.to_slot,
                pipe_solve.to_anchor,
                pipe_solve.from_slot,
            )
        };

        let rate = MassRate::new::<kilogram_per_second>(applied.abs());
        let moved = {
            let Some(source) = endpoints[source_slot].as_deref_mut() else {
                continue;
            };
            let mix = source.sample_substances(source_anchor, rate, dt);
            if mix.is_empty() {
                continue;
            }
            source.add_outflow(&mix);
            mix
        };
        transported += moved.total_mass();
        if let Some(sink) = endpoints[sink_slot].as_deref_mut() {
            sink.add_inflow(&moved);
        }
    }

    // 5. Every endpoint commits its accumulated flows once.
    for endpoint in endpoints.iter_mut().flatten() {
        endpoint.apply_flows(dt);
    }

    Ok(SolveOutcome {
        iterations,
        residual: MassRate::new::<kilogram_per_second>(residual),
        transported,
    })
}
