use std::collections::HashMap;

use plenum_thermo::capability::FlowEndpoint;
use uom::si::f64::{Mass, MassRate, Time};

use crate::{
    builder::{Participant, drive_to_fixed_point},
    config::SolverConfig,
    error::StepError,
    event::StepObserver,
    handle::{EndpointId, FlowRef, OwnerId, PipeId},
    pipe::Pipe,
    solver,
};

/// Slot arenas holding every registered flow object plus the owner map.
///
/// Slots are `Option`s so handles stay stable across transactional
/// removal; freed slots are reused by later registrations.
#[derive(Default)]
pub(crate) struct FlowArena {
    pub(crate) endpoints: Vec<Option<Box<dyn FlowEndpoint>>>,
    pub(crate) pipes: Vec<Option<Pipe>>,
    owners: HashMap<OwnerId, Vec<FlowRef>>,
}

impl FlowArena {
    pub(crate) fn add_endpoint(
        &mut self,
        owner: OwnerId,
        endpoint: Box<dyn FlowEndpoint>,
    ) -> EndpointId {
        let id = match self.endpoints.iter().position(Option::is_none) {
            Some(free) => {
                self.endpoints[free] = Some(endpoint);
                EndpointId(free)
            }
            None => {
                self.endpoints.push(Some(endpoint));
                EndpointId(self.endpoints.len() - 1)
            }
        };
        self.owners.entry(owner).or_default().push(FlowRef::Endpoint(id));
        id
    }

    pub(crate) fn add_pipe(&mut self, owner: OwnerId, pipe: Pipe) -> PipeId {
        let id = match self.pipes.iter().position(Option::is_none) {
            Some(free) => {
                self.pipes[free] = Some(pipe);
                PipeId(free)
            }
            None => {
                self.pipes.push(Some(pipe));
                PipeId(self.pipes.len() - 1)
            }
        };
        self.owners.entry(owner).or_default().push(FlowRef::Pipe(id));
        id
    }

    pub(crate) fn has_endpoint(&self, id: EndpointId) -> bool {
        self.endpoints.get(id.0).is_some_and(Option::is_some)
    }

    pub(crate) fn flows_of(&self, owner: OwnerId) -> &[FlowRef] {
        self.owners.get(&owner).map_or(&[], Vec::as_slice)
    }

    /// Clears every slot registered by `owner`.
    fn remove_owner(&mut self, owner: OwnerId) {
        let Some(flows) = self.owners.remove(&owner) else {
            return;
        };
        for flow in flows {
            match flow {
                FlowRef::Endpoint(id) => self.endpoints[id.0] = None,
                FlowRef::Pipe(id) => self.pipes[id.0] = None,
            }
        }
    }

    /// Drops pipes whose ports reference cleared endpoint slots, pruning
    /// the owner map to match.
    fn remove_dangling_pipes(&mut self) {
        let mut removed: Vec<PipeId> = Vec::new();
        for (index, slot) in self.pipes.iter_mut().enumerate() {
            let dangling = slot.as_ref().is_some_and(|pipe| {
                self.endpoints
                    .get(pipe.from.endpoint.0)
                    .is_none_or(Option::is_none)
                    || self
                        .endpoints
                        .get(pipe.to.endpoint.0)
                        .is_none_or(Option::is_none)
            });
            if dangling {
                *slot = None;
                removed.push(PipeId(index));
            }
        }
        if !removed.is_empty() {
            for flows in self.owners.values_mut() {
                flows.retain(|flow| match flow {
                    FlowRef::Pipe(id) => !removed.contains(id),
                    FlowRef::Endpoint(_) => true,
                });
            }
        }
    }
}

/// Solver lifecycle of a network snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// Built or patched, not yet stepped.
    Uninitialized,
    /// The last step converged.
    Converged,
    /// A step exhausted its iteration budget; the snapshot is dead.
    Diverged,
}

/// What a converged step did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Iterations used by the fixed-point solve.
    pub iterations: usize,
    /// Largest per-pipe flow change at convergence.
    pub residual: MassRate,
    /// Total mass moved through pipes this step.
    pub transported: Mass,
}

/// A frozen network topology plus the per-pipe solver state.
///
/// Built by [`crate::build_network`], advanced by [`Self::step`], and
/// patched in place by transactions when participants report themselves
/// stale.
pub struct Network {
    arena: FlowArena,
    config: SolverConfig,
    /// Pipes whose `from` port touches each endpoint slot.
    outbound: Vec<Vec<PipeId>>,
    /// Pipes whose `to` port touches each endpoint slot.
    inbound: Vec<Vec<PipeId>>,
    status: NetworkStatus,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Network {
    pub(crate) fn from_arena(arena: FlowArena, config: SolverConfig) -> Self {
        let mut network = Self {
            arena,
            config,
            outbound: Vec::new(),
            inbound: Vec::new(),
            status: NetworkStatus::Uninitialized,
        };
        network.rebuild_tables();
        network
    }

    fn rebuild_tables(&mut self) {
        let slots = self.arena.endpoints.len();
        self.outbound = vec![Vec::new(); slots];
        self.inbound = vec![Vec::new(); slots];
        for (index, slot) in self.arena.pipes.iter().enumerate() {
            if let Some(pipe) = slot {
                self.outbound[pipe.from.endpoint.0].push(PipeId(index));
                self.inbound[pipe.to.endpoint.0].push(PipeId(index));
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> NetworkStatus {
        self.status
    }

    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Live endpoint count.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.arena.endpoints.iter().flatten().count()
    }

    /// Live pipe count.
    #[must_use]
    pub fn pipe_count(&self) -> usize {
        self.arena.pipes.iter().flatten().count()
    }

    #[must_use]
    pub fn pipe(&self, id: PipeId) -> Option<&Pipe> {
        self.arena.pipes.get(id.0)?.as_ref()
    }

    /// Mutable pipe access, for head-added adjustments between steps.
    #[must_use]
    pub fn pipe_mut(&mut self, id: PipeId) -> Option<&mut Pipe> {
        self.arena.pipes.get_mut(id.0)?.as_mut()
    }

    #[must_use]
    pub fn endpoint(&self, id: EndpointId) -> Option<&dyn FlowEndpoint> {
        self.arena.endpoints.get(id.0)?.as_deref()
    }

    #[must_use]
    pub fn endpoint_mut(&mut self, id: EndpointId) -> Option<&mut dyn FlowEndpoint> {
        match self.arena.endpoints.get_mut(id.0) {
            Some(Some(endpoint)) => Some(endpoint.as_mut()),
            _ => None,
        }
    }

    /// Pipes whose nominal `from` port touches this endpoint.
    #[must_use]
    pub fn pipes_out_of(&self, id: EndpointId) -> &[PipeId] {
        self.outbound.get(id.0).map_or(&[], Vec::as_slice)
    }

    /// Pipes whose nominal `to` port touches this endpoint.
    #[must_use]
    pub fn pipes_into(&self, id: EndpointId) -> &[PipeId] {
        self.inbound.get(id.0).map_or(&[], Vec::as_slice)
    }

    /// Every flow object registered by `owner`.
    #[must_use]
    pub fn flows_of(&self, owner: OwnerId) -> &[FlowRef] {
        self.arena.flows_of(owner)
    }

    /// Advances the network one tick without observation.
    ///
    /// # Errors
    ///
    /// See [`Self::step_observed`].
    pub fn step(
        &mut self,
        dt: Time,
        participants: &mut [Box<dyn Participant>],
    ) -> Result<StepReport, StepError> {
        self.step_observed(dt, participants, &mut ())
    }

    /// Advances the network one tick.
    ///
    /// Stale participants (per their validity contract) are patched out
    /// and in first. The solver then iterates pipe flows to equilibrium,
    /// transports substances, commits endpoint flows, and finally invokes
    /// every participant's apply callback — failures there are logged and
    /// isolated, never propagated.
    ///
    /// # Errors
    ///
    /// - [`StepError::Diverged`] if a previous step already failed.
    /// - [`StepError::NotConverged`] if the iteration budget runs out; the
    ///   network marks itself diverged.
    /// - [`StepError::Patch`] if re-building a stale participant fails.
    pub fn step_observed(
        &mut self,
        dt: Time,
        participants: &mut [Box<dyn Participant>],
        observer: &mut dyn StepObserver,
    ) -> Result<StepReport, StepError> {
        if self.status == NetworkStatus::Diverged {
            return Err(StepError::Diverged);
        }
        self.config
            .validate()
            .map_err(|reason| StepError::InvalidConfig { reason })?;

        let stale: Vec<usize> = participants
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_valid(self))
            .map(|(i, _)| i)
            .collect();
        if !stale.is_empty() {
            self.apply_transaction(participants, &stale)?;
        }

        let outcome = match solver::solve_step(&mut self.arena, &self.config, dt, observer) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.status = NetworkStatus::Diverged;
                return Err(err);
            }
        };
        self.status = NetworkStatus::Converged;

        for participant in participants.iter_mut() {
            if let Err(err) = participant.apply(self) {
                log::warn!(
                    "participant `{}` failed to apply snapshot: {err}",
                    participant.name()
                );
            }
        }

        log::debug!(
            "network step converged in {} iterations (residual {:?})",
            outcome.iterations,
            outcome.residual
        );

        Ok(StepReport {
            iterations: outcome.iterations,
            residual: outcome.residual,
            transported: outcome.transported,
        })
    }

    /// Patches individual flow objects out of and back into the topology
    /// without a full rebuild.
    ///
    /// The listed participants' flow objects are removed (pipes left
    /// dangling by a removed endpoint go with them), then the participants
    /// re-register through the usual retry loop.
    ///
    /// # Errors
    ///
    /// The same deadlock/failure errors as [`crate::build_network`].
    pub fn apply_transaction(
        &mut self,
        participants: &mut [Box<dyn Participant>],
        stale: &[usize],
    ) -> Result<(), StepError> {
        for &index in stale {
            self.arena.remove_owner(participants[index].owner());
        }
        self.arena.remove_dangling_pipes();

        drive_to_fixed_point(&mut self.arena, participants, stale)?;

        self.rebuild_tables();
        self.status = NetworkStatus::Uninitialized;
        Ok(())
    }
}
