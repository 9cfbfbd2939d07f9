use plenum_thermo::capability::FlowEndpoint;

use crate::{
    config::SolverConfig,
    error::BuildError,
    handle::{EndpointId, FlowRef, OwnerId, PipeId},
    network::{FlowArena, Network},
    pipe::{Pipe, PipeSpec},
};

/// What a participant reports back from one build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// All of this participant's flow objects are registered.
    Finished,
    /// A dependency (typically a sibling's endpoint) is not registered
    /// yet; invoke again on a later pass.
    Retry,
    /// Unrecoverable failure; the whole build aborts.
    Failed(String),
}

/// An external component that contributes flow objects to the network.
///
/// Participants are handed to [`build_network`] as a flat list — there is
/// no scene walk or reflective discovery. Each registers its endpoints and
/// pipes under its own [`OwnerId`] and resolves siblings through the
/// builder's owner lookup, in any build order, returning
/// [`BuildOutcome::Retry`] until its dependencies appear.
pub trait Participant {
    /// Display name, used in build diagnostics.
    fn name(&self) -> &str;

    /// The owner key this participant registers its flow objects under.
    fn owner(&self) -> OwnerId;

    /// Registers (or re-registers, after a transaction) flow objects.
    fn build(&mut self, builder: &mut NetworkBuilder<'_>) -> BuildOutcome;

    /// Reports whether this participant's registered objects still reflect
    /// reality. A `false` makes the next step patch it out and in again.
    fn is_valid(&self, _network: &Network) -> bool {
        true
    }

    /// Receives the converged network after each step. Failures here are
    /// isolated per participant: they are logged and do not abort the
    /// others.
    ///
    /// # Errors
    ///
    /// Any error is reported via `log::warn!` by the caller.
    fn apply(&mut self, _network: &Network) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}

/// Registration surface handed to participants during build passes.
pub struct NetworkBuilder<'a> {
    pub(crate) arena: &'a mut FlowArena,
}

impl NetworkBuilder<'_> {
    /// Registers a flow endpoint under `owner` and returns its handle.
    pub fn add_endpoint(
        &mut self,
        owner: OwnerId,
        endpoint: Box<dyn FlowEndpoint>,
    ) -> EndpointId {
        self.arena.add_endpoint(owner, endpoint)
    }

    /// Registers a pipe under `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidPipe`] for degenerate geometry and
    /// [`BuildError::UnknownEndpoint`] when a port references an endpoint
    /// that is not (or no longer) registered.
    pub fn add_pipe(&mut self, owner: OwnerId, spec: PipeSpec) -> Result<PipeId, BuildError> {
        spec.validate()
            .map_err(|reason| BuildError::InvalidPipe { reason })?;
        for port in [spec.from, spec.to] {
            if !self.arena.has_endpoint(port.endpoint) {
                return Err(BuildError::UnknownEndpoint {
                    index: port.endpoint.index(),
                });
            }
        }
        Ok(self.arena.add_pipe(owner, Pipe::new(spec)))
    }

    /// The first endpoint registered by `owner`, if any.
    ///
    /// This is how a pipe participant finds the tank port it connects to,
    /// regardless of build order.
    #[must_use]
    pub fn endpoint_of(&self, owner: OwnerId) -> Option<EndpointId> {
        self.arena.flows_of(owner).iter().find_map(|flow| match flow {
            FlowRef::Endpoint(id) => Some(*id),
            FlowRef::Pipe(_) => None,
        })
    }

    /// Every flow object registered by `owner`, in registration order.
    #[must_use]
    pub fn flows_of(&self, owner: OwnerId) -> &[FlowRef] {
        self.arena.flows_of(owner)
    }
}

/// Builds a network by driving all participants to a fixed point.
///
/// Participants reporting [`BuildOutcome::Retry`] are re-invoked in
/// subsequent passes until all finish. A pass in which nobody finishes is a
/// deadlock: every remaining participant is waiting on something that will
/// never appear.
///
/// # Errors
///
/// - [`BuildError::Deadlock`] with the stuck participants' names.
/// - [`BuildError::ParticipantFailed`] when one reports failure.
/// - The config and pipe validation errors surfaced through registration.
pub fn build_network(
    participants: &mut [Box<dyn Participant>],
    config: SolverConfig,
) -> Result<Network, BuildError> {
    let mut arena = FlowArena::default();
    drive_to_fixed_point(&mut arena, participants, &(0..participants.len()).collect::<Vec<_>>())?;
    Ok(Network::from_arena(arena, config))
}

/// Worklist retry loop shared by the initial build and transactions.
pub(crate) fn drive_to_fixed_point(
    arena: &mut FlowArena,
    participants: &mut [Box<dyn Participant>],
    indices: &[usize],
) -> Result<(), BuildError> {
    let mut pending: Vec<usize> = indices.to_vec();

    while !pending.is_empty() {
        let mut still_pending = Vec::new();
        let mut progressed = false;

        for &index in &pending {
            let mut builder = NetworkBuilder {
                arena: &mut *arena,
            };
            match participants[index].build(&mut builder) {
                BuildOutcome::Finished => progressed = true,
                BuildOutcome::Retry => still_pending.push(index),
                BuildOutcome::Failed(reason) => {
                    return Err(BuildError::ParticipantFailed {
                        name: participants[index].name().to_string(),
                        reason,
                    });
                }
            }
        }

        if !progressed {
            return Err(BuildError::Deadlock {
                stuck: still_pending
                    .iter()
                    .map(|&i| participants[i].name().to_string())
                    .collect(),
            });
        }
        pending = still_pending;
    }
    Ok(())
}
