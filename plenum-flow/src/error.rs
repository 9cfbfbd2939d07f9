use thiserror::Error;

/// Errors that can occur while building or patching a network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A full retry pass completed without any participant finishing.
    ///
    /// Every stuck participant is waiting on something that will never
    /// appear; the network is not built.
    #[error("network build deadlocked; stuck participants: {stuck:?}")]
    Deadlock { stuck: Vec<String> },

    /// A participant reported an unrecoverable build failure.
    #[error("participant `{name}` failed to build: {reason}")]
    ParticipantFailed { name: String, reason: String },

    /// A pipe spec failed validation.
    #[error("invalid pipe: {reason}")]
    InvalidPipe { reason: &'static str },

    /// A pipe referenced an endpoint slot that is not registered.
    #[error("pipe references missing endpoint slot {index}")]
    UnknownEndpoint { index: usize },
}

/// Errors that can occur during a solver step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    /// The iteration budget ran out before the flows settled.
    ///
    /// This is a simulation-integrity failure: callers must not retry
    /// silently. The network marks itself diverged.
    #[error(
        "solver failed to converge after {iterations} iterations \
         (residual {residual} kg/s)"
    )]
    NotConverged { iterations: usize, residual: f64 },

    /// The network diverged on an earlier step and must be rebuilt.
    #[error("network has diverged; rebuild it before stepping again")]
    Diverged,

    /// The solver configuration failed validation.
    #[error("invalid solver config: {reason}")]
    InvalidConfig { reason: &'static str },

    /// Patching stale participants back in failed.
    #[error("topology patch failed")]
    Patch(#[from] BuildError),
}
