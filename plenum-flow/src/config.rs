/// Tuning for the network solver and its stability heuristics.
///
/// The defaults are tuned for fixed timesteps in the 10–100 ms range with
/// tank-scale containers. The heuristics themselves (oscillation decay,
/// stiffness damping) are structural; only the constants are adjustable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Iteration budget per step. Exhausting it is a fatal step error.
    pub max_iterations: usize,
    /// Convergence threshold on the largest per-pipe flow change, kg/s.
    pub tolerance: f64,
    /// Under-relaxation applied inside the fixed-point iteration, `(0, 1]`.
    pub inner_relaxation: f64,
    /// Factor applied to a pipe's learned relaxation when its flow sign
    /// flips under high conductance, `(0, 1)`.
    pub oscillation_decay: f64,
    /// Lower bound for the learned relaxation factor, `(0, 1]`.
    pub relaxation_floor: f64,
    /// Recovery multiplier applied on quiet steps (capped at 1), `≥ 1`.
    pub relaxation_recovery: f64,
    /// Conductance above which a sign flip counts as oscillation, kg·s/m².
    pub high_conductance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-9,
            inner_relaxation: 0.5,
            oscillation_decay: 0.5,
            relaxation_floor: 1e-3,
            relaxation_recovery: 1.05,
            high_conductance: 1e-2,
        }
    }
}

impl SolverConfig {
    /// Validates all knobs.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_iterations == 0 {
            return Err("max_iterations must be at least 1");
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err("tolerance must be finite and positive");
        }
        if !self.inner_relaxation.is_finite()
            || self.inner_relaxation <= 0.0
            || self.inner_relaxation > 1.0
        {
            return Err("inner_relaxation must lie in (0, 1]");
        }
        if !self.oscillation_decay.is_finite()
            || self.oscillation_decay <= 0.0
            || self.oscillation_decay >= 1.0
        {
            return Err("oscillation_decay must lie in (0, 1)");
        }
        if !self.relaxation_floor.is_finite()
            || self.relaxation_floor <= 0.0
            || self.relaxation_floor > 1.0
        {
            return Err("relaxation_floor must lie in (0, 1]");
        }
        if !self.relaxation_recovery.is_finite() || self.relaxation_recovery < 1.0 {
            return Err("relaxation_recovery must be at least 1");
        }
        if !self.high_conductance.is_finite() || self.high_conductance <= 0.0 {
            return Err("high_conductance must be finite and positive");
        }
        Ok(())
    }
}
