/// Snapshot of one solver iteration, emitted to the step observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationEvent {
    /// Iteration counter, 1-based within the step.
    pub iteration: usize,
    /// Largest per-pipe flow change this iteration, kg/s.
    pub residual: f64,
    /// Number of live pipes being solved.
    pub pipe_count: usize,
}

/// Passive observer of solver iterations.
///
/// Observers monitor convergence (logging, instrumentation, test probes)
/// but cannot steer the solve: a step must run to completion or fail, so
/// mass accounting stays exact. `()` is the no-op observer.
pub trait StepObserver {
    fn on_iteration(&mut self, _event: &IterationEvent) {}
}

/// The no-op observer.
impl StepObserver for () {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Vec<usize>,
    }

    impl StepObserver for Recorder {
        fn on_iteration(&mut self, event: &IterationEvent) {
            self.seen.push(event.iteration);
        }
    }

    #[test]
    fn observers_receive_events() {
        let mut recorder = Recorder { seen: Vec::new() };
        recorder.on_iteration(&IterationEvent {
            iteration: 1,
            residual: 0.5,
            pipe_count: 2,
        });
        recorder.on_iteration(&IterationEvent {
            iteration: 2,
            residual: 0.1,
            pipe_count: 2,
        });

        assert_eq!(recorder.seen, vec![1, 2]);
    }

    #[test]
    fn unit_observer_is_a_no_op() {
        ().on_iteration(&IterationEvent {
            iteration: 1,
            residual: 0.0,
            pipe_count: 0,
        });
    }
}
