use serde::{Deserialize, Serialize};

/// Fitness callback supplied by the host.
///
/// Higher fitness is better. Minimizing objectives should be wrapped in
/// [`Negated`](crate::Negated) or negate their own return value.
pub trait Objective: Sync {
    /// Evaluate fitness for a position given in design units (runs the host simulation).
    ///
    /// Calls within one step may run concurrently and in any order.
    fn fitness(&self, design: &[f64]) -> Result<f64, String>;
}

/// The winning configuration of a run, handed to the host exactly once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestSolution {
    /// Best position in normalized `[0, 1)` coordinates
    pub position: Vec<f64>,
    /// Same position in design units
    pub design: Vec<f64>,
    /// `None` only if no particle could ever be evaluated
    pub fitness: Option<f64>,
}

/// Writes the optimizer's result back into the host design model.
pub trait ResultWriter {
    fn apply_best(&mut self, best: &BestSolution) -> Result<(), String>;
}

/// Observer notified after every completed step.
pub trait StepObserver {
    /// Called once per step with a summary of the swarm
    fn on_step(&mut self, event: &StepEvent) -> Result<(), String>;

    /// Check if optimization should stop before the next step
    fn should_stop(&self) -> bool {
        false
    }
}

/// Progress summary emitted after a step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// 1-based step number
    pub step: usize,
    pub best_fitness: Option<f64>,
    pub best_position: Vec<f64>,
    pub nominally_converged: bool,
    pub outside_step_counter: usize,
    pub compute_counter: usize,
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> Result<f64, String> + Sync,
{
    fn fitness(&self, design: &[f64]) -> Result<f64, String> {
        self(design)
    }
}

impl<F> ResultWriter for F
where
    F: FnMut(&BestSolution) -> Result<(), String>,
{
    fn apply_best(&mut self, best: &BestSolution) -> Result<(), String> {
        self(best)
    }
}
