use super::swarm::Swarm;
use super::traits::{BestSolution, Objective, ResultWriter, StepEvent, StepObserver};
use crate::core::{
    Constraint, ConstraintBinding, DesignSpace, PsoConfig, SearchMethod, clamp_unit,
};
use crate::error::{PsoError, Result};
use crate::optimization::history::StepHistory;
use crate::optimization::parallel::BatchEvaluator;
use argmin_math::{ArgminAdd, ArgminL2Norm, ArgminMul, ArgminSub};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Lifecycle of a run. Everything except `Running` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Running,
    /// The front of the swarm stopped spreading out
    Converged,
    /// The step budget ran out
    Exhausted,
    /// Cancelled through a [`StopHandle`] or an observer
    Stopped,
    /// The objective or an observer failed
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Running)
    }

    /// Normal terminations are the only ones that write a result back.
    pub fn applies_best(&self) -> bool {
        matches!(self, RunState::Converged | RunState::Exhausted)
    }
}

/// Cooperative cancellation token, checked between steps.
///
/// Cloning shares the flag, so a UI thread can hold one while the run loop
/// holds another.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Summary of a finished (or interrupted) run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub state: RunState,
    pub steps: usize,
    pub compute_count: usize,
    pub best_fitness: Option<f64>,
    pub best_position: Vec<f64>,
    pub best_design: Vec<f64>,
    pub applied: bool,
    pub message: String,
}

/// Particle swarm driver over a normalized design space.
///
/// Each step scores every particle through the host [`Objective`], folds the
/// scores into personal and swarm bests, moves the particles, runs the
/// nominal-convergence test and records a history snapshot.
pub struct ParticleOptimizer<R: Rng = StdRng> {
    config: PsoConfig,
    space: DesignSpace,
    swarm: Swarm,
    history: StepHistory,
    constraint: Option<ConstraintBinding>,
    evaluator: BatchEvaluator,
    rng: R,
    // Position and fitness each particle had before its last move
    prior: Vec<(Vec<f64>, Option<f64>)>,
    step: usize,
    outside_step_counter: usize,
    compute_counter: usize,
    converged: bool,
    state: RunState,
    applied: bool,
    stop: StopHandle,
}

impl ParticleOptimizer<StdRng> {
    /// Seeded from `config.seed`, or from OS entropy when no seed is set.
    pub fn new(config: PsoConfig, space: DesignSpace) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, space, rng)
    }
}

impl<R: Rng> ParticleOptimizer<R> {
    pub fn with_rng(config: PsoConfig, space: DesignSpace, mut rng: R) -> Result<Self> {
        config.validate()?;
        if space.is_empty() {
            return Err(PsoError::config("design_space", "needs at least one variable"));
        }
        let swarm = Swarm::new(config.swarm_size, space.dimension(), &mut rng)?;
        let history = StepHistory::new(config.max_steps, swarm.best_position());
        let evaluator = BatchEvaluator::new(config.parallel.clone())?;
        let prior = Self::snapshot_prior(&swarm);

        Ok(Self {
            config,
            space,
            swarm,
            history,
            constraint: None,
            evaluator,
            rng,
            prior,
            step: 0,
            outside_step_counter: 0,
            compute_counter: 0,
            converged: false,
            state: RunState::Running,
            applied: false,
            stop: StopHandle::new(),
        })
    }

    /// Reject candidates whose design-unit coordinates `(x_index, y_index)` fall outside `constraint`.
    pub fn with_constraint(
        self,
        constraint: impl Constraint + 'static,
        x_index: usize,
        y_index: usize,
    ) -> Result<Self> {
        self.with_constraint_binding(ConstraintBinding::new(Arc::new(constraint), x_index, y_index))
    }

    pub fn with_constraint_binding(mut self, binding: ConstraintBinding) -> Result<Self> {
        self.set_constraint(binding)?;
        Ok(self)
    }

    pub fn set_constraint(&mut self, binding: ConstraintBinding) -> Result<()> {
        binding.validate(self.space.dimension())?;
        self.constraint = Some(binding);
        Ok(())
    }

    /// Start from a recorded swarm instead of a random one (replay, undo).
    ///
    /// Only allowed before the first step. Coordinates outside `[0, 1)` are
    /// clamped, since snapshots may come from edited or foreign JSON.
    pub fn restore_swarm(&mut self, mut swarm: Swarm) -> Result<()> {
        if self.step > 0 {
            return Err(PsoError::config("swarm", "cannot replace the swarm of a run in progress"));
        }
        if swarm.dimension() != self.space.dimension() {
            return Err(PsoError::DimensionMismatch {
                expected: self.space.dimension(),
                got: swarm.dimension(),
            });
        }
        if swarm.size() != self.config.swarm_size {
            return Err(PsoError::config(
                "swarm_size",
                format!("restored swarm has {} particles, run expects {}", swarm.size(), self.config.swarm_size),
            ));
        }
        swarm.clamp_to_unit();
        self.history = StepHistory::new(self.config.max_steps, swarm.best_position());
        self.prior = Self::snapshot_prior(&swarm);
        self.swarm = swarm;
        Ok(())
    }

    fn snapshot_prior(swarm: &Swarm) -> Vec<(Vec<f64>, Option<f64>)> {
        swarm
            .particles()
            .iter()
            .map(|p| (p.position().to_vec(), p.fitness()))
            .collect()
    }

    pub fn config(&self) -> &PsoConfig {
        &self.config
    }

    pub fn design_space(&self) -> &DesignSpace {
        &self.space
    }

    pub fn swarm(&self) -> &Swarm {
        &self.swarm
    }

    pub fn history(&self) -> &StepHistory {
        &self.history
    }

    /// Current state; a pending stop request already reads as `Stopped`.
    pub fn state(&self) -> RunState {
        if self.stop_pending() {
            RunState::Stopped
        } else {
            self.state
        }
    }

    /// Number of completed steps
    pub fn steps(&self) -> usize {
        self.step
    }

    pub fn outside_step_counter(&self) -> usize {
        self.outside_step_counter
    }

    /// Total objective evaluations so far
    pub fn compute_counter(&self) -> usize {
        self.compute_counter
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Request cancellation.
    ///
    /// A step already in progress finishes, no further step runs and the
    /// best result is never written back.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn should_terminate(&self) -> bool {
        self.outside_step_counter >= self.config.max_steps
    }

    pub fn best_solution(&self) -> Result<BestSolution> {
        Ok(BestSolution {
            position: self.swarm.best_position().to_vec(),
            design: self.space.to_design(self.swarm.best_position())?,
            fitness: self.swarm.best_fitness(),
        })
    }

    /// Run a single generation.
    ///
    /// Does nothing once the run is terminal. A pending stop request turns
    /// the run into [`RunState::Stopped`] without executing the step. Any
    /// error aborts the run; history up to the last completed step stays
    /// readable.
    pub fn step<O>(&mut self, objective: &O) -> Result<RunState>
    where
        O: Objective + ?Sized,
    {
        if self.observe_stop() || self.state.is_terminal() {
            return Ok(self.state);
        }
        if let Err(e) = self.advance(objective) {
            self.state = RunState::Aborted;
            warn!(step = self.step + 1, error = %e, "particle swarm step failed");
            return Err(e);
        }
        Ok(self.state)
    }

    /// Turn a pending stop request into [`RunState::Stopped`].
    ///
    /// Applies to any state except `Aborted`, and only until the best
    /// result has been written back.
    fn observe_stop(&mut self) -> bool {
        if !self.stop_pending() {
            return false;
        }
        if self.state != RunState::Stopped {
            self.state = RunState::Stopped;
            info!(step = self.step, "particle swarm run stopped");
        }
        true
    }

    fn stop_pending(&self) -> bool {
        self.stop.is_stopped() && !self.applied && self.state != RunState::Aborted
    }

    fn advance<O>(&mut self, objective: &O) -> Result<()>
    where
        O: Objective + ?Sized,
    {
        let step = self.step + 1;

        let mut jobs = Vec::with_capacity(self.swarm.size());
        for index in 0..self.swarm.size() {
            if let Some(design) = self.feasible_design(index)? {
                jobs.push((index, design));
            }
        }

        let scores = self.evaluator.evaluate(objective, &jobs)?;
        self.compute_counter += scores.len();
        let particles = self.swarm.particles_mut();
        for (index, fitness) in scores {
            particles[index].set_fitness(fitness);
        }

        let improved = self.swarm.update_bests()?;
        self.move_particles();

        let nominal = self
            .swarm
            .is_nominally_converged(self.config.convergence_threshold);
        if nominal {
            self.outside_step_counter = 0;
            self.converged = true;
        } else {
            self.outside_step_counter += 1;
        }

        self.history.record(&self.swarm)?;
        self.step = step;

        self.state = if self.converged {
            RunState::Converged
        } else if self.should_terminate() || self.step >= self.config.max_steps {
            RunState::Exhausted
        } else {
            RunState::Running
        };

        debug!(
            step,
            evaluations = jobs.len(),
            best_fitness = ?self.swarm.best_fitness(),
            improved,
            nominal,
            outside_step_counter = self.outside_step_counter,
            "particle swarm step"
        );
        Ok(())
    }

    /// Design-unit point to evaluate for particle `index`, resampling if the
    /// constraint rejects it. `None` means every retry failed and the particle
    /// was put back where it was before its last move.
    fn feasible_design(&mut self, index: usize) -> Result<Option<Vec<f64>>> {
        let design = self
            .space
            .to_design(self.swarm.particles()[index].position())?;
        let Some(binding) = &self.constraint else {
            return Ok(Some(design));
        };
        if binding.accepts(&design) {
            return Ok(Some(design));
        }

        let dimension = self.space.dimension();
        for _ in 0..self.config.resample_attempts {
            let candidate: Vec<f64> = (0..dimension)
                .map(|_| self.rng.gen_range(0.0..1.0))
                .collect();
            let design = self.space.to_design(&candidate)?;
            if binding.accepts(&design) {
                self.swarm.particles_mut()[index].relocate(&candidate);
                return Ok(Some(design));
            }
        }

        let (position, fitness) = &self.prior[index];
        self.swarm.particles_mut()[index].restore(position, *fitness);
        warn!(
            particle = index,
            attempts = self.config.resample_attempts,
            "no feasible position found, keeping prior position"
        );
        Ok(None)
    }

    fn move_particles(&mut self) {
        let w = self.config.inertia;
        let c1 = self.config.cognitive;
        let c2 = self.config.social;
        let limit = self.config.velocity_limit;
        let radius = self.config.local_search_radius;
        let method = self.config.search_method;

        // Swarm best is only a valid attractor once something has been scored
        let swarm_best = self
            .swarm
            .best_fitness()
            .map(|_| self.swarm.best_position().to_vec());

        let rng = &mut self.rng;
        for (particle, prior) in self
            .swarm
            .particles_mut()
            .iter_mut()
            .zip(self.prior.iter_mut())
        {
            *prior = (particle.position().to_vec(), particle.fitness());
            let (position, velocity, personal_best) = particle.parts_mut();

            for d in 0..position.len() {
                let r1: f64 = rng.gen_range(0.0..1.0);
                let r2: f64 = rng.gen_range(0.0..1.0);
                let social = swarm_best
                    .as_ref()
                    .map_or(0.0, |best| c2 * r2 * (best[d] - position[d]));

                // PSO velocity update equation
                let mut v = w * velocity[d] + c1 * r1 * (personal_best[d] - position[d]) + social;
                if let Some(limit) = limit {
                    v = v.clamp(-limit, limit);
                }
                velocity[d] = v;
            }

            match method {
                SearchMethod::GlobalSearchUniformSelection => {
                    for (x, v) in position.iter_mut().zip(velocity.iter()) {
                        *x = clamp_unit(*x + *v);
                    }
                }
                SearchMethod::LocalSearch => {
                    let limited = limit_norm(velocity.to_vec(), radius);
                    velocity.copy_from_slice(&limited);
                    let proposed = local_step(position, &limited, swarm_best.as_deref(), radius);
                    for (x, p) in position.iter_mut().zip(proposed) {
                        *x = clamp_unit(p);
                    }
                }
            }
        }
    }

    fn event(&self) -> StepEvent {
        StepEvent {
            step: self.step,
            best_fitness: self.swarm.best_fitness(),
            best_position: self.swarm.best_position().to_vec(),
            nominally_converged: self.outside_step_counter == 0 && self.step > 0,
            outside_step_counter: self.outside_step_counter,
            compute_counter: self.compute_counter,
        }
    }

    /// Drive the run to a terminal state.
    ///
    /// On `Converged`/`Exhausted` the best result is written back through
    /// `writer` exactly once. Stopped runs never call the writer; failed
    /// runs return the error with the partial history intact.
    pub fn run<O, W>(
        &mut self,
        objective: &O,
        writer: &mut W,
        observer: &mut dyn StepObserver,
    ) -> Result<OptimizationReport>
    where
        O: Objective + ?Sized,
        W: ResultWriter + ?Sized,
    {
        info!(
            swarm_size = self.config.swarm_size,
            dimension = self.space.dimension(),
            max_steps = self.config.max_steps,
            search_method = ?self.config.search_method,
            parallel = self.evaluator.is_parallel(),
            "starting particle swarm run"
        );

        while !self.state.is_terminal() {
            if observer.should_stop() {
                self.stop.stop();
            }
            if self.step(objective)? == RunState::Stopped {
                break;
            }
            if let Err(message) = observer.on_step(&self.event()) {
                self.state = RunState::Aborted;
                return Err(PsoError::Observer(message));
            }
        }

        if observer.should_stop() {
            self.stop.stop();
        }
        self.observe_stop();
        if self.state.applies_best() && !self.applied {
            self.apply_best(writer)?;
        }

        let report = self.report()?;
        info!(
            state = ?report.state,
            steps = report.steps,
            evaluations = report.compute_count,
            best_fitness = ?report.best_fitness,
            "particle swarm run finished"
        );
        Ok(report)
    }

    /// Write the swarm best into the host model. Allowed once, after a normal termination.
    pub fn apply_best<W>(&mut self, writer: &mut W) -> Result<()>
    where
        W: ResultWriter + ?Sized,
    {
        self.observe_stop();
        if !self.state.applies_best() {
            return Err(PsoError::NotTerminated(self.state));
        }
        if self.applied {
            return Err(PsoError::AlreadyApplied);
        }
        let best = self.best_solution()?;
        writer.apply_best(&best).map_err(PsoError::ApplyBest)?;
        self.applied = true;
        info!(best_fitness = ?best.fitness, design = ?best.design, "applied best result");
        Ok(())
    }

    pub fn report(&self) -> Result<OptimizationReport> {
        let best = self.best_solution()?;
        let state = self.state();
        let message = match state {
            RunState::Running => "Running",
            RunState::Converged => "Converged",
            RunState::Exhausted => "Max steps reached",
            RunState::Stopped => "Stopped by caller",
            RunState::Aborted => "Aborted",
        };
        Ok(OptimizationReport {
            state,
            steps: self.step,
            compute_count: self.compute_counter,
            best_fitness: best.fitness,
            best_position: best.position,
            best_design: best.design,
            applied: self.applied,
            message: message.into(),
        })
    }
}

/// Scale `v` down so its Euclidean length is at most `radius`.
fn limit_norm(v: Vec<f64>, radius: f64) -> Vec<f64> {
    let norm = <Vec<f64> as ArgminL2Norm<f64>>::l2_norm(&v);
    if norm > radius {
        <Vec<f64> as ArgminMul<f64, Vec<f64>>>::mul(&v, &(radius / norm))
    } else {
        v
    }
}

/// `position + step`, pulled back into the ball of `radius` around the swarm best.
fn local_step(position: &[f64], step: &[f64], swarm_best: Option<&[f64]>, radius: f64) -> Vec<f64> {
    let proposed =
        <Vec<f64> as ArgminAdd<Vec<f64>, Vec<f64>>>::add(&position.to_vec(), &step.to_vec());
    let Some(best) = swarm_best else {
        return proposed;
    };
    let best = best.to_vec();
    let offset = <Vec<f64> as ArgminSub<Vec<f64>, Vec<f64>>>::sub(&proposed, &best);
    let limited = limit_norm(offset, radius);
    <Vec<f64> as ArgminAdd<Vec<f64>, Vec<f64>>>::add(&best, &limited)
}
