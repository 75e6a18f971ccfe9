use crate::core::ParallelConfig;
use crate::error::{PsoError, Result};
use crate::optimization::solvers::traits::Objective;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Fans a step's evaluations out and joins them before returning.
///
/// Without an explicit thread count the batch runs on rayon's global pool;
/// `num_threads: Some(n)` gets a dedicated pool of `n` workers.
pub struct BatchEvaluator {
    config: ParallelConfig,
    parallel: bool,
    pool: Option<ThreadPool>,
}

impl BatchEvaluator {
    pub fn new(config: ParallelConfig) -> Result<Self> {
        let parallel = config.enabled && config.effective_threads() > 1;
        let pool = match config.num_threads {
            Some(threads) if parallel => Some(
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("designswarm-eval-{i}"))
                    .build()
                    .map_err(|e| PsoError::config("parallel", e.to_string()))?,
            ),
            _ => None,
        };
        Ok(Self {
            config,
            parallel,
            pool,
        })
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    fn evaluate_all<O>(objective: &O, jobs: &[(usize, Vec<f64>)]) -> Vec<(usize, std::result::Result<f64, String>)>
    where
        O: Objective + ?Sized,
    {
        jobs.par_iter()
            .map(|(index, design)| (*index, objective.fitness(design)))
            .collect()
    }

    /// Evaluate every `(particle index, design point)` job.
    ///
    /// All jobs run to completion; the first failure in job order is
    /// returned after the batch has been joined.
    pub fn evaluate<O>(&self, objective: &O, jobs: &[(usize, Vec<f64>)]) -> Result<Vec<(usize, f64)>>
    where
        O: Objective + ?Sized,
    {
        let fan_out = self.parallel && jobs.len() >= self.config.min_batch;
        let raw: Vec<(usize, std::result::Result<f64, String>)> = match &self.pool {
            Some(pool) if fan_out => pool.install(|| Self::evaluate_all(objective, jobs)),
            None if fan_out => Self::evaluate_all(objective, jobs),
            _ => jobs
                .iter()
                .map(|(index, design)| (*index, objective.fitness(design)))
                .collect(),
        };

        raw.into_iter()
            .map(|(particle, outcome)| match outcome {
                Ok(value) if value.is_nan() => Err(PsoError::InvalidFitness { particle, value }),
                Ok(value) => Ok((particle, value)),
                Err(message) => Err(PsoError::Objective { particle, message }),
            })
            .collect()
    }
}
