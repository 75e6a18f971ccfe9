use super::types::SearchMethod;
use crate::error::{PsoError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Batched evaluation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Evaluate a step's batch on a thread pool
    pub enabled: bool,
    /// Dedicated worker count; `None` shares rayon's global pool
    pub num_threads: Option<usize>,
    /// Batches smaller than this run sequentially
    pub min_batch: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_threads: None,
            min_batch: 4,
        }
    }
}

impl ParallelConfig {
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn effective_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Run configuration for [`ParticleOptimizer`](crate::ParticleOptimizer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsoConfig {
    pub swarm_size: usize,
    pub max_steps: usize,
    pub convergence_threshold: f64,
    pub search_method: SearchMethod,
    pub local_search_radius: f64,
    /// w - velocity inertia weight
    pub inertia: f64,
    /// c1 - personal best influence
    pub cognitive: f64,
    /// c2 - swarm best influence
    pub social: f64,
    /// Per-dimension velocity cap in normalized units
    pub velocity_limit: Option<f64>,
    /// Retries when the constraint rejects a particle
    pub resample_attempts: usize,
    pub seed: Option<u64>,
    pub parallel: ParallelConfig,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            swarm_size: 20,
            max_steps: 50,
            convergence_threshold: 0.01,
            search_method: SearchMethod::GlobalSearchUniformSelection,
            local_search_radius: 0.1,
            inertia: 0.7,
            cognitive: 1.5,
            social: 1.5,
            velocity_limit: Some(0.2),
            resample_attempts: 20,
            seed: None,
            parallel: ParallelConfig::default(),
        }
    }
}

impl PsoConfig {
    /// Defaults with the swarm scaled to the number of design variables (10-30 particles).
    pub fn for_dimension(dimension: usize) -> Self {
        Self {
            swarm_size: (10 + dimension * 3).min(30),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Configure swarm size (default: 20)
    pub fn with_swarm_size(mut self, size: usize) -> Self {
        self.swarm_size = size;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn with_search_method(mut self, method: SearchMethod) -> Self {
        self.search_method = method;
        self
    }

    pub fn with_local_search_radius(mut self, radius: f64) -> Self {
        self.local_search_radius = radius;
        self
    }

    /// Configure PSO parameters (defaults: w=0.7, c1=1.5, c2=1.5)
    pub fn with_pso_params(mut self, inertia: f64, cognitive: f64, social: f64) -> Self {
        self.inertia = inertia;
        self.cognitive = cognitive;
        self.social = social;
        self
    }

    pub fn with_velocity_limit(mut self, limit: Option<f64>) -> Self {
        self.velocity_limit = limit;
        self
    }

    pub fn with_resample_attempts(mut self, attempts: usize) -> Self {
        self.resample_attempts = attempts;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.swarm_size == 0 {
            return Err(PsoError::config("swarm_size", "must be > 0"));
        }
        if self.max_steps == 0 {
            return Err(PsoError::config("max_steps", "must be > 0"));
        }
        if !(self.convergence_threshold >= 0.0) {
            return Err(PsoError::config(
                "convergence_threshold",
                format!("{} (must be >= 0)", self.convergence_threshold),
            ));
        }
        if !(self.local_search_radius > 0.0 && self.local_search_radius <= 1.0) {
            return Err(PsoError::config(
                "local_search_radius",
                format!("{} (must be in (0, 1])", self.local_search_radius),
            ));
        }
        for (field, value) in [
            ("inertia", self.inertia),
            ("cognitive", self.cognitive),
            ("social", self.social),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(PsoError::config(field, format!("{value} (must be finite and >= 0)")));
            }
        }
        if let Some(limit) = self.velocity_limit {
            if !(limit > 0.0) {
                return Err(PsoError::config(
                    "velocity_limit",
                    format!("{limit} (must be > 0)"),
                ));
            }
        }
        if self.parallel.num_threads == Some(0) {
            return Err(PsoError::config("parallel.num_threads", "must be > 0"));
        }
        Ok(())
    }
}
