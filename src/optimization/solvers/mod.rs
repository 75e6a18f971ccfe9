pub mod optimizer;
pub mod particle;
pub mod swarm;
pub mod traits;

pub use optimizer::{OptimizationReport, ParticleOptimizer, RunState, StopHandle};
pub use particle::Particle;
pub use swarm::Swarm;
pub use traits::{BestSolution, Objective, ResultWriter, StepEvent, StepObserver};
