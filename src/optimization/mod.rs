pub mod callback;
pub mod history;
pub mod parallel;
pub mod problem;
pub mod solvers;

pub use callback::{ChannelObserver, LoggingObserver, NoopObserver};
pub use history::{FixedLog, StepHistory};
pub use parallel::BatchEvaluator;
pub use problem::{ArgminObjective, FnObjective, Negated};
pub use solvers::*;
