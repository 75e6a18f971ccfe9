pub mod config;
pub mod constraints;
pub mod geometry;
pub mod types;

pub use config::{ParallelConfig, PsoConfig};
pub use constraints::{CircularBound, Constraint, ConstraintBinding, RectangularBound};
pub use geometry::Rectangle;
pub use types::*;
