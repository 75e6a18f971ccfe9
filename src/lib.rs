//! Constrained particle swarm optimization over normalized design spaces.
//!
//! Particles live in the unit hypercube `[0, 1)^n`; a [`DesignSpace`] maps
//! them onto physical variable ranges before the host objective scores them.
//! The engine maximizes fitness.

pub mod core;
pub mod error;
pub mod optimization;
#[cfg(feature = "python")]
mod python;

pub use self::core::*;
pub use error::{PsoError, Result};
pub use optimization::*;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn designswarm(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PySwarmOptimizer>()?;
    Ok(())
}
