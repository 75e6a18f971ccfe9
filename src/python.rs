//! Python host bindings.

use crate::core::{
    CircularBound, ConstraintBinding, DesignSpace, DesignVariable, ParallelConfig, PsoConfig,
    RectangularBound,
};
use crate::error::PsoError;
use crate::optimization::{
    BestSolution, Objective, ParticleOptimizer, ResultWriter, StepEvent, StepObserver,
};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::sync::Arc;

impl From<PsoError> for PyErr {
    fn from(err: PsoError) -> Self {
        if err.is_config_error() || err.is_programmer_error() {
            PyValueError::new_err(err.to_string())
        } else {
            PyRuntimeError::new_err(err.to_string())
        }
    }
}

/// Python callable `f(design: list[float]) -> float`
struct PyObjective {
    callable: PyObject,
}

impl Objective for PyObjective {
    fn fitness(&self, design: &[f64]) -> Result<f64, String> {
        Python::with_gil(|py| {
            self.callable
                .call1(py, (design.to_vec(),))
                .and_then(|value| value.extract::<f64>(py))
                .map_err(|e| e.to_string())
        })
    }
}

/// Python callable `g(position, design, fitness)`, or nothing
struct PyWriter<'a, 'py> {
    py: Python<'py>,
    callable: Option<&'a PyObject>,
}

impl ResultWriter for PyWriter<'_, '_> {
    fn apply_best(&mut self, best: &BestSolution) -> Result<(), String> {
        let Some(callable) = self.callable else {
            return Ok(());
        };
        callable
            .call1(
                self.py,
                (best.position.clone(), best.design.clone(), best.fitness),
            )
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Lets Ctrl+C in the interpreter abort a long run
struct SignalObserver<'py> {
    py: Python<'py>,
}

impl StepObserver for SignalObserver<'_> {
    fn on_step(&mut self, _event: &StepEvent) -> Result<(), String> {
        if self.py.check_signals().is_err() {
            return Err("Interrupted by user (Ctrl+C)".to_string());
        }
        Ok(())
    }
}

#[pyclass(name = "SwarmOptimizer")]
pub struct PySwarmOptimizer {
    inner: ParticleOptimizer,
    objective: PyObject,
    apply_best: Option<PyObject>,
}

#[pymethods]
impl PySwarmOptimizer {
    /// `variables` is a list of `(name, min, max)` tuples; `config_json` overrides the defaults.
    #[new]
    #[pyo3(signature = (variables, objective, apply_best=None, config_json=None))]
    fn new(
        variables: Vec<(String, f64, f64)>,
        objective: PyObject,
        apply_best: Option<PyObject>,
        config_json: Option<&str>,
    ) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => PsoConfig::from_json_str(json)?,
            None => PsoConfig::for_dimension(variables.len()),
        }
        // objective calls need the GIL; keep them on this thread
        .with_parallel(ParallelConfig::sequential());

        let space = DesignSpace::new(
            variables
                .into_iter()
                .map(|(name, min_val, max_val)| DesignVariable::new(name, min_val, max_val))
                .collect(),
        )?;

        Ok(Self {
            inner: ParticleOptimizer::new(config, space)?,
            objective,
            apply_best,
        })
    }

    fn set_rectangular_bound(
        &mut self,
        x_variable: &str,
        y_variable: &str,
        center_x: f64,
        center_y: f64,
        width: f64,
        height: f64,
    ) -> PyResult<()> {
        let (x, y) = self.indices(x_variable, y_variable)?;
        let bound = RectangularBound::new(center_x, center_y, width, height)?;
        self.inner
            .set_constraint(ConstraintBinding::new(Arc::new(bound), x, y))?;
        Ok(())
    }

    fn set_circular_bound(
        &mut self,
        x_variable: &str,
        y_variable: &str,
        center_x: f64,
        center_y: f64,
        radius: f64,
    ) -> PyResult<()> {
        let (x, y) = self.indices(x_variable, y_variable)?;
        let bound = CircularBound::new(center_x, center_y, radius)?;
        self.inner
            .set_constraint(ConstraintBinding::new(Arc::new(bound), x, y))?;
        Ok(())
    }

    /// Run one step; returns the run state name.
    fn step(&mut self, py: Python<'_>) -> PyResult<String> {
        let objective = PyObjective {
            callable: self.objective.clone_ref(py),
        };
        let state = self.inner.step(&objective)?;
        Ok(format!("{state:?}"))
    }

    /// Run to completion; returns the report as JSON.
    fn run(&mut self, py: Python<'_>) -> PyResult<String> {
        let objective = PyObjective {
            callable: self.objective.clone_ref(py),
        };
        let mut writer = PyWriter {
            py,
            callable: self.apply_best.as_ref(),
        };
        let mut observer = SignalObserver { py };
        let report = self.inner.run(&objective, &mut writer, &mut observer)?;
        Ok(serde_json::to_string(&report).map_err(PsoError::from)?)
    }

    fn stop(&self) {
        self.inner.stop();
    }

    #[getter]
    fn state(&self) -> String {
        format!("{:?}", self.inner.state())
    }

    #[getter]
    fn steps(&self) -> usize {
        self.inner.steps()
    }

    #[getter]
    fn compute_counter(&self) -> usize {
        self.inner.compute_counter()
    }

    #[getter]
    fn best_fitness(&self) -> Option<f64> {
        self.inner.swarm().best_fitness()
    }

    #[getter]
    fn best_position(&self) -> Vec<f64> {
        self.inner.swarm().best_position().to_vec()
    }

    #[getter]
    fn best_design(&self) -> PyResult<Vec<(String, f64)>> {
        let best = self.inner.best_solution()?;
        Ok(self.inner.design_space().named(&best.design)?)
    }

    fn history_json(&self) -> PyResult<String> {
        Ok(self.inner.history().to_json()?)
    }
}

impl PySwarmOptimizer {
    fn indices(&self, x_variable: &str, y_variable: &str) -> PyResult<(usize, usize)> {
        let space = self.inner.design_space();
        let lookup = |name: &str| {
            space
                .index_of(name)
                .ok_or_else(|| PyValueError::new_err(format!("unknown design variable '{name}'")))
        };
        Ok((lookup(x_variable)?, lookup(y_variable)?))
    }
}
