use crate::error::{PsoError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Largest `f64` strictly below 1.0; normalized coordinates live in `[0, UNIT_MAX]`.
pub const UNIT_MAX: f64 = 1.0 - f64::EPSILON / 2.0;

/// Clamp a normalized coordinate into `[0, 1)`.
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, UNIT_MAX)
}

// ===== ENUMS =====

/// How particles move after each evaluation round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// Canonical inertia + cognitive + social update over the whole domain.
    #[default]
    GlobalSearchUniformSelection,
    /// Same update, with step size and distance from the swarm best limited
    /// to the local search radius.
    LocalSearch,
}

// ===== DESIGN SPACE =====

/// One tunable field of the host model, with its admissible range in design units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignVariable {
    pub name: String,
    pub min_val: f64,
    pub max_val: f64,
}

impl DesignVariable {
    pub fn new(name: impl Into<String>, min_val: f64, max_val: f64) -> Self {
        Self {
            name: name.into(),
            min_val,
            max_val,
        }
    }

    #[inline]
    pub fn range(&self) -> f64 {
        self.max_val - self.min_val
    }

    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min_val && value <= self.max_val
    }
}

/// Ordered set of design variables; particle dimension `i` maps to the `i`-th variable.
#[derive(Clone, Debug, Default)]
pub struct DesignSpace {
    variables: IndexMap<String, DesignVariable>,
}

impl DesignSpace {
    pub fn new(variables: Vec<DesignVariable>) -> Result<Self> {
        let mut space = Self::default();
        for variable in variables {
            space.push(variable)?;
        }
        Ok(space)
    }

    /// Unit hypercube of `dimension` anonymous variables (`x0`, `x1`, ...).
    pub fn unit(dimension: usize) -> Result<Self> {
        Self::new(
            (0..dimension)
                .map(|i| DesignVariable::new(format!("x{i}"), 0.0, 1.0))
                .collect(),
        )
    }

    pub fn with_variable(mut self, name: impl Into<String>, min_val: f64, max_val: f64) -> Result<Self> {
        self.push(DesignVariable::new(name, min_val, max_val))?;
        Ok(self)
    }

    fn push(&mut self, variable: DesignVariable) -> Result<()> {
        if !variable.min_val.is_finite() || !variable.max_val.is_finite() {
            return Err(PsoError::config(
                "design_space",
                format!("variable '{}' has non-finite bounds", variable.name),
            ));
        }
        if variable.min_val > variable.max_val {
            return Err(PsoError::config(
                "design_space",
                format!(
                    "variable '{}': min ({}) > max ({})",
                    variable.name, variable.min_val, variable.max_val
                ),
            ));
        }
        if self.variables.contains_key(&variable.name) {
            return Err(PsoError::config(
                "design_space",
                format!("duplicate variable '{}'", variable.name),
            ));
        }
        self.variables.insert(variable.name.clone(), variable);
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = &DesignVariable> {
        self.variables.values()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.variables.get_index_of(name)
    }

    pub fn get(&self, name: &str) -> Option<&DesignVariable> {
        self.variables.get(name)
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.dimension() {
            return Err(PsoError::DimensionMismatch {
                expected: self.dimension(),
                got: len,
            });
        }
        Ok(())
    }

    /// Map a normalized position into design units.
    pub fn to_design(&self, normalized: &[f64]) -> Result<Vec<f64>> {
        self.check_len(normalized.len())?;
        Ok(self
            .variables
            .values()
            .zip(normalized)
            .map(|(var, &x)| var.min_val + x * var.range())
            .collect())
    }

    /// Map design units back into `[0, 1)`; degenerate ranges map to 0.
    pub fn to_normalized(&self, design: &[f64]) -> Result<Vec<f64>> {
        self.check_len(design.len())?;
        Ok(self
            .variables
            .values()
            .zip(design)
            .map(|(var, &v)| {
                let range = var.range();
                if range > 0.0 {
                    clamp_unit((v - var.min_val) / range)
                } else {
                    0.0
                }
            })
            .collect())
    }

    /// Pair design-unit values with their variable names, in space order.
    pub fn named(&self, design: &[f64]) -> Result<Vec<(String, f64)>> {
        self.check_len(design.len())?;
        Ok(self
            .variables
            .keys()
            .cloned()
            .zip(design.iter().copied())
            .collect())
    }
}
