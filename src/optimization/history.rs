//! Per-step records of a run, kept for replay, plotting and undo.
//!
//! Entries are deep copies taken when a step completes; later mutation of
//! the live swarm never reaches them.

use super::solvers::swarm::Swarm;
use crate::error::{PsoError, Result};
use serde::{Deserialize, Serialize};

/// Append-only log with a capacity fixed at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedLog<T> {
    capacity: usize,
    entries: Vec<T>,
}

impl<T> FixedLog<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: T) -> Result<usize> {
        if self.entries.len() >= self.capacity {
            return Err(PsoError::HistoryFull {
                capacity: self.capacity,
            });
        }
        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }
}

/// Best position after every step and a swarm snapshot for every executed step.
///
/// `best_position(0)` is the state before the first step; `best_position(k)`
/// and `swarm(k)` describe the swarm after step `k` (1-based).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepHistory {
    best_positions: FixedLog<Vec<f64>>,
    swarms: FixedLog<Swarm>,
}

impl StepHistory {
    /// Sized for `max_steps` steps, seeded with the pre-run swarm best.
    pub fn new(max_steps: usize, initial_best: &[f64]) -> Self {
        let mut best_positions = FixedLog::with_capacity(max_steps + 1);
        best_positions.entries.push(initial_best.to_vec());
        Self {
            best_positions,
            swarms: FixedLog::with_capacity(max_steps),
        }
    }

    pub(crate) fn record(&mut self, swarm: &Swarm) -> Result<usize> {
        if self.swarms.is_full() {
            return Err(PsoError::HistoryFull {
                capacity: self.swarms.capacity(),
            });
        }
        self.best_positions.push(swarm.best_position().to_vec())?;
        self.swarms.push(swarm.clone())?;
        Ok(self.swarms.len())
    }

    /// Number of recorded steps.
    pub fn steps(&self) -> usize {
        self.swarms.len()
    }

    pub fn max_steps(&self) -> usize {
        self.swarms.capacity()
    }

    pub fn best_position(&self, step: usize) -> Option<&[f64]> {
        self.best_positions.get(step).map(Vec::as_slice)
    }

    pub fn swarm(&self, step: usize) -> Option<&Swarm> {
        step.checked_sub(1).and_then(|i| self.swarms.get(i))
    }

    pub fn latest_swarm(&self) -> Option<&Swarm> {
        self.swarms.last()
    }

    pub fn best_positions(&self) -> &FixedLog<Vec<f64>> {
        &self.best_positions
    }

    pub fn swarms(&self) -> &FixedLog<Swarm> {
        &self.swarms
    }

    /// Best fitness after each recorded step, for convergence plots.
    pub fn best_fitness_trace(&self) -> Vec<Option<f64>> {
        self.swarms.iter().map(Swarm::best_fitness).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
