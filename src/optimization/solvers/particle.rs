use crate::core::clamp_unit;
use crate::error::{PsoError, Result};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Initial velocities are standard-normal draws scaled by this factor
const INITIAL_VELOCITY_SCALE: f64 = 0.1;

/// One candidate solution plus its own search memory.
///
/// `fitness` is the score of the last position the host evaluated, `None`
/// before the first evaluation. A velocity move keeps it; only a resample
/// (`relocate`) clears it, because the new point has never been scored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    position: Vec<f64>,
    velocity: Vec<f64>,
    best_position: Vec<f64>,
    fitness: Option<f64>,
    best_fitness: Option<f64>,
}

impl Particle {
    /// Uniform random position in `[0, 1)` per dimension, Gaussian velocity.
    pub fn new<R: Rng + ?Sized>(dimension: usize, rng: &mut R) -> Result<Self> {
        if dimension == 0 {
            return Err(PsoError::config("dimension", "must be > 0"));
        }
        let position: Vec<f64> = (0..dimension).map(|_| rng.gen_range(0.0..1.0)).collect();
        let velocity = (0..dimension)
            .map(|_| {
                let z: f64 = StandardNormal.sample(&mut *rng);
                z * INITIAL_VELOCITY_SCALE
            })
            .collect();
        Ok(Self {
            best_position: position.clone(),
            position,
            velocity,
            fitness: None,
            best_fitness: None,
        })
    }

    /// Unevaluated particle at a given position (clamped into `[0, 1)`), at rest.
    pub fn at(position: Vec<f64>) -> Result<Self> {
        if position.is_empty() {
            return Err(PsoError::config("dimension", "must be > 0"));
        }
        let position: Vec<f64> = position.into_iter().map(clamp_unit).collect();
        Ok(Self {
            velocity: vec![0.0; position.len()],
            best_position: position.clone(),
            position,
            fitness: None,
            best_fitness: None,
        })
    }

    pub fn dimension(&self) -> usize {
        self.position.len()
    }

    pub fn position(&self) -> &[f64] {
        &self.position
    }

    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }

    pub fn best_position(&self) -> &[f64] {
        &self.best_position
    }

    /// Score of the last evaluated position, which may lag `position()` by one move
    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.best_fitness
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Record the host's score for the current position.
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    /// Order by fitness, higher is better.
    ///
    /// Comparing a particle that has not been scored is a caller bug and
    /// yields [`PsoError::UnevaluatedComparison`].
    pub fn compare(&self, other: &Particle) -> Result<Ordering> {
        match (self.fitness, other.fitness) {
            (Some(a), Some(b)) => a.partial_cmp(&b).ok_or(PsoError::UnevaluatedComparison),
            _ => Err(PsoError::UnevaluatedComparison),
        }
    }

    /// Remember the current position if its fitness beats the personal best.
    ///
    /// Returns `true` when the personal best moved.
    pub fn update_personal_best(&mut self) -> bool {
        let Some(fitness) = self.fitness else {
            return false;
        };
        if self.best_fitness.is_none_or(|best| fitness > best) {
            self.best_fitness = Some(fitness);
            self.best_position.copy_from_slice(&self.position);
            return true;
        }
        false
    }

    /// Move to a new position; the previous fitness no longer describes it.
    pub(crate) fn relocate(&mut self, position: &[f64]) {
        for (p, &x) in self.position.iter_mut().zip(position) {
            *p = clamp_unit(x);
        }
        self.fitness = None;
    }

    /// Restore a position without discarding the fitness it was scored with.
    pub(crate) fn restore(&mut self, position: &[f64], fitness: Option<f64>) {
        self.position.copy_from_slice(position);
        self.fitness = fitness;
    }

    /// Pull position and personal best back into `[0, 1)`; non-finite velocities are zeroed.
    pub(crate) fn clamp_to_unit(&mut self) {
        for x in self.position.iter_mut().chain(self.best_position.iter_mut()) {
            *x = clamp_unit(*x);
        }
        for v in self.velocity.iter_mut().filter(|v| !v.is_finite()) {
            *v = 0.0;
        }
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [f64], &mut [f64], &[f64]) {
        (&mut self.position, &mut self.velocity, &self.best_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_new_particle_starts_unevaluated() {
        let mut rng = StdRng::seed_from_u64(42);
        let particle = Particle::new(3, &mut rng).unwrap();

        assert_eq!(particle.dimension(), 3);
        assert!(particle.position().iter().all(|&x| (0.0..1.0).contains(&x)));
        assert_eq!(particle.best_position(), particle.position());
        assert_eq!(particle.fitness(), None);
        assert_eq!(particle.best_fitness(), None);
        // 0.1 * N(0,1): anything beyond 1.0 would be a 10-sigma draw
        assert!(particle.velocity().iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(Particle::new(0, &mut rng).unwrap_err().is_config_error());
        assert!(Particle::at(vec![]).is_err());
    }

    #[test]
    fn test_same_seed_same_particle() {
        let a = Particle::new(4, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = Particle::new(4, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut live = Particle::new(2, &mut rng).unwrap();
        live.set_fitness(1.0);
        let snapshot = live.clone();

        live.relocate(&[0.9, 0.9]);
        live.set_fitness(3.0);
        live.update_personal_best();

        assert_ne!(snapshot.position(), live.position());
        assert_eq!(snapshot.fitness(), Some(1.0));
        assert_ne!(snapshot.best_position(), live.best_position());
    }

    #[test]
    fn test_compare_requires_evaluation() {
        let mut a = Particle::at(vec![0.1]).unwrap();
        let mut b = Particle::at(vec![0.2]).unwrap();

        assert!(matches!(a.compare(&b), Err(PsoError::UnevaluatedComparison)));
        a.set_fitness(2.0);
        assert!(matches!(a.compare(&b), Err(PsoError::UnevaluatedComparison)));
        assert!(matches!(b.compare(&a), Err(PsoError::UnevaluatedComparison)));

        b.set_fitness(1.0);
        assert_eq!(a.compare(&b).unwrap(), Ordering::Greater);
        assert_eq!(b.compare(&a).unwrap(), Ordering::Less);
        b.set_fitness(2.0);
        assert_eq!(a.compare(&b).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_personal_best_tracks_improvements_only() {
        let mut p = Particle::at(vec![0.2, 0.2]).unwrap();
        assert!(!p.update_personal_best());

        p.set_fitness(5.0);
        assert!(p.update_personal_best());
        assert_eq!(p.best_fitness(), Some(5.0));

        p.relocate(&[0.7, 0.7]);
        p.set_fitness(4.0);
        assert!(!p.update_personal_best());
        assert_eq!(p.best_position(), &[0.2, 0.2]);

        p.set_fitness(6.0);
        assert!(p.update_personal_best());
        assert_eq!(p.best_position(), &[0.7, 0.7]);
    }

    #[test]
    fn test_relocate_clamps_and_clears_fitness() {
        let mut p = Particle::at(vec![0.5, 0.5]).unwrap();
        p.set_fitness(1.0);
        p.relocate(&[-0.2, 1.4]);
        assert_eq!(p.position()[0], 0.0);
        assert!(p.position()[1] < 1.0);
        assert!(!p.is_evaluated());
    }
}
