use super::particle::Particle;
use crate::core::clamp_unit;
use crate::error::{PsoError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Fixed-size population plus the best position any member has reached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Swarm {
    particles: Vec<Particle>,
    best_position: Vec<f64>,
    best_fitness: Option<f64>,
}

impl Swarm {
    /// `size` fresh random particles; the swarm best starts at the origin, unevaluated.
    pub fn new<R: Rng + ?Sized>(size: usize, dimension: usize, rng: &mut R) -> Result<Self> {
        if size == 0 {
            return Err(PsoError::config("swarm_size", "must be > 0"));
        }
        let particles = (0..size)
            .map(|_| Particle::new(dimension, rng))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            particles,
            best_position: vec![0.0; dimension],
            best_fitness: None,
        })
    }

    /// Build a swarm from existing particles, e.g. a recorded snapshot.
    ///
    /// Personal bests already carried by the particles seed the swarm best.
    pub fn from_particles(particles: Vec<Particle>) -> Result<Self> {
        let Some(first) = particles.first() else {
            return Err(PsoError::config("swarm_size", "must be > 0"));
        };
        let dimension = first.dimension();
        if let Some(odd) = particles.iter().find(|p| p.dimension() != dimension) {
            return Err(PsoError::DimensionMismatch {
                expected: dimension,
                got: odd.dimension(),
            });
        }

        let mut swarm = Self {
            particles,
            best_position: vec![0.0; dimension],
            best_fitness: None,
        };
        for i in 0..swarm.particles.len() {
            if let Some(fitness) = swarm.particles[i].best_fitness() {
                if swarm.best_fitness.is_none_or(|best| fitness > best) {
                    swarm.best_fitness = Some(fitness);
                    swarm.best_position = swarm.particles[i].best_position().to_vec();
                }
            }
        }
        Ok(swarm)
    }

    pub fn size(&self) -> usize {
        self.particles.len()
    }

    pub fn dimension(&self) -> usize {
        self.best_position.len()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Clamp every stored coordinate into `[0, 1)`, e.g. after loading a snapshot.
    pub(crate) fn clamp_to_unit(&mut self) {
        for particle in &mut self.particles {
            particle.clamp_to_unit();
        }
        for x in &mut self.best_position {
            *x = clamp_unit(*x);
        }
    }

    pub fn best_position(&self) -> &[f64] {
        &self.best_position
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.best_fitness
    }

    /// Fold the latest round of scores into personal and swarm bests.
    ///
    /// Unevaluated particles are skipped. Returns `true` if the swarm best improved.
    pub fn update_bests(&mut self) -> Result<bool> {
        let mut leader: Option<usize> = None;
        for i in 0..self.particles.len() {
            if !self.particles[i].is_evaluated() {
                continue;
            }
            self.particles[i].update_personal_best();
            leader = match leader {
                Some(l) if self.particles[i].compare(&self.particles[l])? != Ordering::Greater => {
                    Some(l)
                }
                _ => Some(i),
            };
        }

        let Some(leader) = leader else {
            return Ok(false);
        };
        let Some(fitness) = self.particles[leader].fitness() else {
            return Ok(false);
        };
        if self.best_fitness.is_none_or(|best| fitness > best) {
            self.best_fitness = Some(fitness);
            self.best_position
                .copy_from_slice(self.particles[leader].position());
            return Ok(true);
        }
        Ok(false)
    }

    /// Relative-spread test over the first `max(2, size/2)` particles in population order.
    ///
    /// For every dimension, each of those particles must satisfy
    /// `|x / mean - 1| <= threshold`; when the mean is exactly zero the absolute
    /// deviation `|x|` is compared instead. The sample is clamped to the swarm
    /// size, so a single-particle swarm is always nominally converged.
    pub fn is_nominally_converged(&self, threshold: f64) -> bool {
        let m = (self.particles.len() / 2).max(2).min(self.particles.len());
        let front = &self.particles[..m];

        for i in 0..self.dimension() {
            let mean = front.iter().map(|p| p.position()[i]).sum::<f64>() / m as f64;
            let spread_ok = front.iter().all(|p| {
                let value = p.position()[i];
                let deviation = if mean == 0.0 {
                    value.abs()
                } else {
                    (value / mean - 1.0).abs()
                };
                deviation <= threshold
            });
            if !spread_ok {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn swarm_at(positions: &[&[f64]]) -> Swarm {
        Swarm::from_particles(
            positions
                .iter()
                .map(|p| Particle::at(p.to_vec()).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_swarm() {
        let mut rng = StdRng::seed_from_u64(11);
        let swarm = Swarm::new(6, 3, &mut rng).unwrap();
        assert_eq!(swarm.size(), 6);
        assert_eq!(swarm.dimension(), 3);
        assert_eq!(swarm.best_position(), &[0.0, 0.0, 0.0]);
        assert_eq!(swarm.best_fitness(), None);
        // independent draws
        assert_ne!(swarm.particles()[0].position(), swarm.particles()[1].position());
    }

    #[test]
    fn test_invalid_sizes() {
        let mut rng = StdRng::seed_from_u64(11);
        assert!(Swarm::new(0, 3, &mut rng).is_err());
        assert!(Swarm::new(3, 0, &mut rng).is_err());
        assert!(Swarm::from_particles(vec![]).is_err());

        let mixed = vec![
            Particle::at(vec![0.1]).unwrap(),
            Particle::at(vec![0.1, 0.2]).unwrap(),
        ];
        assert!(matches!(
            Swarm::from_particles(mixed),
            Err(PsoError::DimensionMismatch { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_converged_when_front_is_tight() {
        let swarm = swarm_at(&[&[0.50], &[0.51]]);
        assert!(swarm.is_nominally_converged(0.1));
    }

    #[test]
    fn test_not_converged_when_front_is_spread() {
        let swarm = swarm_at(&[&[0.10], &[0.90]]);
        assert!(!swarm.is_nominally_converged(0.1));
    }

    #[test]
    fn test_only_front_of_population_is_checked() {
        // size 6 -> m = 3; the outlier at index 4 is ignored
        let swarm = swarm_at(&[&[0.5], &[0.5], &[0.5], &[0.5], &[0.01], &[0.99]]);
        assert!(swarm.is_nominally_converged(0.05));

        let swarm = swarm_at(&[&[0.5], &[0.5], &[0.01], &[0.5], &[0.5], &[0.5]]);
        assert!(!swarm.is_nominally_converged(0.05));
    }

    #[test]
    fn test_zero_mean_uses_absolute_deviation() {
        let swarm = swarm_at(&[&[0.0, 0.4], &[0.0, 0.4]]);
        assert!(swarm.is_nominally_converged(0.01));

        let swarm = swarm_at(&[&[0.0], &[0.0]]);
        assert!(swarm.is_nominally_converged(0.0));
    }

    #[test]
    fn test_single_particle_is_always_converged() {
        let swarm = swarm_at(&[&[0.3, 0.9]]);
        assert!(swarm.is_nominally_converged(0.0));
    }

    #[test]
    fn test_convergence_check_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(2);
        let swarm = Swarm::new(10, 4, &mut rng).unwrap();
        let first = swarm.is_nominally_converged(0.2);
        assert_eq!(first, swarm.is_nominally_converged(0.2));
    }

    #[test]
    fn test_update_bests_picks_leader() {
        let mut swarm = swarm_at(&[&[0.1], &[0.2], &[0.3]]);
        let scores = [1.0, 5.0, 3.0];
        for (p, &f) in swarm.particles_mut().iter_mut().zip(&scores) {
            p.set_fitness(f);
        }
        assert!(swarm.update_bests().unwrap());
        assert_eq!(swarm.best_fitness(), Some(5.0));
        assert_eq!(swarm.best_position(), &[0.2]);
        for (p, &f) in swarm.particles().iter().zip(&scores) {
            assert_eq!(p.best_fitness(), Some(f));
        }

        // a worse round leaves the swarm best alone
        for p in swarm.particles_mut() {
            p.set_fitness(0.5);
        }
        assert!(!swarm.update_bests().unwrap());
        assert_eq!(swarm.best_fitness(), Some(5.0));
    }

    #[test]
    fn test_update_bests_skips_unevaluated() {
        let mut swarm = swarm_at(&[&[0.1], &[0.2]]);
        assert!(!swarm.update_bests().unwrap());
        assert_eq!(swarm.best_fitness(), None);

        swarm.particles_mut()[1].set_fitness(-2.0);
        assert!(swarm.update_bests().unwrap());
        assert_eq!(swarm.best_fitness(), Some(-2.0));
        assert_eq!(swarm.best_position(), &[0.2]);
    }

    #[test]
    fn test_ties_keep_first_leader() {
        let mut swarm = swarm_at(&[&[0.1], &[0.2]]);
        for p in swarm.particles_mut() {
            p.set_fitness(1.0);
        }
        swarm.update_bests().unwrap();
        assert_eq!(swarm.best_position(), &[0.1]);
    }

    #[test]
    fn test_from_particles_restores_best() {
        let mut swarm = swarm_at(&[&[0.1], &[0.2]]);
        swarm.particles_mut()[1].set_fitness(4.0);
        swarm.update_bests().unwrap();

        let restored = Swarm::from_particles(swarm.particles().to_vec()).unwrap();
        assert_eq!(restored.best_fitness(), Some(4.0));
        assert_eq!(restored.best_position(), &[0.2]);
    }
}
