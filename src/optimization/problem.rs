//! Adapters that turn common objective shapes into an [`Objective`].
//!
//! The engine maximizes. Cost functions (lower is better) go through
//! [`Negated`] or, for argmin problems, [`ArgminObjective`].

use super::solvers::traits::Objective;
use argmin::core::CostFunction;

/// Infallible closure objective
pub struct FnObjective<F> {
    f: F,
}

impl<F> FnObjective<F>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Objective for FnObjective<F>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    fn fitness(&self, design: &[f64]) -> Result<f64, String> {
        Ok((self.f)(design))
    }
}

/// Flips the sign of another objective so that minimizing it becomes maximizing
pub struct Negated<O> {
    inner: O,
}

impl<O: Objective> Negated<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: Objective> Objective for Negated<O> {
    fn fitness(&self, design: &[f64]) -> Result<f64, String> {
        self.inner.fitness(design).map(|f| -f)
    }
}

/// Any argmin cost function over `Vec<f64>`, negated since argmin minimizes
pub struct ArgminObjective<P> {
    problem: P,
}

impl<P> ArgminObjective<P>
where
    P: CostFunction<Param = Vec<f64>, Output = f64> + Sync,
{
    pub fn new(problem: P) -> Self {
        Self { problem }
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }
}

impl<P> Objective for ArgminObjective<P>
where
    P: CostFunction<Param = Vec<f64>, Output = f64> + Sync,
{
    fn fitness(&self, design: &[f64]) -> Result<f64, String> {
        self.problem
            .cost(&design.to_vec())
            .map(|cost| -cost)
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argmin::core::Error;

    struct Paraboloid;

    impl CostFunction for Paraboloid {
        type Param = Vec<f64>;
        type Output = f64;

        fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
            if p.iter().any(|x| *x < 0.0) {
                return Err(Error::msg("negative spacing"));
            }
            Ok(p.iter().map(|x| (x - 2.0).powi(2)).sum())
        }
    }

    #[test]
    fn test_fn_objective() {
        let objective = FnObjective::new(|x: &[f64]| x[0] * 2.0);
        assert_eq!(objective.fitness(&[1.5]), Ok(3.0));
    }

    #[test]
    fn test_negated() {
        let cost = FnObjective::new(|x: &[f64]| x.iter().sum());
        let objective = Negated::new(cost);
        assert_eq!(objective.fitness(&[1.0, 2.0]), Ok(-3.0));

        let failing = |_: &[f64]| -> Result<f64, String> { Err("no sun".into()) };
        assert_eq!(Negated::new(failing).fitness(&[0.0]), Err("no sun".to_string()));
    }

    #[test]
    fn test_argmin_objective() {
        let objective = ArgminObjective::new(Paraboloid);
        assert_eq!(objective.fitness(&[2.0, 3.0]), Ok(-1.0));

        let err = objective.fitness(&[-1.0, 3.0]).unwrap_err();
        assert!(err.contains("negative spacing"));
    }
}
