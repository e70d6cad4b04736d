use serde::{Deserialize, Serialize};

use crate::DIMENSIONS;
use crate::error::{OptimizerError, Result};

/// Default gain bounds: Kp in [1, 7], Ki in [0, 3], Kd in [0, 3]
pub const DEFAULT_BOUNDS: [(f64, f64); DIMENSIONS] = [(1.0, 7.0), (0.0, 3.0), (0.0, 3.0)];

/// Configuration shared by both engines
///
/// PSO reads `cognitive`, `social` and the inertia schedule; DE reads
/// `mutation` and `crossover`. Everything else applies to both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunerConfig {
    /// Number of candidates evaluated per generation (N)
    pub population: usize,
    /// Generations after which the engine reports done
    pub max_iterations: usize,
    /// Closed [min, max] interval per gene, in (Kp, Ki, Kd) order
    pub bounds: [(f64, f64); DIMENSIONS],
    /// PSO cognitive coefficient C1
    pub cognitive: f64,
    /// PSO social coefficient C2
    pub social: f64,
    /// PSO inertia weight at iteration 0
    pub inertia_initial: f64,
    /// PSO inertia weight reached at `max_iterations`
    pub inertia_final: f64,
    /// DE mutation weight F in [0, 2]
    pub mutation: f64,
    /// DE crossover rate CR in [0, 1]
    pub crossover: f64,
    /// Optional seed; `None` draws one from the thread RNG
    pub seed: Option<u64>,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            population: 4,
            max_iterations: 50,
            bounds: DEFAULT_BOUNDS,
            cognitive: 1.5,
            social: 1.5,
            inertia_initial: 0.9,
            inertia_final: 0.3,
            mutation: 0.6,
            crossover: 0.8,
            seed: None,
        }
    }
}

impl TunerConfig {
    /// Check the settings every engine relies on
    ///
    /// `min_population` is engine specific: DE needs the target plus three
    /// distinct donors.
    pub fn validate(&self, min_population: usize) -> Result<()> {
        if self.population < min_population.max(1) {
            return Err(OptimizerError::PopulationTooSmall {
                pop_size: self.population,
                min: min_population.max(1),
            });
        }
        if self.max_iterations == 0 {
            return Err(OptimizerError::NoIterations);
        }
        for (index, &(lower, upper)) in self.bounds.iter().enumerate() {
            if !(lower.is_finite() && upper.is_finite() && lower <= upper) {
                return Err(OptimizerError::InvalidBounds { index, lower, upper });
            }
        }
        if !(0.0..=2.0).contains(&self.mutation) {
            return Err(OptimizerError::InvalidMutationFactor { factor: self.mutation });
        }
        if !(0.0..=1.0).contains(&self.crossover) {
            return Err(OptimizerError::InvalidCrossoverRate { rate: self.crossover });
        }
        for (name, value) in [
            ("cognitive coefficient", self.cognitive),
            ("social coefficient", self.social),
            ("initial inertia", self.inertia_initial),
            ("final inertia", self.inertia_final),
        ] {
            if !value.is_finite() {
                return Err(OptimizerError::InvalidCoefficient { name, value });
            }
        }
        Ok(())
    }
}

/// Fluent builder for `TunerConfig`.
#[derive(Debug, Clone, Default)]
pub struct TunerConfigBuilder {
    cfg: TunerConfig,
}

impl TunerConfigBuilder {
    pub fn new() -> Self {
        Self { cfg: TunerConfig::default() }
    }
    pub fn population(mut self, v: usize) -> Self {
        self.cfg.population = v;
        self
    }
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.cfg.max_iterations = v;
        self
    }
    pub fn bounds(mut self, v: [(f64, f64); DIMENSIONS]) -> Self {
        self.cfg.bounds = v;
        self
    }
    pub fn cognitive(mut self, v: f64) -> Self {
        self.cfg.cognitive = v;
        self
    }
    pub fn social(mut self, v: f64) -> Self {
        self.cfg.social = v;
        self
    }
    pub fn inertia(mut self, initial: f64, terminal: f64) -> Self {
        self.cfg.inertia_initial = initial;
        self.cfg.inertia_final = terminal;
        self
    }
    pub fn mutation(mut self, v: f64) -> Self {
        self.cfg.mutation = v;
        self
    }
    pub fn crossover(mut self, v: f64) -> Self {
        self.cfg.crossover = v;
        self
    }
    pub fn seed(mut self, v: u64) -> Self {
        self.cfg.seed = Some(v);
        self
    }
    pub fn build(self) -> TunerConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = TunerConfig::default();
        assert_eq!(cfg.population, 4);
        assert_eq!(cfg.max_iterations, 50);
        assert!(cfg.validate(4).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let small = TunerConfigBuilder::new().population(3).build();
        assert!(matches!(
            small.validate(4),
            Err(OptimizerError::PopulationTooSmall { pop_size: 3, min: 4 })
        ));
        assert!(small.validate(1).is_ok());

        let empty = TunerConfigBuilder::new().population(0).build();
        assert!(empty.validate(0).is_err());

        let inverted = TunerConfigBuilder::new()
            .bounds([(1.0, 7.0), (3.0, 0.0), (0.0, 3.0)])
            .build();
        assert!(matches!(
            inverted.validate(1),
            Err(OptimizerError::InvalidBounds { index: 1, .. })
        ));

        let no_iter = TunerConfigBuilder::new().max_iterations(0).build();
        assert!(matches!(no_iter.validate(1), Err(OptimizerError::NoIterations)));

        let cr = TunerConfigBuilder::new().crossover(1.2).build();
        assert!(cr.validate(1).unwrap_err().is_config_error());

        let f = TunerConfigBuilder::new().mutation(-0.1).build();
        assert!(matches!(f.validate(1), Err(OptimizerError::InvalidMutationFactor { .. })));
    }

    #[test]
    fn test_validate_rejects_non_finite_coefficients() {
        let c1 = TunerConfigBuilder::new().cognitive(f64::NAN).build();
        assert!(matches!(
            c1.validate(1),
            Err(OptimizerError::InvalidCoefficient { name: "cognitive coefficient", .. })
        ));

        let w = TunerConfigBuilder::new().inertia(0.9, f64::INFINITY).build();
        let err = w.validate(1).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("final inertia"));

        // a deserialized config goes through the same check
        let mut loaded = TunerConfig::default();
        loaded.social = f64::NEG_INFINITY;
        assert!(loaded.validate(1).is_err());
    }
}
