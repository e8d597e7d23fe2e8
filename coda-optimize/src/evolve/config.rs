//! Genetic optimizer configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::space::SpaceError;

/// Errors raised while validating optimizer configuration or seeds.
#[derive(Debug, Error)]
pub enum EvolveError {
    #[error("population_size must be greater than zero")]
    EmptyPopulation,

    #[error("elitism_count ({elitism_count}) must be less than population_size ({population_size})")]
    ElitismTooLarge {
        elitism_count: usize,
        population_size: usize,
    },

    #[error("tournament_size must be greater than zero")]
    EmptyTournament,

    #[error("{name} must be within [0.0, 1.0], got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },

    #[error("mutation_strength must be non-negative, got {0}")]
    NegativeMutationStrength(f64),

    #[error("optimizer needs at least one parameter range")]
    NoRanges,

    #[error("seed individual {index}: {reason}")]
    InvalidSeed { index: usize, reason: String },

    #[error(transparent)]
    Space(#[from] SpaceError),

    #[error("failed to build evaluation pool: {0}")]
    WorkerPool(String),
}

/// Configuration for a genetic optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Individuals per generation. Every generation, including the
    /// first and the last, holds exactly this many.
    pub population_size: usize,

    /// Number of breeding generations to run.
    pub generations: usize,

    /// Top individuals copied unchanged into the next generation.
    pub elitism_count: usize,

    /// Individuals drawn per tournament when selecting a parent.
    pub tournament_size: usize,

    /// Probability that a parent pair undergoes uniform crossover.
    pub crossover_rate: f64,

    /// Per-parameter mutation probability for each offspring.
    pub mutation_rate: f64,

    /// Mutation noise scale as a fraction of each parameter's span.
    pub mutation_strength: f64,

    /// RNG seed. Runs with the same seed and a deterministic fitness
    /// function reproduce exactly.
    pub seed: u64,

    /// Fitness evaluation workers. `None` selects cores - 1 (min 1).
    pub workers: Option<usize>,

    /// Individuals retained in each generation record.
    pub top_k: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 30,
            elitism_count: 2,
            tournament_size: 3,
            crossover_rate: 0.7,
            mutation_rate: 0.1,
            mutation_strength: 0.1,
            seed: 42,
            workers: None,
            top_k: 5,
        }
    }
}

impl EvolutionConfig {
    /// Validate before any fitness evaluation is attempted.
    pub fn validate(&self) -> Result<(), EvolveError> {
        if self.population_size == 0 {
            return Err(EvolveError::EmptyPopulation);
        }
        if self.elitism_count >= self.population_size {
            return Err(EvolveError::ElitismTooLarge {
                elitism_count: self.elitism_count,
                population_size: self.population_size,
            });
        }
        if self.tournament_size == 0 {
            return Err(EvolveError::EmptyTournament);
        }
        for (name, value) in [
            ("crossover_rate", self.crossover_rate),
            ("mutation_rate", self.mutation_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EvolveError::RateOutOfRange { name, value });
            }
        }
        if self.mutation_strength < 0.0 {
            return Err(EvolveError::NegativeMutationStrength(
                self.mutation_strength,
            ));
        }
        Ok(())
    }

    /// Resolved worker count: configured value, else cores - 1, min 1.
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1))
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_population_rejected() {
        let config = EvolutionConfig {
            population_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolveError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_elitism_must_leave_room_to_breed() {
        let config = EvolutionConfig {
            population_size: 10,
            elitism_count: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolveError::ElitismTooLarge { .. })
        ));
    }

    #[test]
    fn test_rates_bounded() {
        let config = EvolutionConfig {
            crossover_rate: 1.4,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolveError::RateOutOfRange { name: "crossover_rate", .. })
        ));

        let config = EvolutionConfig {
            mutation_rate: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolveError::RateOutOfRange { name: "mutation_rate", .. })
        ));
    }

    #[test]
    fn test_worker_count_has_floor_of_one() {
        let config = EvolutionConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 1);
    }
}
