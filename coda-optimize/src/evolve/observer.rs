//! Per-generation audit records and the observer seam.
//!
//! Records are emitted after every generation for logging and
//! reporting. They are never read back by the algorithm.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::info;

use super::population::{rank_descending, Individual};
use crate::space::ParameterSet;

/// A top-ranked individual captured in a generation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedIndividual {
    pub params: ParameterSet,
    pub fitness: f64,
}

/// Summary of one completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Generation index, starting at zero.
    pub generation: usize,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub std_dev_fitness: f64,
    /// Wall-clock seconds spent evaluating this generation.
    pub elapsed_secs: f64,
    /// The top-K individuals by descending fitness.
    pub top: Vec<RankedIndividual>,
}

impl GenerationRecord {
    pub(crate) fn capture(
        generation: usize,
        population: &[Individual],
        fitness: &[f64],
        elapsed_secs: f64,
        top_k: usize,
    ) -> Self {
        let order = rank_descending(fitness);
        let top = order
            .iter()
            .take(top_k)
            .map(|&i| RankedIndividual {
                params: population[i].params.clone(),
                fitness: fitness[i],
            })
            .collect();

        Self {
            generation,
            best_fitness: order.first().map(|&i| fitness[i]).unwrap_or(0.0),
            mean_fitness: Statistics::mean(fitness),
            std_dev_fitness: Statistics::population_std_dev(fitness),
            elapsed_secs,
            top,
        }
    }
}

/// Sink for generation summaries.
///
/// Implementations must not influence the run; the optimizer never
/// reads anything back from an observer.
pub trait EvolutionObserver: Send + Sync {
    fn on_generation(&self, record: &GenerationRecord);
}

/// Default observer: one structured log line per generation.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl EvolutionObserver for TracingObserver {
    fn on_generation(&self, record: &GenerationRecord) {
        info!(
            generation = record.generation,
            best = record.best_fitness,
            mean = record.mean_fitness,
            std_dev = record.std_dev_fitness,
            elapsed_secs = record.elapsed_secs,
            "generation complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::ParamValue;

    fn population_of(values: &[i64]) -> Vec<Individual> {
        values
            .iter()
            .map(|&v| Individual::unscored(ParameterSet::new().with("x", ParamValue::Int(v))))
            .collect()
    }

    #[test]
    fn test_capture_ranks_and_stats() {
        let population = population_of(&[1, 2, 3, 4]);
        let fitness = [1.0, 4.0, 2.0, 3.0];

        let record = GenerationRecord::capture(7, &population, &fitness, 0.5, 2);
        assert_eq!(record.generation, 7);
        assert_eq!(record.best_fitness, 4.0);
        assert!((record.mean_fitness - 2.5).abs() < 1e-12);
        // Population std dev of [1,4,2,3] is sqrt(1.25).
        assert!((record.std_dev_fitness - 1.25f64.sqrt()).abs() < 1e-12);

        assert_eq!(record.top.len(), 2);
        assert_eq!(record.top[0].fitness, 4.0);
        assert_eq!(record.top[0].params.get("x"), Some(ParamValue::Int(2)));
        assert_eq!(record.top[1].fitness, 3.0);
    }

    #[test]
    fn test_top_k_clipped_to_population() {
        let population = population_of(&[1, 2]);
        let fitness = [1.0, 2.0];
        let record = GenerationRecord::capture(0, &population, &fitness, 0.0, 10);
        assert_eq!(record.top.len(), 2);
    }
}
