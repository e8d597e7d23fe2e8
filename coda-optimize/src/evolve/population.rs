//! Individuals, population seeding, and fitness ranking.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::space::{ParameterRange, ParameterSet};

/// A candidate parameter set paired with its fitness, if evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    pub params: ParameterSet,
    pub fitness: Option<f64>,
}

impl Individual {
    /// A fresh individual awaiting evaluation.
    pub fn unscored(params: ParameterSet) -> Self {
        Self {
            params,
            fitness: None,
        }
    }
}

/// Build the generation-0 population.
///
/// Up to `size` supplied seed individuals are copied verbatim, in
/// order; remaining slots are filled with independent uniform draws
/// bounded by each parameter's range.
pub fn seed_population(
    seeds: &[ParameterSet],
    ranges: &[ParameterRange],
    size: usize,
    rng: &mut StdRng,
) -> Vec<Individual> {
    let mut population: Vec<Individual> = seeds
        .iter()
        .take(size)
        .cloned()
        .map(Individual::unscored)
        .collect();

    while population.len() < size {
        let mut set = ParameterSet::new();
        for range in ranges {
            set.insert(&range.name, range.sample(rng));
        }
        population.push(Individual::unscored(set));
    }

    population
}

/// Indices sorted by descending fitness.
///
/// The sort is stable, so equal fitness keeps original population
/// order and rank ties always resolve to the earlier index.
pub fn rank_descending(fitness: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&a, &b| {
        fitness[b]
            .partial_cmp(&fitness[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{ParamValue, ValueKind};
    use rand::SeedableRng;

    fn ranges() -> Vec<ParameterRange> {
        vec![
            ParameterRange::new("x", ValueKind::Int, 0.0, 100.0).unwrap(),
            ParameterRange::new("y", ValueKind::Float, -1.0, 1.0).unwrap(),
        ]
    }

    #[test]
    fn test_seeds_copied_verbatim_then_filled() {
        let seed = ParameterSet::new()
            .with("x", ParamValue::Int(7))
            .with("y", ParamValue::Float(0.25));
        let mut rng = StdRng::seed_from_u64(1);

        let population = seed_population(&[seed.clone()], &ranges(), 6, &mut rng);
        assert_eq!(population.len(), 6);
        assert_eq!(population[0].params, seed);
        assert!(population.iter().all(|ind| ind.fitness.is_none()));

        for ind in &population[1..] {
            let x = ind.params.get("x").unwrap().to_f64();
            let y = ind.params.get("y").unwrap().to_f64();
            assert!((0.0..=100.0).contains(&x));
            assert!((-1.0..=1.0).contains(&y));
        }
    }

    #[test]
    fn test_excess_seeds_truncated_to_size() {
        let seeds: Vec<ParameterSet> = (0..10)
            .map(|i| ParameterSet::new().with("x", ParamValue::Int(i)))
            .collect();
        let mut rng = StdRng::seed_from_u64(1);

        let population = seed_population(&seeds, &ranges()[..1], 4, &mut rng);
        assert_eq!(population.len(), 4);
        for (i, ind) in population.iter().enumerate() {
            assert_eq!(ind.params.get("x"), Some(ParamValue::Int(i as i64)));
        }
    }

    #[test]
    fn test_rank_descending_breaks_ties_by_index() {
        let fitness = [1.0, 3.0, 3.0, 2.0];
        assert_eq!(rank_descending(&fitness), vec![1, 2, 3, 0]);
    }
}
