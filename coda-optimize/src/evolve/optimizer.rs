//! Generational genetic optimizer with parallel fitness evaluation.
//!
//! One coordinating thread owns the RNG and drives generations strictly
//! in sequence. Within a generation the fitness calls fan out over a
//! bounded worker pool and are collected by population index before
//! selection runs; selection, crossover, and mutation never execute
//! concurrently with evaluation.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::config::{EvolutionConfig, EvolveError};
use super::observer::{EvolutionObserver, GenerationRecord, TracingObserver};
use super::population::{rank_descending, seed_population, Individual};
use crate::cancel::CancelToken;
use crate::space::{ParameterRange, ParameterSet};

/// Fitness assigned to an individual whose evaluation failed.
///
/// Failed evaluations sink to the bottom of the ranking instead of
/// aborting the run.
pub const SENTINEL_FITNESS: f64 = -999.0;

/// Final state of an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeOutcome {
    /// The final population, fitness filled in.
    pub population: Vec<Individual>,
    /// Fitness vector, index-aligned with the population.
    pub fitness: Vec<f64>,
    /// Generations actually evaluated.
    pub generations_run: usize,
    /// True when the run stopped at a cancellation check.
    pub cancelled: bool,
}

impl OptimizeOutcome {
    /// Index of the best individual: maximum fitness, earliest
    /// population index on ties.
    pub fn best_index(&self) -> Option<usize> {
        rank_descending(&self.fitness).first().copied()
    }

    /// The best individual and its fitness.
    pub fn best(&self) -> Option<(&Individual, f64)> {
        self.best_index()
            .map(|i| (&self.population[i], self.fitness[i]))
    }
}

/// Genetic optimizer over a bounded parameter space.
///
/// Each instance owns its RNG; nothing is shared across runs, so
/// concurrent optimizers never interfere with each other.
pub struct EvolutionaryOptimizer {
    config: EvolutionConfig,
    ranges: Vec<ParameterRange>,
    rng: StdRng,
    pool: Option<rayon::ThreadPool>,
    observer: Box<dyn EvolutionObserver>,
    cancel: CancelToken,
}

impl EvolutionaryOptimizer {
    /// Build an optimizer, validating configuration and ranges before
    /// any evaluation can start.
    pub fn new(
        config: EvolutionConfig,
        ranges: Vec<ParameterRange>,
    ) -> Result<Self, EvolveError> {
        config.validate()?;
        if ranges.is_empty() {
            return Err(EvolveError::NoRanges);
        }
        crate::space::types::check_unique_names(ranges.iter().map(|r| r.name.as_str()))?;
        for range in &ranges {
            range.validate()?;
        }

        let workers = config.worker_count();
        let pool = if workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| EvolveError::WorkerPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            ranges,
            pool,
            observer: Box::new(TracingObserver),
            cancel: CancelToken::new(),
        })
    }

    /// Replace the default tracing observer.
    pub fn with_observer(mut self, observer: Box<dyn EvolutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Attach a cancellation token, checked at generation boundaries.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the full generational loop.
    ///
    /// Seed individuals are copied verbatim into generation 0; the
    /// remaining slots are filled with random draws. The returned
    /// fitness vector is index-aligned with the returned population
    /// and contains no unevaluated entries.
    pub fn optimize<F>(
        &mut self,
        seeds: &[ParameterSet],
        fitness_fn: &F,
    ) -> Result<OptimizeOutcome, EvolveError>
    where
        F: Fn(&ParameterSet) -> anyhow::Result<f64> + Send + Sync,
    {
        self.validate_seeds(seeds)?;

        let size = self.config.population_size;
        let mut population = seed_population(seeds, &self.ranges, size, &mut self.rng);

        info!(
            population_size = size,
            generations = self.config.generations,
            workers = self.config.worker_count(),
            seed = self.config.seed,
            "starting genetic optimization"
        );

        for generation in 0..self.config.generations {
            let started = Instant::now();
            let fitness = self.evaluate_population(&population, fitness_fn);
            for (individual, &score) in population.iter_mut().zip(fitness.iter()) {
                individual.fitness = Some(score);
            }

            let record = GenerationRecord::capture(
                generation,
                &population,
                &fitness,
                started.elapsed().as_secs_f64(),
                self.config.top_k,
            );
            self.observer.on_generation(&record);

            if self.cancel.is_cancelled() {
                info!(generation, "cancellation requested, returning results so far");
                return Ok(OptimizeOutcome {
                    population,
                    fitness,
                    generations_run: generation + 1,
                    cancelled: true,
                });
            }

            population = self.breed(&population, &fitness);
            debug_assert_eq!(population.len(), size);
        }

        // One extra scoring pass over the final population. Fitness is
        // not assumed perfectly deterministic (a backtest may carry
        // stochastic slippage), so stale generational scores are
        // refreshed before the population is handed back.
        let fitness = self.evaluate_population(&population, fitness_fn);
        for (individual, &score) in population.iter_mut().zip(fitness.iter()) {
            individual.fitness = Some(score);
        }

        Ok(OptimizeOutcome {
            population,
            fitness,
            generations_run: self.config.generations,
            cancelled: false,
        })
    }

    /// Evaluate every member, in parallel when a pool is configured.
    ///
    /// Results are collected by population index, so evaluation order
    /// never affects the outcome. A failed evaluation is logged and
    /// scored with the sentinel instead of halting the generation.
    fn evaluate_population<F>(&self, population: &[Individual], fitness_fn: &F) -> Vec<f64>
    where
        F: Fn(&ParameterSet) -> anyhow::Result<f64> + Send + Sync,
    {
        let score = |individual: &Individual| match fitness_fn(&individual.params) {
            Ok(value) => value,
            Err(error) => {
                warn!(params = %individual.params, %error, "fitness evaluation failed");
                SENTINEL_FITNESS
            }
        };

        match &self.pool {
            Some(pool) => pool.install(|| population.par_iter().map(score).collect()),
            None => population.iter().map(score).collect(),
        }
    }

    /// Produce the next generation: elites, then tournament-selected
    /// offspring until the population size is reached.
    fn breed(&mut self, population: &[Individual], fitness: &[f64]) -> Vec<Individual> {
        let size = self.config.population_size;
        let order = rank_descending(fitness);
        let mut next = Vec::with_capacity(size);

        // Elites carry over by value, untouched by crossover or mutation.
        for &i in order.iter().take(self.config.elitism_count) {
            next.push(population[i].clone());
        }

        while next.len() < size {
            let p1 = self.tournament(fitness);
            let p2 = self.tournament(fitness);
            let (c1, c2) =
                self.crossover(&population[p1].params, &population[p2].params);
            let c1 = self.mutate(c1);
            let c2 = self.mutate(c2);

            next.push(Individual::unscored(c1));
            if next.len() < size {
                next.push(Individual::unscored(c2));
            }
        }

        next
    }

    /// Uniform random tournament: the fittest of `tournament_size`
    /// draws wins, earlier draws winning ties.
    fn tournament(&mut self, fitness: &[f64]) -> usize {
        let mut best = self.rng.random_range(0..fitness.len());
        for _ in 1..self.config.tournament_size {
            let challenger = self.rng.random_range(0..fitness.len());
            if fitness[challenger] > fitness[best] {
                best = challenger;
            }
        }
        best
    }

    /// Uniform crossover. With probability `crossover_rate` each
    /// parameter independently has a 50% chance of swapping between
    /// the parents; otherwise the offspring are exact copies.
    fn crossover(
        &mut self,
        a: &ParameterSet,
        b: &ParameterSet,
    ) -> (ParameterSet, ParameterSet) {
        if self.rng.random::<f64>() >= self.config.crossover_rate {
            return (a.clone(), b.clone());
        }

        let mut c1 = ParameterSet::new();
        let mut c2 = ParameterSet::new();
        for ((name, va), (_, vb)) in a.iter().zip(b.iter()) {
            if self.rng.random_bool(0.5) {
                c1.insert(name, vb);
                c2.insert(name, va);
            } else {
                c1.insert(name, va);
                c2.insert(name, vb);
            }
        }
        (c1, c2)
    }

    /// Per-parameter Gaussian mutation, clamped to the range. Integer
    /// parameters are rounded after the noise is applied.
    fn mutate(&mut self, set: ParameterSet) -> ParameterSet {
        let mut out = set;
        for range in &self.ranges {
            if self.rng.random::<f64>() >= self.config.mutation_rate {
                continue;
            }
            let current = out
                .get(&range.name)
                .map(|v| v.to_f64())
                .unwrap_or(range.min);
            let sigma = self.config.mutation_strength * (range.max - range.min);
            let mutated = if sigma > 0.0 {
                match Normal::new(0.0, sigma) {
                    Ok(noise) => current + noise.sample(&mut self.rng),
                    Err(_) => current,
                }
            } else {
                current
            };
            out.insert(&range.name, range.clamp_to(mutated));
        }
        out
    }

    /// Reject seed individuals with unknown, missing, or out-of-range
    /// parameters before the run starts.
    fn validate_seeds(&self, seeds: &[ParameterSet]) -> Result<(), EvolveError> {
        for (index, seed) in seeds.iter().enumerate() {
            if seed.len() != self.ranges.len() {
                return Err(EvolveError::InvalidSeed {
                    index,
                    reason: format!(
                        "expected {} parameters, got {}",
                        self.ranges.len(),
                        seed.len()
                    ),
                });
            }
            for range in &self.ranges {
                match seed.get(&range.name) {
                    None => {
                        return Err(EvolveError::InvalidSeed {
                            index,
                            reason: format!("missing parameter '{}'", range.name),
                        });
                    }
                    Some(value) if !range.contains(value) => {
                        return Err(EvolveError::InvalidSeed {
                            index,
                            reason: format!(
                                "'{}'={} outside [{}, {}]",
                                range.name, value, range.min, range.max
                            ),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}
