//! Genetic optimization over a bounded parameter space.
//!
//! The optimizer runs a generational loop:
//! 1. Seed a fixed-size population (supplied individuals, then random draws)
//! 2. Evaluate fitness for every member (optionally in parallel)
//! 3. Carry elites, then breed via tournament selection, uniform
//!    crossover, and Gaussian mutation
//! 4. After the last generation, re-evaluate the final population once
//!    and return it with its fitness vector

pub mod config;
pub mod observer;
pub mod optimizer;
pub mod population;

pub use config::{EvolutionConfig, EvolveError};
pub use observer::{EvolutionObserver, GenerationRecord, RankedIndividual, TracingObserver};
pub use optimizer::{EvolutionaryOptimizer, OptimizeOutcome, SENTINEL_FITNESS};
pub use population::{rank_descending, seed_population, Individual};
