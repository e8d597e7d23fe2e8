//! Parameter search space definition and generators.
//!
//! This module provides the building blocks for describing a tunable
//! parameter space and enumerating candidate configurations from it:
//! - Typed parameter values, sets, and bounded ranges
//! - Grid search (exhaustive Cartesian product)
//! - Random search (seeded sampling over distributions)

pub mod grid;
pub mod random;
pub mod types;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use grid::{GridParameter, GridSpace};
pub use random::{Distribution, RandomParameter, RandomSpace};
pub use types::{ParamValue, ParameterRange, ParameterSet, SpaceError, ValueKind};

/// On-disk search-space description, loaded from TOML.
///
/// A file may declare a grid section, a random section, or both:
///
/// ```toml
/// [[grid]]
/// name = "lookback"
/// values = [10, 20, 40]
///
/// [[random]]
/// name = "threshold"
/// kind = "uniform"
/// min = 0.1
/// max = 0.9
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpaceFile {
    #[serde(default)]
    pub grid: Vec<GridParameter>,
    #[serde(default)]
    pub random: Vec<RandomParameter>,
}

impl SpaceFile {
    /// Load and parse a search-space file.
    pub fn load(path: &Path) -> Result<Self, SpaceError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
