//! Cross-window parameter stability statistics.
//!
//! A parameter whose winning value barely moves across windows (low
//! coefficient of variation) is a robust choice; one that swings
//! window to window was likely fit to noise.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::space::ParameterSet;

/// Distribution of one parameter's winning value across windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterStability {
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Coefficient of variation, `std_dev / mean`.
    pub cv: f64,
}

/// Compute per-parameter stability over the winning sets of all
/// completed windows.
pub fn parameter_stability<'a, I>(winners: I) -> BTreeMap<String, ParameterStability>
where
    I: IntoIterator<Item = &'a ParameterSet>,
{
    let mut by_name: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for set in winners {
        for (name, value) in set.iter() {
            by_name.entry(name.to_string()).or_default().push(value.to_f64());
        }
    }

    by_name
        .into_iter()
        .map(|(name, values)| {
            let mean = Statistics::mean(&values);
            let std_dev = Statistics::population_std_dev(&values);
            let cv = if mean == 0.0 { 0.0 } else { std_dev / mean };
            (name, ParameterStability { mean, std_dev, cv })
        })
        .collect()
}
