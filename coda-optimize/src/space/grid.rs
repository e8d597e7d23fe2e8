//! Exhaustive grid search over declared value lists.
//!
//! Produces the full Cartesian product in deterministic order: the
//! first declared parameter varies slowest, the last varies fastest,
//! matching nested-loop enumeration.

use serde::{Deserialize, Serialize};

use super::types::{check_unique_names, ParamValue, ParameterSet, SpaceError};

/// One grid axis: a parameter name and its candidate values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridParameter {
    pub name: String,
    pub values: Vec<ParamValue>,
}

/// A validated grid of candidate values, one axis per parameter.
///
/// Declaration order is preserved and defines enumeration order.
#[derive(Debug, Clone, Default)]
pub struct GridSpace {
    parameters: Vec<GridParameter>,
}

impl GridSpace {
    /// Build a grid from declared axes, failing fast on an empty value
    /// list or a duplicate parameter name.
    pub fn new(parameters: Vec<GridParameter>) -> Result<Self, SpaceError> {
        check_unique_names(parameters.iter().map(|p| p.name.as_str()))?;
        for param in &parameters {
            if param.values.is_empty() {
                return Err(SpaceError::EmptyValues(param.name.clone()));
            }
        }
        Ok(Self { parameters })
    }

    pub fn parameters(&self) -> &[GridParameter] {
        &self.parameters
    }

    /// Total number of combinations the grid will produce.
    pub fn total_combinations(&self) -> usize {
        self.parameters.iter().map(|p| p.values.len()).product()
    }

    /// Enumerate every combination as the Cartesian product.
    ///
    /// An empty grid yields a single empty parameter set.
    pub fn combinations(&self) -> Vec<ParameterSet> {
        if self.parameters.is_empty() {
            return vec![ParameterSet::new()];
        }

        let mut combos = Vec::with_capacity(self.total_combinations());
        let mut indices = vec![0usize; self.parameters.len()];

        loop {
            let mut set = ParameterSet::new();
            for (axis, &idx) in self.parameters.iter().zip(indices.iter()) {
                set.insert(&axis.name, axis.values[idx]);
            }
            combos.push(set);

            // Odometer increment: last axis spins fastest.
            let mut carry = true;
            for i in (0..indices.len()).rev() {
                if carry {
                    indices[i] += 1;
                    if indices[i] >= self.parameters[i].values.len() {
                        indices[i] = 0;
                    } else {
                        carry = false;
                    }
                }
            }
            if carry {
                break;
            }
        }

        combos
    }

    /// Project how long a serial sweep of the grid would take.
    ///
    /// Pure arithmetic on the combination count; does not run anything.
    /// Returns `(combinations, hours)`.
    pub fn estimate_runtime(&self, avg_eval_secs: f64) -> (usize, f64) {
        let count = self.total_combinations();
        (count, count as f64 * avg_eval_secs / 3600.0)
    }
}
