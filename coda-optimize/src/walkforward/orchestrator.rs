//! Walk-forward orchestration.
//!
//! Per window: run one independent genetic optimization restricted to
//! the training period, re-run the winning parameters once on the
//! train window and once on the test window for full metrics, then
//! aggregate stability across all windows.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::stability::{parameter_stability, ParameterStability};
use super::windows::{WalkForwardError, WalkForwardWindow, WindowConfig};
use crate::cancel::CancelToken;
use crate::evolve::{EvolutionConfig, EvolutionaryOptimizer, SENTINEL_FITNESS};
use crate::space::{ParameterRange, ParameterSet};

/// Metrics-map key used for in/out-of-sample degradation.
pub const CAGR_METRIC: &str = "cagr";

/// Boundary to the backtest engine.
///
/// Implementations instantiate the target strategy with the candidate
/// parameters, run it over the given period, and return the full
/// metrics map. Calls may be slow and may fail; failures during
/// optimization are absorbed as sentinel fitness.
pub trait BacktestRunner: Send + Sync {
    fn run(
        &self,
        params: &ParameterSet,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<BTreeMap<String, f64>>;
}

/// Full walk-forward run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    pub windows: WindowConfig,

    #[serde(default)]
    pub evolution: EvolutionConfig,

    /// Bounds for every tunable parameter.
    pub ranges: Vec<ParameterRange>,

    /// Metrics-map key the optimizer maximizes.
    #[serde(default = "default_metric")]
    pub optimization_metric: String,

    /// Individuals copied verbatim into every window's generation 0.
    /// Empty means a fully random initial population.
    #[serde(default)]
    pub seed_individuals: Vec<ParameterSet>,
}

fn default_metric() -> String {
    "balanced_score".to_string()
}

/// Outcome of one completed window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub window: WalkForwardWindow,
    /// Winning parameters from the training period.
    pub params: ParameterSet,
    pub train_metrics: BTreeMap<String, f64>,
    pub test_metrics: BTreeMap<String, f64>,
}

impl WalkForwardResult {
    pub fn in_sample_cagr(&self) -> f64 {
        self.train_metrics.get(CAGR_METRIC).copied().unwrap_or(0.0)
    }

    pub fn out_of_sample_cagr(&self) -> f64 {
        self.test_metrics.get(CAGR_METRIC).copied().unwrap_or(0.0)
    }

    /// Overfitting signal: in-sample minus out-of-sample CAGR.
    pub fn degradation(&self) -> f64 {
        self.in_sample_cagr() - self.out_of_sample_cagr()
    }
}

/// A window that could not be evaluated, with the reason it was
/// skipped. Skips are always recorded, never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedWindow {
    pub window: WalkForwardWindow,
    pub reason: String,
}

/// Cross-window aggregate, suitable for external serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardSummary {
    // Methodology parameters.
    pub windows: WindowConfig,
    pub evolution: EvolutionConfig,
    pub optimization_metric: String,

    pub results: Vec<WalkForwardResult>,
    pub skipped: Vec<SkippedWindow>,

    pub mean_in_sample_cagr: f64,
    pub mean_out_of_sample_cagr: f64,
    /// `mean(in-sample) - mean(out-of-sample)`.
    pub degradation: f64,

    /// Per-parameter spread of the winning values across windows.
    pub stability: BTreeMap<String, ParameterStability>,

    /// True when a cancellation request stopped the run early.
    pub early_terminated: bool,
}

enum WindowOutcome {
    Completed {
        result: WalkForwardResult,
        cancelled: bool,
    },
    Skipped(String),
}

/// Drives one optimizer run per window and aggregates the results.
pub struct WalkForwardOrchestrator<R: BacktestRunner> {
    config: WalkForwardConfig,
    runner: R,
    cancel: CancelToken,
}

impl<R: BacktestRunner> WalkForwardOrchestrator<R> {
    pub fn new(config: WalkForwardConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            cancel: CancelToken::new(),
        }
    }

    /// Attach a cancellation token, checked at window boundaries and
    /// forwarded to each window's optimizer.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every window and aggregate.
    pub fn run(&self) -> Result<WalkForwardSummary, WalkForwardError> {
        let windows = self.config.windows.generate()?;
        info!(
            windows = windows.len(),
            train_months = self.config.windows.train_months,
            test_months = self.config.windows.test_months,
            step_months = self.config.windows.step_months,
            metric = %self.config.optimization_metric,
            "starting walk-forward optimization"
        );

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        let mut early_terminated = false;

        for window in &windows {
            if self.cancel.is_cancelled() {
                early_terminated = true;
                break;
            }

            match self.run_window(window)? {
                WindowOutcome::Completed { result, cancelled } => {
                    results.push(result);
                    if cancelled {
                        early_terminated = true;
                        break;
                    }
                }
                WindowOutcome::Skipped(reason) => {
                    warn!(window_id = window.window_id, %reason, "window skipped");
                    skipped.push(SkippedWindow {
                        window: window.clone(),
                        reason,
                    });
                }
            }
        }

        let mean_in_sample_cagr = mean_of(&results, WalkForwardResult::in_sample_cagr);
        let mean_out_of_sample_cagr = mean_of(&results, WalkForwardResult::out_of_sample_cagr);
        let stability = parameter_stability(results.iter().map(|r| &r.params));

        info!(
            completed = results.len(),
            skipped = skipped.len(),
            mean_in_sample_cagr,
            mean_out_of_sample_cagr,
            early_terminated,
            "walk-forward optimization finished"
        );

        Ok(WalkForwardSummary {
            windows: self.config.windows.clone(),
            evolution: self.config.evolution.clone(),
            optimization_metric: self.config.optimization_metric.clone(),
            results,
            skipped,
            mean_in_sample_cagr,
            mean_out_of_sample_cagr,
            degradation: mean_in_sample_cagr - mean_out_of_sample_cagr,
            stability,
            early_terminated,
        })
    }

    fn run_window(&self, window: &WalkForwardWindow) -> Result<WindowOutcome, WalkForwardError> {
        info!(
            window_id = window.window_id,
            train_start = %window.train_start,
            train_end = %window.train_end,
            test_start = %window.test_start,
            test_end = %window.test_end,
            "optimizing window"
        );

        let metric = self.config.optimization_metric.as_str();
        let runner = &self.runner;
        let fitness = move |params: &ParameterSet| -> anyhow::Result<f64> {
            let metrics = runner.run(params, window.train_start, window.train_end)?;
            metrics.get(metric).copied().ok_or_else(|| {
                anyhow::anyhow!("metric '{}' missing from backtest result", metric)
            })
        };

        // Each window owns an independent optimizer whose seed is
        // offset by the window id, so any single window can be
        // reproduced in isolation.
        let mut evolution = self.config.evolution.clone();
        evolution.seed = evolution.seed.wrapping_add(window.window_id as u64);
        let mut optimizer = EvolutionaryOptimizer::new(evolution, self.config.ranges.clone())?
            .with_cancel_token(self.cancel.clone());
        let outcome = optimizer.optimize(&self.config.seed_individuals, &fitness)?;

        if outcome.fitness.iter().all(|&f| f == SENTINEL_FITNESS) {
            return Ok(WindowOutcome::Skipped(
                "no successful fitness evaluation in training window".to_string(),
            ));
        }

        let (best, best_fitness) = match outcome.best() {
            Some(best) => best,
            None => {
                return Ok(WindowOutcome::Skipped("empty final population".to_string()));
            }
        };
        let winner = best.params.clone();

        // Re-run the fixed winner once per period for the full metrics
        // set; no further optimization happens here.
        let train_metrics =
            match self.runner.run(&winner, window.train_start, window.train_end) {
                Ok(metrics) => metrics,
                Err(error) => {
                    return Ok(WindowOutcome::Skipped(format!(
                        "train metrics run failed: {error:#}"
                    )));
                }
            };
        let test_metrics = match self.runner.run(&winner, window.test_start, window.test_end) {
            Ok(metrics) => metrics,
            Err(error) => {
                return Ok(WindowOutcome::Skipped(format!(
                    "test run failed: {error:#}"
                )));
            }
        };

        let result = WalkForwardResult {
            window: window.clone(),
            params: winner,
            train_metrics,
            test_metrics,
        };
        info!(
            window_id = window.window_id,
            best_fitness,
            params = %result.params,
            in_sample_cagr = result.in_sample_cagr(),
            out_of_sample_cagr = result.out_of_sample_cagr(),
            "window complete"
        );

        Ok(WindowOutcome::Completed {
            result,
            cancelled: outcome.cancelled,
        })
    }
}

fn mean_of(results: &[WalkForwardResult], f: impl Fn(&WalkForwardResult) -> f64) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(f).sum::<f64>() / results.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{ParamValue, ValueKind};
    use chrono::Datelike;

    /// Deterministic stand-in for the backtest engine. The score peaks
    /// at x = 7; CAGR is 2x on train periods (which start on day 1)
    /// and 1.5x on test periods (which start on day 2).
    struct FakeRunner {
        fail_on_start: Option<NaiveDate>,
    }

    impl BacktestRunner for FakeRunner {
        fn run(
            &self,
            params: &ParameterSet,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> anyhow::Result<BTreeMap<String, f64>> {
            if self.fail_on_start == Some(start) {
                anyhow::bail!("no data for period starting {start}");
            }

            let x = params.get("x").unwrap().to_f64();
            let factor = if start.day() == 1 { 2.0 } else { 1.5 };

            let mut metrics = BTreeMap::new();
            metrics.insert("balanced_score".to_string(), -(x - 7.0).powi(2));
            metrics.insert(CAGR_METRIC.to_string(), x * factor);
            Ok(metrics)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config() -> WalkForwardConfig {
        WalkForwardConfig {
            windows: WindowConfig {
                start_date: date(2020, 1, 1),
                end_date: date(2023, 1, 1),
                train_months: 12,
                test_months: 6,
                step_months: 6,
                max_windows: None,
            },
            // Seeded with the known optimum and no variation operators,
            // so every window deterministically selects x = 7.
            evolution: EvolutionConfig {
                population_size: 8,
                generations: 2,
                elitism_count: 1,
                tournament_size: 3,
                crossover_rate: 0.0,
                mutation_rate: 0.0,
                mutation_strength: 0.0,
                seed: 42,
                workers: Some(1),
                top_k: 3,
            },
            ranges: vec![ParameterRange::new("x", ValueKind::Int, 0.0, 10.0).unwrap()],
            optimization_metric: "balanced_score".to_string(),
            seed_individuals: vec![ParameterSet::new().with("x", ParamValue::Int(7))],
        }
    }

    #[test]
    fn test_run_aggregates_across_windows() {
        let orchestrator =
            WalkForwardOrchestrator::new(config(), FakeRunner { fail_on_start: None });
        let summary = orchestrator.run().unwrap();

        assert_eq!(summary.results.len(), 3);
        assert!(summary.skipped.is_empty());
        assert!(!summary.early_terminated);

        for result in &summary.results {
            assert_eq!(result.params.get("x"), Some(ParamValue::Int(7)));
            assert!((result.in_sample_cagr() - 14.0).abs() < 1e-12);
            assert!((result.out_of_sample_cagr() - 10.5).abs() < 1e-12);
            assert!((result.degradation() - 3.5).abs() < 1e-12);
        }

        assert!((summary.mean_in_sample_cagr - 14.0).abs() < 1e-12);
        assert!((summary.mean_out_of_sample_cagr - 10.5).abs() < 1e-12);
        assert!((summary.degradation - 3.5).abs() < 1e-12);

        // Identical winners in every window: perfectly stable.
        let x = &summary.stability["x"];
        assert_eq!(x.mean, 7.0);
        assert_eq!(x.cv, 0.0);
    }

    #[test]
    fn test_failing_window_is_recorded_not_dropped() {
        // Window 2 trains from 2021-01-01; every fitness call in it
        // fails, so it is skipped while the others complete.
        let runner = FakeRunner {
            fail_on_start: Some(date(2021, 1, 1)),
        };
        let orchestrator = WalkForwardOrchestrator::new(config(), runner);
        let summary = orchestrator.run().unwrap();

        assert_eq!(summary.results.len(), 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].window.window_id, 2);
        assert!(summary.skipped[0]
            .reason
            .contains("no successful fitness evaluation"));
    }

    #[test]
    fn test_cancellation_sets_early_flag() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let orchestrator =
            WalkForwardOrchestrator::new(config(), FakeRunner { fail_on_start: None })
                .with_cancel_token(cancel);
        let summary = orchestrator.run().unwrap();

        assert!(summary.early_terminated);
        assert!(summary.results.is_empty());
    }

    #[test]
    fn test_too_short_range_surfaces_error() {
        let mut cfg = config();
        cfg.windows.end_date = date(2020, 6, 1);

        let orchestrator =
            WalkForwardOrchestrator::new(cfg, FakeRunner { fail_on_start: None });
        assert!(matches!(
            orchestrator.run(),
            Err(WalkForwardError::NoWindows { .. })
        ));
    }

    #[test]
    fn test_summary_serializes() {
        let orchestrator =
            WalkForwardOrchestrator::new(config(), FakeRunner { fail_on_start: None });
        let summary = orchestrator.run().unwrap();

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"degradation\""));
        assert!(json.contains("\"stability\""));
    }
}
