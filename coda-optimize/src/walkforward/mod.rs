//! Walk-forward optimization over rolling train/test windows.
//!
//! Each window optimizes parameters on its training period, validates
//! the winner on the disjoint test period that follows, and the
//! cross-window aggregate measures how much performance degrades out
//! of sample.

pub mod orchestrator;
pub mod stability;
pub mod windows;

pub use orchestrator::{
    BacktestRunner, SkippedWindow, WalkForwardConfig, WalkForwardOrchestrator, WalkForwardResult,
    WalkForwardSummary, CAGR_METRIC,
};
pub use stability::{parameter_stability, ParameterStability};
pub use windows::{WalkForwardError, WalkForwardWindow, WindowConfig};
