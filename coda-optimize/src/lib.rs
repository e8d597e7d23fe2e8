pub mod cancel;
pub mod evolve;
pub mod space;
pub mod walkforward;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use evolve::{
    EvolutionConfig, EvolutionObserver, EvolutionaryOptimizer, EvolveError, GenerationRecord,
    Individual, OptimizeOutcome, TracingObserver, SENTINEL_FITNESS,
};
pub use space::{
    Distribution, GridSpace, ParamValue, ParameterRange, ParameterSet, RandomSpace, SpaceError,
    SpaceFile, ValueKind,
};
pub use walkforward::{
    BacktestRunner, ParameterStability, SkippedWindow, WalkForwardConfig, WalkForwardError,
    WalkForwardOrchestrator, WalkForwardResult, WalkForwardSummary, WalkForwardWindow,
    WindowConfig,
};
