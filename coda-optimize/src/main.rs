//! # Inspect a grid search space
//! coda-optimize grid --space config/space.toml --avg-eval-secs 2.5
//!
//! # Draw random parameter sets
//! coda-optimize sample --space config/space.toml --samples 20 --seed 42
//!
//! # Estimate discrete-parameter coverage without sampling
//! coda-optimize coverage --space config/space.toml --samples 200
//!
//! # Preview the walk-forward window plan
//! coda-optimize windows --start 2020-01-01 --end 2023-01-01 \
//!     --train-months 12 --test-months 6 --step-months 6

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use coda_optimize::{GridSpace, RandomSpace, SpaceFile, WindowConfig};

#[derive(Parser)]
#[command(name = "coda-optimize")]
#[command(about = "Parameter optimization engine for trading strategy backtests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate a grid space and project its sweep cost
    Grid {
        /// Path to a search-space TOML file
        #[arg(short, long)]
        space: PathBuf,

        /// Average seconds per evaluation for the runtime projection
        #[arg(long)]
        avg_eval_secs: Option<f64>,

        /// Print every combination as JSON
        #[arg(long)]
        list: bool,
    },

    /// Draw random parameter sets from a distribution space
    Sample {
        /// Path to a search-space TOML file
        #[arg(short, long)]
        space: PathBuf,

        /// Number of parameter sets to draw
        #[arg(short = 'n', long, default_value_t = 10)]
        samples: usize,

        /// RNG seed for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Closed-form coverage estimate for discrete parameters
    Coverage {
        /// Path to a search-space TOML file
        #[arg(short, long)]
        space: PathBuf,

        /// Hypothetical number of random samples
        #[arg(short = 'n', long)]
        samples: usize,
    },

    /// Preview the walk-forward window plan for a date range
    Windows {
        /// Overall start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Overall end date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Training period length in months
        #[arg(long, default_value_t = 12)]
        train_months: u32,

        /// Test period length in months
        #[arg(long, default_value_t = 3)]
        test_months: u32,

        /// Months to roll forward between windows
        #[arg(long, default_value_t = 3)]
        step_months: u32,

        /// Cap on the number of windows
        #[arg(long)]
        max_windows: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Grid {
            space,
            avg_eval_secs,
            list,
        } => {
            let file = SpaceFile::load(&space)?;
            let grid = GridSpace::new(file.grid)?;

            println!("combinations: {}", grid.total_combinations());
            if let Some(secs) = avg_eval_secs {
                let (_, hours) = grid.estimate_runtime(secs);
                println!(
                    "estimated serial runtime: {:.2} hours at {:.1}s per evaluation",
                    hours, secs
                );
            }
            if list {
                println!("{}", serde_json::to_string_pretty(&grid.combinations())?);
            }
        }

        Commands::Sample {
            space,
            samples,
            seed,
        } => {
            let file = SpaceFile::load(&space)?;
            let random = RandomSpace::new(file.random)?;
            let sets = random.sample(samples, seed);
            println!("{}", serde_json::to_string_pretty(&sets)?);
        }

        Commands::Coverage { space, samples } => {
            let file = SpaceFile::load(&space)?;
            let random = RandomSpace::new(file.random)?;
            let coverage = random.estimate_coverage(samples);

            if coverage.is_empty() {
                println!("no discrete (choice) parameters in the space");
            } else {
                for (name, fraction) in &coverage {
                    println!("{}: {:.1}% expected coverage", name, fraction * 100.0);
                }
            }
        }

        Commands::Windows {
            start,
            end,
            train_months,
            test_months,
            step_months,
            max_windows,
        } => {
            let config = WindowConfig {
                start_date: start,
                end_date: end,
                train_months,
                test_months,
                step_months,
                max_windows,
            };
            let windows = config.generate()?;

            for window in &windows {
                println!(
                    "window {:>2}: train {} to {} ({} days)  test {} to {} ({} days)",
                    window.window_id,
                    window.train_start,
                    window.train_end,
                    window.train_days(),
                    window.test_start,
                    window.test_end,
                    window.test_days()
                );
            }
            println!("{} windows", windows.len());
        }
    }

    Ok(())
}
