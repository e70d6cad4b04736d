//! AutoPID - Command-line interface of the tuner
//!
//! Copyright (C) 2025 Pierre Aubert pierre(at)spinorama(dot)org
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <https://www.gnu.org/licenses/>.

use autopid_cost::CostKind;
use autopid_optim::{Algorithm, TunerConfig, TunerConfigBuilder};
use clap::Parser;
use std::path::PathBuf;
use std::process;

use crate::workflow::TrialSettings;

/// Tune the PID gains of a distance-keeping cart.
///
/// Every trial is checkpointed: run the same command again after an
/// interruption and tuning resumes where it stopped.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Search strategy.
    #[arg(short, long, value_enum, default_value_t = Algorithm::Pso)]
    pub algorithm: Algorithm,

    /// Cost computed from the control error of each trial.
    #[arg(short, long, value_enum, default_value_t = CostKind::Mse)]
    pub cost: CostKind,

    /// Candidates evaluated per generation (DE needs at least 4).
    #[arg(short = 'n', long, default_value_t = 4)]
    pub population: usize,

    /// Generations to run.
    #[arg(short, long, default_value_t = 50)]
    pub iterations: usize,

    /// Directory for checkpoints and logs.
    /// Defaults to $AUTOPID_DIR/data_generated, then ./data_generated.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Delete the checkpoint and logs of the selected algorithm, then start over.
    #[arg(long, default_value_t = false)]
    pub reset: bool,

    /// Seed for the optimizer and the simulated sensor noise.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Distance to hold, in cm.
    #[arg(long, default_value_t = 20.0, value_parser = parse_strictly_positive_f64)]
    pub setpoint: f64,

    /// Distance the cart starts each trial from, in cm.
    #[arg(long, default_value_t = 60.0, value_parser = parse_nonnegative_f64)]
    pub start_distance: f64,

    /// Length of one trial, in ms.
    #[arg(long, default_value_t = 5000, value_parser = parse_positive_u64)]
    pub trial_ms: u64,

    /// Control loop period, in ms.
    #[arg(long, default_value_t = 20, value_parser = parse_positive_u64)]
    pub sample_ms: u64,

    /// Stop after this many trials even if tuning is not done.
    #[arg(long)]
    pub max_trials: Option<usize>,
}

impl Args {
    /// Optimizer settings; gene bounds and coefficients keep their defaults
    pub fn tuner_config(&self) -> TunerConfig {
        let builder =
            TunerConfigBuilder::new().population(self.population).max_iterations(self.iterations);
        match self.seed {
            Some(seed) => builder.seed(seed).build(),
            None => builder.build(),
        }
    }

    pub fn trial_settings(&self) -> TrialSettings {
        TrialSettings {
            setpoint_cm: self.setpoint,
            start_distance_cm: self.start_distance,
            duration_ms: self.trial_ms,
            sample_period_ms: self.sample_ms,
            cost: self.cost,
        }
    }
}

/// Check combinations of arguments that clap cannot check on its own
pub fn validate_args(args: &Args) -> Result<(), String> {
    if args.algorithm == Algorithm::De && args.population < 4 {
        return Err(format!(
            "DE needs a population of at least 4, got {}",
            args.population
        ));
    }
    if args.population == 0 {
        return Err("population must be > 0".to_string());
    }
    if args.iterations == 0 {
        return Err("iterations must be > 0".to_string());
    }
    if args.sample_ms > args.trial_ms {
        return Err(format!(
            "sample period ({} ms) is longer than the trial ({} ms)",
            args.sample_ms, args.trial_ms
        ));
    }
    Ok(())
}

/// Validate arguments and exit with an error message if validation fails
pub fn validate_args_or_exit(args: &Args) {
    if let Err(error) = validate_args(args) {
        eprintln!("Validation error: {error}");
        process::exit(1);
    }
}

fn parse_strictly_positive_f64(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("invalid float: {s}"))?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err("value must be strictly positive (> 0)".to_string())
    }
}

fn parse_nonnegative_f64(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("invalid float: {s}"))?;
    if v >= 0.0 {
        Ok(v)
    } else {
        Err("value must be non-negative (>= 0)".to_string())
    }
}

fn parse_positive_u64(s: &str) -> Result<u64, String> {
    let v: u64 = s.parse().map_err(|_| format!("invalid integer: {s}"))?;
    if v > 0 {
        Ok(v)
    } else {
        Err("value must be > 0".to_string())
    }
}
