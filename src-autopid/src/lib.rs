//! AutoPID - Automatic PID gain tuning
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
//!
//! The driver side of the tuner: a distance-keeping cart (simulated here),
//! its PID loop and Kalman-smoothed sensor, and the loop that feeds trial
//! costs to an [`Optimizer`] and checkpoints after every trial.
//!
//! - `autopid_optim`: PSO and DE engines, checkpoint codec, blob store
//! - `autopid_cost`: MSE, IAE and ITAE cost functionals
//! - `autopid_env`: data directory resolution

pub use autopid_cost as cost;
pub use autopid_optim as optim;

pub use autopid_optim::{Algorithm, Candidate, Optimizer};

/// Command-line arguments of the `autopid` binary
pub mod cli;
/// Errors surfaced by the driver
pub mod error;
/// Scalar Kalman filter for the distance sensor
pub mod kalman;
/// Simulated cart and PID controller
pub mod plant;
/// Trial execution and the tuning loop
pub mod workflow;

pub use cli::Args;
pub use error::{DriverError, Result};
pub use kalman::SimpleKalmanFilter;
pub use plant::{PidController, SimulatedPlant};
pub use workflow::{TrialOutcome, TrialSettings, run_trial, run_tuning};

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize `env_logger` once; `RUST_LOG` overrides the `info` default
pub fn init_logging() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_millis()
            .init();
    });
}
