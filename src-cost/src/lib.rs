//! AutoPID - Cost functionals for trial evaluation
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
//! During a trial the driver feeds every control-loop sample into a
//! [`CostAccumulator`]; at the end of the trial [`CostAccumulator::final_cost`]
//! is handed to the optimizer, which minimizes it.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cost returned by MSE when no sample was accumulated
///
/// Large but finite so that `<` comparisons in the optimizers still rank
/// an empty trial as very bad.
pub const EMPTY_TRIAL_COST: f64 = 1_000_000.0;

/// The cost functional used to score a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostKind {
    /// Mean squared error: (1/N) * sum(e^2)
    Mse,
    /// Integral of absolute error: sum(|e|)
    Iae,
    /// Integral of time-weighted absolute error: sum(t * |e|), t in seconds
    Itae,
}

impl fmt::Display for CostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CostKind::Mse => "MSE",
            CostKind::Iae => "IAE",
            CostKind::Itae => "ITAE",
        };
        f.write_str(name)
    }
}

/// Stateful reducer turning a stream of (error, elapsed time) samples into one cost
#[derive(Debug, Clone, PartialEq)]
pub enum CostAccumulator {
    Mse { sum_squares: f64, count: u64 },
    Iae { sum_abs: f64 },
    Itae { sum_weighted: f64 },
}

impl CostAccumulator {
    /// Create an empty accumulator of the given kind
    pub fn new(kind: CostKind) -> Self {
        match kind {
            CostKind::Mse => CostAccumulator::Mse { sum_squares: 0.0, count: 0 },
            CostKind::Iae => CostAccumulator::Iae { sum_abs: 0.0 },
            CostKind::Itae => CostAccumulator::Itae { sum_weighted: 0.0 },
        }
    }

    pub fn kind(&self) -> CostKind {
        match self {
            CostAccumulator::Mse { .. } => CostKind::Mse,
            CostAccumulator::Iae { .. } => CostKind::Iae,
            CostAccumulator::Itae { .. } => CostKind::Itae,
        }
    }

    /// Clear the running sums before a new trial
    pub fn reset(&mut self) {
        *self = CostAccumulator::new(self.kind());
    }

    /// Fold one sample
    ///
    /// # Arguments
    /// * `error` - setpoint minus measured value
    /// * `elapsed_ms` - milliseconds since the trial started
    pub fn accumulate(&mut self, error: f64, elapsed_ms: u64) {
        match self {
            CostAccumulator::Mse { sum_squares, count } => {
                *sum_squares += error * error;
                *count += 1;
            }
            CostAccumulator::Iae { sum_abs } => {
                *sum_abs += error.abs();
            }
            CostAccumulator::Itae { sum_weighted } => {
                let t_seconds = elapsed_ms as f64 / 1000.0;
                *sum_weighted += t_seconds * error.abs();
            }
        }
    }

    /// The scalar handed to the optimizer
    pub fn final_cost(&self) -> f64 {
        match *self {
            CostAccumulator::Mse { count: 0, .. } => EMPTY_TRIAL_COST,
            CostAccumulator::Mse { sum_squares, count } => sum_squares / count as f64,
            CostAccumulator::Iae { sum_abs } => sum_abs,
            CostAccumulator::Itae { sum_weighted } => sum_weighted,
        }
    }

    /// Label used in logs
    pub fn name(&self) -> &'static str {
        match self.kind() {
            CostKind::Mse => "MSE",
            CostKind::Iae => "IAE",
            CostKind::Itae => "ITAE",
        }
    }
}

impl From<CostKind> for CostAccumulator {
    fn from(kind: CostKind) -> Self {
        CostAccumulator::new(kind)
    }
}
