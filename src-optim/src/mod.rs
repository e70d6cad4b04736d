//! Resumable population-based PID gain tuning
//!
//! Two engines, [`Pso`] (particle swarm) and [`De`] (differential evolution),
//! propose one (Kp, Ki, Kd) candidate per physical trial. The driver runs the
//! trial, reduces the control error to one cost and hands it back:
//!
//! ```text
//! loop {
//!     let gains = opt.get_current_parameters()?;   // 1. candidate
//!     let cost  = run_trial(gains);               //    (robot)
//!     opt.submit_trial_cost(cost)?;               // 2. selection
//!     opt.advance()?;                             // 3. next member
//!     opt.save_checkpoint()?;                     //    survive power loss
//!     if opt.is_done() { break; }
//! }
//! ```
//!
//! The order 1 -> 2 -> 3 is enforced; see [`TrialPhase`]. State is
//! checkpointed to a [`BlobStore`] as a versioned fixed-width record
//! ([`checkpoint`]) and can be reloaded to resume exactly where it stopped.

use std::fmt;

use clap::ValueEnum;
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub mod checkpoint;
pub mod config;
pub mod de;
pub mod error;
pub mod pso;
pub mod recorder;
pub mod store;

mod clip_inplace;
mod crossover_binomial;
mod distinct_indices;
mod mutant_rand1;

pub use config::{DEFAULT_BOUNDS, TunerConfig, TunerConfigBuilder};
pub use de::{De, DeState};
pub use error::{CheckpointError, OptimizerError, ProtocolError, Result};
pub use pso::{Pso, PsoState};
pub use store::{BlobStore, DirStore, MemoryStore};

/// Genes per candidate: Kp, Ki, Kd
pub const DIMENSIONS: usize = 3;

/// Cost of a member that has not been evaluated yet
pub const UNEVALUATED_COST: f64 = f64::INFINITY;

/// One point in gain space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Candidate {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    /// From a population row; the row must hold `DIMENSIONS` genes
    pub fn from_row(row: ArrayView1<'_, f64>) -> Self {
        Self { kp: row[0], ki: row[1], kd: row[2] }
    }

    pub fn to_array(&self) -> [f64; DIMENSIONS] {
        [self.kp, self.ki, self.kd]
    }

    /// Whether every gene lies in its closed interval
    pub fn within(&self, bounds: &[(f64, f64); DIMENSIONS]) -> bool {
        self.to_array().iter().zip(bounds.iter()).all(|(&x, &(lo, hi))| lo <= x && x <= hi)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.4}, {:.4}, {:.4}]", self.kp, self.ki, self.kd)
    }
}

/// Where the current member is in the get -> submit -> advance sequence
///
/// Persisted with the checkpoint so a resumed engine enforces the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TrialPhase {
    /// Nothing handed out yet for this member
    #[default]
    Idle = 0,
    /// Candidate handed out, waiting for its cost
    Proposed = 1,
    /// Cost recorded, waiting for `advance()`
    Evaluated = 2,
}

impl TrialPhase {
    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(TrialPhase::Idle),
            1 => Some(TrialPhase::Proposed),
            2 => Some(TrialPhase::Evaluated),
            _ => None,
        }
    }

    /// Hand out a candidate; repeated requests are fine until the cost arrives
    pub(crate) fn propose(
        &mut self,
        generation: usize,
        member: usize,
    ) -> std::result::Result<(), ProtocolError> {
        match self {
            TrialPhase::Idle | TrialPhase::Proposed => {
                *self = TrialPhase::Proposed;
                Ok(())
            }
            TrialPhase::Evaluated => Err(ProtocolError::AlreadyEvaluated { generation, member }),
        }
    }

    pub(crate) fn evaluate(
        &mut self,
        generation: usize,
        member: usize,
    ) -> std::result::Result<(), ProtocolError> {
        match self {
            TrialPhase::Proposed => {
                *self = TrialPhase::Evaluated;
                Ok(())
            }
            TrialPhase::Idle => Err(ProtocolError::NoCandidate { generation, member }),
            TrialPhase::Evaluated => Err(ProtocolError::AlreadyEvaluated { generation, member }),
        }
    }

    pub(crate) fn finish(
        &mut self,
        generation: usize,
        member: usize,
    ) -> std::result::Result<(), ProtocolError> {
        match self {
            TrialPhase::Evaluated => {
                *self = TrialPhase::Idle;
                Ok(())
            }
            _ => Err(ProtocolError::NotEvaluated { generation, member }),
        }
    }
}

/// Linear schedule from `initial` (step 0) to `terminal` (step `max_steps`)
///
/// Steps past `max_steps` stay at `terminal`.
pub fn linear_schedule(initial: f64, terminal: f64, max_steps: usize, step: usize) -> f64 {
    if max_steps == 0 {
        return terminal;
    }
    let per_step = (terminal - initial) / max_steps as f64;
    initial + step.min(max_steps) as f64 * per_step
}

pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => {
            let mut thread_rng = rand::rng();
            StdRng::from_rng(&mut thread_rng)
        }
    }
}

/// Stream for an engine resumed at (`generation`, `member`)
///
/// A seeded run gets a stream derived from its position, so the draws that
/// built the initial population are not replayed after a restart.
pub(crate) fn resume_rng(seed: Option<u64>, generation: usize, member: usize) -> StdRng {
    let position = (((generation as u64) << 32) | member as u64).wrapping_add(1);
    make_rng(seed.map(|s| s ^ position.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
}

/// Costs must be finite; NaN never loses a comparison and would pin a member
pub(crate) fn check_cost(
    cost: f64,
    generation: usize,
    member: usize,
) -> std::result::Result<(), ProtocolError> {
    if cost.is_finite() { Ok(()) } else { Err(ProtocolError::InvalidCost { generation, member }) }
}

/// `n` rows drawn uniformly inside the bounds
pub(crate) fn random_population<R: Rng + ?Sized>(
    n: usize,
    bounds: &[(f64, f64); DIMENSIONS],
    rng: &mut R,
) -> Array2<f64> {
    let mut pop = Array2::<f64>::zeros((n, DIMENSIONS));
    for i in 0..n {
        for (d, &(lo, hi)) in bounds.iter().enumerate() {
            pop[[i, d]] = if hi > lo { rng.random_range(lo..=hi) } else { lo };
        }
    }
    pop
}

/// Search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Particle swarm optimization
    Pso,
    /// Differential evolution (rand/1/bin)
    De,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Pso => f.write_str("PSO"),
            Algorithm::De => f.write_str("DE"),
        }
    }
}

/// Snapshot of an engine's progress, for logs
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub algorithm: Algorithm,
    pub generation: usize,
    pub member: usize,
    pub gbest_cost: f64,
    pub gbest: Candidate,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (gen_label, member_label) = match self.algorithm {
            Algorithm::Pso => ("Iteration", "Particle"),
            Algorithm::De => ("Generation", "Individual"),
        };
        write!(
            f,
            "--- STATUS {} --- {}: {} | {}: {} | gbest error: {} | gbest (Kp, Ki, Kd): {}",
            self.algorithm,
            gen_label,
            self.generation,
            member_label,
            self.member,
            self.gbest_cost,
            self.gbest
        )
    }
}

/// The active tuning engine
///
/// Both strategies are known at compile time, so the driver holds this enum
/// and never a trait object.
pub enum Optimizer<S: BlobStore> {
    Pso(Pso<S>),
    De(De<S>),
}

macro_rules! dispatch {
    ($self:ident, $engine:ident => $body:expr) => {
        match $self {
            Optimizer::Pso($engine) => $body,
            Optimizer::De($engine) => $body,
        }
    };
}

impl<S: BlobStore> Optimizer<S> {
    /// Build an uninitialized engine; call `load_checkpoint()` or `initialize()` next
    pub fn new(algorithm: Algorithm, config: TunerConfig, store: S) -> Result<Self> {
        Ok(match algorithm {
            Algorithm::Pso => Optimizer::Pso(Pso::new(config, store)?),
            Algorithm::De => Optimizer::De(De::new(config, store)?),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Optimizer::Pso(_) => Algorithm::Pso,
            Optimizer::De(_) => Algorithm::De,
        }
    }

    /// Fresh random population, generation 0; persisted immediately
    pub fn initialize(&mut self) {
        dispatch!(self, e => e.initialize())
    }

    /// Candidate for the current (generation, member)
    pub fn get_current_parameters(&mut self) -> Result<Candidate> {
        dispatch!(self, e => e.get_current_parameters())
    }

    /// Record the cost of the candidate last handed out
    pub fn submit_trial_cost(&mut self, cost: f64) -> Result<()> {
        dispatch!(self, e => e.submit_trial_cost(cost))
    }

    /// Move to the next member, wrapping into the next generation
    pub fn advance(&mut self) -> Result<()> {
        dispatch!(self, e => e.advance())
    }

    pub fn is_done(&self) -> bool {
        dispatch!(self, e => e.is_done())
    }

    pub fn generation(&self) -> usize {
        dispatch!(self, e => e.generation())
    }

    pub fn member(&self) -> usize {
        dispatch!(self, e => e.member())
    }

    pub fn population_size(&self) -> usize {
        dispatch!(self, e => e.config().population)
    }

    /// Best candidate seen so far and its cost, once anything was evaluated
    pub fn best(&self) -> Option<(Candidate, f64)> {
        dispatch!(self, e => e.best())
    }

    pub fn save_checkpoint(&mut self) -> Result<()> {
        dispatch!(self, e => e.save_checkpoint())
    }

    /// `false` when there is no usable checkpoint; the driver then initializes
    pub fn load_checkpoint(&mut self) -> bool {
        dispatch!(self, e => e.load_checkpoint())
    }

    /// Delete the checkpoint and both logs of this engine
    pub fn reset_persisted_data(&mut self) -> Result<()> {
        dispatch!(self, e => e.reset_persisted_data())
    }

    pub fn save_log(&mut self, distance: f64, pwm: f64, error: f64) -> Result<()> {
        dispatch!(self, e => e.save_log(distance, pwm, error))
    }

    pub fn save_convergence(&mut self) -> Result<()> {
        dispatch!(self, e => e.save_convergence())
    }

    pub fn status(&self) -> Status {
        dispatch!(self, e => e.status())
    }

    pub fn store(&self) -> &S {
        dispatch!(self, e => e.store())
    }
}
