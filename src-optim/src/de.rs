//! Differential evolution engine (rand/1/bin)
//!
//! Generation 0 evaluates the random initial population as is. From then on
//! each member competes against a trial vector built from three other
//! members; the trial replaces the member only when strictly better.
//!
//! The trial is generated once per member and cached (`trial_ready`) until
//! `advance()`, so asking for the parameters twice, or resuming from a
//! checkpoint taken between proposal and evaluation, yields the same trial.

use std::io;

use log::{debug, error, info, warn};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;

use crate::checkpoint::{
    Checkpoint, EngineTag, RecordReader, RecordWriter, check_index, load_record, save_record,
};
use crate::clip_inplace::clip_inplace;
use crate::config::TunerConfig;
use crate::crossover_binomial::binomial_crossover;
use crate::error::{CheckpointError, ProtocolError, Result};
use crate::mutant_rand1::mutant_rand1;
use crate::recorder::{
    ConvergenceRecord, DE_CONVERGENCE_HEADER, DE_TRIAL_HEADER, DeTrialRecord, append_row,
};
use crate::store::BlobStore;
use crate::{
    Algorithm, Candidate, DIMENSIONS, Status, TrialPhase, UNEVALUATED_COST, check_cost,
    make_rng, random_population, resume_rng,
};

pub const DE_CHECKPOINT: &str = "de_data.bin";
pub const DE_TRIAL_LOG: &str = "DE_DADOS.txt";
pub const DE_CONVERGENCE_LOG: &str = "DE_CONV.txt";

/// Target plus three distinct donors
pub const MIN_POPULATION: usize = 4;

/// Everything needed to resume an evolution
#[derive(Debug, Clone, PartialEq)]
pub struct DeState {
    pub generation: usize,
    pub member: usize,
    pub population: Array2<f64>,
    pub costs: Array1<f64>,
    /// Candidate handed out for the current member
    pub trial: Array1<f64>,
    pub trial_ready: bool,
    pub gbest_position: Array1<f64>,
    pub gbest_cost: f64,
    pub initialized: bool,
    pub phase: TrialPhase,
}

impl DeState {
    fn blank(population: usize) -> Self {
        Self {
            generation: 0,
            member: 0,
            population: Array2::zeros((population, DIMENSIONS)),
            costs: Array1::from_elem(population, UNEVALUATED_COST),
            trial: Array1::zeros(DIMENSIONS),
            trial_ready: false,
            gbest_position: Array1::zeros(DIMENSIONS),
            gbest_cost: UNEVALUATED_COST,
            initialized: false,
            phase: TrialPhase::Idle,
        }
    }
}

impl Checkpoint for DeState {
    const TAG: EngineTag = EngineTag::De;

    fn body_len(population: usize, dimensions: usize) -> usize {
        2 * 4 + 8 * population * dimensions + 8 * population + 8 * dimensions + 8 * dimensions + 8 + 3
    }

    fn write_body(&self, w: &mut RecordWriter) -> io::Result<()> {
        w.index(self.generation)?;
        w.index(self.member)?;
        w.matrix(&self.population)?;
        w.vector(&self.costs)?;
        w.vector(&self.trial)?;
        w.vector(&self.gbest_position)?;
        w.real(self.gbest_cost)?;
        w.flag(self.initialized)?;
        w.flag(self.trial_ready)?;
        w.phase(self.phase)
    }

    fn read_body(
        r: &mut RecordReader<'_>,
        population: usize,
        dimensions: usize,
    ) -> std::result::Result<Self, CheckpointError> {
        let generation = r.index()?;
        let member = check_index("member", r.index()?, population)?;
        let pop = r.matrix(population, dimensions)?;
        let costs = r.vector(population)?;
        let trial = r.vector(dimensions)?;
        let gbest_position = r.vector(dimensions)?;
        let gbest_cost = r.real()?;
        let initialized = r.flag()?;
        let trial_ready = r.flag()?;
        let phase = r.phase()?;
        Ok(Self {
            generation,
            member,
            population: pop,
            costs,
            trial,
            trial_ready,
            gbest_position,
            gbest_cost,
            initialized,
            phase,
        })
    }
}

/// Differential evolution tuner persisting to `S`
pub struct De<S: BlobStore> {
    config: TunerConfig,
    state: DeState,
    rng: StdRng,
    store: S,
}

impl<S: BlobStore> De<S> {
    pub fn new(config: TunerConfig, store: S) -> Result<Self> {
        config.validate(MIN_POPULATION)?;
        let state = DeState::blank(config.population);
        let rng = make_rng(config.seed);
        Ok(Self { config, state, rng, store })
    }

    pub fn initialize(&mut self) {
        let n = self.config.population;
        let population = random_population(n, &self.config.bounds, &mut self.rng);
        self.state = DeState {
            gbest_position: population.row(0).to_owned(),
            population,
            initialized: true,
            ..DeState::blank(n)
        };
        info!("DE: new population of {n} members");
        if let Err(e) = self.save_checkpoint() {
            error!("DE: initial state not saved: {e}");
        }
    }

    fn ensure_initialized(&self) -> std::result::Result<(), ProtocolError> {
        if self.state.initialized { Ok(()) } else { Err(ProtocolError::NotInitialized) }
    }

    /// Build and cache the candidate for the current member
    ///
    /// In generation 0 that is the member itself. Calling this again before
    /// `advance()` is a no-op.
    pub fn propose_trial(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        let i = self.state.member;
        self.state.phase.propose(self.state.generation, i)?;
        if self.state.trial_ready {
            return Ok(());
        }

        let trial = if self.state.generation == 0 {
            self.state.population.row(i).to_owned()
        } else {
            let target = self.state.population.row(i).to_owned();
            let mutant = mutant_rand1(i, &self.state.population, self.config.mutation, &mut self.rng);
            let mut trial = binomial_crossover(&target, &mutant, self.config.crossover, &mut self.rng);
            clip_inplace(trial.view_mut(), &self.config.bounds);
            trial
        };
        debug!("DE: trial for member {i}: {}", Candidate::from_row(trial.view()));
        self.state.trial = trial;
        self.state.trial_ready = true;
        Ok(())
    }

    /// The cached trial, once proposed
    pub fn parameters(&self) -> Option<Candidate> {
        self.state.trial_ready.then(|| Candidate::from_row(self.state.trial.view()))
    }

    pub fn get_current_parameters(&mut self) -> Result<Candidate> {
        self.propose_trial()?;
        Ok(Candidate::from_row(self.state.trial.view()))
    }

    /// Greedy selection between the current member and its trial
    ///
    /// A non-finite cost is refused; the trial stays pending.
    pub fn submit_trial_cost(&mut self, cost: f64) -> Result<()> {
        self.ensure_initialized()?;
        let i = self.state.member;
        check_cost(cost, self.state.generation, i)?;
        self.state.phase.evaluate(self.state.generation, i)?;
        let st = &mut self.state;

        if st.generation == 0 {
            st.costs[i] = cost;
        } else if cost < st.costs[i] {
            debug!("DE: trial {cost:.4} beats member {i} ({:.4})", st.costs[i]);
            st.population.row_mut(i).assign(&st.trial);
            st.costs[i] = cost;
        } else {
            debug!("DE: member {i} ({:.4}) kept over trial {cost:.4}", st.costs[i]);
        }

        if st.costs[i] < st.gbest_cost {
            st.gbest_cost = st.costs[i];
            st.gbest_position.assign(&st.population.row(i));
            info!(
                "DE: new global best {:.4} at {}",
                st.gbest_cost,
                Candidate::from_row(st.gbest_position.view())
            );
        }
        Ok(())
    }

    /// Next member; after the last one the generation counter moves on
    pub fn advance(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.state.phase.finish(self.state.generation, self.state.member)?;
        self.state.trial_ready = false;
        self.state.member += 1;
        if self.state.member >= self.config.population {
            self.state.member = 0;
            self.state.generation += 1;
            info!(
                "DE: generation {} complete, best {:.4}",
                self.state.generation - 1,
                self.state.gbest_cost
            );
        }
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.state.generation >= self.config.max_iterations
    }

    pub fn generation(&self) -> usize {
        self.state.generation
    }

    pub fn member(&self) -> usize {
        self.state.member
    }

    pub fn best(&self) -> Option<(Candidate, f64)> {
        (self.state.gbest_cost < UNEVALUATED_COST)
            .then(|| (Candidate::from_row(self.state.gbest_position.view()), self.state.gbest_cost))
    }

    pub fn save_checkpoint(&mut self) -> Result<()> {
        save_record(
            &mut self.store,
            DE_CHECKPOINT,
            &self.state,
            self.config.population,
            DIMENSIONS,
        )?;
        debug!("DE: checkpoint saved at {}/{}", self.state.generation, self.state.member);
        Ok(())
    }

    pub fn load_checkpoint(&mut self) -> bool {
        match load_record::<DeState, _>(&self.store, DE_CHECKPOINT, self.config.population, DIMENSIONS) {
            Ok(None) => {
                info!("DE: no checkpoint, starting from scratch");
                false
            }
            Ok(Some(state)) if !state.initialized => {
                warn!("DE: checkpoint was never initialized, ignoring it");
                false
            }
            Ok(Some(state)) => {
                self.state = state;
                self.rng = resume_rng(self.config.seed, self.state.generation, self.state.member);
                info!("DE: checkpoint loaded");
                info!("{}", self.status());
                true
            }
            Err(e) => {
                warn!("DE: checkpoint unusable: {e}");
                false
            }
        }
    }

    pub fn reset_persisted_data(&mut self) -> Result<()> {
        for name in [DE_CHECKPOINT, DE_TRIAL_LOG, DE_CONVERGENCE_LOG] {
            if self.store.exists(name) {
                self.store.remove(name)?;
                info!("DE: removed {name}");
            }
        }
        Ok(())
    }

    pub fn save_log(&mut self, distance: f64, pwm: f64, error: f64) -> Result<()> {
        let row = DeTrialRecord {
            generation: self.state.generation,
            individual: self.state.member,
            distance,
            pwm,
            error,
            gbest_error: self.state.gbest_cost,
        };
        append_row(&mut self.store, DE_TRIAL_LOG, &DE_TRIAL_HEADER, &row)
    }

    pub fn save_convergence(&mut self) -> Result<()> {
        let row = ConvergenceRecord {
            iteration: self.state.generation,
            gbest_error: self.state.gbest_cost,
            kp_best: self.state.gbest_position[0],
            ki_best: self.state.gbest_position[1],
            kd_best: self.state.gbest_position[2],
        };
        append_row(&mut self.store, DE_CONVERGENCE_LOG, &DE_CONVERGENCE_HEADER, &row)
    }

    pub fn status(&self) -> Status {
        Status {
            algorithm: Algorithm::De,
            generation: self.state.generation,
            member: self.state.member,
            gbest_cost: self.state.gbest_cost,
            gbest: Candidate::from_row(self.state.gbest_position.view()),
        }
    }

    pub fn state(&self) -> &DeState {
        &self.state
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
