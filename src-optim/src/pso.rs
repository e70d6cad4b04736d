//! Particle swarm engine
//!
//! Global-best PSO with a linearly decreasing inertia weight. One particle is
//! evaluated per trial and moved as soon as its cost is known, so the next
//! particle of the same iteration already sees the updated global best.

use std::io;

use log::{debug, error, info, warn};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand::rngs::StdRng;

use crate::checkpoint::{
    Checkpoint, EngineTag, RecordReader, RecordWriter, check_index, load_record, save_record,
};
use crate::clip_inplace::clip_inplace;
use crate::config::TunerConfig;
use crate::error::{CheckpointError, ProtocolError, Result};
use crate::recorder::{
    ConvergenceRecord, PSO_CONVERGENCE_HEADER, PSO_TRIAL_HEADER, PsoTrialRecord, append_row,
};
use crate::store::BlobStore;
use crate::{
    Algorithm, Candidate, DIMENSIONS, Status, TrialPhase, UNEVALUATED_COST, check_cost,
    linear_schedule, make_rng, random_population, resume_rng,
};

pub const PSO_CHECKPOINT: &str = "pso_data.bin";
pub const PSO_TRIAL_LOG: &str = "DADOS.txt";
pub const PSO_CONVERGENCE_LOG: &str = "CONVERG.txt";

/// Everything needed to resume a swarm
#[derive(Debug, Clone, PartialEq)]
pub struct PsoState {
    pub iteration: usize,
    /// Particle whose trial is next
    pub particle: usize,
    pub position: Array2<f64>,
    pub velocity: Array2<f64>,
    pub pbest_position: Array2<f64>,
    pub pbest_cost: Array1<f64>,
    pub gbest_position: Array1<f64>,
    pub gbest_cost: f64,
    pub initialized: bool,
    pub inertia_initial: f64,
    pub inertia_final: f64,
    /// Iterations the inertia schedule spans
    pub max_iterations: usize,
    pub phase: TrialPhase,
}

impl PsoState {
    fn blank(config: &TunerConfig) -> Self {
        let population = config.population;
        Self {
            iteration: 0,
            particle: 0,
            position: Array2::zeros((population, DIMENSIONS)),
            velocity: Array2::zeros((population, DIMENSIONS)),
            pbest_position: Array2::zeros((population, DIMENSIONS)),
            pbest_cost: Array1::from_elem(population, UNEVALUATED_COST),
            gbest_position: Array1::zeros(DIMENSIONS),
            gbest_cost: UNEVALUATED_COST,
            initialized: false,
            inertia_initial: config.inertia_initial,
            inertia_final: config.inertia_final,
            max_iterations: config.max_iterations,
            phase: TrialPhase::Idle,
        }
    }
}

impl Checkpoint for PsoState {
    const TAG: EngineTag = EngineTag::Pso;

    fn body_len(population: usize, dimensions: usize) -> usize {
        2 * 4 // iteration, particle
            + 3 * 8 * population * dimensions // position, velocity, pbest positions
            + 8 * population // pbest costs
            + 8 * dimensions + 8 // gbest
            + 1 // initialized
            + 2 * 8 + 4 // inertia schedule
            + 1 // phase
    }

    fn write_body(&self, w: &mut RecordWriter) -> io::Result<()> {
        w.index(self.iteration)?;
        w.index(self.particle)?;
        w.matrix(&self.position)?;
        w.matrix(&self.velocity)?;
        w.matrix(&self.pbest_position)?;
        w.vector(&self.pbest_cost)?;
        w.vector(&self.gbest_position)?;
        w.real(self.gbest_cost)?;
        w.flag(self.initialized)?;
        w.real(self.inertia_initial)?;
        w.real(self.inertia_final)?;
        w.index(self.max_iterations)?;
        w.phase(self.phase)
    }

    fn read_body(
        r: &mut RecordReader<'_>,
        population: usize,
        dimensions: usize,
    ) -> std::result::Result<Self, CheckpointError> {
        let iteration = r.index()?;
        let particle = check_index("particle", r.index()?, population)?;
        let position = r.matrix(population, dimensions)?;
        let velocity = r.matrix(population, dimensions)?;
        let pbest_position = r.matrix(population, dimensions)?;
        let pbest_cost = r.vector(population)?;
        let gbest_position = r.vector(dimensions)?;
        let gbest_cost = r.real()?;
        let initialized = r.flag()?;
        let inertia_initial = r.real()?;
        let inertia_final = r.real()?;
        let max_iterations = r.index()?;
        let phase = r.phase()?;
        Ok(Self {
            iteration,
            particle,
            position,
            velocity,
            pbest_position,
            pbest_cost,
            gbest_position,
            gbest_cost,
            initialized,
            inertia_initial,
            inertia_final,
            max_iterations,
            phase,
        })
    }
}

/// Particle swarm tuner persisting to `S`
pub struct Pso<S: BlobStore> {
    config: TunerConfig,
    state: PsoState,
    rng: StdRng,
    store: S,
}

impl<S: BlobStore> Pso<S> {
    /// Uninitialized swarm; needs at least one particle
    pub fn new(config: TunerConfig, store: S) -> Result<Self> {
        config.validate(1)?;
        let state = PsoState::blank(&config);
        let rng = make_rng(config.seed);
        Ok(Self { config, state, rng, store })
    }

    pub fn initialize(&mut self) {
        let n = self.config.population;
        let position = random_population(n, &self.config.bounds, &mut self.rng);
        self.state = PsoState {
            iteration: 0,
            particle: 0,
            velocity: Array2::zeros((n, DIMENSIONS)),
            pbest_position: position.clone(),
            pbest_cost: Array1::from_elem(n, UNEVALUATED_COST),
            gbest_position: position.row(0).to_owned(),
            gbest_cost: UNEVALUATED_COST,
            initialized: true,
            inertia_initial: self.config.inertia_initial,
            inertia_final: self.config.inertia_final,
            max_iterations: self.config.max_iterations,
            phase: TrialPhase::Idle,
            position,
        };
        info!("PSO: new swarm of {n} particles");
        if let Err(e) = self.save_checkpoint() {
            error!("PSO: initial state not saved: {e}");
        }
    }

    fn ensure_initialized(&self) -> std::result::Result<(), ProtocolError> {
        if self.state.initialized { Ok(()) } else { Err(ProtocolError::NotInitialized) }
    }

    /// Position of the current particle
    pub fn get_current_parameters(&mut self) -> Result<Candidate> {
        self.ensure_initialized()?;
        let i = self.state.particle;
        self.state.phase.propose(self.state.iteration, i)?;
        Ok(Candidate::from_row(self.state.position.row(i)))
    }

    /// Update personal and global bests, then move the current particle
    ///
    /// A non-finite cost is refused and the particle stays awaiting a cost.
    pub fn submit_trial_cost(&mut self, cost: f64) -> Result<()> {
        self.ensure_initialized()?;
        let i = self.state.particle;
        check_cost(cost, self.state.iteration, i)?;
        self.state.phase.evaluate(self.state.iteration, i)?;

        let w = self.inertia();
        let (c1, c2) = (self.config.cognitive, self.config.social);
        let st = &mut self.state;

        if cost < st.pbest_cost[i] {
            st.pbest_cost[i] = cost;
            st.pbest_position.row_mut(i).assign(&st.position.row(i));
        }
        if cost < st.gbest_cost {
            st.gbest_cost = cost;
            st.gbest_position.assign(&st.position.row(i));
            info!(
                "PSO: new global best {cost:.4} at {}",
                Candidate::from_row(st.gbest_position.view())
            );
        }

        for d in 0..DIMENSIONS {
            let r1: f64 = self.rng.random();
            let r2: f64 = self.rng.random();
            let x = st.position[[i, d]];
            let v = w * st.velocity[[i, d]]
                + c1 * r1 * (st.pbest_position[[i, d]] - x)
                + c2 * r2 * (st.gbest_position[d] - x);
            st.velocity[[i, d]] = v;
            st.position[[i, d]] = x + v;
        }
        clip_inplace(st.position.row_mut(i), &self.config.bounds);
        debug!(
            "PSO: particle {i} cost {cost:.4}, moved to {}",
            Candidate::from_row(st.position.row(i))
        );
        Ok(())
    }

    /// Next particle; after the last one the iteration counter moves on
    pub fn advance(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.state.phase.finish(self.state.iteration, self.state.particle)?;
        self.state.particle += 1;
        if self.state.particle >= self.config.population {
            self.state.particle = 0;
            self.state.iteration += 1;
            info!(
                "PSO: iteration {} complete, inertia now {:.3}",
                self.state.iteration - 1,
                self.inertia()
            );
        }
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.state.iteration >= self.config.max_iterations
    }

    /// Inertia weight for the current iteration
    pub fn inertia(&self) -> f64 {
        linear_schedule(
            self.state.inertia_initial,
            self.state.inertia_final,
            self.state.max_iterations,
            self.state.iteration,
        )
    }

    pub fn generation(&self) -> usize {
        self.state.iteration
    }

    pub fn member(&self) -> usize {
        self.state.particle
    }

    pub fn best(&self) -> Option<(Candidate, f64)> {
        (self.state.gbest_cost < UNEVALUATED_COST)
            .then(|| (Candidate::from_row(self.state.gbest_position.view()), self.state.gbest_cost))
    }

    pub fn save_checkpoint(&mut self) -> Result<()> {
        save_record(
            &mut self.store,
            PSO_CHECKPOINT,
            &self.state,
            self.config.population,
            DIMENSIONS,
        )?;
        debug!("PSO: checkpoint saved at {}/{}", self.state.iteration, self.state.particle);
        Ok(())
    }

    pub fn load_checkpoint(&mut self) -> bool {
        let loaded =
            load_record::<PsoState, _>(&self.store, PSO_CHECKPOINT, self.config.population, DIMENSIONS);
        match loaded {
            Ok(None) => {
                info!("PSO: no checkpoint, starting from scratch");
                false
            }
            Ok(Some(state)) if !state.initialized => {
                warn!("PSO: checkpoint was never initialized, ignoring it");
                false
            }
            Ok(Some(state)) if state.max_iterations != self.config.max_iterations => {
                let e = CheckpointError::ScheduleMismatch {
                    expected: self.config.max_iterations,
                    found: state.max_iterations,
                };
                warn!("PSO: checkpoint unusable: {e}");
                false
            }
            Ok(Some(state)) => {
                self.state = state;
                self.rng = resume_rng(self.config.seed, self.state.iteration, self.state.particle);
                info!("PSO: checkpoint loaded");
                info!("{}", self.status());
                true
            }
            Err(e) => {
                warn!("PSO: checkpoint unusable: {e}");
                false
            }
        }
    }

    pub fn reset_persisted_data(&mut self) -> Result<()> {
        for name in [PSO_CHECKPOINT, PSO_TRIAL_LOG, PSO_CONVERGENCE_LOG] {
            if self.store.exists(name) {
                self.store.remove(name)?;
                info!("PSO: removed {name}");
            }
        }
        Ok(())
    }

    /// One row in the trial log for the current particle
    pub fn save_log(&mut self, distance: f64, pwm: f64, error: f64) -> Result<()> {
        let row = PsoTrialRecord {
            iteration: self.state.iteration,
            particle: self.state.particle,
            distance,
            pwm,
            error,
            gbest_error: self.state.gbest_cost,
            inertia: self.inertia(),
        };
        append_row(&mut self.store, PSO_TRIAL_LOG, &PSO_TRIAL_HEADER, &row)
    }

    /// One row in the convergence log with the best-so-far
    pub fn save_convergence(&mut self) -> Result<()> {
        let row = ConvergenceRecord {
            iteration: self.state.iteration,
            gbest_error: self.state.gbest_cost,
            kp_best: self.state.gbest_position[0],
            ki_best: self.state.gbest_position[1],
            kd_best: self.state.gbest_position[2],
        };
        append_row(&mut self.store, PSO_CONVERGENCE_LOG, &PSO_CONVERGENCE_HEADER, &row)
    }

    pub fn status(&self) -> Status {
        Status {
            algorithm: Algorithm::Pso,
            generation: self.state.iteration,
            member: self.state.particle,
            gbest_cost: self.state.gbest_cost,
            gbest: Candidate::from_row(self.state.gbest_position.view()),
        }
    }

    pub fn state(&self) -> &PsoState {
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
