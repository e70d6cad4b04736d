//! Trial execution and the resumable tuning loop

use autopid_cost::{CostAccumulator, CostKind};
use autopid_optim::{BlobStore, Candidate, Optimizer};
use log::{debug, info, warn};

use crate::error::{DriverError, Result};
use crate::kalman::SimpleKalmanFilter;
use crate::plant::{PidController, SimulatedPlant};

/// Sensor model handed to the Kalman filter: measurement error, estimate
/// error, process noise
const KALMAN_PARAMS: (f64, f64, f64) = (2.0, 2.0, 0.1);

/// How one trial is run and scored
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSettings {
    pub setpoint_cm: f64,
    pub start_distance_cm: f64,
    pub duration_ms: u64,
    pub sample_period_ms: u64,
    pub cost: CostKind,
}

impl Default for TrialSettings {
    fn default() -> Self {
        Self {
            setpoint_cm: 20.0,
            start_distance_cm: 60.0,
            duration_ms: 5000,
            sample_period_ms: 20,
            cost: CostKind::Mse,
        }
    }
}

/// Result of one trial: the cost plus the last sample, for the trial log
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    pub cost: f64,
    pub distance: f64,
    pub pwm: f64,
    pub error: f64,
    pub samples: usize,
}

/// Drive the cart with `gains` from the start position for one trial
pub fn run_trial(
    plant: &mut SimulatedPlant,
    gains: Candidate,
    settings: &TrialSettings,
) -> Result<TrialOutcome> {
    if settings.sample_period_ms == 0 {
        return Err(DriverError::InvalidSettings("sample period must be > 0".to_string()));
    }
    plant.reset(settings.start_distance_cm);

    let (mea_e, est_e, q) = KALMAN_PARAMS;
    let mut filter = SimpleKalmanFilter::new(mea_e, est_e, q);
    filter.set_estimate(plant.measure());
    let mut pid = PidController::new(gains);
    let mut cost = CostAccumulator::new(settings.cost);

    let dt = settings.sample_period_ms as f64 / 1000.0;
    let mut outcome = TrialOutcome {
        cost: 0.0,
        distance: plant.distance(),
        pwm: 0.0,
        error: 0.0,
        samples: 0,
    };
    let mut elapsed_ms = 0;
    while elapsed_ms < settings.duration_ms {
        outcome.distance = filter.update_estimate(plant.measure());
        outcome.error = settings.setpoint_cm - outcome.distance;
        outcome.pwm = pid.update(outcome.error, dt);
        plant.step(outcome.pwm, dt);

        elapsed_ms += settings.sample_period_ms;
        cost.accumulate(outcome.error, elapsed_ms);
        outcome.samples += 1;
    }
    outcome.cost = cost.final_cost();
    debug!(
        "trial {gains}: {} = {:.4} over {} samples",
        cost.name(),
        outcome.cost,
        outcome.samples
    );
    Ok(outcome)
}

/// Resume from the checkpoint (or start fresh) and tune until done
///
/// `max_trials` stops early, as a power cut would. Storage failures are
/// logged and tuning carries on from memory. Returns the best candidate
/// and its cost, if any trial was evaluated.
pub fn run_tuning<S: BlobStore>(
    opt: &mut Optimizer<S>,
    plant: &mut SimulatedPlant,
    settings: &TrialSettings,
    max_trials: Option<usize>,
) -> Result<Option<(Candidate, f64)>> {
    if !opt.load_checkpoint() {
        opt.initialize();
    }
    info!("{}", opt.status());

    let mut trials = 0;
    while !opt.is_done() {
        if max_trials.is_some_and(|limit| trials >= limit) {
            info!("stopping after {trials} trials");
            break;
        }
        let gains = opt.get_current_parameters()?;
        let outcome = run_trial(plant, gains, settings)?;
        opt.submit_trial_cost(outcome.cost)?;

        if let Err(e) = opt.save_log(outcome.distance, outcome.pwm, outcome.error) {
            warn!("trial log not written: {e}");
        }
        if opt.member() + 1 == opt.population_size() {
            if let Err(e) = opt.save_convergence() {
                warn!("convergence log not written: {e}");
            }
        }
        opt.advance()?;
        if let Err(e) = opt.save_checkpoint() {
            warn!("checkpoint not saved: {e}");
        }
        trials += 1;
    }

    if opt.is_done() {
        info!("tuning finished");
    }
    info!("{}", opt.status());
    Ok(opt.best())
}
