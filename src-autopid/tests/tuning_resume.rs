use autopid::optim::de::{DE_CHECKPOINT, DE_TRIAL_LOG};
use autopid::optim::pso::{PSO_CONVERGENCE_LOG, PSO_TRIAL_LOG};
use autopid::optim::{Algorithm, DirStore, MemoryStore, Optimizer, TunerConfig, TunerConfigBuilder};
use autopid::{SimulatedPlant, TrialSettings, run_tuning};
use std::path::Path;

fn config(seed: u64) -> TunerConfig {
    TunerConfigBuilder::new().population(4).max_iterations(3).seed(seed).build()
}

fn settings() -> TrialSettings {
    TrialSettings { duration_ms: 400, sample_period_ms: 20, ..Default::default() }
}

fn plant(seed: u64) -> SimulatedPlant {
    SimulatedPlant::new(60.0, Some(seed))
}

fn line_count(dir: &Path, name: &str) -> usize {
    std::fs::read_to_string(dir.join(name)).unwrap().lines().count()
}

#[test]
fn test_interrupted_run_resumes_where_it_stopped() {
    let tmp = tempfile::tempdir().unwrap();

    let store = DirStore::new(tmp.path()).unwrap();
    let mut first = Optimizer::new(Algorithm::Pso, config(1), store).unwrap();
    let best = run_tuning(&mut first, &mut plant(1), &settings(), Some(5)).unwrap();
    assert!(best.is_some());
    assert!(!first.is_done());
    assert_eq!((first.generation(), first.member()), (1, 1));
    drop(first);

    // power comes back: fresh process, different seeds
    let store = DirStore::new(tmp.path()).unwrap();
    let mut second = Optimizer::new(Algorithm::Pso, config(2), store).unwrap();
    let (gains, cost) = run_tuning(&mut second, &mut plant(2), &settings(), None).unwrap().unwrap();
    assert!(second.is_done());
    assert!(cost.is_finite());
    assert!(gains.within(&TunerConfig::default().bounds));

    // 12 trials in total, none repeated, plus the header
    assert_eq!(line_count(tmp.path(), PSO_TRIAL_LOG), 1 + 12);
    assert_eq!(line_count(tmp.path(), PSO_CONVERGENCE_LOG), 1 + 3);
}

#[test]
fn test_finished_run_is_not_repeated() {
    let tmp = tempfile::tempdir().unwrap();
    let mut opt =
        Optimizer::new(Algorithm::De, config(3), DirStore::new(tmp.path()).unwrap()).unwrap();
    let best = run_tuning(&mut opt, &mut plant(3), &settings(), None).unwrap();

    let mut again =
        Optimizer::new(Algorithm::De, config(4), DirStore::new(tmp.path()).unwrap()).unwrap();
    let best_again = run_tuning(&mut again, &mut plant(4), &settings(), None).unwrap();
    assert_eq!(best, best_again);
    assert_eq!(line_count(tmp.path(), DE_TRIAL_LOG), 1 + 12);
}

#[test]
fn test_reset_starts_over() {
    let tmp = tempfile::tempdir().unwrap();
    let mut opt =
        Optimizer::new(Algorithm::De, config(5), DirStore::new(tmp.path()).unwrap()).unwrap();
    run_tuning(&mut opt, &mut plant(5), &settings(), Some(6)).unwrap();
    assert!(tmp.path().join(DE_CHECKPOINT).exists());

    opt.reset_persisted_data().unwrap();
    assert!(!tmp.path().join(DE_CHECKPOINT).exists());
    assert!(!tmp.path().join(DE_TRIAL_LOG).exists());

    let mut fresh =
        Optimizer::new(Algorithm::De, config(5), DirStore::new(tmp.path()).unwrap()).unwrap();
    assert!(!fresh.load_checkpoint());
}

#[test]
fn test_tuning_without_storage() {
    let mut store = MemoryStore::new();
    store.set_read_only(true);
    let mut opt = Optimizer::new(Algorithm::Pso, config(6), store).unwrap();
    let best = run_tuning(&mut opt, &mut plant(6), &settings(), None).unwrap();
    assert!(opt.is_done());
    assert!(best.is_some());
    assert!(opt.store().names().is_empty());
}
