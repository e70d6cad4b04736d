use autopid_optim::checkpoint::Checkpoint;
use autopid_optim::de::{DE_CHECKPOINT, DE_CONVERGENCE_LOG, DE_TRIAL_LOG};
use autopid_optim::pso::{PSO_CHECKPOINT, PSO_CONVERGENCE_LOG, PSO_TRIAL_LOG};
use autopid_optim::{
    BlobStore, Candidate, De, DirStore, MemoryStore, Pso, TunerConfig, TunerConfigBuilder,
    DIMENSIONS,
};

fn config(seed: u64) -> TunerConfig {
    TunerConfigBuilder::new().population(4).max_iterations(6).seed(seed).build()
}

fn cost(c: Candidate) -> f64 {
    (c.kp - 2.5).abs() + (c.ki - 0.5).abs() + c.kd
}

#[test]
fn test_pso_checkpoint_roundtrip_is_bit_exact() {
    let mut pso = Pso::new(config(1), MemoryStore::new()).unwrap();
    pso.initialize();
    for _ in 0..6 {
        let c = pso.get_current_parameters().unwrap();
        pso.submit_trial_cost(cost(c)).unwrap();
        pso.advance().unwrap();
    }
    pso.save_checkpoint().unwrap();
    let saved = pso.state().encode(4, DIMENSIONS).unwrap();

    let mut resumed = Pso::new(config(99), pso.into_store()).unwrap();
    assert!(resumed.load_checkpoint());
    assert_eq!(resumed.state().encode(4, DIMENSIONS).unwrap(), saved);
    assert_eq!((resumed.generation(), resumed.member()), (1, 2));
}

#[test]
fn test_de_checkpoint_roundtrip_is_bit_exact() {
    let mut de = De::new(config(2), MemoryStore::new()).unwrap();
    de.initialize();
    for _ in 0..5 {
        let c = de.get_current_parameters().unwrap();
        de.submit_trial_cost(cost(c)).unwrap();
        de.advance().unwrap();
    }
    de.save_checkpoint().unwrap();
    let saved = de.state().clone();

    let mut resumed = De::new(config(77), de.into_store()).unwrap();
    assert!(resumed.load_checkpoint());
    assert_eq!(resumed.state(), &saved);
    assert_eq!(
        resumed.state().encode(4, DIMENSIONS).unwrap(),
        saved.encode(4, DIMENSIONS).unwrap()
    );
}

#[test]
fn test_de_resume_between_proposal_and_cost_keeps_trial() {
    let mut de = De::new(config(3), MemoryStore::new()).unwrap();
    de.initialize();
    for _ in 0..4 {
        let c = de.get_current_parameters().unwrap();
        de.submit_trial_cost(cost(c)).unwrap();
        de.advance().unwrap();
    }
    let proposed = de.get_current_parameters().unwrap();
    de.save_checkpoint().unwrap();

    // power loss: a new engine with a different RNG picks up the same trial
    let mut resumed = De::new(config(1234), de.into_store()).unwrap();
    assert!(resumed.load_checkpoint());
    assert_eq!(resumed.get_current_parameters().unwrap(), proposed);
    resumed.submit_trial_cost(0.0).unwrap();
    resumed.advance().unwrap();
    assert_eq!(resumed.best().map(|(c, _)| c), Some(proposed));
}

#[test]
fn test_pso_resume_keeps_inertia_schedule() {
    let ten = |seed| TunerConfigBuilder::new().population(4).max_iterations(10).seed(seed).build();
    let mut pso = Pso::new(ten(11), MemoryStore::new()).unwrap();
    pso.initialize();
    for _ in 0..8 {
        let c = pso.get_current_parameters().unwrap();
        pso.submit_trial_cost(cost(c)).unwrap();
        pso.advance().unwrap();
    }
    pso.save_checkpoint().unwrap();
    let inertia = pso.inertia();
    assert!((inertia - 0.78).abs() < 1e-12);
    let store = pso.into_store();

    // a record written for a 10-iteration run does not resume a 50-iteration one
    let fifty = TunerConfigBuilder::new().population(4).max_iterations(50).seed(11).build();
    let mut longer = Pso::new(fifty, store.clone()).unwrap();
    assert!(!longer.load_checkpoint());
    assert_eq!(longer.generation(), 0);
    assert!(longer.get_current_parameters().is_err());

    let mut resumed = Pso::new(ten(12), store).unwrap();
    assert!(resumed.load_checkpoint());
    assert_eq!(resumed.inertia(), inertia);
    assert_eq!(resumed.state().max_iterations, 10);
    assert!(!resumed.is_done());
}

#[test]
fn test_seeded_resume_is_repeatable() {
    let mut de = De::new(config(13), MemoryStore::new()).unwrap();
    de.initialize();
    for _ in 0..5 {
        let c = de.get_current_parameters().unwrap();
        de.submit_trial_cost(cost(c)).unwrap();
        de.advance().unwrap();
    }
    de.save_checkpoint().unwrap();
    let store = de.into_store();

    let next_trial = |store: MemoryStore| {
        let mut de = De::new(config(13), store).unwrap();
        assert!(de.load_checkpoint());
        de.get_current_parameters().unwrap()
    };
    let first = next_trial(store.clone());
    assert_eq!(next_trial(store), first);
    assert!(first.within(&TunerConfig::default().bounds));
}

#[test]
fn test_load_without_checkpoint() {
    let mut pso = Pso::new(config(4), MemoryStore::new()).unwrap();
    assert!(!pso.load_checkpoint());
    let mut de = De::new(config(4), MemoryStore::new()).unwrap();
    assert!(!de.load_checkpoint());
}

#[test]
fn test_load_rejects_corrupt_records() {
    let mut source = Pso::new(config(5), MemoryStore::new()).unwrap();
    source.initialize();
    let good = source.store().get(PSO_CHECKPOINT).unwrap().to_vec();

    let mut truncated = MemoryStore::new();
    truncated.insert(PSO_CHECKPOINT, good[..good.len() - 3].to_vec());
    assert!(!Pso::new(config(5), truncated).unwrap().load_checkpoint());

    let mut garbage = MemoryStore::new();
    garbage.insert(PSO_CHECKPOINT, vec![0xAB; good.len()]);
    assert!(!Pso::new(config(5), garbage).unwrap().load_checkpoint());

    // a PSO record under the DE name is foreign
    let mut foreign = MemoryStore::new();
    foreign.insert(DE_CHECKPOINT, good.clone());
    assert!(!De::new(config(5), foreign).unwrap().load_checkpoint());

    // well-formed record pointing past the last particle
    let mut bad_cursor = source.state().clone();
    bad_cursor.particle = 4;
    let mut out_of_range = MemoryStore::new();
    out_of_range.insert(PSO_CHECKPOINT, bad_cursor.encode(4, DIMENSIONS).unwrap());
    assert!(!Pso::new(config(5), out_of_range).unwrap().load_checkpoint());

    // the record was written for 4 particles
    let mut reshaped = MemoryStore::new();
    reshaped.insert(PSO_CHECKPOINT, good);
    let bigger = TunerConfigBuilder::new().population(6).seed(5).build();
    assert!(!Pso::new(bigger, reshaped).unwrap().load_checkpoint());
}

#[test]
fn test_load_ignores_uninitialized_record() {
    // saving before initialize() persists a blank, uninitialized state
    let mut blank = De::new(config(6), MemoryStore::new()).unwrap();
    blank.save_checkpoint().unwrap();
    let mut de = De::new(config(6), blank.into_store()).unwrap();
    assert!(!de.load_checkpoint());
    assert!(de.get_current_parameters().is_err());
}

#[test]
fn test_read_only_store_degrades_gracefully() {
    let mut store = MemoryStore::new();
    store.set_read_only(true);
    let mut pso = Pso::new(config(7), store).unwrap();

    // initialize() logs the failed save and carries on
    pso.initialize();
    let c = pso.get_current_parameters().unwrap();
    pso.submit_trial_cost(cost(c)).unwrap();

    assert!(pso.save_checkpoint().unwrap_err().is_persistence_error());
    assert!(pso.save_log(10.0, 80.0, 1.5).unwrap_err().is_persistence_error());
    assert!(pso.save_convergence().unwrap_err().is_persistence_error());

    pso.advance().unwrap();
    assert_eq!(pso.member(), 1);
    assert_eq!(pso.best().map(|(_, e)| e), Some(cost(c)));
}

#[test]
fn test_reset_removes_engine_blobs_only() {
    let mut store = MemoryStore::new();
    store.insert("unrelated.txt", b"keep".to_vec());
    store.insert(DE_CHECKPOINT, b"de".to_vec());

    let mut pso = Pso::new(config(8), store).unwrap();
    pso.initialize();
    let c = pso.get_current_parameters().unwrap();
    pso.submit_trial_cost(cost(c)).unwrap();
    pso.save_log(12.0, 100.0, 2.0).unwrap();
    pso.save_convergence().unwrap();
    for name in [PSO_CHECKPOINT, PSO_TRIAL_LOG, PSO_CONVERGENCE_LOG] {
        assert!(pso.store().exists(name), "{name} missing");
    }

    pso.reset_persisted_data().unwrap();
    assert_eq!(pso.store().names(), vec![DE_CHECKPOINT.to_string(), "unrelated.txt".to_string()]);
    // nothing left to remove is fine
    pso.reset_persisted_data().unwrap();
}

#[test]
fn test_dir_store_full_cycle() {
    let tmp = tempfile::tempdir().unwrap();
    let store = DirStore::new(tmp.path()).unwrap();
    let mut de = De::new(config(9), store).unwrap();
    de.initialize();

    for _ in 0..4 {
        let c = de.get_current_parameters().unwrap();
        de.submit_trial_cost(cost(c)).unwrap();
        de.save_log(15.0, -40.0, cost(c)).unwrap();
        de.advance().unwrap();
        de.save_checkpoint().unwrap();
    }
    de.save_convergence().unwrap();
    let expected = de.state().clone();

    let trial_log = std::fs::read_to_string(tmp.path().join(DE_TRIAL_LOG)).unwrap();
    assert_eq!(trial_log.lines().count(), 1 + 4);
    assert!(trial_log.starts_with("generation,individual,distance,pwm,error,gbest_error"));
    let conv_log = std::fs::read_to_string(tmp.path().join(DE_CONVERGENCE_LOG)).unwrap();
    assert_eq!(conv_log.lines().count(), 2);

    let mut resumed = De::new(config(10), DirStore::new(tmp.path()).unwrap()).unwrap();
    assert!(resumed.load_checkpoint());
    assert_eq!(resumed.state(), &expected);

    resumed.reset_persisted_data().unwrap();
    assert!(!tmp.path().join(DE_CHECKPOINT).exists());
    assert!(!tmp.path().join(DE_TRIAL_LOG).exists());
    assert!(!tmp.path().join(DE_CONVERGENCE_LOG).exists());
}
