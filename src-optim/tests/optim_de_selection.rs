use autopid_optim::{Candidate, De, MemoryStore, OptimizerError, ProtocolError, TunerConfigBuilder};

fn evolution() -> De<MemoryStore> {
    let cfg = TunerConfigBuilder::new().population(4).max_iterations(10).seed(2024).build();
    let mut de = De::new(cfg, MemoryStore::new()).unwrap();
    de.initialize();
    de
}

#[test]
fn test_generation_zero_best() {
    let mut de = evolution();
    let initial = de.state().population.clone();
    for cost in [5.0, 3.0, 8.0, 1.0] {
        de.get_current_parameters().unwrap();
        de.submit_trial_cost(cost).unwrap();
        de.advance().unwrap();
    }

    assert_eq!(de.generation(), 1);
    assert_eq!(de.member(), 0);
    assert_eq!(de.state().population, initial);
    assert_eq!(de.state().costs.to_vec(), vec![5.0, 3.0, 8.0, 1.0]);
    let (best, cost) = de.best().unwrap();
    assert_eq!(cost, 1.0);
    assert_eq!(best, Candidate::from_row(initial.row(3)));
}

#[test]
fn test_member_costs_only_improve() {
    let mut de = evolution();
    let mut previous = vec![f64::INFINITY; 4];
    let mut k = 0u32;
    while !de.is_done() {
        let member = de.member();
        let c = de.get_current_parameters().unwrap();
        // deterministic but unordered costs
        let cost = ((c.kp * 37.0 + c.ki * 11.0 + c.kd * 5.0 + k as f64) % 13.0).abs();
        de.submit_trial_cost(cost).unwrap();
        let now = de.state().costs[member];
        if de.generation() > 0 {
            assert!(now <= previous[member]);
            if cost < previous[member] {
                assert_eq!(now, cost);
                assert_eq!(Candidate::from_row(de.state().population.row(member)), c);
            } else {
                assert_eq!(now, previous[member]);
            }
        }
        previous[member] = now;
        de.advance().unwrap();
        k += 1;
    }
}

#[test]
fn test_nan_cost_cannot_pin_a_member() {
    let mut de = evolution();
    de.get_current_parameters().unwrap();
    let err = de.submit_trial_cost(f64::NAN).unwrap_err();
    assert!(matches!(
        err,
        OptimizerError::Protocol(ProtocolError::InvalidCost { generation: 0, member: 0 })
    ));
    assert!(de.state().costs[0].is_infinite());
    // advancing past a refused cost is still a protocol error
    assert!(de.advance().is_err());

    // the member is re-measured and finishes generation 0 normally
    for cost in [5.0, 3.0, 8.0, 1.0] {
        de.get_current_parameters().unwrap();
        de.submit_trial_cost(cost).unwrap();
        de.advance().unwrap();
    }
    assert_eq!(de.state().costs.to_vec(), vec![5.0, 3.0, 8.0, 1.0]);

    // a perfect trial replaces member 0 in generation 1
    let trial = de.get_current_parameters().unwrap();
    de.submit_trial_cost(0.0).unwrap();
    assert_eq!(de.state().costs[0], 0.0);
    assert_eq!(Candidate::from_row(de.state().population.row(0)), trial);
    assert_eq!(de.best(), Some((trial, 0.0)));
}
