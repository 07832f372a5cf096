//! Integration tests covering the controller, schedules, and checkpointing
//! working together the way a training loop uses them.

use anneal_tools::{
    ExpAnneal, LinearWarmupDecay, Mode, OptimizerHandle, ParamGroup, ParamGroups,
    PlateauController, Schedule, ScheduleDriver,
};

/// The reference scenario: min mode, factor 0.5, patience 2, cooldown 1,
/// starting lr 1.0, constant metric 1.0 for five rounds.
#[test]
fn test_reference_plateau_scenario() {
    let mut opt = ParamGroups::single(1.0);
    let mut ctrl = PlateauController::builder()
        .mode(Mode::Min)
        .factor(0.5)
        .patience(2)
        .cooldown(1)
        .build(&opt)
        .unwrap();

    // Round 1: 1.0 beats +inf, becomes best.
    assert!(!ctrl.step(1.0, None, &mut opt).unwrap());
    assert_eq!(ctrl.best(), 1.0);
    assert_eq!(ctrl.bad_epochs(), 0);

    // Rounds 2-3: bad epochs accumulate.
    assert!(!ctrl.step(1.0, None, &mut opt).unwrap());
    assert_eq!(ctrl.bad_epochs(), 1);
    assert!(!ctrl.step(1.0, None, &mut opt).unwrap());
    assert_eq!(ctrl.bad_epochs(), 2);

    // Round 4: bad = 3 > patience 2, reduce.
    assert!(ctrl.step(1.0, None, &mut opt).unwrap());
    assert_eq!(opt.param_groups()[0].learning_rate, 0.5);
    assert_eq!(ctrl.bad_epochs(), 0);
    assert!(ctrl.in_cooldown());

    // Round 5: cooldown round, bad epochs stay forced to zero.
    assert!(!ctrl.step(1.0, None, &mut opt).unwrap());
    assert_eq!(ctrl.bad_epochs(), 0);
    assert!(!ctrl.in_cooldown());
    assert_eq!(opt.param_groups()[0].learning_rate, 0.5);
}

/// Controller state survives a JSON checkpoint and reproduces the same
/// decisions afterwards.
#[test]
fn test_checkpoint_through_json() {
    let mut opt = ParamGroups::new(vec![
        ParamGroup::new("body", 0.1),
        ParamGroup::new("head", 0.3).with_weight_decay(1e-2),
    ]);
    let mut ctrl = PlateauController::builder()
        .factor(0.5)
        .patience(1)
        .reduce_weight_decay()
        .build(&opt)
        .unwrap();

    ctrl.step(0.9, Some(0.5), &mut opt).unwrap();
    ctrl.step(0.9, Some(0.5), &mut opt).unwrap();

    let blob = serde_json::to_string(&ctrl.export_state()).unwrap();

    let mut restored = PlateauController::builder()
        .factor(0.5)
        .patience(1)
        .reduce_weight_decay()
        .build(&opt)
        .unwrap();
    restored.restore_state(serde_json::from_str(&blob).unwrap());
    let mut opt_restored = opt.clone();

    for metric in [0.9, 0.9, 0.9, 0.8, 0.9, 0.9, 0.9] {
        let a = ctrl.step(metric, Some(0.5), &mut opt).unwrap();
        let b = restored.step(metric, Some(0.5), &mut opt_restored).unwrap();
        assert_eq!(a, b, "diverged at metric {}", metric);
        assert_eq!(opt.param_groups(), opt_restored.param_groups());
    }
}

/// Driver state is checkpoint-friendly too: serialize, deserialize, and the
/// schedule continues where it left off.
#[test]
fn test_driver_checkpoint_round_trip() {
    let shape = ExpAnneal::new(0.01, 1000).unwrap();
    let mut opt = ParamGroups::single(1.0);
    let mut driver = ScheduleDriver::attach(shape, &opt);

    for _ in 0..250 {
        driver.step(&mut opt);
    }

    let blob = serde_json::to_string(&driver).unwrap();
    let mut restored: ScheduleDriver<ExpAnneal> = serde_json::from_str(&blob).unwrap();
    let mut opt_restored = opt.clone();

    driver.step(&mut opt);
    restored.step(&mut opt_restored);
    assert_eq!(
        opt.param_groups()[0].learning_rate,
        opt_restored.param_groups()[0].learning_rate
    );
}

/// A schedule driver handles per-step shaping while the plateau controller
/// runs once per "epoch"; combined they drive the same optimizer.
#[test]
fn test_warmup_then_plateau_annealing() {
    let mut opt = ParamGroups::single(0.1);

    // Warm up over the first 10 of 100 steps.
    let shape = LinearWarmupDecay::new(100, 10).unwrap();
    let mut driver = ScheduleDriver::attach(shape, &opt);
    for _ in 0..=10 {
        driver.step(&mut opt);
    }
    let after_warmup = opt.param_groups()[0].learning_rate;
    assert!((after_warmup - 0.1).abs() < 1e-12);

    // Then anneal on a stalled validation loss.
    let mut ctrl = PlateauController::builder()
        .factor(0.1)
        .patience(0)
        .build(&opt)
        .unwrap();
    ctrl.step(2.0, None, &mut opt).unwrap();
    assert!(ctrl.step(2.0, None, &mut opt).unwrap());
    assert!((opt.param_groups()[0].learning_rate - 0.01).abs() < 1e-12);
}

/// Spot-check the exponential anneal against its closed form at a mid point.
#[test]
fn test_exp_anneal_closed_form() {
    let shape = ExpAnneal::new(0.01, 100).unwrap();
    // At 50%: 1.0 * (0.01)^(0.5) = 0.1.
    assert!((shape.lr_at(50, 1.0) - 0.1).abs() < 1e-12);
}
