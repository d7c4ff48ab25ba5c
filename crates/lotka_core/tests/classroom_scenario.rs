use approx::assert_relative_eq;
use lotka_core::analysis::{invariant_drift, spectral_period};
use lotka_core::settings::AdaptiveSettings;
use lotka_core::{
    approximate_period, equilibrium, is_biologically_valid, simulate, Parameters, Scheme, State,
};

fn classroom() -> Parameters {
    Parameters::new(1.0, 0.1, 1.5, 0.75).expect("valid parameters")
}

#[test]
fn classroom_run_oscillates_around_equilibrium() {
    let parameters = classroom();
    let point = equilibrium(&parameters).expect("equilibrium should exist");
    assert_relative_eq!(point.prey, 2.0);
    assert_relative_eq!(point.predator, 10.0);

    let trajectory = simulate(State::new(10.0, 5.0), &parameters, 50.0, 1000, Scheme::Rk4)
        .expect("valid run");

    assert_eq!(trajectory.len(), 1001);
    assert!(!trajectory.is_truncated());
    assert!(is_biologically_valid(&trajectory));

    let period = approximate_period(&trajectory).expect("orbit should repeat");
    assert!(
        50.0 / period >= 2.0,
        "expected at least two periods in the run, got period {period}"
    );

    // Both populations swing to either side of the equilibrium.
    assert!(trajectory.prey().any(|x| x > point.prey));
    assert!(trajectory.prey().any(|x| x < point.prey));
    assert!(trajectory.predator().any(|y| y > point.predator));
    assert!(trajectory.predator().any(|y| y < point.predator));

    let drift = invariant_drift(&trajectory).expect("populations stay positive");
    assert!(drift < 0.1, "drift {drift} too large for h = 0.05");
}

#[test]
fn adaptive_and_fixed_runs_agree_on_period() {
    let parameters = classroom();
    let initial = State::new(10.0, 5.0);
    let fixed = simulate(initial, &parameters, 50.0, 5000, Scheme::Rk4).expect("valid run");
    let adaptive = simulate(
        initial,
        &parameters,
        50.0,
        5000,
        Scheme::DormandPrince(AdaptiveSettings {
            rtol: 1e-8,
            atol: 1e-10,
            ..AdaptiveSettings::default()
        }),
    )
    .expect("valid run");

    let fixed_period = approximate_period(&fixed).expect("fixed run repeats");
    let adaptive_period = approximate_period(&adaptive).expect("adaptive run repeats");
    assert_relative_eq!(fixed_period, adaptive_period, max_relative = 1e-3);

    let spectral = spectral_period(&fixed).expect("dominant frequency exists");
    assert_relative_eq!(spectral, fixed_period, max_relative = 0.15);
}

#[test]
fn unstable_exploration_is_reported_not_raised() {
    let trajectory = simulate(State::new(10.0, 5.0), &classroom(), 1000.0, 10, Scheme::Rk4)
        .expect("configuration is valid");
    assert!(trajectory.diverged());
    assert!(!is_biologically_valid(&trajectory));
    assert_eq!(approximate_period(&trajectory), None);
}
