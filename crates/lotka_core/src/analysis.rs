use crate::equilibrium::equilibrium;
use crate::error::DomainError;
use crate::model::{Parameters, State};
use crate::trajectory::Trajectory;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::Serialize;

/// Slack below zero still counted as non-negative, to absorb rounding noise.
pub const NEGATIVE_ZERO_TOLERANCE: f64 = 1e-9;

/// True iff every sample has both populations `>= -NEGATIVE_ZERO_TOLERANCE`.
pub fn is_biologically_valid(trajectory: &Trajectory) -> bool {
    first_invalid_sample(trajectory).is_none()
}

/// Index of the first sample with a negative population.
pub fn first_invalid_sample(trajectory: &Trajectory) -> Option<usize> {
    trajectory.samples().iter().position(|sample| {
        sample.state.prey < -NEGATIVE_ZERO_TOLERANCE
            || sample.state.predator < -NEGATIVE_ZERO_TOLERANCE
    })
}

/// Mean spacing of successive upward crossings of `prey - prey*`.
///
/// `None` when there are fewer than two crossings or the run diverged.
pub fn approximate_period(trajectory: &Trajectory) -> Option<f64> {
    if trajectory.diverged() {
        return None;
    }
    let target = equilibrium(trajectory.parameters()).ok()?.prey;
    let crossings = upward_crossings(trajectory, target);
    if crossings.len() < 2 {
        return None;
    }
    let span = crossings[crossings.len() - 1] - crossings[0];
    Some(span / (crossings.len() - 1) as f64)
}

fn upward_crossings(trajectory: &Trajectory, level: f64) -> Vec<f64> {
    trajectory
        .samples()
        .windows(2)
        .filter_map(|pair| {
            let below = pair[0].state.prey - level;
            let above = pair[1].state.prey - level;
            if below < 0.0 && above >= 0.0 {
                let fraction = below / (below - above);
                Some(pair[0].time + fraction * (pair[1].time - pair[0].time))
            } else {
                None
            }
        })
        .collect()
}

/// Period of the dominant non-zero frequency of the prey series.
///
/// Resolution is limited to `duration / k` for integer bins `k`, so this is a
/// cross-check for [`approximate_period`] on long runs rather than a
/// replacement.
pub fn spectral_period(trajectory: &Trajectory) -> Option<f64> {
    if trajectory.diverged() || trajectory.len() < 4 {
        return None;
    }
    let n = trajectory.len();
    let mean = trajectory.prey().sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex<f64>> = trajectory
        .prey()
        .map(|value| Complex::new(value - mean, 0.0))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(&mut buffer);

    let (bin, power) = buffer[1..=n / 2]
        .iter()
        .enumerate()
        .map(|(i, c)| (i + 1, c.norm_sqr()))
        .fold((0usize, 0.0f64), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        });
    if bin == 0 || power <= f64::EPSILON {
        return None;
    }
    Some(n as f64 * trajectory.step_size() / bin as f64)
}

/// H = δ·prey − γ·ln(prey) + β·predator − α·ln(predator).
///
/// Constant along exact solutions; drift along a numeric trajectory measures
/// integration error.
pub fn conserved_quantity(state: State, parameters: &Parameters) -> Result<f64, DomainError> {
    for (name, value) in [("prey", state.prey), ("predator", state.predator)] {
        if !(value > 0.0) {
            return Err(DomainError::NonPositivePopulation { name, value });
        }
    }
    Ok(parameters.predator_growth * state.prey - parameters.predator_death * state.prey.ln()
        + parameters.predation * state.predator
        - parameters.prey_growth * state.predator.ln())
}

/// Largest |H(t) − H(0)| along the trajectory.
pub fn invariant_drift(trajectory: &Trajectory) -> Result<f64, DomainError> {
    let parameters = trajectory.parameters();
    let mut samples = trajectory.samples().iter();
    let Some(first) = samples.next() else {
        return Ok(0.0);
    };
    let reference = conserved_quantity(first.state, parameters)?;
    samples.try_fold(0.0f64, |worst, sample| {
        let value = conserved_quantity(sample.state, parameters)?;
        Ok(worst.max((value - reference).abs()))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extrema {
    pub prey_min: f64,
    pub prey_max: f64,
    pub predator_min: f64,
    pub predator_max: f64,
}

pub fn extrema(trajectory: &Trajectory) -> Option<Extrema> {
    let first = trajectory.initial_state()?;
    let start = Extrema {
        prey_min: first.prey,
        prey_max: first.prey,
        predator_min: first.predator,
        predator_max: first.predator,
    };
    Some(trajectory.samples().iter().fold(start, |acc, sample| Extrema {
        prey_min: acc.prey_min.min(sample.state.prey),
        prey_max: acc.prey_max.max(sample.state.prey),
        predator_min: acc.predator_min.min(sample.state.predator),
        predator_max: acc.predator_max.max(sample.state.predator),
    }))
}

/// Delay from the first prey peak to the next predator peak.
pub fn peak_lag(trajectory: &Trajectory) -> Option<f64> {
    let samples = trajectory.samples();
    let prey_peak = local_maxima(samples.iter().map(|s| s.state.prey)).next()?;
    let predator_peak =
        local_maxima(samples.iter().map(|s| s.state.predator)).find(|&i| i > prey_peak)?;
    Some(samples[predator_peak].time - samples[prey_peak].time)
}

/// Indices of strict interior maxima.
fn local_maxima(values: impl Iterator<Item = f64>) -> impl Iterator<Item = usize> {
    let values: Vec<f64> = values.collect();
    (1..values.len().saturating_sub(1))
        .filter(move |&i| values[i] > values[i - 1] && values[i] >= values[i + 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equilibrium::linearized_period;
    use crate::integrator::{simulate, Scheme};
    use approx::assert_relative_eq;

    fn classroom() -> Parameters {
        Parameters::new(1.0, 0.1, 1.5, 0.75).expect("valid parameters")
    }

    fn textbook() -> Parameters {
        Parameters::new(6.0, 2.0, 2.0, 3.0).expect("valid parameters")
    }

    #[test]
    fn positive_trajectory_is_biologically_valid() {
        let trajectory = simulate(State::new(1.0, 1.0), &textbook(), 15.0, 1000, Scheme::Rk4)
            .expect("valid run");
        assert!(is_biologically_valid(&trajectory));
        assert_eq!(first_invalid_sample(&trajectory), None);
    }

    #[test]
    fn negative_start_is_flagged_at_index_zero() {
        let trajectory = simulate(State::new(-0.5, 1.0), &textbook(), 1.0, 10, Scheme::Rk4)
            .expect("negative populations are integrable");
        assert!(!is_biologically_valid(&trajectory));
        assert_eq!(first_invalid_sample(&trajectory), Some(0));
    }

    #[test]
    fn rounding_noise_below_zero_is_tolerated() {
        let trajectory = simulate(State::new(-1e-12, 0.0), &textbook(), 1.0, 10, Scheme::Rk4)
            .expect("valid run");
        assert!(is_biologically_valid(&trajectory));
    }

    #[test]
    fn period_is_undefined_for_short_or_stationary_runs() {
        let parameters = classroom();
        let short = simulate(State::new(10.0, 5.0), &parameters, 1.0, 100, Scheme::Rk4)
            .expect("valid run");
        assert_eq!(approximate_period(&short), None);

        let fixed = simulate(State::new(2.0, 10.0), &parameters, 50.0, 1000, Scheme::Rk4)
            .expect("valid run");
        assert_eq!(approximate_period(&fixed), None);
    }

    #[test]
    fn period_is_undefined_after_divergence() {
        let trajectory = simulate(State::new(10.0, 5.0), &classroom(), 1000.0, 10, Scheme::Rk4)
            .expect("valid configuration");
        assert!(trajectory.diverged());
        assert_eq!(approximate_period(&trajectory), None);
        assert_eq!(spectral_period(&trajectory), None);
    }

    #[test]
    fn small_orbits_oscillate_at_the_linearized_period() {
        let parameters = classroom();
        let expected = linearized_period(&parameters).expect("valid parameters");
        let trajectory = simulate(State::new(2.05, 10.0), &parameters, 200.0, 4000, Scheme::Rk4)
            .expect("valid run");

        let crossing = approximate_period(&trajectory).expect("orbit should cross repeatedly");
        assert_relative_eq!(crossing, expected, max_relative = 0.01);

        let spectral = spectral_period(&trajectory).expect("orbit has a dominant frequency");
        assert_relative_eq!(spectral, expected, max_relative = 0.05);
    }

    #[test]
    fn conserved_quantity_matches_formula() {
        let parameters = textbook();
        let value = conserved_quantity(State::new(1.0, 1.0), &parameters).expect("positive");
        assert_relative_eq!(value, 3.0 + 2.0);

        let at_equilibrium =
            conserved_quantity(State::new(2.0 / 3.0, 3.0), &parameters).expect("positive");
        assert!(at_equilibrium < value, "H is minimal at the coexistence point");
    }

    #[test]
    fn conserved_quantity_rejects_non_positive_populations() {
        let parameters = textbook();
        assert_eq!(
            conserved_quantity(State::new(0.0, 1.0), &parameters),
            Err(DomainError::NonPositivePopulation {
                name: "prey",
                value: 0.0
            })
        );
        assert!(matches!(
            conserved_quantity(State::new(1.0, -2.0), &parameters),
            Err(DomainError::NonPositivePopulation {
                name: "predator",
                ..
            })
        ));
    }

    #[test]
    fn invariant_drift_is_small_for_fine_steps() {
        let trajectory = simulate(State::new(1.0, 1.0), &textbook(), 15.0, 3000, Scheme::Rk4)
            .expect("valid run");
        let drift = invariant_drift(&trajectory).expect("populations stay positive");
        assert!(drift < 1e-4, "drift {drift} too large");
    }

    #[test]
    fn invariant_drift_reports_domain_errors() {
        let trajectory = simulate(State::new(1.0, 0.0), &textbook(), 1.0, 10, Scheme::Rk4)
            .expect("valid run");
        assert!(invariant_drift(&trajectory).is_err());
    }

    #[test]
    fn prey_oscillate_around_their_start() {
        let trajectory = simulate(State::new(1.0, 1.0), &textbook(), 20.0, 2000, Scheme::Rk4)
            .expect("valid run");
        let range = extrema(&trajectory).expect("non-empty trajectory");
        assert!(range.prey_max > 1.0);
        assert!(range.prey_min < 1.0);
        assert!(range.predator_min > 0.0);
    }

    #[test]
    fn predator_peak_follows_prey_peak() {
        let trajectory = simulate(State::new(1.0, 1.0), &textbook(), 20.0, 2000, Scheme::Rk4)
            .expect("valid run");
        let lag = peak_lag(&trajectory).expect("both populations peak");
        assert!(lag > 0.0);
    }

    #[test]
    fn local_maxima_skips_endpoints() {
        let peaks: Vec<usize> = local_maxima([3.0, 1.0, 2.0, 1.0, 4.0].into_iter()).collect();
        assert_eq!(peaks, vec![2]);
    }
}
