use crate::error::ConfigError;
use crate::model::{Parameters, State};
use crate::settings::AdaptiveSettings;
use crate::solvers::{DormandPrince45, RK4};
use crate::traits::{DynamicalSystem, Steppable};
use crate::trajectory::{Trajectory, TrajectoryBuilder, TruncationReason};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Stepping scheme selected per call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scheme {
    /// Classical fixed-step Runge-Kutta 4.
    Rk4,
    /// Adaptive Dormand-Prince 5(4), resampled onto the fixed output grid.
    DormandPrince(AdaptiveSettings),
}

impl Scheme {
    pub fn adaptive() -> Self {
        Scheme::DormandPrince(AdaptiveSettings::default())
    }
}

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
/// Growth over the starting magnitude past which a stalled adaptive run
/// counts as blown up.
const BLOW_UP_RATIO: f64 = 1e12;

/// Integrates `step_count` steps spread evenly over `duration`.
///
/// Returns `step_count + 1` samples at `t_i = i * duration / step_count`
/// unless the run is truncated; truncation is reported on the trajectory,
/// never as an error.
pub fn simulate(
    initial: State,
    parameters: &Parameters,
    duration: f64,
    step_count: usize,
    scheme: Scheme,
) -> Result<Trajectory, ConfigError> {
    if step_count == 0 {
        return Err(ConfigError::ZeroSteps);
    }
    simulate_with_step(
        initial,
        parameters,
        duration / step_count as f64,
        step_count,
        scheme,
    )
}

/// Integrates `step_count` steps of size `step_size` (the output spacing for
/// the adaptive scheme).
#[instrument(level = "debug", skip(parameters))]
pub fn simulate_with_step(
    initial: State,
    parameters: &Parameters,
    step_size: f64,
    step_count: usize,
    scheme: Scheme,
) -> Result<Trajectory, ConfigError> {
    parameters.validate()?;
    initial.validate_initial()?;
    if step_count == 0 {
        return Err(ConfigError::ZeroSteps);
    }
    if !(step_size.is_finite() && step_size > 0.0) {
        return Err(ConfigError::InvalidStepSize(step_size));
    }

    let trajectory = match scheme {
        Scheme::Rk4 => run_fixed(&RK4, initial, *parameters, step_size, step_count),
        Scheme::DormandPrince(adaptive) => {
            adaptive.validate()?;
            run_adaptive(initial, *parameters, step_size, step_count, &adaptive)
        }
    };

    debug!(
        samples = trajectory.len(),
        truncated = trajectory.is_truncated(),
        "simulation finished"
    );
    Ok(trajectory)
}

fn run_fixed(
    stepper: &impl Steppable,
    initial: State,
    parameters: Parameters,
    dt: f64,
    steps: usize,
) -> Trajectory {
    let mut builder = TrajectoryBuilder::new(parameters, dt, steps.saturating_add(1));
    builder.push(0.0, initial);

    let mut state = initial;
    for i in 1..=steps {
        // Times come from the index so they do not accumulate rounding.
        let t_prev = (i - 1) as f64 * dt;
        let time = i as f64 * dt;
        let next = stepper.step(&parameters, t_prev, state, dt).state;
        if !next.is_finite() {
            return builder.truncate(TruncationReason::Divergence, time);
        }
        builder.push(time, next);
        state = next;
    }

    builder.finish()
}

fn run_adaptive(
    initial: State,
    parameters: Parameters,
    dt_out: f64,
    steps: usize,
    settings: &AdaptiveSettings,
) -> Trajectory {
    let t_end = steps as f64 * dt_out;
    let mut builder = TrajectoryBuilder::new(parameters, dt_out, steps.saturating_add(1));
    builder.push(0.0, initial);
    let blow_up_bound = BLOW_UP_RATIO * magnitude(initial).max(1.0);

    let mut t = 0.0;
    let mut y = initial;
    let mut f = parameters.apply(t, y);
    let mut h = initial_step(&parameters, y, f, settings, t_end);
    let mut next_index = 1usize;
    let mut attempts = 0usize;
    let mut rejected_last = false;
    // Set when a trial since the last accepted step produced NaN or infinity.
    let mut saw_non_finite = false;

    while next_index <= steps {
        let stalled = |reason| {
            if saw_non_finite || magnitude(y) > blow_up_bound {
                TruncationReason::Divergence
            } else {
                reason
            }
        };
        if attempts >= settings.max_steps {
            return builder.truncate(stalled(TruncationReason::StepLimit), t);
        }
        attempts += 1;

        let remaining = t_end - t;
        let last = h >= remaining;
        if last {
            h = remaining;
        }
        // Steps below this no longer move `t` on the scale of the output grid.
        let min_step = 10.0 * f64::EPSILON * t.abs().max(dt_out);
        if h < min_step {
            return builder.truncate(stalled(TruncationReason::StepSizeUnderflow), t);
        }

        let step = DormandPrince45.step(&parameters, t, y, h);
        let error = match step.error {
            Some(error) if step.state.is_finite() && error.is_finite() => {
                error_norm(error, y, step.state, settings)
            }
            _ => {
                saw_non_finite = true;
                f64::INFINITY
            }
        };

        if !(error <= 1.0) {
            let factor = if error.is_finite() {
                (SAFETY * error.powf(-1.0 / (DormandPrince45::ERROR_ORDER + 1) as f64))
                    .max(MIN_FACTOR)
            } else {
                MIN_FACTOR
            };
            h *= factor.min(1.0);
            rejected_last = true;
            continue;
        }

        let t_new = if last { t_end } else { t + h };
        let f_new = parameters.apply(t_new, step.state);

        while next_index <= steps {
            let time = next_index as f64 * dt_out;
            if time > t_new {
                break;
            }
            let sample = if time == t_new {
                step.state
            } else {
                hermite(t, y, f, t_new, step.state, f_new, time)
            };
            if !sample.is_finite() {
                return builder.truncate(TruncationReason::Divergence, time);
            }
            builder.push(time, sample);
            next_index += 1;
        }

        let mut factor = if error == 0.0 {
            MAX_FACTOR
        } else {
            (SAFETY * error.powf(-1.0 / (DormandPrince45::ERROR_ORDER + 1) as f64))
                .clamp(MIN_FACTOR, MAX_FACTOR)
        };
        if rejected_last {
            factor = factor.min(1.0);
        }
        h *= factor;
        t = t_new;
        y = step.state;
        f = f_new;
        rejected_last = false;
        saw_non_finite = false;
    }

    debug!(attempts, "adaptive integration complete");
    builder.finish()
}

fn magnitude(state: State) -> f64 {
    state.prey.abs().max(state.predator.abs())
}

/// Root-mean-square of the error scaled by the mixed tolerance.
fn error_norm(error: State, start: State, end: State, settings: &AdaptiveSettings) -> f64 {
    let scale = |e: f64, a: f64, b: f64| e / (settings.atol + settings.rtol * a.abs().max(b.abs()));
    let prey = scale(error.prey, start.prey, end.prey);
    let predator = scale(error.predator, start.predator, end.predator);
    ((prey * prey + predator * predator) / 2.0).sqrt()
}

fn scaled_rms(value: State, reference: State, settings: &AdaptiveSettings) -> f64 {
    error_norm(value, reference, reference, settings)
}

/// Starting step from the local scale of the solution and its derivatives.
fn initial_step(
    parameters: &Parameters,
    y0: State,
    f0: State,
    settings: &AdaptiveSettings,
    t_end: f64,
) -> f64 {
    let d0 = scaled_rms(y0, y0, settings);
    let d1 = scaled_rms(f0, y0, settings);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };

    let y1 = y0 + f0 * h0;
    let f1 = parameters.apply(h0, y1);
    let d2 = scaled_rms(f1 - f0, y0, settings) / h0;
    if !d2.is_finite() {
        return h0.min(t_end);
    }

    let h1 = if d1.max(d2) <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(1.0 / (DormandPrince45::ERROR_ORDER + 1) as f64)
    };
    (100.0 * h0).min(h1).min(t_end)
}

/// Cubic Hermite interpolant between two accepted points.
fn hermite(t0: f64, y0: State, f0: State, t1: f64, y1: State, f1: State, t: f64) -> State {
    let h = t1 - t0;
    let s = (t - t0) / h;
    let s2 = s * s;
    let s3 = s2 * s;
    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;
    y0 * h00 + f0 * (h10 * h) + y1 * h01 + f1 * (h11 * h)
}
