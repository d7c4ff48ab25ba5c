use crate::analysis::conserved_quantity;
use crate::error::{ConfigError, DomainError};
use crate::integrator::simulate;
use crate::model::{Parameters, State};
use crate::settings::SimulationSettings;
use crate::trajectory::{Sample, Trajectory};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A one-off cull applied to both populations at `time`.
///
/// Factors scale the populations present at that instant: `0.7` removes 30%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Harvest {
    pub time: f64,
    pub prey_factor: f64,
    pub predator_factor: f64,
}

impl Harvest {
    /// Culls predators only.
    pub fn predators(time: f64, predator_factor: f64) -> Self {
        Self {
            time,
            prey_factor: 1.0,
            predator_factor,
        }
    }

    pub fn validate(&self, duration: f64) -> Result<(), ConfigError> {
        if !(self.time.is_finite() && self.time > 0.0 && self.time < duration) {
            return Err(ConfigError::HarvestOutsideRun {
                time: self.time,
                duration,
            });
        }
        for (name, value) in [
            ("prey_factor", self.prey_factor),
            ("predator_factor", self.predator_factor),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidHarvestFactor { name, value });
            }
        }
        Ok(())
    }

    fn apply(&self, state: State) -> State {
        State::new(
            state.prey * self.prey_factor,
            state.predator * self.predator_factor,
        )
    }
}

/// The two segments of a harvested run next to the undisturbed run.
///
/// `after` is `None` when `before` was truncated, since there is no state to
/// restart from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestRun {
    pub harvest: Harvest,
    pub before: Trajectory,
    pub after: Option<Trajectory>,
    pub reference: Trajectory,
}

impl HarvestRun {
    /// Populations just before the cull.
    pub fn pre_harvest_state(&self) -> Option<State> {
        self.after.as_ref().and_then(|_| self.before.final_state())
    }

    /// Populations the second segment restarts from.
    pub fn restart_state(&self) -> Option<State> {
        self.after.as_ref().and_then(Trajectory::initial_state)
    }

    /// Both segments on the run's time axis.
    ///
    /// The harvest time appears twice: once with the populations before the
    /// cull and once with the populations after it.
    pub fn samples(&self) -> Vec<Sample> {
        let offset = self.harvest.time;
        let mut samples = self.before.samples().to_vec();
        if let Some(after) = &self.after {
            samples.extend(after.samples().iter().map(|sample| Sample {
                time: sample.time + offset,
                state: sample.state,
            }));
        }
        samples
    }

    /// Change of the conserved quantity caused by the cull, i.e. how far the
    /// orbit moved.
    pub fn invariant_shift(&self) -> Option<Result<f64, DomainError>> {
        let before = self.pre_harvest_state()?;
        let after = self.restart_state()?;
        let parameters = self.before.parameters();
        Some(conserved_quantity(after, parameters).and_then(|h1| {
            conserved_quantity(before, parameters).map(|h0| h1 - h0)
        }))
    }
}

/// Runs to `harvest.time`, applies the cull, then continues to
/// `settings.duration` from the culled populations.
///
/// Output steps are split between the segments in proportion to their
/// length. The undisturbed run over the whole duration comes back as
/// `reference`.
pub fn simulate_with_harvest(
    initial: State,
    parameters: &Parameters,
    settings: &SimulationSettings,
    harvest: Harvest,
) -> Result<HarvestRun, ConfigError> {
    parameters.validate()?;
    initial.validate_initial()?;
    settings.validate()?;
    harvest.validate(settings.duration)?;

    let fraction = harvest.time / settings.duration;
    let before_steps = ((settings.step_count as f64 * fraction).round() as usize).max(1);
    let after_steps = settings.step_count.saturating_sub(before_steps).max(1);

    let reference = simulate(
        initial,
        parameters,
        settings.duration,
        settings.step_count,
        settings.scheme,
    )?;
    let before = simulate(
        initial,
        parameters,
        harvest.time,
        before_steps,
        settings.scheme,
    )?;

    let after = match (before.is_truncated(), before.final_state()) {
        (false, Some(state)) => {
            let restart = harvest.apply(state);
            debug!(?state, ?restart, time = harvest.time, "harvest applied");
            Some(simulate(
                restart,
                parameters,
                settings.duration - harvest.time,
                after_steps,
                settings.scheme,
            )?)
        }
        _ => None,
    };

    Ok(HarvestRun {
        harvest,
        before,
        after,
        reference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn textbook() -> Parameters {
        Parameters::new(6.0, 2.0, 2.0, 3.0).expect("valid parameters")
    }

    fn settings() -> SimulationSettings {
        SimulationSettings {
            duration: 20.0,
            step_count: 2000,
            ..SimulationSettings::default()
        }
    }

    #[test]
    fn culling_predators_restarts_from_reduced_population() {
        let initial = State::new(1.0, 1.0);
        let run = simulate_with_harvest(
            initial,
            &textbook(),
            &settings(),
            Harvest::predators(5.0, 0.7),
        )
        .expect("valid harvest");

        assert_eq!(run.before.len(), 501);
        assert_eq!(run.before.samples(), &run.reference.samples()[..501]);

        let pre = run.pre_harvest_state().expect("first segment completed");
        let restart = run.restart_state().expect("second segment ran");
        assert_eq!(restart.prey, pre.prey);
        assert_relative_eq!(restart.predator, pre.predator * 0.7);

        let after = run.after.as_ref().expect("second segment ran");
        assert_eq!(after.len(), 1501);
        assert!(!after.is_truncated());

        let samples = run.samples();
        assert_eq!(samples.len(), 501 + 1501);
        assert_eq!(samples[500].time, samples[501].time);
        assert_relative_eq!(samples[samples.len() - 1].time, 20.0, epsilon = 1e-9);

        let shift = run
            .invariant_shift()
            .expect("both segments present")
            .expect("populations stay positive");
        let expected = conserved_quantity(restart, &textbook()).expect("positive")
            - conserved_quantity(pre, &textbook()).expect("positive");
        assert_relative_eq!(shift, expected);
    }

    #[test]
    fn unit_factors_continue_the_undisturbed_orbit() {
        let run = simulate_with_harvest(
            State::new(1.0, 1.0),
            &textbook(),
            &settings(),
            Harvest::predators(5.0, 1.0),
        )
        .expect("valid harvest");

        let after = run.after.as_ref().expect("second segment ran");
        for (sample, reference) in after.samples().iter().zip(&run.reference.samples()[500..]) {
            assert_eq!(sample.state, reference.state);
        }
        let shift = run
            .invariant_shift()
            .expect("both segments present")
            .expect("populations stay positive");
        assert_eq!(shift, 0.0);
    }

    #[test]
    fn harvest_is_checked_before_running() {
        let run = |harvest| {
            simulate_with_harvest(State::new(1.0, 1.0), &textbook(), &settings(), harvest)
        };
        assert_eq!(
            run(Harvest::predators(0.0, 0.7)),
            Err(ConfigError::HarvestOutsideRun {
                time: 0.0,
                duration: 20.0
            })
        );
        assert!(matches!(
            run(Harvest::predators(20.0, 0.7)),
            Err(ConfigError::HarvestOutsideRun { .. })
        ));
        assert_eq!(
            run(Harvest::predators(5.0, -0.1)),
            Err(ConfigError::InvalidHarvestFactor {
                name: "predator_factor",
                value: -0.1
            })
        );
        assert!(matches!(
            run(Harvest {
                time: 5.0,
                prey_factor: f64::NAN,
                predator_factor: 1.0
            }),
            Err(ConfigError::InvalidHarvestFactor {
                name: "prey_factor",
                ..
            })
        ));
    }

    #[test]
    fn diverged_first_segment_skips_the_restart() {
        let classroom = Parameters::new(1.0, 0.1, 1.5, 0.75).expect("valid parameters");
        let coarse = SimulationSettings {
            duration: 2000.0,
            step_count: 20,
            ..SimulationSettings::default()
        };
        let run = simulate_with_harvest(
            State::new(10.0, 5.0),
            &classroom,
            &coarse,
            Harvest::predators(1000.0, 0.7),
        )
        .expect("configuration is valid");

        assert!(run.before.diverged());
        assert!(run.after.is_none());
        assert_eq!(run.restart_state(), None);
        assert!(run.invariant_shift().is_none());
        assert_eq!(run.samples().len(), run.before.len());
    }
}
