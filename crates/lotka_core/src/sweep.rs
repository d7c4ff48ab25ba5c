use crate::analysis::{approximate_period, conserved_quantity};
use crate::equilibrium::equilibrium;
use crate::error::ConfigError;
use crate::integrator::simulate;
use crate::model::{Parameters, State};
use crate::settings::SimulationSettings;
use crate::trajectory::Trajectory;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The rate varied by a sensitivity sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterAxis {
    PreyGrowth,
    Predation,
    PredatorDeath,
    PredatorGrowth,
}

impl ParameterAxis {
    pub fn apply(self, base: &Parameters, value: f64) -> Parameters {
        let mut parameters = *base;
        match self {
            ParameterAxis::PreyGrowth => parameters.prey_growth = value,
            ParameterAxis::Predation => parameters.predation = value,
            ParameterAxis::PredatorDeath => parameters.predator_death = value,
            ParameterAxis::PredatorGrowth => parameters.predator_growth = value,
        }
        parameters
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRun {
    pub value: f64,
    pub parameters: Parameters,
    pub equilibrium: State,
    pub period: Option<f64>,
    pub trajectory: Trajectory,
}

/// Runs one independent simulation per value of `axis`, in parallel.
///
/// Every parameter set and the settings are checked before any run starts.
/// Results keep the order of `values`.
pub fn sweep(
    base: &Parameters,
    initial: State,
    settings: &SimulationSettings,
    axis: ParameterAxis,
    values: &[f64],
) -> Result<Vec<SweepRun>, ConfigError> {
    settings.validate()?;
    initial.validate_initial()?;
    let variants = values
        .iter()
        .map(|&value| -> Result<(f64, Parameters), ConfigError> {
            let parameters = axis.apply(base, value);
            parameters.validate()?;
            Ok((value, parameters))
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(?axis, runs = variants.len(), "starting sweep");

    variants
        .into_par_iter()
        .map(|(value, parameters)| -> Result<SweepRun, ConfigError> {
            let trajectory = simulate(
                initial,
                &parameters,
                settings.duration,
                settings.step_count,
                settings.scheme,
            )?;
            Ok(SweepRun {
                value,
                parameters,
                equilibrium: equilibrium(&parameters)?,
                period: approximate_period(&trajectory),
                trajectory,
            })
        })
        .collect()
}

/// One run of an initial-state comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitRun {
    pub initial: State,
    /// Conserved quantity of the starting point; `None` off the open quadrant.
    pub invariant: Option<f64>,
    pub period: Option<f64>,
    pub trajectory: Trajectory,
}

/// Runs one parameter set from each of `initials`, in parallel.
///
/// Each start traces its own closed orbit, labelled by its conserved
/// quantity. Results keep the order of `initials`.
pub fn sweep_initial_states(
    parameters: &Parameters,
    settings: &SimulationSettings,
    initials: &[State],
) -> Result<Vec<OrbitRun>, ConfigError> {
    parameters.validate()?;
    settings.validate()?;
    for initial in initials {
        initial.validate_initial()?;
    }

    debug!(runs = initials.len(), "starting initial-state sweep");

    initials
        .par_iter()
        .map(|&initial| -> Result<OrbitRun, ConfigError> {
            let trajectory = simulate(
                initial,
                parameters,
                settings.duration,
                settings.step_count,
                settings.scheme,
            )?;
            Ok(OrbitRun {
                initial,
                invariant: conserved_quantity(initial, parameters).ok(),
                period: approximate_period(&trajectory),
                trajectory,
            })
        })
        .collect()
}
