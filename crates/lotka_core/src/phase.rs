use crate::equilibrium::equilibrium;
use crate::error::ConfigError;
use crate::model::{Parameters, State};
use serde::{Deserialize, Serialize};

/// Lines on which one component of the vector field vanishes.
///
/// Prey are stationary on `prey = 0` and on `predator = prey_level`;
/// predators on `predator = 0` and on `prey = predator_level`. The two
/// non-axis lines cross at the coexistence equilibrium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nullclines {
    /// Predator level α/β at which prey stop changing.
    pub prey_level: f64,
    /// Prey level γ/δ at which predators stop changing.
    pub predator_level: f64,
}

pub fn nullclines(parameters: &Parameters) -> Result<Nullclines, ConfigError> {
    let point = equilibrium(parameters)?;
    Ok(Nullclines {
        prey_level: point.predator,
        predator_level: point.prey,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

impl AxisRange {
    fn validate(&self, axis: &'static str) -> Result<(), ConfigError> {
        if !(self.min.is_finite() && self.max.is_finite() && self.min < self.max) {
            return Err(ConfigError::InvalidRange { axis });
        }
        if self.samples < 2 {
            return Err(ConfigError::TooFewSamples(self.samples));
        }
        Ok(())
    }

    fn value(&self, index: usize) -> f64 {
        self.min + (self.max - self.min) * index as f64 / (self.samples - 1) as f64
    }
}

/// One arrow of a direction field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub origin: State,
    /// Unit vector along the flow, zero at fixed points.
    pub direction: State,
    pub speed: f64,
}

/// Samples the vector field on a prey x predator grid, prey varying fastest.
pub fn direction_field(
    parameters: &Parameters,
    prey: &AxisRange,
    predator: &AxisRange,
) -> Result<Vec<Arrow>, ConfigError> {
    parameters.validate()?;
    prey.validate("prey")?;
    predator.validate("predator")?;

    let mut arrows = Vec::with_capacity(prey.samples * predator.samples);
    for j in 0..predator.samples {
        for i in 0..prey.samples {
            let origin = State::new(prey.value(i), predator.value(j));
            let rate = parameters.rate(origin);
            let speed = rate.prey.hypot(rate.predator);
            let direction = if speed > 0.0 {
                rate * (1.0 / speed)
            } else {
                State::default()
            };
            arrows.push(Arrow {
                origin,
                direction,
                speed,
            });
        }
    }
    Ok(arrows)
}
