use crate::error::ConfigError;
use crate::traits::DynamicalSystem;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Prey and predator populations at one instant.
///
/// Components may go negative under coarse integration; nothing here clamps
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct State {
    pub prey: f64,
    pub predator: f64,
}

impl State {
    pub const fn new(prey: f64, predator: f64) -> Self {
        Self { prey, predator }
    }

    pub fn is_finite(&self) -> bool {
        self.prey.is_finite() && self.predator.is_finite()
    }

    pub(crate) fn validate_initial(&self) -> Result<(), ConfigError> {
        for (name, value) in [("prey", self.prey), ("predator", self.predator)] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteInitialState { name, value });
            }
        }
        Ok(())
    }
}

impl Add for State {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.prey + rhs.prey, self.predator + rhs.predator)
    }
}

impl Sub for State {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.prey - rhs.prey, self.predator - rhs.predator)
    }
}

impl Mul<f64> for State {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.prey * rhs, self.predator * rhs)
    }
}

/// The four biological rates of the Lotka-Volterra system.
///
/// - `prey_growth` (α): prey growth rate in the absence of predators.
/// - `predation` (β): prey lost per prey-predator encounter.
/// - `predator_death` (γ): predator death rate in the absence of prey.
/// - `predator_growth` (δ): predator gain per prey-predator encounter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub prey_growth: f64,
    pub predation: f64,
    pub predator_death: f64,
    pub predator_growth: f64,
}

impl Parameters {
    /// Builds a validated parameter set.
    pub fn new(
        prey_growth: f64,
        predation: f64,
        predator_death: f64,
        predator_growth: f64,
    ) -> Result<Self, ConfigError> {
        let parameters = Self {
            prey_growth,
            predation,
            predator_death,
            predator_growth,
        };
        parameters.validate()?;
        Ok(parameters)
    }

    /// Rejects the first rate that is not strictly positive and finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.named() {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositiveRate { name, value });
            }
        }
        Ok(())
    }

    pub(crate) fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("prey_growth", self.prey_growth),
            ("predation", self.predation),
            ("predator_death", self.predator_death),
            ("predator_growth", self.predator_growth),
        ]
    }

    /// Instantaneous rate of change at `state`.
    pub fn rate(&self, state: State) -> State {
        let State { prey, predator } = state;
        State {
            prey: self.prey_growth * prey - self.predation * prey * predator,
            predator: self.predator_growth * prey * predator - self.predator_death * predator,
        }
    }
}

impl DynamicalSystem for Parameters {
    fn apply(&self, _t: f64, state: State) -> State {
        self.rate(state)
    }
}
