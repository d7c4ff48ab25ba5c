use crate::error::{ConfigError, Result};
use crate::integrator::{simulate, Scheme};
use crate::model::{Parameters, State};
use crate::trajectory::Trajectory;
use serde::{Deserialize, Serialize};

/// Error control for the adaptive scheme.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveSettings {
    pub rtol: f64,
    pub atol: f64,
    /// Ceiling on step attempts (accepted plus rejected) for one run.
    pub max_steps: usize,
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-9,
            max_steps: 100_000,
        }
    }
}

impl AdaptiveSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("rtol", self.rtol), ("atol", self.atol)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroStepLimit);
        }
        Ok(())
    }
}

/// Time span and scheme for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub duration: f64,
    pub step_count: usize,
    pub scheme: Scheme,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            duration: 50.0,
            step_count: 1000,
            scheme: Scheme::Rk4,
        }
    }
}

impl SimulationSettings {
    pub fn step_size(&self) -> f64 {
        self.duration / self.step_count as f64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_count == 0 {
            return Err(ConfigError::ZeroSteps);
        }
        let step = self.step_size();
        if !(step.is_finite() && step > 0.0) {
            return Err(ConfigError::InvalidStepSize(step));
        }
        if let Scheme::DormandPrince(adaptive) = self.scheme {
            adaptive.validate()?;
        }
        Ok(())
    }
}

/// A complete, self-describing simulation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub parameters: Parameters,
    pub initial: State,
    #[serde(default)]
    pub settings: SimulationSettings,
}

impl Scenario {
    /// Parses a JSON scenario and checks every field.
    pub fn from_json(text: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parameters.validate()?;
        self.initial.validate_initial()?;
        self.settings.validate()
    }

    pub fn run(&self) -> Result<Trajectory, ConfigError> {
        simulate(
            self.initial,
            &self.parameters,
            self.settings.duration,
            self.settings.step_count,
            self.settings.scheme,
        )
    }
}
