use thiserror::Error;

/// Invalid input supplied before any work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("rate parameter `{name}` must be positive and finite, got {value}")]
    NonPositiveRate { name: &'static str, value: f64 },
    #[error("step size must be positive and finite, got {0}")]
    InvalidStepSize(f64),
    #[error("step count must be at least 1")]
    ZeroSteps,
    #[error("initial {name} population must be finite, got {value}")]
    NonFiniteInitialState { name: &'static str, value: f64 },
    #[error("tolerance `{name}` must be positive and finite, got {value}")]
    InvalidTolerance { name: &'static str, value: f64 },
    #[error("max_steps must be greater than zero")]
    ZeroStepLimit,
    #[error("{axis} range must be finite with min < max")]
    InvalidRange { axis: &'static str },
    #[error("direction field needs at least 2 samples per axis, got {0}")]
    TooFewSamples(usize),
    #[error("harvest time must lie strictly inside (0, {duration}), got {time}")]
    HarvestOutsideRun { time: f64, duration: f64 },
    #[error("harvest factor `{name}` must be finite and non-negative, got {value}")]
    InvalidHarvestFactor { name: &'static str, value: f64 },
}

/// A population outside the domain of an analysis function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("{name} population must be positive, got {value}")]
    NonPositivePopulation { name: &'static str, value: f64 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
