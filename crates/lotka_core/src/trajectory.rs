use crate::model::{Parameters, State};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One point of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    #[serde(flatten)]
    pub state: State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationReason {
    /// A produced sample was infinite or NaN.
    Divergence,
    /// The adaptive scheme exhausted its step budget.
    StepLimit,
    /// The adaptive step collapsed below the resolution of the time axis.
    StepSizeUnderflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Termination {
    Completed,
    /// Integration stopped before the requested end; `time` is where the
    /// first sample could not be produced.
    Truncated { reason: TruncationReason, time: f64 },
}

/// Time series produced by one simulation run.
///
/// Only the integrator builds trajectories, and they are read-only once
/// returned. Samples are at strictly increasing times starting from t = 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    parameters: Parameters,
    step_size: f64,
    samples: Vec<Sample>,
    termination: Termination,
}

impl Trajectory {
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Spacing of the output grid.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self.termination, Termination::Truncated { .. })
    }

    /// True when the run stopped because a sample went non-finite.
    pub fn diverged(&self) -> bool {
        matches!(
            self.termination,
            Termination::Truncated {
                reason: TruncationReason::Divergence,
                ..
            }
        )
    }

    pub fn initial_state(&self) -> Option<State> {
        self.samples.first().map(|s| s.state)
    }

    pub fn final_state(&self) -> Option<State> {
        self.samples.last().map(|s| s.state)
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.time)
    }

    pub fn prey(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.state.prey)
    }

    pub fn predator(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.state.predator)
    }

    /// Splits the series into (time, prey, predator) columns for plotting.
    pub fn columns(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (
            self.times().collect(),
            self.prey().collect(),
            self.predator().collect(),
        )
    }
}

/// Upper bound on samples reserved up front; longer runs grow on demand.
const MAX_RESERVED_SAMPLES: usize = 1 << 20;

/// Fills a trajectory sample by sample; never escapes the integrator.
pub(crate) struct TrajectoryBuilder {
    parameters: Parameters,
    step_size: f64,
    samples: Vec<Sample>,
}

impl TrajectoryBuilder {
    pub(crate) fn new(parameters: Parameters, step_size: f64, capacity: usize) -> Self {
        Self {
            parameters,
            step_size,
            samples: Vec::with_capacity(capacity.min(MAX_RESERVED_SAMPLES)),
        }
    }

    pub(crate) fn push(&mut self, time: f64, state: State) {
        debug_assert!(self.samples.last().map_or(true, |s| s.time < time));
        self.samples.push(Sample { time, state });
    }

    pub(crate) fn finish(self) -> Trajectory {
        self.build(Termination::Completed)
    }

    pub(crate) fn truncate(self, reason: TruncationReason, time: f64) -> Trajectory {
        warn!(
            ?reason,
            time,
            samples = self.samples.len(),
            "integration truncated"
        );
        self.build(Termination::Truncated { reason, time })
    }

    fn build(self, termination: Termination) -> Trajectory {
        Trajectory {
            parameters: self.parameters,
            step_size: self.step_size,
            samples: self.samples,
            termination,
        }
    }
}
