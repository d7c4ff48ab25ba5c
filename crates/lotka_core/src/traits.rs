use crate::model::State;

/// Represents a planar continuous-time system.
pub trait DynamicalSystem {
    /// Evaluates the vector field.
    /// t: current time (unused by autonomous systems)
    /// state: point at which to evaluate dx/dt
    fn apply(&self, t: f64, state: State) -> State;
}

/// Outcome of one step of a one-step scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Propagated state at `t + dt`.
    pub state: State,
    /// Local error estimate, for embedded schemes only.
    pub error: Option<State>,
}

/// A trait for solvers that can step a system forward.
pub trait Steppable {
    /// Performs one step of size dt from (t, state) without mutating anything.
    fn step(&self, system: &impl DynamicalSystem, t: f64, state: State, dt: f64) -> Step;
}
