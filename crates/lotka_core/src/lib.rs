//! The `lotka_core` crate simulates and analyses the Lotka-Volterra
//! predator-prey system.
//!
//! Key components:
//! - **Model**: `State`, `Parameters` and the vector field.
//! - **Traits**: `DynamicalSystem` (vector fields) and `Steppable` (one-step schemes).
//! - **Solvers**: fixed-step RK4 and the embedded Dormand-Prince 5(4) pair.
//! - **Integrator**: `simulate`, producing a `Trajectory` that records truncation as data.
//! - **Equilibrium / Analysis / Phase**: fixed points, periodicity, conserved
//!   quantity and phase-portrait geometry.
//! - **Harvest**: a one-off cull mid-run, compared with the undisturbed orbit.
//! - **Sweep**: parallel parameter sensitivity runs and initial-state comparisons.
pub mod analysis;
pub mod equilibrium;
pub mod error;
pub mod harvest;
pub mod integrator;
pub mod model;
pub mod phase;
pub mod settings;
pub mod solvers;
pub mod sweep;
pub mod traits;
pub mod trajectory;

pub use analysis::{approximate_period, conserved_quantity, is_biologically_valid};
pub use equilibrium::{equilibrium, TRIVIAL_EQUILIBRIUM};
pub use error::{ConfigError, DomainError, Error};
pub use integrator::{simulate, simulate_with_step, Scheme};
pub use model::{Parameters, State};
pub use trajectory::{Sample, Termination, Trajectory, TruncationReason};
