use crate::model::State;
use crate::traits::{DynamicalSystem, Step, Steppable};

/// Classic Runge-Kutta 4th Order Solver
#[derive(Debug, Clone, Copy, Default)]
pub struct RK4;

impl Steppable for RK4 {
    fn step(&self, system: &impl DynamicalSystem, t: f64, state: State, dt: f64) -> Step {
        let half = 0.5 * dt;

        // k1 = f(t, y)
        let k1 = system.apply(t, state);
        // k2 = f(t + dt/2, y + dt*k1/2)
        let k2 = system.apply(t + half, state + k1 * half);
        // k3 = f(t + dt/2, y + dt*k2/2)
        let k3 = system.apply(t + half, state + k2 * half);
        // k4 = f(t + dt, y + dt*k3)
        let k4 = system.apply(t + dt, state + k3 * dt);

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        Step {
            state: state + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0),
            error: None,
        }
    }
}

/// Dormand-Prince 5(4) embedded pair.
///
/// Propagates the fifth-order solution and reports the difference to the
/// embedded fourth-order one as the local error estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DormandPrince45;

impl DormandPrince45 {
    /// Order of the embedded error estimate, used for step-size control.
    pub const ERROR_ORDER: i32 = 4;
}

const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// Fifth-order weights (b2 = 0); also the last row of the tableau.
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// b - b_hat, fifth minus fourth order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

impl Steppable for DormandPrince45 {
    fn step(&self, system: &impl DynamicalSystem, t: f64, state: State, dt: f64) -> Step {
        let k1 = system.apply(t, state);
        let k2 = system.apply(t + C2 * dt, state + k1 * (A21 * dt));
        let k3 = system.apply(t + C3 * dt, state + (k1 * A31 + k2 * A32) * dt);
        let k4 = system.apply(
            t + C4 * dt,
            state + (k1 * A41 + k2 * A42 + k3 * A43) * dt,
        );
        let k5 = system.apply(
            t + C5 * dt,
            state + (k1 * A51 + k2 * A52 + k3 * A53 + k4 * A54) * dt,
        );
        let k6 = system.apply(
            t + dt,
            state + (k1 * A61 + k2 * A62 + k3 * A63 + k4 * A64 + k5 * A65) * dt,
        );

        let next = state + (k1 * B1 + k3 * B3 + k4 * B4 + k5 * B5 + k6 * B6) * dt;

        // FSAL stage: f at the propagated point.
        let k7 = system.apply(t + dt, next);
        let error = (k1 * E1 + k3 * E3 + k4 * E4 + k5 * E5 + k6 * E6 + k7 * E7) * dt;

        Step {
            state: next,
            error: Some(error),
        }
    }
}
