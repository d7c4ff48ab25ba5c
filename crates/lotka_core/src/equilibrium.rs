use crate::error::ConfigError;
use crate::model::{Parameters, State};
use nalgebra::DMatrix;
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Joint extinction; a fixed point for every parameter set.
pub const TRIVIAL_EQUILIBRIUM: State = State::new(0.0, 0.0);

/// Coexistence fixed point `(γ/δ, α/β)`.
///
/// Every rate must be positive and finite; a zero `predation` or
/// `predator_growth` would make the division undefined.
pub fn equilibrium(parameters: &Parameters) -> Result<State, ConfigError> {
    parameters.validate()?;
    Ok(State::new(
        parameters.predator_death / parameters.predator_growth,
        parameters.prey_growth / parameters.predation,
    ))
}

/// Row-major Jacobian of the vector field at `state`.
pub fn jacobian(state: State, parameters: &Parameters) -> [[f64; 2]; 2] {
    let State { prey, predator } = state;
    [
        [
            parameters.prey_growth - parameters.predation * predator,
            -parameters.predation * prey,
        ],
        [
            parameters.predator_growth * predator,
            parameters.predator_growth * prey - parameters.predator_death,
        ],
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedPointKind {
    Saddle,
    Center,
    StableNode,
    UnstableNode,
    StableFocus,
    UnstableFocus,
    /// At least one eigenvalue is zero.
    Degenerate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Linearization {
    pub state: State,
    pub jacobian: [[f64; 2]; 2],
    pub eigenvalues: [Complex<f64>; 2],
    pub kind: FixedPointKind,
}

/// Linearizes the vector field at `state` and classifies it by eigenvalues.
pub fn linearize(state: State, parameters: &Parameters) -> Linearization {
    let jacobian = jacobian(state, parameters);
    let matrix = DMatrix::from_row_slice(
        2,
        2,
        &[jacobian[0][0], jacobian[0][1], jacobian[1][0], jacobian[1][1]],
    );
    let scale = matrix.iter().fold(1.0f64, |acc, v| acc.max(v.abs()));
    let values = matrix.complex_eigenvalues();
    let eigenvalues = [values[0], values[1]];

    Linearization {
        state,
        jacobian,
        eigenvalues,
        kind: classify(&eigenvalues, 1e-9 * scale),
    }
}

fn classify(eigenvalues: &[Complex<f64>; 2], tol: f64) -> FixedPointKind {
    let [a, b] = *eigenvalues;
    if a.im.abs() > tol {
        return match a.re {
            re if re.abs() <= tol => FixedPointKind::Center,
            re if re < 0.0 => FixedPointKind::StableFocus,
            _ => FixedPointKind::UnstableFocus,
        };
    }
    if a.re.abs() <= tol || b.re.abs() <= tol {
        return FixedPointKind::Degenerate;
    }
    match (a.re > 0.0, b.re > 0.0) {
        (true, true) => FixedPointKind::UnstableNode,
        (false, false) => FixedPointKind::StableNode,
        _ => FixedPointKind::Saddle,
    }
}

/// Period of small oscillations about the coexistence point, `2π/√(αγ)`.
pub fn linearized_period(parameters: &Parameters) -> Result<f64, ConfigError> {
    parameters.validate()?;
    Ok(2.0 * PI / (parameters.prey_growth * parameters.predator_death).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parameter_sets() -> Vec<Parameters> {
        [
            (1.0, 1.0, 1.0, 1.0),
            (10.0, 2.0, 3.0, 4.0),
            (0.5, 0.1, 0.2, 0.3),
            (6.0, 2.0, 2.0, 3.0),
            (1.0, 0.1, 1.5, 0.75),
        ]
        .into_iter()
        .map(|(a, b, g, d)| Parameters::new(a, b, g, d).expect("valid parameters"))
        .collect()
    }

    #[test]
    fn equilibrium_matches_closed_form() {
        let parameters = Parameters::new(6.0, 2.0, 2.0, 3.0).expect("valid");
        let point = equilibrium(&parameters).expect("equilibrium should exist");
        assert_relative_eq!(point.prey, 2.0 / 3.0);
        assert_relative_eq!(point.predator, 3.0);
    }

    #[test]
    fn equilibrium_is_positive_fixed_point() {
        for parameters in parameter_sets() {
            let point = equilibrium(&parameters).expect("equilibrium should exist");
            assert!(point.prey > 0.0 && point.predator > 0.0);
            let rate = parameters.rate(point);
            assert_relative_eq!(rate.prey, 0.0, epsilon = 1e-12);
            assert_relative_eq!(rate.predator, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn trivial_equilibrium_is_a_fixed_point() {
        for parameters in parameter_sets() {
            assert_eq!(parameters.rate(TRIVIAL_EQUILIBRIUM), State::new(0.0, 0.0));
        }
    }

    #[test]
    fn equilibrium_rejects_zero_predation() {
        let parameters = Parameters {
            prey_growth: 1.0,
            predation: 0.0,
            predator_death: 1.5,
            predator_growth: 0.75,
        };
        assert_eq!(
            equilibrium(&parameters),
            Err(ConfigError::NonPositiveRate {
                name: "predation",
                value: 0.0
            })
        );

        let parameters = Parameters {
            predation: 0.1,
            predator_growth: 0.0,
            ..parameters
        };
        assert!(matches!(
            equilibrium(&parameters),
            Err(ConfigError::NonPositiveRate {
                name: "predator_growth",
                ..
            })
        ));
    }

    #[test]
    fn trivial_point_is_a_saddle() {
        let parameters = Parameters::new(1.0, 0.1, 1.5, 0.75).expect("valid");
        let linear = linearize(TRIVIAL_EQUILIBRIUM, &parameters);
        assert_eq!(linear.kind, FixedPointKind::Saddle);
        let mut real: Vec<f64> = linear.eigenvalues.iter().map(|c| c.re).collect();
        real.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        assert_relative_eq!(real[0], -1.5, epsilon = 1e-12);
        assert_relative_eq!(real[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn coexistence_point_is_a_center() {
        for parameters in parameter_sets() {
            let point = equilibrium(&parameters).expect("equilibrium should exist");
            let linear = linearize(point, &parameters);
            assert_eq!(linear.kind, FixedPointKind::Center, "{parameters:?}");
            let omega = (parameters.prey_growth * parameters.predator_death).sqrt();
            for value in linear.eigenvalues {
                assert_relative_eq!(value.im.abs(), omega, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn classify_covers_nodes_and_foci() {
        let c = |re: f64, im: f64| Complex::new(re, im);
        assert_eq!(
            classify(&[c(-1.0, 0.0), c(-2.0, 0.0)], 1e-9),
            FixedPointKind::StableNode
        );
        assert_eq!(
            classify(&[c(1.0, 0.0), c(2.0, 0.0)], 1e-9),
            FixedPointKind::UnstableNode
        );
        assert_eq!(
            classify(&[c(-0.5, 1.0), c(-0.5, -1.0)], 1e-9),
            FixedPointKind::StableFocus
        );
        assert_eq!(
            classify(&[c(0.5, 1.0), c(0.5, -1.0)], 1e-9),
            FixedPointKind::UnstableFocus
        );
        assert_eq!(
            classify(&[c(0.0, 0.0), c(-1.0, 0.0)], 1e-9),
            FixedPointKind::Degenerate
        );
    }

    #[test]
    fn linearized_period_uses_growth_and_death_rates() {
        let parameters = Parameters::new(1.0, 0.1, 1.5, 0.75).expect("valid");
        let period = linearized_period(&parameters).expect("valid parameters");
        assert_relative_eq!(period, 2.0 * PI / 1.5f64.sqrt());
    }
}
