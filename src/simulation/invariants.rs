//! Conserved quantities of an isolated gravitating system, used to check
//! integration quality.

use crate::simulation::states::{NVec2, State};

/// Kinetic minus potential energy, each pair counted once
#[allow(non_snake_case)]
pub fn total_energy(masses: &[f64], state: &State, G: f64) -> f64 {
    let n = masses.len();
    let mut e = 0.0;
    for i in 0..n {
        let vi = state.velocity(i);
        e += 0.5 * masses[i] * vi.norm_squared();

        let xi = state.position(i);
        for j in (i + 1)..n {
            let d = (state.position(j) - xi).norm();
            e -= G * masses[i] * masses[j] / d;
        }
    }
    e
}

/// Sum of m_i * v_i
pub fn total_momentum(masses: &[f64], state: &State) -> NVec2 {
    masses
        .iter()
        .enumerate()
        .fold(NVec2::zeros(), |p, (i, m)| p + *m * state.velocity(i))
}

/// z-component of sum of m_i * (x_i cross v_i) about the origin
pub fn angular_momentum(masses: &[f64], state: &State) -> f64 {
    masses.iter().enumerate().fold(0.0, |l, (i, m)| {
        let x = state.position(i);
        let v = state.velocity(i);
        l + m * (x.x * v.y - x.y * v.x)
    })
}

pub fn center_of_mass(masses: &[f64], state: &State) -> NVec2 {
    let total: f64 = masses.iter().sum();
    let weighted = masses
        .iter()
        .enumerate()
        .fold(NVec2::zeros(), |c, (i, m)| c + *m * state.position(i));
    weighted / total
}

/// |current - initial| / |initial|, or the absolute change when `initial`
/// is too close to zero to divide by
pub fn relative_drift(initial: f64, current: f64) -> f64 {
    let delta = (current - initial).abs();
    if initial.abs() > f64::EPSILON {
        delta / initial.abs()
    } else {
        delta
    }
}
