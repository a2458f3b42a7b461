//! Equations of motion for the planar n-body problem
//!
//! Acceleration terms implement [`Acceleration`] and are summed by an
//! [`AccelSet`]. [`NBodyEquations`] turns an `AccelSet` plus the body masses
//! into a first-order system the integrator can drive: velocity slots of the
//! derivative are copied from the state, acceleration slots come from the
//! force terms.

use nalgebra::DVector;

use crate::simulation::error::SimError;
use crate::simulation::integrator::OdeSystem;
use crate::simulation::states::{NVec2, State};

/// Collection of acceleration terms (gravity, drag, etc.)
/// Each term implements [`Acceleration`] and their contributions are summed
/// into a single acceleration vector per body
pub struct AccelSet {
    terms: Vec<Box<dyn Acceleration + Send + Sync>>,
}

impl Default for AccelSet {
    fn default() -> Self {
        Self::new()
    }
}

impl AccelSet {
    /// Create an empty acceleration set
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Add an acceleration term
    pub fn with<T>(mut self, term: T) -> Self
    where
        T: Acceleration + Send + Sync + 'static,
    {
        self.terms.push(Box::new(term));
        self
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Compute total accelerations at time `t`
    /// - `out[i]` will be set to the sum of contributions from all terms
    pub fn accumulate_accels(&self, t: f64, masses: &[f64], x: &[NVec2], out: &mut [NVec2]) {
        for a in out.iter_mut() {
            *a = NVec2::zeros();
        }
        for term in &self.terms {
            term.acceleration(t, masses, x, out);
        }
    }
}

/// Acceleration source acting on bodies with `masses` at positions `x`.
/// Implementations add their contribution into `out[i]` for each body
pub trait Acceleration {
    fn acceleration(&self, t: f64, masses: &[f64], x: &[NVec2], out: &mut [NVec2]);
}

/// Newtonian gravity with optional softening.
///
/// With `eps2 == 0` coincident bodies produce non-finite accelerations; the
/// integrator reports that rather than this term guarding against it.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonianGravity {
    pub G: f64, // gravitational constant
    pub eps2: f64, // softening length squared
}

impl Acceleration for NewtonianGravity {
    fn acceleration(&self, _t: f64, masses: &[f64], x: &[NVec2], out: &mut [NVec2]) {
        let n = x.len();

        // Every ordered pair: body i is pulled toward each other body j,
        // contributions to i are summed before moving on to i + 1
        for i in 0..n {
            let mut a = NVec2::zeros();
            for j in 0..n {
                if i == j {
                    continue;
                }
                // displacement from i to j
                let r = x[j] - x[i];
                let d2 = r.dot(&r) + self.eps2;

                // G * m_j / d^3
                let inv_d = d2.sqrt().recip();
                let coef = self.G * masses[j] * inv_d * inv_d * inv_d;

                a += coef * r;
            }
            out[i] += a;
        }
    }
}

/// Closest pair of bodies `(i, j, distance)` with `i < j`, or `None` for
/// fewer than two bodies
pub fn closest_pair(x: &[NVec2]) -> Option<(usize, usize, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for i in 0..x.len() {
        for j in (i + 1)..x.len() {
            let d = (x[j] - x[i]).norm();
            match best {
                Some((_, _, bd)) if !(d < bd) => {}
                _ => best = Some((i, j, d)),
            }
        }
    }
    best
}

/// First-order n-body system: `d/dt [x, v] = [v, a(x)]`
pub struct NBodyEquations<'a> {
    masses: &'a [f64],
    forces: &'a AccelSet,
}

impl<'a> NBodyEquations<'a> {
    pub fn new(masses: &'a [f64], forces: &'a AccelSet) -> Self {
        Self { masses, forces }
    }

    pub fn n_bodies(&self) -> usize {
        self.masses.len()
    }

    /// Time derivative of `state`, same shape as the input. The state must
    /// hold exactly one body per mass.
    pub fn derivative(&self, t: f64, state: &State) -> Result<State, SimError> {
        if state.n_bodies() != self.n_bodies() {
            return Err(SimError::config(format!(
                "state holds {} bodies but {} masses were given",
                state.n_bodies(),
                self.n_bodies()
            )));
        }
        let mut out = DVector::zeros(state.as_vector().len());
        self.rhs(t, state.as_vector(), &mut out);
        Ok(State::from_raw(out))
    }
}

impl OdeSystem for NBodyEquations<'_> {
    fn rhs(&self, t: f64, y: &DVector<f64>, dydt: &mut DVector<f64>) {
        let n = self.masses.len();

        let x: Vec<NVec2> = (0..n).map(|i| NVec2::new(y[2 * i], y[2 * i + 1])).collect();
        let mut acc = vec![NVec2::zeros(); n];
        self.forces.accumulate_accels(t, self.masses, &x, &mut acc);

        for i in 0..n {
            // position slots take the velocities
            dydt[2 * i] = y[2 * n + 2 * i];
            dydt[2 * i + 1] = y[2 * n + 2 * i + 1];
            // velocity slots take the accelerations
            dydt[2 * n + 2 * i] = acc[i].x;
            dydt[2 * n + 2 * i + 1] = acc[i].y;
        }
    }
}
