//! Adaptive time integrator for first-order ODE systems
//!
//! Dormand–Prince 5(4): seven stages (the last one shared with the next step),
//! a 5th-order solution and an embedded 4th-order estimate whose difference
//! drives step-size control. Requested output times are filled in with cubic
//! Hermite interpolation between the endpoints of each accepted step.
//!
//! The integrator knows nothing about gravity. Anything implementing
//! [`OdeSystem`] (including a plain closure) can be propagated.

use log::debug;
use nalgebra::DVector;
use thiserror::Error;

/// System of ordinary differential equations: dy/dt = f(t, y)
pub trait OdeSystem {
    /// Evaluate the right-hand side at `(t, y)` into `dydt`
    fn rhs(&self, t: f64, y: &DVector<f64>, dydt: &mut DVector<f64>);
}

impl<F> OdeSystem for F
where
    F: Fn(f64, &DVector<f64>, &mut DVector<f64>),
{
    fn rhs(&self, t: f64, y: &DVector<f64>, dydt: &mut DVector<f64>) {
        self(t, y, dydt)
    }
}

const STAGES: usize = 7;

const C: [f64; STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

// Row `s` holds the coefficients for stage `s`; row 6 is the 5th-order solution.
const A: [[f64; STAGES - 1]; STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

// 5th-order weights minus embedded 4th-order weights
const E: [f64; STAGES] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

/// Order of the embedded error estimate
const ERROR_ORDER: f64 = 4.0;

/// Mixed absolute/relative tolerance.
///
/// A step is accepted when every component satisfies
/// `|err_i| <= atol + rtol * max(|y_i|, |y_new_i|)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub atol: f64,
    pub rtol: f64,
}

impl Tolerances {
    pub fn new(atol: f64, rtol: f64) -> Self {
        Self { atol, rtol }
    }

    fn scale(&self, a: f64, b: f64) -> f64 {
        self.atol + self.rtol * a.abs().max(b.abs())
    }
}

/// Step-size controller
///
/// h_new = h * clamp(safety * err^(-1/5), min_factor, max_factor)
#[derive(Debug, Clone, PartialEq)]
pub struct StepController {
    /// Safety factor applied to the optimal step
    pub safety: f64,
    /// Largest shrink per attempt
    pub min_factor: f64,
    /// Largest growth per accepted step
    pub max_factor: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 10.0,
        }
    }
}

impl StepController {
    /// Factor to multiply the current step by, given the normalised error
    pub fn compute_factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }
        let factor = self.safety * error.powf(-1.0 / (ERROR_ORDER + 1.0));
        factor.clamp(self.min_factor, self.max_factor)
    }
}

/// Counters collected during one integration call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub fn_evals: u64,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
}

/// States at the requested evaluation times
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub t: Vec<f64>,
    pub y: Vec<DVector<f64>>,
    pub stats: Stats,
}

#[derive(Debug, Clone, Error)]
pub enum IntegrationError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("non-finite derivative at t = {t}")]
    NonFiniteDerivative {
        t: f64,
        /// Last accepted state
        state: DVector<f64>,
    },

    #[error("step size {h:e} underflowed at t = {t}")]
    StepSizeUnderflow {
        t: f64,
        h: f64,
        /// Last accepted state
        state: DVector<f64>,
    },

    #[error("step budget of {steps} exhausted at t = {t}")]
    MaxStepsExceeded { t: f64, steps: u64 },
}

impl IntegrationError {
    /// Last valid time reached, if the run got that far
    pub fn time(&self) -> Option<f64> {
        match self {
            IntegrationError::InvalidInput { .. } => None,
            IntegrationError::NonFiniteDerivative { t, .. }
            | IntegrationError::StepSizeUnderflow { t, .. }
            | IntegrationError::MaxStepsExceeded { t, .. } => Some(*t),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        IntegrationError::InvalidInput {
            message: message.into(),
        }
    }
}

/// Dormand–Prince 5(4) integrator.
///
/// Holds configuration only; every call to [`Dopri5::integrate`] owns its
/// own buffers, so one instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct Dopri5 {
    tol: Tolerances,
    controller: StepController,
    /// First step to try, chosen automatically when `None`
    pub h0: Option<f64>,
    /// Upper bound on any step
    pub h_max: f64,
    /// Budget of attempted steps (accepted + rejected)
    pub max_steps: u64,
}

struct Workspace {
    k: Vec<DVector<f64>>,
    y_stage: DVector<f64>,
    y_new: DVector<f64>,
}

impl Workspace {
    fn new(dim: usize) -> Self {
        Self {
            k: vec![DVector::zeros(dim); STAGES],
            y_stage: DVector::zeros(dim),
            y_new: DVector::zeros(dim),
        }
    }
}

impl Dopri5 {
    pub fn new(tol: Tolerances) -> Self {
        Self {
            tol,
            controller: StepController::default(),
            h0: None,
            h_max: f64::INFINITY,
            max_steps: 1_000_000,
        }
    }

    pub fn with_initial_step(mut self, h0: Option<f64>) -> Self {
        self.h0 = h0;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_controller(mut self, controller: StepController) -> Self {
        self.controller = controller;
        self
    }

    pub fn tolerances(&self) -> Tolerances {
        self.tol
    }

    /// Integrate `sys` from `y0` over `t_span = (t0, t1)` and return the state
    /// at every time in `t_eval`.
    ///
    /// `t_eval` must be strictly increasing and lie inside `[t0, t1]`. The
    /// output has exactly one entry per requested time, in the same order. On
    /// failure nothing is returned but the error.
    pub fn integrate<S>(
        &self,
        sys: &S,
        t_span: (f64, f64),
        y0: &DVector<f64>,
        t_eval: &[f64],
    ) -> Result<Solution, IntegrationError>
    where
        S: OdeSystem + ?Sized,
    {
        let (t0, t1) = t_span;
        self.validate_inputs(t0, t1, y0, t_eval)?;

        let dim = y0.len();
        let mut stats = Stats::default();
        let mut out_t = Vec::with_capacity(t_eval.len());
        let mut out_y = Vec::with_capacity(t_eval.len());

        let mut t = t0;
        let mut y = y0.clone();
        let mut f = DVector::zeros(dim);
        sys.rhs(t, &y, &mut f);
        stats.fn_evals += 1;
        if !all_finite(&f) {
            return Err(IntegrationError::NonFiniteDerivative { t, state: y });
        }

        let mut next = 0;
        if t_eval[0] == t0 {
            out_t.push(t0);
            out_y.push(y.clone());
            next = 1;
        }

        let mut h = match self.h0 {
            Some(h0) => h0,
            None => self.initial_step(sys, t0, t1, &y, &f, &mut stats),
        };

        let mut ws = Workspace::new(dim);
        let mut steps = 0u64;
        let mut rejected_last = false;
        let mut nonfinite_last = false;

        while t < t1 {
            if steps >= self.max_steps {
                return Err(IntegrationError::MaxStepsExceeded { t, steps });
            }

            let h_min = 10.0 * f64::EPSILON * t.abs().max(1.0);
            if h < h_min && t1 - t > h_min {
                if nonfinite_last {
                    return Err(IntegrationError::NonFiniteDerivative { t, state: y });
                }
                return Err(IntegrationError::StepSizeUnderflow { t, h, state: y });
            }

            let mut h_try = h.min(self.h_max);
            // a remainder below h_min is taken in one step so t cannot stall
            let last = t + h_try >= t1 || t1 - t <= h_min;
            if last {
                h_try = t1 - t;
            }
            let t_new = if last { t1 } else { t + h_try };
            steps += 1;

            let error = self.attempt(sys, t, &y, &f, h_try, &mut ws);
            stats.fn_evals += (STAGES - 1) as u64;

            let error = match error {
                Some(e) => e,
                None => {
                    // a trial stage hit a non-finite value, shrink hard and retry
                    stats.rejected_steps += 1;
                    nonfinite_last = true;
                    rejected_last = true;
                    h = h_try * self.controller.min_factor;
                    continue;
                }
            };
            nonfinite_last = false;

            if error > 1.0 {
                stats.rejected_steps += 1;
                rejected_last = true;
                h = h_try * self.controller.compute_factor(error).min(1.0);
                continue;
            }

            stats.accepted_steps += 1;
            let f_new = &ws.k[STAGES - 1];

            while next < t_eval.len() && t_eval[next] <= t_new {
                let te = t_eval[next];
                let ye = if te == t_new {
                    ws.y_new.clone()
                } else {
                    hermite(t, &y, &f, t_new, &ws.y_new, f_new, te)
                };
                out_t.push(te);
                out_y.push(ye);
                next += 1;
            }

            let mut factor = self.controller.compute_factor(error);
            if rejected_last {
                factor = factor.min(1.0);
            }
            rejected_last = false;
            h = h_try * factor;

            t = t_new;
            y.copy_from(&ws.y_new);
            f.copy_from(f_new);
        }

        debug!(
            "dopri5: t = [{t0}, {t1}], {} accepted, {} rejected, {} evaluations",
            stats.accepted_steps, stats.rejected_steps, stats.fn_evals
        );

        Ok(Solution {
            t: out_t,
            y: out_y,
            stats,
        })
    }

    /// One trial step of size `h` from `(t, y)` with `f = f(t, y)`.
    ///
    /// Leaves the 5th-order solution in `ws.y_new` and `f(t + h, y_new)` in
    /// `ws.k[6]`. Returns the normalised error, or `None` if any stage went
    /// non-finite.
    fn attempt<S>(
        &self,
        sys: &S,
        t: f64,
        y: &DVector<f64>,
        f: &DVector<f64>,
        h: f64,
        ws: &mut Workspace,
    ) -> Option<f64>
    where
        S: OdeSystem + ?Sized,
    {
        ws.k[0].copy_from(f);

        for s in 1..STAGES {
            ws.y_stage.copy_from(y);
            for j in 0..s {
                let a = A[s][j];
                if a != 0.0 {
                    ws.y_stage.axpy(h * a, &ws.k[j], 1.0);
                }
            }
            if s == STAGES - 1 {
                ws.y_new.copy_from(&ws.y_stage);
            }
            sys.rhs(t + C[s] * h, &ws.y_stage, &mut ws.k[s]);
            if !all_finite(&ws.k[s]) {
                return None;
            }
        }

        if !all_finite(&ws.y_new) {
            return None;
        }

        let mut max_err: f64 = 0.0;
        for i in 0..y.len() {
            let mut err_i = 0.0;
            for (s, e) in E.iter().enumerate() {
                err_i += e * ws.k[s][i];
            }
            err_i *= h;
            let scaled = err_i.abs() / self.tol.scale(y[i], ws.y_new[i]);
            max_err = max_err.max(scaled);
        }

        if max_err.is_finite() {
            Some(max_err)
        } else {
            None
        }
    }

    /// Starting step from the scale of the state and its derivative
    /// (Hairer, Nørsett & Wanner, Solving ODEs I, II.4).
    fn initial_step<S>(
        &self,
        sys: &S,
        t0: f64,
        t1: f64,
        y0: &DVector<f64>,
        f0: &DVector<f64>,
        stats: &mut Stats,
    ) -> f64
    where
        S: OdeSystem + ?Sized,
    {
        let span = t1 - t0;
        let scale: DVector<f64> = y0.map(|v| self.tol.atol + self.tol.rtol * v.abs());
        let d0 = rms_scaled(y0, &scale);
        let d1 = rms_scaled(f0, &scale);

        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        let h0 = h0.min(span);

        let y1 = y0 + f0 * h0;
        let mut f1 = DVector::zeros(y0.len());
        sys.rhs(t0 + h0, &y1, &mut f1);
        stats.fn_evals += 1;

        let d2 = rms_scaled(&(&f1 - f0), &scale) / h0;
        let h1 = if !d2.is_finite() {
            h0 * 1e-3
        } else if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / (ERROR_ORDER + 1.0))
        };

        (100.0 * h0).min(h1).min(span).min(self.h_max)
    }

    fn validate_inputs(
        &self,
        t0: f64,
        t1: f64,
        y0: &DVector<f64>,
        t_eval: &[f64],
    ) -> Result<(), IntegrationError> {
        if !t0.is_finite() || !t1.is_finite() {
            return Err(IntegrationError::invalid("t0 and t1 must be finite"));
        }
        if t1 <= t0 {
            return Err(IntegrationError::invalid(format!(
                "end time {t1} must be greater than start time {t0}"
            )));
        }
        if !(self.tol.atol > 0.0 && self.tol.atol.is_finite())
            || !(self.tol.rtol > 0.0 && self.tol.rtol.is_finite())
        {
            return Err(IntegrationError::invalid(format!(
                "tolerances must be positive, got atol = {}, rtol = {}",
                self.tol.atol, self.tol.rtol
            )));
        }
        if let Some(h0) = self.h0 {
            if !(h0 > 0.0 && h0.is_finite()) {
                return Err(IntegrationError::invalid(format!(
                    "initial step must be positive, got {h0}"
                )));
            }
        }
        if y0.is_empty() {
            return Err(IntegrationError::invalid("initial state is empty"));
        }
        for (i, v) in y0.iter().enumerate() {
            if !v.is_finite() {
                return Err(IntegrationError::invalid(format!("y0[{i}] is not finite")));
            }
        }
        if t_eval.is_empty() {
            return Err(IntegrationError::invalid("no evaluation times requested"));
        }
        for (i, &te) in t_eval.iter().enumerate() {
            if !(te >= t0 && te <= t1) {
                return Err(IntegrationError::invalid(format!(
                    "evaluation time t_eval[{i}] = {te} outside [{t0}, {t1}]"
                )));
            }
            if i > 0 && te <= t_eval[i - 1] {
                return Err(IntegrationError::invalid(format!(
                    "evaluation times must be strictly increasing, t_eval[{i}] = {te} follows {}",
                    t_eval[i - 1]
                )));
            }
        }
        Ok(())
    }
}

/// Cubic Hermite interpolant through `(t0, y0, f0)` and `(t1, y1, f1)` at `t`
pub fn hermite(
    t0: f64,
    y0: &DVector<f64>,
    f0: &DVector<f64>,
    t1: f64,
    y1: &DVector<f64>,
    f1: &DVector<f64>,
    t: f64,
) -> DVector<f64> {
    let h = t1 - t0;
    let s = (t - t0) / h;
    let s2 = s * s;
    let s3 = s2 * s;

    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;

    y0 * h00 + f0 * (h10 * h) + y1 * h01 + f1 * (h11 * h)
}

fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

fn rms_scaled(v: &DVector<f64>, scale: &DVector<f64>) -> f64 {
    let n = v.len() as f64;
    let sum: f64 = v
        .iter()
        .zip(scale.iter())
        .map(|(a, s)| (a / s) * (a / s))
        .sum();
    (sum / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn oscillator(_t: f64, y: &DVector<f64>, dydt: &mut DVector<f64>) {
        dydt[0] = y[1];
        dydt[1] = -y[0];
    }

    #[test]
    fn controller_is_clamped() {
        let c = StepController::default();
        assert_eq!(c.compute_factor(0.0), c.max_factor);
        assert_eq!(c.compute_factor(1e-30), c.max_factor);
        assert_eq!(c.compute_factor(1e30), c.min_factor);
        let f = c.compute_factor(1.0);
        assert_abs_diff_eq!(f, c.safety, epsilon = 1e-15);
    }

    #[test]
    fn harmonic_oscillator_one_period() {
        let solver = Dopri5::new(Tolerances::new(1e-12, 1e-12));
        let y0 = DVector::from_vec(vec![1.0, 0.0]);
        let t_eval = [0.0, PI / 2.0, PI, 2.0 * PI];
        let sol = solver
            .integrate(&oscillator, (0.0, 2.0 * PI), &y0, &t_eval)
            .unwrap();

        assert_eq!(sol.t, t_eval.to_vec());
        for (t, y) in sol.t.iter().zip(sol.y.iter()) {
            assert_abs_diff_eq!(y[0], t.cos(), epsilon = 1e-8);
            assert_abs_diff_eq!(y[1], -t.sin(), epsilon = 1e-8);
        }
        assert!(sol.stats.accepted_steps > 0);
    }

    #[test]
    fn exponential_decay_dense_output() {
        let decay = |_t: f64, y: &DVector<f64>, dydt: &mut DVector<f64>| {
            dydt[0] = -y[0];
        };
        let solver = Dopri5::new(Tolerances::new(1e-10, 1e-10));
        let y0 = DVector::from_vec(vec![1.0]);
        let t_eval: Vec<f64> = (0..=40).map(|i| i as f64 * 0.1).collect();
        let sol = solver.integrate(&decay, (0.0, 4.0), &y0, &t_eval).unwrap();

        assert_eq!(sol.y.len(), t_eval.len());
        for (t, y) in sol.t.iter().zip(sol.y.iter()) {
            assert_abs_diff_eq!(y[0], (-t).exp(), epsilon = 1e-7);
        }
    }

    #[test]
    fn hermite_reproduces_cubic() {
        // y = t^3, y' = 3t^2
        let y = |t: f64| DVector::from_vec(vec![t * t * t]);
        let f = |t: f64| DVector::from_vec(vec![3.0 * t * t]);
        let v = hermite(1.0, &y(1.0), &f(1.0), 2.0, &y(2.0), &f(2.0), 1.3);
        assert_abs_diff_eq!(v[0], 1.3f64.powi(3), epsilon = 1e-12);
    }

    #[test]
    fn rejects_unsorted_eval_times() {
        let solver = Dopri5::new(Tolerances::new(1e-8, 1e-8));
        let y0 = DVector::from_vec(vec![1.0, 0.0]);
        let err = solver
            .integrate(&oscillator, (0.0, 1.0), &y0, &[0.0, 0.5, 0.5])
            .unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidInput { .. }));
    }

    #[test]
    fn rejects_eval_time_outside_span() {
        let solver = Dopri5::new(Tolerances::new(1e-8, 1e-8));
        let y0 = DVector::from_vec(vec![1.0, 0.0]);
        let err = solver
            .integrate(&oscillator, (0.0, 1.0), &y0, &[0.0, 1.5])
            .unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidInput { .. }));
    }

    #[test]
    fn step_budget_is_enforced() {
        let solver = Dopri5::new(Tolerances::new(1e-12, 1e-12)).with_max_steps(3);
        let y0 = DVector::from_vec(vec![1.0, 0.0]);
        let err = solver
            .integrate(&oscillator, (0.0, 100.0), &y0, &[100.0])
            .unwrap_err();
        match err {
            IntegrationError::MaxStepsExceeded { steps, t } => {
                assert_eq!(steps, 3);
                assert!(t < 100.0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn final_sliver_is_taken_in_one_step() {
        let decay = |_t: f64, y: &DVector<f64>, dydt: &mut DVector<f64>| {
            dydt[0] = -y[0];
        };
        // at t = 1e6 the minimum step is ~2.2e-9, wider than the whole span
        let t0 = 1.0e6;
        let t1 = t0 + 1.0e-9;
        let solver = Dopri5::new(Tolerances::new(1e-10, 1e-10))
            .with_initial_step(Some(1e-12))
            .with_max_steps(2);
        let y0 = DVector::from_vec(vec![1.0]);

        let sol = solver.integrate(&decay, (t0, t1), &y0, &[t1]).unwrap();

        assert_eq!(sol.t, vec![t1]);
        assert_eq!(sol.stats.accepted_steps, 1);
        assert_abs_diff_eq!(sol.y[0][0], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn underflow_carries_last_state() {
        // y' = y^2 with y(0) = 1 escapes to infinity at t = 1
        let blow = |_t: f64, y: &DVector<f64>, dydt: &mut DVector<f64>| {
            dydt[0] = y[0] * y[0];
        };
        let solver = Dopri5::new(Tolerances::new(1e-10, 1e-10));
        let y0 = DVector::from_vec(vec![1.0]);
        match solver.integrate(&blow, (0.0, 2.0), &y0, &[2.0]) {
            Err(IntegrationError::StepSizeUnderflow { t, state, .. }) => {
                assert!(t < 1.0);
                assert!(state[0].is_finite() && state[0] > 1e3, "state {}", state[0]);
            }
            Err(IntegrationError::NonFiniteDerivative { state, .. }) => {
                assert!(state[0].is_finite());
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn nan_at_start_is_reported() {
        let bad = |_t: f64, _y: &DVector<f64>, dydt: &mut DVector<f64>| {
            dydt[0] = f64::NAN;
        };
        let solver = Dopri5::new(Tolerances::new(1e-8, 1e-8));
        let y0 = DVector::from_vec(vec![1.0]);
        let err = solver.integrate(&bad, (0.0, 1.0), &y0, &[1.0]).unwrap_err();
        assert!(matches!(err, IntegrationError::NonFiniteDerivative { t, .. } if t == 0.0));
    }

    #[test]
    fn blow_up_is_not_silent() {
        // y' = y^2 with y(0) = 1 escapes to infinity at t = 1
        let blow = |_t: f64, y: &DVector<f64>, dydt: &mut DVector<f64>| {
            dydt[0] = y[0] * y[0];
        };
        let solver = Dopri5::new(Tolerances::new(1e-10, 1e-10));
        let y0 = DVector::from_vec(vec![1.0]);
        let err = solver.integrate(&blow, (0.0, 2.0), &y0, &[2.0]).unwrap_err();
        let t = err.time().unwrap();
        assert!(t < 1.0 && t > 0.99, "failed at {t}");
    }
}
