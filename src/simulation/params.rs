//! Numerical and physical parameters for one propagation run
//!
//! `Parameters` holds runtime settings:
//! - total duration and number of evaluation samples,
//! - absolute/relative error tolerances for the adaptive integrator,
//! - optional initial step and the internal step budget,
//! - softening and gravitational constant (`eps2`, `G`)

pub const DEFAULT_TOLERANCE: f64 = 1.0e-10;
pub const DEFAULT_SAMPLES: usize = 1000;
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub t_end: f64, // time end
    pub samples: usize, // evaluation samples over [0, t_end]
    pub atol: f64, // absolute error tolerance
    pub rtol: f64, // relative error tolerance
    pub h0: Option<f64>, // initial step, picked automatically when None
    pub max_steps: u64, // internal step budget (accepted + rejected)
    pub eps2: f64, // softening, 0 = pure Newtonian
    pub G: f64, // gravitational constant
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            t_end: 1.0,
            samples: DEFAULT_SAMPLES,
            atol: DEFAULT_TOLERANCE,
            rtol: DEFAULT_TOLERANCE,
            h0: None,
            max_steps: DEFAULT_MAX_STEPS,
            eps2: 0.0,
            G: 1.0,
        }
    }
}

impl Parameters {
    /// Default parameters running for `t_end`
    pub fn with_duration(t_end: f64) -> Self {
        Self {
            t_end,
            ..Self::default()
        }
    }

    /// `samples` evenly spaced times over `[0, t_end]`, both ends included
    pub fn eval_times(&self) -> Vec<f64> {
        linspace(0.0, self.t_end, self.samples)
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
/// The last value is exactly `end`.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = end;
            out
        }
    }
}
