//! Runtime propagation engine
//!
//! Couples a force set and `Parameters` with the adaptive integrator:
//! validates the system, runs Dormand–Prince over the requested times and
//! maps integrator failures onto [`SimError`].

use log::{info, warn};

use crate::simulation::error::SimError;
use crate::simulation::forces::{closest_pair, AccelSet, NBodyEquations, NewtonianGravity};
use crate::simulation::integrator::{Dopri5, IntegrationError, Stats, Tolerances};
use crate::simulation::params::{linspace, Parameters};
use crate::simulation::states::{NVec2, State, System};
use crate::simulation::trajectory::{Sample, Trajectory};

/// A step collapse with the closest pair nearer than this fraction of the
/// initial spread of the system is reported as a collision
pub const COLLISION_FRACTION: f64 = 1e-3;

pub struct Engine {
    pub parameters: Parameters,
    pub forces: AccelSet,
}

impl Engine {
    /// Engine with Newtonian gravity built from `parameters.G` and `parameters.eps2`
    pub fn new(parameters: Parameters) -> Self {
        let forces = AccelSet::new().with(NewtonianGravity {
            G: parameters.G,
            eps2: parameters.eps2,
        });
        Self { parameters, forces }
    }

    /// Engine with a caller-supplied force set
    pub fn with_forces(parameters: Parameters, forces: AccelSet) -> Self {
        Self { parameters, forces }
    }

    pub fn solver(&self) -> Dopri5 {
        Dopri5::new(Tolerances::new(self.parameters.atol, self.parameters.rtol))
            .with_initial_step(self.parameters.h0)
            .with_max_steps(self.parameters.max_steps)
    }

    /// Propagate `system` for `parameters.t_end`, sampling `parameters.samples`
    /// evenly spaced times including both ends
    pub fn run(&self, system: &System) -> Result<Trajectory, SimError> {
        let p = &self.parameters;
        if !(p.t_end > 0.0 && p.t_end.is_finite()) {
            return Err(SimError::config(format!(
                "duration must be positive, got {}",
                p.t_end
            )));
        }
        if p.samples == 0 {
            return Err(SimError::config("at least one sample is required"));
        }
        let t0 = system.t;
        let t1 = t0 + p.t_end;
        let t_eval = linspace(t0, t1, p.samples);
        self.propagate(system, t1, &t_eval)
    }

    /// Propagate `system` from `system.t` and return the state at each time in
    /// `t_eval`, which must be strictly increasing and inside `[system.t, t1]`.
    /// Integration stops at the last requested time.
    pub fn propagate(
        &self,
        system: &System,
        t1: f64,
        t_eval: &[f64],
    ) -> Result<Trajectory, SimError> {
        validate_system(system)?;
        self.validate_parameters()?;
        validate_eval_times(system.t, t1, t_eval)?;

        let masses = system.masses();
        let equations = NBodyEquations::new(&masses, &self.forces);
        let y0 = system.state();

        let t_stop = t_eval[t_eval.len() - 1];
        if t_stop <= system.t {
            // only the initial state was asked for
            let sample = Sample { t: system.t, state: y0 };
            return Ok(Trajectory::new(masses.len(), vec![sample], Stats::default()));
        }

        info!(
            "propagating {} bodies over [{}, {}] with {} samples",
            masses.len(),
            system.t,
            t_stop,
            t_eval.len()
        );

        let spread = max_separation(&y0.positions());
        let solution = self
            .solver()
            .integrate(&equations, (system.t, t_stop), y0.as_vector(), t_eval)
            .map_err(|e| {
                let err = classify(e, spread);
                warn!("propagation aborted: {err}");
                err
            })?;

        let samples = solution
            .t
            .into_iter()
            .zip(solution.y)
            .map(|(t, y)| Sample {
                t,
                state: State::from_raw(y),
            })
            .collect();

        Ok(Trajectory::new(masses.len(), samples, solution.stats))
    }

    fn validate_parameters(&self) -> Result<(), SimError> {
        let p = &self.parameters;
        if !(p.atol > 0.0 && p.atol.is_finite()) || !(p.rtol > 0.0 && p.rtol.is_finite()) {
            return Err(SimError::config(format!(
                "tolerances must be positive, got atol = {}, rtol = {}",
                p.atol, p.rtol
            )));
        }
        if !(p.eps2 >= 0.0 && p.eps2.is_finite()) {
            return Err(SimError::config(format!(
                "softening must be non-negative, got {}",
                p.eps2
            )));
        }
        if !p.G.is_finite() {
            return Err(SimError::config("gravitational constant must be finite"));
        }
        if p.max_steps == 0 {
            return Err(SimError::config("step budget must be at least one"));
        }
        Ok(())
    }
}

fn validate_system(system: &System) -> Result<(), SimError> {
    if system.bodies.is_empty() {
        return Err(SimError::config("system has no bodies"));
    }
    for (i, b) in system.bodies.iter().enumerate() {
        if !(b.m > 0.0 && b.m.is_finite()) {
            return Err(SimError::config(format!(
                "body {i} has non-positive mass {}",
                b.m
            )));
        }
        if !(b.x.iter().all(|c| c.is_finite()) && b.v.iter().all(|c| c.is_finite())) {
            return Err(SimError::config(format!(
                "body {i} has a non-finite position or velocity"
            )));
        }
    }
    if !system.t.is_finite() {
        return Err(SimError::config("start time must be finite"));
    }
    Ok(())
}

fn validate_eval_times(t0: f64, t1: f64, t_eval: &[f64]) -> Result<(), SimError> {
    if !(t1 > t0) {
        return Err(SimError::config(format!(
            "end time {t1} must be after start time {t0}"
        )));
    }
    if t_eval.is_empty() {
        return Err(SimError::config("no evaluation times requested"));
    }
    if let Some(w) = t_eval.windows(2).find(|w| !(w[1] > w[0])) {
        return Err(SimError::config(format!(
            "evaluation times must be strictly increasing, {} follows {}",
            w[1], w[0]
        )));
    }
    let (first, last) = (t_eval[0], t_eval[t_eval.len() - 1]);
    if first < t0 || last > t1 {
        return Err(SimError::config(format!(
            "evaluation times [{first}, {last}] fall outside [{t0}, {t1}]"
        )));
    }
    Ok(())
}

/// Largest distance between any two bodies, 0 for fewer than two
fn max_separation(x: &[NVec2]) -> f64 {
    let mut max: f64 = 0.0;
    for i in 0..x.len() {
        for j in (i + 1)..x.len() {
            max = max.max((x[j] - x[i]).norm());
        }
    }
    max
}

/// Map an integrator failure onto the public taxonomy.
///
/// A non-finite derivative is always a singularity. A collapsed step counts
/// as one when the closest pair at the last accepted state is within
/// `COLLISION_FRACTION * spread`.
fn classify(err: IntegrationError, spread: f64) -> SimError {
    let pair = match &err {
        IntegrationError::NonFiniteDerivative { t, state } => {
            closest_pair(&State::from_raw(state.clone()).positions()).map(|p| (*t, p))
        }
        IntegrationError::StepSizeUnderflow { t, state, .. } => {
            closest_pair(&State::from_raw(state.clone()).positions())
                .filter(|&(_, _, d)| d <= COLLISION_FRACTION * spread)
                .map(|p| (*t, p))
        }
        _ => None,
    };

    match (err, pair) {
        (IntegrationError::InvalidInput { message }, _) => {
            SimError::InvalidConfiguration { reason: message }
        }
        (_, Some((t, (i, j, distance)))) => SimError::SingularityEncountered { t, i, j, distance },
        (other, None) => SimError::IntegrationFailure {
            t: other.time().unwrap_or_default(),
            source: other,
        },
    }
}
