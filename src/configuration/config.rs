//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! propagation run. A scenario file consists of:
//!
//! - `preset`       – optional catalog name (`figure-eight`, `lagrange`, ...)
//! - `name`         – optional display name
//! - [`ParametersConfig`] – numerical parameters and physical constants
//! - [`BodyConfig`]       – initial state for each body
//!
//! Either `preset` or `bodies` must be given, not both.
//!
//! # YAML format
//! An explicit two-body scenario:
//!
//! ```yaml
//! name: "Circular binary"
//!
//! parameters:
//!   t_end: 6.283185307      # total simulation time
//!   samples: 500            # evenly spaced output samples
//!   atol: 1.0e-10           # absolute error tolerance
//!   rtol: 1.0e-10           # relative error tolerance
//!   eps2: 0.0               # softening epsilon^2
//!   G: 1.0                  # gravitational constant
//!
//! bodies:
//!   - x: [ -0.5, 0.0 ]
//!     v: [  0.0, -0.5 ]
//!     m: 0.5
//!   - x: [  0.5, 0.0 ]
//!     v: [  0.0, 0.5 ]
//!     m: 0.5
//! ```
//!
//! A preset with tighter sampling:
//!
//! ```yaml
//! preset: figure-eight
//! parameters:
//!   samples: 10000
//! ```
//!
//! Every `parameters` field is optional. A preset fills in `t_end` with its
//! own duration unless the file overrides it.

use serde::Deserialize;

use crate::simulation::error::SimError;
use crate::simulation::params::{
    Parameters, DEFAULT_MAX_STEPS, DEFAULT_SAMPLES, DEFAULT_TOLERANCE,
};
use crate::simulation::scenario::Scenario;
use crate::simulation::states::{Body, System};

/// Global numerical and physical parameters for a scenario
#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ParametersConfig {
    #[serde(default)]
    pub t_end: Option<f64>, // time end, required without a preset
    #[serde(default = "default_samples")]
    pub samples: usize, // evaluation samples over [0, t_end]
    #[serde(default = "default_tolerance")]
    pub atol: f64, // absolute error tolerance
    #[serde(default = "default_tolerance")]
    pub rtol: f64, // relative error tolerance
    #[serde(default)]
    pub h0: Option<f64>, // first step, automatic if absent
    #[serde(default = "default_max_steps")]
    pub max_steps: u64, // internal step budget
    #[serde(default)]
    pub eps2: f64, // softening - prevent singular forces at very small separations
    #[serde(default = "default_g")]
    pub G: f64, // gravitational constant
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            t_end: None,
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

fn default_samples() -> usize {
    DEFAULT_SAMPLES
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_max_steps() -> u64 {
    DEFAULT_MAX_STEPS
}

fn default_g() -> f64 {
    1.0
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BodyConfig {
    pub x: Vec<f64>, // Initial position `[x, y]`
    pub v: Vec<f64>, // Initial velocity `[vx, vy]`
    pub m: f64,      // Mass of the body
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub preset: Option<String>, // catalog preset to start from
    #[serde(default)]
    pub name: Option<String>, // display name
    #[serde(default)]
    pub parameters: ParametersConfig, // Global numerical and physical parameters
    #[serde(default)]
    pub bodies: Vec<BodyConfig>, // explicit initial state, one entry per body
}

impl ScenarioConfig {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Resolve into a runnable scenario and its parameters
    pub fn build(&self) -> Result<(Scenario, Parameters), SimError> {
        let p_cfg = &self.parameters;

        let mut scenario = match (&self.preset, self.bodies.is_empty()) {
            (Some(_), false) => {
                return Err(SimError::config("give either `preset` or `bodies`, not both"))
            }
            (None, true) => return Err(SimError::config("scenario has no bodies")),
            (Some(name), true) => Scenario::by_name(name)?,
            (None, false) => {
                let t_end = p_cfg.t_end.ok_or_else(|| {
                    SimError::config("`parameters.t_end` is required without a preset")
                })?;
                let bodies = self
                    .bodies
                    .iter()
                    .enumerate()
                    .map(|(i, bc)| body_from_config(i, bc))
                    .collect::<Result<Vec<_>, _>>()?;
                Scenario::new("custom", "Custom Scenario", System::new(bodies), t_end)
            }
        };

        if let Some(name) = &self.name {
            scenario.display_name = name.clone();
        }
        if let Some(t_end) = p_cfg.t_end {
            scenario.total_time = t_end;
        }

        let parameters = Parameters {
            t_end: scenario.total_time,
            samples: p_cfg.samples,
            atol: p_cfg.atol,
            rtol: p_cfg.rtol,
            h0: p_cfg.h0,
            max_steps: p_cfg.max_steps,
            eps2: p_cfg.eps2,
            G: p_cfg.G,
        };

        Ok((scenario, parameters))
    }
}

fn body_from_config(i: usize, bc: &BodyConfig) -> Result<Body, SimError> {
    match (bc.x.as_slice(), bc.v.as_slice()) {
        ([x, y], [vx, vy]) => Ok(Body::new([*x, *y], [*vx, *vy], bc.m)),
        _ => Err(SimError::config(format!(
            "body {i}: position and velocity need exactly two components, got {} and {}",
            bc.x.len(),
            bc.v.len()
        ))),
    }
}
