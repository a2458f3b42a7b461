//! Core state types for the three-body propagator.
//!
//! - `Body`   initial position, velocity and mass of one point mass
//! - `System` ordered collection of bodies at a given time `t`
//! - `State`  flat state vector handed to the integrator
//!
//! The state vector holds all positions first, then all velocities:
//! `[x1, y1, x2, y2, .., vx1, vy1, vx2, vy2, ..]`. Body order matches the
//! order in which bodies (and therefore masses) were supplied.

use nalgebra::{DVector, Vector2};
pub type NVec2 = Vector2<f64>;

/// Number of scalar slots each body occupies in a `State` (x, y, vx, vy).
pub const SLOTS_PER_BODY: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub x: NVec2, // position
    pub v: NVec2, // velocity
    pub m: f64, // mass
}

impl Body {
    pub fn new(x: [f64; 2], v: [f64; 2], m: f64) -> Self {
        Self {
            x: NVec2::new(x[0], x[1]),
            v: NVec2::new(v[0], v[1]),
            m,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct System {
    pub bodies: Vec<Body>, // 2d collection of bodies
    pub t: f64, // time
}

impl System {
    pub fn new(bodies: Vec<Body>) -> Self {
        Self { bodies, t: 0.0 }
    }

    /// Masses in body order
    pub fn masses(&self) -> Vec<f64> {
        self.bodies.iter().map(|b| b.m).collect()
    }

    /// Pack the bodies into a flat state vector
    pub fn state(&self) -> State {
        let n = self.bodies.len();
        let mut data = DVector::zeros(SLOTS_PER_BODY * n);
        for (i, b) in self.bodies.iter().enumerate() {
            data[2 * i] = b.x.x;
            data[2 * i + 1] = b.x.y;
            data[2 * n + 2 * i] = b.v.x;
            data[2 * n + 2 * i + 1] = b.v.y;
        }
        State { data }
    }

    /// Rebuild a system at time `t` from `state`, keeping this system's masses
    pub fn with_state(&self, t: f64, state: &State) -> System {
        let bodies = self
            .bodies
            .iter()
            .enumerate()
            .map(|(i, b)| Body {
                x: state.position(i),
                v: state.velocity(i),
                m: b.m,
            })
            .collect();
        System { bodies, t }
    }
}

/// Flat position/velocity vector for all bodies at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    data: DVector<f64>,
}

impl State {
    /// Wrap a raw vector. Returns `None` unless the length is a multiple of
    /// `SLOTS_PER_BODY`.
    pub fn from_vector(data: DVector<f64>) -> Option<Self> {
        if data.len() % SLOTS_PER_BODY != 0 {
            return None;
        }
        Some(Self { data })
    }

    // caller guarantees the length
    pub(crate) fn from_raw(data: DVector<f64>) -> Self {
        Self { data }
    }

    pub fn from_slice(values: &[f64]) -> Option<Self> {
        Self::from_vector(DVector::from_column_slice(values))
    }

    pub fn n_bodies(&self) -> usize {
        self.data.len() / SLOTS_PER_BODY
    }

    pub fn position(&self, i: usize) -> NVec2 {
        NVec2::new(self.data[2 * i], self.data[2 * i + 1])
    }

    pub fn velocity(&self, i: usize) -> NVec2 {
        let n = self.n_bodies();
        NVec2::new(self.data[2 * n + 2 * i], self.data[2 * n + 2 * i + 1])
    }

    pub fn positions(&self) -> Vec<NVec2> {
        (0..self.n_bodies()).map(|i| self.position(i)).collect()
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    pub fn as_vector(&self) -> &DVector<f64> {
        &self.data
    }

    pub fn into_vector(self) -> DVector<f64> {
        self.data
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data.as_slice()
    }
}
