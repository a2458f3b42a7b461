//! Sampled output of one propagation run.

use crate::simulation::integrator::Stats;
use crate::simulation::states::{NVec2, State};

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub t: f64,
    pub state: State,
}

/// Time-ordered samples produced by the engine. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    n_bodies: usize,
    samples: Vec<Sample>,
    stats: Stats,
}

impl Trajectory {
    pub(crate) fn new(n_bodies: usize, samples: Vec<Sample>, stats: Stats) -> Self {
        Self {
            n_bodies,
            samples,
            stats,
        }
    }

    pub fn n_bodies(&self) -> usize {
        self.n_bodies
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn get(&self, k: usize) -> Option<&Sample> {
        self.samples.get(k)
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Integrator counters for the run that produced this trajectory
    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.t).collect()
    }

    pub fn position(&self, k: usize, body: usize) -> NVec2 {
        self.samples[k].state.position(body)
    }

    pub fn velocity(&self, k: usize, body: usize) -> NVec2 {
        self.samples[k].state.velocity(body)
    }

    /// Every sampled position of one body, in time order
    pub fn body_path(&self, body: usize) -> Vec<NVec2> {
        self.samples.iter().map(|s| s.state.position(body)).collect()
    }

    /// Largest |x| or |y| reached by any body
    pub fn max_abs_coordinate(&self) -> f64 {
        self.samples
            .iter()
            .flat_map(|s| s.state.positions())
            .map(|p| p.x.abs().max(p.y.abs()))
            .fold(0.0, f64::max)
    }
}
