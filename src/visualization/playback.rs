//! Frame stepping and screen mapping for an animated viewer
//!
//! A viewer owns the window and event loop; this module only turns a
//! `Trajectory` into "which frame now" and "where on screen". The display
//! scale is fixed for the whole run from the largest coordinate any body
//! reaches, so the picture does not breathe as bodies move.

use crate::simulation::states::NVec2;
use crate::simulation::trajectory::{Sample, Trajectory};

/// Factor applied by one speed-up / slow-down request
pub const SPEED_STEP: f64 = 1.1;

pub struct Playback<'a> {
    trajectory: &'a Trajectory,
    cursor: f64,
    speed: f64,
    scale: f64,
}

impl<'a> Playback<'a> {
    /// Fit the whole trajectory into a square of `half_extent` pixels around
    /// the centre, leaving `margin` pixels free at the edge
    pub fn new(trajectory: &'a Trajectory, half_extent: f64, margin: f64) -> Self {
        Self {
            trajectory,
            cursor: 0.0,
            speed: 1.0,
            scale: display_scale(trajectory, half_extent, margin),
        }
    }

    pub fn index(&self) -> usize {
        self.cursor as usize
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn frame(&self) -> Option<&'a Sample> {
        self.trajectory.get(self.index())
    }

    /// Move forward by the current speed in frames, wrapping to frame 0 past
    /// the end. Fractional speeds accumulate across calls.
    pub fn advance(&mut self) -> usize {
        let len = self.trajectory.len();
        if len == 0 {
            return 0;
        }
        self.cursor += self.speed;
        if self.cursor >= len as f64 {
            self.cursor = 0.0;
        }
        self.index()
    }

    pub fn speed_up(&mut self) {
        self.speed *= SPEED_STEP;
    }

    pub fn slow_down(&mut self) {
        self.speed /= SPEED_STEP;
    }

    pub fn rewind(&mut self) {
        self.cursor = 0.0;
    }

    /// Simulation coordinates to pixels, y axis pointing up
    pub fn to_screen(&self, p: NVec2, center: (f64, f64)) -> (i32, i32) {
        (
            (center.0 + p.x * self.scale) as i32,
            (center.1 - p.y * self.scale) as i32,
        )
    }

    /// Up to `length` recent positions of `body`, newest first, spaced by the
    /// current whole-frame speed
    pub fn trail(&self, body: usize, length: usize) -> Vec<NVec2> {
        let stride = (self.speed as usize).max(1);
        let index = self.index();
        (0..length)
            .map_while(|k| index.checked_sub(k * stride))
            .filter_map(|idx| self.trajectory.get(idx))
            .map(|s| s.state.position(body))
            .collect()
    }
}

/// Pixels per simulation unit so the largest coordinate lands `margin`
/// pixels inside `half_extent`. A trajectory sitting at the origin gets 1.0.
pub fn display_scale(trajectory: &Trajectory, half_extent: f64, margin: f64) -> f64 {
    let max_coord = trajectory.max_abs_coordinate();
    if max_coord > 0.0 && max_coord.is_finite() {
        (half_extent - margin) / max_coord
    } else {
        1.0
    }
}
