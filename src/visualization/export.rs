//! Flat CSV export of a trajectory for plotting tools.
//!
//! One row per (sample, body): `Body,Time,X,Y,VX,VY`, bodies labelled from 1.

use std::io::Write;

use serde::Serialize;

use crate::simulation::trajectory::Trajectory;

#[derive(Debug, Serialize, PartialEq)]
pub struct Row {
    #[serde(rename = "Body")]
    pub body: usize,
    #[serde(rename = "Time")]
    pub time: f64,
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "VX")]
    pub vx: f64,
    #[serde(rename = "VY")]
    pub vy: f64,
}

pub fn rows(trajectory: &Trajectory) -> impl Iterator<Item = Row> + '_ {
    let n = trajectory.n_bodies();
    trajectory.samples().iter().flat_map(move |s| {
        (0..n).map(move |i| {
            let x = s.state.position(i);
            let v = s.state.velocity(i);
            Row {
                body: i + 1,
                time: s.t,
                x: x.x,
                y: x.y,
                vx: v.x,
                vy: v.y,
            }
        })
    })
}

pub fn write_csv<W: Write>(trajectory: &Trajectory, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows(trajectory) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
