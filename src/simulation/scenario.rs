//! Catalog of named three-body initial conditions
//!
//! Each preset produces a `Scenario`: an initial `System` (unit masses,
//! G = 1) and a characteristic duration. Figure-eight, Lagrange and Euler
//! durations are true periods; for the other presets the duration is only a
//! display loop length, their periodicity at that length is not established.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::simulation::error::SimError;
use crate::simulation::params::Parameters;
use crate::simulation::states::{Body, State, System};

/// Gravitational constant the preset velocities are derived for
pub const PRESET_G: f64 = 1.0;

/// A named initial configuration and how long to run it
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub display_name: String,
    pub system: System,
    pub total_time: f64,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        system: System,
        total_time: f64,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            system,
            total_time,
        }
    }

    /// Look up a preset by name, see [`Preset::from_str`] for accepted spellings
    pub fn by_name(name: &str) -> Result<Self, SimError> {
        name.parse::<Preset>().map(Preset::scenario)
    }

    pub fn initial_state(&self) -> State {
        self.system.state()
    }

    /// Default parameters running for this scenario's duration
    pub fn parameters(&self) -> Parameters {
        Parameters::with_duration(self.total_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    FigureEight,
    Lagrange,
    Euler,
    BrouckeHenon,
    Butterfly,
    YinYang,
    Dragonfly,
    Mobius,
    PlanarDemo,
}

impl Preset {
    pub const ALL: [Preset; 9] = [
        Preset::FigureEight,
        Preset::Lagrange,
        Preset::Euler,
        Preset::BrouckeHenon,
        Preset::Butterfly,
        Preset::YinYang,
        Preset::Dragonfly,
        Preset::Mobius,
        Preset::PlanarDemo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::FigureEight => "figure-eight",
            Preset::Lagrange => "lagrange",
            Preset::Euler => "euler",
            Preset::BrouckeHenon => "broucke-henon",
            Preset::Butterfly => "butterfly",
            Preset::YinYang => "yin-yang",
            Preset::Dragonfly => "dragonfly",
            Preset::Mobius => "mobius",
            Preset::PlanarDemo => "planar-demo",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Preset::FigureEight => "Figure-Eight Solution",
            Preset::Lagrange => "Lagrange's Solution",
            Preset::Euler => "Euler's Colinear Solution",
            Preset::BrouckeHenon => "Broucke-Hénon Retrograde Orbit",
            Preset::Butterfly => "Butterfly Orbit",
            Preset::YinYang => "Yin-Yang Orbit",
            Preset::Dragonfly => "Dragonfly Orbit",
            Preset::Mobius => "Möbius Solution",
            Preset::PlanarDemo => "Periodic Planar Three-Body Orbits",
        }
    }

    /// Key the interactive viewer binds to this preset
    pub fn hotkey(self) -> Option<char> {
        match self {
            Preset::FigureEight => Some('f'),
            Preset::Lagrange => Some('l'),
            Preset::Euler => Some('e'),
            Preset::BrouckeHenon => Some('b'),
            Preset::Butterfly => Some('y'),
            Preset::YinYang => Some('u'),
            Preset::Dragonfly => Some('d'),
            Preset::Mobius => Some('m'),
            Preset::PlanarDemo => None,
        }
    }

    pub fn from_hotkey(key: char) -> Option<Preset> {
        let key = key.to_ascii_lowercase();
        Preset::ALL.into_iter().find(|p| p.hotkey() == Some(key))
    }

    pub fn scenario(self) -> Scenario {
        match self {
            Preset::FigureEight => figure_eight(),
            Preset::Lagrange => lagrange(),
            Preset::Euler => euler_collinear(),
            Preset::BrouckeHenon => broucke_henon(),
            Preset::Butterfly => butterfly(),
            Preset::YinYang => yin_yang(),
            Preset::Dragonfly => dragonfly(),
            Preset::Mobius => mobius(),
            Preset::PlanarDemo => planar_demo(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = SimError;

    /// Case-insensitive; `_` and spaces count as `-`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '_' | ' ' => '-',
                'ö' | 'Ö' => 'o',
                'é' | 'É' => 'e',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        let preset = match key.as_str() {
            "figure-eight" | "figure-8" | "figure8" => Preset::FigureEight,
            "lagrange" => Preset::Lagrange,
            "euler" | "euler-collinear" | "euler-colinear" => Preset::Euler,
            "broucke-henon" | "broucke" => Preset::BrouckeHenon,
            "butterfly" => Preset::Butterfly,
            "yin-yang" | "yinyang" => Preset::YinYang,
            "dragonfly" => Preset::Dragonfly,
            "mobius" | "moebius" => Preset::Mobius,
            "planar-demo" => Preset::PlanarDemo,
            _ => {
                return Err(SimError::InvalidScenario {
                    name: s.to_string(),
                })
            }
        };
        Ok(preset)
    }
}

fn unit_bodies(x: [[f64; 2]; 3], v: [[f64; 2]; 3]) -> System {
    System::new(
        x.iter()
            .zip(v.iter())
            .map(|(x, v)| Body::new(*x, *v, 1.0))
            .collect(),
    )
}

fn preset_scenario(preset: Preset, system: System, total_time: f64) -> Scenario {
    Scenario::new(preset.name(), preset.display_name(), system, total_time)
}

/// Chenciner–Montgomery figure-eight: equal masses chasing each other
/// around a lemniscate, zero total momentum
pub fn figure_eight() -> Scenario {
    let (x1, y1) = (0.97000436, -0.24308753);
    let (vx1, vy1) = (0.4662036850, 0.4323657300);

    let system = unit_bodies(
        [[x1, y1], [-x1, -y1], [0.0, 0.0]],
        [[vx1, vy1], [vx1, vy1], [-2.0 * vx1, -2.0 * vy1]],
    );
    preset_scenario(Preset::FigureEight, system, 6.3259)
}

/// Equilateral triangle rotating rigidly about its centre.
///
/// For masses at mutual distance `s` the balance of centripetal and
/// gravitational acceleration gives ω² = G·ΣM / s³.
pub fn lagrange() -> Scenario {
    let r = 0.2; // circumradius
    let side = r * 3f64.sqrt();
    let total_mass = 3.0;
    let omega = (PRESET_G * total_mass / side.powi(3)).sqrt();

    let mut x = [[0.0; 2]; 3];
    let mut v = [[0.0; 2]; 3];
    for k in 0..3 {
        let angle = 2.0 * PI * k as f64 / 3.0;
        let (px, py) = (r * angle.cos(), r * angle.sin());
        x[k] = [px, py];
        v[k] = [-omega * py, omega * px];
    }

    preset_scenario(Preset::Lagrange, unit_bodies(x, v), 2.0 * PI / omega)
}

/// Equal masses on a rotating line at x = -1, 0, 1. The outer pair moves at
/// the circular speed of the collinear configuration: ω² = 5·G·m / (4·a³).
pub fn euler_collinear() -> Scenario {
    let a = 1.0;
    let m = 1.0;
    let omega = (5.0 * PRESET_G * m / (4.0 * a * a * a)).sqrt();
    let speed = omega * a;

    let system = unit_bodies(
        [[-a, 0.0], [0.0, 0.0], [a, 0.0]],
        [[0.0, speed], [0.0, 0.0], [0.0, -speed]],
    );
    preset_scenario(Preset::Euler, system, 2.0 * PI / omega)
}

pub fn broucke_henon() -> Scenario {
    let system = unit_bodies(
        [[0.0, 0.0], [1.0, 0.0], [-1.0, 0.0]],
        [[0.347111, 0.532728], [-0.694222, 0.0], [0.347111, -0.532728]],
    );
    preset_scenario(Preset::BrouckeHenon, system, 20.0)
}

pub fn butterfly() -> Scenario {
    let system = unit_bodies(
        [[0.0, 0.0], [1.0, 0.0], [-1.0, 0.0]],
        [[0.0, 0.3], [-0.25, -0.15], [0.25, -0.15]],
    );
    preset_scenario(Preset::Butterfly, system, 20.0)
}

pub fn yin_yang() -> Scenario {
    let system = unit_bodies(
        [[0.0, 1.0], [0.0, -1.0], [0.0, 0.0]],
        [[0.6, 0.0], [-0.6, 0.0], [0.0, 0.0]],
    );
    preset_scenario(Preset::YinYang, system, 20.0)
}

pub fn dragonfly() -> Scenario {
    let system = unit_bodies(
        [[-0.5, 0.0], [0.5, 0.0], [0.0, 0.0]],
        [[0.0, 0.5], [0.0, -0.5], [0.0, 0.0]],
    );
    preset_scenario(Preset::Dragonfly, system, 20.0)
}

pub fn mobius() -> Scenario {
    let h = 3f64.sqrt() / 2.0;
    let system = unit_bodies(
        [[1.0, 0.0], [-0.5, h], [-0.5, -h]],
        [[0.0, -0.5], [0.433, 0.25], [-0.433, 0.25]],
    );
    preset_scenario(Preset::Mobius, system, 20.0)
}

/// Bodies from the standalone planar plotting demo
pub fn planar_demo() -> Scenario {
    let system = unit_bodies(
        [[1.0, 0.0], [-1.0, 0.0], [0.0, 1.0]],
        [[0.0, 0.5], [0.0, -0.5], [-0.5, 0.0]],
    );
    preset_scenario(Preset::PlanarDemo, system, 10.0)
}
