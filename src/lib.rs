pub mod simulation;
pub mod configuration;
pub mod visualization;
pub mod benchmark;

pub use simulation::states::{Body, System, State, NVec2};
pub use simulation::params::Parameters;
pub use simulation::error::SimError;
pub use simulation::forces::{Acceleration, AccelSet, NewtonianGravity, NBodyEquations};
pub use simulation::integrator::{
    Dopri5, IntegrationError, OdeSystem, Solution, Stats, StepController, Tolerances,
};
pub use simulation::trajectory::{Sample, Trajectory};
pub use simulation::engine::Engine;
pub use simulation::scenario::{Preset, Scenario};

pub use configuration::config::{ScenarioConfig, ParametersConfig, BodyConfig};

pub use visualization::{playback::Playback, export::write_csv};

pub use benchmark::benchmark::{bench_tolerances, bench_scenarios};
