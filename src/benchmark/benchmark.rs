use std::time::Instant;

use crate::simulation::engine::Engine;
use crate::simulation::invariants::{relative_drift, total_energy};
use crate::simulation::params::Parameters;
use crate::simulation::scenario::{figure_eight, Preset};

/// Cost and energy error of one figure-eight period across tolerances
/// Paste output directly into excel to graph
pub fn bench_tolerances() {
    let scenario = figure_eight();
    let masses = scenario.system.masses();
    let e0 = total_energy(&masses, &scenario.initial_state(), 1.0);

    println!("tol,accepted,rejected,fn_evals,energy_drift,ms");

    for exp in 6..=12 {
        let tol = 10f64.powi(-exp);
        let engine = Engine::new(Parameters {
            atol: tol,
            rtol: tol,
            samples: 2,
            ..scenario.parameters()
        });

        let t0 = Instant::now();
        let result = engine.run(&scenario.system);
        let ms = t0.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(traj) => {
                let stats = traj.stats();
                let drift = traj
                    .last()
                    .map(|s| relative_drift(e0, total_energy(&masses, &s.state, 1.0)))
                    .unwrap_or(f64::NAN);
                println!(
                    "{:e},{},{},{},{:e},{:.3}",
                    tol, stats.accepted_steps, stats.rejected_steps, stats.fn_evals, drift, ms
                );
            }
            Err(e) => println!("{:e},,,,,{:.3} # {}", tol, ms, e),
        }
    }
}

/// Cost of running every preset over its full duration at default tolerance
pub fn bench_scenarios() {
    println!("scenario,total_time,accepted,rejected,fn_evals,ms");

    for preset in Preset::ALL {
        let scenario = preset.scenario();
        let engine = Engine::new(scenario.parameters());

        let t0 = Instant::now();
        let result = engine.run(&scenario.system);
        let ms = t0.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(traj) => {
                let stats = traj.stats();
                println!(
                    "{},{},{},{},{},{:.3}",
                    preset,
                    scenario.total_time,
                    stats.accepted_steps,
                    stats.rejected_steps,
                    stats.fn_evals,
                    ms
                );
            }
            Err(e) => println!("{},{},,,,{:.3} # {}", preset, scenario.total_time, ms, e),
        }
    }
}
