use tbsim::{Engine, Preset, Scenario, ScenarioConfig, Parameters};
use tbsim::{bench_scenarios, bench_tolerances, write_csv};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Propagate a three-body scenario and write its trajectory as CSV")]
struct Args {
    /// Catalog preset to run
    #[arg(short, long, default_value = "figure-eight")]
    scenario: String,

    /// YAML scenario file, looked up under `scenarios/` when not a path
    #[arg(short, long)]
    file: Option<String>,

    /// Number of evenly spaced output samples
    #[arg(short = 'n', long)]
    samples: Option<usize>,

    /// Absolute error tolerance
    #[arg(long)]
    atol: Option<f64>,

    /// Relative error tolerance
    #[arg(long)]
    rtol: Option<f64>,

    /// CSV output path, stdout when absent
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// List the catalog presets and exit
    #[arg(long)]
    list: bool,

    /// Print tolerance and per-preset cost tables and exit
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<(Scenario, Parameters)> {
    let direct = PathBuf::from(file_name);
    let config_path = if direct.exists() {
        direct
    } else {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
    };

    let text = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let scenario_cfg = ScenarioConfig::from_yaml(&text)
        .with_context(|| format!("parsing {}", config_path.display()))?;

    Ok(scenario_cfg.build()?)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.list {
        for preset in Preset::ALL {
            let key = preset
                .hotkey()
                .map(|c| c.to_ascii_uppercase().to_string())
                .unwrap_or_default();
            println!("{:<14} {:<2} {}", preset.name(), key, preset.display_name());
        }
        return Ok(());
    }

    if args.bench {
        bench_tolerances();
        bench_scenarios();
        return Ok(());
    }

    let (scenario, mut parameters) = match &args.file {
        Some(file_name) => load_scenario_from_yaml(file_name)?,
        None => {
            let scenario = Scenario::by_name(&args.scenario)?;
            let parameters = scenario.parameters();
            (scenario, parameters)
        }
    };

    if let Some(n) = args.samples {
        parameters.samples = n;
    }
    if let Some(atol) = args.atol {
        parameters.atol = atol;
    }
    if let Some(rtol) = args.rtol {
        parameters.rtol = rtol;
    }

    info!("running {} for {} time units", scenario.display_name, parameters.t_end);

    let engine = Engine::new(parameters);
    let trajectory = engine.run(&scenario.system)?;

    let stats = trajectory.stats();
    info!(
        "{} samples, {} accepted / {} rejected steps, {} evaluations",
        trajectory.len(),
        stats.accepted_steps,
        stats.rejected_steps,
        stats.fn_evals
    );

    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            write_csv(&trajectory, BufWriter::new(file))?;
            info!("wrote {}", path.display());
        }
        None => write_csv(&trajectory, io::stdout().lock())?,
    }

    Ok(())
}
