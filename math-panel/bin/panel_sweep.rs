//! Angle-of-attack sweep over a generated wing or a stored mesh
//!
//! Usage:
//!   cargo run --release --bin panel_sweep -- --alpha-start -2 --alpha-end 10 --alpha-step 2
//!   cargo run --release --bin panel_sweep -- --wing wing.json --polars polars.json --mass 4.5
//!   cargo run --release --bin panel_sweep -- --help

use anyhow::Context;
use clap::Parser;
use math_panel::core::analysis::{
    CancellationToken, OperatingCondition, SweepSummary, VelocitySpec, run_sweep,
};
use math_panel::core::config::SolverConfig;
use math_panel::core::mesh::{PanelMesh, WingSpec, generate_wing};
use math_panel::core::trace::NullTrace;
use math_panel::core::viscous::{PolarProvider, PolarTable, ThinAirfoilPolar};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "panel-sweep")]
#[command(about = "Angle-of-attack sweep with the triangular panel method", long_about = None)]
struct Args {
    /// Solver configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wing description (JSON), used when no mesh is given
    #[arg(short, long)]
    wing: Option<PathBuf>,

    /// Ready-made panel mesh (JSON)
    #[arg(short, long, conflicts_with = "wing")]
    mesh: Option<PathBuf>,

    /// Section polars (JSON); a thin-airfoil model is used otherwise
    #[arg(short, long)]
    polars: Option<PathBuf>,

    /// First angle of attack (deg)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    alpha_start: f64,

    /// Last angle of attack (deg)
    #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
    alpha_end: f64,

    /// Angle step (deg)
    #[arg(long, default_value_t = 2.0)]
    alpha_step: f64,

    /// Sideslip angle (deg)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    beta: f64,

    /// Flight speed (m/s)
    #[arg(long, default_value_t = 20.0, conflicts_with = "mass")]
    speed: f64,

    /// Mass (kg); the speed of every point balances the weight
    #[arg(long)]
    mass: Option<f64>,

    /// Compute stability derivatives
    #[arg(long)]
    stability: bool,

    /// Number of worker threads (default: all cores)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Output JSON file path
    #[arg(short, long, default_value = "panel_sweep.json")]
    output: PathBuf,
}

fn default_wing() -> WingSpec {
    WingSpec::rectangular(6.0, 1.0, 8, 16).with_thickness(0.12)
}

fn load_mesh(args: &Args) -> anyhow::Result<PanelMesh> {
    if let Some(path) = &args.mesh {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading mesh {}", path.display()))?;
        return Ok(serde_json::from_str(&json)?);
    }
    let spec = match &args.wing {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading wing {}", path.display()))?;
            serde_json::from_str(&json)?
        }
        None => default_wing(),
    };
    Ok(generate_wing(&spec))
}

fn conditions(args: &Args) -> anyhow::Result<Vec<OperatingCondition>> {
    if args.alpha_step <= 0.0 || !args.alpha_step.is_finite() {
        anyhow::bail!("alpha step must be positive, got {}", args.alpha_step);
    }
    let velocity = match args.mass {
        Some(mass) => VelocitySpec::Balanced { mass },
        None => VelocitySpec::Fixed(args.speed),
    };
    let count = ((args.alpha_end - args.alpha_start) / args.alpha_step + 1e-9).floor();
    let count = if count < 0.0 { 0 } else { count as usize + 1 };
    Ok((0..count)
        .map(|i| {
            let mut condition =
                OperatingCondition::new(args.alpha_start + i as f64 * args.alpha_step, velocity)
                    .with_beta(args.beta);
            condition.stability = args.stability;
            condition
        })
        .collect())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SolverConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => SolverConfig::default(),
    };
    if let Some(threads) = args.threads {
        config.threads = threads;
    }

    let mesh = load_mesh(&args)?;
    mesh.validate()?;
    log::info!(
        "mesh: {} panels, {} surfaces, {} trailing edges",
        mesh.num_panels(),
        mesh.surfaces.len(),
        mesh.trailing_edges.len()
    );

    let polars: Box<dyn PolarProvider> = match &args.polars {
        Some(path) => Box::new(
            PolarTable::from_file(path)
                .with_context(|| format!("loading polars {}", path.display()))?,
        ),
        None => Box::new(ThinAirfoilPolar::default()),
    };

    let conditions = conditions(&args)?;
    let cancel = CancellationToken::new();
    // Stages and discarded points already go through `log`
    let trace = NullTrace;
    let summary = SweepSummary::collect(run_sweep(
        &mesh,
        conditions,
        &config,
        polars.as_ref(),
        &trace,
        &cancel,
    ));

    println!("{:>8} {:>10} {:>10} {:>10} {:>10}", "alpha", "CL", "CD", "Cm", "V");
    for (_, result) in &summary.results {
        let c = &result.coefficients;
        println!(
            "{:>8.2} {:>10.5} {:>10.5} {:>10.5} {:>10.3}",
            result.condition.alpha_deg, c.cl, c.cd, c.pitch, result.speed
        );
    }
    for discarded in &summary.discarded {
        println!("point {} discarded: {}", discarded.index, discarded.reason);
    }

    fs::write(&args.output, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("Results written to {}", args.output.display());
    Ok(())
}
