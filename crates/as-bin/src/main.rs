//! Aeroshape entrypoint: inspect and rework airfoil files from the
//! command line. The interactive UI sits on top of the same core crates.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use core_airfoil::Airfoil;
use core_config::Config;
use core_geom::{LineType, PanelCount, Strategy};
use core_polar::{PolarDef, PolarSet};
use core_worker::{PolarFileNaming, Worker};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "aeroshape", version, about = "Airfoil geometry tool")]
struct Args {
    /// Airfoil file to work on (.dat, .bez or .hicks).
    pub path: PathBuf,
    /// Optional configuration file path (overrides discovery of `aeroshape.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Normalize the airfoil.
    #[arg(long)]
    pub normalize: bool,
    /// Repanel to this number of panels.
    #[arg(long)]
    pub repanel: Option<usize>,
    /// Set the trailing edge gap (chord fraction).
    #[arg(long)]
    pub te_gap: Option<f64>,
    /// Write the result to this file instead of printing only.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Check whether polars for the default definition exist on disk.
    #[arg(long)]
    pub polar_info: bool,
}

fn configure_logging() -> Option<WorkerGuard> {
    let file_appender = tracing_appender::rolling::never(Path::new("."), "aeroshape.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        Err(_) => None, // a global subscriber is already installed
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging();

    let working_dir = args
        .path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let config = Config::discover(args.config.as_deref(), &working_dir);
    info!(config_source = ?config.source, "starting");

    let mut airfoil = Airfoil::from_file(&args.path);
    airfoil
        .ensure_loaded()
        .with_context(|| format!("loading {}", args.path.display()))?;

    let mut changed = false;
    if args.normalize || args.repanel.is_some() || args.te_gap.is_some() {
        // geometry work wants the splined strategy
        airfoil = airfoil.as_copy(None, None, Some(Strategy::Splined))?;
        if args.normalize {
            changed |= airfoil.normalize()?;
        }
        if let Some(n_panels) = args.repanel {
            let geo = airfoil
                .geometry_mut()
                .context("airfoil has no geometry")?;
            geo.repanel(PanelCount::Total(n_panels), 0.84, 0.7)?;
            changed = true;
        }
        if let Some(gap) = args.te_gap {
            let geo = airfoil
                .geometry_mut()
                .context("airfoil has no geometry")?;
            geo.set_te_gap(gap, 0.8)?;
            changed = true;
        }
    }

    print_info(&airfoil)?;

    if args.polar_info {
        print_polar_info(&airfoil, &config)?;
    }

    if let Some(output) = &args.output {
        if !changed {
            info!("no modification requested, writing a plain copy");
        }
        airfoil.set_path(output);
        airfoil.save()?;
        println!("written: {}", output.display());
    }
    Ok(())
}

fn print_info(airfoil: &Airfoil) -> Result<()> {
    let Some(geo) = airfoil.geometry() else {
        bail!("airfoil '{}' has no geometry", airfoil.name());
    };
    println!("airfoil : {}", airfoil.name_to_show());
    println!("strategy: {:?}", geo.strategy());
    println!("points  : {}  (panels {})", geo.n_points(), geo.n_panels());
    println!("normal  : {}", geo.is_normalized());
    println!("te gap  : {:.5}", geo.te_gap());
    if let Some(radius) = geo.le_radius() {
        println!("le rad  : {radius:.5}");
    }
    if let (Some(thick), Some(thick_x)) = (geo.max_thick(), geo.max_thick_x()) {
        println!("thick   : {:.2}% @ {:.1}%", thick * 100.0, thick_x * 100.0);
    }
    if let (Some(camb), Some(camb_x)) = (geo.max_camb(), geo.max_camb_x()) {
        println!("camber  : {:.2}% @ {:.1}%", camb * 100.0, camb_x * 100.0);
    }
    let upper_hp = geo.side(LineType::Upper).highpoint();
    println!("upper   : {:.4} @ {:.3}", upper_hp.1, upper_hp.0);
    Ok(())
}

fn print_polar_info(airfoil: &Airfoil, config: &Config) -> Result<()> {
    let path = airfoil
        .path_abs()
        .context("airfoil has no file path for polars")?;
    let def = PolarDef {
        re: config.file.polar.re,
        ncrit: config.file.polar.ncrit,
        ..PolarDef::default()
    };

    let mut set = PolarSet::new(airfoil.name(), &path);
    set.add_polar_defs(std::slice::from_ref(&def));
    let n_loaded = set.load_polars(&PolarFileNaming);

    println!("polar   : {}", def.label());
    match set.polars().first() {
        Some(polar) if polar.is_loaded() && !polar.error_occurred() => {
            println!("loaded  : {} points ({n_loaded} new)", polar.points().len());
        }
        _ => {
            println!(
                "missing : expected at {}",
                PolarFileNaming::polar_file_path(&path, &def).display()
            );
            if let Some(worker_exe) = &config.file.executables.worker {
                let version = Worker::is_ready(worker_exe, &config.file.executables.worker_min_version);
                match version {
                    Ok(v) => println!("worker  : ready (version {v})"),
                    Err(e) => println!("worker  : {e}"),
                }
            }
        }
    }
    Ok(())
}
