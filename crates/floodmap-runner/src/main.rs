//! `floodmap` command line entry point.

use clap::{Parser, Subcommand};
use floodmap_raster::{Thresholds, DEFAULT_SAMPLE_SEED};
use floodmap_runner::{
    run_impact, run_reclassify, run_sample, ImpactRequest, RunError, RunOutcome, Settings,
    SettingsOverrides,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "floodmap",
    version,
    about = "Map the flood impact on infrastructure and roads"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assign flood categories to infrastructure and roads and write maps.
    Impact {
        /// Flood category GeoTIFF (values 0-4).
        flood_map: PathBuf,

        /// Directory for all outputs.
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Search distance around each feature in meters.
        #[arg(short, long)]
        search_distance: Option<f64>,

        /// Infrastructure types to analyse.
        #[arg(short, long, num_args = 1..)]
        infrastructure: Option<Vec<String>>,

        /// YAML settings file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Local infrastructure GeoJSON instead of downloading from Overpass.
        #[arg(long)]
        infrastructure_file: Option<PathBuf>,

        /// Local road GeoJSON instead of downloading from Overpass.
        #[arg(long)]
        roads_file: Option<PathBuf>,

        /// Overpass API interpreter URL.
        #[arg(long)]
        overpass_url: Option<String>,

        /// Cache Overpass responses in this directory.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Skip the road network.
        #[arg(long)]
        no_roads: bool,

        /// Evaluate features on all cores.
        #[arg(long)]
        parallel: bool,

        /// Do not render the PNG static maps.
        #[arg(long)]
        no_static_maps: bool,
    },

    /// Reclassify a depth GeoTIFF into flood categories 0-4.
    Reclassify {
        /// Depth GeoTIFF in meters.
        input: PathBuf,

        /// Category GeoTIFF to write.
        output: PathBuf,

        /// Depth thresholds in meters for categories 1-4.
        #[arg(short, long, num_args = 4, default_values_t = [0.1, 0.2, 0.5, 1.0])]
        thresholds: Vec<f64>,
    },

    /// Write a synthetic depth GeoTIFF.
    Sample {
        /// Depth GeoTIFF to write.
        output: PathBuf,

        /// Width in pixels.
        #[arg(long, default_value_t = 500)]
        width: usize,

        /// Height in pixels.
        #[arg(long, default_value_t = 500)]
        height: usize,

        /// Random seed.
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SEED)]
        seed: u64,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), RunError> {
    match command {
        Commands::Impact {
            flood_map,
            output_dir,
            search_distance,
            infrastructure,
            config,
            infrastructure_file,
            roads_file,
            overpass_url,
            cache_dir,
            no_roads,
            parallel,
            no_static_maps,
        } => {
            let settings = match &config {
                Some(path) => {
                    info!(path = %path.display(), "loading settings");
                    Settings::load(path)?
                }
                None => Settings::default(),
            };
            let overrides = SettingsOverrides {
                search_distance,
                infrastructure,
                overpass_url,
                cache_dir,
                parallel,
                no_roads,
                no_static_maps,
            };
            let request = ImpactRequest {
                flood_map,
                output_dir,
                settings: overrides.apply(settings)?,
                infrastructure_file,
                roads_file,
            };

            let outcome = run_impact(&request)?;
            print_summary(&outcome);
            Ok(())
        }

        Commands::Reclassify {
            input,
            output,
            thresholds,
        } => {
            let thresholds = Thresholds::new(&thresholds)?;
            let preview = run_reclassify(&input, &output, &thresholds)?;
            eprintln!("Wrote {} (preview {})", output.display(), preview.display());
            Ok(())
        }

        Commands::Sample {
            output,
            width,
            height,
            seed,
        } => {
            let preview = run_sample(&output, width, height, seed)?;
            eprintln!("Wrote {} (preview {})", output.display(), preview.display());
            Ok(())
        }
    }
}

fn print_summary(outcome: &RunOutcome) {
    let layers = std::iter::once(("Infrastructure", &outcome.infrastructure))
        .chain(outcome.roads.as_ref().map(|roads| ("Roads", roads)));
    for (name, summary) in layers {
        eprintln!(
            "{}: {} features, {} evaluated, {} outside the flood map, {} skipped",
            name,
            summary.total,
            summary.evaluated,
            summary.not_evaluated,
            summary.failed()
        );
        for (category, count) in summary.histogram.iter() {
            eprintln!("  {:<28} {}", category.label(), count);
        }
    }
    for warning in &outcome.warnings {
        eprintln!("Warning: {}", warning);
    }
    if outcome.skipped() > 0 {
        eprintln!(
            "{} feature(s) could not be evaluated; see {}",
            outcome.skipped(),
            outcome.report.display()
        );
    }
    eprintln!("Report: {}", outcome.report.display());
}
