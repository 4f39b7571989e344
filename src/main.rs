use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fhir::CancerCategory;
use sweep_core::config::{
    expand_home, location_sweep_from_env_values, timeout_from_env_value,
};
use sweep_core::{
    run_condition_sweep, run_loader, ConditionConfig, DispatchEngine, HttpTransport, LoaderConfig,
    RunAccumulator, ServiceRegistry, SweepMode,
};

#[derive(Parser)]
#[command(name = "trialsweep")]
#[command(about = "Batch test harness for clinical trial matching services")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send every record in a directory to the matching service
    Load {
        /// Directory of records
        record_directory: PathBuf,
        /// Result directory
        #[arg(short = 'r', long = "result_directory", visible_alias = "result-directory")]
        result_directory: Option<PathBuf>,
        /// Run extensive, against multiple zips and radii of interest
        #[arg(short, long)]
        extensive: bool,
        /// If files already exist, skip (don't rewrite)
        #[arg(short, long)]
        skip: bool,
        /// Matching service URL
        #[arg(long, env = "TRIALSWEEP_SERVICE_URL")]
        url: Option<String>,
    },
    /// Send every catalogue code of one cancer type to a matching service
    Conditions {
        /// Service you want to send the requests to
        service: String,
        /// Cancer type you would like to run against
        #[arg(value_enum)]
        cancer: Cancer,
        /// Path to the cancerTypes.json file
        #[arg(short, long, env = "TRIALSWEEP_CANCER_TYPES")]
        file: Option<PathBuf>,
        /// Directory on where to place results
        #[arg(short, long)]
        directory: Option<PathBuf>,
        /// YAML file mapping service names to URLs
        #[arg(long, env = "TRIALSWEEP_SERVICES_FILE")]
        services: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Cancer {
    Bladder,
    Brain,
    Breast,
    Colon,
    Lung,
    #[value(name = "multipleMyeloma")]
    MultipleMyeloma,
    Prostate,
}

impl From<Cancer> for CancerCategory {
    fn from(cancer: Cancer) -> Self {
        match cancer {
            Cancer::Bladder => CancerCategory::Bladder,
            Cancer::Brain => CancerCategory::Brain,
            Cancer::Breast => CancerCategory::Breast,
            Cancer::Colon => CancerCategory::Colon,
            Cancer::Lung => CancerCategory::Lung,
            Cancer::MultipleMyeloma => CancerCategory::MultipleMyeloma,
            Cancer::Prostate => CancerCategory::Prostate,
        }
    }
}

/// Entry point for the sweep harness
///
/// Resolves configuration, runs the selected sweep, and prints the run summary exactly
/// once, including when the run stops early on a fatal error.
///
/// # Environment Variables
/// - `TRIALSWEEP_SERVICE_URL`: matching service for `load` (default: "http://localhost:3000/getClinicalTrial")
/// - `TRIALSWEEP_TIMEOUT_SECS`: per-request timeout in seconds (default: 30)
/// - `TRIALSWEEP_ZIP_CODES` / `TRIALSWEEP_RADII`: comma-separated overrides for `load --extensive`
/// - `TRIALSWEEP_CANCER_TYPES`: path to the condition catalogue for `conditions`
/// - `TRIALSWEEP_SERVICES_FILE`: YAML service registry overrides for `conditions`
///
/// # Returns
/// * `Ok(())` - If the run completed
/// * `Err(anyhow::Error)` - On usage errors (before any request is sent) or fatal run errors
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trialsweep=info".parse()?)
                .add_directive("sweep_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let timeout = timeout_from_env_value(std::env::var("TRIALSWEEP_TIMEOUT_SECS").ok())?;

    let mut acc = RunAccumulator::new();

    let result = match cli.command {
        Commands::Load {
            record_directory,
            result_directory,
            extensive,
            skip,
            url,
        } => {
            let mode = if extensive {
                SweepMode::Broad
            } else {
                SweepMode::Narrow
            };
            let sweep = location_sweep_from_env_values(
                mode,
                std::env::var("TRIALSWEEP_ZIP_CODES").ok(),
                std::env::var("TRIALSWEEP_RADII").ok(),
            )?;
            let config = LoaderConfig::new(
                expand_home(&record_directory, home.as_deref()),
                result_directory.map(|p| expand_home(&p, home.as_deref())),
                url,
                timeout,
                sweep,
                skip,
            )?;

            let engine = DispatchEngine::new(HttpTransport::new(config.timeout())?, config.service_url());
            run_loader(&config, &engine, &mut acc)
        }
        Commands::Conditions {
            service,
            cancer,
            file,
            directory,
            services,
        } => {
            let registry = ServiceRegistry::load(services.as_deref())?;
            let config = ConditionConfig::new(
                &registry,
                &service,
                cancer.into(),
                file.map(|p| expand_home(&p, home.as_deref())),
                directory.map(|p| expand_home(&p, home.as_deref())),
                timeout,
            )?;
            if config.output_dir().is_none() {
                tracing::info!("no existing output directory given, writing workbook to the working directory");
            }

            let engine = DispatchEngine::new(HttpTransport::new(config.timeout())?, config.service_url());
            run_condition_sweep(&config, &engine, &mut acc, &chrono::Local::now()).map(|_| ())
        }
    };

    if let Some(summary) = acc.take_summary() {
        print!("{summary}");
    }

    if let Err(e) = &result {
        tracing::error!("run stopped: {e}");
    }
    result.map_err(anyhow::Error::from)?;

    Ok(())
}
