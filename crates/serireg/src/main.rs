use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

pub mod config_file;
pub mod error;
pub mod pipeline;
pub mod slide_source;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// path to the run's `serireg.yaml`; defaults to one in the current
    /// directory
    #[arg(long, short = 'c', default_value = std::env::current_dir().unwrap().join(config_file::CONFIG_FILE_NAME).into_os_string())]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// run the full registration pipeline over the configured slide set
    Register,
    /// warp a single point from one registered slide's native frame into
    /// another's, using an existing run's persisted set artifact
    Warp {
        /// path to a `run.set.json` produced by a previous `register` run
        artifact: PathBuf,
        from: usize,
        to: usize,
        x: f64,
        y: f64,
    },
    /// print a summary of a previously registered set
    Info {
        /// path to a `run.set.json` produced by a previous `register` run
        artifact: PathBuf,
    },
    /// print the default config, to save and edit
    PrintDefaultConfig,
}

fn setup_logging() {
    use tracing_indicatif::IndicatifLayer;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let indicatif_layer = IndicatifLayer::new();
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer);
    tracing::subscriber::set_global_default(subscriber).context("unable to set a global subscriber").expect("logging failed");
}

fn main() -> Result<()> {
    setup_logging();
    let Cli { command, config } = Cli::parse();

    match command {
        Commands::PrintDefaultConfig => config_file::RegistrationConfig::write_default().map(|config| println!("{config}")),
        Commands::Register => {
            let (config_path, config) = config_file::RegistrationConfig::find(&config).context("reading registration config")?;
            info!("found config at [{}]", config_path.display());
            let slides = config
                .slides
                .iter()
                .map(|path| slide_source::open_slide(path).map(|reader| pipeline::SlideInput { path: path.clone(), reader }))
                .collect::<Result<Vec<_>>>()?;
            match pipeline::run_register(&config, slides) {
                Ok((outcome, warnings)) => {
                    for warning in &warnings {
                        tracing::warn!("{warning}");
                    }
                    println!(
                        "wrote set artifact to {} ({} warnings, reference slide {})",
                        outcome.artifact_path.display(),
                        warnings.len(),
                        outcome.reference_idx
                    );
                    Ok(())
                }
                Err(report) => {
                    for (idx, reason) in report.errors.iter().enumerate() {
                        eprintln!("{}. {reason:?}", idx + 1);
                    }
                    Err(anyhow::anyhow!("registration failed with [{}] fatal errors", report.errors.len()))
                }
            }
        }
        Commands::Info { artifact } => serireg_io::SetArtifact::load_from(&artifact).map(|artifact| println!("{}", pipeline::describe(&artifact))),
        Commands::Warp { artifact, from, to, x, y } => {
            let artifact = serireg_io::SetArtifact::load_from(&artifact).context("loading set artifact")?;
            let [wx, wy] = pipeline::warp_point(&artifact, from, to, [x, y])?;
            println!("{wx} {wy}");
            Ok(())
        }
    }
    .with_context(|| format!("error occurred; run with --help or check your {}", config_file::CONFIG_FILE_NAME))
}
