//! # Pipeline CLI
//!
//! Lists the strategies a registry would load and runs pipeline definitions
//! against an in-memory store. Without `--manifest` or a configured manifest
//! path, `strategies.toml` in the working directory is used when present.

use clap::{Parser, Subcommand};
use pipeline_base::config::ServiceConfig;
use pipeline_base::logging::{self, codes};
use pipeline_base::session::InMemoryStore;
use pipeline_base::strategies::StrategyKind;
use pipeline_base::{log_error, log_info, PipelineService};
use pipeline_sdk::create_strategy_registry_with;
use pipeline_sdk::runner::{run_pipeline, PipelineDefinition};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pipeline", version, about = "Run strategy pipelines")]
struct Cli {
    /// Service configuration (TOML); PIPELINE_* variables fill in the rest
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered strategies
    List {
        /// Only strategies of this kind
        #[arg(long)]
        kind: Option<String>,

        /// Additional plugin manifest
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Execute a pipeline definition and print the final session
    Run {
        pipeline: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    logging::init_preferences(config.logging.clone())?;

    match cli.command {
        Command::List { kind, manifest } => list(config, kind.as_deref(), manifest),
        Command::Run { pipeline } => run(config, &pipeline).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(ServiceConfig::default());
    };

    ServiceConfig::from_file(path).map_err(|err| {
        log_error!(codes::system::CONFIGURATION_LOAD_FAILURE, "Failed to load service configuration",
            "path" => path.display(),
            "error" => err
        );
        err.into()
    })
}

fn list(
    mut config: ServiceConfig,
    kind: Option<&str>,
    manifest: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if manifest.is_some() {
        config.registry.manifest_path = manifest;
    }
    config.registry.fall_back_to_manifest_in(Path::new("."));
    let kind = kind.map(str::parse::<StrategyKind>).transpose()?;

    let registry = create_strategy_registry_with(&config.registry)?;
    let descriptors = match kind {
        Some(kind) => registry.descriptors_for(kind),
        None => registry.descriptors(),
    };

    for descriptor in &descriptors {
        println!(
            "{:<15} {:<25} {} ({})",
            descriptor.kind().as_str(),
            descriptor.value(),
            descriptor.locator,
            descriptor.package
        );
    }

    let stats = registry.statistics();
    println!(
        "\n{} strategies, {} packages, health: {:?}",
        stats.total_strategies, stats.packages, stats.health
    );
    Ok(())
}

async fn run(mut config: ServiceConfig, pipeline: &Path) -> Result<(), Box<dyn std::error::Error>> {
    config.registry.fall_back_to_manifest_in(Path::new("."));
    let definition = PipelineDefinition::from_file(pipeline)?;
    log_info!("Loaded pipeline definition",
        "path" => pipeline.display(),
        "steps" => definition.steps.len()
    );

    let registry = Arc::new(create_strategy_registry_with(&config.registry)?);
    let service = PipelineService::new(registry, Arc::new(InMemoryStore::new()), &config);

    let report = run_pipeline(&service, &definition).await?;
    println!("{}", serde_json::to_string_pretty(&report.session)?);
    Ok(())
}
