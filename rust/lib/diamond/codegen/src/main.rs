//! `diamond-codegen` — generate the diamond deployer contract.
//!
//! Usage:
//!   diamond-codegen evm/out
//!   diamond-codegen evm/out --config scripts/facets.json --check
//!
//! Reads the facet configuration and the compiled facet artifacts under
//! the build directory, resolves which facet exposes which selector and
//! writes `DiamondDeployer.gen.sol` next to the build directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use diamond_codegen_lib::pipeline::{self, GenerateRequest, WriteOutcome};
use diamond_codegen_lib::GeneratorSettings;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "diamond-codegen")]
#[command(about = "Generate the diamond deployer from facet config and compiled artifacts")]
struct Args {
    /// Compiler output directory holding the facet artifacts.
    build_dir: PathBuf,

    /// Facet configuration (JSON).
    #[arg(long, env = "DIAMOND_FACETS_CONFIG", default_value = "scripts/facets.json")]
    config: PathBuf,

    /// Deployer template.
    #[arg(long, env = "DIAMOND_TEMPLATE", default_value = "scripts/templates/DiamondDeployer.sol.tpl")]
    template: PathBuf,

    /// Output file (default: <BUILD_DIR>/../utils/generated/DiamondDeployer.gen.sol).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Generator settings (TOML).
    #[arg(long, env = "DIAMOND_SETTINGS")]
    settings: Option<PathBuf>,

    /// Do not write; fail if the output file is out of date.
    #[arg(long)]
    check: bool,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn output_path(&self, settings: &GeneratorSettings) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| pipeline::default_output_path(&self.build_dir, settings))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_target(false)
        .init();

    let settings = GeneratorSettings::load_or_default(args.settings.as_deref())?;
    let output = args.output_path(&settings);

    let request = GenerateRequest {
        build_dir: args.build_dir.clone(),
        config_path: args.config.clone(),
        template_path: args.template.clone(),
        settings,
    };

    info!("Reading facets from {}", request.config_path.display());
    let generated = pipeline::generate(&request)
        .with_context(|| format!("generating deployer from {}", request.build_dir.display()))?;

    for facet in generated.missing_artifacts() {
        warn!("{} has no artifact; its selector accessor is empty", facet);
    }

    if args.check {
        pipeline::check_output(&output, &generated.content)?;
        info!("{} is up to date", output.display());
        return Ok(());
    }

    match pipeline::write_output(&output, &generated.content)? {
        WriteOutcome::Written => info!(
            "Generated {} ({} facets)",
            output.display(),
            generated.facets.len()
        ),
        WriteOutcome::Unchanged => info!("{} unchanged", output.display()),
    }

    Ok(())
}
