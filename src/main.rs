// src/main.rs

use anyhow::{Context, Result};
use aptrepo::control::PACKAGES_FIELDS;
use aptrepo::packages::{DebPackage, PackageArchive};
use aptrepo::repository::digest::DigestTable;
use aptrepo::repository::{AptWriter, Component, Configuration, Distribution};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "aptrepo")]
#[command(author, version, about = "Build APT repositories from Debian packages", long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a repository from a directory of .deb files
    Build(BuildArgs),
    /// Show the index stanza of a single .deb file
    Inspect {
        /// Path to the package file
        package_path: PathBuf,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Directory containing the .deb files
    #[arg(short, long)]
    source: PathBuf,

    /// Repository root to create (must not exist)
    #[arg(short, long)]
    target: PathBuf,

    /// Distribution codename
    #[arg(short, long, default_value = "devel")]
    distribution: String,

    /// Component receiving all packages
    #[arg(short, long, default_value = "main")]
    component: String,

    /// Architectures to index (comma-separated or repeated)
    #[arg(
        short = 'a',
        long = "arch",
        value_name = "ARCH",
        value_delimiter = ',',
        default_values = ["amd64", "i386"]
    )]
    architectures: Vec<String>,

    /// Origin of the distribution
    #[arg(long)]
    origin: Option<String>,

    /// Label of the distribution
    #[arg(long)]
    label: Option<String>,

    /// Description of the distribution
    #[arg(long)]
    description: Option<String>,

    /// Label of the component
    #[arg(long)]
    component_label: Option<String>,

    /// Print the build report as JSON
    #[arg(long)]
    json: bool,
}

impl BuildArgs {
    fn configuration(&self) -> Result<Configuration> {
        let mut component = Component::new(self.component.as_str())?;
        if let Some(label) = &self.component_label {
            component = component.with_label(label.as_str());
        }

        let mut distribution = Distribution::new(self.distribution.as_str())?.with_component(component);
        if let Some(origin) = &self.origin {
            distribution = distribution.with_origin(origin.as_str());
        }
        if let Some(label) = &self.label {
            distribution = distribution.with_label(label.as_str());
        }
        if let Some(description) = &self.description {
            distribution = distribution.with_description(description.as_str());
        }

        Ok(Configuration::new(&self.source, &self.target)
            .with_architectures(self.architectures.iter().map(String::as_str))
            .with_distribution(distribution))
    }
}

fn build(args: BuildArgs) -> Result<()> {
    let configuration = args.configuration()?;

    info!(
        "Building repository from {} into {}",
        args.source.display(),
        args.target.display()
    );

    let report = AptWriter::new(configuration)
        .build()
        .with_context(|| format!("Failed to build repository in {}", args.target.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Repository written to: {}", args.target.display());
    println!("  Archives found: {}", report.archives);
    println!("  Copied to pool: {}", report.copied);
    if report.skipped > 0 {
        println!("  Skipped: {}", report.skipped);
    }
    if report.unindexed > 0 {
        println!("  Not indexed (architecture not configured): {}", report.unindexed);
    }
    println!("  Index entries: {}", report.index_entries);
    println!("  Files written: {}", report.files_written.len());

    Ok(())
}

fn inspect(package_path: PathBuf) -> Result<()> {
    let package = DebPackage::read(&package_path)
        .with_context(|| format!("Failed to read {}", package_path.display()))?
        .with_context(|| format!("{} carries no control metadata", package_path.display()))?;

    let size = fs::metadata(&package_path)
        .with_context(|| format!("Failed to stat {}", package_path.display()))?
        .len();
    let digests = DigestTable::package()?.digest_file(&package_path)?;

    let mut control = package.into_control();
    control.set("Size", size.to_string());
    for (field, hex) in digests {
        control.set(field, hex);
    }

    print!("{}", control.to_stanza(PACKAGES_FIELDS));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Build(args) => build(args),
        Commands::Inspect { package_path } => inspect(package_path),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "aptrepo", &mut std::io::stdout());
            Ok(())
        }
    }
}
