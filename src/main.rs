//! skillet - package manager CLI for AI agent artifacts

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "skillet")]
#[command(author, version, about = "skillet - a package layer for AI agent artifacts")]
pub struct Cli {
    /// Project directory (defaults to the current directory)
    #[arg(long, global = true)]
    project: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install packages from registries or sources
    Install {
        /// Package spec(s): name, name@constraint, or source/name
        #[arg(required = true)]
        packages: Vec<String>,
        /// Reinstall even if the same version is already installed
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Remove installed packages
    Remove {
        /// Package name(s)
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Upgrade installed packages to their newest resolution
    Upgrade {
        /// Package name(s); all installed packages when omitted
        packages: Vec<String>,
        /// Back up locally modified files, then proceed
        #[arg(long, conflicts_with_all = ["skip_modified", "force"])]
        backup: bool,
        /// Skip packages with local modifications
        #[arg(long = "skip-modified", conflicts_with = "force")]
        skip_modified: bool,
        /// Bypass the local-modification check entirely
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Search registries and sources
    Search {
        /// Substring query; empty lists everything
        #[arg(default_value = "")]
        query: String,
        /// Restrict to one artifact type (skill, agent, prompt, instruction)
        #[arg(long = "type")]
        type_filter: Option<String>,
    },
    /// List installed packages
    List,
    /// Show details for an installed package
    Info {
        /// Package name
        package: String,
    },
    /// Verify installed files against recorded checksums
    Verify {
        /// Package name(s); all installed packages when omitted
        packages: Vec<String>,
    },
    /// Show content diffs for locally modified files
    Diff {
        /// Package name
        package: String,
    },
    /// Package an artifact directory into a registry archive
    Pack {
        /// Package directory containing skillet.toml
        #[arg(default_value = ".")]
        dir: std::path::PathBuf,
        /// Output archive path
        #[arg(long, short = 'o')]
        output: Option<std::path::PathBuf>,
    },
    /// Publish a package to a registry
    Publish {
        /// Package directory containing skillet.toml
        #[arg(default_value = ".")]
        dir: std::path::PathBuf,
        /// Target registry name (default: first configured)
        #[arg(long)]
        registry: Option<String>,
        /// Overwrite an already-published version
        #[arg(long)]
        force: bool,
    },
    /// Manage configured registries
    Registry {
        #[command(subcommand)]
        command: cmd::registry::RegistryCommand,
    },
    /// Manage configured git sources
    Source {
        #[command(subcommand)]
        command: cmd::source::SourceCommand,
    },
    /// Diagnose workspace state (staging remnants, lock health)
    Doctor {
        /// Remove staging remnants
        #[arg(long)]
        clean: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project = match cli.project {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Install { packages, force } => cmd::install::run(&project, &packages, force).await,
        Commands::Remove { packages } => cmd::remove::run(&project, &packages).await,
        Commands::Upgrade {
            packages,
            backup,
            skip_modified,
            force,
        } => cmd::upgrade::run(&project, &packages, backup, skip_modified, force).await,
        Commands::Search { query, type_filter } => {
            cmd::search::run(&project, &query, type_filter.as_deref())
        }
        Commands::List => cmd::list::run(&project),
        Commands::Info { package } => cmd::info::run(&project, &package),
        Commands::Verify { packages } => cmd::verify::run(&project, &packages),
        Commands::Diff { package } => cmd::diff::run(&project, &package),
        Commands::Pack { dir, output } => cmd::pack::run(&dir, output.as_deref()),
        Commands::Publish {
            dir,
            registry,
            force,
        } => cmd::publish::run(&project, &dir, registry.as_deref(), force),
        Commands::Registry { command } => cmd::registry::run(command),
        Commands::Source { command } => cmd::source::run(command).await,
        Commands::Doctor { clean } => cmd::doctor::run(&project, clean),
    }
}
