//! depfile CLI - inspect, validate and convert build-dependency manifests

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use depfile_pkg::{Config, LoaderConfig};
use std::path::{Path, PathBuf};

mod check;
mod convert;
mod fmt;
mod logging;
mod show;

#[derive(Parser)]
#[command(name = "depfile")]
#[command(version)]
#[command(about = "Build-dependency manifest tool", long_about = None)]
struct Cli {
    /// Loader configuration file (defaults to depfile.toml next to each manifest)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate manifests
    Check {
        /// Manifest files (depfile, conanfile.txt or conanfile.py)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print a manifest in canonical form
    Show {
        /// Manifest file
        file: PathBuf,

        /// Print JSON instead of the native format
        #[arg(long)]
        json: bool,
    },

    /// Rewrite native manifests in canonical form
    Fmt {
        /// Files to format (if none, formats stdin)
        files: Vec<PathBuf>,

        /// Check if files are formatted without modifying
        #[arg(short, long)]
        check: bool,
    },

    /// Convert a manifest to another format
    Convert {
        /// Manifest file
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum)]
        to: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Package name for conanfile.txt input (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,

        /// Package version for conanfile.txt input
        #[arg(long = "package-version", requires = "name")]
        package_version: Option<String>,
    },
}

/// Formats `convert` can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Native,
    ConanfileTxt,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Check { files } => {
            check::check_files(&files, config)?;
        }

        Commands::Show { file, json } => {
            show::show_manifest(&file, json, config)?;
        }

        Commands::Fmt { files, check } => {
            fmt::format_files(&files, check, config)?;
        }

        Commands::Convert {
            file,
            to,
            output,
            name,
            package_version,
        } => {
            let options = convert::ConvertOptions {
                file,
                to,
                output,
                name,
                version: package_version,
            };
            convert::convert_manifest(&options, config)?;
        }
    }

    Ok(())
}

/// Resolve the loader settings for one manifest.
///
/// An explicit `--config` wins; otherwise `depfile.toml` is looked up in the
/// manifest's directory.
pub(crate) fn loader_config(explicit: Option<&Path>, manifest: &Path) -> Result<LoaderConfig> {
    let config = match explicit {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => {
            let dir = manifest
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            Config::discover(dir)
                .with_context(|| format!("Failed to load config from '{}'", dir.display()))?
        }
    };
    Ok(config.loader)
}
