//! Implementation of the `depfile convert` command.

use anyhow::{Context, Result};
use depfile_pkg::conanfile;
use depfile_pkg::{ManifestFormat, PackageManifest, UNVERSIONED};
use std::path::{Path, PathBuf};

use crate::{loader_config, OutputFormat};

/// Options for converting a manifest.
#[derive(Debug)]
pub struct ConvertOptions {
    /// Input manifest.
    pub file: PathBuf,
    /// Target format.
    pub to: OutputFormat,
    /// Output file (stdout when absent).
    pub output: Option<PathBuf>,
    /// Package name for conanfile.txt input.
    pub name: Option<String>,
    /// Package version for conanfile.txt input.
    pub version: Option<String>,
}

/// Load the input in any supported format and write it in the target one.
pub fn convert_manifest(options: &ConvertOptions, config: Option<&Path>) -> Result<()> {
    let manifest = load_input(options, config)?;
    let rendered = render(&manifest, options.to)?;

    match &options.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}

fn load_input(options: &ConvertOptions, config: Option<&Path>) -> Result<PackageManifest> {
    let file = &options.file;
    let loader = loader_config(config, file)?;

    let manifest = match (&options.name, ManifestFormat::detect(file)) {
        (Some(name), ManifestFormat::ConanfileTxt) => {
            let version = options.version.as_deref().unwrap_or(UNVERSIONED);
            depfile_pkg::load_txt_as(file, name, version, &loader)
        }
        (Some(_), format) => {
            tracing::warn!(%format, "--name only applies to conanfile.txt input");
            depfile_pkg::load(file, &loader)
        }
        (None, _) => depfile_pkg::load(file, &loader),
    };

    manifest.with_context(|| format!("Failed to load '{}'", file.display()))
}

fn render(manifest: &PackageManifest, to: OutputFormat) -> Result<String> {
    Ok(match to {
        OutputFormat::Native => manifest.to_manifest_string(),
        OutputFormat::ConanfileTxt => conanfile::to_txt(manifest),
        OutputFormat::Json => {
            let mut out = manifest
                .to_json_string()
                .context("Failed to serialize manifest")?;
            out.push('\n');
            out
        }
    })
}
