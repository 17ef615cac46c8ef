//! Implementation of the `depfile show` command.

use anyhow::{Context, Result};
use depfile_pkg::PackageManifest;
use std::path::Path;

use crate::loader_config;

/// Print a manifest in canonical native form or as JSON.
pub fn show_manifest(file: &Path, json: bool, config: Option<&Path>) -> Result<()> {
    let loader = loader_config(config, file)?;
    let manifest = depfile_pkg::load(file, &loader)
        .with_context(|| format!("Failed to load '{}'", file.display()))?;
    print!("{}", render(&manifest, json)?);
    Ok(())
}

fn render(manifest: &PackageManifest, json: bool) -> Result<String> {
    if json {
        let mut out = manifest
            .to_json_string()
            .context("Failed to serialize manifest")?;
        out.push('\n');
        Ok(out)
    } else {
        Ok(manifest.to_manifest_string())
    }
}
