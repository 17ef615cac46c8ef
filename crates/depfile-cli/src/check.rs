//! Implementation of the `depfile check` command.

use anyhow::Result;
use depfile_pkg::PackageManifest;
use std::path::{Path, PathBuf};

use crate::loader_config;

/// Load every file and report a one-line summary for each.
pub fn check_files(files: &[PathBuf], config: Option<&Path>) -> Result<()> {
    let mut failed = 0usize;

    for file in files {
        match check_file(file, config) {
            Ok(manifest) => println!("ok: {} ({})", file.display(), summary(&manifest)),
            Err(e) => {
                eprintln!("error: {}: {e:#}", file.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(anyhow::anyhow!(
            "{failed} of {} manifest(s) failed validation",
            files.len()
        ));
    }

    Ok(())
}

fn check_file(file: &Path, config: Option<&Path>) -> Result<PackageManifest> {
    let loader = loader_config(config, file)?;
    Ok(depfile_pkg::load(file, &loader)?)
}

fn summary(manifest: &PackageManifest) -> String {
    let dependencies = manifest.dependencies().len();
    let options = manifest.options().len();
    format!(
        "{} {}, {dependencies} dependenc{}, {options} option{}",
        manifest.name(),
        manifest.version(),
        if dependencies == 1 { "y" } else { "ies" },
        if options == 1 { "" } else { "s" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_summary() {
        let manifest = PackageManifest::parse(
            "name: status-cpp\nversion: 0.1.0\n\
             dependencies:\n  - openssl/1.1.1h\n\
             options:\n  openssl:shared = False\n",
        )
        .unwrap();
        assert_eq!(
            summary(&manifest),
            "status-cpp 0.1.0, 1 dependency, 1 option"
        );
    }

    #[test]
    fn test_check_reports_failures() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good");
        let bad = dir.path().join("bad");
        fs::write(&good, "name: status-cpp\nversion: 0.1.0\n").unwrap();
        fs::write(&bad, "").unwrap();

        assert!(check_files(&[good.clone()], None).is_ok());

        let err = check_files(&[good, bad], None).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 manifest(s) failed validation");
    }
}
