//! Implementation of the `depfile fmt` command.

use anyhow::Result;
use depfile_pkg::{LoaderConfig, ManifestFormat, PackageManifest};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::loader_config;

/// Outcome of formatting one file.
#[derive(Debug, PartialEq, Eq)]
enum FileStatus {
    Unchanged,
    Reformatted,
    WouldReformat,
}

/// Format native manifests in place, or stdin to stdout when no files are given.
pub fn format_files(files: &[PathBuf], check: bool, config: Option<&Path>) -> Result<()> {
    if files.is_empty() {
        return format_stdin(check, config);
    }

    let mut unformatted_files = Vec::new();
    let mut error_files = Vec::new();

    for file in files {
        match format_file(file, check, config) {
            Ok(FileStatus::Unchanged) => {}
            Ok(FileStatus::Reformatted) => println!("Formatted: {}", file.display()),
            Ok(FileStatus::WouldReformat) => {
                println!("Would reformat: {}", file.display());
                unformatted_files.push(file.clone());
            }
            Err(e) => {
                eprintln!("Error in '{}': {e:#}", file.display());
                error_files.push(file.clone());
            }
        }
    }

    if check {
        if !unformatted_files.is_empty() {
            eprintln!("\n{} file(s) would be reformatted", unformatted_files.len());
            return Err(anyhow::anyhow!("Some files are not formatted"));
        }
        if !error_files.is_empty() {
            return Err(anyhow::anyhow!("Some files had errors"));
        }
        println!("All files are properly formatted");
    } else if !error_files.is_empty() {
        return Err(anyhow::anyhow!("{} file(s) had errors", error_files.len()));
    }

    Ok(())
}

fn format_stdin(check: bool, config: Option<&Path>) -> Result<()> {
    let mut source = String::new();
    io::stdin()
        .read_to_string(&mut source)
        .map_err(|e| anyhow::anyhow!("Failed to read from stdin: {e}"))?;

    let loader = match config {
        Some(path) => loader_config(Some(path), Path::new("."))?,
        None => LoaderConfig::default(),
    };
    let formatted = canonical(&source, &loader)?;

    if check {
        if source != formatted {
            return Err(anyhow::anyhow!("stdin is not formatted"));
        }
    } else {
        io::stdout()
            .write_all(formatted.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to write to stdout: {e}"))?;
    }
    Ok(())
}

fn format_file(file: &Path, check: bool, config: Option<&Path>) -> Result<FileStatus> {
    let format = ManifestFormat::detect(file);
    if format != ManifestFormat::Native {
        return Err(anyhow::anyhow!(
            "only native manifests can be formatted, found {format}"
        ));
    }

    let loader = loader_config(config, file)?;
    let source = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Failed to read file: {e}"))?;
    let formatted = canonical(&source, &loader)?;

    if source == formatted {
        return Ok(FileStatus::Unchanged);
    }
    if check {
        return Ok(FileStatus::WouldReformat);
    }

    std::fs::write(file, &formatted).map_err(|e| anyhow::anyhow!("Failed to write file: {e}"))?;
    tracing::info!(path = %file.display(), "rewrote manifest");
    Ok(FileStatus::Reformatted)
}

fn canonical(source: &str, loader: &LoaderConfig) -> Result<String> {
    Ok(PackageManifest::parse_with(source, loader)?.to_manifest_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MESSY: &str = "\
# status-cpp build deps
version: '0.1.0'
name: status-cpp
options:
    boost:shared=False
dependencies:
    - openssl/1.1.1h
    - boost/1.74.0
";

    const CANONICAL: &str = "\
name: status-cpp
version: 0.1.0
dependencies:
  - openssl/1.1.1h
  - boost/1.74.0
options:
  boost:shared = False
";

    #[test]
    fn test_canonical_form() {
        let formatted = canonical(MESSY, &LoaderConfig::default()).unwrap();
        assert_eq!(formatted, CANONICAL);
    }

    #[test]
    fn test_format_file_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(depfile_pkg::MANIFEST_FILE);
        fs::write(&path, MESSY).unwrap();

        assert_eq!(format_file(&path, true, None).unwrap(), FileStatus::WouldReformat);
        assert_eq!(fs::read_to_string(&path).unwrap(), MESSY);

        assert_eq!(format_file(&path, false, None).unwrap(), FileStatus::Reformatted);
        assert_eq!(fs::read_to_string(&path).unwrap(), CANONICAL);

        assert_eq!(format_file(&path, true, None).unwrap(), FileStatus::Unchanged);
    }

    #[test]
    fn test_recipes_are_not_formatted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conanfile.py");
        fs::write(&path, "name = 'status-cpp'\nversion = '0.1.0'\n").unwrap();
        assert!(format_file(&path, true, None).is_err());
    }

    #[test]
    fn test_check_mode_reports() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(depfile_pkg::MANIFEST_FILE);
        fs::write(&path, MESSY).unwrap();
        assert!(format_files(&[path.clone()], true, None).is_err());

        fs::write(&path, CANONICAL).unwrap();
        assert!(format_files(&[path], true, None).is_ok());
    }
}
