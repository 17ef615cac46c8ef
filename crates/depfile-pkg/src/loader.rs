//! Format detection and loading of manifests from disk.

use crate::config::LoaderConfig;
use crate::conanfile::{self, CONANFILE_TXT};
use crate::manifest::{read_manifest_file, ManifestError, PackageManifest, ParseError};
use crate::recipe::{self, CONANFILE_PY};
use std::fmt;
use std::path::Path;

/// The native manifest filename.
pub const MANIFEST_FILE: &str = "depfile";

/// Version assigned to `conanfile.txt` imports, which carry none.
pub const UNVERSIONED: &str = "0.0.0";

/// On-disk manifest formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// The native `key: value` format.
    Native,
    /// Conan INI-style `conanfile.txt`.
    ConanfileTxt,
    /// Conan Python recipe `conanfile.py`.
    ConanfilePy,
}

impl ManifestFormat {
    /// Pick the format from the file name.
    pub fn detect(path: impl AsRef<Path>) -> Self {
        match path.as_ref().file_name().and_then(|n| n.to_str()) {
            Some(CONANFILE_PY) => Self::ConanfilePy,
            Some(CONANFILE_TXT) => Self::ConanfileTxt,
            _ => Self::Native,
        }
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Native => "native",
            Self::ConanfileTxt => CONANFILE_TXT,
            Self::ConanfilePy => CONANFILE_PY,
        })
    }
}

/// Load a manifest in whichever format its file name implies.
///
/// `conanfile.txt` imports are named after their parent directory and get
/// version [`UNVERSIONED`]; use [`load_txt_as`] to choose both.
pub fn load(
    path: impl AsRef<Path>,
    config: &LoaderConfig,
) -> Result<PackageManifest, ManifestError> {
    let path = path.as_ref();
    let format = ManifestFormat::detect(path);
    tracing::debug!(path = %path.display(), %format, "loading manifest");

    match format {
        ManifestFormat::Native => PackageManifest::from_path_with(path, config),
        ManifestFormat::ConanfilePy => {
            let content = read_manifest_file(path)?;
            recipe::parse_py(&content, config)
        }
        ManifestFormat::ConanfileTxt => {
            let content = read_manifest_file(path)?;
            let name = infer_package_name(path)?;
            conanfile::parse_txt(&content, &name, UNVERSIONED, config)
        }
    }
}

/// Load a `conanfile.txt` under an explicit name and version.
pub fn load_txt_as(
    path: impl AsRef<Path>,
    name: &str,
    version: &str,
    config: &LoaderConfig,
) -> Result<PackageManifest, ManifestError> {
    let content = read_manifest_file(path.as_ref())?;
    conanfile::parse_txt(&content, name, version, config)
}

fn infer_package_name(path: &Path) -> Result<String, ManifestError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| ManifestError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .join(path)
    };

    absolute
        .parent()
        .and_then(|dir| dir.file_name())
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ParseError::whole_file(format!(
                "cannot infer a package name for '{}'",
                path.display()
            ))
            .into()
        })
}
