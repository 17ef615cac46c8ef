//! Build-dependency manifests for C++ projects.
//!
//! This crate provides:
//! - Parsing and validation of native `depfile` manifests
//! - A canonical writer, so that parsing a written manifest yields it back
//! - Package references (`name/version@user/channel`) and version ranges
//! - Import of Conan `conanfile.txt` and declarative `conanfile.py` recipes
//! - Loader configuration through `depfile.toml`

pub mod conanfile;
mod config;
mod generator;
mod loader;
mod manifest;
mod parser;
pub mod recipe;
mod reference;

pub use config::{Config, ConfigError, LoaderConfig, CONFIG_FILE};
pub use generator::Generator;
pub use loader::{load, load_txt_as, ManifestFormat, MANIFEST_FILE, UNVERSIONED};
pub use manifest::{ManifestBuilder, ManifestError, OptionKey, PackageManifest, ParseError};
pub use reference::{
    validate_exact_version, validate_package_name, DependencySpec, VersionConstraint,
};
