//! Package manifest model, validation and the canonical text writer.

use crate::config::LoaderConfig;
use crate::generator::Generator;
use crate::parser;
use crate::reference::{validate_exact_version, validate_package_name, DependencySpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when working with manifests.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("manifest not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read manifest '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] ParseError),

    #[error("duplicate dependency '{package}': '{first}' conflicts with '{second}'")]
    DuplicateDependency {
        package: String,
        first: String,
        second: String,
    },

    #[error("option '{key}' is set twice: '{first}' conflicts with '{second}'")]
    DuplicateOption {
        key: String,
        first: String,
        second: String,
    },

    #[error("option '{key}' targets '{package}', which is not a declared dependency")]
    UndeclaredOption { key: String, package: String },

    #[error("unknown generator '{0}'")]
    UnknownGenerator(String),

    #[error("invalid generator name '{0}'")]
    InvalidGenerator(String),

    #[error("invalid package name '{0}': {1}")]
    InvalidName(String, &'static str),

    #[error("invalid version '{0}': {1}")]
    InvalidVersion(String, String),

    #[error("invalid package reference '{0}': {1}")]
    InvalidReference(String, &'static str),

    #[error("invalid option '{0}': {1}")]
    InvalidOption(String, &'static str),
}

/// Malformed manifest text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line the problem was found on, if it is tied to one.
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    pub fn at(line: usize, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            message: message.into(),
        }
    }

    pub fn whole_file(message: impl Into<String>) -> Self {
        Self {
            line: None,
            message: message.into(),
        }
    }
}

/// Turn value-level validation failures found on `line` into parse errors.
///
/// Structural errors (duplicates, strictness violations) pass through.
pub(crate) fn at_line(line: usize) -> impl Fn(ManifestError) -> ManifestError {
    move |err| match err {
        ManifestError::InvalidName(..)
        | ManifestError::InvalidVersion(..)
        | ManifestError::InvalidReference(..)
        | ManifestError::InvalidOption(..)
        | ManifestError::InvalidGenerator(..) => ParseError::at(line, err.to_string()).into(),
        other => other,
    }
}

/// An option override key, `package:option`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OptionKey {
    package: String,
    option: String,
}

impl OptionKey {
    pub fn new(
        package: impl Into<String>,
        option: impl Into<String>,
    ) -> Result<Self, ManifestError> {
        let package = package.into();
        let option = option.into();
        validate_package_name(&package)?;

        let valid = option.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && option
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(ManifestError::InvalidOption(
                format!("{package}:{option}"),
                "option name can only contain letters, numbers, '_', '-', '.'",
            ));
        }

        Ok(Self { package, option })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn option(&self) -> &str {
        &self.option
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.package, self.option)
    }
}

impl FromStr for OptionKey {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((package, option)) = s.split_once(':') else {
            return Err(ManifestError::InvalidOption(
                s.to_string(),
                "expected `package:option`",
            ));
        };
        Self::new(package.trim(), option.trim())
    }
}

impl TryFrom<String> for OptionKey {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OptionKey> for String {
    fn from(key: OptionKey) -> Self {
        key.to_string()
    }
}

fn validate_option_value(key: &OptionKey, value: &str) -> Result<(), ManifestError> {
    if value.is_empty() {
        return Err(ManifestError::InvalidOption(
            key.to_string(),
            "option value cannot be empty",
        ));
    }
    if value.trim() != value || value.contains(['\n', '\r']) {
        return Err(ManifestError::InvalidOption(
            key.to_string(),
            "option value cannot have surrounding whitespace or line breaks",
        ));
    }
    Ok(())
}

/// A validated package manifest.
///
/// Built once through [`ManifestBuilder`] (or one of the loaders) and
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawManifest")]
pub struct PackageManifest {
    name: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    generator: Option<Generator>,
    dependencies: Vec<DependencySpec>,
    options: BTreeMap<OptionKey, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    name: String,
    version: String,
    #[serde(default)]
    generator: Option<Generator>,
    #[serde(default)]
    dependencies: Vec<DependencySpec>,
    #[serde(default)]
    options: BTreeMap<OptionKey, String>,
}

impl TryFrom<RawManifest> for PackageManifest {
    type Error = ManifestError;

    fn try_from(raw: RawManifest) -> Result<Self, Self::Error> {
        let mut builder = ManifestBuilder::new(raw.name, raw.version);
        if let Some(generator) = raw.generator {
            builder = builder.generator(generator)?;
        }
        for dependency in raw.dependencies {
            builder = builder.dependency(dependency)?;
        }
        for (key, value) in raw.options {
            builder = builder.option(key, value)?;
        }
        builder.build()
    }
}

impl PackageManifest {
    /// Start building a manifest for `name` at `version`.
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> ManifestBuilder {
        ManifestBuilder::new(name, version)
    }

    /// Load a manifest in the native format from a file path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        Self::from_path_with(path, &LoaderConfig::default())
    }

    /// Load a native manifest, validating with the given configuration.
    pub fn from_path_with(
        path: impl AsRef<Path>,
        config: &LoaderConfig,
    ) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = read_manifest_file(path)?;
        tracing::debug!(path = %path.display(), "parsing manifest");
        Self::parse_with(&content, config)
    }

    /// Parse a manifest from native-format text.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Self::parse_with(content, &LoaderConfig::default())
    }

    pub fn parse_with(content: &str, config: &LoaderConfig) -> Result<Self, ManifestError> {
        parser::parse_manifest(content, config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn generator(&self) -> Option<&Generator> {
        self.generator.as_ref()
    }

    /// Dependencies in declaration order.
    pub fn dependencies(&self) -> &[DependencySpec] {
        &self.dependencies
    }

    /// Look up a dependency by package name.
    pub fn dependency(&self, package: &str) -> Option<&DependencySpec> {
        self.dependencies
            .iter()
            .find(|d| d.package_name() == package)
    }

    pub fn options(&self) -> &BTreeMap<OptionKey, String> {
        &self.options
    }

    /// Look up an option by its `package:option` key.
    pub fn option(&self, key: &str) -> Option<&str> {
        let key: OptionKey = key.parse().ok()?;
        self.options.get(&key).map(String::as_str)
    }

    /// All option overrides aimed at one package.
    pub fn options_for<'a>(&'a self, package: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.options
            .iter()
            .filter(move |(key, _)| key.package() == package)
            .map(|(key, value)| (key.option(), value.as_str()))
    }

    /// Serialize to the canonical native format.
    pub fn to_manifest_string(&self) -> String {
        self.to_string()
    }

    /// Serialize to pretty JSON for build tools.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PackageManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name: {}", self.name)?;
        writeln!(f, "version: {}", self.version)?;
        if let Some(generator) = &self.generator {
            writeln!(f, "generator: {generator}")?;
        }

        if !self.dependencies.is_empty() {
            writeln!(f, "dependencies:")?;
            for dependency in &self.dependencies {
                writeln!(f, "  - {dependency}")?;
            }
        }

        if !self.options.is_empty() {
            writeln!(f, "options:")?;
            for (key, value) in &self.options {
                writeln!(f, "  {key} = {value}")?;
            }
        }

        Ok(())
    }
}

/// Incremental, validating constructor for [`PackageManifest`].
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    name: String,
    version: String,
    generator: Option<Generator>,
    dependencies: Vec<DependencySpec>,
    options: BTreeMap<OptionKey, String>,
    config: LoaderConfig,
}

impl ManifestBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            generator: None,
            dependencies: Vec::new(),
            options: BTreeMap::new(),
            config: LoaderConfig::default(),
        }
    }

    /// Validate with the given strictness settings.
    #[must_use]
    pub fn with_config(mut self, config: &LoaderConfig) -> Self {
        self.config = *config;
        self
    }

    pub fn generator(mut self, generator: Generator) -> Result<Self, ManifestError> {
        if !generator.is_known() {
            if self.config.strict_generators {
                return Err(ManifestError::UnknownGenerator(generator.to_string()));
            }
            tracing::warn!(generator = %generator, "unknown generator");
        }
        self.generator = Some(generator);
        Ok(self)
    }

    /// Append a dependency.
    ///
    /// An exact repeat of an existing entry is dropped; a repeat with a
    /// different constraint is an error.
    pub fn dependency(mut self, dependency: DependencySpec) -> Result<Self, ManifestError> {
        if let Some(existing) = self
            .dependencies
            .iter()
            .find(|d| d.package_name() == dependency.package_name())
        {
            if existing.conflicts_with(&dependency) {
                return Err(ManifestError::DuplicateDependency {
                    package: dependency.package_name().to_string(),
                    first: existing.to_string(),
                    second: dependency.to_string(),
                });
            }
            tracing::debug!(dependency = %dependency, "ignoring repeated dependency");
            return Ok(self);
        }
        self.dependencies.push(dependency);
        Ok(self)
    }

    /// Set an option override. Repeating a key with the same value is fine.
    pub fn option(
        mut self,
        key: OptionKey,
        value: impl Into<String>,
    ) -> Result<Self, ManifestError> {
        let value = value.into();
        validate_option_value(&key, &value)?;

        if let Some(existing) = self.options.get(&key) {
            if *existing != value {
                return Err(ManifestError::DuplicateOption {
                    key: key.to_string(),
                    first: existing.clone(),
                    second: value,
                });
            }
            return Ok(self);
        }
        self.options.insert(key, value);
        Ok(self)
    }

    /// Validate the collected fields and produce the manifest.
    pub fn build(self) -> Result<PackageManifest, ManifestError> {
        validate_package_name(&self.name)?;
        validate_exact_version(&self.version)?;

        for key in self.options.keys() {
            let package = key.package();
            let declared = package == self.name
                || self.dependencies.iter().any(|d| d.package_name() == package);
            if declared {
                continue;
            }
            if self.config.strict_options {
                return Err(ManifestError::UndeclaredOption {
                    key: key.to_string(),
                    package: package.to_string(),
                });
            }
            tracing::warn!(option = %key, "option targets a package that is not a dependency");
        }

        Ok(PackageManifest {
            name: self.name,
            version: self.version,
            generator: self.generator,
            dependencies: self.dependencies,
            options: self.options,
        })
    }
}

/// Read a manifest file, reporting a missing file as [`ManifestError::NotFound`].
pub(crate) fn read_manifest_file(path: &Path) -> Result<String, ManifestError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ManifestError::NotFound(path.to_path_buf())
        } else {
            ManifestError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}
