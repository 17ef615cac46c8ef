//! Build-system generators a manifest can request.

use crate::manifest::ManifestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Build-system integration mode for the downstream tool.
///
/// Unknown names are kept as [`Generator::Other`] so that newer generators
/// still load; whether that is allowed is up to the loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Generator {
    Cmake,
    CmakeMulti,
    /// `Find<Package>.cmake` modules for `find_package()`.
    CmakeFindPackage,
    CmakeFindPackageMulti,
    CmakeDeps,
    CmakeToolchain,
    PkgConfig,
    PkgConfigDeps,
    Make,
    Txt,
    Json,
    VirtualEnv,
    Other(String),
}

impl Generator {
    const KNOWN: [Self; 12] = [
        Self::Cmake,
        Self::CmakeMulti,
        Self::CmakeFindPackage,
        Self::CmakeFindPackageMulti,
        Self::CmakeDeps,
        Self::CmakeToolchain,
        Self::PkgConfig,
        Self::PkgConfigDeps,
        Self::Make,
        Self::Txt,
        Self::Json,
        Self::VirtualEnv,
    ];

    /// The generator name as written in manifests.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cmake => "cmake",
            Self::CmakeMulti => "cmake_multi",
            Self::CmakeFindPackage => "cmake_find_package",
            Self::CmakeFindPackageMulti => "cmake_find_package_multi",
            Self::CmakeDeps => "CMakeDeps",
            Self::CmakeToolchain => "CMakeToolchain",
            Self::PkgConfig => "pkg_config",
            Self::PkgConfigDeps => "PkgConfigDeps",
            Self::Make => "make",
            Self::Txt => "txt",
            Self::Json => "json",
            Self::VirtualEnv => "virtualenv",
            Self::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Generator {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(known) = Self::KNOWN.into_iter().find(|g| g.as_str() == s) {
            return Ok(known);
        }

        let valid = !s.is_empty()
            && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(ManifestError::InvalidGenerator(s.to_string()));
        }

        Ok(Self::Other(s.to_string()))
    }
}

impl TryFrom<String> for Generator {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Generator> for String {
    fn from(generator: Generator) -> Self {
        generator.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_round_trip() {
        for generator in Generator::KNOWN {
            let parsed: Generator = generator.as_str().parse().unwrap();
            assert_eq!(parsed, generator);
            assert!(parsed.is_known());
        }
    }

    #[test]
    fn unknown_name_is_other() {
        let generator: Generator = "premake".parse().unwrap();
        assert_eq!(generator, Generator::Other("premake".to_string()));
        assert!(!generator.is_known());
        assert_eq!(generator.to_string(), "premake");
    }

    #[test]
    fn names_are_case_sensitive() {
        let generator: Generator = "CMake".parse().unwrap();
        assert!(!generator.is_known());
    }

    #[test]
    fn reject_malformed_name() {
        assert!(matches!(
            "cmake find".parse::<Generator>(),
            Err(ManifestError::InvalidGenerator(_))
        ));
        assert!(matches!(
            "".parse::<Generator>(),
            Err(ManifestError::InvalidGenerator(_))
        ));
    }
}
