//! `conanfile.txt` import and export.
//!
//! ```text
//! [requires]
//! openssl/1.1.1h
//! boost/1.74.0
//!
//! [generators]
//! cmake_find_package
//!
//! [options]
//! boost:shared=False
//! ```
//!
//! The INI layout carries no package name or version, so both are supplied
//! by the caller on import and dropped on export.

use crate::config::LoaderConfig;
use crate::generator::Generator;
use crate::manifest::{
    at_line, ManifestBuilder, ManifestError, OptionKey, PackageManifest, ParseError,
};
use crate::reference::DependencySpec;

/// The conventional filename.
pub const CONANFILE_TXT: &str = "conanfile.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Requires,
    Generators,
    Options,
    /// A section this loader does not model (`[imports]`, `[tool_requires]`, ...).
    Ignored,
}

/// Parse `conanfile.txt` content into a manifest named `name` at `version`.
pub fn parse_txt(
    content: &str,
    name: &str,
    version: &str,
    config: &LoaderConfig,
) -> Result<PackageManifest, ManifestError> {
    let mut builder = ManifestBuilder::new(name, version).with_config(config);
    let mut section: Option<Section> = None;
    let mut generator_set = false;
    let mut saw_content = false;

    for (index, raw_line) in content.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        saw_content = true;

        if let Some(header) = trimmed.strip_prefix('[') {
            let Some(header) = header.strip_suffix(']') else {
                let message = format!("unterminated section header `{trimmed}`");
                return Err(ParseError::at(line, message).into());
            };
            section = Some(match header.trim() {
                "requires" => Section::Requires,
                "generators" => Section::Generators,
                "options" => Section::Options,
                other => {
                    tracing::warn!(
                        section = other,
                        line,
                        "skipping unsupported conanfile.txt section"
                    );
                    Section::Ignored
                }
            });
            continue;
        }

        match section {
            None => {
                return Err(ParseError::at(line, "entry before the first section header").into());
            }
            Some(Section::Requires) => {
                let dependency: DependencySpec = trimmed.parse().map_err(at_line(line))?;
                builder = builder.dependency(dependency).map_err(at_line(line))?;
            }
            Some(Section::Generators) => {
                let generator: Generator = trimmed.parse().map_err(at_line(line))?;
                if generator_set {
                    tracing::warn!(%generator, line, "only the first generator is kept");
                    continue;
                }
                builder = builder.generator(generator).map_err(at_line(line))?;
                generator_set = true;
            }
            Some(Section::Options) => {
                let Some((key, value)) = trimmed.split_once('=') else {
                    return Err(ParseError::at(
                        line,
                        format!("expected `package:option=value`, found `{trimmed}`"),
                    )
                    .into());
                };
                let key: OptionKey = key.trim().parse().map_err(at_line(line))?;
                builder = builder.option(key, value.trim()).map_err(at_line(line))?;
            }
            Some(Section::Ignored) => {}
        }
    }

    if !saw_content {
        return Err(ParseError::whole_file("conanfile.txt is empty").into());
    }

    builder.build()
}

/// Render a manifest as `conanfile.txt`.
///
/// The `[requires]` header is always written, so a manifest without
/// dependencies still exports to a file that imports again.
pub fn to_txt(manifest: &PackageManifest) -> String {
    let requires: String = manifest
        .dependencies()
        .iter()
        .map(|dependency| format!("{dependency}\n"))
        .collect();
    let mut sections = vec![format!("[requires]\n{requires}")];

    if let Some(generator) = manifest.generator() {
        sections.push(format!("[generators]\n{generator}\n"));
    }

    if !manifest.options().is_empty() {
        let options: String = manifest
            .options()
            .iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect();
        sections.push(format!("[options]\n{options}"));
    }

    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[requires]
openssl/1.1.1h
boost/1.74.0

[generators]
cmake_find_package

[options]
boost:shared=False
";

    fn parse(content: &str) -> Result<PackageManifest, ManifestError> {
        parse_txt(content, "status-cpp", "0.1.0", &LoaderConfig::default())
    }

    #[test]
    fn parse_sample() {
        let manifest = parse(SAMPLE).unwrap();
        assert_eq!(manifest.name(), "status-cpp");
        assert_eq!(manifest.dependencies().len(), 2);
        assert_eq!(manifest.generator(), Some(&Generator::CmakeFindPackage));
        assert_eq!(manifest.option("boost:shared"), Some("False"));
    }

    #[test]
    fn export_matches_layout() {
        let manifest = parse(SAMPLE).unwrap();
        assert_eq!(to_txt(&manifest), SAMPLE);
    }

    #[test]
    fn export_then_import_preserves_content() {
        let manifest = PackageManifest::parse(
            "name: status-cpp\nversion: 0.1.0\ndependencies:\n  - openssl/1.1.1h\n",
        )
        .unwrap();
        let reimported = parse(&to_txt(&manifest)).unwrap();
        assert_eq!(reimported, manifest);
    }

    #[test]
    fn export_without_dependencies_imports_again() {
        let manifest = PackageManifest::parse("name: status-cpp\nversion: 0.1.0\n").unwrap();
        let exported = to_txt(&manifest);
        assert_eq!(exported, "[requires]\n");
        assert_eq!(parse(&exported).unwrap(), manifest);

        let manifest =
            PackageManifest::parse("name: status-cpp\nversion: 0.1.0\ngenerator: cmake\n")
                .unwrap();
        let exported = to_txt(&manifest);
        assert_eq!(exported, "[requires]\n\n[generators]\ncmake\n");
        assert_eq!(parse(&exported).unwrap(), manifest);
    }

    #[test]
    fn extra_generators_are_dropped() {
        let manifest = parse("[generators]\ncmake\ncmake_find_package\n").unwrap();
        assert_eq!(manifest.generator(), Some(&Generator::Cmake));
    }

    #[test]
    fn unsupported_sections_are_skipped() {
        let manifest =
            parse("[requires]\nzlib/1.2.11\n[imports]\nbin, *.dll -> ./bin\n").unwrap();
        assert_eq!(manifest.dependencies().len(), 1);
    }

    #[test]
    fn entry_outside_section() {
        let err = parse("openssl/1.1.1h\n").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(ParseError { line: Some(1), .. })));
    }

    #[test]
    fn conflicting_requirements() {
        let err = parse("[requires]\nopenssl/1.1.1h\nopenssl/3.0.0\n").unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateDependency { .. }));
    }

    #[test]
    fn empty_file() {
        assert!(matches!(parse("  \n"), Err(ManifestError::Parse(_))));
    }
}
