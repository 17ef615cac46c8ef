//! Line-oriented parser for the native manifest format.
//!
//! ```text
//! name: status-cpp
//! version: 0.1.0
//! generator: cmake_find_package
//! dependencies:
//!   - openssl/1.1.1h
//!   - boost/1.74.0
//! options:
//!   boost:shared = False
//! ```

use crate::config::LoaderConfig;
use crate::generator::Generator;
use crate::manifest::{
    at_line, ManifestBuilder, ManifestError, OptionKey, PackageManifest, ParseError,
};
use crate::reference::{validate_exact_version, validate_package_name, DependencySpec};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Dependencies,
    Options,
}

/// Fields collected while scanning, validated once the whole file is read.
#[derive(Default)]
struct Collected {
    name: Option<String>,
    version: Option<String>,
    generator: Option<(usize, Generator)>,
    dependencies: Vec<(usize, DependencySpec)>,
    options: Vec<(usize, OptionKey, String)>,
}

pub(crate) fn parse_manifest(
    content: &str,
    config: &LoaderConfig,
) -> Result<PackageManifest, ManifestError> {
    let mut collected = Collected::default();
    let mut seen_keys = HashSet::new();
    let mut section: Option<Section> = None;
    let mut saw_content = false;

    for (index, raw_line) in content.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        saw_content = true;

        if raw_line.starts_with(char::is_whitespace) {
            match section {
                None => {
                    return Err(ParseError::at(line, "indented line outside a section").into());
                }
                Some(Section::Dependencies) => {
                    let dependency = parse_dependency_item(trimmed, line)?;
                    collected.dependencies.push((line, dependency));
                }
                Some(Section::Options) => {
                    let (key, value) = parse_option_item(trimmed, line)?;
                    collected.options.push((line, key, value));
                }
            }
            continue;
        }

        let Some((key, value)) = trimmed.split_once(':') else {
            let message = format!("expected `key: value`, found `{trimmed}`");
            return Err(ParseError::at(line, message).into());
        };
        let key = key.trim();
        let value = value.trim();

        if !seen_keys.insert(key.to_string()) {
            return Err(ParseError::at(line, format!("duplicate key `{key}`")).into());
        }

        section = None;
        match key {
            "name" => {
                let name = scalar(key, value, line)?;
                validate_package_name(&name).map_err(at_line(line))?;
                collected.name = Some(name);
            }
            "version" => {
                let version = scalar(key, value, line)?;
                validate_exact_version(&version).map_err(at_line(line))?;
                collected.version = Some(version);
            }
            "generator" => {
                let generator = scalar(key, value, line)?
                    .parse::<Generator>()
                    .map_err(at_line(line))?;
                collected.generator = Some((line, generator));
            }
            "dependencies" | "options" => {
                if !value.is_empty() {
                    return Err(ParseError::at(
                        line,
                        format!("`{key}:` must be followed by indented entries"),
                    )
                    .into());
                }
                section = Some(if key == "dependencies" {
                    Section::Dependencies
                } else {
                    Section::Options
                });
            }
            other => {
                return Err(ParseError::at(line, format!("unknown key `{other}`")).into());
            }
        }
    }

    if !saw_content {
        return Err(ParseError::whole_file("manifest is empty").into());
    }

    let name = collected
        .name
        .ok_or_else(|| ParseError::whole_file("missing required field `name`"))?;
    let version = collected
        .version
        .ok_or_else(|| ParseError::whole_file("missing required field `version`"))?;

    let mut builder = ManifestBuilder::new(name, version).with_config(config);
    if let Some((line, generator)) = collected.generator {
        builder = builder.generator(generator).map_err(at_line(line))?;
    }
    for (line, dependency) in collected.dependencies {
        builder = builder.dependency(dependency).map_err(at_line(line))?;
    }
    for (line, key, value) in collected.options {
        builder = builder.option(key, value).map_err(at_line(line))?;
    }

    let manifest = builder.build()?;
    tracing::debug!(
        name = manifest.name(),
        dependencies = manifest.dependencies().len(),
        options = manifest.options().len(),
        "parsed manifest"
    );
    Ok(manifest)
}

/// A required scalar value, with one layer of matching quotes removed.
fn scalar(key: &str, value: &str, line: usize) -> Result<String, ManifestError> {
    let value = unquote(value);
    if value.is_empty() {
        return Err(ParseError::at(line, format!("`{key}` requires a value")).into());
    }
    Ok(value.to_string())
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].trim();
        }
    }
    value
}

fn parse_dependency_item(item: &str, line: usize) -> Result<DependencySpec, ManifestError> {
    let Some(reference) = item.strip_prefix('-') else {
        let message = format!("expected `- name/version`, found `{item}`");
        return Err(ParseError::at(line, message).into());
    };
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(ParseError::at(line, "empty dependency entry").into());
    }
    reference.parse().map_err(at_line(line))
}

fn parse_option_item(item: &str, line: usize) -> Result<(OptionKey, String), ManifestError> {
    let Some((key, value)) = item.split_once('=') else {
        return Err(ParseError::at(
            line,
            format!("expected `package:option = value`, found `{item}`"),
        )
        .into());
    };

    let key: OptionKey = key.trim().parse().map_err(at_line(line))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ParseError::at(line, format!("option `{key}` has no value")).into());
    }
    Ok((key, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<PackageManifest, ManifestError> {
        parse_manifest(content, &LoaderConfig::default())
    }

    fn parse_error(content: &str) -> ParseError {
        match parse(content) {
            Err(ManifestError::Parse(err)) => err,
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn parse_single_dependency_manifest() {
        let manifest = parse(
            "\
name: status-cpp
version: 0.1.0
generator: cmake_find_package
dependencies:
  - openssl/1.1.1h
",
        )
        .unwrap();
        assert_eq!(manifest.name(), "status-cpp");
        assert_eq!(manifest.version(), "0.1.0");
        assert_eq!(manifest.generator(), Some(&Generator::CmakeFindPackage));
        assert_eq!(
            manifest.dependencies(),
            [DependencySpec::new("openssl", "1.1.1h").unwrap()]
        );
        assert!(manifest.options().is_empty());
    }

    #[test]
    fn parse_manifest_with_options() {
        let manifest = parse(
            "\
# build dependencies for status-cpp
name: status-cpp
version: 0.1.0
generator: cmake_find_package

dependencies:
  - openssl/1.1.1h
  - boost/1.74.0
options:
  boost:shared=False
",
        )
        .unwrap();
        assert_eq!(manifest.dependencies().len(), 2);
        assert_eq!(manifest.option("boost:shared"), Some("False"));
    }

    #[test]
    fn quoted_scalars() {
        let manifest = parse("name: \"status-cpp\"\nversion: '0.1.0'\n").unwrap();
        assert_eq!(manifest.name(), "status-cpp");
        assert_eq!(manifest.version(), "0.1.0");
        assert_eq!(manifest.generator(), None);
    }

    #[test]
    fn crlf_line_endings() {
        let manifest = parse(
            "name: status-cpp\r\nversion: 0.1.0\r\ndependencies:\r\n  - openssl/1.1.1h\r\n",
        )
        .unwrap();
        assert_eq!(manifest.dependencies().len(), 1);
    }

    #[test]
    fn empty_sections_are_allowed() {
        let manifest =
            parse("name: status-cpp\nversion: 0.1.0\ndependencies:\noptions:\n").unwrap();
        assert!(manifest.dependencies().is_empty());
    }

    #[test]
    fn empty_file() {
        let err = parse_error("");
        assert_eq!(err.line, None);

        let err = parse_error("# only a comment\n\n");
        assert_eq!(err.message, "manifest is empty");
    }

    #[test]
    fn missing_name() {
        let err = parse_error("version: 0.1.0\n");
        assert!(err.message.contains("`name`"));
    }

    #[test]
    fn missing_version() {
        let err = parse_error("name: status-cpp\n");
        assert!(err.message.contains("`version`"));
    }

    #[test]
    fn unknown_key() {
        let err = parse_error("name: status-cpp\nversion: 0.1.0\nlicense: MIT\n");
        assert_eq!(err.line, Some(3));
    }

    #[test]
    fn repeated_key() {
        let err = parse_error("name: status-cpp\nname: other\nversion: 0.1.0\n");
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn indented_line_outside_section() {
        let err = parse_error("name: status-cpp\n  version: 0.1.0\n");
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn section_with_inline_value() {
        let err = parse_error("name: status-cpp\nversion: 0.1.0\ndependencies: openssl/1.1.1h\n");
        assert_eq!(err.line, Some(3));
    }

    #[test]
    fn malformed_dependency_item() {
        let err =
            parse_error("name: status-cpp\nversion: 0.1.0\ndependencies:\n  openssl/1.1.1h\n");
        assert_eq!(err.line, Some(4));

        let err = parse_error("name: status-cpp\nversion: 0.1.0\ndependencies:\n  - openssl\n");
        assert_eq!(err.line, Some(4));
    }

    #[test]
    fn malformed_option_item() {
        let err = parse_error("name: status-cpp\nversion: 0.1.0\noptions:\n  boost:shared\n");
        assert_eq!(err.line, Some(4));

        let err = parse_error("name: status-cpp\nversion: 0.1.0\noptions:\n  shared = False\n");
        assert_eq!(err.line, Some(4));

        let err = parse_error("name: status-cpp\nversion: 0.1.0\noptions:\n  boost:shared =\n");
        assert_eq!(err.line, Some(4));
    }

    #[test]
    fn invalid_name_reports_line() {
        let err = parse_error("version: 0.1.0\nname: status cpp\n");
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn conflicting_duplicate_dependency() {
        let err = parse(
            "\
name: status-cpp
version: 0.1.0
dependencies:
  - openssl/1.1.1h
  - openssl/1.1.1g
",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ManifestError::DuplicateDependency { ref package, .. } if package == "openssl"
        ));
    }

    #[test]
    fn identical_duplicate_dependency() {
        let manifest = parse(
            "\
name: status-cpp
version: 0.1.0
dependencies:
  - openssl/1.1.1h
  - openssl/1.1.1h
",
        )
        .unwrap();
        assert_eq!(manifest.dependencies().len(), 1);
    }

    #[test]
    fn strict_config_is_applied() {
        let content = "name: status-cpp\nversion: 0.1.0\ngenerator: premake\n";
        assert!(parse(content).is_ok());

        let err = parse_manifest(content, &LoaderConfig::strict()).unwrap_err();
        assert!(matches!(err, ManifestError::UnknownGenerator(_)));
    }

    #[test]
    fn unquote_only_matching_pairs() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote("\"abc'"), "\"abc'");
        assert_eq!(unquote("\""), "\"");
    }
}
