//! Import of declarative `conanfile.py` recipes.
//!
//! Only literal class attributes are read; the recipe is never executed.
//! Requirements added from methods such as `requirements()` are invisible
//! to this importer.

use crate::config::LoaderConfig;
use crate::generator::Generator;
use crate::manifest::{
    at_line, ManifestBuilder, ManifestError, OptionKey, PackageManifest, ParseError,
};
use crate::reference::DependencySpec;
use regex::Regex;
use std::sync::OnceLock;

/// The conventional filename.
pub const CONANFILE_PY: &str = "conanfile.py";

fn assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t]*(name|version|generators|requires|default_options)[ \t]*=[ \t]*",
        )
        .expect("assignment pattern is valid")
    })
}

fn string_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"'([^'\\\n]*)'|"([^"\\\n]*)""#).expect("string pattern is valid")
    })
}

fn dict_entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"['"]([^'"]+)['"][ \t]*:[ \t]*(?:'([^'\n]*)'|"([^"\n]*)"|([^,}\n]+))"#)
            .expect("dict pattern is valid")
    })
}

/// One recognised attribute and where it starts.
struct Attribute<'a> {
    key: &'a str,
    line: usize,
    expr: String,
}

/// Parse a `conanfile.py` recipe into a manifest.
pub fn parse_py(content: &str, config: &LoaderConfig) -> Result<PackageManifest, ManifestError> {
    if content.trim().is_empty() {
        return Err(ParseError::whole_file("recipe is empty").into());
    }

    let attributes = scan_attributes(content);
    let first = |key: &str| attributes.iter().find(|a| a.key == key);

    let name = match first("name") {
        Some(attr) => single_string(attr)?,
        None => return Err(ParseError::whole_file("recipe does not declare `name`").into()),
    };
    let version = match first("version") {
        Some(attr) => single_string(attr)?,
        None => return Err(ParseError::whole_file("recipe does not declare `version`").into()),
    };

    let mut builder = ManifestBuilder::new(name.clone(), version).with_config(config);

    if let Some(attr) = first("generators") {
        let mut generators = strings(&attr.expr).into_iter();
        if let Some(generator) = generators.next() {
            let generator: Generator = generator.parse().map_err(at_line(attr.line))?;
            builder = builder.generator(generator).map_err(at_line(attr.line))?;
        }
        for extra in generators {
            tracing::warn!(
                generator = %extra,
                line = attr.line,
                "only the first generator is kept"
            );
        }
    }

    if let Some(attr) = first("requires") {
        for reference in requirement_strings(&attr.expr) {
            let dependency: DependencySpec = reference.parse().map_err(at_line(attr.line))?;
            builder = builder.dependency(dependency).map_err(at_line(attr.line))?;
        }
    }

    if let Some(attr) = first("default_options") {
        for (key, value) in option_pairs(&attr.expr) {
            let key = if key.contains(':') {
                key
            } else {
                format!("{name}:{key}")
            };
            let key: OptionKey = key.parse().map_err(at_line(attr.line))?;
            builder = builder.option(key, value).map_err(at_line(attr.line))?;
        }
    }

    let manifest = builder.build()?;
    tracing::debug!(
        name = manifest.name(),
        dependencies = manifest.dependencies().len(),
        "imported conanfile.py recipe"
    );
    Ok(manifest)
}

fn scan_attributes(content: &str) -> Vec<Attribute<'_>> {
    assignment_re()
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = caps.get(1)?.as_str();
            let line = content[..whole.start()].matches('\n').count() + 1;
            let expr = take_expression(&content[whole.end()..]);
            Some(Attribute { key, line, expr })
        })
        .collect()
}

/// Take the right-hand side of an assignment, following open brackets
/// across line breaks. Comments are dropped at every nesting depth.
fn take_expression(rest: &str) -> String {
    let mut expr = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut in_comment = false;

    for c in rest.chars() {
        if in_comment {
            if c != '\n' {
                continue;
            }
            in_comment = false;
        }

        match quote {
            Some(q) => {
                if c == q || c == '\n' {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                '#' => {
                    if depth == 0 {
                        break;
                    }
                    in_comment = true;
                    continue;
                }
                '\n' if depth == 0 => break,
                _ => {}
            },
        }
        expr.push(c);
    }
    expr
}

/// String literals of a `requires` expression that name packages.
///
/// Inside a nested tuple such as `("openssl/1.1.1h", "private")` only the
/// first string is a reference; the rest are Conan modifiers.
fn requirement_strings(expr: &str) -> Vec<String> {
    let mut references = Vec::new();
    // Strings seen so far in each open group; index 0 is the top level.
    let mut seen = vec![0usize];
    let mut chars = expr.chars();

    while let Some(c) = chars.next() {
        match c {
            '(' | '[' | '{' => seen.push(0),
            ')' | ']' | '}' => {
                if seen.len() > 1 {
                    seen.pop();
                }
            }
            '\'' | '"' => {
                let literal: String = chars
                    .by_ref()
                    .take_while(|&next| next != c && next != '\n')
                    .collect();
                let depth = seen.len() - 1;
                let position = seen.last().copied().unwrap_or(0);
                if depth < 2 || position == 0 {
                    references.push(literal.trim().to_string());
                } else {
                    tracing::debug!(modifier = %literal, "skipping requirement modifier");
                }
                if let Some(count) = seen.last_mut() {
                    *count += 1;
                }
            }
            _ => {}
        }
    }
    references
}

/// All string literals in an expression, in order.
fn strings(expr: &str) -> Vec<String> {
    string_re()
        .captures_iter(expr)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

fn single_string(attr: &Attribute<'_>) -> Result<String, ManifestError> {
    strings(&attr.expr).into_iter().next().ok_or_else(|| {
        ParseError::at(attr.line, format!("`{}` must be a string literal", attr.key)).into()
    })
}

/// `default_options` as either a dict or a sequence of `"key=value"` strings.
fn option_pairs(expr: &str) -> Vec<(String, String)> {
    if expr.trim_start().starts_with('{') {
        return dict_entry_re()
            .captures_iter(expr)
            .filter_map(|caps| {
                let key = caps.get(1)?.as_str().trim().to_string();
                let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?;
                Some((key, value.as_str().trim().to_string()))
            })
            .collect();
    }

    strings(expr)
        .into_iter()
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
