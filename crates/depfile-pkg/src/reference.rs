//! Package references (`name/version[@user/channel]`) and version constraints.

use crate::manifest::ManifestError;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest package name or version accepted.
const MAX_IDENT_LEN: usize = 51;

/// A single dependency requirement: package name plus version constraint.
///
/// Values are validated on construction and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDependency")]
pub struct DependencySpec {
    package_name: String,
    version_constraint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDependency {
    package_name: String,
    version_constraint: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    channel: Option<String>,
}

impl TryFrom<RawDependency> for DependencySpec {
    type Error = ManifestError;

    fn try_from(raw: RawDependency) -> Result<Self, Self::Error> {
        let spec = Self::new(raw.package_name, raw.version_constraint)?;
        match (raw.user, raw.channel) {
            (None, None) => Ok(spec),
            (Some(user), Some(channel)) => spec.with_channel(user, channel),
            _ => Err(ManifestError::InvalidReference(
                spec.to_string(),
                "user and channel must be given together",
            )),
        }
    }
}

impl DependencySpec {
    /// Create a requirement on `package_name` at `version_constraint`.
    pub fn new(
        package_name: impl Into<String>,
        version_constraint: impl Into<String>,
    ) -> Result<Self, ManifestError> {
        let package_name = package_name.into();
        let version_constraint = version_constraint.into();
        validate_package_name(&package_name)?;
        validate_constraint(&version_constraint)?;
        Ok(Self {
            package_name,
            version_constraint,
            user: None,
            channel: None,
        })
    }

    /// Attach a `@user/channel` qualifier.
    pub fn with_channel(
        mut self,
        user: impl Into<String>,
        channel: impl Into<String>,
    ) -> Result<Self, ManifestError> {
        let user = user.into();
        let channel = channel.into();
        for part in [&user, &channel] {
            if !is_ident(part) {
                return Err(ManifestError::InvalidReference(
                    format!("{}@{user}/{channel}", self),
                    "user and channel may only contain letters, numbers, '_', '+', '.', '-'",
                ));
            }
        }
        self.user = Some(user);
        self.channel = Some(channel);
        Ok(self)
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// The constraint exactly as written, e.g. `1.1.1h` or `[>=1.0 <2.0]`.
    pub fn version_constraint(&self) -> &str {
        &self.version_constraint
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Classify the constraint as an exact pin or a range.
    pub fn constraint(&self) -> VersionConstraint {
        // Already validated in `new`, so the range always parses.
        VersionConstraint::parse(&self.version_constraint)
            .unwrap_or_else(|_| VersionConstraint::Exact(self.version_constraint.clone()))
    }

    /// Check whether a concrete version satisfies this requirement.
    pub fn matches(&self, version: &str) -> bool {
        self.constraint().matches(version)
    }

    /// Two specs conflict when they name the same package but disagree on
    /// the version or the user/channel qualifier.
    pub fn conflicts_with(&self, other: &Self) -> bool {
        self.package_name == other.package_name && self != other
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package_name, self.version_constraint)?;
        if let (Some(user), Some(channel)) = (&self.user, &self.channel) {
            write!(f, "@{user}/{channel}")?;
        }
        Ok(())
    }
}

impl FromStr for DependencySpec {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reference = s.trim();
        let (base, qualifier) = match reference.split_once('@') {
            Some((base, qualifier)) => (base, Some(qualifier)),
            None => (reference, None),
        };

        let Some((name, version)) = base.split_once('/') else {
            return Err(ManifestError::InvalidReference(
                reference.to_string(),
                "expected `name/version`",
            ));
        };

        let spec = Self::new(name, version)?;
        match qualifier {
            None => Ok(spec),
            Some(qualifier) => {
                let Some((user, channel)) = qualifier.split_once('/') else {
                    return Err(ManifestError::InvalidReference(
                        reference.to_string(),
                        "expected `@user/channel` after the version",
                    ));
                };
                spec.with_channel(user, channel)
            }
        }
    }
}

/// A parsed version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// A pinned version such as `1.1.1h`, matched by string equality.
    Exact(String),
    /// A bracketed range such as `[>=1.0 <2.0]`.
    Range(VersionReq),
}

impl VersionConstraint {
    pub fn parse(raw: &str) -> Result<Self, ManifestError> {
        match range_body(raw) {
            Some(body) => {
                // The writer puts each reference on one line.
                if body.chars().any(char::is_control) {
                    return Err(ManifestError::InvalidVersion(
                        raw.to_string(),
                        "ranges may not contain line breaks or control characters".to_string(),
                    ));
                }
                let req = VersionReq::parse(&range_to_semver(body))
                    .map_err(|e| ManifestError::InvalidVersion(raw.to_string(), e.to_string()))?;
                Ok(Self::Range(req))
            }
            None => {
                validate_exact_version(raw)?;
                Ok(Self::Exact(raw.to_string()))
            }
        }
    }

    /// Check a concrete version against the constraint.
    ///
    /// Ranges only match versions that can be read as semver; short numeric
    /// versions like `1.2` are padded to `1.2.0` first.
    pub fn matches(&self, version: &str) -> bool {
        match self {
            Self::Exact(pinned) => pinned == version,
            Self::Range(req) => lenient_version(version).is_some_and(|v| req.matches(&v)),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range(_))
    }
}

fn range_body(raw: &str) -> Option<&str> {
    raw.strip_prefix('[')?.strip_suffix(']')
}

/// Conan separates range comparators with spaces; semver wants commas.
fn range_to_semver(body: &str) -> String {
    let mut parts = Vec::new();
    let mut pending_op = String::new();

    for token in body
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
            continue;
        }
        parts.push(format!("{pending_op}{token}"));
        pending_op.clear();
    }

    // A dangling operator is left in so that semver rejects it.
    if !pending_op.is_empty() {
        parts.push(pending_op);
    }

    parts.join(", ")
}

fn lenient_version(raw: &str) -> Option<Version> {
    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }

    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() > 3
        || !parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    Version::parse(&padded).ok()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '.' | '-')
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_IDENT_LEN
        && s.chars().next().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        && s.chars().all(is_ident_char)
}

/// Validate a package name.
pub fn validate_package_name(name: &str) -> Result<(), ManifestError> {
    if name.is_empty() {
        return Err(ManifestError::InvalidName(
            name.to_string(),
            "name cannot be empty",
        ));
    }

    if name.len() < 2 {
        return Err(ManifestError::InvalidName(
            name.to_string(),
            "name must be at least 2 characters",
        ));
    }

    if name.len() > MAX_IDENT_LEN {
        return Err(ManifestError::InvalidName(
            name.to_string(),
            "name cannot exceed 51 characters",
        ));
    }

    if !name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ManifestError::InvalidName(
            name.to_string(),
            "name must start with a letter, number or underscore",
        ));
    }

    if !name.chars().all(is_ident_char) {
        return Err(ManifestError::InvalidName(
            name.to_string(),
            "name can only contain letters, numbers, '_', '+', '.', '-'",
        ));
    }

    Ok(())
}

/// Validate a pinned version (no ranges).
pub fn validate_exact_version(version: &str) -> Result<(), ManifestError> {
    if version.is_empty() {
        return Err(ManifestError::InvalidVersion(
            version.to_string(),
            "version cannot be empty".to_string(),
        ));
    }

    if !is_ident(version) {
        return Err(ManifestError::InvalidVersion(
            version.to_string(),
            "version can only contain letters, numbers, '_', '+', '.', '-' (at most 51)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_constraint(constraint: &str) -> Result<(), ManifestError> {
    VersionConstraint::parse(constraint).map(|_| ())
}
