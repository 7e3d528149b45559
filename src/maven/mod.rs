//! Maven artifact identity.
//!
//! A [`MavenArtifact`] starts life as a symbolic reference parsed from a module
//! template or a version-properties value and becomes a resolved artifact once
//! a resolver has filled in its concrete version and content path. Parsed
//! references are never mutated by the resolution policy; it produces a new
//! value instead.
//!
//! # Coordinate Forms
//!
//! - Parsing accepts `group:artifact[:version[:classifier[:extension]]]`.
//!   Empty segments mean "not given", so `g:a::sources` names a classifier
//!   without a version.
//! - [`MavenArtifact::coords`] renders `group:artifact:version[:classifier]`,
//!   the form written into thin-server module descriptors.
//! - [`MavenArtifact::gav`] renders `group:artifact:version`, the form used by
//!   the transformation exclusion set.

pub mod repository;
pub mod version;


use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::DEFAULT_EXTENSION;
use crate::core::FpkitError;

pub use repository::RepositoryLayout;
pub use version::{MavenVersion, VersionRange};

/// Cache key identifying one logical artifact.
///
/// Two artifacts with equal keys are the same artifact for the bulk
/// resolution cache, regardless of whether either has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    pub group_id: String,
    pub artifact_id: String,
    pub extension: String,
    pub classifier: String,
    pub version: Option<String>,
    pub version_range: Option<String>,
}

/// A Maven artifact, symbolic or resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenArtifact {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
    version_range: Option<String>,
    classifier: String,
    extension: String,
    path: Option<PathBuf>,
    /// Version the feature pack declared before an override replaced it.
    original_version: Option<String>,
}

impl MavenArtifact {
    /// Create a reference with no version, no classifier and the `jar` extension.
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: None,
            version_range: None,
            classifier: String::new(),
            extension: DEFAULT_EXTENSION.to_string(),
            path: None,
            original_version: None,
        }
    }

    /// Set the version. Strings starting with `[` or `(` are stored as a version range.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.set_version(version);
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn version_range(&self) -> Option<&str> {
        self.version_range.as_deref()
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path to the resolved content, if resolved.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// An artifact is resolved once it has both a concrete version and a content path.
    pub fn is_resolved(&self) -> bool {
        self.path.is_some() && self.version.is_some()
    }

    /// The declared version this artifact had before an override replaced it.
    pub fn original_version(&self) -> Option<&str> {
        self.original_version.as_deref()
    }

    pub fn is_overridden(&self) -> bool {
        self.original_version.is_some()
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        let version = version.into();
        if version.starts_with('[') || version.starts_with('(') {
            self.version_range = Some(version);
            self.version = None;
        } else {
            self.version = Some(version);
        }
    }

    /// Record a resolver outcome: the concrete version and the downloaded file.
    pub fn set_resolved(&mut self, version: impl Into<String>, path: impl Into<PathBuf>) {
        self.version = Some(version.into());
        self.path = Some(path.into());
    }

    /// Replace the version with an overridden one, remembering the declared version.
    pub(crate) fn apply_override(&mut self, version: impl Into<String>) {
        if self.original_version.is_none() {
            self.original_version = self.version.clone();
        }
        self.version = Some(version.into());
        self.version_range = None;
    }

    /// Lookup key into version-properties maps: `group:artifact` or `group:artifact::classifier`.
    pub fn ga_key(&self) -> String {
        if self.classifier.is_empty() {
            format!("{}:{}", self.group_id, self.artifact_id)
        } else {
            format!("{}:{}::{}", self.group_id, self.artifact_id, self.classifier)
        }
    }

    /// `group:artifact:version`, with an empty version segment when unversioned.
    pub fn gav(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version.as_deref().unwrap_or_default())
    }

    /// `group:artifact:<declared version>`, the identity used by the exclusion set.
    ///
    /// For overridden artifacts this is the version the feature pack declared,
    /// so configured exclusions keep matching after the version changed.
    pub fn exclusion_key(&self) -> String {
        let version = self.original_version.as_deref().or(self.version.as_deref()).unwrap_or_default();
        format!("{}:{}:{}", self.group_id, self.artifact_id, version)
    }

    /// `group:artifact:version[:classifier]` with the given version.
    pub fn coords_with_version(&self, version: &str) -> String {
        let mut coords = format!("{}:{}:{}", self.group_id, self.artifact_id, version);
        if !self.classifier.is_empty() {
            coords.push(':');
            coords.push_str(&self.classifier);
        }
        coords
    }

    /// `group:artifact:version[:classifier]`.
    pub fn coords(&self) -> String {
        let version = self.version.as_deref().or(self.version_range.as_deref()).unwrap_or_default();
        self.coords_with_version(version)
    }

    /// Maven file name `artifactId-version[-classifier].extension` for the given version.
    pub fn file_name_with_version(&self, version: &str) -> String {
        let mut name = format!("{}-{}", self.artifact_id, version);
        if !self.classifier.is_empty() {
            name.push('-');
            name.push_str(&self.classifier);
        }
        name.push('.');
        name.push_str(&self.extension);
        name
    }

    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            extension: self.extension.clone(),
            classifier: self.classifier.clone(),
            version: self.version.clone(),
            version_range: self.version_range.clone(),
        }
    }

    /// The POM of this artifact at the given version.
    pub fn pom(&self, version: &str) -> Self {
        Self::new(self.group_id.clone(), self.artifact_id.clone()).with_version(version).with_extension("pom")
    }
}

impl FromStr for MavenArtifact {
    type Err = FpkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| FpkitError::InvalidCoordinates {
            coords: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() < 2 {
            return Err(invalid("expected at least group:artifact"));
        }
        if parts.len() > 5 {
            return Err(invalid("too many segments"));
        }
        if parts[0].is_empty() || parts[1].is_empty() {
            return Err(invalid("group and artifact id must not be empty"));
        }

        let mut artifact = Self::new(parts[0], parts[1]);
        if let Some(version) = parts.get(2).filter(|v| !v.is_empty()) {
            artifact.set_version(*version);
        }
        if let Some(classifier) = parts.get(3) {
            artifact.classifier = (*classifier).to_string();
        }
        if let Some(extension) = parts.get(4).filter(|e| !e.is_empty()) {
            artifact.extension = (*extension).to_string();
        }
        Ok(artifact)
    }
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.coords())
    }
}
