//! Resolver reading from a local Maven2 repository directory.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::trace;

use super::ArtifactResolver;
use crate::core::FpkitError;
use crate::maven::{MavenArtifact, RepositoryLayout, VersionRange};

/// Resolves artifacts already present in a local repository such as `~/.m2/repository`.
///
/// Version ranges select the highest version directory that satisfies the
/// range and actually contains the artifact file.
#[derive(Debug, Clone)]
pub struct LocalRepositoryResolver {
    layout: RepositoryLayout,
}

impl LocalRepositoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: RepositoryLayout::new(root),
        }
    }

    /// Resolver over `~/.m2/repository`.
    pub fn user_default() -> Result<Self> {
        let home = dirs::home_dir().context("Cannot determine the home directory for ~/.m2/repository")?;
        Ok(Self::new(home.join(".m2").join("repository")))
    }

    pub fn layout(&self) -> &RepositoryLayout {
        &self.layout
    }

    fn select_in_range(&self, artifact: &MavenArtifact, range: &str) -> Result<String> {
        let range: VersionRange = range.parse()?;
        let dir = self.layout.versions_dir(artifact.group_id(), artifact.artifact_id());
        let not_found = |reason: String| FpkitError::ArtifactNotFound {
            coords: artifact.coords(),
            reason,
        };

        let entries = std::fs::read_dir(&dir).map_err(|e| not_found(format!("cannot list {}: {e}", dir.display())))?;
        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("Failed to read directory entry in: {}", dir.display()))?;
            if entry.file_type()?.is_dir() {
                let version = entry.file_name().to_string_lossy().into_owned();
                if self.layout.artifact_path_for_version(artifact, &version).is_file() {
                    candidates.push(version);
                }
            }
        }

        range
            .select_highest(candidates.iter().map(String::as_str))
            .map(str::to_string)
            .ok_or_else(|| not_found(format!("no installed version satisfies {range}")).into())
    }
}

impl ArtifactResolver for LocalRepositoryResolver {
    fn resolve(&self, artifact: &mut MavenArtifact) -> Result<()> {
        let version = match (artifact.version(), artifact.version_range()) {
            (Some(version), _) => version.to_string(),
            (None, Some(range)) => {
                let range = range.to_string();
                self.select_in_range(artifact, &range)?
            }
            (None, None) => {
                return Err(FpkitError::ArtifactNotFound {
                    coords: artifact.coords(),
                    reason: "no version given".to_string(),
                }
                .into());
            }
        };

        let path = self.layout.artifact_path_for_version(artifact, &version);
        if !path.is_file() {
            return Err(FpkitError::ArtifactNotFound {
                coords: artifact.coords_with_version(&version),
                reason: format!("{} does not exist", path.display()),
            }
            .into());
        }
        trace!("Resolved {} to {}", artifact, path.display());
        artifact.set_resolved(version, path);
        Ok(())
    }
}
