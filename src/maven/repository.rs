//! Maven2 repository layout.
//!
//! Artifacts live at
//! `group/with/dots/as/slashes/artifactId/version/artifactId-version[-classifier].extension`
//! with the POM alongside. The same layout is used for the local repository
//! the resolver reads from, the generated repository thin servers load from,
//! the provisioning repository reused across runs and the transformation cache.

use std::path::{Path, PathBuf};

use super::MavenArtifact;

/// A directory organised in the Maven2 layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLayout {
    root: PathBuf,
}

impl RepositoryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory listing every version of `group:artifact`.
    pub fn versions_dir(&self, group_id: &str, artifact_id: &str) -> PathBuf {
        let mut dir = self.root.clone();
        for segment in group_id.split('.') {
            dir.push(segment);
        }
        dir.push(artifact_id);
        dir
    }

    /// Path of `artifact` at `version`, regardless of the artifact's own version.
    pub fn artifact_path_for_version(&self, artifact: &MavenArtifact, version: &str) -> PathBuf {
        self.versions_dir(artifact.group_id(), artifact.artifact_id())
            .join(version)
            .join(artifact.file_name_with_version(version))
    }

    /// Path of `artifact` at its own version. `None` when it has no concrete version.
    pub fn artifact_path(&self, artifact: &MavenArtifact) -> Option<PathBuf> {
        artifact.version().map(|version| self.artifact_path_for_version(artifact, version))
    }

    /// Path of the POM of `artifact` at `version`.
    pub fn pom_path_for_version(&self, artifact: &MavenArtifact, version: &str) -> PathBuf {
        self.versions_dir(artifact.group_id(), artifact.artifact_id())
            .join(version)
            .join(format!("{}-{}.pom", artifact.artifact_id(), version))
    }
}
