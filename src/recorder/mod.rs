//! Artifact manifest ledger.
//!
//! Every installed artifact appends one line to `artifacts.txt`:
//!
//! ```text
//! org.jboss:foo:1.0.0::<sha-256 of the source file>::modules/org/jboss/foo/main/foo-1.0.0.jar
//! ```
//!
//! The manifest is truncated when the recorder is created, so it only ever
//! describes the current run. Recording is auditing, not provisioning: a
//! failed write is logged and the run continues unless the recorder was built
//! with [`ArtifactRecorder::fail_on_error`].


use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{trace, warn};

use crate::constants::MANIFEST_FIELD_SEPARATOR;
use crate::core::FpkitError;
use crate::maven::MavenArtifact;
use crate::utils::fs::{copy_replacing, ensure_parent_dir};
use crate::utils::calculate_checksum;

/// Append-only manifest of installed artifacts.
#[derive(Debug)]
pub struct ArtifactRecorder {
    manifest: PathBuf,
    cache_dir: Option<PathBuf>,
    fail_on_error: bool,
    entries: usize,
}

impl ArtifactRecorder {
    /// Create the recorder, truncating any manifest left by a previous run.
    pub fn new(manifest: impl Into<PathBuf>) -> Result<Self> {
        let manifest = manifest.into();
        ensure_parent_dir(&manifest)?;
        fs::write(&manifest, b"")
            .with_context(|| format!("Failed to create artifact manifest: {}", manifest.display()))?;
        Ok(Self {
            manifest,
            cache_dir: None,
            fail_on_error: false,
            entries: 0,
        })
    }

    /// Copy every recorded artifact into `dir` as well.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Treat recorder failures as fatal.
    #[must_use]
    pub fn fail_on_error(mut self, fail: bool) -> Self {
        self.fail_on_error = fail;
        self
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Number of lines written by this recorder.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Append `coords::hash::relative_path` for a resolved artifact.
    pub fn record(&mut self, artifact: &MavenArtifact, relative_path: &str) -> Result<()> {
        let result = self.append(artifact, relative_path);
        self.tolerate(artifact, result)
    }

    /// Copy `source` into the side cache under `relative_path`, then record it.
    ///
    /// Only the normal components of `relative_path` are used, so the copy
    /// always lands inside the cache directory.
    pub fn cache(&mut self, artifact: &MavenArtifact, source: &Path, relative_path: &str) -> Result<()> {
        let result = match &self.cache_dir {
            Some(dir) => copy_replacing(source, &dir.join(cache_relative(relative_path))),
            None => Err(anyhow::anyhow!("no cache directory configured")),
        }
        .and_then(|()| self.append(artifact, relative_path));
        self.tolerate(artifact, result)
    }

    /// Record an install, caching the source first when a cache directory is configured.
    pub fn observe(&mut self, artifact: &MavenArtifact, relative_path: &str) -> Result<()> {
        match (self.cache_dir.is_some(), artifact.path()) {
            (true, Some(source)) => {
                let source = source.to_path_buf();
                self.cache(artifact, &source, relative_path)
            }
            _ => self.record(artifact, relative_path),
        }
    }

    fn append(&mut self, artifact: &MavenArtifact, relative_path: &str) -> Result<()> {
        let source = artifact
            .path()
            .with_context(|| format!("Artifact {} has no resolved content to hash", artifact.coords()))?;
        let hash = calculate_checksum(source)?;
        let line = [artifact.coords().as_str(), hash.as_str(), relative_path].join(MANIFEST_FIELD_SEPARATOR);

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.manifest)
            .with_context(|| format!("Failed to open artifact manifest: {}", self.manifest.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("Failed to append to artifact manifest: {}", self.manifest.display()))?;
        self.entries += 1;
        trace!("Recorded {}", line);
        Ok(())
    }

    fn tolerate(&self, artifact: &MavenArtifact, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if self.fail_on_error => Err(FpkitError::RecorderError {
                reason: format!("{}: {e:#}", artifact.coords()),
            }
            .into()),
            Err(e) => {
                warn!("Could not record {}: {:#}", artifact.coords(), e);
                Ok(())
            }
        }
    }
}

fn cache_relative(path: &str) -> PathBuf {
    Path::new(path).components().filter(|c| matches!(c, Component::Normal(_))).collect()
}
