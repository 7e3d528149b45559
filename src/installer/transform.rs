//! Byte transformation of artifacts and the bookkeeping that keeps it to one
//! attempt per artifact.
//!
//! The transformer itself (for example a Jakarta EE 9 namespace rewriter) is
//! an external capability behind [`ArtifactTransformer`]. What this module
//! owns is the run-scoped [`TransformState`]:
//!
//! - the **exclusion set**: `group:artifact:version` identities known not to
//!   need transformation, seeded from configuration and grown whenever the
//!   transformer reports [`TransformOutcome::NotTransformed`]. Entries are never
//!   removed during a run;
//! - the **transformed outputs**: where the transformed content of an identity
//!   lives once it has been produced.
//!
//! Identities use the version the feature pack declared, so an overridden
//! artifact keeps matching configured exclusions.

use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::core::FpkitError;
use crate::maven::MavenArtifact;

/// Result of one transformation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOutcome {
    /// `target` holds rewritten content.
    Transformed,
    /// Nothing needed rewriting; `target` may not exist.
    NotTransformed,
}

/// An external byte transformer.
pub trait ArtifactTransformer {
    /// Transform `source` into `target`.
    ///
    /// Errors are fatal to the run. Reporting [`TransformOutcome::NotTransformed`]
    /// is not an error.
    fn transform(&self, artifact: &MavenArtifact, source: &Path, target: &Path) -> Result<TransformOutcome>;
}

/// Transformer delegating to an external program.
///
/// Arguments may contain `{input}` and `{output}`. A successful exit with an
/// output file means the artifact was transformed; a successful exit without
/// one means nothing needed rewriting; any other exit is a failure.
#[derive(Debug, Clone)]
pub struct ExternalCommandTransformer {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalCommandTransformer {
    /// Locate `command` on the `PATH` (or use it as given if it is a path).
    pub fn new(command: &str, args: Vec<String>) -> Result<Self> {
        let program = which::which(command).map_err(|e| FpkitError::ConfigError {
            message: format!("transformer command '{command}' not found: {e}"),
        })?;
        Ok(Self {
            program,
            args,
        })
    }

    fn expand_args(&self, source: &Path, target: &Path) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &source.to_string_lossy()).replace("{output}", &target.to_string_lossy())
            })
            .collect()
    }
}

impl ArtifactTransformer for ExternalCommandTransformer {
    fn transform(&self, artifact: &MavenArtifact, source: &Path, target: &Path) -> Result<TransformOutcome> {
        let args = self.expand_args(source, target);
        debug!("Running {} {:?}", self.program.display(), args);
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .with_context(|| format!("Failed to start transformer {}", self.program.display()))?;

        if !output.status.success() {
            return Err(FpkitError::TransformFailed {
                coords: artifact.coords(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }
            .into());
        }

        if target.is_file() {
            Ok(TransformOutcome::Transformed)
        } else {
            Ok(TransformOutcome::NotTransformed)
        }
    }
}

/// Identities known not to need transformation.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    entries: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new<I, S>(seed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: seed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Add `key`; returns `false` if it was already excluded.
    pub(crate) fn insert(&mut self, key: impl Into<String>) -> bool {
        self.entries.insert(key.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// Run-scoped transformation bookkeeping.
#[derive(Debug, Default)]
pub struct TransformState {
    exclusions: ExclusionSet,
    transformed: HashMap<String, PathBuf>,
}

impl TransformState {
    pub fn new(exclusions: ExclusionSet) -> Self {
        Self {
            exclusions,
            transformed: HashMap::new(),
        }
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    pub fn is_excluded(&self, key: &str) -> bool {
        self.exclusions.contains(key)
    }

    /// Where the transformed content of `key` lives, once produced.
    pub fn transformed_path(&self, key: &str) -> Option<&Path> {
        self.transformed.get(key).map(PathBuf::as_path)
    }

    pub(crate) fn exclude(&mut self, key: &str) {
        if self.exclusions.insert(key) {
            debug!("Excluding {} from transformation", key);
        }
    }

    pub(crate) fn mark_transformed(&mut self, key: &str, path: PathBuf) {
        self.transformed.insert(key.to_string(), path);
    }

    /// How many identities have transformed content.
    pub fn transformed_count(&self) -> usize {
        self.transformed.len()
    }
}
