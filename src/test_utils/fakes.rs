//! Fake collaborators that record how they were used.

use anyhow::Result;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::installer::{ArtifactTransformer, TransformOutcome};
use crate::maven::MavenArtifact;
use crate::resolver::{ArtifactResolver, LocalRepositoryResolver};
use crate::schema::SchemaProcessor;
use crate::utils::progress::ProgressBar;

/// Resolver over a local repository that counts calls and can emulate channels.
pub struct FakeResolver {
    inner: LocalRepositoryResolver,
    channel: Option<BTreeSet<String>>,
    resolve_calls: Cell<usize>,
    batch_calls: Cell<usize>,
}

impl FakeResolver {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: LocalRepositoryResolver::new(root),
            channel: None,
            resolve_calls: Cell::new(0),
            batch_calls: Cell::new(0),
        }
    }

    /// Enable channel support; the channel provides the given `group:artifact` keys.
    #[must_use]
    pub fn with_channel<I, S>(mut self, provided: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channel = Some(provided.into_iter().map(Into::into).collect());
        self
    }

    /// Single-artifact `resolve` calls so far.
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.get()
    }

    /// Batch `resolve_all` calls so far.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.get()
    }
}

impl ArtifactResolver for FakeResolver {
    fn resolve(&self, artifact: &mut MavenArtifact) -> Result<()> {
        self.resolve_calls.set(self.resolve_calls.get() + 1);
        self.inner.resolve(artifact)
    }

    fn resolve_all(&self, artifacts: &mut [MavenArtifact], progress: &ProgressBar) -> Result<()> {
        self.batch_calls.set(self.batch_calls.get() + 1);
        for artifact in artifacts.iter_mut() {
            self.inner.resolve(artifact)?;
            progress.inc(1);
        }
        Ok(())
    }

    fn supports_channels(&self) -> bool {
        self.channel.is_some()
    }

    fn resolve_from_channel(&self, artifact: &mut MavenArtifact) -> Result<bool> {
        match &self.channel {
            Some(provided) if provided.contains(&artifact.ga_key()) => {
                self.inner.resolve(artifact)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Transformer that copies its input and remembers every call.
///
/// Artifacts whose `group:artifact` is listed as untouched report
/// [`TransformOutcome::NotTransformed`]; a failing transformer errors on every call.
#[derive(Default)]
pub struct FakeTransformer {
    untouched: BTreeSet<String>,
    failing: bool,
    calls: RefCell<Vec<String>>,
}

impl FakeTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn leaving_untouched<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.untouched = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// `group:artifact:version` of every artifact passed to the transformer, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ArtifactTransformer for FakeTransformer {
    fn transform(&self, artifact: &MavenArtifact, source: &Path, target: &Path) -> Result<TransformOutcome> {
        self.calls.borrow_mut().push(artifact.gav());
        if self.failing {
            anyhow::bail!("transformer crashed on {}", source.display());
        }
        if self.untouched.contains(&artifact.ga_key()) {
            return Ok(TransformOutcome::NotTransformed);
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, target)?;
        Ok(TransformOutcome::Transformed)
    }
}

/// Schema hook that remembers every call.
#[derive(Debug, Default)]
pub struct RecordingSchemaProcessor {
    pub calls: Vec<(String, PathBuf)>,
}

impl SchemaProcessor for RecordingSchemaProcessor {
    fn process_schemas(&mut self, group_id: &str, path: &Path) -> Result<()> {
        self.calls.push((group_id.to_string(), path.to_path_buf()));
        Ok(())
    }
}
