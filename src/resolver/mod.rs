//! Artifact resolution.
//!
//! The provisioning core never downloads anything itself: it asks an
//! [`ArtifactResolver`] to fill in the concrete version and content path of an
//! artifact. [`ResolverAdapter`] sits in front of the resolver and adds the
//! run-scoped behaviour:
//!
//! - **Bulk cache**: when the bulk pre-pass ran, per-template lookups are served
//!   from [`ArtifactCache`] and only misses reach the resolver.
//! - **Channel requirements**: a pack requiring channel resolution (for its
//!   artifacts or only for itself) fails fast with
//!   [`FpkitError::ChannelResolutionUnsupported`] if the resolver has no channel
//!   support; otherwise channel misses fall back to direct coordinates unless
//!   artifacts are required to come from a channel. The bulk cache never
//!   serves a directly resolved artifact to a lookup that requires a channel.
//! - **Resolved versions**: every resolution records
//!   `version.<group>.<artifactId>` -> version, consumed later by text
//!   substitution tasks (license files and the like).

pub mod bulk;
pub mod local;


use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::constants::RESOLVED_VERSION_PREFIX;
use crate::core::FpkitError;
use crate::maven::MavenArtifact;
use crate::utils::progress::ProgressBar;
use crate::versions::ChannelRequirement;

pub use bulk::{ArtifactCache, CachedArtifact};
pub use local::LocalRepositoryResolver;

/// A repository manager able to resolve Maven artifacts.
pub trait ArtifactResolver {
    /// Fill in the concrete version and content path of `artifact`.
    ///
    /// Failures are reported as [`FpkitError::ArtifactNotFound`].
    fn resolve(&self, artifact: &mut MavenArtifact) -> Result<()>;

    /// Resolve a batch of artifacts in one call, ticking `progress` per artifact.
    ///
    /// Implementations may parallelize internally; the caller treats this as
    /// one blocking call.
    fn resolve_all(&self, artifacts: &mut [MavenArtifact], progress: &ProgressBar) -> Result<()> {
        for artifact in artifacts.iter_mut() {
            self.resolve(artifact)?;
            progress.inc(1);
        }
        Ok(())
    }

    /// Whether this resolver can resolve through channels.
    fn supports_channels(&self) -> bool {
        false
    }

    /// Resolve through a channel. `Ok(false)` means no channel provides the artifact.
    fn resolve_from_channel(&self, artifact: &mut MavenArtifact) -> Result<bool> {
        let _ = artifact;
        Ok(false)
    }
}

/// Run-scoped front of an [`ArtifactResolver`].
pub struct ResolverAdapter<'r> {
    resolver: &'r dyn ArtifactResolver,
    cache: ArtifactCache,
    resolved_versions: BTreeMap<String, String>,
}

impl<'r> ResolverAdapter<'r> {
    pub fn new(resolver: &'r dyn ArtifactResolver) -> Self {
        Self {
            resolver,
            cache: ArtifactCache::default(),
            resolved_versions: BTreeMap::new(),
        }
    }

    pub fn resolver(&self) -> &'r dyn ArtifactResolver {
        self.resolver
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Resolve `artifact` in place.
    pub fn resolve(&mut self, artifact: &mut MavenArtifact, requirement: ChannelRequirement) -> Result<()> {
        let channels = self.resolver.supports_channels();
        if requirement.needs_channel() && !channels {
            return Err(FpkitError::ChannelResolutionUnsupported {
                coords: artifact.coords(),
            }
            .into());
        }

        let cached = self
            .cache
            .get(&artifact.key())
            .filter(|c| c.from_channel || !requirement.artifacts)
            .and_then(|c| Some((c.artifact.version()?.to_string(), c.artifact.path()?.to_path_buf())));
        if let Some((version, path)) = cached {
            trace!("Bulk cache hit for {}", artifact);
            artifact.set_resolved(version, path);
            self.record_version(artifact);
            return Ok(());
        }

        if channels {
            if self.resolver.resolve_from_channel(artifact)? {
                debug!("Resolved {} through channel", artifact);
                self.record_version(artifact);
                return Ok(());
            }
            if requirement.artifacts {
                return Err(FpkitError::ArtifactNotFound {
                    coords: artifact.coords(),
                    reason: "no channel provides this artifact".to_string(),
                }
                .into());
            }
        }

        self.resolver.resolve(artifact)?;
        self.record_version(artifact);
        Ok(())
    }

    /// Resolve every artifact up front and seed the bulk cache.
    ///
    /// Artifacts are cached under their pre-resolution keys, which is what
    /// later per-template lookups present. Channels are asked first when the
    /// resolver has them; what no channel provides goes into one batch call,
    /// except artifacts whose pack requires a channel; those are left to
    /// per-template resolution, which reports the failure.
    pub fn prefetch(
        &mut self,
        artifacts: Vec<(MavenArtifact, ChannelRequirement)>,
        progress: &ProgressBar,
    ) -> Result<usize> {
        let channels = self.resolver.supports_channels();
        let mut batch = Vec::new();
        for (mut artifact, requirement) in artifacts {
            if requirement.needs_channel() && !channels {
                progress.inc(1);
                continue;
            }
            let key = artifact.key();
            if channels {
                if self.resolver.resolve_from_channel(&mut artifact)? {
                    self.cache.insert(key, artifact, true);
                    progress.inc(1);
                    continue;
                }
                if requirement.artifacts {
                    progress.inc(1);
                    continue;
                }
            }
            batch.push((key, artifact));
        }

        if !batch.is_empty() {
            let (keys, mut pending): (Vec<_>, Vec<_>) = batch.into_iter().unzip();
            self.resolver.resolve_all(&mut pending, progress)?;
            for (key, artifact) in keys.into_iter().zip(pending) {
                self.cache.insert(key, artifact, false);
            }
        }
        Ok(self.cache.len())
    }

    fn record_version(&mut self, artifact: &MavenArtifact) {
        if let Some(version) = artifact.version() {
            self.resolved_versions.insert(
                format!("{}{}.{}", RESOLVED_VERSION_PREFIX, artifact.group_id(), artifact.artifact_id()),
                version.to_string(),
            );
        }
    }

    /// `version.<group>.<artifactId>` -> resolved version, for every artifact resolved so far.
    pub fn resolved_versions(&self) -> &BTreeMap<String, String> {
        &self.resolved_versions
    }
}
