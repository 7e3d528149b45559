//! Run-scoped provisioning state.
//!
//! Everything that changes while a run progresses lives in one
//! [`ProvisioningContext`] value, built once at the start of the run and
//! passed by `&mut` into every installer and template operation:
//!
//! - per feature pack: version properties (overrides applied) and channel mode
//! - the version overrides themselves
//! - the [`ResolverAdapter`] with its bulk cache and resolved-version map
//! - the [`TransformState`] (exclusion set, transformed outputs)
//! - the parsed-template cache
//! - the artifact recorder
//! - which artifacts already went into which repository
//!
//! Nothing here is shared between threads; the run is sequential.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::core::FpkitError;
use crate::installer::{ExclusionSet, TransformState};
use crate::maven::MavenArtifact;
use crate::recorder::ArtifactRecorder;
use crate::resolver::{ArtifactResolver, ResolverAdapter};
use crate::template::TemplateCache;
use crate::utils::fs::relative_display;
use crate::versions::{
    ArtifactReference, ChannelRequirement, ChannelResolutionMode, VersionOverrides, VersionProperties,
    resolve_reference,
};

/// Version data of one feature pack.
#[derive(Debug, Clone)]
pub struct PackVersions {
    pub properties: VersionProperties,
    pub channel_mode: ChannelResolutionMode,
}

/// Mutable state of one provisioning run.
pub struct ProvisioningContext<'r> {
    staging_dir: PathBuf,
    packs: BTreeMap<String, PackVersions>,
    overrides: VersionOverrides,
    pub(crate) resolver: ResolverAdapter<'r>,
    pub(crate) transform: TransformState,
    pub(crate) templates: TemplateCache,
    recorder: Option<ArtifactRecorder>,
    repository_installs: HashSet<String>,
    installed: usize,
    scratch: TempDir,
}

impl<'r> ProvisioningContext<'r> {
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Directory for transformer output and other scratch files of this run.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    pub fn pack(&self, name: &str) -> Option<&PackVersions> {
        self.packs.get(name)
    }

    pub fn overrides(&self) -> &VersionOverrides {
        &self.overrides
    }

    pub fn transform_state(&self) -> &TransformState {
        &self.transform
    }

    pub fn resolved_versions(&self) -> &BTreeMap<String, String> {
        self.resolver.resolved_versions()
    }

    pub fn recorder(&self) -> Option<&ArtifactRecorder> {
        self.recorder.as_ref()
    }

    /// Artifacts installed so far, across all installer operations.
    pub fn installed(&self) -> usize {
        self.installed
    }

    fn pack_or_err(&self, name: &str) -> Result<&PackVersions, FpkitError> {
        self.packs.get(name).ok_or_else(|| FpkitError::ConfigError {
            message: format!("feature pack '{name}' is not part of this run"),
        })
    }

    /// Apply `pack`'s version policy to a template or descriptor reference.
    pub fn resolve_reference(&self, pack: &str, reference: &str, optional: bool) -> Result<Option<ArtifactReference>> {
        let versions = self.pack_or_err(pack)?;
        Ok(resolve_reference(reference, &versions.properties, &self.overrides, optional)?)
    }

    /// Fetch content for an artifact of `pack`, honouring the pack's channel mode.
    pub fn resolve_artifact(&mut self, pack: &str, artifact: &mut MavenArtifact) -> Result<()> {
        let requirement = self.pack_or_err(pack)?.channel_mode.requirement();
        self.resolver.resolve(artifact, requirement)
    }

    /// Policy plus content resolution in one step. `Ok(None)` for a skipped optional reference.
    pub fn resolve(&mut self, pack: &str, reference: &str, optional: bool) -> Result<Option<ArtifactReference>> {
        let Some(mut resolved) = self.resolve_reference(pack, reference, optional)? else {
            return Ok(None);
        };
        self.resolve_artifact(pack, &mut resolved.artifact)?;
        Ok(Some(resolved))
    }

    /// Path of the POM belonging to a resolved artifact.
    pub fn resolve_pom(&mut self, artifact: &MavenArtifact) -> Result<PathBuf> {
        let version = artifact
            .version()
            .with_context(|| format!("Artifact {} has no concrete version", artifact.coords()))?;
        let mut pom = artifact.pom(version);
        self.resolver.resolve(&mut pom, ChannelRequirement::default())?;
        pom.path().map(Path::to_path_buf).with_context(|| format!("No POM path for {}", artifact.coords()))
    }

    /// Remember that `coords` went into the repository at `root`. `false` if it already had.
    pub(crate) fn mark_repository_install(&mut self, root: &Path, coords: &str) -> bool {
        self.repository_installs.insert(format!("{}|{coords}", root.display()))
    }

    /// Count an install and pass it on to the recorder.
    ///
    /// `location` is made relative to the staging directory when it lies inside it.
    pub(crate) fn record_install(&mut self, artifact: &MavenArtifact, location: &Path) -> Result<()> {
        self.installed += 1;
        let relative = relative_display(&self.staging_dir, location);
        match self.recorder.as_mut() {
            Some(recorder) => recorder.observe(artifact, &relative),
            None => Ok(()),
        }
    }
}

/// Builder for [`ProvisioningContext`].
///
/// ```rust,no_run
/// use fpkit::provisioning::ProvisioningContextBuilder;
/// use fpkit::resolver::LocalRepositoryResolver;
/// use fpkit::versions::{ChannelResolutionMode, VersionProperties};
///
/// # fn example() -> anyhow::Result<()> {
/// let resolver = LocalRepositoryResolver::user_default()?;
/// let context = ProvisioningContextBuilder::new("target/server", &resolver)
///     .pack(VersionProperties::new("wildfly-core"), ChannelResolutionMode::NotRequired)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ProvisioningContextBuilder<'r> {
    staging_dir: PathBuf,
    resolver: &'r dyn ArtifactResolver,
    packs: BTreeMap<String, PackVersions>,
    overrides: VersionOverrides,
    exclusions: ExclusionSet,
    recorder: Option<ArtifactRecorder>,
}

impl<'r> ProvisioningContextBuilder<'r> {
    pub fn new(staging_dir: impl Into<PathBuf>, resolver: &'r dyn ArtifactResolver) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            resolver,
            packs: BTreeMap::new(),
            overrides: VersionOverrides::new(),
            exclusions: ExclusionSet::default(),
            recorder: None,
        }
    }

    #[must_use]
    pub fn pack(mut self, properties: VersionProperties, channel_mode: ChannelResolutionMode) -> Self {
        self.packs.insert(
            properties.feature_pack().to_string(),
            PackVersions {
                properties,
                channel_mode,
            },
        );
        self
    }

    #[must_use]
    pub fn overrides(mut self, overrides: VersionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    #[must_use]
    pub fn exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }

    #[must_use]
    pub fn recorder(mut self, recorder: ArtifactRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Validate overrides against every pack, apply them, and create the run's scratch space.
    ///
    /// An override naming an artifact no pack declares fails here, before any
    /// template is read.
    pub fn build(mut self) -> Result<ProvisioningContext<'r>> {
        self.overrides.validate(self.packs.values().map(|p| &p.properties))?;
        for versions in self.packs.values_mut() {
            let applied = versions.properties.apply_overrides(&self.overrides);
            if applied > 0 {
                debug!("Applied {} override(s) to '{}'", applied, versions.properties.feature_pack());
            }
        }

        let scratch = tempfile::Builder::new()
            .prefix("fpkit-")
            .tempdir()
            .context("Failed to create scratch directory for provisioning")?;

        Ok(ProvisioningContext {
            staging_dir: self.staging_dir,
            packs: self.packs,
            overrides: self.overrides,
            resolver: ResolverAdapter::new(self.resolver),
            transform: TransformState::new(self.exclusions),
            templates: TemplateCache::default(),
            recorder: self.recorder,
            repository_installs: HashSet::new(),
            installed: 0,
            scratch,
        })
    }
}
