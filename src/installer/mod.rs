//! Artifact installation.
//!
//! An [`ArtifactInstaller`] takes a resolved artifact and makes its content
//! available to the provisioned server in one of three ways:
//!
//! - [`ArtifactInstaller::install_artifact_fat`]: copy the content into a
//!   directory of the staged tree and return the file name used
//! - [`ArtifactInstaller::install_artifact_thin`]: leave the staged tree alone,
//!   populate the generated repository and return the version the module
//!   descriptor should reference
//! - [`ArtifactInstaller::install_copied_artifact`]: return a path whose content
//!   the caller copies wherever it needs it (shaded models, copy tasks)
//!
//! Which content is installed depends on the [`TransformPolicy`], which is
//! independent of whether the server is fat or thin:
//!
//! | Policy | Behaviour |
//! |--------|-----------|
//! | `Simple` | Original content, original version |
//! | `Transform` | Transformed content with a suffixed version, unless the artifact is excluded |
//! | `Reuse` | Like `Transform`, but decisions already on disk in a provisioning repository win |
//!
//! Transformation is attempted at most once per `group:artifact:version` per
//! run. The outcome is kept in the context's [`TransformState`] and every
//! entry point checks it first.
//!
//! All I/O failures are fatal and reported as
//! [`FpkitError::ArtifactInstallError`] with both paths.

pub mod transform;


use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::FpkitError;
use crate::maven::{MavenArtifact, RepositoryLayout};
use crate::provisioning::ProvisioningContext;
use crate::utils::{copy_replacing, ensure_parent_dir, remove_file};

pub use transform::{ArtifactTransformer, ExclusionSet, ExternalCommandTransformer, TransformOutcome, TransformState};

/// Which content an installer hands out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformPolicy {
    /// Never transform.
    Simple,
    /// Transform through the configured transformer.
    Transform,
    /// Transform, reusing outcomes persisted in a provisioning repository by earlier runs.
    Reuse {
        repository: RepositoryLayout,
    },
}

/// Content chosen for one install.
#[derive(Debug, Clone)]
struct Prepared {
    path: PathBuf,
    version: String,
    transformed: bool,
}

/// Installer strategy for one feature pack.
#[derive(Clone)]
pub struct ArtifactInstaller<'t> {
    policy: TransformPolicy,
    transformer: Option<&'t dyn ArtifactTransformer>,
    suffix: String,
    generated_repository: Option<RepositoryLayout>,
    transform_cache: Option<RepositoryLayout>,
}

impl<'t> ArtifactInstaller<'t> {
    /// Installer that never transforms.
    pub fn simple() -> Self {
        Self {
            policy: TransformPolicy::Simple,
            transformer: None,
            suffix: String::new(),
            generated_repository: None,
            transform_cache: None,
        }
    }

    /// Installer transforming through `transformer`; transformed versions carry `suffix`.
    pub fn transforming(transformer: &'t dyn ArtifactTransformer, suffix: impl Into<String>) -> Self {
        Self {
            policy: TransformPolicy::Transform,
            transformer: Some(transformer),
            suffix: suffix.into(),
            generated_repository: None,
            transform_cache: None,
        }
    }

    /// Transforming installer backed by an existing provisioning repository.
    pub fn reusing(
        transformer: &'t dyn ArtifactTransformer,
        suffix: impl Into<String>,
        repository: RepositoryLayout,
    ) -> Self {
        Self {
            policy: TransformPolicy::Reuse {
                repository,
            },
            ..Self::transforming(transformer, suffix)
        }
    }

    /// Populate `repository` with every installed artifact and its POM.
    #[must_use]
    pub fn with_generated_repository(mut self, repository: RepositoryLayout) -> Self {
        self.generated_repository = Some(repository);
        self
    }

    /// Mirror transformation outcomes (and POMs) into `cache`.
    #[must_use]
    pub fn with_transform_cache(mut self, cache: RepositoryLayout) -> Self {
        self.transform_cache = Some(cache);
        self
    }

    /// The same installer without transformation, for packs that are not transformable.
    #[must_use]
    pub fn without_transformation(&self) -> Self {
        Self {
            policy: TransformPolicy::Simple,
            transformer: None,
            suffix: String::new(),
            generated_repository: self.generated_repository.clone(),
            transform_cache: None,
        }
    }

    pub fn policy(&self) -> &TransformPolicy {
        &self.policy
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn generated_repository(&self) -> Option<&RepositoryLayout> {
        self.generated_repository.as_ref()
    }

    /// Copy the artifact's content into `target_dir`, replacing any existing file.
    ///
    /// Returns the file name used, which carries the transformed version when
    /// the content was transformed.
    pub fn install_artifact_fat(
        &self,
        ctx: &mut ProvisioningContext<'_>,
        artifact: &MavenArtifact,
        target_dir: &Path,
    ) -> Result<String> {
        let prepared = self.prepare(ctx, artifact)?;
        let file_name = if prepared.transformed {
            artifact.file_name_with_version(&prepared.version)
        } else {
            prepared
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| artifact.file_name_with_version(&prepared.version))
        };

        let target = target_dir.join(&file_name);
        copy_artifact(artifact, &prepared.path, &target)?;
        debug!("Installed {} as {}", artifact, target.display());
        ctx.record_install(artifact, &target)?;
        Ok(file_name)
    }

    /// Make the artifact available through the generated repository.
    ///
    /// Returns the version the module descriptor should reference. The
    /// install is recorded at its location in the generated repository, or
    /// as a bare Maven2 layout path when no generated repository is configured.
    pub fn install_artifact_thin(&self, ctx: &mut ProvisioningContext<'_>, artifact: &MavenArtifact) -> Result<String> {
        let prepared = self.prepare(ctx, artifact)?;
        let location = match &self.generated_repository {
            Some(repository) => {
                self.populate_repository(ctx, repository, artifact, &prepared)?;
                repository.artifact_path_for_version(artifact, &prepared.version)
            }
            None => RepositoryLayout::new("").artifact_path_for_version(artifact, &prepared.version),
        };
        ctx.record_install(artifact, &location)?;
        Ok(prepared.version)
    }

    /// Return a path holding the content to install, populating the generated repository on the way.
    pub fn install_copied_artifact(
        &self,
        ctx: &mut ProvisioningContext<'_>,
        artifact: &MavenArtifact,
    ) -> Result<PathBuf> {
        let prepared = self.prepare(ctx, artifact)?;
        if let Some(repository) = &self.generated_repository {
            self.populate_repository(ctx, repository, artifact, &prepared)?;
        }
        Ok(prepared.path)
    }

    fn prepare(&self, ctx: &mut ProvisioningContext<'_>, artifact: &MavenArtifact) -> Result<Prepared> {
        let (source, version) = resolved_parts(artifact)?;
        let untouched = Prepared {
            path: source,
            version,
            transformed: false,
        };
        let Some(transformer) = self.transformer.filter(|_| self.policy != TransformPolicy::Simple) else {
            return Ok(untouched);
        };

        let key = artifact.exclusion_key();
        if ctx.transform.is_excluded(&key) {
            return Ok(untouched);
        }
        let transformed_version = format!("{}{}", untouched.version, self.suffix);
        if let Some(path) = ctx.transform.transformed_path(&key) {
            return Ok(Prepared {
                path: path.to_path_buf(),
                version: transformed_version,
                transformed: true,
            });
        }

        if let TransformPolicy::Reuse {
            repository,
        } = &self.policy
        {
            let existing = repository.artifact_path_for_version(artifact, &transformed_version);
            if existing.is_file() {
                debug!("Reusing transformed {} from {}", key, repository.root().display());
                ctx.transform.mark_transformed(&key, existing.clone());
                return Ok(Prepared {
                    path: existing,
                    version: transformed_version,
                    transformed: true,
                });
            }
            let original = repository.artifact_path_for_version(artifact, &untouched.version);
            if original.is_file() {
                debug!("{} is present untransformed in {}", key, repository.root().display());
                ctx.transform.exclude(&key);
                return Ok(untouched);
            }
        }

        let prepared = self.attempt_transform(ctx, transformer, artifact, &key, untouched, transformed_version)?;
        if let TransformPolicy::Reuse {
            repository,
        } = &self.policy
        {
            self.populate_repository(ctx, repository, artifact, &prepared)?;
        }
        if let Some(cache) = &self.transform_cache {
            self.populate_repository(ctx, cache, artifact, &prepared)?;
        }
        Ok(prepared)
    }

    fn attempt_transform(
        &self,
        ctx: &mut ProvisioningContext<'_>,
        transformer: &dyn ArtifactTransformer,
        artifact: &MavenArtifact,
        key: &str,
        untouched: Prepared,
        transformed_version: String,
    ) -> Result<Prepared> {
        // One slot per group/artifact/version: artifact ids alone collide across groups.
        let target = RepositoryLayout::new(ctx.scratch_dir()).artifact_path_for_version(artifact, &transformed_version);
        ensure_parent_dir(&target)
            .and_then(|()| remove_file(&target))
            .map_err(|e| install_error(artifact, &untouched.path, &target, e))?;
        let outcome = match transformer.transform(artifact, &untouched.path, &target) {
            Ok(outcome) => outcome,
            Err(e) if e.downcast_ref::<FpkitError>().is_some() => return Err(e),
            Err(e) => {
                return Err(FpkitError::TransformFailed {
                    coords: artifact.coords(),
                    reason: format!("{e:#}"),
                }
                .into());
            }
        };

        match outcome {
            TransformOutcome::Transformed => {
                if !target.is_file() {
                    return Err(FpkitError::TransformFailed {
                        coords: artifact.coords(),
                        reason: format!("transformer reported success but wrote nothing to {}", target.display()),
                    }
                    .into());
                }
                info!("Transformed {} -> {}", artifact, transformed_version);
                ctx.transform.mark_transformed(key, target.clone());
                Ok(Prepared {
                    path: target,
                    version: transformed_version,
                    transformed: true,
                })
            }
            TransformOutcome::NotTransformed => {
                info!("{} needs no transformation", artifact);
                ctx.transform.exclude(key);
                Ok(untouched)
            }
        }
    }

    /// Copy the chosen content and the artifact's POM into `repository`, once per run.
    fn populate_repository(
        &self,
        ctx: &mut ProvisioningContext<'_>,
        repository: &RepositoryLayout,
        artifact: &MavenArtifact,
        prepared: &Prepared,
    ) -> Result<()> {
        let coords = artifact.coords_with_version(&prepared.version);
        if !ctx.mark_repository_install(repository.root(), &coords) {
            return Ok(());
        }

        let target = repository.artifact_path_for_version(artifact, &prepared.version);
        if target != prepared.path {
            copy_artifact(artifact, &prepared.path, &target)?;
        }
        let pom_target = repository.pom_path_for_version(artifact, &prepared.version);
        if !pom_target.is_file() {
            let pom = ctx.resolve_pom(artifact)?;
            copy_artifact(artifact, &pom, &pom_target)?;
        }
        debug!("Added {} to {}", coords, repository.root().display());
        Ok(())
    }
}

fn resolved_parts(artifact: &MavenArtifact) -> Result<(PathBuf, String)> {
    match (artifact.path(), artifact.version()) {
        (Some(path), Some(version)) => Ok((path.to_path_buf(), version.to_string())),
        _ => Err(FpkitError::ArtifactInstallError {
            coords: artifact.coords(),
            source_path: String::new(),
            target: String::new(),
            reason: "artifact was not resolved before installation".to_string(),
        }
        .into()),
    }
}

fn copy_artifact(artifact: &MavenArtifact, source: &Path, target: &Path) -> Result<()> {
    copy_replacing(source, target).map_err(|e| install_error(artifact, source, target, e))
}

fn install_error(artifact: &MavenArtifact, source: &Path, target: &Path, e: anyhow::Error) -> anyhow::Error {
    FpkitError::ArtifactInstallError {
        coords: artifact.coords(),
        source_path: source.display().to_string(),
        target: target.display().to_string(),
        reason: format!("{e:#}"),
    }
    .into()
}
