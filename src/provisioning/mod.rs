//! Provisioning runs.
//!
//! [`Provisioner`] drives one run over the configured feature packs:
//!
//! 1. load every pack's version properties and channel mode, and check the
//!    overrides against them before anything is written
//! 2. recreate the generated repository and truncate the artifact manifest
//! 3. pick the installer (simple, transforming, or reusing a provisioning
//!    repository); non-transformable packs get the same installer without
//!    transformation
//! 4. optionally resolve every referenced artifact in one batch
//! 5. process every `modules/**/module.xml` into `<staging>/modules/...`
//! 6. assemble every `shaded/*.xml` descriptor
//!
//! The run is sequential; all mutable state lives in [`ProvisioningContext`].

pub mod context;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{FeaturePackConfig, ProvisioningConfig};
use crate::constants::{MODULE_TEMPLATE_FILE, MODULES_DIR, OPTIONAL_OPTION, SHADED_DIR};
use crate::core::FpkitError;
use crate::installer::{ArtifactInstaller, ArtifactTransformer, ExclusionSet};
use crate::maven::{MavenArtifact, RepositoryLayout};
use crate::recorder::ArtifactRecorder;
use crate::resolver::ArtifactResolver;
use crate::schema::SchemaProcessor;
use crate::shaded::{ShadedModel, ShadedModelAssembler, ShadedOutcome};
use crate::template::TemplateProcessor;
use crate::utils::{ProgressBar, ensure_dir, recreate_dir};
use crate::versions::{ChannelRequirement, ChannelResolutionMode, Placeholder, VersionProperties};

pub use context::{PackVersions, ProvisioningContext, ProvisioningContextBuilder};

/// Summary of a finished run.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningReport {
    /// Module templates processed, including the ones copied verbatim.
    pub templates: usize,
    /// Templates that were not module descriptors.
    pub copied_verbatim: usize,
    /// Artifact installs across templates and shaded models.
    pub artifacts: usize,
    /// Optional template artifacts skipped for lack of a version.
    pub skipped: usize,
    /// Archives written from shaded-model descriptors.
    pub shaded: Vec<PathBuf>,
    /// Coordinates flagged for annotation indexing.
    pub jandex: Vec<String>,
    /// Artifacts that needed no transformation, as exclusion keys.
    pub exclusions: Vec<String>,
    pub transformed: usize,
    /// Lines written to the artifact manifest.
    pub recorded: usize,
    /// `version.<group>.<artifactId>` -> resolved version.
    pub resolved_versions: BTreeMap<String, String>,
}

/// Runs provisioning for one configuration.
pub struct Provisioner<'c> {
    config: &'c ProvisioningConfig,
    progress: bool,
}

impl<'c> Provisioner<'c> {
    pub fn new(config: &'c ProvisioningConfig) -> Self {
        Self {
            config,
            progress: true,
        }
    }

    /// Show or hide the bulk-resolution progress bar.
    #[must_use]
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Provision every configured feature pack into the staging directory.
    ///
    /// `transformer` is required when transformation is enabled for at least
    /// one transformable pack.
    pub fn run(
        &self,
        resolver: &dyn ArtifactResolver,
        transformer: Option<&dyn ArtifactTransformer>,
        schemas: &mut dyn SchemaProcessor,
    ) -> Result<ProvisioningReport> {
        let config = self.config;
        let packs = self.load_packs()?;
        config
            .version_overrides()
            .validate(packs.iter().map(|(props, _)| props))?;

        ensure_dir(&config.staging_dir)?;
        if let Some(repository) = &config.generated_repository {
            recreate_dir(repository)
                .with_context(|| format!("Failed to recreate generated repository {}", repository.display()))?;
        }
        let recorder = match &config.recorder {
            Some(settings) => {
                let recorder = ArtifactRecorder::new(&settings.manifest)?.fail_on_error(settings.fail_on_error);
                Some(match &settings.cache_dir {
                    Some(dir) => recorder.with_cache_dir(dir),
                    None => recorder,
                })
            }
            None => None,
        };

        let mut ctx = self.context(resolver, packs, recorder)?;
        let installer = self.installer(transformer)?;

        let templates = self.discover_templates()?;
        if config.bulk_resolution {
            self.prefetch(&mut ctx, &templates)?;
        }

        let mut report = ProvisioningReport::default();
        for pack in &config.feature_packs {
            let installer = installer_for(&installer, pack);
            let mut processor = TemplateProcessor::new(&installer, config.mode)
                .with_schema_hook(config.schema_groups.iter().cloned(), &mut *schemas);

            for template in templates.iter().filter(|t| t.pack == pack.name) {
                let outcome = processor
                    .process(&mut ctx, &pack.name, &template.source, &template.target)
                    .with_context(|| format!("Failed to process {}", template.source.display()))?;
                report.templates += 1;
                report.skipped += outcome.skipped;
                report.copied_verbatim += usize::from(outcome.copied_verbatim);
                report.jandex.extend(outcome.jandex);
            }
        }

        for pack in &config.feature_packs {
            let installer = installer_for(&installer, pack);
            let assembler = ShadedModelAssembler::new(&installer);
            for descriptor in shaded_descriptors(&pack.dir)? {
                let model = ShadedModel::parse(&descriptor)?;
                let outcome = assembler
                    .assemble(&mut ctx, &pack.name, &model)
                    .with_context(|| format!("Failed to assemble {}", descriptor.display()))?;
                report.shaded.push(outcome.output);
            }
        }

        report.artifacts = ctx.installed();
        report.exclusions = ctx.transform_state().exclusions().iter().map(str::to_string).collect();
        report.transformed = ctx.transform_state().transformed_count();
        report.recorded = ctx.recorder().map_or(0, ArtifactRecorder::entries);
        report.resolved_versions = ctx.resolved_versions().clone();

        info!(
            "Provisioned {} template(s) and {} shaded archive(s) with {} artifact install(s) into {}",
            report.templates,
            report.shaded.len(),
            report.artifacts,
            config.staging_dir.display()
        );
        Ok(report)
    }

    /// Assemble the shaded model at `descriptor` for `pack` without a full run.
    pub fn shade(
        &self,
        resolver: &dyn ArtifactResolver,
        transformer: Option<&dyn ArtifactTransformer>,
        pack: &str,
        descriptor: &Path,
    ) -> Result<ShadedOutcome> {
        let pack_config = self.config.feature_pack(pack).ok_or_else(|| FpkitError::ConfigError {
            message: format!("feature pack '{pack}' is not configured"),
        })?;
        let model = ShadedModel::parse(descriptor)?;
        let mut ctx = self.context(resolver, self.load_packs()?, None)?;
        let installer = self.installer(transformer)?;
        let installer = installer_for(&installer, pack_config);
        ShadedModelAssembler::new(&installer).assemble(&mut ctx, pack, &model)
    }

    fn load_packs(&self) -> Result<Vec<(VersionProperties, ChannelResolutionMode)>> {
        self.config
            .feature_packs
            .iter()
            .map(|pack| {
                if !pack.dir.is_dir() {
                    return Err(FpkitError::ConfigError {
                        message: format!("feature pack directory {} does not exist", pack.dir.display()),
                    }
                    .into());
                }
                let props = VersionProperties::load(&pack.name, &pack.dir)?;
                let mode = ChannelResolutionMode::load(&pack.dir)?;
                debug!("Feature pack '{}': {} version(s), channel mode {:?}", pack.name, props.len(), mode);
                Ok((props, mode))
            })
            .collect()
    }

    fn context<'r>(
        &self,
        resolver: &'r dyn ArtifactResolver,
        packs: Vec<(VersionProperties, ChannelResolutionMode)>,
        recorder: Option<ArtifactRecorder>,
    ) -> Result<ProvisioningContext<'r>> {
        let mut builder = ProvisioningContextBuilder::new(&self.config.staging_dir, resolver)
            .overrides(self.config.version_overrides());
        for (props, mode) in packs {
            builder = builder.pack(props, mode);
        }
        if self.config.transformation_active() {
            builder = builder.exclusions(ExclusionSet::new(self.config.transform.excluded_artifacts.iter().cloned()));
        }
        if let Some(recorder) = recorder {
            builder = builder.recorder(recorder);
        }
        builder.build()
    }

    fn installer<'t>(&self, transformer: Option<&'t dyn ArtifactTransformer>) -> Result<ArtifactInstaller<'t>> {
        let config = self.config;
        let installer = if config.transformation_active() {
            let transformer = transformer.ok_or_else(|| FpkitError::ConfigError {
                message: "transformation is enabled but no transformer is available".to_string(),
            })?;
            let suffix = config.transform.suffix.clone();
            let installer = match &config.provisioning_repository {
                Some(repository) => {
                    ArtifactInstaller::reusing(transformer, suffix, RepositoryLayout::new(repository))
                }
                None => ArtifactInstaller::transforming(transformer, suffix),
            };
            match &config.transform.cache_dir {
                Some(cache) => installer.with_transform_cache(RepositoryLayout::new(cache)),
                None => installer,
            }
        } else {
            ArtifactInstaller::simple()
        };

        Ok(match &config.generated_repository {
            Some(repository) => installer.with_generated_repository(RepositoryLayout::new(repository)),
            None => installer,
        })
    }

    fn discover_templates(&self) -> Result<Vec<TemplateJob>> {
        let target_root = self.config.staging_dir.join(MODULES_DIR);
        let mut jobs = Vec::new();
        for pack in &self.config.feature_packs {
            let modules = pack.dir.join(MODULES_DIR);
            if !modules.is_dir() {
                continue;
            }
            for entry in WalkDir::new(&modules).sort_by_file_name() {
                let entry = entry.with_context(|| format!("Failed to walk {}", modules.display()))?;
                if !entry.file_type().is_file() || entry.file_name() != MODULE_TEMPLATE_FILE {
                    continue;
                }
                let relative = entry.path().strip_prefix(&modules)?;
                jobs.push(TemplateJob {
                    pack: pack.name.clone(),
                    source: entry.path().to_path_buf(),
                    target: target_root.join(relative),
                });
            }
        }
        debug!("Found {} module template(s)", jobs.len());
        Ok(jobs)
    }

    /// Resolve every artifact the templates and shaded descriptors reference in one batch.
    fn prefetch(&self, ctx: &mut ProvisioningContext<'_>, templates: &[TemplateJob]) -> Result<()> {
        let mut references: Vec<(String, String, bool)> = Vec::new();
        for job in templates {
            let template = ctx.templates.get_or_parse(&job.source)?;
            if !template.is_module() {
                continue;
            }
            if let Some(version) = template.root_version()
                && Placeholder::parse(version).is_some()
            {
                references.push((job.pack.clone(), version.to_string(), false));
            }
            for name in template.artifact_names() {
                let optional = Placeholder::parse(name).is_some_and(|p| p.has_option(OPTIONAL_OPTION));
                references.push((job.pack.clone(), name.to_string(), optional));
            }
        }
        for pack in &self.config.feature_packs {
            for descriptor in shaded_descriptors(&pack.dir)? {
                let model = ShadedModel::parse(&descriptor)?;
                references.extend(model.dependencies.into_iter().map(|d| (pack.name.clone(), d, false)));
            }
        }

        let mut seen = HashSet::new();
        let mut artifacts: Vec<(MavenArtifact, ChannelRequirement)> = Vec::new();
        for (pack, reference, optional) in &references {
            let requirement = ctx.pack(pack).map(|p| p.channel_mode.requirement()).unwrap_or_default();
            if let Some(resolved) = ctx.resolve_reference(pack, reference, *optional)?
                && seen.insert((resolved.artifact.key(), requirement))
            {
                artifacts.push((resolved.artifact, requirement));
            }
        }

        let progress = if self.progress {
            ProgressBar::new(artifacts.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        progress.set_prefix("Resolving");
        let count = artifacts.len();
        ctx.resolver.prefetch(artifacts, &progress)?;
        progress.finish_with_message(format!("resolved {count} artifact(s)"));
        info!("Bulk-resolved {} artifact(s) from {} template(s)", count, templates.len());
        Ok(())
    }
}

/// One template to process.
#[derive(Debug, Clone)]
struct TemplateJob {
    pack: String,
    source: PathBuf,
    target: PathBuf,
}

fn installer_for<'t>(installer: &ArtifactInstaller<'t>, pack: &FeaturePackConfig) -> ArtifactInstaller<'t> {
    if pack.transformable {
        installer.clone()
    } else {
        installer.without_transformation()
    }
}

/// `shaded/*.xml` of a pack directory, sorted by name.
fn shaded_descriptors(pack_dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = pack_dir.join(SHADED_DIR);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut descriptors = Vec::new();
    for entry in std::fs::read_dir(&dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "xml") {
            descriptors.push(path);
        }
    }
    descriptors.sort();
    Ok(descriptors)
}
