//! Resolution and rewriting of module templates.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, trace};

use crate::constants::OPTIONAL_OPTION;
use crate::installer::ArtifactInstaller;
use crate::maven::MavenArtifact;
use crate::provisioning::ProvisioningContext;
use crate::schema::SchemaProcessor;
use crate::utils::atomic_write;
use crate::versions::Placeholder;

/// How artifacts end up in the provisioned server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Artifact content is copied next to each `module.xml`.
    #[default]
    Fat,
    /// `module.xml` references coordinates resolved from a repository at runtime.
    Thin,
}

/// What processing one template did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateOutcome {
    /// Artifact elements installed and rewritten.
    pub artifacts: usize,
    /// Optional artifact elements skipped because no version is known.
    pub skipped: usize,
    /// Coordinates flagged with the `jandex` option, for the indexing task.
    pub jandex: Vec<String>,
    /// The template was not a module descriptor and was copied byte for byte.
    pub copied_verbatim: bool,
}

/// Processes module templates for one output mode and one installer.
pub struct TemplateProcessor<'a, 't> {
    installer: &'a ArtifactInstaller<'t>,
    mode: OutputMode,
    schema_groups: BTreeSet<String>,
    schemas: Option<&'a mut dyn SchemaProcessor>,
}

impl<'a, 't> TemplateProcessor<'a, 't> {
    pub fn new(installer: &'a ArtifactInstaller<'t>, mode: OutputMode) -> Self {
        Self {
            installer,
            mode,
            schema_groups: BTreeSet::new(),
            schemas: None,
        }
    }

    /// Notify `hook` for every processed artifact whose group is in `groups`.
    #[must_use]
    pub fn with_schema_hook<I, S>(mut self, groups: I, hook: &'a mut dyn SchemaProcessor) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema_groups = groups.into_iter().map(Into::into).collect();
        self.schemas = Some(hook);
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Resolve, install and rewrite the template at `source`, writing the result to `target`.
    ///
    /// Fat mode copies artifacts into the directory of `target`.
    pub fn process(
        &mut self,
        ctx: &mut ProvisioningContext<'_>,
        pack: &str,
        source: &Path,
        target: &Path,
    ) -> Result<TemplateOutcome> {
        let mut template = ctx.templates.take(source)?;
        let mut outcome = TemplateOutcome::default();

        if !template.is_module() {
            debug!("Copying {} unchanged", source.display());
            atomic_write(target, template.raw())?;
            outcome.copied_verbatim = true;
            return Ok(outcome);
        }

        if let Some(version) = template.root_version().map(str::to_string)
            && Placeholder::parse(&version).is_some()
        {
            let resolved = self.resolve_root_version(ctx, pack, &version)?;
            trace!("Module version {} -> {}", version, resolved);
            template.set_root_version(&resolved)?;
        }

        let target_dir = target.parent().unwrap_or_else(|| Path::new("."));
        for index in 0..template.artifact_count() {
            let Some(name) = template.artifact_name(index).map(str::to_string) else {
                continue;
            };
            let optional = Placeholder::parse(&name).is_some_and(|p| p.has_option(OPTIONAL_OPTION));
            let Some(reference) = ctx.resolve(pack, &name, optional)? else {
                outcome.skipped += 1;
                continue;
            };
            let artifact = &reference.artifact;

            match self.mode {
                OutputMode::Fat => {
                    let file_name = self.installer.install_artifact_fat(ctx, artifact, target_dir)?;
                    template.set_resource_root(index, &file_name)?;
                }
                OutputMode::Thin => {
                    let version = self.installer.install_artifact_thin(ctx, artifact)?;
                    template.set_artifact_name(index, &artifact.coords_with_version(&version))?;
                }
            }

            if reference.is_jandex() {
                outcome.jandex.push(artifact.coords());
            }
            self.notify_schemas(artifact)?;
            outcome.artifacts += 1;
        }

        template.write_to(target)?;
        debug!("Processed {} ({} artifact(s))", source.display(), outcome.artifacts);
        Ok(outcome)
    }

    fn resolve_root_version(&self, ctx: &mut ProvisioningContext<'_>, pack: &str, value: &str) -> Result<String> {
        let mut artifact = ctx
            .resolve_reference(pack, value, false)?
            .map(|reference| reference.artifact)
            .with_context(|| format!("No version known for module version {value}"))?;
        if artifact.version().is_none() {
            ctx.resolve_artifact(pack, &mut artifact)?;
        }
        artifact.version().map(str::to_string).with_context(|| format!("No version known for module version {value}"))
    }

    fn notify_schemas(&mut self, artifact: &MavenArtifact) -> Result<()> {
        if let Some(hook) = self.schemas.as_deref_mut()
            && self.schema_groups.contains(artifact.group_id())
            && let Some(path) = artifact.path()
        {
            hook.process_schemas(artifact.group_id(), path)?;
        }
        Ok(())
    }
}
