//! Run configuration.
//!
//! A provisioning run is described by one TOML file (`fpkit.toml` by
//! default):
//!
//! ```toml
//! mode = "fat"                                  # "fat" | "thin"
//! staging-dir = "target/server"
//! local-repository = "~/.m2/repository"
//! generated-repository = "target/repo"          # thin installs populate it
//! provisioning-repository = "target/prov-repo"  # enables transformed-artifact reuse
//! bulk-resolution = true
//! schema-groups = ["org.wildfly"]
//! overrides = { "org.jboss:foo" = "org.jboss:foo:2.0.0" }
//!
//! [transform]
//! enabled = true
//! suffix = "-ee9"
//! command = "transformer"
//! args = ["{input}", "{output}"]
//! excluded-artifacts = ["org.foo:bar:1.0"]
//! cache-dir = "target/transform-cache"
//!
//! [recorder]
//! manifest = "target/artifacts.txt"
//! cache-dir = "target/artifact-cache"
//! fail-on-error = false
//!
//! [[feature-packs]]
//! name = "wildfly-core"
//! dir = "packs/core"
//! transformable = true
//! ```
//!
//! Paths may start with `~`. Relative paths are relative to the directory of
//! the configuration file when it is loaded with [`ProvisioningConfig::load`].

pub mod parser;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::constants::{ARTIFACT_MANIFEST_FILE, DEFAULT_TRANSFORM_SUFFIX};
use crate::core::FpkitError;
use crate::template::OutputMode;
use crate::utils::expand_path;
use crate::versions::VersionOverrides;

pub use parser::parse_config;

/// The whole run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProvisioningConfig {
    #[serde(default)]
    pub mode: OutputMode,

    pub staging_dir: PathBuf,

    #[serde(default = "default_local_repository")]
    pub local_repository: PathBuf,

    /// Maven repository thin installs populate. Recreated at the start of a run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_repository: Option<PathBuf>,

    /// Repository probed for previously transformed artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_repository: Option<PathBuf>,

    #[serde(default)]
    pub bulk_resolution: bool,

    /// Groups whose artifacts are handed to the schema hook.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_groups: Vec<String>,

    /// `group:artifact` -> `group:artifact:version`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, String>,

    #[serde(default)]
    pub transform: TransformConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorder: Option<RecorderConfig>,

    #[serde(default)]
    pub feature_packs: Vec<FeaturePackConfig>,
}

/// `[transform]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TransformConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// External transformer program, looked up on `PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Arguments; `{input}` and `{output}` are substituted per artifact.
    #[serde(default = "default_transform_args")]
    pub args: Vec<String>,

    /// Seed of the exclusion set, as `group:artifact:version`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_artifacts: Vec<String>,

    /// Repository mirroring every transformed output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            suffix: default_suffix(),
            command: None,
            args: default_transform_args(),
            excluded_artifacts: Vec::new(),
            cache_dir: None,
        }
    }
}

/// `[recorder]` section. Without it nothing is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RecorderConfig {
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(default)]
    pub fail_on_error: bool,
}

/// One `[[feature-packs]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FeaturePackConfig {
    pub name: String,
    pub dir: PathBuf,

    /// Whether the pack's artifacts go through the transformer.
    #[serde(default = "default_true")]
    pub transformable: bool,
}

fn default_local_repository() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".m2").join("repository")
}

fn default_suffix() -> String {
    DEFAULT_TRANSFORM_SUFFIX.to_string()
}

fn default_transform_args() -> Vec<String> {
    vec!["{input}".to_string(), "{output}".to_string()]
}

fn default_manifest() -> PathBuf {
    PathBuf::from(ARTIFACT_MANIFEST_FILE)
}

const fn default_true() -> bool {
    true
}

impl ProvisioningConfig {
    /// Minimal configuration staging into `staging_dir`.
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: OutputMode::default(),
            staging_dir: staging_dir.into(),
            local_repository: default_local_repository(),
            generated_repository: None,
            provisioning_repository: None,
            bulk_resolution: false,
            schema_groups: Vec::new(),
            overrides: BTreeMap::new(),
            transform: TransformConfig::default(),
            recorder: None,
            feature_packs: Vec::new(),
        }
    }

    /// Load, anchor and validate the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Self = parse_config(path)?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        config.anchor_paths(&base);
        config.validate().with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Expand `~` in every path and make relative paths relative to `base`.
    pub fn anchor_paths(&mut self, base: &Path) {
        let anchor = |path: &mut PathBuf| {
            let expanded = expand_path(&path.to_string_lossy());
            *path = if expanded.is_relative() {
                base.join(expanded)
            } else {
                expanded
            };
        };

        anchor(&mut self.staging_dir);
        anchor(&mut self.local_repository);
        self.generated_repository.iter_mut().for_each(anchor);
        self.provisioning_repository.iter_mut().for_each(anchor);
        self.transform.cache_dir.iter_mut().for_each(anchor);
        if let Some(recorder) = &mut self.recorder {
            anchor(&mut recorder.manifest);
            recorder.cache_dir.iter_mut().for_each(anchor);
        }
        for pack in &mut self.feature_packs {
            anchor(&mut pack.dir);
        }
    }

    /// Reject configurations a run cannot start with.
    pub fn validate(&self) -> Result<(), FpkitError> {
        let invalid = |message: String| FpkitError::ConfigError {
            message,
        };

        if self.feature_packs.is_empty() {
            return Err(invalid("no feature packs configured".to_string()));
        }
        let mut names = HashSet::new();
        for pack in &self.feature_packs {
            if pack.name.trim().is_empty() {
                return Err(invalid("feature pack without a name".to_string()));
            }
            if !names.insert(pack.name.as_str()) {
                return Err(invalid(format!("feature pack '{}' is configured twice", pack.name)));
            }
        }
        if self.transform.enabled && self.transform.suffix.trim().is_empty() {
            return Err(invalid("transformation is enabled but the version suffix is empty".to_string()));
        }
        Ok(())
    }

    /// Whether any artifact will go through the transformer.
    pub fn transformation_active(&self) -> bool {
        self.transform.enabled && self.feature_packs.iter().any(|pack| pack.transformable)
    }

    pub fn version_overrides(&self) -> VersionOverrides {
        VersionOverrides::from_map(self.overrides.clone())
    }

    pub fn feature_pack(&self, name: &str) -> Option<&FeaturePackConfig> {
        self.feature_packs.iter().find(|pack| pack.name == name)
    }
}
