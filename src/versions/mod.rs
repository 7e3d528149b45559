//! Version properties, overrides and channel requirements.
//!
//! Every feature pack ships an `artifact-versions.properties` resource mapping
//! `group:artifact` to `group:artifact:version[:classifier[:extension]]`. The
//! maps are loaded once at the start of a run; externally supplied overrides
//! are merged into them and the merged result is authoritative for the rest
//! of the run.
//!
//! # Overrides
//!
//! An override may only replace a version that some feature pack already
//! declares. [`VersionOverrides::validate`] enforces this before any template
//! is read, so a typo in an override key fails provisioning immediately.
//! The declared value of an overridden entry is kept next to the merged one
//! so later bookkeeping can still identify the artifact by the version the
//! feature pack declared.

pub mod placeholder;
pub mod policy;


use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::constants::{CHANNEL_PROPERTIES_FILE, CHANNEL_RESOLUTION_KEY, VERSION_PROPERTIES_FILE};
use crate::core::FpkitError;

pub use placeholder::Placeholder;
pub use policy::{ArtifactReference, ChannelRequirement, resolve_reference};

/// Parse a line-oriented `key=value` resource.
///
/// Blank lines and lines starting with `#` or `!` are skipped. Any other line
/// without `=` is a fatal [`FpkitError::PropertiesParse`]. Escaped colons
/// (`\:`) are unescaped in keys and values.
pub fn parse_properties(content: &str, file: &str) -> Result<Vec<(String, String)>, FpkitError> {
    let mut entries = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(FpkitError::PropertiesParse {
                file: file.to_string(),
                line: index + 1,
                reason: format!("missing '=' in '{line}'"),
            });
        };
        let key = key.trim().replace("\\:", ":");
        if key.is_empty() {
            return Err(FpkitError::PropertiesParse {
                file: file.to_string(),
                line: index + 1,
                reason: "empty key".to_string(),
            });
        }
        entries.push((key, value.trim().replace("\\:", ":")));
    }
    Ok(entries)
}

/// The version-properties map of one feature pack.
#[derive(Debug, Clone, Default)]
pub struct VersionProperties {
    feature_pack: String,
    entries: BTreeMap<String, String>,
    /// Declared values of entries replaced by an override.
    declared: BTreeMap<String, String>,
}

impl VersionProperties {
    pub fn new(feature_pack: impl Into<String>) -> Self {
        Self {
            feature_pack: feature_pack.into(),
            ..Self::default()
        }
    }

    /// Build from already parsed entries.
    pub fn from_entries<I, K, V>(feature_pack: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            feature_pack: feature_pack.into(),
            entries: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            declared: BTreeMap::new(),
        }
    }

    /// Load `artifact-versions.properties` from a feature pack directory.
    ///
    /// A pack without the resource has an empty map.
    pub fn load(feature_pack: &str, pack_dir: &Path) -> Result<Self> {
        let path = pack_dir.join(VERSION_PROPERTIES_FILE);
        if !path.exists() {
            debug!("Feature pack '{}' has no {}", feature_pack, VERSION_PROPERTIES_FILE);
            return Ok(Self::new(feature_pack));
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read version properties: {}", path.display()))?;
        let entries = parse_properties(&content, &path.display().to_string())?;
        debug!("Loaded {} version properties for '{}'", entries.len(), feature_pack);
        Ok(Self::from_entries(feature_pack, entries))
    }

    pub fn feature_pack(&self) -> &str {
        &self.feature_pack
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// The value the feature pack declared for an overridden key.
    pub fn declared(&self, key: &str) -> Option<&str> {
        self.declared.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge overrides, replacing values of keys this pack declares.
    ///
    /// Returns how many entries were replaced.
    pub fn apply_overrides(&mut self, overrides: &VersionOverrides) -> usize {
        let mut replaced = 0;
        for (key, value) in overrides.iter() {
            if let Some(current) = self.entries.get_mut(key) {
                if current != value {
                    debug!("Overriding {} in '{}': {} -> {}", key, self.feature_pack, current, value);
                    self.declared.entry(key.to_string()).or_insert_with(|| current.clone());
                    *current = value.to_string();
                }
                replaced += 1;
            }
        }
        replaced
    }
}

/// Externally supplied version overrides: `group:artifact` to `group:artifact:version`.
#[derive(Debug, Clone, Default)]
pub struct VersionOverrides {
    entries: BTreeMap<String, String>,
}

impl VersionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The forced version for `key`, i.e. the third segment of the override value.
    ///
    /// A bare version (no colon) is accepted as well.
    pub fn forced_version(&self, key: &str) -> Option<&str> {
        let value = self.get(key)?;
        if value.contains(':') {
            value.split(':').nth(2).filter(|v| !v.is_empty())
        } else {
            Some(value)
        }
    }

    /// Fail with [`FpkitError::UnknownOverride`] for the first key no feature pack declares.
    pub fn validate<'a, I>(&self, packs: I) -> Result<(), FpkitError>
    where
        I: IntoIterator<Item = &'a VersionProperties> + Clone,
    {
        for key in self.entries.keys() {
            let known = packs.clone().into_iter().any(|props| props.contains_key(key));
            if !known {
                return Err(FpkitError::UnknownOverride {
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Whether a feature pack's artifacts must be resolved through a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelResolutionMode {
    #[default]
    NotRequired,
    Required,
    RequiredFpOnly,
}

impl ChannelResolutionMode {
    /// Read `channel.properties` from a feature pack directory.
    ///
    /// A missing resource or a resource without the `resolution` key means
    /// [`ChannelResolutionMode::NotRequired`].
    pub fn load(pack_dir: &Path) -> Result<Self> {
        let path = pack_dir.join(CHANNEL_PROPERTIES_FILE);
        if !path.exists() {
            return Ok(Self::NotRequired);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read channel properties: {}", path.display()))?;
        let entries = parse_properties(&content, &path.display().to_string())?;
        match entries.into_iter().find(|(k, _)| k == CHANNEL_RESOLUTION_KEY) {
            Some((_, value)) => Ok(value.parse()?),
            None => Ok(Self::NotRequired),
        }
    }

    /// Requirement applied to every artifact of a pack in this mode.
    pub fn requirement(self) -> ChannelRequirement {
        match self {
            Self::NotRequired => ChannelRequirement::default(),
            Self::Required => ChannelRequirement {
                artifacts: true,
                feature_pack: true,
            },
            Self::RequiredFpOnly => ChannelRequirement {
                artifacts: false,
                feature_pack: true,
            },
        }
    }
}

impl FromStr for ChannelResolutionMode {
    type Err = FpkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOT_REQUIRED" => Ok(Self::NotRequired),
            "REQUIRED" => Ok(Self::Required),
            "REQUIRED_FP_ONLY" => Ok(Self::RequiredFpOnly),
            other => Err(FpkitError::ConfigError {
                message: format!(
                    "unknown channel resolution mode '{other}', expected NOT_REQUIRED, REQUIRED or REQUIRED_FP_ONLY"
                ),
            }),
        }
    }
}

impl fmt::Display for ChannelResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotRequired => "NOT_REQUIRED",
            Self::Required => "REQUIRED",
            Self::RequiredFpOnly => "REQUIRED_FP_ONLY",
        };
        f.write_str(name)
    }
}
