//! Resolution policy: from a symbolic reference to a versioned artifact.
//!
//! This is the first half of artifact resolution. It turns the text found in
//! a template (`${g:a?jandex}` or a literal `g:a[:v...]`) into a
//! [`MavenArtifact`] carrying a concrete version or range, applying the feature
//! pack's version properties and the run's overrides. The second half,
//! fetching content, is the resolver adapter's job.

use tracing::debug;

use super::{Placeholder, VersionOverrides, VersionProperties};
use crate::core::FpkitError;
use crate::maven::MavenArtifact;

/// Channel constraints applying to one resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChannelRequirement {
    /// Artifacts must be resolved through a channel; no fallback to direct coordinates.
    pub artifacts: bool,
    /// The feature pack itself must come from a channel. The resolver has to
    /// support channels, but artifacts may still fall back to direct coordinates.
    pub feature_pack: bool,
}

impl ChannelRequirement {
    /// Whether the resolver must be channel-capable at all.
    pub fn needs_channel(&self) -> bool {
        self.artifacts || self.feature_pack
    }
}

/// A reference after the version policy ran, ready for the resolver.
#[derive(Debug, Clone)]
pub struct ArtifactReference {
    pub artifact: MavenArtifact,
    /// The placeholder the reference was written as, if any.
    pub placeholder: Option<Placeholder>,
}

impl ArtifactReference {
    pub fn is_jandex(&self) -> bool {
        self.placeholder.as_ref().is_some_and(Placeholder::is_jandex)
    }
}

/// Apply version properties and overrides to a reference.
///
/// Returns `Ok(None)` when the version is unknown and `optional` is set; an
/// unknown version of a mandatory reference is [`FpkitError::VersionNotFound`].
/// Overridden artifacts remember the version the feature pack declared.
pub fn resolve_reference(
    reference: &str,
    props: &VersionProperties,
    overrides: &VersionOverrides,
    optional: bool,
) -> Result<Option<ArtifactReference>, FpkitError> {
    let placeholder = Placeholder::parse(reference);

    let mut artifact = match &placeholder {
        Some(placeholder) => match lookup(&placeholder.key, props)? {
            Some(artifact) => artifact,
            None if optional => {
                debug!("Skipping optional artifact {} unknown to '{}'", placeholder.key, props.feature_pack());
                return Ok(None);
            }
            None => {
                return Err(FpkitError::VersionNotFound {
                    key: placeholder.key.clone(),
                    feature_pack: props.feature_pack().to_string(),
                });
            }
        },
        None => {
            let mut artifact: MavenArtifact = reference.parse()?;
            if artifact.version().is_none() && artifact.version_range().is_none() {
                let key = artifact.ga_key();
                match lookup(&key, props)? {
                    Some(known) => artifact = known,
                    None if optional => return Ok(None),
                    None => {
                        return Err(FpkitError::VersionNotFound {
                            key,
                            feature_pack: props.feature_pack().to_string(),
                        });
                    }
                }
            }
            artifact
        }
    };

    if let Some(forced) = overrides.forced_version(&artifact.ga_key())
        && artifact.version() != Some(forced)
    {
        debug!("Forcing {} to overridden version {}", artifact.ga_key(), forced);
        artifact.apply_override(forced);
    }

    Ok(Some(ArtifactReference {
        artifact,
        placeholder,
    }))
}

/// Look `key` up in `props`, restoring the declared version of overridden entries.
fn lookup(key: &str, props: &VersionProperties) -> Result<Option<MavenArtifact>, FpkitError> {
    let Some(value) = props.get(key) else {
        return Ok(None);
    };
    let merged: MavenArtifact = value.parse()?;

    let Some(declared) = props.declared(key) else {
        return Ok(Some(merged));
    };
    let mut artifact: MavenArtifact = declared.parse()?;
    if let Some(version) = merged.version() {
        artifact.apply_override(version);
    }
    Ok(Some(artifact.with_classifier(merged.classifier().to_string()).with_extension(merged.extension().to_string())))
}
