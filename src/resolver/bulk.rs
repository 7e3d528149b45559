//! Bulk resolution cache.

use std::collections::HashMap;

use crate::maven::{ArtifactKey, MavenArtifact};

/// A pre-resolved artifact and where it came from.
#[derive(Debug, Clone)]
pub struct CachedArtifact {
    pub artifact: MavenArtifact,
    /// Resolved through a channel rather than by direct coordinates.
    pub from_channel: bool,
}

/// Resolved artifacts keyed by the identity they were requested with.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    entries: HashMap<ArtifactKey, CachedArtifact>,
}

impl ArtifactCache {
    pub fn get(&self, key: &ArtifactKey) -> Option<&CachedArtifact> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: ArtifactKey, artifact: MavenArtifact, from_channel: bool) {
        self.entries.insert(
            key,
            CachedArtifact {
                artifact,
                from_channel,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
