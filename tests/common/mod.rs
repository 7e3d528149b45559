//! Shared fixtures for fpkit integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use fpkit::test_utils::{FeaturePackFixture, MavenRepoFixture, ModuleTemplateFixture};

/// A scratch directory holding a local Maven repository, feature packs and a run configuration.
pub struct TestWorkspace {
    pub dir: TempDir,
    pub repo: MavenRepoFixture,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        fpkit::test_utils::init_test_logging(None);
        Ok(Self {
            dir: TempDir::new()?,
            repo: MavenRepoFixture::new()?,
        })
    }

    /// Workspace with one pack `core` declaring `org.jboss:foo:1.0.0` and one module using it.
    pub fn with_core_pack() -> Result<(Self, FeaturePackFixture)> {
        let ws = Self::new()?;
        ws.repo.add("org.jboss:foo:1.0.0")?;
        let core = ws.pack("core", &["org.jboss:foo:1.0.0"])?;
        core.module("org/jboss/foo/main", &ModuleTemplateFixture::single("org.jboss.foo", "${org.jboss:foo}").content)?;
        Ok((ws, core))
    }

    pub fn pack(&self, name: &str, versions: &[&str]) -> Result<FeaturePackFixture> {
        FeaturePackFixture::create(&self.dir.path().join("packs"), name, versions)
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn staging(&self) -> PathBuf {
        self.path("server")
    }

    /// Write `fpkit.toml`: `body` followed by the local repository and one
    /// `[[feature-packs]]` entry per pack. Relative paths in `body` resolve
    /// against the workspace.
    pub fn write_config(&self, body: &str, packs: &[&FeaturePackFixture]) -> Result<PathBuf> {
        let mut content = format!("local-repository = '{}'\n{body}\n", self.repo.root().display());
        for pack in packs {
            content.push_str(&format!("\n[[feature-packs]]\nname = '{}'\ndir = '{}'\n", pack.name, pack.dir.display()));
        }
        let path = self.path("fpkit.toml");
        fs::write(&path, content)?;
        Ok(path)
    }
}

pub fn read(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}
