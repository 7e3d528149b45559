//! Test fixtures for repositories, feature packs and module templates

use anyhow::{Context, Result};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use super::FakeResolver;
use crate::maven::{MavenArtifact, RepositoryLayout};
use crate::resolver::ArtifactResolver;

/// Write a zip archive with the given `(name, content)` entries.
pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}

/// Read every file entry of a zip archive as `(name, content)`.
pub fn read_jar_entries(path: &Path) -> Result<Vec<(String, String)>> {
    let file = fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        entries.push((entry.name().to_string(), content));
    }
    Ok(entries)
}

/// A temporary Maven2 repository.
pub struct MavenRepoFixture {
    dir: TempDir,
    layout: RepositoryLayout,
}

impl MavenRepoFixture {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let layout = RepositoryLayout::new(dir.path());
        Ok(Self {
            dir,
            layout,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> &RepositoryLayout {
        &self.layout
    }

    /// Add `g:a:v[:classifier]` with a single marker entry and a POM.
    pub fn add(&self, coords: &str) -> Result<PathBuf> {
        let marker = format!("marker for {coords}");
        self.add_jar(coords, &[("META-INF/fpkit-marker.txt", marker.as_bytes())])
    }

    /// Add `g:a:v[:classifier]` with the given archive entries and a POM.
    pub fn add_jar(&self, coords: &str, entries: &[(&str, &[u8])]) -> Result<PathBuf> {
        let artifact: MavenArtifact = coords.parse()?;
        let version = artifact.version().context("fixture coordinates need a version")?;
        let path = self.layout.artifact_path_for_version(&artifact, version);
        write_jar(&path, entries)?;

        let pom = self.layout.pom_path_for_version(&artifact, version);
        fs::write(
            &pom,
            format!(
                "<project><groupId>{}</groupId><artifactId>{}</artifactId><version>{version}</version></project>\n",
                artifact.group_id(),
                artifact.artifact_id()
            ),
        )?;
        Ok(path)
    }

    /// Add `coords` and return it resolved.
    pub fn resolved(&self, coords: &str) -> Result<MavenArtifact> {
        self.add(coords)?;
        let mut artifact: MavenArtifact = coords.parse()?;
        self.resolver().resolve(&mut artifact)?;
        Ok(artifact)
    }

    /// A resolver over this repository without channel support.
    pub fn resolver(&self) -> FakeResolver {
        FakeResolver::new(self.dir.path())
    }
}

/// A feature-pack directory under construction.
pub struct FeaturePackFixture {
    pub name: String,
    pub dir: PathBuf,
}

impl FeaturePackFixture {
    /// Create `root/name` with an `artifact-versions.properties` listing `versions`.
    ///
    /// Each entry is written as `g:a=g:a:v`.
    pub fn create(root: &Path, name: &str, versions: &[&str]) -> Result<Self> {
        let dir = root.join(name);
        fs::create_dir_all(&dir)?;
        let mut properties = String::from("# generated by the test fixture\n");
        for coords in versions {
            let artifact: MavenArtifact = coords.parse()?;
            properties.push_str(&format!("{}={}\n", artifact.ga_key(), coords));
        }
        fs::write(dir.join(crate::constants::VERSION_PROPERTIES_FILE), properties)?;
        Ok(Self {
            name: name.to_string(),
            dir,
        })
    }

    /// Write `modules/<module_path>/module.xml`.
    pub fn module(&self, module_path: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.join("modules").join(module_path).join("module.xml");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Write `shaded/<name>.xml`.
    pub fn shaded(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.join("shaded").join(format!("{name}.xml"));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Write `channel.properties` with the given resolution mode.
    pub fn channel_mode(&self, mode: &str) -> Result<()> {
        fs::write(self.dir.join(crate::constants::CHANNEL_PROPERTIES_FILE), format!("resolution={mode}\n"))?;
        Ok(())
    }
}

/// Sample module templates.
#[derive(Clone, Debug)]
pub struct ModuleTemplateFixture {
    pub content: String,
}

impl ModuleTemplateFixture {
    /// Module with one placeholder artifact.
    pub fn single(module: &str, placeholder: &str) -> Self {
        Self {
            content: format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- module for {module} -->
<module xmlns="urn:jboss:module:1.9" name="{module}">
    <resources>
        <artifact name="{placeholder}"/>
    </resources>
    <dependencies>
        <module name="java.logging"/>
    </dependencies>
</module>
"#
            ),
        }
    }

    /// Module listing several artifacts.
    pub fn multi(module: &str, placeholders: &[&str]) -> Self {
        let artifacts: String =
            placeholders.iter().map(|p| format!("        <artifact name=\"{p}\"/>\n")).collect();
        Self {
            content: format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<module xmlns="urn:jboss:module:1.9" name="{module}">
    <resources>
{artifacts}    </resources>
</module>
"#
            ),
        }
    }

    /// Module whose root `version` attribute is a placeholder.
    pub fn versioned(module: &str, placeholder: &str) -> Self {
        Self {
            content: format!(
                r#"<module xmlns="urn:jboss:module:1.9" name="{module}" version="{placeholder}">
    <resources>
        <artifact name="{placeholder}"/>
    </resources>
</module>
"#
            ),
        }
    }

    /// Alias descriptor with no resources.
    pub fn alias(name: &str, target: &str) -> Self {
        Self {
            content: format!(
                r#"<module-alias xmlns="urn:jboss:module:1.9" name="{name}" target-name="{target}"/>
"#
            ),
        }
    }

    /// Descriptor that is neither a module nor an alias.
    pub fn resource_root_only() -> Self {
        Self {
            content: r#"<?xml version="1.0" encoding="UTF-8"?>
<resources   xmlns="urn:jboss:module:1.9">
    <resource-root path="${not.resolved}"/>
</resources>
"#
            .to_string(),
        }
    }
}
