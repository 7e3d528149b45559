use super::*;
use crate::core::FpkitError;
use crate::installer::ArtifactInstaller;
use crate::maven::MavenArtifact;
use crate::provisioning::{ProvisioningContext, ProvisioningContextBuilder};
use crate::test_utils::{FakeResolver, MavenRepoFixture, ModuleTemplateFixture, RecordingSchemaProcessor};
use crate::versions::{ChannelResolutionMode, VersionProperties};
use anyhow::Result;
use std::fs;
use tempfile::TempDir;

const PACK: &str = "core";

fn context<'r>(resolver: &'r FakeResolver, staging: &Path, versions: &[&str]) -> Result<ProvisioningContext<'r>> {
    let entries: Vec<(String, String)> = versions
        .iter()
        .map(|coords| -> Result<(String, String)> {
            let artifact: MavenArtifact = coords.parse()?;
            Ok((artifact.ga_key(), coords.to_string()))
        })
        .collect::<Result<_>>()?;
    ProvisioningContextBuilder::new(staging, resolver)
        .pack(VersionProperties::from_entries(PACK, entries), ChannelResolutionMode::NotRequired)
        .build()
}

fn write_template(dir: &Path, content: &str) -> Result<PathBuf> {
    let path = dir.join("templates/org/jboss/foo/main/module.xml");
    fs::create_dir_all(path.parent().unwrap())?;
    fs::write(&path, content)?;
    Ok(path)
}

#[test]
fn test_parse_finds_root_and_artifacts() -> Result<()> {
    let fixture = ModuleTemplateFixture::multi("org.jboss.foo", &["${org.jboss:foo}", "org.jboss:bar:1.0"]);
    let template = ModuleTemplate::from_bytes("module.xml", fixture.content.into_bytes())?;

    assert_eq!(template.kind(), TemplateKind::Module);
    assert_eq!(template.artifact_count(), 2);
    assert_eq!(template.artifact_names().collect::<Vec<_>>(), vec!["${org.jboss:foo}", "org.jboss:bar:1.0"]);
    assert_eq!(template.root_version(), None);
    Ok(())
}

#[test]
fn test_unmodified_template_serializes_to_original_bytes() -> Result<()> {
    let fixture = ModuleTemplateFixture::single("org.jboss.foo", "${org.jboss:foo}");
    let template = ModuleTemplate::from_bytes("module.xml", fixture.content.clone().into_bytes())?;

    assert!(!template.is_modified());
    assert_eq!(template.to_bytes()?, fixture.content.into_bytes());
    Ok(())
}

#[test]
fn test_resource_root_rewrite_preserves_surroundings() -> Result<()> {
    let fixture = ModuleTemplateFixture::single("org.jboss.foo", "${org.jboss:foo}");
    let mut template = ModuleTemplate::from_bytes("module.xml", fixture.content.into_bytes())?;

    template.set_resource_root(0, "foo-1.0.jar")?;
    let output = String::from_utf8(template.to_bytes()?)?;

    assert!(output.contains(r#"<resource-root path="foo-1.0.jar"/>"#), "{output}");
    assert!(!output.contains("<artifact"));
    assert!(output.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(output.contains("<!-- module for org.jboss.foo -->"));
    assert!(output.contains(r#"<module name="java.logging"/>"#));
    Ok(())
}

#[test]
fn test_resource_root_rewrite_renames_closing_tag() -> Result<()> {
    let content = r#"<module xmlns="urn:jboss:module:1.9" name="org.jboss.foo">
    <resources>
        <artifact name="${org.jboss:foo}">
            <filter><exclude path="META-INF"/></filter>
        </artifact>
    </resources>
</module>"#;
    let mut template = ModuleTemplate::from_bytes("module.xml", content.as_bytes().to_vec())?;

    template.set_resource_root(0, "foo-1.0.jar")?;
    let output = String::from_utf8(template.to_bytes()?)?;

    assert!(output.contains(r#"<resource-root path="foo-1.0.jar">"#));
    assert!(output.contains("</resource-root>"));
    assert!(output.contains(r#"<exclude path="META-INF"/>"#));
    Ok(())
}

#[test]
fn test_artifact_name_rewrite_keeps_element() -> Result<()> {
    let fixture = ModuleTemplateFixture::single("org.jboss.foo", "${org.jboss:foo?jandex}");
    let mut template = ModuleTemplate::from_bytes("module.xml", fixture.content.into_bytes())?;

    template.set_artifact_name(0, "org.jboss:foo:1.0-ee9")?;
    let output = String::from_utf8(template.to_bytes()?)?;

    assert!(output.contains(r#"<artifact name="org.jboss:foo:1.0-ee9"/>"#));
    Ok(())
}

#[test]
fn test_artifacts_outside_resources_are_ignored() -> Result<()> {
    let content = r#"<module name="x"><artifact name="a:b:1"/><resources><artifact name="c:d:1"/></resources></module>"#;
    let template = ModuleTemplate::from_bytes("module.xml", content.as_bytes().to_vec())?;

    assert_eq!(template.artifact_names().collect::<Vec<_>>(), vec!["c:d:1"]);
    Ok(())
}

#[test]
fn test_artifact_without_name_is_rejected() {
    let content = r#"<module name="x"><resources><artifact/></resources></module>"#;
    let err = ModuleTemplate::from_bytes("broken.xml", content.as_bytes().to_vec()).unwrap_err();

    assert!(matches!(err, FpkitError::TemplateError { .. }));
}

#[test]
fn test_template_cache_parses_once_and_take_removes() -> Result<()> {
    let temp = TempDir::new()?;
    let path = write_template(temp.path(), &ModuleTemplateFixture::single("m", "${a:b}").content)?;
    let mut cache = TemplateCache::default();

    assert_eq!(cache.get_or_parse(&path)?.artifact_count(), 1);
    fs::write(&path, "<not-a-module/>")?;
    assert_eq!(cache.get_or_parse(&path)?.artifact_count(), 1, "cached value is reused");

    let taken = cache.take(&path)?;
    assert_eq!(taken.kind(), TemplateKind::Module);
    assert!(cache.is_empty());
    Ok(())
}

#[test]
fn test_fat_processing_installs_next_to_descriptor() -> Result<()> {
    let repo = MavenRepoFixture::new()?;
    repo.add("org.jboss:foo:1.0.0")?;
    let resolver = repo.resolver();
    let temp = TempDir::new()?;
    let staging = temp.path().join("server");
    let mut ctx = context(&resolver, &staging, &["org.jboss:foo:1.0.0"])?;
    let source = write_template(temp.path(), &ModuleTemplateFixture::single("org.jboss.foo", "${org.jboss:foo}").content)?;
    let target = staging.join("modules/org/jboss/foo/main/module.xml");

    let installer = ArtifactInstaller::simple();
    let mut processor = TemplateProcessor::new(&installer, OutputMode::Fat);
    let outcome = processor.process(&mut ctx, PACK, &source, &target)?;

    let output = fs::read_to_string(&target)?;
    assert_eq!(outcome.artifacts, 1);
    assert!(output.contains(r#"<resource-root path="foo-1.0.0.jar"/>"#));
    assert!(target.with_file_name("foo-1.0.0.jar").is_file());
    Ok(())
}

#[test]
fn test_thin_processing_references_coordinates_without_copying() -> Result<()> {
    let repo = MavenRepoFixture::new()?;
    repo.add("org.jboss:foo:1.0.0:linux")?;
    let resolver = repo.resolver();
    let temp = TempDir::new()?;
    let staging = temp.path().join("server");
    let mut ctx = context(&resolver, &staging, &["org.jboss:foo:1.0.0:linux"])?;
    let source =
        write_template(temp.path(), &ModuleTemplateFixture::single("org.jboss.foo", "${org.jboss:foo::linux}").content)?;
    let target = staging.join("modules/org/jboss/foo/main/module.xml");

    let installer = ArtifactInstaller::simple();
    let mut processor = TemplateProcessor::new(&installer, OutputMode::Thin);
    processor.process(&mut ctx, PACK, &source, &target)?;

    let output = fs::read_to_string(&target)?;
    assert!(output.contains(r#"<artifact name="org.jboss:foo:1.0.0:linux"/>"#), "{output}");
    let staged: Vec<_> = fs::read_dir(target.parent().unwrap())?.collect();
    assert_eq!(staged.len(), 1, "only module.xml is staged");
    Ok(())
}

#[test]
fn test_non_module_template_is_copied_verbatim() -> Result<()> {
    let repo = MavenRepoFixture::new()?;
    let resolver = repo.resolver();
    let temp = TempDir::new()?;
    let staging = temp.path().join("server");
    let mut ctx = context(&resolver, &staging, &[])?;
    let fixture = ModuleTemplateFixture::resource_root_only();
    let source = write_template(temp.path(), &fixture.content)?;
    let target = staging.join("modules/x/module.xml");

    let installer = ArtifactInstaller::simple();
    let outcome = TemplateProcessor::new(&installer, OutputMode::Fat).process(&mut ctx, PACK, &source, &target)?;

    assert!(outcome.copied_verbatim);
    assert_eq!(fs::read(&target)?, fixture.content.into_bytes());
    Ok(())
}

#[test]
fn test_optional_unknown_artifact_is_skipped() -> Result<()> {
    let repo = MavenRepoFixture::new()?;
    repo.add("org.jboss:foo:1.0.0")?;
    let resolver = repo.resolver();
    let temp = TempDir::new()?;
    let staging = temp.path().join("server");
    let mut ctx = context(&resolver, &staging, &["org.jboss:foo:1.0.0"])?;
    let fixture = ModuleTemplateFixture::multi("org.jboss.foo", &["${org.jboss:foo}", "${org.jboss:extra?optional}"]);
    let source = write_template(temp.path(), &fixture.content)?;
    let target = staging.join("modules/org/jboss/foo/main/module.xml");

    let installer = ArtifactInstaller::simple();
    let outcome = TemplateProcessor::new(&installer, OutputMode::Fat).process(&mut ctx, PACK, &source, &target)?;

    let output = fs::read_to_string(&target)?;
    assert_eq!(outcome.artifacts, 1);
    assert_eq!(outcome.skipped, 1);
    assert!(output.contains(r#"<artifact name="${org.jboss:extra?optional}"/>"#));
    assert_eq!(ctx.installed(), 1);
    Ok(())
}

#[test]
fn test_unknown_mandatory_artifact_fails() -> Result<()> {
    let repo = MavenRepoFixture::new()?;
    let resolver = repo.resolver();
    let temp = TempDir::new()?;
    let staging = temp.path().join("server");
    let mut ctx = context(&resolver, &staging, &[])?;
    let source = write_template(temp.path(), &ModuleTemplateFixture::single("m", "${org.jboss:missing}").content)?;

    let installer = ArtifactInstaller::simple();
    let err = TemplateProcessor::new(&installer, OutputMode::Fat)
        .process(&mut ctx, PACK, &source, &staging.join("module.xml"))
        .unwrap_err();

    assert!(matches!(err.downcast_ref::<FpkitError>(), Some(FpkitError::VersionNotFound { .. })));
    Ok(())
}

#[test]
fn test_root_version_placeholder_is_resolved() -> Result<()> {
    let repo = MavenRepoFixture::new()?;
    repo.add("org.jboss:foo:1.2.3")?;
    let resolver = repo.resolver();
    let temp = TempDir::new()?;
    let staging = temp.path().join("server");
    let mut ctx = context(&resolver, &staging, &["org.jboss:foo:1.2.3"])?;
    let source = write_template(temp.path(), &ModuleTemplateFixture::versioned("org.jboss.foo", "${org.jboss:foo}").content)?;
    let target = staging.join("module.xml");

    let installer = ArtifactInstaller::simple();
    TemplateProcessor::new(&installer, OutputMode::Thin).process(&mut ctx, PACK, &source, &target)?;

    let output = fs::read_to_string(&target)?;
    assert!(output.contains(r#"version="1.2.3""#), "{output}");
    assert!(output.contains(r#"name="org.jboss:foo:1.2.3""#));
    Ok(())
}

#[test]
fn test_jandex_option_is_reported() -> Result<()> {
    let repo = MavenRepoFixture::new()?;
    repo.add("org.jboss:foo:1.0.0")?;
    let resolver = repo.resolver();
    let temp = TempDir::new()?;
    let staging = temp.path().join("server");
    let mut ctx = context(&resolver, &staging, &["org.jboss:foo:1.0.0"])?;
    let source = write_template(temp.path(), &ModuleTemplateFixture::single("m", "${org.jboss:foo?jandex}").content)?;

    let installer = ArtifactInstaller::simple();
    let outcome = TemplateProcessor::new(&installer, OutputMode::Fat).process(
        &mut ctx,
        PACK,
        &source,
        &staging.join("m/module.xml"),
    )?;

    assert_eq!(outcome.jandex, vec!["org.jboss:foo:1.0.0".to_string()]);
    Ok(())
}

#[test]
fn test_schema_hook_fires_once_per_artifact_of_schema_group() -> Result<()> {
    let repo = MavenRepoFixture::new()?;
    repo.add("org.wildfly:wildfly-ee:30.0")?;
    repo.add("org.jboss:foo:1.0.0")?;
    let resolver = repo.resolver();
    let temp = TempDir::new()?;
    let staging = temp.path().join("server");
    let mut ctx = context(&resolver, &staging, &["org.wildfly:wildfly-ee:30.0", "org.jboss:foo:1.0.0"])?;
    let fixture = ModuleTemplateFixture::multi("org.wildfly.ee", &["${org.wildfly:wildfly-ee}", "${org.jboss:foo}"]);
    let source = write_template(temp.path(), &fixture.content)?;

    let installer = ArtifactInstaller::simple();
    let mut hook = RecordingSchemaProcessor::default();
    {
        let mut processor =
            TemplateProcessor::new(&installer, OutputMode::Thin).with_schema_hook(["org.wildfly"], &mut hook);
        processor.process(&mut ctx, PACK, &source, &staging.join("module.xml"))?;
    }

    assert_eq!(hook.calls.len(), 1);
    assert_eq!(hook.calls[0].0, "org.wildfly");
    assert!(hook.calls[0].1.is_file());
    Ok(())
}
