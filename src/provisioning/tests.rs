use super::*;
use crate::config::RecorderConfig;
use crate::template::OutputMode;
use crate::test_utils::{
    FakeResolver, FakeTransformer, FeaturePackFixture, MavenRepoFixture, ModuleTemplateFixture,
    RecordingSchemaProcessor,
};
use anyhow::Result;
use std::fs;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    repo: MavenRepoFixture,
}

impl Workspace {
    fn new(artifacts: &[&str]) -> Result<Self> {
        let repo = MavenRepoFixture::new()?;
        for coords in artifacts {
            repo.add(coords)?;
        }
        Ok(Self {
            dir: TempDir::new()?,
            repo,
        })
    }

    fn pack(&self, name: &str, versions: &[&str]) -> Result<FeaturePackFixture> {
        FeaturePackFixture::create(&self.dir.path().join("packs"), name, versions)
    }

    fn staging(&self) -> PathBuf {
        self.dir.path().join("server")
    }

    fn config(&self, packs: &[&FeaturePackFixture]) -> ProvisioningConfig {
        let mut config = ProvisioningConfig::new(self.staging());
        config.feature_packs = packs.iter().map(|pack| pack_config(pack)).collect();
        config
    }
}

fn pack_config(pack: &FeaturePackFixture) -> FeaturePackConfig {
    FeaturePackConfig {
        name: pack.name.clone(),
        dir: pack.dir.clone(),
        transformable: true,
    }
}

fn run(config: &ProvisioningConfig, resolver: &FakeResolver) -> Result<ProvisioningReport> {
    let mut schemas = RecordingSchemaProcessor::default();
    Provisioner::new(config).with_progress(false).run(resolver, None, &mut schemas)
}

#[test]
fn test_fat_run_installs_and_records() -> Result<()> {
    let ws = Workspace::new(&["org.jboss:foo:1.0.0"])?;
    let core = ws.pack("core", &["org.jboss:foo:1.0.0"])?;
    core.module("org/jboss/foo/main", &ModuleTemplateFixture::single("org.jboss.foo", "${org.jboss:foo}").content)?;
    core.module("org/jboss/alias/main", &ModuleTemplateFixture::alias("org.jboss.alias", "org.jboss.foo").content)?;
    core.module("org/jboss/other/main", &ModuleTemplateFixture::resource_root_only().content)?;

    let mut config = ws.config(&[&core]);
    let manifest = ws.dir.path().join("artifacts.txt");
    config.recorder = Some(RecorderConfig {
        manifest: manifest.clone(),
        cache_dir: None,
        fail_on_error: true,
    });

    let report = run(&config, &ws.repo.resolver())?;

    let module_dir = ws.staging().join("modules/org/jboss/foo/main");
    assert!(module_dir.join("foo-1.0.0.jar").is_file());
    let module = fs::read_to_string(module_dir.join("module.xml"))?;
    assert!(module.contains(r#"<resource-root path="foo-1.0.0.jar"/>"#));
    assert!(module.contains("<!-- module for org.jboss.foo -->"));

    let alias = fs::read_to_string(ws.staging().join("modules/org/jboss/alias/main/module.xml"))?;
    assert_eq!(alias, ModuleTemplateFixture::alias("org.jboss.alias", "org.jboss.foo").content);
    let other = fs::read_to_string(ws.staging().join("modules/org/jboss/other/main/module.xml"))?;
    assert!(other.contains("${not.resolved}"));

    assert_eq!(report.templates, 3);
    assert_eq!(report.copied_verbatim, 1);
    assert_eq!(report.artifacts, 1);
    assert_eq!(report.recorded, 1);
    assert_eq!(report.resolved_versions.get("version.org.jboss.foo").map(String::as_str), Some("1.0.0"));

    let lines = fs::read_to_string(&manifest)?;
    let fields: Vec<&str> = lines.trim_end().split("::").collect();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0], "org.jboss:foo:1.0.0");
    assert_eq!(fields[2], "modules/org/jboss/foo/main/foo-1.0.0.jar");
    Ok(())
}

#[test]
fn test_thin_run_populates_generated_repository() -> Result<()> {
    let ws = Workspace::new(&["org.jboss:foo:1.0.0"])?;
    let core = ws.pack("core", &["org.jboss:foo:1.0.0"])?;
    core.module("org/jboss/foo/main", &ModuleTemplateFixture::single("org.jboss.foo", "${org.jboss:foo}").content)?;

    let generated = ws.dir.path().join("generated");
    fs::create_dir_all(generated.join("stale"))?;
    let mut config = ws.config(&[&core]);
    config.mode = OutputMode::Thin;
    config.generated_repository = Some(generated.clone());

    run(&config, &ws.repo.resolver())?;

    let module_dir = ws.staging().join("modules/org/jboss/foo/main");
    let module = fs::read_to_string(module_dir.join("module.xml"))?;
    assert!(module.contains(r#"<artifact name="org.jboss:foo:1.0.0"/>"#));
    assert!(!module_dir.join("foo-1.0.0.jar").exists());

    assert!(!generated.join("stale").exists());
    assert!(generated.join("org/jboss/foo/1.0.0/foo-1.0.0.jar").is_file());
    assert!(generated.join("org/jboss/foo/1.0.0/foo-1.0.0.pom").is_file());
    Ok(())
}

#[test]
fn test_unknown_override_fails_before_anything_is_written() -> Result<()> {
    let ws = Workspace::new(&["org.jboss:foo:1.0.0"])?;
    let core = ws.pack("core", &["org.jboss:foo:1.0.0"])?;
    core.module("org/jboss/foo/main", &ModuleTemplateFixture::single("org.jboss.foo", "${org.jboss:foo}").content)?;

    let mut config = ws.config(&[&core]);
    config.overrides.insert("org.jboss:absent".to_string(), "org.jboss:absent:1.0".to_string());
    let manifest = ws.dir.path().join("artifacts.txt");
    config.recorder = Some(RecorderConfig {
        manifest: manifest.clone(),
        cache_dir: None,
        fail_on_error: false,
    });

    let err = run(&config, &ws.repo.resolver()).unwrap_err();

    assert!(matches!(err.downcast_ref::<FpkitError>(), Some(FpkitError::UnknownOverride { key }) if key == "org.jboss:absent"));
    assert!(!ws.staging().exists());
    assert!(!manifest.exists());
    Ok(())
}

#[test]
fn test_override_changes_installed_version() -> Result<()> {
    let ws = Workspace::new(&["org.jboss:foo:1.0.0", "org.jboss:foo:2.0.0"])?;
    let core = ws.pack("core", &["org.jboss:foo:1.0.0"])?;
    core.module("org/jboss/foo/main", &ModuleTemplateFixture::single("org.jboss.foo", "${org.jboss:foo}").content)?;

    let mut config = ws.config(&[&core]);
    config.overrides.insert("org.jboss:foo".to_string(), "org.jboss:foo:2.0.0".to_string());

    run(&config, &ws.repo.resolver())?;

    assert!(ws.staging().join("modules/org/jboss/foo/main/foo-2.0.0.jar").is_file());
    Ok(())
}

#[test]
fn test_bulk_resolution_serves_templates_from_cache() -> Result<()> {
    let ws = Workspace::new(&["org.jboss:foo:1.0.0", "org.jboss:bar:1.0.0"])?;
    let core = ws.pack("core", &["org.jboss:foo:1.0.0", "org.jboss:bar:1.0.0"])?;
    core.module("org/jboss/foo/main", &ModuleTemplateFixture::single("org.jboss.foo", "${org.jboss:foo}").content)?;
    core.module(
        "org/jboss/both/main",
        &ModuleTemplateFixture::multi("org.jboss.both", &["${org.jboss:foo}", "${org.jboss:bar}"]).content,
    )?;

    let mut config = ws.config(&[&core]);
    config.bulk_resolution = true;
    let resolver = ws.repo.resolver();

    let report = run(&config, &resolver)?;

    assert_eq!(report.artifacts, 3);
    assert_eq!(resolver.batch_calls(), 1);
    assert_eq!(resolver.resolve_calls(), 0);
    Ok(())
}

#[test]
fn test_non_transformable_pack_bypasses_transformer() -> Result<()> {
    let ws = Workspace::new(&["org.jboss:foo:1.0.0", "org.jboss:bar:1.0.0"])?;
    let core = ws.pack("core", &["org.jboss:foo:1.0.0"])?;
    core.module("org/jboss/foo/main", &ModuleTemplateFixture::single("org.jboss.foo", "${org.jboss:foo}").content)?;
    let legacy = ws.pack("legacy", &["org.jboss:bar:1.0.0"])?;
    legacy.module("org/jboss/bar/main", &ModuleTemplateFixture::single("org.jboss.bar", "${org.jboss:bar}").content)?;

    let mut config = ws.config(&[&core, &legacy]);
    config.transform.enabled = true;
    config.feature_packs[1].transformable = false;
    let transformer = FakeTransformer::new();
    let mut schemas = RecordingSchemaProcessor::default();

    let report = Provisioner::new(&config).with_progress(false).run(&ws.repo.resolver(), Some(&transformer), &mut schemas)?;

    assert!(ws.staging().join("modules/org/jboss/foo/main/foo-1.0.0-ee9.jar").is_file());
    assert!(ws.staging().join("modules/org/jboss/bar/main/bar-1.0.0.jar").is_file());
    assert_eq!(transformer.calls(), vec!["org.jboss:foo:1.0.0"]);
    assert_eq!(report.transformed, 1);
    assert!(report.exclusions.is_empty());
    Ok(())
}

#[test]
fn test_configured_exclusions_and_untouched_artifacts_are_reported() -> Result<()> {
    let ws = Workspace::new(&["org.jboss:foo:1.0.0", "org.jboss:bar:1.0.0"])?;
    let core = ws.pack("core", &["org.jboss:foo:1.0.0", "org.jboss:bar:1.0.0"])?;
    core.module(
        "org/jboss/both/main",
        &ModuleTemplateFixture::multi("org.jboss.both", &["${org.jboss:foo}", "${org.jboss:bar}"]).content,
    )?;

    let mut config = ws.config(&[&core]);
    config.transform.enabled = true;
    config.transform.excluded_artifacts = vec!["org.jboss:foo:1.0.0".to_string()];
    let transformer = FakeTransformer::new().leaving_untouched(["org.jboss:bar"]);
    let mut schemas = RecordingSchemaProcessor::default();

    let report = Provisioner::new(&config).with_progress(false).run(&ws.repo.resolver(), Some(&transformer), &mut schemas)?;

    assert_eq!(transformer.calls(), vec!["org.jboss:bar:1.0.0"]);
    assert_eq!(report.exclusions, vec!["org.jboss:bar:1.0.0", "org.jboss:foo:1.0.0"]);
    assert_eq!(report.transformed, 0);
    Ok(())
}

#[test]
fn test_transformation_without_transformer_is_a_config_error() -> Result<()> {
    let ws = Workspace::new(&["org.jboss:foo:1.0.0"])?;
    let core = ws.pack("core", &["org.jboss:foo:1.0.0"])?;
    let mut config = ws.config(&[&core]);
    config.transform.enabled = true;

    let err = run(&config, &ws.repo.resolver()).unwrap_err();

    assert!(matches!(err.downcast_ref::<FpkitError>(), Some(FpkitError::ConfigError { .. })));
    Ok(())
}

#[test]
fn test_optional_jandex_and_schema_hook() -> Result<()> {
    let ws = Workspace::new(&["org.wildfly:ejb:1.0.0"])?;
    let core = ws.pack("core", &["org.wildfly:ejb:1.0.0"])?;
    core.module(
        "org/wildfly/ejb/main",
        &ModuleTemplateFixture::multi("org.wildfly.ejb", &["${org.wildfly:ejb?jandex}", "${org.wildfly:gone?optional}"])
            .content,
    )?;

    let mut config = ws.config(&[&core]);
    config.schema_groups = vec!["org.wildfly".to_string()];
    let mut schemas = RecordingSchemaProcessor::default();

    let report = Provisioner::new(&config).with_progress(false).run(&ws.repo.resolver(), None, &mut schemas)?;

    assert_eq!(report.artifacts, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.jandex, vec!["org.wildfly:ejb:1.0.0"]);
    assert_eq!(schemas.calls.len(), 1);
    assert_eq!(schemas.calls[0].0, "org.wildfly");
    Ok(())
}

#[test]
fn test_shaded_descriptors_are_assembled() -> Result<()> {
    let ws = Workspace::new(&["org.jboss:client:1.0", "org.jboss:logging:2.0"])?;
    let core = ws.pack("core", &["org.jboss:client:1.0", "org.jboss:logging:2.0"])?;
    core.shaded(
        "client",
        r#"<shaded-model>
    <output>bin/client/jboss-client.jar</output>
    <main-class>org.jboss.client.Main</main-class>
    <shaded-dependencies>
        <dependency>${org.jboss:client}</dependency>
        <dependency>${org.jboss:logging}</dependency>
    </shaded-dependencies>
</shaded-model>
"#,
    )?;

    let report = run(&ws.config(&[&core]), &ws.repo.resolver())?;

    let output = ws.staging().join("bin/client/jboss-client.jar");
    assert_eq!(report.shaded, vec![output.clone()]);
    assert!(output.is_file());
    assert_eq!(report.artifacts, 2);
    Ok(())
}

#[test]
fn test_shade_single_descriptor() -> Result<()> {
    let ws = Workspace::new(&["org.jboss:client:1.0"])?;
    let core = ws.pack("core", &["org.jboss:client:1.0"])?;
    let descriptor = core.shaded(
        "client",
        "<shaded-model><output>client.jar</output><shaded-dependencies><dependency>${org.jboss:client}</dependency></shaded-dependencies></shaded-model>",
    )?;
    let config = ws.config(&[&core]);

    let outcome = Provisioner::new(&config).shade(&ws.repo.resolver(), None, "core", &descriptor)?;
    assert_eq!(outcome.output, ws.staging().join("client.jar"));
    assert_eq!(outcome.dependencies, 1);

    let err = Provisioner::new(&config).shade(&ws.repo.resolver(), None, "missing", &descriptor).unwrap_err();
    assert!(matches!(err.downcast_ref::<FpkitError>(), Some(FpkitError::ConfigError { .. })));
    Ok(())
}

#[test]
fn test_missing_pack_directory_is_rejected() -> Result<()> {
    let ws = Workspace::new(&[])?;
    let mut config = ProvisioningConfig::new(ws.staging());
    config.feature_packs.push(FeaturePackConfig {
        name: "core".to_string(),
        dir: ws.dir.path().join("nowhere"),
        transformable: true,
    });

    let err = run(&config, &ws.repo.resolver()).unwrap_err();

    assert!(matches!(err.downcast_ref::<FpkitError>(), Some(FpkitError::ConfigError { .. })));
    Ok(())
}

#[test]
fn test_bulk_resolution_keeps_required_channel_enforced() -> Result<()> {
    let ws = Workspace::new(&["org.jboss:foo:1.0.0", "org.jboss:bar:1.0.0"])?;
    let core = ws.pack("core", &["org.jboss:foo:1.0.0", "org.jboss:bar:1.0.0"])?;
    core.channel_mode("REQUIRED")?;
    core.module(
        "org/jboss/both/main",
        &ModuleTemplateFixture::multi("org.jboss.both", &["${org.jboss:foo}", "${org.jboss:bar}"]).content,
    )?;

    let mut config = ws.config(&[&core]);
    config.bulk_resolution = true;
    let resolver = FakeResolver::new(ws.repo.root()).with_channel(["org.jboss:foo"]);

    let err = run(&config, &resolver).unwrap_err();

    assert!(err.chain().any(|cause| matches!(
        cause.downcast_ref::<FpkitError>(),
        Some(FpkitError::ArtifactNotFound { coords, .. }) if coords.starts_with("org.jboss:bar")
    )));
    assert_eq!(resolver.batch_calls(), 0);
    assert_eq!(resolver.resolve_calls(), 0);
    Ok(())
}

#[test]
fn test_bulk_resolution_with_feature_pack_only_channel_falls_back() -> Result<()> {
    let ws = Workspace::new(&["org.jboss:foo:1.0.0", "org.jboss:bar:1.0.0"])?;
    let core = ws.pack("core", &["org.jboss:foo:1.0.0", "org.jboss:bar:1.0.0"])?;
    core.channel_mode("REQUIRED_FP_ONLY")?;
    core.module(
        "org/jboss/both/main",
        &ModuleTemplateFixture::multi("org.jboss.both", &["${org.jboss:foo}", "${org.jboss:bar}"]).content,
    )?;

    let mut config = ws.config(&[&core]);
    config.bulk_resolution = true;
    let resolver = FakeResolver::new(ws.repo.root()).with_channel(["org.jboss:foo"]);

    let report = run(&config, &resolver)?;

    assert_eq!(report.artifacts, 2);
    assert_eq!(resolver.batch_calls(), 1);
    assert_eq!(resolver.resolve_calls(), 0);

    let err = run(&config, &ws.repo.resolver()).unwrap_err();
    assert!(err.chain().any(|cause| matches!(
        cause.downcast_ref::<FpkitError>(),
        Some(FpkitError::ChannelResolutionUnsupported { .. })
    )));
    Ok(())
}
