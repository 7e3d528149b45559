use super::*;
use crate::installer::ArtifactInstaller;
use crate::provisioning::ProvisioningContextBuilder;
use crate::test_utils::{FakeTransformer, MavenRepoFixture, read_jar_entries};
use crate::versions::{ChannelResolutionMode, VersionProperties};
use anyhow::Result;
use tempfile::TempDir;

const DESCRIPTOR: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<shaded-model>
    <output>bin/client/jboss-client.jar</output>
    <main-class>org.jboss.client.Main</main-class>
    <version>${org.jboss:client}</version>
    <shaded-dependencies>
        <dependency>${org.jboss:client}</dependency>
        <dependency>${org.jboss:logging}</dependency>
    </shaded-dependencies>
    <manifest-entries>
        <entry name="Add-Opens" value="java.base/java.lang"/>
    </manifest-entries>
</shaded-model>
"#;

fn entry<'e>(entries: &'e [(String, String)], name: &str) -> Option<&'e str> {
    entries.iter().find(|(n, _)| n == name).map(|(_, content)| content.as_str())
}

#[test]
fn test_parse_descriptor() -> Result<()> {
    let model = ShadedModel::from_bytes(Path::new("client.xml"), DESCRIPTOR.as_bytes())?;

    assert_eq!(model.output, "bin/client/jboss-client.jar");
    assert_eq!(model.main_class.as_deref(), Some("org.jboss.client.Main"));
    assert_eq!(model.dependencies, vec!["${org.jboss:client}", "${org.jboss:logging}"]);
    assert_eq!(model.manifest_entries, vec![("Add-Opens".to_string(), "java.base/java.lang".to_string())]);
    assert_eq!(model.effective_title(), "jboss-client");
    Ok(())
}

#[test]
fn test_descriptor_without_output_is_rejected() {
    let raw = "<shaded-model><shaded-dependencies><dependency>a:b:1</dependency></shaded-dependencies></shaded-model>";
    let err = ShadedModel::from_bytes(Path::new("broken.xml"), raw.as_bytes()).unwrap_err();

    assert!(matches!(err, FpkitError::TemplateError { .. }));
}

#[test]
fn test_service_files_merge_without_duplicates() {
    let first = "# Implementations\norg.foo.A\norg.foo.B\n";
    let second = "# Implementations\norg.foo.B\n\norg.foo.C\n";

    let merged = merge_service_files([first, second]);

    assert_eq!(merged, "# Implementations\norg.foo.A\norg.foo.B\norg.foo.C\n");
}

#[test]
fn test_manifest_keeps_base_attributes_and_wraps_long_lines() {
    let model = ShadedModel {
        output: "client.jar".to_string(),
        main_class: Some("org.jboss.Main".to_string()),
        manifest_entries: vec![("Add-Opens".to_string(), "x".repeat(100))],
        ..ShadedModel::default()
    };
    let base = "Manifest-Version: 1.0\nCreated-By: Maven\nMain-Class: org.old.Main\n\nName: org/foo/\nSealed: true\n";

    let manifest = synthesize_manifest(Some(base), &model, Some("1.2.3"));
    let lines: Vec<&str> = manifest.lines().collect();

    assert_eq!(lines[0], "Manifest-Version: 1.0");
    assert!(lines.contains(&"Created-By: Maven"));
    assert!(lines.contains(&"Main-Class: org.jboss.Main"));
    assert!(!manifest.contains("org.old.Main"));
    assert!(!manifest.contains("Sealed"));
    assert!(lines.contains(&"Implementation-Title: client"));
    assert!(lines.contains(&"Implementation-Version: 1.2.3"));
    assert!(lines.iter().all(|l| l.len() <= 72));
    assert!(lines.iter().any(|l| l.starts_with(' ')));
    assert!(manifest.ends_with("\n\n"));
}

#[test]
fn test_assemble_merges_archives() -> Result<()> {
    let repo = MavenRepoFixture::new()?;
    repo.add_jar(
        "org.jboss:client:1.0",
        &[
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\nCreated-By: first\n".as_slice()),
            ("META-INF/services/org.foo.Service", b"# impls\norg.foo.A\n".as_slice()),
            ("META-INF/CLIENT.SF", b"signature".as_slice()),
            ("org/jboss/Client.class", b"client".as_slice()),
            ("shared.txt", b"from client".as_slice()),
        ],
    )?;
    repo.add_jar(
        "org.jboss:logging:2.0",
        &[
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\nCreated-By: second\n".as_slice()),
            ("META-INF/services/org.foo.Service", b"# impls\norg.foo.A\norg.foo.B\n".as_slice()),
            ("org/jboss/Logger.class", b"logger".as_slice()),
            ("shared.txt", b"from logging".as_slice()),
        ],
    )?;
    let resolver = repo.resolver();
    let staging = TempDir::new()?;
    let mut ctx = ProvisioningContextBuilder::new(staging.path(), &resolver)
        .pack(
            VersionProperties::from_entries(
                "core",
                [("org.jboss:client", "org.jboss:client:1.0"), ("org.jboss:logging", "org.jboss:logging:2.0")],
            ),
            ChannelResolutionMode::NotRequired,
        )
        .build()?;
    let model = ShadedModel::from_bytes(Path::new("client.xml"), DESCRIPTOR.as_bytes())?;

    let installer = ArtifactInstaller::simple();
    let outcome = ShadedModelAssembler::new(&installer).assemble(&mut ctx, "core", &model)?;

    assert_eq!(outcome.output, staging.path().join("bin/client/jboss-client.jar"));
    assert_eq!(outcome.dependencies, 2);
    let entries = read_jar_entries(&outcome.output)?;
    assert_eq!(entries[0].0, "META-INF/MANIFEST.MF");

    let manifest = entry(&entries, "META-INF/MANIFEST.MF").unwrap();
    assert!(manifest.contains("Created-By: first"));
    assert!(manifest.contains("Main-Class: org.jboss.client.Main"));
    assert!(manifest.contains("Implementation-Version: 1.0"));
    assert_eq!(entry(&entries, "META-INF/services/org.foo.Service"), Some("# impls\norg.foo.A\norg.foo.B\n"));
    assert_eq!(entry(&entries, "shared.txt"), Some("from client"));
    assert!(entry(&entries, "org/jboss/Client.class").is_some());
    assert!(entry(&entries, "org/jboss/Logger.class").is_some());
    assert!(entry(&entries, "META-INF/CLIENT.SF").is_none());
    assert_eq!(ctx.installed(), 2);
    Ok(())
}

#[test]
fn test_assemble_goes_through_transformation() -> Result<()> {
    let repo = MavenRepoFixture::new()?;
    repo.add("org.jboss:client:1.0")?;
    repo.add("org.jboss:logging:2.0")?;
    let resolver = repo.resolver();
    let staging = TempDir::new()?;
    let mut ctx = ProvisioningContextBuilder::new(staging.path(), &resolver)
        .pack(
            VersionProperties::from_entries(
                "core",
                [("org.jboss:client", "org.jboss:client:1.0"), ("org.jboss:logging", "org.jboss:logging:2.0")],
            ),
            ChannelResolutionMode::NotRequired,
        )
        .build()?;
    let model = ShadedModel::from_bytes(Path::new("client.xml"), DESCRIPTOR.as_bytes())?;

    let transformer = FakeTransformer::new().leaving_untouched(["org.jboss:logging"]);
    let installer = ArtifactInstaller::transforming(&transformer, "-ee9");
    ShadedModelAssembler::new(&installer).assemble(&mut ctx, "core", &model)?;

    assert_eq!(transformer.call_count(), 2);
    assert!(ctx.transform_state().is_excluded("org.jboss:logging:2.0"));
    assert_eq!(ctx.transform_state().transformed_count(), 1);
    Ok(())
}
