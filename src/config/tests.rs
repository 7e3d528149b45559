use super::*;
use anyhow::Result;
use tempfile::TempDir;

const FULL: &str = r#"
mode = "thin"
staging-dir = "target/server"
local-repository = "/opt/m2"
generated-repository = "target/repo"
provisioning-repository = "target/prov-repo"
bulk-resolution = true
schema-groups = ["org.wildfly"]
overrides = { "org.jboss:foo" = "org.jboss:foo:2.0.0" }

[transform]
enabled = true
suffix = "-jakarta"
command = "transformer"
excluded-artifacts = ["org.foo:bar:1.0"]

[recorder]
manifest = "target/artifacts.txt"
fail-on-error = true

[[feature-packs]]
name = "wildfly-core"
dir = "packs/core"

[[feature-packs]]
name = "wildfly-ee"
dir = "/abs/ee"
transformable = false
"#;

fn write(dir: &TempDir, content: &str) -> Result<PathBuf> {
    let path = dir.path().join("fpkit.toml");
    std::fs::write(&path, content)?;
    Ok(path)
}

#[test]
fn test_load_full_config() -> Result<()> {
    let dir = TempDir::new()?;
    let config = ProvisioningConfig::load(&write(&dir, FULL)?)?;

    assert_eq!(config.mode, OutputMode::Thin);
    assert_eq!(config.staging_dir, dir.path().join("target/server"));
    assert_eq!(config.local_repository, PathBuf::from("/opt/m2"));
    assert_eq!(config.generated_repository, Some(dir.path().join("target/repo")));
    assert!(config.bulk_resolution);
    assert_eq!(config.schema_groups, vec!["org.wildfly"]);
    assert_eq!(config.version_overrides().forced_version("org.jboss:foo"), Some("2.0.0"));

    assert!(config.transform.enabled);
    assert_eq!(config.transform.suffix, "-jakarta");
    assert_eq!(config.transform.args, vec!["{input}", "{output}"]);
    assert_eq!(config.transform.excluded_artifacts, vec!["org.foo:bar:1.0"]);

    let recorder = config.recorder.as_ref().unwrap();
    assert_eq!(recorder.manifest, dir.path().join("target/artifacts.txt"));
    assert!(recorder.fail_on_error);

    assert_eq!(config.feature_packs.len(), 2);
    assert!(config.feature_packs[0].transformable);
    assert_eq!(config.feature_packs[0].dir, dir.path().join("packs/core"));
    assert!(!config.feature_pack("wildfly-ee").unwrap().transformable);
    assert_eq!(config.feature_pack("wildfly-ee").unwrap().dir, PathBuf::from("/abs/ee"));
    assert!(config.transformation_active());
    Ok(())
}

#[test]
fn test_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let config = ProvisioningConfig::load(&write(
        &dir,
        "staging-dir = \"out\"\n[[feature-packs]]\nname = \"core\"\ndir = \"core\"\n",
    )?)?;

    assert_eq!(config.mode, OutputMode::Fat);
    assert!(!config.bulk_resolution);
    assert!(!config.transform.enabled);
    assert_eq!(config.transform.suffix, "-ee9");
    assert!(config.recorder.is_none());
    assert!(config.local_repository.ends_with(".m2/repository"));
    assert!(!config.transformation_active());
    Ok(())
}

#[test]
fn test_recorder_manifest_defaults_next_to_config() -> Result<()> {
    let dir = TempDir::new()?;
    let config = ProvisioningConfig::load(&write(
        &dir,
        "staging-dir = \"out\"\n[recorder]\n[[feature-packs]]\nname = \"core\"\ndir = \"core\"\n",
    )?)?;

    assert_eq!(config.recorder.unwrap().manifest, dir.path().join("artifacts.txt"));
    Ok(())
}

#[test]
fn test_rejects_config_without_packs() -> Result<()> {
    let dir = TempDir::new()?;
    let err = ProvisioningConfig::load(&write(&dir, "staging-dir = \"out\"\n")?).unwrap_err();

    assert!(matches!(err.downcast_ref::<FpkitError>(), Some(FpkitError::ConfigError { .. })));
    Ok(())
}

#[test]
fn test_rejects_empty_suffix_when_enabled() {
    let mut config = ProvisioningConfig::new("out");
    config.feature_packs.push(FeaturePackConfig {
        name: "core".to_string(),
        dir: PathBuf::from("core"),
        transformable: true,
    });
    config.transform.enabled = true;
    config.transform.suffix = String::new();

    assert!(matches!(config.validate(), Err(FpkitError::ConfigError { .. })));

    config.transform.enabled = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_rejects_duplicate_pack_names() {
    let mut config = ProvisioningConfig::new("out");
    for _ in 0..2 {
        config.feature_packs.push(FeaturePackConfig {
            name: "core".to_string(),
            dir: PathBuf::from("core"),
            transformable: true,
        });
    }

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("core"));
}

#[test]
fn test_unknown_keys_are_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write(&dir, "staging-dir = \"out\"\nstaging = \"typo\"\n")?;

    assert!(ProvisioningConfig::load(&path).is_err());
    Ok(())
}
