//! Shaded archive assembly.
//!
//! Every dependency is resolved, passed through
//! [`ArtifactInstaller::install_copied_artifact`] (so transformation and
//! exclusion bookkeeping apply) and unpacked into one scratch directory in
//! declaration order. Merge rules:
//!
//! - `META-INF/MANIFEST.MF`: the first one wins and its main attributes seed
//!   the synthesized manifest; later ones are dropped
//! - `META-INF/services/*`: union of all lines, each distinct line kept once
//!   at its first position (comments included)
//! - signature files (`META-INF/*.SF`, `*.RSA`, `*.DSA`, `*.EC`) are dropped
//! - any other path: the first archive providing it wins
//!
//! The scratch directory is then packaged into `<staging>/<output>`.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::ShadedModel;
use crate::installer::ArtifactInstaller;
use crate::provisioning::ProvisioningContext;
use crate::utils::fs::relative_display;
use crate::utils::{atomic_write, ensure_dir};

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
const SERVICES_PREFIX: &str = "META-INF/services/";
const SIGNATURE_EXTENSIONS: [&str; 4] = [".SF", ".RSA", ".DSA", ".EC"];
const MANIFEST_LINE_LIMIT: usize = 72;

/// Result of assembling one shaded model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadedOutcome {
    pub output: PathBuf,
    pub dependencies: usize,
    pub entries: usize,
}

/// Assembles shaded models with one installer.
pub struct ShadedModelAssembler<'a, 't> {
    installer: &'a ArtifactInstaller<'t>,
}

impl<'a, 't> ShadedModelAssembler<'a, 't> {
    pub fn new(installer: &'a ArtifactInstaller<'t>) -> Self {
        Self {
            installer,
        }
    }

    /// Resolve, merge and package `model` for `pack` into the staging directory.
    pub fn assemble(&self, ctx: &mut ProvisioningContext<'_>, pack: &str, model: &ShadedModel) -> Result<ShadedOutcome> {
        let scratch = tempfile::Builder::new()
            .prefix("shaded-")
            .tempdir_in(ctx.scratch_dir())
            .context("Failed to create scratch directory for shaded model")?;
        let output = ctx.staging_dir().join(&model.output);

        let mut merger = ArchiveMerger::new(scratch.path());
        let mut installed = Vec::new();
        for reference in &model.dependencies {
            let Some(resolved) = ctx.resolve(pack, reference, false)? else {
                continue;
            };
            let content = self.installer.install_copied_artifact(ctx, &resolved.artifact)?;
            merger.unpack(&content).with_context(|| format!("Failed to unpack {}", resolved.artifact))?;
            installed.push(resolved.artifact);
        }

        let version = match &model.version {
            Some(value) => Some(self.resolve_version(ctx, pack, value)?),
            None => None,
        };
        let manifest = synthesize_manifest(merger.manifest.as_deref(), model, version.as_deref());
        merger.write_services()?;
        let entries = package(scratch.path(), &manifest, &output)?;

        for artifact in &installed {
            ctx.record_install(artifact, &output)?;
        }
        debug!("Assembled {} from {} archive(s)", output.display(), installed.len());
        Ok(ShadedOutcome {
            output,
            dependencies: installed.len(),
            entries,
        })
    }

    fn resolve_version(&self, ctx: &mut ProvisioningContext<'_>, pack: &str, value: &str) -> Result<String> {
        if crate::versions::Placeholder::parse(value).is_none() {
            return Ok(value.to_string());
        }
        let mut artifact = ctx
            .resolve_reference(pack, value, false)?
            .map(|reference| reference.artifact)
            .with_context(|| format!("No version known for {value}"))?;
        if artifact.version().is_none() {
            ctx.resolve_artifact(pack, &mut artifact)?;
        }
        artifact.version().map(str::to_string).with_context(|| format!("No version known for {value}"))
    }
}

/// Unpacks archives into one directory applying the merge rules.
struct ArchiveMerger<'d> {
    root: &'d Path,
    manifest: Option<String>,
    services: BTreeMap<String, Vec<String>>,
}

impl<'d> ArchiveMerger<'d> {
    fn new(root: &'d Path) -> Self {
        Self {
            root,
            manifest: None,
            services: BTreeMap::new(),
        }
    }

    fn unpack(&mut self, archive: &Path) -> Result<()> {
        let file = File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;
        let mut zip = ZipArchive::new(file).with_context(|| format!("{} is not a readable archive", archive.display()))?;

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            let name = entry.name().to_string();
            let Some(relative) = entry.enclosed_name() else {
                warn!("Skipping unsafe entry {} in {}", name, archive.display());
                continue;
            };
            if entry.is_dir() {
                ensure_dir(&self.root.join(relative))?;
                continue;
            }

            if name == MANIFEST_PATH {
                if self.manifest.is_none() {
                    let mut content = String::new();
                    entry.read_to_string(&mut content)?;
                    self.manifest = Some(content);
                }
                continue;
            }
            if is_signature(&name) {
                trace!("Dropping signature file {}", name);
                continue;
            }
            if name.starts_with(SERVICES_PREFIX) {
                let mut content = String::new();
                entry.read_to_string(&mut content)?;
                self.services.entry(name).or_default().push(content);
                continue;
            }

            let target = self.root.join(relative);
            if target.exists() {
                trace!("{} already provided by an earlier archive", name);
                continue;
            }
            crate::utils::fs::ensure_parent_dir(&target)?;
            let mut out = File::create(&target).with_context(|| format!("Failed to create {}", target.display()))?;
            std::io::copy(&mut entry, &mut out)?;
        }
        Ok(())
    }

    fn write_services(&self) -> Result<()> {
        for (name, contents) in &self.services {
            let merged = merge_service_files(contents.iter().map(String::as_str));
            atomic_write(&self.root.join(name), merged.as_bytes())?;
        }
        Ok(())
    }
}

fn is_signature(name: &str) -> bool {
    name.strip_prefix("META-INF/")
        .is_some_and(|rest| !rest.contains('/') && SIGNATURE_EXTENSIONS.iter().any(|ext| rest.ends_with(ext)))
}

/// Merge service-loader files: every distinct non-blank line once, in first-seen order.
pub fn merge_service_files<'c, I>(contents: I) -> String
where
    I: IntoIterator<Item = &'c str>,
{
    let mut seen = HashSet::new();
    let mut merged = String::new();
    for content in contents {
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if seen.insert(line.to_string()) {
                merged.push_str(line);
                merged.push('\n');
            }
        }
    }
    merged
}

/// Build the manifest of a shaded archive.
///
/// Main attributes of `base` are kept, then `Manifest-Version`, `Main-Class`,
/// the model's extra entries, `Implementation-Title` and
/// `Implementation-Version` are set on top.
pub fn synthesize_manifest(base: Option<&str>, model: &ShadedModel, version: Option<&str>) -> String {
    let mut attributes = base.map(main_attributes).unwrap_or_default();
    attributes.retain(|(name, _)| !name.eq_ignore_ascii_case("Manifest-Version"));
    attributes.insert(0, ("Manifest-Version".to_string(), "1.0".to_string()));

    if let Some(main_class) = &model.main_class {
        set_attribute(&mut attributes, "Main-Class", main_class);
    }
    for (name, value) in &model.manifest_entries {
        set_attribute(&mut attributes, name, value);
    }
    set_attribute(&mut attributes, "Implementation-Title", &model.effective_title());
    if let Some(version) = version {
        set_attribute(&mut attributes, "Implementation-Version", version);
    }

    let mut manifest = String::new();
    for (name, value) in &attributes {
        write_header(&mut manifest, name, value);
    }
    manifest.push('\n');
    manifest
}

/// Main-section attributes of a manifest, continuation lines joined.
fn main_attributes(manifest: &str) -> Vec<(String, String)> {
    let mut attributes: Vec<(String, String)> = Vec::new();
    for line in manifest.lines() {
        if line.is_empty() {
            break;
        }
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some((_, value)) = attributes.last_mut() {
                value.push_str(continuation);
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            attributes.push((name.trim().to_string(), value.trim_start().to_string()));
        }
    }
    attributes
}

fn set_attribute(attributes: &mut Vec<(String, String)>, name: &str, value: &str) {
    match attributes.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
        Some((_, existing)) => *existing = value.to_string(),
        None => attributes.push((name.to_string(), value.to_string())),
    }
}

/// Append `name: value`, wrapped at 72 bytes with single-space continuation lines.
fn write_header(out: &mut String, name: &str, value: &str) {
    let header = format!("{name}: {value}");
    let mut rest = header.as_str();
    let mut limit = MANIFEST_LINE_LIMIT;
    let mut first = true;
    while !rest.is_empty() {
        let mut end = rest.len().min(limit);
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if !first {
            out.push(' ');
        }
        out.push_str(&rest[..end]);
        out.push('\n');
        rest = &rest[end..];
        limit = MANIFEST_LINE_LIMIT - 1;
        first = false;
    }
}

/// Zip `root` into `output` with `manifest` as the first entry. Returns the number of file entries.
fn package(root: &Path, manifest: &str, output: &Path) -> Result<usize> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.add_directory("META-INF/", options)?;
    zip.start_file(MANIFEST_PATH, options)?;
    zip.write_all(manifest.as_bytes())?;
    let mut entries = 1;

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let name = relative_display(root, entry.path());
        if entry.file_type().is_dir() {
            if name != "META-INF" {
                zip.add_directory(format!("{name}/"), options)?;
            }
            continue;
        }
        zip.start_file(name, options)?;
        let content = fs::read(entry.path()).with_context(|| format!("Failed to read {}", entry.path().display()))?;
        zip.write_all(&content)?;
        entries += 1;
    }

    let bytes = zip.finish()?.into_inner();
    atomic_write(output, &bytes).with_context(|| format!("Failed to write shaded archive {}", output.display()))?;
    Ok(entries)
}
