//! JBoss Modules descriptors (`module.xml`) as editable values.
//!
//! [`ModuleTemplate`] keeps the descriptor as the event stream it was parsed
//! from, so everything that is not rewritten (declaration, comments,
//! whitespace, unrelated elements) is written back unchanged. A template that
//! was never modified serializes to its original bytes.
//!
//! The only edits offered are the ones provisioning needs:
//!
//! - replace the root `version` attribute
//! - turn `resources/artifact name=".."` into `resources/resource-root path=".."` (fat servers)
//! - replace the `name` of a `resources/artifact` element (thin servers)
//!
//! Parsed templates are cached per source path for the run in [`TemplateCache`].

pub mod processor;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::FpkitError;
use crate::utils::atomic_write;

pub use processor::{OutputMode, TemplateOutcome, TemplateProcessor};

/// What the root element of a descriptor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Module,
    ModuleAlias,
    /// Anything else; copied through untouched.
    Other,
}

#[derive(Debug, Clone)]
struct ArtifactSlot {
    start: usize,
    end: Option<usize>,
    name: String,
}

/// A parsed module descriptor.
#[derive(Debug, Clone)]
pub struct ModuleTemplate {
    source: PathBuf,
    raw: Vec<u8>,
    events: Vec<Event<'static>>,
    kind: TemplateKind,
    root: Option<usize>,
    root_version: Option<String>,
    artifacts: Vec<ArtifactSlot>,
    modified: bool,
}

impl ModuleTemplate {
    /// Read and parse the descriptor at `path`.
    pub fn parse(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path).with_context(|| format!("Failed to read module template: {}", path.display()))?;
        Ok(Self::from_bytes(path, raw)?)
    }

    /// Parse descriptor bytes; `source` is only used in messages and as cache key.
    pub fn from_bytes(source: impl Into<PathBuf>, raw: Vec<u8>) -> Result<Self, FpkitError> {
        let source = source.into();
        let invalid = |reason: String| FpkitError::TemplateError {
            path: source.display().to_string(),
            reason,
        };

        let mut reader = Reader::from_reader(raw.as_slice());
        let mut buf = Vec::new();
        let mut events = Vec::new();
        let mut stack: Vec<String> = Vec::new();
        let mut kind = TemplateKind::Other;
        let mut root = None;
        let mut root_version = None;
        let mut artifacts = Vec::new();
        let mut open_artifact: Option<usize> = None;

        loop {
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(e) => return Err(invalid(format!("at byte {}: {e}", reader.buffer_position()))),
            };
            let index = events.len();
            match &event {
                Event::Eof => break,
                Event::Start(element) | Event::Empty(element) => {
                    let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                    if root.is_none() {
                        root = Some(index);
                        kind = match name.as_str() {
                            "module" => TemplateKind::Module,
                            "module-alias" => TemplateKind::ModuleAlias,
                            _ => TemplateKind::Other,
                        };
                        root_version = attribute(element, "version").map_err(&invalid)?;
                    }

                    let in_resources = stack.len() == 2 && stack[1] == "resources";
                    if kind != TemplateKind::Other && in_resources && name == "artifact" {
                        let value = attribute(element, "name")
                            .map_err(&invalid)?
                            .ok_or_else(|| invalid("artifact element without a name attribute".to_string()))?;
                        artifacts.push(ArtifactSlot {
                            start: index,
                            end: None,
                            name: value,
                        });
                        if matches!(event, Event::Start(_)) {
                            open_artifact = Some(artifacts.len() - 1);
                        }
                    }

                    if matches!(event, Event::Start(_)) {
                        stack.push(name);
                    }
                }
                Event::End(_) => {
                    stack.pop();
                    if stack.len() == 2
                        && let Some(slot) = open_artifact.take()
                    {
                        artifacts[slot].end = Some(index);
                    }
                }
                _ => {}
            }
            events.push(event.into_owned());
            buf.clear();
        }

        Ok(Self {
            source,
            raw,
            events,
            kind,
            root,
            root_version,
            artifacts,
            modified: false,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The bytes the template was parsed from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Whether the root is `module` or `module-alias`.
    pub fn is_module(&self) -> bool {
        self.kind != TemplateKind::Other
    }

    pub fn root_version(&self) -> Option<&str> {
        self.root_version.as_deref()
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    /// `name` attribute of the `index`-th `resources/artifact` element as parsed.
    pub fn artifact_name(&self, index: usize) -> Option<&str> {
        self.artifacts.get(index).map(|slot| slot.name.as_str())
    }

    pub fn artifact_names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.iter().map(|slot| slot.name.as_str())
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_root_version(&mut self, version: &str) -> Result<(), FpkitError> {
        let root = self.root.ok_or_else(|| self.invalid("descriptor has no root element"))?;
        self.rewrite_element(root, None, "version", "version", version)?;
        self.root_version = Some(version.to_string());
        Ok(())
    }

    /// Turn the `index`-th artifact into `<resource-root path="{path}"/>`.
    pub fn set_resource_root(&mut self, index: usize, path: &str) -> Result<(), FpkitError> {
        let slot = self.slot(index)?;
        self.rewrite_element(slot.start, Some("resource-root"), "name", "path", path)?;
        if let Some(end) = slot.end {
            self.events[end] = Event::End(BytesEnd::new("resource-root"));
        }
        Ok(())
    }

    /// Replace the `name` of the `index`-th artifact, keeping the element as it is.
    pub fn set_artifact_name(&mut self, index: usize, name: &str) -> Result<(), FpkitError> {
        let slot = self.slot(index)?;
        self.rewrite_element(slot.start, None, "name", "name", name)
    }

    /// Serialize. Unmodified templates return their original bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FpkitError> {
        if !self.modified {
            return Ok(self.raw.clone());
        }
        let mut writer = Writer::new(Vec::with_capacity(self.raw.len()));
        for event in &self.events {
            writer.write_event(event.clone()).map_err(|e| self.invalid(&format!("cannot serialize: {e}")))?;
        }
        Ok(writer.into_inner())
    }

    /// Serialize to `path` through a scratch file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        atomic_write(path, &bytes).with_context(|| format!("Failed to write module descriptor: {}", path.display()))
    }

    fn slot(&self, index: usize) -> Result<ArtifactSlot, FpkitError> {
        self.artifacts.get(index).cloned().ok_or_else(|| self.invalid(&format!("no artifact element #{index}")))
    }

    fn invalid(&self, reason: &str) -> FpkitError {
        FpkitError::TemplateError {
            path: self.source.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Rebuild the element at `index`, optionally renaming it, with `key` replaced by `new_key="value"`.
    fn rewrite_element(
        &mut self,
        index: usize,
        rename: Option<&str>,
        key: &str,
        new_key: &str,
        value: &str,
    ) -> Result<(), FpkitError> {
        let rebuilt = match &self.events[index] {
            Event::Start(element) => Event::Start(rebuild(element, rename, key, new_key, value).map_err(|e| self.invalid(&e))?),
            Event::Empty(element) => Event::Empty(rebuild(element, rename, key, new_key, value).map_err(|e| self.invalid(&e))?),
            _ => return Err(self.invalid("rewrite target is not an element")),
        };
        self.events[index] = rebuilt;
        self.modified = true;
        Ok(())
    }
}

pub(crate) fn attribute(element: &BytesStart<'_>, key: &str) -> Result<Option<String>, String> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn rebuild(
    element: &BytesStart<'_>,
    rename: Option<&str>,
    key: &str,
    new_key: &str,
    value: &str,
) -> Result<BytesStart<'static>, String> {
    let name = match rename {
        Some(name) => name.to_string(),
        None => String::from_utf8_lossy(element.name().as_ref()).into_owned(),
    };
    let mut rebuilt = BytesStart::new(name);
    let mut replaced = false;
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.as_ref() == key.as_bytes() {
            rebuilt.push_attribute((new_key, value));
            replaced = true;
        } else {
            rebuilt.push_attribute(attr);
        }
    }
    if !replaced {
        rebuilt.push_attribute((new_key, value));
    }
    Ok(rebuilt)
}

/// Parsed templates of the run, keyed by source path.
#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: HashMap<PathBuf, ModuleTemplate>,
}

impl TemplateCache {
    /// The cached template for `path`, parsing it on first use.
    pub fn get_or_parse(&mut self, path: &Path) -> Result<&ModuleTemplate> {
        if !self.templates.contains_key(path) {
            let template = ModuleTemplate::parse(path)?;
            self.templates.insert(path.to_path_buf(), template);
        }
        self.templates.get(path).with_context(|| format!("Template cache lost {}", path.display()))
    }

    /// Remove the template for `path` from the cache, parsing it if it was never cached.
    pub fn take(&mut self, path: &Path) -> Result<ModuleTemplate> {
        match self.templates.remove(path) {
            Some(template) => Ok(template),
            None => ModuleTemplate::parse(path),
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
