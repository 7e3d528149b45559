//! Shaded models: several artifacts merged into one executable archive.
//!
//! A feature pack describes each shaded archive in `shaded/<name>.xml`:
//!
//! ```xml
//! <shaded-model>
//!     <output>bin/client/jboss-client.jar</output>
//!     <main-class>org.jboss.as.cli.CommandLineMain</main-class>
//!     <title>WildFly Client</title>
//!     <version>${org.wildfly.core:wildfly-cli}</version>
//!     <shaded-dependencies>
//!         <dependency>${org.wildfly.core:wildfly-cli}</dependency>
//!         <dependency>${org.jboss.logging:jboss-logging}</dependency>
//!     </shaded-dependencies>
//!     <manifest-entries>
//!         <entry name="Add-Opens" value="java.base/java.lang"/>
//!     </manifest-entries>
//! </shaded-model>
//! ```
//!
//! Dependencies use the module template reference grammar and go through the
//! same resolution and installer machinery. See [`assembler`] for the merge
//! rules.

pub mod assembler;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::path::{Path, PathBuf};

use crate::core::FpkitError;
use crate::template::attribute;

pub use assembler::{ShadedModelAssembler, ShadedOutcome, merge_service_files, synthesize_manifest};

/// A parsed shaded-model descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadedModel {
    /// Archive path relative to the staging directory.
    pub output: String,
    pub main_class: Option<String>,
    /// `Implementation-Title`; defaults to the output file stem.
    pub title: Option<String>,
    /// `Implementation-Version`; a literal or a placeholder.
    pub version: Option<String>,
    /// References, in merge order.
    pub dependencies: Vec<String>,
    /// Extra main-section manifest attributes, in order.
    pub manifest_entries: Vec<(String, String)>,
}

impl ShadedModel {
    pub fn parse(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path).with_context(|| format!("Failed to read shaded model: {}", path.display()))?;
        Ok(Self::from_bytes(path, &raw)?)
    }

    pub fn from_bytes(source: &Path, raw: &[u8]) -> Result<Self, FpkitError> {
        let invalid = |reason: String| FpkitError::TemplateError {
            path: source.display().to_string(),
            reason,
        };

        let mut reader = Reader::from_reader(raw);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut path: Vec<String> = Vec::new();
        let mut model = ShadedModel::default();
        let mut output = None;

        loop {
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(e) => return Err(invalid(format!("at byte {}: {e}", reader.buffer_position()))),
            };
            match &event {
                Event::Eof => break,
                Event::Start(element) | Event::Empty(element) => {
                    let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                    if path.is_empty() && name != "shaded-model" {
                        return Err(invalid(format!("expected <shaded-model> root, found <{name}>")));
                    }
                    if name == "entry" && path.last().map(String::as_str) == Some("manifest-entries") {
                        let key = attribute(element, "name").map_err(&invalid)?;
                        let value = attribute(element, "value").map_err(&invalid)?;
                        match (key, value) {
                            (Some(key), Some(value)) => model.manifest_entries.push((key, value)),
                            _ => return Err(invalid("manifest entry needs name and value".to_string())),
                        }
                    }
                    if matches!(event, Event::Start(_)) {
                        path.push(name);
                    }
                }
                Event::End(_) => {
                    path.pop();
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| invalid(e.to_string()))?.trim().to_string();
                    let location: Vec<&str> = path.iter().map(String::as_str).collect();
                    match location.as_slice() {
                        ["shaded-model", "output"] => output = Some(text),
                        ["shaded-model", "main-class"] => model.main_class = Some(text),
                        ["shaded-model", "title"] => model.title = Some(text),
                        ["shaded-model", "version"] => model.version = Some(text),
                        ["shaded-model", "shaded-dependencies", "dependency"] => model.dependencies.push(text),
                        _ => {}
                    }
                }
                _ => {}
            }
            buf.clear();
        }

        model.output = output.filter(|o| !o.is_empty()).ok_or_else(|| invalid("missing <output>".to_string()))?;
        if model.dependencies.is_empty() {
            return Err(invalid("no shaded dependencies".to_string()));
        }
        Ok(model)
    }

    /// `Implementation-Title`, falling back to the output file stem.
    pub fn effective_title(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            PathBuf::from(&self.output)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.output.clone())
        })
    }
}
