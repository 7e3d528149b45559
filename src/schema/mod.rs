//! Schema extraction hook.
//!
//! After a module template installs an artifact from one of the configured
//! schema groups, the [`SchemaProcessor`] gets the artifact's content path.
//! The bundled [`SchemaExtractor`] copies the XSD files the archive ships
//! under `schema/` into `<staging>/docs/schema/`.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::constants::{SCHEMA_ENTRY_DIR, SCHEMA_OUTPUT_DIR};
use crate::utils::atomic_write;

/// Receives every processed artifact of a schema group.
pub trait SchemaProcessor {
    fn process_schemas(&mut self, group_id: &str, path: &Path) -> Result<()>;
}

/// Copies `schema/*.xsd` entries into the staged documentation directory.
///
/// The first archive providing a file name wins.
#[derive(Debug)]
pub struct SchemaExtractor {
    output_dir: PathBuf,
    extracted: BTreeSet<String>,
}

impl SchemaExtractor {
    pub fn new(staging_dir: &Path) -> Self {
        Self {
            output_dir: staging_dir.join(SCHEMA_OUTPUT_DIR),
            extracted: BTreeSet::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// File names extracted so far.
    pub fn extracted(&self) -> impl Iterator<Item = &str> {
        self.extracted.iter().map(String::as_str)
    }
}

impl SchemaProcessor for SchemaExtractor {
    fn process_schemas(&mut self, group_id: &str, path: &Path) -> Result<()> {
        let file = File::open(path).with_context(|| format!("Failed to open {} for schemas", path.display()))?;
        let mut archive =
            zip::ZipArchive::new(file).with_context(|| format!("{} is not a readable archive", path.display()))?;

        let mut found = 0;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let Some(file_name) = entry.name().strip_prefix(SCHEMA_ENTRY_DIR).map(str::to_string) else {
                continue;
            };
            if entry.is_dir() || file_name.contains('/') || !file_name.ends_with(".xsd") {
                continue;
            }
            if self.extracted.contains(&file_name) {
                trace!("Schema {} already extracted", file_name);
                continue;
            }

            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            atomic_write(&self.output_dir.join(&file_name), &content)?;
            self.extracted.insert(file_name);
            found += 1;
        }
        if found > 0 {
            debug!("Extracted {} schema(s) from {} ({})", found, path.display(), group_id);
        }
        Ok(())
    }
}
