//! Global constants used throughout the fpkit codebase.
//!
//! File names of the feature-pack layout, defaults of the run configuration
//! and environment variable names live here so they are discoverable in one
//! place.

/// Version-properties resource inside a feature pack directory.
pub const VERSION_PROPERTIES_FILE: &str = "artifact-versions.properties";

/// Channel resolution mode resource inside a feature pack directory.
pub const CHANNEL_PROPERTIES_FILE: &str = "channel.properties";

/// Key of the channel resolution mode inside [`CHANNEL_PROPERTIES_FILE`].
pub const CHANNEL_RESOLUTION_KEY: &str = "resolution";

/// Directory holding module templates, both in a feature pack and in the staged tree.
pub const MODULES_DIR: &str = "modules";

/// Directory holding shaded-model descriptors inside a feature pack.
pub const SHADED_DIR: &str = "shaded";

/// File name of module templates.
pub const MODULE_TEMPLATE_FILE: &str = "module.xml";

/// Default name of the artifact manifest written by the recorder.
pub const ARTIFACT_MANIFEST_FILE: &str = "artifacts.txt";

/// Separator between the fields of one artifact manifest line.
pub const MANIFEST_FIELD_SEPARATOR: &str = "::";

/// Default suffix appended to the version of transformed artifacts.
pub const DEFAULT_TRANSFORM_SUFFIX: &str = "-ee9";

/// Default run configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "fpkit.toml";

/// Default artifact extension.
pub const DEFAULT_EXTENSION: &str = "jar";

/// Placeholder option marking an artifact for annotation indexing downstream.
pub const JANDEX_OPTION: &str = "jandex";

/// Placeholder option marking a template artifact that may be absent from the version properties.
pub const OPTIONAL_OPTION: &str = "optional";

/// Prefix of the resolved-version properties exposed to text substitution tasks.
pub const RESOLVED_VERSION_PREFIX: &str = "version.";

/// Archive directory scanned for XML schemas by the schema extractor.
pub const SCHEMA_ENTRY_DIR: &str = "schema/";

/// Staged directory receiving extracted schemas.
pub const SCHEMA_OUTPUT_DIR: &str = "docs/schema";

/// Environment variable disabling progress bars.
pub const NO_PROGRESS_ENV: &str = "FPKIT_NO_PROGRESS";
